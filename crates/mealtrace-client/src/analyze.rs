//! Drives a captured photo through the vision service and into the
//! composer.
//!
//! Analysis failure is a first-class path, not an error: the composer is
//! seeded with a canned editable estimate so the user can still log the
//! meal, and the caller learns which path was taken.

use mealtrace_net::vision::fallback_items;
use mealtrace_net::VisionService;
use tracing::{debug, warn};

use crate::composer::MealComposer;
use crate::error::Result;

/// Which path produced the items now sitting in the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The vision service answered; warnings are surfaced verbatim.
    Analyzed { warnings: Vec<String> },
    /// The service was unreachable or errored; the composer holds a
    /// canned zero-confidence estimate instead.
    Fallback,
}

/// Run analysis for a capture and load the result into the composer.
///
/// `image_ref` is the data URI that will be stored with the record;
/// `image` is the raw bytes sent for analysis. The two are supplied
/// separately so callers can decide not to persist the image at all.
pub async fn analyze_capture(
    composer: &mut MealComposer,
    vision: &dyn VisionService,
    image: &[u8],
    image_ref: Option<String>,
    language: &str,
) -> Result<AnalysisOutcome> {
    composer.begin_analysis(image_ref)?;
    match vision.analyze_image(image, language).await {
        Ok(meal) => {
            debug!(
                items = meal.items.len(),
                warnings = meal.warnings.len(),
                "analysis complete"
            );
            composer.finish_analysis(meal.items)?;
            Ok(AnalysisOutcome::Analyzed {
                warnings: meal.warnings,
            })
        }
        Err(e) => {
            warn!(error = %e, "analysis unavailable, seeding canned estimate");
            composer.finish_analysis(fallback_items(image.len()))?;
            Ok(AnalysisOutcome::Fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mealtrace_net::{AnalyzedMeal, NetError};
    use mealtrace_shared::{FoodItem, MealType, Nutrients};

    use crate::composer::ComposerState;

    struct FixedVision(Vec<FoodItem>);

    #[async_trait]
    impl VisionService for FixedVision {
        async fn analyze_image(
            &self,
            _image: &[u8],
            _language: &str,
        ) -> std::result::Result<AnalyzedMeal, NetError> {
            Ok(AnalyzedMeal {
                items: self.0.clone(),
                warnings: vec!["low light".into()],
            })
        }
    }

    struct DownVision;

    #[async_trait]
    impl VisionService for DownVision {
        async fn analyze_image(
            &self,
            _image: &[u8],
            _language: &str,
        ) -> std::result::Result<AnalyzedMeal, NetError> {
            Err(NetError::Status(502))
        }
    }

    #[tokio::test]
    async fn successful_analysis_fills_composer_and_keeps_warnings() {
        let items = vec![FoodItem::new(
            "rice",
            Nutrients::new(116.0, 2.6, 25.9, 0.3),
            180.0,
            0.85,
            false,
        )];
        let mut composer = MealComposer::new(MealType::Lunch);

        let outcome = analyze_capture(
            &mut composer,
            &FixedVision(items),
            b"jpegbytes",
            Some("data:image/jpeg;base64,abc".into()),
            "en",
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::Analyzed {
                warnings: vec!["low light".into()]
            }
        );
        assert_eq!(composer.state(), ComposerState::Reviewing);
        assert_eq!(composer.items().len(), 1);
        assert!(composer.totals().kcal > 0.0);
    }

    #[tokio::test]
    async fn failed_analysis_seeds_editable_fallback() {
        let mut composer = MealComposer::new(MealType::Dinner);

        let outcome =
            analyze_capture(&mut composer, &DownVision, b"jpegbytes", None, "en")
                .await
                .unwrap();

        assert_eq!(outcome, AnalysisOutcome::Fallback);
        assert_eq!(composer.state(), ComposerState::Reviewing);
        assert!(!composer.items().is_empty());
        // Fallback items are zero-confidence manual estimates, fully
        // editable like any other item.
        assert!(composer
            .items()
            .iter()
            .all(|it| it.confidence == 0.0 && it.manual_override));

        let first = composer.items()[0].id;
        composer.set_item_weight(first, 300.0).unwrap();
        assert!(composer.draft().is_ok());
    }
}
