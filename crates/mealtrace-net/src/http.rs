//! reqwest implementations of the remote store and vision boundaries.

use async_trait::async_trait;
use base64::Engine;
use mealtrace_shared::Goal;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NetError;
use crate::remote::{
    AuthContext, MealQuery, RemoteActivity, RemoteMeal, RemoteMealDraft, RemoteStore,
};
use crate::vision::{AnalyzeResponseDto, AnalyzedMeal, VisionService};

/// Anonymous-identity header accepted by every endpoint.
const DEVICE_ID_HEADER: &str = "X-User-Id";

/// HTTP client for the server of record.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Build a request with whichever credential is available, preferring
    /// the bearer token.
    fn request(
        &self,
        method: Method,
        path: &str,
        auth: &AuthContext,
    ) -> Result<RequestBuilder, NetError> {
        let url = format!("{}{path}", self.base_url);
        let builder = self.client.request(method, url);

        if let Some(token) = &auth.bearer_token {
            Ok(builder.bearer_auth(token))
        } else if let Some(device_id) = &auth.device_id {
            Ok(builder.header(DEVICE_ID_HEADER, device_id))
        } else {
            Err(NetError::NoAuth)
        }
    }
}

async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, NetError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(NetError::Status(resp.status().as_u16()))
    }
}

#[derive(Serialize)]
struct LinkLegacyBody<'a> {
    legacy_user_id: &'a str,
}

#[derive(Deserialize)]
struct MealEnvelope {
    meal: RemoteMeal,
}

#[derive(Deserialize)]
struct MealsEnvelope {
    meals: Vec<RemoteMeal>,
}

#[derive(Deserialize)]
struct GoalEnvelope {
    goal: Option<Goal>,
}

#[derive(Deserialize)]
struct ActivityEnvelope {
    activity: Option<RemoteActivity>,
}

#[derive(Deserialize)]
struct ActivityListEnvelope {
    activity: Vec<RemoteActivity>,
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn create_meal(
        &self,
        auth: &AuthContext,
        draft: &RemoteMealDraft,
    ) -> Result<RemoteMeal, NetError> {
        let resp = self
            .request(Method::POST, "/api/meals", auth)?
            .json(draft)
            .send()
            .await?;
        let envelope: MealEnvelope = expect_success(resp).await?.json().await?;
        debug!(server_id = %envelope.meal.id, "meal created remotely");
        Ok(envelope.meal)
    }

    async fn list_meals(
        &self,
        auth: &AuthContext,
        query: &MealQuery,
    ) -> Result<Vec<RemoteMeal>, NetError> {
        let mut req = self.request(Method::GET, "/api/meals", auth)?;
        if let Some(day) = query.day {
            req = req.query(&[("day", day.format("%Y-%m-%d").to_string())]);
        }
        if let Some(limit) = query.limit {
            req = req.query(&[("limit", limit.to_string())]);
        }
        let resp = req.send().await?;
        let envelope: MealsEnvelope = expect_success(resp).await?.json().await?;
        Ok(envelope.meals)
    }

    async fn delete_meal(&self, auth: &AuthContext, server_id: &str) -> Result<(), NetError> {
        let resp = self
            .request(Method::DELETE, &format!("/api/meals/{server_id}"), auth)?
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn set_goal(&self, auth: &AuthContext, goal: &Goal) -> Result<(), NetError> {
        let resp = self
            .request(Method::POST, "/api/user/goal", auth)?
            .json(goal)
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn get_goal(&self, auth: &AuthContext) -> Result<Option<Goal>, NetError> {
        let resp = self
            .request(Method::GET, "/api/user/goal", auth)?
            .send()
            .await?;
        let envelope: GoalEnvelope = expect_success(resp).await?.json().await?;
        Ok(envelope.goal)
    }

    async fn set_activity(
        &self,
        auth: &AuthContext,
        activity: &RemoteActivity,
    ) -> Result<(), NetError> {
        let resp = self
            .request(Method::POST, "/api/activity", auth)?
            .json(activity)
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn get_activity(
        &self,
        auth: &AuthContext,
        day: chrono::NaiveDate,
    ) -> Result<Option<RemoteActivity>, NetError> {
        let resp = self
            .request(Method::GET, "/api/activity", auth)?
            .query(&[("day", day.format("%Y-%m-%d").to_string())])
            .send()
            .await?;
        let envelope: ActivityEnvelope = expect_success(resp).await?.json().await?;
        Ok(envelope.activity)
    }

    async fn list_activity(
        &self,
        auth: &AuthContext,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, NetError> {
        let resp = self
            .request(Method::GET, "/api/activity/history", auth)?
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        let envelope: ActivityListEnvelope = expect_success(resp).await?.json().await?;
        Ok(envelope.activity)
    }

    async fn link_legacy(
        &self,
        auth: &AuthContext,
        legacy_device_id: &str,
    ) -> Result<(), NetError> {
        let resp = self
            .request(Method::POST, "/api/link-legacy", auth)?
            .json(&LinkLegacyBody {
                legacy_user_id: legacy_device_id,
            })
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }
}

/// HTTP client for the vision analysis service.
pub struct HttpVisionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVisionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequestBody<'a> {
    image_base64: String,
    language: &'a str,
}

#[async_trait]
impl VisionService for HttpVisionService {
    async fn analyze_image(&self, image: &[u8], language: &str) -> Result<AnalyzedMeal, NetError> {
        let body = AnalyzeRequestBody {
            image_base64: base64::engine::general_purpose::STANDARD.encode(image),
            language,
        };
        let resp = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .json(&body)
            .send()
            .await?;
        let dto: AnalyzeResponseDto = expect_success(resp).await?.json().await?;
        Ok(dto.into_meal())
    }
}
