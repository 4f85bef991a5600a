//! # mealtrace-net
//!
//! Client side of the two external service boundaries: the remote durable
//! store (a REST surface the sync coordinator pushes to and pulls from)
//! and the vision analysis service. Both are expressed as async traits so
//! the coordinator can be tested against in-process doubles.

pub mod http;
pub mod remote;
pub mod vision;

mod error;

pub use error::NetError;
pub use http::{HttpRemoteStore, HttpVisionService};
pub use remote::{AuthContext, MealQuery, RemoteActivity, RemoteMeal, RemoteMealDraft, RemoteStore};
pub use vision::{AnalyzedMeal, VisionService};
