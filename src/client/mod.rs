// src/client/mod.rs

pub mod admin;
pub mod assets;
pub mod base;
pub mod envelope;
pub mod learner;

pub use admin::AdminClient;
pub use assets::AssetStore;
pub use base::{ApiClient, BaseClient};
pub use learner::{ActiveAttempt, AttemptResult, LearnerClient, StartedAttempt, Submission};
