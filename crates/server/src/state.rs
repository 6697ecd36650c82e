use std::sync::Arc;

use taskmint_agent::TaskExtractor;
use taskmint_core::password::PasswordHasher;
use taskmint_db::{TaskRepository, UserRepository};

use crate::auth::TokenIssuer;
use crate::rate_limit::RateLimiter;

/// Shared per-request dependencies behind the axum router.
#[derive(Clone)]
pub struct ApiState {
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub extractor: Arc<TaskExtractor>,
    pub tokens: Arc<TokenIssuer>,
    pub hasher: PasswordHasher,
    pub limiter: Arc<RateLimiter>,
}
