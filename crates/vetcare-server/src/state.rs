//! State shared by every connection

use crate::auth::AuthProvider;
use crate::cache::{CacheConfig, ReportCache};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::router::Router;
use std::sync::Arc;
use vetcare_ai::{CarePlanner, ChatConcierge, GenerativeModel, TimeSuggester};
use vetcare_db::Store;

pub struct AppState {
    pub store: Arc<Store>,
    pub auth: Arc<dyn AuthProvider>,
    pub router: Router,
    pub limiter: RateLimiter,
    pub reports: ReportCache,
    pub concierge: ChatConcierge,
    pub planner: CarePlanner,
    pub suggester: TimeSuggester,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        auth: Arc<dyn AuthProvider>,
        model: Arc<dyn GenerativeModel>,
        rate_limit: RateLimitConfig,
        cache: &CacheConfig,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            router: Router::new()?,
            limiter: RateLimiter::new(rate_limit),
            reports: ReportCache::new(cache),
            concierge: ChatConcierge::new(model.clone(), store.clone()),
            planner: CarePlanner::new(model.clone()),
            suggester: TimeSuggester::new(model),
            store,
            auth,
        })
    }
}
