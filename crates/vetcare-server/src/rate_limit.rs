//! Per-caller allowance on the generative routes (token bucket)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Callers idle this long are forgotten by [`RateLimiter::cleanup`]
const IDLE_CALLER_TTL: Duration = Duration::from_secs(300);

const SWEEP_EVERY: Duration = Duration::from_secs(60);

/// Remaining allowance of one caller
#[derive(Debug, Clone, Copy)]
struct Allowance {
    credits: f64,
    refreshed: Instant,
}

/// Allowed burst and sustained rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Calls a caller may burst
    pub requests: u32,
    /// Seconds for a fully drained allowance to refill
    pub per_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            per_secs: 60,
        }
    }
}

impl RateLimitConfig {
    fn burst(&self) -> f64 {
        f64::from(self.requests)
    }

    /// Credits regained per second
    fn per_second(&self) -> f64 {
        self.burst() / f64::from(self.per_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    Allowed { remaining: u32, limit: u32 },
    Limited { retry_after: Duration, limit: u32 },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Token-bucket allowances keyed by caller uid
#[derive(Clone)]
pub struct RateLimiter {
    callers: Arc<RwLock<HashMap<String, Allowance>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            callers: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Spend one credit for `uid`
    pub async fn check(&self, uid: &str) -> RateLimitResult {
        self.check_at(uid, Instant::now()).await
    }

    async fn check_at(&self, uid: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.requests;
        let burst = self.config.burst();
        let rate = self.config.per_second();

        let mut callers = self.callers.write().await;
        let allowance = callers.entry(uid.to_string()).or_insert(Allowance {
            credits: burst,
            refreshed: now,
        });
        let idle = now.saturating_duration_since(allowance.refreshed).as_secs_f64();
        allowance.credits = (allowance.credits + idle * rate).min(burst);
        allowance.refreshed = now;

        if allowance.credits < 1.0 {
            let retry_after = Duration::from_secs_f64((1.0 - allowance.credits) / rate);
            debug!(uid, ?retry_after, "caller over its AI allowance");
            return RateLimitResult::Limited { retry_after, limit };
        }
        allowance.credits -= 1.0;
        RateLimitResult::Allowed {
            remaining: allowance.credits.floor() as u32,
            limit,
        }
    }

    /// Forget callers that have been quiet for a while
    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.callers
            .write()
            .await
            .retain(|_, a| now.saturating_duration_since(a.refreshed) < IDLE_CALLER_TTL);
    }

    /// Sweep idle callers in the background
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_EVERY);
            loop {
                ticker.tick().await;
                self.cleanup().await;
            }
        })
    }

    /// Number of callers currently tracked
    pub async fn tracked(&self) -> usize {
        self.callers.read().await.len()
    }
}
