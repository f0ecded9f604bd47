use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use url::Url;

/// `max_requests` per `period`, spread evenly over the period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub max_requests: f64,
    pub period: Duration,
}

impl RateLimit {
    pub fn new(max_requests: f64, period: Duration) -> Self {
        Self {
            max_requests,
            period,
        }
    }

    pub fn per_second(max_requests: f64) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// Gap between two requests; `None` when the limit allows nothing
    /// sensible (zero, negative or non-finite rate, empty period).
    pub fn interval(&self) -> Option<Duration> {
        if !self.max_requests.is_finite() || self.max_requests <= 0.0 || self.period.is_zero() {
            return None;
        }
        Duration::try_from_secs_f64(self.period.as_secs_f64() / self.max_requests).ok()
    }
}

#[derive(Debug, Default)]
struct Slots {
    global: Option<Instant>,
    hosts: HashMap<String, Instant>,
}

/// Throttles requests globally and per host. Clones share their state, so
/// every task of a run draws from the same budget.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    global: Option<RateLimit>,
    per_host: Option<RateLimit>,
    slots: Arc<Mutex<Slots>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl RateLimiter {
    /// Limits without a usable interval are ignored.
    pub fn new(global: Option<RateLimit>, per_host: Option<RateLimit>) -> Self {
        Self {
            global: global.filter(|limit| limit.interval().is_some()),
            per_host: per_host.filter(|limit| limit.interval().is_some()),
            slots: Arc::new(Mutex::new(Slots::default())),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    pub fn global(&self) -> Option<RateLimit> {
        self.global
    }

    pub fn per_host(&self) -> Option<RateLimit> {
        self.per_host
    }

    pub fn is_unlimited(&self) -> bool {
        self.global.is_none() && self.per_host.is_none()
    }

    /// Waits until a request to `url` may start.
    pub async fn acquire(&self, url: &Url) {
        let Some(start) = self.reserve(url) else {
            return;
        };
        let wait = start.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            debug!("Rate limit: waiting {:?} before {}", wait, url);
            sleep_until(start).await;
        }
    }

    /// Books the earliest slot free on both the global and the host
    /// schedule. Callers queue up in call order.
    fn reserve(&self, url: &Url) -> Option<Instant> {
        if self.is_unlimited() {
            return None;
        }
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let global = self.global.and_then(|limit| limit.interval());
        let per_host = self.per_host.and_then(|limit| limit.interval());

        let mut slots = self.slots.lock();
        let mut start = Instant::now();
        if global.is_some() {
            if let Some(next) = slots.global {
                start = start.max(next);
            }
        }
        if per_host.is_some() {
            if let Some(next) = slots.hosts.get(&host) {
                start = start.max(*next);
            }
        }

        if let Some(interval) = global {
            slots.global = Some(start + interval);
        }
        if let Some(interval) = per_host {
            slots.hosts.insert(host, start + interval);
        }
        Some(start)
    }
}
