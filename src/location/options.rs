//! Per-call configuration for [`locate`](super::locate).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::client::DEFAULT_USER_AGENT;
use super::providers::Provider;

pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_millis(1500);
pub const DEFAULT_PER_CALL_TIMEOUT: Duration = Duration::from_millis(900);

/// Options for one lookup. Start from `default()` and override.
///
/// ```rust,ignore
/// let opts = LocateOptions::default()
///     .overall_timeout(Duration::from_millis(1800))
///     .per_call_timeout(Duration::from_millis(1000))
///     .prefer_fastest(false);
/// ```
#[derive(Clone)]
pub struct LocateOptions {
    pub overall_timeout: Duration,
    pub per_call_timeout: Duration,
    /// `true`: return the first success. `false`: wait for every provider
    /// (or the deadline) and return the most complete result.
    pub prefer_fastest: bool,
    /// Queried after the built-in providers, in this order.
    pub extra_providers: Vec<Arc<dyn Provider>>,
    pub user_agent: String,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            per_call_timeout: DEFAULT_PER_CALL_TIMEOUT,
            prefer_fastest: true,
            extra_providers: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl LocateOptions {
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    pub fn prefer_fastest(mut self, prefer_fastest: bool) -> Self {
        self.prefer_fastest = prefer_fastest;
        self
    }

    pub fn extra_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.extra_providers.push(provider);
        self
    }

    pub fn extra_providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        self.extra_providers.extend(providers);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl fmt::Debug for LocateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extras: Vec<&str> = self.extra_providers.iter().map(|p| p.name()).collect();
        f.debug_struct("LocateOptions")
            .field("overall_timeout", &self.overall_timeout)
            .field("per_call_timeout", &self.per_call_timeout)
            .field("prefer_fastest", &self.prefer_fastest)
            .field("extra_providers", &extras)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
