//! Shared blocking HTTP client used by every provider.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::deadline::Deadline;
use super::types::ProviderError;

/// Identifier sent as `User-Agent` when the caller does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("wxlocate/", env!("CARGO_PKG_VERSION"));

/// A `ureq` agent plus the application identifier sent with each request.
///
/// Cloning is cheap and clones share one connection pool, so a single client
/// can be handed to every concurrent provider call.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpClient {
    /// Build a client whose requests never run longer than `per_call_timeout`.
    pub fn new(user_agent: impl Into<String>, per_call_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(per_call_timeout).build();
        Self {
            agent,
            user_agent: user_agent.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` and decode the JSON body, giving up at `deadline`.
    ///
    /// Non-2xx statuses are reported as [`ProviderError::Status`] without
    /// looking at the body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        deadline: Deadline,
    ) -> Result<T, ProviderError> {
        let remaining = deadline.remaining().ok_or(ProviderError::DeadlineExceeded)?;

        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .timeout(remaining)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => ProviderError::Status(code),
                ureq::Error::Transport(t) => ProviderError::Transport(t.to_string()),
            })?;

        response
            .into_json()
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT, Duration::from_millis(900))
    }
}
