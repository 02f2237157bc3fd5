//! Location resolver: races every provider and picks one result.
//!
//! Flow: fan out one blocking task per provider → collect outcomes from a
//! single channel → stop at the first success (prefer-fastest) or rank
//! everything that arrived before the deadline (collect-then-rank).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::client::HttpClient;
use super::deadline::Deadline;
use super::options::LocateOptions;
use super::providers::{builtin_providers, Provider};
use super::types::{LocateError, Location, ProviderError};

/// One provider's finished call.
pub(crate) struct Outcome {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) result: Result<Location, ProviderError>,
    pub(crate) elapsed: Duration,
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Running selection over outcomes in arrival order.
///
/// Pure bookkeeping, no clocks: feeding the same outcomes in the same order
/// always selects the same location.
pub(crate) struct Selection {
    prefer_fastest: bool,
    best: Option<Ranked>,
}

struct Ranked {
    location: Location,
    quality: u8,
    elapsed: Duration,
}

impl Selection {
    pub(crate) fn new(prefer_fastest: bool) -> Self {
        Self { prefer_fastest, best: None }
    }

    /// Record an outcome. Returns a location when the policy is satisfied
    /// and no further outcomes should be awaited.
    pub(crate) fn offer(&mut self, outcome: Outcome) -> Option<Location> {
        let Outcome { provider, result, elapsed } = outcome;
        let location = match result {
            Ok(location) => location,
            Err(e) => {
                tracing::debug!(
                    provider = provider.name(),
                    error = %e,
                    elapsed_ms = millis(elapsed),
                    "location provider failed"
                );
                return None;
            }
        };

        if self.prefer_fastest {
            tracing::debug!(
                provider = provider.name(),
                elapsed_ms = millis(elapsed),
                "first usable location wins"
            );
            return Some(location);
        }

        let quality = provider.quality(&location);
        tracing::trace!(provider = provider.name(), quality, elapsed_ms = millis(elapsed), "ranked");

        let replace = match &self.best {
            None => true,
            Some(best) => quality > best.quality || (quality == best.quality && elapsed < best.elapsed),
        };
        if replace {
            self.best = Some(Ranked { location, quality, elapsed });
        }
        None
    }

    /// The best location seen so far, if any provider succeeded.
    pub(crate) fn finish(self) -> Option<Location> {
        self.best.map(|ranked| {
            tracing::debug!(
                provider = %ranked.location.source,
                quality = ranked.quality,
                elapsed_ms = millis(ranked.elapsed),
                "selected best-ranked location"
            );
            ranked.location
        })
    }
}

/// Registry of built-in providers plus the race itself.
pub struct LocationResolver {
    builtins: Vec<Arc<dyn Provider>>,
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationResolver {
    /// Resolver over ipapi.co, ip-api.com and ipwho.is.
    pub fn new() -> Self {
        Self { builtins: builtin_providers() }
    }

    /// Resolver with a custom built-in set (e.g. offline fakes in tests).
    pub fn with_providers(builtins: Vec<Arc<dyn Provider>>) -> Self {
        Self { builtins }
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.builtins
    }

    /// Query every provider concurrently and return one location.
    ///
    /// Never runs past `deadline` nor past `opts.overall_timeout` from now.
    /// Individual provider errors are logged and dropped; the caller only
    /// ever sees [`LocateError::Exhausted`].
    pub async fn locate(&self, deadline: Deadline, opts: LocateOptions) -> Result<Location, LocateError> {
        let working = deadline.clamp_to(opts.overall_timeout);

        let providers: Vec<Arc<dyn Provider>> = self
            .builtins
            .iter()
            .cloned()
            .chain(opts.extra_providers.iter().cloned())
            .collect();
        if providers.is_empty() {
            return Err(LocateError::Exhausted);
        }

        let client = HttpClient::new(opts.user_agent.as_str(), opts.per_call_timeout);

        // Room for every provider, so late finishers never block once we stop reading.
        let (tx, mut rx) = mpsc::channel::<Outcome>(providers.len());

        for provider in &providers {
            let provider = Arc::clone(provider);
            let client = client.clone();
            let tx = tx.clone();
            let call_deadline = working.clamp_to(opts.per_call_timeout);

            tokio::task::spawn_blocking(move || {
                tracing::trace!(provider = provider.name(), "lookup started");
                let started = Instant::now();
                let result = provider.lookup(call_deadline, &client);
                let outcome = Outcome {
                    provider,
                    result,
                    elapsed: started.elapsed(),
                };
                // Err only when the resolver already returned.
                let _ = tx.try_send(outcome);
            });
        }
        drop(tx);

        let mut selection = Selection::new(opts.prefer_fastest);
        let expiry = tokio::time::sleep_until(tokio::time::Instant::from_std(working.instant()));
        tokio::pin!(expiry);

        for _ in 0..providers.len() {
            tokio::select! {
                received = rx.recv() => {
                    let Some(outcome) = received else { break };
                    if let Some(location) = selection.offer(outcome) {
                        return Ok(location);
                    }
                }
                _ = &mut expiry => {
                    tracing::debug!(prefer_fastest = opts.prefer_fastest, "location deadline expired");
                    break;
                }
            }
        }

        selection.finish().ok_or_else(|| {
            tracing::warn!("no location provider produced a result in time");
            LocateError::Exhausted
        })
    }

    /// [`locate`](Self::locate) on a private runtime, for callers without one.
    ///
    /// The runtime is shut down in the background, so lookups that lost the
    /// race finish on their own instead of delaying the return.
    pub fn locate_blocking(&self, deadline: Deadline, opts: LocateOptions) -> Result<Location, LocateError> {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "cannot start async runtime for location lookup");
                return Err(LocateError::Exhausted);
            }
        };
        let result = runtime.block_on(self.locate(deadline, opts));
        runtime.shutdown_background();
        result
    }
}

/// [`LocationResolver::locate`] over the built-in providers.
pub async fn locate(deadline: Deadline, opts: LocateOptions) -> Result<Location, LocateError> {
    LocationResolver::new().locate(deadline, opts).await
}

/// [`LocationResolver::locate_blocking`] over the built-in providers.
pub fn locate_blocking(deadline: Deadline, opts: LocateOptions) -> Result<Location, LocateError> {
    LocationResolver::new().locate_blocking(deadline, opts)
}
