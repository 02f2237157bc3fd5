//! IP-based location lookup for wxlocate.
//!
//! Queries several public geolocation services at once and keeps one
//! answer: either the first that succeeds or the most complete one that
//! arrives before the deadline.

pub mod client;
pub mod deadline;
pub mod options;
pub mod providers;
pub mod resolver;
pub mod types;

pub use client::HttpClient;
pub use deadline::Deadline;
pub use options::LocateOptions;
pub use providers::{builtin_providers, IpApiCom, IpapiCo, IpwhoIs, Provider};
pub use resolver::{locate, locate_blocking, LocationResolver};
pub use types::{format_coords, quality_hint, LocateError, Location, ProviderError};
