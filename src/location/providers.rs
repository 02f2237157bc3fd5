//! IP geolocation providers: ipapi.co, ip-api.com and ipwho.is.

use std::sync::Arc;

use serde::Deserialize;

use super::client::HttpClient;
use super::deadline::Deadline;
use super::types::{quality_hint, Location, ProviderError};

/// One geolocation data source.
///
/// Implementations are stateless and are called concurrently from several
/// threads sharing one [`HttpClient`].
pub trait Provider: Send + Sync {
    /// Name recorded in [`Location::source`].
    fn name(&self) -> &str;

    /// Perform one lookup, giving up at `deadline`.
    fn lookup(&self, deadline: Deadline, client: &HttpClient) -> Result<Location, ProviderError>;

    /// How complete `loc` is; higher wins when results are ranked.
    fn quality(&self, loc: &Location) -> u8 {
        quality_hint(loc)
    }
}

/// The providers every lookup queries, in registration order.
pub fn builtin_providers() -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(IpapiCo::default()),
        Arc::new(IpApiCom::default()),
        Arc::new(IpwhoIs::default()),
    ]
}

fn place(name: Option<String>) -> String {
    name.unwrap_or_default()
}

// ─── ipapi.co ───────────────────────────────────────────────────

pub struct IpapiCo {
    endpoint: String,
}

impl IpapiCo {
    pub const NAME: &'static str = "ipapi.co";
    pub const ENDPOINT: &'static str = "https://ipapi.co/json/";

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

impl Default for IpapiCo {
    fn default() -> Self {
        Self::with_endpoint(Self::ENDPOINT)
    }
}

#[derive(Deserialize, Debug)]
struct IpapiCoBody {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

impl IpapiCoBody {
    fn into_location(self) -> Result<Location, ProviderError> {
        if self.error {
            return Err(ProviderError::Rejected(
                self.reason.unwrap_or_else(|| "ipapi.co reported an error".into()),
            ));
        }
        Ok(Location {
            lat: self.latitude.unwrap_or(0.0),
            lon: self.longitude.unwrap_or(0.0),
            city: place(self.city),
            region: place(self.region),
            country: place(self.country_name),
            source: IpapiCo::NAME.to_string(),
        })
    }
}

impl Provider for IpapiCo {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup(&self, deadline: Deadline, client: &HttpClient) -> Result<Location, ProviderError> {
        client
            .get_json::<IpapiCoBody>(&self.endpoint, deadline)?
            .into_location()
    }
}

// ─── ip-api.com ─────────────────────────────────────────────────

pub struct IpApiCom {
    endpoint: String,
}

impl IpApiCom {
    pub const NAME: &'static str = "ip-api.com";
    // The free tier is plain HTTP only.
    pub const ENDPOINT: &'static str =
        "http://ip-api.com/json/?fields=status,country,regionName,city,lat,lon,message";

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

impl Default for IpApiCom {
    fn default() -> Self {
        Self::with_endpoint(Self::ENDPOINT)
    }
}

#[derive(Deserialize, Debug)]
struct IpApiComBody {
    status: Option<String>,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpApiComBody {
    fn into_location(self) -> Result<Location, ProviderError> {
        if self.status.as_deref() != Some("success") {
            let message = self.message.filter(|m| !m.is_empty());
            return Err(ProviderError::Rejected(
                message.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        Ok(Location {
            lat: self.lat.unwrap_or(0.0),
            lon: self.lon.unwrap_or(0.0),
            city: place(self.city),
            region: place(self.region_name),
            country: place(self.country),
            source: IpApiCom::NAME.to_string(),
        })
    }
}

impl Provider for IpApiCom {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup(&self, deadline: Deadline, client: &HttpClient) -> Result<Location, ProviderError> {
        client
            .get_json::<IpApiComBody>(&self.endpoint, deadline)?
            .into_location()
    }
}

// ─── ipwho.is ───────────────────────────────────────────────────

pub struct IpwhoIs {
    endpoint: String,
}

impl IpwhoIs {
    pub const NAME: &'static str = "ipwho.is";
    pub const ENDPOINT: &'static str = "https://ipwho.is/";

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

impl Default for IpwhoIs {
    fn default() -> Self {
        Self::with_endpoint(Self::ENDPOINT)
    }
}

#[derive(Deserialize, Debug)]
struct IpwhoIsBody {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpwhoIsBody {
    fn into_location(self) -> Result<Location, ProviderError> {
        if !self.success {
            let message = self.message.filter(|m| !m.is_empty());
            return Err(ProviderError::Rejected(
                message.unwrap_or_else(|| "lookup failed".into()),
            ));
        }
        Ok(Location {
            lat: self.latitude.unwrap_or(0.0),
            lon: self.longitude.unwrap_or(0.0),
            city: place(self.city),
            region: place(self.region),
            country: place(self.country),
            source: IpwhoIs::NAME.to_string(),
        })
    }
}

impl Provider for IpwhoIs {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup(&self, deadline: Deadline, client: &HttpClient) -> Result<Location, ProviderError> {
        client
            .get_json::<IpwhoIsBody>(&self.endpoint, deadline)?
            .into_location()
    }
}
