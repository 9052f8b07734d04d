use std::net::IpAddr;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

const UNKNOWN: &str = "unknown";
const LOOKUP_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLocation {
    pub country: String,
    pub city: String,
}

impl ClientLocation {
    /// The lookup service answered but could not place the address.
    pub fn unknown() -> Self {
        ClientLocation {
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
        }
    }

    /// The lookup itself failed.
    pub fn errored() -> Self {
        ClientLocation {
            country: LOOKUP_ERROR.to_string(),
            city: LOOKUP_ERROR.to_string(),
        }
    }
}

impl std::fmt::Display for ClientLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.country, self.city)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    city: Option<String>,
}

impl From<IpApiResponse> for ClientLocation {
    fn from(val: IpApiResponse) -> Self {
        if val.status != "success" {
            tracing::debug!(
                "Geolocation lookup reported failure: {}",
                val.message.as_deref().unwrap_or("no message")
            );
            return ClientLocation::unknown();
        }

        let non_empty = |field: Option<String>| match field {
            Some(value) if !value.is_empty() => value,
            _ => UNKNOWN.to_string(),
        };

        ClientLocation {
            country: non_empty(val.country),
            city: non_empty(val.city),
        }
    }
}

/// Best-effort IP to (country, city) lookup against an ip-api.com compatible service.
#[derive(Debug, Clone)]
pub struct GeoResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl GeoResolver {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        GeoResolver { client, base_url }
    }

    /// Never fails: a failed lookup degrades to sentinel values.
    pub async fn resolve(&self, ip: &str) -> ClientLocation {
        // forwarded headers are caller-controlled, never put a non-address in the lookup path
        if ip.parse::<IpAddr>().is_err() {
            tracing::debug!("Skipping geolocation for non-IP client address: {}", ip);
            return ClientLocation::unknown();
        }

        match self.lookup(ip).await {
            Ok(response) => response.into(),
            Err(e) => {
                tracing::warn!("Failed to look up location for {}: {:#}", ip, e);
                ClientLocation::errored()
            }
        }
    }

    async fn lookup(&self, ip: &str) -> anyhow::Result<IpApiResponse> {
        let url = format!(
            "{}/json/{}",
            self.base_url.as_str().trim_end_matches('/'),
            ip
        );

        let response = self
            .client
            .get(url)
            .query(&[("fields", "status,message,country,city")])
            .send()
            .await
            .context("Failed to reach geolocation service")?
            .error_for_status()
            .context("Geolocation service returned an error status")?;

        response
            .json::<IpApiResponse>()
            .await
            .context("Failed to parse geolocation response")
    }
}
