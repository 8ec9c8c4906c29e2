//! Forward and reverse geocoding through a Nominatim-compatible API

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("montirku-server/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_LIMIT: u8 = 5;

#[derive(Error, Debug)]
pub enum GeocodingError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoding service returned status {0}")]
    Status(u16),

    #[error("Unexpected geocoding response: {0}")]
    Malformed(String),

    #[error("No matching location")]
    NoMatch,
}

/// A resolved place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Nominatim's wire shape; coordinates arrive as strings
#[derive(Debug, Deserialize)]
struct RawPlace {
    display_name: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    error: Option<String>,
}

impl TryFrom<RawPlace> for Place {
    type Error = GeocodingError;

    fn try_from(raw: RawPlace) -> Result<Self, Self::Error> {
        if raw.error.is_some() {
            return Err(GeocodingError::NoMatch);
        }
        let parse = |value: Option<String>, name: &str| -> Result<f64, GeocodingError> {
            value
                .as_deref()
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| GeocodingError::Malformed(format!("missing or invalid {}", name)))
        };
        Ok(Place {
            latitude: parse(raw.lat, "lat")?,
            longitude: parse(raw.lon, "lon")?,
            display_name: raw.display_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Clone)]
pub struct GeocodingClient {
    http_client: Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodingError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Address of a coordinate
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Place, GeocodingError> {
        let lat = lat.to_string();
        let lon = lon.to_string();
        let raw: RawPlace = self
            .get_json(
                "reverse",
                &[("format", "jsonv2"), ("lat", lat.as_str()), ("lon", lon.as_str())],
            )
            .await?;
        Place::try_from(raw)
    }

    /// Candidate places for a free-text query, best match first
    pub async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodingError> {
        let limit = SEARCH_LIMIT.to_string();
        let raw: Vec<RawPlace> = self
            .get_json(
                "search",
                &[("format", "jsonv2"), ("q", query), ("limit", limit.as_str())],
            )
            .await?;
        if raw.is_empty() {
            return Err(GeocodingError::NoMatch);
        }
        raw.into_iter().map(Place::try_from).collect()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GeocodingError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(url = %url, "Geocoding request");

        let response = self.http_client.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Geocoding service error");
            return Err(GeocodingError::Status(status.as_u16()));
        }
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn fake_nominatim() -> String {
        async fn reverse(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            if params.get("lat").map(String::as_str) == Some("0") {
                return Json(json!({ "error": "Unable to geocode" }));
            }
            Json(json!({
                "display_name": "Monas, Jakarta Pusat",
                "lat": params.get("lat"),
                "lon": params.get("lon"),
            }))
        }

        async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            match params.get("q").map(String::as_str) {
                Some("monas") => Json(json!([
                    { "display_name": "Monas, Jakarta", "lat": "-6.1754", "lon": "106.8272" }
                ])),
                _ => Json(json!([])),
            }
        }

        let app = Router::new()
            .route("/reverse", get(reverse))
            .route("/search", get(search))
            .route(
                "/broken/search",
                get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_reverse_and_search() {
        let client = GeocodingClient::new(fake_nominatim().await).unwrap();

        let place = client.reverse(-6.1754, 106.8272).await.unwrap();
        assert_eq!(place.display_name, "Monas, Jakarta Pusat");
        assert!((place.latitude + 6.1754).abs() < 1e-9);

        let found = client.search("monas").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].longitude - 106.8272).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_results_are_no_match() {
        let client = GeocodingClient::new(fake_nominatim().await).unwrap();
        assert!(matches!(
            client.search("nowhere").await,
            Err(GeocodingError::NoMatch)
        ));
        assert!(matches!(
            client.reverse(0.0, 0.0).await,
            Err(GeocodingError::NoMatch)
        ));
    }

    #[tokio::test]
    async fn test_upstream_status_is_reported() {
        let base = format!("{}/broken", fake_nominatim().await);
        let client = GeocodingClient::new(base).unwrap();
        assert!(matches!(
            client.search("monas").await,
            Err(GeocodingError::Status(503))
        ));
    }
}
