//! Geolocation by public IP address.

use serde::Deserialize;

use daylux_app::ports::GeoLookup;
use daylux_domain::error::LookupError;
use daylux_domain::solar::Coordinates;

use crate::error::HttpError;

#[derive(Debug, Deserialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Client for an IP geolocation endpoint answering with `latitude` and
/// `longitude` fields (ipapi.co, freegeoip and compatible services).
#[derive(Debug, Clone)]
pub struct GeoIpClient {
    client: reqwest::Client,
    url: String,
}

impl GeoIpClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn request(&self) -> Result<Coordinates, HttpError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        let body = response.text().await?;
        let location: Location = serde_json::from_str(&body).map_err(HttpError::Body)?;

        let latitude = location.latitude.ok_or(HttpError::Field("latitude"))?;
        let longitude = location.longitude.ok_or(HttpError::Field("longitude"))?;
        let coordinates = Coordinates::new(latitude, longitude);
        if !coordinates.is_valid() {
            return Err(HttpError::Field("latitude"));
        }
        Ok(coordinates)
    }
}

impl GeoLookup for GeoIpClient {
    async fn locate(&self) -> Result<Coordinates, LookupError> {
        Ok(self.request().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(body: ResponseTemplate) -> (MockServer, GeoIpClient) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(body)
            .mount(&server)
            .await;
        let client = GeoIpClient::new(reqwest::Client::new(), format!("{}/json/", server.uri()));
        (server, client)
    }

    #[tokio::test]
    async fn should_read_coordinates() {
        let (_server, client) = setup(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "city": "Amsterdam",
            "latitude": 52.3676,
            "longitude": 4.9041
        })))
        .await;

        let coordinates = client.locate().await.unwrap();

        assert_eq!(coordinates, Coordinates::new(52.3676, 4.9041));
    }

    #[tokio::test]
    async fn should_reject_null_coordinates() {
        let (_server, client) = setup(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "latitude": null,
            "longitude": 4.9041
        })))
        .await;

        let err = client.locate().await.unwrap_err();

        assert!(matches!(err, LookupError::Malformed { field: "latitude" }));
    }

    #[tokio::test]
    async fn should_report_rate_limiting_as_status() {
        let (_server, client) = setup(ResponseTemplate::new(429)).await;
        let err = client.locate().await.unwrap_err();
        assert!(matches!(err, LookupError::Status { status } if status.starts_with("429")));
    }

    #[tokio::test]
    async fn should_report_invalid_body_as_unreachable() {
        let (_server, client) = setup(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let err = client.locate().await.unwrap_err();
        assert!(matches!(err, LookupError::Unreachable(_)));
    }
}
