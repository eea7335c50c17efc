//! HTTP clients for the recommendation and pricing services

use anyhow::{Context, Result};
use async_trait::async_trait;
use engine_lib::pricing::{PriceQuery, PricingPort};
use engine_lib::recommend::{RecommendQuery, RecommendationPort};
use engine_lib::PortError;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// JSON-over-HTTP client shared by both ports
struct ServiceClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ServiceClient {
    fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // Url::join replaces the last segment unless the base ends with '/'
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).with_context(|| format!("Invalid service URL: {}", base_url))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, PortError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PortError::Transport(format!("invalid path {}: {}", path, e)))?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("malformed reply: {}", e)))
    }

    fn send_error(&self, err: reqwest::Error) -> PortError {
        if err.is_timeout() {
            PortError::Timeout(self.timeout)
        } else {
            PortError::Transport(err.to_string())
        }
    }
}

/// Error payload the services attach to a refused request
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
}

/// A 404 is a semantic miss only when the service says so in the body,
/// e.g. `{"code": "InvalidInstanceType.NotFound"}`. A bare 404 means the
/// endpoint itself is wrong.
fn is_not_found_reply(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.code.to_ascii_lowercase().contains("notfound"))
        .unwrap_or(false)
}

fn status_error(status: StatusCode, body: String) -> PortError {
    let detail = format!("API error ({}): {}", status, body);
    if status == StatusCode::NOT_FOUND {
        if is_not_found_reply(&body) {
            PortError::NotFound(detail)
        } else {
            PortError::Transport(detail)
        }
    } else if status.is_client_error() {
        PortError::Rejected(detail)
    } else {
        PortError::Transport(detail)
    }
}

#[derive(Debug, Serialize)]
struct RecommendRequest<'a> {
    region: &'a str,
    charge_type: &'static str,
    #[serde(flatten)]
    query: &'a RecommendQuery,
}

#[derive(Debug, Deserialize)]
struct RecommendResponse {
    #[serde(default)]
    instance_types: Vec<String>,
}

/// Recommendation service client
pub struct HttpRecommendationPort {
    service: ServiceClient,
    region: String,
}

impl HttpRecommendationPort {
    pub fn new(base_url: &str, region: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service: ServiceClient::new(base_url, timeout)?,
            region: region.to_string(),
        })
    }
}

#[async_trait]
impl RecommendationPort for HttpRecommendationPort {
    async fn recommend(&self, query: &RecommendQuery) -> std::result::Result<String, PortError> {
        let request = RecommendRequest {
            region: &self.region,
            charge_type: query.billing_term.charge_type(),
            query,
        };
        let response: RecommendResponse = self.service.post("recommend", &request).await?;
        response
            .instance_types
            .into_iter()
            .next()
            .ok_or(PortError::EmptyResult)
    }
}

#[derive(Debug, Serialize)]
struct PriceRequest<'a> {
    charge_type: &'static str,
    price_unit: &'static str,
    #[serde(flatten)]
    query: &'a PriceQuery,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    amount: Decimal,
}

/// Pricing service client
pub struct HttpPricingPort {
    service: ServiceClient,
}

impl HttpPricingPort {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            service: ServiceClient::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PricingPort for HttpPricingPort {
    async fn get_price(&self, query: &PriceQuery) -> std::result::Result<Decimal, PortError> {
        let request = PriceRequest {
            charge_type: query.billing_term.charge_type(),
            price_unit: query.billing_term.price_unit(),
            query,
        };
        let response: PriceResponse = self.service.post("price", &request).await?;
        Ok(response.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_lib::pricing::{DiskCategory, DiskSizes};
    use engine_lib::recommend::PriorityRule;
    use engine_lib::BillingTerm;
    use mockito::Matcher;
    use serde_json::json;

    fn recommend_query() -> RecommendQuery {
        RecommendQuery {
            cpu_cores: 16,
            memory_gb: 64.0,
            billing_term: BillingTerm::Monthly,
            strategy_name: "gen8-inventory".to_string(),
            priority: PriorityRule::InventoryFirst,
            family_restriction: Some(vec!["ecs.g8y".to_string()]),
        }
    }

    fn price_query() -> PriceQuery {
        PriceQuery {
            sku: "ecs.g8y.4xlarge".to_string(),
            region: "cn-beijing".to_string(),
            billing_term: BillingTerm::Annual,
            cpu_cores: 16,
            memory_gb: 64.0,
            disk_category: DiskCategory::CloudEssd,
            performance_level: Some("PL0".to_string()),
            disk_sizes: DiskSizes::default(),
        }
    }

    #[tokio::test]
    async fn test_recommend_takes_first_instance_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/recommend")
            .match_body(Matcher::PartialJson(json!({
                "region": "cn-beijing",
                "charge_type": "PrePaid",
                "priority": "InventoryFirst",
                "family_restriction": ["ecs.g8y"],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"instance_types": ["ecs.g8y.4xlarge", "ecs.g8y.8xlarge"]}"#)
            .create_async()
            .await;

        let port =
            HttpRecommendationPort::new(&server.url(), "cn-beijing", Duration::from_secs(5)).unwrap();
        let sku = port.recommend(&recommend_query()).await.unwrap();

        assert_eq!(sku, "ecs.g8y.4xlarge");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_recommend_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/recommend")
            .with_status(200)
            .with_body(r#"{"instance_types": []}"#)
            .create_async()
            .await;

        let port =
            HttpRecommendationPort::new(&server.url(), "cn-beijing", Duration::from_secs(5)).unwrap();
        let err = port.recommend(&recommend_query()).await.unwrap_err();
        assert_eq!(err, PortError::EmptyResult);
    }

    #[tokio::test]
    async fn test_price_request_and_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/price")
            .match_body(Matcher::PartialJson(json!({
                "sku": "ecs.g8y.4xlarge",
                "price_unit": "Year",
                "disk_category": "cloud_essd",
                "performance_level": "PL0",
                "disk_sizes": {"system_gb": 40},
            })))
            .with_status(200)
            .with_body(r#"{"amount": "21600.00"}"#)
            .create_async()
            .await;

        let base = format!("{}/v1", server.url());
        let port = HttpPricingPort::new(&base, Duration::from_secs(5)).unwrap();
        let amount = port.get_price(&price_query()).await.unwrap();

        assert_eq!(amount, Decimal::new(2160000, 2));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let not_found = r#"{"code": "InvalidInstanceType.NotFound", "message": "no tariff"}"#;
        let cases = [
            (404, not_found, "not_found"),
            (404, "<html>404 page not found</html>", "transport"),
            (404, r#"{"code": "Throttling"}"#, "transport"),
            (400, "bad region", "rejected"),
            (503, "unavailable", "transport"),
        ];

        for (status, body, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/price")
                .with_status(status)
                .with_body(body)
                .create_async()
                .await;

            let port = HttpPricingPort::new(&server.url(), Duration::from_secs(5)).unwrap();
            let err = port.get_price(&price_query()).await.unwrap_err();
            let kind = match err {
                PortError::NotFound(_) => "not_found",
                PortError::Rejected(_) => "rejected",
                PortError::Transport(_) => "transport",
                _ => "other",
            };
            assert_eq!(kind, expected, "status {} body {}", status, body);
        }
    }

    #[tokio::test]
    async fn test_malformed_reply_is_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/price")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let port = HttpPricingPort::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = port.get_price(&price_query()).await.unwrap_err();
        assert!(matches!(err, PortError::Transport(ref m) if m.contains("malformed")));
    }

    #[tokio::test]
    async fn test_slow_service_is_timeout() {
        // Accepts the connection and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let timeout = Duration::from_millis(200);
        let port = HttpPricingPort::new(&format!("http://{}", addr), timeout).unwrap();
        let err = port.get_price(&price_query()).await.unwrap_err();

        assert_eq!(err, PortError::Timeout(timeout));
        silent.abort();
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport() {
        let port = HttpPricingPort::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = port.get_price(&price_query()).await.unwrap_err();
        assert!(matches!(err, PortError::Transport(_) | PortError::Timeout(_)));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(HttpPricingPort::new("not a url", Duration::from_secs(1)).is_err());
    }
}
