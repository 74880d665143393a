//! HTTP gateway client
//!
//! Talks to a relay gateway that holds the operator wallet and exposes two
//! JSON endpoints:
//!
//! - `POST {endpoint}/runGetMethod` with `{address, method, stack}`
//! - `POST {endpoint}/sendMessage` with `{destination, value, body}`
//!
//! Both answer `{ok, result}` on success and `{ok: false, error, code}` on
//! failure.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use relay_core::types::NetworkConfig;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::address::Address;
use crate::cell::Cell;
use crate::client::{LedgerClient, StackValue, TransactionResult};
use crate::coins::Coins;
use crate::error::{LedgerError, Result};

const API_KEY_HEADER: &str = "X-API-Key";

pub struct GatewayClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    /// Client for `endpoint` with a per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| LedgerError::Encoding("API key is not a valid header value".into()))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("contest-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(network: &NetworkConfig) -> Result<Self> {
        Self::new(
            network.endpoint.clone(),
            Duration::from_secs(network.http_timeout_secs),
            network.api_key.as_deref(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, route);
        trace!(url = %url, "gateway request");

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LedgerError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<R> = response.json().await?;
        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            (_, _) => Err(LedgerError::Gateway {
                // a refusal without a status code is treated as a server fault
                status: envelope.code.unwrap_or(500),
                message: envelope
                    .error
                    .unwrap_or_else(|| format!("{} returned no result", route)),
            }),
        }
    }
}

#[async_trait]
impl LedgerClient for GatewayClient {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn send(&self, destination: &Address, value: Coins, body: Cell) -> Result<TransactionResult> {
        let request = SendMessageRequest {
            destination: destination.to_string(),
            value: value.nanos().to_string(),
            body: STANDARD.encode(body.to_bytes()),
        };
        debug!(destination = %destination, value = %value, "sending message");

        let result: SendMessageResult = self.post("sendMessage", &request).await?;
        Ok(TransactionResult { hash: result.hash })
    }

    async fn read(&self, address: &Address, method: &str, args: &[StackValue]) -> Result<Vec<StackValue>> {
        let request = RunGetMethodRequest {
            address: address.to_string(),
            method,
            stack: args.iter().map(WireStackEntry::from).collect(),
        };
        debug!(address = %address, method = method, "running get-method");

        let result: RunGetMethodResult = self.post("runGetMethod", &request).await?;
        if result.exit_code != 0 {
            return Err(LedgerError::ExitCode {
                method: method.to_string(),
                exit_code: result.exit_code,
            });
        }

        result
            .stack
            .into_iter()
            .map(|entry| entry.into_stack_value(method))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<R> {
    ok: bool,
    result: Option<R>,
    error: Option<String>,
    code: Option<u16>,
}

#[derive(Debug, Serialize)]
struct RunGetMethodRequest<'a> {
    address: String,
    method: &'a str,
    stack: Vec<WireStackEntry>,
}

#[derive(Debug, Deserialize)]
struct RunGetMethodResult {
    exit_code: i32,
    #[serde(default)]
    stack: Vec<WireStackEntry>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    destination: String,
    value: String,
    body: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResult {
    hash: String,
}

/// Stack entry as exchanged with the gateway; integers travel as decimal strings
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireStackEntry {
    Num { value: String },
    Address { value: String },
    Null,
}

impl From<&StackValue> for WireStackEntry {
    fn from(value: &StackValue) -> Self {
        match value {
            StackValue::Int(n) => WireStackEntry::Num {
                value: n.to_string(),
            },
            StackValue::Address(address) => WireStackEntry::Address {
                value: address.to_string(),
            },
            StackValue::Null => WireStackEntry::Null,
        }
    }
}

impl WireStackEntry {
    fn into_stack_value(self, method: &str) -> Result<StackValue> {
        match self {
            WireStackEntry::Num { value } => value
                .parse()
                .map(StackValue::Int)
                .map_err(|_| LedgerError::unexpected_stack(method, format!("bad integer '{}'", value))),
            WireStackEntry::Address { value } => Address::parse(&value)
                .map(StackValue::Address)
                .map_err(|e| LedgerError::unexpected_stack(method, e.to_string())),
            WireStackEntry::Null => Ok(StackValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;
    use relay_core::retry::RetryExecutor;
    use relay_core::types::{RetryPolicy, RetryStrategy};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FACTORY: &str = "EQAU5chXz9IKIIqCbYCfHpOGfaF-Ec1Mq2_VMWQoJU2SvSJK";
    const CONTEST: &str = "0QAAtvnToc06nocyxbD7li70OiXoA8gQ_i3XOwigizwC0gVq";

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GatewayClient {
        GatewayClient::new(
            format!("{}/api/v2/", server.uri()),
            Duration::from_secs(5),
            api_key,
        )
        .unwrap()
    }

    fn factory() -> Address {
        Address::parse(FACTORY).unwrap()
    }

    fn get_method_ok(stack: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "exit_code": 0, "stack": stack }
        }))
    }

    #[tokio::test]
    async fn test_read_sends_arguments_and_parses_stack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .and(body_json(json!({
                "address": FACTORY,
                "method": "get_contest_address",
                "stack": [{ "type": "num", "value": "3" }]
            })))
            .respond_with(get_method_ok(json!([{ "type": "address", "value": CONTEST }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let stack = client
            .read(&factory(), "get_contest_address", &[StackValue::Int(3)])
            .await
            .unwrap();

        assert_eq!(stack, vec![StackValue::Address(Address::parse(CONTEST).unwrap())]);
    }

    #[tokio::test]
    async fn test_read_null_and_negative_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .respond_with(get_method_ok(json!([
                { "type": "null" },
                { "type": "num", "value": "-1" }
            ])))
            .mount(&server)
            .await;

        let stack = client_for(&server, None)
            .read(&factory(), "get_contest_address", &[])
            .await
            .unwrap();

        assert_eq!(stack, vec![StackValue::Null, StackValue::Int(-1)]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_code_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "exit_code": 11, "stack": [] }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .read(&factory(), "get_contest_count", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ExitCode { exit_code: 11, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_http_status_classification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .and(body_partial_json(json!({ "method": "get_contest_count" })))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .and(body_partial_json(json!({ "method": "get_status" })))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown method"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);

        let server_err = client.read(&factory(), "get_contest_count", &[]).await.unwrap_err();
        assert!(matches!(server_err, LedgerError::Gateway { status: 503, .. }));
        assert!(server_err.is_transient());

        let client_err = client.read(&factory(), "get_status", &[]).await.unwrap_err();
        assert!(matches!(client_err, LedgerError::Gateway { status: 400, .. }));
        assert!(!client_err.is_transient());
    }

    #[tokio::test]
    async fn test_refusal_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error": "rate limit exceeded",
                "code": 429
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .read(&factory(), "get_contest_count", &[])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("rate limit exceeded"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_send_encodes_value_and_body() {
        let body = CellBuilder::new()
            .store_uint(2854811286, 32)
            .unwrap()
            .store_uint(0, 64)
            .unwrap()
            .build();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/sendMessage"))
            .and(header("X-API-Key", "secret"))
            .and(body_json(json!({
                "destination": CONTEST,
                "value": "100000000",
                "body": STANDARD.encode(body.to_bytes()),
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "hash": "b5ee9c72" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, Some("secret"))
            .send(
                &Address::parse(CONTEST).unwrap(),
                Coins::parse("0.1").unwrap(),
                body,
            )
            .await
            .unwrap();

        assert_eq!(result.hash, "b5ee9c72");
    }

    #[tokio::test]
    async fn test_executor_retries_flaky_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v2/runGetMethod"))
            .respond_with(get_method_ok(json!([{ "type": "num", "value": "7" }])))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let address = factory();
        let executor = RetryExecutor::builder()
            .with_policy(RetryPolicy {
                max_attempts: 3,
                strategy: RetryStrategy::None,
                jitter_ms: 0,
                ..RetryPolicy::default()
            })
            .with_predicate(crate::client::TransientLedgerErrors)
            .build();

        let stack = executor
            .execute(|| client.read(&address, "get_contest_count", &[]))
            .await
            .unwrap();

        assert_eq!(stack, vec![StackValue::Int(7)]);
    }
}
