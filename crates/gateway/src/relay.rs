use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::classify::classify_failure;
use crate::types::{CastReceipt, GatewayError, GatewayOutcome, RemoteTally};
use crate::LedgerGateway;

/// Connection settings for [`HttpRelayGateway`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay, e.g. `http://127.0.0.1:8545/ledger`.
    pub base_url: String,
    /// Sent as a bearer token when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "RelayConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl RelayConfig {
    fn default_request_timeout_ms() -> u64 {
        10_000
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Serialize)]
struct CastRequest<'a> {
    voter_name: &'a str,
    candidate_id: &'a str,
}

#[derive(Deserialize)]
struct CastResponse {
    tx_hash: String,
    #[serde(default)]
    block_number: Option<u64>,
}

#[derive(Deserialize)]
struct VoterResponse {
    has_voted: bool,
}

#[derive(Deserialize)]
struct ResultsResponse {
    results: RemoteTally,
}

/// Gateway speaking JSON to a relay service that fronts the voting contract.
///
/// - `POST {base}/votes` with `{voter_name, candidate_id}` returns `{tx_hash, block_number}`.
/// - `GET {base}/voters/{name}` returns `{has_voted}`.
/// - `GET {base}/results` returns `{results: {candidate: count}}`.
///
/// Non-success statuses go through [`classify_failure`]. Transport errors
/// are always recoverable; their text carries the URL and is never inspected.
#[derive(Debug, Clone)]
pub struct HttpRelayGateway {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl HttpRelayGateway {
    pub fn new(cfg: RelayConfig) -> Result<Self, GatewayError> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|e| GatewayError::InvalidConfig(format!("base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidConfig(format!(
                "base_url cannot be a base: {}",
                cfg.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base,
            api_key: cfg.api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, String> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| describe_transport_error(&e))
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("relay request timed out: {error}")
    } else if error.is_connect() {
        format!("relay connection failed: {error}")
    } else {
        format!("relay request failed: {error}")
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> GatewayOutcome<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return classify_failure(Some(status.as_u16()), &body);
    }
    match response.json::<T>().await {
        Ok(value) => GatewayOutcome::Success(value),
        Err(e) => GatewayOutcome::RecoverableFailure(format!("malformed relay response: {e}")),
    }
}

#[async_trait]
impl LedgerGateway for HttpRelayGateway {
    fn name(&self) -> &str {
        "http_relay"
    }

    async fn cast_vote(&self, identity: &str, candidate_id: &str) -> GatewayOutcome<CastReceipt> {
        let request = self.client.post(self.endpoint(&["votes"])).json(&CastRequest {
            voter_name: identity,
            candidate_id,
        });
        match self.send(request).await {
            Ok(response) => read_json::<CastResponse>(response).await.map(|body| CastReceipt {
                tx_ref: body.tx_hash,
                block_number: body.block_number,
            }),
            Err(reason) => GatewayOutcome::RecoverableFailure(reason),
        }
    }

    async fn has_voted(&self, identity: &str) -> GatewayOutcome<bool> {
        let request = self.client.get(self.endpoint(&["voters", identity]));
        match self.send(request).await {
            Ok(response) => read_json::<VoterResponse>(response)
                .await
                .map(|body| body.has_voted),
            Err(reason) => GatewayOutcome::RecoverableFailure(reason),
        }
    }

    async fn tally_results(&self) -> GatewayOutcome<RemoteTally> {
        let request = self.client.get(self.endpoint(&["results"]));
        match self.send(request).await {
            Ok(response) => read_json::<ResultsResponse>(response)
                .await
                .map(|body| body.results),
            Err(reason) => GatewayOutcome::RecoverableFailure(reason),
        }
    }
}
