//! algod REST v2 transport.

use super::{
    AccountInformation, AssetHolding, GlobalState, LedgerTransport, SimulateRequest,
    SimulateResponse, SimulatedTransaction, SuggestedParams, TealValue,
};
use crate::error::{Result, TransportError};
use crate::transaction::Transaction;
use crate::transaction::encoding::encode_simulate_request;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dualstake_domain::Address;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Public mainnet node.
pub const DEFAULT_ALGOD_URL: &str = "https://mainnet-api.4160.nodely.dev";

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Node connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    /// Base URL without a trailing slash.
    pub url: String,
    /// API token; empty for public nodes.
    pub token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ALGOD_URL.to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// [`LedgerTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct RpcProvider {
    config: RpcConfig,
    client: reqwest::Client,
}

impl RpcProvider {
    /// Creates a provider.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(config: RpcConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TransportError::from)?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        if self.config.token.is_empty() {
            builder
        } else {
            builder.header(TOKEN_HEADER, &self.config.token)
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(TransportError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        let body = response.bytes().await.map_err(TransportError::from)?;
        serde_json::from_slice(&body)
            .map_err(|e| TransportError::Malformed(e.to_string()).into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        self.send(self.request(reqwest::Method::GET, path)).await
    }
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| TransportError::Malformed(format!("{field}: {e}")).into())
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParamsResponse {
    fee: u64,
    min_fee: u64,
    last_round: u64,
    genesis_id: String,
    genesis_hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AccountResponse {
    address: String,
    amount: u64,
    #[serde(default)]
    assets: Vec<HoldingResponse>,
    #[serde(default)]
    incentive_eligible: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HoldingResponse {
    asset_id: u64,
    amount: u64,
}

#[derive(Deserialize)]
struct ApplicationResponse {
    params: ApplicationParams,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ApplicationParams {
    #[serde(default)]
    global_state: Vec<StateEntry>,
}

#[derive(Deserialize)]
struct StateEntry {
    key: String,
    value: StateValue,
}

#[derive(Deserialize)]
struct StateValue {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    bytes: String,
    #[serde(default)]
    uint: u64,
}

#[derive(Deserialize)]
struct BoxesResponse {
    boxes: Vec<BoxDescriptor>,
}

#[derive(Deserialize)]
struct BoxDescriptor {
    name: String,
}

#[derive(Deserialize)]
struct BoxResponse {
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SimulateEnvelope {
    last_round: u64,
    txn_groups: Vec<SimulatedGroup>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SimulatedGroup {
    #[serde(default)]
    failure_message: Option<String>,
    #[serde(default)]
    txn_results: Vec<SimulatedResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SimulatedResult {
    txn_result: PendingTransaction,
}

#[derive(Deserialize)]
struct PendingTransaction {
    #[serde(default)]
    logs: Vec<String>,
}

#[derive(Deserialize)]
struct CompileResponse {
    result: String,
}

#[async_trait]
impl LedgerTransport for RpcProvider {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let response: ParamsResponse = self.get("/v2/transactions/params").await?;
        let hash = decode_b64("genesis-hash", &response.genesis_hash)?;
        let genesis_hash: [u8; 32] = hash
            .try_into()
            .map_err(|_| TransportError::Malformed("genesis-hash is not 32 bytes".to_string()))?;
        Ok(SuggestedParams {
            fee_per_byte: response.fee,
            min_fee: response.min_fee,
            last_round: response.last_round,
            genesis_id: response.genesis_id,
            genesis_hash,
        })
    }

    async fn account_information(&self, address: &Address) -> Result<AccountInformation> {
        let response: AccountResponse = self.get(&format!("/v2/accounts/{address}")).await?;
        Ok(AccountInformation {
            address: response.address.parse()?,
            amount: response.amount,
            assets: response
                .assets
                .into_iter()
                .map(|h| AssetHolding {
                    asset_id: h.asset_id,
                    amount: h.amount,
                })
                .collect(),
            incentive_eligible: response.incentive_eligible,
        })
    }

    async fn application_global_state(&self, app_id: u64) -> Result<GlobalState> {
        let response: ApplicationResponse = self.get(&format!("/v2/applications/{app_id}")).await?;
        let mut state = HashMap::with_capacity(response.params.global_state.len());
        for entry in response.params.global_state {
            let key = decode_b64("global-state key", &entry.key)?;
            let value = match entry.value.kind {
                1 => TealValue::Bytes(decode_b64("global-state value", &entry.value.bytes)?),
                2 => TealValue::Uint(entry.value.uint),
                other => {
                    return Err(TransportError::Malformed(format!(
                        "unknown global-state value type {other}"
                    ))
                    .into());
                }
            };
            state.insert(key, value);
        }
        Ok(GlobalState(state))
    }

    async fn application_box_names(&self, app_id: u64) -> Result<Vec<Vec<u8>>> {
        let response: BoxesResponse = self
            .get(&format!("/v2/applications/{app_id}/boxes"))
            .await?;
        response
            .boxes
            .iter()
            .map(|b| decode_b64("box name", &b.name))
            .collect()
    }

    async fn application_box(&self, app_id: u64, name: &[u8]) -> Result<Vec<u8>> {
        let path = format!("/v2/applications/{app_id}/box");
        debug!(path, "GET");
        let builder = self
            .request(reqwest::Method::GET, &path)
            .query(&[("name", format!("b64:{}", BASE64.encode(name)))]);
        let response: BoxResponse = self.send(builder).await?;
        decode_b64("box value", &response.value)
    }

    async fn simulate(
        &self,
        txns: &[Transaction],
        request: &SimulateRequest,
    ) -> Result<SimulateResponse> {
        let body = encode_simulate_request(txns, request)?;
        debug!(
            txns = txns.len(),
            budget = request.extra_opcode_budget,
            "Simulating group"
        );
        let builder = self
            .request(reqwest::Method::POST, "/v2/transactions/simulate")
            .query(&[("format", "json")])
            .header(reqwest::header::CONTENT_TYPE, "application/msgpack")
            .body(body);
        let envelope: SimulateEnvelope = self.send(builder).await?;

        let group = envelope
            .txn_groups
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Malformed("simulate returned no groups".to_string()))?;
        if let Some(message) = group.failure_message.filter(|m| !m.is_empty()) {
            warn!(%message, "Simulation failed");
            return Err(TransportError::Simulation(message).into());
        }

        let mut results = Vec::with_capacity(group.txn_results.len());
        for result in group.txn_results {
            let logs = result
                .txn_result
                .logs
                .iter()
                .map(|l| decode_b64("log", l))
                .collect::<Result<Vec<_>>>()?;
            results.push(SimulatedTransaction { logs });
        }
        Ok(SimulateResponse {
            last_round: envelope.last_round,
            results,
        })
    }

    async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        let builder = self
            .request(reqwest::Method::POST, "/v2/teal/compile")
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(source.to_string());
        let response: CompileResponse = self.send(builder).await?;
        decode_b64("compile result", &response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RpcConfig::default();
        assert_eq!(config.url, DEFAULT_ALGOD_URL);
        assert!(config.token.is_empty());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_url_joining() {
        let provider = RpcProvider::new(RpcConfig {
            url: "http://localhost:4001/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            provider.url("/v2/status"),
            "http://localhost:4001/v2/status"
        );
    }

    #[test]
    fn test_simulate_envelope_parsing() {
        let json = r#"{
            "last-round": 42,
            "version": 2,
            "txn-groups": [{
                "txn-results": [{"txn-result": {"logs": ["AQI="], "pool-error": ""}}]
            }]
        }"#;
        let envelope: SimulateEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.last_round, 42);
        assert_eq!(envelope.txn_groups[0].txn_results[0].txn_result.logs, vec!["AQI="]);
        assert!(envelope.txn_groups[0].failure_message.is_none());
    }

    #[test]
    fn test_global_state_entry_parsing() {
        let json = r#"{"params": {"global-state": [
            {"key": "dmVyc2lvbg==", "value": {"type": 2, "uint": 3, "bytes": ""}},
            {"key": "bHBfdHlwZQ==", "value": {"type": 1, "bytes": "dG0y", "uint": 0}}
        ]}}"#;
        let response: ApplicationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.params.global_state.len(), 2);
        assert_eq!(decode_b64("k", &response.params.global_state[0].key).unwrap(), b"version");
    }
}
