//! Etherscan 合约 ABI 查询，用于把 0x 调用数据的选择器还原成函数签名。

use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, FixedBytes};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::summarize_error_body;
use crate::config::EtherscanConfig;

#[derive(Debug, Error)]
pub enum EtherscanError {
    #[error("Etherscan 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Etherscan 返回状态 {status}: {body}")]
    ApiStatus { status: StatusCode, body: String },
    #[error("Etherscan 拒绝查询 {address}: {message}")]
    Rejected { address: Address, message: String },
    #[error("合约 {address} 的 ABI 无法解析: {source}")]
    Abi {
        address: Address,
        #[source]
        source: serde_json::Error,
    },
    #[error("响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
}

impl EtherscanError {
    pub fn describe(&self) -> String {
        use std::error::Error as _;
        let mut parts = vec![self.to_string()];
        let mut current = self.source();
        while let Some(err) = current {
            let text = err.to_string();
            if parts.last().map(|last| last == &text).unwrap_or(false) {
                current = err.source();
                continue;
            }
            parts.push(text);
            current = err.source();
        }
        parts.join(" | caused by: ")
    }
}

#[derive(Debug, Deserialize)]
struct EtherscanEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

#[derive(Debug, Clone)]
pub struct EtherscanClient {
    api_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl EtherscanClient {
    pub fn new(client: reqwest::Client, config: &EtherscanConfig) -> Self {
        Self {
            api_url: config.api_url.trim().to_string(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            client,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// `module=contract&action=getabi`，`result` 字段本身是一段 JSON 字符串。
    pub async fn fetch_abi(&self, address: Address) -> Result<JsonAbi, EtherscanError> {
        let mut params = vec![
            ("module", "contract".to_string()),
            ("action", "getabi".to_string()),
            ("address", address.to_string()),
        ];
        if let Some(key) = self.api_key.as_ref() {
            params.push(("apikey", key.clone()));
        }

        let response = self
            .client
            .get(&self.api_url)
            .timeout(self.timeout)
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let summary = summarize_error_body(body);
            warn!(
                target: "etherscan",
                status = status.as_u16(),
                body = %summary,
                "Etherscan 返回非 200 状态"
            );
            return Err(EtherscanError::ApiStatus {
                status,
                body: summary,
            });
        }

        let envelope: EtherscanEnvelope = serde_json::from_str(&body)?;
        if envelope.status != "1" {
            return Err(EtherscanError::Rejected {
                address,
                message: format!("{} ({})", envelope.message, envelope.result),
            });
        }

        let abi: JsonAbi = serde_json::from_str(&envelope.result)
            .map_err(|source| EtherscanError::Abi { address, source })?;
        debug!(
            target: "etherscan",
            %address,
            functions = abi.functions().count(),
            "已获取合约 ABI"
        );
        Ok(abi)
    }
}

/// 在 ABI 中查找选择器对应的函数签名，例如 `transformERC20(address,address,uint256,uint256,(uint32,bytes)[])`。
pub fn function_signature(abi: &JsonAbi, selector: FixedBytes<4>) -> Option<String> {
    abi.functions()
        .find(|function| function.selector() == selector)
        .map(|function| function.signature())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, fixed_bytes};
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const PROXY: Address = address!("Def1C0ded9bec7F1a1670819833240f027b25EfF");

    fn client_for(server: &MockServer) -> EtherscanClient {
        let config = EtherscanConfig {
            api_url: server.url("/api"),
            api_key: Some("key".to_string()),
            timeout_ms: 2_000,
        };
        EtherscanClient::new(reqwest::Client::new(), &config)
    }

    fn sample_abi() -> String {
        json!([{
            "type": "function",
            "name": "getFunctionImplementation",
            "inputs": [{"name": "selector", "type": "bytes4"}],
            "outputs": [{"name": "impl", "type": "address"}],
            "stateMutability": "view"
        }])
        .to_string()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetches_and_resolves_selector() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("module", "contract")
                .query_param("action", "getabi")
                .query_param("address", PROXY.to_string())
                .query_param("apikey", "key");
            then.status(200).json_body(json!({
                "status": "1",
                "message": "OK",
                "result": sample_abi()
            }));
        });

        let abi = client_for(&server).fetch_abi(PROXY).await.expect("abi");
        mock.assert();

        let selector = abi
            .functions()
            .next()
            .map(|function| function.selector())
            .expect("function");
        assert_eq!(
            function_signature(&abi, selector).as_deref(),
            Some("getFunctionImplementation(bytes4)")
        );
        assert!(function_signature(&abi, fixed_bytes!("deadbeef")).is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unverified_contract_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Contract source code not verified"
            }));
        });

        let err = client_for(&server).fetch_abi(PROXY).await.expect_err("rejected");
        match err {
            EtherscanError::Rejected { address, message } => {
                assert_eq!(address, PROXY);
                assert!(message.contains("not verified"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn malformed_abi_is_described_with_its_cause() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "status": "1",
                "message": "OK",
                "result": "not an abi"
            }));
        });

        let err = client_for(&server).fetch_abi(PROXY).await.expect_err("bad abi");
        assert!(matches!(err, EtherscanError::Abi { address, .. } if address == PROXY));
        let described = err.describe();
        assert!(described.starts_with(&err.to_string()));
        assert!(described.contains(" | caused by: "));
    }
}
