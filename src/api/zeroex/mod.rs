//! 0x Swap API（v1）报价封装。

pub mod quote;

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::api::summarize_error_body;
use crate::config::{LoggingConfig, LoggingProfile, QuoteApiConfig};

pub use quote::{LiquiditySource, QuoteRequest, QuoteResponse, QuoteResponsePayload};

const API_KEY_HEADER: &str = "0x-api-key";
const NO_LIQUIDITY_MARKER: &str = "INSUFFICIENT_ASSET_LIQUIDITY";

#[derive(Debug, Error)]
pub enum ZeroExError {
    #[error("0x API 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("请求 {endpoint} 超时（{timeout_ms}ms）")]
    Timeout {
        endpoint: String,
        timeout_ms: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("请求 {endpoint} 返回状态 {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("请求 {endpoint} 被限流，状态 {status}: {body}")]
    RateLimited {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("0x 响应结构不符合预期: {0}")]
    Schema(String),
    #[error("0x 找不到可用路由: {reason}")]
    NoRoute { reason: String },
}

impl ZeroExError {
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

    /// 超时、限流、连接失败与 5xx 可以重试；路由缺失与解析错误重试无意义。
    pub fn is_transient(&self) -> bool {
        match self {
            ZeroExError::Timeout { .. } | ZeroExError::RateLimited { .. } => true,
            ZeroExError::Http(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            ZeroExError::ApiStatus { status, .. } => status.is_server_error(),
            ZeroExError::Json(_) | ZeroExError::Schema(_) | ZeroExError::NoRoute { .. } => false,
        }
    }
}

#[derive(Clone)]
pub struct ZeroExApiClient {
    quote_url: String,
    client: reqwest::Client,
    api_key: Option<String>,
    quote_timeout: Duration,
    log_profile: LoggingProfile,
    slow_quote_warn_ms: u64,
}

impl fmt::Debug for ZeroExApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroExApiClient")
            .field("quote_url", &self.quote_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("quote_timeout", &self.quote_timeout)
            .field("log_profile", &self.log_profile)
            .field("slow_quote_warn_ms", &self.slow_quote_warn_ms)
            .finish()
    }
}

impl ZeroExApiClient {
    pub fn new(client: reqwest::Client, quote: &QuoteApiConfig, logging: &LoggingConfig) -> Self {
        Self {
            quote_url: quote.api_url.trim().to_string(),
            client,
            api_key: quote
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
            quote_timeout: Duration::from_millis(quote.timeout_ms),
            log_profile: logging.profile,
            slow_quote_warn_ms: logging.slow_quote_warn_ms,
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ZeroExError> {
        let url = self.quote_url.clone();
        let started = Instant::now();

        trace!(
            target: "zeroex::quote",
            sell_token = %request.sell_token,
            buy_token = %request.buy_token,
            amount = ?request.amount,
            slippage = ?request.slippage_percentage,
            excluded_sources = ?request.excluded_sources,
            "开始请求 0x 报价"
        );

        let params = request.to_query_params();
        let mut http_request = self
            .client
            .get(&url)
            .timeout(self.quote_timeout)
            .query(&params);
        if let Some(key) = self.api_key.as_ref() {
            http_request = http_request.header(API_KEY_HEADER, key);
        }

        let response = http_request.send().await.map_err(|err| {
            if err.is_timeout() {
                let timeout = self.quote_timeout.as_millis() as u64;
                warn!(
                    target: "zeroex::quote",
                    endpoint = %url,
                    timeout_ms = timeout,
                    "0x 报价请求超时"
                );
                ZeroExError::Timeout {
                    endpoint: url.clone(),
                    timeout_ms: timeout,
                    source: err,
                }
            } else {
                warn!(
                    target: "zeroex::quote",
                    endpoint = %url,
                    error = %err,
                    "0x 报价请求发送失败"
                );
                ZeroExError::from(err)
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                let timeout = self.quote_timeout.as_millis() as u64;
                warn!(
                    target: "zeroex::quote",
                    endpoint = %url,
                    timeout_ms = timeout,
                    "0x 报价读取响应超时"
                );
                ZeroExError::Timeout {
                    endpoint: url.clone(),
                    timeout_ms: timeout,
                    source: err,
                }
            } else {
                warn!(
                    target: "zeroex::quote",
                    endpoint = %url,
                    error = %err,
                    "0x 报价读取响应失败"
                );
                ZeroExError::from(err)
            }
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let summary = summarize_error_body(body);
            warn!(
                target: "zeroex::quote",
                endpoint = %url,
                status = status.as_u16(),
                body = %summary,
                "0x 报价命中限流"
            );
            return Err(ZeroExError::RateLimited {
                endpoint: url,
                status,
                body: summary,
            });
        }

        if !status.is_success() {
            let summary = summarize_error_body(body);
            if summary.contains(NO_LIQUIDITY_MARKER) {
                warn!(
                    target: "zeroex::quote",
                    sell_token = %request.sell_token,
                    buy_token = %request.buy_token,
                    "0x 报告流动性不足"
                );
                return Err(ZeroExError::NoRoute { reason: summary });
            }
            warn!(
                target: "zeroex::quote",
                endpoint = %url,
                status = status.as_u16(),
                body = %summary,
                "0x 报价返回非 200 状态"
            );
            return Err(ZeroExError::ApiStatus {
                endpoint: url,
                status,
                body: summary,
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|err| {
            warn!(
                target: "zeroex::quote",
                endpoint = %url,
                error = %err,
                "0x 报价 JSON 解析失败"
            );
            ZeroExError::Json(err)
        })?;

        let quote = QuoteResponse::try_from_value(json).map_err(|err| {
            warn!(
                target: "zeroex::quote",
                endpoint = %url,
                error = %err,
                "0x 报价 schema 校验失败"
            );
            ZeroExError::Schema(err.to_string())
        })?;

        let payload = quote.payload();
        if payload.data.is_empty() || payload.sell_amount.is_zero() {
            return Err(ZeroExError::NoRoute {
                reason: format!(
                    "{} -> {} 返回空调用数据或零卖出数量",
                    request.sell_token, request.buy_token
                ),
            });
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        if elapsed_ms > self.slow_quote_warn_ms as f64 {
            debug!(
                target: "zeroex::quote",
                elapsed_ms = format_args!("{elapsed_ms:.3}"),
                threshold_ms = self.slow_quote_warn_ms,
                "0x 报价耗时较长"
            );
        }
        log_quote(&quote, self.log_profile, elapsed_ms);

        Ok(quote)
    }
}

/// 输出报价摘要；只列出占比大于零的流动性来源。
fn log_quote(quote: &QuoteResponse, profile: LoggingProfile, elapsed_ms: f64) {
    let payload = quote.payload();
    let sources = quote
        .active_sources()
        .map(|source| format!("{}={}", source.name, source.proportion))
        .collect::<Vec<_>>()
        .join(",");
    if profile.is_verbose() {
        info!(
            target: "zeroex::quote",
            sell_token = ?payload.sell_token_address,
            buy_token = ?payload.buy_token_address,
            sell_amount = %payload.sell_amount,
            buy_amount = %payload.buy_amount,
            to = %payload.to,
            allowance_target = %payload.allowance_target,
            sources = %sources,
            elapsed_ms = format_args!("{elapsed_ms:.3}"),
            "0x 报价完成"
        );
    } else {
        debug!(
            target: "zeroex::quote",
            sell_amount = %payload.sell_amount,
            buy_amount = %payload.buy_amount,
            sources = %sources,
            elapsed_ms = format_args!("{elapsed_ms:.3}"),
            "0x 报价完成"
        );
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256, address};
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

    fn client_for(server: &MockServer, timeout_ms: u64, api_key: Option<&str>) -> ZeroExApiClient {
        let quote = QuoteApiConfig {
            api_url: server.url("/swap/v1/quote"),
            api_key: api_key.map(str::to_string),
            timeout_ms,
            ..QuoteApiConfig::default()
        };
        ZeroExApiClient::new(reqwest::Client::new(), &quote, &LoggingConfig::default())
    }

    fn quote_body() -> serde_json::Value {
        json!({
            "sellTokenAddress": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            "buyTokenAddress": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "sellAmount": "420000000000000000",
            "buyAmount": "1000000000000000000000",
            "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "allowanceTarget": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "data": "0x415565b0",
            "sources": [{"name": "Uniswap_V3", "proportion": "1"}]
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn quote_sends_query_and_api_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/swap/v1/quote")
                .query_param("sellToken", WETH.to_string())
                .query_param("buyToken", DAI.to_string())
                .query_param("buyAmount", "1000000000000000000000")
                .query_param("slippagePercentage", "0.05")
                .header("0x-api-key", "secret");
            then.status(200).json_body(quote_body());
        });

        let client = client_for(&server, 2_000, Some("secret"));
        let request = QuoteRequest::buy_exact(
            WETH,
            DAI,
            U256::from(1_000_000_000_000_000_000_000u128),
        )
        .with_slippage_percents(5);
        let quote = client.quote(&request).await.expect("quote");

        mock.assert();
        assert_eq!(
            quote.payload().sell_amount,
            U256::from(420_000_000_000_000_000u128)
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insufficient_liquidity_maps_to_no_route() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(400).json_body(json!({
                "code": 100,
                "reason": "Validation Failed",
                "validationErrors": [{
                    "field": "buyAmount",
                    "code": 1004,
                    "reason": "INSUFFICIENT_ASSET_LIQUIDITY"
                }]
            }));
        });

        let client = client_for(&server, 2_000, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("no route");
        assert!(matches!(err, ZeroExError::NoRoute { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rate_limit_is_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(429).body("slow down");
        });

        let client = client_for(&server, 2_000, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("rate limited");
        match &err {
            ZeroExError::RateLimited { status, body, .. } => {
                assert_eq!(*status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(503).body("upstream\nunavailable");
        });

        let client = client_for(&server, 2_000, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("status error");
        assert!(err.is_transient());
        assert!(err.describe().contains("upstream unavailable"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_response_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(quote_body());
        });

        let client = client_for(&server, 50, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("timeout");
        assert!(matches!(err, ZeroExError::Timeout { timeout_ms: 50, .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_call_data_is_no_route() {
        let server = MockServer::start();
        let mut body = quote_body();
        body["data"] = json!("0x");
        server.mock(move |when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(200).json_body(body.clone());
        });

        let client = client_for(&server, 2_000, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("no route");
        assert!(matches!(err, ZeroExError::NoRoute { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn malformed_payload_is_schema_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/swap/v1/quote");
            then.status(200).json_body(json!({"sellAmount": "not-a-number"}));
        });

        let client = client_for(&server, 2_000, None);
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1u64));
        let err = client.quote(&request).await.expect_err("schema");
        assert!(matches!(err, ZeroExError::Schema(_)));
    }
}
