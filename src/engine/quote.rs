use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use super::types::SwapQuote;
use crate::api::zeroex::{QuoteRequest, ZeroExApiClient, ZeroExError};
use crate::config::QuoteApiConfig;

/// 单个交易对的报价端口；规划器只依赖它，测试用假实现替换。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, ZeroExError>;
}

/// 基于 0x API 的报价源；`max_retries > 0` 时对瞬时错误做指数退避重试。
#[derive(Debug, Clone)]
pub struct ZeroExQuoter {
    client: ZeroExApiClient,
    retry: Option<ExponentialBuilder>,
}

impl ZeroExQuoter {
    pub fn new(client: ZeroExApiClient, config: &QuoteApiConfig) -> Self {
        let retry = (config.max_retries > 0).then(|| {
            ExponentialBuilder::default()
                .with_max_times(config.max_retries)
                .with_min_delay(Duration::from_millis(config.retry_min_delay_ms))
        });
        Self { client, retry }
    }

    pub fn retries_enabled(&self) -> bool {
        self.retry.is_some()
    }
}

#[async_trait]
impl QuoteSource for ZeroExQuoter {
    async fn quote(&self, request: &QuoteRequest) -> Result<SwapQuote, ZeroExError> {
        let response = match self.retry.clone() {
            Some(backoff) => {
                (|| async { self.client.quote(request).await })
                    .retry(backoff)
                    .when(|err: &ZeroExError| err.is_transient())
                    .notify(|err: &ZeroExError, delay: Duration| {
                        warn!(
                            target: "zeroex::quote",
                            buy_token = %request.buy_token,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "0x 报价失败，准备重试"
                        );
                    })
                    .await?
            }
            None => self.client.quote(request).await?,
        };
        Ok(SwapQuote::from_payload(
            request.sell_token,
            request.buy_token,
            response.into_payload(),
        ))
    }
}
