use alloy::primitives::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::serde_helpers::{field_as_string, option_field_as_string};

/// 报价方向：按卖出数量询价，或按精确买入数量反推卖出数量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAmount {
    Sell(U256),
    Buy(U256),
}

impl TradeAmount {
    fn query_param(&self) -> (&'static str, String) {
        match self {
            TradeAmount::Sell(amount) => ("sellAmount", amount.to_string()),
            TradeAmount::Buy(amount) => ("buyAmount", amount.to_string()),
        }
    }
}

/// `/swap/v1/quote` 请求，以查询字符串传参。
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub sell_token: Address,
    pub buy_token: Address,
    pub amount: TradeAmount,
    /// 0 到 1 之间的小数，例如 5% 记为 0.05。
    pub slippage_percentage: Option<Decimal>,
    /// 逗号分隔的流动性来源黑名单。
    pub excluded_sources: Option<String>,
}

impl QuoteRequest {
    pub fn buy_exact(sell_token: Address, buy_token: Address, buy_amount: U256) -> Self {
        Self {
            sell_token,
            buy_token,
            amount: TradeAmount::Buy(buy_amount),
            slippage_percentage: None,
            excluded_sources: None,
        }
    }

    pub fn sell_exact(sell_token: Address, buy_token: Address, sell_amount: U256) -> Self {
        Self {
            sell_token,
            buy_token,
            amount: TradeAmount::Sell(sell_amount),
            slippage_percentage: None,
            excluded_sources: None,
        }
    }

    /// 以整数百分比设置滑点；0x API 期望的是 0 到 1 之间的小数。
    pub fn with_slippage_percents(mut self, percents: u8) -> Self {
        self.slippage_percentage = Some(Decimal::new(i64::from(percents), 2));
        self
    }

    pub fn with_excluded_sources(mut self, sources: Option<String>) -> Self {
        self.excluded_sources = sources
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(5);
        params.push(("sellToken".to_string(), self.sell_token.to_string()));
        params.push(("buyToken".to_string(), self.buy_token.to_string()));
        let (key, value) = self.amount.query_param();
        params.push((key.to_string(), value));
        if let Some(slippage) = self.slippage_percentage {
            params.push((
                "slippagePercentage".to_string(),
                slippage.normalize().to_string(),
            ));
        }
        if let Some(sources) = self.excluded_sources.as_ref() {
            params.push(("excludedSources".to_string(), sources.clone()));
        }
        params
    }
}

/// 单个流动性来源及其在路由中的占比。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiquiditySource {
    pub name: String,
    pub proportion: Decimal,
}

/// `/swap/v1/quote` 响应体，只解析下游会用到的字段。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponsePayload {
    #[serde(default)]
    pub sell_token_address: Option<Address>,
    #[serde(default)]
    pub buy_token_address: Option<Address>,
    #[serde(with = "field_as_string")]
    pub sell_amount: U256,
    #[serde(with = "field_as_string")]
    pub buy_amount: U256,
    /// swap 目标合约（0x Exchange Proxy）。
    pub to: Address,
    pub allowance_target: Address,
    pub data: Bytes,
    #[serde(default)]
    pub sources: Vec<LiquiditySource>,
    #[serde(default, with = "option_field_as_string")]
    pub estimated_gas: Option<U256>,
}

#[derive(Clone, Debug)]
pub struct QuoteResponse {
    data: QuoteResponsePayload,
    raw: Value,
}

impl QuoteResponse {
    pub fn try_from_value(value: Value) -> Result<Self, serde_json::Error> {
        let data: QuoteResponsePayload = serde_json::from_value(value.clone())?;
        Ok(Self { data, raw: value })
    }

    pub fn payload(&self) -> &QuoteResponsePayload {
        &self.data
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_payload(self) -> QuoteResponsePayload {
        self.data
    }

    /// 占比大于零的流动性来源。
    pub fn active_sources(&self) -> impl Iterator<Item = &LiquiditySource> {
        self.data
            .sources
            .iter()
            .filter(|source| source.proportion > Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;

    const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

    #[test]
    fn buy_exact_query_uses_fractional_slippage() {
        let request = QuoteRequest::buy_exact(WETH, DAI, U256::from(1_000u64))
            .with_slippage_percents(10)
            .with_excluded_sources(Some("Kyber,Bancor".to_string()));
        let params = request.to_query_params();

        assert!(params.contains(&("buyAmount".to_string(), "1000".to_string())));
        assert!(params.contains(&("slippagePercentage".to_string(), "0.1".to_string())));
        assert!(params.contains(&("excludedSources".to_string(), "Kyber,Bancor".to_string())));
        assert!(params.iter().all(|(key, _)| key != "sellAmount"));
    }

    #[test]
    fn blank_excluded_sources_are_dropped() {
        let request = QuoteRequest::sell_exact(WETH, DAI, U256::from(5u64))
            .with_excluded_sources(Some("   ".to_string()));
        let params = request.to_query_params();
        assert!(params.iter().all(|(key, _)| key != "excludedSources"));
        assert!(params.iter().all(|(key, _)| key != "slippagePercentage"));
        assert!(params.contains(&("sellAmount".to_string(), "5".to_string())));
    }

    #[test]
    fn response_parses_amounts_and_sources() {
        let value = json!({
            "sellTokenAddress": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            "buyTokenAddress": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "sellAmount": "1000000000000000000",
            "buyAmount": "2500000000000000000000",
            "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "allowanceTarget": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "data": "0xd9627aa4",
            "price": "2500",
            "estimatedGas": "136000",
            "sources": [
                {"name": "Uniswap_V3", "proportion": "1"},
                {"name": "Curve", "proportion": "0"}
            ]
        });

        let quote = QuoteResponse::try_from_value(value).expect("parse quote");
        let payload = quote.payload();
        assert_eq!(
            payload.sell_amount,
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert_eq!(payload.data.as_ref(), &[0xd9, 0x62, 0x7a, 0xa4]);
        assert_eq!(payload.estimated_gas, Some(U256::from(136_000u64)));
        let active = quote.active_sources().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(active, vec!["Uniswap_V3"]);
    }

    #[test]
    fn response_without_call_data_is_rejected() {
        let value = json!({
            "sellAmount": "1",
            "buyAmount": "1",
            "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "allowanceTarget": "0xdef1c0ded9bec7f1a1670819833240f027b25eff"
        });
        assert!(QuoteResponse::try_from_value(value).is_err());
    }
}
