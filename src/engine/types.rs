use alloy::primitives::{Address, Bytes, U256};

use crate::api::zeroex::{LiquiditySource, QuoteResponsePayload};

/// 旧版 ExchangeIssuance 合约识别的"无需兑换"占位：`bytes32("FOOBAR")`。
pub const PASS_THROUGH_SENTINEL: [u8; 32] = {
    let mut raw = [0u8; 32];
    let tag = *b"FOOBAR";
    let mut idx = 0;
    while idx < tag.len() {
        raw[idx] = tag[idx];
        idx += 1;
    }
    raw
};

/// 铸造指定数量 Set Token 所需的单个成分及其数量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRequirement {
    pub component: Address,
    pub required_units: U256,
}

/// 单个成分的 0x 报价中下游需要的部分。
#[derive(Debug, Clone, PartialEq)]
pub struct SwapQuote {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub swap_target: Address,
    pub allowance_target: Address,
    pub call_data: Bytes,
    pub sources: Vec<LiquiditySource>,
}

impl SwapQuote {
    /// 响应里缺失 token 地址时以请求参数补齐。
    pub fn from_payload(sell_token: Address, buy_token: Address, payload: QuoteResponsePayload) -> Self {
        Self {
            sell_token: payload.sell_token_address.unwrap_or(sell_token),
            buy_token: payload.buy_token_address.unwrap_or(buy_token),
            sell_amount: payload.sell_amount,
            buy_amount: payload.buy_amount,
            swap_target: payload.to,
            allowance_target: payload.allowance_target,
            call_data: payload.data,
            sources: payload.sources,
        }
    }
}

/// 与成分列表一一对应的兑换指令。
#[derive(Debug, Clone, PartialEq)]
pub enum PositionQuote {
    Swap(SwapQuote),
    /// 成分本身就是输入代币，不需要兑换。
    PassThrough,
}

impl PositionQuote {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, PositionQuote::PassThrough)
    }

    pub fn swap(&self) -> Option<&SwapQuote> {
        match self {
            PositionQuote::Swap(quote) => Some(quote),
            PositionQuote::PassThrough => None,
        }
    }

    /// 链上调用使用的字节表示；`PassThrough` 编码为合约约定的占位值。
    pub fn to_call_data(&self) -> Bytes {
        match self {
            PositionQuote::Swap(quote) => quote.call_data.clone(),
            PositionQuote::PassThrough => Bytes::copy_from_slice(&PASS_THROUGH_SENTINEL),
        }
    }
}

/// 一次发行尝试的完整计划，生成后立即被单笔交易消费。
#[derive(Debug, Clone, PartialEq)]
pub struct IssuancePlan {
    pub set_token: Address,
    pub set_amount: U256,
    pub input_token: Address,
    pub issuance_module: Address,
    pub is_debt_issuance: bool,
    pub requirements: Vec<ComponentRequirement>,
    pub position_quotes: Vec<PositionQuote>,
    /// 滑点缓冲之前的卖出总量。
    pub raw_input_amount: U256,
    pub input_token_amount: U256,
    pub slippage_percents: u8,
}

impl IssuancePlan {
    pub fn encoded_quotes(&self) -> Vec<Bytes> {
        self.position_quotes
            .iter()
            .map(PositionQuote::to_call_data)
            .collect()
    }

    pub fn swap_count(&self) -> usize {
        self.position_quotes
            .iter()
            .filter(|quote| !quote.is_pass_through())
            .count()
    }
}

/// 发行参数，来自配置与命令行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    pub set_token: Address,
    pub set_amount: U256,
    pub input_token: Address,
    pub issuance_module: Address,
    pub is_debt_issuance: bool,
    pub slippage_percents: u8,
    pub excluded_sources: Option<String>,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::bytes;

    use super::*;

    #[test]
    fn pass_through_encodes_formatted_bytes32() {
        let encoded = PositionQuote::PassThrough.to_call_data();
        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[..6], b"FOOBAR");
        assert!(encoded[6..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn swap_encodes_call_data_verbatim() {
        let quote = SwapQuote {
            sell_token: Address::repeat_byte(1),
            buy_token: Address::repeat_byte(2),
            sell_amount: U256::from(10u64),
            buy_amount: U256::from(20u64),
            swap_target: Address::repeat_byte(3),
            allowance_target: Address::repeat_byte(3),
            call_data: bytes!("d9627aa4"),
            sources: Vec::new(),
        };
        let position = PositionQuote::Swap(quote);
        assert_eq!(position.to_call_data(), bytes!("d9627aa4"));
        assert!(!position.is_pass_through());
    }
}
