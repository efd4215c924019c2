use alloy::primitives::Address;
use serde::Deserialize;

use super::address_book::AddressOverrides;

/// `issuer.toml` 顶层结构。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub quote: QuoteApiConfig,
    #[serde(default)]
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub etherscan: EtherscanConfig,
    #[serde(default)]
    pub addresses: AddressOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GlobalConfig {
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// 地址簿预设：生产环境与预发布环境只在 Set 协议模块地址上有差异。
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Production,
    Staging,
}

impl Default for Network {
    fn default() -> Self {
        Self::Production
    }
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Production => "production",
            Network::Staging => "staging",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoggingProfile {
    Lean,
    Verbose,
}

impl Default for LoggingProfile {
    fn default() -> Self {
        Self::Lean
    }
}

impl LoggingProfile {
    pub fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "super::default_logging_profile")]
    pub profile: LoggingProfile,
    #[serde(default = "super::default_slow_quote_warn_ms")]
    pub slow_quote_warn_ms: u64,
    #[serde(default = "super::default_timezone_offset_hours")]
    pub timezone_offset_hours: i8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub private_key: String,
    /// 未配置私钥时，是否退回到本地开发节点的默认账户。
    #[serde(default)]
    pub use_dev_account: bool,
    #[serde(default = "super::default_required_confirmations")]
    pub required_confirmations: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteApiConfig {
    #[serde(default = "super::default_quote_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "super::default_quote_timeout_ms")]
    pub timeout_ms: u64,
    /// 整数百分比，例如 10 表示 10%。
    #[serde(default = "super::default_slippage_percents")]
    pub slippage_percents: u8,
    #[serde(default)]
    pub excluded_sources: Vec<String>,
    #[serde(default = "super::default_quote_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub max_retries: usize,
    #[serde(default = "super::default_retry_min_delay_ms")]
    pub retry_min_delay_ms: u64,
}

impl QuoteApiConfig {
    pub fn excluded_sources(&self) -> Option<String> {
        let joined = self
            .excluded_sources
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        if joined.is_empty() { None } else { Some(joined) }
    }
}

/// 支付方式：ETH 直接随交易附带，或预先授权 ERC20 输入代币。
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Eth,
    Token,
}

impl Default for PaymentMode {
    fn default() -> Self {
        Self::Eth
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuanceConfig {
    #[serde(default)]
    pub set_token: Option<Address>,
    #[serde(default)]
    pub input_token: Option<Address>,
    #[serde(default)]
    pub issuance_module: Option<Address>,
    #[serde(default)]
    pub exchange_issuance: Option<Address>,
    #[serde(default)]
    pub is_debt_issuance: bool,
    #[serde(default)]
    pub payment: PaymentMode,
    /// 以 ether 为单位的铸造数量（18 位精度），例如 "10"。
    #[serde(default)]
    pub set_amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtherscanConfig {
    #[serde(default = "super::default_etherscan_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "super::default_etherscan_timeout_ms")]
    pub timeout_ms: u64,
}
