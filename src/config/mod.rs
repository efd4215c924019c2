pub mod address_book;
pub mod loader;
pub mod types;

pub use address_book::{AddressBook, AddressOverrides};
pub use loader::*;
pub use types::*;

use self::types as cfg;

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_logging_profile() -> cfg::LoggingProfile {
    cfg::LoggingProfile::Lean
}

pub(crate) fn default_slow_quote_warn_ms() -> u64 {
    1_500
}

pub(crate) fn default_timezone_offset_hours() -> i8 {
    0
}

pub(crate) fn default_required_confirmations() -> u64 {
    1
}

pub(crate) fn default_quote_api_url() -> String {
    "https://api.0x.org/swap/v1/quote".to_string()
}

pub(crate) fn default_quote_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_slippage_percents() -> u8 {
    10
}

pub(crate) fn default_quote_max_concurrency() -> usize {
    4
}

pub(crate) fn default_retry_min_delay_ms() -> u64 {
    250
}

pub(crate) fn default_etherscan_api_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

pub(crate) fn default_etherscan_timeout_ms() -> u64 {
    10_000
}

impl Default for cfg::AppConfig {
    fn default() -> Self {
        Self {
            global: cfg::GlobalConfig::default(),
            wallet: cfg::WalletConfig::default(),
            quote: cfg::QuoteApiConfig::default(),
            issuance: cfg::IssuanceConfig::default(),
            etherscan: cfg::EtherscanConfig::default(),
            addresses: AddressOverrides::default(),
        }
    }
}

impl cfg::AppConfig {
    /// 按 `global.network` 选择预设地址簿，再叠加 `[addresses]` 中的覆盖项。
    pub fn address_book(&self) -> AddressBook {
        let mut book = AddressBook::for_network(self.global.network);
        self.addresses.apply(&mut book);
        book
    }
}

impl Default for cfg::GlobalConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            network: cfg::Network::default(),
            logging: cfg::LoggingConfig::default(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
            profile: default_logging_profile(),
            slow_quote_warn_ms: default_slow_quote_warn_ms(),
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

impl Default for cfg::WalletConfig {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            use_dev_account: false,
            required_confirmations: default_required_confirmations(),
        }
    }
}

impl Default for cfg::QuoteApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_quote_api_url(),
            api_key: None,
            timeout_ms: default_quote_timeout_ms(),
            slippage_percents: default_slippage_percents(),
            excluded_sources: Vec::new(),
            max_concurrency: default_quote_max_concurrency(),
            max_retries: 0,
            retry_min_delay_ms: default_retry_min_delay_ms(),
        }
    }
}

impl Default for cfg::IssuanceConfig {
    fn default() -> Self {
        Self {
            set_token: None,
            input_token: None,
            issuance_module: None,
            exchange_issuance: None,
            is_debt_issuance: false,
            payment: cfg::PaymentMode::default(),
            set_amount: None,
        }
    }
}

impl Default for cfg::EtherscanConfig {
    fn default() -> Self {
        Self {
            api_url: default_etherscan_api_url(),
            api_key: None,
            timeout_ms: default_etherscan_timeout_ms(),
        }
    }
}
