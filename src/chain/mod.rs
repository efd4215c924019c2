//! 以太坊链上访问：合约绑定、签名账户与 provider 构造。

pub mod contracts;
pub mod wallet;

use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use url::Url;

use crate::config::ConfigError;

pub use wallet::resolve_signer;

/// 构造带签名能力的 HTTP provider，并擦除具体 filler 类型。
pub fn build_provider(rpc_url: &str, signer: PrivateKeySigner) -> Result<DynProvider, ConfigError> {
    let url: Url = rpc_url
        .trim()
        .parse()
        .map_err(|err| ConfigError::Invalid(format!("rpc_url `{rpc_url}` is not a valid URL: {err}")))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(url);
    Ok(provider.erased())
}

/// 只读 provider，用于不需要签名的查询命令。
pub fn build_read_provider(rpc_url: &str) -> Result<DynProvider, ConfigError> {
    let url: Url = rpc_url
        .trim()
        .parse()
        .map_err(|err| ConfigError::Invalid(format!("rpc_url `{rpc_url}` is not a valid URL: {err}")))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}
