use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use tracing::{info, warn};

use crate::config::{ConfigError, WalletConfig};

/// 本地开发节点（anvil / hardhat）的 0 号默认账户私钥。
const DEV_ACCOUNT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// 优先使用配置的私钥；未配置且允许时退回本地开发账户。
pub fn resolve_signer(wallet: &WalletConfig) -> Result<PrivateKeySigner, ConfigError> {
    let configured = wallet.private_key.trim();
    if !configured.is_empty() {
        let signer = parse_private_key(configured)?;
        info!(target: "config", address = %signer.address(), "使用配置的私钥签名");
        return Ok(signer);
    }

    if wallet.use_dev_account {
        let signer = parse_private_key(DEV_ACCOUNT_KEY)?;
        warn!(
            target: "config",
            address = %signer.address(),
            "未配置私钥，使用本地开发节点默认账户"
        );
        return Ok(signer);
    }

    Err(ConfigError::Invalid(
        "wallet.private_key is empty; set ISSUER_PRIVATE_KEY or enable wallet.use_dev_account"
            .to_string(),
    ))
}

fn parse_private_key(raw: &str) -> Result<PrivateKeySigner, ConfigError> {
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = alloy::hex::decode(hex_part)
        .map_err(|err| ConfigError::Invalid(format!("private key is not valid hex: {err}")))?;
    if bytes.len() != 32 {
        return Err(ConfigError::Invalid(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    PrivateKeySigner::from_bytes(&B256::from_slice(&bytes))
        .map_err(|err| ConfigError::Invalid(format!("private key rejected: {err}")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn dev_account_is_anvil_zero() {
        let wallet = WalletConfig {
            use_dev_account: true,
            ..WalletConfig::default()
        };
        let signer = resolve_signer(&wallet).expect("dev signer");
        assert_eq!(
            signer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn configured_key_wins_over_dev_account() {
        let wallet = WalletConfig {
            private_key: "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
                .to_string(),
            use_dev_account: true,
            ..WalletConfig::default()
        };
        let signer = resolve_signer(&wallet).expect("signer");
        assert_eq!(
            signer.address(),
            address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[test]
    fn missing_key_without_fallback_fails() {
        let err = resolve_signer(&WalletConfig::default()).expect_err("must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn short_key_is_rejected() {
        let wallet = WalletConfig {
            private_key: "0xdeadbeef".to_string(),
            ..WalletConfig::default()
        };
        assert!(resolve_signer(&wallet).is_err());
    }
}
