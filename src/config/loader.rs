use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::AppConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["issuer.toml", "config/issuer.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_config(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let explicit = path.is_some();
    let candidate_paths = match path {
        Some(p) => vec![p],
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .collect::<Vec<PathBuf>>(),
    };

    for candidate in candidate_paths {
        if let Some(config) = try_load_file(&candidate)? {
            validate(&config)?;
            return Ok(config);
        }
        if explicit {
            return Err(ConfigError::Io {
                path: candidate,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
    }

    Ok(AppConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.quote.slippage_percents >= 100 {
        return Err(ConfigError::Invalid(format!(
            "quote.slippage_percents must be below 100, got {}",
            config.quote.slippage_percents
        )));
    }
    if config.quote.max_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "quote.max_concurrency must be at least 1".to_string(),
        ));
    }
    if config.quote.timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "quote.timeout_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alloy::primitives::address;

    use super::*;
    use crate::config::{Network, PaymentMode};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn parses_full_config() {
        let file = write_config(
            r#"
[global]
rpc_url = "http://127.0.0.1:8545"
network = "staging"

[global.logging]
level = "debug"
profile = "verbose"

[quote]
api_key = "secret"
timeout_ms = 3000
slippage_percents = 5
excluded_sources = ["Kyber", " ", "Bancor"]

[issuance]
set_token = "0x2aF1dF3AB0ab157e1E2Ad8F88A7D04fbea0c7dc6"
payment = "token"
set_amount = "10"
"#,
        );

        let config = load_config(Some(file.path().to_path_buf())).expect("load config");
        assert_eq!(config.global.rpc_url(), Some("http://127.0.0.1:8545"));
        assert_eq!(config.global.network, Network::Staging);
        assert!(config.global.logging.profile.is_verbose());
        assert_eq!(config.quote.api_key.as_deref(), Some("secret"));
        assert_eq!(config.quote.timeout_ms, 3_000);
        assert_eq!(config.quote.slippage_percents, 5);
        assert_eq!(
            config.quote.excluded_sources().as_deref(),
            Some("Kyber,Bancor")
        );
        assert_eq!(
            config.issuance.set_token,
            Some(address!("2aF1dF3AB0ab157e1E2Ad8F88A7D04fbea0c7dc6"))
        );
        assert_eq!(config.issuance.payment, PaymentMode::Token);
        assert_eq!(config.quote.max_retries, 0);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let config = load_config(Some(file.path().to_path_buf())).expect("load config");
        assert_eq!(config.global.network, Network::Production);
        assert_eq!(config.quote.slippage_percents, 10);
        assert_eq!(config.quote.api_url, "https://api.0x.org/swap/v1/quote");
        assert!(config.quote.excluded_sources().is_none());
        assert_eq!(config.wallet.required_confirmations, 1);
    }

    #[test]
    fn rejects_slippage_of_one_hundred() {
        let file = write_config("[quote]\nslippage_percents = 100\n");
        let err = load_config(Some(file.path().to_path_buf())).expect_err("must reject");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_config(Some(dir.path().join("absent.toml"))).expect_err("must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let file = write_config("[quote\nslippage_percents = 5\n");
        let err = load_config(Some(file.path().to_path_buf())).expect_err("must fail");
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
