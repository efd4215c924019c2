use std::env;
use std::fs;
use std::path::PathBuf;

use alloy::primitives::U256;
use alloy::primitives::utils::parse_ether;
use anyhow::{Result, anyhow};
use time::{UtcOffset, macros::format_description};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, ConfigError, LoggingProfile, load_config};

pub const RPC_URL_ENV: &str = "ISSUER_RPC_URL";
pub const PRIVATE_KEY_ENV: &str = "ISSUER_PRIVATE_KEY";
pub const ZEROEX_API_KEY_ENV: &str = "ZEROEX_API_KEY";
pub const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

/// 初始化 tracing，兼顾 JSON 与文本输出模式。
pub fn init_tracing(config: &crate::config::LoggingConfig) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if matches!(config.profile, LoggingProfile::Lean) {
        const QUIET_TARGETS: &[(&str, &str)] = &[
            ("hyper", "warn"),
            ("hyper_util::client::legacy", "warn"),
            ("reqwest", "info"),
            ("alloy_transport_http", "info"),
            ("alloy_rpc_client", "info"),
            ("alloy_provider", "info"),
        ];
        for (module, level) in QUIET_TARGETS {
            if !config.level.contains(module) {
                if let Ok(directive) = format!("{module}={level}").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }

    if matches!(config.profile, LoggingProfile::Verbose) {
        const VERBOSE_TARGETS: &[(&str, &str)] = &[
            ("zeroex::quote", "debug"),
            ("engine::planner", "debug"),
            ("engine::orchestrator", "debug"),
            ("lander::rpc", "debug"),
        ];
        for (module, level) in VERBOSE_TARGETS {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::from_hms(config.timezone_offset_hours, 0, 0).map_err(|err| {
        anyhow!(
            "invalid logging timezone offset {}: {err}",
            config.timezone_offset_hours
        )
    })?;
    let offset_timer = OffsetTime::new(offset, time_format);

    let base = fmt()
        .with_timer(offset_timer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

/// 加载主配置并叠加环境变量；用于 `set-issuer --config` 的入口。
pub fn load_configuration(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

/// 环境变量优先于配置文件，空值忽略。
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    if let Some(url) = read(RPC_URL_ENV) {
        config.global.rpc_url = Some(url);
    }
    if let Some(key) = read(PRIVATE_KEY_ENV) {
        config.wallet.private_key = key;
    }
    if let Some(key) = read(ZEROEX_API_KEY_ENV) {
        config.quote.api_key = Some(key);
    }
    if let Some(key) = read(ETHERSCAN_API_KEY_ENV) {
        config.etherscan.api_key = Some(key);
    }
}

pub fn resolve_rpc_url(config: &AppConfig) -> Result<String> {
    config
        .global
        .rpc_url()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("未配置 RPC 地址，请设置 global.rpc_url 或环境变量 {RPC_URL_ENV}"))
}

/// 以 ether 为单位（18 位精度）解析数量字符串。
pub fn parse_set_amount(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let amount = parse_ether(trimmed).map_err(|err| anyhow!("无法解析数量 `{trimmed}`: {err}"))?;
    if amount.is_zero() {
        return Err(anyhow!("铸造数量必须大于 0"));
    }
    Ok(amount)
}

pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("set-issuer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| anyhow!("构建 HTTP 客户端失败: {err}"))
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    fs::create_dir_all(&output_dir)?;

    let templates: [(&str, &str); 1] = [(
        "issuer.toml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/issuer.toml")),
    )];

    for (filename, contents) in templates {
        let target_path = output_dir.join(filename);
        if target_path.exists() && !args.force {
            println!(
                "跳过 {}（文件已存在，如需覆盖请加 --force）",
                target_path.display()
            );
            continue;
        }

        fs::write(&target_path, contents)?;
        println!("已写入 {}", target_path.display());
    }

    Ok(())
}
