//! 外部 HTTP API 封装：0x 报价与 Etherscan ABI 查询。

pub mod etherscan;
pub mod serde_helpers;
pub mod zeroex;

pub use etherscan::EtherscanClient;
pub use zeroex::{QuoteRequest, ZeroExApiClient};

/// 把错误响应体压成单行并截断，便于写入日志与错误信息。
pub(crate) fn summarize_error_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty response body)".to_string();
    }
    let single_line = trimmed.replace(['\n', '\r'], " ");
    const MAX_CHARS: usize = 512;
    if single_line.chars().count() <= MAX_CHARS {
        return single_line;
    }
    let mut truncated: String = single_line.chars().take(MAX_CHARS).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_collapses_and_truncates() {
        assert_eq!(summarize_error_body("  ".to_string()), "(empty response body)");
        assert_eq!(summarize_error_body("a\nb\r".to_string()), "a b");
        let long = "错".repeat(600);
        let summary = summarize_error_body(long);
        assert_eq!(summary.chars().count(), 513);
        assert!(summary.ends_with('…'));
    }
}
