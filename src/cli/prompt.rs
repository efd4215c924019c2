use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tracing::info;

use crate::engine::{Confirmation, IssuanceError, IssuanceResult, IssuanceSummary};

/// 在终端打印摘要并等待输入 `y`。
pub struct ConsolePrompt;

#[async_trait]
impl Confirmation for ConsolePrompt {
    async fn confirm(&self, summary: &IssuanceSummary) -> IssuanceResult<bool> {
        let rendered = summary.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
            write!(stdout, "是否继续发行？输入 y 确认，其它任意键取消: ")?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|err| IssuanceError::Confirmation(err.to_string()))?
        .map_err(|err| IssuanceError::Confirmation(err.to_string()))?;
        Ok(is_affirmative(&answer))
    }
}

/// `--yes` 时跳过交互，只记录摘要。
pub struct AutoApprove;

#[async_trait]
impl Confirmation for AutoApprove {
    async fn confirm(&self, summary: &IssuanceSummary) -> IssuanceResult<bool> {
        info!(
            target: "engine::orchestrator",
            set_token = %summary.set_token,
            max_input = %summary.max_input_amount,
            gas_limit = ?summary.gas_limit,
            "已通过 --yes 自动确认"
        );
        Ok(true)
    }
}

fn is_affirmative(answer: &str) -> bool {
    answer.trim() == "y"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lowercase_y_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  y  "));
        assert!(!is_affirmative("Y"));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative(""));
    }
}
