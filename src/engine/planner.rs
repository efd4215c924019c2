use std::collections::VecDeque;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use super::aggregator::sum_amounts;
use super::error::{IssuanceError, IssuanceResult};
use super::quote::QuoteSource;
use super::types::{ComponentRequirement, PositionQuote, SwapQuote};
use crate::api::zeroex::QuoteRequest;

/// 规划结果：与成分列表等长的兑换指令，以及缓冲前的卖出总量。
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPositions {
    pub position_quotes: Vec<PositionQuote>,
    pub raw_total: U256,
}

/// 逐成分决定是否需要兑换，需要时并发拉取精确买入报价，结果按成分顺序回填。
#[derive(Clone)]
pub struct QuotePlanner {
    source: Arc<dyn QuoteSource>,
    max_concurrency: usize,
}

impl QuotePlanner {
    pub fn new(source: Arc<dyn QuoteSource>, max_concurrency: usize) -> Self {
        Self {
            source,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn plan_positions(
        &self,
        requirements: &[ComponentRequirement],
        input_token: Address,
        slippage_percents: u8,
        excluded_sources: Option<&str>,
    ) -> IssuanceResult<PlannedPositions> {
        let mut slots: Vec<Option<PositionQuote>> = vec![None; requirements.len()];
        let mut pending = VecDeque::new();
        for (index, requirement) in requirements.iter().enumerate() {
            if requirement.component == input_token {
                trace!(
                    target: "engine::planner",
                    index,
                    component = %requirement.component,
                    "成分即输入代币，跳过报价"
                );
                slots[index] = Some(PositionQuote::PassThrough);
                continue;
            }
            let request = QuoteRequest::buy_exact(
                input_token,
                requirement.component,
                requirement.required_units,
            )
            .with_slippage_percents(slippage_percents)
            .with_excluded_sources(excluded_sources.map(str::to_string));
            pending.push_back((index, request));
        }

        let fetched = self.fetch_all(pending).await?;
        for (index, quote) in fetched {
            slots[index] = Some(PositionQuote::Swap(quote));
        }

        let mut position_quotes = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            let quote = slot.ok_or_else(|| {
                IssuanceError::Internal(format!("成分 #{index} 缺少报价结果"))
            })?;
            position_quotes.push(quote);
        }

        let raw_total = sum_amounts(requirements.iter().zip(&position_quotes).map(
            |(requirement, quote)| match quote {
                PositionQuote::Swap(swap) => swap.sell_amount,
                PositionQuote::PassThrough => requirement.required_units,
            },
        ))?;

        info!(
            target: "engine::planner",
            components = requirements.len(),
            swaps = position_quotes.iter().filter(|q| !q.is_pass_through()).count(),
            raw_total = %raw_total,
            "成分报价规划完成"
        );

        Ok(PlannedPositions {
            position_quotes,
            raw_total,
        })
    }

    /// 固定数量的 worker 从队列取任务；任一失败后不再领取新任务，整体返回首个错误。
    async fn fetch_all(
        &self,
        requests: VecDeque<(usize, QuoteRequest)>,
    ) -> IssuanceResult<Vec<(usize, SwapQuote)>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let slot_limit = self.max_concurrency.min(requests.len());
        let queue = Arc::new(Mutex::new(requests));
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let first_error: Arc<Mutex<Option<IssuanceError>>> = Arc::new(Mutex::new(None));

        let mut join_set = JoinSet::new();
        for _ in 0..slot_limit {
            let queue = Arc::clone(&queue);
            let outcomes = Arc::clone(&outcomes);
            let first_error = Arc::clone(&first_error);
            let source = Arc::clone(&self.source);

            join_set.spawn(async move {
                loop {
                    if first_error.lock().await.is_some() {
                        break;
                    }
                    let task = {
                        let mut guard = queue.lock().await;
                        guard.pop_front()
                    };
                    let Some((index, request)) = task else {
                        break;
                    };

                    match source.quote(&request).await {
                        Ok(quote) => {
                            debug!(
                                target: "engine::planner",
                                index,
                                component = %request.buy_token,
                                sell_amount = %quote.sell_amount,
                                "成分报价完成"
                            );
                            let mut guard = outcomes.lock().await;
                            guard.push((index, quote));
                        }
                        Err(err) => {
                            let mut guard = first_error.lock().await;
                            if guard.is_none() {
                                *guard = Some(IssuanceError::QuoteUnavailable {
                                    component: request.buy_token,
                                    source: err,
                                });
                            }
                        }
                    }
                }
            });
        }

        while let Some(res) = join_set.join_next().await {
            if let Err(join_err) = res {
                let mut guard = first_error.lock().await;
                if guard.is_none() {
                    *guard = Some(IssuanceError::Internal(join_err.to_string()));
                }
            }
        }

        if let Some(err) = first_error.lock().await.take() {
            return Err(err);
        }

        let mut collected = outcomes.lock().await;
        collected.sort_by_key(|(index, _)| *index);
        Ok(collected.drain(..).collect())
    }
}
