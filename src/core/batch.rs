use crate::core::worker_pool::WorkerPool;
use crate::domain::model::{CompanyId, Order, OrderId};
use crate::domain::ports::OrderRichQueryRepository;
use crate::utils::error::{OmsError, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

type TaskOutcome = std::result::Result<String, (Option<String>, OmsError)>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSuccess {
    pub order_id: OrderId,
    pub order_no: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub order_id: OrderId,
    pub order_no: Option<String>,
    pub reason: String,
}

/// 批量處理結果，失敗不影響其他訂單
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchExecuteResult {
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
}

impl BatchExecuteResult {
    pub fn is_all_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// 訂單並發批量處理器（允許部分失敗）
pub struct OrderBatchExecutor {
    repository: Arc<dyn OrderRichQueryRepository>,
    pool: Arc<WorkerPool>,
}

impl OrderBatchExecutor {
    pub fn new(repository: Arc<dyn OrderRichQueryRepository>, pool: Arc<WorkerPool>) -> Self {
        Self { repository, pool }
    }

    pub async fn execute<F, Fut>(
        &self,
        company_id: CompanyId,
        order_ids: &[OrderId],
        consumer: F,
    ) -> BatchExecuteResult
    where
        F: Fn(Order) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let consumer = Arc::new(consumer);
        let tasks = order_ids
            .iter()
            .map(|&order_id| {
                let repository = Arc::clone(&self.repository);
                let consumer = Arc::clone(&consumer);
                let task = load_and_consume(repository, consumer, company_id, order_id);
                (format!("order-batch#{}", order_id), task)
            })
            .collect();

        let mut result = BatchExecuteResult::default();
        let outcomes = self.pool.execute_all(tasks).await;
        for (&order_id, outcome) in order_ids.iter().zip(outcomes) {
            match outcome {
                Ok(Ok(order_no)) => result.successes.push(BatchSuccess { order_id, order_no }),
                Ok(Err((order_no, e))) => result.failures.push(BatchFailure {
                    order_id,
                    order_no,
                    reason: e.to_string(),
                }),
                Err(e) => result.failures.push(BatchFailure {
                    order_id,
                    order_no: None,
                    reason: e.to_string(),
                }),
            }
        }

        if !result.is_all_success() {
            tracing::warn!(
                company_id,
                failed = result.failures.len(),
                total = result.total(),
                "order batch finished with failures"
            );
        }
        result
    }
}

async fn load_and_consume<F, Fut>(
    repository: Arc<dyn OrderRichQueryRepository>,
    consumer: Arc<F>,
    company_id: CompanyId,
    order_id: OrderId,
) -> TaskOutcome
where
    F: Fn(Order) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let simple = repository
        .get_order(company_id, order_id)
        .await
        .map_err(|e| (None, e))?
        .ok_or((None, OmsError::OrderNotFound { order_id }))?;
    let order = Order::from(simple);
    let order_no = order.order_no.clone();
    match consumer(order).await {
        Ok(()) => Ok(order_no),
        Err(e) => Err((Some(order_no), e)),
    }
}
