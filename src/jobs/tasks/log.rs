use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::jobs::behavior::{JobBehavior, TaskContext};

/// Logs each payload it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPayload;

#[async_trait]
impl JobBehavior for LogPayload {
    async fn execute(&self, ctx: TaskContext, payload: JsonValue) -> anyhow::Result<()> {
        tracing::info!(
            job = %ctx.job_name,
            run_id = %ctx.run_id,
            task = ctx.task_index,
            payload = %payload,
            "Job payload"
        );
        Ok(())
    }
}
