use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::jobs::behavior::{JobBehavior, TaskContext};

/// Task payload understood by [`WebhookBehavior`].
///
/// ```json
/// { "url": "https://hooks.example.com/x", "body": { "any": "json" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    #[serde(default)]
    pub body: JsonValue,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// POSTs the payload's `body` to the payload's `url`.
#[derive(Debug, Clone)]
pub struct WebhookBehavior {
    client: reqwest::Client,
}

impl WebhookBehavior {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("fusion-jobs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobBehavior for WebhookBehavior {
    async fn execute(&self, ctx: TaskContext, payload: JsonValue) -> anyhow::Result<()> {
        let request: WebhookRequest =
            serde_json::from_value(payload).context("webhook payload needs a `url` field")?;

        let mut builder = self
            .client
            .post(&request.url)
            .header("X-Job-Name", &ctx.job_name)
            .header("X-Job-Run", ctx.run_id.to_string())
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("POST {} failed", request.url))?;
        let status = response.status();
        anyhow::ensure!(status.is_success(), "POST {} returned {}", request.url, status);

        tracing::debug!(job = %ctx.job_name, url = %request.url, %status, "Webhook delivered");
        Ok(())
    }
}
