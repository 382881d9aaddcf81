//! Built-in behaviors available to jobs declared in configuration.

mod log;
mod webhook;

pub use log::LogPayload;
pub use webhook::{WebhookBehavior, WebhookRequest};

use std::sync::Arc;

use crate::jobs::behavior::BehaviorRegistry;

/// Registry preloaded with `log.payload` and `http.webhook`.
pub fn builtin_behaviors() -> anyhow::Result<BehaviorRegistry> {
    let mut registry = BehaviorRegistry::new();
    registry
        .namespace("log")
        .register("payload", Arc::new(LogPayload));
    registry
        .namespace("http")
        .register("webhook", Arc::new(WebhookBehavior::new()?));
    Ok(registry)
}
