//! Job behaviors and the registry that resolves them by name.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::jobs::error::{SchedulerError, SchedulerResult};

/// Context handed to a behavior for one task payload
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub run_id: Uuid,
    pub job_name: String,
    pub task_index: usize,
}

/// Executable part of a job. Invoked once per task payload.
#[async_trait]
pub trait JobBehavior: Send + Sync {
    async fn execute(&self, ctx: TaskContext, payload: JsonValue) -> anyhow::Result<()>;
}

struct FnBehavior<F>(F);

#[async_trait]
impl<F, Fut> JobBehavior for FnBehavior<F>
where
    F: Fn(TaskContext, JsonValue) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn execute(&self, ctx: TaskContext, payload: JsonValue) -> anyhow::Result<()> {
        (self.0)(ctx, payload).await
    }
}

/// Wrap an async closure as a [`JobBehavior`].
pub fn behavior_fn<F, Fut>(f: F) -> Arc<dyn JobBehavior>
where
    F: Fn(TaskContext, JsonValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnBehavior(f))
}

/// How a job definition points at its behavior.
#[derive(Clone)]
pub enum BehaviorRef {
    /// Behavior supplied directly with the definition.
    Direct(Arc<dyn JobBehavior>),
    /// Dotted name looked up in the [`BehaviorRegistry`] at run time.
    Named(String),
}

impl fmt::Debug for BehaviorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorRef::Direct(_) => f.write_str("Direct(..)"),
            BehaviorRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl From<Arc<dyn JobBehavior>> for BehaviorRef {
    fn from(behavior: Arc<dyn JobBehavior>) -> Self {
        BehaviorRef::Direct(behavior)
    }
}

/// Registry mapping behavior names to implementations.
///
/// Names may be namespaced with dots (`reports.daily.send`); the registry
/// stores the full dotted name, see [`BehaviorRegistry::namespace`].
#[derive(Default, Clone)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, Arc<dyn JobBehavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, behavior: Arc<dyn JobBehavior>) -> &mut Self {
        self.behaviors.insert(name.into(), behavior);
        self
    }

    /// Register an async closure under `name`
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TaskContext, JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(name, behavior_fn(f))
    }

    /// Scope further registrations under `prefix.`
    pub fn namespace(&mut self, prefix: impl Into<String>) -> Namespace<'_> {
        Namespace {
            registry: self,
            prefix: prefix.into(),
        }
    }

    /// Resolve a behavior reference to something callable.
    pub fn resolve(&self, behavior: &BehaviorRef) -> SchedulerResult<Arc<dyn JobBehavior>> {
        match behavior {
            BehaviorRef::Direct(b) => Ok(Arc::clone(b)),
            BehaviorRef::Named(name) => self.get(name),
        }
    }

    pub fn get(&self, name: &str) -> SchedulerResult<Arc<dyn JobBehavior>> {
        self.behaviors
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::BehaviorNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.behaviors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Registration scope returned by [`BehaviorRegistry::namespace`].
pub struct Namespace<'a> {
    registry: &'a mut BehaviorRegistry,
    prefix: String,
}

impl Namespace<'_> {
    pub fn register(&mut self, name: &str, behavior: Arc<dyn JobBehavior>) -> &mut Self {
        let full = format!("{}.{}", self.prefix, name);
        self.registry.register(full, behavior);
        self
    }

    pub fn register_fn<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(TaskContext, JsonValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(name, behavior_fn(f))
    }

    pub fn namespace(&mut self, child: &str) -> Namespace<'_> {
        Namespace {
            prefix: format!("{}.{}", self.prefix, child),
            registry: &mut *self.registry,
        }
    }
}
