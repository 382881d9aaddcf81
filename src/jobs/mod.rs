//! Distributed job scheduling.
//!
//! Every process registers the same jobs; the shared [`JobStore`] decides
//! which process runs each occurrence through an atomic claim.
//!
//! [`JobStore`]: crate::store::JobStore

pub mod behavior;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod tasks;

pub use behavior::{BehaviorRef, BehaviorRegistry, JobBehavior, TaskContext, behavior_fn};
pub use coordinator::{ExecutionCoordinator, RunOutcome, SkipReason, Trigger};
pub use error::{SchedulerError, SchedulerResult, TaskError};
pub use models::{JobChanges, JobDefinition, JobFilter, JobPredicate, JobRecord, NewJobRecord};
pub use queue::{JobQueue, ScheduleInfo};
pub use registry::JobRegistry;
pub use runner::TaskRunner;
pub use schedule::{Schedule, ScheduleKind, ScheduleSpec};
pub use scheduler::{Scheduler, TimerHandle};
pub use tasks::builtin_behaviors;
