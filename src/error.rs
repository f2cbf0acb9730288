//! Engine error types.
//!
//! [`EngineError`] covers everything the scheduler can report back to a
//! caller: bad configuration, lifecycle misuse, saturated request queues and
//! thread failures. [`TaskError`] is the outcome of a single unit of work run
//! by the [`Executor`](crate::executor::Executor); it is handed to whoever
//! holds the task's handle and is never escalated to the scheduler.

use thiserror::Error;

use crate::gameobject::ObjectId;

/// Which of the two request queues an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Queue feeding objects into the pool.
    Register,
    /// Queue removing objects from the pool.
    Unregister,
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueKind::Register => f.write_str("register"),
            QueueKind::Unregister => f.write_str("unregister"),
        }
    }
}

/// Errors reported by the scheduling core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A second application was built while another one is still alive.
    #[error("an application instance is already alive in this process")]
    AlreadyConstructed,

    /// The configuration cannot be used to drive the loops.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called on an application that already started.
    #[error("application has already been started")]
    AlreadyStarted,

    /// An operation needs a started application.
    #[error("application has not been started")]
    NotStarted,

    /// The shutdown signal was already sent.
    #[error("shutdown has already been signalled")]
    AlreadyKilled,

    /// A task was submitted to an executor that is not running.
    #[error("executor is not running")]
    ExecutorStopped,

    /// `run` was called twice on the same executor.
    #[error("executor is already running")]
    ExecutorAlreadyRunning,

    /// A bounded request queue has no room left.
    #[error("{queue} queue is full (capacity {capacity})")]
    QueueFull {
        /// The saturated queue.
        queue: QueueKind,
        /// Its configured capacity.
        capacity: usize,
    },

    /// The receiving end of a request queue is gone.
    #[error("{0} queue is closed")]
    QueueClosed(QueueKind),

    /// No system is registered under the given name.
    #[error("unknown system `{0}`")]
    UnknownSystem(String),

    /// A system with the same name is already registered.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// A system needs a component the object does not carry.
    #[error("object `{object}` has no `{component}` component")]
    MissingComponent {
        /// Name of the object that tried to subscribe.
        object: String,
        /// Name of the missing component.
        component: &'static str,
    },

    /// The object's unregister request was already drained.
    #[error("object {0} has been destroyed")]
    ObjectDestroyed(ObjectId),

    /// The OS refused to spawn a thread.
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A loop thread unwound instead of returning.
    #[error("thread `{0}` panicked")]
    ThreadPanicked(String),

    /// Reading or writing the configuration file failed.
    #[error("config file error: {0}")]
    Config(String),

    /// The window/render frontend failed.
    #[error("frontend error: {0}")]
    Frontend(String),
}

/// Result alias used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a failed unit of work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task returned an error of its own.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task panicked; the worker survived.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped before it produced a result.
    #[error("task was dropped before completion")]
    Cancelled,
}

impl TaskError {
    /// Build a [`TaskError::Failed`] from anything printable.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        TaskError::Failed(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_full_message_names_queue_and_capacity() {
        let err = EngineError::QueueFull {
            queue: QueueKind::Unregister,
            capacity: 256,
        };
        assert_eq!(err.to_string(), "unregister queue is full (capacity 256)");
    }

    #[test]
    fn task_error_failed_from_display() {
        assert_eq!(
            TaskError::failed("bad input"),
            TaskError::Failed("bad input".to_string())
        );
    }
}
