use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Abstract classification of a fault.
///
/// Recovery tables are keyed by kind, never by message text, so handling
/// stays total and checkable at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The wrapped operation raised.
    OperationFailed,
    /// A registered recovery action itself raised; carries the original
    /// failure as nested cause.
    RecoveryFailed,
    /// Cooperative cancellation observed; queued work was abandoned.
    Cancelled,
    /// A closeout or acknowledge wait exceeded its bound. Reported, not
    /// fatal; context lists the still-queued operation identities.
    Timeout,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperationFailed => write!(f, "operation_failed"),
            Self::RecoveryFailed => write!(f, "recovery_failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Where in the engine a fault originated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FaultSource {
    Task {
        name: String,
    },
    Runner {
        label: String,
    },
    Batcher {
        label: String,
    },
    Syncer {
        label: String,
    },
    #[default]
    Chain,
}

/// Nested cause description attached to fault events.
///
/// # Examples
///
/// ```
/// use syncline::faults::CauseChain;
///
/// let cause = CauseChain::msg("connection reset")
///     .with_details(serde_json::json!({"attempt": 2}));
/// let err = CauseChain::msg("remote call failed").with_cause(cause);
/// assert_eq!(err.to_string(), "remote call failed");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CauseChain {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<CauseChain>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for CauseChain {
    fn default() -> Self {
        CauseChain {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl fmt::Display for CauseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CauseChain {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl CauseChain {
    pub fn msg<M: Into<String>>(m: M) -> Self {
        CauseChain {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_cause(mut self, cause: CauseChain) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// A classified fault travelling up the chain.
///
/// # Examples
///
/// ```
/// use syncline::faults::{CauseChain, FaultEvent, FaultKind};
///
/// let event = FaultEvent::task("shape.set_property", CauseChain::msg("remote rejected value"))
///     .with_context(serde_json::json!({"value": 3}));
/// assert_eq!(event.kind, FaultKind::OperationFailed);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub source: FaultSource,
    pub kind: FaultKind,
    #[serde(default)]
    pub error: CauseChain,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl FaultEvent {
    /// Create a task-scoped operation failure.
    pub fn task<S: Into<String>>(name: S, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            source: FaultSource::Task { name: name.into() },
            kind: FaultKind::OperationFailed,
            error,
            context: serde_json::Value::Null,
        }
    }

    /// Create a runner-scoped fault of the given kind.
    pub fn runner<S: Into<String>>(label: S, kind: FaultKind, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            source: FaultSource::Runner {
                label: label.into(),
            },
            kind,
            error,
            context: serde_json::Value::Null,
        }
    }

    /// Create a batcher-scoped operation failure (a combined flush raised).
    pub fn batcher<S: Into<String>>(label: S, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            source: FaultSource::Batcher {
                label: label.into(),
            },
            kind: FaultKind::OperationFailed,
            error,
            context: serde_json::Value::Null,
        }
    }

    /// Create a syncer-scoped fault of the given kind.
    pub fn syncer<S: Into<String>>(label: S, kind: FaultKind, error: CauseChain) -> Self {
        Self {
            when: Utc::now(),
            source: FaultSource::Syncer {
                label: label.into(),
            },
            kind,
            error,
            context: serde_json::Value::Null,
        }
    }

    /// Re-classify a fault after a recovery action failed on it.
    ///
    /// The original failure travels along as the nested cause so it is
    /// never silently swallowed.
    pub fn recovery_failed(original: FaultEvent, failure: CauseChain) -> Self {
        let context = serde_json::json!({
            "original_kind": original.kind,
            "original_source": original.source,
            "original_context": original.context,
        });
        Self {
            when: Utc::now(),
            source: FaultSource::Chain,
            kind: FaultKind::RecoveryFailed,
            error: failure.with_cause(original.error),
            context,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}
