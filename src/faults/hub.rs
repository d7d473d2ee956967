use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::event::{CauseChain, FaultEvent, FaultKind};
use crate::task::TaskFailure;

/// Recovery action registered for one [`FaultKind`].
///
/// Success stops propagation at that hop; failure re-classifies the event
/// as [`FaultKind::RecoveryFailed`] and propagation continues upward.
pub type RecoveryTask =
    Arc<dyn Fn(FaultEvent) -> BoxFuture<'static, Result<(), TaskFailure>> + Send + Sync>;

/// One node in the fault-propagation tree.
///
/// A `FaultHub` is a cheap cloneable handle; clones share the same hop.
/// Parents register children via [`adopt`](Self::adopt) (a runner adopts
/// the hubs of components it owns, the document layer adopts its runners).
/// Raising walks the exact chain of registered parents, offering the event
/// to each hop's recovery table, until something recovers or the top-level
/// outlet receives it.
///
/// # Examples
///
/// ```
/// use syncline::faults::{CauseChain, FaultEvent, FaultHub};
///
/// # async fn demo() {
/// let document = FaultHub::labeled("document");
/// let runner = FaultHub::labeled("runner:shape");
/// document.adopt(&runner);
///
/// let faults = document.subscribe();
/// runner
///     .raise(FaultEvent::task("shape.set_property", CauseChain::msg("boom")))
///     .await;
/// assert_eq!(faults.try_recv().unwrap().error.message, "boom");
/// # }
/// ```
#[derive(Clone)]
pub struct FaultHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    label: String,
    parent: Mutex<Option<FaultHub>>,
    recoveries: Mutex<FxHashMap<FaultKind, RecoveryTask>>,
    outlet: Mutex<Option<flume::Sender<FaultEvent>>>,
}

impl fmt::Debug for FaultHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultHub")
            .field("label", &self.inner.label)
            .finish_non_exhaustive()
    }
}

impl FaultHub {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                label: label.into(),
                parent: Mutex::new(None),
                recoveries: Mutex::new(FxHashMap::default()),
                outlet: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Register `child` as a sub-handler: faults it raises walk through
    /// this hub on their way up.
    pub fn adopt(&self, child: &FaultHub) {
        *child.inner.parent.lock() = Some(self.clone());
    }

    /// Unregister `child` if this hub is currently its parent.
    pub fn disown(&self, child: &FaultHub) {
        let mut parent = child.inner.parent.lock();
        if parent
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(&p.inner, &self.inner))
        {
            *parent = None;
        }
    }

    /// Install a recovery action for one fault kind at this hop.
    pub fn set_recovery<F, Fut>(&self, kind: FaultKind, recovery: F)
    where
        F: Fn(FaultEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        let task: RecoveryTask = Arc::new(move |event| Box::pin(recovery(event)));
        self.inner.recoveries.lock().insert(kind, task);
    }

    /// Install the top-level outlet and return its receiving side.
    ///
    /// Faults that reach a hub with no parent are delivered here. Intended
    /// for the hub at the top of the chain (the document/UI layer).
    pub fn subscribe(&self) -> flume::Receiver<FaultEvent> {
        let (tx, rx) = flume::unbounded();
        *self.inner.outlet.lock() = Some(tx);
        rx
    }

    fn recovery_for(&self, kind: FaultKind) -> Option<RecoveryTask> {
        self.inner.recoveries.lock().get(&kind).cloned()
    }

    fn parent(&self) -> Option<FaultHub> {
        self.inner.parent.lock().clone()
    }

    /// Walk the event up the chain.
    ///
    /// At each hop the recovery table is consulted once for the event's
    /// kind. A fault that reaches a parentless hub is delivered to the
    /// outlet, or logged at error level so it is never lost.
    pub async fn raise(&self, event: FaultEvent) {
        let mut hop = self.clone();
        let mut event = event;
        loop {
            if let Some(recovery) = hop.recovery_for(event.kind) {
                match recovery(event.clone()).await {
                    Ok(()) => {
                        tracing::debug!(
                            hub = %hop.label(),
                            kind = %event.kind,
                            "fault recovered"
                        );
                        return;
                    }
                    Err(failure) => {
                        tracing::warn!(
                            hub = %hop.label(),
                            kind = %event.kind,
                            error = %failure,
                            "recovery action failed"
                        );
                        event =
                            FaultEvent::recovery_failed(event, CauseChain::msg(failure.to_string()));
                    }
                }
            }

            match hop.parent() {
                Some(parent) => hop = parent,
                None => {
                    let outlet = hop.inner.outlet.lock().clone();
                    if let Some(tx) = outlet
                        && tx.send(event.clone()).is_ok()
                    {
                        return;
                    }
                    tracing::error!(
                        hub = %hop.label(),
                        kind = %event.kind,
                        error = %event.error,
                        "unhandled fault reached top of chain"
                    );
                    return;
                }
            }
        }
    }
}
