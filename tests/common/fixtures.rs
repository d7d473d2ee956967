use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use syncline::task::{Task, TaskName};

/// Shared record of observable side effects, in execution order.
#[derive(Clone, Default)]
pub struct OpLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OpLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }
}

/// A task that appends `tag` to the log when executed.
pub fn recording_task(log: &OpLog, name: TaskName, tag: &str) -> Task {
    let log = log.clone();
    let tag = tag.to_string();
    Task::new(name, vec![serde_json::json!(tag)], move || async move {
        log.record(tag);
        Ok(())
    })
}

/// A task whose operation fails with the given message.
pub fn failing_task(name: TaskName, message: &'static str) -> Task {
    Task::new(name, vec![], move || async move { Err(message.into()) })
}

/// A task that sleeps before recording, to keep a queue occupied.
pub fn slow_task(log: &OpLog, name: TaskName, tag: &str, delay: Duration) -> Task {
    let log = log.clone();
    let tag = tag.to_string();
    Task::new(name, vec![], move || async move {
        tokio::time::sleep(delay).await;
        log.record(tag);
        Ok(())
    })
}

pub fn prop_name() -> TaskName {
    TaskName::new("object", "set_property")
}

pub fn status_name() -> TaskName {
    TaskName::new("object", "set_status")
}
