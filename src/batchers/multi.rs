use async_trait::async_trait;

use super::Batcher;
use crate::faults::FaultEvent;
use crate::task::Task;

/// Composes several batchers so heterogeneous adjacent operations can be
/// merged into a few independent combined calls.
///
/// Each leading entry is offered to each child in registration order until
/// one accepts it. Execution partitions the claimed prefix by claiming
/// child and runs each child's combined `execute` in registration order,
/// so e.g. a run of property-value changes followed by property-status
/// changes becomes two remote calls, issued in the same relative order as
/// if un-batched.
pub struct MultiBatcher {
    children: Vec<Box<dyn Batcher>>,
    assignments: Vec<usize>,
}

impl MultiBatcher {
    pub fn new(children: Vec<Box<dyn Batcher>>) -> Self {
        Self {
            children,
            assignments: Vec::new(),
        }
    }
}

#[async_trait]
impl Batcher for MultiBatcher {
    fn start_batching(&mut self) {
        self.assignments.clear();
        for child in &mut self.children {
            child.start_batching();
        }
    }

    fn offer(&mut self, task: &Task) -> bool {
        for (idx, child) in self.children.iter_mut().enumerate() {
            if child.offer(task) {
                self.assignments.push(idx);
                return true;
            }
        }
        false
    }

    fn claimed(&self) -> usize {
        self.assignments.len()
    }

    async fn execute(&mut self, tasks: Vec<Task>) -> Result<(), FaultEvent> {
        let mut partitions: Vec<Vec<Task>> = Vec::with_capacity(self.children.len());
        partitions.resize_with(self.children.len(), Vec::new);
        for (task, &child_idx) in tasks.into_iter().zip(&self.assignments) {
            partitions[child_idx].push(task);
        }
        for (child, batch) in self.children.iter_mut().zip(partitions) {
            if !batch.is_empty() {
                child.execute(batch).await?;
            }
        }
        Ok(())
    }

    fn done_batching(&mut self) {
        self.assignments.clear();
        for child in &mut self.children {
            child.done_batching();
        }
    }
}
