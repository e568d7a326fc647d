//! Control-thread task queue.
//!
//! Work that must not run inline (source notifications, per-source declutter
//! steps) is posted here and drained later on the same thread by
//! [`ArchivalEngine::run_pending_tasks`](super::archival_engine::ArchivalEngine::run_pending_tasks).

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::managers::source_registry::{SourceEvent, SourceId};

/// A unit of deferred archiver work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTask {
    /// A working set appeared, finished restoring, or went away.
    Source(SourceEvent),
    /// Scan one working set on behalf of a declutter pass.
    DeclutterSource { pass_id: u64, source: SourceId },
}

/// FIFO of pending tasks. Shared through `Rc`, never across threads.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<EngineTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, task: EngineTask) {
        self.tasks.borrow_mut().push_back(task);
    }

    pub fn pop(&self) -> Option<EngineTask> {
        self.tasks.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.tasks.borrow_mut().clear();
    }
}
