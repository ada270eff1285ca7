//! Registry of running analyses
//!
//! The enclosing shell (CLI, HTTP surface, embedder) tracks concurrent
//! analyses here: one entry per novel identifier with a progress snapshot
//! and a cancellation handle. Analyses over the same identifier are
//! rejected while one is running, which is what makes concurrent runs
//! safe at the store level.

use crate::error::AnalysisError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// A shared stop request for one analysis run.
///
/// Every clone views the same flag, so the registry can hold one end
/// while the orchestrator polls the other. The orchestrator only looks
/// at the flag between stages; a stage that has already started runs to
/// completion, and nothing reaches the graph store after the flag is
/// observed set.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running analysis to stop at its next stage boundary.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested. Polled between stages.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Terminal or in-flight status of one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

/// Shared, cheaply clonable view of one analysis run.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    signal: CancelSignal,
    progress: Arc<AtomicU8>,
    message: Arc<Mutex<String>>,
    status: Arc<Mutex<TaskStatus>>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            signal: CancelSignal::new(),
            progress: Arc::new(AtomicU8::new(0)),
            message: Arc::new(Mutex::new(String::new())),
            status: Arc::new(Mutex::new(TaskStatus::Running)),
        }
    }

    /// The stop signal to hand to the orchestrator.
    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.signal
    }

    /// Record a progress report (0–100 plus a short message).
    pub fn report(&self, pct: u8, message: &str) {
        self.progress.store(pct.min(100), Ordering::Relaxed);
        if let Ok(mut slot) = self.message.lock() {
            *slot = message.to_string();
        }
    }

    pub fn progress(&self) -> (u8, String) {
        let message = self
            .message
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();
        (self.progress.load(Ordering::Relaxed), message)
    }

    pub fn status(&self) -> TaskStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or(TaskStatus::Running)
    }

    fn set_status(&self, status: TaskStatus) {
        if let Ok(mut slot) = self.status.lock() {
            *slot = status;
        }
    }
}

/// Concurrent registry of analyses keyed by novel identifier.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: DashMap<String, TaskHandle>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Register a new analysis. Fails while another run over the same
    /// novel id is still in flight.
    pub fn begin(&self, novel_id: &str) -> Result<TaskHandle, AnalysisError> {
        if let Some(existing) = self.tasks.get(novel_id) {
            if existing.status() == TaskStatus::Running {
                return Err(AnalysisError::InvalidInput(format!(
                    "analysis already running for novel '{novel_id}'"
                )));
            }
        }
        let handle = TaskHandle::new();
        self.tasks.insert(novel_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Mark an analysis finished.
    pub fn finish(&self, novel_id: &str, status: TaskStatus) {
        if let Some(handle) = self.tasks.get(novel_id) {
            handle.set_status(status);
        }
    }

    /// Request cancellation of a running analysis.
    pub fn cancel(&self, novel_id: &str) -> bool {
        match self.tasks.get(novel_id) {
            Some(handle) if handle.status() == TaskStatus::Running => {
                handle.cancel_signal().set();
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, novel_id: &str) -> Option<TaskHandle> {
        self.tasks.get(novel_id).map(|h| h.value().clone())
    }

    /// Ids of analyses still in flight.
    pub fn running(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|entry| entry.value().status() == TaskStatus::Running)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
