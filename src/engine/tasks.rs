//! Background tasks
//!
//! Index builds and external sorts can run on a worker thread. The caller
//! gets a `TaskHandle`: the elapsed time arrives over a crossbeam channel,
//! and raising the cancel flag makes the task stop between records with
//! `Cancelled`, leaving the engine as it was before the task started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, TryRecvError};
use tracing::debug;

use crate::error::{PokedexError, Result};
use crate::index::IndexKind;
use crate::sort::{SortKey, SortStrategy};

use super::Engine;

/// Handle to a running background task
pub struct TaskHandle {
    name: String,
    cancel: Arc<AtomicBool>,
    done: Receiver<Result<f64>>,
    thread: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the task to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Result if the task already finished
    pub fn try_result(&self) -> Option<Result<f64>> {
        match self.done.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PokedexError::Cancelled)),
        }
    }

    /// Block until the task finishes, returning its elapsed milliseconds
    pub fn wait(mut self) -> Result<f64> {
        let result = self.done.recv().unwrap_or(Err(PokedexError::Cancelled));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result
    }
}

fn spawn<F>(name: String, task: F) -> Result<TaskHandle>
where
    F: FnOnce(&AtomicBool) -> Result<f64> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = channel::bounded(1);

    let flag = cancel.clone();
    let task_name = name.clone();
    let thread = thread::Builder::new().name(name.clone()).spawn(move || {
        let result = task(&flag);
        debug!(task = %task_name, ok = result.is_ok(), "Background task finished");
        let _ = tx.send(result);
    })?;

    Ok(TaskHandle {
        name,
        cancel,
        done: rx,
        thread: Some(thread),
    })
}

/// Build an index on a worker thread
pub fn build_index_in_background(engine: Arc<Engine>, kind: IndexKind) -> Result<TaskHandle> {
    spawn(format!("index-{}", kind.code()), move |cancel| {
        engine.build_index_inner(kind, Some(cancel), false)
    })
}

/// Sort the store on a worker thread
pub fn sort_in_background(engine: Arc<Engine>, strategy: SortStrategy, key: SortKey) -> Result<TaskHandle> {
    spawn(format!("sort-{}", key), move |cancel| {
        engine.sort_inner(strategy, key, Some(cancel))
    })
}
