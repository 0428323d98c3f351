//! Resumable upload tasks
//!
//! A storage client starts an upload and hands back an [`UploadTask`]. The
//! task is a stream of [`TaskEvent`]s: zero or more `Progress` events
//! followed by exactly one `Completed` or `Failed`. The client drives the
//! transfer through the paired [`TaskHandle`], which also observes
//! pause/resume/cancel requests made on the task.

use crate::client::reference::StorageReference;
use crate::error::{Result, StorageError};
use futures::channel::mpsc;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Paused,
    Success,
    Canceled,
    Error,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Running => write!(f, "running"),
            TaskState::Paused => write!(f, "paused"),
            TaskState::Success => write!(f, "success"),
            TaskState::Canceled => write!(f, "canceled"),
            TaskState::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time view of an upload
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub state: TaskState,
    pub reference: StorageReference,
}

impl TaskSnapshot {
    pub fn new(reference: StorageReference, total_bytes: u64) -> Self {
        Self {
            bytes_transferred: 0,
            total_bytes,
            state: TaskState::Running,
            reference,
        }
    }

    /// Transferred share in percent (0 to 100); an empty upload counts as done
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0).min(100.0)
        }
    }
}

#[derive(Debug)]
pub enum TaskEvent {
    Progress(TaskSnapshot),
    Failed(StorageError),
    Completed(TaskSnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskControl {
    Running,
    Paused,
    Canceled,
}

/// Consumer side of a resumable upload
pub struct UploadTask {
    events: mpsc::UnboundedReceiver<TaskEvent>,
    control: watch::Sender<TaskControl>,
    snapshot: TaskSnapshot,
    finished: bool,
}

impl std::fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTask")
            .field("snapshot", &self.snapshot)
            .field("finished", &self.finished)
            .finish()
    }
}

impl UploadTask {
    /// Create a task and the handle the client uses to drive it
    pub fn channel(reference: StorageReference, total_bytes: u64) -> (UploadTask, TaskHandle) {
        let (events_tx, events_rx) = mpsc::unbounded();
        let (control_tx, control_rx) = watch::channel(TaskControl::Running);
        let snapshot = TaskSnapshot::new(reference, total_bytes);

        let task = UploadTask {
            events: events_rx,
            control: control_tx,
            snapshot: snapshot.clone(),
            finished: false,
        };
        let handle = TaskHandle {
            events: events_tx,
            control: control_rx,
            snapshot,
        };

        (task, handle)
    }

    /// Latest snapshot observed through the event stream
    pub fn snapshot(&self) -> &TaskSnapshot {
        &self.snapshot
    }

    pub fn pause(&self) -> bool {
        self.request(TaskControl::Paused)
    }

    pub fn resume(&self) -> bool {
        self.request(TaskControl::Running)
    }

    pub fn cancel(&self) -> bool {
        self.request(TaskControl::Canceled)
    }

    /// Returns false once the task is finished or already cancelled
    fn request(&self, next: TaskControl) -> bool {
        if self.finished || *self.control.borrow() == TaskControl::Canceled {
            return false;
        }
        self.control.send_replace(next);
        true
    }
}

impl Stream for UploadTask {
    type Item = TaskEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.events).poll_next(cx) {
            Poll::Ready(Some(event)) => {
                match &event {
                    TaskEvent::Progress(snapshot) => this.snapshot = snapshot.clone(),
                    TaskEvent::Completed(snapshot) => {
                        this.snapshot = snapshot.clone();
                        this.finished = true;
                    }
                    TaskEvent::Failed(err) => {
                        this.snapshot.state = match err {
                            StorageError::Cancelled { .. } => TaskState::Canceled,
                            _ => TaskState::Error,
                        };
                        this.finished = true;
                    }
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Producer side of a resumable upload, owned by the storage client
#[derive(Debug)]
pub struct TaskHandle {
    events: mpsc::UnboundedSender<TaskEvent>,
    control: watch::Receiver<TaskControl>,
    snapshot: TaskSnapshot,
}

impl TaskHandle {
    pub fn snapshot(&self) -> &TaskSnapshot {
        &self.snapshot
    }

    /// Record `bytes` more transferred and emit a progress event
    pub fn advance(&mut self, bytes: u64) {
        self.snapshot.bytes_transferred =
            (self.snapshot.bytes_transferred + bytes).min(self.snapshot.total_bytes);
        self.snapshot.state = TaskState::Running;
        self.emit(TaskEvent::Progress(self.snapshot.clone()));
    }

    /// Wait out a pause; fails if the task was cancelled or dropped
    pub async fn checkpoint(&mut self) -> Result<()> {
        loop {
            let control = *self.control.borrow_and_update();
            match control {
                TaskControl::Running => {
                    if self.snapshot.state == TaskState::Paused {
                        self.snapshot.state = TaskState::Running;
                        self.emit(TaskEvent::Progress(self.snapshot.clone()));
                    }
                    return Ok(());
                }
                TaskControl::Canceled => return Err(StorageError::cancelled("upload")),
                TaskControl::Paused => {
                    if self.snapshot.state != TaskState::Paused {
                        self.snapshot.state = TaskState::Paused;
                        self.emit(TaskEvent::Progress(self.snapshot.clone()));
                    }
                    if self.control.changed().await.is_err() {
                        return Err(StorageError::cancelled("upload"));
                    }
                }
            }
        }
    }

    pub fn complete(mut self) {
        self.snapshot.state = TaskState::Success;
        self.emit(TaskEvent::Completed(self.snapshot.clone()));
    }

    pub fn fail(mut self, err: StorageError) {
        self.snapshot.state = match err {
            StorageError::Cancelled { .. } => TaskState::Canceled,
            _ => TaskState::Error,
        };
        self.emit(TaskEvent::Failed(err));
    }

    fn emit(&self, event: TaskEvent) {
        // The consumer may have dropped the task; the transfer still finishes
        let _ = self.events.unbounded_send(event);
    }
}
