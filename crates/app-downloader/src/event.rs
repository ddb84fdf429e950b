use tokio::sync::mpsc;

use crate::report::{FetchResult, ProgressSnapshot, RunSummary};

/// Something that happened during a run, in the order it happened.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started {
        total: usize,
    },
    /// Bytes received so far for one task.
    Transfer {
        task_id: usize,
        name: String,
        received: u64,
        total: Option<u64>,
    },
    Finished(FetchResult),
    Progress(ProgressSnapshot),
    Completed(RunSummary),
}

/// Optional sending half of the event channel.
///
/// Events are dropped when nobody listens.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<RunEvent>>);

impl EventSink {
    #[must_use]
    pub const fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self(Some(sender))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.0 {
            // The receiver going away only means nobody is watching anymore.
            let _ = tx.send(event);
        }
    }
}
