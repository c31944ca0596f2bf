//! [`ErrorSink`] – per-server, single-slot runtime error channel.
//!
//! Runtime channel errors (decode failures, write failures, unexpected
//! closures, failed handshakes) are reported here.  Reporting never blocks:
//! when the slot is already occupied the new error is dropped, after being
//! logged.

use gasp_types::GaspError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Sending half of the error channel.  Cheap to clone.
#[derive(Clone, Debug)]
pub struct ErrorSink {
    sender: mpsc::Sender<GaspError>,
}

impl ErrorSink {
    /// Create a sink and the receiver that drains it.
    pub fn channel() -> (Self, mpsc::Receiver<GaspError>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender }, receiver)
    }

    /// Report `err` without blocking.
    pub fn report(&self, err: GaspError) {
        warn!(error = %err, "runtime error");
        match self.sender.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(error = %dropped, "error sink occupied; error dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
