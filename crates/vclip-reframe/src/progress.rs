//! Progress reporting for reframe renders.
//!
//! The orchestrator emits events into a bounded channel without blocking;
//! the caller decides where they go (job logs, websocket, metrics).

use tokio::sync::mpsc;
use vclip_models::ReframeMode;

/// Progress event emitted during a render.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Render started.
    Started { total_frames: u64 },

    /// One output frame was written. `fraction` is monotonically
    /// increasing in (0, 1].
    FrameProcessed {
        frame_index: u64,
        fraction: f64,
        mode: ReframeMode,
    },

    /// Framing mode changed on `frame_index`.
    ModeChanged {
        frame_index: u64,
        from: ReframeMode,
        to: ReframeMode,
    },

    /// Every frame in the window was written and the sink finished.
    Complete { frames_written: u64 },

    /// Render stopped on a cancellation request.
    Cancelled { frames_written: u64 },

    /// Render failed.
    Failed { error: String },
}

impl ProgressEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. }
                | ProgressEvent::Cancelled { .. }
                | ProgressEvent::Failed { .. }
        )
    }
}

/// Progress sender for a single render.
///
/// Uses a bounded channel to avoid blocking the render thread.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create a sender together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Send a progress event (non-blocking).
    pub fn send(&self, event: ProgressEvent) {
        // Events are dropped when the channel is full or closed; terminal
        // state is always carried by the render's return value.
        let _ = self.tx.try_send(event);
    }

    pub fn started(&self, total_frames: u64) {
        self.send(ProgressEvent::Started { total_frames });
    }

    pub fn frame_processed(&self, frame_index: u64, fraction: f64, mode: ReframeMode) {
        self.send(ProgressEvent::FrameProcessed {
            frame_index,
            fraction,
            mode,
        });
    }

    pub fn mode_changed(&self, frame_index: u64, from: ReframeMode, to: ReframeMode) {
        self.send(ProgressEvent::ModeChanged {
            frame_index,
            from,
            to,
        });
    }

    pub fn complete(&self, frames_written: u64) {
        self.send(ProgressEvent::Complete { frames_written });
    }

    pub fn cancelled(&self, frames_written: u64) {
        self.send(ProgressEvent::Cancelled { frames_written });
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.send(ProgressEvent::Failed {
            error: error.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_delivered_in_order() {
        let (sender, mut rx) = ProgressSender::channel(8);
        sender.started(2);
        sender.frame_processed(0, 0.5, ReframeMode::Solo);
        sender.complete(2);

        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::Started { total_frames: 2 });
        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::FrameProcessed { frame_index: 0, .. }
        ));
        assert!(rx.try_recv().unwrap().is_terminal());
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sender, mut rx) = ProgressSender::channel(1);
        sender.started(10);
        sender.failed("dropped");
        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::Started { total_frames: 10 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stream_ends_when_sender_dropped() {
        let (sender, mut rx) = ProgressSender::channel(4);
        sender.cancelled(3);
        drop(sender);

        let event = tokio_test::block_on(rx.recv());
        assert_eq!(event, Some(ProgressEvent::Cancelled { frames_written: 3 }));
        assert_eq!(tokio_test::block_on(rx.recv()), None);
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (sender, rx) = ProgressSender::channel(4);
        drop(rx);
        sender.complete(1);
    }
}
