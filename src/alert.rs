// =============================================================================
// Alert sink — optional, fire-and-forget notification seam
// =============================================================================
//
// The core never blocks on alerting and never treats a failed alert as an
// error; the Trader holds an `Option<Box<dyn AlertSink>>` and calls `send`
// best-effort on kill switches and losing trades. Concrete channels
// (console, email, websocket) are user-facing surfaces out of scope for the
// core; this trait is the seam they would implement against.

use tracing::error;

pub trait AlertSink: Send + Sync {
    fn send(&self, alert_type: &str, message: &str) -> bool;
}

/// Routes an alert to a sink, swallowing and logging any failure so the
/// trading thread never stalls or panics on a notification problem.
pub fn notify(sink: Option<&dyn AlertSink>, alert_type: &str, message: &str) {
    if let Some(sink) = sink {
        if !sink.send(alert_type, message) {
            error!(alert_type, "alert sink failed to send");
        }
    }
}
