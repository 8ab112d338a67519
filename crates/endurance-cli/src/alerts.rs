use std::io::Write;

use endurance_core::{AlertError, AlertSink};

/// Completion alerts for a terminal: the bell character for sound and a
/// line on stderr for notifications.
pub struct TerminalAlerts;

impl AlertSink for TerminalAlerts {
    fn play_sound(&self) -> Result<(), AlertError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| AlertError(e.to_string()))
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), AlertError> {
        tracing::info!(title, body, "notification");
        writeln!(std::io::stderr(), "{title}: {body}").map_err(|e| AlertError(e.to_string()))
    }
}
