use anyhow::{Context, Result};
use chime_core::{AlarmId, AlertSink};
use tracing::debug;

/// Rings the terminal bell and prints the firing; optionally forwards it to
/// the desktop through `notify-send` (Linux) or `osascript` (macOS) when one
/// of them is on PATH. Delivery failures are logged and swallowed; the
/// lifecycle transition must not depend on presentation.
pub struct TerminalAlert {
    desktop: bool,
}

impl TerminalAlert {
    pub fn new(desktop: bool) -> Self {
        Self { desktop }
    }
}

impl AlertSink for TerminalAlert {
    fn notify_fired(&mut self, alarm_id: AlarmId, label: &str) {
        let label = if label.is_empty() { "Alarm" } else { label };
        println!("\x07Alarm {alarm_id} ringing: {label}");
        if self.desktop {
            if let Err(err) = send_desktop_notification(label) {
                debug!(%err, "desktop notification failed");
            }
        }
    }
}

fn send_desktop_notification(label: &str) -> Result<()> {
    if let Ok(bin) = which::which("notify-send") {
        let status = std::process::Command::new(bin)
            .arg("--urgency=critical")
            .arg("Alarm ringing")
            .arg(label)
            .status()
            .context("running notify-send")?;
        if !status.success() {
            anyhow::bail!("notify-send exited with {status}");
        }
        return Ok(());
    }

    if let Ok(bin) = which::which("osascript") {
        let script = format!(
            "display notification \"{}\" with title \"Alarm ringing\"",
            escape_osascript(label)
        );
        let status = std::process::Command::new(bin)
            .arg("-e")
            .arg(&script)
            .status()
            .context("running osascript")?;
        if !status.success() {
            anyhow::bail!("osascript exited with {status}");
        }
        return Ok(());
    }

    debug!("no desktop notifier on PATH; terminal only");
    Ok(())
}

fn escape_osascript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
