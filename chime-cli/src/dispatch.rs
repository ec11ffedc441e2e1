use anyhow::Result;
use chime_core::{AlarmScheduler, FireOutcome};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

use crate::alert::TerminalAlert;
use crate::store::JsonAlarmStore;
use crate::wakeups::FileWakeupService;

pub type CliScheduler = AlarmScheduler<JsonAlarmStore, FileWakeupService, TerminalAlert>;

pub fn format_local(when: DateTime<Utc>, tz: Tz) -> String {
    when.with_timezone(&tz).format("%a %Y-%m-%d %H:%M").to_string()
}

/// Fire every registration whose instant has elapsed, routing each through
/// the lifecycle controller. Returns the number fired.
pub fn dispatch(sched: &mut CliScheduler, dry_run: bool) -> Result<usize> {
    let now = Utc::now();
    let tz = sched.timezone();

    if dry_run {
        let due: Vec<_> = sched
            .wakeups()
            .registrations()?
            .into_iter()
            .filter(|r| r.due_at_utc <= now)
            .collect();
        if due.is_empty() {
            println!("No due alarms.");
            return Ok(0);
        }
        for reg in &due {
            println!(
                "[DRY RUN] would fire alarm {} ({}) due {}",
                reg.alarm_id,
                reg.label,
                format_local(reg.due_at_utc, tz)
            );
        }
        return Ok(0);
    }

    let due = sched.wakeups_mut().take_due(now)?;
    if due.is_empty() {
        println!("No due alarms.");
        return Ok(0);
    }

    let mut fired = 0usize;
    for reg in due {
        match sched.on_fire(reg.alarm_id, now)? {
            FireOutcome::Rearmed(next) => {
                fired += 1;
                println!(
                    "Alarm {} ({}) fired; next {}",
                    reg.alarm_id,
                    reg.label,
                    format_local(next, tz)
                );
            }
            FireOutcome::Retired => {
                fired += 1;
                println!("Alarm {} ({}) fired; one-shot disabled", reg.alarm_id, reg.label);
            }
            FireOutcome::AlreadyDisabled => {
                fired += 1;
                println!("Alarm {} ({}) fired while disabled", reg.alarm_id, reg.label);
            }
            FireOutcome::UnknownAlarm => {
                println!("Alarm {} no longer exists; skipped", reg.alarm_id);
            }
        }
    }

    println!("Dispatch complete. Fired {fired} alarm(s).");
    Ok(fired)
}

/// Registration-table summary: active/due counts and the next wake-up.
pub fn status(sched: &CliScheduler) -> Result<()> {
    let regs = sched.wakeups().registrations()?;
    let now = Utc::now();
    let due = regs.iter().filter(|r| r.due_at_utc <= now).count();

    println!("Registrations: {} active, {} due", regs.len(), due);
    if let Some(next) = regs.iter().find(|r| r.due_at_utc > now) {
        println!(
            "Next wake-up: alarm {} ({}) at {}",
            next.alarm_id,
            next.label,
            format_local(next.due_at_utc, sched.timezone())
        );
    }
    Ok(())
}

/// Foreground loop: fire whatever is due, sleep until the next registration
/// (capped at the poll cadence), repeat. Ctrl-C exits cleanly.
pub async fn watch(sched: &mut CliScheduler, poll_seconds: u64) -> Result<()> {
    println!("Watching for due alarms. Ctrl-C to stop.");
    loop {
        let now = Utc::now();
        let due = sched.wakeups_mut().take_due(now)?;
        for reg in due {
            sched.on_fire(reg.alarm_id, now)?;
        }

        let idle = Duration::from_secs(poll_seconds.max(1));
        let sleep_for = match sched.wakeups().next_due()? {
            Some(next) => (next.due_at_utc - Utc::now())
                .to_std()
                .unwrap_or(Duration::from_millis(250))
                .min(idle),
            None => idle,
        };

        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopped.");
                return Ok(());
            }
        }
    }
}
