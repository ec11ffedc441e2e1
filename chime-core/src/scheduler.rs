//! Alarm lifecycle: scheduling, cancellation, fire handling, boot recovery.
//!
//! The controller is generic over its three collaborators (durable storage,
//! the one-shot wake-up service, the alert sink) so the CLI can plug in
//! file-backed implementations and tests can plug in fakes. `now` is always
//! passed in by the caller; the controller never reads the clock itself.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alarm::{Alarm, AlarmId};
use crate::trigger::next_trigger;

/// Durable alarm storage. Single-record reads and writes are atomic;
/// `put` assigns an id to drafts (id 0) and replaces existing records.
pub trait AlarmStore {
    fn get(&self, id: AlarmId) -> anyhow::Result<Option<Alarm>>;
    fn put(&mut self, alarm: &Alarm) -> anyhow::Result<AlarmId>;
    fn delete(&mut self, id: AlarmId) -> anyhow::Result<()>;
    fn list_all(&self) -> anyhow::Result<Vec<Alarm>>;
}

/// A pending one-shot wake-up, keyed by alarm id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeupRequest {
    pub alarm_id: AlarmId,
    pub label: String,
    pub due_at_utc: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WakeupError {
    #[error("exact wake-up scheduling permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// External scheduled-callback service. Registrations fire at-or-after their
/// instant, at most once, and do not survive a process restart.
pub trait WakeupService {
    /// Upsert: registering an id that already holds a registration replaces
    /// it, so an alarm never has two pending wake-ups.
    fn register_one_shot(&mut self, request: WakeupRequest) -> Result<(), WakeupError>;

    /// Idempotent: cancelling an id with no registration is a no-op.
    fn cancel(&mut self, alarm_id: AlarmId) -> Result<(), WakeupError>;
}

/// Presentation collaborator. Fire-and-forget; implementations swallow
/// their own failures.
pub trait AlertSink {
    fn notify_fired(&mut self, alarm_id: AlarmId, label: &str);
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("exact wake-up scheduling permission denied")]
    PermissionDenied,
    #[error("alarm {id}: repeat is enabled but no weekday is selected")]
    DegenerateRecurrence { id: AlarmId },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<WakeupError> for ScheduleError {
    fn from(err: WakeupError) -> Self {
        match err {
            WakeupError::PermissionDenied => Self::PermissionDenied,
            WakeupError::Backend(inner) => Self::Backend(inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Registration upserted for the computed instant.
    Scheduled(DateTime<Utc>),
    /// Disabled alarms are never registered; not an error.
    SkippedDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Recurring alarm re-armed for its next occurrence.
    Rearmed(DateTime<Utc>),
    /// One-shot alarm fired and was disabled.
    Retired,
    /// Record was already disabled when the fire event arrived.
    AlreadyDisabled,
    /// Record deleted between scheduling and firing; nothing to do.
    UnknownAlarm,
}

/// Result of a boot-recovery sweep.
#[derive(Debug, Default)]
pub struct RestoreSummary {
    pub scheduled: usize,
    pub skipped_disabled: usize,
    pub failures: Vec<(AlarmId, ScheduleError)>,
}

/// Orchestrates the trigger calculator against storage, the wake-up service,
/// and the alert sink.
pub struct AlarmScheduler<S: AlarmStore, W: WakeupService, A: AlertSink> {
    store: S,
    wakeups: W,
    alerts: A,
    tz: Tz,
}

impl<S: AlarmStore, W: WakeupService, A: AlertSink> AlarmScheduler<S, W, A> {
    pub fn new(store: S, wakeups: W, alerts: A, tz: Tz) -> Self {
        Self {
            store,
            wakeups,
            alerts,
            tz,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn wakeups(&self) -> &W {
        &self.wakeups
    }

    pub fn wakeups_mut(&mut self) -> &mut W {
        &mut self.wakeups
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Register the alarm's next occurrence with the wake-up service.
    ///
    /// Disabled alarms are skipped, not failed. On `PermissionDenied` the
    /// record stays enabled but unregistered; the caller re-attempts once
    /// the capability is granted.
    pub fn schedule(
        &mut self,
        alarm: &Alarm,
        now_utc: DateTime<Utc>,
    ) -> Result<ScheduleOutcome, ScheduleError> {
        if !alarm.is_enabled {
            debug!(id = alarm.id, "alarm disabled, not scheduling");
            return Ok(ScheduleOutcome::SkippedDisabled);
        }

        let due_at = next_trigger(alarm, now_utc, self.tz)
            .ok_or(ScheduleError::DegenerateRecurrence { id: alarm.id })?;

        self.wakeups.register_one_shot(WakeupRequest {
            alarm_id: alarm.id,
            label: alarm.label.clone(),
            due_at_utc: due_at,
        })?;

        debug!(id = alarm.id, label = %alarm.label, due_at = %due_at, "scheduled wake-up");
        Ok(ScheduleOutcome::Scheduled(due_at))
    }

    /// Remove any pending wake-up for the alarm. Idempotent.
    pub fn cancel(&mut self, id: AlarmId) -> Result<(), ScheduleError> {
        self.wakeups.cancel(id)?;
        debug!(id, "cancelled wake-up");
        Ok(())
    }

    /// Handle an elapsed registration for `id`.
    ///
    /// Recurring alarms re-arm themselves (each registration is one-shot by
    /// construction); one-shot alarms are persisted disabled. The alert sink
    /// is signalled exactly once per fire event, before the state
    /// transition, and only when the record still exists.
    pub fn on_fire(
        &mut self,
        id: AlarmId,
        now_utc: DateTime<Utc>,
    ) -> Result<FireOutcome, ScheduleError> {
        let Some(alarm) = self.store.get(id)? else {
            debug!(id, "fire event for unknown alarm, ignoring");
            return Ok(FireOutcome::UnknownAlarm);
        };

        self.alerts.notify_fired(alarm.id, &alarm.label);

        if alarm.is_enabled && alarm.is_recurring {
            match self.schedule(&alarm, now_utc)? {
                ScheduleOutcome::Scheduled(when) => {
                    debug!(id, next = %when, "re-armed repeating alarm");
                    Ok(FireOutcome::Rearmed(when))
                }
                ScheduleOutcome::SkippedDisabled => Ok(FireOutcome::AlreadyDisabled),
            }
        } else if alarm.is_enabled {
            let retired = Alarm {
                is_enabled: false,
                ..alarm
            };
            self.store.put(&retired)?;
            debug!(id, "one-shot alarm fired, disabled");
            Ok(FireOutcome::Retired)
        } else {
            warn!(id, "fire event for disabled alarm, no state change");
            Ok(FireOutcome::AlreadyDisabled)
        }
    }

    /// Boot/process-restart recovery: wake-up registrations do not survive a
    /// restart, so re-derive and re-register every enabled alarm.
    ///
    /// Per-alarm failures are tallied and the sweep continues; one bad
    /// record must not leave every other alarm unscheduled after a reboot.
    pub fn restore_all(
        &mut self,
        now_utc: DateTime<Utc>,
    ) -> Result<RestoreSummary, ScheduleError> {
        let alarms = self.store.list_all()?;
        let mut summary = RestoreSummary::default();

        for alarm in &alarms {
            if !alarm.is_enabled {
                summary.skipped_disabled += 1;
                continue;
            }
            match self.schedule(alarm, now_utc) {
                Ok(ScheduleOutcome::Scheduled(_)) => summary.scheduled += 1,
                Ok(ScheduleOutcome::SkippedDisabled) => summary.skipped_disabled += 1,
                Err(err) => {
                    warn!(id = alarm.id, %err, "failed to restore alarm");
                    summary.failures.push((alarm.id, err));
                }
            }
        }

        info!(
            scheduled = summary.scheduled,
            skipped = summary.skipped_disabled,
            failed = summary.failures.len(),
            "restored wake-up registrations"
        );
        Ok(summary)
    }
}
