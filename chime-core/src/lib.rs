//! chime-core: alarm model, next-trigger computation, and lifecycle control.

pub mod alarm;
pub mod scheduler;
pub mod trigger;

pub use alarm::{Alarm, AlarmId, AlarmValidationError};
pub use scheduler::{
    AlarmScheduler, AlarmStore, AlertSink, FireOutcome, RestoreSummary, ScheduleError,
    ScheduleOutcome, WakeupError, WakeupRequest, WakeupService,
};
pub use trigger::{MAX_SCAN_DAYS, next_trigger};
