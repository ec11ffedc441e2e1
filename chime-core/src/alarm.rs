//! Alarm model: the record everything else schedules around.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-assigned identity. 0 marks a draft that has not been persisted yet.
pub type AlarmId = i64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlarmValidationError {
    #[error("hour {0} out of range (0-23)")]
    HourOutOfRange(u32),
    #[error("minute {0} out of range (0-59)")]
    MinuteOutOfRange(u32),
    #[error("repeating alarm selects no weekdays")]
    NoRepeatDays,
}

/// Core alarm record.
///
/// Treated as an immutable value: every state change (enable toggle,
/// post-fire retirement) builds a new record and persists it, instead of
/// mutating one shared between the list view and the fire handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub hour: u32,
    pub minute: u32,

    /// When false the alarm fires once and is then disabled.
    pub is_recurring: bool,

    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,

    /// Disabled alarms are inert: never registered, never fired.
    pub is_enabled: bool,

    pub label: String,

    /// Listing order only; scheduling never reads this.
    pub created_at_utc: DateTime<Utc>,
}

impl Alarm {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            id: 0,
            hour,
            minute,
            is_recurring: false,
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
            is_enabled: true,
            label: String::new(),
            created_at_utc: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_repeat_days(mut self, days: &[Weekday]) -> Self {
        for day in days {
            self.set_day(*day);
        }
        self
    }

    fn set_day(&mut self, day: Weekday) {
        match day {
            Weekday::Mon => self.monday = true,
            Weekday::Tue => self.tuesday = true,
            Weekday::Wed => self.wednesday = true,
            Weekday::Thu => self.thursday = true,
            Weekday::Fri => self.friday = true,
            Weekday::Sat => self.saturday = true,
            Weekday::Sun => self.sunday = true,
        }
    }

    pub fn repeating(mut self) -> Self {
        self.is_recurring = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    pub fn with_created_at(mut self, created_at_utc: DateTime<Utc>) -> Self {
        self.created_at_utc = created_at_utc;
        self
    }

    /// Clear every day flag, then set the given ones. Used by the editor
    /// when a repeat-day selection replaces the old one wholesale.
    pub fn replace_repeat_days(&mut self, days: &[Weekday]) {
        self.monday = false;
        self.tuesday = false;
        self.wednesday = false;
        self.thursday = false;
        self.friday = false;
        self.saturday = false;
        self.sunday = false;
        for day in days {
            self.set_day(*day);
        }
    }

    pub fn repeats_on(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn has_repeat_days(&self) -> bool {
        self.monday
            || self.tuesday
            || self.wednesday
            || self.thursday
            || self.friday
            || self.saturday
            || self.sunday
    }

    /// Selected weekdays in Monday-first order, for display.
    pub fn repeat_days(&self) -> Vec<Weekday> {
        [
            (Weekday::Mon, self.monday),
            (Weekday::Tue, self.tuesday),
            (Weekday::Wed, self.wednesday),
            (Weekday::Thu, self.thursday),
            (Weekday::Fri, self.friday),
            (Weekday::Sat, self.saturday),
            (Weekday::Sun, self.sunday),
        ]
        .into_iter()
        .filter_map(|(day, set)| set.then_some(day))
        .collect()
    }

    /// Creation/edit-time validation.
    ///
    /// A repeating alarm with no weekday selected has no defined "next
    /// matching day" and is rejected here rather than discovered mid-scan.
    pub fn validate(&self) -> Result<(), AlarmValidationError> {
        if self.hour > 23 {
            return Err(AlarmValidationError::HourOutOfRange(self.hour));
        }
        if self.minute > 59 {
            return Err(AlarmValidationError::MinuteOutOfRange(self.minute));
        }
        if self.is_recurring && !self.has_repeat_days() {
            return Err(AlarmValidationError::NoRepeatDays);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_alarm_passes() {
        let alarm = Alarm::new(7, 30)
            .with_label("Stand-up")
            .with_repeat_days(&[Weekday::Mon, Weekday::Fri])
            .repeating();
        assert!(alarm.validate().is_ok());
        assert_eq!(alarm.repeat_days(), vec![Weekday::Mon, Weekday::Fri]);
        assert!(alarm.repeats_on(Weekday::Fri));
        assert!(!alarm.repeats_on(Weekday::Tue));
    }

    #[test]
    fn out_of_range_time_rejected() {
        assert_eq!(
            Alarm::new(24, 0).validate(),
            Err(AlarmValidationError::HourOutOfRange(24))
        );
        assert_eq!(
            Alarm::new(7, 60).validate(),
            Err(AlarmValidationError::MinuteOutOfRange(60))
        );
    }

    #[test]
    fn repeating_without_days_rejected() {
        assert_eq!(
            Alarm::new(7, 0).repeating().validate(),
            Err(AlarmValidationError::NoRepeatDays)
        );
    }

    #[test]
    fn replace_repeat_days_clears_the_old_selection() {
        let mut alarm = Alarm::new(7, 0).with_repeat_days(&[Weekday::Mon, Weekday::Tue]);
        alarm.replace_repeat_days(&[Weekday::Sat]);
        assert_eq!(alarm.repeat_days(), vec![Weekday::Sat]);
    }

    #[test]
    fn one_shot_without_days_is_fine() {
        assert!(Alarm::new(7, 0).validate().is_ok());
        assert!(!Alarm::new(7, 0).has_repeat_days());
    }

    #[test]
    fn serde_round_trip_preserves_every_field() {
        let alarm = Alarm::new(6, 45)
            .with_label("Gym")
            .with_repeat_days(&[Weekday::Tue, Weekday::Thu, Weekday::Sun])
            .repeating()
            .disabled();
        let json = serde_json::to_string(&alarm).unwrap();
        let back: Alarm = serde_json::from_str(&json).unwrap();
        assert_eq!(alarm, back);
    }
}
