//! Next-trigger computation: pure time math, no side effects.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::alarm::Alarm;

/// Upper bound on the forward day scan. A repeating alarm with no weekday
/// selected never matches; validation rejects that shape at creation, and
/// this guard keeps the calculator terminating for records that slipped
/// past it.
pub const MAX_SCAN_DAYS: u64 = 366;

/// Compute the next instant `alarm` should fire, strictly after `now_utc`.
///
/// Candidates are built at `hour:minute:00` in `tz` on successive calendar
/// days and compared as UTC instants. Deterministic for a given `now_utc`.
///
/// Returns `None` only when no selected, strictly-future candidate exists
/// within the scan window: the degenerate repeating-with-no-days
/// configuration, or a target time-of-day that never resolves in `tz`.
pub fn next_trigger(alarm: &Alarm, now_utc: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let today = now_utc.with_timezone(&tz).date_naive();

    if !alarm.is_recurring && !alarm.has_repeat_days() {
        // Plain one-shot: today if the target is still ahead, otherwise the
        // same time-of-day tomorrow. A past time-of-day never fires
        // immediately.
        if let Some(candidate) = local_candidate(today, alarm, tz) {
            if candidate > now_utc {
                return Some(candidate);
            }
        }
        return local_candidate(today.checked_add_days(Days::new(1))?, alarm, tz);
    }

    // Weekday scan: the nearest selected day with a strictly-future target
    // wins, earliest offset first.
    for offset in 0..=MAX_SCAN_DAYS {
        let day = today.checked_add_days(Days::new(offset))?;
        if !alarm.repeats_on(day.weekday()) {
            continue;
        }
        if let Some(candidate) = local_candidate(day, alarm, tz) {
            if candidate > now_utc {
                return Some(candidate);
            }
        }
    }

    None
}

/// Target time-of-day on `day`, resolved in `tz` and returned as UTC.
///
/// `None` when the local time does not exist that day (spring-forward gap);
/// ambiguous fall-back times resolve to the earlier instant.
fn local_candidate(day: NaiveDate, alarm: &Alarm, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = day.and_hms_opt(alarm.hour, alarm.minute, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use chrono_tz::America::Chicago;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Chicago
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn one_shot_still_ahead_fires_today() {
        let alarm = Alarm::new(7, 0);
        // 2026-02-18 is a Wednesday.
        let now = at(2026, 2, 18, 6, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 18, 7, 0)));
    }

    #[test]
    fn one_shot_already_past_rolls_to_tomorrow() {
        let alarm = Alarm::new(7, 0);
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 19, 7, 0)));
    }

    #[test]
    fn one_shot_exactly_now_is_not_future() {
        let alarm = Alarm::new(7, 0);
        let now = at(2026, 2, 18, 7, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 19, 7, 0)));
    }

    #[test]
    fn weekly_picks_next_selected_day() {
        let alarm = Alarm::new(7, 0).with_repeat_days(&[Weekday::Mon]).repeating();
        // Wednesday 08:00 -> following Monday 07:00.
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 23, 7, 0)));
    }

    #[test]
    fn weekly_selected_today_and_still_ahead_fires_today() {
        let alarm = Alarm::new(7, 0).with_repeat_days(&[Weekday::Wed]).repeating();
        let now = at(2026, 2, 18, 6, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 18, 7, 0)));
    }

    #[test]
    fn weekly_selected_today_but_past_waits_a_full_week() {
        let alarm = Alarm::new(7, 0).with_repeat_days(&[Weekday::Mon]).repeating();
        // Monday 08:00 -> same weekday next week.
        let now = at(2026, 2, 23, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 3, 2, 7, 0)));
    }

    #[test]
    fn weekly_nearest_of_several_days_wins() {
        let alarm = Alarm::new(7, 0)
            .with_repeat_days(&[Weekday::Mon, Weekday::Fri])
            .repeating();
        // Wednesday: Friday is closer than next Monday.
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 20, 7, 0)));
    }

    #[test]
    fn day_flags_without_repeat_flag_still_scan_weekly() {
        let alarm = Alarm::new(7, 0).with_repeat_days(&[Weekday::Sat]);
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 21, 7, 0)));
    }

    #[test]
    fn every_day_selected_behaves_daily() {
        let alarm = Alarm::new(22, 30)
            .with_repeat_days(&[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ])
            .repeating();
        let now = at(2026, 2, 18, 23, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 2, 19, 22, 30)));
    }

    #[test]
    fn degenerate_repeat_returns_none_instead_of_hanging() {
        let alarm = Alarm::new(7, 0).repeating();
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), None);
    }

    #[test]
    fn spring_forward_gap_skips_to_next_day() {
        // 2026-03-08 02:30 does not exist in America/Chicago.
        let alarm = Alarm::new(2, 30);
        let now = at(2026, 3, 8, 1, 0);
        assert_eq!(next_trigger(&alarm, now, Chicago), Some(at(2026, 3, 9, 2, 30)));
    }

    #[test]
    fn fall_back_ambiguity_resolves_to_earlier_instant() {
        // 2026-11-01 01:30 occurs twice in America/Chicago; the CDT pass wins.
        let alarm = Alarm::new(1, 30);
        let now = at(2026, 11, 1, 0, 0);
        let got = next_trigger(&alarm, now, Chicago).unwrap();
        assert_eq!(got.to_rfc3339(), "2026-11-01T06:30:00+00:00");
    }

    #[test]
    fn result_is_deterministic_for_identical_now() {
        let alarm = Alarm::new(7, 0)
            .with_repeat_days(&[Weekday::Tue, Weekday::Sun])
            .repeating();
        let now = at(2026, 2, 18, 8, 0);
        assert_eq!(
            next_trigger(&alarm, now, Chicago),
            next_trigger(&alarm, now, Chicago)
        );
    }
}
