//! Date cursor: walks forward from a start datetime by a recurrence step.
//!
//! Day-based steps are plain day counts. Month steps are computed from the
//! anchor (`anchor + k * n` months) rather than from the previous
//! occurrence, so a start on the 31st clamps to shorter months without
//! drifting: Jan 31, Feb 28, Mar 31, Apr 30.

use chrono::{Duration, Months, NaiveDateTime};

use super::event::RecurrenceType;

/// Distance between two consecutive occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Days(u32),
    Months(u32),
}

/// Day step that `custom_days` forces when the title mentions "25".
pub const CUSTOM_DAYS_TITLE_STEP: u32 = 25;

impl Step {
    /// Step for a recurrence rule, or `None` when the rule does not repeat.
    ///
    /// NOTE: `custom_days` ignores the interval and steps 25 days whenever
    /// the title contains "25". Existing calendars depend on this, so it is
    /// kept as-is (see DESIGN.md).
    pub fn for_rule(recurrence_type: RecurrenceType, interval: u32, title: &str) -> Option<Step> {
        let interval = interval.max(1);
        match recurrence_type {
            RecurrenceType::None => None,
            RecurrenceType::Daily => Some(Step::Days(interval)),
            RecurrenceType::Weekly => Some(Step::Days(interval.saturating_mul(7))),
            RecurrenceType::Biweekly => Some(Step::Days(14)),
            RecurrenceType::Monthly => Some(Step::Months(interval)),
            RecurrenceType::CustomDays if title.contains("25") => {
                Some(Step::Days(CUSTOM_DAYS_TITLE_STEP))
            }
            RecurrenceType::CustomDays => Some(Step::Days(interval)),
        }
    }

    /// Position `k` steps after `anchor`, or `None` on calendar overflow.
    pub fn nth_after(self, anchor: NaiveDateTime, k: u32) -> Option<NaiveDateTime> {
        match self {
            Step::Days(days) => {
                let total = i64::from(days).checked_mul(i64::from(k))?;
                anchor.checked_add_signed(Duration::try_days(total)?)
            }
            Step::Months(months) => {
                let total = months.checked_mul(k)?;
                anchor.checked_add_months(Months::new(total))
            }
        }
    }

    /// Advance a single date by one step.
    pub fn apply(self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        self.nth_after(from, 1)
    }
}

/// Iterator over `anchor, anchor + step, anchor + 2*step, ...`.
///
/// Without a step it yields the anchor once. Ends when date arithmetic
/// overflows; callers bound it by window and count.
#[derive(Debug, Clone)]
pub struct DateCursor {
    anchor: NaiveDateTime,
    step: Option<Step>,
    index: u32,
    exhausted: bool,
}

impl DateCursor {
    pub fn new(anchor: NaiveDateTime, step: Option<Step>) -> Self {
        Self {
            anchor,
            step,
            index: 0,
            exhausted: false,
        }
    }

    pub fn step(&self) -> Option<Step> {
        self.step
    }
}

impl Iterator for DateCursor {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let Some(step) = self.step else {
            self.exhausted = true;
            return Some(self.anchor);
        };
        let current = step.nth_after(self.anchor, self.index);
        match (current, self.index.checked_add(1)) {
            (Some(at), Some(next)) => {
                self.index = next;
                Some(at)
            }
            (at, _) => {
                self.exhausted = true;
                at
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn weekly_multiplies_interval_by_seven() {
        assert_eq!(
            Step::for_rule(RecurrenceType::Weekly, 3, "Backup"),
            Some(Step::Days(21))
        );
    }

    #[test]
    fn biweekly_ignores_interval() {
        assert_eq!(
            Step::for_rule(RecurrenceType::Biweekly, 5, "Backup"),
            Some(Step::Days(14))
        );
    }

    #[test]
    fn custom_days_title_quirk_forces_25() {
        assert_eq!(
            Step::for_rule(RecurrenceType::CustomDays, 5, "Pago día 25"),
            Some(Step::Days(25))
        );
        assert_eq!(
            Step::for_rule(RecurrenceType::CustomDays, 5, "Pago quincenal"),
            Some(Step::Days(5))
        );
    }

    #[test]
    fn none_has_no_step() {
        assert_eq!(Step::for_rule(RecurrenceType::None, 1, "x"), None);
    }

    #[test]
    fn month_steps_clamp_without_drift() {
        let dates: Vec<_> = DateCursor::new(at("2025-01-31T09:00:00"), Some(Step::Months(1)))
            .take(4)
            .collect();
        assert_eq!(
            dates,
            vec![
                at("2025-01-31T09:00:00"),
                at("2025-02-28T09:00:00"),
                at("2025-03-31T09:00:00"),
                at("2025-04-30T09:00:00"),
            ]
        );
    }

    #[test]
    fn cursor_without_step_yields_anchor_once() {
        let dates: Vec<_> = DateCursor::new(at("2025-06-01T12:00:00"), None).collect();
        assert_eq!(dates, vec![at("2025-06-01T12:00:00")]);
    }

    #[test]
    fn leap_day_clamps_in_common_year() {
        let step = Step::Months(12);
        assert_eq!(
            step.apply(at("2024-02-29T00:00:00")),
            Some(at("2025-02-28T00:00:00"))
        );
    }

    #[test]
    fn cursor_stops_on_overflow() {
        let near_max = chrono::NaiveDate::MAX.and_hms_opt(0, 0, 0).unwrap() - Duration::days(3);
        let dates: Vec<_> = DateCursor::new(near_max, Some(Step::Days(2))).take(10).collect();
        assert_eq!(dates.len(), 2);
    }
}
