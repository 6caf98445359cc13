//! Month grid layout and date-based event lookups.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};

use super::event::StoredEvent;

/// Events shown per day cell before collapsing into "+N más".
pub const MAX_EVENTS_PER_DAY: usize = 3;

/// Titles longer than this are truncated in day cells.
pub const SHORT_TITLE_LEN: usize = 15;

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Column headers, Sunday first.
pub const DAY_NAMES: [&str; 7] = ["Dom", "Lun", "Mar", "Mié", "Jue", "Vie", "Sáb"];

/// A calendar month, identified by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    first: NaiveDate,
}

impl Month {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn days_in_month(&self) -> u32 {
        self.next()
            .map(|next| (next.first - self.first).num_days() as u32)
            .unwrap_or(31)
    }

    /// Empty cells before day 1 in a Sunday-first week.
    pub fn leading_blanks(&self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    pub fn next(&self) -> Option<Month> {
        self.first
            .checked_add_months(Months::new(1))
            .map(|first| Month { first })
    }

    pub fn prev(&self) -> Option<Month> {
        self.first
            .checked_sub_months(Months::new(1))
            .map(|first| Month { first })
    }

    /// Move by `delta` months, backwards when negative.
    pub fn shift(&self, delta: i32) -> Option<Month> {
        let months = Months::new(delta.unsigned_abs());
        let first = if delta >= 0 {
            self.first.checked_add_months(months)
        } else {
            self.first.checked_sub_months(months)
        };
        first.map(|first| Month { first })
    }

    /// Display name such as "Marzo 2025".
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.first.month0() as usize], self.year())
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take(self.days_in_month() as usize)
    }
}

/// One day of the month grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub is_today: bool,
    /// At most [`MAX_EVENTS_PER_DAY`] events, in list order.
    pub events: Vec<&'a StoredEvent>,
    /// Events on this day that did not fit in the cell.
    pub overflow: usize,
}

/// A month laid out for display.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid<'a> {
    pub month: Month,
    pub leading_blanks: u32,
    pub days: Vec<DayCell<'a>>,
}

impl<'a> MonthGrid<'a> {
    pub fn build(month: Month, events: &'a [StoredEvent], today: NaiveDate) -> Self {
        let days = month
            .days()
            .map(|date| {
                let mut on_day = events_on(events, date);
                let overflow = on_day.len().saturating_sub(MAX_EVENTS_PER_DAY);
                on_day.truncate(MAX_EVENTS_PER_DAY);
                DayCell {
                    date,
                    is_today: date == today,
                    events: on_day,
                    overflow,
                }
            })
            .collect();
        Self {
            month,
            leading_blanks: month.leading_blanks(),
            days,
        }
    }

    /// Rows of seven cells; `None` marks a blank cell.
    pub fn weeks(&self) -> Vec<Vec<Option<&DayCell<'a>>>> {
        let mut cells: Vec<Option<&DayCell<'a>>> = Vec::new();
        cells.extend((0..self.leading_blanks).map(|_| None));
        cells.extend(self.days.iter().map(Some));
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        cells.chunks(7).map(<[_]>::to_vec).collect()
    }
}

/// Events starting on `date`, in list order.
pub fn events_on(events: &[StoredEvent], date: NaiveDate) -> Vec<&StoredEvent> {
    events
        .iter()
        .filter(|e| e.event.start.date() == date)
        .collect()
}

/// Events starting within `[now, now + days]`, earliest first.
///
/// A horizon past the calendar range saturates at `NaiveDateTime::MAX`.
pub fn upcoming(events: &[StoredEvent], now: NaiveDateTime, days: i64) -> Vec<&StoredEvent> {
    let horizon = Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(NaiveDateTime::MAX);
    let mut found: Vec<&StoredEvent> = events
        .iter()
        .filter(|e| e.event.start >= now && e.event.start <= horizon)
        .collect();
    found.sort_by_key(|e| e.event.start);
    found
}

/// Title as shown inside a day cell.
pub fn short_title(title: &str) -> String {
    if title.chars().count() > SHORT_TITLE_LEN {
        let head: String = title.chars().take(SHORT_TITLE_LEN).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}
