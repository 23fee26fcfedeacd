//! Weekly recurrence of planned disruptions.

use api_types::RecurrencePatternPayload;
use chrono::{Datelike, NaiveDate, Weekday};

use super::ValidationError;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Compact representation of the weekdays a disruption recurs on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekdayFlags {
    flags: u8,
}

impl WeekdayFlags {
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    pub fn set(&mut self, weekday: Weekday) {
        self.flags |= 1 << weekday.num_days_from_monday();
    }

    pub fn unset(&mut self, weekday: Weekday) {
        self.flags &= !(1 << weekday.num_days_from_monday());
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.flags & (1 << weekday.num_days_from_monday())) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }

    pub fn weekdays(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdayFlags {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut flags = Self::new();
        for day in iter {
            flags.set(day);
        }
        flags
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub start_date: NaiveDate,
    /// Inclusive
    pub until: NaiveDate,
    pub weekdays: WeekdayFlags,
}

impl RecurrencePattern {
    pub fn new(start_date: NaiveDate, until: NaiveDate, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            start_date,
            until,
            weekdays: weekdays.into_iter().collect(),
        }
    }

    pub fn active_on(&self, date: NaiveDate) -> bool {
        if date < self.start_date || date > self.until {
            return false;
        }
        self.weekdays.contains(date.weekday())
    }

    /// Every date the pattern is active on, in order
    pub fn occurrences(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(|date| *date <= self.until)
            .filter(|date| self.weekdays.contains(date.weekday()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.until < self.start_date {
            return Err(ValidationError::InvalidRecurrence(
                "the last date is before the first".into(),
            ));
        }
        if self.weekdays.is_empty() {
            return Err(ValidationError::InvalidRecurrence("no weekdays selected".into()));
        }
        Ok(())
    }

    pub fn to_payload(&self) -> RecurrencePatternPayload {
        RecurrencePatternPayload {
            dtstart: self.start_date,
            until: self.until,
            byweekday: self
                .weekdays
                .weekdays()
                .map(|day| day.num_days_from_monday() as u8)
                .collect(),
        }
    }

    pub fn from_payload(payload: &RecurrencePatternPayload) -> Result<Self, ValidationError> {
        let weekdays = payload
            .byweekday
            .iter()
            .map(|n| {
                WEEK.get(usize::from(*n))
                    .copied()
                    .ok_or_else(|| ValidationError::InvalidRecurrence(format!("weekday {n} out of range")))
            })
            .collect::<Result<WeekdayFlags, _>>()?;

        Ok(Self {
            start_date: payload.dtstart,
            until: payload.until,
            weekdays,
        })
    }
}
