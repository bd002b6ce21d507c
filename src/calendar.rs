//! Calendar arithmetic for 30-day journals.
//!
//! A journal spans `JOURNAL_DAYS` consecutive calendar days starting at its start
//! date, split into `WEEK_COUNT` blocks of `DAYS_PER_WEEK` days. All arithmetic is
//! done on `NaiveDate`, so there is no time of day and no DST to worry about.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const JOURNAL_DAYS: usize = 30;
pub const DAYS_PER_WEEK: usize = 5;
pub const WEEK_COUNT: usize = 6;

/// Key of a week block, `week1` through `week6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(u8);

impl WeekKey {
    pub const FIRST: WeekKey = WeekKey(1);

    /// Build a key from its 1-based number. Returns `None` outside `1..=6`.
    pub fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= WEEK_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// All keys in order.
    pub fn all() -> impl Iterator<Item = WeekKey> {
        (1..=WEEK_COUNT as u8).map(WeekKey)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week{}", self.0)
    }
}

impl FromStr for WeekKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("week")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(WeekKey::new)
            .ok_or_else(|| format!("invalid week key: {}", s))
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The 30 dates covered by a journal starting at `start`.
pub fn journal_dates(start: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take(JOURNAL_DAYS).collect()
}

/// Split the journal's dates into six ordered blocks of five.
pub fn partition(start: NaiveDate) -> BTreeMap<WeekKey, Vec<NaiveDate>> {
    journal_dates(start)
        .chunks(DAYS_PER_WEEK)
        .zip(WeekKey::all())
        .map(|(dates, key)| (key, dates.to_vec()))
        .collect()
}

/// Last date covered by a journal (`start + 29 days`).
pub fn end_date(start: NaiveDate) -> NaiveDate {
    start + Days::new(JOURNAL_DAYS as u64 - 1)
}

/// Week block that holds `date`, or `None` when it falls outside the journal.
pub fn week_containing(start: NaiveDate, date: NaiveDate) -> Option<WeekKey> {
    let offset = (date - start).num_days();
    if offset < 0 || offset >= JOURNAL_DAYS as i64 {
        return None;
    }
    WeekKey::new((offset as usize / DAYS_PER_WEEK) as u8 + 1)
}
