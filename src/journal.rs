//! Journal data model.
//!
//! The serialized shape matches the backend's `trading_journals` table, so the
//! same types travel to the REST store, the JSON file store and back.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::calendar::{self, WeekKey};

/// Trade slots recorded per day.
pub const TRADE_ROWS: usize = 5;

pub type WeekData = BTreeMap<WeekKey, WeekBlock>;

/// One slice of a journal: up to five dates, a 5-row trade grid, one charge per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBlock {
    pub dates: Vec<NaiveDate>,
    pub trades: Vec<Vec<f64>>,
    pub charges: Vec<f64>,
}

impl WeekBlock {
    /// Zero-filled block over `dates`.
    pub fn empty(dates: Vec<NaiveDate>) -> Self {
        let len = dates.len();
        Self {
            dates,
            trades: vec![vec![0.0; len]; TRADE_ROWS],
            charges: vec![0.0; len],
        }
    }

    /// Number of day columns.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Trade values recorded on column `day`, zero where a row is short.
    pub fn day_trades(&self, day: usize) -> impl Iterator<Item = f64> + '_ {
        self.trades
            .iter()
            .map(move |row| row.get(day).copied().unwrap_or(0.0))
    }

    pub fn day_charge(&self, day: usize) -> f64 {
        self.charges.get(day).copied().unwrap_or(0.0)
    }

    /// True when the grid holds exactly 5 rows and every row and the charge list
    /// match the number of dates.
    pub fn is_well_formed(&self) -> bool {
        let len = self.len();
        self.trades.len() == TRADE_ROWS
            && self.trades.iter().all(|row| row.len() == len)
            && self.charges.len() == len
    }

    /// Pad or truncate rows and charges to the block's date count.
    fn repaired(mut self) -> Self {
        let len = self.len();
        self.trades.resize(TRADE_ROWS, Vec::new());
        for row in &mut self.trades {
            row.resize(len, 0.0);
        }
        self.charges.resize(len, 0.0);
        self
    }
}

/// Zero-filled week data over the partition of `start`.
pub fn empty_week_data(start: NaiveDate) -> WeekData {
    calendar::partition(start)
        .into_iter()
        .map(|(key, dates)| (key, WeekBlock::empty(dates)))
        .collect()
}

/// A 30-day trading journal as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub month: u32,
    pub year: i32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub starting_capital: f64,
    #[serde(rename = "week_data", default)]
    pub weeks: WeekData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Journal {
    pub fn end_date(&self) -> NaiveDate {
        calendar::end_date(self.start_date)
    }

    /// Align stored week data with the partition of `start_date`.
    ///
    /// Missing weeks are synthesized zero-filled. Stored weeks keep their own dates
    /// (a mismatch with the fresh partition is only logged); a stored week without
    /// dates is rebuilt from the partition. Grids are repaired to the block shape.
    pub fn reconciled(mut self) -> Self {
        for (key, expected) in calendar::partition(self.start_date) {
            let block = match self.weeks.remove(&key) {
                None => WeekBlock::empty(expected),
                Some(stored) if stored.is_empty() => WeekBlock::empty(expected),
                Some(stored) => {
                    if stored.dates != expected {
                        warn!(
                            journal_id = %self.id,
                            week = %key,
                            "stored dates differ from partition, keeping stored dates"
                        );
                    }
                    if stored.is_well_formed() {
                        stored
                    } else {
                        warn!(journal_id = %self.id, week = %key, "repairing malformed week grid");
                        stored.repaired()
                    }
                }
            };
            self.weeks.insert(key, block);
        }
        self
    }
}

/// Payload for creating a journal; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJournal {
    #[serde(rename = "user_id")]
    pub owner: String,
    pub month: u32,
    pub year: i32,
    pub start_date: NaiveDate,
    pub starting_capital: f64,
    #[serde(rename = "week_data")]
    pub weeks: WeekData,
}

impl NewJournal {
    /// Zero-filled journal for `owner` starting at `start`.
    pub fn new(owner: impl Into<String>, start_date: NaiveDate, starting_capital: f64) -> Self {
        Self {
            owner: owner.into(),
            month: start_date.month(),
            year: start_date.year(),
            start_date,
            starting_capital,
            weeks: empty_week_data(start_date),
        }
    }
}

/// Partial update; absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_capital: Option<f64>,
    #[serde(rename = "week_data", default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<WeekData>,
}

impl JournalPatch {
    /// Patch carrying the full editable state of `journal`.
    pub fn from_journal(journal: &Journal) -> Self {
        Self {
            starting_capital: Some(journal.starting_capital),
            weeks: Some(journal.weeks.clone()),
        }
    }

    pub fn apply_to(self, journal: &mut Journal) {
        if let Some(capital) = self.starting_capital {
            journal.starting_capital = capital;
        }
        if let Some(weeks) = self.weeks {
            journal.weeks = weeks;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(n: u8) -> WeekKey {
        WeekKey::new(n).unwrap()
    }

    fn stored(new: NewJournal) -> Journal {
        Journal {
            id: "j1".to_string(),
            owner: new.owner,
            month: new.month,
            year: new.year,
            start_date: new.start_date,
            starting_capital: new.starting_capital,
            weeks: new.weeks,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_journal_shape() {
        let new = NewJournal::new("u1", date(2025, 3, 15), 5000.0);
        assert_eq!(new.month, 3);
        assert_eq!(new.year, 2025);
        assert_eq!(new.weeks.len(), 6);
        for block in new.weeks.values() {
            assert_eq!(block.len(), 5);
            assert!(block.is_well_formed());
            assert!(block.trades.iter().flatten().all(|v| *v == 0.0));
            assert!(block.charges.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn test_end_date() {
        let j = stored(NewJournal::new("u1", date(2025, 1, 1), 0.0));
        assert_eq!(j.end_date(), date(2025, 1, 30));
    }

    #[test]
    fn test_reconcile_synthesizes_missing_weeks() {
        let mut j = stored(NewJournal::new("u1", date(2025, 1, 1), 0.0));
        j.weeks.retain(|k, _| k.number() <= 2);
        j.weeks.get_mut(&key(1)).unwrap().trades[0][0] = 42.0;

        let j = j.reconciled();
        assert_eq!(j.weeks.len(), 6);
        assert_eq!(j.weeks[&key(1)].trades[0][0], 42.0);
        assert_eq!(j.weeks[&key(5)].dates[0], date(2025, 1, 21));
        assert!(j.weeks[&key(5)].is_well_formed());
    }

    #[test]
    fn test_reconcile_keeps_stored_dates() {
        let mut j = stored(NewJournal::new("u1", date(2025, 1, 1), 0.0));
        let shifted = vec![date(2025, 2, 1), date(2025, 2, 2)];
        j.weeks.insert(key(3), WeekBlock::empty(shifted.clone()));

        let j = j.reconciled();
        assert_eq!(j.weeks[&key(3)].dates, shifted);
        assert_eq!(j.weeks[&key(3)].charges.len(), 2);
    }

    #[test]
    fn test_reconcile_rebuilds_dateless_week() {
        let mut j = stored(NewJournal::new("u1", date(2025, 1, 1), 0.0));
        j.weeks.insert(
            key(2),
            WeekBlock {
                dates: Vec::new(),
                trades: Vec::new(),
                charges: Vec::new(),
            },
        );
        let j = j.reconciled();
        assert_eq!(j.weeks[&key(2)].dates.len(), 5);
        assert_eq!(j.weeks[&key(2)].dates[0], date(2025, 1, 6));
    }

    #[test]
    fn test_reconcile_repairs_grid() {
        let mut j = stored(NewJournal::new("u1", date(2025, 1, 1), 0.0));
        let block = j.weeks.get_mut(&key(1)).unwrap();
        block.trades = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0]];
        block.charges = vec![0.5];

        let j = j.reconciled();
        let block = &j.weeks[&key(1)];
        assert!(block.is_well_formed());
        assert_eq!(block.trades[0], vec![1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_eq!(block.trades[1], vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(block.trades[4], vec![0.0; 5]);
        assert_eq!(block.charges, vec![0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_journal_wire_format() {
        let raw = r#"{
            "id": "abc",
            "user_id": "u1",
            "month": 1,
            "year": 2025,
            "start_date": "2025-01-01",
            "starting_capital": 10000,
            "week_data": {
                "week1": {
                    "trades": [[100, 0, 0, 0, 0], [-20, 0, 0, 0, 0], [0,0,0,0,0], [0,0,0,0,0], [0,0,0,0,0]],
                    "charges": [5, 0, 0, 0, 0],
                    "dates": ["2025-01-01", "2025-01-02", "2025-01-03", "2025-01-04", "2025-01-05"]
                }
            },
            "created_at": "2025-01-01T08:00:00Z",
            "updated_at": "2025-01-01T08:00:00Z"
        }"#;
        let j: Journal = serde_json::from_str(raw).unwrap();
        assert_eq!(j.owner, "u1");
        assert_eq!(j.starting_capital, 10000.0);
        assert_eq!(j.weeks[&key(1)].trades[1][0], -20.0);

        let value = serde_json::to_value(&j).unwrap();
        assert!(value.get("user_id").is_some());
        assert!(value["week_data"].get("week1").is_some());
        assert_eq!(value["start_date"], "2025-01-01");
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = JournalPatch {
            starting_capital: Some(250.0),
            weeks: None,
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"starting_capital": 250.0}));
    }

    #[test]
    fn test_patch_apply() {
        let mut j = stored(NewJournal::new("u1", date(2025, 1, 1), 100.0));
        let mut weeks = j.weeks.clone();
        weeks.get_mut(&key(1)).unwrap().charges[0] = 3.0;

        JournalPatch {
            starting_capital: None,
            weeks: Some(weeks),
        }
        .apply_to(&mut j);

        assert_eq!(j.starting_capital, 100.0);
        assert_eq!(j.weeks[&key(1)].charges[0], 3.0);
    }
}
