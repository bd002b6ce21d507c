//! Which journal dates accept edits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which dates of a journal accept edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPolicy {
    /// Only the current calendar day is writable
    #[default]
    TodayOnly,
    /// Every date is writable (backfilling, debugging)
    AnyDate,
}

impl EditPolicy {
    /// Whether `candidate` may be edited when the local calendar day is `today`.
    pub fn is_editable(&self, candidate: NaiveDate, today: NaiveDate) -> bool {
        match self {
            EditPolicy::TodayOnly => candidate == today,
            EditPolicy::AnyDate => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_only() {
        let today = date(2025, 1, 10);
        let policy = EditPolicy::TodayOnly;
        assert!(policy.is_editable(today, today));
        assert!(!policy.is_editable(date(2025, 1, 9), today));
        assert!(!policy.is_editable(date(2025, 1, 11), today));
    }

    #[test]
    fn test_any_date() {
        let today = date(2025, 1, 10);
        let policy = EditPolicy::AnyDate;
        assert!(policy.is_editable(date(2024, 6, 1), today));
        assert!(policy.is_editable(date(2026, 6, 1), today));
    }

    #[test]
    fn test_today_moves_at_midnight() {
        let policy = EditPolicy::TodayOnly;
        let day = date(2025, 1, 10);
        assert!(policy.is_editable(day, day));
        assert!(!policy.is_editable(day, day.succ_opt().unwrap()));
    }

    #[test]
    fn test_policy_serde() {
        assert_eq!(EditPolicy::default(), EditPolicy::TodayOnly);
        let p: EditPolicy = serde_json::from_str("\"any_date\"").unwrap();
        assert_eq!(p, EditPolicy::AnyDate);
        assert_eq!(
            serde_json::to_string(&EditPolicy::TodayOnly).unwrap(),
            "\"today_only\""
        );
    }
}
