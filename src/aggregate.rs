//! Derived statistics over a journal's trade grid.
//!
//! Everything here is a pure function of the journal and is meant to be re-run
//! after every edit. No rounding is applied; formatting is the caller's concern.
//! A cell holding exactly zero counts as "nothing recorded".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::WeekKey;
use crate::journal::{Journal, WeekBlock};

/// Totals for a single week block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekTotals {
    pub total_earning: f64,
    pub total_charges: f64,
    pub net_profit: f64,
}

/// Totals across the whole journal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallTotals {
    /// Days with at least one non-zero trade or a non-zero charge
    pub completed_days: u32,
    pub total_capital: f64,
    pub per_day_revenue: f64,
    pub total_earning: f64,
    pub total_charges: f64,
    pub roi: f64,
    /// Non-zero trade cells, not days
    pub total_trades: u32,
    pub win_days: u32,
    pub loss_days: u32,
}

impl OverallTotals {
    pub fn net_profit(&self) -> f64 {
        self.total_earning - self.total_charges
    }
}

/// Per-week and overall totals together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub weeks: BTreeMap<WeekKey, WeekTotals>,
    pub overall: OverallTotals,
}

pub fn compute_week_totals(block: &WeekBlock) -> WeekTotals {
    let total_earning: f64 = block.trades.iter().flatten().sum();
    let total_charges: f64 = block.charges.iter().sum();
    WeekTotals {
        total_earning,
        total_charges,
        net_profit: total_earning - total_charges,
    }
}

pub fn compute_overall_totals(journal: &Journal) -> OverallTotals {
    let mut totals = OverallTotals::default();

    for block in journal.weeks.values() {
        for day in 0..block.len() {
            let mut day_total = 0.0;
            for value in block.day_trades(day) {
                if value != 0.0 {
                    day_total += value;
                    totals.total_trades += 1;
                }
            }
            let day_charge = block.day_charge(day);

            if day_total != 0.0 || day_charge != 0.0 {
                totals.completed_days += 1;
                let day_pl = day_total - day_charge;
                if day_pl > 0.0 {
                    totals.win_days += 1;
                } else if day_pl < 0.0 {
                    totals.loss_days += 1;
                }
            }

            totals.total_earning += day_total;
            totals.total_charges += day_charge;
        }
    }

    let capital = journal.starting_capital;
    totals.total_capital = capital + totals.total_earning - totals.total_charges;
    totals.per_day_revenue = if totals.completed_days > 0 {
        totals.net_profit() / totals.completed_days as f64
    } else {
        0.0
    };
    totals.roi = if capital > 0.0 {
        (totals.total_capital - capital) / capital * 100.0
    } else {
        0.0
    };

    totals
}

pub fn summarize(journal: &Journal) -> JournalSummary {
    JournalSummary {
        weeks: journal
            .weeks
            .iter()
            .map(|(key, block)| (*key, compute_week_totals(block)))
            .collect(),
        overall: compute_overall_totals(journal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::NewJournal;
    use chrono::{NaiveDate, Utc};

    fn key(n: u8) -> WeekKey {
        WeekKey::new(n).unwrap()
    }

    fn journal(capital: f64) -> Journal {
        let new = NewJournal::new("u1", NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), capital);
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

    fn set_day(j: &mut Journal, week: u8, day: usize, trades: [f64; 5], charge: f64) {
        let block = j.weeks.get_mut(&key(week)).unwrap();
        for (row, value) in trades.iter().enumerate() {
            block.trades[row][day] = *value;
        }
        block.charges[day] = charge;
    }

    #[test]
    fn test_empty_week_totals() {
        let j = journal(0.0);
        let totals = compute_week_totals(&j.weeks[&key(1)]);
        assert_eq!(totals, WeekTotals::default());
    }

    #[test]
    fn test_week_totals_sum_all_cells() {
        let mut j = journal(0.0);
        set_day(&mut j, 2, 0, [10.0, 20.0, 0.0, 0.0, -5.0], 1.0);
        set_day(&mut j, 2, 4, [0.0, 0.0, 0.0, 0.0, 7.5], 0.5);
        let totals = compute_week_totals(&j.weeks[&key(2)]);
        assert_eq!(totals.total_earning, 32.5);
        assert_eq!(totals.total_charges, 1.5);
        assert_eq!(totals.net_profit, 31.0);
    }

    #[test]
    fn test_single_winning_day() {
        let mut j = journal(10000.0);
        set_day(&mut j, 1, 0, [100.0, -20.0, 0.0, 0.0, 0.0], 5.0);

        let totals = compute_overall_totals(&j);
        assert_eq!(totals.completed_days, 1);
        assert_eq!(totals.win_days, 1);
        assert_eq!(totals.loss_days, 0);
        assert_eq!(totals.total_earning, 80.0);
        assert_eq!(totals.total_charges, 5.0);
        assert_eq!(totals.total_trades, 2);
        assert_eq!(totals.total_capital, 10075.0);
        assert_eq!(totals.per_day_revenue, 75.0);
        assert!((totals.roi - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_loss_and_flat_days() {
        let mut j = journal(1000.0);
        // Loss: trades net 10, charge 15
        set_day(&mut j, 1, 1, [10.0, 0.0, 0.0, 0.0, 0.0], 15.0);
        // Flat: trades net 5, charge 5 -> completed, neither win nor loss
        set_day(&mut j, 3, 2, [5.0, 0.0, 0.0, 0.0, 0.0], 5.0);
        // Charge only: completed loss day
        set_day(&mut j, 6, 4, [0.0; 5], 2.0);

        let totals = compute_overall_totals(&j);
        assert_eq!(totals.completed_days, 3);
        assert_eq!(totals.win_days, 0);
        assert_eq!(totals.loss_days, 2);
        assert_eq!(totals.total_trades, 2);
        assert_eq!(totals.total_earning, 15.0);
        assert_eq!(totals.total_charges, 22.0);
        assert_eq!(totals.total_capital, 993.0);
        assert!((totals.per_day_revenue - (-7.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_offsetting_trades_do_not_complete_day() {
        let mut j = journal(0.0);
        set_day(&mut j, 1, 0, [50.0, -50.0, 0.0, 0.0, 0.0], 0.0);
        let totals = compute_overall_totals(&j);
        // Both cells count as trades, but a zero day total with no charge is not a completed day.
        assert_eq!(totals.total_trades, 2);
        assert_eq!(totals.completed_days, 0);
    }

    #[test]
    fn test_zero_capital_roi() {
        let mut j = journal(0.0);
        set_day(&mut j, 1, 0, [500.0, 0.0, 0.0, 0.0, 0.0], 0.0);
        let totals = compute_overall_totals(&j);
        assert_eq!(totals.roi, 0.0);
        assert_eq!(totals.total_capital, 500.0);
    }

    #[test]
    fn test_no_completed_days() {
        let j = journal(2500.0);
        let totals = compute_overall_totals(&j);
        assert_eq!(totals.completed_days, 0);
        assert_eq!(totals.per_day_revenue, 0.0);
        assert_eq!(totals.roi, 0.0);
        assert_eq!(totals.total_capital, 2500.0);
    }

    #[test]
    fn test_summary_weeks_match_overall() {
        let mut j = journal(100.0);
        set_day(&mut j, 1, 0, [1.0, 2.0, 3.0, 0.0, 0.0], 0.5);
        set_day(&mut j, 4, 3, [-4.0, 0.0, 0.0, 0.0, 0.0], 0.25);
        set_day(&mut j, 6, 4, [10.0, 0.0, 0.0, 0.0, 0.0], 0.0);

        let summary = summarize(&j);
        assert_eq!(summary.weeks.len(), 6);
        let earning: f64 = summary.weeks.values().map(|w| w.total_earning).sum();
        let charges: f64 = summary.weeks.values().map(|w| w.total_charges).sum();
        assert_eq!(earning, summary.overall.total_earning);
        assert_eq!(charges, summary.overall.total_charges);
    }

    #[test]
    fn test_short_rows_read_as_zero() {
        let mut j = journal(0.0);
        let block = j.weeks.get_mut(&key(1)).unwrap();
        block.trades[2] = vec![9.0];
        block.charges.truncate(1);
        let totals = compute_overall_totals(&j);
        assert_eq!(totals.total_earning, 9.0);
        assert_eq!(totals.completed_days, 1);
    }
}
