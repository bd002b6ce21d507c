//! Editing session for one open journal.
//!
//! The session owns the in-memory journal, which stays the source of truth for
//! the whole time the journal is open. Edits update it immediately and arm a
//! debounced commit; the commit snapshots whatever the journal holds when the
//! timer fires. Commits run one at a time: each holds the commit lock from snapshot
//! to store response, so a write taken later always lands later. A failed commit is
//! reported on the status channel and leaves the local state alone, so the next
//! commit carries those edits again.
//!
//! ```text
//! edit ──► state updated ──► timer (re)armed ──quiet──► lock ──► snapshot ──► store.update
//! save_now ─────────────────► timer cancelled ──► lock ──► snapshot ──► store.update
//! close ────────────────────► timer cancelled (no flush)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::aggregate::{self, JournalSummary};
use crate::calendar::{self, WeekKey};
use crate::config::Identity;
use crate::debounce::Debouncer;
use crate::edit;
use crate::journal::{Journal, JournalPatch, TRADE_ROWS};
use crate::policy::EditPolicy;
use crate::store::{JournalStore, StoreError};

/// Errors from rejected edits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("unknown week: {0}")]
    UnknownWeek(WeekKey),
    #[error("cell out of range: row {row}, day {day} (week has {len} days)")]
    OutOfRange { row: usize, day: usize, len: usize },
    #[error("{0} is not editable")]
    NotEditable(NaiveDate),
}

/// Outcome of the most recent commit.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitStatus {
    Idle,
    Saved { at: DateTime<Utc> },
    Failed { error: String },
}

pub struct JournalSession {
    journal: Arc<Mutex<Journal>>,
    store: Arc<dyn JournalStore>,
    policy: EditPolicy,
    debouncer: Debouncer,
    status: Arc<watch::Sender<CommitStatus>>,
    commit_lock: Arc<Mutex<()>>,
}

impl JournalSession {
    /// Start a session over an already loaded journal.
    pub fn new(
        journal: Journal,
        store: Arc<dyn JournalStore>,
        policy: EditPolicy,
        quiet: Duration,
    ) -> Self {
        let (status, _) = watch::channel(CommitStatus::Idle);
        Self {
            journal: Arc::new(Mutex::new(journal.reconciled())),
            store,
            policy,
            debouncer: Debouncer::new(quiet),
            status: Arc::new(status),
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load journal `id` from `store` and start a session over it.
    pub async fn open(
        store: Arc<dyn JournalStore>,
        id: &str,
        policy: EditPolicy,
        quiet: Duration,
    ) -> Result<Self, StoreError> {
        let journal = store.get(id).await?;
        info!(journal_id = %id, start = %journal.start_date, "journal opened");
        Ok(Self::new(journal, store, policy, quiet))
    }

    /// Like [`open`](Self::open), but refuses journals not owned by `identity`.
    pub async fn open_owned(
        store: Arc<dyn JournalStore>,
        identity: &Identity,
        id: &str,
        policy: EditPolicy,
        quiet: Duration,
    ) -> Result<Self, StoreError> {
        let journal = store.get(id).await?;
        if journal.owner != identity.user_id {
            warn!(journal_id = %id, user = %identity.user_id, "journal belongs to another user");
            return Err(StoreError::NotOwner);
        }
        info!(journal_id = %id, start = %journal.start_date, "journal opened");
        Ok(Self::new(journal, store, policy, quiet))
    }

    /// Copy of the current in-memory journal
    pub async fn journal(&self) -> Journal {
        self.journal.lock().await.clone()
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    /// Subscribe to commit outcomes.
    pub fn commit_status(&self) -> watch::Receiver<CommitStatus> {
        self.status.subscribe()
    }

    pub fn has_pending_commit(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub async fn summary(&self) -> JournalSummary {
        aggregate::summarize(&*self.journal.lock().await)
    }

    /// Week to show first: the one holding `today`, else `week1`.
    pub async fn current_week(&self, today: NaiveDate) -> WeekKey {
        let start = self.journal.lock().await.start_date;
        calendar::week_containing(start, today).unwrap_or(WeekKey::FIRST)
    }

    /// Set trade slot `row` on column `day` of `week` from free-text input.
    pub async fn edit_trade(
        &mut self,
        week: WeekKey,
        row: usize,
        day: usize,
        raw: &str,
        today: NaiveDate,
    ) -> Result<(), EditError> {
        let value = edit::parse_amount(raw);
        {
            let mut journal = self.journal.lock().await;
            let block = journal
                .weeks
                .get(&week)
                .ok_or(EditError::UnknownWeek(week))?;
            if row >= TRADE_ROWS || day >= block.len() {
                return Err(EditError::OutOfRange {
                    row,
                    day,
                    len: block.len(),
                });
            }
            self.check_editable(block.dates[day], today)?;
            let next = edit::with_trade(block, row, day, value);
            journal.weeks.insert(week, next);
        }
        self.schedule_commit();
        Ok(())
    }

    /// Set the charge on column `day` of `week` from free-text input.
    pub async fn edit_charge(
        &mut self,
        week: WeekKey,
        day: usize,
        raw: &str,
        today: NaiveDate,
    ) -> Result<(), EditError> {
        let value = edit::parse_amount(raw);
        {
            let mut journal = self.journal.lock().await;
            let block = journal
                .weeks
                .get(&week)
                .ok_or(EditError::UnknownWeek(week))?;
            if day >= block.len() {
                return Err(EditError::OutOfRange {
                    row: 0,
                    day,
                    len: block.len(),
                });
            }
            self.check_editable(block.dates[day], today)?;
            let next = edit::with_charge(block, day, value);
            journal.weeks.insert(week, next);
        }
        self.schedule_commit();
        Ok(())
    }

    /// Replace the starting capital from free-text input.
    pub async fn set_starting_capital(&mut self, raw: &str) {
        self.journal.lock().await.starting_capital = edit::parse_capital(raw);
        self.schedule_commit();
    }

    /// Commit immediately, dropping any pending autosave. Waits for an autosave
    /// that is already writing, then writes the current state over it.
    pub async fn save_now(&mut self) -> Result<Journal, StoreError> {
        self.debouncer.cancel();
        commit(&self.store, &self.journal, &self.status, &self.commit_lock).await
    }

    /// Drop any pending autosave without flushing. Local state is kept.
    pub fn close(&mut self) {
        if self.debouncer.cancel() {
            info!("pending commit cancelled on close");
        }
    }

    fn check_editable(&self, date: NaiveDate, today: NaiveDate) -> Result<(), EditError> {
        if self.policy.is_editable(date, today) {
            Ok(())
        } else {
            Err(EditError::NotEditable(date))
        }
    }

    fn schedule_commit(&mut self) {
        let store = self.store.clone();
        let journal = self.journal.clone();
        let status = self.status.clone();
        let lock = self.commit_lock.clone();
        self.debouncer.schedule(async move {
            let _ = commit(&store, &journal, &status, &lock).await;
        });
    }
}

/// Write the current state to the store and publish the outcome.
async fn commit(
    store: &Arc<dyn JournalStore>,
    journal: &Mutex<Journal>,
    status: &watch::Sender<CommitStatus>,
    lock: &Mutex<()>,
) -> Result<Journal, StoreError> {
    let _guard = lock.lock().await;
    let (id, patch) = {
        let j = journal.lock().await;
        (j.id.clone(), JournalPatch::from_journal(&j))
    };

    match store.update(&id, patch).await {
        Ok(saved) => {
            journal.lock().await.updated_at = saved.updated_at;
            info!(journal_id = %id, "journal saved");
            status.send_replace(CommitStatus::Saved {
                at: saved.updated_at,
            });
            Ok(saved)
        }
        Err(e) => {
            warn!(journal_id = %id, error = %e, "failed to save journal");
            status.send_replace(CommitStatus::Failed {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}
