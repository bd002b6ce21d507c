//! Journal persistence.
//!
//! `JournalStore` is the CRUD seam to whatever backend owns the data. The store
//! assigns ids and timestamps; callers hand it `NewJournal` / `JournalPatch` values.
//! Two local stores live here: an in-process map and a single JSON file. The hosted
//! backend is in [`crate::rest`].

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::config::Identity;
use crate::journal::{Journal, JournalPatch, NewJournal};

/// Errors from journal persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("journal not found: {0}")]
    NotFound(String),
    #[error("a journal for this month already exists: {existing_id}")]
    DuplicatePeriod { existing_id: String },
    #[error("journal belongs to another user")]
    NotOwner,
    #[error("listing every user's journals needs an admin identity")]
    NotAdmin,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// All journals of `owner`, newest first.
    async fn list(&self, owner: &str) -> Result<Vec<Journal>, StoreError>;
    /// Journals of every owner.
    async fn list_all(&self) -> Result<Vec<Journal>, StoreError>;
    async fn get(&self, id: &str) -> Result<Journal, StoreError>;
    async fn create(&self, new: NewJournal) -> Result<Journal, StoreError>;
    async fn update(&self, id: &str, patch: JournalPatch) -> Result<Journal, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Create a zero-filled journal for `identity` starting at `start`.
///
/// Refuses a second journal for the same calendar month and year of the start date.
pub async fn create_journal(
    store: &dyn JournalStore,
    identity: &Identity,
    start: NaiveDate,
    starting_capital: f64,
) -> Result<Journal, StoreError> {
    let existing = store.list(&identity.user_id).await?;
    if let Some(j) = existing
        .iter()
        .find(|j| j.month == start.month() && j.year == start.year())
    {
        return Err(StoreError::DuplicatePeriod {
            existing_id: j.id.clone(),
        });
    }

    let journal = store
        .create(NewJournal::new(identity.user_id.clone(), start, starting_capital))
        .await?;
    info!(journal_id = %journal.id, user = %identity.email, start = %start, "journal created");
    Ok(journal)
}

/// Delete `id` only if it belongs to `identity`.
pub async fn delete_owned(
    store: &dyn JournalStore,
    identity: &Identity,
    id: &str,
) -> Result<(), StoreError> {
    let journal = store.get(id).await?;
    if journal.owner != identity.user_id {
        return Err(StoreError::NotOwner);
    }
    store.delete(id).await?;
    info!(journal_id = %id, "journal deleted");
    Ok(())
}

/// Every journal in the store grouped by owner, each group latest period first.
/// Only admin identities may see other users' journals.
pub async fn list_all_by_owner(
    store: &dyn JournalStore,
    identity: &Identity,
) -> Result<BTreeMap<String, Vec<Journal>>, StoreError> {
    if !identity.admin {
        return Err(StoreError::NotAdmin);
    }
    let mut groups: BTreeMap<String, Vec<Journal>> = BTreeMap::new();
    for journal in store.list_all().await? {
        groups.entry(journal.owner.clone()).or_default().push(journal);
    }
    Ok(groups
        .into_iter()
        .map(|(owner, journals)| (owner, latest_period_first(journals)))
        .collect())
}

/// Order by year, then month, newest first; ties go to the most recently created.
pub fn latest_period_first(mut journals: Vec<Journal>) -> Vec<Journal> {
    journals.sort_by(|a, b| {
        (b.year, b.month, b.created_at).cmp(&(a.year, a.month, a.created_at))
    });
    journals
}

fn materialize(new: NewJournal) -> Journal {
    let now = Utc::now();
    Journal {
        id: Uuid::new_v4().to_string(),
        owner: new.owner,
        month: new.month,
        year: new.year,
        start_date: new.start_date,
        starting_capital: new.starting_capital,
        weeks: new.weeks,
        created_at: now,
        updated_at: now,
    }
}

fn newest_first(mut journals: Vec<Journal>) -> Vec<Journal> {
    journals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    journals
}

/// In-process store. Counts `update` calls so tests can observe write volume.
#[derive(Default)]
pub struct MemoryStore {
    journals: Mutex<HashMap<String, Journal>>,
    updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update` calls served so far
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn list(&self, owner: &str) -> Result<Vec<Journal>, StoreError> {
        let journals = self.journals.lock().await;
        Ok(newest_first(
            journals.values().filter(|j| j.owner == owner).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Journal>, StoreError> {
        let journals = self.journals.lock().await;
        Ok(newest_first(journals.values().cloned().collect()))
    }

    async fn get(&self, id: &str) -> Result<Journal, StoreError> {
        self.journals
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, new: NewJournal) -> Result<Journal, StoreError> {
        let journal = materialize(new);
        self.journals
            .lock()
            .await
            .insert(journal.id.clone(), journal.clone());
        Ok(journal)
    }

    async fn update(&self, id: &str, patch: JournalPatch) -> Result<Journal, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut journals = self.journals.lock().await;
        let journal = journals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(journal);
        journal.updated_at = Utc::now();
        Ok(journal.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.journals
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// All journals in one pretty-printed JSON file, rewritten on every change.
///
/// The cached list only changes once the new file contents are written.
pub struct FileStore {
    path: PathBuf,
    journals: Mutex<Vec<Journal>>,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let journals = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            if data.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&data)?
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            journals: Mutex::new(journals),
        })
    }

    fn persist(&self, journals: &[Journal]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(journals)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

#[async_trait]
impl JournalStore for FileStore {
    async fn list(&self, owner: &str) -> Result<Vec<Journal>, StoreError> {
        let journals = self.journals.lock().await;
        Ok(newest_first(
            journals.iter().filter(|j| j.owner == owner).cloned().collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<Journal>, StoreError> {
        Ok(newest_first(self.journals.lock().await.clone()))
    }

    async fn get(&self, id: &str) -> Result<Journal, StoreError> {
        self.journals
            .lock()
            .await
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, new: NewJournal) -> Result<Journal, StoreError> {
        let journal = materialize(new);
        let mut journals = self.journals.lock().await;
        let mut next = journals.clone();
        next.push(journal.clone());
        self.persist(&next)?;
        *journals = next;
        Ok(journal)
    }

    async fn update(&self, id: &str, patch: JournalPatch) -> Result<Journal, StoreError> {
        let mut journals = self.journals.lock().await;
        let mut next = journals.clone();
        let journal = next
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(journal);
        journal.updated_at = Utc::now();
        let updated = journal.clone();
        self.persist(&next)?;
        *journals = next;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut journals = self.journals.lock().await;
        let next: Vec<Journal> = journals.iter().filter(|j| j.id != id).cloned().collect();
        if next.len() == journals.len() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.persist(&next)?;
        *journals = next;
        Ok(())
    }
}
