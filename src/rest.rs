//! Journal store backed by the hosted backend's REST table API.
//!
//! Rows live in `trading_journals`; filters use the `column=eq.value` query syntax
//! and writes ask for the stored row back with `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::journal::{Journal, JournalPatch, NewJournal};
use crate::store::{JournalStore, StoreError};

const TABLE: &str = "trading_journals";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    /// Create a client for `base_url` authenticated with the project `api_key` and,
    /// when signed in, the user's `access_token`.
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        let bearer = access_token.unwrap_or(api_key);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        let api_key = config.effective_api_key().ok_or_else(|| StoreError::Backend {
            status: 0,
            message: "no api key configured".to_string(),
        })?;
        let token = config.effective_access_token();
        Self::new(&config.url, &api_key, token.as_deref())
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn by_id(&self, builder: RequestBuilder, id: &str) -> RequestBuilder {
        builder.query(&[("id", format!("eq.{}", id))])
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StoreError> {
        let resp = check(builder.send().await?).await?;
        Ok(resp.json().await?)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, StoreError> {
    HeaderValue::from_str(value).map_err(|e| StoreError::Backend {
        status: 0,
        message: format!("invalid header value: {}", e),
    })
}

async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), message = %message, "backend request failed");
    Err(StoreError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// A single-object request that matched nothing comes back as 406.
fn not_found_on_406(id: &str, err: StoreError) -> StoreError {
    match err {
        StoreError::Backend { status: 406, .. } => StoreError::NotFound(id.to_string()),
        other => other,
    }
}

/// A delete that matched no rows still succeeds on the wire.
fn deleted(id: &str, rows: usize) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound(id.to_string()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl JournalStore for RestStore {
    async fn list(&self, owner: &str) -> Result<Vec<Journal>, StoreError> {
        debug!(owner = %owner, "listing journals");
        let req = self.client.get(self.table_url()).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner)),
            ("order", "created_at.desc".to_string()),
        ]);
        self.send(req).await
    }

    async fn list_all(&self) -> Result<Vec<Journal>, StoreError> {
        debug!("listing journals of every owner");
        let req = self.client.get(self.table_url()).query(&[
            ("select", "*"),
            ("order", "year.desc,month.desc,created_at.desc"),
        ]);
        self.send(req).await
    }

    async fn get(&self, id: &str) -> Result<Journal, StoreError> {
        let req = self
            .by_id(self.client.get(self.table_url()), id)
            .query(&[("select", "*")])
            .header(ACCEPT, SINGLE_OBJECT);
        self.send(req).await.map_err(|e| not_found_on_406(id, e))
    }

    async fn create(&self, new: NewJournal) -> Result<Journal, StoreError> {
        let req = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&new);
        self.send(req).await
    }

    async fn update(&self, id: &str, patch: JournalPatch) -> Result<Journal, StoreError> {
        let req = self
            .by_id(self.client.patch(self.table_url()), id)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&patch);
        self.send(req).await.map_err(|e| not_found_on_406(id, e))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let req = self
            .by_id(self.client.delete(self.table_url()), id)
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> = self.send(req).await?;
        deleted(id, rows.len())
    }
}
