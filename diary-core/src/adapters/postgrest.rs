//! Entry store backed by a hosted PostgREST (Supabase) table.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, instrument};

use crate::{
    domain::{parse_store_timestamp, DiaryEntry, EntryId, NewEntry, StoreCredentials, StoreError},
    ports::{EntryStore, PageRange},
};

const DEFAULT_TABLE: &str = "diary";
const LIST_COLUMNS: &str = "uuid,created_at,name,content";

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    table_url: Url,
    anon_key: String,
}

impl PostgrestStore {
    pub fn new(credentials: &StoreCredentials) -> Result<Self, StoreError> {
        Self::with_table(credentials, DEFAULT_TABLE)
    }

    pub fn with_table(credentials: &StoreCredentials, table: &str) -> Result<Self, StoreError> {
        let base = format!("{}/", credentials.url.trim_end_matches('/'));
        let table_url = Url::parse(&base)
            .and_then(|url| url.join(&format!("rest/v1/{table}")))
            .map_err(|e| StoreError::Parse(format!("invalid store URL {}: {e}", credentials.url)))?;

        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            table_url,
            anon_key: credentials.anon_key.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    fn list_request(&self, range: Option<PageRange>) -> RequestBuilder {
        self.authorized(self.client.get(self.table_url.clone()))
            .query(&list_query(range))
    }

    fn body_request(&self, id: &EntryId) -> RequestBuilder {
        self.authorized(self.client.get(self.table_url.clone()))
            .query(&[("select", "content".to_string()), ("uuid", eq(id))])
    }

    fn insert_request(&self, entry: &NewEntry) -> RequestBuilder {
        self.authorized(self.client.post(self.table_url.clone()))
            .header("Prefer", "return=minimal")
            .json(&[entry])
    }

    fn delete_request(&self, id: &EntryId) -> RequestBuilder {
        self.authorized(self.client.delete(self.table_url.clone()))
            .query(&[("uuid", eq(id))])
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("{call_name}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(call_name, %status, "store rejected request");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body, status.canonical_reason()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        call_name: &str,
    ) -> Result<T, StoreError> {
        self.send(request, call_name)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::Parse(format!("{call_name}: {e}")))
    }
}

#[async_trait]
impl EntryStore for PostgrestStore {
    #[instrument(skip(self))]
    async fn list(&self, range: Option<PageRange>) -> Result<Vec<DiaryEntry>, StoreError> {
        let rows: Vec<DiaryRow> = self
            .get_json(self.list_request(range), "list entries")
            .await?;

        rows.into_iter().map(DiaryEntry::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn fetch_body(&self, id: &EntryId) -> Result<String, StoreError> {
        let rows: Vec<BodyRow> = self
            .get_json(self.body_request(id), "fetch entry body")
            .await?;

        only_row(rows, id).map(|row| row.content)
    }

    #[instrument(skip_all)]
    async fn insert(&self, entry: &NewEntry) -> Result<(), StoreError> {
        self.send(self.insert_request(entry), "insert entry").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &EntryId) -> Result<(), StoreError> {
        self.send(self.delete_request(id), "delete entry").await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DiaryRow {
    uuid: String,
    name: String,
    content: String,
    created_at: String,
}

impl TryFrom<DiaryRow> for DiaryEntry {
    type Error = StoreError;

    fn try_from(row: DiaryRow) -> Result<Self, Self::Error> {
        let created_at = parse_store_timestamp(&row.created_at).map_err(|e| {
            StoreError::Parse(format!("bad created_at {:?}: {e}", row.created_at))
        })?;

        Ok(Self {
            id: EntryId::new(row.uuid),
            title: row.name,
            body: row.content,
            created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BodyRow {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn eq(id: &EntryId) -> String {
    format!("eq.{id}")
}

fn list_query(range: Option<PageRange>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", LIST_COLUMNS.to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(range) = range {
        query.push(("offset", range.offset.to_string()));
        query.push(("limit", range.limit.to_string()));
    }
    query
}

fn only_row<T>(rows: Vec<T>, id: &EntryId) -> Result<T, StoreError> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        (None, _) => Err(StoreError::NotFound(id.clone())),
        _ => Err(StoreError::Parse(format!(
            "expected exactly one row for {id}, got {count}"
        ))),
    }
}

/// PostgREST's own `message`, else the raw body, else the status text.
fn rejection_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    reason.unwrap_or("request failed").to_string()
}
