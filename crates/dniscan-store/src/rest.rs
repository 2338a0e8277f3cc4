//! REST client for the hosted tables (PostgREST conventions).

use dniscan_core::{PersistableRecord, StoredRecord, User};
use reqwest::{Method, RequestBuilder, Response};
use tracing::info;

use crate::{RecordStore, StoreError};

const DEFAULT_TABLE: &str = "dni_data";
const USERS_TABLE: &str = "users";

/// Client for `<base_url>/rest/v1/<table>`.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestStore {
    /// Create a client for the given project URL and API key.
    ///
    /// `base_url` should be like `https://project.example.co` (no trailing slash).
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Use a table other than `dni_data` for scanned rows.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn find_user_request(&self, username: &str) -> RequestBuilder {
        self.request(Method::GET, USERS_TABLE).query(&[
            ("select", "id,username".to_string()),
            ("username", format!("eq.{username}")),
            ("limit", "1".to_string()),
        ])
    }

    fn insert_request(&self, record: &PersistableRecord) -> RequestBuilder {
        self.request(Method::POST, &self.table)
            .header("Prefer", "return=representation")
            .json(&[record])
    }

    fn list_request(&self, user_id: i64) -> RequestBuilder {
        self.request(Method::GET, &self.table).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "id.asc".to_string()),
        ])
    }

    fn delete_request(&self, id: i64) -> RequestBuilder {
        self.request(Method::DELETE, &self.table)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
    }
}

/// Turn a non-2xx response into [`StoreError::Server`] carrying the body.
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait::async_trait]
impl RecordStore for RestStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        info!(username, "looking up user");
        let resp = check(self.find_user_request(username).send().await?).await?;
        let users: Vec<User> = serde_json::from_str(&resp.text().await?)?;
        Ok(users.into_iter().next())
    }

    async fn insert(&self, record: &PersistableRecord) -> Result<StoredRecord, StoreError> {
        info!(table = %self.table, dni = %record.dni_number, "inserting row");
        let resp = check(self.insert_request(record).send().await?).await?;
        let rows: Vec<StoredRecord> = serde_json::from_str(&resp.text().await?)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Other("insert returned no rows".into()))?;
        info!(id = row.id, "insert complete");
        Ok(row)
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<StoredRecord>, StoreError> {
        info!(table = %self.table, user_id, "listing rows");
        let resp = check(self.list_request(user_id).send().await?).await?;
        let rows: Vec<StoredRecord> = serde_json::from_str(&resp.text().await?)?;
        info!(count = rows.len(), "listed rows");
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        info!(table = %self.table, id, "deleting row");
        let resp = check(self.delete_request(id).send().await?).await?;
        let rows: Vec<StoredRecord> = serde_json::from_str(&resp.text().await?)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestStore {
        RestStore::new("https://db.example.test/".into(), "anon-key".into())
    }

    fn record() -> PersistableRecord {
        PersistableRecord {
            user_id: Some(7),
            document_number: None,
            last_name: "PEREZ".into(),
            first_name: "JUAN".into(),
            gender: "M".into(),
            dni_number: "12345678".into(),
            document_type: None,
            birth_date: Some("1990-02-01T00:00:00.000Z".into()),
            issue_date: None,
            cuil_full: None,
        }
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(store().base_url, "https://db.example.test");
    }

    #[test]
    fn user_lookup_filters_by_username() {
        let req = store().find_user_request("maria jose").build().unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.url().path(), "/rest/v1/users");
        let pairs: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        assert!(pairs.contains(&("username".into(), "eq.maria jose".into())));
        assert!(pairs.contains(&("select".into(), "id,username".into())));
    }

    #[test]
    fn requests_carry_api_key() {
        let req = store().list_request(7).build().unwrap();
        assert_eq!(req.headers()["apikey"], "anon-key");
        assert_eq!(req.headers()["authorization"], "Bearer anon-key");
    }

    #[test]
    fn list_filters_by_owner() {
        let req = store().with_table("scans").list_request(7).build().unwrap();
        assert_eq!(req.url().path(), "/rest/v1/scans");
        assert_eq!(req.url().query(), Some("select=*&user_id=eq.7&order=id.asc"));
    }

    #[test]
    fn insert_posts_array_body() {
        let req = store().insert_request(&record()).build().unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()["prefer"], "return=representation");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value[0]["dni_number"], "12345678");
        assert_eq!(value[0]["user_id"], 7);
        assert!(value[0]["cuil_full"].is_null());
    }

    #[test]
    fn delete_targets_single_id() {
        let req = store().delete_request(42).build().unwrap();
        assert_eq!(req.method(), Method::DELETE);
        assert_eq!(req.url().query(), Some("id=eq.42"));
    }
}
