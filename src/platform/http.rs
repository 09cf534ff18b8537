use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::Platform;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::*;

const FOLDER_TYPE: &str = "org.sagebionetworks.repo.model.Folder";
const PROJECT_TYPE: &str = "org.sagebionetworks.repo.model.Project";
const ENTITY_VIEW_TYPE: &str = "org.sagebionetworks.repo.model.table.EntityView";
const QUERY_BUNDLE_TYPE: &str = "org.sagebionetworks.repo.model.table.QueryBundleRequest";
const VIEW_TYPE_MASK_FILE: u32 = 1;
const QUERY_PAGE_SIZE: u64 = 1000;
const QUERY_POLL_LIMIT: u32 = 120;

/// Backoff for rate-limited and server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Only 429 and 5xx are retried.
    #[must_use]
    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    page: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TeamSearch {
    #[serde(default)]
    results: Vec<Team>,
}

#[derive(Debug, Deserialize)]
struct AsyncToken {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryBundle {
    query_result: QueryResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    query_results: RowSet,
}

#[derive(Debug, Deserialize)]
struct RowSet {
    #[serde(default)]
    headers: Vec<SelectColumn>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct SelectColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    values: Vec<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AclBody<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<&'a str>,
    resource_access: &'a [ResourceAccess],
}

/// Authenticated client for the Synapse repository REST API.
#[derive(Clone)]
pub struct SynapseClient {
    client: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl SynapseClient {
    pub fn new(settings: &Settings, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry: settings.retry_policy(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.token);
            if let Some(body) = body {
                request = request.json(body);
            }
            let resp = request.send()?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }
            if RetryPolicy::is_retryable(status) && attempt < self.retry.max_attempts {
                let delay = self.retry.delay(attempt);
                warn!(
                    "{method} {path} returned {status}, retrying in {}s (attempt {attempt}/{})",
                    delay.as_secs_f32(),
                    self.retry.max_attempts
                );
                thread::sleep(delay);
                continue;
            }
            return Err(Self::error_from(resp));
        }
    }

    fn error_from(resp: Response) -> Error {
        let status = resp.status().as_u16();
        let message = resp
            .json::<ErrorBody>()
            .ok()
            .and_then(|b| b.reason)
            .unwrap_or_else(|| "Server error (no details provided)".into());
        Error::http(status, message)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send::<Value>(Method::GET, path, None)?;
        Ok(resp.json()?)
    }

    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.send(Method::POST, path, Some(body))?;
        Ok(resp.json()?)
    }

    pub fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.send(Method::PUT, path, Some(body))?;
        Ok(resp.json()?)
    }

    fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn benefactor(&self, entity_id: &str) -> Result<String> {
        let header: IdOnly = self.get(&format!("/entity/{entity_id}/benefactor"))?;
        Ok(header.id)
    }

    fn write_acl(&self, entity_id: &str, mut acl: Acl) -> Result<()> {
        // An inherited list must be created on the entity, which breaks inheritance.
        let owned = acl.id == entity_id;
        acl.id = entity_id.to_string();
        let body = AclBody {
            id: &acl.id,
            etag: if owned { acl.etag.as_deref() } else { None },
            resource_access: &acl.resource_access,
        };
        let path = format!("/entity/{entity_id}/acl");
        let _: Value = if owned {
            self.put(&path, &body)?
        } else {
            self.post(&path, &body)?
        };
        Ok(())
    }

    fn paged<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self.post(path, &body)?;
            items.extend(page.page);
            match page.next_page_token {
                Some(token) => body["nextPageToken"] = Value::String(token),
                None => return Ok(items),
            }
        }
    }

    fn run_query(&self, view_id: &str, sql: &str, offset: u64) -> Result<RowSet> {
        let request = json!({
            "concreteType": QUERY_BUNDLE_TYPE,
            "entityId": view_id,
            "partMask": 1,
            "query": { "sql": sql, "offset": offset, "limit": QUERY_PAGE_SIZE },
        });
        let job: AsyncToken = self.post(
            &format!("/entity/{view_id}/table/query/async/start"),
            &request,
        )?;
        let path = format!("/entity/{view_id}/table/query/async/get/{}", job.token);
        let mut wait = Duration::from_millis(500);
        for _ in 0..QUERY_POLL_LIMIT {
            let resp = self.send::<Value>(Method::GET, &path, None)?;
            if resp.status() == StatusCode::ACCEPTED {
                debug!("query on {view_id} still running");
                thread::sleep(wait);
                wait = (wait * 2).min(Duration::from_secs(5));
                continue;
            }
            let bundle: QueryBundle = resp.json()?;
            return Ok(bundle.query_result.query_results);
        }
        Err(Error::http(
            StatusCode::REQUEST_TIMEOUT.as_u16(),
            format!("query on {view_id} did not finish"),
        ))
    }
}

impl Platform for SynapseClient {
    fn list_child_folders(&self, parent_id: &str) -> Result<Vec<ChildFolder>> {
        self.paged(
            "/entity/children",
            json!({ "parentId": parent_id, "includeTypes": ["folder"] }),
        )
    }

    fn create_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let created: IdOnly = self.post(
            "/entity",
            &json!({ "name": name, "parentId": parent_id, "concreteType": FOLDER_TYPE }),
        )?;
        Ok(created.id)
    }

    fn get_entity(&self, id: &str) -> Result<Entity> {
        self.get(&format!("/entity/{id}"))
    }

    fn update_entity(&self, entity: &Entity) -> Result<Entity> {
        self.put(&format!("/entity/{}", entity.id), entity)
    }

    fn find_project(&self, name: &str) -> Result<Option<String>> {
        match self.post::<IdOnly, _>("/entity/child", &json!({ "entityName": name })) {
            Ok(found) => Ok(Some(found.id)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_project(&self, name: &str) -> Result<String> {
        let created: IdOnly = self.post(
            "/entity",
            &json!({ "name": name, "concreteType": PROJECT_TYPE }),
        )?;
        Ok(created.id)
    }

    fn get_acl(&self, entity_id: &str) -> Result<Acl> {
        let owner = self.benefactor(entity_id)?;
        self.get(&format!("/entity/{owner}/acl"))
    }

    fn grant_access(&self, entity_id: &str, principal_id: u64, access: AccessSet) -> Result<()> {
        let mut acl = self.get_acl(entity_id)?;
        acl.upsert(principal_id, access.to_owned_strings());
        self.write_acl(entity_id, acl)
    }

    fn replace_acl(&self, entity_id: &str, entries: &[ResourceAccess]) -> Result<()> {
        let current = self.get_acl(entity_id)?;
        let acl = Acl {
            id: current.id,
            etag: current.etag,
            resource_access: entries.to_vec(),
        };
        self.write_acl(entity_id, acl)
    }

    fn search_teams(&self, fragment: &str) -> Result<Vec<Team>> {
        let found: TeamSearch = self.get(&format!(
            "/teams?fragment={}&limit=50&offset=0",
            urlencoding::encode(fragment)
        ))?;
        Ok(found.results)
    }

    fn create_team(&self, name: &str) -> Result<Team> {
        self.post("/team", &json!({ "name": name }))
    }

    fn schema_registered(&self, uri: &str) -> Result<bool> {
        Ok(self
            .get_optional::<Value>(&format!("/schema/type/registered/{uri}"))?
            .is_some())
    }

    fn bind_schema(&self, entity_id: &str, uri: &str, derived_annotations: bool) -> Result<()> {
        let _: Value = self.put(
            &format!("/entity/{entity_id}/schema/binding"),
            &json!({
                "entityId": entity_id,
                "schema$id": uri,
                "enableDerivedAnnotations": derived_annotations,
            }),
        )?;
        Ok(())
    }

    fn create_file_view(
        &self,
        parent_id: &str,
        name: &str,
        description: &str,
        columns: &[Column],
    ) -> Result<String> {
        let mut column_ids = Vec::with_capacity(columns.len());
        for column in columns {
            let created: IdOnly = self.post("/column", column)?;
            column_ids.push(created.id);
        }
        let scope = parent_id.trim_start_matches("syn");
        let created: IdOnly = self.post(
            "/entity",
            &json!({
                "name": name,
                "description": description,
                "parentId": parent_id,
                "concreteType": ENTITY_VIEW_TYPE,
                "columnIds": column_ids,
                "scopeIds": [scope],
                "viewTypeMask": VIEW_TYPE_MASK_FILE,
            }),
        )?;
        Ok(created.id)
    }

    fn query_view_files(&self, view_id: &str) -> Result<Vec<ViewFile>> {
        let sql = format!("SELECT id, name FROM {view_id}");
        let mut files = Vec::new();
        let mut offset = 0;
        loop {
            let rows = self.run_query(view_id, &sql, offset)?;
            let id_col = rows.headers.iter().position(|h| h.name == "id");
            let name_col = rows.headers.iter().position(|h| h.name == "name");
            let (Some(id_col), Some(name_col)) = (id_col, name_col) else {
                return Err(Error::http(
                    500,
                    format!("view {view_id} did not return id and name columns"),
                ));
            };
            let fetched = rows.rows.len() as u64;
            for row in rows.rows {
                let value = |i: usize| row.values.get(i).cloned().flatten().unwrap_or_default();
                files.push(ViewFile {
                    id: value(id_col),
                    name: value(name_col),
                });
            }
            if fetched < QUERY_PAGE_SIZE {
                return Ok(files);
            }
            offset += fetched;
        }
    }

    fn list_invalid_files(&self, container_id: &str) -> Result<Vec<InvalidFile>> {
        self.paged(
            &format!("/entity/{container_id}/schema/validation/invalid"),
            json!({ "containerId": container_id }),
        )
    }

    fn get_wiki(&self, owner_id: &str) -> Result<Option<Wiki>> {
        self.get_optional(&format!("/entity/{owner_id}/wiki"))
    }

    fn put_wiki(&self, owner_id: &str, wiki: &Wiki) -> Result<Wiki> {
        match &wiki.id {
            Some(id) => self.put(&format!("/entity/{owner_id}/wiki/{id}"), wiki),
            None => self.post(&format!("/entity/{owner_id}/wiki"), wiki),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(RetryPolicy::is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(RetryPolicy::is_retryable(StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!RetryPolicy::is_retryable(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::is_retryable(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(16));
        assert_eq!(policy.delay(9), Duration::from_secs(16));
    }

    #[test]
    fn test_page_parses_without_token() {
        let page: Page<ChildFolder> =
            serde_json::from_str(r#"{"page":[{"id":"syn1","name":"WES","type":"folder"}]}"#)
                .unwrap();
        assert_eq!(page.page.len(), 1);
        assert!(page.next_page_token.is_none());
    }
}
