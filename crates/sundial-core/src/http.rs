use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{TokenPair, TokenStore};
use crate::error::{StoreError, StoreResult};
use crate::gateway::Gateway;
use crate::model::{Category, CompletionReceipt, Tag, Task, TaskPayload};

const TASKS_PATH: &str = "/api/schedule/tasks/";
const TAGS_PATH: &str = "/api/schedule/tags/";
const CATEGORIES_PATH: &str = "/api/schedule/categories/";
const LOGIN_PATH: &str = "/api/auth/jwt/create/";
const REFRESH_PATH: &str = "/api/auth/refresh/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LoginGrant {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshGrant {
    access: String,
}

/// The listing endpoint historically returned either a bare array or a
/// `{ "task": [...] }` wrapper; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListing {
    Plain(Vec<Task>),
    Wrapped { task: Vec<Task> },
}

impl TaskListing {
    fn into_tasks(self) -> Vec<Task> {
        match self {
            TaskListing::Plain(tasks) | TaskListing::Wrapped { task: tasks } => tasks,
        }
    }
}

/// HTTP implementation of [`Gateway`] with bearer injection and
/// transparent refresh-on-401.
///
/// The token pair lives behind one async mutex. The refresh path locks it
/// for the whole refresh round-trip, so concurrent 401s line up on the
/// lock and find the fresh access token when their turn comes. One
/// refresh request is in flight at a time; everyone else waits.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
    store: TokenStore,
    tokens: Mutex<TokenPair>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, store: TokenStore) -> Self {
        let base_url = base_url.into();
        let tokens = store.load();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            store,
            tokens: Mutex::new(tokens),
        }
    }

    /// Obtain a fresh token pair and persist it. Auth endpoints never go
    /// through the refresh path.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> StoreResult<()> {
        let body = json!({ "username": username, "password": password });
        let resp = self
            .send_once(&Method::POST, LOGIN_PATH, Some(&body), None)
            .await?;
        let resp = Self::check(resp).await?;
        let grant: LoginGrant = Self::read_json(resp).await?;

        let mut tokens = self.tokens.lock().await;
        tokens.access = Some(grant.access);
        tokens.refresh = Some(grant.refresh);
        if let Err(err) = self.store.save(&tokens) {
            warn!(error = %err, "failed to persist tokens after login");
        }
        info!(username, "logged in");
        Ok(())
    }

    async fn send_once<B: Serialize + Sync>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> StoreResult<Response> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .timeout(REQUEST_TIMEOUT);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send()
            .await
            .map_err(|err| StoreError::Network(err.to_string()))
    }

    /// One request with auth, retried once after a successful refresh.
    async fn request<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> StoreResult<Response> {
        let access = { self.tokens.lock().await.access.clone() };
        let resp = self
            .send_once(&method, path, body, access.as_deref())
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Self::check(resp).await;
        }

        debug!(path, "unauthorized, attempting token refresh");
        let fresh = self.refresh_access(access.as_deref()).await?;
        let resp = self
            .send_once(&method, path, body, Some(fresh.as_str()))
            .await?;
        Self::check(resp).await
    }

    /// Single-flight refresh. `stale` is the access token the caller just
    /// failed with; if the stored token already differs, another caller
    /// refreshed while we waited on the lock and we reuse its result.
    async fn refresh_access(&self, stale: Option<&str>) -> StoreResult<String> {
        let mut tokens = self.tokens.lock().await;
        if let Some(current) = tokens.access.as_deref()
            && Some(current) != stale
        {
            debug!("token already refreshed by a concurrent request");
            return Ok(current.to_string());
        }

        let Some(refresh) = tokens.refresh.clone() else {
            self.forget_credentials(&mut tokens);
            return Err(StoreError::Auth);
        };

        let body = json!({ "refresh": refresh });
        let outcome = async {
            let resp = self
                .send_once(&Method::POST, REFRESH_PATH, Some(&body), None)
                .await?;
            let resp = Self::check(resp).await?;
            Self::read_json::<RefreshGrant>(resp).await
        }
        .await;

        match outcome {
            Ok(grant) => {
                tokens.access = Some(grant.access.clone());
                if let Err(err) = self.store.save(&tokens) {
                    warn!(error = %err, "failed to persist refreshed tokens");
                }
                info!("access token refreshed");
                Ok(grant.access)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, clearing credentials");
                self.forget_credentials(&mut tokens);
                Err(StoreError::Auth)
            }
        }
    }

    fn forget_credentials(&self, tokens: &mut TokenPair) {
        *tokens = TokenPair::default();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear stored tokens");
        }
    }

    async fn check(resp: Response) -> StoreResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> StoreResult<T> {
        let status = resp.status().as_u16();
        resp.json::<T>().await.map_err(|err| StoreError::Api {
            status,
            body: format!("invalid response body: {err}"),
        })
    }

    async fn get(&self, path: &str) -> StoreResult<Response> {
        self.request::<Value>(Method::GET, path, None).await
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> StoreResult<Response> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> StoreResult<Response> {
        self.request(Method::PUT, path, Some(body)).await
    }

    async fn patch<B: Serialize + Sync>(&self, path: &str, body: &B) -> StoreResult<Response> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    async fn del(&self, path: &str) -> StoreResult<()> {
        self.request::<Value>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }
}

/// The backend reports uniqueness violations as plain 400s on creation.
fn conflict_on_400(err: StoreError) -> StoreError {
    match err {
        StoreError::Api { status: 400, .. } => StoreError::Conflict,
        other => other,
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let resp = self.get(TASKS_PATH).await?;
        let listing: TaskListing = Self::read_json(resp).await?;
        Ok(listing.into_tasks())
    }

    #[tracing::instrument(skip(self))]
    async fn tasks_for_date(&self, date: NaiveDate) -> StoreResult<Vec<Task>> {
        let path = format!("{TASKS_PATH}?category=&scheduled_date={date}");
        let resp = self.get(&path).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self, payload))]
    async fn create_task(&self, payload: &TaskPayload) -> StoreResult<Task> {
        let resp = self
            .post(&format!("{TASKS_PATH}full-create/"), payload)
            .await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self, payload))]
    async fn replace_task(&self, id: i64, payload: &TaskPayload) -> StoreResult<Task> {
        let resp = self.put(&format!("{TASKS_PATH}{id}/update/"), payload).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: i64) -> StoreResult<()> {
        self.del(&format!("{TASKS_PATH}{id}/")).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_task_completion(&self, id: i64, completed: bool) -> StoreResult<CompletionReceipt> {
        let body = json!({ "is_completed": completed });
        let resp = self.patch(&format!("{TASKS_PATH}{id}/"), &body).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let resp = self.get(CATEGORIES_PATH).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_category(&self, title: &str) -> StoreResult<Category> {
        let body = json!({ "title": title });
        let resp = self
            .post(CATEGORIES_PATH, &body)
            .await
            .map_err(conflict_on_400)?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn replace_category(&self, id: i64, title: &str) -> StoreResult<Category> {
        let body = json!({ "title": title });
        let resp = self.put(&format!("{CATEGORIES_PATH}{id}/"), &body).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_category(&self, id: i64) -> StoreResult<()> {
        self.del(&format!("{CATEGORIES_PATH}{id}/")).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let resp = self.get(TAGS_PATH).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_tag(&self, title: &str) -> StoreResult<Tag> {
        let body = json!({ "title": title });
        let resp = self.post(TAGS_PATH, &body).await.map_err(conflict_on_400)?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn replace_tag(&self, id: i64, title: &str) -> StoreResult<Tag> {
        let body = json!({ "title": title });
        let resp = self.put(&format!("{TAGS_PATH}{id}/"), &body).await?;
        Self::read_json(resp).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_tag(&self, id: i64) -> StoreResult<()> {
        self.del(&format!("{TAGS_PATH}{id}/")).await
    }
}
