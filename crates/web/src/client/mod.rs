//! REST API client.
//!
//! Every page reaches the backend through this module. Reads and writes are
//! phrased as table queries (see [`query`]) and translated into REST calls;
//! login, registration and file upload have dedicated methods because they
//! do not map onto a table.

pub mod error;
pub mod query;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use cms_core::records::{
    AuditLog, Category, ContrabandItem, CreatedId, CustodyRecord, ErrorBody, EvidenceFile,
    LoginRequest, LoginResponse, Message, NewContrabandItem, NewCustodyTransfer, NewMessage,
    NewUser, UploadedFile, UserProfile, UserUpdate,
};
use cms_core::{ContrabandId, ItemStatus, MessageId, UserId};

pub use error::ClientError;
pub use query::{Query, QueryError, Resolved, RestCall, Table, from};

/// Header carrying the browser's address to the API (for audit rows and
/// rate limiting).
/// Most audit rows the API returns in one response.
pub const AUDIT_LOG_LIMIT: usize = 5000;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REQUEST_ID: &str = "x-request-id";

/// Who a request is made for.
#[derive(Clone, Copy)]
pub struct Caller<'a> {
    pub token: Option<&'a SecretString>,
    pub client_ip: Option<&'a str>,
    pub request_id: Option<&'a str>,
}

impl<'a> Caller<'a> {
    /// A caller without a token (login, registration).
    #[must_use]
    pub const fn anonymous(client_ip: Option<&'a str>, request_id: Option<&'a str>) -> Self {
        Self {
            token: None,
            client_ip,
            request_id,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        {
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(ip) = self.client_ip
            && let Ok(value) = HeaderValue::from_str(ip)
        {
            headers.insert(FORWARDED_FOR, value);
        }
        if let Some(id) = self.request_id
            && let Ok(value) = HeaderValue::from_str(id)
        {
            headers.insert(REQUEST_ID, value);
        }
        headers
    }
}

/// An evidence file picked in a browser form.
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

/// REST API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner { client, base_url }),
        })
    }

    /// Absolute URL of an API path such as `/contraband-items`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Browser-facing URL of a stored evidence file (`/files/{name}`).
    #[must_use]
    pub fn public_file_url(&self, file_url: &str) -> String {
        self.endpoint(file_url)
    }

    // =========================================================================
    // Query Execution
    // =========================================================================

    /// Resolve and send a query. Returns `None` for no-op inserts and for
    /// responses without a body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Query` if the query has no endpoint, or the
    /// error the API answered with.
    pub async fn execute(
        &self,
        caller: &Caller<'_>,
        query: &Query,
    ) -> Result<Option<Value>, ClientError> {
        match query.resolve()? {
            Resolved::Call(call) => self.send(caller, &call).await,
            Resolved::NoOp => {
                tracing::debug!(table = %query.table(), "Insert recorded by the API; nothing sent");
                Ok(None)
            }
        }
    }

    /// Send a query and decode its response into `T`.
    ///
    /// # Errors
    ///
    /// As [`Self::execute`], plus `ClientError::Decode` for an unexpected body.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        caller: &Caller<'_>,
        query: &Query,
    ) -> Result<T, ClientError> {
        let value = self.execute(caller, query).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    #[instrument(skip(self, caller, call), fields(method = %call.method, path = %call.path))]
    async fn send(
        &self,
        caller: &Caller<'_>,
        call: &RestCall,
    ) -> Result<Option<Value>, ClientError> {
        let mut request = self
            .inner
            .client
            .request(call.method.clone(), self.endpoint(&call.path))
            .headers(caller.headers());
        if let Some(body) = &call.body {
            request = request.json(body);
        }
        read_response(request.send().await?).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        caller: &Caller<'_>,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(path))
            .headers(caller.headers())
            .json(body)
            .send()
            .await?;
        let value = read_response(response).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a token and the officer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` for wrong credentials or an
    /// inactive account.
    #[instrument(skip(self, caller, request), fields(email = %request.email))]
    pub async fn login(
        &self,
        caller: &Caller<'_>,
        request: &LoginRequest,
    ) -> Result<LoginResponse, ClientError> {
        self.post_json(caller, "/auth/login", request).await
    }

    /// Self-registration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Conflict` if the email is taken, or
    /// `ClientError::Api` (400) for invalid input.
    #[instrument(skip(self, caller, user), fields(email = %user.email))]
    pub async fn register(
        &self,
        caller: &Caller<'_>,
        user: &NewUser,
    ) -> Result<CreatedId, ClientError> {
        self.post_json(caller, "/auth/register", user).await
    }

    /// The signed-in officer's current profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when the token is no longer valid.
    pub async fn me(&self, caller: &Caller<'_>) -> Result<UserProfile, ClientError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("/users/me"))
            .headers(caller.headers())
            .send()
            .await?;
        let value = read_response(response).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Upload an evidence file for an item.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` (413) when the file is too large.
    #[instrument(skip(self, caller, upload), fields(file = %upload.file_name, size = upload.bytes.len()))]
    pub async fn upload(
        &self,
        caller: &Caller<'_>,
        contraband_id: ContrabandId,
        upload: EvidenceUpload,
    ) -> Result<UploadedFile, ClientError> {
        let mut part = multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let mut form = multipart::Form::new()
            .text("contraband_id", contraband_id.to_string())
            .part("file", part);
        if let Some(description) = upload.description {
            form = form.text("description", description);
        }

        let response = self
            .inner
            .client
            .post(self.endpoint("/files/upload"))
            .headers(caller.headers())
            .multipart(form)
            .send()
            .await?;
        let value = read_response(response).await?.unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Typed Queries
    // =========================================================================

    /// All items, or only those seized by one officer.
    ///
    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn items(
        &self,
        caller: &Caller<'_>,
        seized_by: Option<UserId>,
    ) -> Result<Vec<ContrabandItem>, ClientError> {
        let mut query = from(Table::ContrabandItems).select();
        if let Some(officer) = seized_by {
            query = query.eq("seized_by", officer);
        }
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for an unknown item.
    pub async fn item(
        &self,
        caller: &Caller<'_>,
        id: ContrabandId,
    ) -> Result<ContrabandItem, ClientError> {
        self.fetch(caller, &from(Table::ContrabandItems).select().eq("id", id))
            .await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn categories(&self, caller: &Caller<'_>) -> Result<Vec<Category>, ClientError> {
        self.fetch(caller, &from(Table::ContrabandCategories).select())
            .await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn users(
        &self,
        caller: &Caller<'_>,
        active_only: bool,
    ) -> Result<Vec<UserProfile>, ClientError> {
        let mut query = from(Table::Users).select();
        if active_only {
            query = query.eq("is_active", true);
        }
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn messages(&self, caller: &Caller<'_>) -> Result<Vec<Message>, ClientError> {
        self.fetch(caller, &from(Table::Messages).select()).await
    }

    /// Organisation-wide approval requests still awaiting a response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` for roles without report access.
    pub async fn pending_approvals(&self, caller: &Caller<'_>) -> Result<Vec<Message>, ClientError> {
        let query = from(Table::Messages)
            .select()
            .eq("message_type", "approval_request");
        self.fetch(caller, &query).await
    }

    /// The newest audit rows, up to [`AUDIT_LOG_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` for roles without audit access.
    pub async fn audit_logs(&self, caller: &Caller<'_>) -> Result<Vec<AuditLog>, ClientError> {
        let query = from(Table::AuditLogs).select().limit(AUDIT_LOG_LIMIT);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn custody_chain(
        &self,
        caller: &Caller<'_>,
        item: ContrabandId,
    ) -> Result<Vec<CustodyRecord>, ClientError> {
        let query = from(Table::CustodyChain)
            .select()
            .eq("contraband_id", item);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn evidence_files(
        &self,
        caller: &Caller<'_>,
        item: ContrabandId,
    ) -> Result<Vec<EvidenceFile>, ClientError> {
        let query = from(Table::EvidenceFiles)
            .select()
            .eq("contraband_id", item);
        self.fetch(caller, &query).await
    }

    /// Register a seizure; returns the created item.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Conflict` for a duplicate seizure number.
    pub async fn create_item(
        &self,
        caller: &Caller<'_>,
        item: &NewContrabandItem,
    ) -> Result<ContrabandItem, ClientError> {
        let query = from(Table::ContrabandItems).insert(serde_json::to_value(item)?);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Conflict` for an illegal transition.
    pub async fn set_status(
        &self,
        caller: &Caller<'_>,
        item: ContrabandId,
        status: ItemStatus,
    ) -> Result<ContrabandItem, ClientError> {
        let query = from(Table::ContrabandItems)
            .update(serde_json::json!({ "status": status }))
            .eq("id", item);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Conflict` when the item is destroyed or released.
    pub async fn transfer_custody(
        &self,
        caller: &Caller<'_>,
        transfer: &NewCustodyTransfer,
    ) -> Result<CreatedId, ClientError> {
        let query = from(Table::CustodyChain).insert(serde_json::to_value(transfer)?);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns the API's error.
    pub async fn send_message(
        &self,
        caller: &Caller<'_>,
        message: &NewMessage,
    ) -> Result<CreatedId, ClientError> {
        let query = from(Table::Messages).insert(serde_json::to_value(message)?);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Forbidden` when the caller is not the recipient.
    pub async fn mark_read(&self, caller: &Caller<'_>, id: MessageId) -> Result<(), ClientError> {
        let query = from(Table::Messages)
            .update(serde_json::json!({ "is_read": true }))
            .eq("id", id);
        self.execute(caller, &query).await.map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `ClientError::Conflict` if the email is taken.
    pub async fn create_user(
        &self,
        caller: &Caller<'_>,
        user: &NewUser,
    ) -> Result<UserProfile, ClientError> {
        let query = from(Table::Users).insert(serde_json::to_value(user)?);
        self.fetch(caller, &query).await
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` (400) for a self-lockout.
    pub async fn update_user(
        &self,
        caller: &Caller<'_>,
        id: UserId,
        update: &UserUpdate,
    ) -> Result<UserProfile, ClientError> {
        let query = from(Table::Users)
            .update(serde_json::to_value(update)?)
            .eq("id", id);
        self.fetch(caller, &query).await
    }
}

/// Turn a response into its JSON body, or the matching `ClientError`.
async fn read_response(response: reqwest::Response) -> Result<Option<Value>, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(serde_json::from_slice(&bytes)?));
    }

    let message = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .map(|body| body.error);
    tracing::debug!(%status, message = ?message, "API returned an error");
    Err(ClientError::from_status(status, message))
}
