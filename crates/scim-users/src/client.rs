//! Asynchronous SCIM user directory client.
//!
//! Every public operation reports its outcome through `tracing` and hands the caller an
//! absent or empty value on failure; no error crosses the operation boundary. Requests are
//! always awaited one after another.

use crate::models::{ListResponse, PageRequest, PatchRequest, ScimErrorBody, ScimUser, UserRole};
use crate::Result;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use scim_core::client::{build_http_client, HttpClientConfig};
use scim_core::{Deployment, Error, ScimConfig};
use tracing::{debug, error, info, warn};
use url::Url;

/// Content type of SCIM request bodies.
const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// Server message fragment signalling that a moderator or admin must be demoted first.
const DEMOTION_REQUIRED: &str = "Adjust role to User";

/// How many times a delete is retried after demoting the account.
pub const MAX_DELETE_RETRIES: u32 = 3;

/// Builder for [`DirectoryClient`].
#[derive(Debug, Clone)]
pub struct DirectoryClientBuilder {
    config: ScimConfig,
    http: HttpClientConfig,
}

impl DirectoryClientBuilder {
    /// Create a builder for the given base URL and bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self::from_config(ScimConfig::new(base_url, token)?))
    }

    /// Create a builder from an existing configuration.
    #[must_use]
    pub fn from_config(config: ScimConfig) -> Self {
        Self {
            config,
            http: HttpClientConfig::default(),
        }
    }

    /// Route HTTPS requests through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config = self.config.with_proxy(proxy);
        self
    }

    /// Override the request timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config = self.config.with_timeout(seconds);
        self
    }

    /// Override the HTTP client configuration. The timeout always comes from the SCIM
    /// configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.http = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DirectoryClient> {
        self.config.check()?;
        let endpoint = self.config.users_endpoint()?;
        let http = self.http.with_timeout(self.config.timeout());
        let client = build_http_client(&self.config, &http)?;

        Ok(DirectoryClient {
            http: client,
            endpoint,
            deployment: self.config.deployment(),
        })
    }
}

/// Client for the SCIM users endpoint of one platform instance.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    endpoint: Url,
    deployment: Deployment,
}

impl DirectoryClient {
    /// Construct a client from a bearer token, the instance base URL and an optional
    /// HTTPS proxy.
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let mut builder = DirectoryClientBuilder::new(base_url, token)?;
        if let Some(proxy) = proxy {
            builder = builder.with_proxy(proxy);
        }
        builder.build()
    }

    /// Construct a client from a configuration.
    pub fn from_config(config: ScimConfig) -> Result<Self> {
        DirectoryClientBuilder::from_config(config).build()
    }

    /// SCIM users endpoint used for every request.
    #[must_use]
    pub fn users_endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Deployment tier the endpoint was derived for.
    #[must_use]
    pub const fn deployment(&self) -> Deployment {
        self.deployment
    }

    /// Fetch a single user by account ID.
    ///
    /// Returns `None` when the account does not exist or the call fails.
    pub async fn get_user(&self, account_id: &str) -> Option<ScimUser> {
        match self.fetch_user(account_id).await {
            Ok(user) => {
                info!("Retrieved user with account ID {account_id}");
                Some(user)
            }
            Err(Error::NotFound(_)) => {
                warn!("User with account ID {account_id} not found.");
                None
            }
            Err(err) => {
                log_failure(&err);
                None
            }
        }
    }

    /// Fetch every user, 100 at a time.
    ///
    /// A failed page ends pagination; users collected up to that point are still returned.
    pub async fn get_all_users(&self) -> Vec<ScimUser> {
        let mut users = Vec::new();
        let mut page = PageRequest::first();

        loop {
            info!(
                "Getting {} results from {} with startIndex of {}",
                page.count, self.endpoint, page.start_index
            );

            let list = match self.fetch_page(&page).await {
                Ok(list) => list,
                Err(err) => {
                    log_failure(&err);
                    break;
                }
            };

            users.extend(list.resources);
            page = page.next();
            if page.start_index > list.total_results {
                break;
            }
        }

        users
    }

    /// Change the active flag and/or role of an account.
    ///
    /// `role` must be one of `Registered`, `Moderator` or `Admin`; anything else is
    /// reported and nothing is sent. The outcome is only logged.
    pub async fn update_user(&self, account_id: &str, active: Option<bool>, role: Option<&str>) {
        let role = match role.map(str::parse::<UserRole>).transpose() {
            Ok(role) => role,
            Err(err) => {
                warn!("{}", validation_message(&err));
                return;
            }
        };

        self.apply_update(account_id, active, role).await;
    }

    /// Delete an account.
    ///
    /// Moderators and admins cannot be deleted; each time the server says so the account
    /// is demoted to `Registered`, and the delete is retried at most [`MAX_DELETE_RETRIES`]
    /// times.
    pub async fn delete_user(&self, account_id: &str) {
        let mut retries = 0;

        loop {
            let outcome = match self.send_delete(account_id).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log_failure(&err);
                    return;
                }
            };

            match outcome {
                DeleteOutcome::Deleted => {
                    info!("Deleted user with account ID {account_id}");
                }
                DeleteOutcome::Refused(message) | DeleteOutcome::Failed(message) => {
                    warn!("Failed to delete user with account ID {account_id}");
                    warn!("{message}");
                }
                DeleteOutcome::NotFound => {
                    warn!("User with account ID {account_id} not found.");
                }
                DeleteOutcome::Disabled => {
                    warn!(
                        "Deleting users via SCIM is disabled. To enable it, open a support ticket."
                    );
                }
                DeleteOutcome::Unexpected { status, body } => {
                    error!("API call failed with status code: {status}.");
                    error!("{body}");
                }
                DeleteOutcome::DemotionRequired => {
                    warn!(
                        "User with account ID {account_id} cannot be deleted because they're \
                         a moderator or admin."
                    );
                    info!("Reducing their role to User...");
                    self.apply_update(account_id, None, Some(UserRole::Registered))
                        .await;
                    if retries >= MAX_DELETE_RETRIES {
                        error!("Max retries reached. Aborting deletion.");
                        return;
                    }

                    retries += 1;
                    info!("Retrying delete...");
                    continue;
                }
            }

            return;
        }
    }

    async fn apply_update(&self, account_id: &str, active: Option<bool>, role: Option<UserRole>) {
        let payload = PatchRequest::account_update(active, role);
        match self.send_patch(account_id, &payload).await {
            Ok(()) => info!("Updated user with account ID {account_id}"),
            Err(err) => log_failure(&err),
        }
    }

    async fn fetch_user(&self, account_id: &str) -> Result<ScimUser> {
        let url = self.user_url(account_id)?;
        let response = self.send(self.http.get(url)).await?;
        let response = expect_status(response, StatusCode::OK).await?;
        response.json::<ScimUser>().await.map_err(Error::from)
    }

    async fn fetch_page(&self, page: &PageRequest) -> Result<ListResponse> {
        let request = self
            .http
            .get(self.endpoint.clone())
            .query(&page.to_pairs());
        let response = self.send(request).await?;
        let response = expect_status(response, StatusCode::OK).await?;
        response.json::<ListResponse>().await.map_err(Error::from)
    }

    async fn send_patch(&self, account_id: &str, payload: &PatchRequest) -> Result<()> {
        let url = self.user_url(account_id)?;
        let request = self
            .http
            .request(Method::PATCH, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(SCIM_CONTENT_TYPE))
            .body(serde_json::to_vec(payload)?);

        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::from_status(status, body))
        }
    }

    async fn send_delete(&self, account_id: &str) -> Result<DeleteOutcome> {
        let url = self.user_url(account_id)?;
        info!("Sending DELETE request to {url}");
        let response = self.send(self.http.delete(url)).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(DeleteOutcome::classify(status, &body))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        debug!(
            status = response.status().as_u16(),
            url = %response.url(),
            "SCIM response received"
        );
        Ok(response)
    }

    fn user_url(&self, account_id: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!("{} cannot carry an account ID", self.endpoint))
            })?
            .push(account_id);
        Ok(url)
    }
}

/// How the server answered a DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    /// 204: the account is gone.
    Deleted,
    /// 400: the platform refuses, e.g. for system accounts.
    Refused(String),
    /// 404: no such account.
    NotFound,
    /// 403: SCIM deletion is disabled for the tenant.
    Disabled,
    /// 500 asking for the account to be demoted first.
    DemotionRequired,
    /// Any other 500.
    Failed(String),
    /// Any other status.
    Unexpected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

impl DeleteOutcome {
    fn classify(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::NO_CONTENT => Self::Deleted,
            StatusCode::BAD_REQUEST => Self::Refused(error_message(body)),
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::FORBIDDEN => Self::Disabled,
            StatusCode::INTERNAL_SERVER_ERROR => {
                let message = error_message(body);
                if message.contains(DEMOTION_REQUIRED) {
                    Self::DemotionRequired
                } else {
                    Self::Failed(message)
                }
            }
            status => Self::Unexpected {
                status: status.as_u16(),
                body: body.to_string(),
            },
        }
    }
}

/// Extract the server's message from an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ScimErrorBody>(body) {
        if let Some(message) = parsed.message() {
            return message.to_string();
        }
    }
    if let Ok(message) = serde_json::from_str::<String>(body) {
        return message;
    }
    body.to_string()
}

async fn expect_status(response: Response, expected: StatusCode) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::from_status(status, body))
}

fn validation_message(err: &Error) -> String {
    match err {
        Error::ValidationError(message) => message.clone(),
        other => other.to_string(),
    }
}

fn log_failure(err: &Error) {
    match err {
        Error::UnexpectedStatus { status, body } => {
            error!("API call failed with status code: {status}.");
            error!("{body}");
        }
        Error::NotFound(body)
        | Error::BadRequest(body)
        | Error::Forbidden(body) => {
            let status = err.status().unwrap_or_default();
            error!("API call failed with status code: {status}.");
            error!("{body}");
        }
        other => error!(code = other.error_code(), "{other}"),
    }
}
