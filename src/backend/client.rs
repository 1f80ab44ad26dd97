// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the storefront backend.
//!
//! Idempotent calls (`buy`, `checkin`) are retried on transient failures:
//! connect errors, timeouts, 429 and 5xx. The login POST is sent once; its
//! signed challenge must not be replayed behind the user's back.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, error, warn};
use url::Url;

use super::{BackendError, BuySharesRequest, FieldErrors, ShareResponse, WalletLoginRequest};
use crate::models::{OnChainReceipt, PurchaseRecord, Session, SignedChallenge};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, SessionStore};

/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Backoff applied to idempotent calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
    }
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    audit: AuditLog,
    retry: RetryPolicy,
    timeout: Duration,
}

impl BackendClient {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api/`.
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self, BackendError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url)?,
            session,
            audit: AuditLog::disabled(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// `POST login-by-wallet`. Sent once, without a session.
    pub async fn login_by_wallet(&self, signed: &SignedChallenge) -> Result<Session, BackendError> {
        let body = WalletLoginRequest {
            wallet: signed.signer_address.as_str(),
            message: &signed.challenge.payload_bytes,
            signature: &signed.signature,
        };
        let request = self.request(Method::POST, "login-by-wallet")?.json(&body);

        let response = execute_request_builder(request).await?;
        let status = response.status();
        let text = read_body(response).await?;

        if status.is_success() {
            return match serde_json::from_str::<Session>(&text) {
                Ok(session) => Ok(session),
                Err(e) => {
                    // Some deployments answer 200 with only an error payload
                    let errors = FieldErrors::from_body(&text);
                    if errors.first_message().is_some() {
                        Err(BackendError::Rejected {
                            status: status.as_u16(),
                            errors,
                        })
                    } else {
                        Err(BackendError::InvalidResponse(format!(
                            "login response without token: {e}"
                        )))
                    }
                }
            };
        }

        Err(status_error(status, &text, self.endpoint("login-by-wallet")?))
    }

    /// `POST projects/{id}/buy`. Idempotent on the operation hash.
    pub async fn buy_shares(
        &self,
        project_id: u64,
        receipt: &OnChainReceipt,
    ) -> Result<PurchaseRecord, BackendError> {
        let path = format!("projects/{project_id}/buy");
        let body = serde_json::to_value(BuySharesRequest::from(receipt))
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let text = self
            .send_authorized(Method::POST, &path, Some(body), true)
            .await?;

        let share: ShareResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::InvalidResponse(format!("buy response: {e}")))?;
        Ok(share.into_record(project_id, receipt.operation_hash.clone()))
    }

    /// `GET checkin`. Confirms the session token is still accepted.
    pub async fn check_in(&self) -> Result<(), BackendError> {
        self.send_authorized(Method::GET, "checkin", None, true)
            .await
            .map(|_| ())
    }

    /// `GET logout`. Revokes the token server-side.
    pub async fn logout(&self) -> Result<(), BackendError> {
        self.send_authorized(Method::GET, "logout", None, false)
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Request builder with timeout, user agent and request id applied.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(path)?;
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%method, %url, request_id = %request_id, "Backend request");

        Ok(self
            .http
            .request(method, url)
            .timeout(self.timeout)
            .header(
                USER_AGENT,
                format!("artcrowd-wallet/{}", env!("CARGO_PKG_VERSION")),
            )
            .header(REQUEST_ID_HEADER, request_id))
    }

    /// Send with the session token. A 401 clears the session it was sent with.
    async fn send_authorized(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        idempotent: bool,
    ) -> Result<String, BackendError> {
        let token = self.session.token().ok_or(BackendError::NotAuthenticated)?;

        let mut request = self
            .request(method, path)?
            .header(AUTHORIZATION, format!("token {token}"));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = if idempotent {
            self.send_with_retry(request).await?
        } else {
            execute_request_builder(request).await?
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session(&token, path);
            return Err(BackendError::Unauthorized);
        }

        let text = read_body(response).await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(status_error(status, &text, self.endpoint(path)?))
        }
    }

    fn invalidate_session(&self, rejected_token: &str, path: &str) {
        // A newer login may have replaced the session in the meantime
        if self.session.token().as_deref() != Some(rejected_token) {
            return;
        }

        warn!(path = %path, "Backend rejected session token, clearing session");
        if let Err(e) = self.session.clear() {
            error!(error = %e, "Rejected session token could not be removed from disk");
        }
        self.audit.record(
            AuditEvent::new(AuditEventType::SessionInvalidated)
                .with_details(serde_json::json!({ "path": path })),
        );
    }

    async fn send_with_retry(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let Some(template) = request.try_clone() else {
            return execute_request_builder(request).await.map_err(Into::into);
        };

        (|| async {
            let request = template.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    None,
                    "request is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request).await
        })
        .retry(self.retry.backoff())
        .when(|err: &RequestHandleError| err.is_retryable())
        .notify(|err: &RequestHandleError, delay: Duration| {
            debug!(url = %err.url, error = %err.error, ?delay, "Retrying backend request");
        })
        .await
        .map_err(Into::into)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, BackendError> {
    let mut url =
        Url::parse(raw).map_err(|e| BackendError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(BackendError::InvalidUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn read_body(response: Response) -> Result<String, BackendError> {
    let url = response.url().to_string();
    let status = response.status().as_u16();
    response.text().await.map_err(|e| BackendError::Network {
        url,
        status: Some(status),
        error: format!("failed to read body: {e}"),
    })
}

fn status_error(status: StatusCode, body: &str, url: Url) -> BackendError {
    if status.is_client_error() {
        BackendError::Rejected {
            status: status.as_u16(),
            errors: FieldErrors::from_body(body),
        }
    } else {
        BackendError::Network {
            url: url.to_string(),
            status: Some(status.as_u16()),
            error: format!("unexpected status {status}"),
        }
    }
}

// =============================================================================
// Transport classification
// =============================================================================

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
}

impl RequestHandleError {
    fn retryable(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: true,
        }
    }

    fn permanent(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: false,
        }
    }

    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for BackendError {
    fn from(value: RequestHandleError) -> Self {
        BackendError::Network {
            url: value.url,
            status: value.status,
            error: value.error,
        }
    }
}

async fn execute_request_builder(request: RequestBuilder) -> Result<Response, RequestHandleError> {
    let (client, request) = request.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map(|url| url.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                return Err(RequestHandleError::retryable(
                    url,
                    Some(status),
                    format!("bad status code {status}"),
                ));
            }
            Ok(resp)
        }
        Err(err) if err.is_timeout() || err.is_connect() => Err(RequestHandleError::retryable(
            url,
            None,
            format!("timeout/connect error: {err}"),
        )),
        Err(err) => Err(RequestHandleError::permanent(
            url,
            None,
            format!("request failed: {err}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_session, signed_challenge};
    use mockito::Matcher;
    use serde_json::json;

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn client(server: &mockito::Server, session: Option<Session>) -> BackendClient {
        let store = Arc::new(SessionStore::in_memory());
        if let Some(session) = session {
            store.set(session).unwrap();
        }
        BackendClient::new(&format!("{}/api", server.url()), store)
            .unwrap()
            .with_retry_policy(fast_retry(2))
    }

    fn receipt() -> OnChainReceipt {
        OnChainReceipt {
            operation_hash: "ooHash".into(),
            block_hash: "BLock".to_string(),
            confirmations: 1,
        }
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let store = Arc::new(SessionStore::in_memory());
        let client = BackendClient::new("http://localhost:8000/api", store).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            client.endpoint("projects/7/buy").unwrap().as_str(),
            "http://localhost:8000/api/projects/7/buy"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let store = Arc::new(SessionStore::in_memory());
        assert!(matches!(
            BackendClient::new("not a url", store),
            Err(BackendError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn login_posts_signed_challenge_anonymously() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login-by-wallet")
            .match_header("authorization", Matcher::Missing)
            .match_header(REQUEST_ID_HEADER, Matcher::Any)
            .match_body(Matcher::Json(json!({
                "wallet": "tz1abc",
                "message": signed_challenge().challenge.payload_bytes,
                "signature": "sig"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"T","username":"alice","avatar":null}"#)
            .create_async()
            .await;

        let client = client(&server, None);
        let session = client.login_by_wallet(&signed_challenge()).await.unwrap();

        assert_eq!(session.token, "T");
        assert_eq!(session.username(), "alice");
        // Persisting is the auth flow's job
        assert!(client.session().current().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_validation_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/login-by-wallet")
            .with_status(400)
            .with_body(r#"{"non_field_errors":["Signature is not valid"]}"#)
            .create_async()
            .await;

        let err = client(&server, None)
            .login_by_wallet(&signed_challenge())
            .await
            .unwrap_err();

        match err {
            BackendError::Rejected { status, errors } => {
                assert_eq!(status, 400);
                assert_eq!(errors.first_message().as_deref(), Some("Signature is not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login-by-wallet")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server, None)
            .login_by_wallet(&signed_challenge())
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn buy_sends_token_and_receipt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/42/buy")
            .match_header("authorization", "token T")
            .match_body(Matcher::Json(json!({
                "operationHash": "ooHash",
                "blockHash": "BLock"
            })))
            .with_status(201)
            .with_body(r#"{"patron":{"username":"alice"},"quantity":3,"purchased_on":"2024-01-01T00:00:05Z"}"#)
            .create_async()
            .await;

        let record = client(&server, Some(sample_session("T")))
            .buy_shares(42, &receipt())
            .await
            .unwrap();

        assert_eq!(record.operation_hash.as_str(), "ooHash");
        assert_eq!(record.project_id, 42);
        assert_eq!(record.quantity, Some(3));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn buy_without_session_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/42/buy")
            .expect(0)
            .create_async()
            .await;

        let err = client(&server, None).buy_shares(42, &receipt()).await.unwrap_err();

        assert!(matches!(err, BackendError::NotAuthenticated));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/projects/42/buy")
            .with_status(401)
            .with_body(r#"{"detail":"Invalid token."}"#)
            .create_async()
            .await;

        let client = client(&server, Some(sample_session("T")));
        let mut sessions = client.session().subscribe();

        let err = client.buy_shares(42, &receipt()).await.unwrap_err();

        assert!(matches!(err, BackendError::Unauthorized));
        assert!(client.session().current().is_none());
        assert!(sessions.has_changed().unwrap());
        assert!(sessions.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn buy_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/42/buy")
            .with_status(502)
            .expect(3)
            .create_async()
            .await;

        let err = client(&server, Some(sample_session("T")))
            .buy_shares(42, &receipt())
            .await
            .unwrap_err();

        assert!(err.is_transient());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn buy_validation_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/projects/42/buy")
            .with_status(400)
            .with_body(r#"{"ophash":["Operation not found on chain"]}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server, Some(sample_session("T")))
            .buy_shares(42, &receipt())
            .await
            .unwrap_err();

        match err {
            BackendError::Rejected { errors, .. } => {
                assert_eq!(errors.to_string(), "ophash: Operation not found on chain")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn check_in_and_logout_use_get() {
        let mut server = mockito::Server::new_async().await;
        let checkin = server
            .mock("GET", "/api/checkin")
            .match_header("authorization", "token T")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let logout = server
            .mock("GET", "/api/logout")
            .match_header("authorization", "token T")
            .with_status(200)
            .create_async()
            .await;

        let client = client(&server, Some(sample_session("T")));
        client.check_in().await.unwrap();
        client.logout().await.unwrap();

        checkin.assert_async().await;
        logout.assert_async().await;
    }
}
