// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet login handshake.
//!
//! ```text
//! Idle → Connecting → Challenging → AwaitingSignature → VerifyingWithServer
//!                                                         ├→ Authenticated
//!                                                         ├→ Rejected
//!                                                         └→ Failed
//! ```
//!
//! Each phase is a public method so it can be driven on its own. A fresh
//! challenge is issued on every run, so re-running after a network failure
//! never replays an old signature.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::AuthError;
use crate::backend::{BackendClient, BackendError};
use crate::models::{AccountHandle, Challenge, Session, SignedChallenge};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, SessionStore};
use crate::wallet::{SignPayloadRequest, SigningType, WalletClient, WalletConnector};

/// Login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Idle,
    Connecting,
    Challenging,
    AwaitingSignature,
    VerifyingWithServer,
    Authenticated,
    Rejected,
    Failed,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthState::Authenticated | AuthState::Rejected | AuthState::Failed
        )
    }
}

pub struct AuthClient<W> {
    connector: WalletConnector<W>,
    backend: Arc<BackendClient>,
    session: Arc<SessionStore>,
    audit: AuditLog,
    clock: fn() -> DateTime<Utc>,
}

impl<W: WalletClient> AuthClient<W> {
    pub fn new(
        connector: WalletConnector<W>,
        backend: Arc<BackendClient>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            connector,
            backend,
            session,
            audit: AuditLog::disabled(),
            clock: Utc::now,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    /// Override the timestamp source used for challenges.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Run the full handshake.
    pub async fn login(&self) -> Result<Session, AuthError> {
        let (progress, _) = watch::channel(AuthState::Idle);
        self.login_observed(&progress).await
    }

    /// Run the full handshake, publishing every state on `progress`.
    pub async fn login_observed(
        &self,
        progress: &watch::Sender<AuthState>,
    ) -> Result<Session, AuthError> {
        let result = self.run(progress).await;

        match &result {
            Ok(session) => {
                info!(username = %session.username(), "Login succeeded");
                progress.send_replace(AuthState::Authenticated);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    error_code = e.error_code(),
                    kind = %e.kind(),
                    "Login failed"
                );
                self.audit
                    .record(AuditEvent::new(AuditEventType::LoginFailed).failed(e.to_string()));
                progress.send_replace(e.terminal_state());
            }
        }

        result
    }

    async fn run(&self, progress: &watch::Sender<AuthState>) -> Result<Session, AuthError> {
        progress.send_replace(AuthState::Connecting);
        let account = self.connect().await?;

        progress.send_replace(AuthState::Challenging);
        let challenge = self.challenge()?;

        progress.send_replace(AuthState::AwaitingSignature);
        let signed = self.sign(&account, challenge).await?;

        progress.send_replace(AuthState::VerifyingWithServer);
        self.verify_with_server(&signed).await
    }

    // =========================================================================
    // Phases
    // =========================================================================

    pub async fn connect(&self) -> Result<AccountHandle, AuthError> {
        self.connector
            .connect()
            .await
            .map_err(AuthError::WalletUnavailable)
    }

    /// Issue a new challenge stamped with the current time.
    pub fn challenge(&self) -> Result<Challenge, AuthError> {
        Challenge::issue(self.connector.app_name(), (self.clock)())
    }

    /// Ask the wallet to sign `challenge` with `account`.
    pub async fn sign(
        &self,
        account: &AccountHandle,
        challenge: Challenge,
    ) -> Result<SignedChallenge, AuthError> {
        let request = SignPayloadRequest {
            signing_type: SigningType::Micheline,
            payload: challenge.payload_bytes.clone(),
            source_address: account.clone(),
        };

        let response = self
            .connector
            .wallet()
            .request_sign_payload(&request)
            .await
            .map_err(|e| {
                if e.is_declined() {
                    AuthError::SignatureDeclined
                } else {
                    AuthError::SignatureFailed(e)
                }
            })?;

        Ok(SignedChallenge {
            challenge,
            signer_address: account.clone(),
            signature: response.signature,
        })
    }

    /// Exchange a signed challenge for a session and persist it.
    pub async fn verify_with_server(&self, signed: &SignedChallenge) -> Result<Session, AuthError> {
        let session = self.backend.login_by_wallet(signed).await?;
        self.session.set(session.clone())?;

        self.audit.record(
            AuditEvent::new(AuditEventType::LoginSucceeded)
                .with_account(signed.signer_address.as_str())
                .with_details(serde_json::json!({ "username": session.username() })),
        );
        Ok(session)
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Revoke the token server-side, then clear the local session.
    ///
    /// The local session is cleared even when the backend call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if self.session.is_authenticated() {
            match self.backend.logout().await {
                Ok(()) | Err(BackendError::Unauthorized) => {}
                Err(e) => warn!(error = %e, "Backend logout failed, clearing session anyway"),
            }
        }

        self.session.clear()?;
        self.audit.record(AuditEvent::new(AuditEventType::LoggedOut));
        info!("Logged out");
        Ok(())
    }

    /// Validate a restored session with the backend.
    ///
    /// Returns `false` when there is no session or the backend rejected it
    /// (the session is then cleared). Network failures keep the session.
    pub async fn check_in(&self) -> Result<bool, AuthError> {
        match self.backend.check_in().await {
            Ok(()) => Ok(true),
            Err(BackendError::NotAuthenticated | BackendError::Unauthorized) => Ok(false),
            Err(e) => Err(AuthError::Network(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RetryPolicy;
    use crate::blockchain::Network;
    use crate::testing::{sample_session, ScriptedWallet};
    use crate::wallet::WalletError;
    use chrono::TimeZone;
    use mockito::Matcher;
    use serde_json::json;

    fn new_year() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn auth_client(
        server: &mockito::Server,
        wallet: ScriptedWallet,
    ) -> (AuthClient<ScriptedWallet>, Arc<ScriptedWallet>) {
        let wallet = Arc::new(wallet);
        let session = Arc::new(SessionStore::in_memory());
        let backend = Arc::new(
            BackendClient::new(&format!("{}/api/", server.url()), Arc::clone(&session))
                .unwrap()
                .with_retry_policy(RetryPolicy::none()),
        );
        let connector = WalletConnector::new(Arc::clone(&wallet), "ArtCrowd", Network::ghostnet());
        (
            AuthClient::new(connector, backend, session).with_clock(new_year),
            wallet,
        )
    }

    #[tokio::test]
    async fn login_end_to_end() {
        let statement = "I want to login on ArtCrowd at 2024-01-01T00:00:00Z";
        let payload = format!("0501{:08x}{}", statement.len(), hex::encode(statement));

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login-by-wallet")
            .match_body(Matcher::Json(json!({
                "wallet": "tz1abc",
                "message": payload.clone(),
                "signature": "sig"
            })))
            .with_status(200)
            .with_body(r#"{"token":"T","username":"alice"}"#)
            .create_async()
            .await;

        let (client, wallet) = auth_client(
            &server,
            ScriptedWallet::new()
                .with_active_account("tz1abc")
                .with_signature("sig"),
        );
        let (progress, states) = watch::channel(AuthState::Idle);

        let session = client.login_observed(&progress).await.unwrap();

        assert_eq!(session.token, "T");
        assert_eq!(client.session().token().as_deref(), Some("T"));
        assert_eq!(*states.borrow(), AuthState::Authenticated);

        let signed = wallet.sign_requests();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].signing_type, SigningType::Micheline);
        assert_eq!(signed[0].payload, payload);
        assert_eq!(signed[0].source_address.as_str(), "tz1abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_wallet_fails_before_signing() {
        let server = mockito::Server::new_async().await;
        let (client, wallet) = auth_client(
            &server,
            ScriptedWallet::new().with_permission_error(WalletError::Unavailable(
                "no extension".into(),
            )),
        );
        let (progress, states) = watch::channel(AuthState::Idle);

        let err = client.login_observed(&progress).await.unwrap_err();

        assert!(matches!(err, AuthError::WalletUnavailable(_)));
        assert_eq!(*states.borrow(), AuthState::Failed);
        assert!(wallet.sign_requests().is_empty());
    }

    #[tokio::test]
    async fn declined_signature_keeps_previous_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/login-by-wallet")
            .expect(0)
            .create_async()
            .await;

        let (client, _wallet) = auth_client(
            &server,
            ScriptedWallet::new()
                .with_active_account("tz1abc")
                .with_sign_error(WalletError::Declined),
        );
        client.session().set(sample_session("OLD")).unwrap();
        let (progress, states) = watch::channel(AuthState::Idle);

        let err = client.login_observed(&progress).await.unwrap_err();

        assert!(matches!(err, AuthError::SignatureDeclined));
        assert_eq!(*states.borrow(), AuthState::Rejected);
        assert_eq!(client.session().token().as_deref(), Some("OLD"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn backend_rejection_is_surfaced_and_session_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/login-by-wallet")
            .with_status(400)
            .with_body(r#"{"non_field_errors":["Signature is not valid"]}"#)
            .create_async()
            .await;

        let (client, _wallet) = auth_client(
            &server,
            ScriptedWallet::new()
                .with_active_account("tz1abc")
                .with_signature("bad"),
        );
        client.session().set(sample_session("OLD")).unwrap();

        let err = client.login().await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationRejected);
        assert_eq!(err.user_message(), "Signature is not valid");
        assert_eq!(err.terminal_state(), AuthState::Failed);
        assert_eq!(client.session().token().as_deref(), Some("OLD"));
    }

    #[tokio::test]
    async fn rerun_after_network_failure_signs_a_new_challenge() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/api/login-by-wallet")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let (client, wallet) = auth_client(
            &server,
            ScriptedWallet::new()
                .with_active_account("tz1abc")
                .with_signature("sig"),
        );

        let err = client.login().await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
        assert!(err.kind().is_restartable());
        failing.assert_async().await;
        failing.remove_async().await;

        let _ok = server
            .mock("POST", "/api/login-by-wallet")
            .with_status(200)
            .with_body(r#"{"token":"T2","username":"alice"}"#)
            .create_async()
            .await;

        client.login().await.unwrap();
        assert_eq!(wallet.sign_requests().len(), 2);
        assert_eq!(client.session().token().as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn logout_clears_session_even_if_backend_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/logout")
            .match_header("authorization", "token T")
            .with_status(500)
            .create_async()
            .await;

        let (client, _wallet) = auth_client(&server, ScriptedWallet::new());
        client.session().set(sample_session("T")).unwrap();

        client.logout().await.unwrap();

        assert!(client.session().current().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn check_in_reports_rejected_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/checkin")
            .with_status(401)
            .create_async()
            .await;

        let (client, _wallet) = auth_client(&server, ScriptedWallet::new());
        client.session().set(sample_session("T")).unwrap();

        assert!(!client.check_in().await.unwrap());
        assert!(client.session().current().is_none());

        // Nothing left to check
        assert!(!client.check_in().await.unwrap());
    }
}
