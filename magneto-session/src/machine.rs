//! Authentication state machine.
//!
//! ## Lifecycle
//!
//! 1. **Start**: request an app token; the box shows a prompt on its display
//! 2. **Poll**: ask the box whether the user pressed the button
//! 3. **Authorize**: on grant, fetch a challenge and sign it into a session
//! 4. **Use**: attach the session token to every authenticated call, silently
//!    refreshing it once when the box reports it expired
//!
//! Every load-mutate-save sequence on the credential record runs under a
//! single async mutex. Authenticated calls release it while the request is
//! in flight.
//!
//! ## Example
//!
//! ```ignore
//! let machine = AuthMachine::new(CredentialStore::at_default_path(), api);
//! let track_id = machine.start_authentication().await?;
//! let outcome = machine.wait_for_approval(Duration::from_secs(2)).await?;
//!
//! let channels = machine
//!     .with_session(|api, token| async move { api.tv_channels(&token).await })
//!     .await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use magneto_core::{AppIdentity, ApprovalStatus, AuthStatus, CredentialRecord};
use magneto_fetch::{BoxApi, BoxError, SessionGrant, parse_base_url};
use magneto_store::CredentialStore;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::AuthError;

/// How long a pending authorization may wait for the button press.
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Poll Outcome
// ============================================================================

/// Result of one status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    /// Status after the poll.
    pub status: AuthStatus,
    /// Human-readable summary.
    pub message: String,
    /// Raw approval status, when the box was asked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalStatus>,
    /// True if the approval window elapsed during this poll.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expired: bool,
}

impl PollOutcome {
    fn new(status: AuthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            approval: None,
            expired: false,
        }
    }

    fn with_approval(mut self, approval: ApprovalStatus) -> Self {
        self.approval = Some(approval);
        self
    }
}

/// Describes a status for display.
pub fn describe_status(status: AuthStatus) -> &'static str {
    match status {
        AuthStatus::NotStarted => "Not paired with the box. Start authentication to continue.",
        AuthStatus::WaitingApproval => "Waiting for approval on the box...",
        AuthStatus::Authorized => "Authorized. A session can be created.",
        AuthStatus::SessionCreated => "Session active.",
    }
}

// ============================================================================
// Auth Machine
// ============================================================================

/// Drives the authentication lifecycle against a box.
pub struct AuthMachine {
    store: CredentialStore,
    api: Arc<dyn BoxApi>,
    app: AppIdentity,
    approval_timeout: Duration,
    lock: Mutex<()>,
}

impl AuthMachine {
    /// Creates a machine with the default app identity and approval window.
    pub fn new(store: CredentialStore, api: Arc<dyn BoxApi>) -> Self {
        Self {
            store,
            api,
            app: AppIdentity::default(),
            approval_timeout: DEFAULT_APPROVAL_TIMEOUT,
            lock: Mutex::new(()),
        }
    }

    /// Sets the identity announced to the box.
    #[must_use]
    pub fn with_app(mut self, app: AppIdentity) -> Self {
        self.app = app;
        self
    }

    /// Sets the approval window.
    #[must_use]
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    /// Returns the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the box client.
    pub fn api(&self) -> Arc<dyn BoxApi> {
        Arc::clone(&self.api)
    }

    /// Returns the app identity.
    pub fn app(&self) -> &AppIdentity {
        &self.app
    }

    fn approval_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.approval_timeout).unwrap_or_else(|_| chrono::Duration::days(1))
    }

    /// Loads the record and points the client at its API origin.
    async fn load(&self) -> CredentialRecord {
        let record = self.store.load().await;
        if self.api.base_url() != record.api_base_url {
            if let Err(e) = self.api.set_base_url(&record.api_base_url) {
                warn!(base_url = %record.api_base_url, error = %e, "Stored API URL is invalid, keeping current");
            }
        }
        record
    }

    async fn persist(&self, record: &CredentialRecord) -> Result<(), AuthError> {
        if self.store.save(record).await {
            Ok(())
        } else {
            Err(AuthError::Persistence(self.store.path().display().to_string()))
        }
    }

    fn apply_session(record: &mut CredentialRecord, grant: &SessionGrant) {
        record.auth_status = AuthStatus::SessionCreated;
        record.session_token = Some(grant.session_token.clone());
    }

    /// Returns a snapshot of the credential record.
    pub async fn credentials(&self) -> CredentialRecord {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    // ========================================================================
    // Handshake
    // ========================================================================

    /// Requests a new app token and enters `waiting_approval`.
    ///
    /// Always asks the box for a fresh authorization, even if an app token
    /// from a previous pairing is still stored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthorizationRequestFailed`] if the box could not
    /// be asked; the record is reset to `not_started`.
    #[instrument(skip(self))]
    pub async fn start_authentication(&self) -> Result<u64, AuthError> {
        let _guard = self.lock.lock().await;
        let mut record = self.load().await;

        info!(app_id = %self.app.app_id, "Requesting authorization from the box");
        match self.api.request_authorization(&self.app).await {
            Ok(grant) => {
                record.auth_status = AuthStatus::WaitingApproval;
                record.track_id = Some(grant.track_id);
                record.app_token = Some(grant.app_token);
                record.session_token = None;
                record.challenge = None;
                record.last_auth_attempt = Some(Utc::now());
                self.persist(&record).await?;

                info!(track_id = grant.track_id, "Waiting for approval on the box");
                Ok(grant.track_id)
            }
            Err(e) => {
                warn!(error = %e, "Authorization request failed");
                record.auth_status = AuthStatus::NotStarted;
                self.store.save(&record).await;
                Err(AuthError::AuthorizationRequestFailed(e))
            }
        }
    }

    /// Advances a pending authorization.
    ///
    /// Outside `waiting_approval` this returns the stored status without
    /// contacting the box. A grant is followed by an automatic attempt to
    /// open a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Box`] if the box could not be reached; the
    /// record is left unchanged.
    #[instrument(skip(self))]
    pub async fn poll_status(&self) -> Result<PollOutcome, AuthError> {
        let _guard = self.lock.lock().await;
        let mut record = self.load().await;

        if record.auth_status != AuthStatus::WaitingApproval {
            return Ok(PollOutcome::new(
                record.auth_status,
                describe_status(record.auth_status),
            ));
        }

        if record.approval_expired(Utc::now(), self.approval_window()) {
            info!("Approval window elapsed");
            record.auth_status = AuthStatus::NotStarted;
            self.store.save(&record).await;
            return Ok(PollOutcome {
                expired: true,
                ..PollOutcome::new(
                    AuthStatus::NotStarted,
                    "Approval window expired. Please try again.",
                )
            });
        }

        let (Some(track_id), Some(app_token)) = (record.track_id, record.app_token.clone()) else {
            warn!("Pending authorization has no track id or app token");
            record.auth_status = AuthStatus::NotStarted;
            self.store.save(&record).await;
            return Ok(PollOutcome::new(
                AuthStatus::NotStarted,
                "Authorization data is missing. Please start again.",
            ));
        };

        let approval = match self.api.auth_status(track_id).await {
            Ok(approval) => approval,
            Err(BoxError::Rejected { message, .. }) => {
                debug!(%message, "Box declined the status request");
                return Ok(PollOutcome::new(AuthStatus::WaitingApproval, message));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(approval = %approval, "Approval status");

        if approval.is_terminal_failure() {
            info!(approval = %approval, "Authorization refused");
            record.auth_status = AuthStatus::NotStarted;
            self.store.save(&record).await;
            let message = if approval == ApprovalStatus::Denied {
                "Authorization was denied on the box."
            } else {
                "The box stopped waiting for approval. Please try again."
            };
            return Ok(PollOutcome::new(AuthStatus::NotStarted, message).with_approval(approval));
        }
        if approval != ApprovalStatus::Granted {
            return Ok(PollOutcome::new(
                AuthStatus::WaitingApproval,
                describe_status(AuthStatus::WaitingApproval),
            )
            .with_approval(approval));
        }

        let challenge = self.api.challenge().await?;
        record.auth_status = AuthStatus::Authorized;
        record.challenge = Some(challenge.clone());
        self.store.save(&record).await;
        info!("Authorization granted");

        match self
            .api
            .create_session(&self.app.app_id, &app_token, &challenge)
            .await
        {
            Ok(grant) => {
                Self::apply_session(&mut record, &grant);
                record.last_auth_attempt = Some(Utc::now());
                self.store.save(&record).await;
                info!("Session created");
                Ok(PollOutcome::new(AuthStatus::SessionCreated, "Session created.").with_approval(approval))
            }
            Err(e) => {
                warn!(error = %e, "Automatic session creation failed");
                Ok(PollOutcome::new(
                    AuthStatus::Authorized,
                    format!("Authorization granted, but automatic session creation failed: {e}"),
                )
                .with_approval(approval))
            }
        }
    }

    /// Polls until the authorization leaves `waiting_approval`.
    ///
    /// Transport failures are retried until the approval window closes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthorizationTimeout`] once the window elapses.
    pub async fn wait_for_approval(&self, interval: Duration) -> Result<PollOutcome, AuthError> {
        loop {
            match self.poll_status().await {
                Ok(outcome) if outcome.expired => return Err(AuthError::AuthorizationTimeout),
                Ok(outcome) if outcome.status != AuthStatus::WaitingApproval => return Ok(outcome),
                Ok(outcome) => debug!(message = %outcome.message, "Still waiting for approval"),
                Err(e) if e.is_transient() => warn!(error = %e, "Status poll failed, retrying"),
                Err(e) => return Err(e),
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Opens a session from `authorized`, using a freshly fetched challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidState`] outside `authorized`, or the box
    /// error; a failed attempt stays `authorized` so it can be retried.
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionGrant, AuthError> {
        let _guard = self.lock.lock().await;
        let mut record = self.load().await;

        let invalid = AuthError::InvalidState {
            action: "create a session",
            status: record.auth_status,
        };
        if record.auth_status != AuthStatus::Authorized {
            return Err(invalid);
        }
        let Some(app_token) = record.app_token.clone() else {
            return Err(invalid);
        };

        // The stored challenge may already have been consumed.
        let challenge = self.api.challenge().await?;
        record.challenge = Some(challenge.clone());
        self.store.save(&record).await;

        let grant = self
            .api
            .create_session(&self.app.app_id, &app_token, &challenge)
            .await?;
        Self::apply_session(&mut record, &grant);
        record.last_auth_attempt = Some(Utc::now());
        self.persist(&record).await?;

        info!("Session created");
        Ok(grant)
    }

    /// Clears the session and returns to `not_started`.
    ///
    /// The app token and track id are left in the record.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Persistence`] if the record cannot be written.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;
        let mut record = self.load().await;

        record.session_token = None;
        record.challenge = None;
        record.auth_status = AuthStatus::NotStarted;
        self.persist(&record).await?;

        info!("Logged out");
        Ok(())
    }

    /// Stores a new API origin and repoints the client.
    ///
    /// Returns the normalized URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Box`] for an invalid URL, or
    /// [`AuthError::Persistence`].
    #[instrument(skip(self))]
    pub async fn set_api_base_url(&self, url: &str) -> Result<String, AuthError> {
        let parsed = parse_base_url(url)?.to_string();

        let _guard = self.lock.lock().await;
        let mut record = self.load().await;
        record.api_base_url.clone_from(&parsed);
        self.persist(&record).await?;
        self.api.set_base_url(&parsed)?;

        info!(base_url = %parsed, "API URL updated");
        Ok(parsed)
    }

    // ========================================================================
    // Authenticated Calls
    // ========================================================================

    /// Returns the current session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionUnavailable`] outside `session_created`.
    pub async fn ensure_session(&self) -> Result<String, AuthError> {
        let _guard = self.lock.lock().await;
        let record = self.load().await;
        match (record.auth_status, record.session_token) {
            (AuthStatus::SessionCreated, Some(token)) => Ok(token),
            (status, _) => Err(AuthError::SessionUnavailable(format!(
                "no active session (status: {status})"
            ))),
        }
    }

    /// Runs an authenticated call.
    ///
    /// If the box reports the session expired, the session is refreshed once
    /// and the call retried once with the new token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionUnavailable`] if there is no session, the
    /// refresh is refused, or the retried call is still rejected.
    pub async fn with_session<T, F, Fut>(&self, call: F) -> Result<T, AuthError>
    where
        F: Fn(Arc<dyn BoxApi>, String) -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let token = self.ensure_session().await?;

        match call(self.api(), token.clone()).await {
            Err(BoxError::SessionExpired) => debug!("Session expired, refreshing"),
            other => return other.map_err(AuthError::from),
        }

        let fresh = self.refresh_after_expiry(&token).await?;

        match call(self.api(), fresh).await {
            Err(BoxError::SessionExpired) => {
                warn!("Box rejected the refreshed session");
                Err(AuthError::SessionUnavailable(
                    "the box rejected the refreshed session".to_string(),
                ))
            }
            other => other.map_err(AuthError::from),
        }
    }

    /// Replaces an expired session token, unless another caller already did.
    async fn refresh_after_expiry(&self, expired: &str) -> Result<String, AuthError> {
        let _guard = self.lock.lock().await;
        let mut record = self.load().await;

        if record.auth_status != AuthStatus::SessionCreated {
            return Err(AuthError::SessionUnavailable(format!(
                "no active session (status: {})",
                record.auth_status
            )));
        }
        if let Some(current) = record.session_token.as_deref().filter(|t| *t != expired) {
            debug!("Session already refreshed");
            return Ok(current.to_string());
        }
        let Some(app_token) = record.app_token.clone() else {
            return Err(AuthError::SessionUnavailable(
                "no app token to refresh the session with".to_string(),
            ));
        };

        match self.api.refresh_session(&self.app.app_id, &app_token).await {
            Ok(grant) => {
                Self::apply_session(&mut record, &grant);
                self.store.save(&record).await;
                info!("Session refreshed");
                Ok(grant.session_token)
            }
            Err(e) if e.is_transient() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                Err(AuthError::SessionUnavailable(format!(
                    "session refresh failed: {e}"
                )))
            }
        }
    }
}

impl std::fmt::Debug for AuthMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMachine")
            .field("store", &self.store)
            .field("app", &self.app)
            .field("approval_timeout", &self.approval_timeout)
            .finish_non_exhaustive()
    }
}
