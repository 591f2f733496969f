//! State machine tests against a scripted box.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use magneto_core::{ApprovalStatus, AuthStatus, CredentialRecord};
use magneto_fetch::{BoxApi, BoxError};
use magneto_store::CredentialStore;
use tempfile::TempDir;

use crate::error::AuthError;
use crate::machine::AuthMachine;
use crate::test_support::ScriptedBox;

fn setup() -> (TempDir, Arc<ScriptedBox>, AuthMachine) {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedBox::new());
    let store = CredentialStore::new(dir.path().join("freebox.json"));
    let machine = AuthMachine::new(store, api.clone());
    (dir, api, machine)
}

fn count(counter: &AtomicUsize) -> usize {
    ScriptedBox::count(counter)
}

fn rejected(message: &str) -> BoxError {
    BoxError::Rejected {
        message: message.to_string(),
        error_code: None,
    }
}

/// Writes a record that already holds a live session.
async fn with_live_session(machine: &AuthMachine, token: &str) {
    let mut record = CredentialRecord::default();
    record.app_token = Some("app-token".to_string());
    record.challenge = Some("old-challenge".to_string());
    record.session_token = Some(token.to_string());
    record.auth_status = AuthStatus::SessionCreated;
    assert!(machine.store().save(&record).await);
}

async fn channels_call(machine: &AuthMachine) -> Result<usize, AuthError> {
    machine
        .with_session(|api: Arc<dyn BoxApi>, token| async move {
            api.tv_channels(&token).await.map(|c| c.len())
        })
        .await
}

// ============================================================================
// Start & Poll
// ============================================================================

#[tokio::test]
async fn test_granted_reaches_session_created_in_one_poll() {
    let (_dir, api, machine) = setup();

    let track_id = machine.start_authentication().await.unwrap();
    assert_eq!(track_id, 1);
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::WaitingApproval
    );

    api.script_approval(Ok(ApprovalStatus::Granted));
    let outcome = machine.poll_status().await.unwrap();

    assert_eq!(outcome.status, AuthStatus::SessionCreated);
    assert_eq!(outcome.approval, Some(ApprovalStatus::Granted));
    assert_eq!(count(&api.calls.status), 1);

    let record = machine.credentials().await;
    assert_eq!(record.auth_status, AuthStatus::SessionCreated);
    assert_eq!(record.session_token.as_deref(), Some("session-1"));
    assert_eq!(record.app_token.as_deref(), Some("app-token-1"));
    assert_eq!(record.challenge.as_deref(), Some("challenge-1"));
    assert!(record.validate().is_ok());
}

#[tokio::test]
async fn test_start_clears_previous_session() {
    let (_dir, _api, machine) = setup();
    with_live_session(&machine, "old-session").await;

    machine.start_authentication().await.unwrap();

    let record = machine.credentials().await;
    assert_eq!(record.auth_status, AuthStatus::WaitingApproval);
    assert!(record.session_token.is_none());
    assert!(record.challenge.is_none());
    assert!(record.last_auth_attempt.is_some());
    assert_eq!(record.app_token.as_deref(), Some("app-token-1"));
}

#[tokio::test]
async fn test_start_failure_resets_to_not_started() {
    let (_dir, api, machine) = setup();
    api.script_authorize(Err(BoxError::Transport("connection refused".to_string())));

    let err = machine.start_authentication().await.unwrap_err();
    assert!(matches!(err, AuthError::AuthorizationRequestFailed(_)));
    assert!(err.is_transient());
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::NotStarted
    );
}

#[tokio::test]
async fn test_stale_wait_resets_without_contacting_box() {
    let (_dir, api, machine) = setup();

    let mut record = CredentialRecord::default();
    record.auth_status = AuthStatus::WaitingApproval;
    record.track_id = Some(4);
    record.app_token = Some("app-token".to_string());
    record.last_auth_attempt = Some(Utc::now() - chrono::Duration::seconds(60));
    machine.store().save(&record).await;

    api.script_approval(Ok(ApprovalStatus::Granted));
    let outcome = machine.poll_status().await.unwrap();

    assert_eq!(outcome.status, AuthStatus::NotStarted);
    assert!(outcome.expired);
    assert_eq!(count(&api.calls.status), 0);
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::NotStarted
    );
}

#[tokio::test]
async fn test_wait_without_timestamp_is_stale() {
    let (_dir, api, machine) = setup();

    let mut record = CredentialRecord::default();
    record.auth_status = AuthStatus::WaitingApproval;
    record.track_id = Some(4);
    record.app_token = Some("app-token".to_string());
    machine.store().save(&record).await;

    let outcome = machine.poll_status().await.unwrap();
    assert_eq!(outcome.status, AuthStatus::NotStarted);
    assert_eq!(count(&api.calls.status), 0);
}

#[tokio::test]
async fn test_denied_resets_to_not_started() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Ok(ApprovalStatus::Denied));
    let outcome = machine.poll_status().await.unwrap();

    assert_eq!(outcome.status, AuthStatus::NotStarted);
    assert_eq!(outcome.approval, Some(ApprovalStatus::Denied));
    assert!(!outcome.expired);
    assert_eq!(count(&api.calls.challenge), 0);
}

#[tokio::test]
async fn test_pending_and_unknown_keep_waiting() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Ok(ApprovalStatus::Pending));
    api.script_approval(Ok(ApprovalStatus::Unknown));

    for expected in [ApprovalStatus::Pending, ApprovalStatus::Unknown] {
        let outcome = machine.poll_status().await.unwrap();
        assert_eq!(outcome.status, AuthStatus::WaitingApproval);
        assert_eq!(outcome.approval, Some(expected));
    }
}

#[tokio::test]
async fn test_box_rejection_keeps_waiting() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Err(rejected("Unknown track id")));
    let outcome = machine.poll_status().await.unwrap();

    assert_eq!(outcome.status, AuthStatus::WaitingApproval);
    assert_eq!(outcome.message, "Unknown track id");
    assert!(outcome.approval.is_none());
}

#[tokio::test]
async fn test_transport_error_on_poll_leaves_state() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Err(BoxError::Transport("timed out".to_string())));
    let err = machine.poll_status().await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::WaitingApproval
    );
}

#[tokio::test]
async fn test_poll_outside_waiting_does_not_contact_box() {
    let (_dir, api, machine) = setup();

    let outcome = machine.poll_status().await.unwrap();
    assert_eq!(outcome.status, AuthStatus::NotStarted);

    with_live_session(&machine, "s").await;
    let outcome = machine.poll_status().await.unwrap();
    assert_eq!(outcome.status, AuthStatus::SessionCreated);

    assert_eq!(count(&api.calls.status), 0);
}

// ============================================================================
// Session Creation
// ============================================================================

#[tokio::test]
async fn test_auto_session_failure_stays_authorized() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Ok(ApprovalStatus::Granted));
    api.script_session(Err(rejected("Invalid password")));
    let outcome = machine.poll_status().await.unwrap();

    assert_eq!(outcome.status, AuthStatus::Authorized);
    assert!(outcome.message.contains("Invalid password"));

    let record = machine.credentials().await;
    assert_eq!(record.auth_status, AuthStatus::Authorized);
    assert_eq!(record.challenge.as_deref(), Some("challenge-1"));
    assert!(record.validate().is_ok());
}

#[tokio::test]
async fn test_manual_session_uses_fresh_challenge() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();
    api.script_approval(Ok(ApprovalStatus::Granted));
    api.script_session(Err(rejected("Invalid password")));
    machine.poll_status().await.unwrap();

    let grant = machine.create_session().await.unwrap();

    assert_eq!(grant.session_token, "session-2");
    assert_eq!(count(&api.calls.challenge), 2);
    let record = machine.credentials().await;
    assert_eq!(record.auth_status, AuthStatus::SessionCreated);
    assert_eq!(record.challenge.as_deref(), Some("challenge-2"));
}

#[tokio::test]
async fn test_manual_session_failure_stays_authorized() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();
    api.script_approval(Ok(ApprovalStatus::Granted));
    api.script_session(Err(rejected("Invalid password")));
    machine.poll_status().await.unwrap();

    api.script_session(Err(rejected("Invalid password")));
    let err = machine.create_session().await.unwrap_err();

    assert!(matches!(err, AuthError::Box(BoxError::Rejected { .. })));
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::Authorized
    );
}

#[tokio::test]
async fn test_manual_session_requires_authorized() {
    let (_dir, api, machine) = setup();

    let err = machine.create_session().await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::InvalidState {
            status: AuthStatus::NotStarted,
            ..
        }
    ));
    assert_eq!(count(&api.calls.challenge), 0);
}

// ============================================================================
// Authenticated Calls
// ============================================================================

#[tokio::test]
async fn test_ensure_session_requires_session() {
    let (_dir, _api, machine) = setup();
    assert!(matches!(
        machine.ensure_session().await,
        Err(AuthError::SessionUnavailable(_))
    ));

    with_live_session(&machine, "live").await;
    assert_eq!(machine.ensure_session().await.unwrap(), "live");
}

#[tokio::test]
async fn test_expired_session_refreshes_exactly_once() {
    let (_dir, api, machine) = setup();
    with_live_session(&machine, "expired").await;

    api.script_channels(Err(BoxError::SessionExpired));
    api.script_channels(Ok(vec![magneto_core::Channel::new("a", "A")]));

    assert_eq!(channels_call(&machine).await.unwrap(), 1);
    assert_eq!(count(&api.calls.refresh), 1);
    assert_eq!(count(&api.calls.channels), 2);
    assert_eq!(
        *api.seen_tokens.lock().unwrap(),
        vec!["expired".to_string(), "session-1".to_string()]
    );

    let record = machine.credentials().await;
    assert_eq!(record.session_token.as_deref(), Some("session-1"));
    assert_eq!(record.auth_status, AuthStatus::SessionCreated);
}

#[tokio::test]
async fn test_second_expiry_is_session_unavailable() {
    let (_dir, api, machine) = setup();
    with_live_session(&machine, "expired").await;

    api.script_channels(Err(BoxError::SessionExpired));
    api.script_channels(Err(BoxError::SessionExpired));

    let err = channels_call(&machine).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionUnavailable(_)));
    assert_eq!(count(&api.calls.refresh), 1);
    assert_eq!(count(&api.calls.channels), 2);
}

#[tokio::test]
async fn test_refresh_failure_leaves_state_unchanged() {
    let (_dir, api, machine) = setup();
    with_live_session(&machine, "expired").await;
    let before = machine.credentials().await;

    api.script_channels(Err(BoxError::SessionExpired));
    api.script_session(Err(rejected("Invalid password")));

    let err = channels_call(&machine).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionUnavailable(_)));
    assert_eq!(count(&api.calls.channels), 1);
    assert_eq!(machine.credentials().await, before);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let (_dir, api, machine) = setup();
    with_live_session(&machine, "live").await;

    api.script_channels(Err(BoxError::NotFound));

    let err = channels_call(&machine).await.unwrap_err();
    assert!(matches!(err, AuthError::Box(BoxError::NotFound)));
    assert_eq!(count(&api.calls.refresh), 0);
    assert_eq!(count(&api.calls.channels), 1);
}

#[tokio::test]
async fn test_refresh_skipped_when_token_already_replaced() {
    let (_dir, api, machine) = setup();
    with_live_session(&machine, "expired").await;

    let store = machine.store().clone();
    let attempts = Arc::new(AtomicUsize::new(0));

    let token = machine
        .with_session(|_api, token| {
            let store = store.clone();
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    // Another caller refreshes while this call is in flight.
                    let mut record = store.load().await;
                    record.session_token = Some("replaced".to_string());
                    store.save(&record).await;
                    Err(BoxError::SessionExpired)
                } else {
                    Ok(token)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(token, "replaced");
    assert_eq!(count(&api.calls.refresh), 0);
}

// ============================================================================
// Logout, URL & Waiting
// ============================================================================

#[tokio::test]
async fn test_logout_retains_app_token() {
    let (_dir, _api, machine) = setup();
    machine.start_authentication().await.unwrap();
    let mut record = machine.credentials().await;
    record.session_token = Some("live".to_string());
    record.challenge = Some("c".to_string());
    record.auth_status = AuthStatus::SessionCreated;
    machine.store().save(&record).await;

    machine.logout().await.unwrap();

    let record = machine.credentials().await;
    assert_eq!(record.auth_status, AuthStatus::NotStarted);
    assert!(record.session_token.is_none());
    assert!(record.challenge.is_none());
    assert_eq!(record.app_token.as_deref(), Some("app-token-1"));
    assert_eq!(record.track_id, Some(1));
}

#[tokio::test]
async fn test_restart_after_logout_requests_fresh_token() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();
    machine.logout().await.unwrap();

    machine.start_authentication().await.unwrap();

    assert_eq!(count(&api.calls.authorize), 2);
    assert_eq!(
        machine.credentials().await.app_token.as_deref(),
        Some("app-token-2")
    );
}

#[tokio::test]
async fn test_set_api_base_url() {
    let (_dir, api, machine) = setup();

    let url = machine
        .set_api_base_url("http://10.0.0.1/api/v4")
        .await
        .unwrap();

    assert_eq!(url, "http://10.0.0.1/api/v4/");
    assert_eq!(machine.credentials().await.api_base_url, url);
    assert_eq!(api.base_url(), url);

    assert!(machine.set_api_base_url("not a url").await.is_err());
    assert_eq!(machine.credentials().await.api_base_url, url);
}

#[tokio::test]
async fn test_stored_url_is_applied_to_client() {
    let (_dir, api, machine) = setup();
    let mut record = CredentialRecord::new("http://192.168.1.254/api/v4/");
    record.app_token = Some("t".to_string());
    machine.store().save(&record).await;

    machine.credentials().await;
    assert_eq!(api.base_url(), "http://192.168.1.254/api/v4/");
}

#[tokio::test]
async fn test_wait_for_approval_until_granted() {
    let (_dir, api, machine) = setup();
    machine.start_authentication().await.unwrap();

    api.script_approval(Ok(ApprovalStatus::Pending));
    api.script_approval(Err(BoxError::Transport("blip".to_string())));
    api.script_approval(Ok(ApprovalStatus::Granted));

    let outcome = machine
        .wait_for_approval(Duration::from_millis(10))
        .await
        .unwrap();

    assert_eq!(outcome.status, AuthStatus::SessionCreated);
    assert_eq!(count(&api.calls.status), 3);
}

#[tokio::test]
async fn test_wait_for_approval_times_out() {
    let dir = TempDir::new().unwrap();
    let api = Arc::new(ScriptedBox::new());
    let machine = AuthMachine::new(
        CredentialStore::new(dir.path().join("freebox.json")),
        api.clone(),
    )
    .with_approval_timeout(Duration::from_millis(50));

    machine.start_authentication().await.unwrap();
    let err = machine
        .wait_for_approval(Duration::from_millis(20))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AuthorizationTimeout));
    assert_eq!(
        machine.credentials().await.auth_status,
        AuthStatus::NotStarted
    );
}
