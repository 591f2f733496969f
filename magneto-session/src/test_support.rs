//! Scripted in-memory box for tests.
//!
//! Each call pops the next scripted response from its queue, falling back to
//! a sensible default when the queue is empty, and counts invocations.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use magneto_core::{AppIdentity, ApprovalStatus, Channel, Program, Recording};
use magneto_fetch::{AuthorizationGrant, BoxApi, BoxError, SessionGrant, parse_base_url};

#[derive(Debug, Default)]
pub struct Counters {
    pub authorize: AtomicUsize,
    pub status: AtomicUsize,
    pub challenge: AtomicUsize,
    pub session: AtomicUsize,
    pub refresh: AtomicUsize,
    pub channels: AtomicUsize,
    pub recordings: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct ScriptedBox {
    pub calls: Counters,
    base: Mutex<String>,
    authorize: Mutex<VecDeque<Result<AuthorizationGrant, BoxError>>>,
    approvals: Mutex<VecDeque<Result<ApprovalStatus, BoxError>>>,
    challenges: Mutex<VecDeque<Result<String, BoxError>>>,
    sessions: Mutex<VecDeque<Result<SessionGrant, BoxError>>>,
    channels: Mutex<VecDeque<Result<Vec<Channel>, BoxError>>>,
    recordings: Mutex<VecDeque<Result<Vec<Recording>, BoxError>>>,
    /// Tokens presented on authenticated calls, in order.
    pub seen_tokens: Mutex<Vec<String>>,
    /// Channel returned by `channel()`.
    pub channel: Mutex<Option<Channel>>,
    /// Program returned by `current_program()`.
    pub program: Mutex<Option<Program>>,
}

fn next<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue.lock().unwrap().pop_front()
}

fn bump(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

impl ScriptedBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn script_authorize(&self, response: Result<AuthorizationGrant, BoxError>) {
        self.authorize.lock().unwrap().push_back(response);
    }

    pub fn script_approval(&self, response: Result<ApprovalStatus, BoxError>) {
        self.approvals.lock().unwrap().push_back(response);
    }

    pub fn script_challenge(&self, response: Result<String, BoxError>) {
        self.challenges.lock().unwrap().push_back(response);
    }

    pub fn script_session(&self, response: Result<SessionGrant, BoxError>) {
        self.sessions.lock().unwrap().push_back(response);
    }

    pub fn script_channels(&self, response: Result<Vec<Channel>, BoxError>) {
        self.channels.lock().unwrap().push_back(response);
    }

    pub fn script_recordings(&self, response: Result<Vec<Recording>, BoxError>) {
        self.recordings.lock().unwrap().push_back(response);
    }

    fn see(&self, token: &str) {
        self.seen_tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl BoxApi for ScriptedBox {
    fn base_url(&self) -> String {
        self.base.lock().unwrap().clone()
    }

    fn set_base_url(&self, url: &str) -> Result<(), BoxError> {
        *self.base.lock().unwrap() = parse_base_url(url)?.to_string();
        Ok(())
    }

    async fn request_authorization(
        &self,
        _app: &AppIdentity,
    ) -> Result<AuthorizationGrant, BoxError> {
        let n = bump(&self.calls.authorize);
        next(&self.authorize).unwrap_or_else(|| {
            Ok(AuthorizationGrant {
                track_id: n as u64,
                app_token: format!("app-token-{n}"),
            })
        })
    }

    async fn auth_status(&self, _track_id: u64) -> Result<ApprovalStatus, BoxError> {
        bump(&self.calls.status);
        next(&self.approvals).unwrap_or(Ok(ApprovalStatus::Pending))
    }

    async fn challenge(&self) -> Result<String, BoxError> {
        let n = bump(&self.calls.challenge);
        next(&self.challenges).unwrap_or_else(|| Ok(format!("challenge-{n}")))
    }

    async fn create_session(
        &self,
        _app_id: &str,
        _app_token: &str,
        _challenge: &str,
    ) -> Result<SessionGrant, BoxError> {
        let n = bump(&self.calls.session);
        next(&self.sessions).unwrap_or_else(|| {
            Ok(SessionGrant {
                session_token: format!("session-{n}"),
                ..SessionGrant::default()
            })
        })
    }

    async fn refresh_session(&self, app_id: &str, app_token: &str) -> Result<SessionGrant, BoxError> {
        bump(&self.calls.refresh);
        let challenge = self.challenge().await?;
        self.create_session(app_id, app_token, &challenge).await
    }

    async fn tv_channels(&self, session_token: &str) -> Result<Vec<Channel>, BoxError> {
        bump(&self.calls.channels);
        self.see(session_token);
        next(&self.channels).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn scheduled_recordings(&self, session_token: &str) -> Result<Vec<Recording>, BoxError> {
        bump(&self.calls.recordings);
        self.see(session_token);
        next(&self.recordings).unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn channel(&self, session_token: &str, _channel_id: &str) -> Result<Channel, BoxError> {
        self.see(session_token);
        self.channel.lock().unwrap().clone().ok_or(BoxError::NotFound)
    }

    async fn current_program(
        &self,
        session_token: &str,
        _channel_id: &str,
    ) -> Result<Program, BoxError> {
        self.see(session_token);
        self.program.lock().unwrap().clone().ok_or(BoxError::NotFound)
    }
}
