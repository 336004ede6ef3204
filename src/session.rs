//! Per-client session state
//!
//! A session walks a small state machine:
//!
//! ```text
//! LoggedOut   --begin_registration-->  Registering
//! Registering --cancel_registration--> LoggedOut
//! Registering --register-->            LoggedIn
//! LoggedOut   --login-->               LoggedIn
//! LoggedIn    --logout-->              LoggedOut
//! ```
//!
//! Alongside the state it carries the pending (evaluated but unsaved) form
//! and the chat transcript. Both are cleared on logout. The transcript keeps
//! only the most recent [`MAX_CHAT_ENTRIES`] entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::defaults::{MAX_CHAT_ENTRIES, MAX_SESSIONS, SESSION_IDLE_TIMEOUT_SECS};
use crate::config::ServerConfig;
use crate::evaluator::Evaluation;
use crate::types::Shift;

pub const USER_SPEAKER: &str = "You";
pub const BOT_SPEAKER: &str = "QA Bot";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum SessionState {
    LoggedOut,
    Registering,
    LoggedIn { user_id: i64, username: String },
}

impl SessionState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoggedOut => "LoggedOut",
            Self::Registering => "Registering",
            Self::LoggedIn { .. } => "LoggedIn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error("not logged in")]
    NotLoggedIn,
    #[error("unknown session")]
    UnknownSession,
}

/// An evaluated form waiting to be saved.
#[derive(Debug, Clone)]
pub struct PendingForm {
    pub evaluation: Evaluation,
    pub shift: Shift,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug)]
pub struct SessionContext {
    state: SessionState,
    pending: Option<PendingForm>,
    chat_history: Vec<ChatEntry>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub const fn new() -> Self {
        Self {
            state: SessionState::LoggedOut,
            pending: None,
            chat_history: Vec::new(),
        }
    }

    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }

    pub fn begin_registration(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::LoggedOut => {
                self.state = SessionState::Registering;
                Ok(())
            }
            _ => Err(self.reject("begin registration")),
        }
    }

    pub fn cancel_registration(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Registering => {
                self.state = SessionState::LoggedOut;
                Ok(())
            }
            _ => Err(self.reject("cancel registration")),
        }
    }

    /// Check that a login may be attempted before paying for verification.
    pub fn ensure_can_login(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::LoggedOut => Ok(()),
            _ => Err(self.reject("log in")),
        }
    }

    pub fn ensure_can_register(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Registering => Ok(()),
            _ => Err(self.reject("register")),
        }
    }

    pub fn login(&mut self, user_id: i64, username: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_can_login()?;
        self.state = SessionState::LoggedIn {
            user_id,
            username: username.into(),
        };
        Ok(())
    }

    /// A successful registration logs the new user straight in.
    pub fn register(&mut self, user_id: i64, username: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_can_register()?;
        self.state = SessionState::LoggedIn {
            user_id,
            username: username.into(),
        };
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::LoggedIn { .. } => {
                self.state = SessionState::LoggedOut;
                self.pending = None;
                self.chat_history.clear();
                Ok(())
            }
            _ => Err(self.reject("log out")),
        }
    }

    pub fn user_id(&self) -> Result<i64, SessionError> {
        match self.state {
            SessionState::LoggedIn { user_id, .. } => Ok(user_id),
            _ => Err(SessionError::NotLoggedIn),
        }
    }

    pub fn set_pending(&mut self, form: PendingForm) {
        self.pending = Some(form);
    }

    pub const fn pending(&self) -> Option<&PendingForm> {
        self.pending.as_ref()
    }

    pub fn take_pending(&mut self) -> Option<PendingForm> {
        self.pending.take()
    }

    pub fn push_chat(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.chat_history.push(ChatEntry {
            speaker: USER_SPEAKER.to_string(),
            text: user_text.into(),
        });
        self.chat_history.push(ChatEntry {
            speaker: BOT_SPEAKER.to_string(),
            text: reply.into(),
        });
        if self.chat_history.len() > MAX_CHAT_ENTRIES {
            let excess = self.chat_history.len() - MAX_CHAT_ENTRIES;
            self.chat_history.drain(..excess);
        }
    }

    pub fn chat_history(&self) -> &[ChatEntry] {
        &self.chat_history
    }
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

#[derive(Debug)]
struct SessionEntry {
    session: SharedSession,
    last_used: Instant,
}

/// Token → session table.
///
/// A token stops resolving once it has been idle for `idle_timeout`. Expired
/// entries are swept on `create`, and when the table is full the least
/// recently used session is evicted.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(Duration::from_secs(SESSION_IDLE_TIMEOUT_SECS), MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_limits(
            Duration::from_secs(config.session_idle_timeout_secs),
            config.max_sessions,
        )
    }

    /// Start a fresh logged-out session and return its token.
    pub async fn create(&self) -> (String, SharedSession) {
        let token = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(SessionContext::new()));
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < self.idle_timeout);

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(token, _)| token.clone());
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                }
                None => break,
            }
        }

        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(dropped, "Expired or evicted sessions removed");
        }

        sessions.insert(
            token.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                last_used: now,
            },
        );
        debug!(live = sessions.len(), "Session created");
        (token, session)
    }

    /// Resolve a token and mark it as used.
    pub async fn get(&self, token: &str) -> Result<SharedSession, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(token) {
            Some(entry) => now.duration_since(entry.last_used) >= self.idle_timeout,
            None => return Err(SessionError::UnknownSession),
        };
        if expired {
            sessions.remove(token);
            return Err(SessionError::UnknownSession);
        }

        let entry = sessions.get_mut(token).ok_or(SessionError::UnknownSession)?;
        entry.last_used = now;
        Ok(Arc::clone(&entry.session))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::types::{sample_machine_parameters, Machine};

    fn pending() -> PendingForm {
        let machine = Machine {
            id: 1,
            name: "Machine A".to_string(),
            parameters: sample_machine_parameters().unwrap(),
        };
        PendingForm {
            evaluation: evaluate(&machine, &[25.0, 150.0, 1.0]).unwrap(),
            shift: Shift::Morning,
        }
    }

    #[test]
    fn test_registration_flow() {
        let mut ctx = SessionContext::new();
        ctx.begin_registration().unwrap();
        assert_eq!(ctx.state(), &SessionState::Registering);
        ctx.cancel_registration().unwrap();
        assert_eq!(ctx.state(), &SessionState::LoggedOut);

        ctx.begin_registration().unwrap();
        ctx.register(7, "alice").unwrap();
        assert_eq!(ctx.user_id().unwrap(), 7);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut ctx = SessionContext::new();
        assert!(matches!(ctx.logout(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(ctx.cancel_registration(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(ctx.register(1, "x"), Err(SessionError::InvalidTransition { .. })));

        ctx.login(1, "alice").unwrap();
        assert!(matches!(ctx.login(1, "alice"), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(ctx.begin_registration(), Err(SessionError::InvalidTransition { .. })));

        let err = ctx.begin_registration().unwrap_err();
        assert_eq!(err.to_string(), "cannot begin registration while LoggedIn");
    }

    #[test]
    fn test_registering_cannot_login_directly() {
        let mut ctx = SessionContext::new();
        ctx.begin_registration().unwrap();
        assert!(ctx.login(1, "alice").is_err());
        assert_eq!(ctx.state(), &SessionState::Registering);
    }

    #[test]
    fn test_user_required_outside_logged_in() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.user_id(), Err(SessionError::NotLoggedIn));
    }

    #[test]
    fn test_logout_clears_pending_and_chat() {
        let mut ctx = SessionContext::new();
        ctx.login(3, "bob").unwrap();
        ctx.set_pending(pending());
        ctx.push_chat("What is vibration?", "A measure of oscillation.");
        assert_eq!(ctx.chat_history().len(), 2);
        assert_eq!(ctx.chat_history()[0].speaker, "You");
        assert_eq!(ctx.chat_history()[1].speaker, "QA Bot");

        ctx.logout().unwrap();
        assert!(ctx.pending().is_none());
        assert!(ctx.chat_history().is_empty());
        assert_eq!(ctx.state(), &SessionState::LoggedOut);
    }

    #[test]
    fn test_take_pending_consumes() {
        let mut ctx = SessionContext::new();
        ctx.set_pending(pending());
        assert!(ctx.take_pending().is_some());
        assert!(ctx.take_pending().is_none());
    }

    #[tokio::test]
    async fn test_store_lookup() {
        let store = SessionStore::new();
        let (token, session) = store.create().await;
        session.lock().await.login(1, "alice").unwrap();

        let again = store.get(&token).await.unwrap();
        assert_eq!(again.lock().await.user_id().unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("nope").await.unwrap_err(), SessionError::UnknownSession);
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        let store = SessionStore::with_limits(Duration::from_millis(30), 10);
        let (token, _) = store.create().await;
        assert!(store.get(&token).await.is_ok());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get(&token).await.unwrap_err(), SessionError::UnknownSession);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_swept_on_create() {
        let store = SessionStore::with_limits(Duration::from_millis(30), 10);
        for _ in 0..5 {
            store.create().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        store.create().await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_full_store_evicts_least_recently_used() {
        let store = SessionStore::with_limits(Duration::from_secs(3600), 2);
        let (first, _) = store.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (second, _) = store.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.get(&first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (third, _) = store.create().await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(&first).await.is_ok());
        assert!(store.get(&third).await.is_ok());
        assert_eq!(store.get(&second).await.unwrap_err(), SessionError::UnknownSession);
    }

    #[test]
    fn test_chat_transcript_is_capped() {
        let mut ctx = SessionContext::new();
        for i in 0..MAX_CHAT_ENTRIES {
            ctx.push_chat(format!("question {i}"), format!("answer {i}"));
        }
        let history = ctx.chat_history();
        assert_eq!(history.len(), MAX_CHAT_ENTRIES);
        assert_eq!(history[0].speaker, USER_SPEAKER);
        assert_eq!(history[history.len() - 1].text, format!("answer {}", MAX_CHAT_ENTRIES - 1));
        assert_eq!(history[0].text, format!("question {}", MAX_CHAT_ENTRIES / 2));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let v = serde_json::to_value(SessionState::LoggedIn {
            user_id: 2,
            username: "carol".to_string(),
        })
        .unwrap();
        assert_eq!(v["state"], "LoggedIn");
        assert_eq!(v["username"], "carol");
    }
}
