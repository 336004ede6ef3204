//! API route handlers
//!
//! - Health and session bootstrap
//! - Registration, login and logout
//! - Machine catalog, form evaluation and inspection saving
//! - Report download and QA chat

mod auth;
mod chat;
mod health;
mod inspections;
mod machines;

pub use auth::*;
pub use chat::*;
pub use health::*;
pub use inspections::*;
pub use machines::*;

use std::sync::Arc;

use crate::service::InspectionService;
use crate::session::SessionStore;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<InspectionService>,
    pub sessions: Arc<SessionStore>,
}

impl ApiState {
    pub fn new(service: InspectionService) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    pub fn with_sessions(service: InspectionService, sessions: SessionStore) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(sessions),
        }
    }
}
