//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Evaluation
// ============================================================================

/// Fraction of a bound's magnitude that counts as "near" the bound.
///
/// `value` in `[min - 0.1*|min|, min)` or `(max, max + 0.1*|max|]` is
/// `NearBoundary`.
pub const NEAR_BOUNDARY_TOLERANCE: f64 = 0.1;

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "127.0.0.1:8501";

/// Maximum accepted request body (bytes).
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Sessions unused for this long are dropped (seconds).
pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 60 * 60;

/// Upper bound on live sessions; the least recently used one is evicted.
pub const MAX_SESSIONS: usize = 10_000;

/// Chat transcript entries kept per session (one exchange is two entries).
pub const MAX_CHAT_ENTRIES: usize = 100;

// ============================================================================
// Database
// ============================================================================

pub const DATABASE_URL: &str = "sqlite://qa_app.sqlite?mode=rwc";

pub const DATABASE_MAX_CONNECTIONS: u32 = 4;

/// Seconds to wait for a pooled connection.
pub const DATABASE_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Name of the machine seeded into an empty catalog.
pub const SAMPLE_MACHINE_NAME: &str = "Machine A";

// ============================================================================
// Auth
// ============================================================================

/// bcrypt work factor. Valid range is 4..=31.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

// ============================================================================
// Report
// ============================================================================

pub const REPORT_OUTPUT_DIR: &str = "./reports";

pub const REPORT_TITLE: &str = "Machinery QA Inspection Report";

pub const NO_SUGGESTIONS_TEXT: &str = "(No suggestions available)";

// ============================================================================
// Assistant
// ============================================================================

pub const ASSISTANT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub const ASSISTANT_MODEL: &str = "llama-3.1-8b-instant";

/// HTTP timeout for a single completion request (seconds).
pub const ASSISTANT_TIMEOUT_SECS: u64 = 30;

pub const SUGGESTION_TEMPERATURE: f32 = 0.3;
pub const SUGGESTION_MAX_TOKENS: u32 = 250;

pub const CHAT_TEMPERATURE: f32 = 0.2;
pub const CHAT_MAX_TOKENS: u32 = 300;

/// Reply the chat assistant is instructed to give for off-topic questions.
pub const CHAT_REFUSAL: &str = "I can only help with MachineryQA-related queries.";
