//! Machinery QA: machine inspection recording and reporting
//!
//! Operators log in, pick a machine and shift, enter one value per
//! specification parameter and get an immediate traffic-light evaluation.
//! Saved inspections produce a PDF report with optional assistant
//! suggestions.
//!
//! ## Architecture
//!
//! - **types**: machines, parameters, measurements, inspections
//! - **evaluator**: InSpec / NearBoundary / OutOfSpec classification
//! - **storage**: SQLite persistence via sqlx
//! - **auth**: bcrypt credential store
//! - **session**: per-client state machine and session table
//! - **llm**: suggestion and chat assistant (OpenAI-compatible HTTP)
//! - **report**: PDF inspection reports
//! - **service**: the inspection workflow
//! - **api**: axum JSON API

pub mod api;
pub mod auth;
pub mod config;
pub mod evaluator;
pub mod llm;
pub mod report;
pub mod service;
pub mod session;
pub mod storage;
pub mod types;

pub use config::QaConfig;
pub use evaluator::{classify, evaluate, Classification, Evaluation, EvaluationError};
pub use service::{InspectionService, ServiceError, SubmittedInspection};
pub use storage::{Database, StorageError};
pub use types::{Inspection, InspectionStatus, Machine, Measurement, Parameter, Shift};
