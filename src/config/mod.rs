//! QA Configuration Module
//!
//! Service configuration loaded from TOML, with environment overrides.
//!
//! ## Loading Order
//!
//! 1. `--config <PATH>` on the command line
//! 2. `QA_CONFIG` environment variable (path to TOML file)
//! 3. `qa_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! After loading, `QA_SERVER_ADDR`, `DATABASE_URL` and `GROQ_API_KEY`
//! override the corresponding file values.
//!
//! The loaded config is passed explicitly to whatever needs it; there is no
//! global instance.

mod qa_config;
pub mod defaults;
pub mod validation;

pub use qa_config::*;
