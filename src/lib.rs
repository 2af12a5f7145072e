//! Mentor Gateway - interview-prep assistant with a synced question pool
//! and a live voice mentor
//!
//! This library provides the core functionality for the mentor gateway:
//! - Local-first question pool with remote reconciliation and read-repair
//! - AI-generated expert answers with per-user caching
//! - Speech synthesis and gapless streaming playback
//! - Live bidirectional voice mentor sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      CLI                             │
//! │  signup │ login │ sync │ ask │ add │ delete │ mentor │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Mentor Gateway                        │
//! │  Reconciler │ Local Cache │ Playback │ Live Session  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │           External collaborators                     │
//! │  Identity │ Document Store │ Text Gen │ Speech Gen   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod gen;
pub mod model;
pub mod remote;
pub mod sync;
pub mod voice;

pub use auth::{AuthSession, IdentityClient};
pub use config::Config;
pub use db::{DbConn, DbPool, QuestionCache};
pub use error::{AuthFailure, Error, Result, SyncFailure};
pub use gen::GenAiClient;
pub use model::{Question, UserProfile};
pub use remote::{AnswerRecord, DocumentStoreClient, RemoteStore};
pub use sync::{Reconciler, SyncOutcome, SyncStatus};
