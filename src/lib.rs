//! hakwonplus - client SDK for the HakwonPlus academy platform
//!
//! A typed client for the multi-tenant academy API: tenant and program
//! resolution, session bootstrap, the feature API modules, a keyed query
//! cache with polling, background job tracking, and pre-signed uploads.
//!
//! # Architecture
//!
//! - [`config`] - Configuration from environment variables or TOML
//! - [`http`] - Shared API client (tenant header, bearer token, response decoding)
//! - [`storage`] - Local key-value store for tokens, device id and preferences
//! - [`tenant`] - Hostname to tenant mapping, program loading, branding
//! - [`auth`] - Current user and token lifecycle
//! - [`api`] - Exams, submissions, sessions, videos, attendance, messages, tenants
//! - [`cache`] / [`query`] - Keyed query cache, hooks and polling watchers
//! - [`jobs`] - Job status polling and the async task tracker
//! - [`upload`] - PUT to pre-signed object storage URLs
//! - [`routes`] - Route tables of the admin, student and dev console apps
//! - [`ui`] - View models for load states, toasts and exam results
//! - [`utils`] - Display formatters
//!
//! # Example
//!
//! ```no_run
//! use hakwonplus::config::Config;
//! use hakwonplus::context::AppContext;
//! use hakwonplus::storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let (ctx, _outcome) = AppContext::init(config, MemoryStore::shared()).await?;
//!     let exams = ctx.client().exams().list(None).await?;
//!     println!("{} exams", exams.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod jobs;
pub mod query;
pub mod routes;
pub mod storage;
pub mod tenant;
pub mod theme;
pub mod ui;
pub mod upload;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::{AuthService, BootstrapOutcome, TenantRole, User};
    pub use crate::cache::{QueryCache, QueryKey};
    pub use crate::config::Config;
    pub use crate::context::AppContext;
    pub use crate::error::{ClientErrorTrait, Error, ErrorCategory, Result};
    pub use crate::http::{ApiClient, ApiError};
    pub use crate::jobs::{JobEndpoint, JobSnapshot, JobStatus};
    pub use crate::query::{QueryClient, QueryState};
    pub use crate::storage::{KeyValueStore, MemoryStore, SharedStore};
    pub use crate::tenant::{Program, ProgramService};
}

pub use context::AppContext;
pub use error::{Error, Result};
