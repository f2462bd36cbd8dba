pub mod exam;
pub mod job;
pub mod routes;
pub mod session;
pub mod tenant;
pub mod upload;

use anyhow::{Context, Result};

use hakwonplus::config::Config;
use hakwonplus::context::AppContext;
use hakwonplus::storage::open_store;

/// Build the client context over the configured store
pub(crate) fn open_context(config: Config) -> Result<AppContext> {
    let store = open_store(config.storage.path.as_deref()).context("Failed to open local storage")?;
    Ok(AppContext::new(config, store)?)
}
