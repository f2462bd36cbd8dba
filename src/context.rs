//! Application wiring
//!
//! Services are built in a fixed order, Theme → Program → Auth, and handed
//! around by reference. [`AppContext::init`] runs the one-time startup work
//! (program load, session bootstrap) and reports the bootstrap outcome.

use crate::auth::{AuthService, BootstrapOutcome};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::jobs::AsyncStatusStore;
use crate::query::QueryClient;
use crate::storage::SharedStore;
use crate::tenant::{Branding, ProgramService};
use crate::theme::ThemeService;

/// Hostname used when none is configured
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Every long-lived service of one client session
pub struct AppContext {
    config: Config,
    client: ApiClient,
    theme: ThemeService,
    program: ProgramService,
    auth: AuthService,
    queries: QueryClient,
    tasks: AsyncStatusStore,
}

impl AppContext {
    /// Build the services without any network traffic
    pub fn new(config: Config, store: SharedStore) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config(format!("{e:#}")))?;

        let client = ApiClient::new(&config, store.clone())?;
        let hostname = config
            .tenant
            .hostname
            .clone()
            .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

        let theme = ThemeService::load(store);
        let program = ProgramService::new(client.clone(), &hostname);
        let auth = AuthService::new(client.clone());
        let queries = QueryClient::new(client.clone());

        Ok(Self {
            config,
            client,
            theme,
            program,
            auth,
            queries,
            tasks: AsyncStatusStore::new(),
        })
    }

    /// Build the services, load the program, and check the stored session
    ///
    /// A failed program load is logged and leaves neutral branding; it does
    /// not stop the session check.
    pub async fn init(config: Config, store: SharedStore) -> Result<(Self, BootstrapOutcome)> {
        let ctx = Self::new(config, store)?;
        tracing::info!(
            hostname = %ctx.program.hostname(),
            tenant_code = ctx.program.tenant_code(),
            theme = ctx.theme.current().key,
            "Initializing client context"
        );

        if let Err(e) = ctx.program.load().await {
            tracing::warn!(error = %e, "Continuing without program");
        }

        let outcome = ctx.auth.bootstrap().await;
        Ok((ctx, outcome))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn theme(&self) -> &ThemeService {
        &self.theme
    }

    pub fn program(&self) -> &ProgramService {
        &self.program
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn tasks(&self) -> &AsyncStatusStore {
        &self.tasks
    }

    pub fn branding(&self) -> Branding {
        self.program.branding()
    }

    /// Tear down the session: tokens, user, and every cached query
    pub fn sign_out(&self) {
        self.auth.logout();
        self.queries.clear();
        self.tasks.clear_completed();
    }
}
