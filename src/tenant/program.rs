//! Per-tenant program (branding + feature flags)
//!
//! The program is fetched once per session and kept in memory until an
//! explicit [`ProgramService::refetch`] or [`ProgramService::clear`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{normalize_host, site_type, SiteType, TenantId, TenantRegistry};
use crate::error::Result;
use crate::http::ApiClient;

/// Program endpoint
pub const PROGRAM_PATH: &str = "/core/program/";

/// Title shown while nothing better is known
const NEUTRAL_TITLE: &str = "HakwonPlus";

/// Feature flag map
pub type FeatureFlags = BTreeMap<String, bool>;

/// Branding section of a program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub login_title: Option<String>,
    pub login_subtitle: Option<String>,
    pub window_title: Option<String>,
}

/// Per-tenant configuration object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(alias = "tenantCode")]
    pub tenant_code: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub ui_config: UiConfig,
    #[serde(default)]
    pub feature_flags: FeatureFlags,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Program {
    /// Whether a feature flag is switched on; unknown flags are off
    pub fn feature_enabled(&self, flag: &str) -> bool {
        self.feature_flags.get(flag).copied().unwrap_or(false)
    }
}

/// Snapshot of the program as seen by synchronous readers
#[derive(Debug, Clone)]
pub enum ProgramState {
    /// Not loaded yet (or cleared)
    Loading,
    /// Loaded and cached
    Ready(Arc<Program>),
    /// Last load failed
    Failed(String),
}

impl ProgramState {
    /// Cached program, if ready
    pub fn program(&self) -> Option<&Arc<Program>> {
        match self {
            Self::Ready(program) => Some(program),
            _ => None,
        }
    }
}

/// Loads the program once and serves it from memory afterwards
pub struct ProgramService {
    client: ApiClient,
    hostname: String,
    state: RwLock<ProgramState>,
    load_lock: tokio::sync::Mutex<()>,
}

impl ProgramService {
    /// Create an unloaded service for the given browsing hostname
    pub fn new(client: ApiClient, hostname: &str) -> Self {
        Self {
            client,
            hostname: normalize_host(hostname),
            state: RwLock::new(ProgramState::Loading),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Normalized hostname this service resolves for
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Backend tenant code derived from the hostname
    pub fn tenant_code(&self) -> &'static str {
        super::resolve_tenant_code(&self.hostname)
    }

    /// Site family derived from the hostname
    pub fn site_type(&self) -> SiteType {
        site_type(&self.hostname)
    }

    /// Current state without waiting
    pub fn current(&self) -> ProgramState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or(ProgramState::Loading)
    }

    /// Load the program, issuing a request only on the first call
    ///
    /// Concurrent first calls share a single request; later calls return the
    /// same `Arc` until [`refetch`](Self::refetch) or [`clear`](Self::clear).
    pub async fn load(&self) -> Result<Arc<Program>> {
        if let Some(program) = self.current().program() {
            return Ok(Arc::clone(program));
        }

        let _guard = self.load_lock.lock().await;
        if let Some(program) = self.current().program() {
            tracing::debug!("Program loaded by a concurrent caller");
            return Ok(Arc::clone(program));
        }

        self.fetch().await
    }

    /// Force a new request and replace the cached program
    pub async fn refetch(&self) -> Result<Arc<Program>> {
        let _guard = self.load_lock.lock().await;
        self.fetch().await
    }

    /// Drop the cached program
    pub fn clear(&self) {
        self.set_state(ProgramState::Loading);
    }

    /// Branding derived from the current state
    pub fn branding(&self) -> Branding {
        Branding::from_state(&self.current(), &self.hostname)
    }

    async fn fetch(&self) -> Result<Arc<Program>> {
        let tenant_code = self.tenant_code();
        tracing::debug!(hostname = %self.hostname, tenant_code, "Fetching program");
        match self
            .client
            .get_for_tenant::<Program>(PROGRAM_PATH, tenant_code)
            .await
        {
            Ok(program) => {
                let program = Arc::new(program);
                tracing::info!(
                    tenant_code = %program.tenant_code,
                    active = program.is_active,
                    "Program loaded"
                );
                self.set_state(ProgramState::Ready(Arc::clone(&program)));
                Ok(program)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Program load failed");
                self.set_state(ProgramState::Failed(e.korean_desc()));
                Err(e.into())
            }
        }
    }

    fn set_state(&self, next: ProgramState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

// ============================================================================
// Branding
// ============================================================================

/// Which login page a tenant gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVariant {
    HakwonPlus,
    Limglish,
    Tchul,
    /// Known tenant without a dedicated page
    Tenant(TenantId),
    /// Unknown host with a program-provided login title
    Custom,
}

/// Values consumed by the favicon, document title and login page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub title: String,
    pub favicon_url: Option<String>,
    pub logo_url: Option<String>,
    pub login_title: String,
    pub login_subtitle: Option<String>,
    pub primary_color: Option<String>,
    pub login_variant: LoginVariant,
    /// True while the program has not loaded; consumers render neutrally
    pub is_loading: bool,
}

impl Branding {
    /// Neutral branding shown before the program is known
    pub fn neutral() -> Self {
        Self {
            title: NEUTRAL_TITLE.to_string(),
            favicon_url: None,
            logo_url: None,
            login_title: NEUTRAL_TITLE.to_string(),
            login_subtitle: None,
            primary_color: None,
            login_variant: LoginVariant::HakwonPlus,
            is_loading: true,
        }
    }

    /// Compute branding for a program state and hostname
    pub fn from_state(state: &ProgramState, hostname: &str) -> Self {
        let host = normalize_host(hostname);
        let program = match state {
            ProgramState::Loading => return Self::neutral(),
            ProgramState::Ready(program) => Some(program.as_ref()),
            ProgramState::Failed(_) => None,
        };

        let ui = program.map(|p| &p.ui_config);
        let known = TenantRegistry::lookup(&host);
        let fallback_title = known.map(|t| t.branding.login_title);

        let login_title = ui
            .and_then(|u| u.login_title.clone())
            .or_else(|| fallback_title.map(str::to_string))
            .unwrap_or_else(|| NEUTRAL_TITLE.to_string());

        let title = ui
            .and_then(|u| u.window_title.clone())
            .or_else(|| {
                program
                    .map(|p| p.display_name.trim().to_string())
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or_else(|| login_title.clone());

        let login_variant = if site_type(&host) == SiteType::Limglish {
            LoginVariant::Limglish
        } else {
            match known {
                Some(t) if t.code == "tchul" => LoginVariant::Tchul,
                Some(t) if t.code == "limglish" => LoginVariant::Limglish,
                Some(t) if t.code == "hakwonplus" || t.id == 9999 => LoginVariant::HakwonPlus,
                Some(t) => LoginVariant::Tenant(t.id),
                None if ui.is_some_and(|u| u.login_title.is_some()) => LoginVariant::Custom,
                None => LoginVariant::HakwonPlus,
            }
        };

        Self {
            title,
            favicon_url: ui.and_then(|u| u.favicon_url.clone()),
            logo_url: ui
                .and_then(|u| u.logo_url.clone())
                .or_else(|| known.and_then(|t| t.branding.logo_url.map(str::to_string))),
            login_title,
            login_subtitle: ui
                .and_then(|u| u.login_subtitle.clone())
                .or_else(|| known.and_then(|t| t.branding.login_subtitle.map(str::to_string))),
            primary_color: ui.and_then(|u| u.primary_color.clone()),
            login_variant,
            is_loading: false,
        }
    }
}
