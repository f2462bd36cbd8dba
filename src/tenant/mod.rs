//! Tenant resolution
//!
//! A tenant is one academy instance, identified by the hostname the apps are
//! served from. This module maps hostnames to tenant codes and site types,
//! keeps the static registry of known tenants (branding fallback, login path),
//! and resolves the explicit override sent in the `X-Tenant-Code` header.

pub mod program;

use crate::storage::{get_non_empty, KeyValueStore, StorageError, TENANT_CODE_KEY};

pub use program::{
    Branding, FeatureFlags, LoginVariant, Program, ProgramService, ProgramState, UiConfig,
};

/// Tenant code used by every host that is not a dedicated tenant domain
pub const DEFAULT_TENANT_CODE: &str = "default";

/// Hostname of the limglish tenant
const LIMGLISH_HOST: &str = "limglish.kr";

/// Backend tenant code for limglish
const LIMGLISH_TENANT_CODE: &str = "2_limglish";

/// Trim, lowercase and strip any `:port` suffix
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.split(':').next().unwrap_or_default().trim().to_string()
}

/// Resolve the backend tenant code for a hostname
///
/// Exact string match against the dedicated tenant domains, `"default"` otherwise.
pub fn resolve_tenant_code(hostname: &str) -> &'static str {
    if hostname == LIMGLISH_HOST {
        LIMGLISH_TENANT_CODE
    } else {
        DEFAULT_TENANT_CODE
    }
}

/// Which front-end site family a hostname belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteType {
    /// limglish.kr
    Limglish,
    /// Every other host
    HakwonPlus,
}

impl SiteType {
    /// Stable string id
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limglish => "limglish",
            Self::HakwonPlus => "hakwonplus",
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Site type for a hostname
pub fn site_type(hostname: &str) -> SiteType {
    if hostname == LIMGLISH_HOST {
        SiteType::Limglish
    } else {
        SiteType::HakwonPlus
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Numeric tenant id used by the backend
pub type TenantId = u32;

/// Static branding used until (or when) the program has no `ui_config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticBranding {
    pub login_title: &'static str,
    pub login_subtitle: Option<&'static str>,
    pub logo_url: Option<&'static str>,
}

/// One known tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDef {
    pub id: TenantId,
    pub code: &'static str,
    pub hostnames: &'static [&'static str],
    pub branding: StaticBranding,
    pub login_path: &'static str,
    pub dedicated_login_page: bool,
}

const TENANTS: &[TenantDef] = &[
    TenantDef {
        id: 1,
        code: "hakwonplus",
        hostnames: &["hakwonplus.com", "www.hakwonplus.com"],
        branding: StaticBranding {
            login_title: "HakwonPlus 관리자 로그인",
            login_subtitle: None,
            logo_url: None,
        },
        login_path: "/login/hakwonplus",
        dedicated_login_page: false,
    },
    TenantDef {
        id: 2,
        code: "tchul",
        hostnames: &["tchul.com", "www.tchul.com"],
        branding: StaticBranding {
            login_title: "tchul.com 로그인",
            login_subtitle: None,
            logo_url: None,
        },
        login_path: "/login/tchul",
        dedicated_login_page: true,
    },
    TenantDef {
        id: 3,
        code: "limglish",
        hostnames: &["limglish.kr", "www.limglish.kr"],
        branding: StaticBranding {
            login_title: "limglish 로그인",
            login_subtitle: None,
            logo_url: None,
        },
        login_path: "/login/limglish",
        dedicated_login_page: true,
    },
    TenantDef {
        id: 4,
        code: "ymath",
        hostnames: &["ymath.co.kr", "www.ymath.co.kr"],
        branding: StaticBranding {
            login_title: "ymath 로그인",
            login_subtitle: None,
            logo_url: None,
        },
        login_path: "/login/ymath",
        dedicated_login_page: false,
    },
    TenantDef {
        id: 9999,
        code: "9999",
        hostnames: &["localhost", "127.0.0.1"],
        branding: StaticBranding {
            login_title: "로컬 개발 (9999)",
            login_subtitle: None,
            logo_url: None,
        },
        login_path: "/login/hakwonplus",
        dedicated_login_page: false,
    },
];

/// Lookup over the static tenant table
pub struct TenantRegistry;

impl TenantRegistry {
    /// All known tenants
    pub fn all() -> &'static [TenantDef] {
        TENANTS
    }

    /// Find a tenant by hostname or tenant code
    pub fn lookup(code_or_host: &str) -> Option<&'static TenantDef> {
        let normalized = normalize_host(code_or_host);
        TENANTS.iter().find(|t| {
            t.code == normalized || t.hostnames.iter().any(|h| *h == normalized)
        })
    }

    /// Tenant id for a hostname or code
    pub fn tenant_id_for(code_or_host: &str) -> Option<TenantId> {
        Self::lookup(code_or_host).map(|t| t.id)
    }

    /// Static branding for a tenant id
    pub fn branding(id: TenantId) -> Option<&'static StaticBranding> {
        TENANTS.iter().find(|t| t.id == id).map(|t| &t.branding)
    }

    /// Login route for a tenant id, `/login/hakwonplus` when unknown
    pub fn login_path(id: TenantId) -> &'static str {
        TENANTS
            .iter()
            .find(|t| t.id == id)
            .map_or("/login/hakwonplus", |t| t.login_path)
    }

    /// Tenants that ship their own login page
    pub fn with_dedicated_login() -> impl Iterator<Item = &'static TenantDef> {
        TENANTS.iter().filter(|t| t.dedicated_login_page)
    }
}

// ============================================================================
// Explicit override
// ============================================================================

/// Where an explicit tenant code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    Storage,
    Env,
}

/// Explicit tenant code chosen by an operator or a dev setting
///
/// Priority: local storage, then the environment. Hostnames are never
/// consulted here; they go through [`resolve_tenant_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantOverride {
    pub code: String,
    pub source: OverrideSource,
}

impl TenantOverride {
    /// Resolve the override, if any
    pub fn resolve(store: &dyn KeyValueStore, env_code: Option<&str>) -> Option<Self> {
        if let Some(code) = get_non_empty(store, TENANT_CODE_KEY) {
            return Some(Self {
                code,
                source: OverrideSource::Storage,
            });
        }

        env_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|code| Self {
                code: code.to_string(),
                source: OverrideSource::Env,
            })
    }

    /// Code to send as `X-Tenant-Code`
    pub fn header_code(store: &dyn KeyValueStore, env_code: Option<&str>) -> Option<String> {
        Self::resolve(store, env_code).map(|o| o.code)
    }

    /// Persist an operator choice; blank codes are ignored
    pub fn set(store: &dyn KeyValueStore, code: &str) -> Result<(), StorageError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(());
        }
        store.set(TENANT_CODE_KEY, code)
    }

    /// Forget the operator choice
    pub fn clear(store: &dyn KeyValueStore) -> Result<(), StorageError> {
        store.remove(TENANT_CODE_KEY)
    }
}
