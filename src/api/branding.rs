//! Developer console: tenants, owners, domains, and login branding
//!
//! These endpoints speak camelCase JSON.

use serde::{Deserialize, Deserializer, Serialize};

use super::{ensure_id, Id, NoQuery};
use crate::error::Result;
use crate::http::{ApiClient, ApiError};
use crate::tenant::normalize_host;

const TENANTS_PATH: &str = "/core/tenants/";

/// Host bound to a tenant
///
/// List responses send bare host strings, detail responses send objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDomain {
    pub host: String,
    pub is_primary: bool,
}

impl<'de> Deserialize<'de> for TenantDomain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Host(String),
            #[serde(rename_all = "camelCase")]
            Full {
                host: String,
                #[serde(default)]
                is_primary: bool,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Host(host) => Self {
                host,
                is_primary: false,
            },
            Wire::Full { host, is_primary } => Self { host, is_primary },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Id,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub primary_domain: Option<String>,
    #[serde(default)]
    pub domains: Vec<TenantDomain>,
    /// Only present on detail responses
    #[serde(default)]
    pub has_program: Option<bool>,
}

impl Tenant {
    /// Primary host, from the flag on the domain list or `primaryDomain`
    pub fn primary_host(&self) -> Option<&str> {
        self.domains
            .iter()
            .find(|d| d.is_primary)
            .map(|d| d.host.as_str())
            .or(self.primary_domain.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTenant {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOwner {
    #[serde(default)]
    pub tenant_id: Option<Id>,
    #[serde(default)]
    pub tenant_code: Option<String>,
    pub user_id: Id,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OwnerRegistration {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Login screen branding of one tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantBranding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewDomainBody<'a> {
    host: &'a str,
    is_primary: bool,
}

pub struct BrandingApi<'a> {
    client: &'a ApiClient,
}

impl<'a> BrandingApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // ========================================================================
    // Tenants
    // ========================================================================

    pub async fn tenants(&self) -> Result<Vec<Tenant>> {
        self.client.get_list::<_, NoQuery>(TENANTS_PATH, None).await
    }

    pub async fn tenant(&self, tenant_id: Id) -> Result<Tenant> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("{TENANTS_PATH}{tenant_id}/"))
            .await?)
    }

    pub async fn create_tenant(&self, tenant: &NewTenant) -> Result<Tenant> {
        if tenant.code.trim().is_empty() || tenant.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("코드와 이름을 입력해 주세요.".to_string()).into());
        }
        let body = NewTenant {
            code: tenant.code.trim().to_string(),
            name: tenant.name.trim().to_string(),
            domain: tenant
                .domain
                .as_deref()
                .map(normalize_host)
                .filter(|d| !d.is_empty()),
        };
        Ok(self
            .client
            .post(&format!("{TENANTS_PATH}create/"), &body)
            .await?)
    }

    pub async fn update_tenant(&self, tenant_id: Id, update: &TenantUpdate) -> Result<Tenant> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&format!("{TENANTS_PATH}{tenant_id}/"), update)
            .await?)
    }

    // ========================================================================
    // Owners
    // ========================================================================

    pub async fn owners(&self, tenant_id: Id) -> Result<Vec<TenantOwner>> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        self.client
            .get_list::<_, NoQuery>(&format!("{TENANTS_PATH}{tenant_id}/owners/"), None)
            .await
    }

    pub async fn register_owner(&self, tenant_id: Id, owner: &OwnerRegistration) -> Result<TenantOwner> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        if owner.username.trim().is_empty() {
            return Err(ApiError::InvalidRequest("아이디를 입력해 주세요.".to_string()).into());
        }
        Ok(self
            .client
            .post(&format!("{TENANTS_PATH}{tenant_id}/owner/"), owner)
            .await?)
    }

    // ========================================================================
    // Branding and domains
    // ========================================================================

    pub async fn get_branding(&self, tenant_id: Id) -> Result<TenantBranding> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .get(&format!("{TENANTS_PATH}{tenant_id}/branding/"))
            .await?)
    }

    /// Only the fields set in `branding` are changed
    pub async fn update_branding(&self, tenant_id: Id, branding: &TenantBranding) -> Result<TenantBranding> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        Ok(self
            .client
            .patch(&format!("{TENANTS_PATH}{tenant_id}/branding/"), branding)
            .await?)
    }

    pub async fn domains(&self, tenant_id: Id) -> Result<Vec<TenantDomain>> {
        Ok(self.tenant(tenant_id).await?.domains)
    }

    pub async fn add_domain(&self, tenant_id: Id, host: &str, is_primary: bool) -> Result<Tenant> {
        ensure_id(tenant_id, "테넌트 ID가 올바르지 않습니다.")?;
        let host = normalize_host(host);
        if host.is_empty() {
            return Err(ApiError::InvalidRequest("도메인을 입력해 주세요.".to_string()).into());
        }
        Ok(self
            .client
            .post(
                &format!("{TENANTS_PATH}{tenant_id}/domains/"),
                &NewDomainBody {
                    host: &host,
                    is_primary,
                },
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_domains_accept_both_shapes() {
        let list: Tenant = serde_json::from_value(json!({
            "id": 1, "code": "hakwonplus", "name": "학원플러스", "isActive": true,
            "primaryDomain": "hakwonplus.com", "domains": ["hakwonplus.com", "www.hakwonplus.com"]
        }))
        .unwrap();
        assert_eq!(list.domains.len(), 2);
        assert_eq!(list.primary_host(), Some("hakwonplus.com"));

        let detail: Tenant = serde_json::from_value(json!({
            "id": 3, "code": "limglish", "name": "림글리시", "isActive": true,
            "primaryDomain": null,
            "domains": [{"host": "limglish.kr", "isPrimary": true}],
            "hasProgram": true
        }))
        .unwrap();
        assert_eq!(detail.primary_host(), Some("limglish.kr"));
        assert_eq!(detail.has_program, Some(true));
    }

    #[test]
    fn test_branding_patch_is_partial() {
        let patch = TenantBranding {
            login_title: Some("환영합니다".to_string()),
            ..TenantBranding::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"loginTitle": "환영합니다"})
        );
    }
}
