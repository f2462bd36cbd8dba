use anyhow::Result;

use hakwonplus::config::Config;
use hakwonplus::tenant::{normalize_host, resolve_tenant_code, site_type, TenantRegistry};

use super::open_context;

pub fn tenant(host: &str) -> Result<()> {
    let host = normalize_host(host);
    println!("Host:        {host}");
    println!("Tenant code: {}", resolve_tenant_code(&host));
    println!("Site type:   {}", site_type(&host).as_str());

    match TenantRegistry::lookup(&host) {
        Some(def) => {
            println!("Registry id: {}", def.id);
            println!("Login path:  {}", def.login_path);
            println!("Login title: {}", def.branding.login_title);
        }
        None => println!("Registry:    (not a known tenant)"),
    }
    Ok(())
}

pub async fn program(config: Config) -> Result<()> {
    let ctx = open_context(config)?;
    let program = ctx.program().load().await?;

    println!("Tenant:  {}", program.tenant_code);
    println!("Name:    {}", program.display_name);
    println!("Active:  {}", program.is_active);

    let branding = ctx.branding();
    println!("Title:   {}", branding.title);
    println!("Login:   {}", branding.login_title);
    if let Some(subtitle) = &branding.login_subtitle {
        println!("         {subtitle}");
    }
    if let Some(color) = &branding.primary_color {
        println!("Color:   {color}");
    }
    Ok(())
}
