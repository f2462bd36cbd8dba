use anyhow::{bail, Result};

use hakwonplus::auth::BootstrapOutcome;
use hakwonplus::config::Config;
use hakwonplus::routes::{resolve_app, AppKind, Resolution};

use super::open_context;

/// Resolve `path` in one table, or through the gated top-level router with `app = "all"`
pub async fn routes(config: Config, app: &str, path: &str) -> Result<()> {
    let resolution = if app.eq_ignore_ascii_case("all") {
        let ctx = open_context(config)?;
        let user = match ctx.auth().bootstrap().await {
            BootstrapOutcome::SignedIn(user) => Some(user),
            _ => None,
        };
        resolve_app(path, user.as_ref())
    } else {
        let Some(kind) = AppKind::parse(app) else {
            bail!("Unknown app: {app} (admin, student, dev, auth, all)");
        };
        kind.table().resolve(path)
    };

    match resolution {
        Resolution::Render(m) => {
            println!("{} → {:?}", m.app, m.page);
            for (name, value) in &m.params {
                println!("  {name} = {value}");
            }
        }
        Resolution::Redirect(to) => println!("redirect → {to}"),
    }
    Ok(())
}
