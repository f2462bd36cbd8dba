use anyhow::{bail, Result};

use hakwonplus::auth::{BootstrapOutcome, User};
use hakwonplus::config::Config;

use super::open_context;

fn print_user(user: &User) {
    println!("User:  {} (#{})", user.username, user.id);
    if let Some(email) = &user.email {
        println!("Email: {email}");
    }
    match user.tenant_role {
        Some(role) => println!("Role:  {role:?}"),
        None => println!("Role:  -"),
    }
    if user.is_staff {
        println!("Staff: yes");
    }
}

pub async fn whoami(config: Config) -> Result<()> {
    let ctx = open_context(config)?;
    match ctx.auth().bootstrap().await {
        BootstrapOutcome::SignedIn(user) => print_user(&user),
        BootstrapOutcome::SignedOut => println!("Not signed in"),
        BootstrapOutcome::Failed(e) => bail!("Session check failed: {e}"),
    }
    Ok(())
}

pub async fn login(config: Config, username: &str, password: &str) -> Result<()> {
    let ctx = open_context(config)?;
    let user = ctx.auth().login(username, password).await?;
    print_user(&user);
    Ok(())
}

pub fn logout(config: Config) -> Result<()> {
    let ctx = open_context(config)?;
    ctx.sign_out();
    println!("Signed out");
    Ok(())
}
