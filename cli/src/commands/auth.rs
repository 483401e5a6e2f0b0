//! Admin session commands

use super::Context;
use anyhow::Context as _;
use colored::Colorize;
use std::io::{self, BufRead, Write};

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(ctx: &Context, username: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    let resp = ctx
        .session
        .login(ctx.api.as_ref(), username, &password)
        .await
        .context("login failed")?;
    println!(
        "{} logged in as {} (session valid for {}h)",
        "✓".green().bold(),
        resp.username.bold(),
        resp.expires_in / 3600
    );
    Ok(())
}

pub fn logout(ctx: &Context) -> anyhow::Result<()> {
    ctx.session.logout();
    println!("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> anyhow::Result<()> {
    match ctx.session.restore(ctx.api.as_ref()).await? {
        Some(identity) if identity.authenticated => {
            println!("{} {}", "Authenticated as".green(), identity.username.bold());
        }
        _ => println!("{}", "Not logged in".yellow()),
    }
    Ok(())
}
