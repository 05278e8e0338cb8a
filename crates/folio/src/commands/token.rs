//! Issue bearer tokens.

use folio_core::Config;
use folio_server::JwtValidator;

/// Print a token for `user` signed with the configured secret.
pub fn issue_token(config: &Config, user: &str, ttl: Option<u64>) -> anyhow::Result<()> {
    let ttl = ttl.unwrap_or_else(|| config.token_ttl_secs());
    let jwt = JwtValidator::from_secret(config.jwt_secret(), ttl, config.dev_mode())?;
    let token = jwt.issue(user)?;

    tracing::info!(user = %user, ttl_secs = ttl, "Issued token");
    println!("{token}");
    Ok(())
}
