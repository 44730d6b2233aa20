use crate::{
    api,
    cli::telemetry,
    config::{BasicPassword, Config},
    filters::{CredentialValidator, HashedCredentials, StaticCredentials},
    gate::Tollgate,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub config: Config,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is rejected or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let validator = validator(&args.config);
    let gate = Tollgate::new(args.config).context("invalid configuration")?;

    let result = api::new(args.port, Arc::new(gate), validator).await;

    telemetry::shutdown_tracer();

    result
}

/// The configured credentials, otherwise a validator that refuses everyone.
fn validator(config: &Config) -> Arc<dyn CredentialValidator> {
    let Some(credentials) = config.basic_credentials() else {
        warn!("no basic credentials configured, login and /basic will reject every request");
        return Arc::new(|_: &str, _: &str| false);
    };
    let username = credentials.username.clone();
    match &credentials.password {
        BasicPassword::Plain(password) => {
            Arc::new(StaticCredentials::new(username, password.clone()))
        }
        BasicPassword::Argon2(hash) => Arc::new(HashedCredentials::new(username, hash.clone())),
    }
}

fn log_startup_args(args: &Args) {
    let config = &args.config;
    let session = config.session();
    let authentication = config.authentication();
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("application", config.application_name().to_string()),
        ("session_cookie", session.name().to_string()),
        ("session_encrypt", session.encrypt().to_string()),
        ("session_expires", session.expires_seconds().to_string()),
        ("authentication_cookie", authentication.name().to_string()),
        ("authentication_encrypt", authentication.encrypt().to_string()),
        (
            "authentication_expires",
            authentication.expires_seconds().to_string(),
        ),
        (
            "remember_expires",
            config.remember_expires_seconds().to_string(),
        ),
        (
            "redirect_url",
            config.redirect_url().unwrap_or("none").to_string(),
        ),
        (
            "basic_credentials_set",
            config.basic_credentials().is_some().to_string(),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "tollgate {} - {}\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BasicCredentials;
    use crate::crypto::hash_password;
    use crate::crypto::SharedSecret;
    use secrecy::SecretString;

    fn config() -> Config {
        Config::new(SharedSecret::new("0123456789abcdef0123").expect("secret"))
    }

    #[test]
    fn without_credentials_everyone_is_refused() {
        let validator = validator(&config());
        assert!(!validator.validate("admin", "admin"));
        assert!(!validator.validate("", ""));
    }

    #[test]
    fn static_credentials_are_used() {
        let config = config().with_basic_credentials(BasicCredentials {
            username: "admin".to_string(),
            password: BasicPassword::Plain(SecretString::from("hunter2")),
        });
        let validator = validator(&config);
        assert!(validator.validate("admin", "hunter2"));
        assert!(!validator.validate("admin", "hunter3"));
    }

    #[test]
    fn hashed_credentials_are_used() {
        let hash = hash_password("hunter2").expect("hash");
        let config = config().with_basic_credentials(BasicCredentials {
            username: "admin".to_string(),
            password: BasicPassword::Argon2(hash.clone()),
        });
        let validator = validator(&config);
        assert!(validator.validate("admin", "hunter2"));
        assert!(!validator.validate("admin", &hash));
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit(" abc "), "abc");
    }
}
