//! Maps validated command-line arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{cookies, filters, ARG_APPLICATION_NAME, ARG_PORT, ARG_SECRET};
use crate::config::{Config, DEFAULT_APPLICATION_NAME};
use crate::crypto::SharedSecret;
use anyhow::{Context, Result};

/// Build the server configuration from parsed arguments.
///
/// # Errors
/// Returns an error if the secret is missing or the resulting configuration is invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let secret = matches
        .get_one::<String>(ARG_SECRET)
        .cloned()
        .context("missing required argument: --secret")?;
    let secret = SharedSecret::new(secret).context("invalid TOLLGATE_SECRET")?;

    let application_name = matches
        .get_one::<String>(ARG_APPLICATION_NAME)
        .map_or(DEFAULT_APPLICATION_NAME, String::as_str);

    let mut config = Config::new(secret)
        .with_application_name(application_name)
        .with_session(cookies::settings(matches, &cookies::SESSION)?)
        .with_authentication(cookies::settings(matches, &cookies::AUTHENTICATION)?)
        .with_remember_expires_seconds(cookies::remember_expires_seconds(matches));

    if let Some(url) = filters::redirect_url(matches) {
        config = config.with_redirect_url(url);
    }

    if let Some(credentials) = filters::basic_credentials(matches) {
        config = config.with_basic_credentials(credentials);
    }

    config.validate().context("invalid configuration")?;

    Ok(Action::Server(Args { port, config }))
}
