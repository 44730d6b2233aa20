use crate::config::{
    CookieSettings, DEFAULT_AUTHENTICATION_COOKIE_NAME, DEFAULT_EXPIRES_SECONDS,
    DEFAULT_REMEMBER_EXPIRES_SECONDS, DEFAULT_SESSION_COOKIE_NAME,
};
use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_REMEMBER_EXPIRES: &str = "authentication-remember-expires";

const DEFAULT_EXPIRES: &str = "3600";
const DEFAULT_REMEMBER_EXPIRES: &str = "2592000";

/// Argument id and environment variable of one option.
pub struct Opt {
    pub id: &'static str,
    pub env: &'static str,
}

/// Options for one cookie kind.
pub struct CookieArgs {
    pub name: Opt,
    pub signing_key: Opt,
    pub encrypt: Opt,
    pub expires: Opt,
    pub secure: Opt,
}

pub const SESSION: CookieArgs = CookieArgs {
    name: Opt {
        id: "session-cookie-name",
        env: "TOLLGATE_SESSION_COOKIE_NAME",
    },
    signing_key: Opt {
        id: "session-signing-key",
        env: "TOLLGATE_SESSION_SIGNING_KEY",
    },
    encrypt: Opt {
        id: "session-encrypt",
        env: "TOLLGATE_SESSION_ENCRYPT",
    },
    expires: Opt {
        id: "session-expires",
        env: "TOLLGATE_SESSION_EXPIRES",
    },
    secure: Opt {
        id: "session-secure",
        env: "TOLLGATE_SESSION_SECURE",
    },
};

pub const AUTHENTICATION: CookieArgs = CookieArgs {
    name: Opt {
        id: "authentication-cookie-name",
        env: "TOLLGATE_AUTHENTICATION_COOKIE_NAME",
    },
    signing_key: Opt {
        id: "authentication-signing-key",
        env: "TOLLGATE_AUTHENTICATION_SIGNING_KEY",
    },
    encrypt: Opt {
        id: "authentication-encrypt",
        env: "TOLLGATE_AUTHENTICATION_ENCRYPT",
    },
    expires: Opt {
        id: "authentication-expires",
        env: "TOLLGATE_AUTHENTICATION_EXPIRES",
    },
    secure: Opt {
        id: "authentication-secure",
        env: "TOLLGATE_AUTHENTICATION_SECURE",
    },
};

fn cookie_args(command: Command, args: &CookieArgs, kind: &str, default_name: &'static str) -> Command {
    command
        .arg(
            Arg::new(args.name.id)
                .long(args.name.id)
                .help(format!("Name of the {kind} cookie"))
                .default_value(default_name)
                .env(args.name.env),
        )
        .arg(
            Arg::new(args.signing_key.id)
                .long(args.signing_key.id)
                .help(format!(
                    "Key used to sign the {kind} cookie, at least 16 characters (default: the application secret)"
                ))
                .env(args.signing_key.env)
                .hide_env_values(true),
        )
        .arg(
            Arg::new(args.encrypt.id)
                .long(args.encrypt.id)
                .help(format!("Encrypt the {kind} cookie value"))
                .env(args.encrypt.env)
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(args.expires.id)
                .long(args.expires.id)
                .help(format!("Lifetime of the {kind} cookie in seconds"))
                .default_value(DEFAULT_EXPIRES)
                .env(args.expires.env)
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(args.secure.id)
                .long(args.secure.id)
                .help(format!("Only send the {kind} cookie over HTTPS"))
                .env(args.secure.env)
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = cookie_args(command, &SESSION, "session", DEFAULT_SESSION_COOKIE_NAME);
    let command = cookie_args(
        command,
        &AUTHENTICATION,
        "authentication",
        DEFAULT_AUTHENTICATION_COOKIE_NAME,
    );
    command.arg(
        Arg::new(ARG_REMEMBER_EXPIRES)
            .long(ARG_REMEMBER_EXPIRES)
            .help("Lifetime of a remembered authentication cookie in seconds")
            .default_value(DEFAULT_REMEMBER_EXPIRES)
            .env("TOLLGATE_AUTHENTICATION_REMEMBER_EXPIRES")
            .value_parser(clap::value_parser!(i64).range(1..)),
    )
}

/// Build the settings of one cookie from parsed arguments.
///
/// # Errors
/// Returns an error if the cookie name is missing.
pub fn settings(matches: &ArgMatches, args: &CookieArgs) -> Result<CookieSettings> {
    let name = matches
        .get_one::<String>(args.name.id)
        .cloned()
        .with_context(|| format!("missing required argument: --{}", args.name.id))?;

    let mut settings = CookieSettings::new(name)
        .with_encrypt(matches.get_flag(args.encrypt.id))
        .with_expires_seconds(
            matches
                .get_one::<i64>(args.expires.id)
                .copied()
                .unwrap_or(DEFAULT_EXPIRES_SECONDS),
        )
        .with_secure(matches.get_flag(args.secure.id));

    if let Some(key) = matches.get_one::<String>(args.signing_key.id) {
        settings = settings.with_signing_key(SecretString::from(key.clone()));
    }

    Ok(settings)
}

#[must_use]
pub fn remember_expires_seconds(matches: &ArgMatches) -> i64 {
    matches
        .get_one::<i64>(ARG_REMEMBER_EXPIRES)
        .copied()
        .unwrap_or(DEFAULT_REMEMBER_EXPIRES_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["tollgate"];
        argv.extend_from_slice(args);
        with_args(Command::new("tollgate")).get_matches_from(argv)
    }

    #[test]
    fn env_names_follow_ids() {
        for args in [&SESSION, &AUTHENTICATION] {
            for opt in [
                &args.name,
                &args.signing_key,
                &args.encrypt,
                &args.expires,
                &args.secure,
            ] {
                let expected = format!("TOLLGATE_{}", opt.id.replace('-', "_").to_uppercase());
                assert_eq!(opt.env, expected);
            }
        }
    }

    #[test]
    fn default_strings_match_config() {
        assert_eq!(DEFAULT_EXPIRES.parse::<i64>().ok(), Some(DEFAULT_EXPIRES_SECONDS));
        assert_eq!(
            DEFAULT_REMEMBER_EXPIRES.parse::<i64>().ok(),
            Some(DEFAULT_REMEMBER_EXPIRES_SECONDS)
        );
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(
            [
                ("TOLLGATE_SESSION_ENCRYPT", None::<&str>),
                ("TOLLGATE_SESSION_SIGNING_KEY", None::<&str>),
                ("TOLLGATE_SESSION_COOKIE_NAME", None::<&str>),
            ],
            || {
                let matches = matches(&[]);
                let session = settings(&matches, &SESSION).expect("session settings");
                assert_eq!(session.name(), DEFAULT_SESSION_COOKIE_NAME);
                assert!(!session.encrypt());
                assert!(!session.secure());
                assert_eq!(session.expires_seconds(), DEFAULT_EXPIRES_SECONDS);
                assert!(session.signing_key().is_none());
                assert_eq!(
                    remember_expires_seconds(&matches),
                    DEFAULT_REMEMBER_EXPIRES_SECONDS
                );
            },
        );
    }

    #[test]
    fn flags_and_values() {
        let matches = matches(&[
            "--authentication-cookie-name",
            "auth",
            "--authentication-encrypt",
            "--authentication-secure",
            "--authentication-expires",
            "60",
            "--authentication-signing-key",
            "0123456789abcdef",
        ]);
        let auth = settings(&matches, &AUTHENTICATION).expect("authentication settings");
        assert_eq!(auth.name(), "auth");
        assert!(auth.encrypt());
        assert!(auth.secure());
        assert_eq!(auth.expires_seconds(), 60);
        assert_eq!(auth.signing_key(), Some("0123456789abcdef"));
    }

    #[test]
    fn flags_from_env() {
        temp_env::with_vars(
            [
                ("TOLLGATE_SESSION_ENCRYPT", Some("true")),
                ("TOLLGATE_SESSION_EXPIRES", Some("120")),
            ],
            || {
                let matches = matches(&[]);
                let session = settings(&matches, &SESSION).expect("session settings");
                assert!(session.encrypt());
                assert_eq!(session.expires_seconds(), 120);
            },
        );
    }

    #[test]
    fn rejects_non_positive_expiry() {
        let result = with_args(Command::new("tollgate")).try_get_matches_from(vec![
            "tollgate",
            "--session-expires",
            "0",
        ]);
        assert!(result.is_err());
    }
}
