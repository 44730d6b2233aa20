use crate::config::{BasicCredentials, BasicPassword};
use clap::{Arg, ArgGroup, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_REDIRECT_URL: &str = "redirect-url";
pub const ARG_BASIC_USERNAME: &str = "basic-username";
pub const ARG_BASIC_PASSWORD: &str = "basic-password";
pub const ARG_BASIC_PASSWORD_HASH: &str = "basic-password-hash";

const GROUP_BASIC_PASSWORD: &str = "basic-password-source";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("Where to send unauthenticated requests (default: respond 401)")
                .env("TOLLGATE_REDIRECT_URL"),
        )
        .arg(
            Arg::new(ARG_BASIC_USERNAME)
                .long(ARG_BASIC_USERNAME)
                .help("Username accepted by login and basic authentication")
                .env("TOLLGATE_BASIC_USERNAME")
                .requires(GROUP_BASIC_PASSWORD),
        )
        .arg(
            Arg::new(ARG_BASIC_PASSWORD)
                .long(ARG_BASIC_PASSWORD)
                .help("Password accepted by login and basic authentication")
                .env("TOLLGATE_BASIC_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_BASIC_USERNAME),
        )
        .arg(
            Arg::new(ARG_BASIC_PASSWORD_HASH)
                .long(ARG_BASIC_PASSWORD_HASH)
                .help("Argon2 PHC hash of the password, instead of --basic-password")
                .env("TOLLGATE_BASIC_PASSWORD_HASH")
                .hide_env_values(true)
                .requires(ARG_BASIC_USERNAME),
        )
        .group(
            ArgGroup::new(GROUP_BASIC_PASSWORD)
                .args([ARG_BASIC_PASSWORD, ARG_BASIC_PASSWORD_HASH])
                .multiple(false),
        )
}

#[must_use]
pub fn redirect_url(matches: &ArgMatches) -> Option<String> {
    matches.get_one::<String>(ARG_REDIRECT_URL).cloned()
}

/// Credentials for login and basic authentication, when both parts are given.
#[must_use]
pub fn basic_credentials(matches: &ArgMatches) -> Option<BasicCredentials> {
    let username = matches.get_one::<String>(ARG_BASIC_USERNAME)?;
    let password = if let Some(hash) = matches.get_one::<String>(ARG_BASIC_PASSWORD_HASH) {
        BasicPassword::Argon2(hash.clone())
    } else {
        BasicPassword::Plain(SecretString::from(
            matches.get_one::<String>(ARG_BASIC_PASSWORD)?.clone(),
        ))
    };
    Some(BasicCredentials {
        username: username.clone(),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn unset() -> [(&'static str, Option<&'static str>); 4] {
        [
            ("TOLLGATE_REDIRECT_URL", None),
            ("TOLLGATE_BASIC_USERNAME", None),
            ("TOLLGATE_BASIC_PASSWORD", None),
            ("TOLLGATE_BASIC_PASSWORD_HASH", None),
        ]
    }

    #[test]
    fn nothing_configured() {
        temp_env::with_vars(unset(), || {
            let matches = with_args(Command::new("tollgate")).get_matches_from(vec!["tollgate"]);
            assert!(redirect_url(&matches).is_none());
            assert!(basic_credentials(&matches).is_none());
        });
    }

    #[test]
    fn credentials_and_redirect() {
        temp_env::with_vars(unset(), || {
            let matches = with_args(Command::new("tollgate")).get_matches_from(vec![
                "tollgate",
                "--redirect-url",
                "/login",
                "--basic-username",
                "admin",
                "--basic-password",
                "hunter2",
            ]);
            assert_eq!(redirect_url(&matches).as_deref(), Some("/login"));
            let credentials = basic_credentials(&matches).expect("credentials");
            assert_eq!(credentials.username, "admin");
            let BasicPassword::Plain(password) = credentials.password else {
                panic!("expected a plain password");
            };
            assert_eq!(password.expose_secret(), "hunter2");
        });
    }

    #[test]
    fn password_hash_from_env() {
        temp_env::with_vars(unset(), || {
            temp_env::with_vars(
                [
                    ("TOLLGATE_BASIC_USERNAME", Some("admin")),
                    ("TOLLGATE_BASIC_PASSWORD_HASH", Some("$argon2id$v=19$x")),
                ],
                || {
                    let matches =
                        with_args(Command::new("tollgate")).get_matches_from(vec!["tollgate"]);
                    let credentials = basic_credentials(&matches).expect("credentials");
                    assert!(matches!(
                        credentials.password,
                        BasicPassword::Argon2(ref hash) if hash == "$argon2id$v=19$x"
                    ));
                },
            );
        });
    }

    #[test]
    fn password_and_hash_conflict() {
        temp_env::with_vars(unset(), || {
            let result = with_args(Command::new("tollgate")).try_get_matches_from(vec![
                "tollgate",
                "--basic-username",
                "admin",
                "--basic-password",
                "hunter2",
                "--basic-password-hash",
                "$argon2id$v=19$x",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn username_requires_password() {
        temp_env::with_vars(unset(), || {
            let result = with_args(Command::new("tollgate")).try_get_matches_from(vec![
                "tollgate",
                "--basic-username",
                "admin",
            ]);
            assert!(result.is_err());
        });
    }
}
