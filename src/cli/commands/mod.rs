pub mod cookies;
pub mod filters;
pub mod logging;

use crate::config::DEFAULT_APPLICATION_NAME;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_SECRET: &str = "secret";
pub const ARG_APPLICATION_NAME: &str = "application-name";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("tollgate")
        .about("Stateless cookie sessions and access filters")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("TOLLGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SECRET)
                .short('s')
                .long(ARG_SECRET)
                .help("Application secret used to sign and encrypt cookies, at least 16 characters")
                .env("TOLLGATE_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_APPLICATION_NAME)
                .long(ARG_APPLICATION_NAME)
                .help("Issuer of every token and realm of basic authentication")
                .default_value(DEFAULT_APPLICATION_NAME)
                .env("TOLLGATE_APPLICATION_NAME"),
        );

    let command = cookies::with_args(command);
    let command = filters::with_args(command);
    logging::with_args(command)
}
