use clap::App as Cli;
use clap::Arg;
use clap::ArgMatches;
use slog::Logger;

use crate::config::env_var;
use crate::config::Config;
use crate::registrar::Registrar;
use crate::store;
use crate::types::ResultAnyError;

pub struct RegistrarCli {}

/// CLI definition
impl RegistrarCli {
  pub fn cmd<'a, 'b>(name: &str) -> Cli<'a, 'b> {
    return Cli::new(name)
      .about(indoc::indoc! {"
        Registers the configured PostgreSQL server in the pgAdmin configuration
        database unless a server with the same name is already there.
        The server password is read from the environment (POSTGRES_PASSWORD by default).
      "})
      .arg(
        Arg::with_name("config")
          .long("--config")
          .short("c")
          .required(false)
          .takes_value(true)
          .help("Path to a yaml config file, built-in defaults are used when omitted"),
      );
  }

  pub fn run(cli: &ArgMatches<'_>, logger: &Logger) -> ResultAnyError<()> {
    let config = Config::load(cli.value_of("config"))?;

    let registration = Registrar::run(
      &config,
      env_var,
      |settings| store::connect(&settings.location, logger),
      logger,
    )?;

    println!("{}", registration);

    return Ok(());
  }
}
