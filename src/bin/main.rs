use pgadmin_registrar::cli::RegistrarCli;
use pgadmin_registrar::logger;
use pgadmin_registrar::types::ResultAnyError;

pub mod built_info {
  include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn main() -> ResultAnyError<()> {
  // Dropped at the end of main, which flushes the async log drain.
  let logger = logger::create();

  let cli = RegistrarCli::cmd("pgadmin-registrar")
    .version(built_info::PKG_VERSION)
    .author(built_info::PKG_AUTHORS)
    .get_matches();

  return RegistrarCli::run(&cli, &logger);
}
