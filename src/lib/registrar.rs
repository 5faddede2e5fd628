use std::fmt;

use itertools::Itertools;
use slog::Logger;
use thiserror::Error;

use crate::config::Config;
use crate::config::ConfigError;
use crate::config::StoreSettings;
use crate::secret::Secret;
use crate::server::FieldDrift;
use crate::server::NewServer;
use crate::server::ServerRecord;
use crate::store::ServerStore;
use crate::types::ResultAnyError;

#[derive(Error, Debug, PartialEq)]
pub enum RegistrarError {
  #[error("Environment variable {env_var} is not set!")]
  MissingSecret { env_var: String },
}

/// Outcome of a registration, its `Display` is the status line shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
  Created {
    name: String,
    id: i32,
  },

  /// Nothing was written, `drift` lists the fields that differ from the config.
  AlreadyExists {
    existing: ServerRecord,
    drift: Vec<FieldDrift>,
  },
}

impl fmt::Display for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    return match self {
      Registration::Created { name, .. } => write!(f, "Server '{}' added successfully!", name),
      Registration::AlreadyExists { existing, .. } => {
        write!(f, "Server '{}' already exists.", existing.name)
      }
    };
  }
}

/// Makes sure the configured server exists in the pgAdmin store.
pub struct Registrar {
  server: NewServer,
  store_settings: StoreSettings,
  logger: Logger,
}

impl Registrar {
  /// Resolves every input that does not need the store.
  ///
  /// The secret is checked first, a missing secret fails before anything else is looked at.
  pub fn prepare<F>(config: &Config, lookup: F, logger: &Logger) -> ResultAnyError<Registrar>
  where
    F: Fn(&str) -> Result<Option<String>, ConfigError>,
  {
    let password = Secret::from_lookup(&config.secret_env, &lookup)?.ok_or_else(|| {
      return RegistrarError::MissingSecret {
        env_var: config.secret_env.clone(),
      };
    })?;

    let store_settings = config.store.resolve(&lookup)?;
    let server_config = &config.server;

    return Ok(Registrar {
      server: NewServer {
        name: server_config.name.clone(),
        host: server_config.host.clone(),
        port: server_config.port,
        username: server_config.username.clone(),
        ssl_mode: server_config.ssl_mode,
        maintenance_db: server_config.maintenance_db.clone(),
        password,
      },
      store_settings,
      logger: logger.new(slog::o!("server" => server_config.name.clone())),
    });
  }

  /// Prepares, connects through `connect` and registers.
  ///
  /// `connect` only runs once the secret is known to be present.
  pub fn run<F, C, S>(
    config: &Config,
    lookup: F,
    connect: C,
    logger: &Logger,
  ) -> ResultAnyError<Registration>
  where
    F: Fn(&str) -> Result<Option<String>, ConfigError>,
    C: FnOnce(&StoreSettings) -> ResultAnyError<S>,
    S: ServerStore,
  {
    let registrar = Registrar::prepare(config, lookup, logger)?;
    let mut store = connect(registrar.store_settings())?;

    return registrar.register(&mut store);
  }

  pub fn store_settings(&self) -> &StoreSettings {
    return &self.store_settings;
  }

  pub fn register(&self, store: &mut dyn ServerStore) -> ResultAnyError<Registration> {
    let name = &self.server.name;
    let mut tx = store.transaction()?;

    tx.lock_name(name)?;

    if let Some(existing) = tx.find_by_name(name)? {
      let drift = self.server.drift_from(&existing);

      if !drift.is_empty() {
        slog::warn!(self.logger, "Existing server differs from config, leaving it untouched";
          "id" => existing.id,
          "drift" => drift.iter().join(", "));
      }

      // Dropping tx rolls back and releases the name lock.
      return Ok(Registration::AlreadyExists { existing, drift });
    }

    let owner = tx.resolve_owner(
      self.store_settings.owner_email.clone(),
      self.store_settings.server_group.clone(),
    )?;

    slog::debug!(self.logger, "Resolved owner";
      "user_id" => owner.user_id,
      "server_group_id" => owner.server_group_id);

    let id = tx.insert(&self.server, owner)?;

    tx.commit()?;

    slog::info!(self.logger, "Registered server";
      "id" => id,
      "host" => &self.server.host,
      "port" => self.server.port);

    return Ok(Registration::Created {
      name: name.clone(),
      id,
    });
  }
}
