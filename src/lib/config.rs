use std::env::VarError;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::server::SslMode;
use crate::types::ResultAnyError;

pub const DEFAULT_SECRET_ENV: &str = "POSTGRES_PASSWORD";
pub const STORE_URI_ENV: &str = "PGADMIN_CONFIG_DATABASE_URI";
pub const OWNER_EMAIL_ENV: &str = "PGADMIN_DEFAULT_EMAIL";

/// Where a stock pgAdmin server mode install keeps its SQLite store.
pub const DEFAULT_SQLITE_PATH: &str = "/var/lib/pgadmin/pgadmin4.db";

/// Reads `key` from the process environment.
///
/// Unset is `Ok(None)`, a value that is not valid unicode is an error rather than
/// being mistaken for unset.
pub fn env_var(key: &str) -> Result<Option<String>, ConfigError> {
  return match std::env::var(key) {
    Ok(value) => Ok(Some(value)),
    Err(VarError::NotPresent) => Ok(None),
    Err(VarError::NotUnicode(_)) => Err(ConfigError::NonUnicodeEnv {
      env_var: key.to_owned(),
    }),
  };
}

/// Registrar config. The `server` section overrides the built-in
/// `ogs-postgresql-cluster` entry, everything is optional.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Environment variable holding the server password.
  pub secret_env: String,
  pub server: ServerConfig,
  pub store: StoreConfig,
}

impl Default for Config {
  fn default() -> Self {
    return Config {
      secret_env: DEFAULT_SECRET_ENV.to_owned(),
      server: Default::default(),
      store: Default::default(),
    };
  }
}

/// Server entry config
/// -------------
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
  pub name: String,
  pub host: String,
  pub port: u16,
  pub username: String,
  pub ssl_mode: SslMode,
  pub maintenance_db: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    return ServerConfig {
      name: "ogs-postgresql-cluster".to_owned(),
      host: "ogs-postgresql-cluster-primary".to_owned(),
      port: 5432,
      username: "postgres".to_owned(),
      ssl_mode: SslMode::Prefer,
      maintenance_db: "postgres".to_owned(),
    };
  }
}

/// pgAdmin store config
/// -------------
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
  pub uri: Option<String>,
  pub owner_email: Option<String>,
  pub server_group: Option<String>,
}

/// Which database pgAdmin keeps its configuration in.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
  /// Anything `postgres::Config` parses.
  Postgres(String),
  Sqlite(PathBuf),
}

impl Default for StoreLocation {
  fn default() -> Self {
    return StoreLocation::Sqlite(PathBuf::from(DEFAULT_SQLITE_PATH));
  }
}

/// Accepts the SQLAlchemy style uris pgAdmin takes in `CONFIG_DATABASE_URI`
/// (`postgresql+psycopg://...`, `sqlite:////abs/path.db`), libpq key=value
/// strings and bare SQLite file paths.
impl FromStr for StoreLocation {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();

    if let Some(path) = s.strip_prefix("sqlite:///") {
      return Ok(StoreLocation::Sqlite(PathBuf::from(path)));
    }

    if let Some((scheme, rest)) = s.split_once("://") {
      let dialect = scheme.split('+').next().unwrap_or_default();

      return match dialect {
        "postgres" | "postgresql" => Ok(StoreLocation::Postgres(format!("postgresql://{}", rest))),
        _ => Err(ConfigError::UnsupportedStoreUri {
          scheme: scheme.to_owned(),
        }),
      };
    }

    if s.contains('=') {
      return Ok(StoreLocation::Postgres(s.to_owned()));
    }

    return Ok(StoreLocation::Sqlite(PathBuf::from(s)));
  }
}

/// Store config after environment fallbacks are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
  pub location: StoreLocation,
  pub owner_email: Option<String>,
  pub server_group: Option<String>,
}

impl Config {
  pub fn from(setting_path: impl AsRef<Path> + std::fmt::Display) -> ResultAnyError<Config> {
    let config_str = fs::read_to_string(&setting_path).map_err(|err| {
      return ConfigError::UnreadableConfig {
        config_path: setting_path.to_string(),
        source: err,
      };
    })?;

    let config: Config = serde_yaml::from_str(&config_str).map_err(|err| {
      return ConfigError::InvalidConfig {
        config_path: setting_path.to_string(),
        source: err,
      };
    })?;

    return Ok(config);
  }

  /// Falls back to the built-in defaults when no config path is given.
  pub fn load(setting_path: Option<&str>) -> ResultAnyError<Config> {
    return match setting_path {
      Some(path) => Config::from(path),
      None => Ok(Default::default()),
    };
  }
}

impl StoreConfig {
  /// Without a uri in the config or environment the default pgAdmin SQLite
  /// store is used.
  pub fn resolve<F>(&self, lookup: F) -> Result<StoreSettings, ConfigError>
  where
    F: Fn(&str) -> Result<Option<String>, ConfigError>,
  {
    let from_env = |key: &str| -> Result<Option<String>, ConfigError> {
      return Ok(lookup(key)?.filter(|value| !value.is_empty()));
    };

    let location: StoreLocation = match &self.uri {
      Some(uri) => uri.parse()?,
      None => match from_env(STORE_URI_ENV)? {
        Some(uri) => uri.parse()?,
        None => StoreLocation::default(),
      },
    };

    let owner_email = match &self.owner_email {
      Some(email) => Some(email.clone()),
      None => from_env(OWNER_EMAIL_ENV)?,
    };

    return Ok(StoreSettings {
      location,
      owner_email,
      server_group: self.server_group.clone(),
    });
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Could not read registrar config {config_path}: {source}")]
  UnreadableConfig {
    config_path: String,
    source: std::io::Error,
  },

  #[error("Registrar config {config_path} is not valid: {source}")]
  InvalidConfig {
    config_path: String,
    source: serde_yaml::Error,
  },

  #[error("Environment variable {env_var} is not valid unicode")]
  NonUnicodeEnv { env_var: String },

  #[error("pgAdmin store uri scheme {scheme:?} is not supported, use postgresql:// or sqlite:///")]
  UnsupportedStoreUri { scheme: String },
}
