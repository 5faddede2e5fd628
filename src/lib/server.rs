use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::secret::Secret;

/// libpq sslmode values understood by pgAdmin.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
  Disable,
  Allow,
  Prefer,
  Require,
  VerifyCa,
  VerifyFull,
}

impl Default for SslMode {
  fn default() -> Self {
    return SslMode::Prefer;
  }
}

impl SslMode {
  pub fn as_str(&self) -> &'static str {
    return match self {
      SslMode::Disable => "disable",
      SslMode::Allow => "allow",
      SslMode::Prefer => "prefer",
      SslMode::Require => "require",
      SslMode::VerifyCa => "verify-ca",
      SslMode::VerifyFull => "verify-full",
    };
  }
}

impl fmt::Display for SslMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    return write!(f, "{}", self.as_str());
  }
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown ssl mode {value:?}, expected one of disable, allow, prefer, require, verify-ca, verify-full")]
pub struct UnknownSslMode {
  pub value: String,
}

impl FromStr for SslMode {
  type Err = UnknownSslMode;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    return match s.to_lowercase().as_ref() {
      "disable" => Ok(SslMode::Disable),
      "allow" => Ok(SslMode::Allow),
      "prefer" => Ok(SslMode::Prefer),
      "require" => Ok(SslMode::Require),
      "verify-ca" => Ok(SslMode::VerifyCa),
      "verify-full" => Ok(SslMode::VerifyFull),
      _ => Err(UnknownSslMode {
        value: s.to_owned(),
      }),
    };
  }
}

/// A server row as it already sits in the pgAdmin store.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
  pub id: i32,
  pub name: String,
  pub host: String,
  pub port: i32,
  pub username: String,
  pub ssl_mode: Option<SslMode>,
}

/// The server row we want to exist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewServer {
  pub name: String,
  pub host: String,
  pub port: u16,
  pub username: String,
  pub ssl_mode: SslMode,
  pub maintenance_db: String,
  pub password: Secret,
}

/// pgAdmin user and server group a new server row is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOwner {
  pub user_id: i32,
  pub server_group_id: i32,
}

/// Where an existing record no longer matches the configured server.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDrift {
  pub field: &'static str,
  pub stored: String,
  pub configured: String,
}

impl fmt::Display for FieldDrift {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    return write!(
      f,
      "{} (stored {}, configured {})",
      self.field, self.stored, self.configured
    );
  }
}

impl NewServer {
  /// Compares connection fields against a stored record, name and password excluded.
  pub fn drift_from(&self, existing: &ServerRecord) -> Vec<FieldDrift> {
    let mut drift = vec![];

    if existing.host != self.host {
      drift.push(FieldDrift {
        field: "host",
        stored: existing.host.clone(),
        configured: self.host.clone(),
      });
    }

    if existing.port != i32::from(self.port) {
      drift.push(FieldDrift {
        field: "port",
        stored: existing.port.to_string(),
        configured: self.port.to_string(),
      });
    }

    if existing.username != self.username {
      drift.push(FieldDrift {
        field: "username",
        stored: existing.username.clone(),
        configured: self.username.clone(),
      });
    }

    if existing.ssl_mode != Some(self.ssl_mode) {
      drift.push(FieldDrift {
        field: "ssl_mode",
        stored: existing
          .ssl_mode
          .map(|mode| mode.to_string())
          .unwrap_or_else(|| "<unset>".to_owned()),
        configured: self.ssl_mode.to_string(),
      });
    }

    return drift;
  }
}
