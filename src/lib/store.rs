pub mod psql;
pub mod sqlite;

#[cfg(test)]
pub mod memory;

use slog::Logger;
use thiserror::Error;

use crate::config::StoreLocation;
use crate::server::NewServer;
use crate::server::ServerOwner;
use crate::server::ServerRecord;
use crate::server::SslMode;
use crate::store::psql::PsqlServerStore;
use crate::store::sqlite::SqliteServerStore;
use crate::types::ResultAnyError;

/// Handle on the pgAdmin configuration store.
pub trait ServerStore {
  /// Opens a unit of work, nothing is persisted until [`ServerTransaction::commit`].
  fn transaction(&mut self) -> ResultAnyError<Box<dyn ServerTransaction + '_>>;
}

impl<S: ServerStore + ?Sized> ServerStore for Box<S> {
  fn transaction(&mut self) -> ResultAnyError<Box<dyn ServerTransaction + '_>> {
    return (**self).transaction();
  }
}

/// Unit of work over the pgAdmin `server` table.
///
/// Dropping it without calling `commit` rolls everything back.
#[cfg_attr(test, mockall::automock)]
pub trait ServerTransaction {
  /// Blocks other transactions locking the same name until this one ends.
  fn lock_name(&mut self, name: &str) -> ResultAnyError<()>;

  fn find_by_name(&mut self, name: &str) -> ResultAnyError<Option<ServerRecord>>;

  /// Owner is the user with `owner_email`, or the lowest id user. The group is the
  /// owner's group called `server_group`, or the owner's lowest id group.
  fn resolve_owner(
    &mut self,
    owner_email: Option<String>,
    server_group: Option<String>,
  ) -> ResultAnyError<ServerOwner>;

  /// Returns the id of the inserted row.
  fn insert(&mut self, server: &NewServer, owner: ServerOwner) -> ResultAnyError<i32>;

  fn commit(&mut self) -> ResultAnyError<()>;
}

/// Opens the store backend matching `location`.
pub fn connect(location: &StoreLocation, logger: &Logger) -> ResultAnyError<Box<dyn ServerStore>> {
  return match location {
    StoreLocation::Postgres(uri) => Ok(Box::new(PsqlServerStore::connect(uri, logger)?)),
    StoreLocation::Sqlite(path) => Ok(Box::new(SqliteServerStore::open(path, logger)?)),
  };
}

/// `server` columns as both backends read them, nullable ones untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerRow {
  pub id: i32,
  pub name: String,
  pub host: Option<String>,
  pub port: Option<i32>,
  pub username: Option<String>,
  /// `sslmode` taken out of the `connection_params` json.
  pub ssl_mode: Option<String>,
}

impl ServerRow {
  pub fn into_record(self) -> ServerRecord {
    return ServerRecord {
      id: self.id,
      name: self.name,
      host: self.host.unwrap_or_default(),
      port: self.port.unwrap_or_default(),
      username: self.username.unwrap_or_default(),
      // Unknown modes read back as unset and surface as drift.
      ssl_mode: self.ssl_mode.and_then(|mode| mode.parse().ok()),
    };
  }
}

/// Value of pgAdmin's `connection_params` json column.
pub fn connection_params(ssl_mode: SslMode) -> String {
  return serde_json::json!({ "sslmode": ssl_mode.as_str() }).to_string();
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Too many servers named {name:?} ({row_count}), expecting at most 1")]
  TooManyRows { name: String, row_count: usize },

  #[error("pgAdmin user {email:?} is not found")]
  OwnerNotFound { email: Option<String> },

  #[error("Server group {name:?} is not found for pgAdmin user {user_id}")]
  ServerGroupNotFound { user_id: i32, name: Option<String> },

  #[error("Transaction is already finished")]
  TransactionFinished,
}
