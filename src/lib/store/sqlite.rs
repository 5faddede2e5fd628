use std::convert::TryFrom;
use std::path::Path;
use std::time::Duration;

use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use slog::Logger;

use crate::server::NewServer;
use crate::server::ServerOwner;
use crate::server::ServerRecord;
use crate::store::ServerRow;
use crate::store::ServerStore;
use crate::store::ServerTransaction;
use crate::store::StoreError;
use crate::types::ResultAnyError;

/// How long a run waits on another writer holding the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// pgAdmin's default SQLite configuration database.
pub struct SqliteServerStore {
  connection: Connection,
  logger: Logger,
}

impl SqliteServerStore {
  /// The file has to exist already, pgAdmin creates it on first start.
  pub fn open(path: &Path, logger: &Logger) -> ResultAnyError<SqliteServerStore> {
    slog::debug!(logger, "Opening pgAdmin store"; "path" => path.display().to_string());

    let connection = Connection::open_with_flags(
      path,
      rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    return SqliteServerStore::from_connection(connection, logger);
  }

  pub fn from_connection(connection: Connection, logger: &Logger) -> ResultAnyError<SqliteServerStore> {
    connection.busy_timeout(BUSY_TIMEOUT)?;

    return Ok(SqliteServerStore {
      connection,
      logger: logger.clone(),
    });
  }
}

impl ServerStore for SqliteServerStore {
  fn transaction(&mut self) -> ResultAnyError<Box<dyn ServerTransaction + '_>> {
    let logger = self.logger.clone();

    // IMMEDIATE takes the database write lock up front, so lookup and insert
    // can't interleave with another writer.
    let tx = self
      .connection
      .transaction_with_behavior(TransactionBehavior::Immediate)?;

    return Ok(Box::new(SqliteServerTransaction {
      tx: Some(tx),
      logger,
    }));
  }
}

pub struct SqliteServerTransaction<'a> {
  // None once committed.
  tx: Option<Transaction<'a>>,
  logger: Logger,
}

impl<'a> SqliteServerTransaction<'a> {
  fn get(&mut self) -> Result<&mut Transaction<'a>, StoreError> {
    return self.tx.as_mut().ok_or(StoreError::TransactionFinished);
  }

  fn server_row(row: &Row<'_>) -> rusqlite::Result<ServerRow> {
    return Ok(ServerRow {
      id: row.get("id")?,
      name: row.get("name")?,
      host: row.get("host")?,
      port: row.get("port")?,
      username: row.get("username")?,
      ssl_mode: row.get("ssl_mode")?,
    });
  }

  fn find_user_id(&mut self, owner_email: Option<String>) -> ResultAnyError<i32> {
    let tx = self.get()?;

    let user_id: Option<i32> = match &owner_email {
      Some(email) => tx
        .query_row(r#"SELECT id FROM "user" WHERE email = ?1"#, params![email], |row| {
          row.get("id")
        })
        .optional()?,
      None => tx
        .query_row(r#"SELECT id FROM "user" ORDER BY id LIMIT 1"#, [], |row| {
          row.get("id")
        })
        .optional()?,
    };

    return user_id.ok_or_else(|| StoreError::OwnerNotFound { email: owner_email }.into());
  }

  fn find_server_group_id(
    &mut self,
    user_id: i32,
    server_group: Option<String>,
  ) -> ResultAnyError<i32> {
    let tx = self.get()?;

    let group_id: Option<i32> = match &server_group {
      Some(name) => tx
        .query_row(
          "SELECT id FROM servergroup WHERE user_id = ?1 AND name = ?2 ORDER BY id LIMIT 1",
          params![user_id, name],
          |row| row.get("id"),
        )
        .optional()?,
      None => tx
        .query_row(
          "SELECT id FROM servergroup WHERE user_id = ?1 ORDER BY id LIMIT 1",
          params![user_id],
          |row| row.get("id"),
        )
        .optional()?,
    };

    return group_id.ok_or_else(|| {
      StoreError::ServerGroupNotFound {
        user_id,
        name: server_group,
      }
      .into()
    });
  }
}

impl<'a> ServerTransaction for SqliteServerTransaction<'a> {
  /// Nothing to do, the IMMEDIATE transaction already excludes other writers.
  fn lock_name(&mut self, _name: &str) -> ResultAnyError<()> {
    self.get()?;

    return Ok(());
  }

  fn find_by_name(&mut self, name: &str) -> ResultAnyError<Option<ServerRecord>> {
    let query_str = indoc::indoc! {"
      SELECT id, name, host, port, username,
        json_extract(connection_params, '$.sslmode') AS ssl_mode
      FROM server
      WHERE name = ?1
      ORDER BY id
    "};

    let tx = self.get()?;
    let mut statement = tx.prepare(query_str)?;
    let mut rows = statement
      .query_map(params![name], |row| SqliteServerTransaction::server_row(row))?
      .collect::<rusqlite::Result<Vec<ServerRow>>>()?;

    if rows.len() > 1 {
      return Err(
        StoreError::TooManyRows {
          name: name.to_owned(),
          row_count: rows.len(),
        }
        .into(),
      );
    }

    return Ok(rows.pop().map(ServerRow::into_record));
  }

  fn resolve_owner(
    &mut self,
    owner_email: Option<String>,
    server_group: Option<String>,
  ) -> ResultAnyError<ServerOwner> {
    let user_id = self.find_user_id(owner_email)?;
    let server_group_id = self.find_server_group_id(user_id, server_group)?;

    return Ok(ServerOwner {
      user_id,
      server_group_id,
    });
  }

  fn insert(&mut self, server: &NewServer, owner: ServerOwner) -> ResultAnyError<i32> {
    let query_str = indoc::indoc! {"
      INSERT INTO server (
        user_id, servergroup_id, name, host, port, maintenance_db, username, password,
        save_password, use_ssh_tunnel, tunnel_authentication, shared, kerberos_conn,
        connection_params
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, 0, 0, 0, 0, ?9)
    "};

    let connection_params = crate::store::connection_params(server.ssl_mode);
    let tx = self.get()?;

    tx.execute(
      query_str,
      params![
        owner.user_id,
        owner.server_group_id,
        server.name,
        server.host,
        server.port,
        server.maintenance_db,
        server.username,
        server.password.expose(),
        connection_params,
      ],
    )?;

    let id = i32::try_from(tx.last_insert_rowid())?;

    slog::debug!(self.logger, "Inserted server row"; "id" => id, "name" => &server.name);

    return Ok(id);
  }

  fn commit(&mut self) -> ResultAnyError<()> {
    let tx = self.tx.take().ok_or(StoreError::TransactionFinished)?;

    tx.commit()?;

    return Ok(());
  }
}
