use anyhow::anyhow;

use crate::server::NewServer;
use crate::server::ServerOwner;
use crate::server::ServerRecord;
use crate::store::ServerStore;
use crate::store::ServerTransaction;
use crate::store::StoreError;
use crate::types::ResultAnyError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredServer {
  pub record: ServerRecord,
  pub password: String,
  pub owner: ServerOwner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredUser {
  pub id: i32,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredServerGroup {
  pub id: i32,
  pub user_id: i32,
  pub name: String,
}

/// Store double keeping rows in `Vec`s, writes become visible on commit only.
pub struct InMemoryServerStore {
  pub servers: Vec<StoredServer>,
  pub users: Vec<StoredUser>,
  pub server_groups: Vec<StoredServerGroup>,
  pub fail_commit: bool,
  pub transaction_count: usize,
  /// Names passed to `lock_name`, in call order.
  pub locked_names: Vec<String>,
}

impl Default for InMemoryServerStore {
  fn default() -> Self {
    return InMemoryServerStore {
      servers: vec![],
      users: vec![StoredUser {
        id: 1,
        email: "admin@example.com".to_owned(),
      }],
      server_groups: vec![StoredServerGroup {
        id: 1,
        user_id: 1,
        name: "Servers".to_owned(),
      }],
      fail_commit: false,
      transaction_count: 0,
      locked_names: vec![],
    };
  }
}

impl InMemoryServerStore {
  pub fn with_servers(servers: Vec<StoredServer>) -> InMemoryServerStore {
    return InMemoryServerStore {
      servers,
      ..Default::default()
    };
  }

  pub fn named(&self, name: &str) -> Vec<&StoredServer> {
    return self
      .servers
      .iter()
      .filter(|server| server.record.name == name)
      .collect();
  }
}

impl ServerStore for InMemoryServerStore {
  fn transaction(&mut self) -> ResultAnyError<Box<dyn ServerTransaction + '_>> {
    self.transaction_count += 1;

    let staged = self.servers.clone();

    return Ok(Box::new(InMemoryTransaction {
      store: self,
      staged,
      finished: false,
    }));
  }
}

pub struct InMemoryTransaction<'a> {
  store: &'a mut InMemoryServerStore,
  staged: Vec<StoredServer>,
  finished: bool,
}

impl<'a> InMemoryTransaction<'a> {
  fn ensure_open(&self) -> Result<(), StoreError> {
    if self.finished {
      return Err(StoreError::TransactionFinished);
    }

    return Ok(());
  }
}

impl<'a> ServerTransaction for InMemoryTransaction<'a> {
  fn lock_name(&mut self, name: &str) -> ResultAnyError<()> {
    self.ensure_open()?;
    self.store.locked_names.push(name.to_owned());

    return Ok(());
  }

  fn find_by_name(&mut self, name: &str) -> ResultAnyError<Option<ServerRecord>> {
    self.ensure_open()?;

    let mut matches: Vec<ServerRecord> = self
      .staged
      .iter()
      .filter(|server| server.record.name == name)
      .map(|server| server.record.clone())
      .collect();

    if matches.len() > 1 {
      return Err(
        StoreError::TooManyRows {
          name: name.to_owned(),
          row_count: matches.len(),
        }
        .into(),
      );
    }

    return Ok(matches.pop());
  }

  fn resolve_owner(
    &mut self,
    owner_email: Option<String>,
    server_group: Option<String>,
  ) -> ResultAnyError<ServerOwner> {
    self.ensure_open()?;

    let user = self
      .store
      .users
      .iter()
      .filter(|user| owner_email.as_ref().map_or(true, |email| &user.email == email))
      .min_by_key(|user| user.id)
      .ok_or_else(|| StoreError::OwnerNotFound {
        email: owner_email.clone(),
      })?;

    let group = self
      .store
      .server_groups
      .iter()
      .filter(|group| group.user_id == user.id)
      .filter(|group| server_group.as_ref().map_or(true, |name| &group.name == name))
      .min_by_key(|group| group.id)
      .ok_or_else(|| StoreError::ServerGroupNotFound {
        user_id: user.id,
        name: server_group.clone(),
      })?;

    return Ok(ServerOwner {
      user_id: user.id,
      server_group_id: group.id,
    });
  }

  fn insert(&mut self, server: &NewServer, owner: ServerOwner) -> ResultAnyError<i32> {
    self.ensure_open()?;

    let id = self
      .staged
      .iter()
      .map(|server| server.record.id)
      .max()
      .unwrap_or(0)
      + 1;

    self.staged.push(StoredServer {
      record: ServerRecord {
        id,
        name: server.name.clone(),
        host: server.host.clone(),
        port: i32::from(server.port),
        username: server.username.clone(),
        ssl_mode: Some(server.ssl_mode),
      },
      password: server.password.expose().to_owned(),
      owner,
    });

    return Ok(id);
  }

  fn commit(&mut self) -> ResultAnyError<()> {
    self.ensure_open()?;
    self.finished = true;

    if self.store.fail_commit {
      return Err(anyhow!("connection reset by peer"));
    }

    self.store.servers = std::mem::take(&mut self.staged);

    return Ok(());
  }
}

#[cfg(test)]
mod test {
  use super::*;

  mod commit {
    use super::*;

    #[test]
    fn it_should_refuse_second_commit() {
      let mut store = InMemoryServerStore::with_servers(vec![StoredServer {
        record: ServerRecord {
          id: 1,
          name: "reporting".to_owned(),
          host: "reporting-db".to_owned(),
          port: 5433,
          username: "reporter".to_owned(),
          ssl_mode: None,
        },
        password: "reporter-secret".to_owned(),
        owner: ServerOwner {
          user_id: 1,
          server_group_id: 1,
        },
      }]);

      {
        let mut tx = store.transaction().unwrap();

        tx.commit().unwrap();
        let err = tx.commit().unwrap_err();

        assert!(matches!(
          err.downcast_ref::<StoreError>(),
          Some(StoreError::TransactionFinished)
        ));
      }

      assert_eq!(store.named("reporting").len(), 1);
    }
  }
}
