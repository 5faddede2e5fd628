use std::fmt;

use crate::config::ConfigError;

/// Credential handed to pgAdmin as the server password.
///
/// The value never shows up in `Debug` output so it can't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  /// Reads the secret from `env_var` through `lookup`.
  ///
  /// Returns `None` when the variable is unset or empty, callers treat both the same.
  /// Lookup failures, e.g. a value that is not valid unicode, are passed through.
  pub fn from_lookup<F>(env_var: &str, lookup: F) -> Result<Option<Secret>, ConfigError>
  where
    F: Fn(&str) -> Result<Option<String>, ConfigError>,
  {
    return Ok(
      lookup(env_var)?
        .filter(|value| !value.is_empty())
        .map(Secret),
    );
  }

  pub fn expose(&self) -> &str {
    return &self.0;
  }
}

impl From<&str> for Secret {
  fn from(value: &str) -> Self {
    return Secret(value.to_owned());
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    return write!(f, "Secret(***)");
  }
}
