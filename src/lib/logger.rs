use slog::*;

/// Builds the root logger, writing to stderr so stdout only carries the
/// registration status line.
///
/// Log records go through an async drain, hold on to the returned logger until
/// the process is about to exit so pending records get flushed when it drops.
pub fn create() -> Logger {
  let log_decorator = slog_term::TermDecorator::new().stderr().build();
  let log_drain = slog_term::CompactFormat::new(log_decorator).build().fuse();
  let rust_log_val = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
  let log_drain = slog_envlogger::LogBuilder::new(log_drain)
    .parse(&rust_log_val)
    .build();

  let log_drain = slog_async::Async::new(log_drain).build().fuse();

  return slog::Logger::root(log_drain, o!("app" => "pgadmin-registrar"));
}

/// Logger that drops everything, for tests.
#[cfg(test)]
pub fn discard() -> Logger {
  return slog::Logger::root(slog::Discard, o!());
}
