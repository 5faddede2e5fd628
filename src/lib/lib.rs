pub mod cli;
pub mod config;
pub mod logger;
pub mod registrar;
pub mod secret;
pub mod server;
pub mod store;
pub mod types;
