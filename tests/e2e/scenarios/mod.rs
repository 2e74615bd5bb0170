mod auth;
mod config;
mod polling;
mod redaction;
mod scenes;
mod transport_failure;
