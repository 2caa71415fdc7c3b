use std::path::PathBuf;

use failure::Fail;

/// Errors raised by the output writers and worker pool (§4.9, §4.10, §7).
#[derive(Debug, Fail)]
pub enum ApiError {
    #[fail(display = "failed to write {}: {}", _0, _1)]
    Write(PathBuf, String),

    #[fail(display = "failed to serialize config snapshot: {}", _0)]
    Snapshot(String),

    #[fail(display = "round {} panicked in the worker pool", _0)]
    WorkerPanicked(usize),

    #[fail(display = "config error: {}", _0)]
    Config(#[fail(cause)] sim_config::ConfigError),

    #[fail(display = "round engine error: {}", _0)]
    Engine(#[fail(cause)] sim_servers::ServerError),
}

impl From<sim_config::ConfigError> for ApiError {
    fn from(e: sim_config::ConfigError) -> Self {
        ApiError::Config(e)
    }
}

impl From<sim_servers::ServerError> for ApiError {
    fn from(e: sim_servers::ServerError) -> Self {
        ApiError::Engine(e)
    }
}
