//! Failure taxonomy for content creation.
//!
//! Every pipeline failure is carried as data on the result aggregate rather
//! than bubbling up as a fault. Recoverable conditions (connectivity,
//! configuration) demote the operating mode; `Validation` is fatal for the
//! call that produced it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// No network path or a liveness probe failed. Recoverable: the pipeline
    /// demotes its mode and keeps serving from the cache.
    #[error("connectivity: {0}")]
    Connectivity(String),

    /// Missing credential/model or a stage was invoked in the wrong mode.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Non-2xx or transport failure on a generation/synthesis call.
    #[error("service: {0}")]
    Service(String),

    /// The service answered, but the content failed structural parsing.
    /// Fatal for the call; no automatic retry.
    #[error("validation: {0}")]
    Validation(String),

    /// The offline route has no cached variants.
    #[error("cache miss: {0}")]
    CacheMiss(String),

    /// No command resolved for the requested category or kind.
    #[error("no command resolved: {0}")]
    MissingCommand(String),

    /// The resolved command declares zero speaker roles.
    #[error("no speaker roles: {0}")]
    MissingRoles(String),
}
