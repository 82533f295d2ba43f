use crate::api::error::ApiError;
use crate::config::ConfigError;
use crate::output::error::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Location discovery failed")]
    Discovery(#[source] ApiError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
