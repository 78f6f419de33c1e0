use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The route resolved to an empty hostname
    #[error("route {0} has no host value")]
    NoHostValue(String),

    /// The route lost a contest for its hostname
    #[error("{0}")]
    HostAlreadyClaimed(String),

    /// Failure reported by a downstream plugin, passed through untouched
    #[error(transparent)]
    Plugin(#[from] anyhow::Error),
}
