use std::path::PathBuf;
use thiserror::Error;

/// Common Result type alias
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while locating or reading view sources
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("View not found: {}", path.display())]
    ViewNotFound { path: PathBuf },
}

impl CommonError {
    pub fn view_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ViewNotFound { path: path.into() }
    }
}
