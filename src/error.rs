use thiserror::Error;

/// Failures local to a single page. None of them are retried here.
#[derive(Error, Debug)]
pub enum DescrambleError {
    #[error("You do not have access to this content")]
    AccessDenied,

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Invalid page geometry: {width}x{height}")]
    GeometryInvalid { width: i64, height: i64 },

    #[error("A session token is required to decrypt the descriptor")]
    MissingSessionToken,

    #[error(transparent)]
    BitmapDecode(#[from] image::ImageError),
}

impl DescrambleError {
    /// Data integrity failures, as opposed to entitlement or codec failures.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            DescrambleError::MalformedDescriptor(_) | DescrambleError::GeometryInvalid { .. }
        )
    }
}
