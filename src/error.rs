//! Error types for report editing and export

use thiserror::Error;

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why an edit was refused. The model is never touched when one of these is
/// returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationRejection {
    /// Selected file exceeds the configured upload limit
    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// File could not be identified or decoded as an image
    #[error("image could not be read: {0}")]
    Unreadable(String),

    /// Quantity is not a non-negative integer (strict quantity mode)
    #[error("quantity must be a non-negative whole number, got '{0}'")]
    InvalidQuantity(String),

    /// Field is computed from the item list and cannot be entered by hand
    #[error("'{0}' is derived from the item quantities")]
    DerivedField(String),

    /// Field name does not exist on the report or item
    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Errors that can occur while editing or exporting a report
#[derive(Error, Debug)]
pub enum Error {
    /// Input refused before any mutation happened
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationRejection),

    /// A single image did not decode within its bound
    #[error("Image did not load within {0}ms")]
    ImageLoadTimeout(u64),

    /// Failed to decode an embedded image
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    /// The rasterizer produced an empty or malformed bitmap
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The bitmap could not be serialized, or the result was implausibly small
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Another export or print is still running
    #[error("An export is already in progress")]
    ExportInFlight,

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Unrecoverable export error, reported to the user
    #[error("Export failed: {0}")]
    Export(String),

    /// Saving the file or driving the print window failed
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for conditions the pipeline recovers from on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ImageLoadTimeout(_) | Error::ImageDecode(_) | Error::Render(_) | Error::Encode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_into_error() {
        let err: Error = ValidationRejection::TooLarge { size: 10, max: 5 }.into();
        assert!(matches!(err, Error::Validation(ValidationRejection::TooLarge { .. })));
        assert!(err.to_string().contains("limit is 5 bytes"));
    }

    #[test]
    fn recoverable_classification() {
        assert!(Error::ImageLoadTimeout(4000).is_recoverable());
        assert!(Error::Render("empty".into()).is_recoverable());
        assert!(Error::Encode("too small".into()).is_recoverable());
        assert!(!Error::ExportInFlight.is_recoverable());
        assert!(!Error::Export("boom".into()).is_recoverable());
    }
}
