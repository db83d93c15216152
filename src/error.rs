//! Error types for the RUSLE core.

/// HTTP request error wrapper.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("HTTP request failed: {}", source)]
pub struct HttpError {
    /// The underlying reqwest error.
    source: reqwest::Error,
    /// Line number where the error occurred.
    line: u32,
    /// File where the error occurred.
    file: &'static str,
}

impl HttpError {
    /// Creates a new HTTP error with caller location.
    #[track_caller]
    pub fn new(source: reqwest::Error) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            source,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for HttpError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::new(source)
    }
}

/// JSON serialization/deserialization error wrapper.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("JSON error: {}", source)]
pub struct JsonError {
    source: serde_json::Error,
    line: u32,
    file: &'static str,
}

impl JsonError {
    #[track_caller]
    pub fn new(source: serde_json::Error) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            source,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for JsonError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        Self::new(source)
    }
}

/// URL parsing error wrapper.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("Invalid URL: {}", source)]
pub struct UrlError {
    source: url::ParseError,
    line: u32,
    file: &'static str,
}

impl UrlError {
    #[track_caller]
    pub fn new(source: url::ParseError) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            source,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<url::ParseError> for UrlError {
    #[track_caller]
    fn from(source: url::ParseError) -> Self {
        Self::new(source)
    }
}

/// File I/O error wrapper.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("I/O error: {}", source)]
pub struct IoError {
    source: std::io::Error,
    line: u32,
    file: &'static str,
}

impl IoError {
    #[track_caller]
    pub fn new(source: std::io::Error) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            source,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for IoError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::new(source)
    }
}

/// Raster (GeoTIFF/PNG) encode error wrapper.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_getters::Getters)]
#[display("raster encode error: {}", message)]
pub struct RasterError {
    message: String,
    line: u32,
    file: &'static str,
}

impl RasterError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Specific error conditions for the RUSLE core.
#[derive(Debug, derive_more::Display, derive_more::From)]
pub enum ErrorKind {
    /// HTTP request error talking to the raster-compute service.
    #[display("{}", _0)]
    #[from]
    Http(HttpError),

    /// JSON serialization/deserialization error.
    #[display("{}", _0)]
    #[from]
    Json(JsonError),

    /// URL parsing error.
    #[display("{}", _0)]
    #[from]
    Url(UrlError),

    /// File I/O error.
    #[display("{}", _0)]
    #[from]
    Io(IoError),

    /// Raster encode error (GeoTIFF/PNG).
    #[display("{}", _0)]
    #[from]
    Raster(RasterError),

    /// Raster-compute service returned an application-level error envelope.
    #[display("raster-compute service error {}: {}", code, message)]
    Api {
        /// Error code from the service.
        code: i32,
        /// Error message from the service.
        message: String,
    },

    /// Request input failed validation before any work was scheduled.
    #[display("invalid input: {}", _0)]
    InvalidInput(String),

    /// Geometry is empty, self-intersecting, or its area could not be computed.
    #[display("invalid geometry: {}", _0)]
    InvalidGeometry(String),

    /// Raster-compute service returned no usable pixels for the region/year.
    #[display("no data available for area={} year={}", area, year)]
    NoDataAvailable {
        /// Human-readable area identifier.
        area: String,
        /// Year or year range label.
        year: String,
    },

    /// A remote operation exceeded its wall-clock guard.
    #[display("computation timed out after {}s", secs)]
    ComputationTimeout {
        /// Configured timeout, in seconds.
        secs: u64,
    },

    /// The raster-compute service could not be reached at all.
    #[display("raster-compute service unavailable: {}", _0)]
    RasterServiceUnavailable(String),

    /// The task broker could not accept an enqueue.
    #[display("task broker unavailable: {}", _0)]
    BrokerUnavailable(String),

    /// A requested tile does not exist on disk.
    #[display("tile not found: {}", _0)]
    MissingTile(String),

    /// A registry transition was attempted from an incompatible state.
    #[display("state conflict: {}", _0)]
    Conflict(String),

    /// Generic error for other cases.
    #[display("{}", _0)]
    Other(String),
}

impl ErrorKind {
    /// A short, stable discriminant name for this kind of error, persisted
    /// alongside `error_message` so callers can branch on failure class
    /// without parsing the display string (spec §3.1/§4.5/§7).
    pub fn error_type(&self) -> &'static str {
        match self {
            ErrorKind::Http(_) => "Http",
            ErrorKind::Json(_) => "Json",
            ErrorKind::Url(_) => "Url",
            ErrorKind::Io(_) => "Io",
            ErrorKind::Raster(_) => "Raster",
            ErrorKind::Api { .. } => "Api",
            ErrorKind::InvalidInput(_) => "InvalidInput",
            ErrorKind::InvalidGeometry(_) => "InvalidGeometry",
            ErrorKind::NoDataAvailable { .. } => "NoDataAvailable",
            ErrorKind::ComputationTimeout { .. } => "ComputationTimeout",
            ErrorKind::RasterServiceUnavailable(_) => "RasterServiceUnavailable",
            ErrorKind::BrokerUnavailable(_) => "BrokerUnavailable",
            ErrorKind::MissingTile(_) => "MissingTile",
            ErrorKind::Conflict(_) => "Conflict",
            ErrorKind::Other(_) => "Other",
        }
    }
}

/// Macro to generate bridge From implementations for external errors.
macro_rules! bridge_error {
    ($external:ty => $wrapper:ty) => {
        impl From<$external> for ErrorKind {
            #[track_caller]
            fn from(err: $external) -> Self {
                <$wrapper>::from(err).into()
            }
        }
    };
}

bridge_error!(reqwest::Error => HttpError);
bridge_error!(serde_json::Error => JsonError);
bridge_error!(url::ParseError => UrlError);
bridge_error!(std::io::Error => IoError);

/// The main error type for the RUSLE core.
///
/// Wraps all error conditions and provides automatic conversion from
/// underlying error types through the `?` operator.
#[derive(Debug, derive_more::Display)]
#[display("rusle-core: {}", _0)]
pub struct Error(Box<ErrorKind>);

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.0 {
            ErrorKind::Http(e) => Some(e.source()),
            ErrorKind::Json(e) => Some(e.source()),
            ErrorKind::Url(e) => Some(e.source()),
            ErrorKind::Io(e) => Some(e.source()),
            _ => None,
        }
    }
}

impl Error {
    /// Returns a reference to the underlying error kind.
    ///
    /// The orchestrator uses this to map errors onto the HTTP status codes
    /// named in spec §7 without the core depending on any HTTP framework type.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Shorthand for `self.kind().error_type()`.
    pub fn error_type(&self) -> &'static str {
        self.0.error_type()
    }

    /// Shorthand constructor for [`ErrorKind::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ErrorKind::InvalidInput(message.into()).into()
    }

    /// Shorthand constructor for [`ErrorKind::InvalidGeometry`].
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        ErrorKind::InvalidGeometry(message.into()).into()
    }

    /// Shorthand constructor for [`ErrorKind::NoDataAvailable`].
    pub fn no_data_available(area: impl Into<String>, year: impl Into<String>) -> Self {
        ErrorKind::NoDataAvailable {
            area: area.into(),
            year: year.into(),
        }
        .into()
    }

    /// Shorthand constructor for [`ErrorKind::ComputationTimeout`].
    pub fn computation_timeout(secs: u64) -> Self {
        ErrorKind::ComputationTimeout { secs }.into()
    }

    /// Shorthand constructor for [`ErrorKind::MissingTile`].
    pub fn missing_tile(message: impl Into<String>) -> Self {
        ErrorKind::MissingTile(message.into()).into()
    }

    /// Shorthand constructor for [`ErrorKind::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        ErrorKind::Conflict(message.into()).into()
    }
}

/// Macro to implement `From<SourceError>` for [`Error`], logging once at
/// construction time.
macro_rules! error_from {
    ($source:ty) => {
        impl From<$source> for Error {
            #[track_caller]
            fn from(err: $source) -> Self {
                let kind = ErrorKind::from(err);
                tracing::error!(error_kind = %kind, "error created");
                Self(Box::new(kind))
            }
        }
    };
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        tracing::error!(error_kind = %kind, "error created");
        Self(Box::new(kind))
    }
}

error_from!(reqwest::Error);
error_from!(serde_json::Error);
error_from!(url::ParseError);
error_from!(std::io::Error);
error_from!(RasterError);

/// Result type alias using this crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_matches_the_constructed_kind() {
        assert_eq!(Error::no_data_available("RR-01", "2023").error_type(), "NoDataAvailable");
        assert_eq!(Error::computation_timeout(30).error_type(), "ComputationTimeout");
        assert_eq!(Error::invalid_geometry("bad polygon").error_type(), "InvalidGeometry");
    }
}
