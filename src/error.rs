//! Error types and handling for `WeatherLens`

use thiserror::Error;

/// Main error type for the `WeatherLens` library
#[derive(Error, Debug)]
pub enum WeatherLensError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport errors: unreachable host, timeout, middleware failure
    #[error("API error: {message}")]
    Api { message: String },

    /// The forecast API answered with a non-success status
    #[error("API returned status {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    /// The forecast API answered with a body that could not be decoded
    #[error("Malformed API response: {message}")]
    Parse { message: String },

    /// A required input (the pin) is not available
    #[error("Missing input: {message}")]
    MissingInput { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Country dataset could not be used
    #[error("Geometry error: {message}")]
    Geometry { message: String },

    /// CSV serialization errors
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherLensError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn status<S: Into<String>>(status: u16, endpoint: S) -> Self {
        Self::Status {
            status,
            endpoint: endpoint.into(),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// The error raised when a forecast or export is requested without a pin
    #[must_use]
    pub fn missing_pin() -> Self {
        Self::MissingInput {
            message: "Please place a pin on the map before predicting.".to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn geometry<S: Into<String>>(message: S) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    /// Whether the error is a recoverable transport failure
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WeatherLensError::Api { .. }
                | WeatherLensError::Status { .. }
                | WeatherLensError::Parse { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherLensError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            WeatherLensError::Api { .. }
            | WeatherLensError::Status { .. }
            | WeatherLensError::Parse { .. } => "API calling error".to_string(),
            WeatherLensError::MissingInput { message } => message.clone(),
            WeatherLensError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            WeatherLensError::Geometry { .. } => "Country outlines are unavailable.".to_string(),
            WeatherLensError::Csv { .. } => "Could not build the CSV export.".to_string(),
            WeatherLensError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for WeatherLensError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WeatherLensError::parse(err.to_string())
        } else {
            WeatherLensError::api(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for WeatherLensError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => WeatherLensError::api(err.to_string()),
        }
    }
}
