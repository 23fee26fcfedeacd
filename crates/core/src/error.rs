use std::{future::Future, pin::Pin};

use ops_console_transit::TransitError;

use crate::incident::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{endpoint} returned {status}: {message}")]
    Api {
        status: u16,
        endpoint: String,
        message: String,
    },

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Text for the error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "The request timed out. Please try again.".to_owned(),
            Self::Http(_) => "Could not reach the server. Check your connection and try again.".to_owned(),
            Self::Api { status: 404, .. } => "The requested record could not be found.".to_owned(),
            Self::Api { status: 409, .. } => {
                "This incident was changed by someone else. Reload it before saving again.".to_owned()
            }
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Api { status, .. } => format!("The server responded with an error ({status})."),
            Self::Validation(e) => e.to_string(),
            Self::Transit(e) => format!("Reference data problem: {e}"),
            Self::InvalidUrl(_) | Self::Json(_) | Self::Config(_) => {
                "Something went wrong. Please contact support if it keeps happening.".to_owned()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

pub type ConsoleFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;
