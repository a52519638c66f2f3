use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use anyhow::Error as ANYHOW_ERROR;
use std::{env::VarError, io::Error as IO_ERROR};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    AnyHowError(#[from] ANYHOW_ERROR),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            // 500 Internal Server Error - nothing here is caused by the client
            Error::Io(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::ConfigurationError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::AnyHowError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
