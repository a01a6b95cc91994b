//! Global error handling module for the Drama Scraper API
//!
//! This module provides a unified error type that handles all application errors
//! and converts them to appropriate HTTP responses with consistent JSON structure.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::ApiError;
use crate::scraper::ScraperError;

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Scraping-related errors (network, HTTP, parsing)
    #[error("Scraping error: {0}")]
    Scraping(#[from] ScraperError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (bad request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // The upstream site failed us, not the caller
            AppError::Scraping(ScraperError::HttpError(404)) => StatusCode::NOT_FOUND,
            AppError::Scraping(ScraperError::RateLimited) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Scraping(_) => StatusCode::BAD_GATEWAY,

            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),

            AppError::Config(_) => "Server is misconfigured".to_string(),

            AppError::Scraping(scraper_err) => match scraper_err {
                ScraperError::NetworkError(msg) => format!("Failed to connect to site: {}", msg),
                ScraperError::HttpError(status) => {
                    format!("Site returned error status: {}", status)
                }
                ScraperError::ResponseError(msg) => format!("Failed to read response: {}", msg),
                ScraperError::RateLimited => {
                    "Site is rate limiting requests, please try again later".to_string()
                }
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_response = ApiError::new(self.user_message());

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
