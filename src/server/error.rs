use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::{error, warn};
use serde_json::json;

use crate::{
    datasets::ValidationError,
    manager::{PredictionError, RetrainError},
};

/// Message returned for any prediction failure
pub static PREDICTION_FAILED: &str = "An error occurred while processing the prediction.";

/// Message returned for an upload the CSV reader could not parse
pub static MALFORMED_UPLOAD: &str = "The file could not be read as CSV.";

/// Message returned for any retrain failure not caused by the upload itself
pub static RETRAIN_FAILED: &str = "An error occurred while retraining the model.";

/// Every failure surfaced by the HTTP layer. Clients get a generic `{"error": ...}` body; the
/// full diagnostic only goes to the log.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The upload was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A prediction batch failed
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// A retrain failed
    #[error(transparent)]
    Retrain(RetrainError),

    /// The request body could not be read
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Something failed outside the model layer, such as page rendering
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RetrainError> for ApiError {
    fn from(err: RetrainError) -> Self {
        match err {
            RetrainError::Validation(err) => Self::Validation(err),
            other => Self::Retrain(other),
        }
    }
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrain(RetrainError::InProgress) => StatusCode::CONFLICT,
            ApiError::Prediction(_) | ApiError::Retrain(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The client-facing message
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(ValidationError::Malformed(_)) => MALFORMED_UPLOAD.to_string(),
            ApiError::Validation(err) => err.to_string(),
            ApiError::BadRequest(_) => "The request could not be read.".to_string(),
            ApiError::Retrain(RetrainError::InProgress) => {
                "A retrain is already in progress. Try again later.".to_string()
            }
            ApiError::Prediction(_) => PREDICTION_FAILED.to_string(),
            ApiError::Retrain(_) => RETRAIN_FAILED.to_string(),
            ApiError::Internal(_) => "An internal error occurred.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        manager::TrainingError,
        pipelines::PipelineError,
        store::StoreError,
    };

    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::from(RetrainError::Validation(ValidationError::MissingColumns(
            vec!["sdg".to_string()],
        )));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.message(), "missing required columns: sdg");

        let busy = ApiError::from(RetrainError::InProgress);
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let fit = ApiError::from(RetrainError::Training(TrainingError::Fit(PipelineError::Fit(
            "boom".to_string(),
        ))));
        assert_eq!(fit.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fit.message(), RETRAIN_FAILED);

        let store = ApiError::from(RetrainError::Store(StoreError::Format("v9".to_string())));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!store.message().contains("v9"));
    }

    #[test]
    fn test_parser_details_stay_out_of_the_response() {
        let err = ApiError::from(ValidationError::Malformed(
            "CSV error: record 2 (line: 3, byte: 24): found record with 3 fields".to_string(),
        ));

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), MALFORMED_UPLOAD);
        assert!(err.to_string().contains("found record with 3 fields"));
    }

    #[test]
    fn test_prediction_errors_hide_details() {
        let err = ApiError::from(PredictionError::Model("secret stack trace".to_string()));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), PREDICTION_FAILED);
    }
}
