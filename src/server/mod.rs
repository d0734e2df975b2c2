use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    response::Html,
    routing::{get, post},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{
    config,
    datasets::{UploadedDataset, ValidationError},
    manager::{ClassificationReport, ModelManager, PredictionError},
    pipelines::Pipeline,
};

/// HTTP error responses
pub mod error;

pub use error::ApiError;

/// The multipart field carrying the uploaded CSV
pub static UPLOAD_FIELD: &str = "csv_file";

static INDEX_TEMPLATE: &str = include_str!("index.html");

/// Shared handler state
pub struct AppState<P: Pipeline> {
    manager: Arc<ModelManager<P>>,
}

impl<P: Pipeline> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

/// Body of `POST /predict_web`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    /// Raw texts to classify
    pub instances: Vec<String>,
}

/// One entry of the `POST /predict_web` response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Prediction {
    /// The predicted label
    pub prediction: String,

    /// The highest class probability
    pub probability: f64,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    classes: &'a [String],
    corpus_size: usize,
    trained_at: String,
    text_column: &'a str,
    label_column: &'a str,
}

/// Build the application router
pub fn router<P>(manager: Arc<ModelManager<P>>, max_upload_bytes: usize) -> Router
where
    P: Pipeline + 'static,
{
    Router::new()
        .route("/", get(index::<P>))
        .route("/health", get(health::<P>))
        .route("/predict_web", post(predict_web::<P>))
        .route("/retrain", post(retrain::<P>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(AppState { manager })
}

/// Serve the router until Ctrl-C
pub async fn serve<P>(manager: Arc<ModelManager<P>>, config: &config::Server) -> anyhow::Result<()>
where
    P: Pipeline + 'static,
{
    let app = router(manager, config.max_upload_bytes);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Unable to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}

async fn index<P: Pipeline + 'static>(State(state): State<AppState<P>>) -> Result<Html<String>, ApiError> {
    let version = state.manager.current();
    let validator = state.manager.validator();

    let context = IndexContext {
        classes: version.pipeline.classes(),
        corpus_size: version.corpus.len(),
        trained_at: version.trained_at.to_rfc3339(),
        text_column: validator.text_column(),
        label_column: validator.label_column(),
    };

    render(INDEX_TEMPLATE, &context)
        .map(Html)
        .map_err(|e| ApiError::Internal(format!("unable to render index: {}", e)))
}

fn render<T: Serialize>(source: &str, context: &T) -> Result<String, liquid::Error> {
    let template = liquid::ParserBuilder::with_stdlib().build()?.parse(source)?;
    let globals = liquid::model::to_object(context)?;

    template.render(&globals)
}

async fn health<P: Pipeline + 'static>(State(state): State<AppState<P>>) -> Json<Value> {
    let version = state.manager.current();

    Json(json!({
        "status": "ok",
        "classes": version.pipeline.classes().len(),
        "corpus_size": version.corpus.len(),
        "trained_at": version.trained_at.to_rfc3339(),
    }))
}

async fn predict_web<P: Pipeline + 'static>(
    State(state): State<AppState<P>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Vec<Prediction>>, ApiError> {
    info!("Request received on /predict_web");

    // Unreadable bodies count as a prediction failure, same as any other
    let Json(request) = body.map_err(|e| PredictionError::Input(e.body_text()))?;

    let manager = state.manager.clone();
    let results = tokio::task::spawn_blocking(move || manager.predict(&request.instances))
        .await
        .map_err(|e| PredictionError::Model(format!("prediction task failed: {}", e)))??;

    let predictions = results
        .into_iter()
        .map(|result| Prediction {
            prediction: result.label,
            probability: result.confidence,
        })
        .collect::<Vec<_>>();

    debug!("Predictions: {:?}", predictions);

    Ok(Json(predictions))
}

async fn retrain<P: Pipeline + 'static>(
    State(state): State<AppState<P>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationReport>, ApiError> {
    info!("Request received on /retrain");

    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        state.manager.validator().check_file_name(&file_name)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or(ValidationError::MissingFile)?;

    let manager = state.manager.clone();
    let report = tokio::task::spawn_blocking(move || {
        // The spooled file is removed when `dataset` drops, on every path out of here
        let dataset = UploadedDataset::spool(file_name, &bytes)
            .map_err(|e| ApiError::Internal(format!("unable to spool upload: {}", e)))?;

        manager.retrain(&dataset).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("retrain task failed: {}", e)))??;

    info!(
        "Retrain added {} rows, corpus now {} rows",
        report.added, report.total
    );

    Ok(Json(report.report))
}
