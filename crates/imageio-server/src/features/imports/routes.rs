//! Import API routes
//!
//! `POST /api/v1/brands/:id/imports` takes a multipart body with the spreadsheet in the
//! `file` field. Two response modes:
//!
//! - **Streaming** (`?stream=true` or `Accept: application/x-ndjson`): `200 OK` with an
//!   NDJSON body of progress events; the batch runs in its own task and keeps going if
//!   the client disconnects. Failures before the first row arrive as one `{"error"}` line.
//! - **Blocking**: the batch runs to completion and the response is `303 See Other` to
//!   the brand page, with the import report as the JSON body.

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::db::StoreError;
use crate::features::shared::validate_id;
use crate::features::FeatureState;
use crate::ingest::orchestrator::redirect_for;
use crate::ingest::{
    BatchGuard, BatchPlan, ChannelProgress, ImportReport, NoopProgress, RowSource, SourceError,
};
use crate::models::Brand;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::{Stream, StreamExt};
use imageio_common::progress::{ProgressEvent, NDJSON_CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::limit::RequestBodyLimitLayer;

use super::upload::{spool_upload, SpooledUpload, UploadError};

/// Progress events buffered ahead of a slow client
const PROGRESS_BUFFER: usize = 64;

pub fn imports_routes(max_upload_bytes: usize) -> Router<FeatureState> {
    Router::new()
        .route("/:id/imports", post(import_spreadsheet))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}

#[derive(Debug, Default, Deserialize)]
struct ImportParams {
    #[serde(default)]
    stream: bool,
}

/// Body of a blocking import response
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    #[serde(flatten)]
    pub report: ImportReport,
    pub message: String,
    pub redirect: String,
}

impl ImportResponse {
    fn new(report: ImportReport, brand_id: i64) -> Self {
        Self {
            message: report.summary(),
            redirect: redirect_for(brand_id),
            report,
        }
    }
}

/// Everything checked and acquired before the first row is processed
struct PreparedImport {
    brand: Brand,
    plan: BatchPlan,
    source: RowSource,
    upload: SpooledUpload,
    guard: BatchGuard,
}

/// Import a spreadsheet into a brand
///
/// # Response
///
/// - `200 OK` - NDJSON progress stream (streaming mode)
/// - `303 See Other` - Batch finished, or the spreadsheet was unreadable or empty (blocking mode)
/// - `400 Bad Request` - No file uploaded
/// - `404 Not Found` - Brand not found
/// - `409 Conflict` - An import for the brand is already running
#[tracing::instrument(skip(state, headers, multipart))]
async fn import_spreadsheet(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
    Query(params): Query<ImportParams>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let streaming = params.stream || accepts_ndjson(&headers);

    match prepare(&state, id, multipart).await {
        Ok(prepared) if streaming => stream_import(&state, prepared),
        Ok(prepared) => run_import(&state, prepared).await,
        Err(e) if streaming => {
            e.log();
            ndjson_response(futures::stream::iter([ProgressEvent::error(e.public_message())]))
        },
        Err(ImportApiError::Source(e)) => {
            tracing::warn!(brand_id = id, error = %e, "Import aborted");
            see_other(ImportResponse::new(ImportReport::aborted(&e), id))
        },
        Err(e) => e.into_response(),
    }
}

async fn prepare(
    state: &FeatureState,
    id: i64,
    multipart: Multipart,
) -> Result<PreparedImport, ImportApiError> {
    if !validate_id(id) {
        return Err(ImportApiError::InvalidId);
    }

    let brand = state
        .store
        .get_brand(id)
        .await?
        .ok_or(ImportApiError::BrandNotFound(id))?;
    let guard = state
        .locks
        .try_acquire(id)
        .ok_or(ImportApiError::ImportRunning(id))?;

    let upload = spool_upload(multipart).await?;
    tracing::debug!(
        brand_id = id,
        bytes = upload.bytes,
        name = ?upload.declared_name,
        "Spreadsheet received"
    );

    let source = RowSource::open(
        upload.path(),
        upload.declared_name.as_deref(),
        state.media.max_images_per_item,
    )?;
    let plan = state.orchestrator.plan(&source).await?;

    Ok(PreparedImport {
        brand,
        plan,
        source,
        upload,
        guard,
    })
}

fn stream_import(state: &FeatureState, prepared: PreparedImport) -> Response {
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let orchestrator = state.orchestrator.clone();

    tokio::spawn(async move {
        let PreparedImport {
            brand,
            plan,
            source,
            upload,
            guard,
        } = prepared;

        let sink = ChannelProgress::new(tx);
        orchestrator.run(&source, &brand, plan, &sink).await;

        drop(upload);
        drop(guard);
    });

    ndjson_response(ReceiverStream::new(rx))
}

async fn run_import(state: &FeatureState, prepared: PreparedImport) -> Response {
    let brand_id = prepared.brand.id;
    let report = state
        .orchestrator
        .run(&prepared.source, &prepared.brand, prepared.plan, &NoopProgress)
        .await;
    drop(prepared);

    tracing::info!(
        brand_id,
        items_processed = report.items_processed,
        items_failed = report.items_failed,
        "Import completed via API"
    );

    see_other(ImportResponse::new(report, brand_id))
}

fn see_other(response: ImportResponse) -> Response {
    let location = response.redirect.clone();
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(response)),
    )
        .into_response()
}

fn accepts_ndjson(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(NDJSON_CONTENT_TYPE))
}

/// One JSON line per event, flushed as each event arrives
fn ndjson_response<S>(events: S) -> Response
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    let body = Body::from_stream(events.map(|event| event.to_line()));
    (
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum ImportApiError {
    InvalidId,
    BrandNotFound(i64),
    ImportRunning(i64),
    Upload(UploadError),
    Source(SourceError),
    Store(StoreError),
}

impl From<UploadError> for ImportApiError {
    fn from(err: UploadError) -> Self {
        Self::Upload(err)
    }
}

impl From<SourceError> for ImportApiError {
    fn from(err: SourceError) -> Self {
        Self::Source(err)
    }
}

impl From<StoreError> for ImportApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl ImportApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId | Self::Upload(UploadError::MissingFile | UploadError::Multipart(_)) => {
                StatusCode::BAD_REQUEST
            },
            Self::BrandNotFound(_) => StatusCode::NOT_FOUND,
            Self::ImportRunning(_) => StatusCode::CONFLICT,
            Self::Source(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upload(UploadError::Io(_)) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidId | Self::Upload(UploadError::MissingFile | UploadError::Multipart(_)) => {
                "VALIDATION_ERROR"
            },
            Self::BrandNotFound(_) => "NOT_FOUND",
            Self::ImportRunning(_) => "CONFLICT",
            Self::Source(_) => "UNREADABLE_SPREADSHEET",
            Self::Upload(UploadError::Io(_)) | Self::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to clients
    fn public_message(&self) -> String {
        match self {
            Self::Upload(UploadError::Io(_)) => "Failed to store the upload".to_string(),
            Self::Store(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        if self.status().is_server_error() {
            tracing::error!("Import failed before processing: {}", self);
        } else {
            tracing::warn!("Import rejected: {}", self);
        }
    }
}

impl IntoResponse for ImportApiError {
    fn into_response(self) -> Response {
        self.log();
        let error = ErrorResponse::new(self.code(), self.public_message());
        (self.status(), Json(error)).into_response()
    }
}

impl std::fmt::Display for ImportApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId => write!(f, "Brand id must be a positive integer"),
            Self::BrandNotFound(id) => write!(f, "Brand {} not found", id),
            Self::ImportRunning(id) => write!(f, "An import for brand {} is already running", id),
            Self::Upload(e) => write!(f, "{}", e),
            Self::Source(e) => write!(f, "{}", e),
            Self::Store(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CatalogStore;
    use crate::features::shared::test_helpers::{test_context, TestContext};
    use crate::models::BrandKind;
    use axum::http::Request;
    use imageio_common::progress::NdjsonDecoder;
    use tower::ServiceExt;

    const BOUNDARY: &str = "imageio-test-boundary";

    fn multipart_body(filename: &str, contents: &str) -> Body {
        Body::from(format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = contents
        ))
    }

    fn upload_request(uri: &str, accept: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(body).unwrap()
    }

    fn app(ctx: &TestContext) -> Router {
        imports_routes(1024 * 1024).with_state(ctx.state.clone())
    }

    async fn body_events(response: Response) -> Vec<ProgressEvent> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let mut decoder = NdjsonDecoder::new();
        decoder.push(&bytes);
        let mut events = Vec::new();
        while let Some(event) = decoder.next_event() {
            events.push(event.unwrap());
        }
        events
    }

    #[test]
    fn test_routes_structure() {
        let router = imports_routes(1024);
        assert!(format!("{:?}", router).contains("Router"));
    }

    #[test]
    fn test_accepts_ndjson() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_ndjson(&headers));
        headers.insert(header::ACCEPT, "application/x-ndjson".parse().unwrap());
        assert!(accepts_ndjson(&headers));
    }

    #[tokio::test]
    async fn test_blocking_import_redirects_with_report() {
        let ctx = test_context();
        let brand = ctx.store.create_brand("Acme", BrandKind::Brand).await.unwrap();

        let response = app(&ctx)
            .oneshot(upload_request(
                &format!("/{}/imports", brand.id),
                None,
                multipart_body("items.csv", "title,image-1\nKettle,\nMug,not-a-url\n"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            format!("/brands/{}", brand.id).as_str()
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["items_processed"], 2);
        assert_eq!(
            json["data"]["diagnostics"][0],
            "Row 3, image-1: invalid URL - not-a-url"
        );
        assert!(!ctx.state.locks.is_active(brand.id));
    }

    #[tokio::test]
    async fn test_streaming_import_emits_progress_then_summary() {
        let ctx = test_context();
        let brand = ctx.store.create_brand("Acme", BrandKind::Brand).await.unwrap();

        let response = app(&ctx)
            .oneshot(upload_request(
                &format!("/{}/imports?stream=true", brand.id),
                None,
                multipart_body("items.csv", "title\nA\nB\n"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], NDJSON_CONTENT_TYPE);

        let events = body_events(response).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ProgressEvent::progress(0, 2));
        assert_eq!(events[1], ProgressEvent::progress(1, 2));
        assert!(matches!(
            &events[2],
            ProgressEvent::Finished { done: 2, total: 2, message, .. } if message == "2 items processed."
        ));
    }

    #[tokio::test]
    async fn test_streaming_preflight_failure_is_error_line() {
        let ctx = test_context();

        let response = app(&ctx)
            .oneshot(upload_request(
                "/404/imports",
                Some(NDJSON_CONTENT_TYPE),
                multipart_body("items.csv", "title\nA\n"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let events = body_events(response).await;
        assert_eq!(events, vec![ProgressEvent::error("Brand 404 not found")]);
    }

    #[tokio::test]
    async fn test_empty_spreadsheet_aborts_with_single_diagnostic() {
        let ctx = test_context();
        let brand = ctx.store.create_brand("Acme", BrandKind::Brand).await.unwrap();

        let response = app(&ctx)
            .oneshot(upload_request(
                &format!("/{}/imports", brand.id),
                None,
                multipart_body("items.csv", "title,image-1\n"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["items_processed"], 0);
        assert_eq!(
            json["data"]["diagnostics"],
            serde_json::json!(["Spreadsheet contains no data rows."])
        );
    }

    #[tokio::test]
    async fn test_concurrent_import_for_same_brand_is_conflict() {
        let ctx = test_context();
        let brand = ctx.store.create_brand("Acme", BrandKind::Brand).await.unwrap();
        let _running = ctx.state.locks.try_acquire(brand.id).unwrap();

        let response = app(&ctx)
            .oneshot(upload_request(
                &format!("/{}/imports", brand.id),
                None,
                multipart_body("items.csv", "title\nA\n"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
