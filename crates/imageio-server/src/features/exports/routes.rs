//! Export API routes
//!
//! - `GET /api/v1/brands/:id/export/images.zip` - Downloaded images as a zip archive
//! - `GET /api/v1/brands/:id/export/links.xlsx` - Public image links as a spreadsheet

use crate::error::{AppError, ServerResult};
use crate::export::{build_archive, build_links_workbook};
use crate::features::FeatureState;
use crate::models::Brand;
use crate::storage::namespace::slugify;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn exports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/:id/export/images.zip", get(download_archive))
        .route("/:id/export/links.xlsx", get(download_links))
}

async fn find_brand(state: &FeatureState, id: i64) -> ServerResult<Brand> {
    state
        .store
        .get_brand(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand {} not found", id)))
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

/// Download a brand's images as a zip archive
///
/// # Response
///
/// - `200 OK` - `application/zip` named `{brand-slug}-images.zip`
/// - `404 Not Found` - Unknown brand, or no downloaded image has a stored file
#[tracing::instrument(skip(state))]
async fn download_archive(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> ServerResult<Response> {
    let brand = find_brand(&state, id).await?;
    let archive = build_archive(state.store.as_ref(), &state.storage, brand.id).await?;

    tracing::info!(
        brand_id = id,
        entries = archive.entries,
        bytes = archive.bytes,
        "Archive exported via API"
    );

    let file = tokio::fs::File::from_std(archive.file);
    let body = Body::from_stream(ReaderStream::new(file));
    let filename = format!("{}-images.zip", slugify(&brand.name));

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_LENGTH, archive.bytes.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        body,
    )
        .into_response())
}

/// Download a brand's public image links as an XLSX workbook
///
/// # Response
///
/// - `200 OK` - workbook named `{brand-slug}-links.xlsx`
/// - `404 Not Found` - Unknown brand
#[tracing::instrument(skip(state))]
async fn download_links(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> ServerResult<Response> {
    let brand = find_brand(&state, id).await?;
    let bytes =
        build_links_workbook(state.store.as_ref(), &brand, &state.media.public_base_url).await?;

    tracing::info!(brand_id = id, bytes = bytes.len(), "Links exported via API");

    let filename = format!("{}-links.xlsx", slugify(&brand.name));
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        bytes,
    )
        .into_response())
}
