//! End-to-end import and export over a real listener
//!
//! Remote images come from a wiremock host; re-imports fetch from the server's own
//! `/storage` route, so public links must resolve.

mod common;

use calamine::{Reader, Xlsx};
use common::{init_test_tracing, spreadsheet_form, TestServer};
use imageio_common::progress::{NdjsonDecoder, ProgressEvent};
use imageio_server::models::{ImageStatus, ItemOrder};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Cursor;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn image_host() -> MockServer {
    let host = MockServer::start().await;
    for (route, byte) in [("/img/kettle.png", 1u8), ("/img/lid.png", 2), ("/img/mug.png", 3)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![byte; 32]),
            )
            .mount(&host)
            .await;
    }
    host
}

async fn create_brand(server: &TestServer, name: &str) -> i64 {
    let response = server
        .client()
        .post(server.url("/api/v1/brands"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

async fn import(server: &TestServer, brand_id: i64, file_name: &str, bytes: Vec<u8>) -> Value {
    let response = server
        .client()
        .post(server.url(&format!("/api/v1/brands/{}/imports", brand_id)))
        .multipart(spreadsheet_form(file_name, bytes))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"],
        format!("/brands/{}", brand_id).as_str()
    );
    response.json().await.unwrap()
}

/// `(title, [(position, original_url)])` for every item, by title
async fn snapshot(server: &TestServer, brand_id: i64) -> Vec<(String, Vec<(i32, String)>)> {
    server
        .state
        .store
        .list_items(brand_id, ItemOrder::Title)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| {
            let images = entry
                .images
                .iter()
                .filter(|image| image.status == ImageStatus::Downloaded)
                .map(|image| (image.position, image.original_url.clone().unwrap_or_default()))
                .collect();
            (entry.item.title, images)
        })
        .collect()
}

/// Rows of the first sheet, header excluded, as `(title, [(position, url)])`
fn read_links(bytes: Vec<u8>) -> Vec<(String, Vec<(i32, String)>)> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();

    range
        .rows()
        .skip(1)
        .map(|row| {
            let links = row
                .iter()
                .enumerate()
                .skip(1)
                .map(|(col, cell)| (col as i32, cell.to_string()))
                .filter(|(_, url)| !url.is_empty())
                .collect();
            (row[0].to_string(), links)
        })
        .collect()
}

#[tokio::test]
async fn test_links_round_trip_reproduces_urls_at_positions() {
    init_test_tracing();
    let host = image_host().await;
    let server = TestServer::start().await.unwrap();

    let source = create_brand(&server, "Acme Home").await;
    let csv = format!(
        "title,image-1,image-2,image-3\n\
         Kettle,{h}/img/kettle.png,,{h}/img/lid.png\n\
         Mug,,{h}/img/mug.png,\n",
        h = host.uri()
    );
    let body = import(&server, source, "catalog.csv", csv.into_bytes()).await;
    assert_eq!(body["data"]["items_processed"], 2);
    assert_eq!(body["data"]["items_failed"], 0);
    assert_eq!(body["data"]["diagnostics"], json!([]));

    let response = server
        .client()
        .get(server.url(&format!("/api/v1/brands/{}/export/links.xlsx", source)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let links_file = response.bytes().await.unwrap().to_vec();

    let exported = read_links(links_file.clone());
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].0, "Kettle");
    assert_eq!(
        exported[0].1.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert_eq!(exported[1].1[0].0, 2);

    // Every exported link is served by the application
    for (_, links) in &exported {
        for (_, url) in links {
            assert!(url.starts_with(&server.url("/storage/")));
            let fetched = server.client().get(url).send().await.unwrap();
            assert_eq!(fetched.status(), StatusCode::OK);
        }
    }

    let copy = create_brand(&server, "Acme Copy").await;
    let body = import(&server, copy, "acme-home-links.xlsx", links_file).await;
    assert_eq!(body["data"]["items_processed"], 2);
    assert_eq!(body["data"]["diagnostics"], json!([]));

    assert_eq!(snapshot(&server, copy).await, exported);

    // Same bytes at the same positions
    let copied = server.state.store.downloaded_images(copy).await.unwrap();
    let originals = server.state.store.downloaded_images(source).await.unwrap();
    assert_eq!(copied.len(), originals.len());
    for (copied, original) in copied.iter().zip(&originals) {
        assert_eq!(copied.position, original.position);
        let root = server.storage_root();
        assert_eq!(
            std::fs::read(root.join(&copied.storage_path)).unwrap(),
            std::fs::read(root.join(&original.storage_path)).unwrap()
        );
    }
}

#[tokio::test]
async fn test_streamed_import_reports_each_row() {
    init_test_tracing();
    let host = image_host().await;
    let server = TestServer::start().await.unwrap();
    let brand = create_brand(&server, "Streamed").await;

    let csv = format!(
        "title,image-1\nKettle,{h}/img/kettle.png\nLid,{h}/img/lid.png\nMug,{h}/img/mug.png\n",
        h = host.uri()
    );
    let response = server
        .client()
        .post(server.url(&format!("/api/v1/brands/{}/imports?stream=true", brand)))
        .multipart(spreadsheet_form("rows.csv", csv.into_bytes()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/x-ndjson");

    let mut decoder = NdjsonDecoder::new();
    decoder.push(&response.bytes().await.unwrap());
    let mut events = Vec::new();
    while let Some(event) = decoder.next_event() {
        events.push(event.unwrap());
    }
    if let Some(event) = decoder.finish() {
        events.push(event.unwrap());
    }

    assert_eq!(
        events[..3],
        [
            ProgressEvent::progress(0, 3),
            ProgressEvent::progress(1, 3),
            ProgressEvent::progress(2, 3),
        ]
    );
    match &events[3] {
        ProgressEvent::Finished {
            done,
            total,
            redirect,
            message,
        } => {
            assert_eq!((*done, *total), (3, 3));
            assert_eq!(redirect, &format!("/brands/{}", brand));
            assert_eq!(message, "3 items processed.");
        },
        other => panic!("expected a finished event, got {:?}", other),
    }
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_archive_download_over_http() {
    init_test_tracing();
    let host = image_host().await;
    let server = TestServer::start().await.unwrap();
    let brand = create_brand(&server, "Zip Me").await;

    let empty = server
        .client()
        .get(server.url(&format!("/api/v1/brands/{}/export/images.zip", brand)))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::NOT_FOUND);

    let csv = format!("title,image-1\nKettle,{}/img/kettle.png\n", host.uri());
    import(&server, brand, "one.csv", csv.into_bytes()).await;

    let response = server
        .client()
        .get(server.url(&format!("/api/v1/brands/{}/export/images.zip", brand)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"zip-me-images.zip\""
    );

    let bytes = response.bytes().await.unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive.by_index(0).unwrap().name(), "kettle/kettle.png");
}
