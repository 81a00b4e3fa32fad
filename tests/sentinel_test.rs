//! Sentinel Hub provider tests against a mocked OGC service.

mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, TimeZone, Utc};
use common::body_to_string;
use satsnap::config::{Config, ImageryConfig};
use satsnap::imagery::{ImageryProvider, ImageryRequest, SentinelHubProvider};
use satsnap::server::{create_router, AppContext};
use satsnap_common::Error;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTANCE: &str = "test-instance";

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn provider(server: &MockServer) -> SentinelHubProvider {
    SentinelHubProvider::new(&server.uri(), Some(INSTANCE.into()), Duration::from_secs(5))
}

fn request() -> ImageryRequest {
    let mut request = ImageryRequest::from(&ImageryConfig::default());
    request.width = 32;
    request.height = 48;
    request
}

fn features(dates: &[(&str, f64)]) -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": dates.iter().map(|(date, cloud)| json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"date": date, "time": "07:34:02", "cloudCoverPercentage": cloud}
        })).collect::<Vec<_>>()
    })
}

async fn mount_wfs(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wfs/{INSTANCE}")))
        .and(query_param("REQUEST", "GetFeature"))
        .and(query_param("TYPENAMES", "DSS1"))
        .and(query_param("BBOX", "-16.15,46.16,-15.58,46.51"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_latest_picks_most_recent_date() {
    let server = MockServer::start().await;
    mount_wfs(
        &server,
        features(&[("2023-10-28", 5.0), ("2023-11-05", 20.0), ("2023-11-02", 0.0)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wms/{INSTANCE}")))
        .and(query_param("REQUEST", "GetMap"))
        .and(query_param("LAYERS", "TRUE-COLOR-S2L2A"))
        .and(query_param("TIME", "2023-11-05/2023-11-05"))
        .and(query_param("CRS", "EPSG:4326"))
        .and(query_param("WIDTH", "32"))
        .and(query_param("HEIGHT", "48"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(32, 48)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let acquisition = provider(&server).fetch_latest(&request()).await.unwrap();

    assert_eq!(acquisition.acquired, NaiveDate::from_ymd_opt(2023, 11, 5).unwrap());
    assert_eq!(acquisition.raster.width(), 32);
    assert_eq!(acquisition.raster.height(), 48);
}

#[tokio::test]
async fn search_dates_respects_cloud_limit() {
    let server = MockServer::start().await;
    mount_wfs(
        &server,
        features(&[("2023-11-01", 10.0), ("2023-11-06", 90.0)]),
    )
    .await;

    let mut req = request();
    req.max_cloud_coverage = 0.3;
    let end = Utc.with_ymd_and_hms(2023, 11, 7, 12, 0, 0).unwrap();
    let dates = provider(&server).search_dates(&req, end).await.unwrap();

    assert_eq!(dates, vec![NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()]);
}

#[tokio::test]
async fn search_dates_sends_time_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wfs/{INSTANCE}")))
        .and(query_param(
            "TIME",
            "2023-11-04T12:00:00Z/2023-11-07T12:00:00Z",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(features(&[("2023-11-05", 0.0)])))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = request();
    req.lookback_days = 3;
    let end = Utc.with_ymd_and_hms(2023, 11, 7, 12, 0, 0).unwrap();
    let dates = provider(&server).search_dates(&req, end).await.unwrap();

    assert_eq!(dates.len(), 1);
}

#[tokio::test]
async fn no_acquisitions_is_upstream_error() {
    let server = MockServer::start().await;
    mount_wfs(&server, features(&[])).await;

    let err = provider(&server).fetch_latest(&request()).await.unwrap_err();

    assert_matches!(err, Error::Upstream { .. });
}

#[tokio::test]
async fn wms_http_error_is_upstream_error() {
    let server = MockServer::start().await;
    mount_wfs(&server, features(&[("2023-11-05", 0.0)])).await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wms/{INSTANCE}")))
        .respond_with(ResponseTemplate::new(400).set_body_string("Layer not found"))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_latest(&request()).await.unwrap_err();

    assert_matches!(err, Error::Upstream { ref message, .. } if message.contains("Layer not found"));
}

#[tokio::test]
async fn wms_service_exception_is_upstream_error() {
    let server = MockServer::start().await;
    mount_wfs(&server, features(&[("2023-11-05", 0.0)])).await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wms/{INSTANCE}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<ServiceExceptionReport>bad bbox</ServiceExceptionReport>",
                "application/vnd.ogc.se_xml",
            ),
        )
        .mount(&server)
        .await;

    let err = provider(&server).fetch_latest(&request()).await.unwrap_err();

    assert_matches!(err, Error::Upstream { .. });
}

#[tokio::test]
async fn undecodable_raster_is_image_error() {
    let server = MockServer::start().await;
    mount_wfs(&server, features(&[("2023-11-05", 0.0)])).await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wms/{INSTANCE}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"definitely not a png".to_vec()),
        )
        .mount(&server)
        .await;

    let err = provider(&server).fetch_latest(&request()).await.unwrap_err();

    assert_matches!(err, Error::Image(_));
}

#[tokio::test]
async fn missing_instance_id_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = SentinelHubProvider::new(&server.uri(), None, Duration::from_secs(5));
    let err = provider.fetch_latest(&request()).await.unwrap_err();

    assert_matches!(err, Error::Internal(_));
}

#[tokio::test]
async fn download_image_end_to_end() {
    let server = MockServer::start().await;
    mount_wfs(&server, features(&[("2023-11-05", 0.0)])).await;
    Mock::given(method("GET"))
        .and(path(format!("/ogc/wms/{INSTANCE}")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes(512, 856)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.image_dir = dir.path().to_path_buf();
    config.imagery.base_url = server.uri();
    config.imagery.instance_id = Some(INSTANCE.to_string());

    let provider = Arc::new(SentinelHubProvider::from_config(&config.imagery));
    let ctx = AppContext::new(config, provider).unwrap();
    let app = create_router(ctx.clone());

    let response = app
        .oneshot(Request::get("/download_image").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let show_path = body_to_string(response.into_body()).await;
    let timestamp: i64 = show_path.trim_start_matches("/show_image/").parse().unwrap();
    let record = ctx.images.store().record(timestamp).unwrap().unwrap();
    assert_eq!(record.provider, "sentinel-hub");
    assert_eq!((record.width, record.height), (512, 856));
    assert_eq!(record.acquired, NaiveDate::from_ymd_opt(2023, 11, 5));
}
