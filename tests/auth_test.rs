//! Signed-request scenarios through the auth middleware: V4 and V2 accept
//! paths, every rejection class, and clock-skew enforcement.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use common::{
    assert_s3_error, auth_router, body_string, send, TEST_ACCESS_KEY, TEST_SECRET_KEY,
};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
const HOST: &str = "sandbar.local";
const REGION: &str = "us-east-1";

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Canonical query string for the simple queries these tests use: sorted
/// pairs, bare keys serialized as `key=`.
fn canonical_query(query: &str) -> String {
    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            if pair.contains('=') {
                pair.to_string()
            } else {
                format!("{pair}=")
            }
        })
        .collect();
    pairs.sort();
    pairs.join("&")
}

/// Build a V4-signed request over the given secret and timestamp.
fn v4_signed(
    method: &str,
    uri: &str,
    body: &[u8],
    secret: &str,
    timestamp: DateTime<Utc>,
) -> Request<Body> {
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
    let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date = timestamp.format("%Y%m%d").to_string();

    let signed_headers = "host;x-amz-content-sha256;x-amz-date";
    let canonical_request = format!(
        "{method}\n{path}\n{}\nhost:{HOST}\nx-amz-content-sha256:{EMPTY_SHA256}\nx-amz-date:{amz_date}\n\n{signed_headers}\n{EMPTY_SHA256}",
        canonical_query(query),
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{date}/{REGION}/s3/aws4_request\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    );

    let date_key = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, REGION.as_bytes());
    let service_key = hmac_sha256(&region_key, b"s3");
    let signing_key = hmac_sha256(&service_key, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={TEST_ACCESS_KEY}/{date}/{REGION}/s3/aws4_request, SignedHeaders={signed_headers}, Signature={signature}"
    );

    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", HOST)
        .header("x-amz-date", amz_date)
        .header("x-amz-content-sha256", EMPTY_SHA256)
        .header("authorization", authorization)
        .header("content-length", body.len())
        .body(Body::from(body.to_vec()))
        .unwrap()
}

/// Build a V2-signed request (HMAC-SHA1 over the classic string-to-sign).
fn v2_signed(method: &str, path: &str, secret: &str) -> Request<Body> {
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let string_to_sign = format!("{method}\n\n\n{date}\n{path}");
    let signature = BASE64.encode(hmac_sha1(secret.as_bytes(), string_to_sign.as_bytes()));

    Request::builder()
        .method(method)
        .uri(path)
        .header("host", HOST)
        .header("date", date)
        .header("authorization", format!("AWS {TEST_ACCESS_KEY}:{signature}"))
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// V4
// ============================================================================

#[tokio::test]
async fn v4_signed_requests_are_accepted() {
    let router = auth_router();

    let response = send(&router, v4_signed("PUT", "/b1", b"", TEST_SECRET_KEY, Utc::now())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&router, v4_signed("GET", "/", b"", TEST_SECRET_KEY, Utc::now())).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<Name>b1</Name>"));
}

#[tokio::test]
async fn v4_signed_query_requests_are_accepted() {
    let router = auth_router();
    send(&router, v4_signed("PUT", "/b1", b"", TEST_SECRET_KEY, Utc::now())).await;

    let response = send(
        &router,
        v4_signed("GET", "/b1?max-keys=10&prefix=x", b"", TEST_SECRET_KEY, Utc::now()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn v4_wrong_secret_never_reaches_the_handler() {
    let router = auth_router();

    let response = send(&router, v4_signed("PUT", "/b1", b"", "not-the-secret", Utc::now())).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "SignatureDoesNotMatch").await;

    // The bucket was never created.
    let response = send(&router, v4_signed("GET", "/", b"", TEST_SECRET_KEY, Utc::now())).await;
    assert!(!body_string(response).await.contains("<Name>b1</Name>"));
}

#[tokio::test]
async fn v4_unknown_access_key() {
    let router = auth_router();

    let mut request = v4_signed("GET", "/", b"", TEST_SECRET_KEY, Utc::now());
    let rewritten = request
        .headers()
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .replace(TEST_ACCESS_KEY, "AKIANOSUCHKEY");
    request
        .headers_mut()
        .insert("authorization", rewritten.parse().unwrap());

    let response = send(&router, request).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "InvalidAccessKeyId").await;
}

#[tokio::test]
async fn v4_malformed_header() {
    let router = auth_router();
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", "AWS4-HMAC-SHA256 Credential=broken")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_s3_error(
        response,
        StatusCode::BAD_REQUEST,
        "AuthorizationHeaderMalformed",
    )
    .await;
}

#[tokio::test]
async fn skewed_timestamp_is_rejected_despite_valid_signature() {
    let router = auth_router();

    let hour_ago = Utc::now() - chrono::Duration::hours(1);
    let response = send(&router, v4_signed("PUT", "/b1", b"", TEST_SECRET_KEY, hour_ago)).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "RequestTimeTooSkewed").await;

    let hour_ahead = Utc::now() + chrono::Duration::hours(1);
    let response = send(&router, v4_signed("PUT", "/b1", b"", TEST_SECRET_KEY, hour_ahead)).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "RequestTimeTooSkewed").await;
}

// ============================================================================
// V2
// ============================================================================

#[tokio::test]
async fn v2_signed_requests_are_accepted() {
    let router = auth_router();

    let response = send(&router, v2_signed("GET", "/", TEST_SECRET_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<ListAllMyBucketsResult"));
}

#[tokio::test]
async fn v2_wrong_secret_is_access_denied() {
    let router = auth_router();
    let response = send(&router, v2_signed("GET", "/", "not-the-secret")).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "AccessDenied").await;
}

#[tokio::test]
async fn v2_malformed_header_is_invalid_argument() {
    let router = auth_router();
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", "AWS justakeywithnosignature")
        .header("date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_s3_error(response, StatusCode::BAD_REQUEST, "InvalidArgument").await;
}

// ============================================================================
// Custom / missing auth
// ============================================================================

#[tokio::test]
async fn unauthenticated_requests_are_denied() {
    let router = auth_router();
    let response = send(&router, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_s3_error(response, StatusCode::FORBIDDEN, "AccessDenied").await;
}

#[tokio::test]
async fn auth_failures_still_carry_request_ids() {
    let router = auth_router();
    let response = send(&router, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert!(response.headers().contains_key("x-amz-request-id"));
    assert!(response.headers().contains_key("x-amz-id-2"));
}
