//! Object-level handlers: GET, HEAD, PUT, DELETE, plus dispatch into the
//! multipart lifecycle when `uploadId`/`uploads` query keys are present.

use super::{
    check_object_unimplemented, multipart, require_content_length, AppState, QueryParams, S3Error,
};
use crate::api::extractors::ValidatedPath;
use crate::api::xml::add_etag_quotes;
use crate::controller::{BodyReader, RequestContext};
use axum::body::{Body, Bytes};
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::Arc;
use tracing::{info, instrument};

/// `GET`/`HEAD /{bucket}/{key}` dispatcher.
#[instrument(skip(state, ctx, query))]
pub async fn get_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_object_unimplemented(&method, &query)?;

    if query.has("uploadId") {
        return multipart::list_parts(&state, &ctx, &bucket, &key, &query).await;
    }

    get_object(&state, &ctx, &bucket, &key, &query).await
}

/// GetObject handler, optionally version-addressed
/// GET /{bucket}/{key}[?versionId=V]
async fn get_object(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let version_id = query.get("versionId").filter(|v| !v.is_empty());
    info!("GetObject {bucket}/{key} version={version_id:?}");

    let result = state
        .object
        .get_object(ctx, bucket, key, version_id)
        .await?;

    // A delete marker answers 404, flagged so clients can tell it apart
    // from a missing key.
    if result.delete_marker {
        let mut response = S3Error::NoSuchKey(key.to_string()).into_response();
        response
            .headers_mut()
            .insert("x-amz-delete-marker", HeaderValue::from_static("true"));
        if let Some(version) = &result.version_id {
            if let Ok(value) = HeaderValue::from_str(version) {
                response.headers_mut().insert("x-amz-version-id", value);
            }
        }
        return Ok(response);
    }

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("ETag", add_etag_quotes(&result.etag))
        .header("Content-Length", result.size.to_string())
        .header(
            "Last-Modified",
            result
                .last_modified
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        );
    if let Some(version) = &result.version_id {
        builder = builder.header("x-amz-version-id", version);
    }
    builder
        .body(Body::from_stream(result.body))
        .map_err(S3Error::internal)
}

/// `PUT /{bucket}/{key}` dispatcher: part upload or object upload. Copy
/// requests (`x-amz-copy-source`) are recognized and rejected.
#[instrument(skip(state, ctx, query, headers, body))]
pub async fn put_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Extension(ctx): Extension<RequestContext>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, S3Error> {
    if headers.contains_key("x-amz-copy-source") {
        return Err(S3Error::NotImplemented);
    }

    let query = QueryParams::parse(query.as_deref());
    check_object_unimplemented(&Method::PUT, &query)?;

    if query.has("uploadId") {
        return multipart::upload_part(&state, &ctx, &bucket, &key, &query, &headers, body).await;
    }

    info!("PutObject {bucket}/{key}");
    require_content_length(&headers)?;

    let (reader, _consumed) = BodyReader::wrap(body);
    let result = state.object.put_object(&ctx, &bucket, &key, reader).await?;

    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(&add_etag_quotes(&result.etag)) {
        response.headers_mut().insert("ETag", value);
    }
    if let Some(version) = &result.version_id {
        if let Ok(value) = HeaderValue::from_str(version) {
            response.headers_mut().insert("x-amz-version-id", value);
        }
    }
    Ok(response)
}

/// `DELETE /{bucket}/{key}` dispatcher: abort multipart or delete object.
#[instrument(skip(state, ctx, query))]
pub async fn delete_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Extension(ctx): Extension<RequestContext>,
    RawQuery(query): RawQuery,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_object_unimplemented(&Method::DELETE, &query)?;

    if query.has("uploadId") {
        return multipart::abort(&state, &ctx, &bucket, &key, &query).await;
    }

    let version_id = query.get("versionId").filter(|v| !v.is_empty());
    info!("DeleteObject {bucket}/{key} version={version_id:?}");

    let result = state
        .object
        .delete_object(&ctx, &bucket, &key, version_id)
        .await?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    if result.delete_marker {
        response
            .headers_mut()
            .insert("x-amz-delete-marker", HeaderValue::from_static("true"));
    }
    if let Some(version) = &result.version_id {
        if let Ok(value) = HeaderValue::from_str(version) {
            response.headers_mut().insert("x-amz-version-id", value);
        }
    }
    Ok(response)
}

/// `POST /{bucket}/{key}` dispatcher: multipart init or completion.
#[instrument(skip(state, ctx, query, body))]
pub async fn post_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Extension(ctx): Extension<RequestContext>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_object_unimplemented(&Method::POST, &query)?;

    if query.has("uploads") {
        return multipart::init(&state, &ctx, &bucket, &key).await;
    }
    if query.has("uploadId") {
        return multipart::complete(&state, &ctx, &bucket, &key, &query, body).await;
    }

    Err(S3Error::MethodNotAllowed)
}
