//! Bucket-level handlers: create, delete, listings, versioning, location.
//!
//! S3 selects the operation through subresource query keys, so each HTTP
//! method gets a dispatcher that inspects the query string before calling
//! the backend.

use super::{
    check_bucket_unimplemented, int_query, multipart, truncate_listing, xml_response, AppState,
    QueryParams, S3Error,
};
use crate::api::extractors::ValidatedBucket;
use crate::api::xml::{
    location_constraint_xml, ListBucketResult, ListVersionsResult, VersioningConfiguration,
};
use crate::controller::RequestContext;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use std::sync::Arc;
use tracing::{info, instrument};

const DEFAULT_MAX_KEYS: u32 = 1000;

/// `GET`/`HEAD /{bucket}` dispatcher.
#[instrument(skip(state, ctx, query))]
pub async fn get_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
    Extension(ctx): Extension<RequestContext>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_bucket_unimplemented(&method, &query)?;

    if method == Method::GET && query.has("uploads") {
        return multipart::list_uploads(&state, &ctx, &bucket, &query).await;
    }
    if query.has("location") {
        info!("GetBucketLocation {bucket}");
        let location = state.bucket.bucket_location(&ctx, &bucket).await?;
        return Ok(xml_response(location_constraint_xml(&location)));
    }
    if method == Method::GET && query.has("versioning") {
        info!("GetBucketVersioning {bucket}");
        let status = state.bucket.get_bucket_versioning(&ctx, &bucket).await?;
        return Ok(xml_response(status.to_xml()));
    }
    if query.has("versions") {
        return list_versions(&state, &ctx, &bucket, &query).await;
    }

    list_objects(&state, &ctx, &bucket, &query).await
}

/// ListObjects handler
/// GET /{bucket}
async fn list_objects(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let prefix = query.value("prefix");
    let marker = query.value("marker");
    let delimiter = query.value("delimiter");
    let max_keys = int_query(query, "max-keys", 0, DEFAULT_MAX_KEYS, DEFAULT_MAX_KEYS)?;

    info!("ListObjects {bucket} prefix={prefix:?} marker={marker:?}");

    let mut page = state
        .bucket
        .list_objects(ctx, bucket, prefix, marker, delimiter, max_keys + 1)
        .await?;

    let is_truncated = truncate_listing(&mut page.contents, max_keys);
    let next_marker = if is_truncated {
        page.contents.last().map(|c| c.key.clone()).unwrap_or_default()
    } else {
        String::new()
    };

    let result = ListBucketResult {
        name: bucket.to_string(),
        prefix: prefix.to_string(),
        marker: marker.to_string(),
        delimiter: delimiter.to_string(),
        max_keys,
        is_truncated,
        next_marker,
        contents: page.contents,
        common_prefixes: page.common_prefixes,
    };
    Ok(xml_response(result.to_xml()))
}

/// ListObjectVersions handler
/// GET /{bucket}?versions
async fn list_versions(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let prefix = query.value("prefix");
    let key_marker = query.value("key-marker");
    let version_id_marker = if key_marker.is_empty() {
        ""
    } else {
        query.value("version-id-marker")
    };
    let delimiter = query.value("delimiter");
    let max_keys = int_query(query, "max-keys", 0, DEFAULT_MAX_KEYS, DEFAULT_MAX_KEYS)?;

    info!("ListObjectVersions {bucket} prefix={prefix:?} key_marker={key_marker:?}");

    let mut entries = state
        .bucket
        .list_object_versions(
            ctx,
            bucket,
            prefix,
            key_marker,
            version_id_marker,
            delimiter,
            max_keys + 1,
        )
        .await?;

    let is_truncated = truncate_listing(&mut entries, max_keys);
    let (next_key_marker, next_version_id_marker) = if is_truncated {
        entries
            .last()
            .map(|e| (e.key().to_string(), e.version_id().to_string()))
            .unwrap_or_default()
    } else {
        Default::default()
    };

    let result = ListVersionsResult {
        name: bucket.to_string(),
        prefix: prefix.to_string(),
        key_marker: key_marker.to_string(),
        version_id_marker: version_id_marker.to_string(),
        max_keys,
        is_truncated,
        next_key_marker,
        next_version_id_marker,
        entries,
    };
    Ok(xml_response(result.to_xml()))
}

/// `PUT /{bucket}` dispatcher: versioning configuration or bucket creation.
#[instrument(skip(state, ctx, query, body))]
pub async fn put_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
    Extension(ctx): Extension<RequestContext>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_bucket_unimplemented(&Method::PUT, &query)?;

    if query.has("versioning") {
        return set_versioning(&state, &ctx, &bucket, &body).await;
    }

    info!("CreateBucket {bucket}");
    state.bucket.create_bucket(&ctx, &bucket).await?;
    Ok((StatusCode::OK, [("Location", format!("/{bucket}"))], "").into_response())
}

/// SetBucketVersioning handler
/// PUT /{bucket}?versioning
async fn set_versioning(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    body: &Bytes,
) -> Result<Response, S3Error> {
    info!("SetBucketVersioning {bucket}");

    let body = std::str::from_utf8(body).map_err(|_| S3Error::MalformedXML)?;
    let config = VersioningConfiguration::from_xml(body).map_err(|_| S3Error::MalformedXML)?;
    let status = config
        .state()
        .ok_or(S3Error::IllegalVersioningConfiguration)?;

    state
        .bucket
        .set_bucket_versioning(ctx, bucket, status)
        .await?;
    Ok(StatusCode::OK.into_response())
}

/// `DELETE /{bucket}` dispatcher.
#[instrument(skip(state, ctx, query))]
pub async fn delete_dispatch(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
    Extension(ctx): Extension<RequestContext>,
    RawQuery(query): RawQuery,
) -> Result<Response, S3Error> {
    let query = QueryParams::parse(query.as_deref());
    check_bucket_unimplemented(&Method::DELETE, &query)?;

    info!("DeleteBucket {bucket}");
    state.bucket.delete_bucket(&ctx, &bucket).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST on a bucket is recognized but unsupported (batch delete and POST
/// uploads are not part of this surface).
pub async fn post_dispatch() -> S3Error {
    S3Error::NotImplemented
}
