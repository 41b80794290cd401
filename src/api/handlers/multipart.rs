//! Multipart upload handlers: list, init, part upload, list parts, abort,
//! and completion with its keepalive protocol.
//!
//! Completion can take long enough on a real backend that intermediaries
//! would kill an idle connection. The handler therefore races the backend
//! against a ticker: if the backend has not answered by the first tick, it
//! commits a `200` streaming response, writes the XML declaration, and keeps
//! the connection warm with one ASCII space per tick (valid whitespace
//! inside an XML document) until the outcome lands. The outcome is either
//! the success element or an `Error` element in the already-open body.

use super::{int_query, truncate_listing, xml_response, AppState, QueryParams, S3Error};
use crate::api::xml::{
    add_etag_quotes, CompleteMultipartUpload, CompleteMultipartUploadResult,
    InitiateMultipartUploadResult, ListMultipartUploadsResult, ListPartsResult,
    XML_DECLARATION,
};
use crate::controller::{BodyReader, CompletedUpload, RequestContext};
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::channel::mpsc;
use futures::SinkExt;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};

const DEFAULT_MAX_UPLOADS: u32 = 1000;
const DEFAULT_MAX_PARTS: u32 = 1000;
const MAX_PART_NUMBER: u32 = 10000;

/// How often the completion handler emits keepalive bytes.
const COMPLETE_PING: Duration = Duration::from_secs(10);

/// ListMultipartUploads handler
/// GET /{bucket}?uploads
pub async fn list_uploads(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let key_marker = query.value("key-marker");
    // An upload-id marker is meaningless without a key marker.
    let upload_id_marker = if key_marker.is_empty() {
        ""
    } else {
        query.value("upload-id-marker")
    };
    let max_uploads = int_query(
        query,
        "max-uploads",
        0,
        DEFAULT_MAX_UPLOADS,
        DEFAULT_MAX_UPLOADS,
    )?;

    info!("ListMultipartUploads {bucket} key_marker={key_marker:?}");

    let mut uploads = state
        .multipart
        .list_multipart_uploads(ctx, bucket, key_marker, upload_id_marker, max_uploads + 1)
        .await?;

    let is_truncated = truncate_listing(&mut uploads, max_uploads);
    let (next_key_marker, next_upload_id_marker) = if is_truncated {
        uploads
            .last()
            .map(|u| (u.key.clone(), u.upload_id.clone()))
            .unwrap_or_default()
    } else {
        Default::default()
    };

    let result = ListMultipartUploadsResult {
        bucket: bucket.to_string(),
        key_marker: key_marker.to_string(),
        upload_id_marker: upload_id_marker.to_string(),
        next_key_marker,
        next_upload_id_marker,
        max_uploads,
        is_truncated,
        uploads,
    };
    Ok(xml_response(result.to_xml()))
}

/// ListParts handler
/// GET /{bucket}/{key}?uploadId=X
pub async fn list_parts(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let upload_id = query.value("uploadId");
    let max_parts = int_query(query, "max-parts", 0, DEFAULT_MAX_PARTS, DEFAULT_MAX_PARTS)?;
    let part_number_marker = int_query(query, "part-number-marker", 0, MAX_PART_NUMBER, 0)?;

    info!("ListParts {bucket}/{key} uploadId={upload_id}");

    let mut chunks = state
        .multipart
        .list_multipart_chunks(ctx, bucket, key, upload_id, part_number_marker, max_parts + 1)
        .await?;

    let is_truncated = truncate_listing(&mut chunks.parts, max_parts);
    let next_part_number_marker = if is_truncated {
        chunks.parts.last().map(|p| p.part_number).unwrap_or(0)
    } else {
        0
    };

    let result = ListPartsResult {
        bucket: bucket.to_string(),
        key: key.to_string(),
        upload_id: upload_id.to_string(),
        initiator: chunks.initiator,
        owner: chunks.owner,
        storage_class: chunks.storage_class,
        part_number_marker,
        next_part_number_marker,
        max_parts,
        is_truncated,
        parts: chunks.parts,
    };
    Ok(xml_response(result.to_xml()))
}

/// CreateMultipartUpload handler
/// POST /{bucket}/{key}?uploads
pub async fn init(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
) -> Result<Response, S3Error> {
    info!("CreateMultipartUpload {bucket}/{key}");

    let upload_id = state.multipart.init_multipart(ctx, bucket, key).await?;
    let result = InitiateMultipartUploadResult {
        bucket: bucket.to_string(),
        key: key.to_string(),
        upload_id,
    };
    Ok(xml_response(result.to_xml()))
}

/// UploadPart handler
/// PUT /{bucket}/{key}?uploadId=X&partNumber=N
pub async fn upload_part(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
    query: &QueryParams,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, S3Error> {
    let upload_id = query.value("uploadId");
    let part_number = match query.get("partNumber") {
        None | Some("") => {
            return Err(S3Error::InvalidArgument(
                "partNumber is required".to_string(),
            ))
        }
        Some(s) => s
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_PART_NUMBER).contains(n))
            .ok_or_else(|| S3Error::InvalidArgument("invalid value for partNumber".to_string()))?,
    };

    info!("UploadPart {bucket}/{key} uploadId={upload_id} part={part_number}");
    super::require_content_length(headers)?;

    let (reader, consumed) = BodyReader::wrap(body);
    match state
        .multipart
        .upload_multipart_chunk(ctx, bucket, key, upload_id, part_number, reader)
        .await
    {
        Ok(etag) => {
            let mut response = StatusCode::OK.into_response();
            if !etag.is_empty() {
                if let Ok(value) = add_etag_quotes(&etag).parse() {
                    response.headers_mut().insert("ETag", value);
                }
            }
            Ok(response)
        }
        Err(err) => {
            // The backend may have stored a partial chunk; try to clean it
            // up. The cleanup outcome does not affect the response.
            if consumed.load(Ordering::Relaxed) {
                if let Err(cleanup_err) = state
                    .multipart
                    .delete_multipart_chunk(ctx, bucket, key, upload_id, part_number)
                    .await
                {
                    error!(
                        "could not clean up part {part_number} of upload {upload_id}: {}",
                        cleanup_err.code()
                    );
                }
            }
            Err(err)
        }
    }
}

/// AbortMultipartUpload handler
/// DELETE /{bucket}/{key}?uploadId=X
pub async fn abort(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
    query: &QueryParams,
) -> Result<Response, S3Error> {
    let upload_id = query.value("uploadId");
    info!("AbortMultipartUpload {bucket}/{key} uploadId={upload_id}");

    state
        .multipart
        .abort_multipart(ctx, bucket, key, upload_id)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// CompleteMultipartUpload handler
/// POST /{bucket}/{key}?uploadId=X
pub async fn complete(
    state: &AppState,
    ctx: &RequestContext,
    bucket: &str,
    key: &str,
    query: &QueryParams,
    body: Bytes,
) -> Result<Response, S3Error> {
    let upload_id = query.value("uploadId");
    info!("CompleteMultipartUpload {bucket}/{key} uploadId={upload_id}");

    let body = std::str::from_utf8(&body).map_err(|_| S3Error::MalformedXML)?;
    let payload = CompleteMultipartUpload::from_xml(body).map_err(|err| {
        warn!("unparseable CompleteMultipartUpload body: {err}");
        S3Error::MalformedXML
    })?;

    // At least one part, strictly ascending part numbers.
    if payload.parts.is_empty() {
        return Err(S3Error::InvalidPartOrder);
    }
    if payload
        .parts
        .windows(2)
        .any(|w| w[0].part_number >= w[1].part_number)
    {
        return Err(S3Error::InvalidPartOrder);
    }

    let mut parts = payload.parts;
    for part in &mut parts {
        part.etag = add_etag_quotes(&part.etag);
    }

    // Run the backend in its own task; completion can outlive the patience
    // of HTTP intermediaries.
    let (result_tx, result_rx) = oneshot::channel();
    {
        let controller = state.multipart.clone();
        let ctx = ctx.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        tokio::spawn(async move {
            let result = controller
                .complete_multipart(&ctx, &bucket, &key, &upload_id, parts)
                .await;
            let _ = result_tx.send(result);
        });
    }

    let mut outcome = result_rx;
    let first_tick = tokio::time::sleep(COMPLETE_PING);
    tokio::pin!(first_tick);

    tokio::select! {
        result = &mut outcome => {
            // Fast path: the backend answered before the first tick, so a
            // regular response is still possible.
            match flatten(result) {
                Ok(completed) => {
                    let result = CompleteMultipartUploadResult {
                        location: completed.location,
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        etag: completed.etag,
                    };
                    Ok(xml_response(result.to_xml()))
                }
                Err(err) => Err(err),
            }
        }
        _ = &mut first_tick => {
            // Commit to a streaming 200: headers and the XML declaration go
            // out now, the real outcome is appended whenever it arrives.
            let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(8);
            tokio::spawn(stream_completion(
                tx,
                outcome,
                bucket.to_string(),
                key.to_string(),
            ));
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/xml")
                .body(Body::from_stream(rx))
                .map_err(S3Error::internal)
        }
    }
}

fn flatten(
    result: Result<Result<CompletedUpload, S3Error>, oneshot::error::RecvError>,
) -> Result<CompletedUpload, S3Error> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(S3Error::internal("multipart completion worker died")),
    }
}

/// Feed the streaming completion body: the XML declaration first, one space
/// per tick, then exactly one closing element (the result or an `Error`).
/// The response status is already committed as 200 by this point; clients
/// detect failure from the payload. A send failure means the peer closed
/// the connection, in which case the outcome is discarded (the backend
/// worker itself is never interrupted).
async fn stream_completion(
    mut tx: mpsc::Sender<Result<Bytes, Infallible>>,
    mut outcome: oneshot::Receiver<Result<CompletedUpload, S3Error>>,
    bucket: String,
    key: String,
) {
    if tx
        .send(Ok(Bytes::from_static(XML_DECLARATION.as_bytes())))
        .await
        .is_err()
    {
        return;
    }

    let mut ticker = interval_at(Instant::now() + COMPLETE_PING, COMPLETE_PING);
    loop {
        tokio::select! {
            result = &mut outcome => {
                let fragment = match flatten(result) {
                    Ok(completed) => CompleteMultipartUploadResult {
                        location: completed.location,
                        bucket: bucket.clone(),
                        key: key.clone(),
                        etag: completed.etag,
                    }
                    .xml_fragment(),
                    Err(err) => err.xml_fragment(),
                };
                if tx.send(Ok(Bytes::from(fragment))).await.is_err() {
                    debug!("peer closed the connection before the completion outcome was written");
                }
                return;
            }
            _ = ticker.tick() => {
                if tx.send(Ok(Bytes::from_static(b" "))).await.is_err() {
                    debug!("peer closed the connection during completion keepalive");
                    return;
                }
            }
        }
    }
}
