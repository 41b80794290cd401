//! Backend controller contracts
//!
//! A server is assembled from up to five controllers. Each controller is an
//! optional capability: anything the embedder does not install answers
//! `NotImplemented`. The framework owns routing, auth, XML, and response
//! shapes; controllers own the storage semantics.

use crate::api::errors::S3Error;
use crate::api::xml::{
    BucketEntry, Contents, Part, Upload, User, VersionEntry, VersioningState,
};
use async_trait::async_trait;
use axum::body::Body;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Per-request state, created by the request-ID middleware and enriched by
/// the auth middleware. Handlers hand it to every controller call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Random 128-bit identifier in canonical UUID form; also exposed as the
    /// `x-amz-request-id` and `x-amz-id-2` response headers.
    pub request_id: String,
    /// Present once the auth middleware has verified the request.
    pub auth: Option<AuthInfo>,
}

impl RequestContext {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            auth: None,
        }
    }
}

/// How a request was authenticated.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub method: AuthMethod,
    pub access_key: String,
    /// Only populated for V4, where the credential scope names a region.
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    V2,
    V4,
    Custom,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::V2 => "v2",
            AuthMethod::V4 => "v4",
            AuthMethod::Custom => "custom",
        }
    }
}

/// Streaming response body handed back by object GETs.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static>>;

/// Request body stream handed to controllers on object and part uploads.
///
/// The reader records whether any bytes were pulled, so the part-upload
/// handler can attempt chunk cleanup when a backend fails after it began
/// consuming the body.
pub struct BodyReader {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, axum::Error>> + Send + 'static>>,
    consumed: Arc<AtomicBool>,
}

impl BodyReader {
    /// Wrap a request body. The returned flag flips to `true` as soon as the
    /// controller pulls the first chunk.
    pub(crate) fn wrap(body: Body) -> (Self, Arc<AtomicBool>) {
        let consumed = Arc::new(AtomicBool::new(false));
        let reader = Self {
            inner: Box::pin(body.into_data_stream()),
            consumed: consumed.clone(),
        };
        (reader, consumed)
    }

    /// Build a reader over in-memory bytes. Intended for backends' own tests.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let (reader, _) = Self::wrap(Body::from(data.into()));
        reader
    }

    /// Drain the stream into a single buffer.
    pub async fn read_all(mut self) -> Result<Bytes, S3Error> {
        use futures::StreamExt;
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for BodyReader {
    type Item = Result<Bytes, S3Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.consumed.store(true, Ordering::Relaxed);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(S3Error::internal(err)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Result of an object GET.
pub struct GetObjectResult {
    pub body: ByteStream,
    pub size: u64,
    /// Bare hex digest; the framework quotes it for the `ETag` header.
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub version_id: Option<String>,
    /// When the addressed version is a delete marker the framework answers
    /// `NoSuchKey` with `x-amz-delete-marker: true`.
    pub delete_marker: bool,
}

/// Result of an object PUT.
pub struct PutObjectResult {
    pub etag: String,
    pub version_id: Option<String>,
}

/// Result of an object DELETE.
pub struct DeleteObjectResult {
    pub version_id: Option<String>,
    pub delete_marker: bool,
}

/// A page of objects from a bucket listing. The framework asks for one item
/// more than the client's limit and computes truncation itself.
pub struct ObjectList {
    pub contents: Vec<Contents>,
    pub common_prefixes: Vec<String>,
}

/// Result of a part listing.
pub struct MultipartChunks {
    pub initiator: Option<User>,
    pub owner: Option<User>,
    pub storage_class: String,
    pub parts: Vec<Part>,
}

/// Result of a completed multipart upload.
#[derive(Debug)]
pub struct CompletedUpload {
    pub location: String,
    /// Bare hex digest of the assembled object.
    pub etag: String,
}

/// Credential lookup and custom authentication.
#[async_trait]
pub trait AuthController: Send + Sync {
    /// The secret key for an access key, or `None` when the access key is
    /// unknown. V4 requests carry the region from the credential scope.
    async fn secret_key(
        &self,
        ctx: &RequestContext,
        access_key: &str,
        region: Option<&str>,
    ) -> Result<Option<String>, S3Error>;

    /// Fallback for requests whose `Authorization` header is neither V2 nor
    /// V4. Returning `Ok(false)` denies the request.
    async fn custom_auth(&self, ctx: &RequestContext) -> Result<bool, S3Error> {
        let _ = ctx;
        Ok(false)
    }
}

/// Service-level operations (`GET /`).
#[async_trait]
pub trait ServiceController: Send + Sync {
    async fn list_buckets(
        &self,
        ctx: &RequestContext,
    ) -> Result<(User, Vec<BucketEntry>), S3Error>;
}

/// Bucket-level operations.
#[async_trait]
pub trait BucketController: Send + Sync {
    async fn create_bucket(&self, ctx: &RequestContext, bucket: &str) -> Result<(), S3Error>;

    async fn delete_bucket(&self, ctx: &RequestContext, bucket: &str) -> Result<(), S3Error>;

    /// List at most `max_keys` objects starting strictly after `marker`.
    /// Delimiter handling is backend-defined; backends may reject it.
    #[allow(clippy::too_many_arguments)]
    async fn list_objects(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: u32,
    ) -> Result<ObjectList, S3Error>;

    #[allow(clippy::too_many_arguments)]
    async fn list_object_versions(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        prefix: &str,
        key_marker: &str,
        version_id_marker: &str,
        delimiter: &str,
        max_keys: u32,
    ) -> Result<Vec<VersionEntry>, S3Error>;

    async fn get_bucket_versioning(
        &self,
        ctx: &RequestContext,
        bucket: &str,
    ) -> Result<VersioningState, S3Error>;

    async fn set_bucket_versioning(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        state: VersioningState,
    ) -> Result<(), S3Error>;

    async fn bucket_location(&self, ctx: &RequestContext, bucket: &str)
        -> Result<String, S3Error>;
}

/// Object-level operations.
#[async_trait]
pub trait ObjectController: Send + Sync {
    async fn get_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error>;

    async fn put_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        body: BodyReader,
    ) -> Result<PutObjectResult, S3Error>;

    async fn delete_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<DeleteObjectResult, S3Error>;
}

/// Multipart-upload operations.
#[async_trait]
pub trait MultipartController: Send + Sync {
    /// List at most `max_uploads` uploads starting strictly after the
    /// `(key_marker, upload_id_marker)` cursor.
    async fn list_multipart_uploads(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key_marker: &str,
        upload_id_marker: &str,
        max_uploads: u32,
    ) -> Result<Vec<Upload>, S3Error>;

    /// Begin an upload and mint its opaque upload ID.
    async fn init_multipart(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<String, S3Error>;

    async fn abort_multipart(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error>;

    /// Assemble the named parts into the final object. May take long enough
    /// that the HTTP handler starts streaming keepalive whitespace; see the
    /// multipart handler.
    async fn complete_multipart(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<Part>,
    ) -> Result<CompletedUpload, S3Error>;

    #[allow(clippy::too_many_arguments)]
    async fn list_multipart_chunks(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number_marker: u32,
        max_parts: u32,
    ) -> Result<MultipartChunks, S3Error>;

    /// Store one part, returning its bare hex MD5.
    #[allow(clippy::too_many_arguments)]
    async fn upload_multipart_chunk(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: BodyReader,
    ) -> Result<String, S3Error>;

    async fn delete_multipart_chunk(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<(), S3Error>;
}

// ---------------------------------------------------------------------------
// Not-implemented defaults
// ---------------------------------------------------------------------------

/// Default service controller: every operation is `NotImplemented`.
pub struct UnimplementedService;

#[async_trait]
impl ServiceController for UnimplementedService {
    async fn list_buckets(
        &self,
        _ctx: &RequestContext,
    ) -> Result<(User, Vec<BucketEntry>), S3Error> {
        Err(S3Error::NotImplemented)
    }
}

/// Default bucket controller: every operation is `NotImplemented`.
pub struct UnimplementedBucket;

#[async_trait]
impl BucketController for UnimplementedBucket {
    async fn create_bucket(&self, _ctx: &RequestContext, _bucket: &str) -> Result<(), S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn delete_bucket(&self, _ctx: &RequestContext, _bucket: &str) -> Result<(), S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn list_objects(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _prefix: &str,
        _marker: &str,
        _delimiter: &str,
        _max_keys: u32,
    ) -> Result<ObjectList, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn list_object_versions(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _prefix: &str,
        _key_marker: &str,
        _version_id_marker: &str,
        _delimiter: &str,
        _max_keys: u32,
    ) -> Result<Vec<VersionEntry>, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn get_bucket_versioning(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
    ) -> Result<VersioningState, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn set_bucket_versioning(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _state: VersioningState,
    ) -> Result<(), S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn bucket_location(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
    ) -> Result<String, S3Error> {
        Err(S3Error::NotImplemented)
    }
}

/// Default object controller: every operation is `NotImplemented`.
pub struct UnimplementedObject;

#[async_trait]
impl ObjectController for UnimplementedObject {
    async fn get_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn put_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _body: BodyReader,
    ) -> Result<PutObjectResult, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn delete_object(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _version_id: Option<&str>,
    ) -> Result<DeleteObjectResult, S3Error> {
        Err(S3Error::NotImplemented)
    }
}

/// Default multipart controller: every operation is `NotImplemented`.
pub struct UnimplementedMultipart;

#[async_trait]
impl MultipartController for UnimplementedMultipart {
    async fn list_multipart_uploads(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key_marker: &str,
        _upload_id_marker: &str,
        _max_uploads: u32,
    ) -> Result<Vec<Upload>, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn init_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
    ) -> Result<String, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn abort_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
    ) -> Result<(), S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn complete_multipart(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _parts: Vec<Part>,
    ) -> Result<CompletedUpload, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn list_multipart_chunks(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _part_number_marker: u32,
        _max_parts: u32,
    ) -> Result<MultipartChunks, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn upload_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _part_number: u32,
        _body: BodyReader,
    ) -> Result<String, S3Error> {
        Err(S3Error::NotImplemented)
    }

    async fn delete_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _part_number: u32,
    ) -> Result<(), S3Error> {
        Err(S3Error::NotImplemented)
    }
}
