//! Server facade: five controller slots and the router that wires them to
//! the S3 path grammar.

use crate::api::auth::auth_middleware;
use crate::api::errors::S3Error;
use crate::api::extractors::is_valid_bucket_name;
use crate::api::handlers::{bucket, object, service, AppState};
use crate::controller::{
    AuthController, BucketController, MultipartController, ObjectController, RequestContext,
    ServiceController, UnimplementedBucket, UnimplementedMultipart, UnimplementedObject,
    UnimplementedService,
};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// An S3 API server assembled from pluggable backend controllers.
///
/// Construct one, install the controllers you implement, then take the
/// router. Uninstalled controllers answer `NotImplemented`; with no auth
/// controller, requests pass unauthenticated.
///
/// ```ignore
/// let mut server = Sandbar::new();
/// server.service = Arc::new(my_backend.clone());
/// server.bucket = Arc::new(my_backend);
/// axum::serve(listener, server.router()).await?;
/// ```
pub struct Sandbar {
    pub auth: Option<Arc<dyn AuthController>>,
    pub service: Arc<dyn ServiceController>,
    pub bucket: Arc<dyn BucketController>,
    pub object: Arc<dyn ObjectController>,
    pub multipart: Arc<dyn MultipartController>,
}

impl Default for Sandbar {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbar {
    pub fn new() -> Self {
        Self {
            auth: None,
            service: Arc::new(UnimplementedService),
            bucket: Arc::new(UnimplementedBucket),
            object: Arc::new(UnimplementedObject),
            multipart: Arc::new(UnimplementedMultipart),
        }
    }

    /// Build the router. Bucket routes are registered both with and without
    /// a trailing slash; S3 clients tolerate redirects poorly, so both
    /// forms hit the same handlers directly.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            auth: self.auth.clone(),
            service: self.service.clone(),
            bucket: self.bucket.clone(),
            object: self.object.clone(),
            multipart: self.multipart.clone(),
        });

        let mut router = Router::new()
            .route(
                "/",
                get(service::get_service).fallback(method_not_allowed),
            )
            .route("/:bucket", bucket_routes())
            .route("/:bucket/", bucket_routes())
            .route(
                "/:bucket/*key",
                get(object::get_dispatch)
                    .put(object::put_dispatch)
                    .delete(object::delete_dispatch)
                    .post(object::post_dispatch)
                    .fallback(method_not_allowed),
            )
            .fallback(not_found)
            .with_state(state.clone());

        if self.auth.is_some() {
            router = router.layer(middleware::from_fn_with_state::<_, Arc<AppState>, (State<Arc<AppState>>, Request)>(
                state,
                auth_middleware,
            ));
        }

        router
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }
}

fn bucket_routes() -> MethodRouter<Arc<AppState>> {
    get(bucket::get_dispatch)
        .put(bucket::put_dispatch)
        .delete(bucket::delete_dispatch)
        .post(bucket::post_dispatch)
        .fallback(method_not_allowed)
}

/// Assigns every request a random 128-bit identifier, exposes it to
/// handlers through [`RequestContext`], and stamps it on the response as
/// `x-amz-id-2` and `x-amz-request-id`.
async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut()
        .insert(RequestContext::new(request_id.clone()));

    let mut response = next.run(req).await;

    let value = HeaderValue::from_str(&request_id)
        .unwrap_or_else(|_| HeaderValue::from_static(""));
    response.headers_mut().insert("x-amz-id-2", value.clone());
    response.headers_mut().insert("x-amz-request-id", value);
    response
}

/// A matched route with a method outside its table.
async fn method_not_allowed(req: Request) -> Response {
    info!("method not allowed: {} {}", req.method(), req.uri().path());
    S3Error::MethodNotAllowed.into_response()
}

/// Paths that match no route at all. If the path plausibly names a key in a
/// validly-named bucket, answer `NoSuchKey`; otherwise the bucket name
/// itself is the problem.
async fn not_found(uri: Uri) -> Response {
    info!("not found: {}", uri.path());
    let path = uri.path().trim_start_matches('/');
    match path.split_once('/') {
        Some((bucket, _)) if is_valid_bucket_name(bucket) => {
            S3Error::NoSuchKey(uri.path().to_string()).into_response()
        }
        _ => S3Error::InvalidBucketName.into_response(),
    }
}
