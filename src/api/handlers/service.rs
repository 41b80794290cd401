//! Service-level handler: `GET /` lists all buckets.

use super::{xml_response, AppState, S3Error};
use crate::api::xml::ListAllMyBucketsResult;
use crate::controller::RequestContext;
use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use std::sync::Arc;
use tracing::{info, instrument};

/// ListBuckets handler
/// GET /
#[instrument(skip(state, ctx))]
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, S3Error> {
    info!("ListBuckets");

    let (owner, buckets) = state.service.list_buckets(&ctx).await?;
    let result = ListAllMyBucketsResult { owner, buckets };
    Ok(xml_response(result.to_xml()))
}
