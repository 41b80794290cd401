//! S3 API request handlers
//!
//! Split by surface area:
//! - `service` — the service root (`GET /`)
//! - `bucket` — bucket CRUD, listings, versioning, location
//! - `object` — object GET/PUT/DELETE
//! - `multipart` — the multipart upload lifecycle
//!
//! Handlers are thin: parse the request shape, invoke a backend controller,
//! render the result as XML with the headers S3 clients expect.

pub mod bucket;
pub mod multipart;
pub mod object;
pub mod service;

use super::errors::S3Error;
use crate::api::auth::parse_query_pairs;
use crate::controller::{
    AuthController, BucketController, MultipartController, ObjectController, ServiceController,
};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Shared state handed to every handler: the five controller slots.
pub struct AppState {
    pub auth: Option<Arc<dyn AuthController>>,
    pub service: Arc<dyn ServiceController>,
    pub bucket: Arc<dyn BucketController>,
    pub object: Arc<dyn ObjectController>,
    pub multipart: Arc<dyn MultipartController>,
}

/// Decoded query pairs, used for subresource demultiplexing. Bare keys
/// (`?uploads`) decode to an empty value.
pub(crate) struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        Self(parse_query_pairs(query.unwrap_or("")))
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The value for a key, or the empty string.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }
}

/// Bounded integer extraction from the query string: absent or empty means
/// the default; anything unparseable or out of range is `InvalidArgument`.
pub(crate) fn int_query(
    query: &QueryParams,
    name: &str,
    min: u32,
    max: u32,
    default: u32,
) -> Result<u32, S3Error> {
    match query.get(name) {
        None => Ok(default),
        Some("") => Ok(default),
        Some(s) => s
            .parse::<u32>()
            .ok()
            .filter(|v| (min..=max).contains(v))
            .ok_or_else(|| S3Error::InvalidArgument(format!("invalid value for {name}"))),
    }
}

/// Truncate a `max + 1`-sized backend listing down to the client's limit.
/// Returns whether the listing overflowed; with `max == 0` any result at
/// all counts as overflow.
pub(crate) fn truncate_listing<T>(items: &mut Vec<T>, max: u32) -> bool {
    if items.len() > max as usize {
        items.truncate(max as usize);
        true
    } else {
        false
    }
}

type SubresourceRule = (&'static str, &'static [&'static str]);

/// Bucket-level subresources the framework recognizes but answers
/// `NotImplemented` for, per method.
const BUCKET_UNIMPLEMENTED: &[SubresourceRule] = &[
    ("accelerate", &["GET", "PUT"]),
    ("acl", &["GET", "PUT"]),
    ("analytics", &["GET", "PUT", "DELETE"]),
    ("cors", &["GET", "PUT", "DELETE"]),
    ("encryption", &["GET", "PUT", "DELETE"]),
    ("inventory", &["GET", "PUT", "DELETE"]),
    ("lifecycle", &["GET", "PUT", "DELETE"]),
    ("logging", &["GET", "PUT"]),
    ("metrics", &["GET", "PUT", "DELETE"]),
    ("notification", &["GET", "PUT"]),
    ("object-lock", &["GET", "PUT"]),
    ("policy", &["GET", "PUT", "DELETE"]),
    ("policyStatus", &["GET"]),
    ("publicAccessBlock", &["GET", "PUT", "DELETE"]),
    ("replication", &["PUT", "DELETE"]),
    ("requestPayment", &["GET", "PUT"]),
    ("tagging", &["GET", "PUT", "DELETE"]),
    ("website", &["GET", "PUT", "DELETE"]),
];

/// Object-level counterpart of [`BUCKET_UNIMPLEMENTED`].
const OBJECT_UNIMPLEMENTED: &[SubresourceRule] = &[
    ("acl", &["GET", "PUT"]),
    ("legal-hold", &["GET", "PUT"]),
    ("retention", &["GET", "PUT"]),
    ("tagging", &["GET", "PUT", "DELETE"]),
    ("torrent", &["GET"]),
    ("restore", &["POST"]),
    ("select", &["POST"]),
];

fn check_unimplemented(
    table: &[SubresourceRule],
    method: &Method,
    query: &QueryParams,
) -> Result<(), S3Error> {
    for (key, methods) in table {
        if query.has(key) && methods.contains(&method.as_str()) {
            return Err(S3Error::NotImplemented);
        }
    }
    Ok(())
}

pub(crate) fn check_bucket_unimplemented(
    method: &Method,
    query: &QueryParams,
) -> Result<(), S3Error> {
    check_unimplemented(BUCKET_UNIMPLEMENTED, method, query)
}

pub(crate) fn check_object_unimplemented(
    method: &Method,
    query: &QueryParams,
) -> Result<(), S3Error> {
    check_unimplemented(OBJECT_UNIMPLEMENTED, method, query)
}

/// Build a 200 XML response with the right content type.
pub(crate) fn xml_response(xml: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "application/xml")],
        xml.into(),
    )
        .into_response()
}

/// Puts require an explicit `Content-Length`.
pub(crate) fn require_content_length(headers: &HeaderMap) -> Result<(), S3Error> {
    if headers.contains_key("content-length") {
        Ok(())
    } else {
        Err(S3Error::MissingContentLength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_query_policy() {
        let q = QueryParams::parse(Some("max-keys=5&bad=abc&neg=-1&empty="));
        assert_eq!(int_query(&q, "max-keys", 0, 1000, 1000).unwrap(), 5);
        assert_eq!(int_query(&q, "absent", 0, 1000, 42).unwrap(), 42);
        assert_eq!(int_query(&q, "empty", 0, 1000, 42).unwrap(), 42);
        assert!(int_query(&q, "bad", 0, 1000, 0).is_err());
        assert!(int_query(&q, "neg", 0, 1000, 0).is_err());
        assert!(int_query(&q, "max-keys", 6, 1000, 0).is_err());
    }

    #[test]
    fn bare_query_keys_are_present_with_empty_values() {
        let q = QueryParams::parse(Some("uploads&uploadId=abc"));
        assert!(q.has("uploads"));
        assert_eq!(q.value("uploads"), "");
        assert_eq!(q.get("uploadId"), Some("abc"));
        assert!(!q.has("missing"));
    }

    #[test]
    fn truncation_observes_overflow() {
        let mut items = vec![1, 2, 3];
        assert!(truncate_listing(&mut items, 2));
        assert_eq!(items, vec![1, 2]);

        let mut items = vec![1, 2];
        assert!(!truncate_listing(&mut items, 2));

        // max-keys=0: anything returned at all flags truncation
        let mut items = vec![1];
        assert!(truncate_listing(&mut items, 0));
        assert!(items.is_empty());
    }

    #[test]
    fn unimplemented_tables_are_method_specific() {
        let q = QueryParams::parse(Some("acl"));
        assert!(check_bucket_unimplemented(&Method::GET, &q).is_err());
        assert!(check_bucket_unimplemented(&Method::DELETE, &q).is_ok());

        let q = QueryParams::parse(Some("torrent"));
        assert!(check_object_unimplemented(&Method::GET, &q).is_err());
        assert!(check_object_unimplemented(&Method::PUT, &q).is_ok());

        let q = QueryParams::parse(Some("uploads"));
        assert!(check_bucket_unimplemented(&Method::GET, &q).is_ok());
    }
}
