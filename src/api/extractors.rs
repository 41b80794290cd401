//! Custom axum extractors for S3 path validation
//!
//! Bucket names follow the same grammar the AWS CLI validates against:
//! 1-255 characters drawn from `[a-zA-Z0-9_.\-]`. Keys are any non-empty
//! remainder of the path; a trailing slash names a key ending in `/`.

use super::errors::S3Error;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// Whether a bucket name matches `^[a-zA-Z0-9_.\-]{1,255}$`.
pub fn is_valid_bucket_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Bucket extractor rejecting invalid names with `InvalidBucketName`.
#[derive(Debug, Clone)]
pub struct ValidatedBucket(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedBucket
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(bucket): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidBucketName)?;

        if !is_valid_bucket_name(&bucket) {
            return Err(S3Error::InvalidBucketName);
        }

        Ok(ValidatedBucket(bucket))
    }
}

/// Bucket-and-key extractor for object routes.
#[derive(Debug, Clone)]
pub struct ValidatedPath {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedPath
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((bucket, key)): Path<(String, String)> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidBucketName)?;

        if !is_valid_bucket_name(&bucket) {
            return Err(S3Error::InvalidBucketName);
        }
        if key.is_empty() {
            return Err(S3Error::NoSuchKey(key));
        }

        Ok(ValidatedPath { bucket, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_name_boundaries() {
        assert!(!is_valid_bucket_name(""));
        assert!(is_valid_bucket_name("a"));
        assert!(is_valid_bucket_name(&"a".repeat(255)));
        assert!(!is_valid_bucket_name(&"a".repeat(256)));
    }

    #[test]
    fn bucket_name_characters() {
        assert!(is_valid_bucket_name("my-bucket_1.0"));
        assert!(is_valid_bucket_name("MixedCase"));
        assert!(!is_valid_bucket_name("a/b"));
        assert!(!is_valid_bucket_name("a b"));
        assert!(!is_valid_bucket_name("bucket!"));
    }
}
