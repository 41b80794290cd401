//! S3 error taxonomy and XML error responses

use super::xml::{escape_xml, XML_DECLARATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The closed set of S3 errors this framework produces or passes through.
///
/// Each kind carries an HTTP status, an S3 code string, and a message in the
/// wording S3 clients expect. Backend controllers return these directly;
/// anything else they produce is wrapped as `Internal` (the cause is logged,
/// never written to the wire).
#[derive(Debug, Error)]
pub enum S3Error {
    #[error("Access Denied")]
    AccessDenied,

    #[error("The request signature we calculated does not match the signature you provided.")]
    SignatureDoesNotMatch,

    #[error("The AWS access key ID you provided does not exist in our records.")]
    InvalidAccessKeyId,

    #[error("The authorization header is malformed.")]
    AuthorizationHeaderMalformed,

    #[error("The difference between the request time and the server's time is too large.")]
    RequestTimeTooSkewed,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("The specified bucket is not valid.")]
    InvalidBucketName,

    #[error("The specified bucket does not exist.")]
    NoSuchBucket(String),

    #[error("The specified key does not exist.")]
    NoSuchKey(String),

    #[error("The specified multipart upload does not exist. The upload ID may be invalid, or the upload may have been aborted or completed.")]
    NoSuchUpload(String),

    #[error("The bucket you tried to create already exists, and you own it.")]
    BucketAlreadyOwnedByYou(String),

    #[error("The bucket you tried to delete is not empty.")]
    BucketNotEmpty(String),

    #[error("The versioning configuration specified in the request is invalid.")]
    IllegalVersioningConfiguration,

    #[error("The XML you provided was not well-formed or did not validate against our published schema.")]
    MalformedXML,

    #[error("One or more of the specified parts could not be found. The part may not have been uploaded, or the specified entity tag may not match the part's entity tag.")]
    InvalidPart(String),

    #[error("The list of parts was not in ascending order. Parts list must be specified in order by part number.")]
    InvalidPartOrder,

    #[error("Your proposed upload is smaller than the minimum allowed object size. Each part must be at least 5 MB in size, except the last part.")]
    EntityTooSmall,

    #[error("The Content-MD5 you specified did not match what we received.")]
    BadDigest,

    #[error("You must provide the Content-Length HTTP header.")]
    MissingContentLength,

    #[error("The specified method is not allowed against this resource.")]
    MethodNotAllowed,

    #[error("This functionality is not implemented.")]
    NotImplemented,

    #[error("We encountered an internal error. Please try again.")]
    Internal(String),
}

impl S3Error {
    /// Wrap an arbitrary failure as `Internal`, logging the cause. The cause
    /// never reaches the wire.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        let cause = cause.to_string();
        tracing::error!("internal error: {cause}");
        S3Error::Internal(cause)
    }

    /// The S3 error code string.
    pub fn code(&self) -> &'static str {
        match self {
            S3Error::AccessDenied => "AccessDenied",
            S3Error::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            S3Error::InvalidAccessKeyId => "InvalidAccessKeyId",
            S3Error::AuthorizationHeaderMalformed => "AuthorizationHeaderMalformed",
            S3Error::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            S3Error::InvalidArgument(_) => "InvalidArgument",
            S3Error::InvalidBucketName => "InvalidBucketName",
            S3Error::NoSuchBucket(_) => "NoSuchBucket",
            S3Error::NoSuchKey(_) => "NoSuchKey",
            S3Error::NoSuchUpload(_) => "NoSuchUpload",
            S3Error::BucketAlreadyOwnedByYou(_) => "BucketAlreadyOwnedByYou",
            S3Error::BucketNotEmpty(_) => "BucketNotEmpty",
            S3Error::IllegalVersioningConfiguration => "IllegalVersioningConfigurationException",
            S3Error::MalformedXML => "MalformedXML",
            S3Error::InvalidPart(_) => "InvalidPart",
            S3Error::InvalidPartOrder => "InvalidPartOrder",
            S3Error::EntityTooSmall => "EntityTooSmall",
            S3Error::BadDigest => "BadDigest",
            S3Error::MissingContentLength => "MissingContentLength",
            S3Error::MethodNotAllowed => "MethodNotAllowed",
            S3Error::NotImplemented => "NotImplemented",
            S3Error::Internal(_) => "InternalError",
        }
    }

    /// The HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            S3Error::AccessDenied => StatusCode::FORBIDDEN,
            S3Error::SignatureDoesNotMatch => StatusCode::FORBIDDEN,
            S3Error::InvalidAccessKeyId => StatusCode::FORBIDDEN,
            S3Error::AuthorizationHeaderMalformed => StatusCode::BAD_REQUEST,
            S3Error::RequestTimeTooSkewed => StatusCode::FORBIDDEN,
            S3Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            S3Error::InvalidBucketName => StatusCode::BAD_REQUEST,
            S3Error::NoSuchBucket(_) => StatusCode::NOT_FOUND,
            S3Error::NoSuchKey(_) => StatusCode::NOT_FOUND,
            S3Error::NoSuchUpload(_) => StatusCode::NOT_FOUND,
            S3Error::BucketAlreadyOwnedByYou(_) => StatusCode::CONFLICT,
            S3Error::BucketNotEmpty(_) => StatusCode::CONFLICT,
            S3Error::IllegalVersioningConfiguration => StatusCode::BAD_REQUEST,
            S3Error::MalformedXML => StatusCode::BAD_REQUEST,
            S3Error::InvalidPart(_) => StatusCode::BAD_REQUEST,
            S3Error::InvalidPartOrder => StatusCode::BAD_REQUEST,
            S3Error::EntityTooSmall => StatusCode::BAD_REQUEST,
            S3Error::BadDigest => StatusCode::BAD_REQUEST,
            S3Error::MissingContentLength => StatusCode::LENGTH_REQUIRED,
            S3Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            S3Error::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            S3Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The resource (bucket, key, or upload ID) named in the error, if any.
    fn resource(&self) -> &str {
        match self {
            S3Error::NoSuchBucket(r)
            | S3Error::NoSuchKey(r)
            | S3Error::NoSuchUpload(r)
            | S3Error::BucketAlreadyOwnedByYou(r)
            | S3Error::BucketNotEmpty(r)
            | S3Error::InvalidPart(r) => r,
            _ => "",
        }
    }

    /// The `<Error>` element alone, without the XML declaration. Used when
    /// the response body is already open (multipart completion streaming).
    pub fn xml_fragment(&self) -> String {
        format!(
            "<Error><Code>{}</Code><Message>{}</Message><Resource>{}</Resource></Error>",
            self.code(),
            escape_xml(&self.to_string()),
            escape_xml(self.resource()),
        )
    }

    /// The full XML error document.
    pub fn to_xml(&self) -> String {
        format!("{}{}", XML_DECLARATION, self.xml_fragment())
    }
}

impl IntoResponse for S3Error {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [("Content-Type", "application/xml")],
            self.to_xml(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_taxonomy() {
        assert_eq!(S3Error::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            S3Error::MissingContentLength.status_code(),
            StatusCode::LENGTH_REQUIRED
        );
        assert_eq!(
            S3Error::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            S3Error::NotImplemented.status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            S3Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_document_carries_code_and_resource() {
        let xml = S3Error::NoSuchBucket("photos".into()).to_xml();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml.contains("<Resource>photos</Resource>"));
        assert!(xml.ends_with("</Error>"));
    }

    #[test]
    fn internal_cause_stays_off_the_wire() {
        let xml = S3Error::Internal("db connection refused".into()).to_xml();
        assert!(!xml.contains("db connection refused"));
        assert!(xml.contains("<Code>InternalError</Code>"));
    }

    #[test]
    fn fragment_has_no_declaration() {
        let frag = S3Error::InvalidPartOrder.xml_fragment();
        assert!(frag.starts_with("<Error>"));
        assert!(!frag.contains("<?xml"));
    }
}
