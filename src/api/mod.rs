//! S3 wire surface: routing support, auth, errors, XML, and handlers.

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod xml;

pub use errors::S3Error;
pub use extractors::{ValidatedBucket, ValidatedPath};
