//! sandbar - an S3-wire-compatible server framework
//!
//! The framework owns the hard protocol surface: request routing over the
//! S3 path-and-subresource grammar, AWS Signature V4 and V2 verification,
//! the multipart completion keepalive, and the S3 error taxonomy rendered
//! as XML. Storage semantics live behind five pluggable controller traits;
//! anything not installed answers `NotImplemented`.
//!
//! An in-memory backend ships in [`memory`] for demos and tests.

pub mod api;
pub mod config;
pub mod controller;
pub mod memory;
pub mod server;

pub use api::errors::S3Error;
pub use controller::{
    AuthController, BucketController, MultipartController, ObjectController, RequestContext,
    ServiceController,
};
pub use server::Sandbar;
