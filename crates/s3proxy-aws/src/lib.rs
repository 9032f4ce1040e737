//! Amazon S3 backend for s3proxy.
//!
//! [`AwsObjectStore`] implements [`s3proxy_core::ObjectStore`] with the AWS
//! SDK. Credentials come from the default provider chain; region, endpoint,
//! path-style and accelerate settings come from the proxy configuration.

mod client;
mod convert;
mod error;

pub use client::AwsObjectStore;
