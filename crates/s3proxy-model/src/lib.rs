//! Object store data model for s3proxy.
//!
//! The types here describe the four store operations the proxy performs
//! (get, put, delete and list) independently of any particular backend, plus
//! the [`StoreError`] every backend reports failures with.

pub mod body;
pub mod error;
pub mod input;
pub mod output;

pub use body::{ByteStream, StreamingBlob};
pub use error::{StoreError, StoreErrorCode};
pub use input::{DeleteObjectInput, GetObjectInput, ListObjectsV2Input, PutObjectInput};
pub use output::{GetObjectOutput, ListObjectsV2Output, Object, PutObjectOutput};
