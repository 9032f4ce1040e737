//! Conversions between SDK types and the store model.

use std::io;

use aws_sdk_s3::operation::get_object::GetObjectOutput as SdkGetObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output as SdkListObjectsV2Output;
use aws_sdk_s3::primitives::{ByteStream as SdkByteStream, DateTime as SdkDateTime};
use chrono::{DateTime, Utc};
use s3proxy_model::{GetObjectOutput, ListObjectsV2Output, Object, StreamingBlob};

pub(crate) fn to_sdk_datetime(value: DateTime<Utc>) -> SdkDateTime {
    SdkDateTime::from_secs(value.timestamp())
}

pub(crate) fn from_sdk_datetime(value: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(ToOwned::to_owned)
}

/// Adapt the SDK body into a chunk stream without buffering it.
fn into_blob(body: SdkByteStream, content_length: Option<i64>) -> StreamingBlob {
    let stream = futures::stream::try_unfold(body, |mut body| async move {
        match body.try_next().await {
            Ok(Some(chunk)) => Ok(Some((chunk, body))),
            Ok(None) => Ok(None),
            Err(err) => Err(io::Error::other(err)),
        }
    });
    StreamingBlob::from_stream(stream, content_length.and_then(|n| u64::try_from(n).ok()))
}

pub(crate) fn convert_get_output(output: SdkGetObjectOutput) -> GetObjectOutput {
    let content_length = output.content_length();
    GetObjectOutput {
        cache_control: owned(output.cache_control()),
        content_disposition: owned(output.content_disposition()),
        content_encoding: owned(output.content_encoding()),
        content_language: owned(output.content_language()),
        content_length,
        content_range: owned(output.content_range()),
        content_type: owned(output.content_type()),
        e_tag: owned(output.e_tag()),
        expires: owned(output.expires_string()),
        last_modified: output.last_modified().and_then(from_sdk_datetime),
        metadata: output
            .metadata()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default(),
        body: into_blob(output.body, content_length),
    }
}

pub(crate) fn convert_list_output(output: &SdkListObjectsV2Output) -> ListObjectsV2Output {
    ListObjectsV2Output {
        common_prefixes: output
            .common_prefixes()
            .iter()
            .filter_map(|p| owned(p.prefix()))
            .collect(),
        contents: output
            .contents()
            .iter()
            .map(|o| Object {
                key: o.key().unwrap_or_default().to_owned(),
                size: o.size().unwrap_or_default(),
                last_modified: o.last_modified().and_then(from_sdk_datetime),
                e_tag: owned(o.e_tag()),
            })
            .collect(),
        key_count: output.key_count(),
        max_keys: output.max_keys(),
        next_continuation_token: owned(output.next_continuation_token()),
        is_truncated: output.is_truncated().unwrap_or_default(),
    }
}
