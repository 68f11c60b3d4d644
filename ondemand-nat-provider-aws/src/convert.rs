//! Conversion between EC2 SDK types and the core records
//!
//! Filters are translated to EC2 filter names (`tag:Key`, `vpc-id`, and the
//! per-resource state filter), SDK error codes are mapped to
//! `NetworkErrorKind`, and smithy timestamps become `chrono` values.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::primitives::DateTime as SmithyDateTime;
use aws_sdk_ec2::types::{Filter as Ec2Filter, Tag as Ec2Tag};
use chrono::{DateTime, Utc};

use ondemand_nat_core::network::{Filter, NetworkError, NetworkErrorKind};
use ondemand_nat_core::resource::Tag;

/// EC2 filter name for the network scope
const VPC_FILTER: &str = "vpc-id";

/// Translate core filters to EC2 filters
///
/// `state_filter` is the resource-specific name of the lifecycle filter
/// (e.g., "instance-state-name" for instances, "state" for NAT gateways).
pub fn to_ec2_filters(filters: &[Filter], state_filter: &str) -> Vec<Ec2Filter> {
    filters
        .iter()
        .map(|f| match f {
            Filter::Tag { key, values } => Ec2Filter::builder()
                .name(format!("tag:{}", key))
                .set_values(Some(values.clone()))
                .build(),
            Filter::State(states) => Ec2Filter::builder()
                .name(state_filter)
                .set_values(Some(states.clone()))
                .build(),
            Filter::Network(id) => Ec2Filter::builder().name(VPC_FILTER).values(id).build(),
        })
        .collect()
}

pub fn from_ec2_tags(tags: &[Ec2Tag]) -> Vec<Tag> {
    tags.iter()
        .filter_map(|t| match (t.key(), t.value()) {
            (Some(k), Some(v)) => Some(Tag::new(k, v)),
            (Some(k), None) => Some(Tag::new(k, "")),
            _ => None,
        })
        .collect()
}

pub fn to_ec2_tags(tags: &[Tag]) -> Vec<Ec2Tag> {
    tags.iter()
        .map(|t| Ec2Tag::builder().key(&t.key).value(&t.value).build())
        .collect()
}

pub fn to_chrono(at: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}

/// Map an EC2 error code to an error kind
pub fn error_kind(code: Option<&str>) -> NetworkErrorKind {
    match code {
        Some(c) if c.ends_with("NotFound") => NetworkErrorKind::NotFound,
        Some("RequestLimitExceeded" | "Throttling" | "ThrottlingException") => {
            NetworkErrorKind::Throttled
        }
        Some(c) if c == "UnauthorizedOperation" || c.starts_with("AccessDenied") => {
            NetworkErrorKind::AccessDenied
        }
        _ => NetworkErrorKind::Other,
    }
}

/// Convert an SDK failure into a classified NetworkError
pub fn network_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> NetworkError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let kind = error_kind(err.code());
    let message = match (err.code(), err.message()) {
        (Some(code), Some(msg)) => format!("{}: {}", code, msg),
        (Some(code), None) => code.to_string(),
        _ => format!("{}", DisplayErrorContext(&err)),
    };
    NetworkError::new(kind, message).for_operation(operation)
}
