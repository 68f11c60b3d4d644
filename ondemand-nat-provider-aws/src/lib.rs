//! On-demand NAT AWS Provider
//!
//! EC2 implementation of `CloudNetwork` and a CodePipeline `JobReporter`

pub mod convert;
pub mod ec2;
pub mod pipeline;

pub use ec2::Ec2Network;
pub use pipeline::CodePipelineReporter;

use aws_config::{Region, SdkConfig};

/// Load the shared SDK config, optionally pinned to a region
///
/// Without a region the default provider chain decides (`AWS_REGION`,
/// profile, instance metadata).
pub async fn load_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}
