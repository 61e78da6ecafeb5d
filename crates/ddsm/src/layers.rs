//! layer ARN lookup
//!
//! [LayerLookup] is the seam to whatever knows which layer versions are published where.
//! [DatadogLayers] builds ARNs from the public naming scheme.
use crate::runtime::{self, Architecture, Runtime};

/// A layer the engine may attach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer<'r> {
    /// runtime library for a function runtime
    Library {
        runtime: Runtime,
        runtime_id: &'r str,
        architecture: Architecture,
    },
    /// the extension (local collector), runtime independent
    Extension { architecture: Architecture },
}

impl Layer<'_> {
    /// Name prefix shared by every layer of this family, across runtime versions and architectures
    pub fn family(&self) -> &'static str {
        match self {
            Layer::Library {
                runtime: Runtime::Node,
                ..
            } => "Datadog-Node",
            Layer::Library {
                runtime: Runtime::Python,
                ..
            } => "Datadog-Python",
            Layer::Library { .. } => "Datadog-Library",
            Layer::Extension { .. } => "Datadog-Extension",
        }
    }

    /// Whether a layer ARN already in a template belongs to this family
    pub fn is_family_member(&self, arn: &str) -> bool {
        arn.contains(&format!(":layer:{}", self.family()))
    }

    /// Full layer name, None when nothing is published for the runtime
    pub fn name(&self) -> Option<String> {
        match self {
            Layer::Library {
                runtime_id,
                architecture,
                ..
            } => runtime::library_layer_name(runtime_id, *architecture),
            Layer::Extension {
                architecture: Architecture::Arm64,
            } => Some("Datadog-Extension-ARM".to_string()),
            Layer::Extension {
                architecture: Architecture::X86_64,
            } => Some("Datadog-Extension".to_string()),
        }
    }
}

impl std::fmt::Display for Layer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Library { runtime_id, .. } => write!(f, "library layer for `{runtime_id}`"),
            Layer::Extension { .. } => f.write_str("extension layer"),
        }
    }
}

pub trait LayerLookup {
    /// ARN of a layer version in a region, None when it is not published there
    fn layer_arn(&self, layer: &Layer<'_>, version: u32, region: &str) -> Option<String>;
}

const COMMERCIAL_ACCOUNT: &str = "464622532012";
const GOVCLOUD_ACCOUNT: &str = "002406178527";

/// Public layers: `arn:{partition}:lambda:{region}:{account}:layer:{name}:{version}`
#[derive(Debug, Default, Clone, Copy)]
pub struct DatadogLayers;

impl LayerLookup for DatadogLayers {
    fn layer_arn(&self, layer: &Layer<'_>, version: u32, region: &str) -> Option<String> {
        if region.is_empty() || region.starts_with("cn-") {
            return None;
        }

        let (partition, account) = if region.starts_with("us-gov-") {
            ("aws-us-gov", GOVCLOUD_ACCOUNT)
        } else {
            ("aws", COMMERCIAL_ACCOUNT)
        };

        let name = layer.name()?;
        Some(format!(
            "arn:{partition}:lambda:{region}:{account}:layer:{name}:{version}"
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn python(architecture: Architecture) -> Layer<'static> {
        Layer::Library {
            runtime: Runtime::Python,
            runtime_id: "python3.12",
            architecture,
        }
    }

    #[test]
    fn commercial_arn() {
        assert_eq!(
            DatadogLayers.layer_arn(&python(Architecture::X86_64), 98, "eu-west-1"),
            Some("arn:aws:lambda:eu-west-1:464622532012:layer:Datadog-Python312:98".into())
        );
    }

    #[test]
    fn govcloud_arn() {
        let extension = Layer::Extension {
            architecture: Architecture::Arm64,
        };
        assert_eq!(
            DatadogLayers.layer_arn(&extension, 65, "us-gov-west-1"),
            Some(
                "arn:aws-us-gov:lambda:us-gov-west-1:002406178527:layer:Datadog-Extension-ARM:65"
                    .into()
            )
        );
    }

    #[test]
    fn unsupported_region() {
        assert_eq!(
            DatadogLayers.layer_arn(&python(Architecture::X86_64), 98, "cn-north-1"),
            None
        );
    }

    #[test]
    fn family_membership() {
        let layer = python(Architecture::X86_64);
        assert!(layer.is_family_member(
            "arn:aws:lambda:us-east-1:464622532012:layer:Datadog-Python39-ARM:70"
        ));
        assert!(!layer.is_family_member(
            "arn:aws:lambda:us-east-1:464622532012:layer:Datadog-Extension:60"
        ));
        assert!(!layer.is_family_member("arn:aws:lambda:us-east-1:123456789012:layer:deps:3"));
    }
}
