//! runtime classification
//!
//! A static table maps runtime identifiers to the library they get instrumented with. Runtimes
//! not in the table are [Runtime::Other]: they still get generic instrumentation, but no layers.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Runtime {
    Node,
    Python,
    Other,
}

impl Runtime {
    /// Whether a runtime library layer exists for this runtime
    pub fn has_library(&self) -> bool {
        !matches!(self, Runtime::Other)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    #[default]
    X86_64,
    Arm64,
}

impl Architecture {
    /// Parse a function's `Architectures` property (`["arm64"]`)
    pub fn from_property(value: Option<&serde_json::Value>) -> Self {
        let is_arm = value
            .and_then(|v| v.as_array())
            .and_then(|list| list.first())
            .and_then(|v| v.as_str())
            .is_some_and(|arch| arch == "arm64");

        if is_arm {
            Architecture::Arm64
        } else {
            Architecture::X86_64
        }
    }
}

/// (runtime identifier, classification, library layer name)
static RUNTIMES: &[(&str, Runtime, &str)] = &[
    ("nodejs16.x", Runtime::Node, "Datadog-Node16-x"),
    ("nodejs18.x", Runtime::Node, "Datadog-Node18-x"),
    ("nodejs20.x", Runtime::Node, "Datadog-Node20-x"),
    ("nodejs22.x", Runtime::Node, "Datadog-Node22-x"),
    ("python3.8", Runtime::Python, "Datadog-Python38"),
    ("python3.9", Runtime::Python, "Datadog-Python39"),
    ("python3.10", Runtime::Python, "Datadog-Python310"),
    ("python3.11", Runtime::Python, "Datadog-Python311"),
    ("python3.12", Runtime::Python, "Datadog-Python312"),
    ("python3.13", Runtime::Python, "Datadog-Python313"),
];

const FUNCTION_TYPES: &[&str] = &["AWS::Lambda::Function", "AWS::Serverless::Function"];

/// Classify the runtime of a resource
///
/// Only function resources have a runtime, everything else is [Runtime::Other].
pub fn runtime_of(resource_type: &str, runtime_id: &str) -> Runtime {
    if !FUNCTION_TYPES.contains(&resource_type) {
        return Runtime::Other;
    }

    RUNTIMES
        .iter()
        .find(|(id, _, _)| *id == runtime_id)
        .map(|(_, runtime, _)| *runtime)
        .unwrap_or(Runtime::Other)
}

/// Name of the library layer for a runtime identifier
///
/// Python layers are built per architecture, Node layers are shared.
pub fn library_layer_name(runtime_id: &str, architecture: Architecture) -> Option<String> {
    let (_, runtime, name) = RUNTIMES.iter().find(|(id, _, _)| *id == runtime_id)?;

    match (runtime, architecture) {
        (Runtime::Python, Architecture::Arm64) => Some(format!("{name}-ARM")),
        _ => Some(name.to_string()),
    }
}
