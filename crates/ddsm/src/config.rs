//! configuration model
//!
//! [Configuration] is the effective configuration of one transform. Every option always has a value:
//! either an explicit one or its default. Options without a meaningful default are [Option]s and
//! resolve to [None].
//!
//! Option names are the ones users write in the mapping block and in macro parameters (`camelCase`).
//! [OPTIONS] lists them together with the kind of value they accept.
use crate::env_vars;
use serde::{Deserialize, Serialize};

/// Site used when none is configured
pub const DEFAULT_SITE: &str = "datadoghq.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Configuration {
    /// Attach the runtime library layer (and redirect the handler to it)
    pub add_layers: bool,
    pub api_key: Option<String>,
    #[serde(rename = "apiKMSKey")]
    pub api_kms_key: Option<String>,
    pub api_key_secret_arn: Option<String>,
    pub site: String,
    pub log_level: Option<String>,
    /// Submit metrics through logs (and the forwarder) instead of synchronously
    pub flush_metrics_to_logs: bool,
    pub enable_enhanced_metrics: bool,
    #[serde(rename = "enableDDLogs")]
    pub enable_dd_logs: bool,
    #[serde(rename = "enableDDTracing")]
    pub enable_dd_tracing: bool,
    pub enable_xray_tracing: bool,
    pub enable_merge_xray_traces: bool,
    pub capture_lambda_payload: bool,
    pub inject_log_context: bool,
    pub forwarder_arn: Option<String>,
    pub node_layer_version: Option<u32>,
    pub python_layer_version: Option<u32>,
    /// Version of the extension layer (the local collector)
    pub extension_layer_version: Option<u32>,
    pub service: Option<String>,
    pub env: Option<String>,
    pub version: Option<String>,
    /// Comma separated `key:value` pairs
    pub tags: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            add_layers: true,
            api_key: None,
            api_kms_key: None,
            api_key_secret_arn: None,
            site: DEFAULT_SITE.to_string(),
            log_level: None,
            flush_metrics_to_logs: true,
            enable_enhanced_metrics: true,
            enable_dd_logs: true,
            enable_dd_tracing: true,
            enable_xray_tracing: false,
            enable_merge_xray_traces: false,
            capture_lambda_payload: false,
            inject_log_context: true,
            forwarder_arn: None,
            node_layer_version: None,
            python_layer_version: None,
            extension_layer_version: None,
            service: None,
            env: None,
            version: None,
            tags: None,
        }
    }
}

impl Configuration {
    /// All credential options that are set, in [Credential::ALL] order
    pub fn credentials(&self) -> Vec<(Credential, &str)> {
        Credential::ALL
            .into_iter()
            .filter_map(|credential| credential.value(self).map(|value| (credential, value)))
            .collect()
    }

    /// The credential to inject
    ///
    /// After validation there is at most one.
    pub fn credential(&self) -> Option<(Credential, &str)> {
        self.credentials().into_iter().next()
    }

    /// Whether the extension layer (local collector) is enabled
    pub fn extension_enabled(&self) -> bool {
        self.extension_layer_version.is_some()
    }

    /// Metrics are sent from inside the invocation: neither through logs nor through the extension
    pub fn synchronous_metrics(&self) -> bool {
        !self.flush_metrics_to_logs && !self.extension_enabled()
    }
}

/// The mutually exclusive ways to hand an API key to the runtime library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    ApiKey,
    KmsKey,
    SecretArn,
}

impl Credential {
    pub const ALL: [Credential; 3] = [Credential::ApiKey, Credential::KmsKey, Credential::SecretArn];

    pub fn option_name(&self) -> &'static str {
        match self {
            Credential::ApiKey => "apiKey",
            Credential::KmsKey => "apiKMSKey",
            Credential::SecretArn => "apiKeySecretArn",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Credential::ApiKey => env_vars::API_KEY,
            Credential::KmsKey => env_vars::KMS_API_KEY,
            Credential::SecretArn => env_vars::API_KEY_SECRET_ARN,
        }
    }

    fn value<'c>(&self, config: &'c Configuration) -> Option<&'c str> {
        match self {
            Credential::ApiKey => config.api_key.as_deref(),
            Credential::KmsKey => config.api_kms_key.as_deref(),
            Credential::SecretArn => config.api_key_secret_arn.as_deref(),
        }
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.option_name())
    }
}

/// Kind of value an option accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    Integer,
    String,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionKind::Boolean => f.write_str("a boolean"),
            OptionKind::Integer => f.write_str("a non-negative integer"),
            OptionKind::String => f.write_str("a string"),
        }
    }
}

/// Every recognized option
pub const OPTIONS: &[(&str, OptionKind)] = &[
    ("addLayers", OptionKind::Boolean),
    ("apiKey", OptionKind::String),
    ("apiKMSKey", OptionKind::String),
    ("apiKeySecretArn", OptionKind::String),
    ("site", OptionKind::String),
    ("logLevel", OptionKind::String),
    ("flushMetricsToLogs", OptionKind::Boolean),
    ("enableEnhancedMetrics", OptionKind::Boolean),
    ("enableDDLogs", OptionKind::Boolean),
    ("enableDDTracing", OptionKind::Boolean),
    ("enableXrayTracing", OptionKind::Boolean),
    ("enableMergeXrayTraces", OptionKind::Boolean),
    ("captureLambdaPayload", OptionKind::Boolean),
    ("injectLogContext", OptionKind::Boolean),
    ("forwarderArn", OptionKind::String),
    ("nodeLayerVersion", OptionKind::Integer),
    ("pythonLayerVersion", OptionKind::Integer),
    ("extensionLayerVersion", OptionKind::Integer),
    ("service", OptionKind::String),
    ("env", OptionKind::String),
    ("version", OptionKind::String),
    ("tags", OptionKind::String),
];

pub fn option_kind(name: &str) -> Option<OptionKind> {
    OPTIONS
        .iter()
        .find(|(option, _)| *option == name)
        .map(|(_, kind)| *kind)
}
