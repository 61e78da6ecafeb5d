//! Environment variable names read by the runtime library and the extension.
//!
//! These are a contract with code running inside the function and must not change.

pub const API_KEY: &str = "DD_API_KEY";
pub const KMS_API_KEY: &str = "DD_KMS_API_KEY";
pub const API_KEY_SECRET_ARN: &str = "DD_API_KEY_SECRET_ARN";

/// All credential variables; a function carries at most one of them.
pub const CREDENTIALS: [&str; 3] = [API_KEY, KMS_API_KEY, API_KEY_SECRET_ARN];

pub const SITE: &str = "DD_SITE";
pub const LOG_LEVEL: &str = "DD_LOG_LEVEL";
/// Submit metrics through logs
pub const FLUSH_TO_LOG: &str = "DD_FLUSH_TO_LOG";
pub const LOGS_INJECTION: &str = "DD_LOGS_INJECTION";
pub const ENHANCED_METRICS: &str = "DD_ENHANCED_METRICS";
/// Log collection by the extension
pub const SERVERLESS_LOGS_ENABLED: &str = "DD_SERVERLESS_LOGS_ENABLED";
pub const CAPTURE_LAMBDA_PAYLOAD: &str = "DD_CAPTURE_LAMBDA_PAYLOAD";
pub const MERGE_XRAY_TRACES: &str = "DD_MERGE_XRAY_TRACES";
pub const TRACE_ENABLED: &str = "DD_TRACE_ENABLED";

pub const SERVICE: &str = "DD_SERVICE";
pub const ENV: &str = "DD_ENV";
pub const VERSION: &str = "DD_VERSION";
pub const TAGS: &str = "DD_TAGS";

/// Original handler of a function whose handler was redirected to the library wrapper
pub const LAMBDA_HANDLER: &str = "DD_LAMBDA_HANDLER";
