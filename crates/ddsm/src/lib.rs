//! # ddsm - serverless monitoring instrumentation for CloudFormation/SAM templates
//!
//! `ddsm` rewrites a CloudFormation or SAM template so that every Lambda function and Step Functions
//! state machine in it is wired up for monitoring: runtime layers are attached, environment variables
//! injected, tracing enabled, tags propagated and log groups subscribed to a forwarder.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `ddsm` works internally.
//!
//! ### Template terms
//!
//! A template is a tree of mappings and lists ([serde_json::Value]). The parts we care about:
//!
//! ```yaml
//! Mappings:
//!   Datadog:            # the mapping block namespace
//!     Parameters:       # per-template configuration
//!       site: datadoghq.eu
//! Globals:
//!   Function:           # SAM defaults inherited by every AWS::Serverless::Function
//!     Runtime: python3.12
//! Resources:
//!   Worker:             # logical id
//!     Type: AWS::Serverless::Function
//!     Properties: { ... }
//! ```
//!
//! ### Loading templates
//!
//! see [template]
//!
//! Templates are read from YAML or JSON. YAML short-form intrinsic functions (`!Ref`, `!GetAtt`, `!Sub`,
//! ...) are expanded into their long form so the rest of the crate only ever sees plain mappings.
//! Mapping order is preserved, which keeps the output and the diagnostics stable.
//!
//! ### Resolving configuration
//!
//! see [resolve::resolve]
//!
//! Options come from three layers: compiled-in defaults ([config::Configuration::default]), the mapping
//! block embedded in the template, and the parameters of the macro invocation. Higher layers win, option
//! by option. The result is a fully populated [config::Configuration].
//!
//! ### Validating configuration
//!
//! see [validate::validate]
//!
//! All rules are checked and every problem is reported as a [diagnostic::Diagnostic]. Any `ERROR` stops the
//! transform before a single resource is touched.
//!
//! ### Classifying resources
//!
//! see [classify::classify]
//!
//! | **type** | **kind** | **tags** |
//! |----------|----------|----------|
//! | `AWS::Lambda::Function` | function | `[{Key, Value}]` |
//! | `AWS::Serverless::Function` | function, inherits `Globals.Function` | `{key: value}` |
//! | `AWS::StepFunctions::StateMachine` | state machine | `[{Key, Value}]` |
//! | `AWS::Serverless::StateMachine` | state machine | `{key: value}` |
//!
//! ### Mutating resources
//!
//! see [mutate::mutate]
//!
//! Each resource runs through layers, environment, tags, tracing and log subscriptions, in that order. The
//! steps work on a copy of the resource's properties which is written back only when all steps succeed,
//! so a failing resource is left as authored while the others are still instrumented.
//!
//! Values the author already set always win. That rule lives in one place: [overlay].
//!
//! ### Output
//!
//! [transform::Outcome] carries the template and all diagnostics, validator diagnostics first.
//!
pub mod classify;
pub mod config;
pub mod diagnostic;
pub mod env_vars;
pub mod layers;
pub mod mutate;
pub mod overlay;
pub mod resolve;
pub mod runtime;
pub mod template;
pub mod transform;
pub mod validate;
pub mod value;

pub use transform::{transform, Outcome, TransformRequest, Transformer};
