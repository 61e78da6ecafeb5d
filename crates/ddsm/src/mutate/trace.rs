use super::{environment, Context, Draft, MutationError};
use crate::classify::{ComputeResource, Dialect, ResourceKind};
use crate::env_vars;
use crate::overlay::{self, Keyed};
use crate::value::flag;
use serde_json::{json, Map};

pub(super) fn toggle(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    let config = ctx.config;

    if resource.kind == ResourceKind::LambdaFunction {
        environment::set_absent(
            resource,
            draft,
            ctx,
            vec![
                (env_vars::TRACE_ENABLED, flag(config.enable_dd_tracing)),
                (env_vars::MERGE_XRAY_TRACES, flag(config.enable_merge_xray_traces)),
                (env_vars::ENHANCED_METRICS, flag(config.enable_enhanced_metrics)),
                (env_vars::SERVERLESS_LOGS_ENABLED, flag(config.enable_dd_logs)),
                (env_vars::CAPTURE_LAMBDA_PAYLOAD, flag(config.capture_lambda_payload)),
            ],
        )?;
    }

    if config.enable_xray_tracing {
        enable_xray(resource, draft, ctx);
    }

    Ok(())
}

/// Turn on X-Ray unless the resource declares tracing itself
fn enable_xray(resource: &ComputeResource<'_>, draft: &mut Draft, ctx: &Context<'_>) {
    let (property, value) = match (resource.kind, resource.dialect) {
        (ResourceKind::LambdaFunction, Dialect::CloudFormation) => {
            ("TracingConfig", json!({"Mode": "Active"}))
        }
        (ResourceKind::LambdaFunction, Dialect::Serverless) => ("Tracing", json!("Active")),
        (ResourceKind::StepFunction, Dialect::CloudFormation) => {
            ("TracingConfiguration", json!({"Enabled": true}))
        }
        (ResourceKind::StepFunction, Dialect::Serverless) => ("Tracing", json!({"Enabled": true})),
        (ResourceKind::Other, _) => return,
    };

    let mut inherited = Map::new();
    if resource.inherits_globals() {
        if let Some(declared) = &ctx.globals.tracing {
            inherited.insert("Tracing".to_string(), declared.clone());
        }
    }

    let entries = {
        let base: [&dyn Keyed; 2] = [&draft.properties, &inherited];
        overlay::absent(&base, [(property, value)])
    };
    overlay::apply(&mut draft.properties, entries);
}
