use super::{environment, Context, Draft, MutationError};
use crate::classify::ComputeResource;
use crate::diagnostic::Diagnostic;
use crate::env_vars;
use crate::layers::Layer;
use crate::runtime::Runtime;
use serde_json::{Map, Value};

const NODE_HANDLER: &str = "/opt/nodejs/node_modules/datadog-lambda-js/handler.handler";
const PYTHON_HANDLER: &str = "datadog_lambda.handler.handler";

pub(super) fn attach(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    let Some(runtime_id) = resource.runtime_id.as_deref() else {
        return Ok(());
    };
    if !resource.runtime.has_library() {
        tracing::trace!(runtime_id, "no layers for runtime");
        return Ok(());
    }

    let config = ctx.config;
    let library = Layer::Library {
        runtime: resource.runtime,
        runtime_id,
        architecture: resource.architecture,
    };

    let mut wanted = vec![];
    if config.add_layers {
        let version = match resource.runtime {
            Runtime::Node => config.node_layer_version,
            Runtime::Python => config.python_layer_version,
            Runtime::Other => None,
        };
        match version {
            Some(version) => wanted.push((library, version)),
            None => tracing::debug!(%library, "no layer version configured"),
        }
    }
    if let Some(version) = config.extension_layer_version {
        let extension = Layer::Extension {
            architecture: resource.architecture,
        };
        wanted.push((extension, version));
    }

    let mut arns = vec![];
    for (layer, version) in wanted {
        if is_attached(resource, draft, ctx, &layer)? {
            tracing::debug!(%layer, "already attached");
            continue;
        }

        let arn = ctx
            .layers
            .layer_arn(&layer, version, ctx.region)
            .ok_or_else(|| MutationError::LayerUnavailable {
                resource: resource.id.to_string(),
                layer: layer.to_string(),
                region: ctx.region.to_string(),
            })?;

        tracing::debug!(%arn, "attaching layer");
        arns.push(Value::String(arn));
    }

    if !arns.is_empty() {
        layers_mut(resource, &mut draft.properties)?.extend(arns);
    }

    if config.add_layers && is_attached(resource, draft, ctx, &library)? {
        redirect_handler(resource, draft, ctx)?;
    }

    Ok(())
}

fn is_attached(
    resource: &ComputeResource<'_>,
    draft: &Draft,
    ctx: &Context<'_>,
    layer: &Layer<'_>,
) -> Result<bool, MutationError> {
    let declared = match draft.properties.get("Layers") {
        None => &[][..],
        Some(Value::Array(layers)) => layers.as_slice(),
        Some(_) => return Err(MutationError::malformed(resource, "Layers", "a list")),
    };
    let inherited: &[Value] = if resource.inherits_globals() {
        &ctx.globals.layers
    } else {
        &[]
    };

    Ok(declared
        .iter()
        .chain(inherited)
        .filter_map(layer_text)
        .any(|arn| layer.is_family_member(&arn)))
}

/// Literal text of a layer entry
///
/// `Fn::Sub` yields its template string, `Fn::Join` its string parts joined with the
/// separator (nested intrinsics contribute nothing).
fn layer_text(entry: &Value) -> Option<String> {
    if let Some(arn) = entry.as_str() {
        return Some(arn.to_string());
    }

    let object = entry.as_object().filter(|o| o.len() == 1)?;
    match object.iter().next()? {
        (key, Value::String(template)) if key == "Fn::Sub" => Some(template.clone()),
        (key, Value::Array(args)) if key == "Fn::Sub" => args.first()?.as_str().map(str::to_string),
        (key, Value::Array(args)) if key == "Fn::Join" => {
            let [Value::String(separator), Value::Array(parts)] = args.as_slice() else {
                return None;
            };
            let parts: Vec<&str> = parts.iter().map(|p| p.as_str().unwrap_or("")).collect();
            Some(parts.join(separator.as_str()))
        }
        _ => None,
    }
}

fn layers_mut<'p>(
    resource: &ComputeResource<'_>,
    properties: &'p mut Map<String, Value>,
) -> Result<&'p mut Vec<Value>, MutationError> {
    properties
        .entry("Layers")
        .or_insert_with(|| Value::Array(vec![]))
        .as_array_mut()
        .ok_or_else(|| MutationError::malformed(resource, "Layers", "a list"))
}

/// Point the handler at the library wrapper, which calls the original handler from `DD_LAMBDA_HANDLER`
fn redirect_handler(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    let wrapper = match resource.runtime {
        Runtime::Node => NODE_HANDLER,
        Runtime::Python => PYTHON_HANDLER,
        Runtime::Other => return Ok(()),
    };

    let handler = match draft.properties.get("Handler") {
        Some(handler) => Some(handler.clone()),
        None if resource.inherits_globals() => ctx.globals.handler.clone(),
        None => None,
    };
    let Some(handler) = handler else {
        tracing::debug!("no handler to redirect");
        return Ok(());
    };

    if handler == wrapper {
        tracing::trace!("handler already redirected");
        return Ok(());
    }

    if let Some(target) = declared_target(resource, draft, ctx)? {
        if target != handler {
            tracing::warn!(%target, %handler, "handler target already set, not redirecting");
            draft.warnings.push(Diagnostic::warning(format!(
                "resource `{}`: `{}` is already set to a value other than `Handler`, the handler was not redirected",
                resource.id,
                env_vars::LAMBDA_HANDLER
            )));
            return Ok(());
        }
    }

    environment::set_absent(resource, draft, ctx, vec![(env_vars::LAMBDA_HANDLER, handler)])?;
    draft
        .properties
        .insert("Handler".to_string(), Value::String(wrapper.to_string()));
    Ok(())
}

/// `DD_LAMBDA_HANDLER` as the author set it, on the resource or in `Globals`
fn declared_target(
    resource: &ComputeResource<'_>,
    draft: &Draft,
    ctx: &Context<'_>,
) -> Result<Option<Value>, MutationError> {
    let own = environment::existing_variables(resource, &draft.properties)?
        .and_then(|variables| variables.get(env_vars::LAMBDA_HANDLER));
    let inherited = resource
        .inherits_globals()
        .then(|| ctx.globals.variables.get(env_vars::LAMBDA_HANDLER))
        .flatten();

    Ok(own.or(inherited).cloned())
}
