//! configuration resolution
//!
//! Layers, lowest to highest precedence:
//! 1. compiled-in defaults
//! 2. the mapping block in the template (`Mappings.Datadog.Parameters`)
//! 3. the parameters of the macro invocation
//!
//! A layer only provides the options it sets. The merge is shallow: every option is one atomic value.
use crate::config::{self, Configuration};
use crate::value::{self, CoerceError};
use serde_json::{Map, Value};

/// Namespace of the mapping block under `Mappings`
pub const MAPPING_NAMESPACE: &str = "Datadog";
/// Key of the configuration inside the namespace
pub const MAPPING_KEY: &str = "Parameters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    MappingBlock,
    Parameters,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::MappingBlock => write!(
                f,
                "the template mapping block `Mappings.{MAPPING_NAMESPACE}.{MAPPING_KEY}`"
            ),
            Layer::Parameters => f.write_str("the macro parameters"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("{0} must be a mapping of option names to values")]
    NotAMapping(Layer),
    #[error("invalid value for `{option}` in {layer}: {source}")]
    InvalidValue {
        layer: Layer,
        option: String,
        #[source]
        source: CoerceError,
    },
    #[error("unable to build configuration")]
    Model(#[from] serde_json::Error),
}

/// Find the mapping block of a template
///
/// A template without `Mappings` or without our namespace simply has no mapping block.
pub fn mapping_block(template: &Value) -> Option<&Value> {
    let Some(mappings) = template.get("Mappings") else {
        tracing::debug!("template has no Mappings section");
        return None;
    };

    let Some(namespace) = mappings.get(MAPPING_NAMESPACE) else {
        tracing::debug!(namespace = MAPPING_NAMESPACE, "no mapping block in template");
        return None;
    };

    let block = namespace.get(MAPPING_KEY);
    if block.is_none() {
        tracing::debug!(
            namespace = MAPPING_NAMESPACE,
            key = MAPPING_KEY,
            "mapping namespace has no configuration key"
        );
    }
    block
}

/// Merge all layers into one effective configuration
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve(
    defaults: &Configuration,
    mapping: Option<&Value>,
    params: Option<&Value>,
) -> Result<Configuration, ResolveError> {
    let mut merged: Map<String, Value> = serde_json::from_value(serde_json::to_value(defaults)?)?;

    for (layer, values) in [(Layer::MappingBlock, mapping), (Layer::Parameters, params)] {
        if let Some(values) = values {
            apply_layer(&mut merged, layer, values)?;
        }
    }

    let config: Configuration = serde_json::from_value(Value::Object(merged))?;
    tracing::debug!(?config, "configuration resolved");
    Ok(config)
}

fn apply_layer(
    merged: &mut Map<String, Value>,
    layer: Layer,
    values: &Value,
) -> Result<(), ResolveError> {
    let values = values.as_object().ok_or(ResolveError::NotAMapping(layer))?;

    for (option, raw) in values {
        let Some(kind) = config::option_kind(option) else {
            tracing::warn!(%option, %layer, "ignoring unknown option");
            continue;
        };

        let coerced = value::coerce(kind, raw).map_err(|source| ResolveError::InvalidValue {
            layer,
            option: option.clone(),
            source,
        })?;

        if let Some(coerced) = coerced {
            tracing::trace!(%option, %layer, value = %coerced, "option set");
            merged.insert(option.clone(), coerced);
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolve_with(mapping: Option<Value>, params: Option<Value>) -> Configuration {
        resolve(
            &Configuration::default(),
            mapping.as_ref(),
            params.as_ref(),
        )
        .expect("must resolve")
    }

    #[test]
    fn defaults_only() {
        assert_eq!(resolve_with(None, None), Configuration::default());
    }

    #[test]
    fn parameters_win_over_mapping_block() {
        let config = resolve_with(
            Some(json!({"site": "datadoghq.eu", "service": "from-mapping"})),
            Some(json!({"site": "us5.datadoghq.com"})),
        );

        assert_eq!(config.site, "us5.datadoghq.com");
        assert_eq!(config.service.as_deref(), Some("from-mapping"));
    }

    #[test]
    fn mapping_block_wins_over_defaults() {
        let config = resolve_with(Some(json!({"flushMetricsToLogs": "false"})), None);
        assert!(!config.flush_metrics_to_logs);
        assert!(config.add_layers);
    }

    #[test]
    fn null_falls_through() {
        let config = resolve_with(
            Some(json!({"apiKey": "from-mapping"})),
            Some(json!({"apiKey": null})),
        );
        assert_eq!(config.api_key.as_deref(), Some("from-mapping"));
    }

    #[test]
    fn unknown_options_are_ignored() {
        let config = resolve_with(None, Some(json!({"notAnOption": 1, "nodeLayerVersion": "112"})));
        assert_eq!(config.node_layer_version, Some(112));
    }

    #[test]
    fn invalid_value_names_option_and_layer() {
        let err = resolve(
            &Configuration::default(),
            None,
            Some(&json!({"extensionLayerVersion": "latest"})),
        )
        .expect_err("must fail");

        assert_eq!(
            err.to_string(),
            "invalid value for `extensionLayerVersion` in the macro parameters: expected a non-negative integer, found string \"latest\""
        );
    }

    #[test]
    fn layer_must_be_a_mapping() {
        let err = resolve(&Configuration::default(), Some(&json!(["site"])), None)
            .expect_err("must fail");
        assert!(matches!(err, ResolveError::NotAMapping(Layer::MappingBlock)));
    }

    #[test]
    fn mapping_block_lookup() {
        let template = json!({
            "Mappings": {"Datadog": {"Parameters": {"site": "datadoghq.eu"}}}
        });
        assert_eq!(
            mapping_block(&template),
            Some(&json!({"site": "datadoghq.eu"}))
        );

        assert_eq!(mapping_block(&json!({"Mappings": {"Other": {}}})), None);
        assert_eq!(mapping_block(&json!({"Resources": {}})), None);
    }
}
