//! resource mutation
//!
//! Every compute resource goes through the steps in this order:
//! 1. [attach]: runtime library and extension layers, handler redirection
//! 2. [environment]: credential and generic environment variables
//! 3. [tags]: `service` and `env` tags
//! 4. [trace]: tracing and telemetry toggles, X-Ray
//! 5. [logs]: log group subscription to the forwarder
//!
//! Later steps may read what earlier ones decided (the handler redirection writes an environment
//! variable, for example). All steps work on a [Draft], a copy of the resource's properties. The draft is
//! written back only when every step succeeded; a [MutationError] leaves the resource as authored and
//! processing continues with the next resource.
mod attach;
mod environment;
mod logs;
mod tags;
mod trace;

pub use logs::Existing;

use crate::classify::{ComputeResource, Globals};
use crate::config::Configuration;
use crate::diagnostic::Diagnostic;
use crate::layers::LayerLookup;
use serde_json::{Map, Value};

/// Everything a step may look at besides the resource itself
pub struct Context<'a> {
    pub config: &'a Configuration,
    pub globals: &'a Globals,
    pub layers: &'a dyn LayerLookup,
    pub region: &'a str,
    pub existing: &'a Existing,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MutationError {
    #[error("resource `{resource}`: `apiKeySecretArn` cannot be used with a Node.js function that sends metrics synchronously; set `flushMetricsToLogs` to true or set `extensionLayerVersion`")]
    SecretArnWithSynchronousMetrics { resource: String },
    #[error("resource `{resource}`: `{property}` must be {expected}")]
    MalformedProperty {
        resource: String,
        property: &'static str,
        expected: &'static str,
    },
    #[error("resource `{resource}`: no {layer} is published in region `{region}`")]
    LayerUnavailable {
        resource: String,
        layer: String,
        region: String,
    },
    #[error("resource `{resource}`: cannot add `{id}`, a resource with that id already exists")]
    ResourceIdTaken { resource: String, id: String },
}

impl MutationError {
    pub(crate) fn malformed(
        resource: &ComputeResource<'_>,
        property: &'static str,
        expected: &'static str,
    ) -> Self {
        Self::MalformedProperty {
            resource: resource.id.to_string(),
            property,
            expected,
        }
    }
}

/// Working copy of one resource
#[derive(Debug)]
pub struct Draft {
    pub properties: Map<String, Value>,
    pub warnings: Vec<Diagnostic>,
    pub new_resources: Vec<(String, Value)>,
}

impl Draft {
    fn new(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            warnings: vec![],
            new_resources: vec![],
        }
    }
}

/// Result of one mutation pass
#[derive(Debug, Default)]
pub struct Report {
    /// in resource declaration order
    pub diagnostics: Vec<Diagnostic>,
    /// resources to add to the template, in creation order
    pub new_resources: Map<String, Value>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn mutate(resources: Vec<ComputeResource<'_>>, ctx: &Context<'_>) -> Report {
    let mut report = Report::default();

    for resource in resources {
        let _span = tracing::debug_span!("resource", id = resource.id).entered();

        let result = mutate_resource(&resource, ctx).and_then(|draft| {
            match draft
                .new_resources
                .iter()
                .find(|(id, _)| report.new_resources.contains_key(id))
            {
                Some((id, _)) => Err(MutationError::ResourceIdTaken {
                    resource: resource.id.to_string(),
                    id: id.clone(),
                }),
                None => Ok(draft),
            }
        });

        match result {
            Ok(draft) => {
                tracing::debug!("resource instrumented");
                *resource.properties = draft.properties;
                report.diagnostics.extend(draft.warnings);
                report.new_resources.extend(draft.new_resources);
            }
            Err(error) => {
                tracing::warn!(%error, "resource left unchanged");
                report.diagnostics.push(Diagnostic::error(error.to_string()));
            }
        }
    }

    report
}

fn mutate_resource(
    resource: &ComputeResource<'_>,
    ctx: &Context<'_>,
) -> Result<Draft, MutationError> {
    let mut draft = Draft::new(resource.properties.clone());

    attach::attach(resource, &mut draft, ctx)?;
    environment::inject(resource, &mut draft, ctx)?;
    tags::inject(resource, &mut draft, ctx)?;
    trace::toggle(resource, &mut draft, ctx)?;
    logs::wire(resource, &mut draft, ctx)?;

    Ok(draft)
}

/// A mapping written out in the template, not an intrinsic function such as `Fn::If`
pub(crate) fn literal_object(value: &Value) -> Option<&Map<String, Value>> {
    value
        .as_object()
        .filter(|object| !crate::template::is_intrinsic(object))
}

pub(crate) fn literal_object_mut(value: &mut Value) -> Option<&mut Map<String, Value>> {
    value
        .as_object_mut()
        .filter(|object| !crate::template::is_intrinsic(object))
}


#[cfg(test)]
mod test {
    use super::test_support::{run, variables};
    use super::*;
    use crate::template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn configured() -> Configuration {
        Configuration {
            api_key: Some("abc".into()),
            node_layer_version: Some(112),
            python_layer_version: Some(98),
            extension_layer_version: Some(65),
            service: Some("billing".into()),
            env: Some("prod".into()),
            enable_xray_tracing: true,
            ..Default::default()
        }
    }

    #[test]
    fn running_twice_changes_nothing() {
        let mut template = template! {r#"
        Globals:
          Function:
            Tags:
              team: payments
        Resources:
          Api:
            Type: AWS::Serverless::Function
            Properties:
              Runtime: python3.12
              Handler: app.handler
          Worker:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs20.x
              Handler: index.handler
              Environment:
                Variables:
                  DD_SITE: datadoghq.eu
          Flow:
            Type: AWS::StepFunctions::StateMachine
            Properties: {}
        "#};

        let config = configured();
        assert_eq!(run(&mut template, &config), vec![]);
        let once = template.clone();

        assert_eq!(run(&mut template, &config), vec![]);
        assert_eq!(template, once);
    }

    #[test]
    fn running_twice_with_forwarder_changes_nothing() {
        let mut template = template! {r#"
        Resources:
          Worker:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs20.x
              FunctionName: worker
        "#};

        let config = Configuration {
            forwarder_arn: Some("arn:aws:lambda:us-east-1:123456789012:function:forwarder".into()),
            ..Default::default()
        };

        run(&mut template, &config);
        let once = template.clone();
        run(&mut template, &config);

        assert_eq!(template, once);
        assert_eq!(template["Resources"].as_object().unwrap().len(), 3);
    }

    #[test]
    fn failing_resource_is_isolated() {
        let mut template = template! {r#"
        Resources:
          NodeFn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs20.x
              Handler: index.handler
          PythonFn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: python3.12
              Handler: app.handler
        "#};
        let untouched = template["Resources"]["NodeFn"].clone();

        let config = Configuration {
            api_key_secret_arn: Some("arn:aws:secretsmanager:us-east-1:1:secret:dd".into()),
            flush_metrics_to_logs: false,
            python_layer_version: Some(98),
            ..Default::default()
        };

        let diagnostics = run(&mut template, &config);

        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        assert!(diagnostics[0].message.contains("`NodeFn`"));

        assert_eq!(template["Resources"]["NodeFn"], untouched);
        assert_eq!(
            variables(&template, "PythonFn")["DD_API_KEY_SECRET_ARN"],
            "arn:aws:secretsmanager:us-east-1:1:secret:dd"
        );
        assert_eq!(
            template["Resources"]["PythonFn"]["Properties"]["Handler"],
            "datadog_lambda.handler.handler"
        );
    }

    #[test]
    fn malformed_environment_fails_resource() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs20.x
              Environment:
                Variables: [DD_SITE]
        "#};

        let diagnostics = run(&mut template, &Configuration::default());
        assert_eq!(
            diagnostics,
            vec![Diagnostic::error(
                "resource `Fn`: `Environment.Variables` must be a mapping"
            )]
        );
    }

    #[test]
    fn state_machine_only_gets_tags_and_tracing() {
        let mut template = template! {r#"
        Resources:
          Flow:
            Type: AWS::Serverless::StateMachine
            Properties:
              DefinitionUri: statemachine.asl.json
        "#};

        run(&mut template, &configured());
        assert_eq!(
            template["Resources"]["Flow"]["Properties"],
            json!({
                "DefinitionUri": "statemachine.asl.json",
                "Tags": {"service": "billing", "env": "prod"},
                "Tracing": {"Enabled": true}
            })
        );
    }
}
