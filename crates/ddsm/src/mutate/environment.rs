use super::{literal_object, literal_object_mut, Context, Draft, MutationError};
use crate::classify::{ComputeResource, ResourceKind};
use crate::config::Credential;
use crate::env_vars;
use crate::overlay::{self, Keyed};
use crate::runtime::Runtime;
use crate::value::flag;
use serde_json::{Map, Value};

pub(super) fn inject(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    if resource.kind != ResourceKind::LambdaFunction {
        return Ok(());
    }

    let config = ctx.config;
    let mut wanted: Vec<(&str, Value)> = vec![];

    if let Some((credential, value)) = config.credential() {
        if credential == Credential::SecretArn
            && resource.runtime == Runtime::Node
            && config.synchronous_metrics()
        {
            return Err(MutationError::SecretArnWithSynchronousMetrics {
                resource: resource.id.to_string(),
            });
        }

        if has_credential(resource, draft, ctx)? {
            tracing::debug!("function already carries a credential");
        } else {
            wanted.push((credential.env_var(), value.into()));
        }
    }

    wanted.push((env_vars::SITE, config.site.as_str().into()));
    wanted.push((env_vars::FLUSH_TO_LOG, flag(config.flush_metrics_to_logs)));
    if let Some(level) = &config.log_level {
        wanted.push((env_vars::LOG_LEVEL, level.as_str().into()));
    }
    wanted.push((env_vars::LOGS_INJECTION, flag(config.inject_log_context)));

    for (name, option) in [
        (env_vars::SERVICE, &config.service),
        (env_vars::ENV, &config.env),
        (env_vars::VERSION, &config.version),
        (env_vars::TAGS, &config.tags),
    ] {
        if let Some(value) = option {
            wanted.push((name, value.as_str().into()));
        }
    }

    set_absent(resource, draft, ctx, wanted)
}

/// Set environment variables the function (or `Globals`) does not define yet
pub(super) fn set_absent(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
    wanted: Vec<(&str, Value)>,
) -> Result<(), MutationError> {
    let entries = {
        let existing = existing_variables(resource, &draft.properties)?;
        let base = base_layers(resource, existing, ctx);
        overlay::absent(&base, wanted)
    };

    if entries.is_empty() {
        return Ok(());
    }

    let variables = variables_mut(resource, &mut draft.properties)?;
    overlay::apply(variables, entries);
    Ok(())
}

fn base_layers<'a>(
    resource: &ComputeResource<'_>,
    existing: Option<&'a Map<String, Value>>,
    ctx: &'a Context<'_>,
) -> Vec<&'a dyn Keyed> {
    let mut base: Vec<&dyn Keyed> = vec![];
    if let Some(existing) = existing {
        base.push(existing);
    }
    if resource.inherits_globals() {
        base.push(&ctx.globals.variables);
    }
    base
}

fn has_credential(
    resource: &ComputeResource<'_>,
    draft: &Draft,
    ctx: &Context<'_>,
) -> Result<bool, MutationError> {
    let existing = existing_variables(resource, &draft.properties)?;
    let base = base_layers(resource, existing, ctx);

    Ok(env_vars::CREDENTIALS
        .iter()
        .any(|name| base.iter().any(|layer| layer.contains_key(name))))
}

/// `Environment.Variables` as written on the resource
pub(super) fn existing_variables<'p>(
    resource: &ComputeResource<'_>,
    properties: &'p Map<String, Value>,
) -> Result<Option<&'p Map<String, Value>>, MutationError> {
    let Some(environment) = properties.get("Environment") else {
        return Ok(None);
    };
    let environment = literal_object(environment)
        .ok_or_else(|| MutationError::malformed(resource, "Environment", "a mapping"))?;

    match environment.get("Variables") {
        None => Ok(None),
        Some(variables) => literal_object(variables).map(Some).ok_or_else(|| {
            MutationError::malformed(resource, "Environment.Variables", "a mapping")
        }),
    }
}

fn variables_mut<'p>(
    resource: &ComputeResource<'_>,
    properties: &'p mut Map<String, Value>,
) -> Result<&'p mut Map<String, Value>, MutationError> {
    let environment = properties
        .entry("Environment")
        .or_insert_with(|| Value::Object(Map::new()));
    let environment = literal_object_mut(environment)
        .ok_or_else(|| MutationError::malformed(resource, "Environment", "a mapping"))?;

    let variables = environment
        .entry("Variables")
        .or_insert_with(|| Value::Object(Map::new()));
    literal_object_mut(variables)
        .ok_or_else(|| MutationError::malformed(resource, "Environment.Variables", "a mapping"))
}

#[cfg(test)]
mod test {
    use super::super::test_support::{run, variables};
    use crate::config::Configuration;
    use crate::diagnostic::Diagnostic;
    use crate::template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn existing_values_win() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs20.x
              Environment:
                Variables:
                  DD_SITE: datadoghq.eu
        "#};

        let config = Configuration {
            site: "datadoghq.com".into(),
            ..Default::default()
        };
        run(&mut template, &config);

        assert_eq!(variables(&template, "Fn")["DD_SITE"], "datadoghq.eu");
    }

    #[test]
    fn generic_variables() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: java21
        "#};

        let config = Configuration {
            api_kms_key: Some("AQICAH...".into()),
            log_level: Some("debug".into()),
            service: Some("billing".into()),
            env: Some("prod".into()),
            version: Some("1.2.3".into()),
            tags: Some("team:payments,tier:1".into()),
            ..Default::default()
        };
        run(&mut template, &config);

        let variables = variables(&template, "Fn");
        assert_eq!(variables["DD_KMS_API_KEY"], "AQICAH...");
        assert_eq!(variables["DD_LOG_LEVEL"], "debug");
        assert_eq!(variables["DD_SERVICE"], "billing");
        assert_eq!(variables["DD_ENV"], "prod");
        assert_eq!(variables["DD_VERSION"], "1.2.3");
        assert_eq!(variables["DD_TAGS"], "team:payments,tier:1");
        assert_eq!(variables["DD_LOGS_INJECTION"], "true");
        assert_eq!(variables.get("DD_API_KEY"), None);
    }

    #[test]
    fn existing_credential_is_kept_alone() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: python3.12
              Environment:
                Variables:
                  DD_API_KEY_SECRET_ARN: arn:aws:secretsmanager:us-east-1:1:secret:dd
        "#};

        let config = Configuration {
            api_key: Some("abc".into()),
            ..Default::default()
        };
        run(&mut template, &config);

        let variables = variables(&template, "Fn");
        assert_eq!(variables.get("DD_API_KEY"), None);
        assert_eq!(
            variables["DD_API_KEY_SECRET_ARN"],
            "arn:aws:secretsmanager:us-east-1:1:secret:dd"
        );
    }

    #[test]
    fn globals_count_as_existing() {
        let mut template = template! {r#"
        Globals:
          Function:
            Environment:
              Variables:
                DD_SITE: datadoghq.eu
                DD_API_KEY: from-globals
        Resources:
          Fn:
            Type: AWS::Serverless::Function
            Properties:
              Runtime: python3.12
        "#};

        let config = Configuration {
            api_key: Some("abc".into()),
            ..Default::default()
        };
        run(&mut template, &config);

        let variables = variables(&template, "Fn");
        assert_eq!(variables.get("DD_SITE"), None);
        assert_eq!(variables.get("DD_API_KEY"), None);
        assert_eq!(variables["DD_FLUSH_TO_LOG"], "true");
    }

    #[test]
    fn secret_arn_with_synchronous_node_metrics() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs18.x
        "#};

        let config = Configuration {
            api_key_secret_arn: Some("arn".into()),
            flush_metrics_to_logs: false,
            ..Default::default()
        };

        assert_eq!(
            run(&mut template, &config),
            vec![Diagnostic::error(
                "resource `Fn`: `apiKeySecretArn` cannot be used with a Node.js function that sends metrics synchronously; set `flushMetricsToLogs` to true or set `extensionLayerVersion`"
            )]
        );
        assert_eq!(template["Resources"]["Fn"]["Properties"], json!({"Runtime": "nodejs18.x"}));
    }

    #[test]
    fn secret_arn_allowed_with_extension() {
        let mut template = template! {r#"
        Resources:
          Fn:
            Type: AWS::Lambda::Function
            Properties:
              Runtime: nodejs18.x
        "#};

        let config = Configuration {
            api_key_secret_arn: Some("arn".into()),
            flush_metrics_to_logs: false,
            extension_layer_version: Some(65),
            ..Default::default()
        };

        assert_eq!(run(&mut template, &config), vec![]);
        assert_eq!(variables(&template, "Fn")["DD_API_KEY_SECRET_ARN"], "arn");
    }
}
