use super::{Context, Draft, MutationError};
use crate::classify::{ComputeResource, ResourceKind};
use crate::diagnostic::Diagnostic;
use indexmap::IndexSet;
use serde_json::{json, Map, Value};

const LOG_GROUP_TYPE: &str = "AWS::Logs::LogGroup";
const SUBSCRIPTION_TYPE: &str = "AWS::Logs::SubscriptionFilter";

/// Log groups and subscriptions a template already declares
///
/// Taken before the pass so that wiring can reuse what is there.
#[derive(Debug, Default)]
pub struct Existing {
    ids: IndexSet<String>,
    /// (logical id, `LogGroupName`)
    log_groups: Vec<(String, Value)>,
    /// (`LogGroupName`, `DestinationArn`)
    subscriptions: Vec<(Value, Value)>,
}

impl Existing {
    pub fn scan(resources: &Map<String, Value>) -> Self {
        let mut existing = Self::default();

        for (id, resource) in resources {
            existing.ids.insert(id.clone());

            let properties = &resource["Properties"];
            match resource.get("Type").and_then(Value::as_str) {
                Some(LOG_GROUP_TYPE) => {
                    if let Some(name) = properties.get("LogGroupName") {
                        existing.log_groups.push((id.clone(), name.clone()));
                    }
                }
                Some(SUBSCRIPTION_TYPE) => {
                    if let (Some(group), Some(destination)) = (
                        properties.get("LogGroupName"),
                        properties.get("DestinationArn"),
                    ) {
                        existing
                            .subscriptions
                            .push((group.clone(), destination.clone()));
                    }
                }
                _ => {}
            }
        }

        tracing::trace!(?existing, "existing log resources");
        existing
    }

    fn log_group_named(&self, name: &Value) -> Option<&str> {
        self.log_groups
            .iter()
            .find(|(_, existing)| existing == name)
            .map(|(id, _)| id.as_str())
    }

    fn is_subscribed(&self, group_id: &str, group_name: &Value, destination: &str) -> bool {
        let by_ref = json!({ "Ref": group_id });
        self.subscriptions.iter().any(|(group, existing)| {
            (*group == by_ref || group == group_name) && existing == destination
        })
    }

    fn ensure_free(&self, resource: &ComputeResource<'_>, id: &str) -> Result<(), MutationError> {
        if self.ids.contains(id) {
            return Err(MutationError::ResourceIdTaken {
                resource: resource.id.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Subscribe the function's log group to the forwarder
pub(super) fn wire(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    let Some(forwarder) = ctx.config.forwarder_arn.as_deref() else {
        return Ok(());
    };
    if resource.kind != ResourceKind::LambdaFunction {
        return Ok(());
    }

    let group_name = match draft.properties.get("FunctionName") {
        // the generated name is what `Ref` returns
        None => json!({"Fn::Join": ["", ["/aws/lambda/", {"Ref": resource.id}]]}),
        Some(Value::String(name)) => Value::String(format!("/aws/lambda/{name}")),
        Some(_) => {
            tracing::warn!("function name only known at deploy time");
            draft.warnings.push(Diagnostic::warning(format!(
                "resource `{}`: the function name is computed at deploy time, so its log group was not subscribed to the forwarder",
                resource.id
            )));
            return Ok(());
        }
    };

    let existing = ctx.existing;
    let group_id = match existing.log_group_named(&group_name) {
        Some(id) => {
            tracing::debug!(log_group = id, "reusing log group");
            id.to_string()
        }
        None => {
            let id = format!("{}LogGroup", resource.id);
            existing.ensure_free(resource, &id)?;
            draft.new_resources.push((
                id.clone(),
                json!({
                    "Type": LOG_GROUP_TYPE,
                    "Properties": {"LogGroupName": group_name}
                }),
            ));
            id
        }
    };

    if existing.is_subscribed(&group_id, &group_name, forwarder) {
        tracing::debug!(log_group = %group_id, "already subscribed");
        return Ok(());
    }

    let subscription_id = format!("{}LogGroupSubscription", resource.id);
    existing.ensure_free(resource, &subscription_id)?;
    draft.new_resources.push((
        subscription_id,
        json!({
            "Type": SUBSCRIPTION_TYPE,
            "Properties": {
                "DestinationArn": forwarder,
                "FilterPattern": "",
                "LogGroupName": {"Ref": group_id}
            }
        }),
    ));

    Ok(())
}

#[cfg(test)]
mod test {
    use super::super::test_support::run;
    use crate::config::Configuration;
    use crate::diagnostic::Diagnostic;
    use crate::template;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FORWARDER: &str = "arn:aws:lambda:us-east-1:123456789012:function:forwarder";

    fn forwarding() -> Configuration {
        Configuration {
            forwarder_arn: Some(FORWARDER.into()),
            ..Default::default()
        }
    }

    #[test]
    fn creates_log_group_and_subscription() {
        let mut template = template! {r#"
        Resources:
          Worker:
            Type: AWS::Lambda::Function
            Properties:
              FunctionName: worker
        "#};

        assert_eq!(run(&mut template, &forwarding()), vec![]);

        let resources = &template["Resources"];
        assert_eq!(
            resources["WorkerLogGroup"],
            json!({
                "Type": "AWS::Logs::LogGroup",
                "Properties": {"LogGroupName": "/aws/lambda/worker"}
            })
        );
        assert_eq!(
            resources["WorkerLogGroupSubscription"],
            json!({
                "Type": "AWS::Logs::SubscriptionFilter",
                "Properties": {
                    "DestinationArn": FORWARDER,
                    "FilterPattern": "",
                    "LogGroupName": {"Ref": "WorkerLogGroup"}
                }
            })
        );
    }

    #[test]
    fn generated_name_uses_ref() {
        let mut template = template! {r#"
        Resources:
          Worker:
            Type: AWS::Serverless::Function
            Properties: {}
        "#};

        run(&mut template, &forwarding());

        assert_eq!(
            template["Resources"]["WorkerLogGroup"]["Properties"]["LogGroupName"],
            json!({"Fn::Join": ["", ["/aws/lambda/", {"Ref": "Worker"}]]})
        );
    }

    #[test]
    fn reuses_declared_log_group() {
        let mut template = template! {r#"
        Resources:
          Logs:
            Type: AWS::Logs::LogGroup
            Properties:
              LogGroupName: /aws/lambda/worker
              RetentionInDays: 7
          Worker:
            Type: AWS::Lambda::Function
            Properties:
              FunctionName: worker
        "#};

        run(&mut template, &forwarding());

        let resources = template["Resources"].as_object().unwrap();
        let ids: Vec<_> = resources.keys().cloned().collect();
        assert_eq!(ids, vec!["Logs", "Worker", "WorkerLogGroupSubscription"]);
        assert_eq!(
            resources["WorkerLogGroupSubscription"]["Properties"]["LogGroupName"],
            json!({"Ref": "Logs"})
        );
    }

    #[test]
    fn deferred_name_warns_and_continues() {
        let mut template = template! {r#"
        Resources:
          Dynamic:
            Type: AWS::Lambda::Function
            Properties:
              FunctionName: !Sub "${AWS::StackName}-dynamic"
          Static:
            Type: AWS::Lambda::Function
            Properties:
              FunctionName: static
        "#};

        let diagnostics = run(&mut template, &forwarding());

        assert_eq!(
            diagnostics,
            vec![Diagnostic::warning(
                "resource `Dynamic`: the function name is computed at deploy time, so its log group was not subscribed to the forwarder"
            )]
        );
        let resources = &template["Resources"];
        assert!(resources.get("DynamicLogGroup").is_none());
        assert!(resources.get("StaticLogGroupSubscription").is_some());
        assert_eq!(
            resources["Dynamic"]["Properties"]["Environment"]["Variables"]["DD_SITE"],
            "datadoghq.com"
        );
    }

    #[test]
    fn taken_id_fails_resource() {
        let mut template = template! {r#"
        Resources:
          WorkerLogGroup:
            Type: AWS::SQS::Queue
          Worker:
            Type: AWS::Lambda::Function
            Properties:
              FunctionName: worker
        "#};

        assert_eq!(
            run(&mut template, &forwarding()),
            vec![Diagnostic::error(
                "resource `Worker`: cannot add `WorkerLogGroup`, a resource with that id already exists"
            )]
        );
    }
}
