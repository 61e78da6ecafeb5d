//! finding compute resources in a template
use crate::runtime::{self, Architecture, Runtime};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    LambdaFunction,
    StepFunction,
    Other,
}

/// Which resource type family a resource belongs to
///
/// Decides the shape of tags and tracing properties and whether `Globals` apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    /// plain CloudFormation
    CloudFormation,
    /// SAM (`AWS::Serverless::*`)
    Serverless,
}

pub fn kind_of(resource_type: &str) -> (ResourceKind, Dialect) {
    match resource_type {
        "AWS::Lambda::Function" => (ResourceKind::LambdaFunction, Dialect::CloudFormation),
        "AWS::Serverless::Function" => (ResourceKind::LambdaFunction, Dialect::Serverless),
        "AWS::StepFunctions::StateMachine" => (ResourceKind::StepFunction, Dialect::CloudFormation),
        "AWS::Serverless::StateMachine" => (ResourceKind::StepFunction, Dialect::Serverless),
        t if t.starts_with("AWS::Serverless::") => (ResourceKind::Other, Dialect::Serverless),
        _ => (ResourceKind::Other, Dialect::CloudFormation),
    }
}

/// `Globals.Function` of a SAM template
///
/// Every `AWS::Serverless::Function` inherits these unless it sets them itself.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Globals {
    pub runtime: Option<String>,
    pub handler: Option<Value>,
    pub variables: Map<String, Value>,
    pub tags: Map<String, Value>,
    pub layers: Vec<Value>,
    pub tracing: Option<Value>,
    pub architectures: Option<Value>,
}

impl Globals {
    pub fn from_template(template: &Value) -> Self {
        let Some(function) = template.get("Globals").and_then(|g| g.get("Function")) else {
            return Self::default();
        };

        let object = |value: Option<&Value>| value.and_then(Value::as_object).cloned();

        Self {
            runtime: function
                .get("Runtime")
                .and_then(Value::as_str)
                .map(str::to_string),
            handler: function.get("Handler").cloned(),
            variables: object(
                function
                    .get("Environment")
                    .and_then(|e| e.get("Variables")),
            )
            .unwrap_or_default(),
            tags: object(function.get("Tags")).unwrap_or_default(),
            layers: function
                .get("Layers")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            tracing: function.get("Tracing").cloned(),
            architectures: function.get("Architectures").cloned(),
        }
    }
}

/// A compute resource of the template being transformed
///
/// Holds a mutable borrow of the resource's `Properties` for the length of one pass.
#[derive(Debug)]
pub struct ComputeResource<'t> {
    pub id: &'t str,
    pub kind: ResourceKind,
    pub dialect: Dialect,
    pub runtime: Runtime,
    /// runtime identifier as declared (or inherited), e.g. `python3.12`
    pub runtime_id: Option<String>,
    pub architecture: Architecture,
    pub properties: &'t mut Map<String, Value>,
}

impl ComputeResource<'_> {
    /// Whether `Globals.Function` applies to this resource
    pub fn inherits_globals(&self) -> bool {
        self.kind == ResourceKind::LambdaFunction && self.dialect == Dialect::Serverless
    }

    /// Serializable summary, for debugging output
    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            id: self.id.to_string(),
            kind: self.kind,
            dialect: self.dialect,
            runtime: self.runtime,
            runtime_id: self.runtime_id.clone(),
            architecture: self.architecture,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub id: String,
    pub kind: ResourceKind,
    pub dialect: Dialect,
    pub runtime: Runtime,
    pub runtime_id: Option<String>,
    pub architecture: Architecture,
}

/// Collect all compute resources, in declaration order
#[tracing::instrument(level = "debug", skip_all)]
pub fn classify<'t>(
    resources: &'t mut Map<String, Value>,
    globals: &Globals,
) -> Vec<ComputeResource<'t>> {
    let mut found = vec![];

    for (id, resource) in resources.iter_mut() {
        let Some(resource_type) = resource.get("Type").and_then(Value::as_str) else {
            tracing::debug!(%id, "resource without type");
            continue;
        };

        let (kind, dialect) = kind_of(resource_type);
        if kind == ResourceKind::Other {
            continue;
        }
        let resource_type = resource_type.to_string();

        // SAM resources may be fully defined by `Globals`
        if dialect == Dialect::Serverless {
            if let Some(resource) = resource.as_object_mut() {
                resource
                    .entry("Properties")
                    .or_insert_with(|| Value::Object(Map::new()));
            }
        }

        let Some(properties) = resource.get_mut("Properties").and_then(Value::as_object_mut) else {
            tracing::warn!(%id, "compute resource without properties, skipping");
            continue;
        };

        let inherits = kind == ResourceKind::LambdaFunction && dialect == Dialect::Serverless;

        let runtime_id = match properties.get("Runtime") {
            Some(Value::String(runtime)) => Some(runtime.clone()),
            Some(_) => None,
            None if inherits => globals.runtime.clone(),
            None => None,
        };

        let runtime = runtime_id
            .as_deref()
            .map(|id| runtime::runtime_of(&resource_type, id))
            .unwrap_or(Runtime::Other);

        let architectures = match properties.get("Architectures") {
            None if inherits => globals.architectures.as_ref(),
            declared => declared,
        };
        let architecture = Architecture::from_property(architectures);

        tracing::trace!(%id, ?kind, ?runtime, "compute resource found");
        found.push(ComputeResource {
            id: id.as_str(),
            kind,
            dialect,
            runtime,
            runtime_id,
            architecture,
            properties,
        });
    }

    found
}
