//! one macro invocation, end to end
use crate::classify::{classify, Globals};
use crate::config::Configuration;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::layers::{DatadogLayers, LayerLookup};
use crate::mutate::{self, Context, Existing};
use crate::resolve::{self, mapping_block};
use crate::validate::validate;
use serde::Serialize;
use serde_json::Value;

/// Input of one invocation
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct TransformRequest {
    pub template: Value,
    /// parameters of the macro invocation, a mapping of option names to values
    pub params: Option<Value>,
    /// region the stack is deployed to, decides the layer ARNs
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub template: Value,
    /// validator diagnostics first, then one entry per resource problem in declaration order
    pub diagnostics: Vec<Diagnostic>,
}

impl Outcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    fn unchanged(template: Value, diagnostics: Diagnostics) -> Self {
        Self {
            template,
            diagnostics: diagnostics.into_vec(),
        }
    }
}

/// Runs invocations against one set of defaults and one layer source
#[derive(Debug, Clone, Default)]
pub struct Transformer<L: LayerLookup = DatadogLayers> {
    defaults: Configuration,
    layers: L,
}

impl<L: LayerLookup> Transformer<L> {
    pub fn new(defaults: Configuration, layers: L) -> Self {
        Self { defaults, layers }
    }

    /// Resolve the effective configuration of a request
    pub fn configuration(
        &self,
        request: &TransformRequest,
    ) -> Result<Configuration, resolve::ResolveError> {
        resolve::resolve(
            &self.defaults,
            mapping_block(&request.template),
            request.params.as_ref(),
        )
    }

    #[tracing::instrument(level = "info", skip_all, fields(region = %request.region))]
    pub fn transform(&self, request: TransformRequest) -> Outcome {
        let mut diagnostics = Diagnostics::default();

        let config = match self.configuration(&request) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(%error, "configuration could not be resolved");
                diagnostics.log(Diagnostic::error(error.to_string()));
                return Outcome::unchanged(request.template, diagnostics);
            }
        };

        diagnostics.extend(validate(&config));
        if diagnostics.has_errors() {
            tracing::info!("configuration is invalid, template left unchanged");
            return Outcome::unchanged(request.template, diagnostics);
        }

        let mut template = request.template;
        let globals = Globals::from_template(&template);

        let Some(resources) = template.get_mut("Resources").and_then(Value::as_object_mut) else {
            diagnostics.log(Diagnostic::error("template has no `Resources` mapping"));
            return Outcome::unchanged(template, diagnostics);
        };

        let existing = Existing::scan(resources);
        let ctx = Context {
            config: &config,
            globals: &globals,
            layers: &self.layers,
            region: &request.region,
            existing: &existing,
        };

        let report = mutate::mutate(classify(resources, &globals), &ctx);
        tracing::info!(
            added = report.new_resources.len(),
            problems = report.diagnostics.len(),
            "resources instrumented"
        );
        resources.extend(report.new_resources);
        diagnostics.extend(report.diagnostics);

        Outcome {
            template,
            diagnostics: diagnostics.into_vec(),
        }
    }
}

/// Transform with the built-in defaults and the public layers
pub fn transform(request: TransformRequest) -> Outcome {
    Transformer::<DatadogLayers>::default().transform(request)
}
