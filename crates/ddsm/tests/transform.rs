//! Fixture tests
//!
//! Each *.yaml file in /tests/fixtures/ holds one invocation:
//! - `template`: the template to transform
//! - `params`: macro parameters (optional)
//! - `region`: deployment region (optional, `us-east-1`)
//! - `expected`: the outcome, `template` and `diagnostics`

use ddsm::{TransformRequest, Transformer};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("DDSM_LOG"))
        .with_test_writer()
        .try_init();
}

fn request(fixture: &Value) -> TransformRequest {
    TransformRequest::new(
        fixture["template"].clone(),
        fixture.get("params").cloned(),
        fixture
            .get("region")
            .and_then(Value::as_str)
            .unwrap_or("us-east-1")
            .to_string(),
    )
}

#[test]
fn fixtures() {
    init_logging();

    insta::glob!("fixtures/*.yaml", |path| {
        let fixture = ddsm::template::load_file(path).expect("fixture must load");

        let outcome = ddsm::transform(request(&fixture));

        assert_eq!(
            serde_json::to_value(&outcome).expect("outcome serializes"),
            fixture["expected"],
            "fixture {}",
            path.display()
        );
    });
}

#[test]
fn fixtures_are_idempotent() {
    init_logging();

    insta::glob!("fixtures/*.yaml", |path| {
        let fixture = ddsm::template::load_file(path).expect("fixture must load");
        let transformer = Transformer::<ddsm::layers::DatadogLayers>::default();

        let once = transformer.transform(request(&fixture));
        let mut again = request(&fixture);
        again.template = once.template.clone();
        let twice = transformer.transform(again);

        assert_eq!(twice.template, once.template, "fixture {}", path.display());
    });
}
