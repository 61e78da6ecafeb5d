//! loading CloudFormation/SAM templates
//!
//! Templates are parsed into a [serde_json::Value] tree that preserves mapping order. JSON and YAML are
//! accepted. YAML short-form intrinsic functions are expanded into their long form:
//! - `!Ref Name` becomes `{"Ref": "Name"}`
//! - `!GetAtt Resource.Attribute` becomes `{"Fn::GetAtt": ["Resource", "Attribute"]}`
//! - `!Sub ...`, `!Join ...` and every other tag `!X` becomes `{"Fn::X": ...}`
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Parse a template from a string
///
/// Input starting with `{` is read as JSON, everything else as YAML.
pub fn from_str(contents: &str) -> Result<Value, LoadError> {
    let template = if contents.trim_start().starts_with('{') {
        serde_json::from_str(contents)?
    } else {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents)?;
        from_yaml(yaml)?
    };

    if !template.is_object() {
        return Err(LoadError::NotAMapping);
    }

    Ok(template)
}

pub fn load_file(file_path: &Path) -> Result<Value, LoadError> {
    let file_path = file_path.canonicalize()?;
    tracing::info!(path=%file_path.display(), "loading file");

    let file_contents = std::fs::read_to_string(&file_path)?;
    from_str(&file_contents)
}

/// Whether a mapping is an intrinsic function call (`{"Ref": ...}`, `{"Fn::Sub": ...}`, ...)
pub fn is_intrinsic(object: &Map<String, Value>) -> bool {
    object.len() == 1
        && object
            .keys()
            .all(|key| key == "Ref" || key == "Condition" || key.starts_with("Fn::"))
}

fn from_yaml(value: serde_yaml::Value) -> Result<Value, LoadError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => number(&n)?,
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(from_yaml)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(key_string(key)?, from_yaml(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let tag = tag.trim_start_matches('!');
            intrinsic(tag, from_yaml(tagged.value)?)
        }
    })
}

fn intrinsic(tag: &str, value: Value) -> Value {
    let mut object = Map::with_capacity(1);
    match (tag, value) {
        ("Ref" | "Condition", value) => {
            object.insert(tag.to_string(), value);
        }
        ("GetAtt", Value::String(path)) => {
            let parts: Vec<Value> = match path.split_once('.') {
                Some((resource, attribute)) => vec![resource.into(), attribute.into()],
                None => vec![path.into()],
            };
            object.insert("Fn::GetAtt".to_string(), Value::Array(parts));
        }
        (tag, value) => {
            object.insert(format!("Fn::{tag}"), value);
        }
    }
    Value::Object(object)
}

fn number(n: &serde_yaml::Number) -> Result<Value, LoadError> {
    if let Some(u) = n.as_u64() {
        return Ok(Value::from(u));
    }
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(i));
    }

    n.as_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| LoadError::UnsupportedNumber(n.to_string()))
}

fn key_string(key: serde_yaml::Value) -> Result<String, LoadError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(LoadError::UnsupportedKey(format!("{other:?}"))),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse json template")]
    JsonParseFailed(#[from] serde_json::Error),
    #[error("Unable to parse yaml template")]
    YamlParseFailed(#[from] serde_yaml::Error),
    #[error("Template must be a mapping")]
    NotAMapping,
    #[error("Unsupported mapping key {0}")]
    UnsupportedKey(String),
    #[error("Unsupported number {0}")]
    UnsupportedNumber(String),
}

/// Utility macro to parse a template in tests
///
/// ```
/// # use ddsm::template;
/// let template = template!("Resources: {}");
/// assert!(template["Resources"].is_object());
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use ddsm::template;
/// template!("- not a mapping");
/// ```
#[macro_export]
macro_rules! template {
    { $expr:expr } => {
        $crate::template::from_str($expr).expect("template must parse")
    };
}
