use super::{literal_object, Context, Draft, MutationError};
use crate::classify::{ComputeResource, Dialect};
use crate::overlay::{self, Keyed};
use serde_json::{Map, Value};

pub(super) fn inject(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    ctx: &Context<'_>,
) -> Result<(), MutationError> {
    let wanted: Vec<(&str, Value)> = [("service", &ctx.config.service), ("env", &ctx.config.env)]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, Value::from(value))))
        .collect();

    if wanted.is_empty() {
        return Ok(());
    }

    let inherited: Option<&Map<String, Value>> =
        resource.inherits_globals().then_some(&ctx.globals.tags);

    match resource.dialect {
        Dialect::Serverless => tag_map(resource, draft, inherited, wanted),
        Dialect::CloudFormation => tag_list(resource, draft, inherited, wanted),
    }
}

/// SAM: `Tags: {key: value}`
fn tag_map(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    inherited: Option<&Map<String, Value>>,
    wanted: Vec<(&str, Value)>,
) -> Result<(), MutationError> {
    let entries = {
        let mut base: Vec<&dyn Keyed> = vec![];
        if let Some(tags) = draft.properties.get("Tags") {
            base.push(
                literal_object(tags)
                    .ok_or_else(|| MutationError::malformed(resource, "Tags", "a mapping"))?,
            );
        }
        if let Some(inherited) = inherited {
            base.push(inherited);
        }
        overlay::absent(&base, wanted)
    };

    if entries.is_empty() {
        return Ok(());
    }

    let tags = draft
        .properties
        .entry("Tags")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| MutationError::malformed(resource, "Tags", "a mapping"))?;
    overlay::apply(tags, entries);
    Ok(())
}

/// CloudFormation: `Tags: [{Key: key, Value: value}]`
fn tag_list(
    resource: &ComputeResource<'_>,
    draft: &mut Draft,
    inherited: Option<&Map<String, Value>>,
    wanted: Vec<(&str, Value)>,
) -> Result<(), MutationError> {
    let entries = {
        let mut base: Vec<&dyn Keyed> = vec![];
        match draft.properties.get("Tags") {
            None => {}
            Some(Value::Array(tags)) => base.push(tags),
            Some(_) => return Err(MutationError::malformed(resource, "Tags", "a list")),
        }
        if let Some(inherited) = inherited {
            base.push(inherited);
        }
        overlay::absent(&base, wanted)
    };

    if entries.is_empty() {
        return Ok(());
    }

    let tags = draft
        .properties
        .entry("Tags")
        .or_insert_with(|| Value::Array(vec![]))
        .as_array_mut()
        .ok_or_else(|| MutationError::malformed(resource, "Tags", "a list"))?;
    overlay::apply(tags, entries);
    Ok(())
}
