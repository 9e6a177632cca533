//! Passes that rewrite the component schemas.

use super::{BuildContext, Pass};
use crate::document::{collect_component_refs, OpenApiDocument, SCHEMAS_SECTION};
use crate::error::Result;
use log::debug;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Hypermedia property removed from every component schema.
const LINKS_PROPERTY: &str = "_links";

pub const TESTING_SCHEMA_NAME: &str = "KeyModifiedEntity";

/// Removes the `_links` property from the top level properties of every component schema.
pub struct StripLinks;

impl Pass for StripLinks {
    fn name(&self) -> &'static str {
        "strip-links"
    }

    fn apply(&self, document: &mut OpenApiDocument, _ctx: &mut BuildContext<'_>) -> Result<()> {
        let Some(components) = document.components.as_mut() else {
            return Ok(());
        };

        for (name, schema) in components.schemas.iter_mut() {
            let removed = schema
                .get_mut("properties")
                .and_then(Value::as_object_mut)
                .and_then(|properties| properties.remove(LINKS_PROPERTY));
            if removed.is_some() {
                debug!("Stripped {} from schema {}", LINKS_PROPERTY, name);
            }
        }
        Ok(())
    }
}

/// Removes component schemas that are not reachable from any operation.
///
/// Reachability starts at the path items and follows `$ref`s transitively, through
/// schemas as well as the other component sections (shared responses, parameters, request
/// bodies). A shared response nothing points at does not keep its schemas alive.
pub struct PruneSchemas;

impl Pass for PruneSchemas {
    fn name(&self) -> &'static str {
        "prune-schemas"
    }

    fn apply(&self, document: &mut OpenApiDocument, _ctx: &mut BuildContext<'_>) -> Result<()> {
        let mut pending = Vec::new();
        for item in document.paths.values() {
            collect_component_refs(&serde_json::to_value(item)?, &mut pending);
        }

        let Some(components) = document.components.as_mut() else {
            return Ok(());
        };

        let mut visited = BTreeSet::new();
        while let Some(target) = pending.pop() {
            if !visited.insert(target.clone()) {
                continue;
            }
            let (section, name) = &target;
            let component = if section == SCHEMAS_SECTION {
                components.schemas.get(name)
            } else {
                components.extra.get(section).and_then(|entries| entries.get(name))
            };
            if let Some(component) = component {
                collect_component_refs(component, &mut pending);
            }
        }

        let before = components.schemas.len();
        components.schemas.retain(|name, _| {
            visited.contains(&(SCHEMAS_SECTION.to_string(), name.clone()))
        });
        debug!(
            "Pruned {} unused schemas, {} left",
            before - components.schemas.len(),
            components.schemas.len()
        );
        Ok(())
    }
}

/// Registers the fixed [`TESTING_SCHEMA_NAME`] schema used by the end-to-end test suite
/// to describe key modification activity.
// TODO: drop once the e2e suite generates its activity models from the activity endpoint.
pub struct TestingSchema;

impl Pass for TestingSchema {
    fn name(&self) -> &'static str {
        "testing-schema"
    }

    fn apply(&self, document: &mut OpenApiDocument, _ctx: &mut BuildContext<'_>) -> Result<()> {
        document
            .components_mut()
            .schemas
            .insert(TESTING_SCHEMA_NAME.to_string(), key_modification_schema());
        Ok(())
    }
}

/// Schema of the modifications recorded for a key: one `{old, new}` pair per field.
pub fn key_modification_schema() -> Value {
    modification_schema(&[
        ("name", json!({ "type": "string" })),
        ("namespace", json!({ "type": "string" })),
        ("isPlural", json!({ "type": "boolean" })),
        ("pluralArgName", json!({ "type": "string" })),
    ])
}

fn modification_schema(fields: &[(&str, Value)]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(field, schema)| {
            (
                field.to_string(),
                json!({
                    "type": "object",
                    "properties": { "old": schema, "new": schema }
                }),
            )
        })
        .collect();
    json!({ "type": "object", "properties": properties })
}
