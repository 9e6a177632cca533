//! Translation of handler markers into OpenAPI extension fields.

use super::{customize_operations, BuildContext, Pass};
use crate::document::{OpenApiDocument, Operation, Tag};
use crate::error::{Error, Result};
use crate::registry::{HandlerDescriptor, Tier};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub const ORDER_EXTENSION: &str = "x-order";

/// Propagates the order declared on a handler type to every tag its operations use.
///
/// Tags that only appear on operations are added to the document tag list.
pub struct TagOrder;

impl Pass for TagOrder {
    fn name(&self) -> &'static str {
        "tag-order"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        let type_tags = &mut ctx.type_tags;
        customize_operations(document, &ctx.index, |operation, handler, _| {
            type_tags
                .entry(handler.declaring_type.clone())
                .or_default()
                .extend(operation.tags.iter().cloned());
            Ok(Some(operation))
        })?;

        let tag_orders = resolve_tag_orders(ctx)?;
        for (tag_name, order) in tag_orders {
            let index = match document.tags.iter().position(|t| t.name == tag_name) {
                Some(index) => index,
                None => {
                    debug!("Adding tag {} to the document", tag_name);
                    document.tags.push(Tag::new(tag_name.as_str()));
                    document.tags.len() - 1
                }
            };
            document.tags[index]
                .extensions
                .insert(ORDER_EXTENSION.to_string(), order.into());
        }
        Ok(())
    }
}

/// Maps each tag to the single order its declaring types agree on.
fn resolve_tag_orders(ctx: &BuildContext<'_>) -> Result<BTreeMap<String, i32>> {
    let mut candidates: BTreeMap<&str, BTreeSet<i32>> = BTreeMap::new();
    for declaring_type in ctx.index.declaring_types() {
        let Some(order) = ctx.registry.type_markers(declaring_type).and_then(|m| m.order) else {
            continue;
        };
        for tag in ctx.type_tags.get(declaring_type).into_iter().flatten() {
            candidates.entry(tag.as_str()).or_default().insert(order);
        }
    }

    candidates
        .into_iter()
        .map(|(tag, orders)| {
            let mut values = orders.iter().copied();
            match (values.next(), values.next()) {
                (Some(order), None) => Ok((tag.to_string(), order)),
                _ => Err(Error::ConflictingTagOrder {
                    tag: tag.to_string(),
                    orders: orders.clone(),
                }),
            }
        })
        .collect()
}

/// Adds `x-order` and the tier extensions to each operation according to its handler.
pub struct OperationExtensions;

impl Pass for OperationExtensions {
    fn name(&self) -> &'static str {
        "operation-extensions"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        customize_operations(document, &ctx.index, |mut operation, handler, _| {
            add_operation_extensions(&mut operation, handler);
            Ok(Some(operation))
        })
    }
}

fn add_operation_extensions(operation: &mut Operation, handler: &HandlerDescriptor) {
    if let Some(order) = handler.order() {
        operation.add_extension(ORDER_EXTENSION, order);
    }
    for tier in Tier::ALL {
        if handler.has_tier(tier) {
            operation.add_extension(tier.extension_key(), true);
        }
    }
}
