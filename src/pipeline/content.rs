//! Response content normalization.

use super::{customize_operations, BuildContext, Pass};
use crate::document::{OpenApiDocument, Operation, JSON_MEDIA_TYPE, WILDCARD_MEDIA_TYPE};
use crate::error::Result;

/// Status code whose content gets normalized.
const SUCCESS_STATUS: &str = "200";

/// Replaces the `*/*` media type of the success response with `application/json`.
///
/// The wildcard entry is moved, so its schema is kept as is. An existing
/// `application/json` entry is overwritten by the wildcard one.
pub struct JsonResponseContent;

impl Pass for JsonResponseContent {
    fn name(&self) -> &'static str {
        "json-response-content"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        customize_operations(document, &ctx.index, |mut operation, _, _| {
            normalize_success_content(&mut operation);
            Ok(Some(operation))
        })
    }
}

fn normalize_success_content(operation: &mut Operation) {
    let Some(content) = operation
        .responses
        .get_mut(SUCCESS_STATUS)
        .and_then(|response| response.content.as_mut())
    else {
        return;
    };

    if let Some(any) = content.remove(WILDCARD_MEDIA_TYPE) {
        content.insert(JSON_MEDIA_TYPE.to_string(), any);
    }
}
