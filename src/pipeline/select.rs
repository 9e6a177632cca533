//! Group membership filter.
//!
//! Runs right after the handler index is built, so every later pass only works on the
//! operations of the group being built.

use super::{customize_operations, BuildContext, Pass};
use crate::document::OpenApiDocument;
use crate::error::Result;
use log::debug;

/// Keeps only the operations selected by the group configuration.
///
/// An operation is kept when its path matches one of the group's path patterns (or the
/// group has none), it carries none of the excluded tags, and, for API-key-only groups,
/// its handler allows API key access.
pub struct SelectGroup;

impl Pass for SelectGroup {
    fn name(&self) -> &'static str {
        "select-group"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        let group = ctx.group;
        let patterns = group.path_patterns()?;

        customize_operations(document, &ctx.index, |operation, handler, path| {
            let path_selected = patterns.is_empty() || patterns.iter().any(|p| p.is_match(path));
            let tag_excluded = operation
                .tags
                .iter()
                .any(|tag| group.exclude_tags.contains(tag));
            let access_ok = !group.api_key_only || handler.allows_api_access();

            if path_selected && !tag_excluded && access_ok {
                Ok(Some(operation))
            } else {
                debug!(
                    "[{}] leaving out {} at {}",
                    group.name,
                    handler.handler_id(),
                    path
                );
                Ok(None)
            }
        })
    }
}
