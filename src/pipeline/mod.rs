//! Customization pipeline applied to a generated OpenAPI document.
//!
//! A documentation group is built by cloning the source document and running an explicit,
//! numbered list of [`Pass`]es over it. Every pass runs to completion before the next one
//! starts, and the first error aborts the whole group build.
//!
//! # Standard passes
//!
//! 1. [`IndexHandlers`] - resolves every operation to its handler. Must run before any pass
//!    that looks handlers up.
//! 2. [`SelectGroup`] - drops operations that do not belong to the group
//! 3. [`JsonResponseContent`] - collapses `*/*` success content into `application/json`
//! 4. [`RefreshIndex`] - re-indexes the surviving operations, so later passes only see the
//!    group's own paths
//! 5. [`StripLinks`] - removes `_links` from component schemas
//! 6. [`Security`] - security requirements per operation
//! 7. [`TagOrder`] - propagates declaring type orders to tags
//! 8. [`OperationExtensions`] - `x-order`, `x-ee`, `x-cloud`, `x-self-hosted`
//! 9. [`PruneSchemas`] - removes component schemas nothing references any more
//! 10. [`TestingSchema`] - injects the `KeyModifiedEntity` schema

pub mod content;
pub mod extensions;
pub mod schemas;
pub mod security;
pub mod select;

pub use content::JsonResponseContent;
pub use extensions::{OperationExtensions, TagOrder};
pub use schemas::{PruneSchemas, StripLinks, TestingSchema};
pub use security::Security;
pub use select::SelectGroup;

use crate::config::GroupConfig;
use crate::document::{OpenApiDocument, Operation};
use crate::error::{Error, Result};
use crate::index::HandlerIndex;
use crate::registry::{HandlerDescriptor, HandlerRegistry};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::thread;

/// State threaded through the passes of one group build.
pub struct BuildContext<'a> {
    pub registry: &'a HandlerRegistry,
    pub group: &'a GroupConfig,
    pub index: HandlerIndex,
    /// Tags used by the operations of each declaring type, filled by [`TagOrder`]
    pub type_tags: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> BuildContext<'a> {
    pub fn new(registry: &'a HandlerRegistry, group: &'a GroupConfig) -> Self {
        Self {
            registry,
            group,
            index: HandlerIndex::new(),
            type_tags: BTreeMap::new(),
        }
    }
}

/// One rewrite step of the pipeline.
pub trait Pass: Send + Sync {
    /// Short kebab-case name used in logs and errors.
    fn name(&self) -> &'static str;

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()>;
}

/// Rewrites every operation of the document through `f`.
///
/// `f` receives the operation, its handler and its path. Returning `Ok(None)` removes the
/// operation; a path left without operations is removed too, and document tags no longer
/// used by any operation are pruned from the tag list.
///
/// # Errors
///
/// Returns [`Error::HandlerNotFound`] if an operation is not in `index`, or the first
/// error returned by `f`. The document must be discarded after an error.
pub fn customize_operations<F>(document: &mut OpenApiDocument, index: &HandlerIndex, mut f: F) -> Result<()>
where
    F: FnMut(Operation, &HandlerDescriptor, &str) -> Result<Option<Operation>>,
{
    let old_paths = std::mem::take(&mut document.paths);
    let mut new_paths = BTreeMap::new();

    for (path, mut item) in old_paths {
        for (method, operation) in item.take_operations() {
            let operation_id = operation.operation_id.clone().unwrap_or_default();
            let handler = index.resolve(&operation_id).map_err(|_| Error::HandlerNotFound {
                operation_id: operation_id.clone(),
                path: format!("{} {}", method, path),
            })?;

            match f(operation, handler, &path)? {
                Some(operation) => item.set_operation(method, operation),
                None => debug!("Removed operation {} ({} {})", operation_id, method, path),
            }
        }

        if item.has_operations() {
            new_paths.insert(path, item);
        }
    }

    let used_tags: BTreeSet<String> = new_paths
        .values()
        .flat_map(|item| item.operations())
        .flat_map(|(_, op)| op.tags.iter().cloned())
        .collect();
    document.tags.retain(|tag| used_tags.contains(&tag.name));
    document.paths = new_paths;
    Ok(())
}

/// Populates the handler index from the full source document.
pub struct IndexHandlers;

impl Pass for IndexHandlers {
    fn name(&self) -> &'static str {
        "index-handlers"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        ctx.index.populate(document, ctx.registry)
    }
}

/// Re-indexes the operations that are still in the document, dropping the paths the group
/// left out.
pub struct RefreshIndex;

impl Pass for RefreshIndex {
    fn name(&self) -> &'static str {
        "refresh-index"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        ctx.index.refresh(document, ctx.registry)
    }
}

/// An ordered list of passes.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    /// Creates a pipeline with no passes.
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    /// The standard pass list, see the module documentation for the order.
    pub fn standard() -> Self {
        Self::empty()
            .with_pass(IndexHandlers)
            .with_pass(SelectGroup)
            .with_pass(JsonResponseContent)
            .with_pass(RefreshIndex)
            .with_pass(StripLinks)
            .with_pass(Security)
            .with_pass(TagOrder)
            .with_pass(OperationExtensions)
            .with_pass(PruneSchemas)
            .with_pass(TestingSchema)
    }

    /// Appends a pass; passes run in the order they are added.
    pub fn with_pass(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Builds one documentation group from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pass`] naming the failing pass. No document is produced on error.
    pub fn run(
        &self,
        source: &OpenApiDocument,
        registry: &HandlerRegistry,
        group: &GroupConfig,
    ) -> Result<OpenApiDocument> {
        let mut document = source.clone();
        let mut ctx = BuildContext::new(registry, group);
        let total = self.passes.len();

        for (i, pass) in self.passes.iter().enumerate() {
            debug!("[{}] pass {}/{}: {}", group.name, i + 1, total, pass.name());
            pass.apply(&mut document, &mut ctx).map_err(|e| Error::Pass {
                pass: pass.name(),
                source: Box::new(e),
            })?;
        }

        info!(
            "[{}] built with {} paths, {} tags",
            group.name,
            document.paths.len(),
            document.tags.len()
        );
        Ok(document)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds every group concurrently, one thread per group.
///
/// Groups share `source` and `registry` read-only and never see each other's state.
///
/// # Arguments
///
/// * `pipeline` - The passes run for every group
/// * `source` - The generated document each group starts from
/// * `registry` - Handler metadata used to resolve operations
/// * `groups` - The groups to build
///
/// # Returns
///
/// Returns `(group name, document)` pairs in the order of `groups`.
///
/// # Errors
///
/// If any group fails, the first failure in `groups` order is returned and no document
/// is returned at all.
pub fn build_groups(
    pipeline: &Pipeline,
    source: &OpenApiDocument,
    registry: &HandlerRegistry,
    groups: &[GroupConfig],
) -> Result<Vec<(String, OpenApiDocument)>> {
    let results: Vec<Result<OpenApiDocument>> = thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .map(|group| scope.spawn(move || pipeline.run(source, registry, group)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    groups
        .iter()
        .zip(results)
        .map(|(group, result)| result.map(|doc| (group.name.clone(), doc)))
        .collect()
}
