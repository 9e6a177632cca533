//! Per-build index from operation ids to the handlers serving them.

use crate::document::OpenApiDocument;
use crate::error::{Error, Result};
use crate::registry::{HandlerDescriptor, HandlerRegistry};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Operation id -> handler map for one document, plus the paths each handler method serves.
#[derive(Debug, Clone, Default)]
pub struct HandlerIndex {
    handlers: BTreeMap<String, HandlerDescriptor>,
    handler_paths: BTreeMap<String, Vec<String>>,
}

impl HandlerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans every operation of `document` and resolves it against `registry`.
    ///
    /// Previous contents are replaced, so calling this again on the same document yields
    /// the same index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerNotFound`] for the first operation that has no operation id
    /// or whose id is not registered. A missing handler means a misconfigured route.
    pub fn populate(&mut self, document: &OpenApiDocument, registry: &HandlerRegistry) -> Result<()> {
        let mut handlers = BTreeMap::new();
        let mut handler_paths: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (path, method, operation) in document.operations() {
            let operation_id = operation.operation_id.clone().unwrap_or_default();
            let handler = registry
                .lookup(&operation_id)
                .ok_or_else(|| Error::HandlerNotFound {
                    operation_id: operation_id.clone(),
                    path: format!("{} {}", method, path),
                })?;

            let served = handler_paths.entry(handler.handler_id()).or_default();
            if !served.iter().any(|p| p == path) {
                served.push(path.to_string());
            }
            handlers.insert(operation_id, handler);
        }

        debug!(
            "Indexed {} operations served by {} handler methods",
            handlers.len(),
            handler_paths.len()
        );
        self.handlers = handlers;
        self.handler_paths = handler_paths;
        Ok(())
    }

    /// Rebuilds the index from the operations currently in `document`.
    ///
    /// Used after operations were filtered out: handler paths are recorded from the
    /// remaining document only, so a document built from its own output indexes the same
    /// paths again.
    pub fn refresh(&mut self, document: &OpenApiDocument, registry: &HandlerRegistry) -> Result<()> {
        let before = self.handlers.len();
        self.populate(document, registry)?;
        debug!("Refreshed index, {} of {} operations left", self.handlers.len(), before);
        Ok(())
    }

    /// Returns the handler serving `operation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerNotFound`] when the id was not indexed.
    pub fn resolve(&self, operation_id: &str) -> Result<&HandlerDescriptor> {
        self.handlers
            .get(operation_id)
            .ok_or_else(|| Error::HandlerNotFound {
                operation_id: operation_id.to_string(),
                path: "<unindexed>".to_string(),
            })
    }

    /// Paths served by the handler method, in document order.
    pub fn paths_of(&self, handler: &HandlerDescriptor) -> &[String] {
        self.handler_paths
            .get(&handler.handler_id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Declaring types of every indexed handler.
    pub fn declaring_types(&self) -> BTreeSet<&str> {
        self.handlers
            .values()
            .map(|h| h.declaring_type.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Markers;
    use serde_json::json;

    fn document() -> OpenApiDocument {
        serde_json::from_value(json!({
            "openapi": "3.0.1",
            "info": { "title": "Tolgee API", "version": "v2" },
            "paths": {
                "/v2/projects/keys": {
                    "get": { "operationId": "getAllKeys_1", "responses": {} }
                },
                "/v2/projects/{projectId}/keys": {
                    "get": { "operationId": "getAllKeys", "responses": {} }
                },
                "/v2/projects/{projectId}/tags": {
                    "get": { "operationId": "getTags", "responses": {} }
                }
            }
        }))
        .unwrap()
    }

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry
            .register("getAllKeys", "KeyController", "getAll", Markers::default())
            .unwrap();
        registry
            .register("getAllKeys_1", "KeyController", "getAll", Markers::default())
            .unwrap();
        registry
            .register("getTags", "TagsController", "list", Markers::default())
            .unwrap();
        registry
    }

    #[test]
    fn test_populate_and_resolve() {
        let mut index = HandlerIndex::new();
        index.populate(&document(), &registry()).unwrap();

        assert_eq!(index.len(), 3);
        let handler = index.resolve("getTags").unwrap();
        assert_eq!(handler.declaring_type, "TagsController");
        assert_eq!(
            index.declaring_types().into_iter().collect::<Vec<_>>(),
            vec!["KeyController", "TagsController"]
        );
    }

    #[test]
    fn test_tracks_paths_per_handler_method() {
        let mut index = HandlerIndex::new();
        index.populate(&document(), &registry()).unwrap();

        let handler = index.resolve("getAllKeys").unwrap().clone();
        assert_eq!(
            index.paths_of(&handler),
            &[
                "/v2/projects/keys".to_string(),
                "/v2/projects/{projectId}/keys".to_string()
            ]
        );
    }

    #[test]
    fn test_missing_handler_is_fatal() {
        let mut registry = HandlerRegistry::new();
        registry
            .register("getAllKeys", "KeyController", "getAll", Markers::default())
            .unwrap();

        let err = HandlerIndex::new().populate(&document(), &registry).unwrap_err();
        match err {
            Error::HandlerNotFound { operation_id, path } => {
                assert_eq!(operation_id, "getAllKeys_1");
                assert_eq!(path, "GET /v2/projects/keys");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_unknown_id() {
        let index = HandlerIndex::new();
        assert!(matches!(
            index.resolve("nope"),
            Err(Error::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn test_refresh_forgets_paths_of_removed_operations() {
        let mut doc = document();
        let registry = registry();
        let mut index = HandlerIndex::new();
        index.populate(&doc, &registry).unwrap();

        doc.paths.remove("/v2/projects/keys");
        index.refresh(&doc, &registry).unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.resolve("getAllKeys_1").is_err());
        let handler = index.resolve("getAllKeys").unwrap().clone();
        assert_eq!(index.paths_of(&handler), &["/v2/projects/{projectId}/keys".to_string()]);
    }

    #[test]
    fn test_populate_is_idempotent() {
        let doc = document();
        let registry = registry();
        let mut index = HandlerIndex::new();
        index.populate(&doc, &registry).unwrap();
        index.populate(&doc, &registry).unwrap();

        let handler = index.resolve("getAllKeys").unwrap().clone();
        assert_eq!(index.paths_of(&handler).len(), 2);
        assert_eq!(index.len(), 3);
    }
}
