//! Handler registry: the side table describing the code that serves each operation.
//!
//! A registry maps operation ids to the handler method that serves them and records the
//! declarative markers (ordering hints, restricted tiers, API key access) attached to the
//! handler method and to its declaring type. Registries are usually loaded from YAML or JSON
//! manifests emitted during route registration:
//!
//! ```yaml
//! types:
//!   KeyController:
//!     order: 3
//!     tiers: [ee]
//! handlers:
//!   getAllKeys:
//!     type: KeyController
//!     method: getAll
//!     order: 1
//!     allow_api_access: true
//! ```

use crate::error::{Error, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Restricted tiers an operation can belong to. Tiers are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Elevated (enterprise) feature
    Ee,
    /// Only available on the cloud offering
    Cloud,
    /// Only available on self-hosted instances
    SelfHosted,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Ee, Tier::Cloud, Tier::SelfHosted];

    /// The operation extension field signalling membership in this tier.
    pub fn extension_key(&self) -> &'static str {
        match self {
            Tier::Ee => "x-ee",
            Tier::Cloud => "x-cloud",
            Tier::SelfHosted => "x-self-hosted",
        }
    }
}

/// Declarative markers attached to a handler method or a declaring type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tiers: BTreeSet<Tier>,
    #[serde(default)]
    pub allow_api_access: bool,
}

impl Markers {
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tiers.insert(tier);
        self
    }

    pub fn with_api_access(mut self) -> Self {
        self.allow_api_access = true;
        self
    }
}

/// Metadata about the handler method serving one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub operation_id: String,
    pub declaring_type: String,
    pub method: String,
    /// Markers declared on the method itself
    pub markers: Markers,
    /// Markers declared on the declaring type, inherited as defaults
    pub type_markers: Markers,
}

impl HandlerDescriptor {
    /// Identity of the handler method, e.g. `KeyController::getAll`.
    pub fn handler_id(&self) -> String {
        format!("{}::{}", self.declaring_type, self.method)
    }

    /// Method-level order; type-level order only applies to tags.
    pub fn order(&self) -> Option<i32> {
        self.markers.order
    }

    /// Whether the method, or failing that its declaring type, declares `tier`.
    pub fn has_tier(&self, tier: Tier) -> bool {
        self.markers.tiers.contains(&tier) || self.type_markers.tiers.contains(&tier)
    }

    pub fn allows_api_access(&self) -> bool {
        self.markers.allow_api_access
    }
}

/// On-disk manifest format.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub types: BTreeMap<String, Markers>,
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerEntry>,
}

/// One handler entry of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerEntry {
    #[serde(rename = "type")]
    pub declaring_type: String,
    pub method: String,
    #[serde(flatten)]
    pub markers: Markers,
}

#[derive(Debug, Clone)]
struct Registered {
    entry: HandlerEntry,
    source: String,
}

/// Operation id -> handler lookup table, populated once and read by every group build.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Registered>,
    types: BTreeMap<String, Markers>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares markers on a handler type. Redeclaring a type merges its tiers and API
    /// access flag; its order may be repeated but never changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingTypeOrder`] if the type already carries a different order.
    pub fn declare_type(&mut self, name: impl Into<String>, markers: Markers) -> Result<()> {
        let name = name.into();
        let entry = self.types.entry(name.clone()).or_default();
        match (entry.order, markers.order) {
            (Some(existing), Some(order)) if existing != order => {
                return Err(Error::ConflictingTypeOrder {
                    declaring_type: name,
                    orders: BTreeSet::from([existing, order]),
                });
            }
            (None, Some(order)) => entry.order = Some(order),
            _ => {}
        }
        entry.tiers.extend(markers.tiers);
        entry.allow_api_access |= markers.allow_api_access;
        Ok(())
    }

    /// Registers the handler method serving `operation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateHandler`] if the operation id is already registered.
    pub fn register(
        &mut self,
        operation_id: impl Into<String>,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        markers: Markers,
    ) -> Result<()> {
        let entry = HandlerEntry {
            declaring_type: declaring_type.into(),
            method: method.into(),
            markers,
        };
        self.insert(operation_id.into(), entry, "<code>".to_string())
    }

    fn insert(&mut self, operation_id: String, entry: HandlerEntry, source: String) -> Result<()> {
        if let Some(existing) = self.handlers.get(&operation_id) {
            return Err(Error::DuplicateHandler {
                operation_id,
                first: existing.source.clone(),
                second: source,
            });
        }
        debug!(
            "Registered handler {}::{} for {}",
            entry.declaring_type, entry.method, operation_id
        );
        self.handlers.insert(operation_id, Registered { entry, source });
        Ok(())
    }

    /// Merges a parsed manifest into the registry. `source` names it in error messages.
    pub fn add_manifest(&mut self, manifest: Manifest, source: &str) -> Result<()> {
        for (name, markers) in manifest.types {
            self.declare_type(name, markers)?;
        }
        for (operation_id, entry) in manifest.handlers {
            self.insert(operation_id, entry, source.to_string())?;
        }
        Ok(())
    }

    /// Loads a registry from a manifest file or a directory of manifests.
    ///
    /// Directories are walked recursively in file name order. Hidden directories are
    /// skipped, as are files without a `.yaml`, `.yml` or `.json` extension.
    ///
    /// # Arguments
    ///
    /// * `path` - A manifest file, or a directory containing manifests
    ///
    /// # Returns
    ///
    /// Returns the registry holding every handler and type declared by the manifests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Manifest`] for unreadable or malformed files,
    /// [`Error::DuplicateHandler`] when two entries register the same operation id, and
    /// [`Error::ConflictingTypeOrder`] when a type is given two different orders.
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry = Self::new();
        for file in manifest_files(path) {
            let content = fs::read_to_string(&file).map_err(|source| Error::Io {
                path: file.clone(),
                source,
            })?;
            let manifest: Manifest =
                serde_yaml::from_str(&content).map_err(|source| Error::Manifest {
                    path: file.clone(),
                    source,
                })?;
            debug!(
                "Loaded {} handlers and {} types from {}",
                manifest.handlers.len(),
                manifest.types.len(),
                file.display()
            );
            registry.add_manifest(manifest, &file.display().to_string())?;
        }
        Ok(registry)
    }

    /// Resolves the handler registered for `operation_id`, combining its type markers.
    pub fn lookup(&self, operation_id: &str) -> Option<HandlerDescriptor> {
        self.handlers.get(operation_id).map(|registered| {
            let entry = &registered.entry;
            HandlerDescriptor {
                operation_id: operation_id.to_string(),
                declaring_type: entry.declaring_type.clone(),
                method: entry.method.clone(),
                markers: entry.markers.clone(),
                type_markers: self
                    .types
                    .get(&entry.declaring_type)
                    .cloned()
                    .unwrap_or_default(),
            }
        })
    }

    pub fn type_markers(&self, declaring_type: &str) -> Option<&Markers> {
        self.types.get(declaring_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn manifest_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                let is_manifest = matches!(
                    path.extension().and_then(|s| s.to_str()),
                    Some("yaml") | Some("yml") | Some("json")
                );
                if path.is_file() && is_manifest {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => warn!("Failed to access path: {}", e),
        }
    }
    files
}
