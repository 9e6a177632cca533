//! openapi-groups - customized OpenAPI documentation groups from a generated spec.
//!
//! A web framework's documentation generator produces one raw OpenAPI document. This crate
//! turns it into one finalized document per documentation group by running an explicit
//! pipeline of rewrite passes that consult a registry of request handler metadata.
//!
//! # Architecture
//!
//! 1. [`document`] - typed OpenAPI document model preserving unknown fields
//! 2. [`registry`] - operation id -> handler side table, loaded from manifests
//! 3. [`index`] - per-build handler index and handler -> paths map
//! 4. [`pipeline`] - the ordered rewrite passes and the group builder
//! 5. [`config`] - documentation group configuration
//! 6. [`serializer`] - YAML/JSON input and output
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_groups::{
//!     config::Config,
//!     pipeline::{build_groups, Pipeline},
//!     registry::HandlerRegistry,
//!     serializer::{load_document, serialize_yaml},
//! };
//! use std::path::Path;
//!
//! let source = load_document(Path::new("generated.json")).unwrap();
//! let registry = HandlerRegistry::load(Path::new("handlers/")).unwrap();
//! let config = Config::default();
//!
//! let built = build_groups(&Pipeline::standard(), &source, &registry, &config.groups).unwrap();
//! for (name, document) in &built {
//!     println!("# {}\n{}", name, serialize_yaml(document).unwrap());
//! }
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod registry;
pub mod serializer;

pub use error::{Error, Result};
