//! Security requirements of operations.
//!
//! Paths are classified with the `/v2/projects/...` and `/v2/public/...` patterns (the
//! legacy `/api` prefix is accepted too). The API key may only stand in for the project
//! when the same handler method also serves a `{projectId}` route in the group being
//! built.

use super::{customize_operations, BuildContext, Pass};
use crate::document::{OpenApiDocument, SecurityRequirement};
use crate::error::Result;
use crate::index::HandlerIndex;
use crate::registry::HandlerDescriptor;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

pub const PROJECT_ID_PARAMETER: &str = "projectId";
pub const BEARER_SCHEME: &str = "BearerAuth";
pub const API_KEY_SCHEME: &str = "ApiKeyAuth";
pub const API_KEY_HEADER: &str = "X-API-Key";

fn project_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/(?:api|v2)/projects?/.*").expect("valid regex"))
}

fn public_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/(?:api|v2)/public/.*").expect("valid regex"))
}

pub fn is_project_path(path: &str) -> bool {
    project_path_regex().is_match(path)
}

pub fn is_public_path(path: &str) -> bool {
    public_path_regex().is_match(path)
}

pub fn contains_project_id_param(path: &str) -> bool {
    path.contains(&format!("{{{}}}", PROJECT_ID_PARAMETER))
}

/// Sets the security requirements of every operation.
///
/// - public paths are anonymous (`security: []`)
/// - handlers allowing API key access accept a bearer token or an API key, except on
///   project paths without `{projectId}` whose handler also serves a `{projectId}` path:
///   there the project comes from the API key, so only the key is accepted
/// - everything else requires a bearer token
///
/// The referenced security schemes are added to the components when missing.
pub struct Security;

impl Pass for Security {
    fn name(&self) -> &'static str {
        "security"
    }

    fn apply(&self, document: &mut OpenApiDocument, ctx: &mut BuildContext<'_>) -> Result<()> {
        let index = &ctx.index;
        customize_operations(document, index, |mut operation, handler, path| {
            operation.security = Some(requirements_for(index, handler, path));
            Ok(Some(operation))
        })?;

        let schemes = &mut document.components_mut().security_schemes;
        schemes
            .entry(BEARER_SCHEME.to_string())
            .or_insert_with(|| json!({ "type": "http", "scheme": "bearer" }));
        schemes.entry(API_KEY_SCHEME.to_string()).or_insert_with(|| {
            json!({ "type": "apiKey", "in": "header", "name": API_KEY_HEADER })
        });
        Ok(())
    }
}

fn requirement(scheme: &str) -> SecurityRequirement {
    SecurityRequirement::from([(scheme.to_string(), Vec::new())])
}

fn requirements_for(index: &HandlerIndex, handler: &HandlerDescriptor, path: &str) -> Vec<SecurityRequirement> {
    if is_public_path(path) {
        return Vec::new();
    }

    if !handler.allows_api_access() {
        return vec![requirement(BEARER_SCHEME)];
    }

    let implicit_project = is_project_path(path)
        && !contains_project_id_param(path)
        && index
            .paths_of(handler)
            .iter()
            .any(|p| contains_project_id_param(p));
    if implicit_project {
        vec![requirement(API_KEY_SCHEME)]
    } else {
        vec![requirement(BEARER_SCHEME), requirement(API_KEY_SCHEME)]
    }
}
