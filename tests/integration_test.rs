use openapi_groups::{
    cli::{self, CliArgs, OutputFormat},
    config::{Config, GroupConfig},
    document::{OpenApiDocument, Operation, JSON_MEDIA_TYPE, WILDCARD_MEDIA_TYPE},
    index::HandlerIndex,
    pipeline::{build_groups, schemas::TESTING_SCHEMA_NAME, Pipeline},
    registry::{HandlerRegistry, Markers},
    serializer::{load_document, parse_document, serialize_json},
    Error,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn source() -> OpenApiDocument {
    load_document(&fixture("generated_spec.json")).expect("Failed to load fixture spec")
}

fn registry() -> HandlerRegistry {
    HandlerRegistry::load(&fixture("handlers")).expect("Failed to load fixture handlers")
}

fn build(group: &GroupConfig) -> OpenApiDocument {
    Pipeline::standard()
        .run(&source(), &registry(), group)
        .expect("Group build failed")
}

fn operation<'a>(doc: &'a OpenApiDocument, operation_id: &str) -> &'a Operation {
    doc.operations()
        .map(|(_, _, op)| op)
        .find(|op| op.operation_id.as_deref() == Some(operation_id))
        .unwrap_or_else(|| panic!("operation {} not found", operation_id))
}

fn tag_names(doc: &OpenApiDocument) -> Vec<&str> {
    doc.tags.iter().map(|t| t.name.as_str()).collect()
}

fn schema_names(doc: &OpenApiDocument) -> Vec<&str> {
    doc.components
        .as_ref()
        .map(|c| c.schemas.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn test_every_operation_resolves_to_a_handler() {
    let registry = registry();
    let doc = build(&GroupConfig::new("all"));
    assert_eq!(doc.operations().count(), 10);

    let mut index = HandlerIndex::new();
    index.populate(&doc, &registry).expect("Built document has unresolved handlers");
    for (_, _, op) in doc.operations() {
        assert!(index.resolve(op.operation_id.as_deref().unwrap()).is_ok());
    }
}

#[test]
fn test_wildcard_success_content_becomes_json() {
    let doc = build(&GroupConfig::new("all"));

    let content = operation(&doc, "getAllKeys").responses["200"].content.as_ref().unwrap();
    assert_eq!(content.keys().collect::<Vec<_>>(), vec![JSON_MEDIA_TYPE]);
    assert_eq!(
        content[JSON_MEDIA_TYPE].schema,
        Some(json!({ "$ref": "#/components/schemas/KeyPagedModel" }))
    );

    // only the 200 response is normalized
    let created = operation(&doc, "createKey").responses["201"].content.as_ref().unwrap();
    assert!(created.contains_key(WILDCARD_MEDIA_TYPE));
}

#[test]
fn test_tier_and_order_extensions() {
    let doc = build(&GroupConfig::new("all"));

    assert_eq!(operation(&doc, "importKeys").extensions["x-ee"], json!(true));
    let sibling = operation(&doc, "getAllKeys");
    assert!(sibling.extensions.get("x-ee").is_none());
    assert!(sibling.extensions.get("x-order").is_none());

    assert_eq!(operation(&doc, "createKey").extensions["x-order"], json!(1));
    assert_eq!(operation(&doc, "orderTranslation").extensions["x-ee"], json!(true));
    assert_eq!(operation(&doc, "getInfo").extensions["x-self-hosted"], json!(true));
    assert_eq!(operation(&doc, "getPlans").extensions["x-cloud"], json!(true));
    assert!(operation(&doc, "getInfo_2").extensions.is_empty());
}

#[test]
fn test_tags_are_pruned_and_ordered() {
    let doc = build(&GroupConfig::new("all"));

    assert_eq!(tag_names(&doc), vec!["Keys", "Translations", "Initial data", "User"]);
    assert_eq!(doc.tags[0].extensions["x-order"], json!(1));
    assert_eq!(doc.tags[1].extensions["x-order"], json!(2));
    assert!(doc.tags[2].extensions.is_empty());
    assert_eq!(
        doc.tags[0].description.as_deref(),
        Some("Manipulates localization keys")
    );
}

#[test]
fn test_schemas_are_cleaned() {
    let doc = build(&GroupConfig::new("all"));
    let schemas = &doc.components.as_ref().unwrap().schemas;

    assert!(schemas["KeyPagedModel"]["properties"].get("_links").is_none());
    assert!(schemas["KeyModel"]["properties"].get("_links").is_none());
    assert_eq!(
        schema_names(&doc),
        vec![
            "CreateKeyDto",
            "EeSubscriptionModel",
            "InitialDataModel",
            "KeyModel",
            TESTING_SCHEMA_NAME,
            "KeyPagedModel",
            "KeysWithTranslationsPageModel",
            "PageMetadata",
            "PrivateUserAccountModel",
        ]
    );
}

#[test]
fn test_security_requirements() {
    let doc = build(&GroupConfig::new("all"));
    let schemes = |id: &str| -> Vec<Vec<String>> {
        operation(&doc, id)
            .security
            .as_ref()
            .unwrap()
            .iter()
            .map(|req| req.keys().cloned().collect())
            .collect()
    };

    assert_eq!(schemes("getAllKeys"), vec![vec!["BearerAuth"], vec!["ApiKeyAuth"]]);
    assert_eq!(schemes("getAllKeys_1"), vec![vec!["ApiKeyAuth"]]);
    assert_eq!(schemes("getInfo_2"), vec![vec!["BearerAuth"]]);
    assert!(schemes("get_8").is_empty());
}

#[test]
fn test_api_key_group() {
    let doc = build(&GroupConfig::new("api-key").api_key_only());

    let mut ids: Vec<_> = doc
        .operations()
        .filter_map(|(_, _, op)| op.operation_id.clone())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["createKey", "getAllKeys", "getAllKeys_1", "getTranslations"]);

    // the {projectId} sibling is part of the group, so the implicit project rule applies
    let key_only = operation(&doc, "getAllKeys_1").security.as_ref().unwrap();
    assert_eq!(key_only.len(), 1);
    assert!(key_only[0].contains_key("ApiKeyAuth"));

    assert_eq!(tag_names(&doc), vec!["Keys", "Translations"]);
    assert!(!schema_names(&doc).contains(&"InitialDataModel"));
}

#[test]
fn test_rebuilding_output_changes_nothing() {
    let registry = registry();
    let group = GroupConfig::new("all");
    let pipeline = Pipeline::standard();

    let first = pipeline.run(&source(), &registry, &group).unwrap();
    let second = pipeline.run(&first, &registry, &group).unwrap();
    assert_eq!(first, second);

    // also stable through serialization
    let reparsed = parse_document(&serialize_json(&first).unwrap()).unwrap();
    let third = pipeline.run(&reparsed, &registry, &group).unwrap();
    assert_eq!(first, third);
}

#[test]
fn test_rebuilding_filtered_group_changes_nothing() {
    let registry = registry();
    let group = GroupConfig::new("flat").with_paths(&["/v2/projects/keys"]);
    let pipeline = Pipeline::standard();

    let first = pipeline.run(&source(), &registry, &group).unwrap();
    let second = pipeline.run(&first, &registry, &group).unwrap();
    assert_eq!(first, second);

    // the {projectId} route was left out, so the key is not the only accepted scheme
    let security = operation(&first, "getAllKeys_1").security.as_ref().unwrap();
    assert_eq!(security.len(), 2);
}

#[test]
fn test_rebuilding_configured_groups_changes_nothing() {
    let registry = registry();
    let config = Config::load(&fixture("groups.yaml")).unwrap();
    let pipeline = Pipeline::standard();

    let built = build_groups(&pipeline, &source(), &registry, &config.groups).unwrap();
    for (group, (name, first)) in config.groups.iter().zip(&built) {
        let second = pipeline.run(first, &registry, group).unwrap();
        assert_eq!(first, &second, "group {} is not stable", name);
    }
}

#[test]
fn test_conflicting_tag_orders_abort_build() {
    let mut registry = registry();
    registry
        .declare_type("KeyImportController", Markers::default().with_order(2))
        .unwrap();
    let mut source = source();
    let mut import = operation(&source, "importKeys").clone();
    import.operation_id = Some("importKeysResolvable".to_string());
    source
        .paths
        .get_mut("/v2/projects/{projectId}/keys")
        .unwrap()
        .patch = Some(import);
    registry
        .register("importKeysResolvable", "KeyImportController", "import", Markers::default())
        .unwrap();

    let err = Pipeline::standard()
        .run(&source, &registry, &GroupConfig::new("all"))
        .unwrap_err();
    match err.root() {
        Error::ConflictingTagOrder { tag, orders } => {
            assert_eq!(tag, "Keys");
            assert_eq!(orders.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("tag-order"));
}

#[test]
fn test_unregistered_operation_aborts_build() {
    let mut source = source();
    source.paths.insert(
        "/v2/projects/{projectId}/screenshots".to_string(),
        serde_json::from_value(json!({
            "get": { "tags": ["Screenshots"], "operationId": "getKeyScreenshots", "responses": {} }
        }))
        .unwrap(),
    );

    let err = build_groups(&Pipeline::standard(), &source, &registry(), &Config::default().groups)
        .unwrap_err();
    assert!(matches!(
        err.root(),
        Error::HandlerNotFound { operation_id, .. } if operation_id == "getKeyScreenshots"
    ));
}

#[test]
fn test_configured_groups_build_independently() {
    let config = Config::load(&fixture("groups.yaml")).unwrap();
    let built = build_groups(&Pipeline::standard(), &source(), &registry(), &config.groups).unwrap();

    let names: Vec<_> = built.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["all", "api-key", "public", "v2-without-billing"]);

    let public = &built[2].1;
    assert_eq!(public.paths.keys().collect::<Vec<_>>(), vec!["/v2/public/initial-data"]);
    assert_eq!(tag_names(public), vec!["Initial data"]);

    let without_billing = &built[3].1;
    assert_eq!(without_billing.operations().count(), 9);
    assert!(!without_billing.paths.contains_key("/v2/billing/plans"));
}

#[test]
fn test_cli_writes_one_file_per_group() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("docs");

    let args = CliArgs {
        spec_path: fixture("generated_spec.json"),
        handlers_path: fixture("handlers"),
        config_path: None,
        groups: Vec::new(),
        output_format: OutputFormat::Json,
        output_dir: Some(out.clone()),
        verbose: false,
    };
    cli::run(cli::parse_args_from_parsed(args).unwrap()).unwrap();

    let all = load_document(&out.join("all.json")).unwrap();
    let api_key = load_document(&out.join("api-key.json")).unwrap();
    assert_eq!(all.operations().count(), 10);
    assert_eq!(api_key.operations().count(), 4);

    let raw = std::fs::read_to_string(out.join("all.json")).unwrap();
    assert!(raw.contains("\"x-ee\": true"));
    assert!(raw.contains("\"x-order\": 1"));
}

#[test]
fn test_cli_writes_nothing_when_a_group_fails() {
    let temp_dir = TempDir::new().unwrap();
    let handlers = temp_dir.path().join("handlers.yaml");
    std::fs::write(
        &handlers,
        "handlers:\n  getAllKeys: {type: KeyController, method: getAll}\n",
    )
    .unwrap();
    let out = temp_dir.path().join("docs");

    let args = CliArgs {
        spec_path: fixture("generated_spec.json"),
        handlers_path: handlers,
        config_path: None,
        groups: vec!["all".to_string()],
        output_format: OutputFormat::Yaml,
        output_dir: Some(out.clone()),
        verbose: false,
    };

    assert!(cli::run(args).is_err());
    assert!(!out.exists());
}
