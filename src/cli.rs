use crate::config::Config;
use crate::pipeline::{build_groups, Pipeline};
use crate::registry::HandlerRegistry;
use crate::serializer::{load_document, serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Build customized OpenAPI documentation groups from a generated spec
#[derive(Parser, Debug)]
#[command(name = "openapi-groups")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Generated OpenAPI document (YAML or JSON)
    #[arg(value_name = "SPEC")]
    pub spec_path: PathBuf,

    /// Handler manifest file, or a directory of manifests
    #[arg(long = "handlers", value_name = "PATH")]
    pub handlers_path: PathBuf,

    /// Group configuration file (defaults to the `all` and `api-key` groups)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Only build the named groups (repeatable)
    #[arg(short = 'g', long = "group", value_name = "NAME")]
    pub groups: Vec<String>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output directory, one `<group>.<ext>` file per group (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.spec_path.is_file() {
        anyhow::bail!("OpenAPI document does not exist: {}", args.spec_path.display());
    }
    if !args.handlers_path.exists() {
        anyhow::bail!(
            "Handler manifest path does not exist: {}",
            args.handlers_path.display()
        );
    }

    info!("OpenAPI document: {}", args.spec_path.display());
    info!("Handler manifests: {}", args.handlers_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_dir {
        Some(dir) => info!("Output directory: {}", dir.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    let config = match &args.config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load group configuration {}", path.display()))?,
        None => Config::default(),
    };
    let groups = config.select(&args.groups)?;
    info!(
        "Building groups: {}",
        groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    let source = load_document(&args.spec_path)?;
    info!("Loaded {} paths", source.paths.len());

    let registry = HandlerRegistry::load(&args.handlers_path)
        .with_context(|| format!("Failed to load handlers from {}", args.handlers_path.display()))?;
    info!("Loaded {} handlers", registry.len());

    // Every group must build before anything is written
    let pipeline = Pipeline::standard();
    let built = build_groups(&pipeline, &source, &registry, &groups)
        .context("Documentation group build failed")?;

    for (name, document) in &built {
        let content = match args.output_format {
            OutputFormat::Yaml => serialize_yaml(document)?,
            OutputFormat::Json => serialize_json(document)?,
        };

        match &args.output_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.{}", name, args.output_format.extension()));
                write_to_file(&content, &path)?;
                info!("Wrote group {} to {}", name, path.display());
            }
            None => {
                if built.len() > 1 {
                    println!("# group: {}", name);
                }
                println!("{}", content);
            }
        }
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Source paths: {}", source.paths.len());
    info!("  - Handlers: {}", registry.len());
    for (name, document) in &built {
        info!(
            "  - {}: {} paths, {} schemas",
            name,
            document.paths.len(),
            document.components.as_ref().map_or(0, |c| c.schemas.len())
        );
    }

    Ok(())
}
