use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plano_api::{PlanogramProjector, SuggestionRequest};
use plano_catalog::InMemoryCatalog;
use plano_core::{FacingConfig, PlanogramAction, PlanogramConfig, SemanticPosition, ValidationResult};
use plano_render::PipelineConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "planoctl", version, about = "Planogram projection CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Catalog document (JSON or YAML) with products and fixture templates
    #[arg(long = "catalog", env = "PLANO_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Project a planogram (plus an optional action log) into render instances
    Project {
        planogram: PathBuf,
        /// Action log to fold over the planogram before projecting
        #[arg(long = "actions")]
        actions: Option<PathBuf>,
        /// Print instances in paint order instead of product order
        #[arg(long = "paint-order")]
        paint_order: bool,
    },
    /// Check whether one action would leave the planogram sound
    Validate {
        planogram: PathBuf,
        /// File holding the single action to check
        action: PathBuf,
        #[arg(long = "actions")]
        actions: Option<PathBuf>,
    },
    /// Suggest a free shelf slot for a sku
    Suggest {
        planogram: PathBuf,
        #[arg(long = "sku")]
        sku: String,
        #[arg(long = "shelf")]
        preferred_shelf: Option<u32>,
        /// Only search these shelves, e.g. "1,2"
        #[arg(long = "allowed", value_delimiter = ',')]
        allowed: Option<Vec<u32>>,
        #[arg(long = "facings", default_value_t = 1)]
        facings: u32,
        #[arg(long = "actions")]
        actions: Option<PathBuf>,
    },
    /// List colliding products
    Collisions {
        planogram: PathBuf,
        #[arg(long = "actions")]
        actions: Option<PathBuf>,
    },
    /// Start an empty planogram from a catalog fixture template
    New {
        fixture_type: String,
    },
    /// List registered placement models
    Models,
}

fn init_tracing() {
    let env = std::env::var("PLANO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Parse by extension: `.yaml`/`.yml` as YAML, anything else as JSON.
fn load_doc<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml {}", path.display())),
        _ => serde_json::from_str(&raw).with_context(|| format!("parsing json {}", path.display())),
    }
}

fn load_actions(path: Option<&Path>) -> Result<Vec<PlanogramAction>> {
    match path {
        Some(p) => load_doc(p),
        None => Ok(Vec::new()),
    }
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn print_validation(v: &ValidationResult) {
    let verdict = if v.valid { "valid" } else { "invalid" };
    println!("{} (can render: {})", verdict, v.can_render);
    for e in v.errors.iter() {
        println!("  error   {} • {}", e.code, e.message);
    }
    for w in v.warnings.iter() {
        println!("  warning {} • {}", w.code, w.message);
    }
}

fn projector(catalog: Option<&Path>, config: PipelineConfig) -> Result<PlanogramProjector> {
    let catalog = match catalog {
        Some(p) => InMemoryCatalog::load_path(p)?,
        None => {
            warn!("no --catalog given; every sku will be reported as missing");
            InMemoryCatalog::new()
        }
    };
    let catalog = Arc::new(catalog);
    Ok(PlanogramProjector::from_config(config, catalog.clone(), catalog))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    let api = projector(cli.catalog.as_deref(), config)?;

    match cli.command {
        Commands::Project { planogram, actions, paint_order } => {
            let t0 = Instant::now();
            let base: PlanogramConfig = load_doc(&planogram)?;
            let actions = load_actions(actions.as_deref())?;
            info!(products = base.products.len(), actions = actions.len(), "project invoked");
            let snap = api.project(&base, &actions).await?;
            match cli.output {
                Output::Json => print_json(&snap)?,
                Output::Human => {
                    let rows = if paint_order { snap.render.paint_order() } else { snap.render.render_instances.iter().collect() };
                    for i in rows {
                        println!(
                            "{} • {} • x={:.1} y={:.1} z={:.1} • scale={:.3} • z-index={}",
                            i.id, i.sku, i.world_position.x, i.world_position.y, i.world_position.z, i.render_scale, i.z_index
                        );
                    }
                    let m = &snap.render.metadata;
                    println!("{} of {} instances valid, {} dropped", m.valid_instances, m.total_instances, m.invalid_count);
                    for e in m.processing_errors.iter() {
                        println!("  {} • {} • {} • {}", e.instance_id.as_deref().unwrap_or(&e.product_id), e.stage, e.code, e.message);
                    }
                    if !snap.collisions.is_empty() {
                        println!("{} products colliding", snap.collisions.len());
                    }
                }
            }
            info!(took_ms = %t0.elapsed().as_millis(), "project done");
        }
        Commands::Validate { planogram, action, actions } => {
            let base: PlanogramConfig = load_doc(&planogram)?;
            let actions = load_actions(actions.as_deref())?;
            let action: PlanogramAction = load_doc(&action)?;
            let v = api.validate_intent(&base, &actions, &action).await;
            match cli.output {
                Output::Json => print_json(&v)?,
                Output::Human => print_validation(&v),
            }
            if !v.valid {
                std::process::exit(1);
            }
        }
        Commands::Suggest { planogram, sku, preferred_shelf, allowed, facings, actions } => {
            let base: PlanogramConfig = load_doc(&planogram)?;
            let actions = load_actions(actions.as_deref())?;
            let req = SuggestionRequest {
                preferred_shelf,
                allowed_shelves: allowed,
                facings: Some(FacingConfig::new(facings, 1)),
                ..SuggestionRequest::new(sku)
            };
            let found = api.suggest_placement(&base, &actions, &req).await;
            match (cli.output, &found) {
                (Output::Json, _) => print_json(&found)?,
                (Output::Human, Some(s)) => match &s.position {
                    SemanticPosition::ShelfSurface(p) => println!("shelf {} • depth {} • x={:.1}", p.shelf_index, p.depth, p.x),
                    other => print_json(other)?,
                },
                (Output::Human, None) => println!("no free slot for {}", req.sku),
            }
        }
        Commands::Collisions { planogram, actions } => {
            let base: PlanogramConfig = load_doc(&planogram)?;
            let actions = load_actions(actions.as_deref())?;
            let snap = api.project(&base, &actions).await?;
            match cli.output {
                Output::Json => print_json(&snap.collisions)?,
                Output::Human => {
                    if snap.collisions.is_empty() {
                        println!("no collisions");
                    }
                    for (id, entries) in snap.collisions.iter() {
                        for c in entries {
                            println!(
                                "{} ↔ {} • shelf {} depth {} • x={:.1} • overlap {:.1}mm",
                                id, c.target_id, c.position.shelf_index, c.position.depth, c.position.x, c.overlap_mm
                            );
                        }
                    }
                }
            }
        }
        Commands::New { fixture_type } => {
            if cli.catalog.is_none() {
                bail!("`new` needs --catalog (or PLANO_CATALOG) for fixture templates");
            }
            let cfg = api.new_planogram(&fixture_type).await?;
            match cli.output {
                Output::Json => print_json(&cfg)?,
                Output::Human => print!("{}", serde_yaml::to_string(&cfg)?),
            }
        }
        Commands::Models => {
            let ids = api.registry().ids();
            match cli.output {
                Output::Json => print_json(&ids)?,
                Output::Human => ids.iter().for_each(|id| println!("{id}")),
            }
        }
    }
    Ok(())
}
