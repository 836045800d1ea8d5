//! `chronoatlas`: query and edit a year-indexed map from the command line.
//!
//! # Usage
//!
//! ```text
//! chronoatlas create --kind location --year 1180 --from keep.json
//! chronoatlas show --year 1204
//! chronoatlas locate --year 1204 -- 12.5 -3
//! chronoatlas edit --kind region --id <UUID> --year 1210 --patch rename.json
//! ```

mod document;
mod render;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chronoatlas_core::{
  atlas::Lookup,
  diff::Delta,
  entity::EntityKind,
  geometry::Point,
  reconstruct::DeletionPolicy,
  store::{ChangeStore as _, load_atlas},
};
use clap::{Parser, Subcommand};
use document::{AtlasDocument, EntityDraft};
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "chronoatlas", version, about = "Year-indexed fantasy map engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "chronoatlas.toml")]
  config: PathBuf,

  /// Atlas document to use instead of the configured one.
  #[arg(long)]
  atlas: Option<PathBuf>,

  /// How deletions interact with later changes.
  #[arg(long, value_parser = parse_policy)]
  policy: Option<DeletionPolicy>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List every entity that exists in a year.
  Show {
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    #[arg(long)]
    kind: Option<EntityKind>,
    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,
  },

  /// List the regions containing a point, innermost first.
  Locate {
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    #[arg(allow_negative_numbers = true)]
    x: f64,
    #[arg(allow_negative_numbers = true)]
    y: f64,
  },

  /// Print the containment hierarchy of a year.
  Hierarchy {
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    /// Minimum percentage of a region inside another to count as its child.
    #[arg(long)]
    threshold: Option<f64>,
  },

  /// Show one entity as of a year, plus the years it changed in.
  Get {
    #[arg(long)]
    kind: EntityKind,
    #[arg(long)]
    id: Uuid,
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
  },

  /// Add a new base entity from a JSON file
  /// (`{"geometry": ..., "fields": {...}}`) and print its id.
  Create {
    #[arg(long)]
    kind: EntityKind,
    /// Id to use; a random one is generated when omitted.
    #[arg(long)]
    id: Option<Uuid>,
    /// The first year the entity exists.
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    #[arg(long, value_name = "FILE")]
    from: PathBuf,
  },

  /// Apply a JSON patch (`{"geometry": ..., "fields": {...}}`) to an entity
  /// as seen in a year, recording the difference.
  Edit {
    #[arg(long)]
    kind: EntityKind,
    #[arg(long)]
    id: Uuid,
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
    #[arg(long, value_name = "FILE")]
    patch: PathBuf,
  },

  /// Record that an entity stops existing as of a year.
  Delete {
    #[arg(long)]
    kind: EntityKind,
    #[arg(long)]
    id: Uuid,
    #[arg(long, allow_negative_numbers = true)]
    year: i32,
  },

  /// Remove an entity and its entire history from the atlas.
  Erase {
    #[arg(long)]
    kind: EntityKind,
    #[arg(long)]
    id: Uuid,
  },
}

fn parse_policy(s: &str) -> Result<DeletionPolicy, String> {
  match s {
    "terminal" => Ok(DeletionPolicy::Terminal),
    "latest-wins" | "latest_wins" => Ok(DeletionPolicy::LatestWins),
    other => Err(format!(
      "unknown deletion policy {other:?} (expected terminal or latest-wins)"
    )),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  // Flags override the config file, which overrides defaults.
  if let Some(path) = cli.atlas {
    settings.atlas_path = path;
  }
  if let Some(policy) = cli.policy {
    settings.deletion_policy = policy;
  }

  let mut doc = AtlasDocument::load(&settings.atlas_path)
    .with_context(|| format!("loading {}", settings.atlas_path.display()))?;
  let atlas = load_atlas(&doc, settings.deletion_policy)?;

  match cli.command {
    Command::Show { year, kind, json } => {
      let snapshot = atlas.snapshot(year);
      if json {
        let value = serde_json::json!({
          "year": snapshot.year,
          "regions": snapshot.regions,
          "locations": snapshot.locations,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
      } else {
        print!("{}", render::snapshot(&snapshot, kind));
      }
    }

    Command::Locate { year, x, y } => {
      let found = atlas.regions_at(Point::new(x, y), year);
      if found.is_empty() {
        println!("no region contains ({x}, {y}) in {year}");
      }
      for region in &found {
        println!("{}", render::entity_line(region));
      }
    }

    Command::Hierarchy { year, threshold } => {
      let threshold = threshold.unwrap_or(settings.containment_threshold);
      let snapshot = atlas.snapshot(year);
      let hierarchy = atlas.hierarchy_at(year, threshold);
      print!("{}", render::hierarchy(&snapshot, &hierarchy));
    }

    Command::Get { kind, id, year } => {
      match atlas.lookup(kind, id, year) {
        Lookup::Found(entity) => {
          println!("{}", serde_json::to_string_pretty(&entity)?);
        }
        Lookup::NotYetCreated { creation_year } => {
          println!("{kind} {id} is not created until {creation_year}");
        }
        Lookup::Deleted { year: deleted_in } => {
          println!("{kind} {id} was deleted in {deleted_in}");
        }
        Lookup::NotFound => bail!("{kind} {id} not found"),
      }
      let years = atlas.changes().years_for(kind, id);
      if !years.is_empty() {
        println!("changed in: {years:?}");
      }
    }

    Command::Create { kind, id, year, from } => {
      let raw = std::fs::read_to_string(&from)
        .with_context(|| format!("reading {}", from.display()))?;
      let draft: EntityDraft =
        serde_json::from_str(&raw).context("parsing entity")?;
      let id = id.unwrap_or_else(Uuid::new_v4);

      doc.insert_entity(draft.into_entity(kind, id, year)?)?;
      doc.save(&settings.atlas_path)?;
      tracing::info!(%kind, %id, year, "created entity");
      println!("{id}");
    }

    Command::Edit { kind, id, year, patch } => {
      let raw = std::fs::read_to_string(&patch)
        .with_context(|| format!("reading patch {}", patch.display()))?;
      let delta: Delta = serde_json::from_str(&raw).context("parsing patch")?;

      let Some(mut edited) = atlas.lookup(kind, id, year).found() else {
        bail!("{kind} {id} does not exist in {year}");
      };
      delta.apply_to(&mut edited);

      match atlas.plan_edit(kind, id, year, &edited)? {
        Some(record) => {
          doc.upsert(record)?;
          doc.save(&settings.atlas_path)?;
          tracing::info!(%kind, %id, year, "recorded change");
        }
        None => tracing::info!(%kind, %id, year, "no change to record"),
      }
    }

    Command::Delete { kind, id, year } => {
      let record = atlas.plan_delete(kind, id, year)?;
      doc.upsert(record)?;
      doc.save(&settings.atlas_path)?;
      tracing::info!(%kind, %id, year, "recorded deletion");
    }

    Command::Erase { kind, id } => {
      if !doc.erase(kind, id)? {
        bail!("{kind} {id} not found");
      }
      doc.save(&settings.atlas_path)?;
    }
  }

  Ok(())
}
