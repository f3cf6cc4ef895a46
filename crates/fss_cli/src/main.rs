use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use fss_core::entity::CollectionKind;
use fss_core::layout::FileLayout;
use fss_core::scenario::Document;
use fss_core::scenario::types::CURRENT_VERSION;
use fss_core::summary::ScenarioSummary;
use fss_core::{CampaignData, DirPackages, DirStore, Level};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a scenario's metadata, grid size and entities.
    Summary {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        id: i32,
        #[arg(long)]
        json: bool,
    },
    /// Print the byte range of each section of a scenario file.
    Layout {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Load a scenario of any version and save it as the current version.
    Upgrade {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        id: i32,
    },
    /// Resize a scenario's grid, dropping entities that fall off it.
    Resize {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        id: i32,
        width: usize,
        height: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a campaign's descriptor and level count.
    Campaign {
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        id: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Summary { root, id, json } => summary(&root, id, json),
        Command::Layout { path, json } => layout(&path, json),
        Command::Upgrade { root, id } => upgrade(&root, id),
        Command::Resize {
            root,
            id,
            width,
            height,
            seed,
        } => resize(&root, id, width, height, seed),
        Command::Campaign { root, id, json } => campaign(&root, &id, json),
    };

    if let Err(message) = result {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

fn load_level(store: &DirStore, id: i32) -> Result<Level, String> {
    let mut level = Level::new(id);
    level.load(store, id).map_err(|e| e.to_string())?;
    Ok(level)
}

fn summary(root: &Path, id: i32, json: bool) -> Result<(), String> {
    let store = DirStore::new(root);
    let summary = load_level(&store, id)?.summary();

    if json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("rendering JSON output: {e}"))?;
        println!("{rendered}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ScenarioSummary) {
    println!("Scenario {}: {}", summary.id, summary.title);
    println!(
        "  type {}  par {}  time bonus limit {}",
        summary.scenario_type, summary.par_value, summary.time_bonus_limit
    );
    println!(
        "  grid {}.pix  {}x{} tiles  {}x{} px",
        summary.grid_name,
        summary.grid_width,
        summary.grid_height,
        summary.pixel_width,
        summary.pixel_height
    );
    println!("  living {}", summary.living_count);

    for kind in CollectionKind::SAVE_ORDER {
        println!("{} ({})", kind.as_str(), summary.count_in(kind));
        for e in summary.entities.iter().filter(|e| e.collection == kind) {
            let name = e.name.as_deref().unwrap_or("-");
            println!(
                "  {:<6} {:<10} family {:>3} at ({:>5},{:>5}) team {} facing {} level {} {}",
                e.id.to_string(),
                e.order,
                e.family,
                e.x,
                e.y,
                e.team,
                e.facing,
                e.level,
                name
            );
        }
    }

    if !summary.description.is_empty() {
        println!("description:");
        for line in &summary.description {
            println!("  {line}");
        }
    }
}

/// `scen12.fss` -> 12, anything else -> 0.
fn scenario_id_from_path(path: &Path) -> i32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("scen"))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn layout(path: &Path, json: bool) -> Result<(), String> {
    let file = File::open(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    let doc = Document::parse_with_layout(BufReader::new(file), scenario_id_from_path(path))
        .map_err(|e| format!("parsing {}: {e}", path.display()))?;

    if json {
        let rendered = serde_json::to_string_pretty(doc.layout())
            .map_err(|e| format!("rendering JSON output: {e}"))?;
        println!("{rendered}");
    } else {
        println!("version {}", doc.version());
        print_layout(doc.layout());
    }
    Ok(())
}

fn print_layout(layout: &FileLayout) {
    for section in &layout.sections {
        println!(
            "{:<12} {:>6}..{:<6} {:>6} bytes",
            section.id.to_string(),
            section.range.start,
            section.range.end,
            section.range.len()
        );
    }
    println!("{:<12} {:>6} bytes", "total", layout.file_len);
}

fn upgrade(root: &Path, id: i32) -> Result<(), String> {
    let mut store = DirStore::new(root);
    let level = load_level(&store, id)?;
    level.save(&mut store).map_err(|e| e.to_string())?;
    println!(
        "Wrote scenario {id} as version {CURRENT_VERSION} under {}",
        store.write_root().display()
    );
    Ok(())
}

fn resize(
    root: &Path,
    id: i32,
    width: usize,
    height: usize,
    seed: Option<u64>,
) -> Result<(), String> {
    let mut store = DirStore::new(root);
    let mut level = load_level(&store, id)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let evicted = level
        .resize_grid(width, height, &mut rng)
        .map_err(|e| e.to_string())?;
    level.save(&mut store).map_err(|e| e.to_string())?;
    log::info!("scenario {id} resized to {width}x{height}");
    println!("Resized scenario {id} to {width}x{height}; removed {evicted} entities");
    Ok(())
}

fn campaign(root: &Path, id: &str, json: bool) -> Result<(), String> {
    let mut packages = DirPackages::new(root);
    let mut data = CampaignData::new(id);
    data.load(&mut packages).map_err(|e| e.to_string())?;

    if json {
        let rendered = serde_json::to_string_pretty(&data)
            .map_err(|e| format!("rendering JSON output: {e}"))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Campaign {}: {} (version {})", data.id, data.title, data.version);
    println!(
        "  levels {}  first level {}  suggested power {}",
        data.num_levels, data.first_level, data.suggested_power
    );
    if !data.authors.is_empty() {
        println!("  authors: {}", data.authors);
    }
    if !data.contributors.is_empty() {
        println!("  contributors: {}", data.contributors);
    }
    if let Some(icon) = &data.icon {
        println!("  icon {}x{} ({} frames)", icon.width(), icon.height(), icon.frames());
    }
    for line in &data.description {
        println!("  {line}");
    }
    Ok(())
}
