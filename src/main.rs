//! # Oakoak Command Line
//!
//! Offline tools around the encounter engine: rendering single images,
//! timing the compositor, auditing sprite data and simulating a busy channel.

use clap::{Parser, Subcommand};
use log::{info, warn};
use oakoak::{
    audit, create_rng, AssetPaths, CaptureOutcome, Catalog, ChannelConfig, Compositor,
    CompositorSettings, EncounterGame, EncounterSpawner, GameConfig, InMemoryCatalog,
    MonotonicClock, Nature, OakError, OakResult, RenderMode, SpawnOutcome, SpriteIndex,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Command line arguments for the oakoak tools.
#[derive(Parser, Debug)]
#[command(name = "oakoak")]
#[command(about = "Wild creature encounters for group chats")]
#[command(version)]
struct Args {
    /// Game configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Asset paths file (JSON)
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Nature table file (JSON), the standard natures when omitted
    #[arg(long, global = true)]
    natures: Option<PathBuf>,

    /// Random seed for spawn rolls
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one encounter image
    Render {
        /// Sprite file to render
        #[arg(long)]
        sprite: PathBuf,
        /// Creature name shown on the reveal
        #[arg(long)]
        name: String,
        /// Render the silhouette teaser instead of the reveal
        #[arg(long)]
        silhouette: bool,
        /// Output GIF file
        #[arg(long)]
        out: PathBuf,
    },
    /// Render random encounters and report the average render time
    CheckPerformance {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        sprites: PathBuf,
        #[arg(long, default_value_t = 100)]
        loops: u32,
    },
    /// Report creatures with incomplete art and sprites without a creature
    ValidateData {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        sprites: PathBuf,
    },
    /// Drive a channel with synthetic messages and print the spawn tally
    Simulate {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        sprites: PathBuf,
        /// Spawn rate of the simulated channel
        #[arg(long, default_value_t = 0.05)]
        channel_rate: f64,
        #[arg(long, default_value_t = 10_000)]
        messages: u32,
    },
}

#[tokio::main]
async fn main() -> OakResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;

    info!("Starting oakoak v{}", oakoak::VERSION);

    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let assets = match &args.assets {
        Some(path) => AssetPaths::load(path)?,
        None => AssetPaths::default(),
    };
    let compositor = Compositor::new(assets, CompositorSettings::default())?;

    match args.command {
        Command::Render {
            sprite,
            name,
            silhouette,
            out,
        } => {
            let mode = if silhouette {
                RenderMode::Silhouette
            } else {
                RenderMode::Reveal
            };
            let bytes = compositor.render_detached(sprite, name, mode).await?;
            std::fs::write(&out, &bytes)?;
            info!("Wrote {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
        Command::CheckPerformance {
            catalog,
            sprites,
            loops,
        } => {
            let catalog = load_catalog(&catalog, &sprites, args.natures.as_deref(), &config)?;
            check_performance(catalog, &compositor, &config, args.seed, loops)
        }
        Command::ValidateData { catalog, sprites } => validate_data(&catalog, &sprites, &config),
        Command::Simulate {
            catalog,
            sprites,
            channel_rate,
            messages,
        } => {
            let catalog = load_catalog(&catalog, &sprites, args.natures.as_deref(), &config)?;
            simulate(catalog, compositor, config, args.seed, channel_rate, messages)
        }
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> OakResult<()> {
    let level = match log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        other => {
            return Err(OakError::Config(format!("unknown log level '{}'", other)));
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .parse_default_env()
        .init();
    Ok(())
}

fn load_catalog(
    catalog: &Path,
    sprites: &Path,
    natures: Option<&Path>,
    config: &GameConfig,
) -> OakResult<Arc<InMemoryCatalog>> {
    let mut loaded = InMemoryCatalog::load(catalog, sprites, config.max_generation)?;
    if let Some(path) = natures {
        loaded = loaded.with_natures(Nature::load_table(path)?)?;
    }
    Ok(Arc::new(loaded))
}

fn check_performance(
    catalog: Arc<InMemoryCatalog>,
    compositor: &Compositor,
    config: &GameConfig,
    seed: Option<u64>,
    loops: u32,
) -> OakResult<()> {
    let mut rng = create_rng(seed);
    let spawner = EncounterSpawner::new(catalog, Arc::new(MonotonicClock));
    let channel = ChannelConfig::new(
        0,
        1.0,
        1..=config.max_generation,
        config.max_generation,
    )?;

    let mut total = Duration::ZERO;
    let mut rendered = 0u32;
    for _ in 0..loops {
        let roll = config.rarity_table.roll(&mut rng, config.shiny_chance);
        let encounter = match spawner.spawn(&channel, &roll, &mut rng) {
            Ok(encounter) => encounter,
            Err(OakError::NoEligibleCreature { tier, .. }) => {
                warn!("Nothing to render for tier {}", tier);
                continue;
            }
            Err(err) => return Err(err),
        };

        let started = Instant::now();
        compositor.render(encounter.sprite_path(), encounter.name(), RenderMode::Silhouette)?;
        total += started.elapsed();
        rendered += 1;
    }

    if rendered == 0 {
        return Err(OakError::Catalog("no encounter could be rendered".to_string()));
    }
    info!(
        "Stress test finished. {} images processed in {:.3}s with an average of {:.4}s per image",
        rendered,
        total.as_secs_f64(),
        total.as_secs_f64() / f64::from(rendered)
    );
    Ok(())
}

fn validate_data(catalog: &Path, sprites: &Path, config: &GameConfig) -> OakResult<()> {
    let index = SpriteIndex::scan(sprites)?;
    let catalog = InMemoryCatalog::load(catalog, sprites, config.max_generation)?;
    let report = audit(catalog.records().iter().map(|record| record.as_ref()), &index);

    for (id, name, problems) in &report.incomplete {
        warn!("{} (#{}) has incomplete art: {:?}", name, id, problems);
    }
    for orphan in &report.orphans {
        warn!("{} belongs to no creature", orphan.display());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        info!("Data is consistent");
    }
    Ok(())
}

fn simulate(
    catalog: Arc<InMemoryCatalog>,
    compositor: Compositor,
    config: GameConfig,
    seed: Option<u64>,
    channel_rate: f64,
    messages: u32,
) -> OakResult<()> {
    const CHANNEL: i64 = -1;
    const PLAYER: i64 = 1;

    let catalog: Arc<dyn Catalog> = catalog;
    let game = EncounterGame::in_memory(config, catalog, compositor, Arc::new(MonotonicClock))?;
    game.set_rate(CHANNEL, &channel_rate.to_string())?;
    let mut rng = create_rng(seed);

    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for _ in 0..messages {
        let key = match game.on_message(CHANNEL, &mut rng)? {
            SpawnOutcome::Spawned(encounter) => {
                let caught = game.attempt_capture(CHANNEL, PLAYER, encounter.name())?;
                if !matches!(caught, CaptureOutcome::Caught { .. }) {
                    warn!("{} could not be caught by name", encounter.name());
                }
                encounter.tier.to_string()
            }
            SpawnOutcome::NoEligibleCreature(tier) => format!("{} (none eligible)", tier),
            SpawnOutcome::NoRoll => "no roll".to_string(),
            SpawnOutcome::StillActive => "still active".to_string(),
            SpawnOutcome::Fled(_) => "fled".to_string(),
        };
        *tally.entry(key).or_default() += 1;
    }

    println!("{}", serde_json::to_string_pretty(&tally)?);
    Ok(())
}
