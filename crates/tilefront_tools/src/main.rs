//! Tilefront - command-line tools

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tilefront_core::config::{Difficulty, MatchConfig};
use tilefront_core::map_generation::generate_map;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tilefront")]
#[command(about = "Map preview, config validation and headless matches for Tilefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a map and print it as ASCII
    Generate {
        /// Requested width in tiles
        #[arg(long, default_value_t = 100)]
        width: u32,
        /// Requested height in tiles
        #[arg(long, default_value_t = 100)]
        height: u32,
        /// Terrain seed
        #[arg(long, default_value_t = 12_345)]
        seed: u64,
        /// Difficulty (scales map size and deposit counts)
        #[arg(long, value_enum, default_value_t = DifficultyArg::Normal)]
        difficulty: DifficultyArg,
    },
    /// Validate a RON match config
    Validate {
        /// Path to the config file
        path: PathBuf,
    },
    /// Run a headless match and print a JSON summary
    Simulate {
        /// Optional RON match config; defaults are used otherwise
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of ticks to run
        #[arg(long, default_value_t = 600)]
        ticks: u64,
        /// Milliseconds per tick
        #[arg(long, default_value_t = 100)]
        delta_ms: u32,
        /// Include the final player snapshot in the output
        #[arg(long)]
        snapshot: bool,
    },
}

fn run(command: Commands) -> tilefront_tools::Result<()> {
    match command {
        Commands::Generate {
            width,
            height,
            seed,
            difficulty,
        } => {
            let config = MatchConfig::new(width, height)
                .with_seed(seed)
                .with_difficulty(difficulty.into());
            config.validate()?;
            let map = generate_map(&config.map_config())?;
            tracing::info!(
                width = map.width(),
                height = map.height(),
                deposits = map.deposits().len(),
                "Generated map"
            );
            print!("{}", map.render_ascii());
        }
        Commands::Validate { path } => {
            tracing::info!("Validating config: {}", path.display());
            let config = tilefront_tools::validate::load_config(&path)?;
            println!("ok: {}", tilefront_tools::validate::describe(&config));
        }
        Commands::Simulate {
            config,
            ticks,
            delta_ms,
            snapshot,
        } => {
            let config = match config {
                Some(path) => tilefront_tools::validate::load_config(&path)?,
                None => MatchConfig::default(),
            };
            let summary =
                tilefront_tools::headless::run_headless(config, ticks, delta_ms, snapshot)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
