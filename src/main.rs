use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tilemark::imaging::{RustBackend, WatermarkAsset};
use tilemark::pipeline::{self, JobContext};
use tilemark::recent::RecentFile;
use tilemark::{config, output, planner};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("TILEMARK_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("TILEMARK_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "tilemark")]
#[command(about = "Shrink JPEG photos and stamp them with a tiled watermark")]
#[command(long_about = "\
Shrink JPEG photos and stamp them with a tiled watermark

Every photo is resized so its shorter side is 320px, then a half-transparent
watermark is stacked from the bottom edge upward and the result is saved as JPEG.

Where output goes (tilemark.toml):

  suffix = true, subfolder = false   photos/photo.watermark.jpg   (default)
  suffix = false, subfolder = true   photos/with-watermark/photo.jpg
  suffix = true, subfolder = true    photos/with-watermark/photo.watermark.jpg
  suffix = false, subfolder = false  photos/photo.jpg             (overwrites!)

Set folderswitch = false and savepath = [\"/some/dir\"] to write elsewhere.

Run 'tilemark gen-config' to print a documented tilemark.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Settings file
    #[arg(long, default_value = config::SETTINGS_FILENAME, global = true)]
    config: PathBuf,

    /// Watermark image (overrides the settings file)
    #[arg(long, global = true)]
    watermark: Option<PathBuf>,

    /// Recent-documents list to update
    #[arg(long, default_value = ".tilemark-recent.json", global = true)]
    recent: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark and shrink one or more JPEG files
    Shrink {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print where a file's output would be written
    Plan { file: PathBuf },
    /// Print a stock tilemark.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tilemark=debug" } else { "tilemark=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Shrink { files } => {
            let settings = config::load_settings(&cli.config)?;
            init_thread_pool(&settings.processing);

            let recents = RecentFile::new(&cli.recent);
            if settings.clearlist {
                if let Err(e) = recents.clear() {
                    tracing::warn!("could not clear recent documents: {e}");
                }
            }

            let mut watermark = settings.watermark_config();
            if let Some(path) = cli.watermark {
                watermark.watermark = WatermarkAsset::File(path);
            }

            let backend = RustBackend::new();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_job_event(&event);
                }
            });

            let ctx = JobContext::new(&backend, settings.output_options(), watermark)
                .with_recents(&recents)
                .with_events(tx);
            let results = pipeline::process_all(&ctx, &files);
            // Dropping the context closes the channel so the printer can finish.
            drop(ctx);
            printer
                .join()
                .map_err(|_| "output thread panicked".to_string())?;

            if settings.notification {
                println!();
                println!("{}", output::format_summary(&results));
            }
            if results.iter().any(|r| r.is_err()) {
                std::process::exit(1);
            }
        }
        Command::Plan { file } => {
            let settings = config::load_settings(&cli.config)?;
            let plan = planner::plan(&file, &settings.output_options())?;
            println!("{}", plan.full_path.display());
            if settings.output_options().needs_staging() {
                println!("staged via {}", pipeline::staging_path(&plan.full_path).display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
