//! Gray Code Structured Light Engine
//!
//! Entry point for the projmap-graycode command line tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use projmap_graycode::config::{EngineConfig, Resolution};
use projmap_graycode::export::{self, SequenceExporter};

type CliResult<T> = Result<T, projmap_graycode::Error>;

#[derive(Parser)]
#[command(name = "projmap-graycode")]
#[command(about = "Generate Gray code structured light patterns and decode captures")]
#[command(version)]
struct Cli {
    /// Engine configuration (JSON or XML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plane layout for the configured projector.
    Info,

    /// Write the pattern sequence as PNG files.
    Generate {
        /// Output directory.
        #[arg(long)]
        out: PathBuf,

        /// Projector width (overrides the configuration).
        #[arg(long)]
        width: Option<u32>,

        /// Projector height (overrides the configuration).
        #[arg(long)]
        height: Option<u32>,

        /// Skip the white/black reference images.
        #[arg(long)]
        no_reference: bool,
    },

    /// Decode a directory of captured frames.
    Decode {
        /// Directory holding white.png, black.png and plane_NN.png.
        #[arg(long)]
        frames: PathBuf,

        /// Directory for mask.png and debug.png.
        #[arg(long)]
        out: PathBuf,

        /// Projector width (overrides the configuration).
        #[arg(long)]
        width: Option<u32>,

        /// Projector height (overrides the configuration).
        #[arg(long)]
        height: Option<u32>,

        /// Global threshold used without a reference pair.
        #[arg(long)]
        threshold: Option<u8>,

        /// Minimum bright/dark contrast.
        #[arg(long)]
        min_contrast: Option<u8>,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            let encoder = config.encoder()?;
            let layout = encoder.config();
            println!(
                "projector {}x{}: {} column planes, {} row planes, {} frames ({} with reference)",
                layout.projector_width(),
                layout.projector_height(),
                layout.column_planes(),
                layout.row_planes(),
                encoder.required_image_count(),
                encoder.required_image_count() + 2
            );
        }
        Commands::Generate {
            out,
            width,
            height,
            no_reference,
        } => {
            config.projector = Resolution::new(
                width.unwrap_or(config.projector.width),
                height.unwrap_or(config.projector.height),
            );
            let encoder = config.encoder()?;
            SequenceExporter::export_patterns(&encoder, &out, !no_reference)?;
        }
        Commands::Decode {
            frames,
            out,
            width,
            height,
            threshold,
            min_contrast,
        } => {
            config.projector = Resolution::new(
                width.unwrap_or(config.projector.width),
                height.unwrap_or(config.projector.height),
            );
            if let Some(threshold) = threshold {
                config.decode.threshold = threshold;
            }
            if let Some(min_contrast) = min_contrast {
                config.decode.min_contrast = min_contrast;
            }

            let planes = config.encoder()?.required_image_count();
            let captured = export::load_capture(&frames, planes)?;

            // The captures define the camera resolution.
            if let Some(first) = captured.first() {
                let (w, h) = first.dimensions();
                if config.camera != Resolution::new(w, h) {
                    log::warn!(
                        "Configured camera {}x{} differs from captured {}x{}, using captures",
                        config.camera.width,
                        config.camera.height,
                        w,
                        h
                    );
                    config.camera = Resolution::new(w, h);
                }
            }

            let mut decoder = config.decoder()?;
            let result = decoder.decode(&captured, &config.decode)?;
            SequenceExporter::export_decode(result, &out)?;

            println!("{}", serde_json::to_string_pretty(&result.stats())?);
        }
    }

    Ok(())
}
