use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use dctape::config::{DEFAULT_FPS, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use dctape::pipeline;
use dctape::DctapeConfig;

/// dctape — archive arbitrary files as lossless video.
#[derive(Parser)]
#[command(name = "dctape", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a video
    Encode {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Output video path (.mkv)
        #[arg(short, long)]
        output: String,

        /// Frame width (default: 3840)
        #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (default: 2160)
        #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
        height: u32,

        /// Frames per second (default: 30)
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,
    },

    /// Decode a video back into the original file
    Decode {
        /// Input video path (.mkv)
        #[arg(short, long)]
        input: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Frame width (must match encoding)
        #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
        width: u32,

        /// Frame height (must match encoding)
        #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
        height: u32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            width,
            height,
            fps,
        } => {
            let cfg = DctapeConfig {
                frame_width: width,
                frame_height: height,
                fps,
            };
            pipeline::encode::encode_file(&input, &output, &cfg)?;
        }

        Commands::Decode {
            input,
            output,
            width,
            height,
        } => {
            let cfg = DctapeConfig {
                frame_width: width,
                frame_height: height,
                ..Default::default()
            };
            pipeline::decode::decode_file(&input, &output, &cfg)?;
        }
    }

    Ok(())
}
