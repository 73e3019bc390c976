use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use image_caption_rust::{OutputKind, RenderConfig};

#[derive(Parser, Debug)]
#[command(
    name = "image-caption-rust",
    version,
    about = "Overlay a caption on an image and return it as PNG or PDF"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload form and the /process endpoint
    Serve {
        /// Listen address (default: [server] addr from settings)
        #[arg(short = 'a', long = "addr")]
        addr: Option<String>,
    },
    /// Caption a single image file
    Render {
        /// Input image
        #[arg(short = 'i', long = "image")]
        image: PathBuf,

        /// Caption text
        #[arg(short = 't', long = "text")]
        text: String,

        /// Output type
        #[arg(short = 'o', long = "output-type", value_enum, default_value_t = OutputType::Image)]
        output_type: OutputType,

        /// Output path (default: next to the input, <stem>.png or <stem>.pdf)
        #[arg(long = "out")]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputType {
    Image,
    Pdf,
}

impl From<OutputType> for OutputKind {
    fn from(value: OutputType) -> Self {
        match value {
            OutputType::Image => OutputKind::Image,
            OutputType::Pdf => OutputKind::Pdf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    image_caption_rust::logging::init(cli.verbose)?;

    match cli.command {
        Command::Serve { addr } => {
            let settings =
                image_caption_rust::settings::load_settings(cli.read_settings.as_deref())?;
            image_caption_rust::server::run_server(settings, addr).await
        }
        Command::Render {
            image,
            text,
            output_type,
            out,
        } => {
            let config = RenderConfig {
                image,
                text,
                output_kind: output_type.into(),
                out_path: out,
                settings_path: cli.read_settings,
            };
            let path = tokio::task::spawn_blocking(move || image_caption_rust::run_render(config))
                .await??;
            println!("{}", path.display());
            Ok(())
        }
    }
}
