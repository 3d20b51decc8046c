use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use descramble::{
    pipeline::{PipelineBuilder, SaveFormat, WriterConfig},
    progress::ProgressConfig,
    session::{SessionToken, SESSION_TOKEN_ENV},
    utils::OutputFormat,
    viewer::fakku::{pipeline::Pipeline, source::DirectorySource},
};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Descramble tiled manga pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More logging, repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Descramble a saved reader response (api.json and page images)
    Response {
        /// Directory of the saved response
        dir: PathBuf,

        /// Output directory or archive path
        #[arg(short, long)]
        output: PathBuf,

        /// Session token (fakku_zid cookie)
        #[arg(long, env = SESSION_TOKEN_ENV, hide_env_values = true)]
        zid: Option<String>,

        /// Image format
        #[arg(short, long, default_value = "png")]
        format: ImageFormat,

        /// Quality for lossy formats
        #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// How to save the pages
        #[arg(short, long, default_value = "raw")]
        save: Save,

        /// Number of pages processed at once
        #[arg(short, long, default_value_t = num_cpus::get())]
        threads: usize,

        /// Join two-page spreads into one image
        #[arg(long)]
        join_spreads: bool,

        /// Hide progress bars
        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Save {
    Raw,
    Zip,
    Cbz,
}

impl From<Save> for SaveFormat {
    fn from(save: Save) -> Self {
        match save {
            Save::Raw => SaveFormat::Raw,
            Save::Zip | Save::Cbz => SaveFormat::Zip {
                compression_method: zip::CompressionMethod::Deflated,
            },
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "descramble=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Response {
            dir,
            output,
            zid,
            format,
            quality,
            save,
            threads,
            join_spreads,
            no_progress,
        } => {
            let progress = if no_progress {
                ProgressConfig::disabled()
            } else {
                ProgressConfig::default()
            };
            let output_format = OutputFormat::new(format.into()).with_quality(quality);

            let mut output = output;
            if let Save::Cbz = save {
                if output.extension().is_none() {
                    output.set_extension("cbz");
                }
            }

            let pipeline = Pipeline::default()
                .set_progress(progress)
                .set_num_threads(threads)
                .set_writer_config(WriterConfig::new(save.into(), output_format))
                .set_session(zid.as_deref().map(SessionToken::new))
                .set_join_spreads(join_spreads);

            let source = DirectorySource::open(&dir).await?;
            info!("Descrambling {}", source.dir().display());

            let report = pipeline.download(&source, &output).await?;
            if !report.is_complete() {
                let pages = report
                    .failures
                    .iter()
                    .map(|failure| failure.page.to_string())
                    .collect::<Vec<_>>();
                bail!("Pages could not be descrambled: {}", pages.join(", "));
            }
            info!("Done: {}", output.display());
        }
    }

    Ok(())
}
