//! pdftools command line
//!
//! Every subcommand is one utility page: it reads its inputs from disk, runs
//! the workflow from `pdftools-core` and hands the results to a
//! [`DirectorySink`](pdftools_core::DirectorySink) rooted at `--out-dir`.

mod cli;
mod commands;

use clap::{CommandFactory, FromArgMatches};
use cli::{Cli, Commands};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let out_dir = cli.out_dir;
    match cli.command {
        Commands::Merge { files } => commands::merge(&files, &out_dir),
        Commands::Split { file } => commands::split(&file, &out_dir).await,
        Commands::Organize { file, .. } => {
            // Moves and deletes are separate flags; their relative order
            // comes from the raw matches
            let edits = matches
                .subcommand_matches("organize")
                .map(commands::ordered_edits)
                .unwrap_or_default();
            commands::organize(&file, &edits, &out_dir)
        }
        Commands::Rotate { file, degrees } => commands::rotate(&file, degrees, &out_dir),
        Commands::Watermark {
            file,
            text,
            opacity,
            font_size,
            rotation,
            position,
        } => commands::watermark(
            &file,
            commands::watermark_options(text, opacity, font_size, rotation, position),
            &out_dir,
        ),
        Commands::Sign {
            file,
            signature,
            page,
            width,
        } => commands::sign(&file, &signature, page, width, &out_dir),
        Commands::Compress { file } => commands::compress(&file, &out_dir),
        Commands::ImagesToPdf { images } => commands::convert_images(&images, &out_dir),
        Commands::PdfToImages {
            file,
            format,
            scale,
            quality,
        } => commands::pdf_to_images(&file, format, scale, quality, &out_dir).await,
        Commands::ExcelToPdf { file, endpoint } => {
            commands::excel_to_pdf(&file, endpoint.as_deref(), &out_dir).await
        }
    }
}
