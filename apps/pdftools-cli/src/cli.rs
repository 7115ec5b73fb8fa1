use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Merge, split, organize, rotate, watermark, sign, compress and convert PDFs.
#[derive(Debug, Parser)]
#[command(name = "pdftools", about, version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory the results are written to
    #[arg(long, global = true, default_value = ".")]
    pub out_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// One subcommand per utility page.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Combine PDFs into merged.pdf, in the order given
    Merge {
        /// Two or more PDF files
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Write every page to its own page-N.pdf
    Split {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Reorder and delete pages, writing organized.pdf
    ///
    /// Edits are applied in the order they appear on the command line and use
    /// 0-based positions in the current page list.
    Organize {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Move the page at FROM to position TO
        #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
        moves: Vec<PageEdit>,

        /// Delete the page at position N
        #[arg(long = "delete", value_name = "N", value_parser = parse_delete)]
        deletes: Vec<PageEdit>,
    },

    /// Set every page to the same rotation
    Rotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// 0, 90, 180 or 270
        #[arg(long, default_value_t = 90)]
        degrees: i64,
    },

    /// Stamp text across every page
    Watermark {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long)]
        text: String,

        /// Fill opacity between 0 and 1
        #[arg(long, default_value_t = 0.3)]
        opacity: f32,

        #[arg(long, default_value_t = 48.0)]
        font_size: f32,

        /// Counter-clockwise rotation of the text
        #[arg(long, default_value_t = 45.0)]
        rotation: f32,

        #[arg(long, value_enum, default_value_t = PositionArg::Center)]
        position: PositionArg,
    },

    /// Place a PNG signature in the bottom-right corner of a page
    Sign {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// PNG image of the signature
        #[arg(long)]
        signature: PathBuf,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Drawn width in points
        #[arg(long, default_value_t = 150.0)]
        width: f32,
    },

    /// Re-save with unused objects dropped and streams compressed
    Compress {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// One page per PNG or JPEG image, written to converted-images.pdf
    ImagesToPdf {
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,
    },

    /// Render every page to page-N.png or page-N.jpeg
    PdfToImages {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = FormatArg::Png)]
        format: FormatArg,

        /// 1.0 renders at 72 dpi
        #[arg(long, default_value_t = 2.0)]
        scale: f32,

        /// JPEG quality between 0 and 1
        #[arg(long, default_value_t = 0.95)]
        quality: f32,
    },

    /// Convert a spreadsheet to PDF through the conversion service
    ExcelToPdf {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Post to a running pdftools-server instead of calling the service
        /// directly with CLOUDCONVERT_API_KEY
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
    },
}

/// A single organize edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEdit {
    Move { from: usize, to: usize },
    Delete(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    Center,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Png,
    Jpeg,
}

fn parse_move(value: &str) -> Result<PageEdit, String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{}'", value))?;
    let from = from
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a page position", from))?;
    let to = to
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a page position", to))?;
    Ok(PageEdit::Move { from, to })
}

fn parse_delete(value: &str) -> Result<PageEdit, String> {
    value
        .trim()
        .parse()
        .map(PageEdit::Delete)
        .map_err(|_| format!("'{}' is not a page position", value))
}
