//! Subcommand implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use pdftools_core::conversion::{
    CloudConvertProvider, ConversionAdapter, ConversionConfig, ConversionRequest, ConversionState,
    EndpointClient,
};
use pdftools_core::render::ExportOptions;
use pdftools_core::{
    compress_document, deliver, format_file_size, images_to_pdf, merge_files, rotate_document,
    sign_document, split_and_deliver, watermark_document, Deliverable, DirectorySink,
    DocumentHandle, ImageFormat, ImageKind, InputFile, OrganizeSession, PdfToImages, RenderOptions,
    RendererHandle, Rotation, SignatureOptions, SplitOptions, WatermarkOptions,
    WatermarkPosition,
};
use tracing::{info, warn};

use crate::cli::{FormatArg, PageEdit, PositionArg};

fn read_input(path: &Path) -> Result<InputFile> {
    Ok(InputFile::from_path(path)?)
}

fn write_output(out_dir: &Path, output: &Deliverable) -> Result<()> {
    let mut sink = DirectorySink::new(out_dir);
    deliver(&mut sink, output)
        .with_context(|| format!("writing {} to {}", output.filename, out_dir.display()))?;
    println!("{}", out_dir.join(&output.filename).display());
    Ok(())
}

pub fn merge(files: &[PathBuf], out_dir: &Path) -> Result<()> {
    let inputs = files
        .iter()
        .map(|p| read_input(p))
        .collect::<Result<Vec<_>>>()?;
    let merged = merge_files(&inputs)?;
    write_output(out_dir, &merged)
}

pub async fn split(file: &Path, out_dir: &Path) -> Result<()> {
    let input = read_input(file)?;
    input.require_pdf()?;
    let source = DocumentHandle::open(&input.bytes)?;

    let mut sink = DirectorySink::new(out_dir);
    let count = split_and_deliver(&source, &mut sink, SplitOptions::default()).await?;
    println!("Wrote {} pages to {}", count, out_dir.display());
    Ok(())
}

/// Moves and deletes of the `organize` subcommand, in command-line order
pub fn ordered_edits(matches: &ArgMatches) -> Vec<PageEdit> {
    let mut edits: Vec<(usize, PageEdit)> = Vec::new();
    for id in ["moves", "deletes"] {
        if let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<PageEdit>(id))
        {
            edits.extend(indices.zip(values.copied()));
        }
    }
    edits.sort_by_key(|(index, _)| *index);
    edits.into_iter().map(|(_, edit)| edit).collect()
}

pub fn organize(file: &Path, edits: &[PageEdit], out_dir: &Path) -> Result<()> {
    let mut session = OrganizeSession::new();
    let pages = session.load(&read_input(file)?)?;
    info!("{} has {} pages", file.display(), pages);

    for edit in edits {
        match *edit {
            PageEdit::Move { from, to } => session.move_page(from, to)?,
            PageEdit::Delete(index) => session.delete_page(index)?,
        }
    }

    // Report as 1-based original page numbers
    let order = session
        .manifest()
        .source_order()
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Page order: {}", order);

    write_output(out_dir, &session.save()?)
}

pub fn rotate(file: &Path, degrees: i64, out_dir: &Path) -> Result<()> {
    let rotation = Rotation::try_from(degrees)?;
    let input = read_input(file)?;
    input.require_pdf()?;
    write_output(out_dir, &rotate_document(&input.bytes, rotation)?)
}

pub fn watermark_options(
    text: String,
    opacity: f32,
    font_size: f32,
    rotation: f32,
    position: PositionArg,
) -> WatermarkOptions {
    WatermarkOptions {
        text,
        opacity,
        font_size,
        rotation_degrees: rotation,
        position: match position {
            PositionArg::Center => WatermarkPosition::Center,
            PositionArg::Top => WatermarkPosition::Top,
            PositionArg::Bottom => WatermarkPosition::Bottom,
        },
    }
}

pub fn watermark(file: &Path, options: WatermarkOptions, out_dir: &Path) -> Result<()> {
    let input = read_input(file)?;
    input.require_pdf()?;
    write_output(out_dir, &watermark_document(&input.bytes, &options)?)
}

pub fn sign(
    file: &Path,
    signature: &Path,
    page: usize,
    width: f32,
    out_dir: &Path,
) -> Result<()> {
    let input = read_input(file)?;
    input.require_pdf()?;
    let image = read_input(signature)?;
    if image.image_kind() != Some(ImageKind::Png) {
        bail!("The signature must be a PNG image");
    }

    let options = SignatureOptions {
        page_number: page,
        width,
    };
    write_output(out_dir, &sign_document(&input.bytes, &image.bytes, &options)?)
}

pub fn compress(file: &Path, out_dir: &Path) -> Result<()> {
    let input = read_input(file)?;
    input.require_pdf()?;
    let (output, report) = compress_document(&input.bytes)?;

    println!(
        "Original: {}  Compressed: {}  Saved: {}%",
        format_file_size(report.original_size as u64),
        format_file_size(report.compressed_size as u64),
        report.savings_percent()
    );
    write_output(out_dir, &output)
}

pub fn convert_images(images: &[PathBuf], out_dir: &Path) -> Result<()> {
    let inputs = images
        .iter()
        .map(|p| read_input(p))
        .collect::<Result<Vec<_>>>()?;
    let converted = images_to_pdf(&inputs)?;
    for name in &converted.skipped {
        warn!("Skipped {}: only PNG and JPEG images are supported", name);
    }
    write_output(out_dir, &converted.output)
}

pub async fn pdf_to_images(
    file: &Path,
    format: FormatArg,
    scale: f32,
    quality: f32,
    out_dir: &Path,
) -> Result<()> {
    let input = read_input(file)?;
    input.require_pdf()?;
    let mut source = DocumentHandle::open(&input.bytes)?;

    let options = ExportOptions {
        render: RenderOptions {
            scale,
            format: match format {
                FormatArg::Png => ImageFormat::Png,
                FormatArg::Jpeg => ImageFormat::Jpeg,
            },
            jpeg_quality: quality,
        },
        ..ExportOptions::default()
    };

    let workflow = PdfToImages::new(RendererHandle::pdftoppm());
    let mut sink = DirectorySink::new(out_dir);
    let count = workflow.export(&mut source, &mut sink, options).await?;
    println!("Wrote {} images to {}", count, out_dir.display());
    Ok(())
}

pub async fn excel_to_pdf(file: &Path, endpoint: Option<&str>, out_dir: &Path) -> Result<()> {
    let input = read_input(file)?;
    input.require_spreadsheet()?;

    let document = match endpoint {
        Some(url) => EndpointClient::new(url).convert(&input).await?,
        None => {
            let config = ConversionConfig::default();
            let provider = CloudConvertProvider::from_env(config.clone())?;
            let adapter = ConversionAdapter::new(Arc::new(provider), config);
            let request = ConversionRequest::new(input.name.clone(), input.bytes.clone());
            adapter
                .convert_observed(&request, |state| match state {
                    ConversionState::Uploading => info!("Uploading {}", request.file_name),
                    ConversionState::Converting { attempt } => {
                        info!("Waiting for conversion (check {})", attempt)
                    }
                    _ => {}
                })
                .await?
        }
    };

    write_output(
        out_dir,
        &Deliverable::pdf(document.bytes, document.file_name),
    )
}
