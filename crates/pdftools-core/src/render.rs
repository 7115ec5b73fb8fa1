//! Page rasterization
//!
//! Rendering is delegated to an external renderer. The renderer is loaded
//! lazily through a [`RendererHandle`] owned by whichever workflow needs it;
//! the first call loads it and later calls reuse the same instance.

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::naming;
use crate::sink::{deliver_paced, Deliverable, TransferSink};
use once_cell::sync::OnceCell;
use std::io::Write;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(ToolboxError::UnsupportedFormat(format!(
                "Image format '{}' (expected png or jpeg)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// 1.0 renders at 72 dpi
    pub scale: f32,
    pub format: ImageFormat,
    /// 0.0..=1.0, used for JPEG only
    pub jpeg_quality: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            format: ImageFormat::Png,
            jpeg_quality: 0.95,
        }
    }
}

impl RenderOptions {
    /// Small PNG thumbnails for the organize view
    pub fn preview() -> Self {
        Self {
            scale: 0.5,
            ..Self::default()
        }
    }
}

/// Rasterizes a single page of a serialized PDF
pub trait PageRenderer: Send + Sync {
    /// `page_index` is 0-based
    fn render_page(&self, pdf: &[u8], page_index: usize, options: &RenderOptions)
        -> Result<Vec<u8>>;
}

/// Produces a renderer on first use
pub trait RendererLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn PageRenderer>>;
}

/// Load-once handle to a renderer
pub struct RendererHandle {
    loader: Box<dyn RendererLoader>,
    renderer: OnceCell<Box<dyn PageRenderer>>,
}

impl RendererHandle {
    pub fn new(loader: impl RendererLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            renderer: OnceCell::new(),
        }
    }

    /// Handle backed by the system `pdftoppm`
    pub fn pdftoppm() -> Self {
        Self::new(PdftoppmLoader::default())
    }

    /// The renderer, loading it on first access. A failed load is not
    /// cached; the next call tries again.
    pub fn renderer(&self) -> Result<&dyn PageRenderer> {
        self.renderer
            .get_or_try_init(|| {
                debug!("Loading page renderer");
                self.loader.load()
            })
            .map(|r| r.as_ref())
    }

    pub fn is_loaded(&self) -> bool {
        self.renderer.get().is_some()
    }
}

/// Locates Poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmLoader {
    pub program: String,
}

impl Default for PdftoppmLoader {
    fn default() -> Self {
        Self {
            program: "pdftoppm".into(),
        }
    }
}

impl RendererLoader for PdftoppmLoader {
    fn load(&self) -> Result<Box<dyn PageRenderer>> {
        let probe = Command::new(&self.program).arg("-v").output();
        match probe {
            Ok(_) => Ok(Box::new(PdftoppmRenderer {
                program: self.program.clone(),
            })),
            Err(e) => Err(ToolboxError::LocalProcessingFailed(format!(
                "Page renderer '{}' is not available: {}",
                self.program, e
            ))),
        }
    }
}

pub struct PdftoppmRenderer {
    program: String,
}

impl PageRenderer for PdftoppmRenderer {
    fn render_page(
        &self,
        pdf: &[u8],
        page_index: usize,
        options: &RenderOptions,
    ) -> Result<Vec<u8>> {
        let workdir = tempfile::Builder::new().prefix("pdftools-render").tempdir()?;
        let input_path = workdir.path().join("input.pdf");
        let mut input = std::fs::File::create(&input_path)?;
        input.write_all(pdf)?;
        input.flush()?;

        let page = (page_index + 1).to_string();
        let dpi = ((72.0 * options.scale).round() as u32).max(1).to_string();
        let out_prefix = workdir.path().join("page");

        let mut command = Command::new(&self.program);
        command
            .args(["-f", &page, "-l", &page, "-r", &dpi, "-singlefile"]);
        let out_ext = match options.format {
            ImageFormat::Png => {
                command.arg("-png");
                "png"
            }
            ImageFormat::Jpeg => {
                let quality = (options.jpeg_quality.clamp(0.0, 1.0) * 100.0).round() as u32;
                command
                    .arg("-jpeg")
                    .arg("-jpegopt")
                    .arg(format!("quality={}", quality));
                "jpg"
            }
        };
        command.arg(&input_path).arg(&out_prefix);

        let output = command.output()?;
        if !output.status.success() {
            return Err(ToolboxError::LocalProcessingFailed(format!(
                "Rendering page {} failed: {}",
                page,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(std::fs::read(out_prefix.with_extension(out_ext))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub render: RenderOptions,
    /// Pause between successive transfers
    pub pause: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            pause: Duration::from_millis(300),
        }
    }
}

/// PDF to images workflow. Owns its renderer handle.
pub struct PdfToImages {
    renderer: RendererHandle,
}

impl PdfToImages {
    pub fn new(renderer: RendererHandle) -> Self {
        Self { renderer }
    }

    /// Render every page as `page-{n}.{ext}`, in page order
    pub fn render_all(
        &self,
        source: &mut DocumentHandle,
        options: &RenderOptions,
    ) -> Result<Vec<Deliverable>> {
        if source.page_count() == 0 {
            return Err(ToolboxError::MissingInput("The document has no pages".into()));
        }
        let renderer = self.renderer.renderer()?;
        let pdf = source.to_bytes()?;

        (0..source.page_count())
            .map(|index| {
                let image = renderer.render_page(&pdf, index, options)?;
                debug!("Rendered page {} ({} bytes)", index + 1, image.len());
                Ok(Deliverable {
                    bytes: image,
                    filename: naming::page_image(index + 1, options.format.extension()),
                    mime: options.format.mime().to_string(),
                })
            })
            .collect()
    }

    pub async fn export(
        &self,
        source: &mut DocumentHandle,
        sink: &mut dyn TransferSink,
        options: ExportOptions,
    ) -> Result<usize> {
        let images = self.render_all(source, &options.render)?;
        deliver_paced(sink, &images, options.pause).await?;
        info!("Exported {} page images", images.len());
        Ok(images.len())
    }
}
