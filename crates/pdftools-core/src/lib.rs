//! PDF utility workflows
//!
//! Page-level tools built on lopdf: merge, split, organize, rotate,
//! watermark, sign, compress and image conversion, plus a client for remote
//! spreadsheet-to-PDF conversion.
//!
//! Organize, merge and split all go through [`reconstruct`]: a new document
//! assembled from pages copied out of one or more sources, in an explicit
//! order. Results leave the crate as [`Deliverable`]s handed to a
//! [`TransferSink`].

pub mod compress;
pub mod conversion;
pub mod document;
pub mod error;
pub mod images;
pub mod input;
pub mod manifest;
pub mod merge;
pub mod naming;
pub mod organize;
mod page_content;
pub mod reconstruct;
pub mod render;
pub mod rotate;
pub mod signature;
pub mod sink;
pub mod split;
pub mod watermark;

#[cfg(any(test, feature = "test-fixtures"))]
#[doc(hidden)]
pub mod testing;

pub use compress::{compress_document, format_file_size, CompressionReport};
pub use document::DocumentHandle;
pub use error::{Result, ToolboxError};
pub use images::{images_to_pdf, ImagesToPdf};
pub use input::{ImageKind, InputFile};
pub use manifest::{DragSession, ManifestEntry, PageManifest, Preview};
pub use merge::{merge_documents, merge_files};
pub use organize::OrganizeSession;
pub use reconstruct::{reconstruct, PageSelection};
pub use render::{ImageFormat, PdfToImages, RenderOptions, RendererHandle};
pub use rotate::{rotate_document, Rotation};
pub use signature::{sign_document, SignatureOptions};
pub use sink::{deliver, deliver_paced, Deliverable, DirectorySink, MemorySink, TransferSink};
pub use split::{split_and_deliver, split_pages, SplitOptions};
pub use watermark::{watermark_document, WatermarkOptions, WatermarkPosition};
