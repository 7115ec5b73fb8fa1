//! Image embedding and the images-to-PDF workflow
//!
//! PNG data is decoded and re-encoded as Flate-compressed samples, with an
//! `SMask` carrying the alpha channel when there is one. JPEG data is
//! embedded untouched as `DCTDecode`; only its headers are decoded.

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::input::{ImageKind, InputFile};
use crate::naming;
use crate::page_content::{add_resource, append_content};
use crate::sink::Deliverable;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use tracing::{debug, info, warn};

/// An image XObject added to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    /// Height for a given drawn width, keeping the aspect ratio
    pub fn scaled_height(&self, width: f32) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        width * self.height as f32 / self.width as f32
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(filter.as_bytes().to_vec())),
    ])
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn png_error(e: png::DecodingError) -> ToolboxError {
    ToolboxError::LocalProcessingFailed(format!("Invalid PNG image: {}", e))
}

/// Decode a PNG and add it as an image XObject
pub fn embed_png(doc: &mut Document, data: &[u8]) -> Result<EmbeddedImage> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(png_error)?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buffer).map_err(png_error)?;
    let pixels = &buffer[..frame.buffer_size()];

    let (channels, color_space, has_alpha) = match frame.color_type {
        png::ColorType::Grayscale => (1, "DeviceGray", false),
        png::ColorType::GrayscaleAlpha => (2, "DeviceGray", true),
        png::ColorType::Rgb => (3, "DeviceRGB", false),
        png::ColorType::Rgba => (4, "DeviceRGB", true),
        png::ColorType::Indexed => {
            return Err(ToolboxError::LocalProcessingFailed(
                "Indexed PNG was not expanded".into(),
            ))
        }
    };

    let (color, alpha) = if has_alpha {
        let color_channels = channels - 1;
        let mut color = Vec::with_capacity(pixels.len() / channels * color_channels);
        let mut alpha = Vec::with_capacity(pixels.len() / channels);
        for pixel in pixels.chunks_exact(channels) {
            color.extend_from_slice(&pixel[..color_channels]);
            alpha.push(pixel[color_channels]);
        }
        (color, Some(alpha))
    } else {
        (pixels.to_vec(), None)
    };

    let (width, height) = (frame.width, frame.height);
    let mut dict = image_dict(width, height, color_space, "FlateDecode");
    if let Some(alpha) = alpha {
        let mask = Stream::new(
            image_dict(width, height, "DeviceGray", "FlateDecode"),
            deflate(&alpha)?,
        )
        .with_compression(false);
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }

    let stream = Stream::new(dict, deflate(&color)?).with_compression(false);
    let id = doc.add_object(stream);
    debug!("Embedded {}x{} PNG ({})", width, height, color_space);
    Ok(EmbeddedImage { id, width, height })
}

fn jpeg_error(e: impl std::fmt::Display) -> ToolboxError {
    ToolboxError::LocalProcessingFailed(format!("Invalid JPEG image: {}", e))
}

/// Add JPEG data as a `DCTDecode` image XObject
///
/// Only the headers are decoded, for the dimensions and colour space; the
/// compressed data is embedded as is.
pub fn embed_jpeg(doc: &mut Document, data: &[u8]) -> Result<EmbeddedImage> {
    let decoder = image::ImageReader::with_format(Cursor::new(data), image::ImageFormat::Jpeg)
        .into_decoder()
        .map_err(jpeg_error)?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 | ExtendedColorType::L16 => "DeviceGray",
        ExtendedColorType::Cmyk8 => "DeviceCMYK",
        _ => "DeviceRGB",
    };

    let stream = Stream::new(
        image_dict(width, height, color_space, "DCTDecode"),
        data.to_vec(),
    )
    .with_compression(false);
    let id = doc.add_object(stream);
    debug!("Embedded {}x{} JPEG ({})", width, height, color_space);
    Ok(EmbeddedImage { id, width, height })
}

pub fn embed_image(doc: &mut Document, kind: ImageKind, data: &[u8]) -> Result<EmbeddedImage> {
    match kind {
        ImageKind::Png => embed_png(doc, data),
        ImageKind::Jpeg => embed_jpeg(doc, data),
    }
}

/// Content that paints `name` into the rectangle at (x, y)
pub(crate) fn draw_image_content(name: &str, x: f32, y: f32, width: f32, height: f32) -> Vec<u8> {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
        width, height, x, y, name
    )
    .into_bytes()
}

/// Result of converting images, with the names of inputs that were skipped
#[derive(Debug)]
pub struct ImagesToPdf {
    pub output: Deliverable,
    pub skipped: Vec<String>,
}

/// One page per image, each sized to the image's pixel dimensions, in
/// input order. Files that are not PNG or JPEG are skipped and reported.
pub fn images_to_pdf(files: &[InputFile]) -> Result<ImagesToPdf> {
    let mut accepted = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for file in files {
        match file.image_kind() {
            Some(kind) => accepted.push((kind, file)),
            None => {
                warn!("Skipping {}: not a PNG or JPEG image", file.name);
                skipped.push(file.name.clone());
            }
        }
    }
    if accepted.is_empty() {
        return Err(ToolboxError::MissingInput(
            "Select at least one PNG or JPEG image".into(),
        ));
    }

    let mut handle = DocumentHandle::empty();
    for (kind, file) in accepted {
        let image = embed_image(handle.document_mut(), kind, &file.bytes)?;
        let (width, height) = (image.width as f32, image.height as f32);

        let page = Dictionary::from_iter(vec![(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ]),
        )]);
        let page_id = handle.append_page(page)?;

        let doc = handle.document_mut();
        let name = add_resource(doc, page_id, "XObject", "Im", Object::Reference(image.id))?;
        append_content(doc, page_id, draw_image_content(&name, 0.0, 0.0, width, height))?;
        debug!("Added page for {}", file.name);
    }

    info!(
        "Converted {} images to PDF ({} skipped)",
        handle.page_count(),
        skipped.len()
    );
    Ok(ImagesToPdf {
        output: Deliverable::pdf(handle.to_bytes()?, naming::CONVERTED_IMAGES),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_test_jpeg, create_test_png};
    use flate2::read::ZlibDecoder;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    #[test]
    fn test_jpeg_is_embedded_untouched() {
        let jpeg = create_test_jpeg(64, 48, false);
        let mut doc = Document::with_version("1.7");
        let image = embed_jpeg(&mut doc, &jpeg).unwrap();
        assert_eq!((image.width, image.height), (64, 48));

        let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content, jpeg);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }

    #[test]
    fn test_grayscale_jpeg_uses_device_gray() {
        let mut doc = Document::with_version("1.7");
        let image = embed_jpeg(&mut doc, &create_test_jpeg(16, 16, true)).unwrap();
        let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_jpeg_without_frame_is_rejected() {
        let mut doc = Document::with_version("1.7");
        for data in [&[0xFF, 0xD8, 0xFF, 0xD9][..], b"not a jpeg"] {
            assert!(matches!(
                embed_jpeg(&mut doc, data),
                Err(ToolboxError::LocalProcessingFailed(_))
            ));
        }
    }

    #[test]
    fn test_png_with_alpha_gets_soft_mask() {
        let mut doc = Document::with_version("1.7");
        let image = embed_png(&mut doc, &create_test_png(4, 2, true)).unwrap();
        assert_eq!((image.width, image.height), (4, 2));

        let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_ok());
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
    }

    #[test]
    fn test_opaque_png_has_no_mask() {
        let mut doc = Document::with_version("1.7");
        let image = embed_png(&mut doc, &create_test_png(3, 3, false)).unwrap();
        let stream = doc.get_object(image.id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"SMask").is_err());

        // Image streams are not decoded by lopdf, so inflate by hand
        let mut samples = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut samples)
            .unwrap();
        assert_eq!(samples.len(), 3 * 3 * 3);
    }

    #[test]
    fn test_corrupt_png_is_local_failure() {
        let mut doc = Document::with_version("1.7");
        let result = embed_png(&mut doc, b"\x89PNG\r\n\x1a\n garbage");
        assert!(matches!(result, Err(ToolboxError::LocalProcessingFailed(_))));
    }

    #[test]
    fn test_scaled_height_keeps_aspect() {
        let image = EmbeddedImage {
            id: (1, 0),
            width: 300,
            height: 100,
        };
        assert_eq!(image.scaled_height(150.0), 50.0);
    }

    #[test]
    fn test_images_to_pdf_one_page_per_image_in_order() {
        let files = vec![
            InputFile::new("a.png", Some("image/png"), create_test_png(200, 100, false)),
            InputFile::new("notes.txt", Some("text/plain"), b"hello".to_vec()),
            InputFile::new("b.jpg", None, create_test_jpeg(50, 80, false)),
        ];

        let result = images_to_pdf(&files).unwrap();

        assert_eq!(result.output.filename, "converted-images.pdf");
        assert_eq!(result.skipped, vec!["notes.txt".to_string()]);
        let handle = DocumentHandle::open(&result.output.bytes).unwrap();
        assert_eq!(handle.page_count(), 2);
        assert_eq!(handle.page_size(0).unwrap(), (200.0, 100.0));
        assert_eq!(handle.page_size(1).unwrap(), (50.0, 80.0));
    }

    #[test]
    fn test_images_to_pdf_without_images_is_missing_input() {
        let files = vec![InputFile::new("doc.pdf", None, vec![])];
        assert!(matches!(
            images_to_pdf(&files),
            Err(ToolboxError::MissingInput(_))
        ));
    }
}
