//! In-memory fixtures shared by the unit tests
//!
//! Also compiled with the `test-fixtures` feature so integration tests and
//! the apps build the same documents.

use lopdf::{Dictionary, Document, Object, Stream};

/// Build a PDF whose page N carries the marker text `{prefix}-Page-{N}`
pub fn create_test_pdf(num_pages: u32, content_prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for page_num in 0..num_pages {
        let page_id = doc.new_object_id();
        let content_id = doc.new_object_id();

        let content = format!(
            "BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET",
            content_prefix,
            page_num + 1
        );
        doc.objects.insert(
            content_id,
            Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())),
        );

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set("Contents", Object::Reference(content_id));
        doc.objects.insert(page_id, Object::Dictionary(page_dict));
        page_ids.push(Object::Reference(page_id));
    }

    // MediaBox lives on the Pages node so copies must flatten it
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(num_pages as i64));
    pages_dict.set("Kids", Object::Array(page_ids));
    pages_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// The `{prefix}-Page-{N}` marker of every page, in page order
pub fn page_markers(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap_or_default();
            marker_in(&content).unwrap_or_default()
        })
        .collect()
}

fn marker_in(content: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(content);
    text.split('(')
        .skip(1)
        .filter_map(|rest| rest.split(')').next())
        .find(|s| s.contains("-Page-"))
        .map(str::to_string)
}

/// Encode a solid-colour PNG
pub fn create_test_png(width: u32, height: u32, with_alpha: bool) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        let channels = if with_alpha {
            encoder.set_color(png::ColorType::Rgba);
            4
        } else {
            encoder.set_color(png::ColorType::Rgb);
            3
        };
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..(width * height) as usize)
            .flat_map(|_| [200u8, 30, 30, 128].into_iter().take(channels))
            .collect();
        writer.write_image_data(&data).unwrap();
    }
    buffer
}

/// Encode a solid-colour baseline JPEG
pub fn create_test_jpeg(width: u32, height: u32, grayscale: bool) -> Vec<u8> {
    let (color_type, pixel): (_, &[u8]) = if grayscale {
        (image::ExtendedColorType::L8, &[90])
    } else {
        (image::ExtendedColorType::Rgb8, &[30, 90, 200])
    };
    let data = pixel.repeat((width * height) as usize);

    let mut buffer = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 85)
        .encode(&data, width, height, color_type)
        .unwrap();
    buffer
}
