//! Rotate every page to an absolute angle

use crate::document::DocumentHandle;
use crate::error::{Result, ToolboxError};
use crate::naming;
use crate::sink::Deliverable;
use lopdf::Object;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Half,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::Clockwise270 => 270,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = ToolboxError;

    fn try_from(degrees: i64) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Clockwise90),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::Clockwise270),
            other => Err(ToolboxError::InvalidRange(format!(
                "Rotation must be 0, 90, 180 or 270 degrees, got {}",
                other
            ))),
        }
    }
}

/// Set `/Rotate` on every page. The value replaces any earlier rotation,
/// including one inherited from the page tree.
pub fn rotate_all(handle: &mut DocumentHandle, rotation: Rotation) -> Result<()> {
    let page_ids = handle.page_ids().to_vec();
    let doc = handle.document_mut();
    for page_id in page_ids {
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Rotate", Object::Integer(rotation.degrees() as i64));
    }
    Ok(())
}

/// Rotate and serialize as `rotated-{deg}-degrees.pdf`
pub fn rotate_document(pdf: &[u8], rotation: Rotation) -> Result<Deliverable> {
    let mut handle = DocumentHandle::open(pdf)?;
    rotate_all(&mut handle, rotation)?;
    info!(
        "Rotated {} pages to {} degrees",
        handle.page_count(),
        rotation.degrees()
    );
    Ok(Deliverable::pdf(
        handle.to_bytes()?,
        naming::rotated(rotation.degrees()),
    ))
}
