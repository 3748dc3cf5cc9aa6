use kamadak_exif::{Field, Reader, Tag};

use super::ifd::{ByteOrder, Directory, Ifd, TagDirectory};
use crate::error::{Result, SweepError};

// JPEG stream location, in IFD0 or IFD1.
pub(crate) const TAG_JPEG_OFFSET: u16 = 0x0201;
pub(crate) const TAG_JPEG_LENGTH: u16 = 0x0202;

/// Structural tags: consumed while decoding, regenerated while encoding.
fn is_pointer(tag: Tag) -> bool {
    tag == Tag::ExifIFDPointer || tag == Tag::GPSInfoIFDPointer || tag == Tag::InteropIFDPointer
}

/// Decode a TIFF-structured EXIF block (the bytes after `Exif\0\0`).
///
/// Walks IFD0, the Exif, GPS and Interop sub-directories it points to,
/// and IFD1 with its thumbnail. Pointer tags are consumed; every other
/// field is kept as decoded.
pub fn decode(data: &[u8]) -> Result<TagDirectory> {
    let exif = Reader::new()
        .read_raw(data.to_vec())
        .map_err(|e| SweepError::Parse(e.to_string()))?;

    let byte_order = ByteOrder::from_little_endian(exif.little_endian());
    let mut tags = TagDirectory::new(byte_order);

    for field in exif.fields() {
        if is_pointer(field.tag) {
            continue;
        }
        let Some(ifd) = Ifd::of(field.tag, field.ifd_num) else {
            log::debug!("Skipping {} in image {}: no directory for it", field.tag, field.ifd_num);
            continue;
        };
        let dir = tags.ifd_mut(ifd);
        if dir.contains(field.tag.number()) {
            log::debug!("Duplicate tag {} in {ifd} IFD; keeping the first", field.tag);
            continue;
        }
        dir.insert(field.clone());
    }

    for ifd in [Ifd::Primary, Ifd::Thumbnail] {
        let Some(dir) = tags.ifds.get_mut(&ifd) else {
            continue;
        };
        match jpeg_stream(exif.buf(), dir) {
            Some(stream) => {
                tags.jpeg.insert(ifd, stream);
            }
            None if dir.contains(TAG_JPEG_OFFSET) || dir.contains(TAG_JPEG_LENGTH) => {
                log::debug!("JPEG offset/length in {ifd} IFD out of range; dropping the pointer");
                dir.remove(TAG_JPEG_OFFSET);
                dir.remove(TAG_JPEG_LENGTH);
            }
            None => {}
        }
    }

    log::debug!(
        "Decoded EXIF ({:?}): {} entries in {} directories",
        byte_order,
        tags.entry_count(),
        tags.ifds.len()
    );

    Ok(tags)
}

fn first_uint(field: &Field) -> Option<usize> {
    field.value.get_uint(0).map(|v| v as usize)
}

/// Bytes `JPEGInterchangeFormat` and `JPEGInterchangeFormatLength` point at.
fn jpeg_stream(buf: &[u8], dir: &Directory) -> Option<Vec<u8>> {
    let offset = first_uint(dir.get(TAG_JPEG_OFFSET)?)?;
    let len = first_uint(dir.get(TAG_JPEG_LENGTH)?)?;
    if len == 0 {
        return None;
    }
    buf.get(offset..offset.checked_add(len)?).map(<[u8]>::to_vec)
}
