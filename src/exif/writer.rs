use std::io::Cursor;

use kamadak_exif::experimental::Writer;

use super::ifd::{Ifd, TagDirectory};
use super::reader::{TAG_JPEG_LENGTH, TAG_JPEG_OFFSET};
use crate::error::{Result, SweepError};

/// Tags whose values are offsets (or byte counts of offset data) outside the
/// directory. Their targets are not part of the decoded model, so they
/// cannot be relocated.
const UNRELOCATABLE_TAGS: &[(u16, &str)] = &[
    (0x0111, "StripOffsets"),
    (0x0117, "StripByteCounts"),
    (0x0120, "FreeOffsets"),
    (0x0121, "FreeByteCounts"),
    (0x0144, "TileOffsets"),
    (0x0145, "TileByteCounts"),
    (0x014A, "SubIFDs"),
    (0x0207, "JPEGQTables"),
    (0x0208, "JPEGDCTables"),
    (0x0209, "JPEGACTables"),
];

fn encode_error(msg: impl Into<String>) -> SweepError {
    SweepError::Encode(msg.into())
}

fn is_image_directory(ifd: Ifd) -> bool {
    matches!(ifd, Ifd::Primary | Ifd::Thumbnail)
}

/// Encode a tag directory into a TIFF-structured EXIF block.
///
/// Field values are re-serialized in the directory's byte order; every
/// offset (value data, sub-IFD pointers, next-IFD link, JPEG stream) is
/// laid out afresh. A JPEG stream is written only where its directory
/// still has `JPEGInterchangeFormat`.
pub fn encode(tags: &TagDirectory) -> Result<Vec<u8>> {
    let mut writer = Writer::new();

    for (ifd, tag, field) in tags.entries() {
        if is_image_directory(ifd)
            && let Some((_, name)) = UNRELOCATABLE_TAGS.iter().find(|(t, _)| *t == tag)
        {
            return Err(encode_error(format!(
                "{name} ({tag:#06x}) in {ifd} IFD points at data outside the EXIF block"
            )));
        }
        if is_image_directory(ifd) && (tag == TAG_JPEG_OFFSET || tag == TAG_JPEG_LENGTH) {
            // Written from the stream itself below.
            continue;
        }
        writer.push_field(field);
    }

    for (&ifd, dir) in &tags.ifds {
        if !is_image_directory(ifd) || !dir.contains(TAG_JPEG_OFFSET) {
            continue;
        }
        let Some(stream) = tags.jpeg.get(&ifd) else {
            return Err(encode_error(format!(
                "JPEGInterchangeFormat kept in {ifd} IFD without its JPEG data"
            )));
        };
        let (_, ifd_num) = ifd.placement();
        writer.set_jpeg(stream, ifd_num);
    }

    let mut out = Cursor::new(Vec::new());
    writer
        .write(&mut out, tags.byte_order.is_little_endian())
        .map_err(|e| encode_error(e.to_string()))?;
    let out = out.into_inner();

    log::debug!("Encoded EXIF block: {} bytes, {} fields", out.len(), tags.entry_count());
    Ok(out)
}
