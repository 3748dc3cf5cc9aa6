//! In-memory model of a decoded EXIF block.

use std::collections::BTreeMap;
use std::fmt;

use kamadak_exif::{Context, Field, In, Tag};
use serde::Serialize;

/// One of the image file directories an EXIF block can carry.
///
/// Only `Primary` is mandatory once any other directory is present,
/// because the Exif and GPS directories are reachable only through
/// pointer tags stored in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Ifd {
    /// IFD0, the main image.
    Primary,
    /// Camera settings, reached through `ExifTag` (0x8769).
    Exif,
    /// Location data, reached through `GPSTag` (0x8825).
    Gps,
    /// Interoperability directory, reached from the Exif directory (0xA005).
    Interop,
    /// IFD1, the embedded thumbnail.
    Thumbnail,
}

impl Ifd {
    pub const ALL: [Ifd; 5] = [
        Ifd::Primary,
        Ifd::Exif,
        Ifd::Gps,
        Ifd::Interop,
        Ifd::Thumbnail,
    ];

    /// Short name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Ifd::Primary => "0th",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
            Ifd::Thumbnail => "1st",
        }
    }

    /// Directory a decoded field lives in. Fields of a third or later
    /// image, or sub-directories of the thumbnail, have no place here.
    pub fn of(tag: Tag, ifd_num: In) -> Option<Ifd> {
        match (tag.context(), ifd_num) {
            (Context::Tiff, In::PRIMARY) => Some(Ifd::Primary),
            (Context::Tiff, In::THUMBNAIL) => Some(Ifd::Thumbnail),
            (Context::Exif, In::PRIMARY) => Some(Ifd::Exif),
            (Context::Gps, In::PRIMARY) => Some(Ifd::Gps),
            (Context::Interop, In::PRIMARY) => Some(Ifd::Interop),
            _ => None,
        }
    }

    /// The tag context and image number a field in this directory carries.
    pub fn placement(&self) -> (Context, In) {
        match self {
            Ifd::Primary => (Context::Tiff, In::PRIMARY),
            Ifd::Exif => (Context::Exif, In::PRIMARY),
            Ifd::Gps => (Context::Gps, In::PRIMARY),
            Ifd::Interop => (Context::Interop, In::PRIMARY),
            Ifd::Thumbnail => (Context::Tiff, In::THUMBNAIL),
        }
    }

    /// Build a field for tag id `tag` in this directory.
    pub fn field(&self, tag: u16, value: kamadak_exif::Value) -> Field {
        let (context, ifd_num) = self.placement();
        Field {
            tag: Tag(context, tag),
            ifd_num,
            value,
        }
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    pub fn from_little_endian(little_endian: bool) -> Self {
        if little_endian {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    pub fn is_little_endian(&self) -> bool {
        *self == ByteOrder::LittleEndian
    }
}

/// The fields of one directory, keyed by tag id. Ids are unique and
/// iterate in ascending order.
#[derive(Debug, Clone, Default)]
pub struct Directory(BTreeMap<u16, Field>);

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `field` under its tag id, returning the field it replaces.
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        self.0.insert(field.tag.number(), field)
    }

    pub fn get(&self, tag: u16) -> Option<&Field> {
        self.0.get(&tag)
    }

    pub fn remove(&mut self, tag: u16) -> Option<Field> {
        self.0.remove(&tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Field)> {
        self.0.iter().map(|(tag, field)| (*tag, field))
    }
}

/// A decoded EXIF block: its byte order, the directories it carries, and
/// the JPEG streams `JPEGInterchangeFormat` points at (normally only the
/// IFD1 thumbnail).
#[derive(Debug, Clone)]
pub struct TagDirectory {
    pub byte_order: ByteOrder,
    pub ifds: BTreeMap<Ifd, Directory>,
    pub jpeg: BTreeMap<Ifd, Vec<u8>>,
}

impl TagDirectory {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ifds: BTreeMap::new(),
            jpeg: BTreeMap::new(),
        }
    }

    pub fn get(&self, ifd: Ifd) -> Option<&Directory> {
        self.ifds.get(&ifd)
    }

    /// Directory for `ifd`, created empty if absent.
    pub fn ifd_mut(&mut self, ifd: Ifd) -> &mut Directory {
        self.ifds.entry(ifd).or_default()
    }

    /// The IFD1 thumbnail, if any.
    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.jpeg.get(&Ifd::Thumbnail).map(Vec::as_slice)
    }

    /// Total number of fields across all directories.
    pub fn entry_count(&self) -> usize {
        self.ifds.values().map(Directory::len).sum()
    }

    /// True when no directory holds a field and no JPEG stream is carried.
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0 && self.jpeg.is_empty()
    }

    /// Every field, directory by directory.
    pub fn entries(&self) -> impl Iterator<Item = (Ifd, u16, &Field)> {
        self.ifds
            .iter()
            .flat_map(|(ifd, dir)| dir.iter().map(move |(tag, field)| (*ifd, tag, field)))
    }
}
