//! EXIF block decoding, encoding, and tag naming.
//!
//! - [`decode`] parses the TIFF-structured payload of an EXIF block into a
//!   [`TagDirectory`] (IFD0, Exif, GPS, Interop, IFD1 and the thumbnail).
//! - [`encode`] serializes a [`TagDirectory`] back, laying out every offset
//!   afresh.
//! - [`TagNames`] maps `(Ifd, tag id)` to the names used in preserve lists
//!   and reports.
//!
//! Parsing and serialization are done by `kamadak-exif`; fields are carried
//! as its [`Field`] values.

mod ifd;
pub(crate) mod reader;
mod tags;
mod writer;

pub use ifd::{ByteOrder, Directory, Ifd, TagDirectory};
pub use kamadak_exif::{Field, Value};
pub use reader::decode;
pub use tags::{TagNames, UNKNOWN_TAG_NAME};
pub use writer::encode;
