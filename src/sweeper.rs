use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::Result;
use crate::exif::{self, Field, Ifd, TagDirectory, TagNames};
use crate::picture::Image;

// JPEG stream pointer pair, in IFD0 or IFD1.
const TAG_JPEG_OFFSET: u16 = 0x0201;
const TAG_JPEG_LENGTH: u16 = 0x0202;

/// Rendered values longer than this are cut short in listings.
const MAX_VALUE_CHARS: usize = 64;

/// Tags that are never removed, named as in [`TagNames`] or by hex id.
///
/// Entries of the form `0x0112` (case-insensitive prefix) are read as tag
/// ids and match that id in every directory, whether or not the name
/// table knows it. Anything else is matched against resolved tag names.
///
/// ```rust
/// use exif_sweep::sweeper::PreserveSet;
///
/// let preserve = PreserveSet::new(["Orientation", "0xC0DE"]);
/// assert!(preserve.matches("Orientation", 0x0112));
/// assert!(preserve.matches("Unknown", 0xC0DE));
/// assert!(!preserve.matches("Make", 0x010F));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreserveSet {
    names: BTreeSet<String>,
    ids: BTreeSet<u16>,
}

fn parse_tag_id(s: &str) -> Option<u16> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u16::from_str_radix(hex, 16).ok()
}

impl PreserveSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            match parse_tag_id(entry) {
                Some(id) => {
                    set.ids.insert(id);
                }
                None => {
                    set.names.insert(entry.to_string());
                }
            }
        }
        set
    }

    pub fn matches(&self, name: &str, tag: u16) -> bool {
        self.names.contains(name) || self.ids.contains(&tag)
    }

    pub fn len(&self) -> usize {
        self.names.len() + self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.ids.is_empty()
    }
}

/// What the sweeper found in an image's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataState {
    /// The image carried no EXIF block.
    Absent,
    /// An EXIF block was present but could not be decoded; it was dropped.
    Unparseable,
    /// The block was decoded and filtered.
    Swept,
}

/// Per-tag outcome of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDecision {
    pub ifd: Ifd,
    pub tag: u16,
    pub name: String,
    pub kept: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripReport {
    pub metadata: MetadataState,
    pub decisions: Vec<TagDecision>,
}

impl StripReport {
    fn without_tags(metadata: MetadataState) -> Self {
        Self {
            metadata,
            decisions: Vec::new(),
        }
    }

    pub fn kept(&self) -> impl Iterator<Item = &TagDecision> {
        self.decisions.iter().filter(|d| d.kept)
    }

    pub fn removed(&self) -> impl Iterator<Item = &TagDecision> {
        self.decisions.iter().filter(|d| !d.kept)
    }
}

/// One row of [`Sweeper::describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagListing {
    pub ifd: Ifd,
    pub tag: u16,
    pub name: String,
    pub value: String,
    pub kept: bool,
}

/// Removes every EXIF entry whose name (or id) is not in the preserve-set.
///
/// The preserve-set and the name table are supplied by the caller, usually
/// through [`Config::sweeper`](crate::config::Config::sweeper).
///
/// ```rust,no_run
/// use exif_sweep::exif::TagNames;
/// use exif_sweep::picture::Image;
/// use exif_sweep::sweeper::{PreserveSet, Sweeper};
///
/// let sweeper = Sweeper::new(PreserveSet::new(["Orientation"]), TagNames::standard());
/// let image = Image::open("photo.jpg".as_ref()).unwrap();
/// let (clean, report) = sweeper.strip_metadata(&image).unwrap();
/// println!("removed {} tags", report.removed().count());
/// clean.save("clean.jpg".as_ref()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Sweeper {
    preserve: PreserveSet,
    names: TagNames,
}

impl Sweeper {
    pub fn new(preserve: PreserveSet, names: TagNames) -> Self {
        Self { preserve, names }
    }

    pub fn preserve(&self) -> &PreserveSet {
        &self.preserve
    }

    fn decide(&self, ifd: Ifd, tag: u16) -> (String, bool) {
        let name = self.names.resolve(ifd, tag);
        let kept = self.preserve.matches(name, tag);
        (name.to_string(), kept)
    }

    /// A decision for every field of `tags`, in directory order.
    ///
    /// `JPEGInterchangeFormat` and `JPEGInterchangeFormatLength` are kept
    /// or removed together: kept only when both are preserved.
    fn decisions(&self, tags: &TagDirectory) -> Vec<TagDecision> {
        let mut decisions = Vec::with_capacity(tags.entry_count());
        for (&ifd, dir) in &tags.ifds {
            let jpeg_kept = self.decide(ifd, TAG_JPEG_OFFSET).1 && self.decide(ifd, TAG_JPEG_LENGTH).1;
            for (tag, _) in dir.iter() {
                let (name, mut kept) = self.decide(ifd, tag);
                if matches!(ifd, Ifd::Primary | Ifd::Thumbnail)
                    && (tag == TAG_JPEG_OFFSET || tag == TAG_JPEG_LENGTH)
                {
                    kept = jpeg_kept;
                }
                decisions.push(TagDecision {
                    ifd,
                    tag,
                    name,
                    kept,
                });
            }
        }
        decisions
    }

    /// Split a decoded directory into the fields to keep, recording a
    /// decision for every field. A JPEG stream (normally the IFD1
    /// thumbnail) survives only with its pointer pair.
    pub fn filter(&self, tags: &TagDirectory) -> (TagDirectory, Vec<TagDecision>) {
        let decisions = self.decisions(tags);
        let mut out = TagDirectory::new(tags.byte_order);

        for (decision, (ifd, tag, field)) in decisions.iter().zip(tags.entries()) {
            let dir = out.ifd_mut(ifd);
            if decision.kept {
                log::debug!("Keeping {} ({tag:#06x}) in {ifd}", decision.name);
                dir.insert(field.clone());
            } else {
                log::debug!("Removing {} ({tag:#06x}) from {ifd}", decision.name);
            }
        }

        for (&ifd, stream) in &tags.jpeg {
            if out.get(ifd).is_some_and(|d| d.contains(TAG_JPEG_OFFSET)) {
                out.jpeg.insert(ifd, stream.clone());
            } else {
                log::debug!("Removing embedded JPEG of {ifd} IFD");
            }
        }

        (out, decisions)
    }

    /// Return a copy of `image` with all non-preserved EXIF entries removed.
    ///
    /// Missing or undecodable metadata is not an error: the image comes back
    /// with no EXIF block and the report says why. If no entry survives, the
    /// output carries no EXIF block at all.
    pub fn strip_metadata(&self, image: &Image) -> Result<(Image, StripReport)> {
        let Some(blob) = image.exif() else {
            return Ok((image.clone(), StripReport::without_tags(MetadataState::Absent)));
        };

        let tags = match exif::decode(&blob) {
            Ok(tags) => tags,
            Err(e) => {
                log::debug!("Dropping unparseable EXIF block: {e}");
                let stripped = image.with_exif(None)?;
                return Ok((stripped, StripReport::without_tags(MetadataState::Unparseable)));
            }
        };

        let (filtered, decisions) = self.filter(&tags);
        let new_blob = if filtered.is_empty() {
            None
        } else {
            Some(exif::encode(&filtered)?)
        };

        let report = StripReport {
            metadata: MetadataState::Swept,
            decisions,
        };
        log::debug!(
            "Kept {} of {} EXIF entries",
            report.kept().count(),
            report.decisions.len()
        );
        Ok((image.with_exif(new_blob)?, report))
    }

    /// List every EXIF entry with the decision [`strip_metadata`](Self::strip_metadata)
    /// would make, without modifying anything.
    pub fn describe(&self, image: &Image) -> Vec<TagListing> {
        let Some(blob) = image.exif() else {
            return Vec::new();
        };
        let tags = match exif::decode(&blob) {
            Ok(tags) => tags,
            Err(e) => {
                log::debug!("Cannot list unparseable EXIF block: {e}");
                return Vec::new();
            }
        };

        self.decisions(&tags)
            .into_iter()
            .zip(tags.entries())
            .map(|(decision, (_, _, field))| TagListing {
                ifd: decision.ifd,
                tag: decision.tag,
                name: decision.name,
                value: render_value(field),
                kept: decision.kept,
            })
            .collect()
    }
}

fn render_value(field: &Field) -> String {
    let value = field.display_value().to_string();
    if value.chars().count() <= MAX_VALUE_CHARS {
        return value;
    }
    let mut short: String = value.chars().take(MAX_VALUE_CHARS).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PRESERVE_TAGS;
    use crate::error::SweepError;
    use crate::exif::reader::tests::{THUMBNAIL, sample_block};
    use crate::exif::{ByteOrder, UNKNOWN_TAG_NAME, Value};
    use crate::picture::tests::{raster, with_exif_block};
    use image::ImageFormat;

    fn sweeper(preserve: &[&str]) -> Sweeper {
        Sweeper::new(PreserveSet::new(preserve.iter().copied()), TagNames::standard())
    }

    fn sample_jpeg(order: ByteOrder) -> Image {
        Image::from_bytes(with_exif_block(ImageFormat::Jpeg, sample_block(order))).unwrap()
    }

    fn decoded_exif(image: &Image) -> TagDirectory {
        exif::decode(&image.exif().expect("image has EXIF")).unwrap()
    }

    fn jpeg_with(tags: &TagDirectory) -> Image {
        let blob = exif::encode(tags).unwrap();
        Image::from_bytes(with_exif_block(ImageFormat::Jpeg, blob)).unwrap()
    }

    // ── PreserveSet ─────────────────────────────────────────────────

    #[test]
    fn preserve_set_parses_hex_ids() {
        let set = PreserveSet::new(["0x0112", "0XA005", " Make ", "0xZZ"]);
        assert!(set.matches("anything", 0x0112));
        assert!(set.matches("anything", 0xA005));
        assert!(set.matches("Make", 0x0000));
        assert!(set.matches("0xZZ", 0x0000));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn empty_preserve_set_matches_nothing() {
        let set = PreserveSet::default();
        assert!(set.is_empty());
        assert!(!set.matches("Orientation", 0x0112));
    }

    // ── strip_metadata ──────────────────────────────────────────────

    #[test]
    fn image_without_metadata_is_returned_unchanged() {
        let data = raster(ImageFormat::Jpeg);
        let image = Image::from_bytes(data.clone()).unwrap();
        let (out, report) = sweeper(&["Orientation"]).strip_metadata(&image).unwrap();

        assert_eq!(report.metadata, MetadataState::Absent);
        assert!(report.decisions.is_empty());
        assert_eq!(out.encode().unwrap(), data);
    }

    #[test]
    fn unparseable_metadata_is_dropped() {
        let data = with_exif_block(ImageFormat::Jpeg, b"not a tiff header".to_vec());
        let image = Image::from_bytes(data).unwrap();
        let (out, report) = sweeper(&["Orientation"]).strip_metadata(&image).unwrap();

        assert_eq!(report.metadata, MetadataState::Unparseable);
        assert!(out.exif().is_none());
        assert_eq!(out.encode().unwrap(), raster(ImageFormat::Jpeg));
    }

    #[test]
    fn removes_everything_not_preserved() {
        let image = sample_jpeg(ByteOrder::LittleEndian);
        let preserve = [
            "Orientation",
            "ExifVersion",
            "JPEGInterchangeFormat",
            "JPEGInterchangeFormatLength",
        ];
        let (out, report) = sweeper(&preserve).strip_metadata(&image).unwrap();
        assert_eq!(report.metadata, MetadataState::Swept);

        let removed: Vec<&str> = report.removed().map(|d| d.name.as_str()).collect();
        assert_eq!(removed, vec!["Make", "DateTimeOriginal", "GPSLatitudeRef"]);

        let tags = decoded_exif(&out);
        assert_eq!(tags.byte_order, ByteOrder::LittleEndian);
        assert!(!tags.get(Ifd::Primary).unwrap().contains(0x010F));
        assert!(!tags.get(Ifd::Exif).unwrap().contains(0x9003));
        assert!(tags.get(Ifd::Gps).is_none());
        assert_eq!(tags.thumbnail(), Some(&THUMBNAIL[..]));
    }

    #[test]
    fn preserved_entries_are_unchanged() {
        let value_of = |tags: &TagDirectory, ifd: Ifd, tag: u16| {
            format!("{:?}", tags.get(ifd).unwrap().get(tag).unwrap().value)
        };
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let image = sample_jpeg(order);
            let before = decoded_exif(&image);
            let (out, _) = sweeper(&["Orientation", "Make", "DateTimeOriginal"])
                .strip_metadata(&image)
                .unwrap();
            let after = decoded_exif(&out);

            for (ifd, tag) in [(Ifd::Primary, 0x0112), (Ifd::Primary, 0x010F), (Ifd::Exif, 0x9003)] {
                assert_eq!(
                    value_of(&after, ifd, tag),
                    value_of(&before, ifd, tag),
                    "{ifd} {tag:#06x} {order:?}"
                );
            }
            assert_eq!(after.entry_count(), 3);
            assert_eq!(after.byte_order, order);
        }
    }

    #[test]
    fn nothing_preserved_leaves_no_exif_block() {
        let image = sample_jpeg(ByteOrder::BigEndian);
        let (out, report) = sweeper(&[]).strip_metadata(&image).unwrap();
        assert_eq!(report.removed().count(), 7);
        assert!(out.exif().is_none());
        assert_eq!(out.dimensions(), image.dimensions());
    }

    #[test]
    fn second_sweep_removes_nothing() {
        let sweeper = sweeper(&["Orientation", "ExifVersion", "GPSLatitudeRef"]);
        let (once, first) = sweeper.strip_metadata(&sample_jpeg(ByteOrder::LittleEndian)).unwrap();
        assert!(first.removed().count() > 0);

        let reloaded = Image::from_bytes(once.encode().unwrap()).unwrap();
        let (twice, second) = sweeper.strip_metadata(&reloaded).unwrap();
        assert_eq!(second.removed().count(), 0);
        assert_eq!(second.kept().count(), 3);
        assert_eq!(twice.exif(), once.exif());
    }

    // ── embedded JPEG streams ───────────────────────────────────────

    #[test]
    fn thumbnail_removed_with_its_offset_tag() {
        let image = sample_jpeg(ByteOrder::LittleEndian);
        let (out, _) = sweeper(&["Orientation"]).strip_metadata(&image).unwrap();
        let tags = decoded_exif(&out);
        assert!(tags.thumbnail().is_none());
        assert!(tags.get(Ifd::Thumbnail).is_none());
    }

    #[test]
    fn jpeg_pointer_pair_needs_both_tags_preserved() {
        let image = sample_jpeg(ByteOrder::LittleEndian);
        let (out, report) = sweeper(&["Orientation", "JPEGInterchangeFormat"])
            .strip_metadata(&image)
            .unwrap();

        let pair: Vec<&TagDecision> =
            report.decisions.iter().filter(|d| d.ifd == Ifd::Thumbnail).collect();
        assert_eq!(pair.len(), 2);
        assert!(pair.iter().all(|d| !d.kept));
        assert!(decoded_exif(&out).thumbnail().is_none());
    }

    #[test]
    fn primary_jpeg_stream_stays_reachable_with_default_list() {
        let stream = vec![0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9];
        let mut tags = TagDirectory::new(ByteOrder::LittleEndian);
        let primary = tags.ifd_mut(Ifd::Primary);
        primary.insert(Ifd::Primary.field(0x010F, Value::Ascii(vec![b"Panasonic".to_vec()])));
        primary.insert(Ifd::Primary.field(0x0201, Value::Long(vec![0])));
        primary.insert(Ifd::Primary.field(0x0202, Value::Long(vec![0])));
        tags.jpeg.insert(Ifd::Primary, stream.clone());

        let sweeper = Sweeper::new(PreserveSet::new(DEFAULT_PRESERVE_TAGS), TagNames::standard());
        let (out, report) = sweeper.strip_metadata(&jpeg_with(&tags)).unwrap();
        assert_eq!(report.removed().count(), 1);

        let after = decoded_exif(&out);
        let primary = after.get(Ifd::Primary).unwrap();
        assert!(!primary.contains(0x010F));
        let offset = primary.get(0x0201).unwrap().value.get_uint(0).unwrap() as usize;
        let blob = out.exif().unwrap();
        assert_eq!(&blob[offset..offset + stream.len()], stream.as_slice());
        assert_eq!(after.jpeg.get(&Ifd::Primary), Some(&stream));
    }

    // ── unknown tags ────────────────────────────────────────────────

    fn image_with_private_tag() -> Image {
        let mut tags = TagDirectory::new(ByteOrder::LittleEndian);
        let primary = tags.ifd_mut(Ifd::Primary);
        primary.insert(Ifd::Primary.field(0x0112, Value::Short(vec![1])));
        primary.insert(Ifd::Primary.field(0xC0DE, Value::Long(vec![7])));
        jpeg_with(&tags)
    }

    #[test]
    fn unknown_tags_are_removed_by_default() {
        let (out, report) = sweeper(&["Orientation"])
            .strip_metadata(&image_with_private_tag())
            .unwrap();
        let unknown: Vec<&TagDecision> = report.removed().collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].name, UNKNOWN_TAG_NAME);
        assert_eq!(unknown[0].tag, 0xC0DE);
        assert!(!decoded_exif(&out).get(Ifd::Primary).unwrap().contains(0xC0DE));
    }

    #[test]
    fn unknown_tags_can_be_preserved_by_id() {
        let (out, report) = sweeper(&["Orientation", "0xC0DE"])
            .strip_metadata(&image_with_private_tag())
            .unwrap();
        assert_eq!(report.removed().count(), 0);
        let tags = decoded_exif(&out);
        let private = tags.get(Ifd::Primary).unwrap().get(0xC0DE).unwrap();
        assert_eq!(private.value.get_uint(0), Some(7));
    }

    // ── encode failures ─────────────────────────────────────────────

    #[test]
    fn kept_strip_offsets_cannot_be_encoded() {
        // IFD0 { StripOffsets LONG 1 = 0 }
        let mut blob = Vec::new();
        blob.extend_from_slice(b"II\x2a\x00");
        blob.extend_from_slice(&8u32.to_le_bytes());
        blob.extend_from_slice(&1u16.to_le_bytes());
        blob.extend_from_slice(&0x0111u16.to_le_bytes());
        blob.extend_from_slice(&4u16.to_le_bytes());
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        let image = Image::from_bytes(with_exif_block(ImageFormat::Jpeg, blob)).unwrap();

        let err = sweeper(&["StripOffsets"]).strip_metadata(&image).unwrap_err();
        assert!(matches!(err, SweepError::Encode(_)));

        // Removing it instead is fine.
        let (out, _) = sweeper(&[]).strip_metadata(&image).unwrap();
        assert!(out.exif().is_none());
    }

    // ── describe ────────────────────────────────────────────────────

    #[test]
    fn describe_lists_every_entry_with_its_decision() {
        let listing = sweeper(&["Orientation"]).describe(&sample_jpeg(ByteOrder::BigEndian));
        assert_eq!(listing.len(), 7);

        let make = listing.iter().find(|l| l.name == "Make").unwrap();
        assert_eq!(make.ifd, Ifd::Primary);
        assert!(make.value.contains("Canon"));
        assert!(!make.kept);

        let orientation = listing.iter().find(|l| l.tag == 0x0112).unwrap();
        assert!(!orientation.value.is_empty());
        assert!(orientation.kept);
    }

    #[test]
    fn describe_shortens_long_values() {
        let mut tags = TagDirectory::new(ByteOrder::LittleEndian);
        tags.ifd_mut(Ifd::Primary)
            .insert(Ifd::Primary.field(0x010E, Value::Ascii(vec![vec![b'x'; 300]])));
        let listing = sweeper(&[]).describe(&jpeg_with(&tags));
        assert_eq!(listing.len(), 1);
        assert!(listing[0].value.ends_with("..."));
        assert!(listing[0].value.chars().count() <= MAX_VALUE_CHARS + 3);
    }

    #[test]
    fn describe_without_metadata_is_empty() {
        let image = Image::from_bytes(raster(ImageFormat::Png)).unwrap();
        assert!(sweeper(&["Orientation"]).describe(&image).is_empty());
    }

    #[test]
    fn describe_matches_strip_decisions() {
        let sweeper = sweeper(&["Orientation", "GPSLatitudeRef", "JPEGInterchangeFormat"]);
        let image = sample_jpeg(ByteOrder::LittleEndian);
        let listed: Vec<(Ifd, u16, bool)> =
            sweeper.describe(&image).iter().map(|l| (l.ifd, l.tag, l.kept)).collect();
        let (_, report) = sweeper.strip_metadata(&image).unwrap();
        let decided: Vec<(Ifd, u16, bool)> =
            report.decisions.iter().map(|d| (d.ifd, d.tag, d.kept)).collect();
        assert_eq!(listed, decided);
    }
}
