use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::webp::WebP;
use img_parts::{Bytes, ImageEXIF};

use crate::error::{Result, SweepError};

/// Largest TIFF payload that fits in a JPEG APP1 segment:
/// 65535 (segment length) - 2 (length field) - 6 (`Exif\0\0`).
pub const MAX_JPEG_EXIF_LEN: usize = 65527;

/// Formats whose EXIF block sits in its own segment or chunk. The
/// compressed raster is carried through untouched.
#[derive(Debug, Clone)]
enum Container {
    Jpeg(Jpeg),
    Png(Png),
    WebP(WebP),
}

impl Container {
    fn exif(&self) -> Option<Bytes> {
        match self {
            Container::Jpeg(img) => img.exif(),
            Container::Png(img) => img.exif(),
            Container::WebP(img) => img.exif(),
        }
    }

    fn set_exif(&mut self, exif: Option<Bytes>) {
        match self {
            Container::Jpeg(img) => img.set_exif(exif),
            Container::Png(img) => img.set_exif(exif),
            Container::WebP(img) => img.set_exif(exif),
        }
    }

    fn to_bytes(&self) -> Bytes {
        match self {
            Container::Jpeg(img) => img.clone().encoder().bytes(),
            Container::Png(img) => img.clone().encoder().bytes(),
            Container::WebP(img) => img.clone().encoder().bytes(),
        }
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Container(Container),
    /// Everything else: decoded pixels, re-encoded on save.
    Raster(DynamicImage),
}

/// One loaded image: its format, dimensions, and pixel data, plus the EXIF
/// block when the format carries one.
///
/// JPEG, PNG and WebP keep their original encoded bytes, so swapping the
/// EXIF block never recompresses the picture. Other formats the codec can
/// read (TIFF, BMP, GIF) have no separable EXIF block and are re-encoded
/// in the same format when saved.
///
/// For those raster formats [`exif`](Self::exif) is always `None` and the
/// saved file carries no metadata at all: tags a preserve list would keep
/// (Orientation, XResolution, ...) do not survive the re-encode. Only the
/// pixels do. Animated GIFs keep their first frame.
///
/// ```rust,no_run
/// use exif_sweep::picture::Image;
///
/// let img = Image::open("photo.jpg".as_ref()).unwrap();
/// println!("{:?} {:?}, EXIF: {}", img.format(), img.dimensions(), img.exif().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Image {
    format: ImageFormat,
    width: u32,
    height: u32,
    payload: Payload,
}

fn decode_error(msg: impl ToString) -> SweepError {
    SweepError::Decode(msg.to_string())
}

impl Image {
    /// Read and fully decode an image file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| decode_error(format!("{}: {e}", path.display())))?;
        Self::from_bytes(data)
    }

    /// Decode an in-memory image. The format is sniffed from the content,
    /// not taken from a file name.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&data).map_err(decode_error)?;
        let pixels = image::load_from_memory_with_format(&data, format).map_err(decode_error)?;
        let (width, height) = (pixels.width(), pixels.height());

        let payload = match format {
            ImageFormat::Jpeg => {
                Payload::Container(Container::Jpeg(Jpeg::from_bytes(Bytes::from(data)).map_err(decode_error)?))
            }
            ImageFormat::Png => {
                Payload::Container(Container::Png(Png::from_bytes(Bytes::from(data)).map_err(decode_error)?))
            }
            ImageFormat::WebP => {
                Payload::Container(Container::WebP(WebP::from_bytes(Bytes::from(data)).map_err(decode_error)?))
            }
            _ => Payload::Raster(pixels),
        };

        log::debug!("Decoded {format:?} image {width}x{height}");
        Ok(Self {
            format,
            width,
            height,
            payload,
        })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the format can hold an EXIF block.
    pub fn supports_exif(&self) -> bool {
        matches!(self.payload, Payload::Container(_))
    }

    /// The TIFF-structured EXIF payload (without the `Exif\0\0` prefix), if any.
    pub fn exif(&self) -> Option<Vec<u8>> {
        match &self.payload {
            Payload::Container(img) => img.exif().map(|b| b.to_vec()),
            Payload::Raster(_) => None,
        }
    }

    /// A copy of this image with its EXIF block replaced, or removed when
    /// `exif` is `None`. The raster is shared, not re-encoded.
    pub fn with_exif(&self, exif: Option<Vec<u8>>) -> Result<Self> {
        let mut out = self.clone();
        match (&mut out.payload, exif) {
            (Payload::Container(img), exif) => {
                if let Some(ref data) = exif
                    && self.format == ImageFormat::Jpeg
                    && data.len() > MAX_JPEG_EXIF_LEN
                {
                    return Err(SweepError::Encode(format!(
                        "EXIF block of {} bytes exceeds the JPEG segment limit of {MAX_JPEG_EXIF_LEN}",
                        data.len()
                    )));
                }
                img.set_exif(exif.map(Bytes::from));
            }
            (Payload::Raster(_), None) => {}
            (Payload::Raster(_), Some(_)) => {
                return Err(SweepError::Encode(format!(
                    "{:?} images cannot carry an EXIF block",
                    self.format
                )));
            }
        }
        Ok(out)
    }

    /// Serialize the image in its original format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Container(img) => Ok(img.to_bytes().to_vec()),
            Payload::Raster(pixels) => {
                let mut buf = Cursor::new(Vec::new());
                pixels
                    .write_to(&mut buf, self.format)
                    .map_err(|e| SweepError::Encode(format!("{:?}: {e}", self.format)))?;
                Ok(buf.into_inner())
            }
        }
    }

    /// Encode and write to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        std::fs::write(path, bytes).map_err(|source| SweepError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::exif::ByteOrder;
    use crate::exif::reader::tests::sample_block;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    /// A small gradient encoded as `format`.
    pub(crate) fn raster(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    /// `raster(format)` with `exif` inserted through img-parts.
    pub(crate) fn with_exif_block(format: ImageFormat, exif: Vec<u8>) -> Vec<u8> {
        let img = Image::from_bytes(raster(format)).unwrap();
        img.with_exif(Some(exif)).unwrap().encode().unwrap()
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn sniffs_format_from_content() {
        for format in [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Bmp, ImageFormat::Gif, ImageFormat::Tiff] {
            let img = Image::from_bytes(raster(format)).unwrap();
            assert_eq!(img.format(), format);
            assert_eq!(img.dimensions(), (8, 6));
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Image::from_bytes(b"not an image at all".to_vec()),
            Err(SweepError::Decode(_))
        ));
    }

    #[test]
    fn rejects_jpeg_without_frame() {
        let mut data = raster(ImageFormat::Jpeg);
        data.truncate(20);
        assert!(matches!(Image::from_bytes(data), Err(SweepError::Decode(_))));
    }

    #[test]
    fn open_missing_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Image::open(&dir.path().join("missing.jpg")),
            Err(SweepError::Decode(_))
        ));
    }

    // ── EXIF block ──────────────────────────────────────────────────

    #[test]
    fn container_round_trips_without_exif() {
        for format in [ImageFormat::Jpeg, ImageFormat::Png] {
            let data = raster(format);
            let img = Image::from_bytes(data.clone()).unwrap();
            assert!(img.exif().is_none());
            assert_eq!(img.encode().unwrap(), data);
        }
    }

    #[test]
    fn exif_block_can_be_set_and_removed() {
        let block = sample_block(ByteOrder::LittleEndian);
        let data = with_exif_block(ImageFormat::Jpeg, block.clone());
        let img = Image::from_bytes(data).unwrap();
        assert_eq!(img.exif().as_deref(), Some(block.as_slice()));

        let stripped = img.with_exif(None).unwrap();
        assert!(stripped.exif().is_none());
        let reloaded = Image::from_bytes(stripped.encode().unwrap()).unwrap();
        assert!(reloaded.exif().is_none());
    }

    #[test]
    fn raster_formats_cannot_carry_exif() {
        let img = Image::from_bytes(raster(ImageFormat::Bmp)).unwrap();
        assert!(!img.supports_exif());
        assert!(img.exif().is_none());
        assert!(img.with_exif(None).is_ok());
        assert!(matches!(img.with_exif(Some(vec![0; 8])), Err(SweepError::Encode(_))));
    }

    #[test]
    fn refuses_oversized_jpeg_segment() {
        let img = Image::from_bytes(raster(ImageFormat::Jpeg)).unwrap();
        let big = vec![0u8; MAX_JPEG_EXIF_LEN + 1];
        assert!(matches!(img.with_exif(Some(big)), Err(SweepError::Encode(_))));
    }

    // ── saving ──────────────────────────────────────────────────────

    #[test]
    fn save_reencodes_raster_formats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bmp");
        let original = image::load_from_memory(&raster(ImageFormat::Bmp)).unwrap();

        Image::from_bytes(raster(ImageFormat::Bmp)).unwrap().save(&path).unwrap();
        let saved = image::open(&path).unwrap();
        assert_eq!(saved.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn save_to_missing_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let img = Image::from_bytes(raster(ImageFormat::Png)).unwrap();
        let err = img.save(&dir.path().join("nope").join("out.png")).unwrap_err();
        assert!(matches!(err, SweepError::Write { .. }));
    }
}
