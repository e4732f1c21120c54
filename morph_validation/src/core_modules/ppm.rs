// THEORY:
// The `ppm` module reads the one image format the harness feeds to algorithms:
// raw truecolor PPM ("P6"). It is not a general PNM codec. The fixtures are under
// our control, so the decoder only needs to accept what we produce and reject
// everything else loudly.
//
// Decoding is a straight line through five stages with no backtracking:
//
//   open -> magic -> dimensions -> separator -> pixels -> Image
//
// 1.  **Magic**: the first whitespace-delimited token must be `P6`.
// 2.  **Dimensions**: three whitespace-delimited unsigned integers follow: width,
//     height and the maximum sample value. The maximum is read but not used; every
//     sample is taken to be one byte and every image to be 24 bits per pixel.
// 3.  **Separator**: exactly one whitespace byte ends the header. Anything after it
//     is pixel data, even if it happens to look like whitespace.
// 4.  **Pixels**: exactly `width * height * 3` bytes, row-major, RGB interleaved.
//     Bytes past that are ignored.
//
// Any failure ends decoding. A short pixel payload discards the partial buffer;
// there is no such thing as a partially decoded `Image`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core_modules::raster::{Image, DEPTH_RGB};
use crate::error::{Error, FormatError, Result};

/// Magic token identifying raw (binary) RGB.
pub const MAGIC: &[u8] = b"P6";

/// Upper bound on the pixel buffer reserved from the header alone. Larger
/// payloads grow as bytes actually arrive.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// The parsed text header of a raw truecolor file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u16,
    pub height: u16,
    pub max_value: u16,
}

impl Header {
    /// Number of pixel bytes that must follow the header.
    pub fn payload_len(&self) -> usize {
        Image::size_for(self.width, self.height, DEPTH_RGB)
    }
}

/// Decodes the raw truecolor image stored at `path`.
pub fn decode(path: impl AsRef<Path>) -> Result<Image> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    decode_from(BufReader::new(file), path)
}

/// Decodes a raw truecolor image from any buffered source. `origin` only labels errors.
pub fn decode_from<R: BufRead>(reader: R, origin: impl Into<PathBuf>) -> Result<Image> {
    let mut stream = HeaderStream {
        inner: reader,
        origin: origin.into(),
    };

    let header = stream.read_header()?;
    debug!(
        path = %stream.origin.display(),
        width = header.width,
        height = header.height,
        max_value = header.max_value,
        "read ppm header"
    );

    let data = stream.read_pixels(header.payload_len())?;
    Image::new(header.width, header.height, DEPTH_RGB, data)
}

struct HeaderStream<R> {
    inner: R,
    origin: PathBuf,
}

impl<R: BufRead> HeaderStream<R> {
    fn read_header(&mut self) -> Result<Header> {
        if self.token()? != MAGIC {
            return Err(self.format_error(FormatError::BadMagic));
        }

        let width = self.number("width")?;
        let height = self.number("height")?;
        let max_value = self.number("max value")?;

        // Exactly one whitespace byte separates the header from the raster.
        match self.peek()? {
            Some(byte) if byte.is_ascii_whitespace() => self.inner.consume(1),
            _ => return Err(self.format_error(FormatError::TruncatedHeader)),
        }

        Ok(Header {
            width,
            height,
            max_value,
        })
    }

    fn read_pixels(&mut self, expected: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(expected.min(MAX_PREALLOCATION));
        let read = (&mut self.inner)
            .take(expected as u64)
            .read_to_end(&mut data)
            .map_err(|e| Error::io(&self.origin, e))?;

        if read < expected {
            return Err(self.format_error(FormatError::TruncatedPixelData { expected, read }));
        }
        Ok(data)
    }

    fn number(&mut self, field: &'static str) -> Result<u16> {
        let token = self.token()?;
        if token.is_empty() {
            return Err(self.format_error(FormatError::TruncatedHeader));
        }
        if !token.iter().all(u8::is_ascii_digit) {
            return Err(self.format_error(FormatError::MalformedHeader { field }));
        }
        std::str::from_utf8(&token)
            .ok()
            .and_then(|text| text.parse::<u16>().ok())
            .ok_or_else(|| self.format_error(FormatError::MalformedHeader { field }))
    }

    /// Skips leading whitespace and collects the next run of non-whitespace bytes.
    /// The terminating byte is left unread. Returns an empty token at end of input.
    fn token(&mut self) -> Result<Vec<u8>> {
        while let Some(byte) = self.peek()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.inner.consume(1);
        }

        let mut token = Vec::new();
        while let Some(byte) = self.peek()? {
            if byte.is_ascii_whitespace() {
                break;
            }
            token.push(byte);
            self.inner.consume(1);
        }
        Ok(token)
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(&self.origin, e)),
            }
        }
    }

    fn format_error(&self, reason: FormatError) -> Error {
        Error::format(&self.origin, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode_bytes(bytes: &[u8]) -> Result<Image> {
        decode_from(Cursor::new(bytes.to_vec()), "memory.ppm")
    }

    fn with_payload(header: &[u8], payload_len: usize) -> Vec<u8> {
        let mut bytes = header.to_vec();
        bytes.extend((0..payload_len).map(|i| i as u8));
        bytes
    }

    fn reason(result: Result<Image>) -> FormatError {
        match result {
            Err(Error::Format { reason, .. }) => reason,
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn decodes_two_by_two() {
        let bytes = with_payload(b"P6\n2 2 255\n", 12);
        let image = decode_bytes(&bytes).expect("well-formed image");

        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 2);
        assert_eq!(image.depth(), 24);
        assert_eq!(image.data(), &bytes[bytes.len() - 12..]);
    }

    #[test]
    fn short_payload_is_rejected() {
        let bytes = with_payload(b"P6\n2 2 255\n", 10);
        assert_eq!(
            reason(decode_bytes(&bytes)),
            FormatError::TruncatedPixelData {
                expected: 12,
                read: 10
            }
        );
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let bytes = with_payload(b"P3\n2 2 255\n", 12);
        assert_eq!(reason(decode_bytes(&bytes)), FormatError::BadMagic);
        assert_eq!(reason(decode_bytes(b"")), FormatError::BadMagic);
        assert_eq!(reason(decode_bytes(b"P66\n1 1 255\n...")), FormatError::BadMagic);
    }

    #[test]
    fn header_ending_early_is_truncated() {
        assert_eq!(reason(decode_bytes(b"P6\n2 2")), FormatError::TruncatedHeader);
        assert_eq!(reason(decode_bytes(b"P6\n")), FormatError::TruncatedHeader);
        // No separator byte after the max value.
        assert_eq!(reason(decode_bytes(b"P6\n2 2 255")), FormatError::TruncatedHeader);
    }

    #[test]
    fn non_numeric_fields_are_malformed() {
        assert_eq!(
            reason(decode_bytes(b"P6\nwide 2 255\n")),
            FormatError::MalformedHeader { field: "width" }
        );
        assert_eq!(
            reason(decode_bytes(b"P6\n2 -2 255\n")),
            FormatError::MalformedHeader { field: "height" }
        );
        assert_eq!(
            reason(decode_bytes(b"P6\n2 2 70000\n")),
            FormatError::MalformedHeader { field: "max value" }
        );
    }

    #[test]
    fn dimensions_beyond_sixteen_bits_are_malformed() {
        assert_eq!(
            reason(decode_bytes(b"P6\n65536 1 255\n")),
            FormatError::MalformedHeader { field: "width" }
        );
    }

    #[test]
    fn only_one_separator_byte_is_skipped() {
        // The second newline belongs to the raster.
        let mut bytes = b"P6\n1 1 255\n\n".to_vec();
        bytes.extend([7, 8]);
        let image = decode_bytes(&bytes).expect("three payload bytes present");
        assert_eq!(image.data(), &[b'\n', 7, 8]);
    }

    #[test]
    fn huge_header_without_pixels_is_truncated() {
        assert_eq!(
            reason(decode_bytes(b"P6\n65535 65535 255\n")),
            FormatError::TruncatedPixelData {
                expected: 65535 * 65535 * 3,
                read: 0
            }
        );
    }

    #[test]
    fn max_value_is_not_checked_against_255() {
        let image = decode_bytes(&with_payload(b"P6\n1 1 1000\n", 3)).expect("max value is ignored");
        assert_eq!(image.data(), &[0, 1, 2]);
        assert_eq!(image.depth(), 24);
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let bytes = with_payload(b"P6 1 1 255\n", 5);
        let image = decode_bytes(&bytes).expect("payload long enough");
        assert_eq!(image.data(), &[0, 1, 2]);
    }

    #[test]
    fn empty_raster_is_valid() {
        let image = decode_bytes(b"P6\n0 5 255\n").expect("zero-width image");
        assert_eq!(image.size(), 0);
        assert!(image.data().is_empty());
    }

    #[test]
    fn header_reports_payload_length() {
        let header = Header {
            width: 3,
            height: 2,
            max_value: 255,
        };
        assert_eq!(header.payload_len(), 18);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = decode(dir.path().join("absent.ppm"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn matches_pixels_written_by_the_image_crate() {
        use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
        use image::ImageEncoder;

        let (width, height) = (5u16, 3u16);
        let pixels: Vec<u8> = (0..Image::size_for(width, height, DEPTH_RGB))
            .map(|i| (i * 7 % 251) as u8)
            .collect();

        let mut encoded = Vec::new();
        PnmEncoder::new(&mut encoded)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .write_image(&pixels, width as u32, height as u32, image::ExtendedColorType::Rgb8)
            .expect("encode ppm");

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("fixture.ppm");
        std::fs::write(&path, encoded).expect("write fixture");

        let image = decode(&path).expect("decode fixture");
        assert_eq!((image.width(), image.height()), (width, height));
        assert_eq!(image.into_data(), pixels);
    }
}
