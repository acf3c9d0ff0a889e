//! Where each snapshot goes and how it is encoded.

use std::fmt;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::renderer::Capture;
use crate::template::{Helpers, Template};
use crate::url_source::host_with_port;
use crate::{RenderError, Result};

pub const DEFAULT_QUALITY: u32 = 75;

/// Qualities above this ask for lossless output where the format has it.
pub const MAX_LOSSY_QUALITY: u32 = 100;

/// Luma values at or above this become white in `mono` output.
const MONO_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    /// Inferred from the output file extension; PNG on stdout.
    #[default]
    Auto,
    Png,
    Jpeg,
    Webp,
    Gif,
    /// One bit per pixel, black or white.
    Mono,
}

impl SnapshotFormat {
    pub const NAMES: [&'static str; 6] = ["auto", "png", "jpeg", "webp", "gif", "mono"];

    /// Format implied by a file extension; `None` when unrecognised.
    pub fn from_filename(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// The concrete encoding used for this format.
    pub fn resolved(self) -> Self {
        match self {
            Self::Auto => Self::Png,
            other => other,
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Mono => "mono",
        };
        f.write_str(name)
    }
}

impl FromStr for SnapshotFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "gif" => Ok(Self::Gif),
            "mono" => Ok(Self::Mono),
            other => Err(format!(
                "unsupported image format {other:?} (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// Resolved destination for one URL's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout { format: SnapshotFormat },
    File { path: PathBuf, format: SnapshotFormat },
}

impl Destination {
    pub fn format(&self) -> SnapshotFormat {
        match self {
            Destination::Stdout { format } | Destination::File { format, .. } => *format,
        }
    }
}

/// Chooses a destination and format per URL from the `--output` template.
#[derive(Debug, Clone)]
pub struct SnapshotResolver {
    format: SnapshotFormat,
    quality: u32,
    output: Option<Template>,
}

impl SnapshotResolver {
    /// Compiles `output` once with the filename helpers; `None` writes to stdout.
    pub fn new(format: SnapshotFormat, output: Option<&str>, quality: u32) -> Result<Self> {
        let output = output
            .filter(|text| !text.is_empty())
            .map(|text| Template::parse_with(text, Helpers::filename()))
            .transpose()?;
        Ok(Self {
            format,
            quality,
            output,
        })
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }

    /// Evaluates the filename template with `Host` and `Index` for this URL.
    ///
    /// File output is encoded according to the file's extension, whatever
    /// format was requested; unrecognised extensions get PNG.
    pub fn destination(&self, url: &Url, index: usize) -> Result<Destination> {
        let Some(template) = &self.output else {
            return Ok(Destination::Stdout {
                format: self.format.resolved(),
            });
        };

        let name = template.render(&json!({
            "Host": host_with_port(url),
            "Index": index,
        }))?;
        if name.trim().is_empty() {
            return Err(RenderError::Config(format!(
                "output template produced an empty file name for {url}"
            )));
        }
        let path = PathBuf::from(name);
        let format = SnapshotFormat::from_filename(&path).unwrap_or_else(|| {
            debug!(path = %path.display(), "unrecognised extension; writing PNG");
            SnapshotFormat::Png
        });
        if self.format != SnapshotFormat::Auto && self.format != format {
            debug!(requested = %self.format, %format, "file extension overrides requested format");
        }
        Ok(Destination::File { path, format })
    }
}

/// Rejects captures that have nothing to encode.
pub fn validate_capture(capture: &Capture) -> Result<()> {
    let Some(pixels) = &capture.pixels else {
        return Err(RenderError::EmptyCapture(
            "no pixel data in captured image".into(),
        ));
    };
    if capture.stride == 0 || capture.width == 0 || capture.height == 0 {
        return Err(RenderError::EmptyCapture(format!(
            "captured image has no area ({}x{}, stride {})",
            capture.width, capture.height, capture.stride
        )));
    }
    let row = capture.width as usize * 4;
    if capture.stride < row || pixels.len() < capture.stride * (capture.height as usize - 1) + row
    {
        return Err(RenderError::renderer(format!(
            "captured buffer of {} bytes is too small for {}x{} at stride {}",
            pixels.len(),
            capture.width,
            capture.height,
            capture.stride
        )));
    }
    Ok(())
}

fn to_rgba(capture: &Capture) -> Result<RgbaImage> {
    validate_capture(capture)?;
    let pixels = capture.pixels.as_deref().unwrap_or_default();
    let row = capture.width as usize * 4;
    let packed: Vec<u8> = if capture.stride == row {
        pixels[..row * capture.height as usize].to_vec()
    } else {
        pixels
            .chunks(capture.stride)
            .take(capture.height as usize)
            .flat_map(|line| &line[..row])
            .copied()
            .collect()
    };
    RgbaImage::from_raw(capture.width, capture.height, packed)
        .ok_or_else(|| RenderError::renderer("captured buffer does not match its dimensions"))
}

fn threshold(rgba: &RgbaImage) -> GrayImage {
    let luma = DynamicImage::ImageRgba8(rgba.clone()).to_luma8();
    GrayImage::from_fn(luma.width(), luma.height(), |x, y| {
        if luma.get_pixel(x, y).0[0] >= MONO_THRESHOLD {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Encode `capture` in `format` and write it to `writer`.
///
/// `quality` sets JPEG compression and is clamped to 1..=100 there. WebP is
/// always encoded losslessly, which is what qualities above
/// [`MAX_LOSSY_QUALITY`] request.
pub fn encode<W: Write + ?Sized>(
    format: SnapshotFormat,
    writer: &mut W,
    capture: &Capture,
    quality: u32,
) -> Result<()> {
    let rgba = to_rgba(capture)?;
    let mut buf = Cursor::new(Vec::new());
    match format.resolved() {
        SnapshotFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
            let quality = quality.clamp(1, MAX_LOSSY_QUALITY) as u8;
            JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
        }
        SnapshotFormat::Webp => {
            DynamicImage::ImageRgba8(rgba).write_to(&mut buf, image::ImageFormat::WebP)?;
        }
        SnapshotFormat::Gif => {
            DynamicImage::ImageRgba8(rgba).write_to(&mut buf, image::ImageFormat::Gif)?;
        }
        SnapshotFormat::Mono => {
            DynamicImage::ImageLuma8(threshold(&rgba)).write_to(&mut buf, image::ImageFormat::Png)?;
        }
        SnapshotFormat::Png | SnapshotFormat::Auto => {
            DynamicImage::ImageRgba8(rgba).write_to(&mut buf, image::ImageFormat::Png)?;
        }
    }
    writer.write_all(buf.get_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(width: u32, height: u32, rgba: [u8; 4]) -> Capture {
        Capture {
            pixels: Some(rgba.repeat((width * height) as usize)),
            stride: width as usize * 4,
            width,
            height,
        }
    }

    fn url(text: &str) -> Url {
        Url::parse(text).unwrap()
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("PNG".parse::<SnapshotFormat>().unwrap(), SnapshotFormat::Png);
        assert_eq!("jpg".parse::<SnapshotFormat>().unwrap(), SnapshotFormat::Jpeg);
        assert_eq!("".parse::<SnapshotFormat>().unwrap(), SnapshotFormat::Auto);
        let err = "tiff".parse::<SnapshotFormat>().unwrap_err();
        assert!(err.contains("tiff") && err.contains("mono"));
    }

    #[test]
    fn extensions_map_to_formats() {
        assert_eq!(SnapshotFormat::from_filename(Path::new("a.JPG")), Some(SnapshotFormat::Jpeg));
        assert_eq!(SnapshotFormat::from_filename(Path::new("a.jpeg")), Some(SnapshotFormat::Jpeg));
        assert_eq!(SnapshotFormat::from_filename(Path::new("a.webp")), Some(SnapshotFormat::Webp));
        assert_eq!(SnapshotFormat::from_filename(Path::new("dir/a.gif")), Some(SnapshotFormat::Gif));
        assert_eq!(SnapshotFormat::from_filename(Path::new("a.xyz")), None);
        assert_eq!(SnapshotFormat::from_filename(Path::new("noext")), None);
    }

    #[test]
    fn no_output_means_stdout() {
        let resolver = SnapshotResolver::new(SnapshotFormat::Auto, None, DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap(),
            Destination::Stdout { format: SnapshotFormat::Png }
        );
        let resolver = SnapshotResolver::new(SnapshotFormat::Jpeg, Some(""), DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap().format(),
            SnapshotFormat::Jpeg
        );
    }

    #[test]
    fn filename_template_uses_host_and_index() {
        let resolver =
            SnapshotResolver::new(SnapshotFormat::Auto, Some("{{.Host}}-{{.Index}}.jpg"), 80).unwrap();
        assert_eq!(
            resolver.destination(&url("http://example.com:8080/p"), 3).unwrap(),
            Destination::File {
                path: PathBuf::from("example.com:8080-3.jpg"),
                format: SnapshotFormat::Jpeg,
            }
        );
    }

    #[test]
    fn filename_helpers_are_available() {
        let resolver = SnapshotResolver::new(
            SnapshotFormat::Auto,
            Some(r#"{{index (split .Host ".") 0 | upper}}.png"#),
            DEFAULT_QUALITY,
        )
        .unwrap();
        let Destination::File { path, .. } = resolver.destination(&url("http://www.example.com/"), 0).unwrap()
        else {
            panic!("expected file destination");
        };
        assert_eq!(path, PathBuf::from("WWW.png"));
    }

    #[test]
    fn unknown_extension_falls_back_to_png() {
        let resolver = SnapshotResolver::new(SnapshotFormat::Auto, Some("shot.xyz"), DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap().format(),
            SnapshotFormat::Png
        );
    }

    #[test]
    fn extension_overrides_requested_format_for_files() {
        let resolver = SnapshotResolver::new(SnapshotFormat::Mono, Some("shot.jpg"), DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap().format(),
            SnapshotFormat::Jpeg
        );
        let resolver = SnapshotResolver::new(SnapshotFormat::Gif, Some("shot.bin"), DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap().format(),
            SnapshotFormat::Png
        );
        let resolver = SnapshotResolver::new(SnapshotFormat::Mono, None, DEFAULT_QUALITY).unwrap();
        assert_eq!(
            resolver.destination(&url("http://a.test/"), 0).unwrap().format(),
            SnapshotFormat::Mono
        );
    }

    #[test]
    fn out_of_range_jpeg_quality_still_encodes() {
        let shot = capture(2, 2, [9, 9, 9, 255]);
        for quality in [0, 101, 500] {
            let mut out = Vec::new();
            encode(SnapshotFormat::Jpeg, &mut out, &shot, quality).unwrap();
            assert!(out.starts_with(b"\xFF\xD8\xFF"), "{quality}");
        }
    }

    #[test]
    fn bad_output_template_fails_at_construction() {
        let err = SnapshotResolver::new(SnapshotFormat::Auto, Some("{{.Host"), DEFAULT_QUALITY).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        let err = SnapshotResolver::new(SnapshotFormat::Auto, Some("{{json .}}"), DEFAULT_QUALITY).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn empty_captures_are_rejected() {
        let none = Capture { pixels: None, stride: 0, width: 0, height: 0 };
        assert!(matches!(validate_capture(&none), Err(RenderError::EmptyCapture(_))));

        for bad in [
            Capture { stride: 0, ..capture(2, 2, [0; 4]) },
            Capture { width: 0, ..capture(2, 2, [0; 4]) },
            Capture { height: 0, ..capture(2, 2, [0; 4]) },
        ] {
            assert!(matches!(validate_capture(&bad), Err(RenderError::EmptyCapture(_))));
        }
        assert!(validate_capture(&capture(2, 2, [0; 4])).is_ok());
    }

    #[test]
    fn encodes_each_format_with_its_signature() {
        let shot = capture(4, 3, [200, 10, 10, 255]);
        let cases: [(SnapshotFormat, &[u8]); 5] = [
            (SnapshotFormat::Png, b"\x89PNG"),
            (SnapshotFormat::Auto, b"\x89PNG"),
            (SnapshotFormat::Mono, b"\x89PNG"),
            (SnapshotFormat::Jpeg, b"\xFF\xD8\xFF"),
            (SnapshotFormat::Gif, b"GIF8"),
        ];
        for (format, magic) in cases {
            let mut out = Vec::new();
            encode(format, &mut out, &shot, DEFAULT_QUALITY).unwrap();
            assert!(out.starts_with(magic), "{format}");
        }

        let mut out = Vec::new();
        encode(SnapshotFormat::Webp, &mut out, &shot, DEFAULT_QUALITY).unwrap();
        assert_eq!(&out[..4], b"RIFF");
        assert_eq!(&out[8..12], b"WEBP");
    }

    #[test]
    fn mono_output_is_black_and_white() {
        let shot = Capture {
            pixels: Some(vec![250, 250, 250, 255, 20, 20, 20, 255]),
            stride: 8,
            width: 2,
            height: 1,
        };
        let mut out = Vec::new();
        encode(SnapshotFormat::Mono, &mut out, &shot, DEFAULT_QUALITY).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn padded_rows_are_repacked() {
        // 1x2 image, stride 8 with 4 bytes of padding per row
        let shot = Capture {
            pixels: Some(vec![1, 2, 3, 255, 0, 0, 0, 0, 4, 5, 6, 255, 0, 0, 0, 0]),
            stride: 8,
            width: 1,
            height: 2,
        };
        let mut out = Vec::new();
        encode(SnapshotFormat::Png, &mut out, &shot, DEFAULT_QUALITY).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 1).0, [4, 5, 6, 255]);
    }
}
