//! Decoded raster buffers and the image stream codec.
//!
//! Supports the formats that cover the bulk of real documents: raw and
//! FlateDecode streams of 8-bit DeviceGray/DeviceRGB samples, and DCTDecode
//! (JPEG) via the `image` crate. Anything else is fatal — an image that
//! cannot be decoded cannot be safely redacted.

use crate::error::EngineError;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Object, Stream, dictionary};
use std::io::Write;

/// Sample value written into cleared pixels (white background).
const CLEAR_VALUE: u8 = 0xFF;

/// An 8-bit-per-component pixel buffer in raster row order (row 0 at the
/// top of the image).
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    /// Samples per pixel: 1 (gray) or 3 (RGB).
    components: usize,
    data: Vec<u8>,
}

impl Raster {
    pub fn new(
        width: usize,
        height: usize,
        components: usize,
        data: Vec<u8>,
    ) -> Result<Self, EngineError> {
        let expected = width * height * components;
        if data.len() < expected {
            return Err(EngineError::Image(format!(
                "raster data too short: {} bytes for {width}x{height}x{components}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            components,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, col: usize, row: usize) -> &[u8] {
        let offset = (row * self.width + col) * self.components;
        &self.data[offset..offset + self.components]
    }

    /// Blank every pixel in `cols` × `rows` (half-open pixel ranges,
    /// clamped to the raster extents).
    pub fn clear(&mut self, cols: std::ops::Range<usize>, rows: std::ops::Range<usize>) {
        let col_start = cols.start.min(self.width);
        let col_end = cols.end.min(self.width);
        let row_start = rows.start.min(self.height);
        let row_end = rows.end.min(self.height);
        for row in row_start..row_end {
            let from = (row * self.width + col_start) * self.components;
            let to = (row * self.width + col_end) * self.components;
            self.data[from..to].fill(CLEAR_VALUE);
        }
    }
}

/// Decode an image XObject stream into a [`Raster`].
pub fn decode_image_stream(stream: &Stream) -> Result<Raster, EngineError> {
    let width = dict_usize(stream, b"Width")?;
    let height = dict_usize(stream, b"Height")?;

    match image_filter(stream)? {
        ImageFilter::Dct => {
            let decoded = image::load_from_memory_with_format(
                &stream.content,
                image::ImageFormat::Jpeg,
            )
            .map_err(|e| EngineError::Image(format!("DCTDecode failed: {e}")))?;
            let rgb = decoded.to_rgb8();
            Raster::new(
                rgb.width() as usize,
                rgb.height() as usize,
                3,
                rgb.into_raw(),
            )
        }
        filter => {
            let bits = dict_usize(stream, b"BitsPerComponent")?;
            if bits != 8 {
                return Err(EngineError::Image(format!(
                    "unsupported bit depth {bits} (only 8-bit samples are supported)"
                )));
            }
            let components = color_components(stream)?;
            let data = match filter {
                ImageFilter::Raw => stream.content.clone(),
                ImageFilter::Flate => stream
                    .decompressed_content()
                    .map_err(|e| EngineError::Image(format!("FlateDecode failed: {e}")))?,
                ImageFilter::Dct => unreachable!(),
            };
            Raster::new(width, height, components, data)
        }
    }
}

/// Re-encode a raster as a FlateDecode image stream. `original` supplies
/// auxiliary entries worth carrying over (soft mask, interpolation hint);
/// geometry and color entries are rebuilt from the raster itself.
pub fn encode_raster(raster: &Raster, original: &lopdf::Dictionary) -> Result<Stream, EngineError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raster.data())?;
    let compressed = encoder.finish()?;

    let colorspace: &[u8] = if raster.components() == 1 {
        b"DeviceGray"
    } else {
        b"DeviceRGB"
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => raster.width() as i64,
        "Height" => raster.height() as i64,
        "ColorSpace" => Object::Name(colorspace.to_vec()),
        "BitsPerComponent" => 8i64,
        "Filter" => "FlateDecode",
    };
    for key in [b"SMask".as_slice(), b"Interpolate".as_slice()] {
        if let Ok(value) = original.get(key) {
            dict.set(key, value.clone());
        }
    }

    Ok(Stream::new(dict, compressed))
}

enum ImageFilter {
    Raw,
    Flate,
    Dct,
}

fn image_filter(stream: &Stream) -> Result<ImageFilter, EngineError> {
    let name = match stream.dict.get(b"Filter") {
        Err(_) => return Ok(ImageFilter::Raw),
        Ok(Object::Name(name)) => name.clone(),
        Ok(Object::Array(filters)) => match filters.as_slice() {
            [] => return Ok(ImageFilter::Raw),
            [Object::Name(name)] => name.clone(),
            _ => {
                return Err(EngineError::Image(
                    "unsupported filter chain on image stream".to_string(),
                ));
            }
        },
        Ok(_) => {
            return Err(EngineError::Image(
                "malformed /Filter entry on image stream".to_string(),
            ));
        }
    };
    match name.as_slice() {
        b"FlateDecode" => Ok(ImageFilter::Flate),
        b"DCTDecode" => Ok(ImageFilter::Dct),
        other => Err(EngineError::Image(format!(
            "unsupported image filter /{}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn color_components(stream: &Stream) -> Result<usize, EngineError> {
    match stream.dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => match name.as_slice() {
            b"DeviceGray" => Ok(1),
            b"DeviceRGB" => Ok(3),
            other => Err(EngineError::Image(format!(
                "unsupported color space /{}",
                String::from_utf8_lossy(other)
            ))),
        },
        Ok(_) => Err(EngineError::Image(
            "unsupported non-name /ColorSpace on image stream".to_string(),
        )),
        Err(_) => Err(EngineError::Image(
            "image stream has no /ColorSpace".to_string(),
        )),
    }
}

fn dict_usize(stream: &Stream, key: &[u8]) -> Result<usize, EngineError> {
    match stream.dict.get(key) {
        Ok(Object::Integer(v)) if *v >= 0 => Ok(*v as usize),
        _ => Err(EngineError::Image(format!(
            "image stream missing integer /{}",
            String::from_utf8_lossy(key)
        ))),
    }
}
