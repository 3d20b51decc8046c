use std::io::Cursor;

use anyhow::Result;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat};

pub type Bytes = Vec<u8>;

const DEFAULT_QUALITY: u8 = 100;

/// Still-image codec and quality used for descrambled pages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFormat {
    format: ImageFormat,
    quality: u8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat {
            format: ImageFormat::Png,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl OutputFormat {
    pub fn new(format: ImageFormat) -> Self {
        OutputFormat {
            format,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Only lossy codecs use the quality. Clamped to 1..=100.
    pub fn with_quality(self, quality: u8) -> Self {
        OutputFormat {
            quality: quality.clamp(1, 100),
            ..self
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn extension(&self) -> &'static str {
        extension_of(self.format)
    }

    pub fn encode(&self, image: &DynamicImage) -> Result<Bytes> {
        let mut bytes: Bytes = Vec::new();
        match self.format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
                image.write_with_encoder(encoder)?;
            }
            format => image.write_to(&mut Cursor::new(&mut bytes), format)?,
        }
        Ok(bytes)
    }
}

/// File extension for a format, `jpg` rather than `jpeg`
pub fn extension_of(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("bin")
}

/// Zero padded page number, at least two digits wide
pub fn page_stem(number: u32, page_count: usize) -> String {
    let width = page_count.to_string().len().max(2);
    format!("{:0width$}", number, width = width)
}
