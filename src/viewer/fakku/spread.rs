use anyhow::Result;
use image::{imageops, DynamicImage, Rgb, RgbImage};

use crate::{
    data::ReadingDirection,
    utils::{Bytes, OutputFormat},
};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Put two pages of a spread side by side, top aligned.
///
/// Right-to-left books show the right page on the left.
pub fn join_spread(
    left: &DynamicImage,
    right: &DynamicImage,
    direction: ReadingDirection,
) -> RgbImage {
    let images = match direction {
        ReadingDirection::LeftToRight => [left, right],
        ReadingDirection::RightToLeft => [right, left],
    };

    let width = images.iter().map(|image| image.width()).sum();
    let height = images.iter().map(|image| image.height()).max().unwrap_or(0);

    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    let mut x = 0i64;
    for image in images {
        imageops::replace(&mut canvas, &image.to_rgb8(), x, 0);
        x += i64::from(image.width());
    }
    canvas
}

/// Decode both encoded pages, join them and encode the spread.
pub fn join_encoded(
    left: &[u8],
    right: &[u8],
    direction: ReadingDirection,
    output: OutputFormat,
) -> Result<Bytes> {
    let left = image::load_from_memory(left)?;
    let right = image::load_from_memory(right)?;
    let spread = DynamicImage::ImageRgb8(join_spread(&left, &right, direction));
    output.encode(&spread)
}
