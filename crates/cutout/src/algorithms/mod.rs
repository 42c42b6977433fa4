pub mod edges;
pub mod sampling;
pub mod generic;
pub mod conservative;
pub mod text;
pub mod postprocess;
pub mod enhance;

pub use edges::*;
pub use sampling::*;
pub use generic::*;
pub use conservative::*;
pub use text::*;
pub use postprocess::*;
pub use enhance::*;

use image::{GrayImage, Luma};

use crate::types::{RasterImage, luminance, rgb_of};

/// Luma of every pixel, alpha ignored
pub fn grayscale(image: &RasterImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luminance(rgb_of(image.get_pixel(x, y))).round() as u8])
    })
}

/// Grayscale followed by a Gaussian blur; a non-positive sigma skips the blur
pub fn blurred_grayscale(image: &RasterImage, sigma: f32) -> GrayImage {
    let gray = grayscale(image);
    if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&gray, sigma)
    } else {
        gray
    }
}

/// Offsets of the 8-connected neighbourhood
pub(crate) const NEIGHBORS_8: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0), (1, 0),
    (-1, 1), (0, 1), (1, 1),
];

/// In-bounds neighbours of `(x, y)` at the given offsets
pub(crate) fn neighbors<'a>(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    offsets: &'a [(i64, i64)],
) -> impl Iterator<Item = (u32, u32)> + 'a {
    offsets.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        (nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64)
            .then_some((nx as u32, ny as u32))
    })
}

/// Offsets of the square window of the given radius, centre excluded
pub(crate) fn window_offsets(radius: i64) -> Vec<(i64, i64)> {
    (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter(|&offset| offset != (0, 0))
        .collect()
}
