//! Colorized rendering of class maps.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::{
    error::{EvalError, EvalResult},
    map::ClassMap,
};

/// Cityscapes train-id colors, indexed by class id.
pub const CITYSCAPES_PALETTE: [[u8; 3]; 19] = [
    [128, 64, 128],
    [244, 35, 232],
    [70, 70, 70],
    [102, 102, 156],
    [190, 153, 153],
    [153, 153, 153],
    [250, 170, 30],
    [220, 220, 0],
    [107, 142, 35],
    [152, 251, 152],
    [70, 130, 180],
    [220, 20, 60],
    [255, 0, 0],
    [0, 0, 142],
    [0, 0, 70],
    [0, 60, 100],
    [0, 80, 100],
    [0, 0, 230],
    [119, 11, 32],
];

/// Paint every pixel with the palette color of its class.
///
/// Ids without a palette entry, such as the ignore label, are painted black.
pub fn decode_labels(map: &ClassMap, palette: &[[u8; 3]]) -> RgbImage {
    let mut image = RgbImage::new(map.width() as u32, map.height() as u32);
    for (pixel, &class) in image.pixels_mut().zip(map.as_slice()) {
        let color = palette.get(class as usize).copied().unwrap_or([0, 0, 0]);
        *pixel = Rgb(color);
    }
    image
}

/// Save the colorized map as an image file.
pub fn save_decoded(map: &ClassMap, palette: &[[u8; 3]], path: &Path) -> EvalResult<()> {
    decode_labels(map, palette)
        .save(path)
        .map_err(|e| EvalError::Dataset {
            message: format!("Failed to save {}: {e}", path.display()),
        })
}
