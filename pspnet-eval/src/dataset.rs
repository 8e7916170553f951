//! List-file dataset for segmentation evaluation.
//!
//! The list names one sample per line as `image_path label_path`, both relative
//! to the data directory (a leading `/` is allowed, as in Cityscapes lists).
//! Images are converted to BGR and mean-subtracted; images and labels are then
//! cropped or padded from the top-left corner to the configured input size.
//! Image padding is zero after mean subtraction, label padding is the ignore
//! value.

use std::path::{Path, PathBuf};

use burn::{data::dataset::Dataset, tensor::TensorData};
use image::DynamicImage;

use crate::{
    config::EvalConfig,
    error::{EvalError, EvalResult},
    map::LabelMap,
    source::Sample,
};

/// Image/label pairs listed in an evaluation list file.
#[derive(Debug, Clone)]
pub struct SegmentationDataset {
    items: Vec<(PathBuf, PathBuf)>,
    input_size: [usize; 2],
    img_mean: [f32; 3],
    ignore_label: u32,
}

impl SegmentationDataset {
    /// Create a dataset from the paths and preprocessing settings of `config`.
    pub fn new(config: &EvalConfig) -> EvalResult<Self> {
        let items = Self::collect_dataset_items(&config.data_dir, &config.data_list)?;

        Ok(Self {
            items,
            input_size: config.input_size,
            img_mean: config.img_mean,
            ignore_label: config.ignore_label,
        })
    }

    /// Read the list file and resolve every entry against `data_dir`.
    fn collect_dataset_items(
        data_dir: &Path,
        data_list: &Path,
    ) -> EvalResult<Vec<(PathBuf, PathBuf)>> {
        let contents = std::fs::read_to_string(data_list).map_err(|e| EvalError::Dataset {
            message: format!("Failed to read list file {}: {e}", data_list.display()),
        })?;

        let items = parse_list(&contents, data_dir)?;
        if items.is_empty() {
            return Err(EvalError::Dataset {
                message: format!("No image/label pairs listed in {}", data_list.display()),
            });
        }

        tracing::info!(
            count = items.len(),
            list = %data_list.display(),
            "found image/label pairs"
        );
        Ok(items)
    }

    /// Load and preprocess the sample at `index`.
    pub fn load(&self, index: usize) -> EvalResult<Sample> {
        let (image_path, label_path) = self.items.get(index).ok_or(EvalError::Exhausted {
            consumed: self.items.len(),
        })?;

        let image = open_image(image_path)?;
        let label = open_image(label_path)?;

        Sample::new(self.image_to_data(&image), self.label_to_map(&label)?)
    }

    /// BGR, mean-subtracted `[H, W, 3]` data at the input size.
    fn image_to_data(&self, image: &DynamicImage) -> TensorData {
        let [height, width] = self.input_size;
        let mut data = vec![0.0f32; height * width * 3];

        for (x, y, pixel) in image.to_rgb8().enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            if x >= width || y >= height {
                continue;
            }
            let [r, g, b] = pixel.0;
            let offset = (y * width + x) * 3;
            data[offset] = f32::from(b) - self.img_mean[0];
            data[offset + 1] = f32::from(g) - self.img_mean[1];
            data[offset + 2] = f32::from(r) - self.img_mean[2];
        }

        TensorData::new(data, [height, width, 3])
    }

    /// Single-channel labels at the input size.
    fn label_to_map(&self, label: &DynamicImage) -> EvalResult<LabelMap> {
        let [height, width] = self.input_size;
        let mut data = vec![self.ignore_label; height * width];

        for (x, y, pixel) in label.to_luma8().enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            if x < width && y < height {
                data[y * width + x] = u32::from(pixel.0[0]);
            }
        }

        LabelMap::new(height, width, data)
    }
}

impl Dataset<Sample> for SegmentationDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        match self.load(index) {
            Ok(sample) => Some(sample),
            Err(err) => {
                tracing::error!(index, error = %err, "failed to load sample");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Parse `image label` lines, skipping blank lines and `#` comments.
pub fn parse_list(contents: &str, data_dir: &Path) -> EvalResult<Vec<(PathBuf, PathBuf)>> {
    let resolve = |entry: &str| data_dir.join(entry.trim_start_matches('/'));

    contents
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(image), Some(label)) => Ok((resolve(image), resolve(label))),
                _ => Err(EvalError::Dataset {
                    message: format!("Line {number} has no label path: {line}"),
                }),
            }
        })
        .collect()
}

fn open_image(path: &Path) -> EvalResult<DynamicImage> {
    image::open(path).map_err(|e| EvalError::Dataset {
        message: format!("Failed to open {}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn write_pair(dir: &Path, name: &str, size: (u32, u32), rgb: [u8; 3], label: u8) {
        let (width, height) = size;
        RgbImage::from_pixel(width, height, Rgb(rgb))
            .save(dir.join(format!("{name}.png")))
            .unwrap();
        GrayImage::from_pixel(width, height, Luma([label]))
            .save(dir.join(format!("{name}_label.png")))
            .unwrap();
    }

    fn config_for(dir: &Path, list: &str, input_size: [usize; 2]) -> EvalConfig {
        let list_path = dir.join("list.txt");
        std::fs::write(&list_path, list).unwrap();
        EvalConfig::new()
            .with_data_dir(dir.to_path_buf())
            .with_data_list(list_path)
            .with_input_size(input_size)
            .with_img_mean([10.0, 20.0, 30.0])
    }

    #[test]
    fn test_parse_list_resolves_paths() {
        let items = parse_list(
            "# comment\n/img/a.png /gt/a.png\n\nimg/b.png   gt/b.png\n",
            Path::new("/data"),
        )
        .unwrap();

        assert_eq!(
            items,
            vec![
                (PathBuf::from("/data/img/a.png"), PathBuf::from("/data/gt/a.png")),
                (PathBuf::from("/data/img/b.png"), PathBuf::from("/data/gt/b.png")),
            ]
        );
    }

    #[test]
    fn test_parse_list_requires_label() {
        let result = parse_list("img/a.png\n", Path::new("data"));
        assert!(matches!(result, Err(EvalError::Dataset { .. })));
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), "\n# nothing\n", [2, 2]);

        assert!(matches!(
            SegmentationDataset::new(&config),
            Err(EvalError::Dataset { .. })
        ));
    }

    #[test]
    fn test_load_converts_to_bgr_and_subtracts_mean() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "a", (3, 2), [100, 50, 25], 4);
        let config = config_for(dir.path(), "a.png a_label.png\n", [2, 3]);

        let dataset = SegmentationDataset::new(&config).unwrap();
        assert_eq!(dataset.len(), 1);

        let sample = dataset.load(0).unwrap();
        assert_eq!(sample.dims(), [2, 3]);
        assert_eq!(sample.image.shape, vec![2, 3, 3]);

        let values: Vec<f32> = sample.image.iter::<f32>().collect();
        assert_eq!(&values[..3], &[15.0, 30.0, 70.0]);
        assert!(sample.label.as_slice().iter().all(|&label| label == 4));
    }

    #[test]
    fn test_load_pads_with_zero_and_ignore_label() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "small", (1, 1), [10, 20, 30], 2);
        let config = config_for(dir.path(), "small.png small_label.png\n", [2, 2]);

        let sample = SegmentationDataset::new(&config).unwrap().load(0).unwrap();

        assert_eq!(sample.label.as_slice(), &[2, 255, 255, 255]);
        let values: Vec<f32> = sample.image.iter::<f32>().collect();
        assert_eq!(&values[..3], &[20.0, 0.0, -20.0]);
        assert!(values[3..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_load_crops_from_top_left() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "big", (5, 4), [0, 0, 0], 1);
        let config = config_for(dir.path(), "big.png big_label.png\n", [2, 3]);

        let sample = SegmentationDataset::new(&config).unwrap().load(0).unwrap();

        assert_eq!(sample.dims(), [2, 3]);
        assert_eq!(sample.label.as_slice(), &[1; 6]);
    }

    #[test]
    fn test_missing_image_returns_none_from_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), "missing.png missing_label.png\n", [2, 2]);

        let dataset = SegmentationDataset::new(&config).unwrap();
        assert!(matches!(dataset.load(0), Err(EvalError::Dataset { .. })));
        assert!(dataset.get(0).is_none());
    }
}
