// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/input/preprocess.rs - 模型输入预处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{RgbImage, imageops::FilterType};
use tracing::debug;

use crate::frame::{PreprocessedTensor, TargetShape};

use super::{RawImage, UnsupportedFormatError};

/// 解码、缩放并归一化图像
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
  filter: FilterType,
}

impl Default for ImagePreprocessor {
  fn default() -> Self {
    // 双线性插值，结果对同一输入是确定的
    Self {
      filter: FilterType::Triangle,
    }
  }
}

impl ImagePreprocessor {
  pub fn prepare(
    &self,
    raw: &RawImage,
    target: TargetShape,
  ) -> Result<PreprocessedTensor, UnsupportedFormatError> {
    let image = raw.decode()?;
    Ok(self.prepare_rgb(&image, target))
  }

  pub fn prepare_rgb(&self, image: &RgbImage, target: TargetShape) -> PreprocessedTensor {
    let (width, height) = (target.width(), target.height());
    debug!(
      "缩放图像 {}x{} -> {}x{}",
      image.width(),
      image.height(),
      width,
      height
    );

    if image.dimensions() == (width, height) {
      return PreprocessedTensor::from_resized(target, image);
    }

    let resized = image::imageops::resize(image, width, height, self.filter);
    PreprocessedTensor::from_resized(target, &resized)
  }
}

/// 使用默认策略预处理
pub fn prepare(
  raw: &RawImage,
  target: TargetShape,
) -> Result<PreprocessedTensor, UnsupportedFormatError> {
  ImagePreprocessor::default().prepare(raw, target)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::{RawImageFormat, tests::png_bytes};
  use image::{ImageBuffer, Rgba, RgbaImage};

  #[test]
  fn output_has_batch_and_target_shape() {
    let image: RgbaImage = ImageBuffer::from_pixel(7, 5, Rgba([255, 0, 51, 128]));
    let raw = RawImage::new(png_bytes(&image), RawImageFormat::Png);
    let target = TargetShape::new(4, 6).unwrap();

    let tensor = prepare(&raw, target).unwrap();
    assert_eq!(tensor.dims(), [1, 4, 6, 3]);
    assert_eq!(tensor.as_nhwc().len(), 4 * 6 * 3);
  }

  #[test]
  fn values_are_scaled_into_unit_range() {
    let image: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([255, 0, 51, 255]));
    let raw = RawImage::new(png_bytes(&image), RawImageFormat::Png);
    let tensor = prepare(&raw, TargetShape::new(2, 2).unwrap()).unwrap();

    assert_eq!(tensor.get(0, 0, 0), Some(1.0));
    assert_eq!(tensor.get(0, 0, 1), Some(0.0));
    assert!((tensor.get(1, 1, 2).unwrap() - 0.2).abs() < 1e-6);
    assert!(tensor.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn preprocessing_is_deterministic() {
    let image: RgbaImage =
      ImageBuffer::from_fn(9, 9, |x, y| Rgba([(x * 20) as u8, (y * 25) as u8, 7, 255]));
    let raw = RawImage::new(png_bytes(&image), RawImageFormat::Png);
    let target = TargetShape::new(4, 4).unwrap();
    assert_eq!(prepare(&raw, target).unwrap(), prepare(&raw, target).unwrap());
  }

  #[test]
  fn undecodable_bytes_are_unsupported() {
    let raw = RawImage::new(vec![0x89, b'P', b'N', b'G', 0, 0], RawImageFormat::Png);
    assert!(matches!(
      prepare(&raw, TargetShape::new(2, 2).unwrap()),
      Err(UnsupportedFormatError::Decode { .. })
    ));
  }
}
