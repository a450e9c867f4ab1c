// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/input.rs - 图像输入
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

use std::fmt;

use image::{ImageFormat, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

mod preprocess;
mod read_image_file;

pub use self::preprocess::{ImagePreprocessor, prepare};
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum UnsupportedFormatError {
  #[error("unsupported image format, only JPEG and PNG are accepted")]
  UnknownFormat,
  #[error("image is empty")]
  Empty,
  #[error("cannot decode {declared} image: {source}")]
  Decode {
    declared: RawImageFormat,
    #[source]
    source: image::ImageError,
  },
}

/// 声明的图像编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RawImageFormat {
  Jpeg,
  Png,
}

impl RawImageFormat {
  pub fn from_extension(ext: &str) -> Option<Self> {
    match ext.to_ascii_lowercase().as_str() {
      "jpg" | "jpeg" => Some(RawImageFormat::Jpeg),
      "png" => Some(RawImageFormat::Png),
      _ => None,
    }
  }

  fn image_format(self) -> ImageFormat {
    match self {
      RawImageFormat::Jpeg => ImageFormat::Jpeg,
      RawImageFormat::Png => ImageFormat::Png,
    }
  }
}

impl fmt::Display for RawImageFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RawImageFormat::Jpeg => f.write_str("JPEG"),
      RawImageFormat::Png => f.write_str("PNG"),
    }
  }
}

/// 一次分析请求的原始图像字节，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
  bytes: Box<[u8]>,
  format: RawImageFormat,
}

impl RawImage {
  pub fn new(bytes: impl Into<Box<[u8]>>, format: RawImageFormat) -> Self {
    Self {
      bytes: bytes.into(),
      format,
    }
  }

  /// 根据文件头判断编码
  pub fn sniff(bytes: impl Into<Box<[u8]>>) -> Result<Self, UnsupportedFormatError> {
    let bytes = bytes.into();
    if bytes.is_empty() {
      return Err(UnsupportedFormatError::Empty);
    }
    let format = match image::guess_format(&bytes) {
      Ok(ImageFormat::Jpeg) => RawImageFormat::Jpeg,
      Ok(ImageFormat::Png) => RawImageFormat::Png,
      _ => return Err(UnsupportedFormatError::UnknownFormat),
    };
    Ok(Self { bytes, format })
  }

  pub fn format(&self) -> RawImageFormat {
    self.format
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// 解码为 RGB 图像，丢弃 alpha 通道
  pub fn decode(&self) -> Result<RgbImage, UnsupportedFormatError> {
    if self.bytes.is_empty() {
      return Err(UnsupportedFormatError::Empty);
    }

    let image = image::load_from_memory_with_format(&self.bytes, self.format.image_format())
      .map_err(|source| UnsupportedFormatError::Decode {
        declared: self.format,
        source,
      })?;
    debug!(
      "解码 {} 图像: {}x{}, 颜色类型 {:?}",
      self.format,
      image.width(),
      image.height(),
      image.color()
    );
    Ok(image.to_rgb8())
  }
}
