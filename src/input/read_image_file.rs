// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

use super::{RawImage, RawImageFormat, UnsupportedFormatError};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error(transparent)]
  Unsupported(#[from] UnsupportedFormatError),
}

/// 从本地文件读取一张图像，作为单次请求的输入
pub struct ImageFileInput {
  image: Option<RawImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    info!("读取图像文件: {} ({} 字节)", path.display(), bytes.len());

    // 扩展名优先，无法识别时按文件头判断
    let image = match path
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(RawImageFormat::from_extension)
    {
      Some(format) => RawImage::new(bytes, format),
      None => RawImage::sniff(bytes)?,
    };

    Ok(ImageFileInput { image: Some(image) })
  }

  pub fn into_raw(mut self) -> Option<RawImage> {
    self.image.take()
  }
}

impl Iterator for ImageFileInput {
  type Item = RawImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::tests::png_bytes;
  use image::{ImageBuffer, Rgba, RgbaImage};

  #[test]
  fn reads_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.png");
    let image: RgbaImage = ImageBuffer::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
    std::fs::write(&path, png_bytes(&image)).unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file", "image", 1)).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();

    let raw = input.next().unwrap();
    assert_eq!(raw.format(), RawImageFormat::Png);
    assert!(input.next().is_none());
  }

  #[test]
  fn unknown_extension_falls_back_to_sniffing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.bin");
    std::fs::write(&path, b"plain text").unwrap();

    assert!(matches!(
      ImageFileInput::open(&path),
      Err(ImageFileInputError::Unsupported(UnsupportedFormatError::UnknownFormat))
    ));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("video:///tmp/a.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
