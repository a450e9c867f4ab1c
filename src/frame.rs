// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/frame.rs - NHWC 张量定义
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

use std::num::NonZeroU32;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("invalid target shape {height}x{width}: both sides must be positive")]
  InvalidShape { height: u32, width: u32 },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 模型输入尺寸 (height, width)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct TargetShape {
  height: NonZeroU32,
  width: NonZeroU32,
}

impl TargetShape {
  pub fn new(height: u32, width: u32) -> Result<Self, FrameError> {
    match (NonZeroU32::new(height), NonZeroU32::new(width)) {
      (Some(height), Some(width)) => Ok(TargetShape { height, width }),
      _ => Err(FrameError::InvalidShape { height, width }),
    }
  }

  pub fn height(&self) -> u32 {
    self.height.get()
  }

  pub fn width(&self) -> u32 {
    self.width.get()
  }

  fn len(&self) -> usize {
    RGB_CHANNELS * self.height() as usize * self.width() as usize
  }
}

impl TryFrom<(u32, u32)> for TargetShape {
  type Error = FrameError;

  fn try_from((height, width): (u32, u32)) -> Result<Self, Self::Error> {
    TargetShape::new(height, width)
  }
}

impl From<TargetShape> for (u32, u32) {
  fn from(shape: TargetShape) -> Self {
    (shape.height(), shape.width())
  }
}

/// 批大小为 1 的 NHWC 浮点张量，数值位于 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor {
  shape: TargetShape,
  data: Box<[f32]>,
}

impl PreprocessedTensor {
  pub fn from_vec(shape: TargetShape, data: Vec<f32>) -> Result<Self, FrameError> {
    if data.len() != shape.len() {
      return Err(FrameError::LengthMismatch {
        expected: shape.len(),
        actual: data.len(),
      });
    }

    Ok(Self {
      shape,
      data: data.into_boxed_slice(),
    })
  }

  /// 由已缩放到目标尺寸的 RGB 图像构造，逐元素除以 255
  pub(crate) fn from_resized(shape: TargetShape, image: &RgbImage) -> Self {
    debug_assert_eq!(image.dimensions(), (shape.width(), shape.height()));
    let data = image
      .as_raw()
      .iter()
      .map(|&value| value as f32 / 255.0)
      .collect::<Vec<_>>();
    Self {
      shape,
      data: data.into_boxed_slice(),
    }
  }

  pub fn target_shape(&self) -> TargetShape {
    self.shape
  }

  /// `[N, H, W, C]`
  pub fn dims(&self) -> [usize; 4] {
    [
      1,
      self.shape.height() as usize,
      self.shape.width() as usize,
      RGB_CHANNELS,
    ]
  }

  pub fn height(&self) -> usize {
    self.shape.height() as usize
  }

  pub fn width(&self) -> usize {
    self.shape.width() as usize
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, h: usize, w: usize, c: usize) -> Option<f32> {
    if h >= self.height() || w >= self.width() || c >= RGB_CHANNELS {
      return None;
    }
    let index = (h * self.width() + w) * RGB_CHANNELS + c;
    self.data.get(index).copied()
  }
}
