// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/model.rs - 模型边界
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::{PreprocessedTensor, TargetShape};

mod labels;
mod recorded;

pub use self::labels::{ClassNames, LabelFileError, UnknownClassError};
pub use self::recorded::{
  RecordedClassifier, RecordedClassifierBuilder, RecordedDetector, RecordedDetectorBuilder,
  RecordedModelError,
};

/// 已加载的模型。推理只读，可被多次调用
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 模型声明的输入尺寸与内置类别名
pub trait ModelInfo {
  fn input_shape(&self) -> TargetShape;

  fn class_names(&self) -> Option<&ClassNames> {
    None
  }
}

/// 检测器：张量输入，原始框列表输出
pub trait Detector: Model<Input = PreprocessedTensor, Output = Vec<RawBox>> + ModelInfo {}

impl<M> Detector for M where
  M: Model<Input = PreprocessedTensor, Output = Vec<RawBox>> + ModelInfo
{
}

/// 分类器：张量输入，一维原始输出向量
pub trait Classifier: Model<Input = PreprocessedTensor, Output = Vec<f64>> + ModelInfo {}

impl<M> Classifier for M where
  M: Model<Input = PreprocessedTensor, Output = Vec<f64>> + ModelInfo
{
}

/// 检测器的单个原始输出框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBox {
  pub class_id: u32,
  pub confidence: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl RawBox {
  pub fn new(class_id: u32, confidence: f32, bbox: [f32; 4]) -> Self {
    Self {
      class_id,
      confidence,
      bbox,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidOutputShapeError {
  #[error("model could not produce a valid prediction: output is empty")]
  Empty,
  #[error("model could not produce a valid prediction: output[{index}] is {value}")]
  NonFinite { index: usize, value: f64 },
  #[error("model could not produce a valid prediction: expected a batch of 1, got {0}")]
  Batch(usize),
  #[error("model could not produce a valid prediction: sigmoid output {0} is outside [0, 1]")]
  SigmoidOutOfRange(f64),
}

/// 分类器输出头的类型，由输出长度在模型边界处确定
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutput {
  /// 单 sigmoid 输出
  Binary(f64),
  /// softmax 概率向量，长度 K >= 2
  Multiclass(Vec<f64>),
}

impl ClassifierOutput {
  pub fn from_raw(raw: &[f64]) -> Result<Self, InvalidOutputShapeError> {
    if let Some((index, &value)) = raw.iter().enumerate().find(|(_, v)| !v.is_finite()) {
      return Err(InvalidOutputShapeError::NonFinite { index, value });
    }

    match raw {
      [] => Err(InvalidOutputShapeError::Empty),
      [p] => Self::binary(*p),
      _ => Ok(ClassifierOutput::Multiclass(raw.to_vec())),
    }
  }

  /// 单 sigmoid 输出必须是 [0, 1] 内的概率，未经 sigmoid 的 logit 被拒绝
  pub fn binary(p: f64) -> Result<Self, InvalidOutputShapeError> {
    if !(0.0..=1.0).contains(&p) {
      return Err(InvalidOutputShapeError::SigmoidOutOfRange(p));
    }
    Ok(ClassifierOutput::Binary(p))
  }
}
