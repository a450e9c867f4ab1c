// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/model/recorded.rs - 回放已记录的模型输出
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

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{PreprocessedTensor, TargetShape},
  model::{ClassNames, InvalidOutputShapeError, Model, ModelInfo, RawBox},
};

#[derive(Error, Debug)]
pub enum RecordedModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型记录格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入尺寸不匹配: 模型期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error(transparent)]
  InvalidOutput(#[from] InvalidOutputShapeError),
}

#[derive(Deserialize)]
struct DetectorRecord {
  input_shape: TargetShape,
  #[serde(default)]
  names: Option<ClassNames>,
  boxes: Vec<RawBox>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifierRecordOutput {
  Flat(Vec<f64>),
  Batched(Vec<Vec<f64>>),
}

#[derive(Deserialize)]
struct ClassifierRecord {
  input_shape: TargetShape,
  #[serde(default)]
  names: Option<ClassNames>,
  output: ClassifierRecordOutput,
}

fn check_scheme(url: &Url, scheme: &str) -> Result<PathBuf, RecordedModelError> {
  if url.scheme() != scheme {
    return Err(RecordedModelError::ModelPathError(format!(
      "模型路径必须使用 {} 方案",
      scheme
    )));
  }
  Ok(PathBuf::from(url.path()))
}

fn check_input(
  expected: TargetShape,
  input: &PreprocessedTensor,
) -> Result<(), RecordedModelError> {
  let actual = input.target_shape();
  if actual != expected {
    error!("输入尺寸不匹配: 期望 {:?}, 实际 {:?}", expected, actual);
    return Err(RecordedModelError::InputShapeMismatch {
      expected: expected.into(),
      actual: actual.into(),
    });
  }
  Ok(())
}

/// 回放一次检测器运行记录的检测器
#[derive(Debug, Clone)]
pub struct RecordedDetector {
  input_shape: TargetShape,
  names: Option<ClassNames>,
  boxes: Vec<RawBox>,
}

pub struct RecordedDetectorBuilder {
  record_path: PathBuf,
}

impl FromUrlWithScheme for RecordedDetectorBuilder {
  const SCHEME: &'static str = "recorded-detector";
}

impl FromUrl for RecordedDetectorBuilder {
  type Error = RecordedModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Ok(RecordedDetectorBuilder {
      record_path: check_scheme(url, Self::SCHEME)?,
    })
  }
}

impl RecordedDetectorBuilder {
  pub fn new(record_path: impl Into<PathBuf>) -> Self {
    Self {
      record_path: record_path.into(),
    }
  }

  pub fn build(self) -> Result<RecordedDetector, RecordedModelError> {
    info!("加载检测记录: {}", self.record_path.display());
    let text = std::fs::read_to_string(&self.record_path)?;
    let record: DetectorRecord = serde_json::from_str(&text)?;
    debug!(
      "检测记录: 输入尺寸 {:?}, {} 个原始框",
      record.input_shape,
      record.boxes.len()
    );
    Ok(RecordedDetector {
      input_shape: record.input_shape,
      names: record.names,
      boxes: record.boxes,
    })
  }
}

impl RecordedDetector {
  pub fn new(input_shape: TargetShape, boxes: Vec<RawBox>) -> Self {
    Self {
      input_shape,
      names: None,
      boxes,
    }
  }

  pub fn with_names(mut self, names: ClassNames) -> Self {
    self.names = Some(names);
    self
  }
}

impl ModelInfo for RecordedDetector {
  fn input_shape(&self) -> TargetShape {
    self.input_shape
  }

  fn class_names(&self) -> Option<&ClassNames> {
    self.names.as_ref()
  }
}

impl Model for RecordedDetector {
  type Input = PreprocessedTensor;
  type Output = Vec<RawBox>;
  type Error = RecordedModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    check_input(self.input_shape, input)?;
    debug!("回放 {} 个原始框", self.boxes.len());
    Ok(self.boxes.clone())
  }
}

/// 回放一次分类器运行记录的分类器
#[derive(Debug, Clone)]
pub struct RecordedClassifier {
  input_shape: TargetShape,
  names: Option<ClassNames>,
  output: Vec<f64>,
}

pub struct RecordedClassifierBuilder {
  record_path: PathBuf,
}

impl FromUrlWithScheme for RecordedClassifierBuilder {
  const SCHEME: &'static str = "recorded-classifier";
}

impl FromUrl for RecordedClassifierBuilder {
  type Error = RecordedModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    Ok(RecordedClassifierBuilder {
      record_path: check_scheme(url, Self::SCHEME)?,
    })
  }
}

impl RecordedClassifierBuilder {
  pub fn new(record_path: impl Into<PathBuf>) -> Self {
    Self {
      record_path: record_path.into(),
    }
  }

  pub fn build(self) -> Result<RecordedClassifier, RecordedModelError> {
    info!("加载分类记录: {}", self.record_path.display());
    let text = std::fs::read_to_string(&self.record_path)?;
    let record: ClassifierRecord = serde_json::from_str(&text)?;

    // predict() 的输出带有批维度 (1, K)
    let output = match record.output {
      ClassifierRecordOutput::Flat(values) => values,
      ClassifierRecordOutput::Batched(mut rows) => {
        if rows.len() != 1 {
          return Err(InvalidOutputShapeError::Batch(rows.len()).into());
        }
        rows.remove(0)
      }
    };
    debug!("分类记录: 输入尺寸 {:?}, 输出 {:?}", record.input_shape, output);

    Ok(RecordedClassifier {
      input_shape: record.input_shape,
      names: record.names,
      output,
    })
  }
}

impl RecordedClassifier {
  pub fn new(input_shape: TargetShape, output: Vec<f64>) -> Self {
    Self {
      input_shape,
      names: None,
      output,
    }
  }

  pub fn with_names(mut self, names: ClassNames) -> Self {
    self.names = Some(names);
    self
  }
}

impl ModelInfo for RecordedClassifier {
  fn input_shape(&self) -> TargetShape {
    self.input_shape
  }

  fn class_names(&self) -> Option<&ClassNames> {
    self.names.as_ref()
  }
}

impl Model for RecordedClassifier {
  type Input = PreprocessedTensor;
  type Output = Vec<f64>;
  type Error = RecordedModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    check_input(self.input_shape, input)?;
    Ok(self.output.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tensor(height: u32, width: u32) -> PreprocessedTensor {
    let shape = TargetShape::new(height, width).unwrap();
    let len = 3 * height as usize * width as usize;
    PreprocessedTensor::from_vec(shape, vec![0.0; len]).unwrap()
  }

  fn write_record(text: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("record.json");
    std::fs::write(&path, text).unwrap();
    (dir, path)
  }

  #[test]
  fn detector_record_replays_boxes() {
    let (_dir, path) = write_record(
      r#"{
        "input_shape": [4, 4],
        "names": ["hotdog"],
        "boxes": [{"class_id": 0, "confidence": 0.9, "bbox": [1, 2, 3, 4]}]
      }"#,
    );
    let detector = RecordedDetectorBuilder::new(path).build().unwrap();
    let input = tensor(4, 4);

    let boxes = detector.infer(&input).unwrap();
    assert_eq!(boxes, vec![RawBox::new(0, 0.9, [1.0, 2.0, 3.0, 4.0])]);
    assert_eq!(detector.class_names().unwrap().get(0), Ok("hotdog"));
  }

  #[test]
  fn classifier_record_strips_batch_dimension() {
    let (_dir, path) = write_record(r#"{"input_shape": [2, 2], "output": [[0.3, 0.7]]}"#);
    let classifier = RecordedClassifierBuilder::new(path).build().unwrap();
    let input = tensor(2, 2);
    assert_eq!(classifier.infer(&input).unwrap(), vec![0.3, 0.7]);
  }

  #[test]
  fn classifier_record_rejects_multi_batch() {
    let (_dir, path) = write_record(r#"{"input_shape": [2, 2], "output": [[0.3], [0.7]]}"#);
    assert!(matches!(
      RecordedClassifierBuilder::new(path).build(),
      Err(RecordedModelError::InvalidOutput(InvalidOutputShapeError::Batch(2)))
    ));
  }

  #[test]
  fn input_shape_is_checked() {
    let classifier = RecordedClassifier::new(TargetShape::new(2, 2).unwrap(), vec![0.5]);
    let input = tensor(1, 1);
    assert!(matches!(
      classifier.infer(&input),
      Err(RecordedModelError::InputShapeMismatch { .. })
    ));
  }

  #[test]
  fn builder_checks_scheme() {
    let url = Url::parse("yolo26:///model.rknn").unwrap();
    assert!(RecordedDetectorBuilder::from_url(&url).is_err());
    let url = Url::parse("recorded-classifier:///tmp/cls.json").unwrap();
    assert!(RecordedClassifierBuilder::from_url(&url).is_ok());
  }
}
