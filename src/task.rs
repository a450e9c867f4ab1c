// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/task.rs - 单次分析请求
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

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
  config::{SigmoidPolarity, ThresholdConfig},
  input::{ImagePreprocessor, RawImage, UnsupportedFormatError},
  model::{ClassNames, Classifier, Detector, InvalidOutputShapeError},
  postprocess::{ClassificationResult, Detection, normalize_classification, normalize_detections},
  present::{Decision, DecisionPresenter, PresentationPayload},
};

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum AnalysisError {
  #[error(transparent)]
  UnsupportedFormat(#[from] UnsupportedFormatError),
  #[error(transparent)]
  InvalidOutputShape(#[from] InvalidOutputShapeError),
  #[error("模型推理错误: {0}")]
  Model(#[source] BoxedError),
}

/// 一次分析所需的全部上下文，按值传入
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
  pub image: RawImage,
  pub thresholds: ThresholdConfig,
  pub polarity: SigmoidPolarity,
  /// 覆盖模型自带的类别名
  pub class_names: Option<ClassNames>,
  pub negative_message: Option<String>,
}

impl AnalysisRequest {
  pub fn new(image: RawImage, thresholds: ThresholdConfig) -> Self {
    Self {
      image,
      thresholds,
      polarity: SigmoidPolarity::default(),
      class_names: None,
      negative_message: None,
    }
  }

  pub fn with_polarity(mut self, polarity: SigmoidPolarity) -> Self {
    self.polarity = polarity;
    self
  }

  pub fn with_class_names(mut self, class_names: ClassNames) -> Self {
    self.class_names = Some(class_names);
    self
  }

  pub fn with_negative_message(mut self, message: impl Into<String>) -> Self {
    self.negative_message = Some(message.into());
    self
  }

  fn presenter(&self, model_names: Option<&ClassNames>) -> (ClassNames, DecisionPresenter) {
    let names = self
      .class_names
      .clone()
      .or_else(|| model_names.cloned())
      .unwrap_or_default();
    let mut presenter = DecisionPresenter::new(names.clone());
    if let Some(message) = &self.negative_message {
      presenter = presenter.with_negative_message(message.clone());
    }
    (names, presenter)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum DecisionRecord {
  Detections(Vec<Detection>),
  Classification(ClassificationResult),
}

impl<'a> From<&'a DecisionRecord> for Decision<'a> {
  fn from(record: &'a DecisionRecord) -> Self {
    match record {
      DecisionRecord::Detections(detections) => Decision::Detections(detections),
      DecisionRecord::Classification(result) => Decision::Classification(result),
    }
  }
}

/// 分析结果：原图、判定与展示数据
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
  pub source: RgbImage,
  pub decision: DecisionRecord,
  pub payload: PresentationPayload,
}

pub trait Task<M>: Sized {
  type Error;
  fn run_task(self, model: &M) -> Result<AnalysisOutcome, Self::Error>;
}

pub struct DetectionTask {
  request: AnalysisRequest,
  preprocessor: ImagePreprocessor,
}

impl DetectionTask {
  pub fn new(request: AnalysisRequest) -> Self {
    Self {
      request,
      preprocessor: ImagePreprocessor::default(),
    }
  }
}

impl<M> Task<M> for DetectionTask
where
  M: Detector,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = AnalysisError;

  fn run_task(self, model: &M) -> Result<AnalysisOutcome, Self::Error> {
    info!("开始检测任务...");
    let source = self.request.image.decode()?;
    let tensor = self.preprocessor.prepare_rgb(&source, model.input_shape());

    let now = std::time::Instant::now();
    let raw_boxes = model
      .infer(&tensor)
      .map_err(|e| AnalysisError::Model(Box::new(e)))?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let (names, presenter) = self.request.presenter(model.class_names());
    let detections = normalize_detections(&raw_boxes, &names, self.request.thresholds.detection);
    info!("检测到 {} 个对象", detections.len());

    let decision = DecisionRecord::Detections(detections);
    let payload = presenter.present(&decision);
    Ok(AnalysisOutcome {
      source,
      decision,
      payload,
    })
  }
}

pub struct ClassificationTask {
  request: AnalysisRequest,
  preprocessor: ImagePreprocessor,
}

impl ClassificationTask {
  pub fn new(request: AnalysisRequest) -> Self {
    Self {
      request,
      preprocessor: ImagePreprocessor::default(),
    }
  }
}

impl<M> Task<M> for ClassificationTask
where
  M: Classifier,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = AnalysisError;

  fn run_task(self, model: &M) -> Result<AnalysisOutcome, Self::Error> {
    info!("开始分类任务...");
    let source = self.request.image.decode()?;
    let tensor = self.preprocessor.prepare_rgb(&source, model.input_shape());

    let now = std::time::Instant::now();
    let raw_output = model
      .infer(&tensor)
      .map_err(|e| AnalysisError::Model(Box::new(e)))?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let result = normalize_classification(
      &raw_output,
      self.request.thresholds.classification,
      self.request.polarity,
    )?;
    info!(
      "预测类别 {} ({:.2}%), {}",
      result.predicted_index,
      result.predicted_confidence * 100.0,
      if result.accepted { "接受" } else { "拒绝" }
    );

    let (_, presenter) = self.request.presenter(model.class_names());
    let decision = DecisionRecord::Classification(result);
    let payload = presenter.present(&decision);
    Ok(AnalysisOutcome {
      source,
      decision,
      payload,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    frame::TargetShape,
    input::{RawImageFormat, tests::png_bytes},
    model::{RawBox, RecordedClassifier, RecordedDetector},
  };
  use image::{ImageBuffer, Rgba, RgbaImage};

  fn request() -> AnalysisRequest {
    let image: RgbaImage = ImageBuffer::from_pixel(8, 6, Rgba([200, 100, 50, 255]));
    AnalysisRequest::new(
      RawImage::new(png_bytes(&image), RawImageFormat::Png),
      ThresholdConfig::new(0.5, 0.85).unwrap(),
    )
  }

  #[test]
  fn detection_task_filters_and_presents() {
    let detector = RecordedDetector::new(
      TargetShape::new(4, 4).unwrap(),
      vec![
        RawBox::new(0, 0.9, [0.0, 0.0, 2.0, 2.0]),
        RawBox::new(1, 0.4, [1.0, 1.0, 3.0, 3.0]),
      ],
    )
    .with_names(ClassNames::from_list(["hotdog", "bun"]));

    let outcome = DetectionTask::new(request()).run_task(&detector).unwrap();
    assert_eq!(outcome.source.dimensions(), (8, 6));
    match outcome.payload {
      PresentationPayload::Detection(p) => {
        assert_eq!(p.count, 1);
        assert_eq!(p.detections[0].label, "hotdog");
      }
      other => panic!("unexpected payload {:?}", other),
    }
  }

  #[test]
  fn request_names_override_model_names() {
    let classifier = RecordedClassifier::new(TargetShape::new(4, 4).unwrap(), vec![0.92])
      .with_names(ClassNames::from_list(["a", "b"]));
    let request = request().with_class_names(ClassNames::from_list(["cheetah", "hyena"]));

    let outcome = ClassificationTask::new(request).run_task(&classifier).unwrap();
    match outcome.payload {
      PresentationPayload::Classification(p) => {
        assert_eq!(p.predicted_label, "hyena");
        assert!(p.accepted);
      }
      other => panic!("unexpected payload {:?}", other),
    }
  }

  #[test]
  fn empty_classifier_output_fails_cleanly() {
    let classifier = RecordedClassifier::new(TargetShape::new(4, 4).unwrap(), Vec::new());
    assert!(matches!(
      ClassificationTask::new(request()).run_task(&classifier),
      Err(AnalysisError::InvalidOutputShape(InvalidOutputShapeError::Empty))
    ));
  }

  #[test]
  fn undecodable_image_fails_before_inference() {
    let classifier = RecordedClassifier::new(TargetShape::new(4, 4).unwrap(), vec![0.5]);
    let mut request = request();
    request.image = RawImage::new(b"broken".to_vec(), RawImageFormat::Jpeg);
    assert!(matches!(
      ClassificationTask::new(request).run_task(&classifier),
      Err(AnalysisError::UnsupportedFormat(_))
    ));
  }
}
