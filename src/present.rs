// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/present.rs - 判定结果展示
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

use serde::Serialize;

use crate::{
  model::ClassNames,
  postprocess::{ClassificationResult, Detection},
};

pub const DEFAULT_NEGATIVE_MESSAGE: &str = "No objects detected.";

/// 百分比，保留两位小数
pub fn format_percent(value: f64) -> String {
  format!("{:.2}%", value * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionLine {
  pub label: String,
  pub confidence_percent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionPayload {
  pub count: usize,
  pub detections: Vec<DetectionLine>,
  /// 没有检测到目标是成功的结果，不是错误
  pub empty_is_success: bool,
  pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassLine {
  pub label: String,
  pub probability: f64,
  pub confidence_percent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationPayload {
  pub predicted_label: String,
  pub confidence_percent: String,
  pub accepted: bool,
  /// 拒绝时不展示各类别概率
  pub per_class: Option<Vec<ClassLine>>,
  pub rejection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationPayload {
  Detection(DetectionPayload),
  Classification(ClassificationPayload),
}

/// 待展示的判定
#[derive(Debug, Clone, Copy)]
pub enum Decision<'a> {
  Detections(&'a [Detection]),
  Classification(&'a ClassificationResult),
}

impl<'a> From<&'a [Detection]> for Decision<'a> {
  fn from(detections: &'a [Detection]) -> Self {
    Decision::Detections(detections)
  }
}

impl<'a> From<&'a Vec<Detection>> for Decision<'a> {
  fn from(detections: &'a Vec<Detection>) -> Self {
    Decision::Detections(detections.as_slice())
  }
}

impl<'a> From<&'a ClassificationResult> for Decision<'a> {
  fn from(result: &'a ClassificationResult) -> Self {
    Decision::Classification(result)
  }
}

pub struct DecisionPresenter {
  class_names: ClassNames,
  negative_message: String,
}

impl Default for DecisionPresenter {
  fn default() -> Self {
    Self::new(ClassNames::default())
  }
}

impl DecisionPresenter {
  pub fn new(class_names: ClassNames) -> Self {
    Self {
      class_names,
      negative_message: DEFAULT_NEGATIVE_MESSAGE.to_string(),
    }
  }

  pub fn with_negative_message(mut self, message: impl Into<String>) -> Self {
    self.negative_message = message.into();
    self
  }

  pub fn present<'a>(&self, decision: impl Into<Decision<'a>>) -> PresentationPayload {
    match decision.into() {
      Decision::Detections(detections) => {
        PresentationPayload::Detection(self.present_detections(detections))
      }
      Decision::Classification(result) => {
        PresentationPayload::Classification(self.present_classification(result))
      }
    }
  }

  pub fn present_detections(&self, detections: &[Detection]) -> DetectionPayload {
    let lines = detections
      .iter()
      .map(|d| DetectionLine {
        label: d.class_label.clone(),
        confidence_percent: format_percent(d.confidence as f64),
      })
      .collect::<Vec<_>>();
    let empty = lines.is_empty();

    DetectionPayload {
      count: lines.len(),
      detections: lines,
      empty_is_success: empty,
      message: empty.then(|| self.negative_message.clone()),
    }
  }

  pub fn present_classification(&self, result: &ClassificationResult) -> ClassificationPayload {
    let predicted_label = self
      .class_names
      .label_or_index(result.predicted_index)
      .into_owned();
    let confidence_percent = format_percent(result.predicted_confidence);

    if !result.accepted {
      let rejection = format!(
        "top confidence {} is below the acceptance threshold {}",
        confidence_percent,
        format_percent(result.threshold.value())
      );
      return ClassificationPayload {
        predicted_label,
        confidence_percent,
        accepted: false,
        per_class: None,
        rejection: Some(rejection),
      };
    }

    let per_class = result
      .distribution
      .iter()
      .map(|(index, probability)| ClassLine {
        label: self.class_names.label_or_index(index).into_owned(),
        probability,
        confidence_percent: format_percent(probability),
      })
      .collect();

    ClassificationPayload {
      predicted_label,
      confidence_percent,
      accepted: true,
      per_class: Some(per_class),
      rejection: None,
    }
  }
}

impl fmt::Display for PresentationPayload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PresentationPayload::Detection(payload) => {
        if let Some(message) = &payload.message {
          return writeln!(f, "{}", message);
        }
        writeln!(f, "Detected {} object(s)", payload.count)?;
        for (i, line) in payload.detections.iter().enumerate() {
          writeln!(f, "  Object {}: {} ({})", i + 1, line.label, line.confidence_percent)?;
        }
        Ok(())
      }
      PresentationPayload::Classification(payload) => {
        writeln!(
          f,
          "Predicted: {} ({})",
          payload.predicted_label, payload.confidence_percent
        )?;
        match (&payload.per_class, &payload.rejection) {
          (_, Some(rejection)) => writeln!(f, "Rejected: {}", rejection),
          (Some(per_class), None) => {
            writeln!(f, "Accepted")?;
            for line in per_class {
              writeln!(f, "  {}: {:.4}", line.label, line.probability)?;
            }
            Ok(())
          }
          (None, None) => writeln!(f, "Accepted"),
        }
      }
    }
  }
}
