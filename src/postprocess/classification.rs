// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/postprocess/classification.rs - 分类结果归一化与判定
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

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
  config::{SigmoidPolarity, Threshold},
  model::{ClassifierOutput, InvalidOutputShapeError},
};

pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// 按类别编号排列的概率分布
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassDistribution(Vec<f64>);

impl ClassDistribution {
  pub fn probabilities(&self) -> &[f64] {
    &self.0
  }

  pub fn get(&self, index: usize) -> Option<f64> {
    self.0.get(index).copied()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
    self.0.iter().copied().enumerate()
  }

  pub fn sum(&self) -> f64 {
    self.0.iter().sum()
  }

  pub fn is_normalized(&self) -> bool {
    (self.sum() - 1.0).abs() <= DISTRIBUTION_TOLERANCE
  }

  /// 最大值及其编号，并列时取最小编号
  pub fn argmax(&self) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in self.iter() {
      match best {
        Some((_, top)) if value <= top => {}
        _ => best = Some((index, value)),
      }
    }
    best
  }
}

/// 单次分类请求的判定结果，构造后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
  pub distribution: ClassDistribution,
  pub predicted_index: usize,
  pub predicted_confidence: f64,
  pub accepted: bool,
  pub threshold: Threshold,
}

fn normalize_classifier_output(
  output: &ClassifierOutput,
  threshold: Threshold,
  polarity: SigmoidPolarity,
) -> ClassificationResult {
  let (distribution, predicted_index, predicted_confidence) = match output {
    ClassifierOutput::Binary(p) => {
      let q = polarity.class_one_probability(*p);
      // p == 0.5 归为类别 0
      let predicted_index = if q > 0.5 { 1 } else { 0 };
      let distribution = ClassDistribution(vec![1.0 - q, q]);
      (distribution, predicted_index, q.max(1.0 - q))
    }
    ClassifierOutput::Multiclass(values) => {
      let distribution = ClassDistribution(values.clone());
      if !distribution.is_normalized() {
        warn!(
          "多分类输出之和为 {}, 不是概率分布, 按原样使用",
          distribution.sum()
        );
      }
      let (predicted_index, predicted_confidence) = distribution.argmax().unwrap_or((0, 0.0));
      (distribution, predicted_index, predicted_confidence)
    }
  };

  let accepted = threshold.admits(predicted_confidence);
  debug!(
    "预测类别 {}, 置信度 {:.4}, 阈值 {}, {}",
    predicted_index,
    predicted_confidence,
    threshold,
    if accepted { "接受" } else { "拒绝" }
  );

  ClassificationResult {
    distribution,
    predicted_index,
    predicted_confidence,
    accepted,
    threshold,
  }
}

/// 原始输出向量: 长度 1 为 sigmoid, 长度 K >= 2 为 softmax。
///
/// sigmoid 输出必须位于 [0, 1]，否则返回 `SigmoidOutOfRange`；
/// softmax 向量不要求和为 1，按原样使用并记录警告。
pub fn normalize_classification(
  raw_output: &[f64],
  threshold: Threshold,
  polarity: SigmoidPolarity,
) -> Result<ClassificationResult, InvalidOutputShapeError> {
  let output = ClassifierOutput::from_raw(raw_output)?;
  Ok(normalize_classifier_output(&output, threshold, polarity))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(value: f64) -> Threshold {
    Threshold::new(value).unwrap()
  }

  fn classify(raw: &[f64], threshold: f64) -> ClassificationResult {
    normalize_classification(raw, t(threshold), SigmoidPolarity::default()).unwrap()
  }

  #[test]
  fn confident_sigmoid_is_accepted() {
    let result = classify(&[0.92], 0.85);
    assert_eq!(result.predicted_index, 1);
    assert!((result.predicted_confidence - 0.92).abs() < 1e-12);
    assert!(result.accepted);
    assert!((result.distribution.get(0).unwrap() - 0.08).abs() < 1e-12);
    assert_eq!(result.distribution.get(1), Some(0.92));
  }

  #[test]
  fn low_sigmoid_predicts_class_zero() {
    let result = classify(&[0.1], 0.85);
    assert_eq!(result.predicted_index, 0);
    assert!((result.predicted_confidence - 0.9).abs() < 1e-12);
    assert!(result.accepted);
  }

  #[test]
  fn sigmoid_tie_resolves_to_class_zero() {
    let result = classify(&[0.5], 0.0);
    assert_eq!(result.predicted_index, 0);
    assert_eq!(result.predicted_confidence, 0.5);
  }

  #[test]
  fn sigmoid_distribution_sums_to_one() {
    for step in 0..=1000 {
      let p = step as f64 / 1000.0;
      let result = classify(&[p], 0.5);
      assert!((result.distribution.sum() - 1.0).abs() <= DISTRIBUTION_TOLERANCE);
      assert_eq!(
        result.distribution.get(result.predicted_index),
        Some(result.predicted_confidence)
      );
    }
  }

  #[test]
  fn flipped_polarity_swaps_classes() {
    let result =
      normalize_classification(&[0.92], t(0.85), SigmoidPolarity::PositiveIsClassZero).unwrap();
    assert_eq!(result.predicted_index, 0);
    assert!((result.predicted_confidence - 0.92).abs() < 1e-12);
    assert!((result.distribution.get(1).unwrap() - 0.08).abs() < 1e-12);

    let tie =
      normalize_classification(&[0.5], t(0.0), SigmoidPolarity::PositiveIsClassZero).unwrap();
    assert_eq!(tie.predicted_index, 0);
  }

  #[test]
  fn unconfident_softmax_is_rejected() {
    let result = classify(&[0.3, 0.7], 0.85);
    assert_eq!(result.predicted_index, 1);
    assert_eq!(result.predicted_confidence, 0.7);
    assert!(!result.accepted);
    assert_eq!(result.distribution.probabilities(), &[0.3, 0.7]);
  }

  #[test]
  fn softmax_argmax_leaves_distribution_unchanged() {
    let raw = [0.1, 0.05, 0.6, 0.25];
    let result = classify(&raw, 0.5);
    assert_eq!(result.predicted_index, 2);
    assert_eq!(result.distribution.probabilities(), &raw);
    assert!(result.distribution.is_normalized());
  }

  #[test]
  fn argmax_tie_picks_lowest_index() {
    let result = classify(&[0.2, 0.4, 0.4], 0.0);
    assert_eq!(result.predicted_index, 1);

    let result = classify(&[0.5, 0.5], 0.0);
    assert_eq!(result.predicted_index, 0);
  }

  #[test]
  fn raw_logits_are_not_renormalized() {
    let raw = [2.0, -1.0, 0.5];
    let result = classify(&raw, 0.9);
    assert_eq!(result.distribution.probabilities(), &raw);
    assert!(!result.distribution.is_normalized());
    assert_eq!(result.predicted_index, 0);
    assert_eq!(result.predicted_confidence, 2.0);
  }

  #[test]
  fn threshold_is_inclusive() {
    assert!(classify(&[0.3, 0.7], 0.7).accepted);
    assert!(!classify(&[0.3, 0.7], 0.70001).accepted);
  }

  #[test]
  fn normalize_is_idempotent() {
    for raw in [vec![0.92], vec![0.3, 0.7], vec![0.25, 0.25, 0.5]] {
      assert_eq!(classify(&raw, 0.6), classify(&raw, 0.6));
    }
  }

  #[test]
  fn empty_output_fails() {
    assert_eq!(
      normalize_classification(&[], t(0.5), SigmoidPolarity::default()),
      Err(InvalidOutputShapeError::Empty)
    );
  }

  #[test]
  fn nan_output_fails() {
    let result = normalize_classification(&[f64::NAN, 0.5], t(0.5), SigmoidPolarity::default());
    assert!(result.is_err());
  }

  #[test]
  fn sigmoid_logit_is_rejected_not_accepted() {
    assert_eq!(
      normalize_classification(&[-2.3], t(0.99), SigmoidPolarity::default()),
      Err(InvalidOutputShapeError::SigmoidOutOfRange(-2.3))
    );
    assert_eq!(
      normalize_classification(&[3.3], t(0.5), SigmoidPolarity::PositiveIsClassZero),
      Err(InvalidOutputShapeError::SigmoidOutOfRange(3.3))
    );
  }
}
