// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/config.rs - 阈值与判定配置
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

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
  #[error("threshold {0} is outside [0, 1]")]
  OutOfRange(f64),
  #[error("threshold is not a number")]
  NotANumber,
  #[error("cannot parse threshold '{0}'")]
  Parse(String),
}

/// 置信度阈值，取值范围 [0, 1]。
///
/// 越界值在构造时直接拒绝，不做截断。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f64);

impl Threshold {
  pub const ZERO: Threshold = Threshold(0.0);
  pub const ONE: Threshold = Threshold(1.0);

  pub fn new(value: f64) -> Result<Self, ThresholdError> {
    if value.is_nan() {
      return Err(ThresholdError::NotANumber);
    }
    if !(0.0..=1.0).contains(&value) {
      return Err(ThresholdError::OutOfRange(value));
    }
    Ok(Threshold(value))
  }

  pub fn value(self) -> f64 {
    self.0
  }

  /// `confidence >= threshold`
  pub fn admits(self, confidence: f64) -> bool {
    confidence >= self.0
  }

  /// 按检测器输出的 `f32` 精度比较，`0.7f32` 可通过阈值 `0.7`
  pub fn admits_f32(self, confidence: f32) -> bool {
    confidence >= self.0 as f32
  }
}

impl TryFrom<f64> for Threshold {
  type Error = ThresholdError;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    Threshold::new(value)
  }
}

impl FromStr for Threshold {
  type Err = ThresholdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value: f64 = s
      .trim()
      .parse()
      .map_err(|_| ThresholdError::Parse(s.to_string()))?;
    Threshold::new(value)
  }
}

impl fmt::Display for Threshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// 两种模型各自独立的阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdConfig {
  pub detection: Threshold,
  pub classification: Threshold,
}

impl ThresholdConfig {
  pub fn new(detection: f64, classification: f64) -> Result<Self, ThresholdError> {
    Ok(ThresholdConfig {
      detection: Threshold::new(detection)?,
      classification: Threshold::new(classification)?,
    })
  }
}

/// 单 sigmoid 输出所代表的类别。
///
/// 训练时的标签编码无法从模型本身得知，需要按部署配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigmoidPolarity {
  /// sigmoid 输出是类别 1 的概率
  #[default]
  PositiveIsClassOne,
  /// sigmoid 输出是类别 0 的概率
  PositiveIsClassZero,
}

impl SigmoidPolarity {
  /// 将 sigmoid 输出换算为类别 1 的概率
  pub fn class_one_probability(self, p: f64) -> f64 {
    match self {
      SigmoidPolarity::PositiveIsClassOne => p,
      SigmoidPolarity::PositiveIsClassZero => 1.0 - p,
    }
  }

  pub fn from_class_index(index: u8) -> Option<Self> {
    match index {
      0 => Some(SigmoidPolarity::PositiveIsClassZero),
      1 => Some(SigmoidPolarity::PositiveIsClassOne),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_accepts_closed_unit_interval() {
    assert!(Threshold::new(0.0).is_ok());
    assert!(Threshold::new(1.0).is_ok());
    assert!(Threshold::new(0.85).is_ok());
  }

  #[test]
  fn threshold_rejects_out_of_range_and_nan() {
    assert_eq!(Threshold::new(-0.01), Err(ThresholdError::OutOfRange(-0.01)));
    assert_eq!(Threshold::new(1.5), Err(ThresholdError::OutOfRange(1.5)));
    assert_eq!(Threshold::new(f64::NAN), Err(ThresholdError::NotANumber));
    assert!(Threshold::new(f64::INFINITY).is_err());
  }

  #[test]
  fn threshold_parses_from_cli_text() {
    let t: Threshold = " 0.5 ".parse().unwrap();
    assert_eq!(t.value(), 0.5);
    assert!("abc".parse::<Threshold>().is_err());
    assert!("2".parse::<Threshold>().is_err());
  }

  #[test]
  fn admits_is_inclusive() {
    let t = Threshold::new(0.5).unwrap();
    assert!(t.admits(0.5));
    assert!(!t.admits(0.4999));
  }

  #[test]
  fn admits_f32_compares_at_detector_precision() {
    for value in [0.3, 0.7, 0.9] {
      let t = Threshold::new(value).unwrap();
      assert!(t.admits_f32(value as f32));
    }
    assert!(!Threshold::new(0.7).unwrap().admits_f32(0.69));
  }

  #[test]
  fn polarity_maps_to_class_one_probability() {
    assert_eq!(SigmoidPolarity::PositiveIsClassOne.class_one_probability(0.2), 0.2);
    assert_eq!(SigmoidPolarity::PositiveIsClassZero.class_one_probability(0.25), 0.75);
    assert_eq!(SigmoidPolarity::from_class_index(2), None);
  }
}
