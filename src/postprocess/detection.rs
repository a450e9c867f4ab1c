// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/postprocess/detection.rs - 检测结果归一化
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
  config::Threshold,
  model::{ClassNames, RawBox},
};

pub const UNRECOGNIZED_CLASS_LABEL: &str = "unrecognized class";

/// 通过阈值的检测框
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub class_id: u32,
  pub class_label: String,
  /// `false` 表示类别编号没有对应名称，`class_label` 为占位符
  pub recognized: bool,
  pub confidence: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

/// 过滤低于阈值的框并映射类别名称，保持模型输出顺序
pub fn normalize_detections(
  raw_boxes: &[RawBox],
  class_names: &ClassNames,
  threshold: Threshold,
) -> Vec<Detection> {
  let detections = raw_boxes
    .iter()
    .filter(|raw| threshold.admits_f32(raw.confidence))
    .map(|raw| {
      let (class_label, recognized) = match class_names.get(raw.class_id) {
        Ok(name) => (name.to_string(), true),
        Err(e) => {
          warn!("{}, 使用占位名称", e);
          (UNRECOGNIZED_CLASS_LABEL.to_string(), false)
        }
      };
      Detection {
        class_id: raw.class_id,
        class_label,
        recognized,
        confidence: raw.confidence,
        bbox: raw.bbox,
      }
    })
    .collect::<Vec<_>>();

  debug!(
    "阈值 {}: {} 个原始框中保留 {} 个",
    threshold,
    raw_boxes.len(),
    detections.len()
  );
  detections
}
