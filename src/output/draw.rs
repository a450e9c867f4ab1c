// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/output/draw.rs - 判定结果可视化
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

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  postprocess::{ClassificationResult, Detection},
  present::{PresentationPayload, format_percent},
  task::{AnalysisOutcome, DecisionRecord},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const PALETTE_SIZE: usize = 80;
const BORDER_THICKNESS: u32 = 2;
const ACCEPTED_COLOR: [u8; 3] = [0, 200, 0];
const REJECTED_COLOR: [u8; 3] = [220, 0, 0];
const UNRECOGNIZED_COLOR: [u8; 3] = [128, 128, 128];

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 在原图上绘制判定结果。未配置字体时只绘制边框
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色，循环使用
    let colors = (0..PALETTE_SIZE)
      .map(|i| hsv_to_rgb((i as f32 / PALETTE_SIZE as f32) * 360.0, 0.8, 0.9))
      .collect();

    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      colors,
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, FontError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    info!("加载字体文件: {}", path.display());
    Ok(self.with_font(font))
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn draw_outcome(&self, outcome: &AnalysisOutcome) -> RgbImage {
    let label = match &outcome.payload {
      PresentationPayload::Classification(payload) => Some(payload.predicted_label.as_str()),
      PresentationPayload::Detection(_) => None,
    };
    self.draw_decision(&outcome.source, &outcome.decision, label)
  }

  pub fn draw_decision(
    &self,
    source: &RgbImage,
    decision: &DecisionRecord,
    label: Option<&str>,
  ) -> RgbImage {
    let mut image = source.clone();
    match decision {
      DecisionRecord::Detections(detections) => self.draw_detections(&mut image, detections),
      DecisionRecord::Classification(result) => self.draw_verdict(&mut image, result, label),
    }
    image
  }

  pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection]) {
    debug!("绘制 {} 个检测框", detections.len());
    for detection in detections {
      let color = if detection.recognized {
        self.colors[detection.class_id as usize % self.colors.len()]
      } else {
        Rgb(UNRECOGNIZED_COLOR)
      };
      let label = format!(
        "{} {}",
        detection.class_label,
        format_percent(detection.confidence as f64)
      );
      self.draw_bbox_with_label(image, &detection.bbox, &label, color);
    }
  }

  /// 分类结果: 整图边框表示接受或拒绝，有字体时左上角写出预测
  pub fn draw_verdict(
    &self,
    image: &mut RgbImage,
    result: &ClassificationResult,
    label: Option<&str>,
  ) {
    let color = if result.accepted {
      Rgb(ACCEPTED_COLOR)
    } else {
      Rgb(REJECTED_COLOR)
    };
    let (w, h) = image.dimensions();
    for t in 0..BORDER_THICKNESS {
      if w <= 2 * t || h <= 2 * t {
        break;
      }
      let rect = Rect::at(t as i32, t as i32).of_size(w - 2 * t, h - 2 * t);
      draw_hollow_rect_mut(image, rect, color);
    }

    let name = label
      .map(str::to_string)
      .unwrap_or_else(|| format!("Class {}", result.predicted_index));
    let text = format!(
      "{} {}{}",
      name,
      format_percent(result.predicted_confidence),
      if result.accepted { "" } else { " (rejected)" }
    );
    self.draw_label(image, 0, 0, &text, color);
  }

  // bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(
    &self,
    image: &mut RgbImage,
    bbox: &[f32; 4],
    label: &str,
    color: Rgb<u8>,
  ) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框（加粗为2像素）
    for t in 0..BORDER_THICKNESS as i32 {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32 + 1, height as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }

    self.draw_label(image, x_min, y_min, label, color);
  }

  fn draw_label(&self, image: &mut RgbImage, x: i32, y: i32, label: &str, color: Rgb<u8>) {
    let Some(font) = &self.font else {
      return;
    };

    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, font, label);
    let label_height = text_height as i32 + 2 * LABEL_TEXT_VERTICAL_PADDING;

    // 标签放在边框上方，放不下时放在边框内
    let label_x = x.max(0);
    let label_y = if y - label_height >= 0 { y - label_height } else { y };
    let max_width = (image.width() as i32 - label_x).max(0);
    let label_width = (text_width as i32 + 2).min(max_width);

    if label_width <= 0 || label_height <= 0 {
      return;
    }

    let rect = Rect::at(label_x, label_y).of_size(label_width as u32, label_height as u32);
    draw_filled_rect_mut(image, rect, color);
    draw_text_mut(
      image,
      Rgb([255u8, 255u8, 255u8]),
      label_x + 1,
      label_y + LABEL_TEXT_VERTICAL_PADDING,
      scale,
      font,
      label,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    config::{SigmoidPolarity, Threshold},
    postprocess::normalize_classification,
  };

  fn detection(class_id: u32, recognized: bool, bbox: [f32; 4]) -> Detection {
    Detection {
      class_id,
      class_label: "hotdog".to_string(),
      recognized,
      confidence: 0.9,
      bbox,
    }
  }

  #[test]
  fn box_outline_is_drawn_in_class_color() {
    let source = RgbImage::new(20, 20);
    let draw = Draw::default();
    let decision = DecisionRecord::Detections(vec![detection(0, true, [2.0, 3.0, 12.0, 15.0])]);

    let image = draw.draw_decision(&source, &decision, None);
    assert_eq!(*image.get_pixel(2, 3), draw.colors[0]);
    assert_eq!(*image.get_pixel(12, 15), draw.colors[0]);
    // 框内部不受影响
    assert_eq!(image.get_pixel(7, 9).0, [0, 0, 0]);
    // 原图不被修改
    assert_eq!(source.get_pixel(2, 3).0, [0, 0, 0]);
  }

  #[test]
  fn unrecognized_class_is_grey() {
    let mut image = RgbImage::new(10, 10);
    Draw::default().draw_detections(&mut image, &[detection(9, false, [1.0, 1.0, 8.0, 8.0])]);
    assert_eq!(image.get_pixel(1, 1).0, UNRECOGNIZED_COLOR);
  }

  #[test]
  fn degenerate_and_out_of_bounds_boxes_do_not_panic() {
    let mut image = RgbImage::new(10, 10);
    Draw::default().draw_detections(
      &mut image,
      &[
        detection(0, true, [5.0, 5.0, 5.0, 5.0]),
        detection(1, true, [-50.0, -50.0, 500.0, 500.0]),
        detection(2, true, [9.0, 9.0, 3.0, 3.0]),
      ],
    );
    assert_eq!(image.get_pixel(0, 0).0, Draw::default().colors[1].0);
  }

  #[test]
  fn verdict_border_reflects_acceptance() {
    let threshold = Threshold::new(0.85).unwrap();
    let accepted =
      normalize_classification(&[0.92], threshold, SigmoidPolarity::default()).unwrap();
    let rejected =
      normalize_classification(&[0.3, 0.7], threshold, SigmoidPolarity::default()).unwrap();
    let source = RgbImage::new(6, 6);
    let draw = Draw::default();

    let decision = DecisionRecord::Classification(accepted);
    let image = draw.draw_decision(&source, &decision, Some("hyena"));
    assert_eq!(image.get_pixel(0, 0).0, ACCEPTED_COLOR);
    let image = draw.draw_decision(&source, &DecisionRecord::Classification(rejected), None);
    assert_eq!(image.get_pixel(5, 5).0, REJECTED_COLOR);
    assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0]);
  }
}
