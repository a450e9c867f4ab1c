// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jianbie::{
  FromUrl,
  config::{Threshold, ThresholdConfig},
  input::ImageFileInput,
  model::{ClassNames, RecordedClassifierBuilder, RecordedDetectorBuilder},
  output::{OutputWrapper, Render},
  task::{AnalysisOutcome, AnalysisRequest, ClassificationTask, DetectionTask, Task},
};

use args::{Args, Command, CommonArgs, Format};

const DEFAULT_THRESHOLD: Threshold = Threshold::ZERO;

fn build_request(common: &CommonArgs, thresholds: ThresholdConfig) -> Result<AnalysisRequest> {
  info!("输入来源: {}", common.input);
  let image = ImageFileInput::from_url(&common.input)
    .with_context(|| format!("无法读取输入: {}", common.input))?
    .into_raw()
    .context("没有输入图像")?;

  let mut request = AnalysisRequest::new(image, thresholds);
  if let Some(path) = &common.labels {
    let names = ClassNames::load(path)
      .with_context(|| format!("无法加载标签文件: {}", path.display()))?;
    request = request.with_class_names(names);
  }
  Ok(request)
}

fn emit(common: &CommonArgs, outcome: &AnalysisOutcome) -> Result<()> {
  match common.format {
    Format::Json => println!("{}", serde_json::to_string_pretty(&outcome.payload)?),
    Format::Text => print!("{}", outcome.payload),
  }

  if let Some(url) = &common.output {
    info!("输出路径: {}", url);
    let output = OutputWrapper::from_url(url)?;
    output.render_result(outcome)?;
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  match args.command {
    Command::Detect {
      common,
      confidence,
      negative_message,
    } => {
      info!("模型文件路径: {}", common.model);
      info!("置信度阈值: {}", confidence);
      let model = RecordedDetectorBuilder::from_url(&common.model)?.build()?;

      let thresholds = ThresholdConfig {
        detection: confidence,
        classification: DEFAULT_THRESHOLD,
      };
      let mut request = build_request(&common, thresholds)?;
      if let Some(message) = negative_message {
        request = request.with_negative_message(message);
      }

      let outcome = DetectionTask::new(request).run_task(&model)?;
      emit(&common, &outcome)
    }
    Command::Classify {
      common,
      threshold,
      positive_class,
    } => {
      info!("模型文件路径: {}", common.model);
      info!("接受阈值: {}", threshold);
      let model = RecordedClassifierBuilder::from_url(&common.model)?.build()?;

      let thresholds = ThresholdConfig {
        detection: DEFAULT_THRESHOLD,
        classification: threshold,
      };
      let request = build_request(&common, thresholds)?.with_polarity(positive_class.into());

      let outcome = ClassificationTask::new(request).run_task(&model)?;
      emit(&common, &outcome)
    }
  }
}
