// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use url::Url;

use jianbie::config::{SigmoidPolarity, Threshold};

/// Jianbie 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 目标检测
  Detect {
    #[command(flatten)]
    common: CommonArgs,

    /// 检测置信度阈值 (0.0 - 1.0)
    #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
    confidence: Threshold,

    /// 没有检测到目标时显示的信息
    #[arg(long, value_name = "MESSAGE")]
    negative_message: Option<String>,
  },
  /// 图像分类
  Classify {
    #[command(flatten)]
    common: CommonArgs,

    /// 分类接受阈值 (0.0 - 1.0)
    #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
    threshold: Threshold,

    /// 单 sigmoid 输出对应的类别编号
    #[arg(long, value_enum, default_value_t = PositiveClass::One)]
    positive_class: PositiveClass,
  },
}

#[derive(ClapArgs, Debug)]
pub struct CommonArgs {
  /// 模型地址，例如 recorded-detector:///path/record.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，例如 image:///path/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出地址，例如 image:///path/out.png 或 json:///path/out.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 标签文件 (JSON 数组或以编号为键的对象)
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 标准输出格式
  #[arg(long, value_enum, default_value_t = Format::Json)]
  pub format: Format,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Text,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositiveClass {
  #[value(name = "0")]
  Zero,
  #[value(name = "1")]
  One,
}

impl From<PositiveClass> for SigmoidPolarity {
  fn from(class: PositiveClass) -> Self {
    match class {
      PositiveClass::Zero => SigmoidPolarity::PositiveIsClassZero,
      PositiveClass::One => SigmoidPolarity::PositiveIsClassOne,
    }
  }
}
