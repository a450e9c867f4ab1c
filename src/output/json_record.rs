// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/output/json_record.rs - 判定记录输出
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

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::Render,
  present::PresentationPayload,
  task::{AnalysisOutcome, DecisionRecord},
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  payload: &'a PresentationPayload,
  #[serde(skip_serializing_if = "Option::is_none")]
  decision: Option<&'a DecisionRecord>,
}

/// `json:///path/out.json[?full]`，`full` 同时记录原始判定
pub struct JsonRecordOutput {
  path: PathBuf,
  full: bool,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    let full = uri.query_pairs().any(|(k, _)| k == "full");

    Ok(JsonRecordOutput {
      path: PathBuf::from(uri.path()),
      full,
    })
  }
}

impl JsonRecordOutput {
  pub fn new(path: impl Into<PathBuf>, full: bool) -> Self {
    Self {
      path: path.into(),
      full,
    }
  }
}

impl Render<AnalysisOutcome> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, outcome: &AnalysisOutcome) -> Result<(), Self::Error> {
    let record = Record {
      payload: &outcome.payload,
      decision: self.full.then_some(&outcome.decision),
    };

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;
    info!("保存判定记录到文件: {}", self.path.display());
    Ok(())
  }
}
