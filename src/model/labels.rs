// 该文件是 Jianbie （鉴别） 项目的一部分。
// src/model/labels.rs - 类别名称表
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

use std::{borrow::Cow, collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized class id {0}")]
pub struct UnknownClassError(pub u32);

#[derive(Error, Debug)]
pub enum LabelFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("标签编号无效: '{0}'")]
  InvalidIndex(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
  List(Vec<String>),
  Map(BTreeMap<String, String>),
}

/// 类别编号到名称的映射，按部署配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "BTreeMap<u32, String>")]
pub struct ClassNames {
  names: BTreeMap<u32, String>,
}

impl ClassNames {
  pub fn from_list<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names = names
      .into_iter()
      .enumerate()
      .map(|(i, name)| (i as u32, name.into()))
      .collect();
    Self { names }
  }

  pub fn get(&self, id: u32) -> Result<&str, UnknownClassError> {
    self
      .names
      .get(&id)
      .map(String::as_str)
      .ok_or(UnknownClassError(id))
  }

  /// 未配置名称时使用 `Class {index}`
  pub fn label_or_index(&self, index: usize) -> Cow<'_, str> {
    match u32::try_from(index).ok().and_then(|id| self.names.get(&id)) {
      Some(name) => Cow::Borrowed(name.as_str()),
      None => Cow::Owned(format!("Class {}", index)),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 接受 `["cat", "dog"]` 或 `{"0": "cat", "1": "dog"}`
  pub fn from_json(text: &str) -> Result<Self, LabelFileError> {
    let file: LabelFile = serde_json::from_str(text)?;
    Self::from_label_file(file)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelFileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let names = Self::from_json(&text)?;
    info!("加载标签文件: {} ({} 个类别)", path.display(), names.len());
    Ok(names)
  }

  fn from_label_file(file: LabelFile) -> Result<Self, LabelFileError> {
    match file {
      LabelFile::List(list) => Ok(Self::from_list(list)),
      LabelFile::Map(map) => {
        let mut names = BTreeMap::new();
        for (key, name) in map {
          let id = key
            .trim()
            .parse::<u32>()
            .map_err(|_| LabelFileError::InvalidIndex(key.clone()))?;
          names.insert(id, name);
        }
        Ok(Self { names })
      }
    }
  }
}

impl TryFrom<serde_json::Value> for ClassNames {
  type Error = LabelFileError;

  fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
    let file: LabelFile = serde_json::from_value(value)?;
    Self::from_label_file(file)
  }
}

impl From<ClassNames> for BTreeMap<u32, String> {
  fn from(names: ClassNames) -> Self {
    names.names
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_and_map_forms_agree() {
    let list = ClassNames::from_json(r#"["cheetah", "hyena"]"#).unwrap();
    let map = ClassNames::from_json(r#"{"0": "cheetah", "1": "hyena"}"#).unwrap();
    assert_eq!(list, map);
    assert_eq!(list.get(1), Ok("hyena"));
  }

  #[test]
  fn missing_id_is_unknown_class() {
    let names = ClassNames::from_list(["hotdog"]);
    assert_eq!(names.get(3), Err(UnknownClassError(3)));
  }

  #[test]
  fn missing_index_falls_back_to_class_number() {
    let names = ClassNames::from_list(["cat"]);
    assert_eq!(names.label_or_index(0), "cat");
    assert_eq!(names.label_or_index(4), "Class 4");
  }

  #[test]
  fn non_numeric_key_is_rejected() {
    assert!(matches!(
      ClassNames::from_json(r#"{"zero": "cat"}"#),
      Err(LabelFileError::InvalidIndex(key)) if key == "zero"
    ));
  }

  #[test]
  fn deserializes_inside_other_documents() {
    #[derive(Deserialize)]
    struct Doc {
      names: ClassNames,
    }
    let doc: Doc = serde_json::from_str(r#"{"names": {"2": "dog"}}"#).unwrap();
    assert_eq!(doc.names.get(2), Ok("dog"));
  }
}
