// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::{
  cell::Cell,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbBuffer,
  model::DetectionList,
  output::{Record, Render, draw::Draw},
};

/// 把画面连同检测框保存为图片
///
/// URL 形如 `image:///tmp/out.png?record&numbered`：
/// `record` 额外写出同名 `.txt` 结果，`numbered` 为每帧追加序号避免覆盖。
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
  record: Option<Record>,
  counter: Option<Cell<usize>>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let has_flag = |flag: &str| uri.query_pairs().any(|(k, _)| k == flag);
    let output = SaveImageFileOutput::new(uri.path())
      .with_record(has_flag("record"))
      .with_numbering(has_flag("numbered"));
    Ok(output)
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      draw: Draw::default(),
      record: None,
      counter: None,
    }
  }

  pub fn with_record(mut self, enabled: bool) -> Self {
    self.record = enabled.then_some(Record);
    self
  }

  pub fn with_numbering(mut self, enabled: bool) -> Self {
    self.counter = enabled.then(|| Cell::new(0));
    self
  }

  fn frame_path(&self) -> PathBuf {
    let Some(counter) = &self.counter else {
      return self.path.clone();
    };
    let index = counter.get();
    counter.set(index + 1);

    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}-{:04}.{}", stem, index, ext.to_string_lossy()),
      None => format!("{}-{:04}", stem, index),
    };
    self.path.with_file_name(name)
  }

  fn save_image(&self, image: image::RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image.save(path).map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<RgbBuffer, DetectionList> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbBuffer, result: &DetectionList) -> Result<(), Self::Error> {
    let path = self.frame_path();
    let image = self.draw.draw_detection(frame, result);
    self.save_image(image, &path)?;
    if let Some(record) = &self.record {
      record
        .record(result, &path)
        .map_err(SaveImageFileError::IoError)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Detection;

  #[test]
  fn url_flags_are_parsed() {
    let url = Url::parse("image:///tmp/out/frame.png?record&numbered").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert!(output.record.is_some());
    assert_eq!(output.frame_path(), Path::new("/tmp/out/frame-0000.png"));
    assert_eq!(output.frame_path(), Path::new("/tmp/out/frame-0001.png"));

    let url = Url::parse("image:///tmp/out/frame.png").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert!(output.record.is_none());
    assert_eq!(output.frame_path(), Path::new("/tmp/out/frame.png"));

    let url = Url::parse("video:///tmp/out.mp4").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn writes_image_and_record() {
    let dir = std::env::temp_dir().join(format!("shanan-edge-out-{}", std::process::id()));
    let path = dir.join("nested").join("result.png");
    let output = SaveImageFileOutput::new(&path).with_record(true);

    let frame = RgbBuffer::with_shape(8, 6);
    let result = DetectionList::from(vec![Detection {
      class_id: 1,
      score: 0.75,
      bbox: [1.0, 1.0, 5.0, 4.0],
    }]);
    output.render_result(&frame, &result).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (8, 6));
    assert_eq!(saved.get_pixel(1, 1), &image::Rgb([0, 0, 255]));
    let text = std::fs::read_to_string(path.with_extension("txt")).unwrap();
    assert!(text.starts_with("1, 0.7500"));

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
