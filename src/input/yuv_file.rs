// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/input/yuv_file.rs - 原始 I420 文件输入
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

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Yuv420Image};

#[derive(Error, Debug)]
pub enum YuvFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("缺少参数: {0}")]
  MissingParameter(&'static str),
  #[error("参数 {key} 的值无效: {value}")]
  InvalidParameter { key: String, value: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("文件长度 {len} 不足一帧（{frame_size} 字节）")]
  Truncated { len: usize, frame_size: usize },
}

/// 读取紧密排列的 I420 原始文件，可包含连续多帧
///
/// URL 形如 `yuv:///path/to/frames.yuv?width=640&height=480&rotation=90`。
pub struct Yuv420FileInput {
  data: Vec<u8>,
  width: usize,
  height: usize,
  rotation_degrees: i32,
  cursor: usize,
}

impl FromUrlWithScheme for Yuv420FileInput {
  const SCHEME: &'static str = "yuv";
}

fn query_value<T: std::str::FromStr>(
  url: &Url,
  key: &'static str,
) -> Result<Option<T>, YuvFileInputError> {
  match url.query_pairs().find(|(k, _)| k == key) {
    Some((_, value)) => value
      .parse()
      .map(Some)
      .map_err(|_| YuvFileInputError::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
      }),
    None => Ok(None),
  }
}

impl FromUrl for Yuv420FileInput {
  type Error = YuvFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(YuvFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    let width = query_value(url, "width")?.ok_or(YuvFileInputError::MissingParameter("width"))?;
    let height =
      query_value(url, "height")?.ok_or(YuvFileInputError::MissingParameter("height"))?;
    let rotation_degrees = query_value(url, "rotation")?.unwrap_or(0);

    let data = std::fs::read(url.path())?;
    Self::from_bytes(data, width, height).map(|input| input.with_rotation(rotation_degrees))
  }
}

impl Yuv420FileInput {
  pub fn from_bytes(
    data: Vec<u8>,
    width: usize,
    height: usize,
  ) -> Result<Self, YuvFileInputError> {
    let frame_size = Yuv420Image::frame_size(width, height);
    if frame_size == 0 || data.len() < frame_size {
      return Err(YuvFileInputError::Truncated {
        len: data.len(),
        frame_size,
      });
    }
    if data.len() % frame_size != 0 {
      warn!(
        "文件长度 {} 不是帧大小 {} 的整数倍，末尾 {} 字节将被忽略",
        data.len(),
        frame_size,
        data.len() % frame_size
      );
    }
    info!(
      "读取 I420 输入: {}x{}, 共 {} 帧",
      width,
      height,
      data.len() / frame_size
    );

    Ok(Self {
      data,
      width,
      height,
      rotation_degrees: 0,
      cursor: 0,
    })
  }

  pub fn with_rotation(mut self, rotation_degrees: i32) -> Self {
    self.rotation_degrees = rotation_degrees;
    self
  }

  pub fn frame_count(&self) -> usize {
    self.data.len() / Yuv420Image::frame_size(self.width, self.height)
  }
}

impl Iterator for Yuv420FileInput {
  type Item = Yuv420Image;

  fn next(&mut self) -> Option<Self::Item> {
    let frame_size = Yuv420Image::frame_size(self.width, self.height);
    let chunk = self.data.get(self.cursor..self.cursor + frame_size)?;
    self.cursor += frame_size;
    Yuv420Image::from_i420(self.width, self.height, chunk)
      .map(|image| image.with_rotation(self.rotation_degrees))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yields_every_complete_frame() {
    let frame_size = Yuv420Image::frame_size(4, 2);
    assert_eq!(frame_size, 12);
    let mut data = vec![1u8; frame_size];
    data.extend(vec![2u8; frame_size]);
    data.extend([3u8; 5]);

    let input = Yuv420FileInput::from_bytes(data, 4, 2).unwrap().with_rotation(90);
    assert_eq!(input.frame_count(), 2);
    let frames: Vec<_> = input.collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].as_frame().y_plane[0], 2);
    assert_eq!(frames[0].as_frame().rotation_degrees, 90);
  }

  #[test]
  fn short_file_is_rejected() {
    assert!(matches!(
      Yuv420FileInput::from_bytes(vec![0; 10], 4, 2),
      Err(YuvFileInputError::Truncated {
        len: 10,
        frame_size: 12
      })
    ));
  }

  #[test]
  fn url_requires_dimensions() {
    let url = Url::parse("yuv:///tmp/none.yuv?width=4").unwrap();
    assert!(matches!(
      Yuv420FileInput::from_url(&url),
      Err(YuvFileInputError::MissingParameter("height"))
    ));

    let url = Url::parse("yuv:///tmp/none.yuv?width=four&height=2").unwrap();
    assert!(matches!(
      Yuv420FileInput::from_url(&url),
      Err(YuvFileInputError::InvalidParameter { .. })
    ));

    let url = Url::parse("image:///tmp/none.yuv?width=4&height=2").unwrap();
    assert!(matches!(
      Yuv420FileInput::from_url(&url),
      Err(YuvFileInputError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn reads_frames_from_disk() {
    let path = std::env::temp_dir().join(format!("shanan-edge-{}.yuv", std::process::id()));
    let mut bytes = vec![16u8; 4];
    bytes.extend([128, 128]);
    std::fs::write(&path, &bytes).unwrap();

    let url = Url::parse(&format!("yuv://{}?width=2&height=2", path.display())).unwrap();
    let frames: Vec<_> = Yuv420FileInput::from_url(&url).unwrap().collect();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].as_frame().y_plane, &[16, 16, 16, 16]);
  }
}
