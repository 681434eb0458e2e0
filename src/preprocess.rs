// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/preprocess.rs - 预处理：颜色转换、方向归一化、缩放归一化
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

use tracing::debug;

use crate::frame::{RgbBuffer, TensorBuffer, Yuv420Frame};

mod color;
mod resize;
mod rotate;

pub use self::color::{yuv_to_rgb, yuv420_to_rgb};
pub use self::resize::resize_normalize;
pub use self::rotate::{Rotation, rotate_rgb};

/// 预处理暂存区
///
/// 三个缓冲区归单个实例独占，每帧原地重设后复用，避免逐帧分配。
/// 同一实例不可并发使用；并行的视频流应各自持有一个实例。
#[derive(Debug, Default)]
pub struct Preprocessor {
  rgb: RgbBuffer,
  rotated: RgbBuffer,
  tensor: TensorBuffer,
}

impl Preprocessor {
  pub fn new() -> Self {
    Self::default()
  }

  /// 转换、旋转并缩放一帧，返回模型输入张量（HWC，[0, 1]）
  ///
  /// 任一目标尺寸为 0 时返回空张量。
  pub fn run(
    &mut self,
    frame: &Yuv420Frame<'_>,
    target_width: usize,
    target_height: usize,
  ) -> &TensorBuffer {
    yuv420_to_rgb(frame, &mut self.rgb);

    let rotation = Rotation::from_degrees(frame.rotation_degrees);
    if rotation == Rotation::Deg0 {
      self.rotated.clear();
    }
    let oriented = rotate_rgb(&self.rgb, rotation, &mut self.rotated);
    debug!(
      "预处理: {}x{} 旋转 {}° -> {}x{} -> {}x{}",
      frame.width,
      frame.height,
      rotation.degrees(),
      oriented.width(),
      oriented.height(),
      target_width,
      target_height
    );

    resize_normalize(oriented, target_width, target_height, &mut self.tensor);
    &self.tensor
  }

  /// 最近一帧旋转后的 RGB 图像（模型坐标系之前的画面）
  pub fn oriented(&self) -> &RgbBuffer {
    if self.rotated.is_empty() {
      &self.rgb
    } else {
      &self.rotated
    }
  }

  pub fn tensor(&self) -> &TensorBuffer {
    &self.tensor
  }
}
