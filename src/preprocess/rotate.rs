// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/preprocess/rotate.rs - RGB 图像直角旋转
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

use tracing::warn;

use crate::frame::{RGB_CHANNELS, RgbBuffer};

/// 支持的四种直角旋转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
  #[default]
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  /// 将任意角度归一化到 [0, 360) 后匹配；非 90° 倍数退化为不旋转
  pub fn from_degrees(degrees: i32) -> Self {
    match degrees.rem_euclid(360) {
      0 => Rotation::Deg0,
      90 => Rotation::Deg90,
      180 => Rotation::Deg180,
      270 => Rotation::Deg270,
      other => {
        warn!("不支持的旋转角度 {}°，按 0° 处理", other);
        Rotation::Deg0
      }
    }
  }

  pub fn degrees(self) -> i32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }

  pub fn swaps_dimensions(self) -> bool {
    matches!(self, Rotation::Deg90 | Rotation::Deg270)
  }

  /// 旋转后的 (宽, 高)
  pub fn output_dimensions(self, width: usize, height: usize) -> (usize, usize) {
    if self.swaps_dimensions() {
      (height, width)
    } else {
      (width, height)
    }
  }
}

/// 顺时针旋转 RGB 图像
///
/// 0° 时直接返回 `src`（不拷贝，`dst` 保持不变）；其他角度写入 `dst` 并返回它。
pub fn rotate_rgb<'a>(
  src: &'a RgbBuffer,
  rotation: Rotation,
  dst: &'a mut RgbBuffer,
) -> &'a RgbBuffer {
  if rotation == Rotation::Deg0 {
    return src;
  }

  let width = src.width();
  let height = src.height();
  let (dst_width, dst_height) = rotation.output_dimensions(width, height);
  dst.reshape(dst_width, dst_height);

  let input = src.as_ref();
  let output = dst.as_mut();

  for y in 0..height {
    for x in 0..width {
      let (dst_x, dst_y) = match rotation {
        Rotation::Deg90 => (height - 1 - y, x),
        Rotation::Deg180 => (width - 1 - x, height - 1 - y),
        Rotation::Deg270 => (y, width - 1 - x),
        Rotation::Deg0 => (x, y),
      };

      let src_index = (y * width + x) * RGB_CHANNELS;
      let dst_index = (dst_y * dst_width + dst_x) * RGB_CHANNELS;
      output[dst_index..dst_index + RGB_CHANNELS]
        .copy_from_slice(&input[src_index..src_index + RGB_CHANNELS]);
    }
  }

  dst
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(width: usize, height: usize) -> RgbBuffer {
    let data = (0..width * height * RGB_CHANNELS)
      .map(|v| (v % 251) as u8)
      .collect();
    RgbBuffer::from_raw(width, height, data).unwrap()
  }

  #[test]
  fn degrees_are_normalized() {
    assert_eq!(Rotation::from_degrees(0), Rotation::Deg0);
    assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
    assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
    assert_eq!(Rotation::from_degrees(-540), Rotation::Deg180);
    assert_eq!(Rotation::from_degrees(45), Rotation::Deg0);
    assert_eq!(Rotation::from_degrees(-1), Rotation::Deg0);
  }

  #[test]
  fn identity_returns_source() {
    let src = sample(3, 2);
    let mut dst = RgbBuffer::default();
    let out = rotate_rgb(&src, Rotation::Deg0, &mut dst);
    assert!(std::ptr::eq(out, &src));
    assert_eq!(out, &src);
  }

  #[test]
  fn quarter_turn_moves_corners() {
    let src = sample(3, 2);
    let mut dst = RgbBuffer::default();
    let out = rotate_rgb(&src, Rotation::Deg90, &mut dst);

    assert_eq!((out.width(), out.height()), (2, 3));
    // 源左上角 (0,0) 到达 (height-1, 0)
    assert_eq!(out.pixel(1, 0), src.pixel(0, 0));
    // 源左下角 (0,1) 到达 (0, 0)
    assert_eq!(out.pixel(0, 0), src.pixel(0, 1));
    // 源右上角 (2,0) 到达 (1, 2)
    assert_eq!(out.pixel(1, 2), src.pixel(2, 0));
  }

  #[test]
  fn half_turn_keeps_dimensions() {
    let src = sample(3, 2);
    let mut dst = RgbBuffer::default();
    let out = rotate_rgb(&src, Rotation::Deg180, &mut dst);

    assert_eq!((out.width(), out.height()), (3, 2));
    assert_eq!(out.pixel(2, 1), src.pixel(0, 0));
    assert_eq!(out.pixel(0, 0), src.pixel(2, 1));
  }

  #[test]
  fn three_quarter_turn_moves_corners() {
    let src = sample(3, 2);
    let mut dst = RgbBuffer::default();
    let out = rotate_rgb(&src, Rotation::Deg270, &mut dst);

    assert_eq!((out.width(), out.height()), (2, 3));
    assert_eq!(out.pixel(0, 2), src.pixel(0, 0));
    assert_eq!(out.pixel(1, 0), src.pixel(2, 1));
  }

  #[test]
  fn four_quarter_turns_restore_source() {
    let src = sample(5, 3);
    let mut current = src.clone();
    for _ in 0..4 {
      let mut dst = RgbBuffer::default();
      current = rotate_rgb(&current, Rotation::Deg90, &mut dst).clone();
    }
    assert_eq!(current, src);
  }

  #[test]
  fn opposite_turns_cancel() {
    let src = sample(4, 7);
    let mut first = RgbBuffer::default();
    let mut second = RgbBuffer::default();
    let turned = rotate_rgb(&src, Rotation::Deg90, &mut first).clone();
    let back = rotate_rgb(&turned, Rotation::Deg270, &mut second);
    assert_eq!(back, &src);
  }
}
