// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/preprocess/resize.rs - 双线性缩放与归一化
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

use crate::frame::{RGB_CHANNELS, RgbBuffer, TensorBuffer};

const PIXEL_MAX: f32 = 255.0;

/// 一个轴上的采样位置：两个相邻索引与插值权重
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisSample {
  lo: usize,
  hi: usize,
  frac: f32,
}

impl AxisSample {
  /// 半像素中心对齐：`src = (dst + 0.5) * scale - 0.5`
  ///
  /// 小于 0 的坐标先截断到 0 再拆分，边缘像素复制而不外推；
  /// 这与按未截断坐标取插值权重的做法不同，保证输出落在 [0, 1] 内。
  fn at(dst: usize, scale: f32, src_len: usize) -> Self {
    let last = src_len - 1;
    let pos = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let lo = (pos.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    Self {
      lo,
      hi,
      frac: pos - lo as f32,
    }
  }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
  a + (b - a) * t
}

/// 双线性缩放到 `dst_width` x `dst_height`，输出 HWC 浮点张量，数值范围 [0, 1]
///
/// 任一尺寸为 0 时 `dst` 被清空。
pub fn resize_normalize(
  src: &RgbBuffer,
  dst_width: usize,
  dst_height: usize,
  dst: &mut TensorBuffer,
) {
  let src_width = src.width();
  let src_height = src.height();
  if src.is_empty() || src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
    dst.clear();
    return;
  }

  dst.reshape(dst_width, dst_height);

  let scale_x = src_width as f32 / dst_width as f32;
  let scale_y = src_height as f32 / dst_height as f32;
  let columns: Vec<AxisSample> = (0..dst_width)
    .map(|x| AxisSample::at(x, scale_x, src_width))
    .collect();

  let input = src.as_ref();
  let output = dst.as_mut();

  for y in 0..dst_height {
    let row = AxisSample::at(y, scale_y, src_height);
    let top_row = row.lo * src_width;
    let bottom_row = row.hi * src_width;

    for (x, col) in columns.iter().enumerate() {
      let top_left = (top_row + col.lo) * RGB_CHANNELS;
      let top_right = (top_row + col.hi) * RGB_CHANNELS;
      let bottom_left = (bottom_row + col.lo) * RGB_CHANNELS;
      let bottom_right = (bottom_row + col.hi) * RGB_CHANNELS;
      let dst_index = (y * dst_width + x) * RGB_CHANNELS;

      for c in 0..RGB_CHANNELS {
        let top = lerp(
          input[top_left + c] as f32,
          input[top_right + c] as f32,
          col.frac,
        );
        let bottom = lerp(
          input[bottom_left + c] as f32,
          input[bottom_right + c] as f32,
          col.frac,
        );
        output[dst_index + c] = lerp(top, bottom, row.frac) / PIXEL_MAX;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f32 = 1e-6;

  fn gradient(width: usize, height: usize) -> RgbBuffer {
    let mut data = Vec::with_capacity(width * height * RGB_CHANNELS);
    for y in 0..height {
      for x in 0..width {
        data.extend_from_slice(&[(x * 40) as u8, (y * 40) as u8, 200]);
      }
    }
    RgbBuffer::from_raw(width, height, data).unwrap()
  }

  #[test]
  fn same_size_reproduces_source() {
    let src = gradient(5, 4);
    let mut dst = TensorBuffer::default();
    resize_normalize(&src, 5, 4, &mut dst);

    assert_eq!((dst.width(), dst.height()), (5, 4));
    for (s, d) in src.as_ref().iter().zip(dst.as_ref()) {
      assert!((*s as f32 / 255.0 - d).abs() < EPS);
    }
  }

  #[test]
  fn halving_averages_2x2_blocks() {
    let src = gradient(4, 4);
    let mut dst = TensorBuffer::default();
    resize_normalize(&src, 2, 2, &mut dst);

    // 目标 (0,0) 的采样点为源 (0.5, 0.5)
    let expected_r = (0.0 + 40.0) / 2.0 / 255.0;
    let expected_g = (0.0 + 40.0) / 2.0 / 255.0;
    assert!((dst.pixel(0, 0)[0] - expected_r).abs() < EPS);
    assert!((dst.pixel(0, 0)[1] - expected_g).abs() < EPS);
    assert!((dst.pixel(0, 0)[2] - 200.0 / 255.0).abs() < EPS);
    // 目标 (1,1) 的采样点为源 (2.5, 2.5)
    assert!((dst.pixel(1, 1)[0] - 100.0 / 255.0).abs() < EPS);
  }

  #[test]
  fn upscale_replicates_edges() {
    // 1x2 -> 4x4：横向只有一列，纵向两端复制边缘值
    let src = RgbBuffer::from_raw(1, 2, vec![0, 0, 0, 255, 255, 255]).unwrap();
    let mut dst = TensorBuffer::default();
    resize_normalize(&src, 4, 4, &mut dst);

    for x in 0..4 {
      // y=0 -> 源 -0.25 截断到 0
      assert!(dst.pixel(x, 0)[0].abs() < EPS);
      // y=1 -> 源 0.25
      assert!((dst.pixel(x, 1)[0] - 0.25).abs() < EPS);
      // y=2 -> 源 0.75
      assert!((dst.pixel(x, 2)[0] - 0.75).abs() < EPS);
      // y=3 -> 源 1.25，上下邻居都截断到最后一行
      assert!((dst.pixel(x, 3)[0] - 1.0).abs() < EPS);
    }
  }

  #[test]
  fn output_stays_in_unit_range() {
    let data = (0..6 * 3 * RGB_CHANNELS)
      .map(|v| if v % 2 == 0 { 255 } else { 0 })
      .collect();
    let src = RgbBuffer::from_raw(6, 3, data).unwrap();
    let mut dst = TensorBuffer::default();
    resize_normalize(&src, 17, 11, &mut dst);

    assert_eq!(dst.len(), 17 * 11 * 3);
    assert!(dst.as_ref().iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn zero_target_clears_output() {
    let src = gradient(2, 2);
    let mut dst = TensorBuffer::with_shape(2, 2);
    resize_normalize(&src, 0, 2, &mut dst);
    assert!(dst.is_empty());
  }
}
