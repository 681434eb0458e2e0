// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/preprocess/color.rs - YUV420 到 RGB 颜色空间转换
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

use crate::frame::{RGB_CHANNELS, RgbBuffer, Yuv420Frame};

const CHROMA_OFFSET: f64 = 128.0;

#[inline]
fn clamp_to_byte(value: f64) -> u8 {
  // round 为四舍五入（远离零），再截断到 [0, 255]
  value.round().clamp(0.0, 255.0) as u8
}

/// 单个像素的 YUV 到 RGB 转换（全范围 BT.601 系数）
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
  let yf = y as f64;
  let uf = u as f64 - CHROMA_OFFSET;
  let vf = v as f64 - CHROMA_OFFSET;

  [
    clamp_to_byte(yf + 1.402 * vf),
    clamp_to_byte(yf - 0.344136 * uf - 0.714136 * vf),
    clamp_to_byte(yf + 1.772 * uf),
  ]
}

/// 将 4:2:0 平面帧转换为交错 RGB，写入 `dst`（原地重设尺寸）
///
/// 调用方保证平面长度满足步长约束，参见 [`Yuv420Frame::validate`]。
pub fn yuv420_to_rgb(frame: &Yuv420Frame<'_>, dst: &mut RgbBuffer) {
  let width = frame.width;
  let height = frame.height;
  dst.reshape(width, height);
  let out = dst.as_mut();

  for y in 0..height {
    let y_row = frame.y_row_stride * y;
    let uv_row = frame.uv_row_stride * (y >> 1);
    for x in 0..width {
      let uv_index = uv_row + (x >> 1) * frame.uv_pixel_stride;
      let rgb = yuv_to_rgb(
        frame.y_plane[y_row + x],
        frame.u_plane[uv_index],
        frame.v_plane[uv_index],
      );

      let index = (y * width + x) * RGB_CHANNELS;
      out[index..index + RGB_CHANNELS].copy_from_slice(&rgb);
    }
  }
}
