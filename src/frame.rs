// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/frame.rs - YUV 帧描述与像素缓冲区定义
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

pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
  #[error("帧尺寸无效: {width}x{height}")]
  InvalidGeometry { width: usize, height: usize },
  #[error(
    "步长无效: y_row_stride={y_row_stride}, uv_pixel_stride={uv_pixel_stride}, 宽度={width}"
  )]
  InvalidStride {
    y_row_stride: usize,
    uv_pixel_stride: usize,
    width: usize,
  },
  #[error("{plane} 平面长度不足: 需要 {required}, 实际 {actual}")]
  PlaneTooShort {
    plane: &'static str,
    required: usize,
    actual: usize,
  },
}

/// YUV 4:2:0 平面帧的只读视图
///
/// Y 平面按全分辨率索引，U/V 平面在两个方向上均为半分辨率。
/// U/V 共用行步长与像素步长，因此 NV12/NV21 这类交错色度布局
/// 也可以通过 `uv_pixel_stride = 2` 描述。
#[derive(Debug, Clone, Copy)]
pub struct Yuv420Frame<'a> {
  pub y_plane: &'a [u8],
  pub u_plane: &'a [u8],
  pub v_plane: &'a [u8],
  pub width: usize,
  pub height: usize,
  pub y_row_stride: usize,
  pub uv_row_stride: usize,
  pub uv_pixel_stride: usize,
  /// 旋转提示（角度），由方向归一化阶段处理
  pub rotation_degrees: i32,
}

impl<'a> Yuv420Frame<'a> {
  /// 以紧密排列的 I420 布局创建帧视图
  pub fn new(
    y_plane: &'a [u8],
    u_plane: &'a [u8],
    v_plane: &'a [u8],
    width: usize,
    height: usize,
  ) -> Self {
    Self {
      y_plane,
      u_plane,
      v_plane,
      width,
      height,
      y_row_stride: width,
      uv_row_stride: width.div_ceil(2),
      uv_pixel_stride: 1,
      rotation_degrees: 0,
    }
  }

  pub fn with_strides(
    mut self,
    y_row_stride: usize,
    uv_row_stride: usize,
    uv_pixel_stride: usize,
  ) -> Self {
    self.y_row_stride = y_row_stride;
    self.uv_row_stride = uv_row_stride;
    self.uv_pixel_stride = uv_pixel_stride;
    self
  }

  pub fn with_rotation(mut self, rotation_degrees: i32) -> Self {
    self.rotation_degrees = rotation_degrees;
    self
  }

  /// 检查平面长度是否满足声明的尺寸与步长
  ///
  /// 颜色转换本身不做检查；在宿主边界调用本函数，
  /// 把越界访问变成明确的错误，而不是在转换中途 panic。
  pub fn validate(&self) -> Result<(), FrameError> {
    if self.width == 0 || self.height == 0 {
      return Err(FrameError::InvalidGeometry {
        width: self.width,
        height: self.height,
      });
    }

    if self.y_row_stride < self.width || self.uv_pixel_stride == 0 {
      return Err(FrameError::InvalidStride {
        y_row_stride: self.y_row_stride,
        uv_pixel_stride: self.uv_pixel_stride,
        width: self.width,
      });
    }

    let invalid_stride = || FrameError::InvalidStride {
      y_row_stride: self.y_row_stride,
      uv_pixel_stride: self.uv_pixel_stride,
      width: self.width,
    };
    let y_required = (self.height - 1)
      .checked_mul(self.y_row_stride)
      .and_then(|v| v.checked_add(self.width))
      .ok_or_else(invalid_stride)?;
    let uv_required = ((self.height - 1) >> 1)
      .checked_mul(self.uv_row_stride)
      .zip(((self.width - 1) >> 1).checked_mul(self.uv_pixel_stride))
      .and_then(|(rows, cols)| rows.checked_add(cols))
      .and_then(|v| v.checked_add(1))
      .ok_or_else(invalid_stride)?;

    for (plane, actual, required) in [
      ("Y", self.y_plane.len(), y_required),
      ("U", self.u_plane.len(), uv_required),
      ("V", self.v_plane.len(), uv_required),
    ] {
      if actual < required {
        return Err(FrameError::PlaneTooShort {
          plane,
          required,
          actual,
        });
      }
    }

    Ok(())
  }
}

/// 自有数据的紧密排列 I420 帧
#[derive(Debug, Clone, PartialEq)]
pub struct Yuv420Image {
  y_plane: Box<[u8]>,
  u_plane: Box<[u8]>,
  v_plane: Box<[u8]>,
  width: usize,
  height: usize,
  rotation_degrees: i32,
}

impl Yuv420Image {
  /// I420 一帧的字节数：Y 为 w×h，U/V 各为 ⌈w/2⌉×⌈h/2⌉
  pub fn frame_size(width: usize, height: usize) -> usize {
    width * height + 2 * Self::chroma_size(width, height)
  }

  fn chroma_size(width: usize, height: usize) -> usize {
    width.div_ceil(2) * height.div_ceil(2)
  }

  /// 从连续的 I420 字节构造，长度不符时返回 `None`
  pub fn from_i420(width: usize, height: usize, data: &[u8]) -> Option<Self> {
    if width == 0 || height == 0 || data.len() != Self::frame_size(width, height) {
      return None;
    }
    let luma = width * height;
    let chroma = Self::chroma_size(width, height);
    Some(Self {
      y_plane: data[..luma].into(),
      u_plane: data[luma..luma + chroma].into(),
      v_plane: data[luma + chroma..].into(),
      width,
      height,
      rotation_degrees: 0,
    })
  }

  /// 每个平面填充常量值
  pub fn uniform(width: usize, height: usize, yuv: [u8; 3]) -> Self {
    let chroma = Self::chroma_size(width, height);
    Self {
      y_plane: vec![yuv[0]; width * height].into_boxed_slice(),
      u_plane: vec![yuv[1]; chroma].into_boxed_slice(),
      v_plane: vec![yuv[2]; chroma].into_boxed_slice(),
      width,
      height,
      rotation_degrees: 0,
    }
  }

  pub fn with_rotation(mut self, rotation_degrees: i32) -> Self {
    self.rotation_degrees = rotation_degrees;
    self
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn as_frame(&self) -> Yuv420Frame<'_> {
    Yuv420Frame::new(
      &self.y_plane,
      &self.u_plane,
      &self.v_plane,
      self.width,
      self.height,
    )
    .with_rotation(self.rotation_degrees)
  }
}

/// 可复用的 HWC 像素缓冲区，通道固定为 RGB 三通道
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelBuffer<T> {
  data: Vec<T>,
  width: usize,
  height: usize,
}

pub type RgbBuffer = PixelBuffer<u8>;
pub type TensorBuffer = PixelBuffer<f32>;

impl<T: Copy + Default> PixelBuffer<T> {
  pub fn with_shape(width: usize, height: usize) -> Self {
    let mut buffer = Self {
      data: Vec::new(),
      width: 0,
      height: 0,
    };
    buffer.reshape(width, height);
    buffer
  }

  /// 由原始 HWC 数据构造，长度不匹配时返回 `None`
  pub fn from_raw(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
    if data.len() != width * height * RGB_CHANNELS {
      return None;
    }
    Some(Self {
      data,
      width,
      height,
    })
  }

  /// 重设尺寸并清零内容，保留已分配的容量
  pub fn reshape(&mut self, width: usize, height: usize) {
    self.data.clear();
    self.data.resize(width * height * RGB_CHANNELS, T::default());
    self.width = width;
    self.height = height;
  }

  pub fn clear(&mut self) {
    self.data.clear();
    self.width = 0;
    self.height = 0;
  }

  pub fn pixel(&self, x: usize, y: usize) -> &[T] {
    let index = (y * self.width + x) * RGB_CHANNELS;
    &self.data[index..index + RGB_CHANNELS]
  }
}

impl TensorBuffer {
  /// 把 [0, 1] 浮点张量还原为 8 位 RGB，超出范围的值被截断
  pub fn to_rgb(&self) -> RgbBuffer {
    let data = self
      .data
      .iter()
      .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
      .collect();
    RgbBuffer {
      data,
      width: self.width,
      height: self.height,
    }
  }
}

impl<T> PixelBuffer<T> {
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl<T> AsRef<[T]> for PixelBuffer<T> {
  fn as_ref(&self) -> &[T] {
    &self.data
  }
}

impl<T> AsMut<[T]> for PixelBuffer<T> {
  fn as_mut(&mut self) -> &mut [T] {
    &mut self.data
  }
}
