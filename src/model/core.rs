// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/model/core.rs - 检测配置与结果定义
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

use std::ops::Deref;

use thiserror::Error;

const DEFAULT_INPUT_SIZE: usize = 640;
const DEFAULT_NUM_THREADS: usize = 2;
const DEFAULT_MAX_DETECTIONS: usize = 100;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
  #[error("阈值 {name} 超出范围 [0, 1]: {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
}

/// 每个会话不可变的检测配置
///
/// `use_gpu` 与 `allow_fp16` 对本核心透明，原样交给推理后端。
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
  pub input_width: usize,
  pub input_height: usize,
  pub num_threads: usize,
  pub max_detections: usize,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub use_gpu: bool,
  pub allow_fp16: bool,
}

impl Default for EngineOptions {
  fn default() -> Self {
    Self {
      input_width: DEFAULT_INPUT_SIZE,
      input_height: DEFAULT_INPUT_SIZE,
      num_threads: DEFAULT_NUM_THREADS,
      max_detections: DEFAULT_MAX_DETECTIONS,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      use_gpu: false,
      allow_fp16: true,
    }
  }
}

impl EngineOptions {
  pub fn with_input_size(mut self, width: usize, height: usize) -> Self {
    self.input_width = width.max(1);
    self.input_height = height.max(1);
    self
  }

  pub fn with_num_threads(mut self, num_threads: usize) -> Self {
    self.num_threads = num_threads.max(1);
    self
  }

  pub fn with_max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections.max(1);
    self
  }

  pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
    self.confidence_threshold = confidence;
    self.iou_threshold = iou;
    self
  }

  pub fn with_accelerator(mut self, use_gpu: bool, allow_fp16: bool) -> Self {
    self.use_gpu = use_gpu;
    self.allow_fp16 = allow_fp16;
    self
  }

  /// 截断计数类参数并检查阈值范围
  pub fn normalized(self) -> Result<Self, OptionsError> {
    for (name, value) in [
      ("confidence", self.confidence_threshold),
      ("iou", self.iou_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(OptionsError::ThresholdOutOfRange { name, value });
      }
    }

    let (width, height) = (self.input_width, self.input_height);
    let (num_threads, max_detections) = (self.num_threads, self.max_detections);
    Ok(
      self
        .with_input_size(width, height)
        .with_num_threads(num_threads)
        .with_max_detections(max_detections),
    )
  }
}

/// 推理引擎返回的原始输出：扁平数据与维度
///
/// 维度顺序（通道在前或在后、是否带 objectness）不做假设，由解码器推断。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOutputTensor {
  pub values: Vec<f32>,
  pub shape: Vec<usize>,
}

impl RawOutputTensor {
  pub fn new(values: Vec<f32>, shape: Vec<usize>) -> Self {
    Self { values, shape }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [left, top, right, bottom]，模型输入像素坐标
}

impl Detection {
  pub fn left(&self) -> f32 {
    self.bbox[0]
  }

  pub fn top(&self) -> f32 {
    self.bbox[1]
  }

  pub fn right(&self) -> f32 {
    self.bbox[2]
  }

  pub fn bottom(&self) -> f32 {
    self.bbox[3]
  }

  pub fn area(&self) -> f32 {
    (self.right() - self.left()) * (self.bottom() - self.top())
  }
}

/// 交给调用方的检测结果，按分数降序排列
///
/// 所有权随返回值转移；[`DetectionList::release`] 消耗自身，
/// 因此重复释放或释放后使用在编译期即被拒绝。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionList {
  pub items: Box<[Detection]>,
}

impl DetectionList {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn into_vec(self) -> Vec<Detection> {
    self.items.into_vec()
  }

  /// 把框坐标从 `from` (宽, 高) 像素空间等比映射到 `to` 像素空间
  pub fn rescaled(&self, from: (usize, usize), to: (usize, usize)) -> DetectionList {
    if from.0 == 0 || from.1 == 0 {
      return DetectionList::empty();
    }
    let scale_x = to.0 as f32 / from.0 as f32;
    let scale_y = to.1 as f32 / from.1 as f32;

    self
      .items
      .iter()
      .map(|det| Detection {
        bbox: [
          det.left() * scale_x,
          det.top() * scale_y,
          det.right() * scale_x,
          det.bottom() * scale_y,
        ],
        ..*det
      })
      .collect::<Vec<_>>()
      .into()
  }

  pub fn release(self) {}
}

impl From<Vec<Detection>> for DetectionList {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl Deref for DetectionList {
  type Target = [Detection];

  fn deref(&self) -> &Self::Target {
    &self.items
  }
}

impl<'a> IntoIterator for &'a DetectionList {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}
