// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/model/decode.rs - 输出张量布局推断与候选框解码
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
use tracing::{debug, warn};

use crate::model::{
  Detection, DetectionList, EngineOptions, RawOutputTensor, nms::non_max_suppression,
};

const BOX_PARAMS: usize = 4;
/// 通道数不小于该值时认为存在 objectness 通道（4 + 1 + 80）
const OBJECTNESS_MIN_CHANNELS: usize = 85;
/// 常见 COCO 导出的通道数（无/有 objectness）
const COCO_CHANNELS: [usize; 2] = [84, 85];
const CHANNEL_AXIS_MAX: usize = 200;
/// 坐标绝对值都不超过该值时视为相对输入尺寸的归一化坐标
const NORMALIZED_COORD_LIMIT: f32 = 1.5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
  #[error("不支持的输出维度数 {rank}，形状 {shape:?}")]
  UnsupportedRank { rank: usize, shape: Vec<usize> },
  #[error("四维输出中没有可去除的大小为 1 的维度，形状 {0:?}")]
  NoSingletonAxis(Vec<usize>),
  #[error("通道数或候选框数无效: channels={channels}, num_boxes={num_boxes}")]
  EmptyAxis { channels: usize, num_boxes: usize },
  #[error("类别数无效: channels={channels}")]
  NoClasses { channels: usize },
  #[error("输出张量元素数溢出: channels={channels}, num_boxes={num_boxes}")]
  Overflow { channels: usize, num_boxes: usize },
  #[error("输出张量过小: 实际 {actual}, 至少需要 {expected}")]
  TooSmall { actual: usize, expected: usize },
}

/// 推断出的输出张量布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLayout {
  pub channels: usize,
  pub num_boxes: usize,
  pub num_classes: usize,
  pub has_objectness: bool,
  /// true 时按 `[channel][box]` 索引，否则按 `[box][channel]`
  pub channels_first: bool,
}

fn plausible_channel_count(size: usize) -> bool {
  COCO_CHANNELS.contains(&size) || (size > BOX_PARAMS && size < CHANNEL_AXIS_MAX)
}

impl TensorLayout {
  /// 从形状推断布局
  ///
  /// 四维形状先去掉第一个（批次之后的）大小为 1 的维度。剩下两个维度中，
  /// 恰好一个像通道数时取它为通道轴；否则取较小者，相等时取前者（通道在前）。
  pub fn infer(shape: &[usize]) -> Result<Self, LayoutError> {
    let (d1, d2) = match shape {
      [_, d1, d2] => (*d1, *d2),
      [_, rest @ ..] if rest.len() == 3 => {
        let singleton = rest
          .iter()
          .position(|&d| d == 1)
          .ok_or_else(|| LayoutError::NoSingletonAxis(shape.to_vec()))?;
        let mut dims = rest.iter().enumerate().filter(|&(i, _)| i != singleton);
        match (dims.next(), dims.next()) {
          (Some((_, &a)), Some((_, &b))) => (a, b),
          _ => return Err(LayoutError::NoSingletonAxis(shape.to_vec())),
        }
      }
      _ => {
        return Err(LayoutError::UnsupportedRank {
          rank: shape.len(),
          shape: shape.to_vec(),
        });
      }
    };

    let channels_first = match (plausible_channel_count(d1), plausible_channel_count(d2)) {
      (true, false) => true,
      (false, true) => false,
      _ => d1 <= d2,
    };
    let (channels, num_boxes) = if channels_first { (d1, d2) } else { (d2, d1) };

    if channels == 0 || num_boxes == 0 {
      return Err(LayoutError::EmptyAxis {
        channels,
        num_boxes,
      });
    }

    if channels.checked_mul(num_boxes).is_none() {
      return Err(LayoutError::Overflow {
        channels,
        num_boxes,
      });
    }

    let has_objectness = channels >= OBJECTNESS_MIN_CHANNELS;
    let reserved = BOX_PARAMS + usize::from(has_objectness);
    if channels <= reserved {
      return Err(LayoutError::NoClasses { channels });
    }

    Ok(Self {
      channels,
      num_boxes,
      num_classes: channels - reserved,
      has_objectness,
      channels_first,
    })
  }

  /// 溢出时饱和为 `usize::MAX`，长度检查随之失败
  pub fn expected_len(&self) -> usize {
    self.channels.saturating_mul(self.num_boxes)
  }

  fn class_offset(&self) -> usize {
    BOX_PARAMS + usize::from(self.has_objectness)
  }

  #[inline]
  fn value(&self, values: &[f32], channel: usize, candidate: usize) -> f32 {
    if self.channels_first {
      values[channel * self.num_boxes + candidate]
    } else {
      values[candidate * self.channels + channel]
    }
  }

  /// 解码单个候选框；分数低于阈值或类别分数全部无效时返回 `None`
  fn candidate(
    &self,
    values: &[f32],
    index: usize,
    options: &EngineOptions,
  ) -> Option<Detection> {
    let at = |channel: usize| self.value(values, channel, index);

    let class_offset = self.class_offset();
    let mut best: Option<(u32, f32)> = None;
    for class in 0..self.num_classes {
      let score = at(class_offset + class);
      // 严格大于：同分时保留索引较小的类别
      if !score.is_nan() && best.is_none_or(|(_, best_score)| score > best_score) {
        best = Some((class as u32, score));
      }
    }
    let (class_id, class_score) = best?;

    let score = if self.has_objectness {
      at(BOX_PARAMS) * class_score
    } else {
      class_score
    };
    if !(score >= options.confidence_threshold) {
      return None;
    }

    let (cx, cy, w, h) = (at(0), at(1), at(2), at(3));
    Some(Detection {
      class_id,
      score,
      bbox: to_corners(cx, cy, w, h, options),
    })
  }
}

/// 中心点/宽高转换为角点，必要时从归一化坐标放大，并截断到输入尺寸内
///
/// 归一化判断是启发式的：绝对坐标下极小的框也可能被误判为归一化坐标。
fn to_corners(cx: f32, cy: f32, w: f32, h: f32, options: &EngineOptions) -> [f32; 4] {
  let input_width = options.input_width as f32;
  let input_height = options.input_height as f32;

  let normalized = cx.abs() <= NORMALIZED_COORD_LIMIT
    && cy.abs() <= NORMALIZED_COORD_LIMIT
    && w <= NORMALIZED_COORD_LIMIT
    && h <= NORMALIZED_COORD_LIMIT;
  let (scale_x, scale_y) = if normalized {
    (input_width, input_height)
  } else {
    (1.0, 1.0)
  };

  let (cx, cy, w, h) = (cx * scale_x, cy * scale_y, w * scale_x, h * scale_y);
  [
    (cx - w / 2.0).clamp(0.0, input_width),
    (cy - h / 2.0).clamp(0.0, input_height),
    (cx + w / 2.0).clamp(0.0, input_width),
    (cy + h / 2.0).clamp(0.0, input_height),
  ]
}

/// 推断布局并检查数据长度
pub fn inspect_output(output: &RawOutputTensor) -> Result<TensorLayout, LayoutError> {
  let layout = TensorLayout::infer(&output.shape)?;
  if output.values.len() < layout.expected_len() {
    return Err(LayoutError::TooSmall {
      actual: output.values.len(),
      expected: layout.expected_len(),
    });
  }
  Ok(layout)
}

/// 将原始输出张量解码为去重后的检测结果
///
/// 形状或长度异常时记录日志并返回空结果，不向上传播错误。
/// 批次维大于 1 时只解码第一个批次。
pub fn decode_detections(output: &RawOutputTensor, options: &EngineOptions) -> DetectionList {
  if output.values.is_empty() {
    return DetectionList::empty();
  }

  let layout = match inspect_output(output) {
    Ok(layout) => layout,
    Err(e) => {
      warn!("解码失败，输出形状 {:?}: {}", output.shape, e);
      return DetectionList::empty();
    }
  };

  debug!(
    "输出形状 {:?}: channels={}, num_boxes={}, num_classes={}, objectness={}, channels_first={}",
    output.shape,
    layout.channels,
    layout.num_boxes,
    layout.num_classes,
    layout.has_objectness,
    layout.channels_first
  );

  let candidates: Vec<Detection> = (0..layout.num_boxes)
    .filter_map(|index| layout.candidate(&output.values, index, options))
    .collect();
  debug!("阈值过滤后剩余 {} 个候选框", candidates.len());

  if candidates.is_empty() {
    return DetectionList::empty();
  }

  let kept = non_max_suppression(candidates, options.iou_threshold, options.max_detections);
  debug!("NMS 后保留 {} 个检测结果", kept.len());
  DetectionList::from(kept)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options() -> EngineOptions {
    EngineOptions::default()
      .with_input_size(100, 100)
      .with_thresholds(0.5, 0.45)
  }

  /// 按 `[channel][box]` 排列构造输出
  fn channels_first(rows: &[&[f32]]) -> RawOutputTensor {
    let num_boxes = rows[0].len();
    let values = rows.iter().flat_map(|r| r.iter().copied()).collect();
    RawOutputTensor::new(values, vec![1, rows.len(), num_boxes])
  }

  #[test]
  fn rank_two_is_rejected() {
    assert!(matches!(
      TensorLayout::infer(&[84, 8400]),
      Err(LayoutError::UnsupportedRank { rank: 2, .. })
    ));
    let output = RawOutputTensor::new(vec![0.5; 84 * 10], vec![84, 10]);
    assert!(decode_detections(&output, &options()).is_empty());
  }

  #[test]
  fn yolov8_layout_is_channels_first() {
    let layout = TensorLayout::infer(&[1, 84, 8400]).unwrap();
    assert_eq!(
      layout,
      TensorLayout {
        channels: 84,
        num_boxes: 8400,
        num_classes: 80,
        has_objectness: false,
        channels_first: true,
      }
    );
  }

  #[test]
  fn yolov5_layout_is_channels_last() {
    let layout = TensorLayout::infer(&[1, 25200, 85]).unwrap();
    assert_eq!(layout.channels, 85);
    assert_eq!(layout.num_boxes, 25200);
    assert_eq!(layout.num_classes, 80);
    assert!(layout.has_objectness);
    assert!(!layout.channels_first);
  }

  #[test]
  fn rank_four_drops_singleton() {
    let a = TensorLayout::infer(&[1, 1, 84, 8400]).unwrap();
    let b = TensorLayout::infer(&[1, 84, 8400, 1]).unwrap();
    let c = TensorLayout::infer(&[1, 84, 1, 8400]).unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(matches!(
      TensorLayout::infer(&[1, 2, 84, 8400]),
      Err(LayoutError::NoSingletonAxis(_))
    ));
  }

  #[test]
  fn ambiguous_dims_pick_smaller_axis() {
    // 两者都像通道数：取较小者
    let layout = TensorLayout::infer(&[1, 30, 6]).unwrap();
    assert_eq!((layout.channels, layout.num_boxes), (6, 30));
    assert!(!layout.channels_first);
    // 两者都不像：取较小者
    let layout = TensorLayout::infer(&[1, 300, 1000]).unwrap();
    assert_eq!((layout.channels, layout.num_boxes), (300, 1000));
    assert!(layout.has_objectness);
    // 相等时通道在前
    assert!(TensorLayout::infer(&[1, 10, 10]).unwrap().channels_first);
  }

  #[test]
  fn too_few_channels_fail_closed() {
    assert!(matches!(
      TensorLayout::infer(&[1, 4, 3]),
      Err(LayoutError::NoClasses { channels: 3 })
    ));
    assert!(matches!(
      TensorLayout::infer(&[1, 0, 10]),
      Err(LayoutError::EmptyAxis { .. })
    ));
  }

  #[test]
  fn short_tensor_fails_closed() {
    let output = RawOutputTensor::new(vec![0.9; 10], vec![1, 6, 2]);
    assert!(matches!(
      inspect_output(&output),
      Err(LayoutError::TooSmall {
        actual: 10,
        expected: 12
      })
    ));
    assert!(decode_detections(&output, &options()).is_empty());
  }

  #[test]
  fn huge_shape_fails_closed() {
    let output = RawOutputTensor::new(vec![0.9; 16], vec![1, 8, 1usize << 61]);
    assert!(matches!(
      inspect_output(&output),
      Err(LayoutError::Overflow { channels: 8, .. })
    ));
    assert!(decode_detections(&output, &options()).is_empty());

    let layout = TensorLayout {
      channels: 8,
      num_boxes: usize::MAX,
      num_classes: 4,
      has_objectness: false,
      channels_first: true,
    };
    assert_eq!(layout.expected_len(), usize::MAX);
  }

  #[test]
  fn normalized_coordinates_are_scaled() {
    let output = channels_first(&[
      &[0.5, 50.0],
      &[0.5, 50.0],
      &[0.2, 20.0],
      &[0.4, 40.0],
      &[0.9, 0.1],
      &[0.1, 0.8],
    ]);
    let result = decode_detections(&output, &options());
    assert_eq!(result.len(), 2);

    assert_eq!(result[0].class_id, 0);
    assert!((result[0].score - 0.9).abs() < 1e-6);
    let expected = [40.0, 30.0, 60.0, 70.0];
    for (got, want) in result[0].bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-4);
    }

    assert_eq!(result[1].class_id, 1);
    assert_eq!(result[1].bbox, [40.0, 30.0, 60.0, 70.0]);
  }

  #[test]
  fn boxes_are_clamped_to_input() {
    let output = channels_first(&[&[5.0], &[95.0], &[20.0], &[30.0], &[0.9]]);
    let result = decode_detections(&output, &options());
    assert_eq!(result[0].bbox, [0.0, 80.0, 15.0, 100.0]);
  }

  #[test]
  fn objectness_multiplies_class_score() {
    // 85 通道，box-major：[cx, cy, w, h, obj, 80 个类别]
    let mut row = vec![0.0f32; 85];
    row[..5].copy_from_slice(&[50.0, 50.0, 10.0, 10.0, 0.8]);
    row[5 + 17] = 0.9;
    let mut weak = row.clone();
    weak[4] = 0.5;
    let values = [row, weak].concat();
    let output = RawOutputTensor::new(values, vec![1, 2, 85]);

    let result = decode_detections(&output, &options());
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].class_id, 17);
    assert!((result[0].score - 0.72).abs() < 1e-6);
  }

  #[test]
  fn class_ties_prefer_lowest_index() {
    let output = channels_first(&[&[50.0], &[50.0], &[10.0], &[10.0], &[0.7], &[0.7], &[0.7]]);
    let result = decode_detections(&output, &options());
    assert_eq!(result[0].class_id, 0);
  }

  #[test]
  fn nan_scores_are_skipped() {
    let output = channels_first(&[
      &[50.0, 50.0],
      &[50.0, 50.0],
      &[10.0, 10.0],
      &[10.0, 10.0],
      &[f32::NAN, f32::NAN],
      &[0.6, f32::NAN],
    ]);
    let result = decode_detections(&output, &options());
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].class_id, 1);
  }

  #[test]
  fn results_respect_threshold_and_cap() {
    let n = 50;
    let xs: Vec<f32> = (0..n).map(|i| (i * 2) as f32).collect();
    let ys = vec![50.0; n];
    let sizes = vec![1.6; n];
    let scores: Vec<f32> = (0..n).map(|i| i as f32 / n as f32).collect();
    let output = channels_first(&[&xs[..], &ys[..], &sizes[..], &sizes[..], &scores[..]]);
    let options = options().with_max_detections(7);

    let result = decode_detections(&output, &options);
    assert_eq!(result.len(), 7);
    assert!(result.iter().all(|d| d.score >= 0.5));
    assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
  }
}
