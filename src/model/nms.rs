// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/model/nms.rs - 按类别的贪心非极大值抑制
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

use crate::model::Detection;

const IOU_EPSILON: f32 = 1e-6;

/// 两个框的交并比，分母加极小值以容忍退化框
pub fn iou(a: &Detection, b: &Detection) -> f32 {
  let inter_left = a.left().max(b.left());
  let inter_top = a.top().max(b.top());
  let inter_right = a.right().min(b.right());
  let inter_bottom = a.bottom().min(b.bottom());

  let inter_area = (inter_right - inter_left).max(0.0) * (inter_bottom - inter_top).max(0.0);
  let denom = a.area() + b.area() - inter_area + IOU_EPSILON;

  if denom <= 0.0 { 0.0 } else { inter_area / denom }
}

/// 按分数降序（同分保持原顺序）贪心保留，最多 `max_detections` 个
///
/// 只有同类别且 IoU 超过阈值的框会被抑制。
pub fn non_max_suppression(
  mut candidates: Vec<Detection>,
  iou_threshold: f32,
  max_detections: usize,
) -> Vec<Detection> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept = Vec::with_capacity(candidates.len().min(max_detections));
  let mut suppressed = vec![false; candidates.len()];

  for i in 0..candidates.len() {
    if kept.len() >= max_detections {
      break;
    }
    if suppressed[i] {
      continue;
    }

    let best = candidates[i];
    kept.push(best);

    for (j, candidate) in candidates.iter().enumerate().skip(i + 1) {
      if suppressed[j] || candidate.class_id != best.class_id {
        continue;
      }
      if iou(&best, candidate) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  kept
}
