// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/output/record.rs - 检测结果文本记录
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

use std::path::Path;

use crate::model::DetectionList;

/// 每个目标一行：`类别, 分数, 左, 上, 右, 下`
#[derive(Debug, Default, Clone, Copy)]
pub struct Record;

impl Record {
  pub fn format(&self, result: &DetectionList) -> String {
    result
      .iter()
      .map(|item| {
        format!(
          "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
          item.class_id, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// 写到与 `path` 同名的 `.txt` 文件
  pub fn record(&self, result: &DetectionList, path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.format(result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Detection;

  #[test]
  fn one_line_per_detection() {
    let result = DetectionList::from(vec![
      Detection {
        class_id: 2,
        score: 0.875,
        bbox: [1.0, 2.0, 3.0, 4.0],
      },
      Detection {
        class_id: 0,
        score: 0.5,
        bbox: [0.0, 0.0, 10.5, 8.25],
      },
    ]);
    assert_eq!(
      Record.format(&result),
      "2, 0.8750, 1.0000, 2.0000, 3.0000, 4.0000\n0, 0.5000, 0.0000, 0.0000, 10.5000, 8.2500"
    );
    assert_eq!(Record.format(&DetectionList::empty()), "");
  }
}
