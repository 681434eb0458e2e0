// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/bin/simple_decode.rs - 后处理测试代码
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde_json::{Value, json};

use shanan_edge::model::{EngineOptions, RawOutputTensor, decode_detections, inspect_output};
use tracing::info;

/// 解码保存为 JSON 的模型输出张量并打印检测结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 张量文件，格式为 {"shape": [...], "data": [...]}
  #[arg(long, value_name = "FILE")]
  pub tensor: PathBuf,
  /// 模型输入宽度
  #[arg(long, default_value = "640")]
  pub width: usize,
  /// 模型输入高度
  #[arg(long, default_value = "640")]
  pub height: usize,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub conf: f32,
  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,
  /// 最多保留的检测数
  #[arg(long, default_value = "100")]
  pub max: usize,
}

fn read_tensor(path: &Path) -> Result<RawOutputTensor> {
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("无法读取张量文件 {}", path.display()))?;
  let value: Value = serde_json::from_str(&text)?;

  let shape = value["shape"]
    .as_array()
    .ok_or_else(|| anyhow!("缺少 shape 字段"))?
    .iter()
    .map(|v| {
      v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| anyhow!("shape 中的维度无效: {}", v))
    })
    .collect::<Result<Vec<_>>>()?;
  let values = value["data"]
    .as_array()
    .ok_or_else(|| anyhow!("缺少 data 字段"))?
    .iter()
    .map(|v| {
      v.as_f64()
        .map(|x| x as f32)
        .ok_or_else(|| anyhow!("data 中的数值无效: {}", v))
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(RawOutputTensor::new(values, shape))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let options = EngineOptions::default()
    .with_input_size(args.width, args.height)
    .with_thresholds(args.conf, args.iou)
    .with_max_detections(args.max)
    .normalized()?;

  let tensor = read_tensor(&args.tensor)?;
  info!("张量形状: {:?}, 共 {} 个数值", tensor.shape, tensor.values.len());
  match inspect_output(&tensor) {
    Ok(layout) => info!("推断布局: {:?}", layout),
    Err(e) => info!("无法推断布局: {}", e),
  }

  let detections = decode_detections(&tensor, &options);
  let items: Vec<Value> = detections
    .iter()
    .map(|det| {
      json!({
        "class_id": det.class_id,
        "score": det.score,
        "bbox": det.bbox,
      })
    })
    .collect();
  println!("{}", serde_json::to_string_pretty(&json!({ "detections": items }))?);

  Ok(())
}
