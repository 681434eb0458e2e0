// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/bin/simple_preprocess.rs - 预处理测试代码
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use shanan_edge::{
  FromUrl,
  input::Yuv420FileInput,
  model::DetectionList,
  output::{Render, SaveImageFileOutput},
  preprocess::Preprocessor,
};
use tracing::info;

/// 把 I420 原始帧预处理为模型输入，并以图片形式保存
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，例如 yuv:///data/frame.yuv?width=640&height=480&rotation=90
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///tmp/tensor.png?numbered
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 模型输入宽度
  #[arg(long, default_value = "640")]
  pub width: usize,
  /// 模型输入高度
  #[arg(long, default_value = "640")]
  pub height: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = Yuv420FileInput::from_url(&args.input)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let mut preprocessor = Preprocessor::new();

  for image in input {
    let frame = image.as_frame();
    frame.validate()?;

    let now = std::time::Instant::now();
    let tensor = preprocessor.run(&frame, args.width, args.height);
    info!("预处理完成，耗时: {:.2?}", now.elapsed());

    output.render_result(&tensor.to_rgb(), &DetectionList::empty())?;
  }

  Ok(())
}
