// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/task.rs - 检测任务
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

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{
  engine::{Engine, InferenceBackend},
  frame::{RgbBuffer, Yuv420Image},
  model::DetectionList,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskSummary {
  pub frames: usize,
  pub detections: usize,
  pub elapsed: Duration,
}

// 检测一帧并把结果从模型输入坐标映射回旋转后的画面坐标
fn detect_and_render<B, O>(
  engine: &mut Engine<B>,
  output: &O,
  image: &Yuv420Image,
) -> anyhow::Result<usize>
where
  B: InferenceBackend,
  O: Render<RgbBuffer, DetectionList>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  let result = engine.process(&image.as_frame())?;
  let model_size = (engine.options().input_width, engine.options().input_height);
  let oriented = engine.preprocessor().oriented();
  let scaled = result.rescaled(model_size, (oriented.width(), oriented.height()));
  output.render_result(oriented, &scaled)?;
  Ok(scaled.len())
}

pub struct OneShotTask;

impl<B, I, O> Task<I, Engine<B>, O> for OneShotTask
where
  B: InferenceBackend,
  I: Iterator<Item = Yuv420Image>,
  O: Render<RgbBuffer, DetectionList>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    mut engine: Engine<B>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let detections = detect_and_render(&mut engine, &output, &image)?;
    let elapsed = now.elapsed();
    info!("推理与渲染完成，耗时: {:.2?}", elapsed);

    Ok(TaskSummary {
      frames: 1,
      detections,
      elapsed,
    })
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<B, I, O> Task<I, Engine<B>, O> for ContinuousTask
where
  B: InferenceBackend,
  I: Iterator<Item = Yuv420Image>,
  O: Render<RgbBuffer, DetectionList>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    mut engine: Engine<B>,
    output: O,
  ) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let start = Instant::now();
    let mut summary = TaskSummary::default();

    for image in input {
      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
      summary.frames += 1;
      info!("处理第 {} 帧图像", summary.frames);

      let now = Instant::now();
      summary.detections += detect_and_render(&mut engine, &output, &image)?;
      info!("推理完成，耗时: {:.2?}", now.elapsed());
    }

    if summary.frames == 0 {
      warn!("输入中没有任何帧");
    }
    summary.elapsed = start.elapsed();
    info!(
      "任务完成: {} 帧, {} 个目标, 总耗时 {:.2?}",
      summary.frames, summary.detections, summary.elapsed
    );
    Ok(summary)
  }
}
