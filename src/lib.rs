// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/lib.rs - 库主文件
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

//! 端侧目标检测的数值前/后处理核心。
//!
//! 处理流程（每帧严格顺序执行）：
//! 1. [`preprocess::yuv420_to_rgb`]：YUV 4:2:0 平面图像转换为交错 RGB；
//! 2. [`preprocess::rotate_rgb`]：按 90° 的倍数旋转；
//! 3. [`preprocess::resize_normalize`]：双线性缩放到模型输入尺寸并归一化到 [0, 1]；
//! 4. [`model::decode_detections`]：推断输出张量布局、解码候选框、按类别 NMS。
//!
//! 推理引擎本身由调用方通过 [`engine::InferenceBackend`] 提供。

pub mod engine;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod preprocess;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}
