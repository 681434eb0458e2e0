// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/engine.rs - 检测引擎：预处理、推理后端与解码的串联
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

//! # 检测引擎
//!
//! [`Engine`] 持有推理后端、会话配置和预处理暂存区，一次调用处理一帧：
//!
//! ```text
//! Yuv420Frame -> RGB -> 旋转 -> 缩放归一化 -> 推理后端 -> 解码 + NMS -> DetectionList
//! ```
//!
//! 推理后端通过 [`InferenceBackend`] 接入，本模块不关心它运行在 CPU 还是 GPU 上。
//!
//! ## 基本用法
//!
//! ```no_run
//! use shanan_edge::{FromUrl, engine::{EngineBuilder, InferenceBackend, LoadBackend}};
//! use shanan_edge::frame::{TensorBuffer, Yuv420Frame};
//! use shanan_edge::model::{EngineOptions, RawOutputTensor};
//! use url::Url;
//!
//! struct MyBackend;
//!
//! impl InferenceBackend for MyBackend {
//!   type Error = std::io::Error;
//!   fn infer(&mut self, _input: &TensorBuffer) -> Result<RawOutputTensor, Self::Error> {
//!     Ok(RawOutputTensor::new(vec![0.0; 84 * 8400], vec![1, 84, 8400]))
//!   }
//! }
//!
//! impl LoadBackend for MyBackend {
//!   fn load(_path: &std::path::Path, _options: &EngineOptions) -> Result<Self, Self::Error> {
//!     Ok(MyBackend)
//!   }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("model:///data/yolo.tflite?width=320&height=320&conf=0.25")?;
//! let mut engine = EngineBuilder::from_url(&url)?.build::<MyBackend>()?;
//!
//! let (y, u, v) = (vec![0u8; 64 * 48], vec![128u8; 32 * 24], vec![128u8; 32 * 24]);
//! let frame = Yuv420Frame::new(&y, &u, &v, 64, 48).with_rotation(90);
//! let detections = engine.process(&frame)?;
//! for det in &detections {
//!   println!("{} {:.2} {:?}", det.class_id, det.score, det.bbox);
//! }
//! # Ok(())
//! # }
//! ```

use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{FrameError, TensorBuffer, Yuv420Frame},
  model::{DetectionList, EngineOptions, OptionsError, RawOutputTensor, decode_detections},
  preprocess::Preprocessor,
};

/// 宿主边界的状态码
pub struct Status;

impl Status {
  pub const SUCCESS: i32 = 0;
  pub const INVALID_INPUT: i32 = -1;
  pub const PROCESSING_FAILED: i32 = -2;
}

/// 推理后端：接收归一化的 HWC 浮点张量，返回原始输出张量及其形状
pub trait InferenceBackend {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&mut self, input: &TensorBuffer) -> Result<RawOutputTensor, Self::Error>;
}

/// 可由模型文件创建的推理后端
///
/// 线程数、GPU 与 FP16 等选项随 [`EngineOptions`] 原样传入。
pub trait LoadBackend: InferenceBackend + Sized {
  fn load(model_path: &Path, options: &EngineOptions) -> Result<Self, Self::Error>;
}

#[derive(Error, Debug)]
pub enum EngineError<E> {
  #[error("输入帧无效: {0}")]
  InvalidInput(#[from] FrameError),
  #[error("配置无效: {0}")]
  InvalidOptions(#[from] OptionsError),
  #[error("模型加载失败: {0}")]
  Load(E),
  #[error("推理后端错误: {0}")]
  Backend(E),
}

impl<E> EngineError<E> {
  /// 映射到宿主边界的状态码
  pub fn status_code(&self) -> i32 {
    match self {
      EngineError::InvalidInput(_) | EngineError::InvalidOptions(_) => Status::INVALID_INPUT,
      EngineError::Load(_) | EngineError::Backend(_) => Status::PROCESSING_FAILED,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("模型路径为空")]
  EmptyPath,
  #[error("参数 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
}

fn parse_query<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value {
    "" | "1" | "true" | "on" => Ok(true),
    "0" | "false" | "off" => Ok(false),
    _ => Err(ConfigError::InvalidValue {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

pub struct EngineBuilder {
  model_path: PathBuf,
  options: EngineOptions,
}

impl FromUrlWithScheme for EngineBuilder {
  const SCHEME: &'static str = "model";
}

impl FromUrl for EngineBuilder {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConfigError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }
    if url.path().is_empty() {
      return Err(ConfigError::EmptyPath);
    }

    let mut options = EngineOptions::default();
    for (key, value) in url.query_pairs() {
      match &*key {
        "width" => options.input_width = parse_query(&key, &value)?,
        "height" => options.input_height = parse_query(&key, &value)?,
        "threads" => options.num_threads = parse_query(&key, &value)?,
        "max" => options.max_detections = parse_query(&key, &value)?,
        "conf" => options.confidence_threshold = parse_query(&key, &value)?,
        "iou" => options.iou_threshold = parse_query(&key, &value)?,
        "gpu" => options.use_gpu = parse_flag(&key, &value)?,
        "fp16" => options.allow_fp16 = parse_flag(&key, &value)?,
        other => warn!("忽略未知的模型参数: {}={}", other, value),
      }
    }

    Ok(EngineBuilder {
      model_path: PathBuf::from(url.path()),
      options,
    })
  }
}

impl EngineBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      options: EngineOptions::default(),
    }
  }

  pub fn options(mut self, options: EngineOptions) -> Self {
    self.options = options;
    self
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn engine_options(&self) -> &EngineOptions {
    &self.options
  }

  /// 加载推理后端并创建引擎；失败即相当于宿主边界返回空句柄
  pub fn build<B: LoadBackend>(self) -> Result<Engine<B>, EngineError<B::Error>> {
    let options = self.options.normalized()?;
    info!("加载模型文件: {}", self.model_path.display());
    debug!("引擎配置: {:?}", options);

    let backend = B::load(&self.model_path, &options).map_err(|e| {
      error!("推理后端创建失败: {}", e);
      EngineError::Load(e)
    })?;
    info!("模型加载完成");

    Engine::with_backend(backend, options)
  }
}

/// 单路视频流的检测引擎
///
/// 内部缓冲区逐帧复用，`process` 需要独占访问；多路并发流应各自创建实例。
/// 引擎释放时一并释放推理后端。
pub struct Engine<B> {
  backend: B,
  options: EngineOptions,
  preprocessor: Preprocessor,
  logged_shapes: bool,
}

impl<B: InferenceBackend> Engine<B> {
  pub fn with_backend(
    backend: B,
    options: EngineOptions,
  ) -> Result<Self, EngineError<B::Error>> {
    Ok(Self {
      backend,
      options: options.normalized()?,
      preprocessor: Preprocessor::new(),
      logged_shapes: false,
    })
  }

  pub fn options(&self) -> &EngineOptions {
    &self.options
  }

  pub fn preprocessor(&self) -> &Preprocessor {
    &self.preprocessor
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  /// 处理一帧并返回检测结果
  ///
  /// 输出张量形状异常不算失败，结果为空列表；
  /// 输入帧无效或推理后端出错时返回错误，可用 [`EngineError::status_code`] 转成状态码。
  pub fn process(
    &mut self,
    frame: &Yuv420Frame<'_>,
  ) -> Result<DetectionList, EngineError<B::Error>> {
    frame.validate().inspect_err(|e| warn!("输入帧无效: {}", e))?;

    let (width, height) = (self.options.input_width, self.options.input_height);
    let tensor = self.preprocessor.run(frame, width, height);
    debug!("执行模型推理");
    let output = self.backend.infer(tensor).map_err(|e| {
      error!("模型推理失败: {}", e);
      EngineError::Backend(e)
    })?;

    if !self.logged_shapes {
      info!(
        "模型输入形状 [1, {}, {}, 3]，输出形状 {:?}",
        height, width, output.shape
      );
      self.logged_shapes = true;
    }

    let detections = decode_detections(&output, &self.options);
    debug!("检测到 {} 个物体", detections.len());
    Ok(detections)
  }

  /// 宿主风格的调用：返回状态码与检测结果，失败时结果为空
  pub fn process_status(&mut self, frame: &Yuv420Frame<'_>) -> (i32, DetectionList) {
    match self.process(frame) {
      Ok(detections) => (Status::SUCCESS, detections),
      Err(e) => (e.status_code(), DetectionList::empty()),
    }
  }
}

impl<B> Drop for Engine<B> {
  fn drop(&mut self) {
    debug!("释放检测引擎");
  }
}
