// 该文件是 Shanan Edge （山南西风·端侧） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{ImageBuffer, Rgb, RgbImage};

use crate::{
  frame::{RgbBuffer, TensorBuffer},
  model::DetectionList,
};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: i32 = 2;

pub struct Draw {
  color: [u8; 3],
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: BOX_COLOR,
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = color;
    self
  }

  // bbox 为像素坐标 [left, top, right, bottom]
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[f32; 4]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for thickness in 0..self.thickness {
      let x_min_t = (x_min + thickness).min(x_max);
      let y_min_t = (y_min + thickness).min(y_max);
      let x_max_t = (x_max - thickness).max(x_min);
      let y_max_t = (y_max - thickness).max(y_min);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, Rgb(self.color));
        image.put_pixel(x as u32, y_max_t as u32, Rgb(self.color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, Rgb(self.color));
        image.put_pixel(x_max_t as u32, y as u32, Rgb(self.color));
      }
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectionList) {
    for item in result.iter() {
      self.draw_bbox(image, &item.bbox);
    }
  }

  pub fn draw_detection<F: ToRgbImage>(&self, frame: &F, result: &DetectionList) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl ToRgbImage for RgbBuffer {
  fn to_rgb_image(&self) -> RgbImage {
    ImageBuffer::from_fn(self.width() as u32, self.height() as u32, |x, y| {
      let pixel = self.pixel(x as usize, y as usize);
      Rgb([pixel[0], pixel[1], pixel[2]])
    })
  }
}

impl ToRgbImage for TensorBuffer {
  fn to_rgb_image(&self) -> RgbImage {
    self.to_rgb().to_rgb_image()
  }
}
