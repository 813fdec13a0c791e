//! Drawing of detections onto images.
//!
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use rusttype::{Font, Scale};

use crate::{nn::Detection, results::class_name};

const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_SCALE: Scale = Scale { x: 18.0, y: 18.0 };

/// Load a TrueType font from disk.
pub fn load_font(path: impl AsRef<Path>) -> Result<Font<'static>> {
    let path = path.as_ref();
    let font_data = std::fs::read(path)
        .with_context(|| format!("failed to read font {}", path.display()))?;

    Font::try_from_vec(font_data).ok_or_else(|| anyhow!("{} is not a valid font", path.display()))
}

/// Draw a rectangle and a class label for every detection.
///
/// Without a font only the rectangles are drawn.
pub fn draw_detections(frame: &mut RgbImage, detections: &[Detection], font: Option<&Font>) {
    for detection in detections {
        let [x1, y1, x2, y2] = detection.bbox;
        let (x1, y1, x2, y2) = (x1 as i32, y1 as i32, x2 as i32, y2 as i32);
        let rect_width = (x2 - x1).max(1) as u32;
        let rect_height = (y2 - y1).max(1) as u32;

        // Two nested rectangles give a border of 2 pixels
        draw_hollow_rect_mut(
            frame,
            Rect::at(x1, y1).of_size(rect_width, rect_height),
            BOX_COLOR,
        );
        if rect_width > 2 && rect_height > 2 {
            draw_hollow_rect_mut(
                frame,
                Rect::at(x1 + 1, y1 + 1).of_size(rect_width - 2, rect_height - 2),
                BOX_COLOR,
            );
        }

        if let Some(font) = font {
            draw_label(frame, x1, y1, &class_name(detection), font);
        }
    }
}

/// Draw `label` in white on a filled black box sitting on top of the point `(x, y)`.
///
/// When there is no room above the point, the label is placed below it.
fn draw_label(frame: &mut RgbImage, x: i32, y: i32, label: &str, font: &Font) {
    let (text_width, text_height) = text_size(LABEL_SCALE, font, label);
    let box_height = text_height + 3;
    let top = if y >= box_height { y - box_height } else { y };

    draw_filled_rect_mut(
        frame,
        Rect::at(x, top).of_size(text_width.max(1) as u32, box_height.max(1) as u32),
        BOX_COLOR,
    );
    draw_text_mut(frame, TEXT_COLOR, x, top + 1, LABEL_SCALE, font, label);
}
