//! Caption rasterization: wrapping, measurement, and painting of caption
//! blocks (with stroke and an optional background plate) onto RGBA frames.

use std::{collections::HashMap, path::Path};

use fontdue::{
    Font, FontSettings,
    layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle},
};
use image::RgbaImage;

use crate::error::{ReelError, ReelResult};

/// Plate padding around the text bounding box, per side.
const PLATE_PADDING: u32 = 16;
/// Extra vertical slack below the text so descenders and strokes never clip.
const PLATE_BOTTOM_SLACK: u32 = 10;
const PLATE_ALPHA: u8 = 140;

#[derive(Clone, Copy, Debug)]
pub struct CaptionStyle {
    pub font_size: f32,
    pub color: [u8; 4],
    pub stroke_color: [u8; 4],
    pub stroke_width: u32,
    pub plate: bool,
}

/// Parse a `#RRGGBB` (or `#RRGGBBAA`) color string.
pub fn parse_hex_color(s: &str) -> ReelResult<[u8; 4]> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return Err(ReelError::template(format!("invalid color '{s}'")));
    }
    let parse_pair = |i: usize| -> ReelResult<u8> {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| ReelError::template(format!("invalid color '{s}'")))
    };
    match hex.len() {
        6 => Ok([parse_pair(0)?, parse_pair(2)?, parse_pair(4)?, 255]),
        8 => Ok([parse_pair(0)?, parse_pair(2)?, parse_pair(4)?, parse_pair(6)?]),
        _ => Err(ReelError::template(format!("invalid color '{s}'"))),
    }
}

struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

pub struct CaptionPainter {
    font: Font,
    glyph_cache: HashMap<fontdue::layout::GlyphRasterConfig, GlyphBitmap>,
}

impl CaptionPainter {
    pub fn load(font_path: &Path) -> ReelResult<Self> {
        let bytes = std::fs::read(font_path).map_err(|e| {
            ReelError::template(format!("cannot read font '{}': {e}", font_path.display()))
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
            ReelError::template(format!("cannot parse font '{}': {e}", font_path.display()))
        })?;
        Ok(Self {
            font,
            glyph_cache: HashMap::new(),
        })
    }

    pub fn line_height(&self, font_size: f32) -> u32 {
        self.font
            .horizontal_line_metrics(font_size)
            .map(|m| m.new_line_size)
            .unwrap_or(font_size * 1.2)
            .ceil() as u32
    }

    fn measure(&self, line: &str, font_size: f32) -> f32 {
        line.chars()
            .map(|c| self.font.metrics(c, font_size).advance_width)
            .sum()
    }

    pub fn line_width(&self, line: &str, font_size: f32) -> u32 {
        self.measure(line, font_size).ceil() as u32
    }

    /// Wrap text to a pixel width. Explicit newlines are respected; otherwise
    /// characters accumulate greedily, preferring the last space as the break
    /// point for spaced scripts (CJK breaks on any character).
    pub fn wrap(&self, text: &str, font_size: f32, max_width: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for logical in text.split('\n') {
            if logical.is_empty() {
                lines.push(String::new());
                continue;
            }
            let mut current = String::new();
            let mut width = 0.0f32;
            for ch in logical.chars() {
                let advance = self.font.metrics(ch, font_size).advance_width;
                if !current.is_empty() && width + advance > max_width as f32 {
                    if let Some(space) = current.rfind(' ') {
                        let rest = current[space + 1..].to_string();
                        current.truncate(space);
                        lines.push(std::mem::take(&mut current));
                        width = self.measure(&rest, font_size);
                        current = rest;
                    } else {
                        lines.push(std::mem::take(&mut current));
                        width = 0.0;
                    }
                }
                if ch == ' ' && current.is_empty() {
                    continue;
                }
                current.push(ch);
                width += advance;
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }
        lines
    }

    /// Bounding box of a wrapped block: (max line width, lines * line height).
    pub fn block_size(&self, lines: &[String], font_size: f32) -> (u32, u32) {
        let width = lines
            .iter()
            .map(|l| self.line_width(l, font_size))
            .max()
            .unwrap_or(0);
        (width, lines.len() as u32 * self.line_height(font_size))
    }

    /// Full painted height of a block at `top_y`, plate included.
    pub fn painted_height(&self, lines: &[String], style: &CaptionStyle) -> u32 {
        let (_, text_h) = self.block_size(lines, style.font_size);
        if style.plate {
            text_h + 2 * PLATE_PADDING + PLATE_BOTTOM_SLACK
        } else {
            text_h
        }
    }

    /// Paint a wrapped caption block horizontally centered with its top edge
    /// at `top_y`. Stroke is an offset pass in the stroke color beneath the
    /// fill pass.
    pub fn paint(&mut self, frame: &mut RgbaImage, lines: &[String], style: &CaptionStyle, top_y: u32) {
        if lines.is_empty() {
            return;
        }
        let (block_w, block_h) = self.block_size(lines, style.font_size);
        let frame_w = frame.width();

        let mut text_top = top_y;
        if style.plate {
            let plate_w = block_w + 2 * PLATE_PADDING;
            let plate_h = block_h + 2 * PLATE_PADDING + PLATE_BOTTOM_SLACK;
            let plate_x = frame_w.saturating_sub(plate_w) / 2;
            fill_rect(frame, plate_x, top_y, plate_w, plate_h, [0, 0, 0, PLATE_ALPHA]);
            text_top += PLATE_PADDING;
        }

        let line_height = self.line_height(style.font_size);
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_w = self.line_width(line, style.font_size);
            let x = frame_w.saturating_sub(line_w) / 2;
            let y = text_top + i as u32 * line_height;

            let sw = style.stroke_width as i32;
            if sw > 0 {
                for dx in -sw..=sw {
                    for dy in -sw..=sw {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        self.paint_line(
                            frame,
                            line,
                            style.font_size,
                            x as i32 + dx,
                            y as i32 + dy,
                            style.stroke_color,
                        );
                    }
                }
            }
            self.paint_line(frame, line, style.font_size, x as i32, y as i32, style.color);
        }
    }

    fn paint_line(
        &mut self,
        frame: &mut RgbaImage,
        line: &str,
        font_size: f32,
        x: i32,
        y: i32,
        color: [u8; 4],
    ) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: x as f32,
            y: y as f32,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(line, font_size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (metrics, bitmap) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: metrics.width,
                    height: metrics.height,
                    bitmap,
                }
            });
            blend_glyph(
                frame,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                bitmap,
                color,
            );
        }
    }
}

fn fill_rect(frame: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) {
    let (fw, fh) = (frame.width(), frame.height());
    for py in y..(y + h).min(fh) {
        for px in x..(x + w).min(fw) {
            blend_pixel(frame.get_pixel_mut(px, py), color, color[3]);
        }
    }
}

fn blend_glyph(frame: &mut RgbaImage, x: i32, y: i32, glyph: &GlyphBitmap, color: [u8; 4]) {
    let (fw, fh) = (frame.width() as i32, frame.height() as i32);
    for gy in 0..glyph.height as i32 {
        for gx in 0..glyph.width as i32 {
            let px = x + gx;
            let py = y + gy;
            if px < 0 || py < 0 || px >= fw || py >= fh {
                continue;
            }
            let coverage = glyph.bitmap[gy as usize * glyph.width + gx as usize];
            if coverage == 0 {
                continue;
            }
            let alpha = (coverage as u16 * color[3] as u16 / 255) as u8;
            blend_pixel(frame.get_pixel_mut(px as u32, py as u32), color, alpha);
        }
    }
}

fn blend_pixel(dst: &mut image::Rgba<u8>, color: [u8; 4], alpha: u8) {
    let a = alpha as u16;
    let inv = 255 - a;
    for c in 0..3 {
        dst.0[c] = ((color[c] as u16 * a + dst.0[c] as u16 * inv + 127) / 255) as u8;
    }
    dst.0[3] = dst.0[3].max(alpha);
}
