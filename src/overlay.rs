//! Caption rendering onto captured frames.
//!
//! Text is drawn with the 8×8 `font8x8` bitmap glyphs, scaled by an integer
//! factor. The origin is the bottom-left corner of the first glyph, so a
//! caption at `(50, 50)` sits just above row 50.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::types::Frame;

const GLYPH_SIZE: i32 = 8;

/// Largest accepted glyph magnification and stroke thickness.
pub const MAX_SCALE: u32 = 16;
pub const MAX_THICKNESS: u32 = 16;

/// Errors from drawing onto a frame.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("frame buffer holds {len} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },
}

/// Fixed placement and look of the emotion caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OverlayStyle {
    /// Bottom-left corner of the caption, in pixels.
    pub origin: (i32, i32),
    /// Caption colour as RGB.
    pub color: [u8; 3],
    /// Integer glyph magnification (1 = 8px glyphs).
    pub scale: u32,
    /// Stroke thickness in pixels.
    pub thickness: u32,
    /// Text placed before the label.
    pub prefix: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            origin: (50, 50),
            color: [0, 255, 0],
            scale: 3,
            thickness: 2,
            prefix: "Emotion: ".to_string(),
        }
    }
}

impl OverlayStyle {
    /// Full caption text for a label.
    pub fn caption(&self, label: &str) -> String {
        format!("{}{}", self.prefix, label)
    }

    /// Bring `scale` and `thickness` into `1..=16`.
    pub fn clamped(mut self) -> Self {
        self.scale = self.scale.clamp(1, MAX_SCALE);
        self.thickness = self.thickness.clamp(1, MAX_THICKNESS);
        self
    }
}

/// Draw the caption for `label` onto `frame` and hand the frame back.
pub fn annotate(mut frame: Frame, label: &str, style: &OverlayStyle) -> Result<Frame, AnnotateError> {
    if !frame.is_well_formed() {
        return Err(AnnotateError::BufferSize {
            len: frame.data.len(),
            expected: frame.expected_len(),
            width: frame.width,
            height: frame.height,
        });
    }
    draw_text(&mut frame, &style.caption(label), style);
    Ok(frame)
}

fn draw_text(frame: &mut Frame, text: &str, style: &OverlayStyle) {
    let scale = style.scale.clamp(1, MAX_SCALE) as i32;
    let stroke = scale + style.thickness.clamp(1, MAX_THICKNESS) as i32 - 1;
    let advance = GLYPH_SIZE * scale;
    let top = style.origin.1.saturating_sub(advance);
    let color = frame.order.arrange(style.color);

    let mut left = style.origin.0;
    for ch in text.chars() {
        if left >= frame.width as i32 {
            break;
        }
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let glyph_left = left;
        left = left.saturating_add(advance);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let x = glyph_left.saturating_add(col * scale);
                let y = top.saturating_add(row as i32 * scale);
                fill_rect(frame, x, y, stroke, stroke, color);
            }
        }
    }
}

/// Fill a rectangle, clipped to the frame.
fn fill_rect(frame: &mut Frame, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]) {
    let (fw, fh) = (frame.width as i32, frame.height as i32);
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(w).min(fw);
    let y1 = y.saturating_add(h).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let stride = frame.width as usize * 3;
    for py in y0..y1 {
        let row = py as usize * stride;
        for px in x0..x1 {
            let idx = row + px as usize * 3;
            frame.data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::types::ChannelOrder;

    fn black(width: u32, height: u32, order: ChannelOrder) -> Frame {
        Frame {
            data: vec![0; (width * height * 3) as usize],
            width,
            height,
            order,
            timestamp_us: 0,
        }
    }

    fn lit_pixels(frame: &Frame) -> Vec<(u32, u32, [u8; 3])> {
        frame
            .data
            .chunks_exact(3)
            .enumerate()
            .filter(|(_, px)| px.iter().any(|b| *b != 0))
            .map(|(i, px)| {
                (
                    i as u32 % frame.width,
                    i as u32 / frame.width,
                    [px[0], px[1], px[2]],
                )
            })
            .collect()
    }

    #[test]
    fn caption_is_drawn_above_origin_in_style_colour() {
        let style = OverlayStyle::default();
        let frame = annotate(black(640, 120, ChannelOrder::Rgb), "happy", &style).unwrap();
        let lit = lit_pixels(&frame);
        assert!(!lit.is_empty());
        for (x, y, px) in lit {
            assert!(x >= 50, "pixel left of origin at x={x}");
            assert!((26..=50).contains(&y), "pixel outside text band at y={y}");
            assert_eq!(px, [0, 255, 0]);
        }
    }

    #[test]
    fn colour_follows_frame_channel_order() {
        let style = OverlayStyle {
            color: [255, 0, 0],
            ..OverlayStyle::default()
        };
        let frame = annotate(black(640, 120, ChannelOrder::Bgr), "sad", &style).unwrap();
        let (_, _, px) = lit_pixels(&frame)[0];
        assert_eq!(px, [0, 0, 255]);
    }

    #[test]
    fn text_is_clipped_at_frame_edges() {
        let style = OverlayStyle {
            origin: (-20, 10),
            ..OverlayStyle::default()
        };
        // Narrow frame: most of the caption falls outside and must not panic.
        let frame = annotate(black(30, 12, ChannelOrder::Rgb), "surprise", &style).unwrap();
        assert!(frame.is_well_formed());
    }

    #[test]
    fn oversized_style_values_do_not_overflow() {
        let style = OverlayStyle {
            origin: (i32::MAX - 5, i32::MIN + 5),
            scale: u32::MAX,
            thickness: u32::MAX,
            ..OverlayStyle::default()
        };
        let frame = annotate(black(64, 64, ChannelOrder::Rgb), "fear", &style).unwrap();
        assert!(lit_pixels(&frame).is_empty());

        let style = OverlayStyle {
            origin: (0, 63),
            scale: u32::MAX,
            thickness: u32::MAX,
            ..OverlayStyle::default()
        };
        let frame = annotate(black(64, 64, ChannelOrder::Rgb), "fear", &style).unwrap();
        assert!(!lit_pixels(&frame).is_empty());
    }

    #[test]
    fn clamped_limits_scale_and_thickness() {
        let style = OverlayStyle {
            scale: 4_000_000_000,
            thickness: 0,
            ..OverlayStyle::default()
        }
        .clamped();
        assert_eq!(style.scale, MAX_SCALE);
        assert_eq!(style.thickness, 1);
        assert_eq!(OverlayStyle::default().clamped(), OverlayStyle::default());
    }

    #[test]
    fn different_labels_render_differently() {
        let style = OverlayStyle::default();
        let a = annotate(black(640, 80, ChannelOrder::Rgb), "happy", &style).unwrap();
        let b = annotate(black(640, 80, ChannelOrder::Rgb), "angry", &style).unwrap();
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn malformed_frame_is_rejected() {
        let mut frame = black(4, 4, ChannelOrder::Rgb);
        frame.data.truncate(10);
        let err = annotate(frame, "happy", &OverlayStyle::default()).unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::BufferSize {
                len: 10,
                expected: 48,
                ..
            }
        ));
    }

    #[test]
    fn caption_uses_prefix() {
        assert_eq!(
            OverlayStyle::default().caption("neutral"),
            "Emotion: neutral"
        );
    }
}
