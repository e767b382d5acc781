/// Presents a rendered frame buffer as coloured terminal characters
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use proj3d_core::{FrameBuffer, Rgb};
use std::io::Write;

/// Character luminosity ramp (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Maps packed pixels to terminal cells, one cell per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiRenderer;

impl AsciiRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Character and colour for one pixel. Cells no face reached (infinite
    /// depth) stay blank, whatever their colour.
    pub fn cell(&self, pixel: u32, depth: f64) -> (char, Color) {
        if !depth.is_finite() {
            return (' ', Color::Reset);
        }

        let Rgb { r, g, b } = Rgb::unpack(pixel);
        let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
        let index = (luminance * (LUMINOSITY_RAMP.len() - 1) as f64).round() as usize;
        let character = LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)];

        // Unlit faces would be black on black
        let color = if (r, g, b) == (0, 0, 0) {
            Color::DarkGrey
        } else {
            Color::Rgb { r, g, b }
        };
        (character, color)
    }

    /// Queue the whole frame starting at row `top`. The caller flushes.
    pub fn draw<W: Write>(
        &self,
        writer: &mut W,
        frame: &FrameBuffer,
        top: u16,
    ) -> std::io::Result<()> {
        let width = frame.width.max(1);
        let rows = frame.color.chunks(width).zip(frame.depth.chunks(width));
        for (y, (colors, depths)) in rows.enumerate() {
            writer.queue(cursor::MoveTo(0, top.saturating_add(y as u16)))?;

            let mut current = None;
            for (&pixel, &depth) in colors.iter().zip(depths) {
                let (c, color) = self.cell(pixel, depth);
                // Only emit a colour change when it differs from the last cell
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}
