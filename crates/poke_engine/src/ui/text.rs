//! Glyph quad layout for text widgets

use crate::render::resources::{FontData, UvRect};
use crate::ui::{LayoutRect, TextContent};

/// One glyph on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    /// Screen box in pixels
    pub rect: LayoutRect,
    /// Atlas cell
    pub uv: UvRect,
}

impl GlyphQuad {
    /// Glyph buffer entry: `rect` as fractions of the viewport, then `uv`
    pub fn to_floats(&self, viewport_width: f32, viewport_height: f32) -> [f32; 8] {
        let [x, y, w, h] = self.rect.to_viewport_fractions(viewport_width, viewport_height);
        let [u, v, uw, uh] = self.uv;
        [x, y, w, h, u, v, uw, uh]
    }
}

/// Lay out a line of text inside a widget box
///
/// Glyphs are scaled so the font's glyph size matches the content's share
/// of the box height. The pen starts at `origin` within the box and stops emitting at the first
/// glyph whose right edge passes the width cutoff. Characters the font does
/// not know advance by a space and draw nothing.
pub fn layout_text(bounds: &LayoutRect, content: &TextContent, font: &FontData) -> Vec<GlyphQuad> {
    if font.glyph_size == 0 {
        return Vec::new();
    }

    let scale = bounds.height * content.height_percent / font.glyph_size as f32;
    let cutoff = bounds.x + content.width_cutoff * bounds.width;
    let space_advance = font.glyph(' ').map_or(0.0, |g| g.advance as f32 * scale);

    let mut pen_x = bounds.x + content.origin.x * bounds.width;
    let pen_y = bounds.y + content.origin.y * bounds.height;
    let mut quads = Vec::with_capacity(content.text.len());

    for ch in content.text.chars() {
        let Some(glyph) = font.glyph(ch) else {
            pen_x += space_advance;
            continue;
        };

        let (size_x, size_y) = (glyph.size.0 as f32, glyph.size.1 as f32);
        let (bearing_x, bearing_y) = (glyph.bearing.0 as f32, glyph.bearing.1 as f32);
        let rect = LayoutRect::new(
            pen_x + bearing_x * scale,
            pen_y - (size_y - bearing_y) * scale,
            size_x * scale,
            size_y * scale,
        );

        if rect.right() > cutoff {
            break;
        }

        if let Some(uv) = FontData::cell_uv(ch) {
            if rect.width > 0.0 && rect.height > 0.0 {
                quads.push(GlyphQuad { rect, uv });
            }
        }
        pen_x += glyph.advance as f32 * scale;
    }

    quads
}
