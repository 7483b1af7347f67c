use crate::render::device::TextureHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cells per atlas row
pub const FONT_ATLAS_COLS: u32 = 10;
/// Cell rows in the atlas
pub const FONT_ATLAS_ROWS: u32 = 9;

const FIRST_CELL_CHAR: u32 = ' ' as u32;

/// Metrics of one glyph, in atlas pixels at the font's glyph size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    /// Glyph bitmap size
    pub size: (i32, i32),
    /// Offset from the baseline to the glyph's left/top edge
    pub bearing: (i32, i32),
    /// Horizontal pen advance to the next glyph
    pub advance: u32,
}

/// Texture-space rectangle: `[u, v, width, height]`
pub type UvRect = [f32; 4];

/// Uploaded glyph atlas
#[derive(Debug, Clone, PartialEq)]
pub struct FontData {
    /// Pixel size the atlas was rendered at
    pub glyph_size: u32,
    /// Atlas texture
    pub texture: TextureHandle,
    /// Per-character metrics
    pub characters: HashMap<char, GlyphMetrics>,
}

impl FontData {
    /// Metrics of a character
    pub fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
        self.characters.get(&ch)
    }

    /// Atlas cell of a character
    ///
    /// Cells hold consecutive code points starting at space, row-major from
    /// the top-left.
    pub fn cell_uv(ch: char) -> Option<UvRect> {
        let index = (ch as u32).checked_sub(FIRST_CELL_CHAR)?;
        if index >= FONT_ATLAS_COLS * FONT_ATLAS_ROWS {
            return None;
        }

        let width = 1.0 / FONT_ATLAS_COLS as f32;
        let height = 1.0 / FONT_ATLAS_ROWS as f32;
        let col = index % FONT_ATLAS_COLS;
        let row = index / FONT_ATLAS_COLS;
        Some([col as f32 * width, row as f32 * height, width, height])
    }
}
