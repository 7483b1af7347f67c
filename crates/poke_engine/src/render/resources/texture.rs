use crate::foundation::math::Vec2;
use crate::render::device::{TextureHandle, TextureTarget};

/// Uploaded texture or cubemap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    /// Device handle
    pub handle: TextureHandle,
    /// Binding target
    pub target: TextureTarget,
    /// Width in pixels (of one face for cubemaps)
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Texture divided into a grid of equally sized sprites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSheet {
    /// Sheet texture
    pub texture: Texture,
    /// Sprites per row
    pub cols: u32,
    /// Rows of sprites
    pub rows: u32,
    /// Sprites are drawn mirrored on their other facing
    pub symmetrical: bool,
}

impl SpriteSheet {
    /// Number of sprites on the sheet
    pub fn sprite_count(&self) -> u32 {
        self.cols * self.rows
    }

    /// UV offset and scale of a sprite
    ///
    /// Sprites are numbered row-major starting at the top-left cell.
    /// Returns `None` past the last cell.
    pub fn sprite_rect(&self, sprite_id: u32) -> Option<(Vec2, Vec2)> {
        if self.cols == 0 || self.rows == 0 || sprite_id >= self.sprite_count() {
            return None;
        }

        let scale = Vec2::new(1.0 / self.cols as f32, 1.0 / self.rows as f32);
        let col = sprite_id % self.cols;
        let row = sprite_id / self.cols;
        let offset = Vec2::new(col as f32 * scale.x, row as f32 * scale.y);
        Some((offset, scale))
    }
}
