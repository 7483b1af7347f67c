//! Widget placement math

use crate::ui::Anchor;

/// Resolved widget box in pixels, origin bottom-left, y up
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    /// Left edge
    pub x: f32,
    /// Bottom edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl LayoutRect {
    /// Create a rectangle
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Box covering a viewport
    pub fn viewport(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Place a `width` x `height` box at `anchor` inside `self`
    pub fn place(&self, anchor: Anchor, width: f32, height: f32) -> Self {
        let (h, v) = anchor.to_normalized();
        Self {
            x: self.x + h * (self.width - width),
            y: self.y + v * (self.height - height),
            width,
            height,
        }
    }

    /// Right edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// `[x, y, w, h]` as fractions of a viewport
    pub fn to_viewport_fractions(&self, viewport_width: f32, viewport_height: f32) -> [f32; 4] {
        [
            self.x / viewport_width,
            self.y / viewport_height,
            self.width / viewport_width,
            self.height / viewport_height,
        ]
    }
}
