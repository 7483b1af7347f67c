use crate::foundation::math::{Vec2, Vec3};
use crate::ui::UiError;
use slotmap::new_key_type;

new_key_type! {
    /// Widget handle inside a [`UiTree`](crate::ui::UiTree)
    pub struct WidgetId;
}

/// Placement of a widget inside its parent's box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// Top-left corner
    TopLeft,
    /// Top edge, centred
    TopMiddle,
    /// Top-right corner
    TopRight,
    /// Left edge, centred
    MiddleLeft,
    /// Centre
    #[default]
    MiddleMiddle,
    /// Right edge, centred
    MiddleRight,
    /// Bottom-left corner
    BottomLeft,
    /// Bottom edge, centred
    BottomMiddle,
    /// Bottom-right corner
    BottomRight,
}

impl Anchor {
    /// Normalized anchor position with y up: `(0, 0)` bottom-left, `(1, 1)` top-right
    pub fn to_normalized(self) -> (f32, f32) {
        match self {
            Self::TopLeft => (0.0, 1.0),
            Self::TopMiddle => (0.5, 1.0),
            Self::TopRight => (1.0, 1.0),
            Self::MiddleLeft => (0.0, 0.5),
            Self::MiddleMiddle => (0.5, 0.5),
            Self::MiddleRight => (1.0, 0.5),
            Self::BottomLeft => (0.0, 0.0),
            Self::BottomMiddle => (0.5, 0.0),
            Self::BottomRight => (1.0, 0.0),
        }
    }
}

/// A line of text drawn inside a widget
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    /// Font name in the resource cache
    pub font: String,
    /// Characters to draw
    pub text: String,
    /// RGB colour
    pub color: Vec3,
    /// Pen start as a fraction of the widget box, each component in `[0, 1]`
    pub origin: Vec2,
    /// Fraction of the widget width past which glyphs are dropped
    pub width_cutoff: f32,
    /// Glyph height as a fraction of the widget height, in `(0, 1]`
    pub height_percent: f32,
}

impl TextContent {
    /// White, full-height text starting at the bottom-left, no cutoff
    pub fn new(font: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            font: font.into(),
            text: text.into(),
            color: Vec3::new(1.0, 1.0, 1.0),
            origin: Vec2::zeros(),
            width_cutoff: 1.0,
            height_percent: 1.0,
        }
    }

    /// Set the colour
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Set the pen origin
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Set the width cutoff
    pub fn with_width_cutoff(mut self, cutoff: f32) -> Self {
        self.width_cutoff = cutoff;
        self
    }

    /// Set the glyph height relative to the widget, for labels on a larger widget
    pub fn with_height_percent(mut self, percent: f32) -> Self {
        self.height_percent = percent;
        self
    }

    fn validate(&self) -> Result<(), UiError> {
        validate_height_percent(self.height_percent)?;
        if !(self.width_cutoff > 0.0 && self.width_cutoff <= 1.0) {
            return Err(UiError::InvalidWidthCutoff(self.width_cutoff));
        }
        let unit = 0.0..=1.0;
        if !(unit.contains(&self.origin.x) && unit.contains(&self.origin.y)) {
            return Err(UiError::InvalidTextOrigin(self.origin.x, self.origin.y));
        }
        Ok(())
    }
}

/// What a widget draws
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetPayload {
    /// A whole texture
    StaticImage {
        /// Texture name
        texture: String,
    },
    /// One sprite of a sprite sheet
    AnimatedSprite {
        /// Sprite sheet name
        sheet: String,
        /// Sprite index on the sheet
        sprite_id: u32,
    },
    /// A line of text
    Text(TextContent),
}

/// One node of a widget tree
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetNode {
    /// Parent widget, `None` for roots and detached widgets
    pub parent: Option<WidgetId>,
    /// Children in draw order
    pub children: Vec<WidgetId>,
    /// Fraction of the parent's height, in `(0, 1]`
    pub height_percent: f32,
    /// Height divided by width
    pub aspect_ratio: f32,
    /// Placement inside the parent's box
    pub anchor: Anchor,
    /// Drawn content; containers have none
    pub payload: Option<WidgetPayload>,
    pub(crate) dirty: bool,
}

impl WidgetNode {
    /// Text payload, if this is a text widget
    pub fn text(&self) -> Option<&TextContent> {
        match &self.payload {
            Some(WidgetPayload::Text(text)) => Some(text),
            _ => None,
        }
    }
}

pub(crate) fn validate_height_percent(percent: f32) -> Result<(), UiError> {
    if percent > 0.0 && percent <= 1.0 {
        Ok(())
    } else {
        Err(UiError::InvalidHeightPercent(percent))
    }
}

/// Validating constructor for [`WidgetNode`]
#[derive(Debug, Clone)]
pub struct WidgetBuilder {
    height_percent: f32,
    aspect_ratio: f32,
    anchor: Anchor,
    payload: Option<WidgetPayload>,
}

impl WidgetBuilder {
    /// Widget with no content, full parent height, square, centred
    pub fn container() -> Self {
        Self {
            height_percent: 1.0,
            aspect_ratio: 1.0,
            anchor: Anchor::default(),
            payload: None,
        }
    }

    /// Widget drawing a whole texture
    pub fn image(texture: impl Into<String>) -> Self {
        Self::container().payload(WidgetPayload::StaticImage {
            texture: texture.into(),
        })
    }

    /// Widget drawing one sprite of a sheet
    pub fn sprite(sheet: impl Into<String>, sprite_id: u32) -> Self {
        Self::container().payload(WidgetPayload::AnimatedSprite {
            sheet: sheet.into(),
            sprite_id,
        })
    }

    /// Widget drawing a line of text
    pub fn text(content: TextContent) -> Self {
        Self::container().payload(WidgetPayload::Text(content))
    }

    /// Replace the payload
    pub fn payload(mut self, payload: WidgetPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Fraction of the parent's height
    pub fn height_percent(mut self, percent: f32) -> Self {
        self.height_percent = percent;
        self
    }

    /// Height divided by width
    pub fn aspect_ratio(mut self, ratio: f32) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Placement inside the parent
    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Validate and build a detached node
    pub fn build(self) -> Result<WidgetNode, UiError> {
        validate_height_percent(self.height_percent)?;
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(UiError::InvalidAspectRatio(self.aspect_ratio));
        }
        if let Some(WidgetPayload::Text(text)) = &self.payload {
            text.validate()?;
        }

        Ok(WidgetNode {
            parent: None,
            children: Vec::new(),
            height_percent: self.height_percent,
            aspect_ratio: self.aspect_ratio,
            anchor: self.anchor,
            payload: self.payload,
            dirty: true,
        })
    }
}
