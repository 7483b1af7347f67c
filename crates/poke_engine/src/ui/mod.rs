//! # UI widget tree
//!
//! Widgets are sized as a fraction of their parent's height and placed at one
//! of nine anchor points inside the parent's box. The root's parent box is
//! the viewport. Coordinates are pixels with the origin at the bottom-left
//! and y pointing up.
//!
//! Each render mode owns one [`UiTree`]. Layout runs top-down in a single
//! pass; results are read back through [`UiTree::layout`].

mod layout;
mod text;
mod tree;
mod widget;

pub use layout::LayoutRect;
pub use text::{layout_text, GlyphQuad};
pub use tree::UiTree;
pub use widget::{Anchor, TextContent, WidgetBuilder, WidgetId, WidgetNode, WidgetPayload};

use thiserror::Error;

/// Rejected UI composition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UiError {
    /// Height percent outside `(0, 1]`
    #[error("height percent must be in (0, 1], got {0}")]
    InvalidHeightPercent(f32),

    /// Aspect ratio not finite and positive
    #[error("aspect ratio must be positive, got {0}")]
    InvalidAspectRatio(f32),

    /// Width cutoff outside `(0, 1]`
    #[error("width cutoff must be in (0, 1], got {0}")]
    InvalidWidthCutoff(f32),

    /// Text origin component outside `[0, 1]`
    #[error("text origin must be in [0, 1], got ({0}, {1})")]
    InvalidTextOrigin(f32, f32),

    /// Setting text on a widget without a text payload
    #[error("widget has no text payload")]
    NotText,

    /// Widget id is not in this tree
    #[error("unknown widget")]
    UnknownWidget,

    /// Widget already has a parent or is a root
    #[error("widget is already attached")]
    AlreadyAttached,

    /// Attaching would make a widget its own ancestor
    #[error("cannot attach a widget inside its own subtree")]
    WouldCreateCycle,
}
