//! Scene instances
//!
//! Instances live in one arena and are addressed by [`InstanceHandle`]. Each
//! render mode keeps an ordered list of the handles it draws, so switching
//! modes never moves or drops an instance.

mod instance;

pub use instance::{InstanceArena, InstanceHandle, InstanceMaterial, Instancing, RenderableInstance, TextureScroll};
