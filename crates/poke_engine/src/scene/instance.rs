use crate::foundation::math::{Vec2, Vec3, Vec4};
use crate::render::device::BufferHandle;
use crate::render::{PerMode, RenderMode};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to a scene instance
    pub struct InstanceHandle;
}

/// Per-instance offsets for instanced draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instancing {
    /// Buffer of `vec4` offsets, one per instance
    pub offsets: BufferHandle,
    /// Number of instances drawn
    pub count: u32,
}

/// Texture coordinates scrolled over time, for water, foam and waves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureScroll {
    /// Offset added to texture coordinates, each component in `[0, 1)`
    pub offset: Vec2,
    /// Offset change per second
    pub speed: Vec2,
    /// Seconds of animation so far
    pub timer: f32,
}

impl TextureScroll {
    /// Scroll starting at offset zero
    pub fn new(speed: Vec2) -> Self {
        Self {
            offset: Vec2::zeros(),
            speed,
            timer: 0.0,
        }
    }

    /// Advance by `dt` seconds, wrapping the offset
    pub fn advance(&mut self, dt: f32) {
        self.timer += dt;
        self.offset = (self.offset + self.speed * dt).map(|c| c.rem_euclid(1.0));
    }
}

/// How an instance is textured
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InstanceMaterial {
    /// Each sub-mesh's own texture, or the instance override
    #[default]
    Mesh,
    /// One cell of a sprite sheet, for characters drawn on a quad
    Sprite {
        /// Sprite sheet name
        sheet: String,
        /// Cell index on the sheet
        sprite_id: u32,
    },
    /// Mesh textures with scrolling texture coordinates
    Animated(TextureScroll),
}

/// A placed copy of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableInstance {
    /// Mesh file name
    pub mesh: String,
    /// Program the mesh was loaded for
    pub program: String,
    /// World position
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z
    pub orientation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Texture drawn instead of each sub-mesh's own
    pub texture_override: Option<String>,
    /// Flat colour used instead of vertex/texture colour
    pub whole_color: Option<Vec4>,
    /// Offsets for instanced draws
    pub instancing: Option<Instancing>,
    /// Texturing mode
    pub material: InstanceMaterial,
}

impl RenderableInstance {
    /// Instance at the origin with unit scale
    pub fn new(mesh: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            program: program.into(),
            position: Vec3::zeros(),
            orientation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            texture_override: None,
            whole_color: None,
            instancing: None,
            material: InstanceMaterial::Mesh,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the orientation
    pub fn with_orientation(mut self, orientation: Vec3) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set a uniform scale
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Override the texture of every sub-mesh
    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture_override = Some(texture.into());
        self
    }

    /// Draw in a flat colour
    pub fn with_whole_color(mut self, color: Vec4) -> Self {
        self.whole_color = Some(color);
        self
    }

    /// Draw `count` copies offset by the vectors in `offsets`
    pub fn with_instancing(mut self, offsets: BufferHandle, count: u32) -> Self {
        self.instancing = Some(Instancing { offsets, count });
        self
    }

    /// Draw one sprite of a sheet instead of the mesh textures
    pub fn with_sprite(mut self, sheet: impl Into<String>, sprite_id: u32) -> Self {
        self.material = InstanceMaterial::Sprite {
            sheet: sheet.into(),
            sprite_id,
        };
        self
    }

    /// Scroll texture coordinates by `speed` per second
    pub fn with_texture_scroll(mut self, speed: Vec2) -> Self {
        self.material = InstanceMaterial::Animated(TextureScroll::new(speed));
        self
    }

    /// Select another cell of a sprite instance's sheet; `false` for other materials
    pub fn set_sprite_id(&mut self, id: u32) -> bool {
        match &mut self.material {
            InstanceMaterial::Sprite { sprite_id, .. } => {
                *sprite_id = id;
                true
            }
            _ => false,
        }
    }
}

/// Arena of instances plus the per-mode draw lists
#[derive(Debug, Default)]
pub struct InstanceArena {
    instances: SlotMap<InstanceHandle, RenderableInstance>,
    modes: PerMode<Vec<InstanceHandle>>,
}

impl InstanceArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an instance and list it for `mode`
    pub fn add(&mut self, mode: RenderMode, instance: RenderableInstance) -> InstanceHandle {
        let handle = self.instances.insert(instance);
        self.modes.get_mut(mode).push(handle);
        handle
    }

    /// Also draw an existing instance in `mode`; `false` for a stale handle
    pub fn show_in(&mut self, mode: RenderMode, handle: InstanceHandle) -> bool {
        if !self.instances.contains_key(handle) {
            return false;
        }
        let list = self.modes.get_mut(mode);
        if !list.contains(&handle) {
            list.push(handle);
        }
        true
    }

    /// Stop drawing an instance in `mode` without removing it
    pub fn hide_in(&mut self, mode: RenderMode, handle: InstanceHandle) {
        self.modes.get_mut(mode).retain(|h| *h != handle);
    }

    /// Remove an instance from the arena and from every mode list
    pub fn remove(&mut self, handle: InstanceHandle) -> Option<RenderableInstance> {
        let instance = self.instances.remove(handle)?;
        for list in self.modes.iter_mut() {
            list.retain(|h| *h != handle);
        }
        Some(instance)
    }

    /// Advance every scrolling material by `dt` seconds
    pub fn advance_animations(&mut self, dt: f32) {
        for instance in self.instances.values_mut() {
            if let InstanceMaterial::Animated(scroll) = &mut instance.material {
                scroll.advance(dt);
            }
        }
    }

    /// Look up an instance
    pub fn get(&self, handle: InstanceHandle) -> Option<&RenderableInstance> {
        self.instances.get(handle)
    }

    /// Look up an instance for mutation
    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut RenderableInstance> {
        self.instances.get_mut(handle)
    }

    /// Handles drawn in `mode`, in insertion order
    pub fn handles(&self, mode: RenderMode) -> &[InstanceHandle] {
        self.modes.get(mode)
    }

    /// Number of stored instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
