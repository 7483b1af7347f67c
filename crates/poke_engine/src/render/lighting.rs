//! Per-frame camera and light state
//!
//! The render core does not own a camera or a light list. Callers hand both
//! to [`RenderManager::draw_frame`](crate::render::RenderManager::draw_frame)
//! every frame through a [`FrameContext`].

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Light kinds, stored in `params.x`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Parallel rays along `direction`
    Directional,
    /// Omnidirectional light at `position`
    Point,
    /// Cone of light at `position` facing `direction`
    Spot,
}

impl LightKind {
    fn as_param(self) -> f32 {
        match self {
            Self::Directional => 0.0,
            Self::Point => 1.0,
            Self::Spot => 2.0,
        }
    }
}

/// One light as the scene shader reads it
///
/// `params` is `(kind, inner cone degrees, outer cone degrees, enabled)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// World position (w = 1)
    pub position: Vec4,
    /// Facing direction (w = 0)
    pub direction: Vec4,
    /// Diffuse colour, alpha unused
    pub diffuse: Vec4,
    /// Specular colour, w = shininess
    pub specular: Vec4,
    /// Kind, cone angles and on/off flag
    pub params: Vec4,
}

impl Light {
    /// Sun-style light
    pub fn directional(direction: Vec3, diffuse: Vec3) -> Self {
        Self {
            position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            direction: direction.normalize().push(0.0),
            diffuse: diffuse.push(1.0),
            specular: Vec4::new(1.0, 1.0, 1.0, 1.0),
            params: Vec4::new(LightKind::Directional.as_param(), 0.0, 0.0, 1.0),
        }
    }

    /// Point light
    pub fn point(position: Vec3, diffuse: Vec3) -> Self {
        Self {
            position: position.push(1.0),
            direction: Vec4::zeros(),
            diffuse: diffuse.push(1.0),
            specular: Vec4::new(1.0, 1.0, 1.0, 1.0),
            params: Vec4::new(LightKind::Point.as_param(), 0.0, 0.0, 1.0),
        }
    }

    /// Spot light with inner/outer cone angles in degrees
    pub fn spot(position: Vec3, direction: Vec3, diffuse: Vec3, inner: f32, outer: f32) -> Self {
        Self {
            position: position.push(1.0),
            direction: direction.normalize().push(0.0),
            diffuse: diffuse.push(1.0),
            specular: Vec4::new(1.0, 1.0, 1.0, 1.0),
            params: Vec4::new(LightKind::Spot.as_param(), inner, outer, 1.0),
        }
    }

    /// Uniform name of a light field, e.g. `lights[2].diffuse`
    pub fn uniform_name(index: usize, field: &str) -> String {
        format!("lights[{index}].{field}")
    }
}

/// Camera and lights for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
    /// Lights pushed to the scene program
    pub lights: Vec<Light>,
    /// Player position, used by spawners that follow the player
    pub player_position: Vec3,
}

impl Default for FrameContext {
    fn default() -> Self {
        Self {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            lights: Vec::new(),
            player_position: Vec3::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_directional_light_is_normalized() {
        let light = Light::directional(Vec3::new(0.0, -2.0, 0.0), Vec3::new(1.0, 0.9, 0.8));
        assert_relative_eq!(light.direction, Vec4::new(0.0, -1.0, 0.0, 0.0));
        assert_relative_eq!(light.params.w, 1.0);
    }

    #[test]
    fn test_uniform_name() {
        assert_eq!(Light::uniform_name(1, "position"), "lights[1].position");
    }
}
