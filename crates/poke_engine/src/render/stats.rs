//! Per-frame draw statistics

use std::fmt;
use std::time::Duration;

/// What one call to `draw_frame` drew and skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Instances drawn in the scene pass
    pub instances_drawn: usize,
    /// Instances skipped because their mesh or program was missing
    pub instances_skipped: usize,
    /// Draw calls issued over all passes
    pub draw_calls: usize,
    /// Whether the skybox pass drew
    pub skybox_drawn: bool,
    /// Spawners with at least one live particle that were drawn
    pub particle_systems_drawn: usize,
    /// Particles drawn over all spawners
    pub particles_drawn: usize,
    /// Widgets drawn
    pub widgets_drawn: usize,
    /// Widgets skipped because their texture or font was missing
    pub widgets_skipped: usize,
    /// Glyph quads drawn
    pub glyphs_drawn: usize,
    /// Mode overlays drawn
    pub overlays_drawn: usize,
    /// Wall-clock time spent in `draw_frame`
    pub elapsed: Duration,
    /// Whether `elapsed` exceeded the frame budget
    pub over_budget: bool,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} draws | instances {} (+{} skipped) | skybox {} | particles {} in {} systems | widgets {} (+{} skipped), glyphs {} | overlays {} | {:.2}ms",
            self.draw_calls,
            self.instances_drawn,
            self.instances_skipped,
            if self.skybox_drawn { "on" } else { "off" },
            self.particles_drawn,
            self.particle_systems_drawn,
            self.widgets_drawn,
            self.widgets_skipped,
            self.glyphs_drawn,
            self.overlays_drawn,
            self.elapsed.as_secs_f64() * 1000.0,
        )
    }
}
