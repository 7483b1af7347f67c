use crate::foundation::math::{remap_unit, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What each particle is drawn as
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleModel {
    /// Mesh file, loaded for `program`
    pub mesh: String,
    /// Program the particles are drawn with
    pub program: String,
    /// Texture bound for the draw
    pub texture: String,
    /// Uniform scale applied to the mesh
    pub scale: f32,
}

/// Spawner tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSpawnerConfig {
    /// Spawn origin; relative to the tracked position when tracking
    pub origin: Vec3,
    /// Most particles alive at once
    pub capacity: usize,
    /// Seconds between timed spawns; `<= 0` disables timed spawning
    pub spawn_interval: f32,
    /// Seconds a particle lives
    pub lifetime: f32,
    /// Lower corner of the spawn offset box
    pub min_offset: Vec3,
    /// Upper corner of the spawn offset box
    pub max_offset: Vec3,
    /// Velocity given to every new particle
    pub velocity: Vec3,
    /// Add the tracked external position to the origin at spawn time
    pub track_external_position: bool,
    /// How the particles are drawn
    pub model: ParticleModel,
    /// Base seed of the per-axis generators; random when `None`
    pub seed: Option<u64>,
}

impl Default for ParticleSpawnerConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::zeros(),
            capacity: 100,
            spawn_interval: 0.1,
            lifetime: 1.0,
            min_offset: Vec3::zeros(),
            max_offset: Vec3::zeros(),
            velocity: Vec3::zeros(),
            track_external_position: false,
            model: ParticleModel {
                mesh: "SpriteHolder.obj".to_string(),
                program: "particle".to_string(),
                texture: String::new(),
                scale: 1.0,
            },
            seed: None,
        }
    }
}

/// One live particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// World velocity
    pub velocity: Vec3,
    /// Seconds since spawn
    pub age: f32,
}

/// Bounded pool of particles
///
/// The pool never holds more than `capacity` particles. A full pool is not an
/// error: the spawn is skipped and the interval carries over to the next
/// update.
#[derive(Debug, Clone)]
pub struct ParticleSpawner {
    config: ParticleSpawnerConfig,
    particles: Vec<Particle>,
    mirror: Vec<[f32; 4]>,
    timer: f32,
    rng: [StdRng; 3],
}

impl ParticleSpawner {
    /// Create an empty spawner
    pub fn new(config: ParticleSpawnerConfig) -> Self {
        let base = config.seed.unwrap_or_else(rand::random);
        let rng = [
            StdRng::seed_from_u64(base),
            StdRng::seed_from_u64(base.wrapping_add(1)),
            StdRng::seed_from_u64(base.wrapping_add(2)),
        ];

        Self {
            particles: Vec::with_capacity(config.capacity),
            mirror: Vec::with_capacity(config.capacity),
            timer: 0.0,
            rng,
            config,
        }
    }

    /// Spawner tuning
    pub fn config(&self) -> &ParticleSpawnerConfig {
        &self.config
    }

    /// Particles alive now
    pub fn live_count(&self) -> usize {
        self.particles.len()
    }

    /// Most particles alive at once
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Seconds accumulated towards the next timed spawn
    pub fn timer(&self) -> f32 {
        self.timer
    }

    /// Live particles in pool order
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// `xyz + age` for each live particle; slot `i` mirrors pool slot `i`
    pub fn gpu_mirror(&self) -> &[[f32; 4]] {
        &self.mirror
    }

    /// Whether the pool is at capacity
    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.config.capacity
    }

    /// Spawn one particle; `false` when the pool is full
    pub fn spawn_particle(&mut self, tracked_position: Option<Vec3>) -> bool {
        if self.is_full() {
            return false;
        }

        let min = self.config.min_offset;
        let max = self.config.max_offset;
        let offset = Vec3::new(
            remap_unit(self.rng[0].gen::<f32>(), min.x, max.x),
            remap_unit(self.rng[1].gen::<f32>(), min.y, max.y),
            remap_unit(self.rng[2].gen::<f32>(), min.z, max.z),
        );

        let mut position = self.config.origin + offset;
        if self.config.track_external_position {
            if let Some(tracked) = tracked_position {
                position += tracked;
            }
        }

        let particle = Particle {
            position,
            velocity: self.config.velocity,
            age: 0.0,
        };
        self.mirror.push(mirror_entry(&particle));
        self.particles.push(particle);
        true
    }

    /// Spawn up to `count` particles; returns how many were spawned
    pub fn spawn_burst(&mut self, count: usize, tracked_position: Option<Vec3>) -> usize {
        (0..count)
            .take_while(|_| self.spawn_particle(tracked_position))
            .count()
    }

    /// Advance the pool by `dt` seconds
    ///
    /// At most one timed spawn happens per update. Expired particles are
    /// removed, survivors move, and the mirror is rebuilt for the live prefix.
    pub fn update(&mut self, dt: f32, tracked_position: Option<Vec3>) {
        if self.config.spawn_interval > 0.0 {
            self.timer += dt;
            if self.timer > self.config.spawn_interval && self.spawn_particle(tracked_position) {
                self.timer -= self.config.spawn_interval;
            }
        }

        let lifetime = self.config.lifetime;
        self.particles.retain_mut(|particle| {
            particle.age += dt;
            if particle.age > lifetime {
                return false;
            }
            particle.position += particle.velocity * dt;
            true
        });

        self.mirror.clear();
        self.mirror.extend(self.particles.iter().map(mirror_entry));
    }

    /// Remove every particle and reset the timer
    pub fn clear(&mut self) {
        self.particles.clear();
        self.mirror.clear();
        self.timer = 0.0;
    }
}

fn mirror_entry(particle: &Particle) -> [f32; 4] {
    [particle.position.x, particle.position.y, particle.position.z, particle.age]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(capacity: usize, spawn_interval: f32, lifetime: f32) -> ParticleSpawnerConfig {
        ParticleSpawnerConfig {
            capacity,
            spawn_interval,
            lifetime,
            seed: Some(7),
            ..ParticleSpawnerConfig::default()
        }
    }

    #[test]
    fn test_three_slot_scenario() {
        let mut spawner = ParticleSpawner::new(config(3, 0.1, 1.0));

        for _ in 0..10 {
            spawner.update(0.05, None);
            assert!(spawner.timer() >= 0.0);
        }

        assert_eq!(spawner.live_count(), 3);
        assert!(spawner.particles().iter().all(|p| p.age <= 1.0));
        assert_eq!(spawner.gpu_mirror().len(), 3);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut spawner = ParticleSpawner::new(config(5, 0.01, 10.0));
        for step in 0..500 {
            let dt = if step % 3 == 0 { 0.2 } else { 0.005 };
            spawner.update(dt, None);
            spawner.spawn_burst(2, None);
            assert!(spawner.live_count() <= 5);
            assert!(spawner.gpu_mirror().len() <= 5);
        }
    }

    #[test]
    fn test_full_pool_keeps_timer() {
        let mut spawner = ParticleSpawner::new(config(1, 0.1, 10.0));
        spawner.spawn_particle(None);

        spawner.update(0.15, None);
        assert_relative_eq!(spawner.timer(), 0.15);
        spawner.update(0.15, None);
        assert_relative_eq!(spawner.timer(), 0.3);
        assert_eq!(spawner.live_count(), 1);
    }

    #[test]
    fn test_one_spawn_per_update() {
        let mut spawner = ParticleSpawner::new(config(10, 0.1, 10.0));
        spawner.update(1.0, None);
        assert_eq!(spawner.live_count(), 1);
        assert_relative_eq!(spawner.timer(), 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_expired_particle_absent_from_pool_and_mirror() {
        let mut spawner = ParticleSpawner::new(config(4, 0.0, 0.3));
        spawner.spawn_particle(None);
        spawner.update(0.2, None);
        spawner.spawn_particle(None);
        spawner.update(0.05, None);
        assert_eq!(spawner.live_count(), 2);

        // first particle reaches 0.35 > 0.3, second 0.15
        spawner.update(0.1, None);
        assert_eq!(spawner.live_count(), 1);
        assert_eq!(spawner.gpu_mirror().len(), 1);
        assert_relative_eq!(spawner.gpu_mirror()[0][3], 0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_removal_visits_every_particle_once() {
        let mut spawner = ParticleSpawner::new(ParticleSpawnerConfig {
            velocity: Vec3::new(1.0, 0.0, 0.0),
            ..config(6, 0.0, 0.5)
        });
        for _ in 0..3 {
            spawner.spawn_particle(None);
            spawner.spawn_particle(None);
            spawner.update(0.2, None);
        }
        // pairs aged 0.6 (expired), 0.4 and 0.2
        assert_eq!(spawner.live_count(), 4);

        let ages: Vec<f32> = spawner.particles().iter().map(|p| p.age).collect();
        assert_relative_eq!(ages[0], 0.4, epsilon = 1e-6);
        assert_relative_eq!(ages[1], 0.4, epsilon = 1e-6);
        assert_relative_eq!(ages[3], 0.2, epsilon = 1e-6);
        for (particle, slot) in spawner.particles().iter().zip(spawner.gpu_mirror()) {
            assert_relative_eq!(particle.position.x, slot[0]);
            assert_relative_eq!(particle.position.x, particle.age, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_offsets_stay_in_bounds_and_follow_tracking() {
        let mut spawner = ParticleSpawner::new(ParticleSpawnerConfig {
            origin: Vec3::new(0.0, 13.0, 0.0),
            min_offset: Vec3::new(-20.0, 0.0, -20.0),
            max_offset: Vec3::new(20.0, 0.0, 20.0),
            track_external_position: true,
            ..config(50, 0.05, 10.0)
        });
        let player = Vec3::new(100.0, 0.0, -50.0);
        assert_eq!(spawner.spawn_burst(60, Some(player)), 50);

        for particle in spawner.particles() {
            let local = particle.position - player;
            assert!(local.x.abs() <= 20.001);
            assert_relative_eq!(local.y, 13.0, epsilon = 1e-4);
            assert!(local.z.abs() <= 20.001);
        }
    }

    #[test]
    fn test_same_seed_same_offsets() {
        let cfg = ParticleSpawnerConfig {
            min_offset: Vec3::new(-1.0, -1.0, -1.0),
            max_offset: Vec3::new(1.0, 1.0, 1.0),
            ..config(3, 0.1, 1.0)
        };
        let mut a = ParticleSpawner::new(cfg.clone());
        let mut b = ParticleSpawner::new(cfg);
        a.spawn_burst(3, None);
        b.spawn_burst(3, None);
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn test_zero_interval_disables_timed_spawns() {
        let mut spawner = ParticleSpawner::new(config(3, 0.0, 1.0));
        for _ in 0..10 {
            spawner.update(0.5, None);
        }
        assert_eq!(spawner.live_count(), 0);
        assert_relative_eq!(spawner.timer(), 0.0);
    }
}
