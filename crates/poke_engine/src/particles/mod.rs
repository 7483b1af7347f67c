//! Particle spawners
//!
//! A [`ParticleSpawner`] is a fixed-capacity pool of short-lived particles.
//! It only simulates; the render manager owns the GPU buffer each spawner
//! mirrors into and draws from it.

mod spawner;

pub use spawner::{Particle, ParticleModel, ParticleSpawner, ParticleSpawnerConfig};
