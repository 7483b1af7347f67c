//! Weather and fog
//!
//! The environment owns the current weather, the fog it implies and the
//! weather particle spawner, if the weather has one. Skybox selection lives
//! here too since it changes with the scene, not the render mode.

use crate::config::FogSettings;
use crate::foundation::math::Vec3;
use crate::particles::{ParticleModel, ParticleSpawner, ParticleSpawnerConfig};
use std::fmt;

/// Weather states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Weather {
    /// Clear skies
    #[default]
    None,
    /// Light snowfall
    Snow,
    /// Hail
    Hail,
    /// Heavy snow
    Snowstorm,
    /// Rain
    Rain,
    /// Heavy rain
    HeavyRain,
    /// Sandstorm
    Sandstorm,
    /// Falling leaves
    Leaves,
}

/// Groups of weathers that blend into each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherFamily {
    /// No weather
    Clear,
    /// Snow, hail and snowstorm
    Snow,
    /// Rain and heavy rain
    Rain,
    /// Sandstorm
    Sand,
    /// Leaves
    Leaves,
}

impl Weather {
    /// Family this weather belongs to
    pub fn family(self) -> WeatherFamily {
        match self {
            Self::None => WeatherFamily::Clear,
            Self::Snow | Self::Hail | Self::Snowstorm => WeatherFamily::Snow,
            Self::Rain | Self::HeavyRain => WeatherFamily::Rain,
            Self::Sandstorm => WeatherFamily::Sand,
            Self::Leaves => WeatherFamily::Leaves,
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fog uniforms pushed every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    /// Exponential density; 0 disables fog
    pub density: f32,
    /// Falloff gradient
    pub gradient: f32,
    /// RGB colour
    pub color: Vec3,
}

impl From<&FogSettings> for FogState {
    fn from(settings: &FogSettings) -> Self {
        Self {
            density: settings.density,
            gradient: settings.gradient,
            color: Vec3::from(settings.color),
        }
    }
}

const SNOW_GREY: f32 = 0.89;

fn weather_spawner_config(weather: Weather) -> Option<ParticleSpawnerConfig> {
    match weather {
        Weather::Snow => Some(snow_spawner_config()),
        _ => None,
    }
}

/// Tuning of the snowfall spawner
pub fn snow_spawner_config() -> ParticleSpawnerConfig {
    ParticleSpawnerConfig {
        origin: Vec3::new(0.0, 13.0, 0.0),
        capacity: 500,
        spawn_interval: 0.05,
        lifetime: 10.0,
        min_offset: Vec3::new(-20.0, 0.0, -20.0),
        max_offset: Vec3::new(20.0, 0.0, 20.0),
        velocity: Vec3::new(0.0, -3.0, 0.0),
        track_external_position: true,
        model: ParticleModel {
            mesh: "SpriteHolder.obj".to_string(),
            program: "snow".to_string(),
            texture: "SnowFlake3.png".to_string(),
            scale: 0.3,
        },
        seed: None,
    }
}

/// Weather, fog and skybox of the current scene
#[derive(Debug)]
pub struct Environment {
    weather: Weather,
    fog: FogState,
    default_fog: FogState,
    skybox: Option<String>,
    weather_spawner: Option<ParticleSpawner>,
}

impl Environment {
    /// Clear weather with the configured default fog
    pub fn new(default_fog: &FogSettings) -> Self {
        let fog = FogState::from(default_fog);
        Self {
            weather: Weather::None,
            fog,
            default_fog: fog,
            skybox: None,
            weather_spawner: None,
        }
    }

    /// Current weather
    pub fn weather(&self) -> Weather {
        self.weather
    }

    /// Current fog
    pub fn fog(&self) -> &FogState {
        &self.fog
    }

    /// Cubemap drawn as the skybox
    pub fn skybox(&self) -> Option<&str> {
        self.skybox.as_deref()
    }

    /// Select the skybox cubemap; `None` disables the skybox pass
    pub fn set_skybox(&mut self, cubemap: Option<String>) {
        self.skybox = cubemap;
    }

    /// Weather particle spawner, if the weather has one
    pub fn weather_spawner(&self) -> Option<&ParticleSpawner> {
        self.weather_spawner.as_ref()
    }

    /// Mutable weather particle spawner
    pub fn weather_spawner_mut(&mut self) -> Option<&mut ParticleSpawner> {
        self.weather_spawner.as_mut()
    }

    /// Tuning of the spawner [`set_weather`](Self::set_weather) would create
    /// for `weather`
    ///
    /// `None` when the transition keeps the current spawner or the new
    /// weather has none.
    pub fn incoming_spawner(&self, weather: Weather) -> Option<ParticleSpawnerConfig> {
        if weather == self.weather || weather.family() == self.weather.family() {
            return None;
        }
        weather_spawner_config(weather)
    }

    /// Switch weather
    ///
    /// Within a family only the state changes; fog and particles carry over.
    /// Across families the old spawner and fog are torn down before the new
    /// weather's are applied. Returns the torn-down spawner so its owner can
    /// release the GPU side.
    pub fn set_weather(&mut self, weather: Weather) -> Option<ParticleSpawner> {
        if weather == self.weather {
            return None;
        }

        let previous = self.weather;
        self.weather = weather;

        if previous.family() == weather.family() {
            // TODO: cross-fade fog and particle tuning between weathers of one family
            log::info!("Weather {} -> {} (same family, parameters kept)", previous, weather);
            return None;
        }

        log::info!("Weather {} -> {}", previous, weather);
        let torn_down = self.weather_spawner.take();
        self.fog = self.default_fog;

        match weather {
            Weather::None => {
                self.fog.density = 0.0;
                self.fog.gradient = 0.1;
            }
            Weather::Snow => {
                self.fog = FogState {
                    density: 0.057,
                    gradient: 0.57,
                    color: Vec3::new(SNOW_GREY, SNOW_GREY, SNOW_GREY),
                };
            }
            Weather::Hail => {
                self.fog = FogState {
                    density: 0.022,
                    gradient: 0.48,
                    color: Vec3::new(SNOW_GREY, SNOW_GREY, SNOW_GREY),
                };
            }
            Weather::Snowstorm | Weather::Rain | Weather::HeavyRain | Weather::Sandstorm | Weather::Leaves => {
                log::debug!("Weather {} has no fog or particles defined", weather);
            }
        }
        self.weather_spawner = weather_spawner_config(weather).map(ParticleSpawner::new);

        torn_down
    }
}
