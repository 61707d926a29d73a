pub mod serialization;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of drops in the rain particle system.
pub const RAIN_DROP_COUNT: usize = 600;

const RAIN_BASE_FALL_SPEED: f32 = 6.0;
const RAIN_MAX_JITTER: f32 = 2.5;
const RAIN_FLOOR_Y: f32 = 0.0;
const RAIN_VOLUME_HALF_EXTENT: f32 = 5.0;
const RAIN_VOLUME_HEIGHT: f32 = 10.0;
const RAIN_RESPAWN_MIN_Y: f32 = 8.0;

/// Named lighting/background/particle configuration for the viewer scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherPreset {
    Sunny,
    Rainy,
    Foggy,
    Night,
}

impl WeatherPreset {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sunny" => Some(Self::Sunny),
            "rainy" => Some(Self::Rainy),
            "foggy" => Some(Self::Foggy),
            "night" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Rainy => "rainy",
            Self::Foggy => "foggy",
            Self::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub base_color: [f32; 3],
    pub opacity: f32,
    pub translucent: bool,
}

impl Material {
    pub fn opaque(base_color: [f32; 3]) -> Self {
        Self {
            base_color,
            opacity: 1.0,
            translucent: false,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::opaque([0.8, 0.8, 0.8])
    }
}

/// Triangle mesh with a single material, one entry in a model's node.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    pub material: Material,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }
}

/// Root node of a parsed model: raw meshes plus the normalization transform
/// computed at load time. Positions are never rewritten; the scale and
/// centering offset are applied when the node is placed in a frame.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub meshes: Vec<Mesh>,
    pub scale: f32,
    pub offset: Vec3,
}

impl ModelNode {
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            scale: 1.0,
            offset: Vec3::ZERO,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Axis-aligned bounds of the raw (untransformed) geometry.
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let mut bounds: Option<(Vec3, Vec3)> = None;
        for mesh in &self.meshes {
            for &position in &mesh.positions {
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(position), max.max(position)),
                    None => (position, position),
                });
            }
        }
        bounds
    }
}

/// A model ready for display. Created once by the loader (or synthesized as
/// a fallback primitive) and owned by the cache afterwards; read-only.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub node: ModelNode,
    pub source_url: String,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Vec3,
        intensity: f32,
    },
    Directional {
        color: Vec3,
        intensity: f32,
        direction: Vec3,
    },
    Point {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Rain drops with per-drop fall-speed jitter. Exists only while the rainy
/// preset is active.
#[derive(Debug, Clone)]
pub struct RainParticles {
    positions: Vec<Vec3>,
    jitter: Vec<f32>,
    rng: StdRng,
}

impl RainParticles {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let mut positions = Vec::with_capacity(RAIN_DROP_COUNT);
        let mut jitter = Vec::with_capacity(RAIN_DROP_COUNT);
        for _ in 0..RAIN_DROP_COUNT {
            positions.push(Vec3::new(
                rng.gen_range(-RAIN_VOLUME_HALF_EXTENT..RAIN_VOLUME_HALF_EXTENT),
                rng.gen_range(RAIN_FLOOR_Y..RAIN_VOLUME_HEIGHT),
                rng.gen_range(-RAIN_VOLUME_HALF_EXTENT..RAIN_VOLUME_HALF_EXTENT),
            ));
            jitter.push(rng.gen_range(0.0..RAIN_MAX_JITTER));
        }
        Self {
            positions,
            jitter,
            rng,
        }
    }

    /// Advance every drop; drops below the floor respawn at a random height
    /// above the scene.
    pub fn update(&mut self, dt: f32) {
        for (position, jitter) in self.positions.iter_mut().zip(&self.jitter) {
            position.y -= (RAIN_BASE_FALL_SPEED + jitter) * dt;
            if position.y < RAIN_FLOOR_Y {
                position.y = self.rng.gen_range(RAIN_RESPAWN_MIN_Y..RAIN_VOLUME_HEIGHT);
            }
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for RainParticles {
    fn default() -> Self {
        Self::new()
    }
}

/// Viewer scene state: background, light list, optional fog, optional rain.
/// All of it is replaced wholesale when a preset is applied.
pub struct Scene {
    pub background: Vec3,
    pub lights: Vec<Light>,
    pub fog: Option<Fog>,
    pub rain: Option<RainParticles>,
    preset: WeatherPreset,
}

impl Scene {
    pub fn new(preset: WeatherPreset) -> Self {
        let mut scene = Self {
            background: Vec3::ZERO,
            lights: Vec::new(),
            fog: None,
            rain: None,
            preset,
        };
        scene.apply_preset(preset);
        scene
    }

    pub fn preset(&self) -> WeatherPreset {
        self.preset
    }

    /// Replace the scene's lights, fog and background with the preset's
    /// fixed tuple, then add or remove the rain system. Lights are cleared
    /// first so repeated application never stacks.
    pub fn apply_preset(&mut self, preset: WeatherPreset) {
        self.lights.clear();
        self.fog = None;
        self.preset = preset;

        match preset {
            WeatherPreset::Sunny => {
                self.background = Vec3::new(0.94, 0.94, 0.94);
                self.lights.push(Light::Ambient {
                    color: Vec3::ONE,
                    intensity: 1.2,
                });
                self.lights.push(Light::Directional {
                    color: Vec3::ONE,
                    intensity: 1.0,
                    direction: Vec3::new(-0.4, -1.0, -0.4).normalize(),
                });
            }
            WeatherPreset::Rainy => {
                self.background = Vec3::new(0.75, 0.82, 0.90);
                self.lights.push(Light::Ambient {
                    color: Vec3::ONE,
                    intensity: 0.7,
                });
                self.lights.push(Light::Directional {
                    color: Vec3::ONE,
                    intensity: 0.5,
                    direction: Vec3::new(-0.4, -1.0, -0.4).normalize(),
                });
            }
            WeatherPreset::Foggy => {
                self.background = Vec3::new(0.80, 0.80, 0.80);
                self.lights.push(Light::Ambient {
                    color: Vec3::ONE,
                    intensity: 0.7,
                });
                self.lights.push(Light::Directional {
                    color: Vec3::ONE,
                    intensity: 0.5,
                    direction: Vec3::new(-0.4, -1.0, -0.4).normalize(),
                });
                self.fog = Some(Fog {
                    color: Vec3::new(0.80, 0.80, 0.80),
                    near: 1.0,
                    far: 20.0,
                });
            }
            WeatherPreset::Night => {
                self.background = Vec3::new(0.03, 0.04, 0.09);
                self.lights.push(Light::Ambient {
                    color: Vec3::new(0.55, 0.62, 0.85),
                    intensity: 0.3,
                });
                self.lights.push(Light::Point {
                    color: Vec3::new(1.0, 0.85, 0.6),
                    intensity: 1.4,
                    position: Vec3::new(1.5, 2.5, 2.0),
                });
            }
        }

        if preset == WeatherPreset::Rainy {
            if self.rain.is_none() {
                self.rain = Some(RainParticles::new());
            }
        } else {
            self.rain = None;
        }
    }

    pub fn advance_rain(&mut self, dt: f32) {
        if let Some(rain) = &mut self.rain {
            rain.update(dt);
        }
    }
}
