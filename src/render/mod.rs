mod camera;
mod raster;

pub use camera::{
    OrbitCamera, DEFAULT_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE, MIN_CAMERA_DISTANCE,
};

use crate::scene::{Fog, Light, ModelNode, Scene};
use glam::{Mat4, Vec3};
use raster::{project, RasterTarget};
use std::path::Path;

const RAIN_COLOR: [f32; 4] = [0.67, 0.67, 0.70, 0.6];
const RAIN_POINT_SIZE: u32 = 2;

/// CPU framebuffer the viewer draws into. Owns the color and depth buffers
/// for the life of a session; each `render` call produces one complete
/// frame synchronously.
pub struct RenderContext {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
}

impl RenderContext {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            color: vec![0; (width * height * 4) as usize],
            depth: vec![1.0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Draw one frame: clear to the scene background, shade the model's
    /// meshes under the scene's lights (fog-blended when fog is set), then
    /// splat rain on top.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &OrbitCamera,
        model: Option<&ModelNode>,
        rotation: (f32, f32),
    ) {
        let aspect = self.aspect();
        let view = camera.view_matrix();
        let view_projection = camera.view_projection(aspect);
        let mut target = RasterTarget {
            width: self.width,
            height: self.height,
            color: &mut self.color,
            depth: &mut self.depth,
        };
        target.clear(scene.background);

        if let Some(node) = model {
            let model_matrix = Mat4::from_rotation_x(rotation.0)
                * Mat4::from_rotation_y(rotation.1)
                * Mat4::from_translation(node.offset)
                * Mat4::from_scale(Vec3::splat(node.scale));
            let mvp = view_projection * model_matrix;

            for mesh in &node.meshes {
                let rgba_alpha = if mesh.material.translucent {
                    mesh.material.opacity
                } else {
                    1.0
                };
                for triangle in &mesh.indices {
                    let world = [
                        model_matrix.transform_point3(mesh.positions[triangle[0] as usize]),
                        model_matrix.transform_point3(mesh.positions[triangle[1] as usize]),
                        model_matrix.transform_point3(mesh.positions[triangle[2] as usize]),
                    ];
                    let (Some(a), Some(b), Some(c)) = (
                        project(mesh.positions[triangle[0] as usize], &mvp, self.width, self.height),
                        project(mesh.positions[triangle[1] as usize], &mvp, self.width, self.height),
                        project(mesh.positions[triangle[2] as usize], &mvp, self.width, self.height),
                    ) else {
                        continue;
                    };

                    let normal = (world[1] - world[0])
                        .cross(world[2] - world[0])
                        .normalize_or_zero();
                    let centroid = (world[0] + world[1] + world[2]) / 3.0;
                    let lit = shade(mesh.material.base_color, normal, centroid, &scene.lights);
                    let view_depth = -view.transform_point3(centroid).z;
                    let final_color = apply_fog(lit, view_depth, scene.fog);

                    target.fill_triangle(
                        a,
                        b,
                        c,
                        [final_color.x, final_color.y, final_color.z, rgba_alpha],
                    );
                }
            }
        }

        if let Some(rain) = &scene.rain {
            for &position in rain.positions() {
                if let Some(screen) =
                    project(position, &view_projection, self.width, self.height)
                {
                    target.draw_point(screen, RAIN_POINT_SIZE, RAIN_COLOR);
                }
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.color[offset],
            self.color[offset + 1],
            self.color[offset + 2],
            self.color[offset + 3],
        ]
    }

    pub fn save_png(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    format!(
                        "failed creating frame directory '{}': {}",
                        parent.display(),
                        err
                    )
                })?;
            }
        }
        image::save_buffer_with_format(
            path,
            &self.color,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|err| format!("failed writing frame '{}': {}", path.display(), err))
    }
}

/// Flat Lambert shading against the scene's light list.
fn shade(base_color: [f32; 3], normal: Vec3, point: Vec3, lights: &[Light]) -> Vec3 {
    let base = Vec3::from_array(base_color);
    let mut total = Vec3::ZERO;
    for light in lights {
        match *light {
            Light::Ambient { color, intensity } => {
                total += color * intensity;
            }
            Light::Directional {
                color,
                intensity,
                direction,
            } => {
                let lambert = normal.dot(-direction).max(0.0);
                total += color * intensity * lambert;
            }
            Light::Point {
                color,
                intensity,
                position,
            } => {
                let to_light = position - point;
                let distance_sq = to_light.length_squared().max(1e-4);
                let lambert = normal.dot(to_light / distance_sq.sqrt()).max(0.0);
                total += color * (intensity * lambert / (1.0 + 0.1 * distance_sq));
            }
        }
    }
    (base * total).clamp(Vec3::ZERO, Vec3::ONE)
}

fn apply_fog(color: Vec3, view_depth: f32, fog: Option<Fog>) -> Vec3 {
    let Some(fog) = fog else {
        return color;
    };
    let range = (fog.far - fog.near).max(1e-4);
    let factor = ((view_depth - fog.near) / range).clamp(0.0, 1.0);
    color.lerp(fog.color, factor)
}
