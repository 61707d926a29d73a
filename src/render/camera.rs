use glam::{Mat4, Vec3};

pub const MIN_CAMERA_DISTANCE: f32 = 1.0;
pub const MAX_CAMERA_DISTANCE: f32 = 10.0;
pub const DEFAULT_CAMERA_DISTANCE: f32 = 4.0;

const FOV_Y_DEGREES: f32 = 75.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

/// Viewer camera: fixed on the +Z axis looking at the origin, with only the
/// distance under user control. Rotation happens on the model node, not the
/// camera, so the orbit feel comes for free.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    distance: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            distance: DEFAULT_CAMERA_DISTANCE,
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE);
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect.max(1e-3), NEAR_PLANE, FAR_PLANE)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}
