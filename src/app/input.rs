use crate::render::{DEFAULT_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE, MIN_CAMERA_DISTANCE};

pub const ROTATE_SENSITIVITY: f32 = 0.01;
pub const ZOOM_SENSITIVITY: f32 = 0.02;

/// One active touch contact, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    fn distance_to(&self, other: &TouchPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Pose the gestures drive: model rotation in radians plus the camera's
/// orbit distance. Rotation accumulates without wrapping, matching how a
/// drag that keeps going keeps spinning the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub camera_distance: f32,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            camera_distance: DEFAULT_CAMERA_DISTANCE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GesturePhase {
    Idle,
    /// Rotation at drag start plus the anchor contact; the pose is the
    /// anchor rotation offset by total travel from the anchor point, so
    /// per-event rounding never accumulates.
    SingleDrag {
        origin_rotation_x: f32,
        origin_rotation_y: f32,
        start: TouchPoint,
    },
    /// Zoom is incremental: each move applies the spread delta since the
    /// previous move, then re-anchors.
    PinchZoom { last_spread: f32 },
}

/// State machine translating raw touch contacts into [`GestureState`]
/// updates. Contact count picks the phase: one finger rotates, two pinch,
/// anything else idles. A termination request mid-gesture is refused so an
/// accidental system swipe cannot drop the user's in-flight drag.
pub struct GestureController {
    contacts: Vec<TouchPoint>,
    phase: GesturePhase,
    state: GestureState,
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
            phase: GesturePhase::Idle,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn touch_down(&mut self, point: TouchPoint) {
        if let Some(existing) = self.contacts.iter_mut().find(|c| c.id == point.id) {
            *existing = point;
        } else {
            self.contacts.push(point);
        }
        self.rephase();
    }

    pub fn touch_move(&mut self, point: TouchPoint) {
        let Some(existing) = self.contacts.iter_mut().find(|c| c.id == point.id) else {
            return;
        };
        *existing = point;

        match self.phase {
            GesturePhase::Idle => {}
            GesturePhase::SingleDrag {
                origin_rotation_x,
                origin_rotation_y,
                start,
            } => {
                let dx = point.x - start.x;
                let dy = point.y - start.y;
                self.state.rotation_x = origin_rotation_x + dy * ROTATE_SENSITIVITY;
                self.state.rotation_y = origin_rotation_y + dx * ROTATE_SENSITIVITY;
            }
            GesturePhase::PinchZoom { last_spread } => {
                let spread = self.current_spread();
                let delta = spread - last_spread;
                self.state.camera_distance = (self.state.camera_distance
                    - delta * ZOOM_SENSITIVITY)
                    .clamp(MIN_CAMERA_DISTANCE, MAX_CAMERA_DISTANCE);
                self.phase = GesturePhase::PinchZoom {
                    last_spread: spread,
                };
            }
        }
    }

    pub fn touch_up(&mut self, id: u64) {
        self.contacts.retain(|c| c.id != id);
        self.rephase();
    }

    /// Called when the platform asks the gesture to yield (a system-level
    /// pan claiming the touches). Always refused; model manipulation keeps
    /// priority over ambient navigation.
    pub fn on_termination_request(&self) -> bool {
        false
    }

    /// Re-derive the phase from the live contact count. Entering a phase
    /// anchors it to the current pose and contacts, so a pinch that loses a
    /// finger continues as a drag from wherever the rotation already is.
    fn rephase(&mut self) {
        self.phase = match self.contacts.len() {
            1 => GesturePhase::SingleDrag {
                origin_rotation_x: self.state.rotation_x,
                origin_rotation_y: self.state.rotation_y,
                start: self.contacts[0],
            },
            2 => GesturePhase::PinchZoom {
                last_spread: self.current_spread(),
            },
            _ => GesturePhase::Idle,
        };
    }

    fn current_spread(&self) -> f32 {
        if self.contacts.len() < 2 {
            return 0.0;
        }
        self.contacts[0].distance_to(&self.contacts[1])
    }
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}
