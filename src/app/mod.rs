mod input;
mod timing;

pub use input::{
    GestureController, GestureState, TouchPoint, ROTATE_SENSITIVITY, ZOOM_SENSITIVITY,
};
pub use timing::FrameTiming;

use crate::assets::{ModelCache, ModelLoader, ModelReference};
use crate::render::{OrbitCamera, RenderContext};
use crate::scene::serialization::{ProductRecord, ViewerConfig};
use crate::scene::{LoadedModel, Scene, WeatherPreset};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scripted input event for driving a session without a touch screen.
/// Scripts are JSON arrays of these, replayed one event per frame.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    TouchDown { id: u64, x: f32, y: f32 },
    TouchMove { id: u64, x: f32, y: f32 },
    TouchUp { id: u64 },
    SetPreset { preset: WeatherPreset },
    Wait { frames: u32 },
}

/// One open viewer: the scene, camera, gesture state and framebuffer for a
/// single product, sharing the model cache across products opened in the
/// same session. Everything runs on the caller's thread; `tick` produces
/// one frame and reports whether the session still wants more.
pub struct ViewerSession {
    scene: Scene,
    camera: OrbitCamera,
    gestures: GestureController,
    cache: ModelCache,
    loader: ModelLoader,
    renderer: RenderContext,
    timing: FrameTiming,
    model: Option<Arc<LoadedModel>>,
    visible: bool,
    correlation: String,
    load_progress: u8,
}

impl ViewerSession {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            scene: Scene::new(config.preset),
            camera: OrbitCamera::new(),
            gestures: GestureController::new(),
            cache: ModelCache::new(),
            loader: ModelLoader::new(
                &config.storage_base_url,
                Duration::from_secs(config.fetch_timeout_secs),
                config.cache_dir.clone(),
            ),
            renderer: RenderContext::new(config.frame_width, config.frame_height),
            timing: FrameTiming::new(),
            model: None,
            visible: true,
            correlation: String::new(),
            load_progress: 0,
        }
    }

    /// Loads the product's model (first reference when several are listed)
    /// and makes it the displayed model. A product without any usable
    /// reference gets the fallback primitive, same as a failed load.
    pub fn open_product(&mut self, product: &ProductRecord) {
        self.correlation = format!("product {}", product.id);
        let reference = product.model_reference();
        let urls = reference.resolve();
        log::info!(
            "[{}] Opening '{}' ({} model reference(s))",
            self.correlation,
            product.name,
            urls.len()
        );
        if matches!(reference, ModelReference::List { .. }) && urls.len() > 1 {
            log::debug!(
                "[{}] Multiple references, displaying the first",
                self.correlation
            );
        }

        let model = match urls.first() {
            Some(url) => {
                let mut last_logged = 0u8;
                let correlation = self.correlation.clone();
                let mut progress = |percent: u8| {
                    if percent >= last_logged + 25 || percent == 100 {
                        log::info!("[{correlation}] Download {percent}%");
                        last_logged = percent;
                    }
                };
                self.cache
                    .get_or_load(url, &self.loader, &self.correlation, &mut progress)
            }
            None => {
                log::warn!(
                    "[{}] No model reference on record, using fallback",
                    self.correlation
                );
                Arc::new(crate::assets::fallback_model(""))
            }
        };
        self.load_progress = 100;
        self.model = Some(model);
        self.gestures = GestureController::new();
        self.camera = OrbitCamera::new();
    }

    pub fn set_preset(&mut self, preset: WeatherPreset) {
        self.scene.apply_preset(preset);
    }

    pub fn apply_script_event(&mut self, event: &ScriptEvent) {
        match *event {
            ScriptEvent::TouchDown { id, x, y } => self.touch_down(TouchPoint { id, x, y }),
            ScriptEvent::TouchMove { id, x, y } => self.touch_move(TouchPoint { id, x, y }),
            ScriptEvent::TouchUp { id } => self.touch_up(id),
            ScriptEvent::SetPreset { preset } => self.set_preset(preset),
            ScriptEvent::Wait { .. } => {}
        }
    }

    pub fn touch_down(&mut self, point: TouchPoint) {
        self.gestures.touch_down(point);
    }

    pub fn touch_move(&mut self, point: TouchPoint) {
        self.gestures.touch_move(point);
    }

    pub fn touch_up(&mut self, id: u64) {
        self.gestures.touch_up(id);
    }

    /// Advances the scene by `dt` and renders one frame. Returns `false`
    /// once the session is closed; callers poll this each frame and stop
    /// driving the loop when it goes false.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.visible {
            return false;
        }
        let frame_start = Instant::now();

        let gesture = self.gestures.state();
        self.camera.set_distance(gesture.camera_distance);
        self.scene.advance_rain(dt);

        let node = self.model.as_ref().map(|m| &m.node);
        self.renderer.render(
            &self.scene,
            &self.camera,
            node,
            (gesture.rotation_x, gesture.rotation_y),
        );

        self.timing
            .set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);
        self.timing.update(Instant::now());
        true
    }

    /// Marks the session closed. The frame loop observes this through the
    /// next `tick`; nothing is torn down eagerly, so a model load already
    /// in flight still lands in the shared cache.
    pub fn close(&mut self) {
        if self.visible {
            log::info!("[{}] Session closed", self.correlation);
        }
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn save_frame(&self, path: &Path) -> Result<(), String> {
        self.renderer.save_png(path)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        self.model.as_ref()
    }

    pub fn load_progress(&self) -> u8 {
        self.load_progress
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}

pub fn load_script_from_file(
    path: &Path,
) -> Result<Vec<ScriptEvent>, crate::scene::serialization::SerializationError> {
    let json = std::fs::read_to_string(path)?;
    let script: Vec<ScriptEvent> = serde_json::from_str(&json)?;
    Ok(script)
}
