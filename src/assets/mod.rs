mod cache;
mod fetch;
mod obj;

pub use cache::ModelCache;
pub use fetch::{FetchError, Fetcher, HttpFetcher, ProgressFn};
pub use obj::{MeshParseError, MeshParser, ObjParser};

use crate::scene::{LoadedModel, Material, Mesh, ModelNode};
use glam::Vec3;
use std::time::Duration;

/// Largest bounding-box dimension of a normalized model, in scene units.
pub const MODEL_TARGET_SIZE: f32 = 2.0;

/// Catalog brand red, used for the fallback primitive so a failed load is
/// recognizable at a glance.
const FALLBACK_COLOR: [f32; 3] = [0.66, 0.11, 0.11];

/// The product table's model column decoded into one of the shapes the
/// backend has stored over time. Decoding happens once at the data-access
/// boundary; everything downstream only sees an ordered URL list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    Empty,
    Single(String),
    List(Vec<String>),
}

impl ModelReference {
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => Self::List(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Self::Empty
                } else {
                    Self::Single(trimmed.to_string())
                }
            }
            _ => Self::Empty,
        }
    }

    /// Ordered, trimmed URL list. Single strings may themselves hold a
    /// JSON-encoded array or a comma list; a JSON-looking string that fails
    /// to parse falls back to comma splitting. Never fails; duplicates are
    /// kept, empty entries dropped.
    pub fn resolve(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::List(items) => items
                .iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            Self::Single(raw) => {
                let trimmed = raw.trim();
                if trimmed.starts_with('[') {
                    if let Ok(serde_json::Value::Array(items)) =
                        serde_json::from_str::<serde_json::Value>(trimmed)
                    {
                        return ModelReference::List(
                            items
                                .iter()
                                .filter_map(|item| item.as_str().map(str::to_string))
                                .collect(),
                        )
                        .resolve();
                    }
                }
                split_comma_list(trimmed)
            }
        }
    }
}

fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("model URL is empty")]
    EmptyUrl,
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("failed to parse mesh from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: MeshParseError,
    },
}

/// Fetches and parses one model URL into a display-ready [`LoadedModel`].
/// Every failure degrades to the fallback primitive; callers never see an
/// error, only a model that is always renderable.
pub struct ModelLoader {
    base_url: String,
    fetcher: Box<dyn Fetcher>,
    parser: Box<dyn MeshParser>,
}

impl ModelLoader {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache_dir: Option<std::path::PathBuf>,
    ) -> Self {
        Self::with_parts(
            base_url,
            Box::new(HttpFetcher::new(timeout, cache_dir)),
            Box::new(ObjParser),
        )
    }

    pub fn with_parts(
        base_url: &str,
        fetcher: Box<dyn Fetcher>,
        parser: Box<dyn MeshParser>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
            parser,
        }
    }

    /// `correlation` only tags log lines (the product id in practice).
    pub fn load(&self, url: &str, correlation: &str, progress: ProgressFn) -> LoadedModel {
        match self.try_load(url, progress) {
            Ok(model) => {
                log::info!(
                    "[{correlation}] Loaded model {} ({} triangles)",
                    model.source_url,
                    model.node.triangle_count()
                );
                model
            }
            Err(err) => {
                log::warn!("[{correlation}] Model load failed, using fallback: {err}");
                fallback_model(url)
            }
        }
    }

    fn try_load(&self, url: &str, progress: ProgressFn) -> Result<LoadedModel, AssetError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(AssetError::EmptyUrl);
        }
        let resolved = self.resolve_url(trimmed);

        let bytes = self
            .fetcher
            .fetch(&resolved, progress)
            .map_err(|source| AssetError::Fetch {
                url: resolved.clone(),
                source,
            })?;
        let mut node = self
            .parser
            .parse(&bytes)
            .map_err(|source| AssetError::Parse {
                url: resolved.clone(),
                source,
            })?;

        force_translucent(&mut node);
        normalize(&mut node);
        Ok(LoadedModel {
            node,
            source_url: resolved,
            fallback: false,
        })
    }

    /// Storage-relative paths get the configured base URL prefixed;
    /// anything already carrying a scheme passes through untouched.
    fn resolve_url(&self, url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

/// One-unit brand-colored box, returned whenever a real model cannot be
/// produced. Guarantees the viewer always has something to draw.
pub fn fallback_model(url: &str) -> LoadedModel {
    let material = Material {
        base_color: FALLBACK_COLOR,
        opacity: 0.5,
        translucent: true,
    };
    LoadedModel {
        node: ModelNode::new(vec![unit_box_mesh("fallback", material)]),
        source_url: url.trim().to_string(),
        fallback: true,
    }
}

/// Axis-aligned unit box centered at the origin, with per-face normals.
fn unit_box_mesh(name: &str, material: Material) -> Mesh {
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(12);
    for (normal, tangent, bitangent) in FACES {
        let base = positions.len() as u32;
        for (u, v) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            positions.push(normal * 0.5 + tangent * u + bitangent * v);
            normals.push(normal);
        }
        indices.push([base, base + 1, base + 2]);
        indices.push([base, base + 2, base + 3]);
    }
    Mesh {
        name: name.to_string(),
        positions,
        normals,
        indices,
        material,
    }
}

/// The target renderer misdraws opaque mesh materials, so every material is
/// forced translucent; materials that already carry an opacity keep it.
fn force_translucent(node: &mut ModelNode) {
    for mesh in &mut node.meshes {
        mesh.material.translucent = true;
        if mesh.material.opacity >= 1.0 {
            mesh.material.opacity = 0.5;
        }
    }
}

/// Computes the uniform scale that brings the largest bounding-box
/// dimension to [`MODEL_TARGET_SIZE`] and the translation that moves the
/// scaled bounding-box center to the origin. The raw vertices stay as
/// parsed; the transform is applied at draw time.
fn normalize(node: &mut ModelNode) {
    let Some((min, max)) = node.bounding_box() else {
        return;
    };
    let extent = max - min;
    let max_dimension = extent.x.max(extent.y).max(extent.z);
    let scale = if max_dimension > f32::EPSILON {
        MODEL_TARGET_SIZE / max_dimension
    } else {
        1.0
    };
    let center = (min + max) * 0.5 * scale;
    node.scale = scale;
    node.offset = -center;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct StaticFetcher {
        bytes: Vec<u8>,
        calls: Rc<Cell<usize>>,
    }

    impl Fetcher for StaticFetcher {
        fn fetch(&self, _url: &str, progress: ProgressFn) -> Result<Vec<u8>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            progress(100);
            Ok(self.bytes.clone())
        }
    }

    struct FailingFetcher;

    impl Fetcher for FailingFetcher {
        fn fetch(&self, url: &str, _progress: ProgressFn) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Request(format!("unreachable: {url}")))
        }
    }

    struct FailingParser;

    impl MeshParser for FailingParser {
        fn parse(&self, _bytes: &[u8]) -> Result<ModelNode, MeshParseError> {
            Err(MeshParseError::NoGeometry)
        }
    }

    const TRIANGLE_OBJ: &[u8] = b"v 0 0 0\nv 4 0 0\nv 0 2 0\nf 1 2 3\n";

    fn triangle_loader() -> (ModelLoader, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let loader = ModelLoader::with_parts(
            "https://storage.example/products",
            Box::new(StaticFetcher {
                bytes: TRIANGLE_OBJ.to_vec(),
                calls: calls.clone(),
            }),
            Box::new(ObjParser),
        );
        (loader, calls)
    }

    #[test]
    fn json_array_string_resolves_like_parsed_json() {
        let reference = ModelReference::Single(r#"["a.obj","b.obj"]"#.to_string());
        assert_eq!(
            reference.resolve(),
            vec!["a.obj".to_string(), "b.obj".to_string()]
        );
    }

    #[test]
    fn broken_json_array_falls_back_to_comma_split() {
        let reference = ModelReference::Single("[a.obj, b.obj".to_string());
        assert_eq!(
            reference.resolve(),
            vec!["[a.obj".to_string(), "b.obj".to_string()]
        );
    }

    #[test]
    fn comma_list_is_trimmed_and_empties_dropped() {
        let reference = ModelReference::Single("a.obj, b.obj,,c.obj".to_string());
        assert_eq!(
            reference.resolve(),
            vec!["a.obj".to_string(), "b.obj".to_string(), "c.obj".to_string()]
        );
    }

    #[test]
    fn single_url_passes_through() {
        let reference = ModelReference::Single("https://host/model.obj".to_string());
        assert_eq!(
            reference.resolve(),
            vec!["https://host/model.obj".to_string()]
        );
    }

    #[test]
    fn empty_and_null_values_resolve_to_nothing() {
        assert_eq!(
            ModelReference::from_value(&serde_json::Value::Null),
            ModelReference::Empty
        );
        assert_eq!(
            ModelReference::from_value(&serde_json::json!("   ")),
            ModelReference::Empty
        );
        assert!(ModelReference::Empty.resolve().is_empty());
    }

    #[test]
    fn array_value_drops_non_string_entries() {
        let value = serde_json::json!(["a.obj", 7, null, "b.obj"]);
        let reference = ModelReference::from_value(&value);
        assert_eq!(
            reference.resolve(),
            vec!["a.obj".to_string(), "b.obj".to_string()]
        );
    }

    #[test]
    fn relative_path_gets_base_url_prefix() {
        let (loader, _) = triangle_loader();
        assert_eq!(
            loader.resolve_url("doors/slider.obj"),
            "https://storage.example/products/doors/slider.obj"
        );
        assert_eq!(
            loader.resolve_url("/doors/slider.obj"),
            "https://storage.example/products/doors/slider.obj"
        );
        assert_eq!(
            loader.resolve_url("https://cdn.example/x.obj"),
            "https://cdn.example/x.obj"
        );
    }

    #[test]
    fn successful_load_is_normalized_and_translucent() {
        let (loader, _) = triangle_loader();
        let model = loader.load("tri.obj", "test", &mut |_| {});
        assert!(!model.fallback);
        // Largest raw dimension is 4, so everything scales by 0.5.
        assert!((model.node.scale - 0.5).abs() < 1e-6);
        // Scaled bbox center (1.0, 0.5, 0.0) moves to the origin.
        assert!((model.node.offset - Vec3::new(-1.0, -0.5, 0.0)).length() < 1e-6);
        for mesh in &model.node.meshes {
            assert!(mesh.material.translucent);
            assert!(mesh.material.opacity <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn empty_url_yields_fallback_without_fetching() {
        let (loader, calls) = triangle_loader();
        let model = loader.load("   ", "test", &mut |_| {});
        assert!(model.fallback);
        assert_eq!(calls.get(), 0);
        assert!(model.node.triangle_count() > 0);
    }

    #[test]
    fn fetch_failure_yields_renderable_fallback() {
        let loader = ModelLoader::with_parts(
            "https://storage.example/products",
            Box::new(FailingFetcher),
            Box::new(ObjParser),
        );
        let model = loader.load("broken.obj", "test", &mut |_| {});
        assert!(model.fallback);
        assert_eq!(model.node.triangle_count(), 12);
    }

    #[test]
    fn parse_failure_yields_renderable_fallback() {
        let calls = Rc::new(Cell::new(0));
        let loader = ModelLoader::with_parts(
            "https://storage.example/products",
            Box::new(StaticFetcher {
                bytes: b"not a mesh".to_vec(),
                calls,
            }),
            Box::new(FailingParser),
        );
        let model = loader.load("weird.obj", "test", &mut |_| {});
        assert!(model.fallback);
        assert!(model.node.bounding_box().is_some());
    }

    #[test]
    fn fallback_box_is_unit_sized_and_centered() {
        let model = fallback_model("whatever.obj");
        let (min, max) = model.node.bounding_box().unwrap();
        assert!((min - Vec3::splat(-0.5)).length() < 1e-6);
        assert!((max - Vec3::splat(0.5)).length() < 1e-6);
    }
}
