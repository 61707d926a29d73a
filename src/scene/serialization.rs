use crate::assets::ModelReference;
use crate::scene::WeatherPreset;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Viewer settings loaded once at startup.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Prefix applied to storage-relative model paths.
    pub storage_base_url: String,
    /// Directory for the on-disk byte cache of fetched models. `None`
    /// disables the byte cache; the in-memory model cache is unaffected.
    pub cache_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub preset: WeatherPreset,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            storage_base_url: "https://storage.grandlink.example/object/public/products"
                .to_string(),
            cache_dir: None,
            fetch_timeout_secs: 30,
            frame_width: 640,
            frame_height: 640,
            preset: WeatherPreset::Sunny,
        }
    }
}

pub fn save_config_to_file(config: &ViewerConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_config_from_file(path: &Path) -> Result<ViewerConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: ViewerConfig = serde_json::from_str(&json)?;
    Ok(config)
}

/// Product row as served by the catalog backend. Only the fields the viewer
/// cares about; everything else in the row is ignored.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Raw model-reference column. The backend has stored this as a plain
    /// URL, a comma list and a JSON-encoded array over time, so it is
    /// decoded into [`ModelReference`] here at the data boundary.
    #[serde(default)]
    pub fbx_url: serde_json::Value,
}

impl ProductRecord {
    pub fn model_reference(&self) -> ModelReference {
        ModelReference::from_value(&self.fbx_url)
    }
}

pub fn load_product_from_file(path: &Path) -> Result<ProductRecord> {
    let json = std::fs::read_to_string(path)?;
    let product: ProductRecord = serde_json::from_str(&json)?;
    Ok(product)
}
