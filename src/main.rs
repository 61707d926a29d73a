//! Vitrina - headless product-model viewer
//!
//! Renders a catalog product's 3D model under a weather preset and writes
//! the frames out as PNGs. Gestures (orbit drag, pinch zoom) come in as a
//! JSON event script, one event per frame.

mod app;
mod assets;
mod render;
mod scene;

use app::{ScriptEvent, ViewerSession};
use scene::serialization::{load_config_from_file, ProductRecord, ViewerConfig};
use scene::WeatherPreset;
use std::path::PathBuf;
use std::process::ExitCode;

const FRAME_DT: f32 = 1.0 / 60.0;

struct CliArgs {
    product_path: Option<PathBuf>,
    model_url: Option<String>,
    config_path: Option<PathBuf>,
    preset: Option<WeatherPreset>,
    script_path: Option<PathBuf>,
    out_dir: PathBuf,
    frames: u32,
}

fn print_usage() {
    eprintln!("Usage: vitrina [PRODUCT.json] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --model URL      Load a model URL directly instead of a product record");
    eprintln!("  --config PATH    Viewer config JSON (defaults apply when omitted)");
    eprintln!("  --preset NAME    Weather preset: sunny, rainy, foggy, night");
    eprintln!("  --script PATH    Gesture script JSON, replayed one event per frame");
    eprintln!("  --out DIR        Output directory for PNG frames (default: frames)");
    eprintln!("  --frames N       Number of frames to render (default: 60)");
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = CliArgs {
        product_path: None,
        model_url: None,
        config_path: None,
        preset: None,
        script_path: None,
        out_dir: PathBuf::from("frames"),
        frames: 60,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value_for = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "--model" => args.model_url = Some(value_for("--model")?),
            "--config" => args.config_path = Some(PathBuf::from(value_for("--config")?)),
            "--preset" => {
                let name = value_for("--preset")?;
                args.preset = Some(
                    WeatherPreset::parse(&name)
                        .ok_or_else(|| format!("unknown preset '{name}'"))?,
                );
            }
            "--script" => args.script_path = Some(PathBuf::from(value_for("--script")?)),
            "--out" => args.out_dir = PathBuf::from(value_for("--out")?),
            "--frames" => {
                let raw = value_for("--frames")?;
                args.frames = raw
                    .parse()
                    .map_err(|_| format!("invalid frame count '{raw}'"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'"));
            }
            other => args.product_path = Some(PathBuf::from(other)),
        }
    }
    Ok(args)
}

fn run(args: CliArgs) -> Result<(), String> {
    let mut config = match &args.config_path {
        Some(path) => load_config_from_file(path)
            .map_err(|err| format!("failed to load config '{}': {err}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(preset) = args.preset {
        config.preset = preset;
    }

    let mut session = ViewerSession::new(&config);

    match (&args.product_path, &args.model_url) {
        (Some(path), _) => {
            let product = scene::serialization::load_product_from_file(path)
                .map_err(|err| format!("failed to load product '{}': {err}", path.display()))?;
            session.open_product(&product);
        }
        (None, Some(url)) => {
            let product = ProductRecord {
                id: 0,
                name: url.clone(),
                description: String::new(),
                material: None,
                category: None,
                fbx_url: serde_json::Value::String(url.clone()),
            };
            session.open_product(&product);
        }
        (None, None) => {
            log::info!("No product or model given, rendering the fallback primitive");
            let product = ProductRecord {
                id: 0,
                name: "fallback".to_string(),
                description: String::new(),
                material: None,
                category: None,
                fbx_url: serde_json::Value::Null,
            };
            session.open_product(&product);
        }
    }

    let mut script: Vec<ScriptEvent> = match &args.script_path {
        Some(path) => app::load_script_from_file(path)
            .map_err(|err| format!("failed to load script '{}': {err}", path.display()))?,
        None => Vec::new(),
    };
    script.reverse();

    let mut wait_frames = 0u32;
    let mut written = 0u32;
    for frame in 0..args.frames {
        if wait_frames > 0 {
            wait_frames -= 1;
        } else if let Some(event) = script.pop() {
            if let ScriptEvent::Wait { frames } = event {
                wait_frames = frames;
            } else {
                session.apply_script_event(&event);
            }
        }

        if !session.tick(FRAME_DT) {
            break;
        }
        let path = args.out_dir.join(format!("frame_{frame:04}.png"));
        session.save_frame(&path)?;
        written += 1;
    }

    session.close();
    log::info!("Wrote {} frame(s) to {}", written, args.out_dir.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
