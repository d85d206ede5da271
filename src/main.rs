//! `annolab` offline export tool.
//!
//! Replays a project dump through an editor session and writes YOLO label
//! files:
//!
//! ```text
//! annolab <dump.json> <out-dir> [--segmentation] [--strict] [--config <path>]
//! ```

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Export a project dump as YOLO label files.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "annolab", version)]
struct Args {
    /// Project dump (labels, images and their annotations) as JSON.
    #[arg(value_name = "DUMP.json")]
    dump: PathBuf,

    /// Directory for `classes.txt` and the per-image label files.
    #[arg(value_name = "OUT_DIR")]
    out_dir: PathBuf,

    /// Write polygon vertices instead of reducing polygons to boxes.
    #[arg(long)]
    segmentation: bool,

    /// Fail on annotations whose label is not in the directory.
    #[arg(long)]
    strict: bool,

    /// Config file; defaults to the user config directory.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use annolab::format::YoloExporter;
    use annolab::sync::ProjectDump;
    use annolab::{AppConfig, EditorSession};

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };

    // RUST_LOG overrides the configured level.
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let json = std::fs::read_to_string(&args.dump)?;
    let dump = ProjectDump::from_json(&json)?;
    let project = dump.project.clone();
    let (mut service, images) = dump.into_service();

    let mut session = EditorSession::new(&config);
    session.set_project(project);
    session.load_labels(&mut service)?;

    let mut exported = Vec::with_capacity(images.len());
    for info in images {
        session.load_with(&mut service, info.clone())?;
        exported.push((info, session.store().annotations().to_vec()));
    }
    session.close_image();

    let exporter = if args.segmentation {
        YoloExporter::segmentation()
    } else {
        YoloExporter::detection()
    }
    .strict(args.strict);

    let result = exporter.export(session.labels().labels(), &exported)?;
    result.write_to(&args.out_dir)?;

    println!(
        "Exported {} image(s) with {} label(s) to {}",
        exported.len(),
        session.labels().len(),
        args.out_dir.display()
    );
    if !result.warnings.is_empty() {
        println!("{} warning(s):", result.warnings.len());
        for warning in &result.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}

// WASM builds use the library only.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "annolab",
            "dump.json",
            "out",
            "--segmentation",
            "--config",
            "cfg.json",
        ])
        .unwrap();
        assert_eq!(args.dump, PathBuf::from("dump.json"));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert!(args.segmentation);
        assert!(!args.strict);
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
    }

    #[test]
    fn test_rejects_missing_output_and_unknown_flags() {
        assert!(Args::try_parse_from(["annolab", "dump.json"]).is_err());
        assert!(Args::try_parse_from(["annolab", "dump.json", "out", "--coco"]).is_err());
    }
}
