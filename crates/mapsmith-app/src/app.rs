//! Application state and command handling.

use crate::args::{Args, Command};
use kurbo::Point;
use mapsmith_core::{
    Collaborators, EditError, Editor, EditorConfig, FileStorage, Notice, NoticeLevel, Notifier, Storage,
    StorageError, nearest_wall,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by the command-line shell.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Forwards editor notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("{}", notice.message),
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
    }
}

/// A loaded map and the storage it came from.
pub struct App {
    args: Args,
    editor: Editor,
    storage: FileStorage,
    map_id: String,
}

impl App {
    /// Load the map named in `args` and rebuild its runtime state.
    pub fn load(args: Args) -> Result<Self, AppError> {
        let editor_config = match &args.config {
            Some(path) => load_editor_config(path)?,
            None => EditorConfig::default(),
        };

        let (storage, map_id) = FileStorage::for_file(&args.map)?;
        let document = pollster::block_on(storage.load(&map_id))?;
        log::info!("Loaded {}", args.map.display());

        let editor = Editor::from_document(document, editor_config)
            .with_collaborators(Collaborators::default().with_notifier(LogNotifier));
        Ok(Self {
            args,
            editor,
            storage,
            map_id,
        })
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Run the configured command and return its output.
    pub fn execute(&mut self) -> Result<String, AppError> {
        match self.args.command() {
            Command::Info => Ok(self.summary()),
            Command::Project { x, y } => self.project(Point::new(x, y)),
            Command::Save { out } => self.save(out),
        }
    }

    pub fn summary(&self) -> String {
        let doc = self.editor.document();

        let mut structures: BTreeMap<&str, usize> = BTreeMap::new();
        for structure in doc.structures.values() {
            *structures.entry(structure.kind.name()).or_default() += 1;
        }
        let mut markers: BTreeMap<&str, usize> = BTreeMap::new();
        for marker in doc.markers.values() {
            *markers.entry(marker.kind.name()).or_default() += 1;
        }
        let join = |counts: BTreeMap<&str, usize>| {
            counts
                .into_iter()
                .map(|(name, count)| format!("{} {}", count, name))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut lines = vec![
            format!("Map: {} ({})", doc.name, doc.id),
            format!("Grid: {} px, snap {}", doc.grid_size, doc.snap_mode.name()),
            format!("Structures: {} [{}]", doc.structures.len(), join(structures)),
            format!("Markers: {} [{}]", doc.markers.len(), join(markers)),
            format!("Teleport pairs: {}", self.editor.connectors().len()),
            format!("Docking relationships: {}", doc.docking.len()),
            format!("Folders: {}", doc.folders.len()),
        ];
        if let Some(bounds) = doc.bounds() {
            lines.push(format!(
                "Extent: ({}, {}) to ({}, {})",
                bounds.x0, bounds.y0, bounds.x1, bounds.y1
            ));
        }
        lines.join("\n")
    }

    fn project(&self, point: Point) -> Result<String, AppError> {
        let doc = self.editor.document();
        let hit = nearest_wall(
            point,
            doc.structures_ordered(),
            self.editor.config().door_snap_distance,
        )
        .ok_or(EditError::NoTarget("wall"))?;
        let p = hit.projection;
        Ok(format!(
            "wall {} edge {:?}: ({:.2}, {:.2}) rotation {:.2} deg, distance {:.2}",
            hit.wall_id, p.edge, p.x, p.y, p.rotation_degrees, hit.distance
        ))
    }

    fn save(&self, out: Option<PathBuf>) -> Result<String, AppError> {
        let document = self.editor.document();
        let path = match out {
            Some(path) => {
                let (storage, id) = FileStorage::for_file(&path)?;
                pollster::block_on(storage.save(&id, document))?;
                storage.document_path(&id)
            }
            None => {
                pollster::block_on(self.storage.save(&self.map_id, document))?;
                self.storage.document_path(&self.map_id)
            }
        };
        Ok(format!("Saved {}", path.display()))
    }
}

fn load_editor_config(path: &Path) -> Result<EditorConfig, AppError> {
    let config_error = |message: String| AppError::Config {
        path: path.to_path_buf(),
        message,
    };
    let json = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
    EditorConfig::from_json(&json).map_err(|e| config_error(e.to_string()))
}

/// Entry point for the `mapsmith` binary.
pub fn run(args: Args) -> Result<(), AppError> {
    let mut app = App::load(args)?;
    println!("{}", app.execute()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mapsmith_core::{Bounds, MapDocument, Structure, StructureKind};
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mapsmith").chain(list.iter().copied())).unwrap()
    }

    fn write_map(dir: &Path) -> PathBuf {
        let mut doc = MapDocument::new().with_name("Watchtower");
        doc.add_structure(
            Structure::rectangle(1, Bounds::new(0.0, 0.0, 100.0, 50.0)).with_kind(StructureKind::Wall),
        );
        doc.add_structure(Structure::circle(2, Bounds::new(300.0, 0.0, 80.0, 80.0)));
        let path = dir.join("tower.json");
        fs::write(&path, doc.to_json().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_info_summarizes_map() {
        let dir = tempdir().unwrap();
        let path = write_map(dir.path());
        let mut app = App::load(args(&[path.to_str().unwrap()])).unwrap();

        let summary = app.execute().unwrap();
        assert!(summary.contains("Map: Watchtower"));
        assert!(summary.contains("Structures: 2 [1 Room, 1 Wall]"));
    }

    #[test]
    fn test_project_onto_wall() {
        let dir = tempdir().unwrap();
        let path = write_map(dir.path());
        let config = args(&[path.to_str().unwrap(), "project", "110", "10"]);
        let mut app = App::load(config).unwrap();

        let output = app.execute().unwrap();
        assert!(output.starts_with("wall 1 edge Right: (100.00, 10.00) rotation -90.00"));
    }

    #[test]
    fn test_project_without_wall_fails() {
        let dir = tempdir().unwrap();
        let path = write_map(dir.path());
        let config = args(&[path.to_str().unwrap(), "project", "900", "900"]);
        let mut app = App::load(config).unwrap();

        assert!(matches!(app.execute(), Err(AppError::Edit(EditError::NoTarget("wall")))));
    }

    #[test]
    fn test_save_to_other_file() {
        let dir = tempdir().unwrap();
        let path = write_map(dir.path());
        let out = dir.path().join("copy.json");
        let config = args(&[
            path.to_str().unwrap(),
            "save",
            out.to_str().unwrap(),
        ]);
        let mut app = App::load(config).unwrap();
        app.execute().unwrap();

        let copy = MapDocument::from_json(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(copy.name, "Watchtower");
        assert_eq!(copy.structures.len(), 2);
    }

    #[test]
    fn test_bad_config_is_reported() {
        let dir = tempdir().unwrap();
        let path = write_map(dir.path());
        let cfg = dir.path().join("cfg.json");
        fs::write(&cfg, "{ nope").unwrap();
        let config = args(&[
            "--config",
            cfg.to_str().unwrap(),
            path.to_str().unwrap(),
        ]);

        assert!(matches!(App::load(config), Err(AppError::Config { .. })));
    }

    #[test]
    fn test_missing_map_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nowhere.json");
        let config = args(&[missing.to_str().unwrap()]);
        assert!(matches!(
            App::load(config),
            Err(AppError::Storage(StorageError::NotFound(_)))
        ));
    }
}
