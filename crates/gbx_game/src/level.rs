//! Level description loading.
//!
//! Levels are exported from the authoring tool as a JSON document: a scene
//! name plus a flat list of typed object entries. Only `"MESH"` entries are
//! retained; cameras, lights, and anything else the exporter emits are
//! parsed and skipped.
//!
//! The authoring tool is Z-up with the opposite sense for positive angles,
//! while the engine is Y-up. `position_from_authoring` and
//! `rotation_from_authoring` are the only place that reconciliation lives.
//! A wrong sign or component order here corrupts every placed mesh with no
//! parse error to show for it.

use glam::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level `name` every valid level must carry. The exporter writes one
/// scene per file under this fixed name.
pub const EXPECTED_SCENE_NAME: &str = "scene";

const MESH_KIND: &str = "MESH";

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level JSON {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("level name '{found}' does not match expected '{expected}'")]
    SceneNameMismatch { found: String, expected: &'static str },
    #[error("object {index} ({kind}) is missing required field '{field}'")]
    MissingField {
        index: usize,
        kind: String,
        field: &'static str,
    },
}

/// Raw document shape. Fields that only matter for MESH entries stay
/// optional here so that skipped entry kinds are free to omit them.
#[derive(Debug, Deserialize)]
struct RawLevel {
    name: String,
    #[serde(default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    transform: Option<RawTransform>,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransform {
    translation: [f32; 3],
    rotation: [f32; 3],
    scaling: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct LevelData {
    pub name: String,
    pub objects: Vec<ObjectRecord>,
}

/// One retained mesh placement, already converted to engine axes.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    pub kind: String,
    pub name: String,
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scaling: Vec3,
    pub file_name: Option<String>,
}

/// Authoring axes are X right, Y forward, Z up; engine axes are X right,
/// Y up, Z forward. Positions and scales swap the last two components.
fn position_from_authoring(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[2], v[1])
}

/// Rotations get the same component swap, and every angle is negated
/// because the authoring tool winds positive rotations the opposite way.
fn rotation_from_authoring(v: [f32; 3]) -> Vec3 {
    Vec3::new(-v[0], -v[2], -v[1])
}

pub fn load_level_from_path(path: &Path) -> Result<LevelData, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw_level: RawLevel = serde_json::from_str(&raw).map_err(|source| LevelError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if raw_level.name != EXPECTED_SCENE_NAME {
        return Err(LevelError::SceneNameMismatch {
            found: raw_level.name,
            expected: EXPECTED_SCENE_NAME,
        });
    }

    let mut objects = Vec::new();
    for (index, object) in raw_level.objects.into_iter().enumerate() {
        if object.kind != MESH_KIND {
            log::debug!("Skipping object {} of type '{}'", index, object.kind);
            continue;
        }

        let name = object.name.ok_or_else(|| LevelError::MissingField {
            index,
            kind: MESH_KIND.to_string(),
            field: "name",
        })?;
        let transform = object.transform.ok_or_else(|| LevelError::MissingField {
            index,
            kind: MESH_KIND.to_string(),
            field: "transform",
        })?;

        objects.push(ObjectRecord {
            kind: object.kind,
            name,
            translation: position_from_authoring(transform.translation),
            rotation: rotation_from_authoring(transform.rotation),
            scaling: position_from_authoring(transform.scaling),
            file_name: object.file_name,
        });
    }

    log::info!(
        "Loaded level '{}': {} mesh placements",
        raw_level.name,
        objects.len()
    );

    Ok(LevelData {
        name: raw_level.name,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "gbx_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_level_file(path: &Path, body: &str) {
        fs::write(path, body).expect("failed to write temp level file");
    }

    #[test]
    fn load_level_parses_minimal_valid_document() {
        let path = temp_file_path("valid");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            {
              "type": "MESH",
              "name": "a",
              "transform": {
                "translation": [1, 2, 3],
                "rotation": [0, 0, 0],
                "scaling": [1, 1, 1]
              },
              "file_name": "cube.obj"
            }
          ]
        }
        "#;

        write_level_file(&path, json);
        let level = load_level_from_path(&path).expect("valid level should load");
        assert_eq!(level.name, "scene");
        assert_eq!(level.objects.len(), 1);

        let record = &level.objects[0];
        assert_eq!(record.kind, "MESH");
        assert_eq!(record.name, "a");
        // Authoring Y and Z swap places.
        assert_eq!(record.translation, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(record.scaling, Vec3::ONE);
        assert_eq!(record.file_name.as_deref(), Some("cube.obj"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn rotation_is_permuted_and_negated() {
        let path = temp_file_path("rotation");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            {
              "type": "MESH",
              "name": "spun",
              "transform": {
                "translation": [0, 0, 0],
                "rotation": [0.1, 0.2, 0.3],
                "scaling": [2, 4, 6]
              },
              "file_name": "cube.obj"
            }
          ]
        }
        "#;

        write_level_file(&path, json);
        let level = load_level_from_path(&path).expect("level should load");
        let record = &level.objects[0];
        assert!((record.rotation - Vec3::new(-0.1, -0.3, -0.2)).length() < 1e-6);
        assert_eq!(record.scaling, Vec3::new(2.0, 6.0, 4.0));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn non_mesh_entries_are_skipped() {
        let path = temp_file_path("camera");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            { "type": "CAMERA", "name": "main_cam" },
            {
              "type": "MESH",
              "name": "floor",
              "transform": {
                "translation": [0, 0, 0],
                "rotation": [0, 0, 0],
                "scaling": [1, 1, 1]
              },
              "file_name": "slab.obj"
            },
            { "type": "LIGHT" }
          ]
        }
        "#;

        write_level_file(&path, json);
        let level = load_level_from_path(&path).expect("level should load");
        assert_eq!(level.objects.len(), 1);
        assert_eq!(level.objects[0].name, "floor");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_top_level_name_is_a_parse_error() {
        let path = temp_file_path("no_name");
        write_level_file(&path, r#"{ "objects": [] }"#);

        let err = load_level_from_path(&path).expect_err("missing name should fail");
        match err {
            LevelError::Parse { source, .. } => {
                assert!(source.to_string().contains("name"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn wrong_scene_name_is_rejected() {
        let path = temp_file_path("wrong_name");
        write_level_file(&path, r#"{ "name": "stage", "objects": [] }"#);

        let err = load_level_from_path(&path).expect_err("wrong name should fail");
        match err {
            LevelError::SceneNameMismatch { found, expected } => {
                assert_eq!(found, "stage");
                assert_eq!(expected, EXPECTED_SCENE_NAME);
            }
            other => panic!("expected SceneNameMismatch, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn mesh_without_transform_is_rejected() {
        let path = temp_file_path("no_transform");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            { "type": "MESH", "name": "bare", "file_name": "cube.obj" }
          ]
        }
        "#;

        write_level_file(&path, json);
        let err = load_level_from_path(&path).expect_err("missing transform should fail");
        match err {
            LevelError::MissingField { index, field, .. } => {
                assert_eq!(index, 0);
                assert_eq!(field, "transform");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_object_type_is_a_parse_error() {
        let path = temp_file_path("no_type");
        let json = r#"
        {
          "name": "scene",
          "objects": [ { "name": "mystery" } ]
        }
        "#;

        write_level_file(&path, json);
        let err = load_level_from_path(&path).expect_err("missing type should fail");
        match err {
            LevelError::Parse { source, .. } => {
                assert!(source.to_string().contains("type"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn wrong_transform_array_length_is_a_parse_error() {
        let path = temp_file_path("long_array");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            {
              "type": "MESH",
              "name": "a",
              "transform": {
                "translation": [1, 2, 3, 4],
                "rotation": [0, 0, 0],
                "scaling": [1, 1, 1]
              }
            }
          ]
        }
        "#;

        write_level_file(&path, json);
        let err = load_level_from_path(&path).expect_err("4-element array should fail");
        assert!(matches!(err, LevelError::Parse { .. }));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let path = temp_file_path("absent");
        let err = load_level_from_path(&path).expect_err("missing file should fail");
        assert!(matches!(err, LevelError::Io { .. }));
    }

    #[test]
    fn missing_objects_array_means_empty_level() {
        let path = temp_file_path("no_objects");
        write_level_file(&path, r#"{ "name": "scene" }"#);

        let level = load_level_from_path(&path).expect("level should load");
        assert!(level.objects.is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn file_name_is_optional() {
        let path = temp_file_path("no_file_name");
        let json = r#"
        {
          "name": "scene",
          "objects": [
            {
              "type": "MESH",
              "name": "marker",
              "transform": {
                "translation": [0, 0, 0],
                "rotation": [0, 0, 0],
                "scaling": [1, 1, 1]
              }
            }
          ]
        }
        "#;

        write_level_file(&path, json);
        let level = load_level_from_path(&path).expect("level should load");
        assert!(level.objects[0].file_name.is_none());

        let _ = fs::remove_file(path);
    }
}
