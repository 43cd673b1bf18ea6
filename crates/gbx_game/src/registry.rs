//! Shared model storage, keyed by source path.
//!
//! Every placement referencing the same OBJ file shares one loaded model.
//! Models live for the scene's lifetime; there is no eviction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use gbx_render::mesh::{Model, ModelError};

pub struct ModelRegistry {
    models: HashMap<Arc<str>, Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Return the interned registry key for `path`, loading the model from
    /// disk the first time the path is seen.
    pub fn get_or_load(&mut self, path: &str) -> Result<Arc<str>, ModelError> {
        if let Some((key, _)) = self.models.get_key_value(path) {
            return Ok(key.clone());
        }

        let model = Model::from_obj(Path::new(path))?;
        log::info!(
            "Loaded model '{}' ({} meshes) from {}",
            model.name,
            model.meshes.len(),
            path
        );

        let key: Arc<str> = Arc::from(path);
        self.models.insert(key.clone(), model);
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Option<&Model> {
        self.models.get(key)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn init_gpu_resources(&mut self, device: &wgpu::Device) {
        for model in self.models.values_mut() {
            model.init_gpu_resources(device);
        }
    }

    pub fn estimate_memory_mb(&self) -> f32 {
        let bytes: usize = self.models.values().map(|m| m.estimate_bytes()).sum();
        bytes as f32 / (1024.0 * 1024.0)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const TRIANGLE_OBJ: &str = "v 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3\n";

    fn temp_obj_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "gbx_registry_test_{}_{}_{}.obj",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn same_path_loads_once_and_interns_the_key() {
        let path = temp_obj_path("memo");
        fs::write(&path, TRIANGLE_OBJ).expect("failed to write temp obj file");
        let path_str = path.to_str().expect("temp path is valid utf-8").to_string();

        let mut registry = ModelRegistry::new();
        let first = registry.get_or_load(&path_str).expect("first load");
        let second = registry.get_or_load(&path_str).expect("second lookup");

        assert_eq!(registry.model_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn repeat_lookup_does_not_touch_the_filesystem() {
        let path = temp_obj_path("no_reload");
        fs::write(&path, TRIANGLE_OBJ).expect("failed to write temp obj file");
        let path_str = path.to_str().expect("temp path is valid utf-8").to_string();

        let mut registry = ModelRegistry::new();
        registry.get_or_load(&path_str).expect("first load");

        // With the file gone, only a memoized hit can succeed.
        fs::remove_file(&path).expect("failed to remove temp obj file");
        registry
            .get_or_load(&path_str)
            .expect("second lookup must not re-read the file");
    }

    #[test]
    fn distinct_paths_load_distinct_models() {
        let path_a = temp_obj_path("a");
        let path_b = temp_obj_path("b");
        fs::write(&path_a, TRIANGLE_OBJ).expect("failed to write temp obj file");
        fs::write(&path_b, TRIANGLE_OBJ).expect("failed to write temp obj file");

        let mut registry = ModelRegistry::new();
        let key_a = registry
            .get_or_load(path_a.to_str().expect("utf-8"))
            .expect("load a");
        let key_b = registry
            .get_or_load(path_b.to_str().expect("utf-8"))
            .expect("load b");

        assert_eq!(registry.model_count(), 2);
        assert_ne!(key_a, key_b);
        assert!(registry.get(&key_a).is_some());
        assert!(registry.get(&key_b).is_some());

        let _ = fs::remove_file(path_a);
        let _ = fs::remove_file(path_b);
    }

    #[test]
    fn missing_file_reports_load_error() {
        let mut registry = ModelRegistry::new();
        let err = registry
            .get_or_load("/nonexistent/gbx_registry_test.obj")
            .expect_err("missing file should fail");
        assert!(matches!(err, ModelError::Load { .. }));
        assert_eq!(registry.model_count(), 0);
    }
}
