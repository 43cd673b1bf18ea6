//! OBJ mesh loading and GPU mesh buffers.
//!
//! Models are loaded triangulated with a single index stream. Vertex
//! normals come from the OBJ file when it carries a full set; otherwise
//! they are accumulated from face cross products. GPU buffers are created
//! lazily by `init_gpu_resources` so model loading stays testable without a
//! device.

use glam::Vec3;
use std::path::Path;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::vertex::MeshVertex;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("model '{path}' contains no meshes")]
    Empty { path: String },
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

pub struct StaticMesh {
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    gpu: Option<MeshBuffers>,
}

impl StaticMesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            gpu: None,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    fn init_gpu_resources(&mut self, device: &wgpu::Device, label: &str) {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.gpu = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
        });
    }
}

pub struct Model {
    pub name: String,
    pub meshes: Vec<StaticMesh>,
}

impl Model {
    pub fn from_obj(path: &Path) -> Result<Self, ModelError> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| ModelError::Load {
            path: path.display().to_string(),
            source,
        })?;

        if models.is_empty() {
            return Err(ModelError::Empty {
                path: path.display().to_string(),
            });
        }

        let mut meshes = Vec::with_capacity(models.len());
        for m in &models {
            let mesh = &m.mesh;
            let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len()
            {
                mesh.normals.clone()
            } else {
                accumulate_vertex_normals(&mesh.positions, &mesh.indices)
            };
            meshes.push(StaticMesh::new(
                interleave(&mesh.positions, &normals),
                mesh.indices.clone(),
            ));
        }

        let name = models
            .first()
            .filter(|m| !m.name.is_empty())
            .map(|m| m.name.clone())
            .unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            });

        Ok(Self { name, meshes })
    }

    pub fn init_gpu_resources(&mut self, device: &wgpu::Device) {
        for mesh in &mut self.meshes {
            mesh.init_gpu_resources(device, &self.name);
        }
    }

    /// Issue one indexed draw per mesh. Bind groups (camera, transform) must
    /// already be set on the pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for mesh in &self.meshes {
            let Some(gpu) = &mesh.gpu else {
                continue;
            };
            pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
        }
    }

    /// CPU-side size of the mesh data, used for the overlay's memory readout.
    pub fn estimate_bytes(&self) -> usize {
        self.meshes
            .iter()
            .map(|m| {
                m.vertices.len() * std::mem::size_of::<MeshVertex>()
                    + m.indices.len() * std::mem::size_of::<u32>()
            })
            .sum()
    }
}

fn interleave(positions: &[f32], normals: &[f32]) -> Vec<MeshVertex> {
    (0..positions.len() / 3)
        .map(|i| MeshVertex {
            position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
            normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
        })
        .collect()
}

/// Area-weighted vertex normals: sum each face's cross product into its
/// three corners, then normalize per vertex.
fn accumulate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut sums = vec![Vec3::ZERO; vertex_count];

    let corner = |i: usize| Vec3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (corner(i1) - corner(i0)).cross(corner(i2) - corner(i0));
        sums[i0] += face;
        sums[i1] += face;
        sums[i2] += face;
    }

    let mut normals = Vec::with_capacity(positions.len());
    for sum in sums {
        let n = sum.normalize_or_zero();
        normals.extend_from_slice(&[n.x, n.y, n.z]);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "gbx_mesh_test_{}_{}_{}.obj",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn accumulated_normals_match_face_normal_for_lone_triangle() {
        let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = vec![0, 1, 2];
        let normals = accumulate_vertex_normals(&positions, &indices);
        for corner in normals.chunks_exact(3) {
            assert!((corner[0] - 0.0).abs() < 1e-6);
            assert!((corner[1] - 0.0).abs() < 1e-6);
            assert!((corner[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn unreferenced_vertex_gets_zero_normal() {
        let positions = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 5.0, 5.0,
        ];
        let indices = vec![0, 1, 2];
        let normals = accumulate_vertex_normals(&positions, &indices);
        assert_eq!(&normals[9..12], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn from_obj_loads_triangle_and_computes_normals() {
        let path = temp_file_path("triangle");
        fs::write(
            &path,
            "o tri\nv 0.0 0.0 0.0\nv 1.0 0.0 0.0\nv 0.0 1.0 0.0\nf 1 2 3\n",
        )
        .expect("failed to write temp obj file");

        let model = Model::from_obj(&path).expect("triangle obj should load");
        assert_eq!(model.name, "tri");
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].vertex_count(), 3);
        assert_eq!(model.meshes[0].index_count(), 3);
        // No vn lines in the file, so normals come from the fallback.
        let normal = model.meshes[0].vertices[0].normal;
        assert!((normal[2].abs() - 1.0).abs() < 1e-6);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn from_obj_reports_missing_file() {
        let path = temp_file_path("missing");
        let err = Model::from_obj(&path).expect_err("missing file should fail");
        assert!(matches!(err, ModelError::Load { .. }));
    }
}
