pub mod camera;
pub mod gpu_context;
pub mod mesh;
pub mod model_pipeline;
pub mod sprite_pipeline;
pub mod texture;
pub mod vertex;

pub use camera::{Camera3D, CameraUniform};
pub use gpu_context::{GpuContext, DEPTH_FORMAT};
pub use mesh::{Model, ModelError};
pub use model_pipeline::{ModelPipeline, TransformUniform};
pub use sprite_pipeline::{SpriteBatch, SpriteLayer, SpriteQuad, SpriteRenderer};
pub use texture::Texture;
pub use vertex::{MeshVertex, SpriteVertex};
