//! Scene controller: owns the loaded level, the model registry, and the
//! placed mesh instances.
//!
//! Each instance stores the registry key of its resolved model, assigned at
//! instantiation time. Draw-time lookup goes through that key, so two
//! placements sharing an OBJ file share one model and still draw with their
//! own transforms.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use wgpu::util::DeviceExt;

use gbx_core::transform::WorldTransform;
use gbx_render::mesh::ModelError;
use gbx_render::{
    Camera3D, GpuContext, ModelPipeline, SpriteBatch, SpriteLayer, SpriteRenderer,
    TransformUniform,
};

use crate::level::{load_level_from_path, LevelData, LevelError, ObjectRecord};
use crate::registry::ModelRegistry;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.392,
    g: 0.584,
    b: 0.929,
    a: 1.0,
};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug)]
struct InstanceGpuResources {
    transform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct MeshInstance {
    pub name: String,
    pub model_key: Arc<str>,
    pub transform: WorldTransform,
    gpu: Option<InstanceGpuResources>,
}

impl MeshInstance {
    fn from_record(record: &ObjectRecord, model_key: Arc<str>) -> Self {
        Self {
            name: record.name.clone(),
            model_key,
            transform: WorldTransform::new(record.translation, record.rotation, record.scaling),
            gpu: None,
        }
    }

    fn init_gpu_resources(&mut self, device: &wgpu::Device, pipeline: &ModelPipeline) {
        let uniform = TransformUniform {
            world: self.transform.world_matrix().to_cols_array_2d(),
        };
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Transform Buffer '{}'", self.name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = pipeline.create_transform_bind_group(device, &transform_buffer);
        self.gpu = Some(InstanceGpuResources {
            transform_buffer,
            bind_group,
        });
    }
}

/// Resolve every placement's model through the registry (loading each
/// distinct file once) and build one instance per renderable record.
pub fn build_instances(
    level: &LevelData,
    registry: &mut ModelRegistry,
    model_dir: &Path,
) -> Result<Vec<MeshInstance>, ModelError> {
    let mut instances = Vec::with_capacity(level.objects.len());
    for record in &level.objects {
        let Some(file_name) = &record.file_name else {
            log::warn!(
                "Mesh placement '{}' has no file_name, skipping",
                record.name
            );
            continue;
        };
        let path = model_dir.join(file_name).to_string_lossy().into_owned();
        let key = registry.get_or_load(&path)?;
        instances.push(MeshInstance::from_record(record, key));
    }
    Ok(instances)
}

/// Everything the scene needs from the frame to record its passes.
pub struct ScenePasses<'a> {
    pub gpu: &'a GpuContext,
    pub model_pipeline: &'a ModelPipeline,
    pub camera_bind_group: &'a wgpu::BindGroup,
    pub sprites: &'a SpriteRenderer,
}

pub struct GameScene {
    level: LevelData,
    registry: ModelRegistry,
    instances: Vec<MeshInstance>,
    pub camera: Camera3D,

    // The background and foreground phases run every frame; their batches
    // start out empty.
    pub background_sprites: SpriteBatch,
    pub foreground_sprites: SpriteBatch,
    background_layer: SpriteLayer,
    foreground_layer: SpriteLayer,
}

impl GameScene {
    pub fn new(
        gpu: &GpuContext,
        model_pipeline: &ModelPipeline,
        sprites: &SpriteRenderer,
        level_path: &Path,
        model_dir: &Path,
    ) -> Result<Self, SceneError> {
        let level = load_level_from_path(level_path)?;
        let mut registry = ModelRegistry::new();
        let mut instances = build_instances(&level, &mut registry, model_dir)?;

        registry.init_gpu_resources(&gpu.device);
        for instance in &mut instances {
            instance.init_gpu_resources(&gpu.device, model_pipeline);
        }

        let camera = Camera3D::new(gpu.size.0, gpu.size.1);

        Ok(Self {
            level,
            registry,
            instances,
            camera,
            background_sprites: SpriteBatch::new(),
            foreground_sprites: SpriteBatch::new(),
            background_layer: sprites.create_layer(&gpu.device),
            foreground_layer: sprites.create_layer(&gpu.device),
        })
    }

    /// Recompute every instance's world matrix from its transform state.
    pub fn update(&mut self) {
        for instance in &mut self.instances {
            instance.transform.update_matrix();
        }
    }

    /// Push the current world matrices into the per-instance GPU uniforms.
    pub fn upload_transforms(&self, queue: &wgpu::Queue) {
        for instance in &self.instances {
            let Some(gpu) = &instance.gpu else {
                continue;
            };
            let uniform = TransformUniform {
                world: instance.transform.world_matrix().to_cols_array_2d(),
            };
            queue.write_buffer(&gpu.transform_buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    /// Record the frame's three phases: background sprites (clears color),
    /// meshes (clears depth), foreground sprites (composites on top).
    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        frame: &ScenePasses<'_>,
    ) {
        frame.sprites.prepare_layer(
            &frame.gpu.device,
            &frame.gpu.queue,
            &mut self.background_layer,
            &self.background_sprites,
        );
        frame.sprites.prepare_layer(
            &frame.gpu.device,
            &frame.gpu.queue,
            &mut self.foreground_layer,
            &self.foreground_sprites,
        );

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Background Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            frame.sprites.draw_layer(&mut pass, &self.background_layer);
        }

        // The depth buffer is cleared here, between the sprite and mesh
        // phases, so background sprites never occlude geometry.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &frame.gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&frame.model_pipeline.render_pipeline);
            pass.set_bind_group(0, frame.camera_bind_group, &[]);

            for instance in &self.instances {
                let Some(model) = self.registry.get(&instance.model_key) else {
                    log::warn!(
                        "Instance '{}' references missing model '{}'",
                        instance.name,
                        instance.model_key
                    );
                    continue;
                };
                let Some(gpu) = &instance.gpu else {
                    continue;
                };
                pass.set_bind_group(1, &gpu.bind_group, &[]);
                model.draw(&mut pass);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Foreground Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            frame.sprites.draw_layer(&mut pass, &self.foreground_layer);
        }
    }

    pub fn level_name(&self) -> &str {
        &self.level.name
    }

    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn model_count(&self) -> usize {
        self.registry.model_count()
    }

    pub fn memory_estimate_mb(&self) -> f32 {
        self.registry.estimate_memory_mb()
    }
}
