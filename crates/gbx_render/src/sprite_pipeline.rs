//! Screen-space sprite overlay used by the background and foreground draw
//! phases. Quads are specified in pixel coordinates, expanded into a CPU
//! mesh each time the batch changes, and streamed into GPU buffers that
//! grow in power-of-two steps and never shrink.
//!
//! Each phase owns a `SpriteLayer` (its buffers) because `write_buffer`
//! uploads all land before the frame's command buffer executes; two phases
//! sharing one buffer would read the same, last-written mesh.

use crate::texture::Texture;
use crate::vertex::SpriteVertex;

#[derive(Debug, Clone, Copy)]
pub struct SpriteQuad {
    /// Center position in pixels, origin at the top-left of the surface.
    pub center: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

#[derive(Default)]
pub struct SpriteBatch {
    quads: Vec<SpriteQuad>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, quad: SpriteQuad) {
        self.quads.push(quad);
    }

    pub fn clear(&mut self) {
        self.quads.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Expand every quad into 4 vertices and 6 indices.
    pub fn build_mesh(&self) -> (Vec<SpriteVertex>, Vec<u32>) {
        let mut vertices = Vec::with_capacity(self.quads.len() * 4);
        let mut indices = Vec::with_capacity(self.quads.len() * 6);

        for quad in &self.quads {
            let half_w = quad.size[0] * 0.5;
            let half_h = quad.size[1] * 0.5;
            let base_index = vertices.len() as u32;

            vertices.push(SpriteVertex {
                position: [quad.center[0] - half_w, quad.center[1] - half_h],
                tex_coords: [0.0, 0.0],
                color: quad.color,
            });
            vertices.push(SpriteVertex {
                position: [quad.center[0] + half_w, quad.center[1] - half_h],
                tex_coords: [1.0, 0.0],
                color: quad.color,
            });
            vertices.push(SpriteVertex {
                position: [quad.center[0] + half_w, quad.center[1] + half_h],
                tex_coords: [1.0, 1.0],
                color: quad.color,
            });
            vertices.push(SpriteVertex {
                position: [quad.center[0] - half_w, quad.center[1] + half_h],
                tex_coords: [0.0, 1.0],
                color: quad.color,
            });

            indices.extend_from_slice(&[
                base_index,
                base_index + 1,
                base_index + 2,
                base_index,
                base_index + 2,
                base_index + 3,
            ]);
        }

        (vertices, indices)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniform {
    size: [f32; 2],
    _padding: [f32; 2],
}

pub struct SpritePipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    screen_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
}

impl SpritePipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let screen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Screen Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&screen_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            render_pipeline,
            screen_layout,
            texture_layout,
        }
    }

    fn create_screen_bind_group(
        &self,
        device: &wgpu::Device,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Screen Bind Group"),
            layout: &self.screen_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }
}

/// GPU mesh state for one overlay phase's quads.
pub struct SpriteLayer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_capacity: usize,
    index_count: u32,
}

/// Owns the sprite pipeline and the per-frame bind groups shared by all
/// overlay layers.
pub struct SpriteRenderer {
    pipeline: SpritePipeline,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,
    white_bind_group: wgpu::BindGroup,
}

impl SpriteRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
    ) -> Self {
        let pipeline = SpritePipeline::new(device, surface_format);

        let screen_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sprite Screen Uniform Buffer"),
            size: std::mem::size_of::<ScreenUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let screen_bind_group = pipeline.create_screen_bind_group(device, &screen_buffer);

        let white = Texture::from_rgba8(device, queue, &[255, 255, 255, 255], 1, 1, "sprite_white");
        let white_bind_group = pipeline.create_texture_bind_group(device, &white);

        let renderer = Self {
            pipeline,
            screen_buffer,
            screen_bind_group,
            white_bind_group,
        };
        renderer.resize(queue, surface_size.0, surface_size.1);
        renderer
    }

    pub fn create_layer(&self, device: &wgpu::Device) -> SpriteLayer {
        let vertex_capacity = 4;
        let index_capacity = 6;
        SpriteLayer {
            vertex_buffer: create_vertex_buffer(device, vertex_capacity),
            index_buffer: create_index_buffer(device, index_capacity),
            vertex_capacity,
            index_capacity,
            index_count: 0,
        }
    }

    pub fn resize(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        let uniform = ScreenUniform {
            size: [width.max(1) as f32, height.max(1) as f32],
            _padding: [0.0, 0.0],
        };
        queue.write_buffer(&self.screen_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Rebuild a layer's GPU mesh from `batch`. Must run before the frame's
    /// encoder is submitted.
    pub fn prepare_layer(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layer: &mut SpriteLayer,
        batch: &SpriteBatch,
    ) {
        let (vertices, indices) = batch.build_mesh();
        ensure_layer_capacity(device, layer, vertices.len(), indices.len());
        layer.index_count = indices.len() as u32;

        if !vertices.is_empty() {
            queue.write_buffer(&layer.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        if !indices.is_empty() {
            queue.write_buffer(&layer.index_buffer, 0, bytemuck::cast_slice(&indices));
        }
    }

    pub fn draw_layer(&self, pass: &mut wgpu::RenderPass<'_>, layer: &SpriteLayer) {
        if layer.index_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline.render_pipeline);
        pass.set_bind_group(0, &self.screen_bind_group, &[]);
        pass.set_bind_group(1, &self.white_bind_group, &[]);
        pass.set_vertex_buffer(0, layer.vertex_buffer.slice(..));
        pass.set_index_buffer(layer.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..layer.index_count, 0, 0..1);
    }
}

fn ensure_layer_capacity(
    device: &wgpu::Device,
    layer: &mut SpriteLayer,
    vertex_count: usize,
    index_count: usize,
) {
    let needed_vertices = vertex_count.max(1);
    if needed_vertices > layer.vertex_capacity {
        layer.vertex_capacity = needed_vertices.next_power_of_two();
        layer.vertex_buffer = create_vertex_buffer(device, layer.vertex_capacity);
    }

    let needed_indices = index_count.max(1);
    if needed_indices > layer.index_capacity {
        layer.index_capacity = needed_indices.next_power_of_two();
        layer.index_buffer = create_index_buffer(device, layer.index_capacity);
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_builds_empty_mesh() {
        let batch = SpriteBatch::new();
        let (vertices, indices) = batch.build_mesh();
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn each_quad_expands_to_four_vertices_six_indices() {
        let mut batch = SpriteBatch::new();
        batch.push(SpriteQuad {
            center: [100.0, 50.0],
            size: [20.0, 10.0],
            color: [1.0, 1.0, 1.0, 1.0],
        });
        batch.push(SpriteQuad {
            center: [0.0, 0.0],
            size: [2.0, 2.0],
            color: [0.0, 0.0, 0.0, 0.5],
        });

        let (vertices, indices) = batch.build_mesh();
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 12);

        // First quad corners, clockwise from top-left in pixel space.
        assert_eq!(vertices[0].position, [90.0, 45.0]);
        assert_eq!(vertices[1].position, [110.0, 45.0]);
        assert_eq!(vertices[2].position, [110.0, 55.0]);
        assert_eq!(vertices[3].position, [90.0, 55.0]);

        // Second quad indexes its own vertices.
        assert_eq!(&indices[6..], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn clear_empties_the_batch() {
        let mut batch = SpriteBatch::new();
        batch.push(SpriteQuad {
            center: [0.0, 0.0],
            size: [1.0, 1.0],
            color: [1.0; 4],
        });
        assert_eq!(batch.len(), 1);
        batch.clear();
        assert!(batch.is_empty());
    }
}
