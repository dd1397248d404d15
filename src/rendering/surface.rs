//! Graphics half of the frame cycle.
//!
//! `GraphicsSurface` owns the point-render pipeline, the two shared vertex
//! streams, and the uniform state (projection, rotation, border translation).
//! Its `draw` clears color and depth, scans both streams as vertex buffers,
//! and then blocks until the device finishes — a deliberate synchronization
//! point that trades throughput for deterministic frame pacing, and the
//! barrier that makes the next tick's buffer acquire safe.
//!
//! ## Vertex Streams
//! | Buffer | Attribute | Format |
//! |--------|-------------|-----------|
//! | 0 | in_position | Float32x4 |
//! | 1 | in_dist | Float32 |

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::CoreError;
use crate::rendering::spin::Spin;
use crate::simulation::buffers::{SharedParticleBuffers, DISTANCE_STRIDE, POSITION_STRIDE};

/// Shader attribute name to location table. The render program's inputs are
/// looked up by name here; a missing name is a binding error, mirroring a
/// failed attribute-location query.
const VERTEX_ATTRIBUTES: &[(&str, u32)] = &[("in_position", 0), ("in_dist", 1)];

fn attribute_location(name: &str) -> Result<u32, CoreError> {
    VERTEX_ATTRIBUTES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, loc)| *loc)
        .ok_or_else(|| CoreError::AttributeBinding {
            name: name.to_string(),
            stage: "render program",
        })
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SurfaceUniforms {
    projection: [[f32; 4]; 4],
    rotation: [[f32; 4]; 4],
    translation: [f32; 4],
}

/// Owns the graphics program, the shared particle buffers, and per-frame
/// draw invocation.
pub struct GraphicsSurface {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    uniforms: SurfaceUniforms,
    buffers: SharedParticleBuffers,
    depth_view: wgpu::TextureView,
    spin: Spin,
}

impl GraphicsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        particle_count: u32,
        border_size: f32,
        spin: Spin,
    ) -> Result<Self, CoreError> {
        let buffers = SharedParticleBuffers::new(device, particle_count)?;

        // Compile the render program inside a validation scope so the
        // compiler log surfaces instead of an uncaptured-error panic
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Render Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/particles.wgsl").into()),
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(CoreError::ShaderCompilation {
                stage: "render program",
                log: error.to_string(),
            });
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Uniforms"),
            size: std::mem::size_of::<SurfaceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let position_attrs = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 0,
            shader_location: attribute_location("in_position")?,
        }];
        let dist_attrs = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: 0,
            shader_location: attribute_location("in_dist")?,
        }];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: POSITION_STRIDE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &position_attrs,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: DISTANCE_STRIDE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &dist_attrs,
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(device, width, height);

        let uniforms = SurfaceUniforms {
            projection: projection_matrix(width, height),
            rotation: Mat4::IDENTITY.to_cols_array_2d(),
            translation: [0.0, 0.0, -border_size, 0.0],
        };
        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        Ok(Self {
            pipeline,
            bind_group,
            uniform_buffer,
            uniforms,
            buffers,
            depth_view,
            spin,
        })
    }

    /// Read-only handles to the shared streams for the compute side.
    pub fn shared_buffers(&self) -> &SharedParticleBuffers {
        &self.buffers
    }

    /// Update the border-derived translation uniform. Safe at any time after
    /// construction.
    pub fn set_border_size(&mut self, queue: &wgpu::Queue, border_size: f32) {
        self.uniforms.translation = [0.0, 0.0, -border_size, 0.0];
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    /// Advance the rotation angle and write the rotation uniform. Called
    /// once per frame before `draw`.
    pub fn update_dynamic_uniforms(&mut self, queue: &wgpu::Queue, dt: f32) {
        let angle = self.spin.advance(dt);
        self.uniforms.rotation = Mat4::from_rotation_y(angle).to_cols_array_2d();
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.depth_view = create_depth_view(device, width, height);
        self.uniforms.projection = projection_matrix(width, height);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    /// Clear, draw `particle_count` points, and block until the device
    /// finishes the frame.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        particle_count: u32,
    ) -> Result<(), CoreError> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Particle Draw Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.01,
                            g: 0.01,
                            b: 0.02,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.buffers.positions.slice(..));
            pass.set_vertex_buffer(1, self.buffers.distances.slice(..));
            pass.draw(0..particle_count, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));

        // Barrier: the frame must be finished before compute reacquires
        // the shared streams on the next tick
        let _ = device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

fn projection_matrix(width: u32, height: u32) -> [[f32; 4]; 4] {
    let aspect = width as f32 / height.max(1) as f32;
    Mat4::perspective_rh(0.785, aspect, 0.1, 600_000.0).to_cols_array_2d()
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Surface Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_attributes_resolve_to_locations() {
        assert_eq!(attribute_location("in_position").unwrap(), 0);
        assert_eq!(attribute_location("in_dist").unwrap(), 1);
    }

    #[test]
    fn unknown_attribute_is_a_binding_error() {
        let err = attribute_location("in_color").unwrap_err();
        assert!(matches!(err, CoreError::AttributeBinding { .. }));
    }
}
