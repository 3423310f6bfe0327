//! Solid rectangle fills.
//!
//! Shape fills draw a quad through the bound world transform; cover fills
//! span the whole target. Either way the scissor rect bounds what lands, so
//! a fill is exactly "colour this rect".

use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;

use super::gpu::{GpuDevice, SCREEN_FORMAT};
use super::world::WorldMatrix;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Premultiplied alpha over the destination.
    Alpha,
    /// `dst + src` on colour channels.
    Add,
    /// `dst - src` on colour channels.
    Subtract,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FillShape {
    /// `FillDraw::rect` in world space.
    Quad,
    /// Whatever the scissor leaves of the target.
    Cover,
}

/// One recorded fill.
#[derive(Debug, Copy, Clone)]
pub(crate) struct FillDraw {
    pub shape: FillShape,
    pub rect: Rect,
    /// Target pixels, already clipped to the target.
    pub scissor: Rect,
    /// Premultiplied.
    pub color: [f32; 4],
    pub mode: BlendMode,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FillUniform {
    color: [f32; 4],
    rect: [f32; 4],
}

pub(crate) struct FillPipeline {
    world_layout: wgpu::BindGroupLayout,
    fill_layout: wgpu::BindGroupLayout,
    quad: wgpu::RenderPipeline,
    cover_alpha: wgpu::RenderPipeline,
    cover_add: wgpu::RenderPipeline,
    cover_subtract: wgpu::RenderPipeline,
}

impl FillPipeline {
    pub fn new(gpu: &GpuDevice) -> Self {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kiln fill shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fill.wgsl").into()),
        });

        let uniform_layout = |label: &str, visibility: wgpu::ShaderStages, size: usize| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size as u64),
                    },
                    count: None,
                }],
            })
        };
        let world_layout = uniform_layout(
            "kiln world bgl",
            wgpu::ShaderStages::VERTEX,
            std::mem::size_of::<WorldMatrix>(),
        );
        let fill_layout = uniform_layout(
            "kiln fill bgl",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            std::mem::size_of::<FillUniform>(),
        );

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kiln fill pipeline layout"),
            bind_group_layouts: &[&world_layout, &fill_layout],
            immediate_size: 0,
        });

        let build = |label: &str, vertex: &str, blend: wgpu::BlendState| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vertex),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: SCREEN_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        Self {
            quad: build("kiln fill quad pipeline", "vs_quad", blend_state(BlendMode::Alpha)),
            cover_alpha: build("kiln cover alpha pipeline", "vs_cover", blend_state(BlendMode::Alpha)),
            cover_add: build("kiln cover add pipeline", "vs_cover", blend_state(BlendMode::Add)),
            cover_subtract: build(
                "kiln cover subtract pipeline",
                "vs_cover",
                blend_state(BlendMode::Subtract),
            ),
            world_layout,
            fill_layout,
        }
    }

    /// Records `draw` into `encoder`, targeting `view` and projecting
    /// through `world`.
    pub fn draw(
        &self,
        gpu: &GpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        world: &wgpu::Buffer,
        draw: FillDraw,
    ) {
        let scissor = draw.scissor;
        if scissor.is_empty() || scissor.origin.x < 0 || scissor.origin.y < 0 {
            return;
        }

        let pipeline = match (draw.shape, draw.mode) {
            (FillShape::Quad, BlendMode::Alpha) => &self.quad,
            (FillShape::Quad, mode) => {
                log::warn!("quad fills only blend with alpha, got {mode:?}");
                return;
            }
            (FillShape::Cover, BlendMode::Alpha) => &self.cover_alpha,
            (FillShape::Cover, BlendMode::Add) => &self.cover_add,
            (FillShape::Cover, BlendMode::Subtract) => &self.cover_subtract,
        };

        let r = draw.rect;
        let uniform = gpu.create_uniform(
            "kiln fill ubo",
            &FillUniform {
                color: draw.color,
                rect: [
                    r.origin.x as f32,
                    r.origin.y as f32,
                    r.size.x as f32,
                    r.size.y as f32,
                ],
            },
        );
        let fill_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln fill bind group"),
            layout: &self.fill_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        let world_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln world bind group"),
            layout: &self.world_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: world.as_entire_binding(),
            }],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kiln fill pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &world_group, &[]);
        rpass.set_bind_group(1, &fill_group, &[]);
        rpass.set_scissor_rect(
            scissor.origin.x as u32,
            scissor.origin.y as u32,
            scissor.size.x as u32,
            scissor.size.y as u32,
        );
        match draw.shape {
            FillShape::Quad => rpass.draw(0..6, 0..1),
            FillShape::Cover => rpass.draw(0..3, 0..1),
        }
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    let keep_alpha = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };

    match mode {
        BlendMode::Alpha => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Add => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: keep_alpha,
        },
        BlendMode::Subtract => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::ReverseSubtract,
            },
            alpha: keep_alpha,
        },
    }
}
