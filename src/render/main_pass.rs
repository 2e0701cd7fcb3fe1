use std::num::NonZeroU64;

use log::debug;

use crate::frame::{FrameContext, CLEAR_COLOR};
use crate::pass_plan::{BlendMode, DepthState, FramePass, PassKind, PassOrderError, PassSequencer};
use crate::placement::RenderPhase;

use super::draw::{draw_instance, DrawResources};
use super::mesh::VERTEX_LAYOUT;
use super::shaders::LIT_SHADER;
use super::uniforms::LitGlobals;

pub struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("main-depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Draw counts of one main pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MainPassStats {
    pub opaque: usize,
    pub transparent: usize,
}

struct LitPipelines {
    opaque: wgpu::RenderPipeline,
    transparent: wgpu::RenderPipeline,
}

pub struct MainPassCompositor {
    fill: LitPipelines,
    /// Edge-only variants, present when the device has `POLYGON_MODE_LINE`.
    line: Option<LitPipelines>,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    depth: DepthBuffer,
}

pub struct MainPassLayouts<'a> {
    pub instance: &'a wgpu::BindGroupLayout,
    pub shadow_sample: &'a wgpu::BindGroupLayout,
    pub material: &'a wgpu::BindGroupLayout,
}

impl MainPassCompositor {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        layouts: MainPassLayouts<'_>,
        line_mode: bool,
    ) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lit-globals-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<LitGlobals>() as u64),
                },
                count: None,
            }],
        });
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lit-globals"),
            size: std::mem::size_of::<LitGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lit-globals-bind-group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit-shader"),
            source: wgpu::ShaderSource::Wgsl(LIT_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit-pipeline-layout"),
            bind_group_layouts: &[
                &globals_layout,
                layouts.instance,
                layouts.shadow_sample,
                layouts.material,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = |pass: FramePass, polygon_mode: wgpu::PolygonMode| {
            let DepthState { test, write } = pass.depth();
            let blend = match pass.blend() {
                BlendMode::Replace => None,
                BlendMode::StraightAlpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("lit-{pass:?}-{polygon_mode:?}-pipeline").to_lowercase()),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[VERTEX_LAYOUT],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthBuffer::FORMAT,
                    depth_write_enabled: write,
                    depth_compare: if test {
                        wgpu::CompareFunction::Less
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
        };

        let variant = |polygon_mode| LitPipelines {
            opaque: pipeline(FramePass::Opaque, polygon_mode),
            transparent: pipeline(FramePass::Transparent, polygon_mode),
        };

        Self {
            fill: variant(wgpu::PolygonMode::Fill),
            line: line_mode.then(|| variant(wgpu::PolygonMode::Line)),
            globals_buffer,
            globals_bind_group,
            depth: DepthBuffer::create(device, width, height),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = DepthBuffer::create(device, width, height);
    }

    pub fn upload(&self, queue: &wgpu::Queue, frame: &FrameContext) {
        let globals = LitGlobals::from_frame(frame);
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
    }

    /// Records the opaque then transparent sub-passes into `target`.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        frame: &FrameContext,
        shadow_maps: &wgpu::BindGroup,
        resources: &DrawResources<'_>,
        sequencer: &mut PassSequencer,
    ) -> Result<MainPassStats, PassOrderError> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: CLEAR_COLOR.x as f64,
                        g: CLEAR_COLOR.y as f64,
                        b: CLEAR_COLOR.z as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        pass.set_bind_group(2, shadow_maps, &[]);

        let pipelines = match (&self.line, frame.wireframe) {
            (Some(line), true) => line,
            (None, true) => {
                debug!("wireframe requested but unsupported; drawing filled");
                &self.fill
            }
            (_, false) => &self.fill,
        };
        let mut stats = MainPassStats::default();

        sequencer.enter(FramePass::Opaque)?;
        pass.set_pipeline(&pipelines.opaque);
        for (index, instance) in frame.phase(RenderPhase::Opaque) {
            if draw_instance(&mut pass, PassKind::Lit, index, instance, resources) {
                stats.opaque += 1;
            }
        }

        sequencer.enter(FramePass::Transparent)?;
        pass.set_pipeline(&pipelines.transparent);
        for (index, instance) in frame.phase(RenderPhase::Transparent) {
            if draw_instance(&mut pass, PassKind::Lit, index, instance, resources) {
                stats.transparent += 1;
            }
        }
        drop(pass);

        // The next frame's opaque pipeline writes depth again.
        sequencer.restore_depth_write();
        sequencer.finish()?;
        debug!(
            "main pass: {} opaque, {} transparent draws",
            stats.opaque, stats.transparent
        );
        Ok(stats)
    }
}
