use std::num::NonZeroU64;

use log::debug;

use crate::error::InitError;
use crate::frame::FrameContext;
use crate::lighting::ShadowCaster;
use crate::pass_plan::PassKind;

use super::draw::{draw_instance, DrawResources};
use super::mesh::VERTEX_LAYOUT;
use super::shaders::SHADOW_SHADER;
use super::uniforms::LightSpaceUniform;

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Square depth target owned by one light.
pub struct ShadowMap {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl ShadowMap {
    pub fn create(device: &wgpu::Device, caster: ShadowCaster, size: u32) -> Result<Self, InitError> {
        if size == 0 {
            return Err(InitError::ZeroSizedShadowTarget(caster.label().to_string()));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{}-shadow-map", caster.label())),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            _texture: texture,
            view,
            size,
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

struct LightSlot {
    map: ShadowMap,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Owns both shadow maps and the depth-only program that fills them.
pub struct ShadowPassDriver {
    pipeline: wgpu::RenderPipeline,
    sun: LightSlot,
    window: LightSlot,
    sample_layout: wgpu::BindGroupLayout,
    sample_bind_group: wgpu::BindGroup,
    _comparison_sampler: wgpu::Sampler,
}

impl ShadowPassDriver {
    pub fn new(
        device: &wgpu::Device,
        instance_layout: &wgpu::BindGroupLayout,
        sun_size: u32,
        window_size: u32,
    ) -> Result<Self, InitError> {
        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light-space-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<LightSpaceUniform>() as u64),
                },
                count: None,
            }],
        });

        let slot = |caster: ShadowCaster, size: u32| -> Result<LightSlot, InitError> {
            let map = ShadowMap::create(device, caster, size)?;
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{}-light-space", caster.label())),
                size: std::mem::size_of::<LightSpaceUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}-light-space-bind-group", caster.label())),
                layout: &light_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            Ok(LightSlot {
                map,
                buffer,
                bind_group,
            })
        };
        let sun = slot(ShadowCaster::Sun, sun_size)?;
        let window = slot(ShadowCaster::Window, window_size)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_SHADER.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&light_layout, instance_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_shadow"),
                compilation_options: Default::default(),
                buffers: &[VERTEX_LAYOUT],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview: None,
            cache: None,
        });

        let comparison_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-comparison-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let depth_texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sample_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-sample-layout"),
            entries: &[
                depth_texture(0),
                depth_texture(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let sample_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-sample-bind-group"),
            layout: &sample_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&sun.map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&window.map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&comparison_sampler),
                },
            ],
        });

        Ok(Self {
            pipeline,
            sun,
            window,
            sample_layout,
            sample_bind_group,
            _comparison_sampler: comparison_sampler,
        })
    }

    fn slot(&self, caster: ShadowCaster) -> &LightSlot {
        match caster {
            ShadowCaster::Sun => &self.sun,
            ShadowCaster::Window => &self.window,
        }
    }

    pub fn map(&self, caster: ShadowCaster) -> &ShadowMap {
        &self.slot(caster).map
    }

    /// Layout of the group the lit program samples both maps through.
    pub fn sample_layout(&self) -> &wgpu::BindGroupLayout {
        &self.sample_layout
    }

    pub fn sample_bind_group(&self) -> &wgpu::BindGroup {
        &self.sample_bind_group
    }

    /// Writes this frame's light-space matrices for both lights.
    pub fn upload(&self, queue: &wgpu::Queue, frame: &FrameContext) {
        for caster in ShadowCaster::ALL {
            let uniform = LightSpaceUniform::from(&frame.shadow_light(caster).transform);
            queue.write_buffer(&self.slot(caster).buffer, 0, bytemuck::bytes_of(&uniform));
        }
    }

    /// Records the depth pass for `caster`; returns the number of draws.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        caster: ShadowCaster,
        frame: &FrameContext,
        resources: &DrawResources<'_>,
    ) -> usize {
        let slot = self.slot(caster);
        let size = slot.map.size as f32;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&format!("{}-shadow-pass", caster.label())),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &slot.map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &slot.bind_group, &[]);

        let mut draws = 0;
        for (index, instance) in frame.shadow_casters() {
            if draw_instance(&mut pass, PassKind::Shadow, index, instance, resources) {
                draws += 1;
            }
        }
        debug!("{} shadow pass: {draws} draws", caster.label());
        draws
    }
}
