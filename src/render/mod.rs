//! wgpu back end: owns the surface and runs the four passes of every frame.

pub mod draw;
pub mod instances;
pub mod main_pass;
pub mod material;
pub mod mesh;
pub mod shaders;
pub mod shadow;
pub mod uniforms;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::config::WalkthroughConfig;
use crate::frame::FrameContext;
use crate::lighting::ShadowCaster;
use crate::pass_plan::{FramePass, PassOrderError, PassSequencer};

use self::draw::DrawResources;
use self::instances::InstanceBuffer;
use self::main_pass::{MainPassCompositor, MainPassLayouts};
use self::material::{material_layout, MaterialLibrary};
use self::mesh::MeshLibrary;
use self::shadow::ShadowPassDriver;

/// Per-frame failures; none of them end the walk-through on their own.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    PassOrder(#[from] PassOrderError),
}

/// Optional features the walk-through asks for when the adapter offers them.
pub fn optional_features(adapter: wgpu::Features) -> wgpu::Features {
    adapter & wgpu::Features::POLYGON_MODE_LINE
}

/// GPU renderer drawing the gallery into a window surface.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    instances: InstanceBuffer,
    shadows: ShadowPassDriver,
    compositor: MainPassCompositor,
    meshes: MeshLibrary,
    materials: MaterialLibrary,
    sequencer: PassSequencer,
}

impl Renderer {
    /// Initializes the device, both shadow targets and every asset.
    pub async fn new(window: Arc<Window>, walkthrough: &WalkthroughConfig) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);
        let features = optional_features(adapter.features());
        let line_mode = features.contains(wgpu::Features::POLYGON_MODE_LINE);
        if !line_mode {
            info!("adapter lacks POLYGON_MODE_LINE; the wireframe toggle is ignored");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("walkthrough-device"),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                experimental_features: Default::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("failed to create GPU device")?;
        // Errors outside the per-frame scope, e.g. from reconfiguring or presenting.
        device.on_uncaptured_error(Arc::new(|err: wgpu::Error| {
            warn!("uncaptured GPU error: {err}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let instances = InstanceBuffer::new(&device);
        let shadows = ShadowPassDriver::new(
            &device,
            instances.layout(),
            walkthrough.sun.map_size,
            walkthrough.window_light.map_size,
        )?;
        let materials_layout = material_layout(&device);
        let compositor = MainPassCompositor::new(
            &device,
            surface_format,
            size.width,
            size.height,
            MainPassLayouts {
                instance: instances.layout(),
                shadow_sample: shadows.sample_layout(),
                material: &materials_layout,
            },
            line_mode,
        );
        let meshes = MeshLibrary::load(&device, &walkthrough.assets)?;
        let materials = MaterialLibrary::load(&device, &queue, &materials_layout, &walkthrough.assets)?;
        info!(
            "renderer ready: {}x{} {:?}, shadow maps {} / {}",
            size.width,
            size.height,
            surface_format,
            shadows.map(ShadowCaster::Sun).size(),
            shadows.map(ShadowCaster::Window).size()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            instances,
            shadows,
            compositor,
            meshes,
            materials,
            sequencer: PassSequencer::new(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Reconfigures the swap chain and main depth buffer; zero sizes are ignored.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.compositor
            .resize(&self.device, new_size.width, new_size.height);
    }

    /// Sun shadow, window shadow, opaque, transparent.
    pub fn render(&mut self, frame: &FrameContext) -> Result<(), RenderError> {
        self.sequencer.reset()?;
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let encoded = match self.encode(frame, &view) {
            Ok(commands) => {
                self.queue.submit(std::iter::once(commands));
                Ok(())
            }
            Err(err) => {
                self.sequencer = PassSequencer::new();
                Err(err)
            }
        };
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            warn!("frame {} raised a GPU error: {err}", frame.frame_index);
        }
        encoded?;
        output.present();
        Ok(())
    }

    fn encode(
        &mut self,
        frame: &FrameContext,
        view: &wgpu::TextureView,
    ) -> Result<wgpu::CommandBuffer, PassOrderError> {
        self.instances
            .upload(&self.device, &self.queue, &frame.instances);
        self.shadows.upload(&self.queue, frame);
        self.compositor.upload(&self.queue, frame);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        let resources = DrawResources {
            meshes: &self.meshes,
            materials: &self.materials,
            instances: &self.instances,
        };
        for caster in ShadowCaster::ALL {
            self.sequencer.enter(FramePass::Shadow(caster))?;
            self.shadows.record(&mut encoder, caster, frame, &resources);
        }
        self.compositor.record(
            &mut encoder,
            view,
            frame,
            self.shadows.sample_bind_group(),
            &resources,
            &mut self.sequencer,
        )?;
        Ok(encoder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_mode_requested_only_when_offered() {
        let offered = wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::DEPTH_CLIP_CONTROL;
        assert_eq!(optional_features(offered), wgpu::Features::POLYGON_MODE_LINE);
        assert!(optional_features(wgpu::Features::DEPTH_CLIP_CONTROL).is_empty());
    }
}
