use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;
use log::info;
use wgpu::util::DeviceExt;

use crate::config::{AssetConfig, MaterialPaths};
use crate::error::InitError;
use crate::placement::{MaterialId, ModelSlot};

use super::mesh::model_source;
use super::uniforms::MaterialUniform;

/// Fallback texel for each map when the material does not provide one.
const WHITE: [u8; 4] = [255, 255, 255, 255];
const MID_GREY: [u8; 4] = [128, 128, 128, 255];
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

pub fn load_image(path: &Path) -> Result<RgbaImage, InitError> {
    let image = image::open(path).map_err(|source| InitError::Texture {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &RgbaImage,
    srgb: bool,
    label: &str,
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: image.width().max(1),
        height: image.height().max(1),
        depth_or_array_layers: 1,
    };
    let format = if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn solid(texel: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(1, 1, image::Rgba(texel))
}

/// Decoded maps of one material; absent maps fall back to neutral texels.
pub struct MaterialImages {
    pub diffuse: RgbaImage,
    pub specular: RgbaImage,
    pub roughness: RgbaImage,
    pub normal: Option<RgbaImage>,
    pub opacity: Option<RgbaImage>,
}

impl MaterialImages {
    pub fn load(assets: &AssetConfig, paths: &MaterialPaths) -> Result<Self, InitError> {
        let read = |path: &Option<std::path::PathBuf>| -> Result<Option<RgbaImage>, InitError> {
            path.as_ref()
                .map(|relative| load_image(&assets.resolve(relative)))
                .transpose()
        };
        Ok(Self {
            diffuse: read(&paths.diffuse)?.unwrap_or_else(|| solid(WHITE)),
            specular: read(&paths.specular)?.unwrap_or_else(|| solid(MID_GREY)),
            roughness: read(&paths.roughness)?.unwrap_or_else(|| solid(MID_GREY)),
            normal: read(&paths.normal)?,
            opacity: read(&paths.opacity)?,
        })
    }

    pub fn plain() -> Self {
        Self {
            diffuse: solid(WHITE),
            specular: solid(MID_GREY),
            roughness: solid(MID_GREY),
            normal: None,
            opacity: None,
        }
    }

    pub fn uniform(&self) -> MaterialUniform {
        MaterialUniform::new(self.normal.is_some(), self.opacity.is_some())
    }
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material-layout"),
        entries: &[
            texture(0),
            texture(1),
            texture(2),
            texture(3),
            texture(4),
            sampler(5),
            sampler(6),
            wgpu::BindGroupLayoutEntry {
                binding: 7,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<MaterialUniform>() as u64,
                    ),
                },
                count: None,
            },
        ],
    })
}

/// Bind groups for every material the placement can reference.
pub struct MaterialLibrary {
    bind_groups: HashMap<MaterialId, wgpu::BindGroup>,
    fallback: wgpu::BindGroup,
    _repeat_sampler: wgpu::Sampler,
    _mask_sampler: wgpu::Sampler,
}

impl MaterialLibrary {
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        assets: &AssetConfig,
    ) -> Result<Self, InitError> {
        let repeat_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-repeat-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });
        // The glass mask must not bleed between frame and pane.
        let mask_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-mask-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let samplers = (&repeat_sampler, &mask_sampler);

        let mut sources: Vec<(MaterialId, MaterialImages)> = vec![
            (MaterialId::Floor, MaterialImages::load(assets, &assets.floor)?),
            (MaterialId::Wall, MaterialImages::load(assets, &assets.wall)?),
            (MaterialId::Glass, MaterialImages::load(assets, &assets.glass)?),
            (MaterialId::Sky, MaterialImages::load(assets, &assets.sky)?),
            (MaterialId::Dust, MaterialImages::plain()),
        ];
        for slot in ModelSlot::ALL {
            let texture = model_source(&assets.models, slot).and_then(|source| source.texture.as_ref());
            let mut images = MaterialImages::plain();
            if let Some(path) = texture {
                images.diffuse = load_image(&assets.resolve(path))?;
            }
            sources.push((MaterialId::Model(slot), images));
        }

        let mut bind_groups = HashMap::new();
        for (id, images) in &sources {
            let label = format!("{id:?}").to_lowercase();
            bind_groups.insert(*id, create_bind_group(device, queue, layout, images, samplers, &label));
        }
        info!("prepared {} materials", bind_groups.len());
        let fallback = create_bind_group(
            device,
            queue,
            layout,
            &MaterialImages::plain(),
            samplers,
            "fallback",
        );

        Ok(Self {
            bind_groups,
            fallback,
            _repeat_sampler: repeat_sampler,
            _mask_sampler: mask_sampler,
        })
    }

    pub fn get(&self, id: MaterialId) -> &wgpu::BindGroup {
        self.bind_groups.get(&id).unwrap_or(&self.fallback)
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    images: &MaterialImages,
    (repeat, mask): (&wgpu::Sampler, &wgpu::Sampler),
    label: &str,
) -> wgpu::BindGroup {
    let diffuse = upload(device, queue, &images.diffuse, true, &format!("{label}-diffuse"));
    let specular = upload(device, queue, &images.specular, false, &format!("{label}-specular"));
    let roughness = upload(device, queue, &images.roughness, false, &format!("{label}-roughness"));
    let normal = upload(
        device,
        queue,
        images.normal.as_ref().unwrap_or(&solid(FLAT_NORMAL)),
        false,
        &format!("{label}-normal"),
    );
    let opacity = upload(
        device,
        queue,
        images.opacity.as_ref().unwrap_or(&solid(WHITE)),
        false,
        &format!("{label}-opacity"),
    );
    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label}-material")),
        contents: bytemuck::bytes_of(&images.uniform()),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label}-material-bind-group")),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&specular),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&roughness),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&normal),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(&opacity),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(repeat),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: wgpu::BindingResource::Sampler(mask),
            },
            wgpu::BindGroupEntry {
                binding: 7,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        let mut checker = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        checker.put_pixel(1, 0, image::Rgba([255, 0, 0, 255]));
        checker.save(&path).unwrap();

        let decoded = load_image(&path).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn unreadable_texture_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_image(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, InitError::Texture { .. }));
    }

    #[test]
    fn missing_maps_use_neutral_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetConfig {
            root: dir.path().to_path_buf(),
            ..AssetConfig::default()
        };
        let images = MaterialImages::load(&assets, &MaterialPaths::default()).unwrap();
        assert_eq!(images.diffuse.get_pixel(0, 0).0, WHITE);
        assert_eq!(images.uniform().flags, [0.0, 0.0, 0.0, 0.0]);
    }
}
