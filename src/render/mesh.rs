use std::collections::HashMap;
use std::fs;

use anyhow::Result;
use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::config::{AssetConfig, ModelPaths, ModelSource};
use crate::error::InitError;
use crate::obj::{load_obj_from_str, MeshData, VERTEX_STRIDE};
use crate::placement::{Drawable, ModelSlot};

/// Unit quad in the XY plane facing +Z, uv (0,0) at the top left.
pub fn quad_mesh() -> MeshData {
    #[rustfmt::skip]
    let vertices = vec![
        -0.5, -0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 1.0,
         0.5, -0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 1.0,
         0.5,  0.5, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0,
        -0.5,  0.5, 0.0,  0.0, 0.0, 1.0,  0.0, 0.0,
    ];
    MeshData {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Unit cube centred on the origin with per-face normals.
pub fn cube_mesh() -> MeshData {
    // (normal, u axis, v axis) per face; the face centre is the normal * 0.5.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

    let mut mesh = MeshData::default();
    for (face, (normal, u, v)) in faces.iter().enumerate() {
        for (cu, cv) in corners {
            for axis in 0..3 {
                mesh.vertices
                    .push(normal[axis] * 0.5 + u[axis] * cu + v[axis] * cv);
            }
            mesh.vertices.extend_from_slice(normal);
            mesh.vertices.extend_from_slice(&[cu + 0.5, 0.5 - cv]);
        }
        let base = (face * 4) as u32;
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

pub struct MeshBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Interleaved vertex layout shared by both programs.
pub const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
};

/// Every mesh the gallery draws, uploaded once at start-up.
pub struct MeshLibrary {
    quad: MeshBuffers,
    cube: MeshBuffers,
    models: HashMap<ModelSlot, MeshBuffers>,
}

impl MeshLibrary {
    pub fn load(device: &wgpu::Device, assets: &AssetConfig) -> Result<Self, InitError> {
        let mut models = HashMap::new();
        for slot in ModelSlot::ALL {
            let Some(source) = model_source(&assets.models, slot) else {
                warn!("no mesh configured for {}, it will not be drawn", slot.label());
                continue;
            };
            let mesh = read_model(assets, source)?;
            info!(
                "loaded {} ({} vertices)",
                slot.label(),
                mesh.vertex_count()
            );
            models.insert(slot, MeshBuffers::from_mesh(device, &mesh, slot.label()));
        }
        Ok(Self {
            quad: MeshBuffers::from_mesh(device, &quad_mesh(), "quad"),
            cube: MeshBuffers::from_mesh(device, &cube_mesh(), "cube"),
            models,
        })
    }

    pub fn get(&self, drawable: Drawable) -> Option<&MeshBuffers> {
        match drawable {
            Drawable::Quad => Some(&self.quad),
            Drawable::Cube => Some(&self.cube),
            Drawable::Model(slot) => self.models.get(&slot),
        }
    }
}

pub fn model_source(models: &ModelPaths, slot: ModelSlot) -> Option<&ModelSource> {
    match slot {
        ModelSlot::Antonius => models.antonius.as_ref(),
        ModelSlot::Judas => models.judas.as_ref(),
        ModelSlot::Krieger => models.krieger.as_ref(),
        ModelSlot::EgyptDoor => models.egypt_door.as_ref(),
        ModelSlot::MuseumEntrance => models.museum_entrance.as_ref(),
        ModelSlot::Painting => models.painting.as_ref(),
        ModelSlot::Person => models.person.as_ref(),
    }
}

fn read_model(assets: &AssetConfig, source: &ModelSource) -> Result<MeshData, InitError> {
    let path = assets.resolve(&source.mesh);
    let model_error = |reason: String| InitError::Model {
        path: path.clone(),
        reason,
    };
    let text = fs::read_to_string(&path).map_err(|err| model_error(err.to_string()))?;
    load_obj_from_str(&text).map_err(|err| model_error(format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn quad_faces_positive_z() {
        let quad = quad_mesh();
        assert_eq!(quad.vertex_count(), 4);
        let (a, b, c) = (quad.position(0), quad.position(1), quad.position(2));
        assert!((b - a).cross(c - a).normalize().distance(Vec3::Z) < 1e-6);
    }

    #[test]
    fn cube_faces_wind_outwards() {
        let cube = cube_mesh();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);
        for triangle in cube.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| cube.position(i as usize));
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = &cube.vertices[triangle[0] as usize * VERTEX_STRIDE + 3..][..3];
            assert!(face_normal.distance(Vec3::from_slice(stored)) < 1e-6);
            let centre = (a + b + c) / 3.0;
            assert!(centre.dot(face_normal) > 0.0);
        }
    }

    #[test]
    fn missing_model_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetConfig {
            root: dir.path().to_path_buf(),
            ..AssetConfig::default()
        };
        let source = ModelSource::new("nope.obj");
        match read_model(&assets, &source) {
            Err(InitError::Model { path, .. }) => assert!(path.ends_with("nope.obj")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn model_read_from_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let assets = AssetConfig {
            root: dir.path().to_path_buf(),
            ..AssetConfig::default()
        };
        let mesh = read_model(&assets, &ModelSource::new("tri.obj")).unwrap();
        assert_eq!(mesh.indices.len(), 3);
    }
}
