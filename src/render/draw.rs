use crate::pass_plan::PassKind;
use crate::placement::PlacedInstance;

use super::instances::InstanceBuffer;
use super::material::MaterialLibrary;
use super::mesh::MeshLibrary;

/// GPU resources an instance draw needs, shared by every pass of a frame.
pub struct DrawResources<'a> {
    pub meshes: &'a MeshLibrary,
    pub materials: &'a MaterialLibrary,
    pub instances: &'a InstanceBuffer,
}

/// Records one instance into `pass`. Shadow draws bind only the transform;
/// lit draws also bind the material. Returns `false` when the instance has
/// no mesh loaded and nothing was recorded.
pub fn draw_instance(
    pass: &mut wgpu::RenderPass<'_>,
    kind: PassKind,
    index: usize,
    instance: &PlacedInstance,
    resources: &DrawResources<'_>,
) -> bool {
    let Some(mesh) = resources.meshes.get(instance.drawable) else {
        return false;
    };
    pass.set_bind_group(
        1,
        resources.instances.bind_group(),
        &[resources.instances.offset(index)],
    );
    if kind == PassKind::Lit {
        pass.set_bind_group(3, resources.materials.get(instance.material.id), &[]);
    }
    pass.set_vertex_buffer(0, mesh.vertex.slice(..));
    pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
    true
}
