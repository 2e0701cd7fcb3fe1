use std::num::NonZeroU64;

use log::debug;

use crate::placement::PlacedInstance;

use super::uniforms::{aligned_stride, InstanceUniform};

const INITIAL_CAPACITY: usize = 64;

/// One dynamic-offset uniform buffer holding every instance of the frame.
/// Instance `i` of the frame list lives at `i * stride`.
pub struct InstanceBuffer {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    staging: Vec<u8>,
}

impl InstanceBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("instance-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<InstanceUniform>() as u64),
                },
                count: None,
            }],
        });
        let stride = aligned_stride(
            std::mem::size_of::<InstanceUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (buffer, bind_group) = Self::allocate(device, &layout, stride, INITIAL_CAPACITY);
        Self {
            layout,
            buffer,
            bind_group,
            stride,
            capacity: INITIAL_CAPACITY,
            staging: Vec::new(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance-uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("instance-bind-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<InstanceUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn offset(&self, index: usize) -> u32 {
        (index as u64 * self.stride) as u32
    }

    /// Writes the uniforms of every instance, growing the buffer if needed.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[PlacedInstance]) {
        if instances.len() > self.capacity {
            let capacity = instances.len().next_power_of_two();
            debug!("growing instance buffer to {capacity}");
            let (buffer, bind_group) = Self::allocate(device, &self.layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        if instances.is_empty() {
            return;
        }
        self.staging.clear();
        self.staging.resize(self.stride as usize * instances.len(), 0);
        for (index, instance) in instances.iter().enumerate() {
            let start = index * self.stride as usize;
            let uniform = InstanceUniform::from(instance);
            let bytes = bytemuck::bytes_of(&uniform);
            self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }
}
