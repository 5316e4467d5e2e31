//! GPU mesh resources

use std::mem::{offset_of, size_of};

use ash::{vk, Device};

use super::buffer::Buffer;
use super::commands::CommandPool;
use super::{VulkanContext, VulkanError, VulkanResult};
use crate::assets::{MeshData, Vertex};

/// Immutable mesh in device-local vertex and index buffers
///
/// Shared between renderables through `Arc`; never written after upload.
pub struct Model {
    device: Device,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl Model {
    /// Upload `mesh` through staging buffers
    pub fn new(context: &VulkanContext, command_pool: &CommandPool, mesh: &MeshData) -> VulkanResult<Self> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot upload an empty mesh".to_string(),
            });
        }
        let index_count = u32::try_from(mesh.indices.len()).map_err(|_| VulkanError::InvalidOperation {
            reason: format!("{} indices exceed the u32 range", mesh.indices.len()),
        })?;

        let vertex_buffer = Buffer::new_device_local(
            context,
            command_pool,
            &mesh.vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer =
            Buffer::new_device_local(context, command_pool, &mesh.indices, vk::BufferUsageFlags::INDEX_BUFFER)?;

        Ok(Self {
            device: context.device().clone(),
            vertex_buffer,
            index_buffer,
            index_count,
        })
    }

    /// Bind vertex and index buffers
    pub fn bind(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer.handle()], &[0]);
            self.device
                .cmd_bind_index_buffer(command_buffer, self.index_buffer.handle(), 0, vk::IndexType::UINT32);
        }
    }

    /// Issue one indexed draw of the whole mesh
    pub fn draw(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_draw_indexed(command_buffer, self.index_count, 1, 0, 0, 0);
        }
    }

    /// Number of indices
    #[must_use]
    pub const fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_count", &self.index_count)
            .finish_non_exhaustive()
    }
}

/// Vertex buffer binding for [`Vertex`]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn vertex_bindings() -> Vec<vk::VertexInputBindingDescription> {
    vec![vk::VertexInputBindingDescription {
        binding: 0,
        stride: size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }]
}

/// Attribute locations 0..=3: position, color, normal, uv
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn vertex_attributes() -> Vec<vk::VertexInputAttributeDescription> {
    let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
        location,
        binding: 0,
        format,
        offset: offset as u32,
    };
    vec![
        attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
        attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
        attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
        attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
    ]
}
