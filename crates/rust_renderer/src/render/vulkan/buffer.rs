//! Device buffers
//!
//! [`Buffer`] is a plain buffer with its own memory allocation. [`HostBuffer`]
//! is a persistently mapped, host-visible buffer split into equally sized,
//! aligned instances; it backs the per-frame object mirror and the global UBO.

use std::ptr::NonNull;

use ash::{vk, Device};

use super::commands::CommandPool;
use super::{VulkanContext, VulkanError, VulkanResult};
use crate::foundation::math::utils::{aligned_size, lcm};
use crate::render::object_manager::MirrorBuffer;

/// Buffer with a dedicated memory allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer of `size` bytes in memory with `properties`
    pub fn new(
        context: &VulkanContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let device = context.device().clone();

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { device.create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type = match context.find_memory_type(requirements.memory_type_bits, properties) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(e.into());
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Create a device-local buffer filled with `data` through a staging copy
    pub fn new_device_local<T: bytemuck::Pod>(
        context: &VulkanContext,
        command_pool: &CommandPool,
        data: &[T],
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let size = bytes.len() as vk::DeviceSize;

        let staging = Self::new(
            context,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_bytes(bytes)?;

        let buffer = Self::new(
            context,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        staging.copy_to(context, command_pool, &buffer)?;
        Ok(buffer)
    }

    /// Map, copy `bytes` to the start of the buffer and unmap
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes into a {} byte buffer", bytes.len(), self.size),
            });
        }
        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())?
                .cast::<u8>();
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Copy the full contents into `dst` and wait for completion
    pub fn copy_to(&self, context: &VulkanContext, command_pool: &CommandPool, dst: &Self) -> VulkanResult<()> {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: self.size.min(dst.size),
        };
        command_pool.submit_single_time(context.graphics_queue(), |device, command_buffer| unsafe {
            device.cmd_copy_buffer(command_buffer, self.buffer, dst.buffer, &[region]);
        })
    }

    /// Raw handle
    #[must_use]
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    #[must_use]
    pub const fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("buffer", &self.buffer)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Stride that satisfies both flush and uniform-offset alignment
#[must_use]
pub fn object_alignment(limits: &vk::PhysicalDeviceLimits) -> vk::DeviceSize {
    lcm(limits.non_coherent_atom_size, limits.min_uniform_buffer_offset_alignment)
}

/// Persistently mapped host-visible buffer of `instance_count` aligned records
pub struct HostBuffer {
    buffer: Buffer,
    mapped: NonNull<u8>,
    instance_size: vk::DeviceSize,
    instance_count: usize,
    alignment_size: vk::DeviceSize,
}

impl HostBuffer {
    /// Allocate and map a buffer whose stride is `instance_size` rounded up
    /// to `min_alignment`
    pub fn new(
        context: &VulkanContext,
        instance_size: vk::DeviceSize,
        instance_count: usize,
        usage: vk::BufferUsageFlags,
        min_alignment: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        assert!(instance_count > 0, "HostBuffer needs at least one instance");
        let alignment_size = aligned_size(instance_size, min_alignment);
        let size = alignment_size * instance_count as vk::DeviceSize;

        let buffer = Buffer::new(context, size, usage, vk::MemoryPropertyFlags::HOST_VISIBLE)?;
        let raw = unsafe {
            buffer
                .device
                .map_memory(buffer.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())?
        };
        let mapped = NonNull::new(raw.cast::<u8>()).ok_or_else(|| VulkanError::InvalidOperation {
            reason: "vkMapMemory returned a null pointer".to_string(),
        })?;

        log::debug!(
            "Created host buffer: {instance_count} x {alignment_size} bytes (instance {instance_size})"
        );

        Ok(Self {
            buffer,
            mapped,
            instance_size,
            instance_count,
            alignment_size,
        })
    }

    /// Uniform buffer sized for exactly one `T`
    pub fn uniform<T: bytemuck::Pod>(context: &VulkanContext) -> VulkanResult<Self> {
        let alignment = object_alignment(context.physical_device().limits());
        Self::new(
            context,
            std::mem::size_of::<T>() as vk::DeviceSize,
            1,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            alignment,
        )
    }

    /// Copy a single value into instance 0 and flush it
    pub fn write_value<T: bytemuck::Pod>(&mut self, value: &T) -> VulkanResult<()> {
        self.write_to_index(bytemuck::bytes_of(value), 0);
        self.flush_range(0, 1)
    }

    /// Raw handle
    #[must_use]
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer.buffer
    }

    /// Unpadded record size
    #[must_use]
    pub const fn instance_size(&self) -> vk::DeviceSize {
        self.instance_size
    }

    /// Descriptor covering the whole buffer
    #[must_use]
    pub const fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer.buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}

impl MirrorBuffer for HostBuffer {
    fn instance_count(&self) -> usize {
        self.instance_count
    }

    fn alignment_size(&self) -> vk::DeviceSize {
        self.alignment_size
    }

    fn write_to_index(&mut self, bytes: &[u8], index: usize) {
        assert!(index < self.instance_count, "Instance {index} out of range");
        assert!(
            bytes.len() as vk::DeviceSize <= self.alignment_size,
            "Record of {} bytes exceeds the {} byte stride",
            bytes.len(),
            self.alignment_size
        );
        // The offset stays inside the mapped range checked above.
        #[allow(clippy::cast_possible_truncation)]
        let offset = index * self.alignment_size as usize;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped.as_ptr().add(offset), bytes.len());
        }
    }

    fn flush_range(&mut self, first_index: usize, count: usize) -> VulkanResult<()> {
        if count == 0 {
            return Ok(());
        }
        let range = vk::MappedMemoryRange::builder()
            .memory(self.buffer.memory)
            .offset(first_index as vk::DeviceSize * self.alignment_size)
            .size(count as vk::DeviceSize * self.alignment_size)
            .build();
        unsafe { self.buffer.device.flush_mapped_memory_ranges(&[range])? };
        Ok(())
    }

    fn descriptor_info_for_index(&self, index: usize) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer.buffer,
            offset: index as vk::DeviceSize * self.alignment_size,
            range: self.instance_size,
        }
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe {
            self.buffer.device.unmap_memory(self.buffer.memory);
        }
    }
}
