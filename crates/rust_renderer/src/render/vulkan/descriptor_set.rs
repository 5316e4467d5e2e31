//! Descriptor set layouts, pools and writes

use ash::{vk, Device};

use super::VulkanResult;
use crate::render::frame_descriptors::ResettablePool;

/// Builder for [`DescriptorSetLayout`]
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-descriptor binding
    ///
    /// # Panics
    /// Panics when `binding` is already in use.
    #[must_use]
    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        assert!(
            self.bindings.iter().all(|b| b.binding != binding),
            "Binding {binding} already in use"
        );
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Create the layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None)? };

        Ok(DescriptorSetLayout {
            device: device.clone(),
            layout,
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout and the bindings it was built from
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayout {
    /// Raw handle
    #[must_use]
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Descriptor type of `binding`
    ///
    /// # Panics
    /// Panics when the layout has no such binding.
    #[must_use]
    pub fn descriptor_type(&self, binding: u32) -> vk::DescriptorType {
        self.bindings
            .iter()
            .find(|b| b.binding == binding)
            .map(|b| b.descriptor_type)
            .unwrap_or_else(|| panic!("Layout does not contain binding {binding}"))
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Builder for [`DescriptorPool`]
#[derive(Default)]
pub struct DescriptorPoolBuilder {
    pool_sizes: Vec<vk::DescriptorPoolSize>,
    max_sets: u32,
    flags: vk::DescriptorPoolCreateFlags,
}

impl DescriptorPoolBuilder {
    /// Empty builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_sets: 1000,
            ..Self::default()
        }
    }

    /// Reserve `count` descriptors of `descriptor_type`
    #[must_use]
    pub fn add_pool_size(mut self, descriptor_type: vk::DescriptorType, count: u32) -> Self {
        self.pool_sizes.push(vk::DescriptorPoolSize {
            ty: descriptor_type,
            descriptor_count: count,
        });
        self
    }

    /// Upper bound on live sets
    #[must_use]
    pub const fn max_sets(mut self, max_sets: u32) -> Self {
        self.max_sets = max_sets;
        self
    }

    /// Creation flags
    #[must_use]
    pub const fn flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Create the pool
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorPool> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(self.flags)
            .max_sets(self.max_sets)
            .pool_sizes(&self.pool_sizes);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None)? };

        Ok(DescriptorPool {
            device: device.clone(),
            pool,
        })
    }
}

/// Descriptor pool with bulk reset
pub struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Allocate one set per layout
    pub fn allocate(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);
        Ok(unsafe { self.device.allocate_descriptor_sets(&alloc_info)? })
    }

    /// Allocate a single set
    pub fn allocate_one(&self, layout: &DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        let sets = self.allocate(&[layout.handle()])?;
        Ok(sets[0])
    }

    /// Raw handle
    #[must_use]
    pub const fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl ResettablePool for DescriptorPool {
    fn reset(&mut self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_descriptor_pool(self.pool, vk::DescriptorPoolResetFlags::empty())?;
        }
        Ok(())
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

/// Collects buffer and image writes for one set against a layout
///
/// Infos are stored by value and only turned into `VkWriteDescriptorSet`
/// when the writes are applied, so no pointer outlives its source.
pub struct DescriptorWriter<'a> {
    layout: &'a DescriptorSetLayout,
    writes: Vec<(u32, PendingInfo)>,
}

impl<'a> DescriptorWriter<'a> {
    /// Writer for sets of `layout`
    #[must_use]
    pub const fn new(layout: &'a DescriptorSetLayout) -> Self {
        Self {
            layout,
            writes: Vec::new(),
        }
    }

    /// Bind a buffer region to `binding`
    #[must_use]
    pub fn write_buffer(mut self, binding: u32, info: vk::DescriptorBufferInfo) -> Self {
        self.writes.push((binding, PendingInfo::Buffer(info)));
        self
    }

    /// Bind an image and sampler to `binding`
    #[must_use]
    pub fn write_image(mut self, binding: u32, info: vk::DescriptorImageInfo) -> Self {
        self.writes.push((binding, PendingInfo::Image(info)));
        self
    }

    /// Allocate a set from `pool` and apply the writes to it
    pub fn build(self, pool: &DescriptorPool) -> VulkanResult<vk::DescriptorSet> {
        let set = pool.allocate_one(self.layout)?;
        self.overwrite(&pool.device, set);
        Ok(set)
    }

    /// Apply the writes to an existing set
    pub fn overwrite(&self, device: &Device, set: vk::DescriptorSet) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|(binding, info)| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(*binding)
                    .dst_array_element(0)
                    .descriptor_type(self.layout.descriptor_type(*binding));
                match info {
                    PendingInfo::Buffer(buffer) => builder.buffer_info(std::slice::from_ref(buffer)).build(),
                    PendingInfo::Image(image) => builder.image_info(std::slice::from_ref(image)).build(),
                }
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}
