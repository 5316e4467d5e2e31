//! Per-frame GPU mirror of entity transforms
//!
//! One [`MirrorBuffer`] per in-flight frame holds an [`ObjectRecord`] for
//! every entity id up to the manager's capacity. Records live at
//! `entity id * stride`, not at the transform's dense pool slot, so an
//! entity's offset never moves when other components come and go.
//!
//! The buffer for frame `F` is only written after the frame orchestrator has
//! waited on frame `F`'s fence, so the GPU is never reading it concurrently.

use ash::vk;
use bytemuck::{Pod, Zeroable};

use super::vulkan::VulkanResult;
use crate::ecs::components::TransformComponent;
use crate::ecs::{Entity, EntityManager};

/// Set 1, binding 0 of the textured pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectRecord {
    /// Model matrix, column-major
    pub model_matrix: [[f32; 4]; 4],
    /// Normal matrix padded to 4x4, column-major
    pub normal_matrix: [[f32; 4]; 4],
}

impl From<&TransformComponent> for ObjectRecord {
    fn from(transform: &TransformComponent) -> Self {
        Self {
            model_matrix: transform.mat4().into(),
            normal_matrix: transform.normal_matrix().into(),
        }
    }
}

/// Host-writable storage of equally strided records
///
/// Implemented by [`super::vulkan::HostBuffer`].
pub trait MirrorBuffer {
    /// Number of record slots
    fn instance_count(&self) -> usize;
    /// Distance in bytes between consecutive records
    fn alignment_size(&self) -> vk::DeviceSize;
    /// Copy `bytes` to the start of slot `index`
    fn write_to_index(&mut self, bytes: &[u8], index: usize);
    /// Make slots `first_index..first_index + count` visible to the device
    fn flush_range(&mut self, first_index: usize, count: usize) -> VulkanResult<()>;
    /// Descriptor for the record in slot `index`
    fn descriptor_info_for_index(&self, index: usize) -> vk::DescriptorBufferInfo;
}

/// Writes transforms into the frame's mirror buffer
pub struct ObjectManager<B: MirrorBuffer> {
    buffers: Vec<B>,
    max_entities: usize,
}

impl<B: MirrorBuffer> ObjectManager<B> {
    /// Take ownership of one buffer per in-flight frame
    ///
    /// # Panics
    /// Panics when `buffers` is empty or a buffer has fewer than
    /// `max_entities` slots.
    pub fn new(buffers: Vec<B>, max_entities: usize) -> Self {
        assert!(!buffers.is_empty(), "ObjectManager needs one buffer per in-flight frame");
        for (frame, buffer) in buffers.iter().enumerate() {
            assert!(
                buffer.instance_count() >= max_entities,
                "Frame {frame} buffer holds {} records, need {max_entities}",
                buffer.instance_count()
            );
        }
        Self { buffers, max_entities }
    }

    /// Write every transform into frame `frame_index`'s buffer and flush
    /// the written span
    ///
    /// Returns the number of records written.
    pub fn update_buffer(&mut self, frame_index: usize, entity_manager: &EntityManager) -> VulkanResult<usize> {
        let max_entities = self.max_entities;
        let buffer = self.buffer_mut(frame_index);

        let mut written: Option<(usize, usize)> = None;
        let mut count = 0;
        for &entity in entity_manager.entities::<TransformComponent>() {
            let index = entity.index();
            assert!(index < max_entities, "{entity} is beyond the mirror capacity {max_entities}");

            let record = ObjectRecord::from(entity_manager.get_component::<TransformComponent>(entity));
            buffer.write_to_index(bytemuck::bytes_of(&record), index);
            written = Some(written.map_or((index, index), |(lo, hi)| (lo.min(index), hi.max(index))));
            count += 1;
        }

        if let Some((first, last)) = written {
            buffer.flush_range(first, last - first + 1)?;
        }
        Ok(count)
    }

    /// Region of frame `frame_index`'s buffer holding `entity`'s record
    ///
    /// # Panics
    /// Panics when the frame index or entity is out of range.
    #[must_use]
    pub fn get_buffer_info_for_game_object(&self, frame_index: usize, entity: Entity) -> vk::DescriptorBufferInfo {
        assert!(
            entity.index() < self.max_entities,
            "{entity} is beyond the mirror capacity {}",
            self.max_entities
        );
        self.buffer(frame_index).descriptor_info_for_index(entity.index())
    }

    /// Buffer of frame `frame_index`
    ///
    /// # Panics
    /// Panics when `frame_index` is out of range.
    #[must_use]
    pub fn buffer(&self, frame_index: usize) -> &B {
        self.buffers
            .get(frame_index)
            .unwrap_or_else(|| panic!("Frame index {frame_index} out of range ({} frames)", self.buffers.len()))
    }

    /// Number of frame buffers
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.buffers.len()
    }

    fn buffer_mut(&mut self, frame_index: usize) -> &mut B {
        let frames = self.buffers.len();
        self.buffers
            .get_mut(frame_index)
            .unwrap_or_else(|| panic!("Frame index {frame_index} out of range ({frames} frames)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils::aligned_size;
    use crate::foundation::math::{Mat4, Vec3};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;
    const STRIDE: u64 = 256;

    struct CpuMirror {
        data: Vec<u8>,
        count: usize,
        flushes: Vec<(usize, usize)>,
    }

    impl CpuMirror {
        fn new(count: usize) -> Self {
            Self {
                data: vec![0; count * STRIDE as usize],
                count,
                flushes: Vec::new(),
            }
        }

        fn record(&self, index: usize) -> ObjectRecord {
            let start = index * STRIDE as usize;
            bytemuck::pod_read_unaligned(&self.data[start..start + std::mem::size_of::<ObjectRecord>()])
        }
    }

    impl MirrorBuffer for CpuMirror {
        fn instance_count(&self) -> usize {
            self.count
        }

        fn alignment_size(&self) -> vk::DeviceSize {
            STRIDE
        }

        fn write_to_index(&mut self, bytes: &[u8], index: usize) {
            let start = index * STRIDE as usize;
            self.data[start..start + bytes.len()].copy_from_slice(bytes);
        }

        fn flush_range(&mut self, first_index: usize, count: usize) -> VulkanResult<()> {
            self.flushes.push((first_index, count));
            Ok(())
        }

        fn descriptor_info_for_index(&self, index: usize) -> vk::DescriptorBufferInfo {
            vk::DescriptorBufferInfo {
                buffer: vk::Buffer::null(),
                offset: index as u64 * STRIDE,
                range: std::mem::size_of::<ObjectRecord>() as u64,
            }
        }
    }

    fn scene(max_entities: usize) -> EntityManager {
        let mut manager = EntityManager::new(max_entities);
        manager.register_component::<TransformComponent>(100);
        manager
    }

    fn objects(frames: usize, max_entities: usize) -> ObjectManager<CpuMirror> {
        ObjectManager::new((0..frames).map(|_| CpuMirror::new(max_entities)).collect(), max_entities)
    }

    #[test]
    fn test_record_stride_is_aligned() {
        assert_eq!(std::mem::size_of::<ObjectRecord>(), 128);
        assert_eq!(aligned_size(128, STRIDE), STRIDE);
    }

    #[test]
    fn test_written_matrices_match_composed_transform() {
        let mut manager = scene(16);
        let mut transforms = Vec::new();
        for i in 0..5u8 {
            let f = f32::from(i);
            let entity = manager.create_entity();
            let transform = TransformComponent::from_translation(Vec3::new(f, -f, 2.0 * f))
                .with_scale(Vec3::new(1.0 + f, 0.5, 2.0))
                .with_rotation(Vec3::new(0.1 * f, -0.4 * f, 0.25 * f));
            manager.insert_component(entity, transform.clone());
            transforms.push((entity, transform));
        }

        let mut objects = objects(2, 16);
        assert_eq!(objects.update_buffer(0, &manager).unwrap(), 5);

        for (entity, transform) in &transforms {
            let record = objects.buffer(0).record(entity.index());
            let r = transform.rotation;
            let expected = Mat4::new_translation(&transform.translation)
                * Mat4::new_rotation(Vec3::new(0.0, r.y, 0.0))
                * Mat4::new_rotation(Vec3::new(r.x, 0.0, 0.0))
                * Mat4::new_rotation(Vec3::new(0.0, 0.0, r.z))
                * Mat4::new_nonuniform_scaling(&transform.scale);
            let model = Mat4::from(record.model_matrix);
            assert_relative_eq!(model, expected, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_frames_are_independent() {
        let mut manager = scene(8);
        let entity = manager.create_entity();
        manager.insert_component(entity, TransformComponent::from_translation(Vec3::new(1.0, 0.0, 0.0)));

        let mut objects = objects(3, 8);
        objects.update_buffer(0, &manager).unwrap();

        manager.get_component_mut::<TransformComponent>(entity).translation = Vec3::new(7.0, 0.0, 0.0);
        objects.update_buffer(1, &manager).unwrap();

        let frame0 = objects.buffer(0).record(entity.index());
        let frame1 = objects.buffer(1).record(entity.index());
        let frame2 = objects.buffer(2).record(entity.index());
        assert_relative_eq!(frame0.model_matrix[3][0], 1.0, epsilon = EPSILON);
        assert_relative_eq!(frame1.model_matrix[3][0], 7.0, epsilon = EPSILON);
        assert_eq!(frame2, ObjectRecord::default());
    }

    #[test]
    fn test_records_are_indexed_by_entity_id() {
        let mut manager = scene(8);
        let entities: Vec<_> = (0..4).map(|_| manager.create_entity()).collect();
        manager.add_component::<TransformComponent>(entities[3]);
        manager.add_component::<TransformComponent>(entities[1]);

        let objects = objects(2, 8);
        let info = objects.get_buffer_info_for_game_object(1, entities[3]);
        assert_eq!(info.offset, 3 * STRIDE);
        assert_eq!(info.range, 128);
    }

    #[test]
    fn test_flush_covers_written_span_only() {
        let mut manager = scene(8);
        let entities: Vec<_> = (0..6).map(|_| manager.create_entity()).collect();
        manager.add_component::<TransformComponent>(entities[2]);
        manager.add_component::<TransformComponent>(entities[5]);

        let mut objects = objects(1, 8);
        objects.update_buffer(0, &manager).unwrap();
        assert_eq!(objects.buffer(0).flushes, vec![(2, 4)]);
    }

    #[test]
    fn test_no_transforms_writes_and_flushes_nothing() {
        let mut manager = scene(4);
        manager.create_entity();

        let mut objects = objects(2, 4);
        assert_eq!(objects.update_buffer(0, &manager).unwrap(), 0);
        assert!(objects.buffer(0).flushes.is_empty());
    }

    #[test]
    #[should_panic(expected = "Frame index 2 out of range")]
    fn test_frame_index_out_of_range_panics() {
        let manager = scene(4);
        let mut objects = objects(2, 4);
        let _ = objects.update_buffer(2, &manager);
    }

    #[test]
    #[should_panic(expected = "holds 2 records, need 4")]
    fn test_undersized_buffer_panics() {
        let _ = ObjectManager::new(vec![CpuMirror::new(2)], 4);
    }
}
