//! Per-frame descriptor pool rotation
//!
//! Transient per-draw descriptor sets come from a pool owned by the frame
//! slot that records the draw. The slot's pool is reset wholesale when the
//! slot comes around again, which is safe because the orchestrator has
//! already waited for that slot's previous submission.

use super::vulkan::VulkanResult;

/// A pool whose allocations can all be released at once
pub trait ResettablePool {
    /// Invalidate everything the pool has handed out
    fn reset(&mut self) -> VulkanResult<()>;
}

/// One pool per in-flight frame
pub struct FrameDescriptorPools<P: ResettablePool> {
    pools: Vec<P>,
}

impl<P: ResettablePool> FrameDescriptorPools<P> {
    /// Take ownership of one pool per in-flight frame
    ///
    /// # Panics
    /// Panics when `pools` is empty.
    #[must_use]
    pub fn new(pools: Vec<P>) -> Self {
        assert!(!pools.is_empty(), "FrameDescriptorPools needs one pool per in-flight frame");
        Self { pools }
    }

    /// Reset frame `frame_index`'s pool and hand it out for this frame
    ///
    /// # Panics
    /// Panics when `frame_index` is out of range.
    pub fn begin_frame(&mut self, frame_index: usize) -> VulkanResult<&mut P> {
        let frames = self.pools.len();
        let pool = self
            .pools
            .get_mut(frame_index)
            .unwrap_or_else(|| panic!("Frame index {frame_index} out of range ({frames} frames)"));
        pool.reset()?;
        Ok(pool)
    }

    /// Pool of frame `frame_index` without resetting it
    ///
    /// # Panics
    /// Panics when `frame_index` is out of range.
    #[must_use]
    pub fn pool(&self, frame_index: usize) -> &P {
        let frames = self.pools.len();
        self.pools
            .get(frame_index)
            .unwrap_or_else(|| panic!("Frame index {frame_index} out of range ({frames} frames)"))
    }

    /// Number of frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Always false; construction requires at least one pool
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingPool {
        allocated: usize,
        resets: usize,
    }

    impl CountingPool {
        fn allocate(&mut self) -> usize {
            self.allocated += 1;
            self.allocated
        }
    }

    impl ResettablePool for CountingPool {
        fn reset(&mut self) -> VulkanResult<()> {
            self.allocated = 0;
            self.resets += 1;
            Ok(())
        }
    }

    #[test]
    fn test_begin_frame_resets_only_that_pool() {
        let mut pools = FrameDescriptorPools::new(vec![CountingPool::default(), CountingPool::default()]);

        let frame0 = pools.begin_frame(0).unwrap();
        frame0.allocate();
        frame0.allocate();
        pools.begin_frame(1).unwrap().allocate();

        assert_eq!(pools.pool(0).allocated, 2);
        assert_eq!(pools.pool(1).allocated, 1);

        pools.begin_frame(0).unwrap();
        assert_eq!(pools.pool(0).allocated, 0);
        assert_eq!(pools.pool(0).resets, 2);
        assert_eq!(pools.pool(1).allocated, 1);
        assert_eq!(pools.pool(1).resets, 1);
    }

    #[test]
    fn test_allocations_stay_bounded_across_frames() {
        let mut pools = FrameDescriptorPools::new((0..3).map(|_| CountingPool::default()).collect());
        for frame in 0..30 {
            let pool = pools.begin_frame(frame % 3).unwrap();
            for _ in 0..5 {
                pool.allocate();
            }
        }
        assert!((0..3).all(|i| pools.pool(i).allocated == 5));
    }

    #[test]
    #[should_panic(expected = "Frame index 3 out of range")]
    fn test_out_of_range_frame_panics() {
        let mut pools = FrameDescriptorPools::new(vec![CountingPool::default()]);
        let _ = pools.begin_frame(3);
    }

    #[test]
    #[should_panic(expected = "Frame index 2 out of range (2 frames)")]
    fn test_out_of_range_pool_lookup_panics() {
        let pools = FrameDescriptorPools::new(vec![CountingPool::default(), CountingPool::default()]);
        let _ = pools.pool(2);
    }
}
