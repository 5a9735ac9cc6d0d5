//! Descriptor layouts, pools, writers and the per-frame descriptor manager
//!
//! Every frame slot owns a fixed-capacity pool that is reset when the slot
//! comes round again. Sets allocated from a pool carry the pool's generation;
//! a reset bumps the generation, so a stale set is detectable instead of
//! silently aliasing a freshly allocated one.
//!
//! All device calls go through [`DescriptorDevice`], implemented for
//! `ash::Device`.

use super::error::{RenderError, RenderResult};
use crate::config::DescriptorBudget;
use crate::render::vulkan::{VulkanError, VulkanResult};
use ash::vk;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBinding {
    /// Binding index in the shader
    pub binding: u32,
    /// Descriptor type
    pub descriptor_type: vk::DescriptorType,
    /// Array size
    pub count: u32,
    /// Stages that read the binding
    pub stages: vk::ShaderStageFlags,
}

/// Resource referenced by a descriptor write
#[derive(Debug, Clone, Copy)]
pub enum DescriptorResource {
    /// Buffer range
    Buffer(vk::DescriptorBufferInfo),
    /// Image view and sampler
    Image(vk::DescriptorImageInfo),
}

/// A single-element descriptor update
#[derive(Debug, Clone, Copy)]
pub struct DescriptorWrite {
    /// Destination set
    pub set: vk::DescriptorSet,
    /// Destination binding
    pub binding: u32,
    /// Type declared by the layout
    pub descriptor_type: vk::DescriptorType,
    /// Resource to bind
    pub resource: DescriptorResource,
}

/// Creation parameters for a descriptor pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolConfig {
    /// Maximum sets allocatable between resets
    pub max_sets: u32,
    /// Descriptor counts per type
    pub pool_sizes: Vec<(vk::DescriptorType, u32)>,
    /// Creation flags
    pub flags: vk::DescriptorPoolCreateFlags,
}

impl DescriptorPoolConfig {
    /// Pool for `max_sets` sets with no descriptors yet
    pub fn new(max_sets: u32) -> Self {
        Self {
            max_sets,
            pool_sizes: Vec::new(),
            flags: vk::DescriptorPoolCreateFlags::empty(),
        }
    }

    /// Reserve `count` descriptors of `descriptor_type`
    pub fn with_pool_size(mut self, descriptor_type: vk::DescriptorType, count: u32) -> Self {
        self.pool_sizes.push((descriptor_type, count));
        self
    }

    /// Set pool creation flags
    pub fn with_flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Per-frame pool sized from the configured budget
    pub fn per_frame(budget: &DescriptorBudget) -> Self {
        Self::new(budget.max_sets)
            .with_pool_size(vk::DescriptorType::COMBINED_IMAGE_SAMPLER, budget.combined_image_samplers)
            .with_pool_size(vk::DescriptorType::UNIFORM_BUFFER, budget.uniform_buffers)
            .with_flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
    }
}

/// Device operations the descriptor code needs
pub trait DescriptorDevice {
    /// Create a set layout from bindings
    fn create_set_layout(&self, bindings: &[LayoutBinding]) -> VulkanResult<vk::DescriptorSetLayout>;
    /// Destroy a set layout
    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout);
    /// Create a pool
    fn create_pool(&self, config: &DescriptorPoolConfig) -> VulkanResult<vk::DescriptorPool>;
    /// Destroy a pool and every set allocated from it
    fn destroy_pool(&self, pool: vk::DescriptorPool);
    /// Allocate one set; the raw result lets callers tell exhaustion from other failures
    fn allocate_set(&self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet, vk::Result>;
    /// Return sets to a pool created with `FREE_DESCRIPTOR_SET`
    fn free_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VulkanResult<()>;
    /// Return every set to the pool
    fn reset_pool(&self, pool: vk::DescriptorPool) -> VulkanResult<()>;
    /// Apply descriptor writes
    fn update_sets(&self, writes: &[DescriptorWrite]);
}

impl DescriptorDevice for ash::Device {
    fn create_set_layout(&self, bindings: &[LayoutBinding]) -> VulkanResult<vk::DescriptorSetLayout> {
        let raw: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.count)
                    .stage_flags(b.stages)
                    .build()
            })
            .collect();
        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&raw);
        unsafe { self.create_descriptor_set_layout(&create_info, None).map_err(VulkanError::Api) }
    }

    fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_pool(&self, config: &DescriptorPoolConfig) -> VulkanResult<vk::DescriptorPool> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = config
            .pool_sizes
            .iter()
            .map(|&(ty, descriptor_count)| vk::DescriptorPoolSize { ty, descriptor_count })
            .collect();
        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(config.max_sets)
            .flags(config.flags);
        unsafe { self.create_descriptor_pool(&create_info, None).map_err(VulkanError::Api) }
    }

    fn destroy_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_set(&self, pool: vk::DescriptorPool, layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet, vk::Result> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        unsafe { self.allocate_descriptor_sets(&alloc_info).map(|sets| sets[0]) }
    }

    fn free_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VulkanResult<()> {
        unsafe { self.free_descriptor_sets(pool, sets).map_err(VulkanError::Api) }
    }

    fn reset_pool(&self, pool: vk::DescriptorPool) -> VulkanResult<()> {
        unsafe {
            self.reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    fn update_sets(&self, writes: &[DescriptorWrite]) {
        let raw: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .map(|w| {
                let builder = vk::WriteDescriptorSet::builder()
                    .dst_set(w.set)
                    .dst_binding(w.binding)
                    .descriptor_type(w.descriptor_type);
                match &w.resource {
                    DescriptorResource::Buffer(info) => builder.buffer_info(std::slice::from_ref(info)).build(),
                    DescriptorResource::Image(info) => builder.image_info(std::slice::from_ref(info)).build(),
                }
            })
            .collect();
        unsafe { self.update_descriptor_sets(&raw, &[]) }
    }
}

/// Descriptor set layout builder
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: BTreeMap<u32, LayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; each index may be registered once
    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
        count: u32,
    ) -> Self {
        debug_assert!(!self.bindings.contains_key(&binding), "Binding {binding} already in use");
        self.bindings.insert(
            binding,
            LayoutBinding {
                binding,
                descriptor_type,
                count,
                stages,
            },
        );
        self
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.add_binding(binding, vk::DescriptorType::UNIFORM_BUFFER, stages, 1)
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stages: vk::ShaderStageFlags) -> Self {
        self.add_binding(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stages, 1)
    }

    /// Build the descriptor set layout
    pub fn build(self, device: Arc<dyn DescriptorDevice>) -> VulkanResult<DescriptorSetLayout> {
        let bindings: Vec<LayoutBinding> = self.bindings.values().copied().collect();
        let layout = device.create_set_layout(&bindings)?;
        log::debug!("Created descriptor set layout with {} binding(s)", bindings.len());
        Ok(DescriptorSetLayout {
            device,
            layout,
            bindings: self.bindings,
        })
    }
}

/// Descriptor set layout wrapper
pub struct DescriptorSetLayout {
    device: Arc<dyn DescriptorDevice>,
    layout: vk::DescriptorSetLayout,
    bindings: BTreeMap<u32, LayoutBinding>,
}

impl DescriptorSetLayout {
    /// Start building a layout
    pub fn builder() -> DescriptorSetLayoutBuilder {
        DescriptorSetLayoutBuilder::new()
    }

    /// Get layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Declared binding at `index`
    pub fn binding(&self, index: u32) -> Option<&LayoutBinding> {
        self.bindings.get(&index)
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        self.device.destroy_set_layout(self.layout);
    }
}

/// A descriptor set tagged with the pool generation it was allocated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedSet {
    raw: vk::DescriptorSet,
    pool: vk::DescriptorPool,
    generation: u64,
}

impl AllocatedSet {
    /// Raw handle for binding
    pub fn raw(&self) -> vk::DescriptorSet {
        self.raw
    }
}

/// Fixed-capacity descriptor pool
pub struct DescriptorPool {
    device: Arc<dyn DescriptorDevice>,
    pool: vk::DescriptorPool,
    config: DescriptorPoolConfig,
    slot: Option<usize>,
    allocated: u32,
    generation: u64,
}

impl DescriptorPool {
    /// Create a pool; `slot` names the frame slot it serves, `None` for long-lived pools
    pub fn new(device: Arc<dyn DescriptorDevice>, config: DescriptorPoolConfig, slot: Option<usize>) -> VulkanResult<Self> {
        let pool = device.create_pool(&config)?;
        log::debug!("Created descriptor pool (slot {:?}, {} sets)", slot, config.max_sets);
        Ok(Self {
            device,
            pool,
            config,
            slot,
            allocated: 0,
            generation: 0,
        })
    }

    /// Allocate one set with the given layout
    pub fn allocate(&mut self, layout: &DescriptorSetLayout) -> RenderResult<AllocatedSet> {
        match self.device.allocate_set(self.pool, layout.handle()) {
            Ok(raw) => {
                self.allocated += 1;
                Ok(AllocatedSet {
                    raw,
                    pool: self.pool,
                    generation: self.generation,
                })
            }
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL) => {
                log::error!(
                    "Descriptor pool (slot {:?}) exhausted after {} of {} sets",
                    self.slot,
                    self.allocated,
                    self.config.max_sets
                );
                Err(RenderError::DescriptorPoolExhausted {
                    slot: self.slot,
                    capacity: self.config.max_sets,
                })
            }
            Err(e) => Err(VulkanError::Api(e).into()),
        }
    }

    /// Return individual sets; the pool must have been created with `FREE_DESCRIPTOR_SET`
    pub fn free(&mut self, sets: &[AllocatedSet]) -> VulkanResult<()> {
        debug_assert!(
            self.config.flags.contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET),
            "pool was not created with FREE_DESCRIPTOR_SET"
        );
        let raw: Vec<vk::DescriptorSet> = sets.iter().filter(|s| self.is_current(s)).map(AllocatedSet::raw).collect();
        if raw.is_empty() {
            return Ok(());
        }
        self.device.free_sets(self.pool, &raw)?;
        self.allocated -= raw.len() as u32;
        Ok(())
    }

    /// Invalidate every set allocated since the previous reset
    pub fn reset(&mut self) -> VulkanResult<()> {
        self.device.reset_pool(self.pool)?;
        self.allocated = 0;
        self.generation += 1;
        log::trace!("Reset descriptor pool (slot {:?}), generation {}", self.slot, self.generation);
        Ok(())
    }

    /// Whether `set` was allocated from this pool since its last reset
    pub fn is_current(&self, set: &AllocatedSet) -> bool {
        set.pool == self.pool && set.generation == self.generation
    }

    /// Sets allocated since the last reset
    pub fn allocated(&self) -> u32 {
        self.allocated
    }

    /// Maximum sets between resets
    pub fn capacity(&self) -> u32 {
        self.config.max_sets
    }

    /// Get pool handle
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        self.device.destroy_pool(self.pool);
    }
}

/// Collects writes for one set and checks them against its layout
pub struct DescriptorWriter<'a> {
    layout: &'a DescriptorSetLayout,
    writes: Vec<(u32, vk::DescriptorType, DescriptorResource)>,
    error: Option<RenderError>,
}

impl<'a> DescriptorWriter<'a> {
    /// Start a writer for sets with `layout`
    pub fn new(layout: &'a DescriptorSetLayout) -> Self {
        Self {
            layout,
            writes: Vec::new(),
            error: None,
        }
    }

    /// Bind a buffer range; the binding must be declared as a buffer type
    pub fn write_buffer(self, binding: u32, info: vk::DescriptorBufferInfo) -> Self {
        self.push(binding, vk::DescriptorType::UNIFORM_BUFFER, is_buffer_type, DescriptorResource::Buffer(info))
    }

    /// Bind an image and sampler; the binding must be declared as an image type
    pub fn write_image(self, binding: u32, info: vk::DescriptorImageInfo) -> Self {
        self.push(
            binding,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            is_image_type,
            DescriptorResource::Image(info),
        )
    }

    fn push(
        mut self,
        binding: u32,
        written_as: vk::DescriptorType,
        accepts: fn(vk::DescriptorType) -> bool,
        resource: DescriptorResource,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        let Some(declared) = self.layout.binding(binding) else {
            debug_assert!(false, "Layout does not contain binding {binding}");
            self.error = Some(RenderError::Vulkan(VulkanError::InvalidOperation {
                reason: format!("layout does not contain binding {binding}"),
            }));
            return self;
        };
        debug_assert_eq!(declared.count, 1, "Binding {binding} expects multiple descriptors");

        if accepts(declared.descriptor_type) {
            self.writes.push((binding, declared.descriptor_type, resource));
        } else {
            self.error = Some(RenderError::DescriptorTypeMismatch {
                binding,
                expected: declared.descriptor_type,
                actual: written_as,
            });
        }
        self
    }

    /// Allocate a set from `pool` and apply the writes to it
    pub fn build(self, pool: &mut DescriptorPool) -> RenderResult<AllocatedSet> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let set = pool.allocate(self.layout)?;
        self.apply(set.raw());
        Ok(set)
    }

    /// Apply the writes to an existing set
    pub fn overwrite(self, set: &AllocatedSet) -> RenderResult<()> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.apply(set.raw());
        Ok(())
    }

    fn apply(&self, set: vk::DescriptorSet) {
        let writes: Vec<DescriptorWrite> = self
            .writes
            .iter()
            .map(|&(binding, descriptor_type, resource)| DescriptorWrite {
                set,
                binding,
                descriptor_type,
                resource,
            })
            .collect();
        self.layout.device.update_sets(&writes);
    }
}

fn is_buffer_type(ty: vk::DescriptorType) -> bool {
    matches!(
        ty,
        vk::DescriptorType::UNIFORM_BUFFER
            | vk::DescriptorType::STORAGE_BUFFER
            | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
    )
}

fn is_image_type(ty: vk::DescriptorType) -> bool {
    matches!(
        ty,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER | vk::DescriptorType::SAMPLED_IMAGE | vk::DescriptorType::STORAGE_IMAGE
    )
}

/// Long-lived global pool plus one resettable pool per frame slot
pub struct DescriptorResourceManager {
    global_pool: DescriptorPool,
    frame_pools: Vec<DescriptorPool>,
}

impl DescriptorResourceManager {
    /// Create the global pool (`global_sets` uniform-buffer sets) and one budgeted pool per slot
    pub fn new(
        device: Arc<dyn DescriptorDevice>,
        frames_in_flight: usize,
        global_sets: u32,
        budget: &DescriptorBudget,
    ) -> VulkanResult<Self> {
        let global_config =
            DescriptorPoolConfig::new(global_sets).with_pool_size(vk::DescriptorType::UNIFORM_BUFFER, global_sets);
        let global_pool = DescriptorPool::new(Arc::clone(&device), global_config, None)?;

        let frame_config = DescriptorPoolConfig::per_frame(budget);
        let frame_pools = (0..frames_in_flight)
            .map(|slot| DescriptorPool::new(Arc::clone(&device), frame_config.clone(), Some(slot)))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::info!(
            "Descriptor manager: {} frame pool(s) of {} sets, global pool of {} sets",
            frame_pools.len(),
            budget.max_sets,
            global_sets
        );

        Ok(Self { global_pool, frame_pools })
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.frame_pools.len()
    }

    /// Reset a slot's pool; sets previously allocated from it must no longer be used
    pub fn reset(&mut self, slot: usize) -> VulkanResult<()> {
        self.frame_pools[slot].reset()
    }

    /// Allocate a set from a slot's pool
    pub fn allocate(&mut self, slot: usize, layout: &DescriptorSetLayout) -> RenderResult<AllocatedSet> {
        self.frame_pools[slot].allocate(layout)
    }

    /// The slot's pool, for use with [`DescriptorWriter::build`]
    pub fn frame_pool(&mut self, slot: usize) -> &mut DescriptorPool {
        &mut self.frame_pools[slot]
    }

    /// The long-lived pool
    pub fn global_pool(&mut self) -> &mut DescriptorPool {
        &mut self.global_pool
    }

    /// Whether `set` came from the slot's pool since its last reset
    pub fn is_live(&self, slot: usize, set: &AllocatedSet) -> bool {
        self.frame_pools[slot].is_current(set)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory descriptor device that behaves like a driver: capacity is
    //! enforced, handles are recycled after reset, and writes are recorded.

    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct PoolState {
        max_sets: u32,
        live: Vec<u64>,
        recycled: Vec<u64>,
    }

    #[derive(Default)]
    pub(crate) struct FakeDescriptorDevice {
        next_handle: RefCell<u64>,
        pools: RefCell<HashMap<u64, PoolState>>,
        layouts: RefCell<Vec<u64>>,
        writes: RefCell<HashMap<u64, Vec<(u32, vk::DescriptorType, DescriptorResource)>>>,
    }

    impl FakeDescriptorDevice {
        fn handle(&self) -> u64 {
            let mut next = self.next_handle.borrow_mut();
            *next += 1;
            *next
        }

        pub(crate) fn writes_for(&self, set: vk::DescriptorSet) -> Vec<(u32, vk::DescriptorType, DescriptorResource)> {
            self.writes.borrow().get(&set.as_raw()).cloned().unwrap_or_default()
        }

        pub(crate) fn live_layouts(&self) -> usize {
            self.layouts.borrow().len()
        }

        pub(crate) fn live_pools(&self) -> usize {
            self.pools.borrow().len()
        }
    }

    impl DescriptorDevice for FakeDescriptorDevice {
        fn create_set_layout(&self, _bindings: &[LayoutBinding]) -> VulkanResult<vk::DescriptorSetLayout> {
            let raw = self.handle();
            self.layouts.borrow_mut().push(raw);
            Ok(vk::DescriptorSetLayout::from_raw(raw))
        }

        fn destroy_set_layout(&self, layout: vk::DescriptorSetLayout) {
            self.layouts.borrow_mut().retain(|&l| l != layout.as_raw());
        }

        fn create_pool(&self, config: &DescriptorPoolConfig) -> VulkanResult<vk::DescriptorPool> {
            let raw = self.handle();
            self.pools.borrow_mut().insert(
                raw,
                PoolState {
                    max_sets: config.max_sets,
                    ..Default::default()
                },
            );
            Ok(vk::DescriptorPool::from_raw(raw))
        }

        fn destroy_pool(&self, pool: vk::DescriptorPool) {
            self.pools.borrow_mut().remove(&pool.as_raw());
        }

        fn allocate_set(&self, pool: vk::DescriptorPool, _layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet, vk::Result> {
            let fresh = self.handle();
            let mut pools = self.pools.borrow_mut();
            let state = pools.get_mut(&pool.as_raw()).ok_or(vk::Result::ERROR_UNKNOWN)?;
            if state.live.len() as u32 >= state.max_sets {
                return Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY);
            }
            let raw = state.recycled.pop().unwrap_or(fresh);
            state.live.push(raw);
            Ok(vk::DescriptorSet::from_raw(raw))
        }

        fn free_sets(&self, pool: vk::DescriptorPool, sets: &[vk::DescriptorSet]) -> VulkanResult<()> {
            let mut pools = self.pools.borrow_mut();
            let state = pools.get_mut(&pool.as_raw()).ok_or(VulkanError::Api(vk::Result::ERROR_UNKNOWN))?;
            for set in sets {
                state.live.retain(|&s| s != set.as_raw());
                state.recycled.push(set.as_raw());
                self.writes.borrow_mut().remove(&set.as_raw());
            }
            Ok(())
        }

        fn reset_pool(&self, pool: vk::DescriptorPool) -> VulkanResult<()> {
            let mut pools = self.pools.borrow_mut();
            let state = pools.get_mut(&pool.as_raw()).ok_or(VulkanError::Api(vk::Result::ERROR_UNKNOWN))?;
            for raw in state.live.drain(..) {
                self.writes.borrow_mut().remove(&raw);
                state.recycled.push(raw);
            }
            Ok(())
        }

        fn update_sets(&self, writes: &[DescriptorWrite]) {
            let mut recorded = self.writes.borrow_mut();
            for w in writes {
                let entry = recorded.entry(w.set.as_raw()).or_default();
                entry.retain(|(binding, _, _)| *binding != w.binding);
                entry.push((w.binding, w.descriptor_type, w.resource));
            }
        }
    }
}
