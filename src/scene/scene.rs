use slotmap::SlotMap;

use crate::renderer::entity_collector::EntityCollector;
use crate::scene::ListenerKey;
use crate::scene::partition::{Partition, PartitionId};

/// Called with the new partition's id whenever the scene's partition is
/// replaced.
pub type PartitionListener = Box<dyn FnMut(PartitionId)>;

/// Scene root. Owns the partition that holds the scene's entities.
pub struct Scene {
    partition: Partition,
    listeners: SlotMap<ListenerKey, PartitionListener>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("partition", &self.partition)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            partition: Partition::new(),
            listeners: SlotMap::with_key(),
        }
    }

    #[inline]
    #[must_use]
    pub fn partition_id(&self) -> PartitionId {
        self.partition.id()
    }

    #[must_use]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn partition_mut(&mut self) -> &mut Partition {
        &mut self.partition
    }

    /// Replaces the root partition, returning the old one, and notifies
    /// every partition listener.
    pub fn set_partition(&mut self, partition: Partition) -> Partition {
        let old = std::mem::replace(&mut self.partition, partition);
        let id = self.partition.id();
        log::debug!("Scene: partition replaced ({:?} -> {id:?})", old.id());
        for listener in self.listeners.values_mut() {
            listener(id);
        }
        old
    }

    /// Feeds every partition's visible entities to the collector.
    pub fn traverse_partitions(&self, collector: &mut EntityCollector) {
        self.partition.traverse(collector);
    }

    pub fn add_partition_listener(&mut self, listener: PartitionListener) -> ListenerKey {
        self.listeners.insert(listener)
    }

    /// Returns `false` when the key was already removed.
    pub fn remove_partition_listener(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key).is_some()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
