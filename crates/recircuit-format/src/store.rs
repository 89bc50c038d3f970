//! Flat array store: one contiguous array per record kind.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use recircuit_layout::{PackedRecord, RecordLayout};

use crate::error::StoreError;
use crate::kind::RecordKind;
use crate::records::{
    Cluster, ClusterExtra1, ClusterExtra2, ClusterExtra3, ClusterKeyframe, EntryEdgeFront,
    EntryEdgeReverse, EntryNode, EntryNodeExtra1, EntryNodeExtra2, EntryNodeKeyframe,
    ExitEdgeFront, ExitEdgeReverse, ExitNode, ExitNodeExtra1, ExitNodeExtra2, ExitNodeKeyframe,
};

/// Largest record count a table may hold; every index is a u32.
pub const MAX_RECORDS: usize = u32::MAX as usize;

/// An owned block of exactly `len` records of one kind.
///
/// Slots start out unset. [`FlatArray::get`] refuses to read a slot that has
/// not been written since the last [`FlatArray::allocate`].
#[derive(Debug, Clone)]
pub struct FlatArray<T: PackedRecord> {
    kind: RecordKind,
    slots: Box<[T]>,
    populated: Box<[bool]>,
    filled: usize,
    generation: u64,
}

impl<T: PackedRecord> FlatArray<T> {
    /// An empty, never allocated table.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            slots: Box::default(),
            populated: Box::default(),
            filled: 0,
            generation: 0,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of allocations made so far. Indices taken under an older
    /// generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the table with a fresh block of `count` unset slots.
    ///
    /// The previous block is released once the new one is in place.
    pub fn allocate(&mut self, count: usize) -> Result<(), StoreError> {
        if count > MAX_RECORDS {
            return Err(StoreError::CapacityExceeded {
                kind: self.kind,
                requested: count,
                max: MAX_RECORDS,
            });
        }
        let kind = self.kind;
        let failed = |_| StoreError::AllocationFailed { kind, count };

        let mut slots = Vec::new();
        slots.try_reserve_exact(count).map_err(failed)?;
        slots.resize(count, <T as bytemuck::Zeroable>::zeroed());
        let mut populated = Vec::new();
        populated.try_reserve_exact(count).map_err(failed)?;
        populated.resize(count, false);

        self.slots = slots.into_boxed_slice();
        self.populated = populated.into_boxed_slice();
        self.filled = 0;
        self.generation += 1;
        trace!(
            kind = %self.kind,
            count,
            bytes = count * T::SIZE_BYTES,
            generation = self.generation,
            "allocated table"
        );
        Ok(())
    }

    /// Write slot `index`.
    pub fn set(&mut self, index: usize, record: T) -> Result<(), StoreError> {
        let len = self.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfBounds {
                kind: self.kind,
                index,
                len,
            })?;
        *slot = record;
        if !self.populated[index] {
            self.populated[index] = true;
            self.filled += 1;
        }
        Ok(())
    }

    /// Read slot `index`, which must have been written.
    pub fn get(&self, index: usize) -> Result<T, StoreError> {
        let record = self
            .slots
            .get(index)
            .copied()
            .ok_or(StoreError::IndexOutOfBounds {
                kind: self.kind,
                index,
                len: self.len(),
            })?;
        if !self.populated[index] {
            return Err(StoreError::SlotUnset {
                kind: self.kind,
                index,
            });
        }
        Ok(record)
    }

    /// The records in `range`, all of which must have been written.
    pub fn get_range(&self, range: Range<usize>) -> Result<&[T], StoreError> {
        if range.start > range.end || range.end > self.len() {
            return Err(StoreError::IndexOutOfBounds {
                kind: self.kind,
                index: range.end.max(range.start),
                len: self.len(),
            });
        }
        if let Some(offset) = self.populated[range.clone()].iter().position(|set| !set) {
            return Err(StoreError::SlotUnset {
                kind: self.kind,
                index: range.start + offset,
            });
        }
        Ok(&self.slots[range])
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.populated.get(index).copied().unwrap_or(false)
    }

    pub fn populated_count(&self) -> usize {
        self.filled
    }

    pub fn is_fully_populated(&self) -> bool {
        self.filled == self.len()
    }

    /// Fails unless every slot has been written.
    pub fn ensure_populated(&self) -> Result<(), StoreError> {
        if self.is_fully_populated() {
            Ok(())
        } else {
            Err(StoreError::NotFullyPopulated {
                kind: self.kind,
                populated: self.filled,
                len: self.len(),
            })
        }
    }

    /// All records. Unset slots read as zeroed records, so only hand this
    /// out once [`FlatArray::is_fully_populated`] holds.
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// The table as one contiguous byte buffer, `len * SIZE_BYTES` long.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.slots)
    }
}

/// A record type with a table in [`CircuitStore`].
pub trait StoredRecord: PackedRecord {
    const RECORD_KIND: RecordKind;

    fn table(store: &CircuitStore) -> &FlatArray<Self>;

    fn table_mut(store: &mut CircuitStore) -> &mut FlatArray<Self>;
}

/// The type descriptor and element count of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub kind: RecordKind,
    pub array_name: String,
    pub layout: RecordLayout,
    pub len: usize,
}

impl TableDescriptor {
    pub fn byte_len(&self) -> usize {
        self.len * self.layout.size_bytes
    }
}

/// Descriptors of every table, in [`RecordKind::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub tables: Vec<TableDescriptor>,
}

impl Manifest {
    pub fn table(&self, kind: RecordKind) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.kind == kind)
    }

    pub fn total_bytes(&self) -> usize {
        self.tables.iter().map(TableDescriptor::byte_len).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

macro_rules! circuit_tables {
    ($($field:ident, $field_mut:ident: $ty:ident => $kind:ident;)+) => {
        /// One flat array per record kind.
        #[derive(Debug, Clone)]
        pub struct CircuitStore {
            $($field: FlatArray<$ty>,)+
        }

        impl CircuitStore {
            pub fn new() -> Self {
                Self {
                    $($field: FlatArray::new(RecordKind::$kind),)+
                }
            }

            /// Replace the table of `kind` with `count` unset slots.
            pub fn allocate(&mut self, kind: RecordKind, count: usize) -> Result<(), StoreError> {
                match kind {
                    $(RecordKind::$kind => self.$field.allocate(count),)+
                }
            }

            pub fn len(&self, kind: RecordKind) -> usize {
                match kind {
                    $(RecordKind::$kind => self.$field.len(),)+
                }
            }

            pub fn generation(&self, kind: RecordKind) -> u64 {
                match kind {
                    $(RecordKind::$kind => self.$field.generation(),)+
                }
            }

            pub fn populated_count(&self, kind: RecordKind) -> usize {
                match kind {
                    $(RecordKind::$kind => self.$field.populated_count(),)+
                }
            }

            /// Raw bytes of the table of `kind`.
            pub fn table_bytes(&self, kind: RecordKind) -> &[u8] {
                match kind {
                    $(RecordKind::$kind => self.$field.as_bytes(),)+
                }
            }

            $(
                pub fn $field(&self) -> &FlatArray<$ty> {
                    &self.$field
                }

                pub fn $field_mut(&mut self) -> &mut FlatArray<$ty> {
                    &mut self.$field
                }
            )+
        }

        $(
            impl StoredRecord for $ty {
                const RECORD_KIND: RecordKind = RecordKind::$kind;

                fn table(store: &CircuitStore) -> &FlatArray<Self> {
                    &store.$field
                }

                fn table_mut(store: &mut CircuitStore) -> &mut FlatArray<Self> {
                    &mut store.$field
                }
            }
        )+
    };
}

circuit_tables! {
    clusters, clusters_mut: Cluster => Cluster;
    cluster_extra1, cluster_extra1_mut: ClusterExtra1 => ClusterExtra1;
    cluster_extra2, cluster_extra2_mut: ClusterExtra2 => ClusterExtra2;
    cluster_extra3, cluster_extra3_mut: ClusterExtra3 => ClusterExtra3;
    cluster_keyframes, cluster_keyframes_mut: ClusterKeyframe => ClusterKeyframe;
    entry_nodes, entry_nodes_mut: EntryNode => EntryNode;
    entry_node_extra1, entry_node_extra1_mut: EntryNodeExtra1 => EntryNodeExtra1;
    entry_node_extra2, entry_node_extra2_mut: EntryNodeExtra2 => EntryNodeExtra2;
    entry_node_keyframes, entry_node_keyframes_mut: EntryNodeKeyframe => EntryNodeKeyframe;
    exit_nodes, exit_nodes_mut: ExitNode => ExitNode;
    exit_node_extra1, exit_node_extra1_mut: ExitNodeExtra1 => ExitNodeExtra1;
    exit_node_extra2, exit_node_extra2_mut: ExitNodeExtra2 => ExitNodeExtra2;
    exit_node_keyframes, exit_node_keyframes_mut: ExitNodeKeyframe => ExitNodeKeyframe;
    entry_edges_front, entry_edges_front_mut: EntryEdgeFront => EntryEdgeFront;
    entry_edges_reverse, entry_edges_reverse_mut: EntryEdgeReverse => EntryEdgeReverse;
    exit_edges_front, exit_edges_front_mut: ExitEdgeFront => ExitEdgeFront;
    exit_edges_reverse, exit_edges_reverse_mut: ExitEdgeReverse => ExitEdgeReverse;
}

impl CircuitStore {
    /// The table holding records of type `T`.
    pub fn table<T: StoredRecord>(&self) -> &FlatArray<T> {
        T::table(self)
    }

    pub fn table_mut<T: StoredRecord>(&mut self) -> &mut FlatArray<T> {
        T::table_mut(self)
    }

    /// Whether every slot of every table has been written.
    pub fn is_fully_populated(&self) -> bool {
        RecordKind::ALL
            .iter()
            .all(|&kind| self.populated_count(kind) == self.len(kind))
    }

    /// The type descriptor and length of every table.
    pub fn manifest(&self) -> recircuit_layout::Result<Manifest> {
        let tables = RecordKind::ALL
            .iter()
            .map(|&kind| {
                Ok(TableDescriptor {
                    kind,
                    array_name: kind.array_name().to_string(),
                    layout: kind.layout()?,
                    len: self.len(kind),
                })
            })
            .collect::<recircuit_layout::Result<Vec<_>>>()?;
        Ok(Manifest { tables })
    }
}

impl Default for CircuitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NodeInfo;

    fn entry_node(cluster_index: u32) -> EntryNode {
        EntryNode::new(NodeInfo::from_ranges([(0, 0); 4], cluster_index).unwrap()).unwrap()
    }

    #[test]
    fn reallocation_discards_the_previous_block() {
        let mut store = CircuitStore::new();
        store.allocate(RecordKind::EntryNode, 5).unwrap();
        for i in 0..5 {
            store.entry_nodes_mut().set(i, entry_node(i as u32)).unwrap();
        }
        let first_generation = store.generation(RecordKind::EntryNode);
        assert!(store.entry_nodes().is_fully_populated());

        store.allocate(RecordKind::EntryNode, 3).unwrap();
        let nodes = store.entry_nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes.populated_count(), 0);
        assert!(nodes.generation() > first_generation);
        for i in 0..3 {
            assert_eq!(
                nodes.get(i),
                Err(StoreError::SlotUnset {
                    kind: RecordKind::EntryNode,
                    index: i
                })
            );
        }
        assert!(matches!(nodes.get(4), Err(StoreError::IndexOutOfBounds { len: 3, .. })));
    }

    #[test]
    fn set_then_get() {
        let mut table = FlatArray::<Cluster>::new(RecordKind::Cluster);
        table.allocate(2).unwrap();
        let cluster = Cluster::new(1, 0, 0, 0).unwrap();
        table.set(1, cluster).unwrap();
        table.set(1, cluster).unwrap();
        assert_eq!(table.get(1).unwrap(), cluster);
        assert_eq!(table.populated_count(), 1);
        assert!(table.get_range(0..2).is_err());
        assert_eq!(table.get_range(1..2).unwrap(), &[cluster]);
        assert!(matches!(
            table.ensure_populated(),
            Err(StoreError::NotFullyPopulated { populated: 1, len: 2, .. })
        ));
        assert!(table.set(2, cluster).is_err());
    }

    #[test]
    fn bytes_are_contiguous_records() {
        let mut table = FlatArray::<ClusterExtra2>::new(RecordKind::ClusterExtra2);
        table.allocate(2).unwrap();
        table.set(0, ClusterExtra2::new(1, 2).unwrap()).unwrap();
        table.set(1, ClusterExtra2::new(3, 0x0102_0304).unwrap()).unwrap();
        assert_eq!(table.as_bytes(), &[1, 2, 0, 0, 0, 3, 4, 3, 2, 1]);
    }

    #[test]
    fn oversized_tables_are_rejected() {
        let mut table = FlatArray::<EntryEdgeFront>::new(RecordKind::EntryEdgeFront);
        if usize::BITS > 32 {
            assert!(matches!(
                table.allocate(MAX_RECORDS + 1),
                Err(StoreError::CapacityExceeded { .. })
            ));
        }
        assert_eq!(table.generation(), 0);
    }

    #[test]
    fn manifest_lists_every_table() {
        let mut store = CircuitStore::new();
        store.allocate(RecordKind::Cluster, 4).unwrap();
        store.allocate(RecordKind::ExitEdgeReverse, 2).unwrap();
        let manifest = store.manifest().unwrap();
        assert_eq!(manifest.tables.len(), RecordKind::ALL.len());
        let clusters = manifest.table(RecordKind::Cluster).unwrap();
        assert_eq!(clusters.array_name, "clusters");
        assert_eq!(clusters.len, 4);
        assert_eq!(manifest.total_bytes(), 4 * 12 + 2 * 4);

        let json = manifest.to_json().unwrap();
        let parsed: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn generic_table_access() {
        let mut store = CircuitStore::new();
        store.table_mut::<ExitNode>().allocate(1).unwrap();
        assert_eq!(store.table::<ExitNode>().kind(), RecordKind::ExitNode);
        assert_eq!(store.len(RecordKind::ExitNode), 1);
        assert!(!store.is_fully_populated());
    }
}
