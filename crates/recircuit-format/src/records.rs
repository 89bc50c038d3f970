//! Record schemas of the recursive circuit format.
//!
//! Every type here is generated by [`packed_record!`], so its byte size is
//! checked at build time against the sum of its field widths. Relationships
//! between records are `(count, first_index)` pairs into sibling arrays.

use std::ops::Range;

use recircuit_layout::{packed_record, LayoutError, PackedRecord};

use crate::geometry::{Circle, Interpolate, Rectangle, Vector2};
use crate::kind::{EdgeTable, NodeKind};

/// `parent_cluster_index` of a root cluster.
pub const NO_PARENT: u32 = u32::MAX;

/// Half-open index range of a `(count, first_index)` pair.
pub fn csr_range(count: u32, first: u32) -> Range<usize> {
    let start = first as usize;
    start..start + count as usize
}

packed_record! {
    /// A circular territory.
    pub struct CircleInfo {
        center: Vector2 => natural,
        radius: f32 => natural,
    }
}

packed_record! {
    /// The time span a keyframe covers, `[start_time, end_time)`.
    pub struct IntervalInfo {
        start_time: f32 => natural,
        end_time: f32 => natural,
    }
}

packed_record! {
    /// Edge ranges and owning cluster shared by entry and exit nodes.
    pub struct NodeInfo {
        /// Outgoing edges to entry nodes.
        entry_edge_front_count: u16 => packed(16),
        first_entry_edge_front_index: u32 => packed(32),
        /// Incoming edges from entry nodes.
        entry_edge_reverse_count: u16 => packed(16),
        first_entry_edge_reverse_index: u32 => packed(32),
        /// Outgoing edges to exit nodes.
        exit_edge_front_count: u16 => packed(16),
        first_exit_edge_front_index: u32 => packed(32),
        /// Incoming edges from exit nodes.
        exit_edge_reverse_count: u16 => packed(16),
        first_exit_edge_reverse_index: u32 => packed(32),
        cluster_index: u32 => packed(32),
    }
}

packed_record! {
    /// A grouping of entry and exit nodes.
    pub struct Cluster {
        entry_node_count: u16 => packed(16),
        first_entry_node_index: u32 => packed(32),
        exit_node_count: u16 => packed(16),
        first_exit_node_index: u32 => packed(32),
    }
}

packed_record! {
    /// Hierarchy links of a cluster.
    pub struct ClusterExtra1 {
        parent_cluster_index: u32 => packed(32),
        children_cluster_count: u8 => packed(8),
        first_child_cluster_index: u32 => packed(32),
    }
}

packed_record! {
    /// Keyframe range of a cluster.
    pub struct ClusterExtra2 {
        cluster_keyframe_count: u8 => packed(8),
        first_cluster_keyframe_index: u32 => packed(32),
    }
}

packed_record! {
    /// Label of a cluster, as a byte range of the label blob.
    pub struct ClusterExtra3 {
        label_size: u8 => packed(8),
        label_offset: u32 => packed(32),
    }
}

packed_record! {
    pub struct ClusterKeyframe {
        start_territory: Rectangle => natural,
        end_territory: Rectangle => natural,
        interval: IntervalInfo => natural,
    }
}

packed_record! {
    pub struct EntryNode {
        node_info: NodeInfo => natural,
    }
}

packed_record! {
    pub struct EntryNodeExtra1 {
        entry_node_keyframe_count: u8 => packed(8),
        first_entry_node_keyframe_index: u32 => packed(32),
    }
}

packed_record! {
    pub struct EntryNodeExtra2 {
        label_size: u8 => packed(8),
        label_offset: u32 => packed(32),
    }
}

packed_record! {
    pub struct EntryNodeKeyframe {
        start_territory: CircleInfo => natural,
        end_territory: CircleInfo => natural,
        interval: IntervalInfo => natural,
    }
}

packed_record! {
    pub struct ExitNode {
        node_info: NodeInfo => natural,
    }
}

packed_record! {
    pub struct ExitNodeExtra1 {
        exit_node_keyframe_count: u8 => packed(8),
        first_exit_node_keyframe_index: u32 => packed(32),
    }
}

packed_record! {
    pub struct ExitNodeExtra2 {
        label_size: u8 => packed(8),
        label_offset: u32 => packed(32),
    }
}

packed_record! {
    pub struct ExitNodeKeyframe {
        start_territory: CircleInfo => natural,
        end_territory: CircleInfo => natural,
        interval: IntervalInfo => natural,
    }
}

packed_record! {
    pub struct EntryEdgeFront {
        entry_node_index: u32 => packed(32),
    }
}

packed_record! {
    pub struct EntryEdgeReverse {
        entry_node_index: u32 => packed(32),
    }
}

packed_record! {
    pub struct ExitEdgeFront {
        exit_node_index: u32 => packed(32),
    }
}

packed_record! {
    pub struct ExitEdgeReverse {
        exit_node_index: u32 => packed(32),
    }
}

impl From<CircleInfo> for Circle {
    fn from(info: CircleInfo) -> Self {
        Circle::new(info.center(), info.radius())
    }
}

impl TryFrom<Circle> for CircleInfo {
    type Error = LayoutError;

    fn try_from(circle: Circle) -> Result<Self, LayoutError> {
        CircleInfo::new(circle.center, circle.radius)
    }
}

impl IntervalInfo {
    /// Whether `t` lies in `[start_time, end_time)`.
    pub fn contains(&self, t: f32) -> bool {
        self.start_time() <= t && t < self.end_time()
    }

    /// Position of `t` inside the interval, 0 at the start and 1 at the end.
    pub fn fraction(&self, t: f32) -> f32 {
        let (start, end) = (self.start_time(), self.end_time());
        (t - start) / (end - start)
    }
}

impl NodeInfo {
    /// Build from one `(count, first_index)` pair per table, in
    /// [`EdgeTable::ALL`] order.
    pub fn from_ranges(ranges: [(u16, u32); 4], cluster_index: u32) -> Result<Self, LayoutError> {
        let [entry_front, entry_reverse, exit_front, exit_reverse] = ranges;
        NodeInfo::new(
            entry_front.0,
            entry_front.1,
            entry_reverse.0,
            entry_reverse.1,
            exit_front.0,
            exit_front.1,
            exit_reverse.0,
            exit_reverse.1,
            cluster_index,
        )
    }

    pub fn edge_count(&self, table: EdgeTable) -> u16 {
        match table {
            EdgeTable::EntryFront => self.entry_edge_front_count(),
            EdgeTable::EntryReverse => self.entry_edge_reverse_count(),
            EdgeTable::ExitFront => self.exit_edge_front_count(),
            EdgeTable::ExitReverse => self.exit_edge_reverse_count(),
        }
    }

    pub fn first_edge_index(&self, table: EdgeTable) -> u32 {
        match table {
            EdgeTable::EntryFront => self.first_entry_edge_front_index(),
            EdgeTable::EntryReverse => self.first_entry_edge_reverse_index(),
            EdgeTable::ExitFront => self.first_exit_edge_front_index(),
            EdgeTable::ExitReverse => self.first_exit_edge_reverse_index(),
        }
    }

    /// This node's slice of `table`.
    pub fn edge_range(&self, table: EdgeTable) -> Range<usize> {
        csr_range(self.edge_count(table).into(), self.first_edge_index(table))
    }
}

impl Cluster {
    pub fn node_count(&self, kind: NodeKind) -> u16 {
        match kind {
            NodeKind::Entry => self.entry_node_count(),
            NodeKind::Exit => self.exit_node_count(),
        }
    }

    pub fn first_node_index(&self, kind: NodeKind) -> u32 {
        match kind {
            NodeKind::Entry => self.first_entry_node_index(),
            NodeKind::Exit => self.first_exit_node_index(),
        }
    }

    /// The cluster's block of the entry or exit node array.
    pub fn node_range(&self, kind: NodeKind) -> Range<usize> {
        csr_range(self.node_count(kind).into(), self.first_node_index(kind))
    }
}

impl ClusterExtra1 {
    pub fn is_root(&self) -> bool {
        self.parent_cluster_index() == NO_PARENT
    }

    pub fn child_range(&self) -> Range<usize> {
        csr_range(
            self.children_cluster_count().into(),
            self.first_child_cluster_index(),
        )
    }
}

/// An entry or exit node record.
pub trait NodeRecord: PackedRecord {
    const NODE_KIND: NodeKind;

    fn from_info(info: NodeInfo) -> Result<Self, LayoutError>;

    fn info(&self) -> NodeInfo;
}

impl NodeRecord for EntryNode {
    const NODE_KIND: NodeKind = NodeKind::Entry;

    fn from_info(info: NodeInfo) -> Result<Self, LayoutError> {
        EntryNode::new(info)
    }

    fn info(&self) -> NodeInfo {
        self.node_info()
    }
}

impl NodeRecord for ExitNode {
    const NODE_KIND: NodeKind = NodeKind::Exit;

    fn from_info(info: NodeInfo) -> Result<Self, LayoutError> {
        ExitNode::new(info)
    }

    fn info(&self) -> NodeInfo {
        self.node_info()
    }
}

/// A record of one of the four edge tables.
pub trait EdgeRecord: PackedRecord {
    const TABLE: EdgeTable;

    fn to_node(node_index: u32) -> Result<Self, LayoutError>;

    /// Index of the peer node in the table's peer node array.
    fn node_index(&self) -> u32;
}

macro_rules! impl_edge_record {
    ($($ty:ident => $table:ident, $field:ident);+ $(;)?) => {$(
        impl EdgeRecord for $ty {
            const TABLE: EdgeTable = EdgeTable::$table;

            fn to_node(node_index: u32) -> Result<Self, LayoutError> {
                $ty::new(node_index)
            }

            fn node_index(&self) -> u32 {
                self.$field()
            }
        }
    )+};
}

impl_edge_record! {
    EntryEdgeFront => EntryFront, entry_node_index;
    EntryEdgeReverse => EntryReverse, entry_node_index;
    ExitEdgeFront => ExitFront, exit_node_index;
    ExitEdgeReverse => ExitReverse, exit_node_index;
}

/// A keyframe: two territories blended linearly over an interval.
pub trait KeyframeRecord: PackedRecord {
    type Territory: Interpolate;

    fn from_parts(
        start: Self::Territory,
        end: Self::Territory,
        interval: IntervalInfo,
    ) -> Result<Self, LayoutError>;

    fn territories(&self) -> (Self::Territory, Self::Territory);

    fn time_interval(&self) -> IntervalInfo;

    /// The territory at time `t`, or `None` outside `[start_time, end_time)`.
    fn territory_at(&self, t: f32) -> Option<Self::Territory> {
        let interval = self.time_interval();
        if !interval.contains(t) {
            return None;
        }
        let (start, end) = self.territories();
        Some(start.interpolate(end, interval.fraction(t)))
    }
}

impl KeyframeRecord for ClusterKeyframe {
    type Territory = Rectangle;

    fn from_parts(
        start: Rectangle,
        end: Rectangle,
        interval: IntervalInfo,
    ) -> Result<Self, LayoutError> {
        ClusterKeyframe::new(start, end, interval)
    }

    fn territories(&self) -> (Rectangle, Rectangle) {
        (self.start_territory(), self.end_territory())
    }

    fn time_interval(&self) -> IntervalInfo {
        self.interval()
    }
}

macro_rules! impl_circle_keyframe {
    ($($ty:ident),+) => {$(
        impl KeyframeRecord for $ty {
            type Territory = Circle;

            fn from_parts(
                start: Circle,
                end: Circle,
                interval: IntervalInfo,
            ) -> Result<Self, LayoutError> {
                $ty::new(start.try_into()?, end.try_into()?, interval)
            }

            fn territories(&self) -> (Circle, Circle) {
                (self.start_territory().into(), self.end_territory().into())
            }

            fn time_interval(&self) -> IntervalInfo {
                self.interval()
            }
        }
    )+};
}

impl_circle_keyframe!(EntryNodeKeyframe, ExitNodeKeyframe);

/// An annotation holding an owner's keyframe range.
pub trait KeyframeRange: PackedRecord {
    fn from_range(count: u8, first: u32) -> Result<Self, LayoutError>;

    fn keyframe_count(&self) -> u8;

    fn first_keyframe_index(&self) -> u32;

    fn keyframe_range(&self) -> Range<usize> {
        csr_range(self.keyframe_count().into(), self.first_keyframe_index())
    }
}

/// An annotation holding an owner's label as a byte range of the label blob.
pub trait LabelRef: PackedRecord {
    fn from_span(size: u8, offset: u32) -> Result<Self, LayoutError>;

    fn size(&self) -> u8;

    fn offset(&self) -> u32;

    fn label_range(&self) -> Range<usize> {
        csr_range(self.size().into(), self.offset())
    }
}

macro_rules! impl_pair_annotation {
    ($trait:ident { $ctor:ident, $count_fn:ident, $first_fn:ident }: $($ty:ident => $count:ident, $first:ident);+ $(;)?) => {$(
        impl $trait for $ty {
            fn $ctor(count: u8, first: u32) -> Result<Self, LayoutError> {
                $ty::new(count, first)
            }

            fn $count_fn(&self) -> u8 {
                self.$count()
            }

            fn $first_fn(&self) -> u32 {
                self.$first()
            }
        }
    )+};
}

impl_pair_annotation! {
    KeyframeRange { from_range, keyframe_count, first_keyframe_index }:
    ClusterExtra2 => cluster_keyframe_count, first_cluster_keyframe_index;
    EntryNodeExtra1 => entry_node_keyframe_count, first_entry_node_keyframe_index;
    ExitNodeExtra1 => exit_node_keyframe_count, first_exit_node_keyframe_index;
}

impl_pair_annotation! {
    LabelRef { from_span, size, offset }:
    ClusterExtra3 => label_size, label_offset;
    EntryNodeExtra2 => label_size, label_offset;
    ExitNodeExtra2 => label_size, label_offset;
}
