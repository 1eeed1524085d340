//! Hierarchical point clustering for zoomable maps.
//!
//! Points are projected to the unit Web Mercator square and merged greedily,
//! from the deepest zoom level up to the shallowest: at each level every node
//! absorbs the not-yet-claimed nodes of the level below that lie within the
//! merge radius, and the new cluster sits at the count-weighted centroid of
//! its members. Each level keeps its own R*-tree of top-level nodes, so a
//! viewport query is a single envelope lookup.
//!
//! The hierarchy is immutable once built. A changed point set means a new
//! index.
//!
//! # Example
//!
//! ```rust
//! use storemap::compute::cluster::{IndexBuilder, IndexPoint};
//! use storemap_types::bbox::BoundingBox;
//!
//! let points = (0..10)
//!     .map(|i| IndexPoint::new(format!("p{i}"), 35.0 + i as f64 * 1e-4, 139.0, ()))
//!     .collect();
//! let index = IndexBuilder::new().build(points)?;
//!
//! let nodes = index.get_clusters(&BoundingBox::world(), 0.0);
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(nodes[0].point_count(), 10);
//! # Ok::<(), storemap::StoremapError>(())
//! ```

mod projection;

pub use projection::{lat_y, lng_x, radius_at_zoom, x_lng, y_lat};

use crate::compute::validation::{validate_coordinates, validate_viewport};
use crate::config::ClusterOptions;
use crate::error::{Result, StoremapError};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::time::Instant;
use storemap_types::bbox::BoundingBox;

/// Position path of a node from the implicit root above the shallowest level.
pub type NodePath = SmallVec<[u32; 8]>;

type LevelEntry = GeomWithData<[f64; 2], u32>;

/// Identity of a cluster node, scoped to the index generation that built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId {
    generation: u64,
    node: u32,
}

impl ClusterId {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.generation, self.node)
    }
}

/// A point to be indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint<T> {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub payload: T,
}

impl<T> IndexPoint<T> {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, payload: T) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            payload,
        }
    }
}

/// An aggregate node as seen by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub lat: f64,
    pub lon: f64,
    pub point_count: usize,
}

/// A single indexed point as seen by callers.
#[derive(Debug, PartialEq)]
pub struct LeafRef<'a, T> {
    pub id: &'a str,
    pub lat: f64,
    pub lon: f64,
    pub payload: &'a T,
}

impl<T> Clone for LeafRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LeafRef<'_, T> {}

/// A node returned from a query: either a cluster or a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'a, T> {
    Cluster(ClusterSummary),
    Leaf(LeafRef<'a, T>),
}

impl<T> Node<'_, T> {
    pub fn is_cluster(&self) -> bool {
        matches!(self, Node::Cluster(_))
    }

    pub fn point_count(&self) -> usize {
        match self {
            Node::Cluster(c) => c.point_count,
            Node::Leaf(_) => 1,
        }
    }

    pub fn lat(&self) -> f64 {
        match self {
            Node::Cluster(c) => c.lat,
            Node::Leaf(l) => l.lat,
        }
    }

    pub fn lon(&self) -> f64 {
        match self {
            Node::Cluster(c) => c.lon,
            Node::Leaf(l) => l.lon,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf {
        point: usize,
    },
    Cluster {
        children: SmallVec<[u32; 4]>,
        point_count: usize,
        /// Deepest zoom at which this cluster is a top-level node
        zoom: u8,
    },
}

#[derive(Debug, Clone)]
struct ArenaNode {
    x: f64,
    y: f64,
    parent: Option<u32>,
    /// Position among the parent's children, or among the roots
    slot: u32,
    kind: NodeKind,
}

impl ArenaNode {
    fn point_count(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf { .. } => 1,
            NodeKind::Cluster { point_count, .. } => *point_count,
        }
    }
}

/// Builder for [`SpatialIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    options: ClusterOptions,
    generation: u64,
}

impl IndexBuilder {
    /// Create a builder with default cluster options and generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: ClusterOptions) -> Self {
        self.options = options;
        self
    }

    /// Tag the index (and every `ClusterId` it hands out) with a generation number.
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Build the cluster hierarchy over `points`.
    ///
    /// Fails when the options are invalid or any point has a non-finite coordinate.
    pub fn build<T>(self, points: Vec<IndexPoint<T>>) -> Result<SpatialIndex<T>> {
        self.options
            .validate()
            .map_err(StoremapError::InvalidConfig)?;

        for (idx, point) in points.iter().enumerate() {
            validate_coordinates(point.lat, point.lon).map_err(|e| {
                StoremapError::InvalidInput(format!("Point at index {} ({}): {}", idx, point.id, e))
            })?;
        }

        if points.len() >= u32::MAX as usize / 2 {
            return Err(StoremapError::InvalidInput(format!(
                "Too many points to index: {}",
                points.len()
            )));
        }

        let started = Instant::now();
        let index = SpatialIndex::cluster(self.options, self.generation, points);

        log::debug!(
            "Built cluster index generation {} over {} points ({} nodes) in {:?}",
            index.generation,
            index.points.len(),
            index.nodes.len(),
            started.elapsed()
        );

        Ok(index)
    }
}

/// Immutable cluster hierarchy over a fixed point set.
#[derive(Debug)]
pub struct SpatialIndex<T> {
    options: ClusterOptions,
    generation: u64,
    points: Vec<IndexPoint<T>>,
    nodes: Vec<ArenaNode>,
    /// Top-level nodes per zoom, from `min_zoom` through `max_zoom + 1`
    levels: Vec<RTree<LevelEntry>>,
}

impl<T> SpatialIndex<T> {
    /// Shorthand for `IndexBuilder::new().options(options).build(points)`.
    pub fn build(points: Vec<IndexPoint<T>>, options: ClusterOptions) -> Result<Self> {
        IndexBuilder::new().options(options).build(points)
    }

    fn cluster(options: ClusterOptions, generation: u64, points: Vec<IndexPoint<T>>) -> Self {
        let mut nodes: Vec<ArenaNode> = points
            .iter()
            .enumerate()
            .map(|(idx, p)| ArenaNode {
                x: lng_x(p.lon),
                y: lat_y(p.lat),
                parent: None,
                slot: 0,
                kind: NodeKind::Leaf { point: idx },
            })
            .collect();

        // Zoom at which each node was last claimed; u8::MAX = not yet.
        let mut claimed: Vec<u8> = vec![u8::MAX; nodes.len()];

        let top = options.max_zoom + 1;
        let mut current: Vec<u32> = (0..nodes.len() as u32).collect();
        let mut levels: Vec<RTree<LevelEntry>> =
            Vec::with_capacity(usize::from(top - options.min_zoom) + 1);
        let mut below = level_tree(&nodes, &current);

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let radius = radius_at_zoom(options.radius, options.extent, zoom);
            let mut next = Vec::with_capacity(current.len());

            for &id in &current {
                if claimed[id as usize] <= zoom {
                    continue;
                }
                claimed[id as usize] = zoom;

                let (x, y) = (nodes[id as usize].x, nodes[id as usize].y);
                let mut neighbors: SmallVec<[u32; 16]> = below
                    .locate_within_distance([x, y], radius * radius)
                    .map(|entry| entry.data)
                    .filter(|&nb| nb != id && claimed[nb as usize] > zoom)
                    .collect();
                neighbors.sort_unstable();

                let own_count = nodes[id as usize].point_count();
                let count = own_count
                    + neighbors
                        .iter()
                        .map(|&nb| nodes[nb as usize].point_count())
                        .sum::<usize>();

                if neighbors.is_empty() || count < options.min_points {
                    next.push(id);
                    for nb in neighbors {
                        claimed[nb as usize] = zoom;
                        next.push(nb);
                    }
                    continue;
                }

                let mut wx = x * own_count as f64;
                let mut wy = y * own_count as f64;
                for &nb in &neighbors {
                    let n = &nodes[nb as usize];
                    let weight = n.point_count() as f64;
                    wx += n.x * weight;
                    wy += n.y * weight;
                }

                let cluster_id = nodes.len() as u32;
                let mut children: SmallVec<[u32; 4]> = smallvec![id];
                children.extend(neighbors);
                children.sort_unstable();

                for (slot, &child) in children.iter().enumerate() {
                    claimed[child as usize] = zoom;
                    let node = &mut nodes[child as usize];
                    node.parent = Some(cluster_id);
                    node.slot = slot as u32;
                }

                nodes.push(ArenaNode {
                    x: wx / count as f64,
                    y: wy / count as f64,
                    parent: None,
                    slot: 0,
                    kind: NodeKind::Cluster {
                        children,
                        point_count: count,
                        zoom,
                    },
                });
                claimed.push(u8::MAX);
                next.push(cluster_id);
            }

            let tree = level_tree(&nodes, &next);
            levels.push(std::mem::replace(&mut below, tree));
            current = next;
        }
        levels.push(below);

        current.sort_unstable();
        for (slot, &root) in current.iter().enumerate() {
            nodes[root as usize].slot = slot as u32;
        }

        // Built deepest-first; store shallowest-first.
        levels.reverse();

        Self {
            options,
            generation,
            points,
            nodes,
            levels,
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of aggregate nodes across all levels.
    pub fn cluster_count(&self) -> usize {
        self.nodes.len() - self.points.len()
    }

    pub fn points(&self) -> &[IndexPoint<T>] {
        &self.points
    }

    /// Discrete level a fractional zoom maps to.
    pub fn level_for_zoom(&self, zoom: f64) -> u8 {
        let floored = zoom.floor();
        let top = f64::from(self.options.max_zoom) + 1.0;
        floored.clamp(f64::from(self.options.min_zoom), top) as u8
    }

    /// Top-level nodes at `floor(zoom)` whose position lies in `bbox`.
    ///
    /// Results are ordered by internal node id, so repeated calls with the same
    /// arguments return identical sequences. Invalid viewports yield nothing.
    pub fn get_clusters(&self, bbox: &BoundingBox, zoom: f64) -> Vec<Node<'_, T>> {
        if let Err(e) = validate_viewport(bbox, zoom) {
            log::warn!("Rejecting cluster query: {}", e);
            return Vec::new();
        }

        let level = self.level_for_zoom(zoom);
        let tree = &self.levels[usize::from(level - self.options.min_zoom)];

        let south = bbox.south.clamp(-90.0, 90.0);
        let north = bbox.north.clamp(-90.0, 90.0);

        let mut ids: Vec<u32> = Vec::new();
        if bbox.east - bbox.west >= 360.0 {
            collect_in(tree, -180.0, south, 180.0, north, &mut ids);
        } else {
            let west = wrap_lng(bbox.west);
            let east = if bbox.east == 180.0 && bbox.west != 180.0 {
                180.0
            } else {
                wrap_lng(bbox.east)
            };
            if west > east {
                collect_in(tree, west, south, 180.0, north, &mut ids);
                collect_in(tree, -180.0, south, east, north, &mut ids);
            } else {
                collect_in(tree, west, south, east, north, &mut ids);
            }
        }

        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| self.view(id)).collect()
    }

    /// Direct children of a cluster, one level deeper.
    pub fn get_children(&self, id: ClusterId) -> Result<Vec<Node<'_, T>>> {
        let children = self.cluster_children(id)?;
        Ok(children.iter().map(|&child| self.view(child)).collect())
    }

    /// Smallest zoom at which the cluster no longer shows as a single node.
    pub fn get_expansion_zoom(&self, id: ClusterId) -> Result<u8> {
        let mut node = self.resolve(id)?;
        loop {
            let NodeKind::Cluster { children, zoom, .. } = &self.nodes[node as usize].kind else {
                return Err(StoremapError::ClusterNotFound(id));
            };
            let expansion = zoom + 1;
            if children.len() == 1
                && expansion <= self.options.max_zoom
                && matches!(self.nodes[children[0] as usize].kind, NodeKind::Cluster { .. })
            {
                node = children[0];
                continue;
            }
            return Ok(expansion);
        }
    }

    /// Every leaf under a cluster, in depth-first child order.
    pub fn get_leaves(&self, id: ClusterId) -> Result<Vec<LeafRef<'_, T>>> {
        let mut stack: Vec<u32> = vec![self.resolve(id)?];
        let mut leaves = Vec::new();

        while let Some(node) = stack.pop() {
            match &self.nodes[node as usize].kind {
                NodeKind::Leaf { point } => leaves.push(self.leaf(*point)),
                NodeKind::Cluster { children, .. } => stack.extend(children.iter().rev()),
            }
        }

        Ok(leaves)
    }

    /// Position path from the implicit root to the cluster.
    ///
    /// Stable for a given point set and options, and unique within the index.
    pub fn cluster_path(&self, id: ClusterId) -> Result<NodePath> {
        let mut node = self.resolve(id)?;
        let mut path = NodePath::new();
        loop {
            let n = &self.nodes[node as usize];
            path.push(n.slot);
            match n.parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
        path.reverse();
        Ok(path)
    }

    fn resolve(&self, id: ClusterId) -> Result<u32> {
        if id.generation != self.generation {
            return Err(StoremapError::ClusterNotFound(id));
        }
        match self.nodes.get(id.node as usize) {
            Some(ArenaNode {
                kind: NodeKind::Cluster { .. },
                ..
            }) => Ok(id.node),
            _ => Err(StoremapError::ClusterNotFound(id)),
        }
    }

    fn cluster_children(&self, id: ClusterId) -> Result<&[u32]> {
        let node = self.resolve(id)?;
        match &self.nodes[node as usize].kind {
            NodeKind::Cluster { children, .. } => Ok(children),
            NodeKind::Leaf { .. } => Err(StoremapError::ClusterNotFound(id)),
        }
    }

    fn leaf(&self, point: usize) -> LeafRef<'_, T> {
        let p = &self.points[point];
        LeafRef {
            id: &p.id,
            lat: p.lat,
            lon: p.lon,
            payload: &p.payload,
        }
    }

    fn view(&self, node: u32) -> Node<'_, T> {
        let n = &self.nodes[node as usize];
        match &n.kind {
            NodeKind::Leaf { point } => Node::Leaf(self.leaf(*point)),
            NodeKind::Cluster { point_count, .. } => Node::Cluster(ClusterSummary {
                id: ClusterId {
                    generation: self.generation,
                    node,
                },
                lat: y_lat(n.y),
                lon: x_lng(n.x),
                point_count: *point_count,
            }),
        }
    }
}

fn level_tree(nodes: &[ArenaNode], ids: &[u32]) -> RTree<LevelEntry> {
    let entries = ids
        .iter()
        .map(|&id| {
            let n = &nodes[id as usize];
            GeomWithData::new([n.x, n.y], id)
        })
        .collect();
    RTree::bulk_load(entries)
}

fn collect_in(
    tree: &RTree<LevelEntry>,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    out: &mut Vec<u32>,
) {
    let envelope = AABB::from_corners([lng_x(west), lat_y(north)], [lng_x(east), lat_y(south)]);
    out.extend(tree.locate_in_envelope(&envelope).map(|entry| entry.data));
}

fn wrap_lng(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}
