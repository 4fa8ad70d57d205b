//! Quad-tree decomposition of a query polygon into Morton key ranges.
//!
//! The tree is built per query. Each node covers a power-of-two aligned block
//! of grid cells, so its keys form one contiguous range. Insertion classifies
//! nodes as fully covered, partially covered, or disjoint; fully covered
//! subtrees are never split further and four fully covered siblings collapse
//! into their parent. Extraction walks the surviving nodes and emits one range
//! per fully covered node.
//!
//! ```text
//!   column
//!     ^
//!     |  NW | NE
//!     | ----+----
//!     |  SW | SE
//!     +-----------> row
//! ```

use super::geometry::{self, GeometryPredicates};
use super::morton;
use super::ranges::{self, HashRange};
use crate::error::Result;
use geo::{Coord, Point, Polygon, Rect, coord};

/// Degree rectangle covered by a tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadRect {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl QuadRect {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            coord! { x: self.left, y: self.bottom },
            coord! { x: self.right, y: self.top },
        )
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + (self.right - self.left) / 2.0,
            self.bottom + (self.top - self.bottom) / 2.0,
        )
    }

    /// True if `other` reaches past this rectangle on any side.
    pub fn outside_box(&self, other: &QuadRect) -> bool {
        other.left < self.left
            || other.right > self.right
            || other.top > self.top
            || other.bottom < self.bottom
    }

    /// Splits at the midpoint into quadrants indexed by [`Quadrant::index`].
    pub fn split(&self) -> [QuadRect; 4] {
        let mid = self.center();
        let (mx, my) = (mid.x(), mid.y());
        [
            QuadRect::new(self.left, my, mx, self.top),
            QuadRect::new(mx, my, self.right, self.top),
            QuadRect::new(self.left, self.bottom, mx, my),
            QuadRect::new(mx, self.bottom, self.right, my),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    /// Child visiting order during range extraction.
    pub const EXTRACTION_ORDER: [Quadrant; 4] = [
        Quadrant::SouthWest,
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
    ];

    pub fn index(self) -> usize {
        match self {
            Quadrant::NorthWest => 0,
            Quadrant::NorthEast => 1,
            Quadrant::SouthWest => 2,
            Quadrant::SouthEast => 3,
        }
    }
}

/// How much of a node the query polygon covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Disjoint,
    Partial,
    Full,
}

/// Grid-index extent of a node: rows `[start_row, end_row)`, columns
/// `[start_column, end_column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub start_row: u64,
    pub end_row: u64,
    pub start_column: u64,
    pub end_column: u64,
    range: HashRange,
    status: Status,
}

impl GridCell {
    pub fn new(
        start_row: u64,
        end_row: u64,
        start_column: u64,
        end_column: u64,
        cut_level: u32,
    ) -> Self {
        let range = HashRange::new(
            morton::interleave(start_row, start_column, cut_level),
            morton::interleave(end_row - 1, end_column - 1, cut_level),
        );
        Self {
            start_row,
            end_row,
            start_column,
            end_column,
            range,
            status: Status::Disjoint,
        }
    }

    /// The half of this block on each axis that `quadrant` names.
    pub fn quadrant(&self, quadrant: Quadrant, cut_level: u32) -> GridCell {
        let mid_row = self.start_row + (self.end_row - self.start_row) / 2;
        let mid_column = self.start_column + (self.end_column - self.start_column) / 2;
        let (rows, columns) = match quadrant {
            Quadrant::NorthWest => ((self.start_row, mid_row), (mid_column, self.end_column)),
            Quadrant::NorthEast => ((mid_row, self.end_row), (mid_column, self.end_column)),
            Quadrant::SouthWest => ((self.start_row, mid_row), (self.start_column, mid_column)),
            Quadrant::SouthEast => ((mid_row, self.end_row), (self.start_column, mid_column)),
        };
        GridCell::new(rows.0, rows.1, columns.0, columns.1, cut_level)
    }

    pub fn hash_range(&self) -> HashRange {
        self.range
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// A node owning up to four children, one per [`Quadrant`].
#[derive(Debug)]
pub struct QuadTreeNode {
    rect: QuadRect,
    cell: GridCell,
    depth: u32,
    max_depth: u32,
    children: [Option<Box<QuadTreeNode>>; 4],
}

impl QuadTreeNode {
    fn new(rect: QuadRect, cell: GridCell, depth: u32, max_depth: u32) -> Self {
        Self {
            rect,
            cell,
            depth,
            max_depth,
            children: Default::default(),
        }
    }

    pub fn rect(&self) -> &QuadRect {
        &self.rect
    }

    pub fn cell(&self) -> &GridCell {
        &self.cell
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn status(&self) -> Status {
        self.cell.status
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<&QuadTreeNode> {
        self.children[quadrant.index()].as_deref()
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    /// Single unit cell.
    fn is_leaf_cell(&self) -> bool {
        self.depth > self.max_depth
    }

    fn set_status(&mut self, status: Status) {
        self.cell.status = status;
    }

    fn insert(&mut self, polygon: &Polygon, envelope: &Rect) {
        if self.is_leaf_cell() {
            let status = if polygon.touches_point(&self.rect.center()) {
                Status::Full
            } else {
                Status::Disjoint
            };
            log::trace!(
                "leaf rows [{}, {}) columns [{}, {}) -> {:?}",
                self.cell.start_row,
                self.cell.end_row,
                self.cell.start_column,
                self.cell.end_column,
                status
            );
            self.set_status(status);
            return;
        }

        if GeometryPredicates::contains(polygon, &self.rect.to_rect()) {
            self.set_status(Status::Full);
            return;
        }

        self.set_status(Status::Partial);
        let quads = self.rect.split();
        for quadrant in Quadrant::ALL {
            let rect = quads[quadrant.index()];
            let bounds = rect.to_rect();
            if envelope.disjoint(&bounds) || polygon.disjoint(&bounds) {
                continue;
            }
            let cell = self.cell.quadrant(quadrant, self.max_depth);
            let mut child = Box::new(QuadTreeNode::new(rect, cell, self.depth + 1, self.max_depth));
            child.insert(polygon, envelope);
            self.children[quadrant.index()] = Some(child);
        }

        if self.children_all(Status::Full) {
            self.set_status(Status::Full);
            self.children = Default::default();
        } else {
            self.release_disjoint_children();
            if !self.has_children() {
                self.set_status(Status::Disjoint);
            }
        }
    }

    fn children_all(&self, status: Status) -> bool {
        self.children
            .iter()
            .all(|child| child.as_ref().is_some_and(|c| c.status() == status))
    }

    fn release_disjoint_children(&mut self) {
        for slot in self.children.iter_mut() {
            if slot.as_ref().is_some_and(|c| c.status() == Status::Disjoint) {
                *slot = None;
            }
        }
    }

    fn collect_ranges(&self, out: &mut Vec<HashRange>) {
        match self.status() {
            Status::Full => out.push(self.cell.range),
            Status::Partial => {
                for quadrant in Quadrant::EXTRACTION_ORDER {
                    if let Some(child) = self.child(quadrant) {
                        child.collect_ranges(out);
                    }
                }
            }
            Status::Disjoint => {}
        }
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.node_count())
            .sum::<usize>()
    }
}

/// Per-query quad-tree over a `2^depth x 2^depth` grid.
///
/// # Examples
///
/// ```rust
/// use geo::coord;
/// use geoindex::compute::quadtree::SpatialRangeTree;
///
/// // 4x4 grid over [0, 4] x [0, 4]
/// let mut tree = SpatialRangeTree::new(0.0, 0.0, 4.0, 4.0, 2);
/// let inserted = tree.insert(&[
///     coord! { x: 0.0, y: 2.0 },
///     coord! { x: 2.0, y: 2.0 },
///     coord! { x: 2.0, y: 4.0 },
///     coord! { x: 0.0, y: 4.0 },
/// ])?;
/// assert!(inserted);
///
/// let ranges = tree.ranges();
/// assert_eq!(ranges.len(), 1);
/// assert_eq!((ranges[0].start, ranges[0].end), (4, 7));
/// # Ok::<(), geoindex::GeoIndexError>(())
/// ```
#[derive(Debug)]
pub struct SpatialRangeTree {
    root: QuadTreeNode,
}

impl SpatialRangeTree {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64, depth: u32) -> Self {
        let side = 1u64 << depth;
        let rect = QuadRect::new(left, bottom, right, top);
        let cell = GridCell::new(0, side, 0, side, depth);
        Self {
            root: QuadTreeNode::new(rect, cell, 1, depth),
        }
    }

    pub fn root(&self) -> &QuadTreeNode {
        &self.root
    }

    /// Number of materialized nodes, root included.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Inserts a polygon given as an ordered vertex list (closed implicitly).
    ///
    /// Returns `Ok(false)` when the polygon cannot select anything: its
    /// envelope reaches outside the grid, or it does not touch the grid.
    pub fn insert(&mut self, vertices: &[Coord]) -> Result<bool> {
        let polygon = geometry::polygon_from_vertices(vertices)?;
        self.insert_polygon(&polygon)
    }

    pub fn insert_polygon(&mut self, polygon: &Polygon) -> Result<bool> {
        let envelope = geometry::envelope(polygon)?;

        if self.root.rect.outside_box(&QuadRect::from_rect(&envelope)) {
            log::warn!(
                "Query envelope ({:?} -> {:?}) extends past grid bounds, rejecting",
                envelope.min(),
                envelope.max()
            );
            return Ok(false);
        }

        let bounds = self.root.rect.to_rect();
        if envelope.disjoint(&bounds) || polygon.disjoint(&bounds) {
            log::debug!("Query polygon is disjoint from the grid");
            return Ok(false);
        }

        self.root.insert(polygon, &envelope);
        log::debug!(
            "Query inserted: root {:?}, {} nodes",
            self.root.status(),
            self.node_count()
        );
        Ok(true)
    }

    /// Ranges of fully covered nodes in traversal order, unsorted and unmerged.
    pub fn extract_ranges(&self) -> Vec<HashRange> {
        let mut out = Vec::new();
        self.root.collect_ranges(&mut out);
        out
    }

    /// Sorted, merged ranges covering every selected cell.
    pub fn ranges(&self) -> Vec<HashRange> {
        let mut out = self.extract_ranges();
        ranges::sort_ascending(&mut out);
        ranges::merge_adjacent(&mut out);
        out
    }
}
