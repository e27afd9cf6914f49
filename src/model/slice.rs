//! Slice extension types

use super::resources::ResourceId;

/// 2D vertex in a slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex2D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Vertex2D {
    /// Create a new 2D vertex
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Closed or open polygon through slice vertices
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePolygon {
    /// Index of the start vertex
    pub start_vertex: usize,
    /// Following vertex indices
    pub segments: Vec<usize>,
}

impl SlicePolygon {
    /// Create a polygon with no segments
    pub fn new(start_vertex: usize) -> Self {
        Self {
            start_vertex,
            segments: Vec::new(),
        }
    }
}

/// A single slice at height `ztop`
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Top of the slice
    pub ztop: f64,
    /// Vertices
    pub vertices: Vec<Vertex2D>,
    /// Polygons
    pub polygons: Vec<SlicePolygon>,
}

impl Slice {
    /// Create an empty slice
    pub fn new(ztop: f64) -> Self {
        Self {
            ztop,
            vertices: Vec::new(),
            polygons: Vec::new(),
        }
    }
}

/// Reference to a slice stack stored in another part
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRef {
    /// Referenced slice stack
    pub slice_stack: ResourceId,
    /// Part path of the referenced stack
    pub path: String,
}

/// Slice stack (`<s:slicestack>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceStack {
    /// Bottom of the first slice
    pub zbottom: f64,
    /// Slices
    pub slices: Vec<Slice>,
    /// References to other stacks
    pub slice_refs: Vec<SliceRef>,
}

impl SliceStack {
    /// Create an empty stack
    pub fn new(zbottom: f64) -> Self {
        Self {
            zbottom,
            ..Self::default()
        }
    }
}
