//! Slice extension readers
//!
//! A slice stack holds either inline slices or references to stacks in other
//! model parts, never both.

use crate::codec::{parse_f64, parse_resource_id};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{Resource, Slice, SlicePolygon, SliceRef, SliceStack, Vertex2D};

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{
    AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node,
};
use super::{parse_usize, require_id};

fn invalid_slice(message: String) -> Error {
    Error::model(ErrorCode::InvalidSliceData, message)
}

/// Reader of `<s:slicestack>`
pub(super) struct SliceStackReader {
    state: NodeState,
    id: Option<u32>,
    stack: SliceStack,
}

impl SliceStackReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            stack: SliceStack::default(),
        })
    }

    fn read_slice_ref(&mut self, ctx: &ParseContext<'_>, entry: &AttributeReader) -> Result<()> {
        let stack_id = parse_resource_id("slicestackid", entry.require("slicestackid")?)?;
        let path = entry.require("slicepath")?.to_string();
        if path == ctx.part_path() {
            return Err(invalid_slice(format!(
                "sliceref points back into {}",
                path
            )));
        }
        let target = ctx
            .model
            .find_package_resource_id(&path, stack_id)
            .ok_or_else(|| {
                Error::model(
                    ErrorCode::ResourceNotFound,
                    format!("slice stack {} not found in {}", stack_id, path),
                )
            })?;
        if !matches!(ctx.model.resource(target), Some(Resource::SliceStack(_))) {
            return Err(Error::model(
                ErrorCode::InvalidModelResource,
                format!("resource {} in {} is not a slice stack", stack_id, path),
            ));
        }
        self.stack.slice_refs.push(SliceRef {
            slice_stack: target,
            path,
        });
        Ok(())
    }
}

impl ReaderNode for SliceStackReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("slicestack id", &attr.value)?),
            "zbottom" => self.stack.zbottom = parse_f64("zbottom", &attr.value)?,
            _ => {}
        }
        Ok(())
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::Slice) => {
                if !self.stack.slice_refs.is_empty() {
                    return Err(invalid_slice(
                        "slice stack mixes slices and slice references".to_string(),
                    ));
                }
                let mut reader = SliceReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                let slice = reader.into_slice()?;
                let floor = self
                    .stack
                    .slices
                    .last()
                    .map_or(self.stack.zbottom, |s| s.ztop);
                if slice.ztop < floor {
                    return Err(invalid_slice(format!(
                        "slice ztop {} below {}",
                        slice.ztop, floor
                    )));
                }
                self.stack.slices.push(slice);
                Ok(())
            }
            Some(ElementKind::SliceRef) => {
                if !self.stack.slices.is_empty() {
                    return Err(invalid_slice(
                        "slice stack mixes slices and slice references".to_string(),
                    ));
                }
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.read_slice_ref(ctx, &entry)
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("slicestack", self.id)?;
        ctx.add_resource(id, Resource::SliceStack(std::mem::take(&mut self.stack)))?;
        Ok(())
    }
}

struct SliceReader {
    state: NodeState,
    ztop: Option<f64>,
    vertices: Vec<Vertex2D>,
    polygons: Vec<SlicePolygon>,
}

impl SliceReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            ztop: None,
            vertices: Vec::new(),
            polygons: Vec::new(),
        })
    }

    fn into_slice(self) -> Result<Slice> {
        let ztop = self
            .ztop
            .ok_or_else(|| Error::missing_attribute("slice", "ztop"))?;
        let mut slice = Slice::new(ztop);
        slice.vertices = self.vertices;
        slice.polygons = self.polygons;
        Ok(slice)
    }

    fn check_vertex(&self, index: usize) -> Result<usize> {
        if index >= self.vertices.len() {
            return Err(invalid_slice(format!(
                "slice vertex {} out of range ({} vertices)",
                index,
                self.vertices.len()
            )));
        }
        Ok(index)
    }
}

impl ReaderNode for SliceReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        if attr.name == "ztop" {
            self.ztop = Some(parse_f64("ztop", &attr.value)?);
        }
        Ok(())
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::SliceVertices) => {
                let mut reader = SliceVerticesReader {
                    state: NodeState::parse_name(&tag)?,
                    vertices: &mut self.vertices,
                };
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::Polygon) => {
                let start = tag
                    .attribute("startv")
                    .ok_or_else(|| Error::missing_attribute("polygon", "startv"))?;
                let start = self.check_vertex(parse_usize("startv", start)?)?;
                let mut reader = PolygonReader {
                    state: NodeState::parse_name(&tag)?,
                    vertex_count: self.vertices.len(),
                    polygon: SlicePolygon::new(start),
                };
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.polygons.push(reader.polygon);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct SliceVerticesReader<'s> {
    state: NodeState,
    vertices: &'s mut Vec<Vertex2D>,
}

impl ReaderNode for SliceVerticesReader<'_> {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::SliceVertex) => {
                let vertex = AttributeReader::read(ctx, cursor, &tag)?;
                self.vertices.push(Vertex2D::new(
                    parse_f64("x", vertex.require("x")?)?,
                    parse_f64("y", vertex.require("y")?)?,
                ));
                ctx.tick()
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct PolygonReader {
    state: NodeState,
    vertex_count: usize,
    polygon: SlicePolygon,
}

impl ReaderNode for PolygonReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::Segment) => {
                let segment = AttributeReader::read(ctx, cursor, &tag)?;
                let v2 = parse_usize("v2", segment.require("v2")?)?;
                if v2 >= self.vertex_count {
                    return Err(invalid_slice(format!(
                        "segment vertex {} out of range ({} vertices)",
                        v2, self.vertex_count
                    )));
                }
                self.polygon.segments.push(v2);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}
