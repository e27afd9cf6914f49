//! Beam lattice extension readers
//!
//! This module handles the `<b:beamlattice>` element of a mesh and its
//! beams, balls and beam sets.

use crate::codec::{parse_f64, parse_resource_id};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{Ball, Beam, BeamCapMode, BeamLattice, BeamSet, Resource, ResourceId};

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{
    AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node,
};
use super::parse_usize;

fn invalid_lattice(message: String) -> Error {
    Error::model(ErrorCode::InvalidBeamLattice, message)
}

fn parse_radius(field: &str, text: &str) -> Result<f64> {
    let radius = parse_f64(field, text)?;
    if radius <= 0.0 {
        return Err(invalid_lattice(format!("{} must be positive, got {}", field, radius)));
    }
    Ok(radius)
}

/// Reader of `<b:beamlattice>`
pub(super) struct BeamLatticeReader {
    state: NodeState,
    vertex_count: usize,
    radius: Option<f64>,
    min_length: Option<f64>,
    clipping_mesh: Option<u32>,
    representation_mesh: Option<u32>,
    pid: Option<u32>,
    lattice: BeamLattice,
}

impl BeamLatticeReader {
    pub(super) fn new(tag: &StartTag, vertex_count: usize) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            vertex_count,
            radius: None,
            min_length: None,
            clipping_mesh: None,
            representation_mesh: None,
            pid: None,
            lattice: BeamLattice::new(0.0, 0.0),
        })
    }

    /// Finished lattice with beam set references checked
    pub(super) fn into_lattice(self) -> Result<BeamLattice> {
        let lattice = self.lattice;
        for set in &lattice.beam_sets {
            if let Some(index) = set.beam_refs.iter().find(|i| **i >= lattice.beams.len()) {
                return Err(invalid_lattice(format!(
                    "beam set references beam {} of {}",
                    index,
                    lattice.beams.len()
                )));
            }
            if let Some(index) = set.ball_refs.iter().find(|i| **i >= lattice.balls.len()) {
                return Err(invalid_lattice(format!(
                    "beam set references ball {} of {}",
                    index,
                    lattice.balls.len()
                )));
            }
        }
        Ok(lattice)
    }

    fn resolve_mesh(ctx: &ParseContext<'_>, field: &str, model_id: u32) -> Result<ResourceId> {
        let id = ctx.find_resource(model_id).ok_or_else(|| {
            Error::model(
                ErrorCode::ResourceNotFound,
                format!("{} {} not found", field, model_id),
            )
        })?;
        match ctx.model.resource(id) {
            Some(Resource::Object(object)) if object.is_mesh_object() => Ok(id),
            _ => Err(invalid_lattice(format!(
                "{} {} is not a mesh object",
                field, model_id
            ))),
        }
    }
}

impl ReaderNode for BeamLatticeReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let value = attr.value.as_str();
        match attr.name.as_str() {
            "radius" => self.radius = Some(parse_radius("radius", value)?),
            "minlength" => self.min_length = Some(parse_radius("minlength", value)?),
            "cap" => self.lattice.cap_mode = value.parse()?,
            "clippingmode" => self.lattice.clipping_mode = Some(value.to_string()),
            "clippingmesh" => self.clipping_mesh = Some(parse_resource_id("clippingmesh", value)?),
            "representationmesh" => {
                self.representation_mesh = Some(parse_resource_id("representationmesh", value)?)
            }
            "ballmode" => self.lattice.ball_mode = Some(value.to_string()),
            "ballradius" => self.lattice.ball_radius = Some(parse_radius("ballradius", value)?),
            "pid" => self.pid = Some(parse_resource_id("beamlattice pid", value)?),
            "pindex" => self.lattice.pindex = Some(parse_usize("pindex", value)?),
            _ => {}
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        self.lattice.radius = self
            .radius
            .ok_or_else(|| Error::missing_attribute("beamlattice", "radius"))?;
        self.lattice.min_length = self
            .min_length
            .ok_or_else(|| Error::missing_attribute("beamlattice", "minlength"))?;

        if let Some(mesh) = self.clipping_mesh {
            self.lattice.clipping_mesh = Some(Self::resolve_mesh(ctx, "clippingmesh", mesh)?);
        }
        if let Some(mesh) = self.representation_mesh {
            self.lattice.representation_mesh =
                Some(Self::resolve_mesh(ctx, "representationmesh", mesh)?);
        }
        if let Some(pid) = self.pid {
            let group = ctx.resolve_property_group(pid)?;
            if let Some(pindex) = self.lattice.pindex {
                ctx.check_property_index(group, pindex)?;
            }
            self.lattice.pid = Some(group);
        }
        Ok(())
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        let section = match ctx.kind_of(&tag) {
            Some(kind @ (ElementKind::Beams | ElementKind::Balls | ElementKind::BeamSets)) => kind,
            _ => return ctx.skip_unknown(cursor, &tag),
        };
        let mut reader = LatticeSectionReader {
            state: NodeState::parse_name(&tag)?,
            section,
            vertex_count: self.vertex_count,
            lattice: &mut self.lattice,
        };
        read_node(&mut reader, ctx, cursor, &tag)
    }
}

/// Reader of `<b:beams>`, `<b:balls>` and `<b:beamsets>`
struct LatticeSectionReader<'l> {
    state: NodeState,
    section: ElementKind,
    vertex_count: usize,
    lattice: &'l mut BeamLattice,
}

impl LatticeSectionReader<'_> {
    fn vertex(&self, field: &str, text: &str) -> Result<usize> {
        let index = parse_usize(field, text)?;
        if index >= self.vertex_count {
            return Err(invalid_lattice(format!(
                "{} {} out of range ({} vertices)",
                field, index, self.vertex_count
            )));
        }
        Ok(index)
    }

    fn properties(
        ctx: &ParseContext<'_>,
        entry: &AttributeReader,
        indices: &[&str],
    ) -> Result<(Option<ResourceId>, Vec<Option<usize>>)> {
        let values = indices
            .iter()
            .map(|name| entry.get(name).map(|v| parse_usize(name, v)).transpose())
            .collect::<Result<Vec<_>>>()?;
        let Some(pid) = entry.get("pid") else {
            return Ok((None, values));
        };
        let group = ctx.resolve_property_group(parse_resource_id("pid", pid)?)?;
        for index in values.iter().flatten() {
            ctx.check_property_index(group, *index)?;
        }
        Ok((Some(group), values))
    }

    fn read_beam(&mut self, ctx: &ParseContext<'_>, entry: &AttributeReader) -> Result<()> {
        let v1 = self.vertex("v1", entry.require("v1")?)?;
        let v2 = self.vertex("v2", entry.require("v2")?)?;
        if v1 == v2 {
            return Err(invalid_lattice(format!("beam connects vertex {} to itself", v1)));
        }
        let mut beam = Beam::new(v1, v2);
        beam.r1 = entry.get("r1").map(|r| parse_radius("r1", r)).transpose()?;
        beam.r2 = entry.get("r2").map(|r| parse_radius("r2", r)).transpose()?;
        beam.cap1 = entry.get("cap1").map(str::parse::<BeamCapMode>).transpose()?;
        beam.cap2 = entry.get("cap2").map(str::parse::<BeamCapMode>).transpose()?;
        let (pid, indices) = Self::properties(ctx, entry, &["p1", "p2"])?;
        beam.pid = pid;
        beam.p1 = indices[0];
        beam.p2 = indices[1];
        self.lattice.beams.push(beam);
        Ok(())
    }

    fn read_ball(&mut self, ctx: &ParseContext<'_>, entry: &AttributeReader) -> Result<()> {
        let vindex = self.vertex("vindex", entry.require("vindex")?)?;
        let (pid, indices) = Self::properties(ctx, entry, &["p"])?;
        self.lattice.balls.push(Ball {
            vindex,
            radius: entry.get("r").map(|r| parse_radius("r", r)).transpose()?,
            pid,
            pindex: indices[0],
        });
        Ok(())
    }
}

impl ReaderNode for LatticeSectionReader<'_> {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match (self.section, ctx.kind_of(&tag)) {
            (ElementKind::Beams, Some(ElementKind::Beam)) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.read_beam(ctx, &entry)?;
                ctx.tick()
            }
            (ElementKind::Balls, Some(ElementKind::Ball)) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.read_ball(ctx, &entry)?;
                ctx.tick()
            }
            (ElementKind::BeamSets, Some(ElementKind::BeamSet)) => {
                let mut reader = BeamSetReader {
                    state: NodeState::parse_name(&tag)?,
                    set: BeamSet::default(),
                };
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.lattice.beam_sets.push(reader.set);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct BeamSetReader {
    state: NodeState,
    set: BeamSet,
}

impl ReaderNode for BeamSetReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "name" => self.set.name = Some(attr.value.clone()),
            "identifier" => self.set.identifier = Some(attr.value.clone()),
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
            Some(ElementKind::BeamRef) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.set
                    .beam_refs
                    .push(parse_usize("index", entry.require("index")?)?);
                Ok(())
            }
            Some(ElementKind::BallRef) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.set
                    .ball_refs
                    .push(parse_usize("index", entry.require("index")?)?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}
