//! Beam lattice extension writing for 3MF model files

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::format_f64;
use crate::error::Result;
use crate::model::{Ball, Beam, BeamLattice, BeamSet};

use super::PartWriter;

/// Write the `<b:beamlattice>` of a mesh
pub(super) fn write_beam_lattice<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    lattice: &BeamLattice,
) -> Result<()> {
    let mut elem = BytesStart::new("b:beamlattice");
    elem.push_attribute(("radius", format_f64(lattice.radius).as_str()));
    elem.push_attribute(("minlength", format_f64(lattice.min_length).as_str()));
    elem.push_attribute(("cap", lattice.cap_mode.to_string().as_str()));
    if let Some(ref mode) = lattice.clipping_mode {
        elem.push_attribute(("clippingmode", mode.as_str()));
    }
    if let Some(mesh) = lattice.clipping_mesh {
        elem.push_attribute(("clippingmesh", out.local_id(mesh)?.to_string().as_str()));
    }
    if let Some(mesh) = lattice.representation_mesh {
        elem.push_attribute(("representationmesh", out.local_id(mesh)?.to_string().as_str()));
    }
    if let Some(ref mode) = lattice.ball_mode {
        elem.push_attribute(("ballmode", mode.as_str()));
    }
    if let Some(radius) = lattice.ball_radius {
        elem.push_attribute(("ballradius", format_f64(radius).as_str()));
    }
    if let Some(pid) = lattice.pid {
        elem.push_attribute(("pid", out.local_id(pid)?.to_string().as_str()));
    }
    if let Some(pindex) = lattice.pindex {
        elem.push_attribute(("pindex", pindex.to_string().as_str()));
    }
    out.start(elem)?;

    out.start(BytesStart::new("b:beams"))?;
    for beam in &lattice.beams {
        write_beam(out, beam)?;
    }
    out.end("b:beams")?;

    if !lattice.balls.is_empty() {
        out.start(BytesStart::new("b:balls"))?;
        for ball in &lattice.balls {
            write_ball(out, ball)?;
        }
        out.end("b:balls")?;
    }

    if !lattice.beam_sets.is_empty() {
        out.start(BytesStart::new("b:beamsets"))?;
        for set in &lattice.beam_sets {
            write_beam_set(out, set)?;
        }
        out.end("b:beamsets")?;
    }

    out.end("b:beamlattice")
}

fn write_beam<W: IoWrite>(out: &mut PartWriter<'_, W>, beam: &Beam) -> Result<()> {
    let mut elem = BytesStart::new("b:beam");
    elem.push_attribute(("v1", beam.v1.to_string().as_str()));
    elem.push_attribute(("v2", beam.v2.to_string().as_str()));
    if let Some(r1) = beam.r1 {
        elem.push_attribute(("r1", format_f64(r1).as_str()));
    }
    if let Some(r2) = beam.r2 {
        elem.push_attribute(("r2", format_f64(r2).as_str()));
    }
    if let Some(cap) = beam.cap1 {
        elem.push_attribute(("cap1", cap.to_string().as_str()));
    }
    if let Some(cap) = beam.cap2 {
        elem.push_attribute(("cap2", cap.to_string().as_str()));
    }
    if let Some(pid) = beam.pid {
        elem.push_attribute(("pid", out.local_id(pid)?.to_string().as_str()));
        for (name, index) in [("p1", beam.p1), ("p2", beam.p2)] {
            if let Some(index) = index {
                elem.push_attribute((name, index.to_string().as_str()));
            }
        }
    }
    out.empty(elem)
}

fn write_ball<W: IoWrite>(out: &mut PartWriter<'_, W>, ball: &Ball) -> Result<()> {
    let mut elem = BytesStart::new("b:ball");
    elem.push_attribute(("vindex", ball.vindex.to_string().as_str()));
    if let Some(radius) = ball.radius {
        elem.push_attribute(("r", format_f64(radius).as_str()));
    }
    if let Some(pid) = ball.pid {
        elem.push_attribute(("pid", out.local_id(pid)?.to_string().as_str()));
        if let Some(pindex) = ball.pindex {
            elem.push_attribute(("p", pindex.to_string().as_str()));
        }
    }
    out.empty(elem)
}

fn write_beam_set<W: IoWrite>(out: &mut PartWriter<'_, W>, set: &BeamSet) -> Result<()> {
    let mut elem = BytesStart::new("b:beamset");
    if let Some(ref name) = set.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(ref identifier) = set.identifier {
        elem.push_attribute(("identifier", identifier.as_str()));
    }
    out.start(elem)?;

    for index in &set.beam_refs {
        let mut ref_elem = BytesStart::new("b:ref");
        ref_elem.push_attribute(("index", index.to_string().as_str()));
        out.empty(ref_elem)?;
    }
    for index in &set.ball_refs {
        let mut ref_elem = BytesStart::new("b:ballref");
        ref_elem.push_attribute(("index", index.to_string().as_str()));
        out.empty(ref_elem)?;
    }

    out.end("b:beamset")
}
