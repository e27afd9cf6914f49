//! Core element writing for 3MF model files
//!
//! Objects, meshes, components and the build.

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::format_f32;
use crate::error::Result;
use crate::model::{Build, Component, Mesh, Object, ObjectContent, ObjectType};

use super::beam_lattice::write_beam_lattice;
use super::volumetric::write_boundary_shape;
use super::{PartWriter, push_transform, write_metadata_group};

/// Write an object
pub(super) fn write_object<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    object: &Object,
) -> Result<()> {
    let mut elem = BytesStart::new("object");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    if object.object_type != ObjectType::Model {
        elem.push_attribute(("type", object.object_type.to_string().as_str()));
    }
    if let Some(ref name) = object.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(ref part_number) = object.part_number {
        elem.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(ref thumbnail) = object.thumbnail {
        elem.push_attribute(("thumbnail", thumbnail.as_str()));
    }
    if let Some(pid) = object.pid {
        elem.push_attribute(("pid", out.local_id(pid)?.to_string().as_str()));
    }
    if let Some(pindex) = object.pindex {
        elem.push_attribute(("pindex", pindex.to_string().as_str()));
    }
    if let Some(ref uuid) = object.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if let Some(stack) = object.slice_stack {
        elem.push_attribute(("s:slicestackid", out.local_id(stack)?.to_string().as_str()));
    }
    if let Some(resolution) = object.mesh_resolution {
        elem.push_attribute(("s:meshresolution", resolution.to_string().as_str()));
    }
    out.start(elem)?;

    write_metadata_group(out, &object.metadata)?;
    match &object.content {
        ObjectContent::Mesh(mesh) => write_mesh(out, mesh)?,
        ObjectContent::Components(components) => write_components(out, components)?,
        ObjectContent::BoundaryShape(shape) => write_boundary_shape(out, shape)?,
    }

    out.end("object")
}

/// Write a mesh
fn write_mesh<W: IoWrite>(out: &mut PartWriter<'_, W>, mesh: &Mesh) -> Result<()> {
    let mut elem = BytesStart::new("mesh");
    if let Some(volume) = mesh.volume_data {
        elem.push_attribute(("v:volumeid", out.local_id(volume)?.to_string().as_str()));
    }
    out.start(elem)?;

    out.start(BytesStart::new("vertices"))?;
    for vertex in &mesh.vertices {
        let mut v_elem = BytesStart::new("vertex");
        v_elem.push_attribute(("x", format_f32(vertex.x).as_str()));
        v_elem.push_attribute(("y", format_f32(vertex.y).as_str()));
        v_elem.push_attribute(("z", format_f32(vertex.z).as_str()));
        out.empty(v_elem)?;
    }
    out.end("vertices")?;

    out.start(BytesStart::new("triangles"))?;
    for triangle in &mesh.triangles {
        let mut t_elem = BytesStart::new("triangle");
        t_elem.push_attribute(("v1", triangle.v1.to_string().as_str()));
        t_elem.push_attribute(("v2", triangle.v2.to_string().as_str()));
        t_elem.push_attribute(("v3", triangle.v3.to_string().as_str()));
        if let Some(pid) = triangle.pid {
            t_elem.push_attribute(("pid", out.local_id(pid)?.to_string().as_str()));
            for (name, index) in [("p1", triangle.p1), ("p2", triangle.p2), ("p3", triangle.p3)] {
                if let Some(index) = index {
                    t_elem.push_attribute((name, index.to_string().as_str()));
                }
            }
        }
        out.empty(t_elem)?;
    }
    out.end("triangles")?;

    if let Some(ref lattice) = mesh.beam_lattice {
        write_beam_lattice(out, lattice)?;
    }

    out.end("mesh")
}

/// Write the components of an assembly
fn write_components<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    components: &[Component],
) -> Result<()> {
    out.start(BytesStart::new("components"))?;
    for component in components {
        let (object_id, path) = out.reference(component.object)?;
        let mut elem = BytesStart::new("component");
        elem.push_attribute(("objectid", object_id.to_string().as_str()));
        push_transform(&mut elem, &component.transform);
        if let Some(ref uuid) = component.uuid {
            elem.push_attribute(("p:UUID", uuid.as_str()));
        }
        if let Some(path) = path {
            elem.push_attribute(("p:path", path));
        }
        out.empty(elem)?;
    }
    out.end("components")
}

/// Write the build section of the root part
pub(super) fn write_build<W: IoWrite>(out: &mut PartWriter<'_, W>, build: &Build) -> Result<()> {
    let mut elem = BytesStart::new("build");
    if let Some(ref uuid) = build.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    out.start(elem)?;

    for item in &build.items {
        let (object_id, path) = out.reference(item.object)?;
        let mut elem = BytesStart::new("item");
        elem.push_attribute(("objectid", object_id.to_string().as_str()));
        push_transform(&mut elem, &item.transform);
        if let Some(ref part_number) = item.part_number {
            elem.push_attribute(("partnumber", part_number.as_str()));
        }
        if let Some(ref uuid) = item.uuid {
            elem.push_attribute(("p:UUID", uuid.as_str()));
        }
        if let Some(path) = path {
            elem.push_attribute(("p:path", path));
        }
        if item.metadata.is_empty() {
            out.empty(elem)?;
        } else {
            out.start(elem)?;
            write_metadata_group(out, &item.metadata)?;
            out.end("item")?;
        }
    }

    out.end("build")
}
