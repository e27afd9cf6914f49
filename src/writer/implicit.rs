//! Implicit extension writing for 3MF model files

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::{format_f64, format_matrix4};
use crate::error::Result;
use crate::implicit::{ImplicitFunction, ImplicitNode, ImplicitPort, NodePayload};

use super::PartWriter;

/// Write a port declaration, or a port reference when it is linked
fn write_port<W: IoWrite>(out: &mut PartWriter<'_, W>, port: &ImplicitPort) -> Result<()> {
    let name = match port.reference {
        Some(_) => port.port_type.reference_element_name(),
        None => port.port_type.element_name(),
    };
    let mut elem = BytesStart::new(format!("i:{}", name));
    elem.push_attribute(("identifier", port.identifier.as_str()));
    if !port.display_name.is_empty() {
        elem.push_attribute(("displayname", port.display_name.as_str()));
    }
    if let Some(ref reference) = port.reference {
        elem.push_attribute(("ref", reference.as_str()));
    }
    out.empty(elem)
}

fn write_ports<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    block: &str,
    ports: &[ImplicitPort],
) -> Result<()> {
    if ports.is_empty() {
        return Ok(());
    }
    out.start(BytesStart::new(block))?;
    for port in ports {
        write_port(out, port)?;
    }
    out.end(block)
}

fn write_node<W: IoWrite>(out: &mut PartWriter<'_, W>, node: &ImplicitNode) -> Result<()> {
    let name = format!("i:{}", node.node_type.xml_name());
    let mut elem = BytesStart::new(name.as_str());
    elem.push_attribute(("identifier", node.identifier.as_str()));
    if !node.display_name.is_empty() {
        elem.push_attribute(("displayname", node.display_name.as_str()));
    }
    if !node.tag.is_empty() {
        elem.push_attribute(("tag", node.tag.as_str()));
    }
    match node.payload() {
        NodePayload::None => {}
        NodePayload::Constant(value) => elem.push_attribute(("value", format_f64(value).as_str())),
        NodePayload::Vector([x, y, z]) => {
            elem.push_attribute(("x", format_f64(x).as_str()));
            elem.push_attribute(("y", format_f64(y).as_str()));
            elem.push_attribute(("z", format_f64(z).as_str()));
        }
        NodePayload::Matrix(matrix) => {
            elem.push_attribute(("matrix", format_matrix4(&matrix).as_str()));
        }
        NodePayload::ResourceId(id) => {
            elem.push_attribute(("value", out.local_id(id)?.to_string().as_str()));
        }
    }
    out.start(elem)?;

    write_ports(out, "i:in", &node.inputs)?;
    write_ports(out, "i:out", &node.outputs)?;

    out.end(&name)
}

/// Write an implicit function with its node graph
pub(super) fn write_implicit_function<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    function: &ImplicitFunction,
) -> Result<()> {
    let mut elem = BytesStart::new("i:implicitfunction");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("identifier", function.identifier.as_str()));
    if !function.display_name.is_empty() {
        elem.push_attribute(("displayname", function.display_name.as_str()));
    }
    out.start(elem)?;

    write_ports(out, "i:in", &function.inputs)?;
    for node in function.nodes() {
        write_node(out, node)?;
    }
    write_ports(out, "i:out", &function.outputs)?;

    out.end("i:implicitfunction")
}
