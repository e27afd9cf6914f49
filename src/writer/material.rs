//! Material extension writing for 3MF model files
//!
//! Base materials belong to the core namespace; every other property group
//! is written with the `m` prefix.

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::{format_color, format_f64};
use crate::error::Result;
use crate::model::{
    BaseMaterials, ColorGroup, CompositeMaterials, MultiProperties, Texture2D,
    Texture2DGroup,
};

use super::PartWriter;

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write a base material group
pub(super) fn write_base_materials<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    group: &BaseMaterials,
) -> Result<()> {
    let mut elem = BytesStart::new("basematerials");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    out.start(elem)?;

    for material in &group.materials {
        let mut mat_elem = BytesStart::new("base");
        mat_elem.push_attribute(("name", material.name.as_str()));
        mat_elem.push_attribute(("displaycolor", format_color(material.display_color).as_str()));
        out.empty(mat_elem)?;
    }

    out.end("basematerials")
}

/// Write a color group
pub(super) fn write_color_group<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    group: &ColorGroup,
) -> Result<()> {
    let mut elem = BytesStart::new("m:colorgroup");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    out.start(elem)?;

    for color in &group.colors {
        let mut color_elem = BytesStart::new("m:color");
        color_elem.push_attribute(("color", format_color(*color).as_str()));
        out.empty(color_elem)?;
    }

    out.end("m:colorgroup")
}

/// Write a texture2d resource
pub(super) fn write_texture2d<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    texture: &Texture2D,
) -> Result<()> {
    let mut elem = BytesStart::new("m:texture2d");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("path", texture.path.as_str()));
    elem.push_attribute(("contenttype", texture.content_type.as_str()));
    elem.push_attribute(("tilestyleu", texture.tile_style_u.to_string().as_str()));
    elem.push_attribute(("tilestylev", texture.tile_style_v.to_string().as_str()));
    elem.push_attribute(("filter", texture.filter.to_string().as_str()));
    out.empty(elem)
}

/// Write a texture coordinate group
pub(super) fn write_texture2d_group<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    group: &Texture2DGroup,
) -> Result<()> {
    let mut elem = BytesStart::new("m:texture2dgroup");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("texid", out.local_id(group.texture)?.to_string().as_str()));
    out.start(elem)?;

    for coord in &group.coords {
        let mut coord_elem = BytesStart::new("m:tex2coord");
        coord_elem.push_attribute(("u", format_f64(coord.u).as_str()));
        coord_elem.push_attribute(("v", format_f64(coord.v).as_str()));
        out.empty(coord_elem)?;
    }

    out.end("m:texture2dgroup")
}

/// Write composite materials
pub(super) fn write_composite_materials<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    group: &CompositeMaterials,
) -> Result<()> {
    let mut elem = BytesStart::new("m:compositematerials");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("matid", out.local_id(group.base_materials)?.to_string().as_str()));
    elem.push_attribute(("matindices", join(&group.mat_indices).as_str()));
    out.start(elem)?;

    for composite in &group.composites {
        let values = composite
            .iter()
            .map(|v| format_f64(*v))
            .collect::<Vec<_>>()
            .join(" ");
        let mut comp_elem = BytesStart::new("m:composite");
        comp_elem.push_attribute(("values", values.as_str()));
        out.empty(comp_elem)?;
    }

    out.end("m:compositematerials")
}

/// Write multi properties
pub(super) fn write_multi_properties<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    group: &MultiProperties,
) -> Result<()> {
    let pids = group
        .pids
        .iter()
        .map(|pid| out.local_id(*pid))
        .collect::<Result<Vec<_>>>()?;
    let mut elem = BytesStart::new("m:multiproperties");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("pids", join(&pids).as_str()));
    if !group.blend_methods.is_empty() {
        elem.push_attribute(("blendmethods", join(&group.blend_methods).as_str()));
    }
    out.start(elem)?;

    for multi in &group.multis {
        let mut multi_elem = BytesStart::new("m:multi");
        multi_elem.push_attribute(("pindices", join(multi).as_str()));
        out.empty(multi_elem)?;
    }

    out.end("m:multiproperties")
}
