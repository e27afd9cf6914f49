//! Volumetric extension writing for 3MF model files
//!
//! Identity transforms and default channels are omitted; the reader
//! restores them.

use std::io::Write as IoWrite;

use quick_xml::events::BytesStart;

use crate::codec::{Transform, format_f64, format_transform, is_identity};
use crate::error::Result;
use crate::model::{
    BoundaryShape, ChannelSelector, DEFAULT_BOUNDARY_CHANNEL, FieldReference,
    FunctionFromImage3D, Image3D, VolumeData, VolumetricLayer, VolumetricStack,
};

use super::PartWriter;

fn push_field_transform(elem: &mut BytesStart<'_>, transform: &Transform) {
    if !is_identity(transform) {
        elem.push_attribute(("transform", format_transform(transform).as_str()));
    }
}

/// Write an image stack
pub(super) fn write_image_stack<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    image: &Image3D,
) -> Result<()> {
    let mut elem = BytesStart::new("v:imagestack");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    if let Some(ref name) = image.name {
        elem.push_attribute(("name", name.as_str()));
    }
    elem.push_attribute(("rowcount", image.row_count.to_string().as_str()));
    elem.push_attribute(("columncount", image.column_count.to_string().as_str()));
    elem.push_attribute(("sheetcount", image.sheet_count().to_string().as_str()));
    out.start(elem)?;

    for sheet in &image.sheets {
        let mut sheet_elem = BytesStart::new("v:imagesheet");
        sheet_elem.push_attribute(("path", sheet.path.as_str()));
        sheet_elem.push_attribute(("minvalue", format_f64(sheet.min_value).as_str()));
        sheet_elem.push_attribute(("maxvalue", format_f64(sheet.max_value).as_str()));
        out.empty(sheet_elem)?;
    }

    out.end("v:imagestack")
}

/// Write a function sampling an image stack
pub(super) fn write_function_from_image<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    function: &FunctionFromImage3D,
) -> Result<()> {
    let mut elem = BytesStart::new("v:functionfromimage3d");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    elem.push_attribute(("image3did", out.local_id(function.image)?.to_string().as_str()));
    if let Some(ref name) = function.display_name {
        elem.push_attribute(("displayname", name.as_str()));
    }
    elem.push_attribute(("valueoffset", format_f64(function.value_offset).as_str()));
    elem.push_attribute(("valuescale", format_f64(function.value_scale).as_str()));
    elem.push_attribute(("tilestyleu", function.tile_style_u.to_string().as_str()));
    elem.push_attribute(("tilestylev", function.tile_style_v.to_string().as_str()));
    elem.push_attribute(("tilestylew", function.tile_style_w.to_string().as_str()));
    elem.push_attribute(("filter", function.filter.to_string().as_str()));
    out.empty(elem)
}

/// Write a volumetric stack
pub(super) fn write_volumetric_stack<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    stack: &VolumetricStack,
) -> Result<()> {
    let mut elem = BytesStart::new("v:volumetricstack");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    out.start(elem)?;

    for channel in &stack.dst_channels {
        let mut ch_elem = BytesStart::new("v:dstchannel");
        ch_elem.push_attribute(("name", channel.name.as_str()));
        ch_elem.push_attribute(("background", format_f64(channel.background).as_str()));
        out.empty(ch_elem)?;
    }
    for layer in &stack.layers {
        write_layer(out, layer)?;
    }

    out.end("v:volumetricstack")
}

fn write_layer<W: IoWrite>(out: &mut PartWriter<'_, W>, layer: &VolumetricLayer) -> Result<()> {
    let mut elem = BytesStart::new("v:volumetriclayer");
    elem.push_attribute(("transform", format_transform(&layer.transform).as_str()));
    elem.push_attribute(("blendmethod", layer.blend_method.to_string().as_str()));
    if let Some(alpha) = layer.src_alpha {
        elem.push_attribute(("srcalpha", format_f64(alpha).as_str()));
    }
    if let Some(alpha) = layer.dst_alpha {
        elem.push_attribute(("dstalpha", format_f64(alpha).as_str()));
    }
    out.start(elem)?;

    if let Some(ref mask) = layer.mask_selector {
        write_selector(out, "v:maskchannelselector", mask)?;
    }
    for selector in &layer.channel_selectors {
        write_selector(out, "v:channelselector", selector)?;
    }

    out.end("v:volumetriclayer")
}

fn write_selector<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    name: &str,
    selector: &ChannelSelector,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("sourceid", out.local_id(selector.image)?.to_string().as_str()));
    elem.push_attribute(("srcchannel", selector.src_channel.as_str()));
    elem.push_attribute(("dstchannel", selector.dst_channel.as_str()));
    elem.push_attribute(("minvalue", format_f64(selector.min_value).as_str()));
    elem.push_attribute(("maxvalue", format_f64(selector.max_value).as_str()));
    elem.push_attribute(("tilestyleu", selector.tile_style_u.to_string().as_str()));
    elem.push_attribute(("tilestylev", selector.tile_style_v.to_string().as_str()));
    elem.push_attribute(("tilestylew", selector.tile_style_w.to_string().as_str()));
    elem.push_attribute(("filter", selector.filter.to_string().as_str()));
    out.empty(elem)
}

fn field_element<'b, W: IoWrite>(
    out: &PartWriter<'_, W>,
    name: &'b str,
    field: &FieldReference,
    default_channel: &str,
) -> Result<BytesStart<'b>> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("functionid", out.local_id(field.function)?.to_string().as_str()));
    if field.channel != default_channel {
        elem.push_attribute(("channel", field.channel.as_str()));
    }
    push_field_transform(&mut elem, &field.transform);
    Ok(elem)
}

/// Write volume data
pub(super) fn write_volume_data<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    model_id: u32,
    data: &VolumeData,
) -> Result<()> {
    let mut elem = BytesStart::new("v:volumedata");
    elem.push_attribute(("id", model_id.to_string().as_str()));
    out.start(elem)?;

    if let Some(ref boundary) = data.boundary {
        let mut b_elem = field_element(out, "v:boundary", &boundary.field, "shape")?;
        b_elem.push_attribute(("solidthreshold", format_f64(boundary.solid_threshold).as_str()));
        out.empty(b_elem)?;
    }
    if let Some(ref color) = data.color {
        let c_elem = field_element(out, "v:color", color, "color")?;
        out.empty(c_elem)?;
    }
    for property in &data.properties {
        let mut p_elem = field_element(out, "v:property", &property.field, "value")?;
        p_elem.push_attribute(("name", property.name.as_str()));
        if property.required {
            p_elem.push_attribute(("required", "true"));
        }
        out.empty(p_elem)?;
    }

    out.end("v:volumedata")
}

/// Write the levelset of a boundary shape object
pub(super) fn write_boundary_shape<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    shape: &BoundaryShape,
) -> Result<()> {
    let mut elem = BytesStart::new("v:levelset");
    elem.push_attribute(("functionid", out.local_id(shape.function)?.to_string().as_str()));
    if shape.channel != DEFAULT_BOUNDARY_CHANNEL {
        elem.push_attribute(("channel", shape.channel.as_str()));
    }
    push_field_transform(&mut elem, &shape.transform);
    elem.push_attribute(("minfeaturesize", format_f64(shape.min_feature_size).as_str()));
    elem.push_attribute(("meshbboxonly", if shape.mesh_bbox_only { "true" } else { "false" }));
    elem.push_attribute(("fallbackvalue", format_f64(shape.fallback_value).as_str()));
    if let Some(mesh) = shape.mesh {
        elem.push_attribute(("meshid", out.local_id(mesh)?.to_string().as_str()));
    }
    if let Some(volume) = shape.volume_data {
        elem.push_attribute(("volumeid", out.local_id(volume)?.to_string().as_str()));
    }
    out.empty(elem)
}
