//! Volumetric extension readers
//!
//! Image stacks, image-backed functions, volumetric stacks and volume data
//! are resources; the levelset (boundary shape) is read as object content.

use crate::codec::{Transform, parse_bool, parse_f64, parse_index, parse_resource_id, parse_transform};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{
    BlendMethod, BoundaryShape, ChannelSelector, DstChannel, FieldReference, FilterMode,
    FunctionFromImage3D, Image3D, ImageSheet, Resource, ResourceId, TileStyle, VolumeData,
    VolumeDataBoundary, VolumeDataProperty, VolumetricLayer, VolumetricStack,
};
use crate::warnings::WarningLevel;

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{
    AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node,
};
use super::require_id;

fn missing(element: &str, attribute: &str) -> Error {
    Error::model(
        ErrorCode::MissingVolumetricAttribute,
        format!("{} requires '{}'", element, attribute),
    )
}

/// Parse a finite number, reporting failures as `InvalidVolumetricValue`
fn volumetric_value(field: &str, text: &str) -> Result<f64> {
    parse_f64(field, text).map_err(|_| {
        Error::model(
            ErrorCode::InvalidVolumetricValue,
            format!("{} is not a finite number: '{}'", field, text),
        )
    })
}

fn positive_count(field: &str, text: &str) -> Result<u32> {
    let value = parse_index(field, text)?;
    if value == 0 {
        return Err(Error::model(
            ErrorCode::InvalidVolumetricValue,
            format!("{} must be positive", field),
        ));
    }
    Ok(value)
}

/// Store `value` unless the slot is already taken
fn set_once<T>(slot: &mut Option<T>, value: T, code: ErrorCode, field: &str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::model(code, format!("'{}' given twice", field)));
    }
    *slot = Some(value);
    Ok(())
}

fn resolve_image(ctx: &ParseContext<'_>, field: &str, model_id: u32) -> Result<ResourceId> {
    ctx.resolve_resource_of(field, model_id, "imagestack", |r| {
        matches!(r, Resource::Image3D(_))
    })
}

fn resolve_function(ctx: &ParseContext<'_>, field: &str, model_id: u32) -> Result<ResourceId> {
    ctx.resolve_resource_of(field, model_id, "function", Resource::is_function)
}

/// Reader of `<v:imagestack>`
pub(super) struct ImageStackReader {
    state: NodeState,
    id: Option<u32>,
    name: Option<String>,
    rows: Option<u32>,
    columns: Option<u32>,
    sheet_count: Option<u32>,
    sheets: Vec<ImageSheet>,
}

impl ImageStackReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            name: None,
            rows: None,
            columns: None,
            sheet_count: None,
            sheets: Vec::new(),
        })
    }

    fn read_sheet(ctx: &ParseContext<'_>, entry: &AttributeReader) -> Result<ImageSheet> {
        let path = entry.require("path")?;
        if ctx.model.attachment(path).is_none() {
            return Err(Error::model(
                ErrorCode::AttachmentNotFound,
                format!("image sheet {} is not in the package", path),
            ));
        }
        let mut sheet = ImageSheet::new(path);
        if let Some(min) = entry.get("minvalue") {
            sheet.min_value = volumetric_value("minvalue", min)?;
        }
        if let Some(max) = entry.get("maxvalue") {
            sheet.max_value = volumetric_value("maxvalue", max)?;
        }
        Ok(sheet)
    }
}

impl ReaderNode for ImageStackReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let value = attr.value.as_str();
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("imagestack id", value)?),
            "name" => self.name = Some(value.to_string()),
            "rowcount" => self.rows = Some(positive_count("rowcount", value)?),
            "columncount" => self.columns = Some(positive_count("columncount", value)?),
            "sheetcount" => self.sheet_count = Some(positive_count("sheetcount", value)?),
            _ => {}
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, _ctx: &mut ParseContext<'_>) -> Result<()> {
        for (value, name) in [
            (self.rows, "rowcount"),
            (self.columns, "columncount"),
            (self.sheet_count, "sheetcount"),
        ] {
            if value.is_none() {
                return Err(missing("imagestack", name));
            }
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
            Some(ElementKind::ImageSheet) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.sheets.push(Self::read_sheet(ctx, &entry)?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("imagestack", self.id)?;
        let expected = self.sheet_count.unwrap_or_default() as usize;
        if self.sheets.len() != expected {
            return Err(Error::model(
                ErrorCode::InvalidImageStack,
                format!(
                    "imagestack {} declares {} sheets but has {}",
                    id,
                    expected,
                    self.sheets.len()
                ),
            ));
        }
        let mut image = Image3D::new(self.rows.unwrap_or_default(), self.columns.unwrap_or_default());
        image.name = self.name.take();
        image.sheets = std::mem::take(&mut self.sheets);
        ctx.add_resource(id, Resource::Image3D(image))?;
        Ok(())
    }
}

/// Reader of `<v:functionfromimage3d>`
pub(super) struct FunctionFromImage3DReader {
    state: NodeState,
    id: Option<u32>,
    image: Option<u32>,
    display_name: Option<String>,
    value_offset: f64,
    value_scale: f64,
    tile_styles: [TileStyle; 3],
    filter: FilterMode,
}

impl FunctionFromImage3DReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            image: None,
            display_name: None,
            value_offset: 0.0,
            value_scale: 1.0,
            tile_styles: [TileStyle::default(); 3],
            filter: FilterMode::default(),
        })
    }
}

impl ReaderNode for FunctionFromImage3DReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let value = attr.value.as_str();
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("functionfromimage3d id", value)?),
            "image3did" => self.image = Some(parse_resource_id("image3did", value)?),
            "displayname" => self.display_name = Some(value.to_string()),
            "valueoffset" => self.value_offset = volumetric_value("valueoffset", value)?,
            "valuescale" => self.value_scale = volumetric_value("valuescale", value)?,
            "tilestyleu" => self.tile_styles[0] = value.parse()?,
            "tilestylev" => self.tile_styles[1] = value.parse()?,
            "tilestylew" => self.tile_styles[2] = value.parse()?,
            "filter" => self.filter = value.parse()?,
            _ => {}
        }
        Ok(())
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("functionfromimage3d", self.id)?;
        let image = self
            .image
            .ok_or_else(|| missing("functionfromimage3d", "image3did"))?;
        let mut function = FunctionFromImage3D::new(resolve_image(ctx, "image3did", image)?);
        function.display_name = self.display_name.take();
        function.value_offset = self.value_offset;
        function.value_scale = self.value_scale;
        [
            function.tile_style_u,
            function.tile_style_v,
            function.tile_style_w,
        ] = self.tile_styles;
        function.filter = self.filter;
        ctx.add_resource(id, Resource::FunctionFromImage3D(function))?;
        Ok(())
    }
}

/// Reader of `<v:volumetricstack>`
pub(super) struct VolumetricStackReader {
    state: NodeState,
    id: Option<u32>,
    stack: VolumetricStack,
}

impl VolumetricStackReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            stack: VolumetricStack::default(),
        })
    }

    fn read_dst_channel(entry: &AttributeReader) -> Result<DstChannel> {
        let name = entry.get("name").filter(|n| !n.is_empty()).ok_or_else(|| {
            Error::model(
                ErrorCode::MissingVolumetricDstChannelName,
                "dstchannel without a name",
            )
        })?;
        let background = entry
            .get("background")
            .map(|b| volumetric_value("background", b))
            .transpose()?
            .unwrap_or(0.0);
        Ok(DstChannel {
            name: name.to_string(),
            background,
        })
    }
}

impl ReaderNode for VolumetricStackReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        if attr.name == "id" {
            self.id = Some(parse_resource_id("volumetricstack id", &attr.value)?);
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
            Some(ElementKind::DstChannel) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                let channel = Self::read_dst_channel(&entry)?;
                if self.stack.dst_channel(&channel.name).is_some() {
                    return Err(Error::model(
                        ErrorCode::DuplicateVolumetricAttribute,
                        format!("dstchannel '{}' declared twice", channel.name),
                    ));
                }
                self.stack.dst_channels.push(channel);
                Ok(())
            }
            Some(ElementKind::VolumetricLayer) => {
                let mut reader = VolumetricLayerReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.stack.layers.push(reader.into_layer()?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("volumetricstack", self.id)?;
        ctx.add_resource(id, Resource::VolumetricStack(std::mem::take(&mut self.stack)))?;
        Ok(())
    }
}

struct VolumetricLayerReader {
    state: NodeState,
    transform: Option<Transform>,
    blend_method: Option<BlendMethod>,
    src_alpha: Option<f64>,
    dst_alpha: Option<f64>,
    selectors: Vec<ChannelSelector>,
    mask: Option<ChannelSelector>,
}

impl VolumetricLayerReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            transform: None,
            blend_method: None,
            src_alpha: None,
            dst_alpha: None,
            selectors: Vec::new(),
            mask: None,
        })
    }

    fn into_layer(self) -> Result<VolumetricLayer> {
        let transform = self
            .transform
            .ok_or_else(|| missing("volumetriclayer", "transform"))?;
        let blend_method = self
            .blend_method
            .ok_or_else(|| missing("volumetriclayer", "blendmethod"))?;
        let mut layer = VolumetricLayer::new(transform, blend_method);
        layer.src_alpha = self.src_alpha;
        layer.dst_alpha = self.dst_alpha;
        layer.channel_selectors = self.selectors;
        layer.mask_selector = self.mask;
        Ok(layer)
    }

    fn read_selector(ctx: &ParseContext<'_>, entry: &AttributeReader) -> Result<ChannelSelector> {
        let source = entry
            .get("sourceid")
            .or_else(|| entry.get("image3did"))
            .ok_or_else(|| missing(entry.name(), "sourceid"))?;
        let image = resolve_image(ctx, "sourceid", parse_resource_id("sourceid", source)?)?;
        let channel = |name: &str| -> Result<String> {
            Ok(entry.require(name)?.to_string())
        };
        let tile = |name: &str| -> Result<TileStyle> {
            entry.get(name).map_or(Ok(TileStyle::default()), str::parse)
        };
        Ok(ChannelSelector {
            image,
            src_channel: channel("srcchannel")?,
            dst_channel: channel("dstchannel")?,
            min_value: entry
                .get("minvalue")
                .map(|v| volumetric_value("minvalue", v))
                .transpose()?
                .unwrap_or(0.0),
            max_value: entry
                .get("maxvalue")
                .map(|v| volumetric_value("maxvalue", v))
                .transpose()?
                .unwrap_or(1.0),
            tile_style_u: tile("tilestyleu")?,
            tile_style_v: tile("tilestylev")?,
            tile_style_w: tile("tilestylew")?,
            filter: entry.get("filter").map_or(Ok(FilterMode::default()), str::parse)?,
        })
    }
}

impl ReaderNode for VolumetricLayerReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let value = attr.value.as_str();
        let duplicate = ErrorCode::DuplicateVolumetricAttribute;
        match attr.name.as_str() {
            "transform" => set_once(
                &mut self.transform,
                parse_transform("transform", value)?,
                duplicate,
                "transform",
            )?,
            "blendmethod" => {
                let method = match value.parse::<BlendMethod>() {
                    Ok(method) => method,
                    Err(e) => {
                        ctx.warn(
                            ErrorCode::InvalidBlendMethod,
                            e.to_string(),
                            WarningLevel::InvalidMandatoryValue,
                        )?;
                        BlendMethod::Mix
                    }
                };
                set_once(&mut self.blend_method, method, duplicate, "blendmethod")?
            }
            "srcalpha" => set_once(
                &mut self.src_alpha,
                volumetric_value("srcalpha", value)?,
                duplicate,
                "srcalpha",
            )?,
            "dstalpha" => set_once(
                &mut self.dst_alpha,
                volumetric_value("dstalpha", value)?,
                duplicate,
                "dstalpha",
            )?,
            _ => {}
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        if self.blend_method == Some(BlendMethod::Mix) {
            for (value, name) in [(self.src_alpha, "srcalpha"), (self.dst_alpha, "dstalpha")] {
                if value.is_none() {
                    ctx.warn(
                        ErrorCode::MissingVolumetricAttribute,
                        format!("mix layer without '{}'", name),
                        WarningLevel::MissingMandatoryValue,
                    )?;
                }
            }
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
            Some(ElementKind::ChannelSelector) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                self.selectors.push(Self::read_selector(ctx, &entry)?);
                Ok(())
            }
            Some(ElementKind::MaskChannelSelector) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                let selector = Self::read_selector(ctx, &entry)?;
                set_once(
                    &mut self.mask,
                    selector,
                    ErrorCode::DuplicateMaskChannelSelector,
                    "maskchannelselector",
                )
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

/// Reader of `<v:volumedata>`
pub(super) struct VolumeDataReader {
    state: NodeState,
    id: Option<u32>,
    data: VolumeData,
}

impl VolumeDataReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            data: VolumeData::default(),
        })
    }

    fn read_field(
        ctx: &ParseContext<'_>,
        entry: &AttributeReader,
        default_channel: &str,
    ) -> Result<FieldReference> {
        let function = entry.get("functionid").ok_or_else(|| {
            Error::model(
                ErrorCode::MissingVolumeDataFieldId,
                format!("{} without a functionid", entry.name()),
            )
        })?;
        let function = resolve_function(
            ctx,
            "functionid",
            parse_resource_id("functionid", function)?,
        )?;
        let mut field =
            FieldReference::new(function, entry.get("channel").unwrap_or(default_channel));
        if let Some(transform) = entry.get("transform") {
            field.transform = parse_transform("transform", transform)?;
        }
        Ok(field)
    }

    fn duplicate(element: &str) -> Error {
        Error::model(
            ErrorCode::DuplicateVolumeData,
            format!("volumedata has more than one {}", element),
        )
    }
}

impl ReaderNode for VolumeDataReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        if attr.name == "id" {
            self.id = Some(parse_resource_id("volumedata id", &attr.value)?);
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
            Some(ElementKind::VolumeColor) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                if self.data.color.is_some() {
                    return Err(Self::duplicate("color"));
                }
                self.data.color = Some(Self::read_field(ctx, &entry, "color")?);
                Ok(())
            }
            Some(ElementKind::VolumeProperty) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                let name = entry.get("name").filter(|n| !n.is_empty()).ok_or_else(|| {
                    Error::model(
                        ErrorCode::MissingVolumeDataPropertyName,
                        "volumedata property without a name",
                    )
                })?;
                if self.data.property(name).is_some() {
                    return Err(Self::duplicate(&format!("property '{}'", name)));
                }
                let field = Self::read_field(ctx, &entry, "value")?;
                let required = entry
                    .get("required")
                    .map(|r| parse_bool("required", r))
                    .transpose()?
                    .unwrap_or(false);
                self.data.properties.push(VolumeDataProperty {
                    name: name.to_string(),
                    field,
                    required,
                });
                Ok(())
            }
            Some(ElementKind::VolumeBoundary) => {
                let entry = AttributeReader::read(ctx, cursor, &tag)?;
                if self.data.boundary.is_some() {
                    return Err(Self::duplicate("boundary"));
                }
                let field = Self::read_field(ctx, &entry, "shape")?;
                let solid_threshold = entry
                    .get("solidthreshold")
                    .map(|t| volumetric_value("solidthreshold", t))
                    .transpose()?
                    .unwrap_or(0.0);
                self.data.boundary = Some(VolumeDataBoundary {
                    field,
                    solid_threshold,
                });
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("volumedata", self.id)?;
        ctx.add_resource(id, Resource::VolumeData(std::mem::take(&mut self.data)))?;
        Ok(())
    }
}

/// Reader of `<levelset>` / `<boundaryshape>` inside an object
pub(super) struct BoundaryShapeReader {
    state: NodeState,
    function: Option<ResourceId>,
    channel: Option<String>,
    transform: Option<Transform>,
    min_feature_size: Option<f64>,
    mesh_bbox_only: Option<bool>,
    fallback_value: Option<f64>,
    mesh: Option<ResourceId>,
    volume_data: Option<ResourceId>,
}

impl BoundaryShapeReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            function: None,
            channel: None,
            transform: None,
            min_feature_size: None,
            mesh_bbox_only: None,
            fallback_value: None,
            mesh: None,
            volume_data: None,
        })
    }

    pub(super) fn into_shape(self) -> Result<BoundaryShape> {
        let function = self.function.ok_or_else(|| {
            Error::model(
                ErrorCode::MissingBoundaryShapeFunctionId,
                "boundary shape without a functionid",
            )
        })?;
        let mut shape = BoundaryShape::new(function);
        if let Some(channel) = self.channel {
            shape.channel = channel;
        }
        if let Some(transform) = self.transform {
            shape.transform = transform;
        }
        shape.min_feature_size = self.min_feature_size.unwrap_or(shape.min_feature_size);
        shape.mesh_bbox_only = self.mesh_bbox_only.unwrap_or(shape.mesh_bbox_only);
        shape.fallback_value = self.fallback_value.unwrap_or(shape.fallback_value);
        shape.mesh = self.mesh;
        shape.volume_data = self.volume_data;
        Ok(shape)
    }
}

impl ReaderNode for BoundaryShapeReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let value = attr.value.as_str();
        let duplicate = ErrorCode::DuplicateBoundaryShapeAttribute;
        match attr.name.as_str() {
            "functionid" => {
                let function =
                    resolve_function(ctx, "functionid", parse_resource_id("functionid", value)?)?;
                set_once(&mut self.function, function, duplicate, "functionid")
            }
            "channel" => set_once(&mut self.channel, value.to_string(), duplicate, "channel"),
            "transform" => set_once(
                &mut self.transform,
                parse_transform("transform", value)?,
                duplicate,
                "transform",
            ),
            "minfeaturesize" => set_once(
                &mut self.min_feature_size,
                volumetric_value("minfeaturesize", value)?,
                duplicate,
                "minfeaturesize",
            ),
            "meshbboxonly" => set_once(
                &mut self.mesh_bbox_only,
                parse_bool("meshbboxonly", value)?,
                duplicate,
                "meshbboxonly",
            ),
            "fallbackvalue" => set_once(
                &mut self.fallback_value,
                volumetric_value("fallbackvalue", value)?,
                duplicate,
                "fallbackvalue",
            ),
            "meshid" => {
                let mesh = ctx.resolve_resource_of(
                    "meshid",
                    parse_resource_id("meshid", value)?,
                    "mesh object",
                    |r| r.as_object().is_some_and(|o| o.is_mesh_object()),
                )?;
                set_once(&mut self.mesh, mesh, duplicate, "meshid")
            }
            "volumeid" => {
                let volume = ctx.resolve_resource_of(
                    "volumeid",
                    parse_resource_id("volumeid", value)?,
                    "volumedata",
                    |r| matches!(r, Resource::VolumeData(_)),
                )?;
                set_once(&mut self.volume_data, volume, duplicate, "volumeid")
            }
            _ => Ok(()),
        }
    }
}
