//! Materials and properties readers
//!
//! Base materials live in the core namespace; color groups, textures,
//! composites and multi properties in the materials namespace. Every group
//! is registered with the model once its element ends.

use crate::codec::{parse_color, parse_f64, parse_resource_id};
use crate::error::{Error, ErrorCode, Result};
use crate::model::*;
use crate::warnings::WarningLevel;

use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::node::{AttributeReader, NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor};
use super::{index_list, require_id};

/// Reader of `<basematerials>`
pub(super) struct BaseMaterialsReader {
    state: NodeState,
    id: Option<u32>,
    group: BaseMaterials,
}

impl BaseMaterialsReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            group: BaseMaterials::default(),
        })
    }
}

impl ReaderNode for BaseMaterialsReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        if attr.name == "id" {
            self.id = Some(parse_resource_id("basematerials id", &attr.value)?);
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
            Some(ElementKind::Base) => {
                let base = AttributeReader::read(ctx, cursor, &tag)?;
                let name = base.require("name")?;
                let color = parse_color(base.require("displaycolor")?)?;
                self.group.materials.push(BaseMaterial::new(name, color));
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("basematerials", self.id)?;
        ctx.add_resource(id, Resource::BaseMaterials(std::mem::take(&mut self.group)))?;
        Ok(())
    }
}

/// Reader of `<m:colorgroup>`
pub(super) struct ColorGroupReader {
    state: NodeState,
    id: Option<u32>,
    group: ColorGroup,
}

impl ColorGroupReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            group: ColorGroup::default(),
        })
    }
}

impl ReaderNode for ColorGroupReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        if attr.name == "id" {
            self.id = Some(parse_resource_id("colorgroup id", &attr.value)?);
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
            Some(ElementKind::Color) => {
                let color = AttributeReader::read(ctx, cursor, &tag)?;
                self.group.colors.push(parse_color(color.require("color")?)?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("colorgroup", self.id)?;
        ctx.add_resource(id, Resource::ColorGroup(std::mem::take(&mut self.group)))?;
        Ok(())
    }
}

/// Reader of `<m:texture2d>`
pub(super) struct Texture2DReader {
    state: NodeState,
    id: Option<u32>,
    path: Option<String>,
    content_type: Option<String>,
    tile_style_u: TileStyle,
    tile_style_v: TileStyle,
    filter: FilterMode,
}

impl Texture2DReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            path: None,
            content_type: None,
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
            filter: FilterMode::Auto,
        })
    }
}

impl ReaderNode for Texture2DReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("texture2d id", &attr.value)?),
            "path" => self.path = Some(attr.value.clone()),
            "contenttype" => self.content_type = Some(attr.value.clone()),
            "tilestyleu" => self.tile_style_u = attr.value.parse()?,
            "tilestylev" => self.tile_style_v = attr.value.parse()?,
            "filter" => self.filter = attr.value.parse()?,
            _ => {}
        }
        Ok(())
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("texture2d", self.id)?;
        let path = self
            .path
            .take()
            .ok_or_else(|| Error::missing_attribute("texture2d", "path"))?;
        let content_type = self
            .content_type
            .take()
            .ok_or_else(|| Error::missing_attribute("texture2d", "contenttype"))?;

        if ctx.model.attachment(&path).is_none() {
            ctx.warn(
                ErrorCode::AttachmentNotFound,
                format!("texture {} is not in the package", path),
                WarningLevel::InvalidMandatoryValue,
            )?;
        }

        let mut texture = Texture2D::new(path, content_type);
        texture.tile_style_u = self.tile_style_u;
        texture.tile_style_v = self.tile_style_v;
        texture.filter = self.filter;
        ctx.add_resource(id, Resource::Texture2D(texture))?;
        Ok(())
    }
}

/// Reader of `<m:texture2dgroup>`
pub(super) struct Texture2DGroupReader {
    state: NodeState,
    id: Option<u32>,
    texture: Option<ResourceId>,
    coords: Vec<Tex2Coord>,
}

impl Texture2DGroupReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            texture: None,
            coords: Vec::new(),
        })
    }
}

impl ReaderNode for Texture2DGroupReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("texture2dgroup id", &attr.value)?),
            "texid" => {
                let texid = parse_resource_id("texid", &attr.value)?;
                self.texture = Some(ctx.resolve_resource_of("texid", texid, "texture2d", |r| {
                    matches!(r, Resource::Texture2D(_))
                })?);
            }
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
            Some(ElementKind::Tex2Coord) => {
                let coord = AttributeReader::read(ctx, cursor, &tag)?;
                self.coords.push(Tex2Coord {
                    u: parse_f64("u", coord.require("u")?)?,
                    v: parse_f64("v", coord.require("v")?)?,
                });
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("texture2dgroup", self.id)?;
        let texture = self
            .texture
            .ok_or_else(|| Error::missing_attribute("texture2dgroup", "texid"))?;
        let group = Texture2DGroup {
            texture,
            coords: std::mem::take(&mut self.coords),
        };
        ctx.add_resource(id, Resource::Texture2DGroup(group))?;
        Ok(())
    }
}

/// Reader of `<m:compositematerials>`
pub(super) struct CompositeMaterialsReader {
    state: NodeState,
    id: Option<u32>,
    base_materials: Option<ResourceId>,
    mat_indices: Option<Vec<usize>>,
    composites: Vec<Vec<f64>>,
}

impl CompositeMaterialsReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            base_materials: None,
            mat_indices: None,
            composites: Vec::new(),
        })
    }
}

impl ReaderNode for CompositeMaterialsReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("compositematerials id", &attr.value)?),
            "matid" => {
                let matid = parse_resource_id("matid", &attr.value)?;
                self.base_materials =
                    Some(ctx.resolve_resource_of("matid", matid, "basematerials", |r| {
                        matches!(r, Resource::BaseMaterials(_))
                    })?);
            }
            "matindices" => self.mat_indices = Some(index_list("matindices", &attr.value)?),
            _ => {}
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let base = self
            .base_materials
            .ok_or_else(|| Error::missing_attribute("compositematerials", "matid"))?;
        let indices = self
            .mat_indices
            .as_ref()
            .ok_or_else(|| Error::missing_attribute("compositematerials", "matindices"))?;
        for index in indices {
            ctx.check_property_index(base, *index)?;
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
            Some(ElementKind::Composite) => {
                let composite = AttributeReader::read(ctx, cursor, &tag)?;
                let values = composite
                    .require("values")?
                    .split_whitespace()
                    .map(|v| parse_f64("composite values", v))
                    .collect::<Result<Vec<_>>>()?;
                let expected = self.mat_indices.as_ref().map_or(0, Vec::len);
                if values.len() != expected {
                    return Err(Error::model(
                        ErrorCode::InvalidParam,
                        format!(
                            "composite has {} values for {} materials",
                            values.len(),
                            expected
                        ),
                    ));
                }
                self.composites.push(values);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("compositematerials", self.id)?;
        let group = CompositeMaterials {
            base_materials: self
                .base_materials
                .ok_or_else(|| Error::missing_attribute("compositematerials", "matid"))?,
            mat_indices: self.mat_indices.take().unwrap_or_default(),
            composites: std::mem::take(&mut self.composites),
        };
        ctx.add_resource(id, Resource::CompositeMaterials(group))?;
        Ok(())
    }
}

/// Reader of `<m:multiproperties>`
pub(super) struct MultiPropertiesReader {
    state: NodeState,
    id: Option<u32>,
    pids: Vec<ResourceId>,
    blend_methods: Vec<BlendMethod>,
    multis: Vec<Vec<usize>>,
}

impl MultiPropertiesReader {
    pub(super) fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            pids: Vec::new(),
            blend_methods: Vec::new(),
            multis: Vec::new(),
        })
    }
}

impl ReaderNode for MultiPropertiesReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("multiproperties id", &attr.value)?),
            "pids" => {
                for text in attr.value.split_whitespace() {
                    let pid = ctx.resolve_property_group(parse_resource_id("pids", text)?)?;
                    if matches!(ctx.model.resource(pid), Some(Resource::MultiProperties(_))) {
                        return Err(Error::model(
                            ErrorCode::InvalidModelResource,
                            "multiproperties cannot reference other multiproperties",
                        ));
                    }
                    self.pids.push(pid);
                }
            }
            "blendmethods" => {
                self.blend_methods = attr
                    .value
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<Vec<BlendMethod>>>()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, _ctx: &mut ParseContext<'_>) -> Result<()> {
        if self.pids.is_empty() {
            return Err(Error::missing_attribute("multiproperties", "pids"));
        }
        if !self.blend_methods.is_empty() && self.blend_methods.len() != self.pids.len() - 1 {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!(
                    "{} blend methods given for {} property groups",
                    self.blend_methods.len(),
                    self.pids.len()
                ),
            ));
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
            Some(ElementKind::Multi) => {
                let multi = AttributeReader::read(ctx, cursor, &tag)?;
                let indices = index_list("pindices", multi.require("pindices")?)?;
                if indices.len() > self.pids.len() {
                    return Err(Error::model(
                        ErrorCode::InvalidParam,
                        format!(
                            "multi has {} indices for {} property groups",
                            indices.len(),
                            self.pids.len()
                        ),
                    ));
                }
                for (pid, index) in self.pids.iter().zip(&indices) {
                    ctx.check_property_index(*pid, *index)?;
                }
                self.multis.push(indices);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = require_id("multiproperties", self.id)?;
        let mut blend_methods = std::mem::take(&mut self.blend_methods);
        if blend_methods.is_empty() {
            blend_methods = vec![BlendMethod::Mix; self.pids.len() - 1];
        }
        let group = MultiProperties {
            pids: std::mem::take(&mut self.pids),
            blend_methods,
            multis: std::mem::take(&mut self.multis),
        };
        ctx.add_resource(id, Resource::MultiProperties(group))?;
        Ok(())
    }
}

