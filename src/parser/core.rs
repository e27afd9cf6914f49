//! Core 3MF element readers
//!
//! This module handles the `<model>` root and the core elements below it:
//! resources, objects, meshes, vertices, triangles, components and the
//! build section.

use tracing::{debug, trace};

use crate::codec::{parse_coordinate, parse_resource_id, parse_transform};
use crate::error::{Error, ErrorCode, Result};
use crate::model::*;
use crate::warnings::WarningLevel;

use super::beam_lattice::BeamLatticeReader;
use super::context::ParseContext;
use super::dispatch::ElementKind;
use super::implicit::ImplicitFunctionReader;
use super::material::{
    BaseMaterialsReader, ColorGroupReader, CompositeMaterialsReader, MultiPropertiesReader,
    Texture2DGroupReader, Texture2DReader,
};
use super::metadata::{MetadataGroupReader, MetadataReader, record_model_metadata};
use super::node::{NodeState, ReaderNode, StartTag, XmlAttribute, XmlCursor, read_node};
use super::slice::SliceStackReader;
use super::volumetric::{
    BoundaryShapeReader, FunctionFromImage3DReader, ImageStackReader, VolumeDataReader,
    VolumetricStackReader,
};
use super::{index_value, missing_id};

/// Reader of the `<model>` root element
pub struct ModelReader {
    state: NodeState,
    resources_read: bool,
    build_read: bool,
}

impl ModelReader {
    /// Start reading a `<model>` element
    pub fn new(ctx: &mut ParseContext<'_>, tag: &StartTag) -> Result<Self> {
        let state = NodeState::parse_name(tag)?;
        ctx.declare_namespaces(&tag.declarations);
        if tag.namespace == CORE_093_NAMESPACE {
            ctx.warn(
                ErrorCode::Version093NotSupported,
                format!("{} uses the 2013/01 core namespace", ctx.part_path()),
                WarningLevel::InvalidMandatoryValue,
            )?;
        }
        Ok(Self {
            state,
            resources_read: false,
            build_read: false,
        })
    }

    fn read_required_extensions(ctx: &mut ParseContext<'_>, value: &str) -> Result<()> {
        for prefix in value.split_whitespace() {
            let namespace = ctx
                .namespace_for_prefix(prefix)
                .ok_or_else(|| {
                    Error::model(
                        ErrorCode::InvalidRequiredExtensionPrefix,
                        format!("required extension prefix '{}' is not declared", prefix),
                    )
                })?
                .to_string();

            match Extension::from_namespace(&namespace) {
                Some(ext) if ctx.config.supports(&ext) => {
                    if ctx.is_root_part() {
                        ctx.model.required_extensions.insert(ext);
                    }
                }
                Some(ext) => {
                    return Err(Error::UnsupportedExtension(format!(
                        "Extension '{}' (namespace: {}) is required but not supported",
                        ext.name(),
                        ext.namespace()
                    )));
                }
                None => ctx.warn(
                    ErrorCode::RequiredExtensionNotSupported,
                    format!("required extension '{}' is not known", namespace),
                    WarningLevel::InvalidMandatoryValue,
                )?,
            }
        }
        Ok(())
    }
}

impl ReaderNode for ModelReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "unit" => match attr.value.parse::<Unit>() {
                Ok(unit) => {
                    if ctx.is_root_part() {
                        ctx.model.unit = unit;
                    }
                    Ok(())
                }
                Err(e) => ctx.warn(
                    ErrorCode::InvalidModelUnit,
                    e.to_string(),
                    WarningLevel::InvalidMandatoryValue,
                ),
            },
            "requiredextensions" => Self::read_required_extensions(ctx, &attr.value),
            "recommendedextensions" => Ok(()),
            other => ctx.warn(
                ErrorCode::NamespaceInvalidAttribute,
                format!("unknown attribute '{}' on <model>", other),
                WarningLevel::InvalidOptionalValue,
            ),
        }
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if namespace != XML_NAMESPACE {
            return Ok(());
        }
        match attr.name.as_str() {
            "lang" => {
                if ctx.is_root_part() {
                    ctx.model.language = attr.value.clone();
                }
                Ok(())
            }
            "space" => Err(Error::model(
                ErrorCode::ForbiddenXmlAttribute,
                "xml:space is not allowed on <model>",
            )),
            other => ctx.warn(
                ErrorCode::NamespaceInvalidAttribute,
                format!("unknown attribute 'xml:{}' on <model>", other),
                WarningLevel::InvalidOptionalValue,
            ),
        }
    }

    fn on_child_element(
        &mut self,
        ctx: &mut ParseContext<'_>,
        cursor: &mut XmlCursor<'_>,
        tag: StartTag,
    ) -> Result<()> {
        match ctx.kind_of(&tag) {
            Some(ElementKind::Resources) => {
                if self.resources_read {
                    return Err(Error::model(
                        ErrorCode::DuplicateResources,
                        format!("{} has more than one <resources>", ctx.part_path()),
                    ));
                }
                self.resources_read = true;
                let mut reader = ResourcesReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::Build) => {
                if self.build_read {
                    return Err(Error::model(
                        ErrorCode::DuplicateBuildSection,
                        format!("{} has more than one <build>", ctx.part_path()),
                    ));
                }
                self.build_read = true;
                if ctx.config.ignores_build() {
                    return cursor.skip_element(&tag);
                }
                let mut reader = BuildReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::Metadata) => {
                if ctx.config.ignores_metadata() || !ctx.is_root_part() {
                    return cursor.skip_element(&tag);
                }
                let mut reader = MetadataReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                let entry = reader.into_metadata(ctx, cursor)?;
                record_model_metadata(ctx, entry)
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        debug!(
            part = ctx.part_path(),
            resources = ctx.model.resources_in_part(ctx.part_path()).len(),
            "model part read"
        );
        Ok(())
    }
}

/// Reader of `<resources>`, dispatching to the resource readers
struct ResourcesReader {
    state: NodeState,
}

impl ResourcesReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
        })
    }
}

impl ReaderNode for ResourcesReader {
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
            Some(ElementKind::Object) => read_node(&mut ObjectReader::new(&tag)?, ctx, cursor, &tag),
            Some(ElementKind::BaseMaterials) => {
                read_node(&mut BaseMaterialsReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::ColorGroup) => {
                read_node(&mut ColorGroupReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::Texture2D) => {
                read_node(&mut Texture2DReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::Texture2DGroup) => {
                read_node(&mut Texture2DGroupReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::CompositeMaterials) => {
                read_node(&mut CompositeMaterialsReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::MultiProperties) => {
                read_node(&mut MultiPropertiesReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::SliceStack) => {
                read_node(&mut SliceStackReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::ImageStack) => {
                read_node(&mut ImageStackReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::FunctionFromImage3D) => {
                read_node(&mut FunctionFromImage3DReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::VolumetricStack) => {
                read_node(&mut VolumetricStackReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::VolumeData) => {
                read_node(&mut VolumeDataReader::new(&tag)?, ctx, cursor, &tag)
            }
            Some(ElementKind::ImplicitFunction) => {
                read_node(&mut ImplicitFunctionReader::new(&tag)?, ctx, cursor, &tag)
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

/// Reader of `<object>`
struct ObjectReader {
    state: NodeState,
    id: Option<u32>,
    object_type: Option<ObjectType>,
    name: Option<String>,
    part_number: Option<String>,
    thumbnail: Option<String>,
    pid: Option<u32>,
    pindex: Option<usize>,
    uuid: Option<String>,
    slice_stack: Option<u32>,
    mesh_resolution: Option<MeshResolution>,
    metadata: MetaDataGroup,
    content: Option<ObjectContent>,
}

impl ObjectReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            id: None,
            object_type: None,
            name: None,
            part_number: None,
            thumbnail: None,
            pid: None,
            pindex: None,
            uuid: None,
            slice_stack: None,
            mesh_resolution: None,
            metadata: MetaDataGroup::new(),
            content: None,
        })
    }

    fn set_content(&mut self, content: ObjectContent) -> Result<()> {
        if self.content.is_some() {
            return Err(Error::model(
                ErrorCode::AmbiguousObjectDefinition,
                format!(
                    "object {} has more than one of mesh, components and boundary shape",
                    self.id.unwrap_or_default()
                ),
            ));
        }
        self.content = Some(content);
        Ok(())
    }
}

impl ReaderNode for ObjectReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "id" => self.id = Some(parse_resource_id("object id", &attr.value)?),
            "type" => {
                if self.object_type.is_some() {
                    return Err(Error::model(
                        ErrorCode::DuplicateObjectType,
                        "object type given twice",
                    ));
                }
                self.object_type = Some(attr.value.parse()?);
            }
            "name" => self.name = Some(attr.value.clone()),
            "partnumber" => self.part_number = Some(attr.value.clone()),
            "thumbnail" => self.thumbnail = Some(attr.value.clone()),
            "pid" => self.pid = Some(parse_resource_id("object pid", &attr.value)?),
            "pindex" => self.pindex = Some(index_value(attr)?),
            other => ctx.warn(
                ErrorCode::NamespaceInvalidAttribute,
                format!("unknown attribute '{}' on <object>", other),
                WarningLevel::InvalidOptionalValue,
            )?,
        }
        Ok(())
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if ctx.accepts(namespace, Extension::Production) && attr.name == "UUID" {
            self.uuid = Some(attr.value.clone());
        } else if ctx.accepts(namespace, Extension::Slice) {
            match attr.name.as_str() {
                "slicestackid" => {
                    self.slice_stack = Some(parse_resource_id("slicestackid", &attr.value)?)
                }
                "meshresolution" => self.mesh_resolution = Some(attr.value.parse()?),
                _ => {}
            }
        }
        Ok(())
    }

    fn on_attributes_parsed(&mut self, _ctx: &mut ParseContext<'_>) -> Result<()> {
        if self.id.is_none() {
            return Err(missing_id("object"));
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
            Some(ElementKind::Mesh) => {
                let mut reader = MeshReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.set_content(ObjectContent::Mesh(reader.mesh))
            }
            Some(ElementKind::Components) => {
                let own_id = self.id.unwrap_or_default();
                let mut reader = ComponentsReader::new(&tag, own_id)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.set_content(ObjectContent::Components(reader.components))
            }
            Some(ElementKind::BoundaryShape) => {
                let mut reader = BoundaryShapeReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                let shape = reader.into_shape()?;
                self.set_content(ObjectContent::BoundaryShape(shape))
            }
            Some(ElementKind::MetadataGroup) => {
                if ctx.config.ignores_metadata() {
                    return cursor.skip_element(&tag);
                }
                let mut reader = MetadataGroupReader::new(&tag, &mut self.metadata)?;
                read_node(&mut reader, ctx, cursor, &tag)
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        let id = self.id.ok_or_else(|| missing_id("object"))?;
        let content = self.content.take().ok_or_else(|| {
            Error::model(
                ErrorCode::MissingObjectContent,
                format!("object {} has no mesh, components or boundary shape", id),
            )
        })?;

        let mut object = Object::new_components();
        object.content = content;
        object.object_type = self.object_type.unwrap_or_default();
        object.name = self.name.take();
        object.part_number = self.part_number.take();
        object.thumbnail = self.thumbnail.take();
        object.metadata = std::mem::take(&mut self.metadata);
        object.mesh_resolution = self.mesh_resolution;

        if let Some(pid) = self.pid {
            let group = ctx.resolve_property_group(pid)?;
            if let Some(pindex) = self.pindex {
                ctx.check_property_index(group, pindex)?;
            }
            object.pid = Some(group);
            object.pindex = self.pindex;
        }

        if let Some(stack) = self.slice_stack {
            object.slice_stack = Some(ctx.resolve_resource_of(
                "slicestackid",
                stack,
                "slicestack",
                |r| matches!(r, Resource::SliceStack(_)),
            )?);
        }

        match self.uuid.take() {
            Some(uuid) => object.uuid = Some(uuid),
            None if ctx.expects_uuids() => ctx.warn(
                ErrorCode::MissingUuid,
                format!("object {} has no p:UUID", id),
                WarningLevel::MissingMandatoryValue,
            )?,
            None => {}
        }

        let handle = ctx.add_resource(id, Resource::Object(object))?;
        trace!(%handle, id, "object read");
        Ok(())
    }
}

/// Reader of `<mesh>`
struct MeshReader {
    state: NodeState,
    mesh: Mesh,
}

impl MeshReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            mesh: Mesh::new(),
        })
    }
}

impl ReaderNode for MeshReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if ctx.accepts(namespace, Extension::Volumetric) && attr.name == "volumeid" {
            let model_id = parse_resource_id("volumeid", &attr.value)?;
            self.mesh.volume_data = Some(ctx.resolve_resource_of(
                "volumeid",
                model_id,
                "volumedata",
                |r| matches!(r, Resource::VolumeData(_)),
            )?);
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
            Some(ElementKind::Vertices) => {
                let mut reader = VerticesReader {
                    state: NodeState::parse_name(&tag)?,
                    mesh: &mut self.mesh,
                };
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::Triangles) => {
                let mut reader = TrianglesReader {
                    state: NodeState::parse_name(&tag)?,
                    mesh: &mut self.mesh,
                };
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::BeamLattice) => {
                let mut reader = BeamLatticeReader::new(&tag, self.mesh.vertices.len())?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                self.mesh.beam_lattice = Some(reader.into_lattice()?);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct VerticesReader<'m> {
    state: NodeState,
    mesh: &'m mut Mesh,
}

impl ReaderNode for VerticesReader<'_> {
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
            Some(ElementKind::Vertex) => {
                let mut reader = VertexReader {
                    state: NodeState::parse_name(&tag)?,
                    coordinates: [None; 3],
                };
                read_node(&mut reader, ctx, cursor, &tag)?;
                let vertex = reader.vertex()?;
                self.mesh.vertices.push(vertex);
                ctx.tick()
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct VertexReader {
    state: NodeState,
    coordinates: [Option<f32>; 3],
}

impl VertexReader {
    fn vertex(&self) -> Result<Vertex> {
        match self.coordinates {
            [Some(x), Some(y), Some(z)] => Ok(Vertex::new(x, y, z)),
            _ => Err(Error::model(
                ErrorCode::ModelCoordinateMissing,
                "vertex needs x, y and z",
            )),
        }
    }
}

impl ReaderNode for VertexReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        let slot = match attr.name.as_str() {
            "x" => 0,
            "y" => 1,
            "z" => 2,
            other => {
                return ctx.warn(
                    ErrorCode::NamespaceInvalidAttribute,
                    format!("unknown attribute '{}' on <vertex>", other),
                    WarningLevel::InvalidOptionalValue,
                );
            }
        };
        self.coordinates[slot] = Some(parse_coordinate(&attr.name, &attr.value)?);
        Ok(())
    }
}

struct TrianglesReader<'m> {
    state: NodeState,
    mesh: &'m mut Mesh,
}

impl ReaderNode for TrianglesReader<'_> {
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
            Some(ElementKind::Triangle) => {
                let mut reader = TriangleReader {
                    state: NodeState::parse_name(&tag)?,
                    vertices: [None; 3],
                    properties: [None; 3],
                    pid: None,
                };
                read_node(&mut reader, ctx, cursor, &tag)?;
                if let Some(triangle) = reader.triangle(ctx)? {
                    self.mesh.add_triangle(triangle)?;
                }
                ctx.tick()
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct TriangleReader {
    state: NodeState,
    vertices: [Option<usize>; 3],
    properties: [Option<usize>; 3],
    pid: Option<u32>,
}

impl TriangleReader {
    /// The triangle, or `None` if it is degenerate and was skipped
    fn triangle(&self, ctx: &mut ParseContext<'_>) -> Result<Option<Triangle>> {
        let [Some(v1), Some(v2), Some(v3)] = self.vertices else {
            return Err(Error::model(
                ErrorCode::InvalidModelNodeIndex,
                "triangle needs v1, v2 and v3",
            ));
        };
        let mut triangle = Triangle::new(v1, v2, v3);
        if triangle.is_degenerate() {
            ctx.warn(
                ErrorCode::DegenerateTriangle,
                format!("degenerate triangle ({}, {}, {}) skipped", v1, v2, v3),
                WarningLevel::InvalidMandatoryValue,
            )?;
            return Ok(None);
        }

        if let Some(pid) = self.pid {
            let group = ctx.resolve_property_group(pid)?;
            for index in self.properties.iter().flatten() {
                ctx.check_property_index(group, *index)?;
            }
            triangle.pid = Some(group);
        }
        [triangle.p1, triangle.p2, triangle.p3] = self.properties;
        Ok(Some(triangle))
    }
}

impl ReaderNode for TriangleReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "v1" => self.vertices[0] = Some(index_value(attr)?),
            "v2" => self.vertices[1] = Some(index_value(attr)?),
            "v3" => self.vertices[2] = Some(index_value(attr)?),
            "p1" => self.properties[0] = Some(index_value(attr)?),
            "p2" => self.properties[1] = Some(index_value(attr)?),
            "p3" => self.properties[2] = Some(index_value(attr)?),
            "pid" => self.pid = Some(parse_resource_id("triangle pid", &attr.value)?),
            _ => {}
        }
        Ok(())
    }
}

/// Reader of `<components>`
struct ComponentsReader {
    state: NodeState,
    owner: u32,
    components: Vec<Component>,
}

impl ComponentsReader {
    fn new(tag: &StartTag, owner: u32) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            owner,
            components: Vec::new(),
        })
    }
}

impl ReaderNode for ComponentsReader {
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
            Some(ElementKind::Component) => {
                let mut reader = ComponentReader {
                    state: NodeState::parse_name(&tag)?,
                    object_id: None,
                    transform: None,
                    uuid: None,
                    path: None,
                };
                read_node(&mut reader, ctx, cursor, &tag)?;
                let component = reader.component(ctx, self.owner)?;
                self.components.push(component);
                Ok(())
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}

struct ComponentReader {
    state: NodeState,
    object_id: Option<u32>,
    transform: Option<[f64; 12]>,
    uuid: Option<String>,
    path: Option<String>,
}

impl ComponentReader {
    fn component(&mut self, ctx: &mut ParseContext<'_>, owner: u32) -> Result<Component> {
        let object_id = self
            .object_id
            .ok_or_else(|| Error::missing_attribute("component", "objectid"))?;

        let target = match self.path.as_deref() {
            Some(_) if !ctx.is_root_part() => {
                return Err(Error::model(
                    ErrorCode::ReferencesTooDeep,
                    format!("component p:path used in {}", ctx.part_path()),
                ));
            }
            Some(path) => ctx.model.find_package_resource_id(path, object_id),
            None if object_id == owner => {
                return Err(Error::model(
                    ErrorCode::ForbiddenCyclicReference,
                    format!("object {} references itself", owner),
                ));
            }
            None => ctx.find_resource(object_id),
        };

        let object = target.ok_or_else(|| {
            Error::model(
                ErrorCode::CouldNotFindComponentObject,
                format!("component references unknown object {}", object_id),
            )
        })?;
        if ctx.model.object(object).is_none() {
            return Err(Error::model(
                ErrorCode::InvalidModelResource,
                format!("component target {} is not an object", object_id),
            ));
        }

        let mut component = Component::new(object);
        component.transform = self.transform;
        component.uuid = self.uuid.take();
        Ok(component)
    }
}

impl ReaderNode for ComponentReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "objectid" => {
                if self.object_id.is_some() {
                    return Err(Error::model(
                        ErrorCode::DuplicateComponentObjectId,
                        "component objectid given twice",
                    ));
                }
                self.object_id = Some(parse_resource_id("component objectid", &attr.value)?);
            }
            "transform" => self.transform = Some(parse_transform("transform", &attr.value)?),
            _ => {}
        }
        Ok(())
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if ctx.accepts(namespace, Extension::Production) {
            match attr.name.as_str() {
                "UUID" => self.uuid = Some(attr.value.clone()),
                "path" => self.path = Some(attr.value.clone()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Reader of `<build>`
struct BuildReader {
    state: NodeState,
    uuid: Option<String>,
}

impl BuildReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            uuid: None,
        })
    }
}

impl ReaderNode for BuildReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if ctx.accepts(namespace, Extension::Production) && attr.name == "UUID" {
            self.uuid = Some(attr.value.clone());
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
            Some(ElementKind::Item) => {
                let mut reader = ItemReader::new(&tag)?;
                read_node(&mut reader, ctx, cursor, &tag)?;
                let item = reader.into_item(ctx)?;
                if ctx.is_root_part() {
                    ctx.model.add_build_item(item)
                } else {
                    debug!(part = ctx.part_path(), "ignoring build item outside the root part");
                    Ok(())
                }
            }
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }

    fn on_end_element(&mut self, ctx: &mut ParseContext<'_>) -> Result<()> {
        if !ctx.is_root_part() {
            return Ok(());
        }
        match self.uuid.take() {
            Some(uuid) => {
                ctx.model.register_uuid(&uuid)?;
                ctx.model.build.uuid = Some(uuid);
            }
            None if ctx.expects_uuids() => ctx.warn(
                ErrorCode::MissingUuid,
                "build has no p:UUID",
                WarningLevel::MissingMandatoryValue,
            )?,
            None => {}
        }
        Ok(())
    }
}

/// Reader of a build `<item>`
struct ItemReader {
    state: NodeState,
    object_id: Option<u32>,
    transform: Option<[f64; 12]>,
    part_number: Option<String>,
    uuid: Option<String>,
    path: Option<String>,
    metadata: MetaDataGroup,
}

impl ItemReader {
    fn new(tag: &StartTag) -> Result<Self> {
        Ok(Self {
            state: NodeState::parse_name(tag)?,
            object_id: None,
            transform: None,
            part_number: None,
            uuid: None,
            path: None,
            metadata: MetaDataGroup::new(),
        })
    }

    fn into_item(self, ctx: &mut ParseContext<'_>) -> Result<BuildItem> {
        let object_id = self.object_id.ok_or_else(|| {
            Error::model(
                ErrorCode::MissingBuildItemObjectId,
                "build item has no objectid",
            )
        })?;

        let target = match self.path.as_deref() {
            Some(_) if !ctx.is_root_part() => {
                return Err(Error::model(
                    ErrorCode::ReferencesTooDeep,
                    format!("build item p:path used in {}", ctx.part_path()),
                ));
            }
            Some(path) => ctx.model.find_package_resource_id(path, object_id),
            None => ctx.find_resource(object_id),
        };
        let object = target.ok_or_else(|| {
            Error::model(
                ErrorCode::CouldNotFindBuildItemObject,
                format!("build item references unknown object {}", object_id),
            )
        })?;

        match ctx.model.object(object).map(|o| o.object_type) {
            None => {
                return Err(Error::model(
                    ErrorCode::InvalidModelResource,
                    format!("build item target {} is not an object", object_id),
                ));
            }
            Some(ObjectType::Other) => ctx.warn(
                ErrorCode::InvalidBuildItemObjectType,
                format!("build item references object {} of type other", object_id),
                WarningLevel::InvalidMandatoryValue,
            )?,
            Some(_) => {}
        }

        let mut item = BuildItem::new(object);
        item.transform = self.transform;
        item.part_number = self.part_number;
        item.metadata = self.metadata;
        match self.uuid {
            Some(uuid) => item.uuid = Some(uuid),
            None if ctx.expects_uuids() => ctx.warn(
                ErrorCode::MissingUuid,
                format!("build item for object {} has no p:UUID", object_id),
                WarningLevel::MissingMandatoryValue,
            )?,
            None => {}
        }
        Ok(item)
    }
}

impl ReaderNode for ItemReader {
    fn state(&mut self) -> &mut NodeState {
        &mut self.state
    }

    fn on_attribute(&mut self, ctx: &mut ParseContext<'_>, attr: &XmlAttribute) -> Result<()> {
        match attr.name.as_str() {
            "objectid" => {
                if self.object_id.is_some() {
                    return Err(Error::model(
                        ErrorCode::DuplicateBuildItemObjectId,
                        "build item objectid given twice",
                    ));
                }
                self.object_id = Some(parse_resource_id("item objectid", &attr.value)?);
            }
            "transform" => self.transform = Some(parse_transform("transform", &attr.value)?),
            "partnumber" => self.part_number = Some(attr.value.clone()),
            other => ctx.warn(
                ErrorCode::NamespaceInvalidAttribute,
                format!("unknown attribute '{}' on <item>", other),
                WarningLevel::InvalidOptionalValue,
            )?,
        }
        Ok(())
    }

    fn on_ns_attribute(
        &mut self,
        ctx: &mut ParseContext<'_>,
        attr: &XmlAttribute,
        namespace: &str,
    ) -> Result<()> {
        if ctx.accepts(namespace, Extension::Production) {
            match attr.name.as_str() {
                "UUID" => self.uuid = Some(attr.value.clone()),
                "path" => self.path = Some(attr.value.clone()),
                _ => {}
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
            Some(ElementKind::MetadataGroup) if !ctx.config.ignores_metadata() => {
                let mut reader = MetadataGroupReader::new(&tag, &mut self.metadata)?;
                read_node(&mut reader, ctx, cursor, &tag)
            }
            Some(ElementKind::MetadataGroup) => cursor.skip_element(&tag),
            _ => ctx.skip_unknown(cursor, &tag),
        }
    }
}
