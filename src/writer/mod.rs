//! XML writing for 3MF model parts
//!
//! This module serializes the resources of one model part (and, for the root
//! part, the model metadata and build) back into 3MF XML. Extension elements
//! use the fixed prefixes returned by [`Extension::prefix`].

mod beam_lattice;
mod core;
mod implicit;
mod material;
mod slice;
mod volumetric;

use std::collections::BTreeSet;
use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::codec::{Transform, format_transform};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{
    Extension, MetaData, MetaDataGroup, Model, ObjectContent, Resource, ResourceId,
};

/// Output state for one part
pub(crate) struct PartWriter<'a, W: IoWrite> {
    xml: Writer<W>,
    model: &'a Model,
    path: &'a str,
    metadata_prefixes: Vec<(String, String)>,
}

impl<'a, W: IoWrite> PartWriter<'a, W> {
    fn new(model: &'a Model, path: &'a str, writer: W) -> Self {
        Self {
            xml: Writer::new_with_indent(writer, b' ', 2),
            model,
            path,
            metadata_prefixes: Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>, what: &str) -> Result<()> {
        self.xml
            .write_event(event)
            .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", what, e)))
    }

    pub(crate) fn start(&mut self, elem: BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
        self.event(Event::Start(elem), &name)
    }

    pub(crate) fn empty(&mut self, elem: BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
        self.event(Event::Empty(elem), &name)
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)), name)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)), "text")
    }

    /// Id attribute value of a resource of this part
    pub(crate) fn local_id(&self, id: ResourceId) -> Result<u32> {
        match self.model.package_resource_id(id) {
            Some(pid) if pid.path == self.path => Ok(pid.model_resource_id),
            Some(pid) => Err(Error::model(
                ErrorCode::InvalidParam,
                format!(
                    "resource {} lives in {}, it cannot be referenced from {}",
                    id, pid.path, self.path
                ),
            )),
            None => Err(Error::model(
                ErrorCode::ResourceNotFound,
                format!("resource {} is not part of the model", id),
            )),
        }
    }

    /// Id attribute value and, for resources of other parts, their path
    pub(crate) fn reference(&self, id: ResourceId) -> Result<(u32, Option<&'a str>)> {
        let pid = self.model.package_resource_id(id).ok_or_else(|| {
            Error::model(
                ErrorCode::ResourceNotFound,
                format!("resource {} is not part of the model", id),
            )
        })?;
        let path = (pid.path != self.path).then_some(pid.path.as_str());
        Ok((pid.model_resource_id, path))
    }

    /// Prefixed metadata name
    fn metadata_name(&self, entry: &MetaData) -> String {
        if entry.namespace.is_empty() {
            return entry.name.clone();
        }
        let prefix = Extension::from_namespace(&entry.namespace)
            .map(|ext| ext.prefix().to_string())
            .or_else(|| {
                self.metadata_prefixes
                    .iter()
                    .find(|(ns, _)| *ns == entry.namespace)
                    .map(|(_, prefix)| prefix.clone())
            })
            .unwrap_or_default();
        format!("{}:{}", prefix, entry.name)
    }
}

pub(crate) fn push_transform(elem: &mut BytesStart<'_>, transform: &Option<Transform>) {
    if let Some(transform) = transform {
        elem.push_attribute(("transform", format_transform(transform).as_str()));
    }
}

/// Extensions whose elements or attributes appear in the part
fn used_extensions(model: &Model, resources: &[ResourceId], root: bool) -> BTreeSet<Extension> {
    let mut used = BTreeSet::new();
    for (id, resource) in resources
        .iter()
        .filter_map(|id| model.resource(*id).map(|r| (*id, r)))
    {
        match resource {
            Resource::Object(object) => {
                if object.uuid.is_some() {
                    used.insert(Extension::Production);
                }
                if object.slice_stack.is_some() || object.mesh_resolution.is_some() {
                    used.insert(Extension::Slice);
                }
                match &object.content {
                    ObjectContent::Mesh(mesh) => {
                        if mesh.beam_lattice.is_some() {
                            used.insert(Extension::BeamLattice);
                        }
                        if mesh.volume_data.is_some() {
                            used.insert(Extension::Volumetric);
                        }
                    }
                    ObjectContent::Components(components) => {
                        let path = model.package_resource_id(id).map(|p| p.path.as_str());
                        let crosses_parts = components.iter().any(|c| {
                            model.package_resource_id(c.object).map(|p| p.path.as_str()) != path
                        });
                        if crosses_parts || components.iter().any(|c| c.uuid.is_some()) {
                            used.insert(Extension::Production);
                        }
                    }
                    ObjectContent::BoundaryShape(_) => {
                        used.insert(Extension::Volumetric);
                    }
                }
            }
            Resource::BaseMaterials(_) => {}
            Resource::ColorGroup(_)
            | Resource::Texture2D(_)
            | Resource::Texture2DGroup(_)
            | Resource::CompositeMaterials(_)
            | Resource::MultiProperties(_) => {
                used.insert(Extension::Material);
            }
            Resource::SliceStack(_) => {
                used.insert(Extension::Slice);
            }
            Resource::Image3D(_)
            | Resource::FunctionFromImage3D(_)
            | Resource::VolumetricStack(_)
            | Resource::VolumeData(_) => {
                used.insert(Extension::Volumetric);
            }
            Resource::ImplicitFunction(_) => {
                used.insert(Extension::Implicit);
            }
        }
    }
    if root {
        let build = &model.build;
        let root_path = model.root_path();
        let production = build.uuid.is_some()
            || build.items.iter().any(|item| {
                item.uuid.is_some()
                    || model
                        .package_resource_id(item.object)
                        .is_some_and(|p| p.path != root_path)
            });
        if production {
            used.insert(Extension::Production);
        }
        used.extend(
            model
                .metadata()
                .iter()
                .filter_map(|m| Extension::from_namespace(&m.namespace)),
        );
        used.extend(model.required_extensions.iter().copied());
    }
    used.remove(&Extension::Core);
    used
}

/// Namespaces of every metadata entry written into the part
fn metadata_namespaces<'m>(model: &'m Model, resources: &[ResourceId], root: bool) -> Vec<&'m str> {
    let mut groups: Vec<&MetaDataGroup> = resources
        .iter()
        .filter_map(|id| model.resource(*id).and_then(Resource::as_object))
        .map(|object| &object.metadata)
        .collect();
    if root {
        groups.push(model.metadata());
        groups.extend(model.build.items.iter().map(|item| &item.metadata));
    }
    groups
        .into_iter()
        .flat_map(|group| group.iter())
        .map(|entry| entry.namespace.as_str())
        .filter(|ns| !ns.is_empty())
        .collect()
}

/// Write one model part
///
/// The root part carries the model metadata, its resources and the build;
/// any other part carries its resources and an empty build.
pub fn write_model_part<W: IoWrite>(model: &Model, path: &str, writer: W) -> Result<()> {
    let root = path == model.root_path();
    let resources = model.resources_in_part(path);
    let used = used_extensions(model, &resources, root);
    let mut out = PartWriter::new(model, path, writer);

    out.event(
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;

    let mut model_elem = BytesStart::new("model");
    model_elem.push_attribute(("unit", model.unit.to_string().as_str()));
    model_elem.push_attribute(("xml:lang", model.language.as_str()));
    model_elem.push_attribute(("xmlns", Extension::Core.namespace()));
    for ext in &used {
        model_elem.push_attribute((format!("xmlns:{}", ext.prefix()).as_str(), ext.namespace()));
    }
    for namespace in metadata_namespaces(model, &resources, root) {
        let known = Extension::from_namespace(namespace).is_some()
            || out.metadata_prefixes.iter().any(|(ns, _)| ns == namespace);
        if !known {
            let prefix = format!("md{}", out.metadata_prefixes.len());
            out.metadata_prefixes.push((namespace.to_string(), prefix));
        }
    }
    for (namespace, prefix) in &out.metadata_prefixes {
        model_elem.push_attribute((format!("xmlns:{}", prefix).as_str(), namespace.as_str()));
    }
    let required: Vec<&str> = model
        .required_extensions
        .iter()
        .filter(|ext| used.contains(ext))
        .map(|ext| ext.prefix())
        .collect();
    if !required.is_empty() {
        model_elem.push_attribute(("requiredextensions", required.join(" ").as_str()));
    }
    out.start(model_elem)?;

    if root {
        for entry in model.metadata().iter() {
            write_metadata(&mut out, entry)?;
        }
    }

    out.start(BytesStart::new("resources"))?;
    for id in &resources {
        if let Some(resource) = model.resource(*id) {
            write_resource(&mut out, *id, resource)?;
        }
    }
    out.end("resources")?;

    if root {
        core::write_build(&mut out, &model.build)?;
    } else {
        out.empty(BytesStart::new("build"))?;
    }

    out.end("model")?;
    debug!(path, resources = resources.len(), "model part written");
    Ok(())
}

fn write_resource<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    id: ResourceId,
    resource: &Resource,
) -> Result<()> {
    let model_id = out.local_id(id)?;
    match resource {
        Resource::Object(object) => core::write_object(out, model_id, object),
        Resource::BaseMaterials(group) => material::write_base_materials(out, model_id, group),
        Resource::ColorGroup(group) => material::write_color_group(out, model_id, group),
        Resource::Texture2D(texture) => material::write_texture2d(out, model_id, texture),
        Resource::Texture2DGroup(group) => material::write_texture2d_group(out, model_id, group),
        Resource::CompositeMaterials(group) => {
            material::write_composite_materials(out, model_id, group)
        }
        Resource::MultiProperties(group) => material::write_multi_properties(out, model_id, group),
        Resource::SliceStack(stack) => slice::write_slice_stack(out, model_id, stack),
        Resource::Image3D(image) => volumetric::write_image_stack(out, model_id, image),
        Resource::FunctionFromImage3D(function) => {
            volumetric::write_function_from_image(out, model_id, function)
        }
        Resource::VolumetricStack(stack) => {
            volumetric::write_volumetric_stack(out, model_id, stack)
        }
        Resource::VolumeData(data) => volumetric::write_volume_data(out, model_id, data),
        Resource::ImplicitFunction(function) => {
            implicit::write_implicit_function(out, model_id, function)
        }
    }
}

/// Write a metadata entry
fn write_metadata<W: IoWrite>(out: &mut PartWriter<'_, W>, entry: &MetaData) -> Result<()> {
    let name = out.metadata_name(entry);
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", name.as_str()));
    if entry.data_type != crate::model::DEFAULT_METADATA_TYPE {
        elem.push_attribute(("type", entry.data_type.as_str()));
    }
    if entry.preserve {
        elem.push_attribute(("preserve", "1"));
    }
    out.start(elem)?;
    out.text(&entry.value)?;
    out.end("metadata")
}

/// Write a `<metadatagroup>` unless it is empty
pub(crate) fn write_metadata_group<W: IoWrite>(
    out: &mut PartWriter<'_, W>,
    group: &MetaDataGroup,
) -> Result<()> {
    if group.is_empty() {
        return Ok(());
    }
    out.start(BytesStart::new("metadatagroup"))?;
    for entry in group.iter() {
        write_metadata(out, entry)?;
    }
    out.end("metadatagroup")
}
