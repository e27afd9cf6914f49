//! The model document and its resource arena

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::codec::{MAX_RESOURCE_ID, is_valid_uuid};
use crate::error::{Error, ErrorCode, Result};
use crate::implicit::ImplicitFunction;

use super::core::{Build, BuildItem, Component, Extension, Object, ObjectContent, Unit};
use super::material::{BaseMaterials, ColorGroup, CompositeMaterials, MultiProperties, Texture2D, Texture2DGroup};
use super::metadata::MetaDataGroup;
use super::resources::{Attachment, PackageResourceId, Resource, ResourceId};
use super::slice::SliceStack;
use super::volumetric::{FunctionFromImage3D, Image3D, VolumeData, VolumetricStack};

/// Path of the root model part
pub const ROOT_MODEL_PATH: &str = "/3D/3dmodel.model";

/// Default `xml:lang` of a model
pub const DEFAULT_LANGUAGE: &str = "und";

/// A 3MF document
///
/// Owns every resource in an arena keyed by [`ResourceId`]. Handles are
/// handed out in increasing order starting at 1 and are never reused. Each
/// resource also has a [`PackageResourceId`], the `(part path, id)` pair it
/// is known by inside the package.
#[derive(Debug, Clone)]
pub struct Model {
    /// Unit of measurement
    pub unit: Unit,
    /// `xml:lang` of the root part
    pub language: String,
    /// Extensions listed in `requiredextensions`
    pub required_extensions: BTreeSet<Extension>,
    /// Build section
    pub build: Build,
    metadata: MetaDataGroup,
    root_path: String,
    resources: BTreeMap<ResourceId, Resource>,
    package_ids: HashMap<ResourceId, PackageResourceId>,
    by_package: HashMap<(String, u32), ResourceId>,
    next_id: u32,
    uuids: HashSet<String>,
    attachments: BTreeMap<String, Attachment>,
}

/// UUIDs carried by an object and its components
fn object_uuids(object: &Object) -> impl Iterator<Item = &str> {
    let components = object.components().unwrap_or_default();
    object
        .uuid
        .as_deref()
        .into_iter()
        .chain(components.iter().filter_map(|c| c.uuid.as_deref()))
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! typed_getters {
    ($($(#[$doc:meta])* $name:ident => $variant:ident($ty:ty),)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&self, id: ResourceId) -> Option<&$ty> {
                match self.resources.get(&id)? {
                    Resource::$variant(value) => Some(value),
                    _ => None,
                }
            }
        )*
    };
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            unit: Unit::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            required_extensions: BTreeSet::new(),
            build: Build::new(),
            metadata: MetaDataGroup::new(),
            root_path: ROOT_MODEL_PATH.to_string(),
            resources: BTreeMap::new(),
            package_ids: HashMap::new(),
            by_package: HashMap::new(),
            next_id: 1,
            uuids: HashSet::new(),
            attachments: BTreeMap::new(),
        }
    }

    /// Path of the root model part
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Move the root model part, only possible while the model has no resources
    pub fn set_root_path(&mut self, path: &str) -> Result<()> {
        if !path.starts_with('/') {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("root part path '{}' must be absolute", path),
            ));
        }
        if !self.resources.is_empty() {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                "root part cannot move once resources exist",
            ));
        }
        self.root_path = path.to_string();
        Ok(())
    }

    /// Model level metadata
    pub fn metadata(&self) -> &MetaDataGroup {
        &self.metadata
    }

    /// Mutable model level metadata
    pub fn metadata_mut(&mut self) -> &mut MetaDataGroup {
        &mut self.metadata
    }

    /// Add a resource known as `model_id` inside part `path`
    ///
    /// # Errors
    ///
    /// `InvalidParam` if `model_id` is 0 or above 2147483647,
    /// `DuplicateResourceId` if the part already has a resource with that id,
    /// `DuplicateUuid` if an object or one of its components reuses a UUID.
    pub fn add_resource(
        &mut self,
        path: &str,
        model_id: u32,
        resource: Resource,
    ) -> Result<ResourceId> {
        if model_id == 0 || model_id > MAX_RESOURCE_ID {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("resource id {} out of range", model_id),
            ));
        }
        let key = (path.to_string(), model_id);
        if self.by_package.contains_key(&key) {
            return Err(Error::model(
                ErrorCode::DuplicateResourceId,
                format!("resource id {} already used in {}", model_id, path),
            ));
        }

        if let Resource::Object(object) = &resource {
            self.register_uuids(object_uuids(object))?;
        }

        let id = ResourceId::new(self.next_id);
        self.next_id += 1;
        trace!(%id, part = path, model_id, kind = resource.kind(), "adding resource");
        self.by_package.insert(key, id);
        self.package_ids.insert(
            id,
            PackageResourceId {
                path: path.to_string(),
                model_resource_id: model_id,
                unique_id: id,
            },
        );
        self.resources.insert(id, resource);
        Ok(id)
    }

    /// Add a resource to the root part under the next free id
    pub fn add(&mut self, resource: Resource) -> Result<ResourceId> {
        let path = self.root_path.clone();
        let model_id = self.next_model_resource_id(&path);
        self.add_resource(&path, model_id, resource)
    }

    /// Smallest id above every id used in part `path`
    pub fn next_model_resource_id(&self, path: &str) -> u32 {
        self.package_ids
            .values()
            .filter(|p| p.path == path)
            .map(|p| p.model_resource_id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Handle of the resource known as `model_id` in part `path`
    pub fn find_package_resource_id(&self, path: &str, model_id: u32) -> Option<ResourceId> {
        self.by_package.get(&(path.to_string(), model_id)).copied()
    }

    /// Package identity of a resource
    pub fn package_resource_id(&self, id: ResourceId) -> Option<&PackageResourceId> {
        self.package_ids.get(&id)
    }

    /// Resource by handle
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Mutable resource by handle
    pub fn resource_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    /// All resources in handle order
    pub fn resources(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter().map(|(id, r)| (*id, r))
    }

    /// Number of resources
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    typed_getters! {
        /// Object by handle
        object => Object(Object),
        /// Base materials by handle
        base_materials => BaseMaterials(BaseMaterials),
        /// Color group by handle
        color_group => ColorGroup(ColorGroup),
        /// Texture by handle
        texture2d => Texture2D(Texture2D),
        /// Texture coordinate group by handle
        texture2d_group => Texture2DGroup(Texture2DGroup),
        /// Composite materials by handle
        composite_materials => CompositeMaterials(CompositeMaterials),
        /// Multi properties by handle
        multi_properties => MultiProperties(MultiProperties),
        /// Slice stack by handle
        slice_stack => SliceStack(SliceStack),
        /// Image stack by handle
        image3d => Image3D(Image3D),
        /// Implicit function by handle
        implicit_function => ImplicitFunction(ImplicitFunction),
        /// Image function by handle
        function_from_image3d => FunctionFromImage3D(FunctionFromImage3D),
        /// Volumetric stack by handle
        volumetric_stack => VolumetricStack(VolumetricStack),
        /// Volume data by handle
        volume_data => VolumeData(VolumeData),
    }

    /// Mutable object by handle
    pub fn object_mut(&mut self, id: ResourceId) -> Option<&mut Object> {
        match self.resources.get_mut(&id)? {
            Resource::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Mutable implicit function by handle
    pub fn implicit_function_mut(&mut self, id: ResourceId) -> Option<&mut ImplicitFunction> {
        match self.resources.get_mut(&id)? {
            Resource::ImplicitFunction(function) => Some(function),
            _ => None,
        }
    }

    /// Remove a resource; its handle is not handed out again
    pub fn remove_resource(&mut self, id: ResourceId) -> Option<Resource> {
        let resource = self.resources.remove(&id)?;
        if let Some(package_id) = self.package_ids.remove(&id) {
            self.by_package
                .remove(&(package_id.path, package_id.model_resource_id));
        }
        if let Resource::Object(object) = &resource {
            for uuid in object_uuids(object) {
                self.unregister_uuid(uuid);
            }
        }
        debug!(%id, kind = resource.kind(), "removed resource");
        Some(resource)
    }

    /// Distinct part paths holding resources, root part first
    pub fn part_paths(&self) -> Vec<&str> {
        let others: BTreeSet<&str> = self
            .package_ids
            .values()
            .map(|p| p.path.as_str())
            .filter(|p| *p != self.root_path)
            .collect();
        std::iter::once(self.root_path.as_str())
            .chain(others)
            .collect()
    }

    /// Handles of the resources in part `path`, in handle order
    pub fn resources_in_part(&self, path: &str) -> Vec<ResourceId> {
        self.resources
            .keys()
            .copied()
            .filter(|id| {
                self.package_ids
                    .get(id)
                    .is_some_and(|p| p.path == path)
            })
            .collect()
    }

    /// Register a UUID, which must be unique across the document
    pub fn register_uuid(&mut self, uuid: &str) -> Result<()> {
        if !is_valid_uuid(uuid) {
            return Err(Error::model(
                ErrorCode::InvalidUuid,
                format!("'{}' is not a UUID", uuid),
            ));
        }
        if !self.uuids.insert(uuid.to_ascii_lowercase()) {
            return Err(Error::model(
                ErrorCode::DuplicateUuid,
                format!("UUID {} is already used", uuid),
            ));
        }
        Ok(())
    }

    /// Release a UUID, returning whether it was registered
    pub fn unregister_uuid(&mut self, uuid: &str) -> bool {
        self.uuids.remove(&uuid.to_ascii_lowercase())
    }

    /// True if the UUID is registered
    pub fn has_uuid(&self, uuid: &str) -> bool {
        self.uuids.contains(&uuid.to_ascii_lowercase())
    }

    /// Register every UUID or none of them
    fn register_uuids<'u>(&mut self, uuids: impl IntoIterator<Item = &'u str>) -> Result<()> {
        let mut registered = Vec::new();
        for uuid in uuids {
            if let Err(e) = self.register_uuid(uuid) {
                for done in registered {
                    self.unregister_uuid(done);
                }
                return Err(e);
            }
            registered.push(uuid);
        }
        Ok(())
    }

    /// True if `from` reaches `to` through component references
    fn component_path_exists(&self, from: ResourceId, to: ResourceId) -> bool {
        let mut stack = vec![from];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(components) = self.object(current).and_then(Object::components) {
                stack.extend(components.iter().map(|c| c.object));
            }
        }
        false
    }

    /// Append a component to a components object
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if the component's object does not exist,
    /// `InvalidParam` if `holder` is not a components object and
    /// `ForbiddenCyclicReference` if the component would make `holder`
    /// contain itself and `DuplicateUuid` if its UUID is already used.
    pub fn add_component(&mut self, holder: ResourceId, component: Component) -> Result<()> {
        if self.object(component.object).is_none() {
            return Err(Error::model(
                ErrorCode::ResourceNotFound,
                format!("component object {} not found", component.object),
            ));
        }
        if !self.object(holder).is_some_and(Object::is_components_object) {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("{} is not a components object", holder),
            ));
        }
        if self.component_path_exists(component.object, holder) {
            return Err(Error::model(
                ErrorCode::ForbiddenCyclicReference,
                format!("component {} would make {} contain itself", component.object, holder),
            ));
        }
        if let Some(uuid) = &component.uuid {
            self.register_uuid(uuid)?;
        }
        if let Some(Object {
            content: ObjectContent::Components(components),
            ..
        }) = self.object_mut(holder)
        {
            components.push(component);
        }
        Ok(())
    }

    /// Append a build item; its object must exist and its UUID be unused
    pub fn add_build_item(&mut self, item: BuildItem) -> Result<()> {
        if self.object(item.object).is_none() {
            return Err(Error::model(
                ErrorCode::ResourceNotFound,
                format!("build item object {} not found", item.object),
            ));
        }
        if let Some(uuid) = &item.uuid {
            self.register_uuid(uuid)?;
        }
        self.build.items.push(item);
        Ok(())
    }

    /// Add an attachment; paths are unique
    pub fn add_attachment(&mut self, attachment: Attachment) -> Result<()> {
        if !attachment.path.starts_with('/') {
            return Err(Error::model(
                ErrorCode::InvalidParam,
                format!("attachment path '{}' must be absolute", attachment.path),
            ));
        }
        if self.attachments.contains_key(&attachment.path) {
            return Err(Error::model(
                ErrorCode::DuplicateAttachment,
                format!("attachment {} already exists", attachment.path),
            ));
        }
        self.attachments.insert(attachment.path.clone(), attachment);
        Ok(())
    }

    /// Attachment by path
    pub fn attachment(&self, path: &str) -> Option<&Attachment> {
        self.attachments.get(path)
    }

    /// Remove an attachment
    pub fn remove_attachment(&mut self, path: &str) -> Option<Attachment> {
        self.attachments.remove(path)
    }

    /// Attachments in path order
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.values()
    }

    /// Check function references and order functions callee first
    ///
    /// Follows `functioncall` nodes to the functions they invoke and checks
    /// that `mesh` nodes sample mesh objects. Every implicit function, and
    /// every image function that is called, appears after the functions it
    /// calls.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for calls to missing resources,
    /// `InvalidModelResource` for calls to non-functions or mesh nodes
    /// sampling something other than a mesh object, and `CyclicGraph` when
    /// functions call each other recursively.
    pub fn resolve_function_calls(&self) -> Result<Vec<ResourceId>> {
        let mut callees: BTreeMap<ResourceId, Vec<ResourceId>> = BTreeMap::new();
        for (id, resource) in self.resources() {
            let Resource::ImplicitFunction(function) = resource else {
                continue;
            };
            for mesh in function.referenced_meshes() {
                if !self.object(mesh).is_some_and(Object::is_mesh_object) {
                    return Err(Error::model(
                        ErrorCode::InvalidModelResource,
                        format!("function {} samples {}, which is not a mesh object", id, mesh),
                    ));
                }
            }
            let called = function.called_functions();
            for callee in &called {
                match self.resource(*callee) {
                    None => {
                        return Err(Error::model(
                            ErrorCode::ResourceNotFound,
                            format!("function {} calls missing resource {}", id, callee),
                        ));
                    }
                    Some(r) if !r.is_function() => {
                        return Err(Error::model(
                            ErrorCode::InvalidModelResource,
                            format!("function {} calls {} {}", id, r.kind(), callee),
                        ));
                    }
                    Some(_) => {}
                }
            }
            callees.insert(id, called);
        }

        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut active = HashSet::new();
        for &start in callees.keys() {
            if done.contains(&start) {
                continue;
            }
            active.insert(start);
            let mut stack = vec![(start, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (current, next) = *top;
                let next_callee = callees.get(&current).and_then(|c| c.get(next)).copied();
                if let Some(callee) = next_callee {
                    top.1 += 1;
                    if active.contains(&callee) {
                        return Err(Error::model(
                            ErrorCode::CyclicGraph,
                            format!("function {} calls itself recursively", callee),
                        ));
                    }
                    if !done.contains(&callee) {
                        active.insert(callee);
                        stack.push((callee, 0));
                    }
                } else {
                    active.remove(&current);
                    done.insert(current);
                    order.push(current);
                    stack.pop();
                }
            }
        }
        Ok(order)
    }
}
