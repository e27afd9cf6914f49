//! State shared by the readers of one model part

use std::collections::HashMap;

use crate::error::{Error, ErrorCode, Result};
use crate::model::{
    CORE_093_NAMESPACE, Extension, Model, ParserConfig, ProgressStage, Resource, ResourceId,
};
use crate::warnings::{WarningLevel, Warnings};

use super::dispatch::{ElementKind, element_kind};
use super::node::{StartTag, XmlCursor};

const PROGRESS_INTERVAL: usize = 1024;

/// Mutable context passed to every reader hook
pub struct ParseContext<'a> {
    /// Model receiving the parsed resources
    pub model: &'a mut Model,
    /// Warning collector
    pub warnings: &'a mut Warnings,
    /// Reader configuration
    pub config: &'a ParserConfig,
    part_path: String,
    namespaces: HashMap<String, String>,
    items_read: usize,
}

impl<'a> ParseContext<'a> {
    /// Context for the part at `part_path`
    pub fn new(
        model: &'a mut Model,
        warnings: &'a mut Warnings,
        config: &'a ParserConfig,
        part_path: &str,
    ) -> Self {
        Self {
            model,
            warnings,
            config,
            part_path: part_path.to_string(),
            namespaces: HashMap::new(),
            items_read: 0,
        }
    }

    /// Path of the part being read
    pub fn part_path(&self) -> &str {
        &self.part_path
    }

    /// True while reading the root model part
    pub fn is_root_part(&self) -> bool {
        self.part_path == self.model.root_path()
    }

    /// Remember the namespaces declared on the `<model>` element
    pub fn declare_namespaces(&mut self, declarations: &[(String, String)]) {
        for (prefix, namespace) in declarations {
            self.namespaces.insert(prefix.clone(), namespace.clone());
        }
    }

    /// Namespace bound to `prefix` on the `<model>` element
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// True if the `<model>` element declares `namespace`
    pub fn declares_namespace(&self, namespace: &str) -> bool {
        self.namespaces.values().any(|n| n == namespace)
    }

    /// Record a warning
    pub fn warn(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        level: WarningLevel,
    ) -> Result<()> {
        self.warnings.add(code, message, level)
    }

    /// Classify a child element
    ///
    /// Elements of extensions the configuration does not support are
    /// treated as foreign and yield `None`.
    pub(crate) fn kind_of(&self, tag: &StartTag) -> Option<ElementKind> {
        let unsupported = Extension::from_namespace(&tag.namespace)
            .is_some_and(|extension| !self.config.supports(&extension));
        if unsupported {
            return None;
        }
        element_kind(&tag.namespace, &tag.local_name)
    }

    /// Skip an element no reader handles at this position
    ///
    /// Unknown elements of a known 3MF namespace produce a warning; foreign
    /// elements are skipped silently.
    pub fn skip_unknown(&mut self, cursor: &mut XmlCursor<'_>, tag: &StartTag) -> Result<()> {
        let known = tag.namespace == CORE_093_NAMESPACE
            || Extension::from_namespace(&tag.namespace)
                .is_some_and(|extension| self.config.supports(&extension));
        if known {
            self.warn(
                ErrorCode::NamespaceInvalidElement,
                format!("unexpected element <{}> in {}", tag.local_name, tag.namespace),
                WarningLevel::InvalidOptionalValue,
            )?;
        }
        cursor.skip_element(tag)
    }

    /// Handle of the resource known as `model_id` in the current part
    pub fn find_resource(&self, model_id: u32) -> Option<ResourceId> {
        self.model.find_package_resource_id(&self.part_path, model_id)
    }

    /// Like [`find_resource`](Self::find_resource), failing with
    /// `UnknownModelResource` when the id is not defined yet
    pub fn resolve_resource(&self, field: &str, model_id: u32) -> Result<ResourceId> {
        self.find_resource(model_id).ok_or_else(|| {
            Error::model(
                ErrorCode::UnknownModelResource,
                format!(
                    "{} references unknown resource {} in {}",
                    field, model_id, self.part_path
                ),
            )
        })
    }

    /// Resolve `model_id` and check the resource kind with `accept`
    pub fn resolve_resource_of(
        &self,
        field: &str,
        model_id: u32,
        expected: &str,
        accept: impl Fn(&Resource) -> bool,
    ) -> Result<ResourceId> {
        let id = self.resolve_resource(field, model_id)?;
        match self.model.resource(id) {
            Some(resource) if accept(resource) => Ok(id),
            Some(resource) => Err(Error::model(
                ErrorCode::InvalidModelResource,
                format!(
                    "{} {} is a {}, expected {}",
                    field,
                    model_id,
                    resource.kind(),
                    expected
                ),
            )),
            None => Err(Error::model(
                ErrorCode::UnknownModelResource,
                format!("{} references removed resource {}", field, model_id),
            )),
        }
    }

    /// Resolve a `pid` to a property group of the current part
    ///
    /// Fails with `ResourceNotFound` for unknown ids.
    pub fn resolve_property_group(&self, pid: u32) -> Result<ResourceId> {
        let id = self.find_resource(pid).ok_or_else(|| {
            Error::model(
                ErrorCode::ResourceNotFound,
                format!("property group {} not found in {}", pid, self.part_path),
            )
        })?;
        match self.model.resource(id) {
            Some(resource) if resource.is_property_group() => Ok(id),
            _ => Err(Error::model(
                ErrorCode::InvalidModelResource,
                format!("resource {} is not a property group", pid),
            )),
        }
    }

    /// Check `index` against the size of property group `pid`
    pub fn check_property_index(&self, pid: ResourceId, index: usize) -> Result<()> {
        let count = self
            .model
            .resource(pid)
            .and_then(Resource::property_count)
            .unwrap_or(0);
        if index >= count {
            return Err(Error::model(
                ErrorCode::InvalidPropertyIndex,
                format!("property index {} out of range ({} entries)", index, count),
            ));
        }
        Ok(())
    }

    /// Register a resource parsed from the current part
    pub fn add_resource(&mut self, model_id: u32, resource: Resource) -> Result<ResourceId> {
        self.model.add_resource(&self.part_path, model_id, resource)
    }

    /// True if `namespace` is the namespace of `extension` and the
    /// configuration supports it
    pub fn accepts(&self, namespace: &str, extension: Extension) -> bool {
        namespace == extension.namespace() && self.config.supports(&extension)
    }

    /// True if the part declares the production namespace, in which case
    /// objects, items and the build should carry a UUID
    pub fn expects_uuids(&self) -> bool {
        self.config.supports(&Extension::Production)
            && self.declares_namespace(Extension::Production.namespace())
    }

    /// Count one mesh item, reporting progress every few hundred
    pub fn tick(&mut self) -> Result<()> {
        self.items_read += 1;
        if self.items_read % PROGRESS_INTERVAL == 0 {
            self.config.report_progress(ProgressStage::ReadingMesh, -1.0)?;
        }
        Ok(())
    }
}
