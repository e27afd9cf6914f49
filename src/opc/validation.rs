//! OPC part name rules

use urlencoding::decode;

use crate::error::{Error, Result};

/// Validate an OPC part name
///
/// Non-ASCII characters are accepted unencoded as well as percent-encoded;
/// many producers write them directly.
pub(crate) fn validate_opc_part_name(part_name: &str) -> Result<()> {
    if part_name.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidFormat(format!(
            "Part name cannot contain control characters: {}",
            part_name.escape_debug()
        )));
    }
    if part_name.contains('#') {
        return Err(Error::InvalidFormat(format!(
            "Part name cannot contain fragment identifier: {}",
            part_name
        )));
    }
    if part_name.contains('?') {
        return Err(Error::InvalidFormat(format!(
            "Part name cannot contain query string: {}",
            part_name
        )));
    }

    for (idx, segment) in part_name.split('/').enumerate() {
        if segment.is_empty() {
            if idx == 0 && part_name.starts_with('/') {
                continue;
            }
            return Err(Error::InvalidFormat(format!(
                "Part name cannot contain empty path segments: {}",
                part_name
            )));
        }
        if segment == "." || segment == ".." {
            return Err(Error::InvalidFormat(format!(
                "Part name cannot contain '.' or '..' segments: {}",
                part_name
            )));
        }
        if segment.ends_with('.') {
            return Err(Error::InvalidFormat(format!(
                "Part name segments cannot end with '.': {}",
                part_name
            )));
        }
    }

    Ok(())
}

/// Absolute, percent-decoded part path (`/3D/3dmodel.model`) for a target
///
/// Relative targets are resolved against the directory of `base`, itself an
/// absolute part path.
pub(crate) fn part_path(target: &str, base: &str) -> Result<String> {
    validate_opc_part_name(target)?;
    let decoded = decode(target)
        .map_err(|e| Error::InvalidFormat(format!("Part name '{}' is not UTF-8: {}", target, e)))?;
    if decoded.starts_with('/') {
        return Ok(decoded.into_owned());
    }
    let dir = base.rsplit_once('/').map_or("", |(dir, _)| dir);
    Ok(format!("{}/{}", dir, decoded))
}

/// Archive entry name of an absolute part path
pub(crate) fn zip_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Relationships part describing `path`
///
/// `/3D/3dmodel.model` has its relationships in `3D/_rels/3dmodel.model.rels`.
pub(crate) fn rels_path_for(path: &str) -> String {
    let path = zip_name(path);
    match path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", path),
    }
}
