//! Conversions between XML attribute text and typed values
//!
//! Parsing is locale independent and strict: surrounding whitespace is
//! tolerated, anything else that is not a complete number is rejected.

use crate::error::{Error, ErrorCode, Result};

/// Largest magnitude accepted for a vertex coordinate
pub const MAX_COORDINATE: f64 = 1_000_000_000.0;

/// Largest model resource id or index
pub const MAX_RESOURCE_ID: u32 = 2_147_483_647;

/// Size of 3MF transformation matrix (4x3 affine transform in row-major order)
pub const TRANSFORM_MATRIX_SIZE: usize = 12;

/// Affine transform, row major 4x3 (the last column `0 0 0 1` is implicit)
pub type Transform = [f64; TRANSFORM_MATRIX_SIZE];

/// Identity transform with zero translation
pub const IDENTITY_TRANSFORM: Transform = [
    1.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, //
    0.0, 0.0, 1.0, //
    0.0, 0.0, 0.0,
];

/// 4x4 matrix, row major
pub type Matrix4 = [[f64; 4]; 4];

/// Identity 4x4 matrix
pub const IDENTITY_MATRIX: Matrix4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 3 component vector
pub type Vector3 = [f64; 3];

/// RGBA color
pub type Color = (u8, u8, u8, u8);

fn parse_finite<T>(field: &str, text: &str, expected: &str) -> Result<T>
where
    T: std::str::FromStr + Copy + Into<f64>,
{
    let trimmed = text.trim();
    let value: T = trimmed
        .parse()
        .map_err(|_| Error::parse_error_with_context(field, text, expected))?;
    if !value.into().is_finite() {
        return Err(Error::parse_error_with_context(field, text, expected));
    }
    Ok(value)
}

/// Parse a finite `f32`
pub fn parse_f32(field: &str, text: &str) -> Result<f32> {
    parse_finite(field, text, "finite floating-point number")
}

/// Parse a finite `f64`
pub fn parse_f64(field: &str, text: &str) -> Result<f64> {
    parse_finite(field, text, "finite floating-point number")
}

/// Parse a vertex coordinate, bounded by `±1e9`
///
/// Out of range or non-finite values fail with `InvalidModelCoordinates`.
pub fn parse_coordinate(field: &str, text: &str) -> Result<f32> {
    // Range is checked before narrowing; f32 rounds values just above 1e9 down to it
    let value: f64 = text.trim().parse().map_err(|_| {
        Error::model(
            ErrorCode::InvalidModelCoordinates,
            format!("{} is not a number: '{}'", field, text),
        )
    })?;
    if !value.is_finite() || value.abs() > MAX_COORDINATE {
        return Err(Error::model(
            ErrorCode::InvalidModelCoordinates,
            format!("{} out of range: '{}'", field, text),
        ));
    }
    Ok(value as f32)
}

fn parse_bounded_u32(field: &str, text: &str, min: u32) -> Result<u32> {
    let value: i64 = text.trim().parse().map_err(|_| {
        Error::model(
            ErrorCode::InvalidIndex,
            format!("{} is not an integer: '{}'", field, text),
        )
    })?;
    if value < i64::from(min) || value > i64::from(MAX_RESOURCE_ID) {
        return Err(Error::model(
            ErrorCode::InvalidIndex,
            format!("{} out of range: {}", field, value),
        ));
    }
    Ok(value as u32)
}

/// Parse a model resource id (1 ..= 2^31-1)
pub fn parse_resource_id(field: &str, text: &str) -> Result<u32> {
    parse_bounded_u32(field, text, 1)
}

/// Parse an index (0 ..= 2^31-1)
pub fn parse_index(field: &str, text: &str) -> Result<u32> {
    parse_bounded_u32(field, text, 0)
}

fn parse_float_list(field: &str, text: &str, count: usize) -> Result<Vec<f64>> {
    let values = text
        .split_whitespace()
        .map(|part| parse_f64(field, part))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != count {
        return Err(Error::parse_error_with_context(
            field,
            text,
            &format!("{} space separated numbers", count),
        ));
    }
    Ok(values)
}

/// Parse a 12 value transform
pub fn parse_transform(field: &str, text: &str) -> Result<Transform> {
    let values = parse_float_list(field, text, TRANSFORM_MATRIX_SIZE)?;
    let mut transform = [0.0; TRANSFORM_MATRIX_SIZE];
    transform.copy_from_slice(&values);
    Ok(transform)
}

/// Format a transform as 12 space separated values
pub fn format_transform(transform: &Transform) -> String {
    transform
        .iter()
        .map(|v| format_f64(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// True if `transform` is exactly the identity
pub fn is_identity(transform: &Transform) -> bool {
    *transform == IDENTITY_TRANSFORM
}

/// Parse a 16 value row major matrix
pub fn parse_matrix4(field: &str, text: &str) -> Result<Matrix4> {
    let values = parse_float_list(field, text, 16)?;
    let mut matrix = [[0.0; 4]; 4];
    for (i, v) in values.into_iter().enumerate() {
        matrix[i / 4][i % 4] = v;
    }
    Ok(matrix)
}

/// Format a matrix as 16 space separated values
pub fn format_matrix4(matrix: &Matrix4) -> String {
    matrix
        .iter()
        .flatten()
        .map(|v| format_f64(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse three space separated values
pub fn parse_vector3(field: &str, text: &str) -> Result<Vector3> {
    let values = parse_float_list(field, text, 3)?;
    Ok([values[0], values[1], values[2]])
}

/// Parse color from hex string format (#RRGGBB or #RRGGBBAA)
pub fn parse_color(text: &str) -> Result<Color> {
    let invalid = || Error::model(ErrorCode::InvalidColor, format!("invalid color '{}'", text));
    let hex = text.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

    match hex.len() {
        6 => Ok((channel(0)?, channel(2)?, channel(4)?, 255)),
        8 => Ok((channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
        _ => Err(invalid()),
    }
}

/// Format a color, omitting alpha when opaque
pub fn format_color(color: Color) -> String {
    let (r, g, b, a) = color;
    if a == 255 {
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    } else {
        format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}

/// Parse `true`/`false`/`1`/`0`
pub fn parse_bool(field: &str, text: &str) -> Result<bool> {
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::parse_error_with_context(field, text, "boolean")),
    }
}

/// Check the `8-4-4-4-12` hexadecimal UUID layout
pub fn is_valid_uuid(text: &str) -> bool {
    let groups: Vec<&str> = text.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Format an `f32` with the shortest text that parses back to the same value
pub fn format_f32(value: f32) -> String {
    format!("{}", value)
}

/// Format an `f64` with the shortest text that parses back to the same value
pub fn format_f64(value: f64) -> String {
    format!("{}", value)
}
