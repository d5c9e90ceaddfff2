//! Editable fields of scene objects, described by static tables.
//!
//! Each inspectable type lists its fields once (name, label, value type,
//! whether it can be edited) and maps field names to its struct fields by
//! hand. Inspectors and the command line edit values as text through
//! [`read`] and [`write`].

use std::fmt::{self, Display, Formatter};

use crate::error::PropertyError;
use crate::scene::{Component, ComponentKind, Entity, Level};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ValueType {
    String,
    Int,
    OptionalInt,
    Float,
    OptionalFloat,
    Bool,
    Vec3,
}

impl ValueType {
    fn describe(self) -> &'static str {
        match self {
            ValueType::String => "text",
            ValueType::Int => "an integer",
            ValueType::OptionalInt => "an integer or null",
            ValueType::Float => "a number",
            ValueType::OptionalFloat => "a number or null",
            ValueType::Bool => "true or false",
            ValueType::Vec3 => "a vector \"x, y, z\"",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Vec3([f32; 3]),
    /// An unset optional field.
    None,
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Vec3([x, y, z]) => write!(f, "{x}, {y}, {z}"),
            Value::None => write!(f, "null"),
        }
    }
}

/// Describes one field of an inspectable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub value_type: ValueType,
    pub editable: bool,
    pub category: &'static str,
    pub order: u32,
    pub description: &'static str,
}

const fn field(
    name: &'static str,
    display_name: &'static str,
    value_type: ValueType,
    editable: bool,
    category: &'static str,
    order: u32,
    description: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        display_name,
        value_type,
        editable,
        category,
        order,
        description,
    }
}

/// Something whose fields can be listed and edited by name.
pub trait Inspectable {
    fn fields(&self) -> &'static [FieldDescriptor];

    /// Reads a field. `field` is always a name from [`Inspectable::fields`].
    fn get(&self, field: &str) -> Option<Value>;

    /// Writes a field. The value already has the field's type.
    fn set(&mut self, field: &str, value: Value) -> Result<(), PropertyError>;
}

pub const ENTITY_FIELDS: &[FieldDescriptor] = &[
    field("id", "ID", ValueType::Int, false, "Entity", 0, "Unique id within the scene"),
    field("name", "Name", ValueType::String, true, "Entity", 1, ""),
    field("active", "Active", ValueType::Bool, true, "Entity", 2, ""),
    field("parentId", "Parent", ValueType::OptionalInt, false, "Entity", 3, "Changed by moving the entity"),
    field("position", "Position", ValueType::Vec3, true, "Transform", 10, ""),
    field("rotation", "Rotation", ValueType::Vec3, true, "Transform", 11, "Euler angles in degrees"),
    field("scale", "Scale", ValueType::Vec3, true, "Transform", 12, ""),
];

pub const LEVEL_FIELDS: &[FieldDescriptor] = &[
    field("name", "Name", ValueType::String, true, "Level", 0, ""),
    field("order", "Order", ValueType::Int, true, "Level", 1, ""),
    field("visible", "Visible", ValueType::Bool, true, "Level", 2, ""),
    field("enabled", "Enabled", ValueType::Bool, true, "Level", 3, ""),
    field("entityCount", "Entities", ValueType::Int, false, "Level", 4, ""),
];

const TYPE_FIELD: FieldDescriptor =
    field("type", "Type", ValueType::Int, false, "Component", 0, "Component type code");

pub const MODEL_FIELDS: &[FieldDescriptor] = &[
    TYPE_FIELD,
    field("modelID", "Model", ValueType::OptionalInt, true, "Model", 1, "Resource id of a model or mesh"),
];

pub const CAMERA_FIELDS: &[FieldDescriptor] = &[
    TYPE_FIELD,
    field("fov", "Field of view", ValueType::OptionalFloat, true, "Camera", 1, "Degrees"),
    field("near", "Near plane", ValueType::OptionalFloat, true, "Camera", 2, ""),
    field("far", "Far plane", ValueType::OptionalFloat, true, "Camera", 3, ""),
    field("isMainCamera", "Main camera", ValueType::Bool, true, "Camera", 4, "At most one per scene"),
];

pub const OTHER_COMPONENT_FIELDS: &[FieldDescriptor] = &[TYPE_FIELD];

fn mismatch(value: &Value, expected: ValueType) -> PropertyError {
    PropertyError::InvalidValue {
        text: value.to_string(),
        expected: expected.describe(),
    }
}

fn as_string(value: Value) -> Result<String, PropertyError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(mismatch(&other, ValueType::String)),
    }
}

fn as_bool(value: Value) -> Result<bool, PropertyError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(mismatch(&other, ValueType::Bool)),
    }
}

fn as_vec3(value: Value) -> Result<glam::Vec3, PropertyError> {
    match value {
        Value::Vec3(v) => Ok(glam::Vec3::from_array(v)),
        other => Err(mismatch(&other, ValueType::Vec3)),
    }
}

fn as_i32(value: Value) -> Result<i32, PropertyError> {
    match value {
        Value::Int(i) => i32::try_from(i).map_err(|_| mismatch(&Value::Int(i), ValueType::Int)),
        other => Err(mismatch(&other, ValueType::Int)),
    }
}

fn as_optional_u32(value: Value) -> Result<Option<u32>, PropertyError> {
    match value {
        Value::None => Ok(None),
        Value::Int(i) => u32::try_from(i)
            .map(Some)
            .map_err(|_| mismatch(&Value::Int(i), ValueType::OptionalInt)),
        other => Err(mismatch(&other, ValueType::OptionalInt)),
    }
}

fn as_optional_f32(value: Value) -> Result<Option<f32>, PropertyError> {
    match value {
        Value::None => Ok(None),
        Value::Float(v) => Ok(Some(v as f32)),
        Value::Int(i) => Ok(Some(i as f32)),
        other => Err(mismatch(&other, ValueType::OptionalFloat)),
    }
}

fn optional<T>(value: Option<T>, wrap: impl FnOnce(T) -> Value) -> Value {
    value.map_or(Value::None, wrap)
}

impl Inspectable for Entity {
    fn fields(&self) -> &'static [FieldDescriptor] {
        ENTITY_FIELDS
    }

    fn get(&self, field: &str) -> Option<Value> {
        Some(match field {
            "id" => Value::Int(self.id.into()),
            "name" => Value::String(self.name.clone()),
            "active" => Value::Bool(self.active),
            "parentId" => optional(self.parent_id, |id| Value::Int(id.into())),
            "position" => Value::Vec3(self.transform.position.to_array()),
            "rotation" => Value::Vec3(self.transform.rotation.to_array()),
            "scale" => Value::Vec3(self.transform.scale.to_array()),
            _ => return None,
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), PropertyError> {
        match field {
            "name" => self.name = as_string(value)?,
            "active" => self.active = as_bool(value)?,
            "position" => self.transform.position = as_vec3(value)?,
            "rotation" => self.transform.rotation = as_vec3(value)?,
            "scale" => self.transform.scale = as_vec3(value)?,
            other => return Err(PropertyError::ReadOnly(other.to_string())),
        }
        Ok(())
    }
}

impl Inspectable for Level {
    fn fields(&self) -> &'static [FieldDescriptor] {
        LEVEL_FIELDS
    }

    fn get(&self, field: &str) -> Option<Value> {
        Some(match field {
            "name" => Value::String(self.name.clone()),
            "order" => Value::Int(self.order.into()),
            "visible" => Value::Bool(self.visible),
            "enabled" => Value::Bool(self.enabled),
            "entityCount" => Value::Int(self.entities.len() as i64),
            _ => return None,
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), PropertyError> {
        match field {
            "name" => self.name = as_string(value)?,
            "order" => self.order = as_i32(value)?,
            "visible" => self.visible = as_bool(value)?,
            "enabled" => self.enabled = as_bool(value)?,
            other => return Err(PropertyError::ReadOnly(other.to_string())),
        }
        Ok(())
    }
}

impl Inspectable for Component {
    fn fields(&self) -> &'static [FieldDescriptor] {
        match self.kind {
            ComponentKind::Model => MODEL_FIELDS,
            ComponentKind::Camera => CAMERA_FIELDS,
            ComponentKind::Light | ComponentKind::Unknown(_) => OTHER_COMPONENT_FIELDS,
        }
    }

    fn get(&self, field: &str) -> Option<Value> {
        Some(match field {
            "type" => Value::Int(i32::from(self.kind).into()),
            "modelID" => optional(self.model_id, |id| Value::Int(id.into())),
            "fov" => optional(self.fov, |v| Value::Float(v.into())),
            "near" => optional(self.near, |v| Value::Float(v.into())),
            "far" => optional(self.far, |v| Value::Float(v.into())),
            "isMainCamera" => Value::Bool(self.is_main_camera),
            _ => return None,
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), PropertyError> {
        match field {
            "modelID" => self.model_id = as_optional_u32(value)?,
            "fov" => self.fov = as_optional_f32(value)?,
            "near" => self.near = as_optional_f32(value)?,
            "far" => self.far = as_optional_f32(value)?,
            "isMainCamera" => self.is_main_camera = as_bool(value)?,
            other => return Err(PropertyError::ReadOnly(other.to_string())),
        }
        Ok(())
    }
}

/// Looks up a field by name, ignoring case.
pub fn descriptor<T: Inspectable + ?Sized>(
    target: &T,
    field: &str,
) -> Result<&'static FieldDescriptor, PropertyError> {
    target
        .fields()
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(field))
        .ok_or_else(|| PropertyError::UnknownField(field.to_string()))
}

/// The target's fields in display order.
pub fn sorted_fields<T: Inspectable + ?Sized>(target: &T) -> Vec<&'static FieldDescriptor> {
    let mut fields: Vec<_> = target.fields().iter().collect();
    fields.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(b.name)));
    fields
}

pub fn read<T: Inspectable + ?Sized>(target: &T, field: &str) -> Result<Value, PropertyError> {
    let descriptor = descriptor(target, field)?;
    target
        .get(descriptor.name)
        .ok_or_else(|| PropertyError::UnknownField(field.to_string()))
}

/// Parses `text` as `field` and writes it. Returns the value written.
pub fn write<T: Inspectable + ?Sized>(
    target: &mut T,
    field: &str,
    text: &str,
) -> Result<Value, PropertyError> {
    let descriptor = descriptor(target, field)?;
    if !descriptor.editable {
        return Err(PropertyError::ReadOnly(descriptor.name.to_string()));
    }
    let value = parse_value(text, descriptor.value_type)?;
    target.set(descriptor.name, value.clone())?;
    Ok(value)
}

/// Parses user text as a value of the given type.
///
/// Vectors are written `x, y, z` (brackets optional). Optional types accept an
/// empty string or `null`.
pub fn parse_value(text: &str, value_type: ValueType) -> Result<Value, PropertyError> {
    let trimmed = text.trim();
    let invalid = || PropertyError::InvalidValue {
        text: text.to_string(),
        expected: value_type.describe(),
    };
    let is_null = trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null");

    match value_type {
        ValueType::String => Ok(Value::String(text.to_string())),
        ValueType::Int => trimmed.parse().map(Value::Int).map_err(|_| invalid()),
        ValueType::OptionalInt if is_null => Ok(Value::None),
        ValueType::OptionalInt => trimmed.parse().map(Value::Int).map_err(|_| invalid()),
        ValueType::Float => trimmed.parse().map(Value::Float).map_err(|_| invalid()),
        ValueType::OptionalFloat if is_null => Ok(Value::None),
        ValueType::OptionalFloat => trimmed.parse().map(Value::Float).map_err(|_| invalid()),
        ValueType::Bool => match trimmed.to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ValueType::Vec3 => {
            let inner = trimmed
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(trimmed);
            let parts = inner
                .split(',')
                .map(|p| p.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            let [x, y, z] = parts[..] else {
                return Err(invalid());
            };
            Ok(Value::Vec3([x, y, z]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vectors_and_optionals() {
        assert_eq!(
            parse_value(" 1, 2.5,-3 ", ValueType::Vec3).unwrap(),
            Value::Vec3([1.0, 2.5, -3.0])
        );
        assert_eq!(
            parse_value("[0,0,1]", ValueType::Vec3).unwrap(),
            Value::Vec3([0.0, 0.0, 1.0])
        );
        assert!(parse_value("1, 2", ValueType::Vec3).is_err());
        assert_eq!(parse_value("null", ValueType::OptionalInt).unwrap(), Value::None);
        assert_eq!(parse_value("", ValueType::OptionalFloat).unwrap(), Value::None);
        assert_eq!(parse_value("12", ValueType::OptionalInt).unwrap(), Value::Int(12));
        assert!(parse_value("", ValueType::Int).is_err());
        assert_eq!(parse_value("TRUE", ValueType::Bool).unwrap(), Value::Bool(true));
    }

    #[test]
    fn formats_values_for_editing() {
        assert_eq!(Value::Vec3([1.0, 0.5, 0.0]).to_string(), "1, 0.5, 0");
        assert_eq!(Value::None.to_string(), "null");
    }

    #[test]
    fn writes_entity_fields_by_name() {
        let mut entity = Entity::new(3, None);
        write(&mut entity, "Position", "1, 2, 3").unwrap();
        write(&mut entity, "active", "false").unwrap();
        assert_eq!(entity.transform.position, glam::Vec3::new(1.0, 2.0, 3.0));
        assert!(!entity.active);
        assert_eq!(read(&entity, "scale").unwrap(), Value::Vec3([1.0, 1.0, 1.0]));
        assert_eq!(read(&entity, "parentId").unwrap(), Value::None);
    }

    #[test]
    fn rejects_read_only_unknown_and_bad_values() {
        let mut entity = Entity::new(3, None);
        assert!(matches!(write(&mut entity, "id", "4"), Err(PropertyError::ReadOnly(_))));
        assert!(matches!(
            write(&mut entity, "colour", "red"),
            Err(PropertyError::UnknownField(_))
        ));
        assert!(matches!(
            write(&mut entity, "active", "maybe"),
            Err(PropertyError::InvalidValue { .. })
        ));
        assert_eq!(entity.id, 3);
    }

    #[test]
    fn component_fields_depend_on_kind() {
        let mut camera = Component::camera();
        assert_eq!(sorted_fields(&camera).last().unwrap().name, "isMainCamera");
        write(&mut camera, "fov", "75").unwrap();
        assert_eq!(camera.fov, Some(75.0));
        write(&mut camera, "far", "null").unwrap();
        assert_eq!(camera.far, None);

        let model = Component::model(5001);
        assert!(descriptor(&model, "fov").is_err());
        assert_eq!(read(&model, "modelID").unwrap(), Value::Int(5001));
        assert_eq!(read(&model, "type").unwrap(), Value::Int(1));
    }

    #[test]
    fn level_order_must_fit() {
        let mut level = Level::new("L", 0);
        write(&mut level, "order", "4").unwrap();
        assert_eq!(level.order, 4);
        assert!(write(&mut level, "order", "99999999999").is_err());
        assert!(matches!(
            write(&mut level, "entityCount", "1"),
            Err(PropertyError::ReadOnly(_))
        ));
    }
}
