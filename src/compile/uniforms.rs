//! Uniforms section parser

use crate::data::UniformValue;
use crate::descriptor::{UniformFn, UniformSource};
use crate::driver::{GlType, UniformData};
use crate::error::CompileError;
use crate::resources::program::ActiveVar;

/// One uniform record of a compiled pipeline
pub enum UniformRecord {
    Static {
        name: String,
        location: i32,
        ty: GlType,
        value: UniformValue,
    },
    Dynamic {
        name: String,
        location: i32,
        ty: GlType,
        func: UniformFn,
    },
    Prop {
        name: String,
        location: i32,
        ty: GlType,
        key: String,
        fallback: Option<UniformValue>,
    },
}

impl UniformRecord {
    pub fn name(&self) -> &str {
        match self {
            UniformRecord::Static { name, .. } => name,
            UniformRecord::Dynamic { name, .. } => name,
            UniformRecord::Prop { name, .. } => name,
        }
    }
}

/// Whether `value` can feed a shader variable of type `ty`.
pub(crate) fn value_matches(ty: GlType, value: &UniformValue) -> bool {
    matches!(
        (ty, value),
        (GlType::Float, UniformValue::Float(_))
            | (GlType::Int, UniformValue::Int(_))
            | (GlType::Int, UniformValue::Bool(_))
            | (GlType::Bool, UniformValue::Bool(_))
            | (GlType::Bool, UniformValue::Int(_))
            | (GlType::FloatVec2, UniformValue::Vec2(_))
            | (GlType::FloatVec3, UniformValue::Vec3(_))
            | (GlType::FloatVec4, UniformValue::Vec4(_))
            | (GlType::IntVec2, UniformValue::IVec2(_))
            | (GlType::IntVec3, UniformValue::IVec3(_))
            | (GlType::IntVec4, UniformValue::IVec4(_))
            | (GlType::BoolVec2, UniformValue::IVec2(_))
            | (GlType::BoolVec3, UniformValue::IVec3(_))
            | (GlType::BoolVec4, UniformValue::IVec4(_))
            | (GlType::FloatMat2, UniformValue::Mat2(_))
            | (GlType::FloatMat3, UniformValue::Mat3(_))
            | (GlType::FloatMat4, UniformValue::Mat4(_))
            | (GlType::Sampler2d, UniformValue::Texture(_))
            | (GlType::SamplerCube, UniformValue::Texture(_))
    )
}

/// Convert a non-texture value to its upload payload. Matrices never
/// transpose; callers pass column-major data.
pub(crate) fn to_upload(value: &UniformValue) -> Option<UniformData> {
    Some(match value {
        UniformValue::Float(v) => UniformData::Float(*v),
        UniformValue::Int(v) => UniformData::Int(*v),
        UniformValue::Bool(v) => UniformData::Int(*v as i32),
        UniformValue::Vec2(v) => UniformData::Vec2(*v),
        UniformValue::Vec3(v) => UniformData::Vec3(*v),
        UniformValue::Vec4(v) => UniformData::Vec4(*v),
        UniformValue::IVec2(v) => UniformData::IVec2(*v),
        UniformValue::IVec3(v) => UniformData::IVec3(*v),
        UniformValue::IVec4(v) => UniformData::IVec4(*v),
        UniformValue::Mat2(v) => UniformData::Mat2 {
            values: *v,
            transpose: false,
        },
        UniformValue::Mat3(v) => UniformData::Mat3 {
            values: *v,
            transpose: false,
        },
        UniformValue::Mat4(v) => UniformData::Mat4 {
            values: *v,
            transpose: false,
        },
        UniformValue::Texture(_) => return None,
    })
}

/// Parse the uniforms section against the program's active uniforms.
///
/// Static values are type-checked here; dynamic and prop values are
/// checked when they resolve.
pub(crate) fn parse_uniforms(
    active: &[ActiveVar],
    sources: Vec<(String, UniformSource)>,
) -> Result<Vec<UniformRecord>, CompileError> {
    let mut records = Vec::with_capacity(sources.len());
    for (name, source) in sources {
        let var = active
            .iter()
            .find(|var| var.name == name)
            .ok_or_else(|| CompileError::UnknownRecord {
                kind: "uniform",
                name: name.clone(),
            })?;
        let record = match source {
            UniformSource::Value(value) => {
                if !value_matches(var.ty, &value) {
                    return Err(CompileError::TypeMismatch {
                        kind: "uniform",
                        name,
                        ty: var.ty,
                    });
                }
                UniformRecord::Static {
                    name: var.name.clone(),
                    location: var.location,
                    ty: var.ty,
                    value,
                }
            }
            UniformSource::Dynamic(func) => UniformRecord::Dynamic {
                name: var.name.clone(),
                location: var.location,
                ty: var.ty,
                func,
            },
            UniformSource::Prop { key, fallback } => {
                if let Some(fallback) = &fallback {
                    if !value_matches(var.ty, fallback) {
                        return Err(CompileError::TypeMismatch {
                            kind: "uniform",
                            name,
                            ty: var.ty,
                        });
                    }
                }
                UniformRecord::Prop {
                    name: var.name.clone(),
                    location: var.location,
                    ty: var.ty,
                    key,
                    fallback,
                }
            }
        };
        records.push(record);
    }

    for var in active {
        if !records.iter().any(|record| record.name() == var.name) {
            return Err(CompileError::MissingRecord {
                kind: "uniform",
                name: var.name.clone(),
            });
        }
    }
    Ok(records)
}
