//! Attributes section parser

use crate::caps::{Capability, CapabilityRegistry};
use crate::data::ShapedData;
use crate::descriptor::{AttributeFn, AttributeLayout, AttributeSource};
use crate::driver::{Component, Driver};
use crate::error::CompileError;
use crate::pool::ScratchPool;
use crate::resources::buffer::{BufferHandle, BufferManager, BufferOptions};
use crate::resources::program::ActiveVar;

/// Fully resolved layout of a buffer-backed attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLayout {
    pub size: u32,
    pub dtype: Component,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
    pub divisor: u32,
}

/// One attribute record of a compiled pipeline
pub enum AttributeRecord {
    /// A buffer resolved at compile time.
    Static {
        name: String,
        location: u32,
        buffer: BufferHandle,
        layout: ResolvedLayout,
    },
    /// Re-resolved on every invocation.
    Dynamic {
        name: String,
        location: u32,
        func: AttributeFn,
    },
    /// Resolved from each batch element.
    Prop {
        name: String,
        location: u32,
        key: String,
    },
}

impl AttributeRecord {
    pub fn name(&self) -> &str {
        match self {
            AttributeRecord::Static { name, .. } => name,
            AttributeRecord::Dynamic { name, .. } => name,
            AttributeRecord::Prop { name, .. } => name,
        }
    }

    pub fn location(&self) -> u32 {
        match self {
            AttributeRecord::Static { location, .. } => *location,
            AttributeRecord::Dynamic { location, .. } => *location,
            AttributeRecord::Prop { location, .. } => *location,
        }
    }
}

pub(crate) fn validate_layout(
    caps: &CapabilityRegistry,
    layout: &AttributeLayout,
) -> Result<(), CompileError> {
    if layout.stride > 255 {
        return Err(CompileError::StrideOutOfRange(layout.stride));
    }
    if layout.divisor > 0 && !caps.has(Capability::Instancing) {
        return Err(CompileError::InstancingUnsupported);
    }
    Ok(())
}

/// Resolve an explicit layout against the buffer's own metadata.
pub(crate) fn resolve_layout(
    buffers: &BufferManager,
    buffer: BufferHandle,
    layout: &AttributeLayout,
) -> Result<ResolvedLayout, CompileError> {
    let meta = buffers
        .get(buffer)
        .ok_or(CompileError::StaleHandle { kind: "buffer" })?;
    Ok(ResolvedLayout {
        size: layout.size.unwrap_or(meta.dimension),
        dtype: layout.dtype.unwrap_or(meta.dtype),
        normalized: layout.normalized,
        stride: layout.stride,
        offset: layout.offset,
        divisor: layout.divisor,
    })
}

/// Layout of a freshly materialized data buffer, tightly packed.
pub(crate) fn data_layout(data: &ShapedData) -> Result<(u32, Component), CompileError> {
    Ok((data.vertex_dimension()? as u32, data.component()))
}

/// Parse the attributes section against the program's active attributes.
///
/// Every record must name an active attribute of a type usable as a
/// vertex input, and every active attribute must have a record.
pub(crate) fn parse_attributes<D: Driver>(
    driver: &mut D,
    buffers: &mut BufferManager,
    pool: &mut ScratchPool,
    caps: &CapabilityRegistry,
    active: &[ActiveVar],
    sources: Vec<(String, AttributeSource)>,
) -> Result<Vec<AttributeRecord>, CompileError> {
    let mut records = Vec::with_capacity(sources.len());
    for (name, source) in sources {
        let var = active
            .iter()
            .find(|var| var.name == name)
            .ok_or_else(|| CompileError::UnknownRecord {
                kind: "attribute",
                name: name.clone(),
            })?;
        if var.ty.attribute_size().is_none() {
            return Err(CompileError::TypeMismatch {
                kind: "attribute",
                name: name.clone(),
                ty: var.ty,
            });
        }
        let location = var.location as u32;
        let record = match source {
            AttributeSource::Data(data) => {
                let (size, dtype) = data_layout(&data)?;
                let buffer = buffers.create(driver, pool, &data, BufferOptions::default())?;
                AttributeRecord::Static {
                    name,
                    location,
                    buffer,
                    layout: ResolvedLayout {
                        size,
                        dtype,
                        normalized: false,
                        stride: 0,
                        offset: 0,
                        divisor: 0,
                    },
                }
            }
            AttributeSource::Buffer { buffer, layout } => {
                validate_layout(caps, &layout)?;
                let layout = resolve_layout(buffers, buffer, &layout)?;
                AttributeRecord::Static {
                    name,
                    location,
                    buffer,
                    layout,
                }
            }
            AttributeSource::Dynamic(func) => AttributeRecord::Dynamic {
                name,
                location,
                func,
            },
            AttributeSource::Prop(key) => AttributeRecord::Prop {
                name,
                location,
                key,
            },
        };
        records.push(record);
    }

    for var in active {
        if !records.iter().any(|record| record.name() == var.name) {
            return Err(CompileError::MissingRecord {
                kind: "attribute",
                name: var.name.clone(),
            });
        }
    }
    Ok(records)
}
