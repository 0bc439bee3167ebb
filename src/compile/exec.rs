//! The op interpreter

use log::trace;

use crate::compile::attributes::{AttributeRecord, ResolvedLayout};
use crate::compile::ops::{Dispatch, Op};
use crate::compile::uniforms::{to_upload, value_matches, UniformRecord};
use crate::compile::Pipeline;
use crate::context::{AttributeBinding, AttributeSlot, Context};
use crate::data::{PropSource, PropValue, ShapedData, UniformValue};
use crate::descriptor::{AttributeValue, Invocation};
use crate::driver::{Driver, RawFramebuffer, UniformData};
use crate::error::DrawError;
use crate::resources::buffer::BufferHandle;
use crate::resources::texture::TextureHandle;

/// Per-invocation bookkeeping
#[derive(Default)]
struct ExecState {
    /// Desired target to restore at pop, once a push happened.
    saved_target: Option<Option<RawFramebuffer>>,
    /// Textures pinned by sampler uniforms this invocation.
    textures: Vec<TextureHandle>,
    /// Stream buffers leased for dynamic or prop attribute data.
    streams: Vec<BufferHandle>,
}

/// Run the pipeline's op list once.
pub(crate) fn run<D: Driver>(
    pipeline: &Pipeline,
    ctx: &mut Context<D>,
    element: Option<(&dyn PropSource, usize)>,
) -> Result<(), DrawError> {
    let invocation = Invocation {
        tick: ctx.ticks,
        element: element.map(|(_, index)| index).unwrap_or(0),
    };
    let source = element.map(|(source, _)| source);

    let mut st = ExecState::default();
    let mut failure = None;
    for op in &pipeline.ops {
        trace!("op {:?}", op);
        if let Err(err) = step(pipeline, ctx, &invocation, source, &mut st, *op) {
            failure = Some(err);
            break;
        }
    }

    // Whatever a failed invocation left pinned or pushed is unwound here;
    // the success path drained everything through its own ops.
    for handle in st.textures.drain(..) {
        ctx.textures.release(handle);
    }
    for handle in st.streams.drain(..) {
        ctx.buffers.release_stream(handle);
    }
    if let Some(saved) = st.saved_target.take() {
        ctx.framebuffers.set_next(saved);
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn step<D: Driver>(
    pipeline: &Pipeline,
    ctx: &mut Context<D>,
    invocation: &Invocation,
    source: Option<&dyn PropSource>,
    st: &mut ExecState,
    op: Op,
) -> Result<(), DrawError> {
    match op {
        Op::ApplyState => {
            pipeline.state.apply(&mut ctx.driver, &mut ctx.state);
        }
        Op::PushTarget => {
            st.saved_target = Some(ctx.framebuffers.next());
            let raw = match pipeline.target {
                None => None,
                Some((handle, face)) => {
                    let framebuffer =
                        ctx.framebuffers
                            .get(handle)
                            .ok_or(DrawError::StaleHandle {
                                kind: "framebuffer",
                            })?;
                    Some(
                        framebuffer
                            .raw_for_face(face)
                            .ok_or(DrawError::StaleHandle {
                                kind: "framebuffer",
                            })?,
                    )
                }
            };
            ctx.framebuffers.set_next(raw);
            ctx.framebuffers.poll(&mut ctx.driver);
        }
        Op::Clear => {
            if let Some(clear) = &pipeline.clear {
                ctx.driver.clear(clear.color, clear.depth, clear.stencil);
            }
        }
        Op::BindProgram => {
            ctx.programs.bind(&mut ctx.driver, pipeline.program)?;
        }
        Op::UnbindVao => {
            ctx.vaos.unbind(&mut ctx.driver);
        }
        Op::BindVao => {
            let handle = pipeline.vao.ok_or(DrawError::StaleHandle { kind: "vao" })?;
            let raw = ctx
                .vaos
                .get(handle)
                .ok_or(DrawError::StaleHandle { kind: "vao" })?
                .raw;
            ctx.vaos.bind(&mut ctx.driver, raw);
        }
        Op::BindAttribute(index) => {
            bind_attribute(ctx, &pipeline.attributes[index], invocation, source, st)?;
        }
        Op::BindUniform(index) => {
            bind_uniform(ctx, pipeline, &pipeline.uniforms[index], invocation, source, st)?;
        }
        Op::Dispatch => {
            if pipeline.vao.is_none() {
                if let Some(handle) = pipeline.elements {
                    let raw = ctx
                        .elements
                        .get(handle)
                        .ok_or(DrawError::StaleHandle { kind: "elements" })?
                        .raw;
                    ctx.elements.bind(&mut ctx.driver, raw);
                }
            }
            match pipeline.dispatch {
                Dispatch::Arrays {
                    primitive,
                    first,
                    count,
                } => ctx.driver.draw_arrays(primitive, first, count),
                Dispatch::ArraysInstanced {
                    primitive,
                    first,
                    count,
                    instances,
                } => ctx
                    .driver
                    .draw_arrays_instanced(primitive, first, count, instances),
                Dispatch::Elements {
                    primitive,
                    count,
                    width,
                    byte_offset,
                } => ctx.driver.draw_elements(primitive, count, width, byte_offset),
                Dispatch::ElementsInstanced {
                    primitive,
                    count,
                    width,
                    byte_offset,
                    instances,
                } => ctx
                    .driver
                    .draw_elements_instanced(primitive, count, width, byte_offset, instances),
            }
        }
        Op::ReleaseResources => {
            for handle in st.textures.drain(..) {
                ctx.textures.release(handle);
            }
            for handle in st.streams.drain(..) {
                ctx.buffers.release_stream(handle);
            }
        }
        Op::PopTarget => {
            if let Some(saved) = st.saved_target.take() {
                ctx.framebuffers.set_next(saved);
            }
        }
        Op::Tick => {
            ctx.ticks += 1;
        }
    }
    Ok(())
}

/// Lease a stream buffer for per-invocation shaped data.
fn stream_from_data<D: Driver>(
    ctx: &mut Context<D>,
    data: &ShapedData,
    name: &str,
    st: &mut ExecState,
) -> Result<(BufferHandle, ResolvedLayout), DrawError> {
    let size = data
        .vertex_dimension()
        .map_err(|_| DrawError::ValueMismatch {
            kind: "attribute",
            name: name.to_owned(),
        })? as u32;
    let flat = data
        .flatten(&mut ctx.scratch)
        .map_err(|_| DrawError::ValueMismatch {
            kind: "attribute",
            name: name.to_owned(),
        })?;
    let dtype = data.component();
    let handle = ctx
        .buffers
        .acquire_stream(&mut ctx.driver, flat.bytes(), dtype, size);
    ctx.scratch.free(flat);
    st.streams.push(handle);
    Ok((
        handle,
        ResolvedLayout {
            size,
            dtype,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: 0,
        },
    ))
}

fn resolve_attribute_value<D: Driver>(
    ctx: &mut Context<D>,
    value: AttributeValue,
    name: &str,
    st: &mut ExecState,
) -> Result<(BufferHandle, ResolvedLayout), DrawError> {
    match value {
        AttributeValue::Buffer { buffer, layout } => {
            let meta = ctx
                .buffers
                .get(buffer)
                .ok_or(DrawError::StaleHandle { kind: "buffer" })?;
            Ok((
                buffer,
                ResolvedLayout {
                    size: layout.size.unwrap_or(meta.dimension),
                    dtype: layout.dtype.unwrap_or(meta.dtype),
                    normalized: layout.normalized,
                    stride: layout.stride,
                    offset: layout.offset,
                    divisor: layout.divisor,
                },
            ))
        }
        AttributeValue::Data(data) => stream_from_data(ctx, &data, name, st),
    }
}

fn bind_attribute<D: Driver>(
    ctx: &mut Context<D>,
    record: &AttributeRecord,
    invocation: &Invocation,
    source: Option<&dyn PropSource>,
    st: &mut ExecState,
) -> Result<(), DrawError> {
    let (buffer, layout) = match record {
        AttributeRecord::Static { buffer, layout, .. } => (*buffer, *layout),
        AttributeRecord::Dynamic { func, name, .. } => {
            resolve_attribute_value(ctx, func(invocation), name, st)?
        }
        AttributeRecord::Prop { key, name, .. } => {
            let value = source
                .and_then(|s| s.prop(key))
                .ok_or_else(|| DrawError::MissingProp(key.clone()))?;
            match value {
                PropValue::Buffer(buffer) => {
                    let meta = ctx
                        .buffers
                        .get(buffer)
                        .ok_or(DrawError::StaleHandle { kind: "buffer" })?;
                    (
                        buffer,
                        ResolvedLayout {
                            size: meta.dimension,
                            dtype: meta.dtype,
                            normalized: false,
                            stride: 0,
                            offset: 0,
                            divisor: 0,
                        },
                    )
                }
                PropValue::Data(data) => stream_from_data(ctx, &data, name, st)?,
                PropValue::Uniform(_) => {
                    return Err(DrawError::ValueMismatch {
                        kind: "attribute",
                        name: name.clone(),
                    })
                }
            }
        }
    };

    let meta = ctx
        .buffers
        .get(buffer)
        .ok_or(DrawError::StaleHandle { kind: "buffer" })?;
    let binding = AttributeBinding {
        raw: meta.raw,
        size: layout.size,
        dtype: layout.dtype,
        normalized: layout.normalized,
        stride: layout.stride,
        offset: layout.offset,
        divisor: layout.divisor,
    };
    let location = record.location() as usize;
    let slot = ctx.attribute_slots[location];
    if slot.binding != Some(binding) {
        let old_divisor = slot.binding.map(|b| b.divisor).unwrap_or(0);
        ctx.buffers.bind(&mut ctx.driver, binding.raw);
        if !slot.enabled {
            ctx.driver.enable_attribute(location as u32);
        }
        ctx.driver.attribute_pointer(
            location as u32,
            binding.size,
            binding.dtype,
            binding.normalized,
            binding.stride,
            binding.offset,
        );
        if old_divisor != binding.divisor {
            ctx.driver.attribute_divisor(location as u32, binding.divisor);
        }
        ctx.attribute_slots[location] = AttributeSlot {
            enabled: true,
            binding: Some(binding),
        };
    }
    Ok(())
}

fn bind_uniform<D: Driver>(
    ctx: &mut Context<D>,
    pipeline: &Pipeline,
    record: &UniformRecord,
    invocation: &Invocation,
    source: Option<&dyn PropSource>,
    st: &mut ExecState,
) -> Result<(), DrawError> {
    let (location, ty, name, value) = match record {
        UniformRecord::Static {
            location,
            ty,
            name,
            value,
        } => (*location, *ty, name, *value),
        UniformRecord::Dynamic {
            location,
            ty,
            name,
            func,
        } => (*location, *ty, name, func(invocation)),
        UniformRecord::Prop {
            location,
            ty,
            name,
            key,
            fallback,
        } => {
            let value = match source.and_then(|s| s.prop(key)) {
                Some(PropValue::Uniform(value)) => value,
                Some(_) => {
                    return Err(DrawError::ValueMismatch {
                        kind: "uniform",
                        name: name.clone(),
                    })
                }
                None => (*fallback).ok_or_else(|| DrawError::MissingProp(key.clone()))?,
            };
            (*location, *ty, name, value)
        }
    };

    if !value_matches(ty, &value) {
        return Err(DrawError::ValueMismatch {
            kind: "uniform",
            name: name.clone(),
        });
    }
    let data = match value {
        UniformValue::Texture(handle) => {
            let unit = ctx.textures.bind(&mut ctx.driver, handle)?;
            st.textures.push(handle);
            UniformData::Sampler(unit as i32)
        }
        other => to_upload(&other).ok_or_else(|| DrawError::ValueMismatch {
            kind: "uniform",
            name: name.clone(),
        })?,
    };
    ctx.programs
        .upload(&mut ctx.driver, pipeline.program, location, data)
}
