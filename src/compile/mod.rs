//! The draw-call compiler
//!
//! Compilation parses each section of the descriptor, materializes
//! resources, cross-validates records against the linked program and
//! freezes everything into a [`Pipeline`]: record tables plus an op list
//! in fixed order. [`DrawCommand`] is the reusable public wrapper.

pub mod attributes;
pub mod elements;
mod exec;
pub mod ops;
pub mod status;
pub mod uniforms;

use log::debug;

use crate::caps::Capability;
use crate::context::Context;
use crate::data::PropSource;
use crate::descriptor::{ClearPolicy, DrawDescriptor, TargetSource};
use crate::driver::{Driver, Primitive};
use crate::error::{CompileError, DrawError};
use crate::render_state::RenderState;
use crate::resources::element::{ElementBuffer, ElementHandle};
use crate::resources::framebuffer::FramebufferHandle;
use crate::resources::program::ProgramHandle;
use crate::resources::vao::VaoHandle;

use attributes::AttributeRecord;
use ops::{Dispatch, Op};
use uniforms::UniformRecord;

/// The frozen artifact of one compiled descriptor
pub struct Pipeline {
    pub(crate) program: ProgramHandle,
    pub(crate) state: RenderState,
    pub(crate) attributes: Vec<AttributeRecord>,
    pub(crate) uniforms: Vec<UniformRecord>,
    pub(crate) elements: Option<ElementHandle>,
    pub(crate) vao: Option<VaoHandle>,
    /// `None` is the default drawing surface.
    pub(crate) target: Option<(FramebufferHandle, u32)>,
    pub(crate) clear: Option<ClearPolicy>,
    pub(crate) dispatch: Dispatch,
    pub(crate) ops: Vec<Op>,
}

/// A compiled, reusable draw command
pub struct DrawCommand {
    pipeline: Pipeline,
}

impl DrawCommand {
    /// Run the op list once with no batch element.
    pub fn draw<D: Driver>(&self, ctx: &mut Context<D>) -> Result<(), DrawError> {
        exec::run(&self.pipeline, ctx, None)
    }

    /// Run the op list once per element, in order, resolving prop-tagged
    /// records from each element.
    pub fn batch<D: Driver, P: PropSource>(
        &self,
        ctx: &mut Context<D>,
        elements: &[P],
    ) -> Result<(), DrawError> {
        for (index, element) in elements.iter().enumerate() {
            exec::run(&self.pipeline, ctx, Some((element, index)))?;
        }
        Ok(())
    }
}

pub(crate) fn compile_descriptor<D: Driver>(
    ctx: &mut Context<D>,
    descriptor: DrawDescriptor,
) -> Result<DrawCommand, CompileError> {
    if descriptor.vao.is_some() {
        // The vao froze attribute pointers and the element binding at
        // creation; a second source for either would be silently ignored
        // at dispatch.
        if !descriptor.attributes.is_empty() {
            return Err(CompileError::VaoConflict("attributes"));
        }
        if descriptor.elements.is_some() {
            return Err(CompileError::VaoConflict("elements"));
        }
    }

    let state = status::parse_status(&descriptor.status)?;

    let program = ctx.programs.link(
        &mut ctx.driver,
        &mut ctx.strings,
        &descriptor.vert,
        &descriptor.frag,
    )?;
    let (active_attributes, active_uniforms) = {
        let program = ctx
            .programs
            .get(program)
            .ok_or(CompileError::StaleHandle { kind: "program" })?;
        (program.attributes.clone(), program.uniforms.clone())
    };

    let elements = match &descriptor.elements {
        Some(source) => {
            // The upload must land on the default element binding, not
            // inside a vao a previous draw left bound.
            ctx.vaos.unbind(&mut ctx.driver);
            Some(elements::parse_elements(
                &mut ctx.driver,
                &mut ctx.elements,
                &mut ctx.scratch,
                &ctx.caps,
                source,
            )?)
        }
        None => None,
    };

    let vao = match descriptor.vao {
        Some(handle) => Some((
            handle,
            *ctx.vaos
                .get(handle)
                .ok_or(CompileError::StaleHandle { kind: "vao" })?,
        )),
        None => None,
    };

    let attribute_records = match &vao {
        Some((_, vao)) => {
            // Vao bindings are positional; every active attribute location
            // must be covered.
            if let Some(uncovered) = active_attributes
                .iter()
                .find(|var| var.location as u32 >= vao.attribute_count)
            {
                return Err(CompileError::MissingRecord {
                    kind: "attribute",
                    name: uncovered.name.clone(),
                });
            }
            Vec::new()
        }
        None => attributes::parse_attributes(
            &mut ctx.driver,
            &mut ctx.buffers,
            &mut ctx.scratch,
            &ctx.caps,
            &active_attributes,
            descriptor.attributes,
        )?,
    };

    let uniform_records = uniforms::parse_uniforms(&active_uniforms, descriptor.uniforms)?;

    if descriptor.instances > 0 && !ctx.caps.has(Capability::Instancing) {
        return Err(CompileError::InstancingUnsupported);
    }

    let target = match descriptor.target.unwrap_or_default() {
        TargetSource::Screen => None,
        TargetSource::Framebuffer(handle) => {
            ctx.framebuffers
                .get(handle)
                .ok_or(CompileError::StaleHandle {
                    kind: "framebuffer",
                })?;
            Some((handle, 0))
        }
        TargetSource::CubeFace { framebuffer, face } => {
            let fb = ctx
                .framebuffers
                .get(framebuffer)
                .ok_or(CompileError::StaleHandle {
                    kind: "framebuffer",
                })?;
            if face >= fb.face_count() {
                return Err(CompileError::CubeFaceOutOfRange(face));
            }
            Some((framebuffer, face))
        }
    };

    // Dispatch resolution. Indexed facts come from the descriptor's
    // elements first, then from the vao's frozen element binding.
    let vao_params = vao.as_ref().map(|(_, vao)| *vao);
    let element_info: Option<ElementBuffer> = match elements {
        Some(handle) => ctx.elements.get(handle).copied(),
        None => vao_params.as_ref().and_then(|vao| vao.elements),
    };
    let primitive = descriptor
        .primitive
        .or(vao_params.as_ref().and_then(|vao| vao.primitive))
        .or(element_info.as_ref().map(|element| element.primitive))
        .unwrap_or(Primitive::Triangles);
    let count = descriptor
        .count
        .or(vao_params.as_ref().and_then(|vao| vao.count))
        .or(element_info.as_ref().map(|element| element.vert_count));
    let count = match count {
        Some(count) => count,
        None => return Err(CompileError::MissingCount),
    };
    let offset = if descriptor.offset != 0 {
        descriptor.offset
    } else {
        vao_params.as_ref().map(|vao| vao.offset).unwrap_or(0)
    };
    let instances = if descriptor.instances != 0 {
        descriptor.instances
    } else {
        vao_params.as_ref().map(|vao| vao.instances).unwrap_or(0)
    };

    let dispatch = match (&element_info, instances > 0) {
        (Some(element), true) => Dispatch::ElementsInstanced {
            primitive,
            count,
            width: element.width,
            byte_offset: offset * element.width.bytes(),
            instances,
        },
        (Some(element), false) => Dispatch::Elements {
            primitive,
            count,
            width: element.width,
            byte_offset: offset * element.width.bytes(),
        },
        (None, true) => Dispatch::ArraysInstanced {
            primitive,
            first: offset,
            count,
            instances,
        },
        (None, false) => Dispatch::Arrays {
            primitive,
            first: offset,
            count,
        },
    };

    // Op list in fixed order.
    let mut op_list = vec![Op::ApplyState, Op::PushTarget];
    if descriptor.clear.is_some() {
        op_list.push(Op::Clear);
    }
    op_list.push(Op::BindProgram);
    if vao.is_some() {
        op_list.push(Op::BindVao);
    } else {
        op_list.push(Op::UnbindVao);
        for index in 0..attribute_records.len() {
            op_list.push(Op::BindAttribute(index));
        }
    }
    for index in 0..uniform_records.len() {
        op_list.push(Op::BindUniform(index));
    }
    op_list.push(Op::Dispatch);
    op_list.push(Op::ReleaseResources);
    op_list.push(Op::PopTarget);
    op_list.push(Op::Tick);

    debug!(
        "compiled pipeline: {} attributes, {} uniforms, {:?}",
        attribute_records.len(),
        uniform_records.len(),
        dispatch
    );

    Ok(DrawCommand {
        pipeline: Pipeline {
            program,
            state,
            attributes: attribute_records,
            uniforms: uniform_records,
            elements,
            vao: vao.map(|(handle, _)| handle),
            target,
            clear: descriptor.clear,
            dispatch,
            ops: op_list,
        },
    })
}
