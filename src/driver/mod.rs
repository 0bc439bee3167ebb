//! The driver-facing boundary
//!
//! [`Driver`] is the only surface through which the crate touches the
//! graphics context. Real backends wrap a GL-style API; the bundled
//! [`RecordingDriver`] runs headless and records every call for
//! inspection.

pub mod recording;
pub mod types;

pub use recording::{DriverCall, RecordingDriver};
pub use types::*;

use crate::caps::{Capabilities, DeviceLimits};
use thiserror::Error;

/// Driver error type
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to compile {stage:?} shader: {log}")]
    ShaderCompileFailed { stage: ShaderStage, log: String },
    #[error("failed to link program: {0}")]
    ProgramLinkFailed(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Main graphics driver trait
///
/// Every method is a direct synchronous call into the underlying context;
/// there is no suspension point anywhere on this surface.
pub trait Driver {
    /// Optional capabilities supported by the device
    fn capabilities(&self) -> Capabilities;

    /// Fixed device limits, queried once at context creation
    fn limits(&self) -> DeviceLimits;

    // Pipeline state

    /// Enable or disable a state flag
    fn set_flag(&mut self, flag: StateFlag, enabled: bool);

    /// Apply a parametrized state variable
    fn set_state(&mut self, value: &StateValue);

    /// Clear the bound render target
    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>, stencil: Option<i32>);

    // Buffers

    fn create_buffer(&mut self) -> RawBuffer;

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>);

    /// Allocate and fill the bound buffer
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: Usage);

    /// Write a sub-range of the bound buffer
    fn buffer_sub_data(&mut self, target: BufferTarget, byte_offset: usize, data: &[u8]);

    fn delete_buffer(&mut self, buffer: RawBuffer);

    // Vertex attributes

    fn enable_attribute(&mut self, location: u32);

    #[allow(clippy::too_many_arguments)]
    fn attribute_pointer(
        &mut self,
        location: u32,
        size: u32,
        dtype: Component,
        normalized: bool,
        stride: u32,
        offset: u32,
    );

    fn attribute_divisor(&mut self, location: u32, divisor: u32);

    // Vertex arrays

    fn create_vertex_array(&mut self) -> RawVertexArray;

    fn bind_vertex_array(&mut self, vao: Option<RawVertexArray>);

    fn delete_vertex_array(&mut self, vao: RawVertexArray);

    // Textures

    fn create_texture(&mut self) -> RawTexture;

    fn active_texture(&mut self, unit: u32);

    fn bind_texture(&mut self, target: TexTarget, texture: Option<RawTexture>);

    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        dtype: Component,
        data: Option<&[u8]>,
    );

    fn compressed_tex_image_2d(
        &mut self,
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        data: &[u8],
    );

    fn tex_parameters(&mut self, target: TexTarget, params: &TexParams);

    fn generate_mipmap(&mut self, target: TexTarget);

    fn delete_texture(&mut self, texture: RawTexture);

    // Renderbuffers

    fn create_renderbuffer(&mut self) -> RawRenderbuffer;

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RawRenderbuffer>);

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32);

    fn delete_renderbuffer(&mut self, renderbuffer: RawRenderbuffer);

    // Framebuffers

    fn create_framebuffer(&mut self) -> RawFramebuffer;

    fn bind_framebuffer(&mut self, framebuffer: Option<RawFramebuffer>);

    fn framebuffer_texture_2d(
        &mut self,
        slot: AttachmentSlot,
        target: TexImageTarget,
        texture: Option<RawTexture>,
        level: u32,
    );

    fn framebuffer_renderbuffer(&mut self, slot: AttachmentSlot, renderbuffer: Option<RawRenderbuffer>);

    /// Completeness check for the bound framebuffer
    fn framebuffer_complete(&mut self) -> bool;

    /// Select the first `count` color attachments as draw-buffer outputs
    fn draw_buffers(&mut self, count: u32);

    fn delete_framebuffer(&mut self, framebuffer: RawFramebuffer);

    // Shaders and programs

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DriverResult<RawShader>;

    fn link_program(&mut self, vert: RawShader, frag: RawShader) -> DriverResult<RawProgram>;

    /// Active-attribute introspection of a linked program
    fn active_attributes(&mut self, program: RawProgram) -> Vec<RawActiveInfo>;

    /// Active-uniform introspection of a linked program
    fn active_uniforms(&mut self, program: RawProgram) -> Vec<RawActiveInfo>;

    fn use_program(&mut self, program: RawProgram);

    fn delete_shader(&mut self, shader: RawShader);

    fn delete_program(&mut self, program: RawProgram);

    // Uniforms

    fn set_uniform(&mut self, location: i32, value: &UniformData);

    // Dispatch

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    fn draw_elements(&mut self, primitive: Primitive, count: u32, width: IndexWidth, byte_offset: u32);

    fn draw_arrays_instanced(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32);

    fn draw_elements_instanced(
        &mut self,
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
        instances: u32,
    );
}
