//! Headless driver that records every call
//!
//! The test double behind the crate's call-count guarantees. Program
//! introspection is synthesized by scanning `attribute` and `uniform`
//! declarations in the GLSL source, so tests read like real shader code.

use std::collections::HashMap;

use crate::caps::{Capabilities, DeviceLimits};
use crate::driver::types::*;
use crate::driver::{Driver, DriverError, DriverResult};

/// One recorded driver call. Payload slices are recorded by length only.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    SetFlag {
        flag: StateFlag,
        enabled: bool,
    },
    SetState(StateValue),
    Clear {
        color: Option<[f32; 4]>,
        depth: Option<f32>,
        stencil: Option<i32>,
    },
    CreateBuffer(RawBuffer),
    BindBuffer {
        target: BufferTarget,
        buffer: Option<RawBuffer>,
    },
    BufferData {
        target: BufferTarget,
        len: usize,
        usage: Usage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        len: usize,
    },
    DeleteBuffer(RawBuffer),
    EnableAttribute(u32),
    AttributePointer {
        location: u32,
        size: u32,
        dtype: Component,
        normalized: bool,
        stride: u32,
        offset: u32,
    },
    AttributeDivisor {
        location: u32,
        divisor: u32,
    },
    CreateVertexArray(RawVertexArray),
    BindVertexArray(Option<RawVertexArray>),
    DeleteVertexArray(RawVertexArray),
    CreateTexture(RawTexture),
    ActiveTexture(u32),
    BindTexture {
        target: TexTarget,
        texture: Option<RawTexture>,
    },
    TexImage2d {
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        dtype: Component,
        len: Option<usize>,
    },
    CompressedTexImage2d {
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        len: usize,
    },
    TexParameters {
        target: TexTarget,
        params: TexParams,
    },
    GenerateMipmap(TexTarget),
    DeleteTexture(RawTexture),
    CreateRenderbuffer(RawRenderbuffer),
    BindRenderbuffer(Option<RawRenderbuffer>),
    RenderbufferStorage {
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    },
    DeleteRenderbuffer(RawRenderbuffer),
    CreateFramebuffer(RawFramebuffer),
    BindFramebuffer(Option<RawFramebuffer>),
    FramebufferTexture2d {
        slot: AttachmentSlot,
        target: TexImageTarget,
        texture: Option<RawTexture>,
        level: u32,
    },
    FramebufferRenderbuffer {
        slot: AttachmentSlot,
        renderbuffer: Option<RawRenderbuffer>,
    },
    DrawBuffers(u32),
    DeleteFramebuffer(RawFramebuffer),
    CompileShader {
        shader: RawShader,
        stage: ShaderStage,
    },
    LinkProgram {
        program: RawProgram,
        vert: RawShader,
        frag: RawShader,
    },
    UseProgram(RawProgram),
    DeleteShader(RawShader),
    DeleteProgram(RawProgram),
    SetUniform {
        location: i32,
        data: UniformData,
    },
    DrawArrays {
        primitive: Primitive,
        first: u32,
        count: u32,
    },
    DrawElements {
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
    },
    DrawArraysInstanced {
        primitive: Primitive,
        first: u32,
        count: u32,
        instances: u32,
    },
    DrawElementsInstanced {
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
        instances: u32,
    },
}

impl DriverCall {
    /// Whether this call mutates driver state observable by later draws.
    /// Object creation, deletion, introspection, clears and dispatches are
    /// not state changes.
    pub fn is_state_change(&self) -> bool {
        !matches!(
            self,
            DriverCall::Clear { .. }
                | DriverCall::CreateBuffer(_)
                | DriverCall::DeleteBuffer(_)
                | DriverCall::CreateVertexArray(_)
                | DriverCall::DeleteVertexArray(_)
                | DriverCall::CreateTexture(_)
                | DriverCall::DeleteTexture(_)
                | DriverCall::CreateRenderbuffer(_)
                | DriverCall::DeleteRenderbuffer(_)
                | DriverCall::CreateFramebuffer(_)
                | DriverCall::DeleteFramebuffer(_)
                | DriverCall::CompileShader { .. }
                | DriverCall::LinkProgram { .. }
                | DriverCall::DeleteShader(_)
                | DriverCall::DeleteProgram(_)
                | DriverCall::DrawArrays { .. }
                | DriverCall::DrawElements { .. }
                | DriverCall::DrawArraysInstanced { .. }
                | DriverCall::DrawElementsInstanced { .. }
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DriverCall::DrawArrays { .. }
                | DriverCall::DrawElements { .. }
                | DriverCall::DrawArraysInstanced { .. }
                | DriverCall::DrawElementsInstanced { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct ShaderRecord {
    stage: ShaderStage,
    source: String,
}

/// Headless recording driver
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    capabilities: Capabilities,
    limits: DeviceLimits,
    next_id: u32,
    shaders: HashMap<RawShader, ShaderRecord>,
    programs: HashMap<RawProgram, (RawShader, RawShader)>,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        RecordingDriver::new()
    }
}

impl RecordingDriver {
    /// A driver advertising every capability and the default limits.
    pub fn new() -> RecordingDriver {
        RecordingDriver::with_capabilities(Capabilities::all())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> RecordingDriver {
        RecordingDriver {
            calls: Vec::new(),
            capabilities,
            limits: DeviceLimits::default(),
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
        }
    }

    pub fn with_limits(mut self, limits: DeviceLimits) -> RecordingDriver {
        self.limits = limits;
        self
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DriverCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn state_change_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_state_change()).count()
    }

    pub fn draw_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_draw()).count()
    }

    pub fn count_matching(&self, pred: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&mut self, call: DriverCall) {
        self.calls.push(call);
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn introspect(&self, program: RawProgram, qualifier: &str) -> Vec<RawActiveInfo> {
        let Some(&(vert, frag)) = self.programs.get(&program) else {
            return Vec::new();
        };
        let mut infos = Vec::new();
        let mut seen = Vec::new();
        for shader in [vert, frag] {
            let Some(record) = self.shaders.get(&shader) else {
                continue;
            };
            for declaration in scan_declarations(&record.source, qualifier) {
                if seen.contains(&declaration.0) {
                    continue;
                }
                let location = infos.len() as i32;
                seen.push(declaration.0.clone());
                infos.push(RawActiveInfo {
                    name: declaration.0,
                    location,
                    ty: declaration.1,
                    size: declaration.2,
                });
            }
        }
        infos
    }
}

/// Scan GLSL-style declarations of the given qualifier, yielding
/// (name, type, array size).
fn scan_declarations(source: &str, qualifier: &str) -> Vec<(String, GlType, u32)> {
    let mut out = Vec::new();
    for line in source.lines() {
        let line = line.trim().trim_end_matches(';');
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(qualifier) {
            continue;
        }
        let mut ty_token = match tokens.next() {
            Some(t) => t,
            None => continue,
        };
        // Skip precision qualifiers.
        if matches!(ty_token, "lowp" | "mediump" | "highp") {
            ty_token = match tokens.next() {
                Some(t) => t,
                None => continue,
            };
        }
        let Some(ty) = parse_gl_type(ty_token) else {
            continue;
        };
        let Some(name_token) = tokens.next() else {
            continue;
        };
        let (name, size) = match name_token.split_once('[') {
            Some((name, rest)) => {
                let size = rest
                    .trim_end_matches(']')
                    .parse::<u32>()
                    .unwrap_or(1);
                (name, size)
            }
            None => (name_token, 1),
        };
        out.push((name.to_owned(), ty, size));
    }
    out
}

fn parse_gl_type(token: &str) -> Option<GlType> {
    Some(match token {
        "float" => GlType::Float,
        "int" => GlType::Int,
        "bool" => GlType::Bool,
        "vec2" => GlType::FloatVec2,
        "vec3" => GlType::FloatVec3,
        "vec4" => GlType::FloatVec4,
        "ivec2" => GlType::IntVec2,
        "ivec3" => GlType::IntVec3,
        "ivec4" => GlType::IntVec4,
        "bvec2" => GlType::BoolVec2,
        "bvec3" => GlType::BoolVec3,
        "bvec4" => GlType::BoolVec4,
        "mat2" => GlType::FloatMat2,
        "mat3" => GlType::FloatMat3,
        "mat4" => GlType::FloatMat4,
        "sampler2D" => GlType::Sampler2d,
        "samplerCube" => GlType::SamplerCube,
        _ => return None,
    })
}

impl Driver for RecordingDriver {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn set_flag(&mut self, flag: StateFlag, enabled: bool) {
        self.record(DriverCall::SetFlag { flag, enabled });
    }

    fn set_state(&mut self, value: &StateValue) {
        self.record(DriverCall::SetState(*value));
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>, stencil: Option<i32>) {
        self.record(DriverCall::Clear {
            color,
            depth,
            stencil,
        });
    }

    fn create_buffer(&mut self) -> RawBuffer {
        let buffer = RawBuffer(self.fresh_id());
        self.record(DriverCall::CreateBuffer(buffer));
        buffer
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<RawBuffer>) {
        self.record(DriverCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: Usage) {
        self.record(DriverCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, byte_offset: usize, data: &[u8]) {
        self.record(DriverCall::BufferSubData {
            target,
            offset: byte_offset,
            len: data.len(),
        });
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        self.record(DriverCall::DeleteBuffer(buffer));
    }

    fn enable_attribute(&mut self, location: u32) {
        self.record(DriverCall::EnableAttribute(location));
    }

    fn attribute_pointer(
        &mut self,
        location: u32,
        size: u32,
        dtype: Component,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        self.record(DriverCall::AttributePointer {
            location,
            size,
            dtype,
            normalized,
            stride,
            offset,
        });
    }

    fn attribute_divisor(&mut self, location: u32, divisor: u32) {
        self.record(DriverCall::AttributeDivisor { location, divisor });
    }

    fn create_vertex_array(&mut self) -> RawVertexArray {
        let vao = RawVertexArray(self.fresh_id());
        self.record(DriverCall::CreateVertexArray(vao));
        vao
    }

    fn bind_vertex_array(&mut self, vao: Option<RawVertexArray>) {
        self.record(DriverCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&mut self, vao: RawVertexArray) {
        self.record(DriverCall::DeleteVertexArray(vao));
    }

    fn create_texture(&mut self) -> RawTexture {
        let texture = RawTexture(self.fresh_id());
        self.record(DriverCall::CreateTexture(texture));
        texture
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(DriverCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TexTarget, texture: Option<RawTexture>) {
        self.record(DriverCall::BindTexture { target, texture });
    }

    fn tex_image_2d(
        &mut self,
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        dtype: Component,
        data: Option<&[u8]>,
    ) {
        self.record(DriverCall::TexImage2d {
            target,
            level,
            layout,
            width,
            height,
            dtype,
            len: data.map(|d| d.len()),
        });
    }

    fn compressed_tex_image_2d(
        &mut self,
        target: TexImageTarget,
        level: u32,
        layout: ColorLayout,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        self.record(DriverCall::CompressedTexImage2d {
            target,
            level,
            layout,
            width,
            height,
            len: data.len(),
        });
    }

    fn tex_parameters(&mut self, target: TexTarget, params: &TexParams) {
        self.record(DriverCall::TexParameters {
            target,
            params: *params,
        });
    }

    fn generate_mipmap(&mut self, target: TexTarget) {
        self.record(DriverCall::GenerateMipmap(target));
    }

    fn delete_texture(&mut self, texture: RawTexture) {
        self.record(DriverCall::DeleteTexture(texture));
    }

    fn create_renderbuffer(&mut self) -> RawRenderbuffer {
        let renderbuffer = RawRenderbuffer(self.fresh_id());
        self.record(DriverCall::CreateRenderbuffer(renderbuffer));
        renderbuffer
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RawRenderbuffer>) {
        self.record(DriverCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32) {
        self.record(DriverCall::RenderbufferStorage {
            format,
            width,
            height,
        });
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RawRenderbuffer) {
        self.record(DriverCall::DeleteRenderbuffer(renderbuffer));
    }

    fn create_framebuffer(&mut self) -> RawFramebuffer {
        let framebuffer = RawFramebuffer(self.fresh_id());
        self.record(DriverCall::CreateFramebuffer(framebuffer));
        framebuffer
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<RawFramebuffer>) {
        self.record(DriverCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(
        &mut self,
        slot: AttachmentSlot,
        target: TexImageTarget,
        texture: Option<RawTexture>,
        level: u32,
    ) {
        self.record(DriverCall::FramebufferTexture2d {
            slot,
            target,
            texture,
            level,
        });
    }

    fn framebuffer_renderbuffer(
        &mut self,
        slot: AttachmentSlot,
        renderbuffer: Option<RawRenderbuffer>,
    ) {
        self.record(DriverCall::FramebufferRenderbuffer { slot, renderbuffer });
    }

    fn framebuffer_complete(&mut self) -> bool {
        true
    }

    fn draw_buffers(&mut self, count: u32) {
        self.record(DriverCall::DrawBuffers(count));
    }

    fn delete_framebuffer(&mut self, framebuffer: RawFramebuffer) {
        self.record(DriverCall::DeleteFramebuffer(framebuffer));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DriverResult<RawShader> {
        if source.trim().is_empty() {
            return Err(DriverError::ShaderCompileFailed {
                stage,
                log: "empty source".to_owned(),
            });
        }
        let shader = RawShader(self.fresh_id());
        self.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: source.to_owned(),
            },
        );
        self.record(DriverCall::CompileShader { shader, stage });
        Ok(shader)
    }

    fn link_program(&mut self, vert: RawShader, frag: RawShader) -> DriverResult<RawProgram> {
        for (shader, expected) in [(vert, ShaderStage::Vertex), (frag, ShaderStage::Fragment)] {
            match self.shaders.get(&shader) {
                Some(record) if record.stage == expected => {}
                _ => {
                    return Err(DriverError::ProgramLinkFailed(format!(
                        "no {:?} shader {:?}",
                        expected, shader
                    )))
                }
            }
        }
        let program = RawProgram(self.fresh_id());
        self.programs.insert(program, (vert, frag));
        self.record(DriverCall::LinkProgram {
            program,
            vert,
            frag,
        });
        Ok(program)
    }

    fn active_attributes(&mut self, program: RawProgram) -> Vec<RawActiveInfo> {
        self.introspect(program, "attribute")
    }

    fn active_uniforms(&mut self, program: RawProgram) -> Vec<RawActiveInfo> {
        self.introspect(program, "uniform")
    }

    fn use_program(&mut self, program: RawProgram) {
        self.record(DriverCall::UseProgram(program));
    }

    fn delete_shader(&mut self, shader: RawShader) {
        self.shaders.remove(&shader);
        self.record(DriverCall::DeleteShader(shader));
    }

    fn delete_program(&mut self, program: RawProgram) {
        self.programs.remove(&program);
        self.record(DriverCall::DeleteProgram(program));
    }

    fn set_uniform(&mut self, location: i32, data: &UniformData) {
        self.record(DriverCall::SetUniform {
            location,
            data: data.clone(),
        });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.record(DriverCall::DrawArrays {
            primitive,
            first,
            count,
        });
    }

    fn draw_elements(
        &mut self,
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
    ) {
        self.record(DriverCall::DrawElements {
            primitive,
            count,
            width,
            byte_offset,
        });
    }

    fn draw_arrays_instanced(&mut self, primitive: Primitive, first: u32, count: u32, instances: u32) {
        self.record(DriverCall::DrawArraysInstanced {
            primitive,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
        instances: u32,
    ) {
        self.record(DriverCall::DrawElementsInstanced {
            primitive,
            count,
            width,
            byte_offset,
            instances,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_attribute_declarations() {
        let source = "\
            attribute vec2 position;\n\
            attribute highp vec4 color;\n\
            uniform mat4 view;\n\
            void main() {}\n";
        let attrs = scan_declarations(source, "attribute");
        assert_eq!(
            attrs,
            vec![
                ("position".to_owned(), GlType::FloatVec2, 1),
                ("color".to_owned(), GlType::FloatVec4, 1),
            ]
        );
        let uniforms = scan_declarations(source, "uniform");
        assert_eq!(uniforms, vec![("view".to_owned(), GlType::FloatMat4, 1)]);
    }

    #[test]
    fn scans_array_declarations() {
        let source = "uniform vec4 lights[4];";
        assert_eq!(
            scan_declarations(source, "uniform"),
            vec![("lights".to_owned(), GlType::FloatVec4, 4)]
        );
    }

    #[test]
    fn introspection_merges_stages_without_duplicates() {
        let mut driver = RecordingDriver::new();
        let vert = driver
            .compile_shader(
                ShaderStage::Vertex,
                "attribute vec2 position;\nuniform mat4 view;\nvoid main() {}",
            )
            .unwrap();
        let frag = driver
            .compile_shader(
                ShaderStage::Fragment,
                "uniform mat4 view;\nuniform vec4 color;\nvoid main() {}",
            )
            .unwrap();
        let program = driver.link_program(vert, frag).unwrap();
        let uniforms = driver.active_uniforms(program);
        let names: Vec<_> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["view", "color"]);
        let locations: Vec<_> = uniforms.iter().map(|u| u.location).collect();
        assert_eq!(locations, vec![0, 1]);
    }

    #[test]
    fn empty_source_fails_to_compile() {
        let mut driver = RecordingDriver::new();
        assert!(driver.compile_shader(ShaderStage::Vertex, "  ").is_err());
    }
}
