//! The compiler entry point
//!
//! One [`Context`] owns the driver and everything layered on top of it:
//! capability registry, resource managers, scratch pools and the applied
//! state snapshots. Compiled commands execute against `&mut Context`, so
//! exclusive access to the driver is the borrow checker's problem, not a
//! runtime discipline.

use log::info;

use crate::caps::{Capabilities, CapabilityRegistry, DeviceLimits};
use crate::compile::{self, DrawCommand};
use crate::data::ShapedData;
use crate::descriptor::{ClearPolicy, DrawDescriptor};
use crate::driver::{Component, Driver, Primitive, RawBuffer, RenderbufferFormat};
use crate::error::CompileError;
use crate::pool::ScratchPool;
use crate::render_state::CurrentState;
use crate::resources::buffer::{BufferHandle, BufferManager, BufferOptions};
use crate::resources::element::{ElementHandle, ElementManager, IndexData};
use crate::resources::framebuffer::{FramebufferHandle, FramebufferManager, FramebufferOptions};
use crate::resources::renderbuffer::{RenderbufferHandle, RenderbufferManager};
use crate::resources::strings::StringInterner;
use crate::resources::texture::{TextureData, TextureHandle, TextureManager, TextureOptions};
use crate::resources::vao::{VaoHandle, VaoManager, VaoOptions};
use crate::resources::program::ProgramManager;

/// Context creation options
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    /// Optional capabilities to negotiate with the driver.
    pub capabilities: Capabilities,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            capabilities: Capabilities::all(),
        }
    }
}

/// Live resource counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub buffers: usize,
    pub elements: usize,
    pub textures: usize,
    pub programs: usize,
    pub renderbuffers: usize,
    pub framebuffers: usize,
    pub vaos: usize,
}

/// The pointer layout applied on one attribute location
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AttributeBinding {
    pub raw: RawBuffer,
    pub size: u32,
    pub dtype: Component,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
    pub divisor: u32,
}

/// Applied snapshot of one attribute location
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AttributeSlot {
    pub enabled: bool,
    pub binding: Option<AttributeBinding>,
}

/// Owns the driver and every resource manager
pub struct Context<D: Driver> {
    pub(crate) driver: D,
    pub(crate) caps: CapabilityRegistry,
    pub(crate) limits: DeviceLimits,
    pub(crate) strings: StringInterner,
    pub(crate) scratch: ScratchPool,
    pub(crate) buffers: BufferManager,
    pub(crate) elements: ElementManager,
    pub(crate) textures: TextureManager,
    pub(crate) programs: ProgramManager,
    pub(crate) renderbuffers: RenderbufferManager,
    pub(crate) framebuffers: FramebufferManager,
    pub(crate) vaos: VaoManager,
    pub(crate) state: CurrentState,
    pub(crate) attribute_slots: Vec<AttributeSlot>,
    pub(crate) ticks: u64,
}

impl<D: Driver> Context<D> {
    pub fn new(driver: D, config: ContextConfig) -> Context<D> {
        let caps = CapabilityRegistry::negotiate(&driver, config.capabilities);
        let limits = driver.limits();
        info!(
            "context up: {} attribute slots, {} texture units",
            limits.max_attributes, limits.max_combined_texture_units
        );
        Context {
            caps,
            textures: TextureManager::new(limits.max_combined_texture_units),
            attribute_slots: vec![AttributeSlot::default(); limits.max_attributes as usize],
            limits,
            driver,
            strings: StringInterner::new(),
            scratch: ScratchPool::new(),
            buffers: BufferManager::new(),
            elements: ElementManager::new(),
            programs: ProgramManager::new(),
            renderbuffers: RenderbufferManager::new(),
            framebuffers: FramebufferManager::new(),
            vaos: VaoManager::new(),
            state: CurrentState::default(),
            ticks: 0,
        }
    }

    // Resource constructors

    pub fn buffer(
        &mut self,
        data: impl Into<ShapedData>,
        options: BufferOptions,
    ) -> Result<BufferHandle, CompileError> {
        self.buffers
            .create(&mut self.driver, &mut self.scratch, &data.into(), options)
    }

    /// Partial update of an existing buffer.
    pub fn buffer_write(
        &mut self,
        handle: BufferHandle,
        data: impl Into<ShapedData>,
        byte_offset: usize,
    ) -> Result<(), CompileError> {
        self.buffers.write(
            &mut self.driver,
            &mut self.scratch,
            handle,
            &data.into(),
            byte_offset,
        )
    }

    /// Replace a buffer's allocation with new data.
    pub fn buffer_realloc(
        &mut self,
        handle: BufferHandle,
        data: impl Into<ShapedData>,
    ) -> Result<(), CompileError> {
        self.buffers
            .realloc(&mut self.driver, &mut self.scratch, handle, &data.into())
    }

    pub fn elements(&mut self, data: impl Into<IndexData>) -> Result<ElementHandle, CompileError> {
        self.elements_with(data, None)
    }

    pub fn elements_with(
        &mut self,
        data: impl Into<IndexData>,
        primitive: Option<Primitive>,
    ) -> Result<ElementHandle, CompileError> {
        // The element-array bind below must land on the default binding,
        // not inside a vao a previous draw left bound.
        self.vaos.unbind(&mut self.driver);
        self.elements.create(
            &mut self.driver,
            &mut self.scratch,
            &self.caps,
            &data.into(),
            primitive,
        )
    }

    pub fn texture_2d(
        &mut self,
        width: u32,
        height: u32,
        data: &TextureData,
        options: TextureOptions,
    ) -> Result<TextureHandle, CompileError> {
        self.textures.create_2d(
            &mut self.driver,
            &self.caps,
            &self.limits,
            width,
            height,
            data,
            options,
        )
    }

    pub fn texture_cube(
        &mut self,
        size: u32,
        faces: &[TextureData; 6],
        options: TextureOptions,
    ) -> Result<TextureHandle, CompileError> {
        self.textures.create_cube(
            &mut self.driver,
            &self.caps,
            &self.limits,
            size,
            faces,
            options,
        )
    }

    pub fn renderbuffer(
        &mut self,
        width: u32,
        height: u32,
        format: RenderbufferFormat,
    ) -> Result<RenderbufferHandle, CompileError> {
        self.renderbuffers
            .create(&mut self.driver, &self.limits, width, height, format)
    }

    pub fn framebuffer(
        &mut self,
        options: &FramebufferOptions,
    ) -> Result<FramebufferHandle, CompileError> {
        self.framebuffers.create(
            &mut self.driver,
            &self.caps,
            &self.limits,
            &self.textures,
            &self.renderbuffers,
            options,
        )
    }

    pub fn vao(&mut self, options: &VaoOptions) -> Result<VaoHandle, CompileError> {
        self.vaos.create(
            &mut self.driver,
            &self.caps,
            &mut self.buffers,
            &self.elements,
            options,
        )
    }

    /// Clear the desired render target.
    pub fn clear(&mut self, policy: &ClearPolicy) {
        if policy.is_empty() {
            return;
        }
        self.framebuffers.poll(&mut self.driver);
        self.driver.clear(policy.color, policy.depth, policy.stencil);
    }

    /// Compile a declarative draw description into a reusable command.
    pub fn compile(&mut self, descriptor: DrawDescriptor) -> Result<DrawCommand, CompileError> {
        compile::compile_descriptor(self, descriptor)
    }

    // Destruction

    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), CompileError> {
        self.buffers.destroy(&mut self.driver, handle)
    }

    pub fn destroy_elements(&mut self, handle: ElementHandle) -> Result<(), CompileError> {
        self.elements.destroy(&mut self.driver, handle)
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) -> Result<(), CompileError> {
        self.textures.destroy(&mut self.driver, handle)
    }

    pub fn destroy_renderbuffer(&mut self, handle: RenderbufferHandle) -> Result<(), CompileError> {
        self.renderbuffers.destroy(&mut self.driver, handle)
    }

    pub fn destroy_framebuffer(&mut self, handle: FramebufferHandle) -> Result<(), CompileError> {
        self.framebuffers.destroy(&mut self.driver, handle)
    }

    pub fn destroy_vao(&mut self, handle: VaoHandle) -> Result<(), CompileError> {
        self.vaos.destroy(&mut self.driver, handle)
    }

    /// Delete every driver object this context created, cached programs
    /// and shaders included, and hand the driver back.
    pub fn dispose(mut self) -> D {
        self.vaos.clear(&mut self.driver);
        self.framebuffers.clear(&mut self.driver);
        self.renderbuffers.clear(&mut self.driver);
        self.textures.clear(&mut self.driver);
        self.elements.clear(&mut self.driver);
        self.buffers.clear(&mut self.driver);
        self.programs.clear(&mut self.driver);
        info!("context disposed");
        self.driver
    }

    // Introspection

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            buffers: self.buffers.len(),
            elements: self.elements.len(),
            textures: self.textures.len(),
            programs: self.programs.len(),
            renderbuffers: self.renderbuffers.len(),
            framebuffers: self.framebuffers.len(),
            vaos: self.vaos.len(),
        }
    }

    /// Process-wide invocation counter.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps.enabled()
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
