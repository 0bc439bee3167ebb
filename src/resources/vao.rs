//! Vertex array object manager
//!
//! A vao freezes a set of attribute bindings, an optional index buffer and
//! default draw parameters into one driver object, so a pipeline binds
//! everything with a single call.

use log::debug;

use crate::caps::{Capability, CapabilityRegistry};
use crate::driver::{BufferTarget, Component, Driver, Primitive, RawVertexArray};
use crate::error::CompileError;
use crate::resources::buffer::{BufferHandle, BufferManager};
use crate::resources::element::{ElementBuffer, ElementHandle, ElementManager};
use crate::resources::registry::{Handle, Registry};

/// One attribute binding inside a vao, in location order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaoAttribute {
    pub buffer: BufferHandle,
    /// Components per vertex; defaults to the buffer's vertex dimension.
    pub size: Option<u32>,
    /// Element type; defaults to the buffer's element type.
    pub dtype: Option<Component>,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
    pub divisor: u32,
}

impl VaoAttribute {
    pub fn new(buffer: BufferHandle) -> VaoAttribute {
        VaoAttribute {
            buffer,
            size: None,
            dtype: None,
            normalized: false,
            stride: 0,
            offset: 0,
            divisor: 0,
        }
    }
}

/// Creation options for a vao
#[derive(Debug, Clone, Default)]
pub struct VaoOptions {
    pub attributes: Vec<VaoAttribute>,
    pub elements: Option<ElementHandle>,
    pub offset: u32,
    pub count: Option<u32>,
    pub instances: u32,
    pub primitive: Option<Primitive>,
}

/// A created vao with its frozen draw parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vao {
    pub raw: RawVertexArray,
    pub attribute_count: u32,
    pub elements: Option<ElementBuffer>,
    pub offset: u32,
    pub count: Option<u32>,
    pub instances: u32,
    pub primitive: Option<Primitive>,
}

pub type VaoHandle = Handle<Vao>;

/// Owns every vao and the current vao binding
pub struct VaoManager {
    registry: Registry<Vao>,
    bound: Option<RawVertexArray>,
}

impl VaoManager {
    pub fn new() -> VaoManager {
        VaoManager {
            registry: Registry::new(),
            bound: None,
        }
    }

    pub fn create<D: Driver>(
        &mut self,
        driver: &mut D,
        caps: &CapabilityRegistry,
        buffers: &mut BufferManager,
        elements: &ElementManager,
        options: &VaoOptions,
    ) -> Result<VaoHandle, CompileError> {
        if !caps.has(Capability::VertexArrayObjects) {
            return Err(CompileError::VaoUnsupported);
        }
        if options.attributes.is_empty() {
            return Err(CompileError::EmptyData);
        }
        let element_buffer = match options.elements {
            Some(handle) => Some(
                *elements
                    .get(handle)
                    .ok_or(CompileError::StaleHandle { kind: "elements" })?,
            ),
            None => None,
        };
        for attribute in &options.attributes {
            if attribute.stride > 255 {
                return Err(CompileError::StrideOutOfRange(attribute.stride));
            }
            if attribute.divisor > 0 && !caps.has(Capability::Instancing) {
                return Err(CompileError::InstancingUnsupported);
            }
        }
        if options.instances > 0 && !caps.has(Capability::Instancing) {
            return Err(CompileError::InstancingUnsupported);
        }

        let raw = driver.create_vertex_array();
        self.bind(driver, raw);
        for (location, attribute) in options.attributes.iter().enumerate() {
            let buffer = *buffers
                .get(attribute.buffer)
                .ok_or(CompileError::StaleHandle { kind: "buffer" })?;
            let location = location as u32;
            buffers.bind(driver, buffer.raw);
            driver.enable_attribute(location);
            driver.attribute_pointer(
                location,
                attribute.size.unwrap_or(buffer.dimension),
                attribute.dtype.unwrap_or(buffer.dtype),
                attribute.normalized,
                attribute.stride,
                attribute.offset,
            );
            if attribute.divisor > 0 {
                driver.attribute_divisor(location, attribute.divisor);
            }
        }
        if let Some(element) = &element_buffer {
            // Recorded into the vao, not into the default binding.
            driver.bind_buffer(BufferTarget::ElementArray, Some(element.raw));
        }
        self.unbind(driver);
        debug!(
            "vao {:?}: {} attributes, indexed: {}",
            raw,
            options.attributes.len(),
            element_buffer.is_some()
        );

        Ok(self.registry.insert(Vao {
            raw,
            attribute_count: options.attributes.len() as u32,
            elements: element_buffer,
            offset: options.offset,
            count: options.count,
            instances: options.instances,
            primitive: options.primitive,
        }))
    }

    pub fn get(&self, handle: VaoHandle) -> Option<&Vao> {
        self.registry.get(handle)
    }

    /// Diffed vao bind.
    pub fn bind<D: Driver>(&mut self, driver: &mut D, raw: RawVertexArray) {
        if self.bound != Some(raw) {
            driver.bind_vertex_array(Some(raw));
            self.bound = Some(raw);
        }
    }

    /// Diffed return to the default vertex array.
    pub fn unbind<D: Driver>(&mut self, driver: &mut D) {
        if self.bound.is_some() {
            driver.bind_vertex_array(None);
            self.bound = None;
        }
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: VaoHandle,
    ) -> Result<(), CompileError> {
        let vao = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle { kind: "vao" })?;
        if self.bound == Some(vao.raw) {
            driver.bind_vertex_array(None);
            self.bound = None;
        }
        driver.delete_vertex_array(vao.raw);
        Ok(())
    }

    /// Delete every vao.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        self.unbind(driver);
        for vao in self.registry.drain() {
            driver.delete_vertex_array(vao.raw);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
