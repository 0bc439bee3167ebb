//! Vertex buffer manager

use log::debug;

use crate::data::ShapedData;
use crate::driver::{BufferTarget, Component, Driver, RawBuffer, Usage};
use crate::error::CompileError;
use crate::pool::ScratchPool;
use crate::resources::registry::{Handle, Registry};

/// A driver buffer plus the layout facts needed to bind it as an attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buffer {
    pub raw: RawBuffer,
    pub target: BufferTarget,
    pub usage: Usage,
    pub dtype: Component,
    /// Elements per vertex of the data the buffer was filled from.
    pub dimension: u32,
    pub byte_length: usize,
}

pub type BufferHandle = Handle<Buffer>;

/// Creation options for a buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferOptions {
    pub usage: Usage,
}

/// Owns every vertex buffer and is the sole deletion authority
pub struct BufferManager {
    registry: Registry<Buffer>,
    bound: Option<RawBuffer>,
    stream_pool: Vec<BufferHandle>,
}

impl BufferManager {
    pub fn new() -> BufferManager {
        BufferManager {
            registry: Registry::new(),
            bound: None,
            stream_pool: Vec::new(),
        }
    }

    pub fn create<D: Driver>(
        &mut self,
        driver: &mut D,
        pool: &mut ScratchPool,
        data: &ShapedData,
        options: BufferOptions,
    ) -> Result<BufferHandle, CompileError> {
        let flat = data.flatten(pool)?;
        let dimension = data.vertex_dimension()? as u32;
        let raw = driver.create_buffer();
        self.bind(driver, raw);
        driver.buffer_data(BufferTarget::Array, flat.bytes(), options.usage);
        let byte_length = flat.len();
        pool.free(flat);
        debug!("buffer {:?}: {} bytes, {:?}", raw, byte_length, options.usage);
        Ok(self.registry.insert(Buffer {
            raw,
            target: BufferTarget::Array,
            usage: options.usage,
            dtype: data.component(),
            dimension,
            byte_length,
        }))
    }

    /// Partial update. Never grows the allocation.
    pub fn write<D: Driver>(
        &mut self,
        driver: &mut D,
        pool: &mut ScratchPool,
        handle: BufferHandle,
        data: &ShapedData,
        byte_offset: usize,
    ) -> Result<(), CompileError> {
        let flat = data.flatten(pool)?;
        let buffer = self
            .registry
            .get(handle)
            .copied()
            .ok_or(CompileError::StaleHandle { kind: "buffer" })?;
        if byte_offset + flat.len() > buffer.byte_length {
            let len = flat.len();
            pool.free(flat);
            return Err(CompileError::WriteOutOfBounds {
                offset: byte_offset,
                len,
                capacity: buffer.byte_length,
            });
        }
        self.bind(driver, buffer.raw);
        driver.buffer_sub_data(BufferTarget::Array, byte_offset, flat.bytes());
        pool.free(flat);
        Ok(())
    }

    /// Replace the allocation with new data, possibly of a different size.
    pub fn realloc<D: Driver>(
        &mut self,
        driver: &mut D,
        pool: &mut ScratchPool,
        handle: BufferHandle,
        data: &ShapedData,
    ) -> Result<(), CompileError> {
        let flat = data.flatten(pool)?;
        let dimension = data.vertex_dimension()? as u32;
        let raw = {
            let buffer = self
                .registry
                .get_mut(handle)
                .ok_or(CompileError::StaleHandle { kind: "buffer" })?;
            buffer.byte_length = flat.len();
            buffer.dtype = data.component();
            buffer.dimension = dimension;
            buffer.raw
        };
        self.bind(driver, raw);
        driver.buffer_data(BufferTarget::Array, flat.bytes(), Usage::Dynamic);
        pool.free(flat);
        Ok(())
    }

    pub fn get(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.registry.get(handle)
    }

    /// Diffed bind of the array target.
    pub fn bind<D: Driver>(&mut self, driver: &mut D, raw: RawBuffer) {
        if self.bound != Some(raw) {
            driver.bind_buffer(BufferTarget::Array, Some(raw));
            self.bound = Some(raw);
        }
    }

    /// Lease a stream buffer holding `bytes`, reusing a recycled one when
    /// available.
    pub fn acquire_stream<D: Driver>(
        &mut self,
        driver: &mut D,
        bytes: &[u8],
        dtype: Component,
        dimension: u32,
    ) -> BufferHandle {
        if let Some(handle) = self.stream_pool.pop() {
            if let Some(buffer) = self.registry.get_mut(handle) {
                let raw = buffer.raw;
                let grow = buffer.byte_length < bytes.len();
                buffer.byte_length = buffer.byte_length.max(bytes.len());
                buffer.dtype = dtype;
                buffer.dimension = dimension;
                self.bind(driver, raw);
                if grow {
                    driver.buffer_data(BufferTarget::Array, bytes, Usage::Stream);
                } else {
                    driver.buffer_sub_data(BufferTarget::Array, 0, bytes);
                }
                return handle;
            }
        }
        let raw = driver.create_buffer();
        self.bind(driver, raw);
        driver.buffer_data(BufferTarget::Array, bytes, Usage::Stream);
        self.registry.insert(Buffer {
            raw,
            target: BufferTarget::Array,
            usage: Usage::Stream,
            dtype,
            dimension,
            byte_length: bytes.len(),
        })
    }

    /// Return a stream buffer to the recycling pool.
    pub fn release_stream(&mut self, handle: BufferHandle) {
        self.stream_pool.push(handle);
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: BufferHandle,
    ) -> Result<(), CompileError> {
        let buffer = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle { kind: "buffer" })?;
        if self.bound == Some(buffer.raw) {
            driver.bind_buffer(BufferTarget::Array, None);
            self.bound = None;
        }
        driver.delete_buffer(buffer.raw);
        Ok(())
    }

    /// Delete every buffer, the stream pool included.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        self.stream_pool.clear();
        if self.bound.is_some() {
            driver.bind_buffer(BufferTarget::Array, None);
            self.bound = None;
        }
        for buffer in self.registry.drain() {
            driver.delete_buffer(buffer.raw);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
