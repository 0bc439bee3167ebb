//! Renderbuffer manager

use log::debug;

use crate::caps::DeviceLimits;
use crate::driver::{Driver, RawRenderbuffer, RenderbufferFormat};
use crate::error::CompileError;
use crate::resources::registry::{Handle, Registry};

/// An allocated renderbuffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderbuffer {
    pub raw: RawRenderbuffer,
    pub width: u32,
    pub height: u32,
    pub format: RenderbufferFormat,
}

pub type RenderbufferHandle = Handle<Renderbuffer>;

/// Owns every renderbuffer
pub struct RenderbufferManager {
    registry: Registry<Renderbuffer>,
}

impl RenderbufferManager {
    pub fn new() -> RenderbufferManager {
        RenderbufferManager {
            registry: Registry::new(),
        }
    }

    pub fn create<D: Driver>(
        &mut self,
        driver: &mut D,
        limits: &DeviceLimits,
        width: u32,
        height: u32,
        format: RenderbufferFormat,
    ) -> Result<RenderbufferHandle, CompileError> {
        if width == 0 || height == 0 {
            return Err(CompileError::EmptyData);
        }
        if width > limits.max_renderbuffer_size || height > limits.max_renderbuffer_size {
            return Err(CompileError::RenderbufferTooLarge {
                width,
                height,
                limit: limits.max_renderbuffer_size,
            });
        }
        let raw = driver.create_renderbuffer();
        driver.bind_renderbuffer(Some(raw));
        driver.renderbuffer_storage(format, width, height);
        driver.bind_renderbuffer(None);
        debug!("renderbuffer {:?}: {}x{} {:?}", raw, width, height, format);
        Ok(self.registry.insert(Renderbuffer {
            raw,
            width,
            height,
            format,
        }))
    }

    pub fn get(&self, handle: RenderbufferHandle) -> Option<&Renderbuffer> {
        self.registry.get(handle)
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: RenderbufferHandle,
    ) -> Result<(), CompileError> {
        let renderbuffer = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle {
                kind: "renderbuffer",
            })?;
        driver.delete_renderbuffer(renderbuffer.raw);
        Ok(())
    }

    /// Delete every renderbuffer.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        for renderbuffer in self.registry.drain() {
            driver.delete_renderbuffer(renderbuffer.raw);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
