//! Shader compilation cache

use std::collections::HashMap;

use log::debug;

use crate::driver::{Driver, RawShader, ShaderStage};
use crate::error::CompileError;
use crate::resources::strings::{StringId, StringInterner};

/// Compiled shaders keyed by stage and interned source
#[derive(Debug, Default)]
pub struct ShaderCache {
    cache: HashMap<(ShaderStage, StringId), RawShader>,
}

impl ShaderCache {
    pub fn new() -> ShaderCache {
        ShaderCache::default()
    }

    /// Compile `source_id` for `stage`, reusing a prior compilation of the
    /// same source. Compile failures carry the driver's log.
    pub fn get_or_compile<D: Driver>(
        &mut self,
        driver: &mut D,
        interner: &StringInterner,
        stage: ShaderStage,
        source_id: StringId,
    ) -> Result<RawShader, CompileError> {
        if let Some(&shader) = self.cache.get(&(stage, source_id)) {
            return Ok(shader);
        }
        let shader = driver.compile_shader(stage, interner.resolve(source_id))?;
        debug!("compiled {:?} shader {:?}", stage, shader);
        self.cache.insert((stage, source_id), shader);
        Ok(shader)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Delete every cached shader object.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        for (_, shader) in self.cache.drain() {
            driver.delete_shader(shader);
        }
    }
}
