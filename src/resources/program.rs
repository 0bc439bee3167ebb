//! Linked program manager
//!
//! Programs are cached by their interned source pair. Introspection data
//! is retained for the compiler's cross-validation and the per-location
//! uniform cache keeps equal re-uploads off the wire.

use std::collections::HashMap;

use log::debug;

use crate::driver::{Driver, GlType, RawProgram, ShaderStage, UniformData};
use crate::error::{CompileError, DrawError};
use crate::resources::registry::{Handle, Registry};
use crate::resources::shader::ShaderCache;
use crate::resources::strings::{StringId, StringInterner};

/// An active attribute or uniform of a linked program
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveVar {
    pub name: String,
    pub name_id: StringId,
    pub location: i32,
    pub ty: GlType,
    pub size: u32,
}

/// A linked program with its introspection data
#[derive(Debug)]
pub struct Program {
    pub raw: RawProgram,
    pub attributes: Vec<ActiveVar>,
    pub uniforms: Vec<ActiveVar>,
    uniform_cache: HashMap<i32, UniformData>,
}

pub type ProgramHandle = Handle<Program>;

/// Owns shaders and linked programs
pub struct ProgramManager {
    registry: Registry<Program>,
    cache: HashMap<(StringId, StringId), ProgramHandle>,
    shaders: ShaderCache,
    current: Option<RawProgram>,
}

impl ProgramManager {
    pub fn new() -> ProgramManager {
        ProgramManager {
            registry: Registry::new(),
            cache: HashMap::new(),
            shaders: ShaderCache::new(),
            current: None,
        }
    }

    /// Compile and link the source pair, reusing cached shaders and
    /// programs, and retain the introspection tables.
    pub fn link<D: Driver>(
        &mut self,
        driver: &mut D,
        interner: &mut StringInterner,
        vert: &str,
        frag: &str,
    ) -> Result<ProgramHandle, CompileError> {
        let vert_id = interner.intern(vert);
        let frag_id = interner.intern(frag);
        if let Some(&handle) = self.cache.get(&(vert_id, frag_id)) {
            return Ok(handle);
        }

        let vert_shader =
            self.shaders
                .get_or_compile(driver, interner, ShaderStage::Vertex, vert_id)?;
        let frag_shader =
            self.shaders
                .get_or_compile(driver, interner, ShaderStage::Fragment, frag_id)?;
        let raw = driver.link_program(vert_shader, frag_shader)?;

        let to_vars = |interner: &mut StringInterner, infos: Vec<crate::driver::RawActiveInfo>| {
            infos
                .into_iter()
                .map(|info| ActiveVar {
                    name_id: interner.intern(&info.name),
                    name: info.name,
                    location: info.location,
                    ty: info.ty,
                    size: info.size,
                })
                .collect::<Vec<_>>()
        };
        let attributes = to_vars(interner, driver.active_attributes(raw));
        let uniforms = to_vars(interner, driver.active_uniforms(raw));
        debug!(
            "linked program {:?}: {} attributes, {} uniforms",
            raw,
            attributes.len(),
            uniforms.len()
        );

        let handle = self.registry.insert(Program {
            raw,
            attributes,
            uniforms,
            uniform_cache: HashMap::new(),
        });
        self.cache.insert((vert_id, frag_id), handle);
        Ok(handle)
    }

    pub fn get(&self, handle: ProgramHandle) -> Option<&Program> {
        self.registry.get(handle)
    }

    /// Diffed program switch.
    pub fn bind<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: ProgramHandle,
    ) -> Result<(), DrawError> {
        let raw = self
            .registry
            .get(handle)
            .ok_or(DrawError::StaleHandle { kind: "program" })?
            .raw;
        if self.current != Some(raw) {
            driver.use_program(raw);
            self.current = Some(raw);
        }
        Ok(())
    }

    /// Upload a uniform, skipping the call when the location already holds
    /// an equal value.
    pub fn upload<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: ProgramHandle,
        location: i32,
        data: UniformData,
    ) -> Result<(), DrawError> {
        let program = self
            .registry
            .get_mut(handle)
            .ok_or(DrawError::StaleHandle { kind: "program" })?;
        if program.uniform_cache.get(&location) == Some(&data) {
            return Ok(());
        }
        driver.set_uniform(location, &data);
        program.uniform_cache.insert(location, data);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Delete every program and cached shader.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        for program in self.registry.drain() {
            driver.delete_program(program.raw);
        }
        self.cache.clear();
        self.shaders.clear(driver);
        self.current = None;
    }
}
