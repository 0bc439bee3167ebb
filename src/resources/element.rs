//! Index (element) buffer manager

use log::debug;

use crate::caps::{Capability, CapabilityRegistry};
use crate::driver::{BufferTarget, Driver, IndexWidth, Primitive, RawBuffer, Usage};
use crate::error::CompileError;
use crate::pool::ScratchPool;
use crate::resources::registry::{Handle, Registry};

/// Index data with its nesting dimension intact
///
/// The nesting dimension picks the default primitive: flat indices draw
/// points, pairs draw lines, triples draw triangles.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    Flat(Vec<u32>),
    Pairs(Vec<[u32; 2]>),
    Triples(Vec<[u32; 3]>),
}

impl IndexData {
    fn default_primitive(&self) -> Primitive {
        match self {
            IndexData::Flat(_) => Primitive::Points,
            IndexData::Pairs(_) => Primitive::Lines,
            IndexData::Triples(_) => Primitive::Triangles,
        }
    }

    fn indices(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexData::Flat(v) => Box::new(v.iter().copied()),
            IndexData::Pairs(v) => Box::new(v.iter().flatten().copied()),
            IndexData::Triples(v) => Box::new(v.iter().flatten().copied()),
        }
    }

    fn len(&self) -> usize {
        match self {
            IndexData::Flat(v) => v.len(),
            IndexData::Pairs(v) => v.len() * 2,
            IndexData::Triples(v) => v.len() * 3,
        }
    }
}

impl From<Vec<u32>> for IndexData {
    fn from(v: Vec<u32>) -> Self {
        IndexData::Flat(v)
    }
}

impl From<Vec<[u32; 2]>> for IndexData {
    fn from(v: Vec<[u32; 2]>) -> Self {
        IndexData::Pairs(v)
    }
}

impl From<Vec<[u32; 3]>> for IndexData {
    fn from(v: Vec<[u32; 3]>) -> Self {
        IndexData::Triples(v)
    }
}

/// An uploaded index buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBuffer {
    pub raw: RawBuffer,
    pub width: IndexWidth,
    pub vert_count: u32,
    pub primitive: Primitive,
}

pub type ElementHandle = Handle<ElementBuffer>;

/// Owns every index buffer
pub struct ElementManager {
    registry: Registry<ElementBuffer>,
    bound: Option<RawBuffer>,
}

impl ElementManager {
    pub fn new() -> ElementManager {
        ElementManager {
            registry: Registry::new(),
            bound: None,
        }
    }

    /// Upload index data. Indices above 16-bit range need the wide-index
    /// capability; without it they are a compile error.
    pub fn create<D: Driver>(
        &mut self,
        driver: &mut D,
        pool: &mut ScratchPool,
        caps: &CapabilityRegistry,
        data: &IndexData,
        primitive: Option<Primitive>,
    ) -> Result<ElementHandle, CompileError> {
        let count = data.len();
        if count == 0 {
            return Err(CompileError::EmptyData);
        }
        let max = data.indices().max().unwrap_or(0);
        let width = if max > u16::MAX as u32 {
            if !caps.has(Capability::WideElementIndex) {
                return Err(CompileError::WideIndexUnsupported(max));
            }
            IndexWidth::U32
        } else {
            IndexWidth::U16
        };

        let mut flat = pool.alloc(count * width.bytes() as usize);
        match width {
            IndexWidth::U16 => {
                let out = flat.as_slice_mut::<u16>();
                for (slot, index) in out.iter_mut().zip(data.indices()) {
                    *slot = index as u16;
                }
            }
            IndexWidth::U32 => {
                let out = flat.as_slice_mut::<u32>();
                for (slot, index) in out.iter_mut().zip(data.indices()) {
                    *slot = index;
                }
            }
        }

        let raw = driver.create_buffer();
        self.bind(driver, raw);
        driver.buffer_data(BufferTarget::ElementArray, flat.bytes(), Usage::Static);
        pool.free(flat);

        let primitive = primitive.unwrap_or_else(|| data.default_primitive());
        debug!("elements {:?}: {} indices, {:?}, {:?}", raw, count, width, primitive);
        Ok(self.registry.insert(ElementBuffer {
            raw,
            width,
            vert_count: count as u32,
            primitive,
        }))
    }

    pub fn get(&self, handle: ElementHandle) -> Option<&ElementBuffer> {
        self.registry.get(handle)
    }

    /// Diffed bind of the element-array target.
    pub fn bind<D: Driver>(&mut self, driver: &mut D, raw: RawBuffer) {
        if self.bound != Some(raw) {
            driver.bind_buffer(BufferTarget::ElementArray, Some(raw));
            self.bound = Some(raw);
        }
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: ElementHandle,
    ) -> Result<(), CompileError> {
        let element = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle { kind: "elements" })?;
        if self.bound == Some(element.raw) {
            driver.bind_buffer(BufferTarget::ElementArray, None);
            self.bound = None;
        }
        driver.delete_buffer(element.raw);
        Ok(())
    }

    /// Delete every index buffer.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        if self.bound.is_some() {
            driver.bind_buffer(BufferTarget::ElementArray, None);
            self.bound = None;
        }
        for element in self.registry.drain() {
            driver.delete_buffer(element.raw);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
