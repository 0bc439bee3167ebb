//! The declarative draw description
//!
//! Attribute, uniform and render-target entries are tagged sum types: a
//! static value resolved at compile time, a function evaluated once per
//! invocation, or a prop key resolved from each batch element.

use crate::data::{ShapedData, UniformValue};
use crate::driver::{Component, Primitive, StateFlag, StateValue};
use crate::resources::buffer::BufferHandle;
use crate::resources::element::{ElementHandle, IndexData};
use crate::resources::framebuffer::FramebufferHandle;
use crate::resources::vao::VaoHandle;

/// Execution context handed to per-invocation functions
#[derive(Debug, Clone, Copy)]
pub struct Invocation {
    /// Process-wide invocation counter.
    pub tick: u64,
    /// Index of the current batch element, zero for plain draws.
    pub element: usize,
}

/// Explicit layout of a buffer-backed attribute
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttributeLayout {
    /// Components per vertex; defaults to the buffer's vertex dimension.
    pub size: Option<u32>,
    /// Element type; defaults to the buffer's element type.
    pub dtype: Option<Component>,
    pub normalized: bool,
    /// Byte stride, 0..=255. Zero means tightly packed.
    pub stride: u32,
    pub offset: u32,
    /// Per-instance step; non-zero needs the instancing capability.
    pub divisor: u32,
}

/// Value a dynamic or prop attribute resolves to
pub enum AttributeValue {
    Data(ShapedData),
    Buffer {
        buffer: BufferHandle,
        layout: AttributeLayout,
    },
}

pub type AttributeFn = Box<dyn Fn(&Invocation) -> AttributeValue>;
pub type UniformFn = Box<dyn Fn(&Invocation) -> UniformValue>;

/// Source of one vertex attribute
pub enum AttributeSource {
    /// Nested array data, materialized into a buffer at compile time.
    Data(ShapedData),
    /// An existing buffer with an explicit layout.
    Buffer {
        buffer: BufferHandle,
        layout: AttributeLayout,
    },
    /// Re-evaluated on every invocation.
    Dynamic(AttributeFn),
    /// Resolved from each batch element.
    Prop(String),
}

impl AttributeSource {
    pub fn data(data: impl Into<ShapedData>) -> AttributeSource {
        AttributeSource::Data(data.into())
    }

    pub fn buffer(buffer: BufferHandle) -> AttributeSource {
        AttributeSource::Buffer {
            buffer,
            layout: AttributeLayout::default(),
        }
    }

    pub fn buffer_with(buffer: BufferHandle, layout: AttributeLayout) -> AttributeSource {
        AttributeSource::Buffer { buffer, layout }
    }

    pub fn dynamic(f: impl Fn(&Invocation) -> AttributeValue + 'static) -> AttributeSource {
        AttributeSource::Dynamic(Box::new(f))
    }

    pub fn prop(key: impl Into<String>) -> AttributeSource {
        AttributeSource::Prop(key.into())
    }
}

/// Source of one uniform
pub enum UniformSource {
    Value(UniformValue),
    /// Re-evaluated on every invocation.
    Dynamic(UniformFn),
    /// Resolved from each batch element, with an optional fallback for
    /// elements that do not carry the key.
    Prop {
        key: String,
        fallback: Option<UniformValue>,
    },
}

impl UniformSource {
    pub fn value(value: impl Into<UniformValue>) -> UniformSource {
        UniformSource::Value(value.into())
    }

    pub fn dynamic(f: impl Fn(&Invocation) -> UniformValue + 'static) -> UniformSource {
        UniformSource::Dynamic(Box::new(f))
    }

    pub fn prop(key: impl Into<String>) -> UniformSource {
        UniformSource::Prop {
            key: key.into(),
            fallback: None,
        }
    }

    pub fn prop_or(key: impl Into<String>, fallback: impl Into<UniformValue>) -> UniformSource {
        UniformSource::Prop {
            key: key.into(),
            fallback: Some(fallback.into()),
        }
    }
}

/// Source of the index buffer
#[derive(Debug, Clone, PartialEq)]
pub enum ElementSource {
    Data(IndexData),
    Handle(ElementHandle),
}

impl From<IndexData> for ElementSource {
    fn from(data: IndexData) -> Self {
        ElementSource::Data(data)
    }
}

impl From<ElementHandle> for ElementSource {
    fn from(handle: ElementHandle) -> Self {
        ElementSource::Handle(handle)
    }
}

/// Render target of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TargetSource {
    /// The default drawing surface.
    #[default]
    Screen,
    Framebuffer(FramebufferHandle),
    /// One face of a cube framebuffer.
    CubeFace {
        framebuffer: FramebufferHandle,
        face: u32,
    },
}

/// Clear performed against the pipeline's target on every invocation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearPolicy {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<i32>,
}

impl ClearPolicy {
    pub fn color(color: [f32; 4]) -> ClearPolicy {
        ClearPolicy {
            color: Some(color),
            ..ClearPolicy::default()
        }
    }

    pub fn color_depth(color: [f32; 4], depth: f32) -> ClearPolicy {
        ClearPolicy {
            color: Some(color),
            depth: Some(depth),
            stencil: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none() && self.stencil.is_none()
    }
}

/// One pipeline state override
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEntry {
    Flag(StateFlag, bool),
    Value(StateValue),
}

/// Pipeline state overrides on top of the context defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusConfig {
    pub(crate) entries: Vec<StatusEntry>,
}

impl StatusConfig {
    pub fn new() -> StatusConfig {
        StatusConfig::default()
    }

    pub fn flag(mut self, flag: StateFlag, enabled: bool) -> StatusConfig {
        self.entries.push(StatusEntry::Flag(flag, enabled));
        self
    }

    pub fn value(mut self, value: StateValue) -> StatusConfig {
        self.entries.push(StatusEntry::Value(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The complete declarative description of one draw operation
pub struct DrawDescriptor {
    pub vert: String,
    pub frag: String,
    pub attributes: Vec<(String, AttributeSource)>,
    pub uniforms: Vec<(String, UniformSource)>,
    pub elements: Option<ElementSource>,
    pub count: Option<u32>,
    pub offset: u32,
    pub primitive: Option<Primitive>,
    pub instances: u32,
    pub target: Option<TargetSource>,
    pub clear: Option<ClearPolicy>,
    pub status: StatusConfig,
    pub vao: Option<VaoHandle>,
}

impl DrawDescriptor {
    pub fn new(vert: impl Into<String>, frag: impl Into<String>) -> DrawDescriptor {
        DrawDescriptor {
            vert: vert.into(),
            frag: frag.into(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            elements: None,
            count: None,
            offset: 0,
            primitive: None,
            instances: 0,
            target: None,
            clear: None,
            status: StatusConfig::default(),
            vao: None,
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, source: AttributeSource) -> Self {
        self.attributes.push((name.into(), source));
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, source: UniformSource) -> Self {
        self.uniforms.push((name.into(), source));
        self
    }

    pub fn elements(mut self, source: impl Into<ElementSource>) -> Self {
        self.elements = Some(source.into());
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = Some(primitive);
        self
    }

    pub fn instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }

    pub fn target(mut self, target: TargetSource) -> Self {
        self.target = Some(target);
        self
    }

    pub fn clear(mut self, clear: ClearPolicy) -> Self {
        self.clear = Some(clear);
        self
    }

    pub fn status(mut self, status: StatusConfig) -> Self {
        self.status = status;
        self
    }

    pub fn vao(mut self, vao: VaoHandle) -> Self {
        self.vao = Some(vao);
        self
    }
}
