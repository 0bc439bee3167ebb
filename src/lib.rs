//! drawpipe - a declarative draw-call compiler for stateful graphics drivers
//!
//! The crate compiles a declarative description of a single draw operation
//! (attribute sources, uniform values, index data, render target, state
//! flags, shader sources) into a reusable [`DrawCommand`]. Every invocation
//! of the command issues only the state-changing driver calls that are
//! actually needed, by diffing the desired state against the context-wide
//! applied state.
//!
//! # Features
//! - Typed resource managers with generation-checked handles
//! - Size-classed scratch pools for zero-allocation steady-state uploads
//! - Tagged attribute/uniform records (static / per-invocation function /
//!   per-batch-element property)
//! - An explicit operation list per compiled pipeline, interpreted at draw
//!   time with skip-unchanged-state semantics
//! - Batch execution that re-runs a compiled pipeline once per element of a
//!   caller-supplied collection
//!
//! The graphics driver itself sits behind the [`driver::Driver`] trait; the
//! crate ships a [`driver::RecordingDriver`] for headless use and testing.

pub mod caps;
pub mod compile;
pub mod context;
pub mod data;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod pool;
pub mod render_state;
pub mod resources;

pub use caps::{Capabilities, Capability, DeviceLimits};
pub use compile::DrawCommand;
pub use context::{Context, ContextConfig, ContextStats};
pub use data::{PropSource, PropValue, ShapedData, UniformValue};
pub use descriptor::{
    AttributeLayout, AttributeSource, AttributeValue, ClearPolicy, DrawDescriptor, ElementSource,
    Invocation, StatusConfig, StatusEntry, TargetSource, UniformSource,
};
pub use driver::{Driver, RecordingDriver};
pub use error::{CompileError, DrawError};

pub use resources::buffer::{BufferHandle, BufferOptions};
pub use resources::element::{ElementHandle, IndexData};
pub use resources::framebuffer::{ColorSource, FramebufferHandle, FramebufferOptions};
pub use resources::renderbuffer::RenderbufferHandle;
pub use resources::texture::{MipData, TextureData, TextureHandle, TextureOptions};
pub use resources::vao::{VaoAttribute, VaoHandle, VaoOptions};
