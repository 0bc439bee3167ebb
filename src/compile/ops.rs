//! The operation list of a compiled pipeline

use crate::driver::{IndexWidth, Primitive};

/// One step of a pipeline, interpreted at draw time
///
/// Ops carry indices into the pipeline's record tables; every stateful op
/// diffs against the context snapshots before touching the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Apply the pipeline's flag and variable set.
    ApplyState,
    /// Save the desired render target and install the pipeline's.
    PushTarget,
    /// Clear the pipeline's target per its clear policy.
    Clear,
    /// Switch to the pipeline's program.
    BindProgram,
    /// Return to the default vertex array before pointer binds.
    UnbindVao,
    /// Bind the pipeline's vertex array object.
    BindVao,
    /// Resolve and bind one attribute record.
    BindAttribute(usize),
    /// Resolve and upload one uniform record.
    BindUniform(usize),
    /// Issue the draw call.
    Dispatch,
    /// Unpin textures and recycle stream buffers used this invocation.
    ReleaseResources,
    /// Restore the saved render target.
    PopTarget,
    /// Bump the invocation counter.
    Tick,
}

/// The dispatch a pipeline resolved to, in priority order instanced,
/// indexed, plain arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatch {
    Arrays {
        primitive: Primitive,
        first: u32,
        count: u32,
    },
    ArraysInstanced {
        primitive: Primitive,
        first: u32,
        count: u32,
        instances: u32,
    },
    Elements {
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
    },
    ElementsInstanced {
        primitive: Primitive,
        count: u32,
        width: IndexWidth,
        byte_offset: u32,
        instances: u32,
    },
}
