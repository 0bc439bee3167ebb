//! Resource managers, one per resource kind
//!
//! Every manager validates its inputs, creates the driver object, stores
//! the resource in a generation-checked registry and is the sole deletion
//! authority for its kind.

pub mod buffer;
pub mod element;
pub mod framebuffer;
pub mod program;
pub mod registry;
pub mod renderbuffer;
pub mod shader;
pub mod strings;
pub mod texture;
pub mod vao;

pub use registry::{Handle, Registry};
pub use strings::{StringId, StringInterner};
