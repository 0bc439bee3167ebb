//! Crate error types

use crate::driver::{DriverError, GlType};
use thiserror::Error;

/// Errors raised while validating resources or compiling a draw descriptor
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("stale {kind} handle")]
    StaleHandle { kind: &'static str },
    #[error("data must not be empty")]
    EmptyData,
    #[error("ragged nested array: row {row} has length {got}, expected {expected}")]
    RaggedData {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("vertex attribute stride {0} out of range (0..=255)")]
    StrideOutOfRange(u32),
    #[error("instanced drawing requires the instancing capability")]
    InstancingUnsupported,
    #[error("index value {0} exceeds 16-bit range and the wide-index capability is unavailable")]
    WideIndexUnsupported(u32),
    #[error("draw needs an explicit count when no index buffer is given")]
    MissingCount,
    #[error("shader declares {kind} `{name}` but the descriptor does not provide it")]
    MissingRecord { kind: &'static str, name: String },
    #[error("descriptor names {kind} `{name}` which the shader does not declare")]
    UnknownRecord { kind: &'static str, name: String },
    #[error("{kind} `{name}` does not accept shader type {ty:?}")]
    TypeMismatch {
        kind: &'static str,
        name: String,
        ty: GlType,
    },
    #[error("buffer write of {len} bytes at offset {offset} exceeds the allocated {capacity} bytes")]
    WriteOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error("texture size {width}x{height} exceeds the device limit {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },
    #[error("invalid channel count {0}, expected 1..=4")]
    InvalidChannels(u32),
    #[error("non-power-of-two texture requires clamp-to-edge wrapping and no mipmaps")]
    NpotRestriction,
    #[error("float texture data requires the float-texture capability")]
    FloatTextureUnsupported,
    #[error("anisotropic filtering capability is unavailable")]
    AnisotropyUnsupported,
    #[error("anisotropy {requested} exceeds the device maximum {max}")]
    AnisotropyTooHigh { requested: u32, max: u32 },
    #[error("mip level {level} expects {expected} bytes, got {got}")]
    MipSizeMismatch {
        level: u32,
        expected: usize,
        got: usize,
    },
    #[error("cube face {0} out of range, faces are 0..=5")]
    CubeFaceOutOfRange(u32),
    #[error("renderbuffer size {width}x{height} exceeds the device limit {limit}")]
    RenderbufferTooLarge { width: u32, height: u32, limit: u32 },
    #[error("framebuffer needs at least one attachment")]
    EmptyFramebuffer,
    #[error("attachment sizes differ within one framebuffer")]
    AttachmentSizeMismatch,
    #[error("{count} color attachments exceed the device limit {max}")]
    TooManyColorAttachments { count: u32, max: u32 },
    #[error("multiple color attachments require the draw-buffers capability")]
    DrawBuffersUnsupported,
    #[error("depth/stencil attachments conflict with a combined depth-stencil attachment")]
    DepthStencilConflict,
    #[error("framebuffer is incomplete")]
    FramebufferIncomplete,
    #[error("vertex array objects capability is unavailable")]
    VaoUnsupported,
    #[error("a vao already carries its own {0}; the descriptor must not also name them")]
    VaoConflict(&'static str),
}

/// Errors raised while executing a compiled command
#[derive(Error, Debug)]
pub enum DrawError {
    #[error("stale {kind} handle")]
    StaleHandle { kind: &'static str },
    #[error("batch element provides no value for prop `{0}`")]
    MissingProp(String),
    #[error("{kind} `{name}` resolved to an incompatible value")]
    ValueMismatch { kind: &'static str, name: String },
    #[error("all {0} texture units are pinned by bound textures")]
    TextureUnitsExhausted(u32),
}
