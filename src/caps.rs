//! Optional device capabilities and fixed device limits

use crate::driver::Driver;
use log::{debug, info};

/// Optional device capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Instanced dispatch and per-attribute divisors
    Instancing,
    /// 32-bit element indices
    WideElementIndex,
    /// f32 pixel data
    FloatTextures,
    /// f16 pixel data
    HalfFloatTextures,
    /// More than one color attachment per framebuffer
    DrawBuffers,
    /// Anisotropic texture filtering
    AnisotropicFiltering,
    /// Vertex array objects
    VertexArrayObjects,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Instancing,
        Capability::WideElementIndex,
        Capability::FloatTextures,
        Capability::HalfFloatTextures,
        Capability::DrawBuffers,
        Capability::AnisotropicFiltering,
        Capability::VertexArrayObjects,
    ];

    fn bit(self) -> u32 {
        match self {
            Capability::Instancing => 1 << 0,
            Capability::WideElementIndex => 1 << 1,
            Capability::FloatTextures => 1 << 2,
            Capability::HalfFloatTextures => 1 << 3,
            Capability::DrawBuffers => 1 << 4,
            Capability::AnisotropicFiltering => 1 << 5,
            Capability::VertexArrayObjects => 1 << 6,
        }
    }
}

/// Set of capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    bits: u32,
}

impl Capabilities {
    pub fn none() -> Capabilities {
        Capabilities { bits: 0 }
    }

    pub fn all() -> Capabilities {
        let mut caps = Capabilities::none();
        for cap in Capability::ALL {
            caps.insert(cap);
        }
        caps
    }

    pub fn with(mut self, cap: Capability) -> Capabilities {
        self.insert(cap);
        self
    }

    pub fn without(mut self, cap: Capability) -> Capabilities {
        self.bits &= !cap.bit();
        self
    }

    pub fn insert(&mut self, cap: Capability) {
        self.bits |= cap.bit();
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.bits & cap.bit() != 0
    }

    fn intersect(self, other: Capabilities) -> Capabilities {
        Capabilities {
            bits: self.bits & other.bits,
        }
    }
}

/// Fixed device limits, queried once at context creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_attributes: u32,
    pub max_combined_texture_units: u32,
    pub max_fragment_texture_units: u32,
    pub max_texture_size: u32,
    pub max_cube_map_size: u32,
    pub max_renderbuffer_size: u32,
    pub max_draw_buffers: u32,
    pub max_color_attachments: u32,
    pub max_viewport_dims: [u32; 2],
    pub max_anisotropy: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        DeviceLimits {
            max_attributes: 16,
            max_combined_texture_units: 32,
            max_fragment_texture_units: 16,
            max_texture_size: 16384,
            max_cube_map_size: 16384,
            max_renderbuffer_size: 16384,
            max_draw_buffers: 8,
            max_color_attachments: 8,
            max_viewport_dims: [16384, 16384],
            max_anisotropy: 16,
        }
    }
}

/// The capabilities negotiated for one context
///
/// Requested capabilities the device cannot provide are dropped with a
/// debug log entry; the rest of the crate consults only the negotiated set.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityRegistry {
    enabled: Capabilities,
}

impl CapabilityRegistry {
    pub fn negotiate<D: Driver>(driver: &D, requested: Capabilities) -> CapabilityRegistry {
        let supported = driver.capabilities();
        for cap in Capability::ALL {
            if requested.has(cap) && !supported.has(cap) {
                debug!("capability {:?} requested but unsupported", cap);
            }
        }
        let enabled = requested.intersect(supported);
        info!("negotiated capabilities: {:?}", enabled);
        CapabilityRegistry { enabled }
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.enabled.has(cap)
    }

    pub fn enabled(&self) -> Capabilities {
        self.enabled
    }
}
