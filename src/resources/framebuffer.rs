//! Framebuffer manager
//!
//! A framebuffer holding a full cube texture as a color attachment expands
//! into six driver framebuffers, one per face, selected by face index at
//! draw time. The desired/applied two-pointer keeps target switches lazy:
//! setting the desired target is free, the driver is only touched when a
//! clear or dispatch polls the pair.

use log::debug;

use crate::caps::{Capability, CapabilityRegistry, DeviceLimits};
use crate::driver::{AttachmentSlot, Driver, RawFramebuffer, TexImageTarget, TexTarget};
use crate::error::CompileError;
use crate::resources::registry::{Handle, Registry};
use crate::resources::renderbuffer::{RenderbufferHandle, RenderbufferManager};
use crate::resources::texture::{TextureHandle, TextureManager};

/// Source of one color attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSource {
    /// A 2D texture, or a cube texture rendered face-by-face.
    Texture(TextureHandle),
    /// One fixed face of a cube texture.
    CubeFace { texture: TextureHandle, face: u32 },
    Renderbuffer(RenderbufferHandle),
}

/// Attachment set for a new framebuffer
#[derive(Debug, Clone, Default)]
pub struct FramebufferOptions {
    pub colors: Vec<ColorSource>,
    pub depth: Option<RenderbufferHandle>,
    pub stencil: Option<RenderbufferHandle>,
    pub depth_stencil: Option<RenderbufferHandle>,
}

/// A complete framebuffer, possibly with one driver object per cube face
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    raws: Vec<RawFramebuffer>,
    pub color_count: u32,
    pub width: u32,
    pub height: u32,
}

impl Framebuffer {
    pub fn face_count(&self) -> u32 {
        self.raws.len() as u32
    }

    pub fn raw_for_face(&self, face: u32) -> Option<RawFramebuffer> {
        self.raws.get(face as usize).copied()
    }
}

pub type FramebufferHandle = Handle<Framebuffer>;

/// Owns every framebuffer and the desired/applied binding pair
pub struct FramebufferManager {
    registry: Registry<Framebuffer>,
    /// Target the next clear or dispatch should land in. `None` is the
    /// default drawing surface.
    next: Option<RawFramebuffer>,
    /// Target actually bound on the driver.
    current: Option<RawFramebuffer>,
}

impl FramebufferManager {
    pub fn new() -> FramebufferManager {
        FramebufferManager {
            registry: Registry::new(),
            next: None,
            current: None,
        }
    }

    pub fn create<D: Driver>(
        &mut self,
        driver: &mut D,
        caps: &CapabilityRegistry,
        limits: &DeviceLimits,
        textures: &TextureManager,
        renderbuffers: &RenderbufferManager,
        options: &FramebufferOptions,
    ) -> Result<FramebufferHandle, CompileError> {
        let has_depth_ish =
            options.depth.is_some() || options.stencil.is_some() || options.depth_stencil.is_some();
        if options.colors.is_empty() && !has_depth_ish {
            return Err(CompileError::EmptyFramebuffer);
        }
        if options.depth_stencil.is_some() && (options.depth.is_some() || options.stencil.is_some())
        {
            return Err(CompileError::DepthStencilConflict);
        }
        let color_count = options.colors.len() as u32;
        if color_count > 1 {
            if !caps.has(Capability::DrawBuffers) {
                return Err(CompileError::DrawBuffersUnsupported);
            }
            let max = limits.max_color_attachments.min(limits.max_draw_buffers);
            if color_count > max {
                return Err(CompileError::TooManyColorAttachments {
                    count: color_count,
                    max,
                });
            }
        }

        // Resolve sizes and find out whether any color is a full cube.
        let mut size: Option<(u32, u32)> = None;
        let mut any_cube = false;
        let mut check_size = |w: u32, h: u32| -> Result<(), CompileError> {
            match size {
                None => {
                    size = Some((w, h));
                    Ok(())
                }
                Some(existing) if existing == (w, h) => Ok(()),
                Some(_) => Err(CompileError::AttachmentSizeMismatch),
            }
        };
        for color in &options.colors {
            match color {
                ColorSource::Texture(handle) => {
                    let texture = textures
                        .get(*handle)
                        .ok_or(CompileError::StaleHandle { kind: "texture" })?;
                    if texture.target == TexTarget::Cube {
                        any_cube = true;
                    }
                    check_size(texture.width, texture.height)?;
                }
                ColorSource::CubeFace { texture, face } => {
                    if *face >= 6 {
                        return Err(CompileError::CubeFaceOutOfRange(*face));
                    }
                    let texture = textures
                        .get(*texture)
                        .ok_or(CompileError::StaleHandle { kind: "texture" })?;
                    check_size(texture.width, texture.height)?;
                }
                ColorSource::Renderbuffer(handle) => {
                    let renderbuffer =
                        renderbuffers
                            .get(*handle)
                            .ok_or(CompileError::StaleHandle {
                                kind: "renderbuffer",
                            })?;
                    check_size(renderbuffer.width, renderbuffer.height)?;
                }
            }
        }
        for handle in [options.depth, options.stencil, options.depth_stencil]
            .into_iter()
            .flatten()
        {
            let renderbuffer = renderbuffers
                .get(handle)
                .ok_or(CompileError::StaleHandle {
                    kind: "renderbuffer",
                })?;
            check_size(renderbuffer.width, renderbuffer.height)?;
        }
        let (width, height) = size.unwrap_or((0, 0));

        let face_count = if any_cube { 6 } else { 1 };
        let mut raws = Vec::with_capacity(face_count);
        for face in 0..face_count as u32 {
            let raw = driver.create_framebuffer();
            driver.bind_framebuffer(Some(raw));
            for (index, color) in options.colors.iter().enumerate() {
                let slot = AttachmentSlot::Color(index as u32);
                match color {
                    ColorSource::Texture(handle) => {
                        let texture = textures.get(*handle).unwrap();
                        let target = match texture.target {
                            TexTarget::Tex2d => TexImageTarget::Tex2d,
                            TexTarget::Cube => TexImageTarget::CUBE_FACES[face as usize],
                        };
                        driver.framebuffer_texture_2d(slot, target, Some(texture.raw), 0);
                    }
                    ColorSource::CubeFace { texture, face } => {
                        let texture = textures.get(*texture).unwrap();
                        driver.framebuffer_texture_2d(
                            slot,
                            TexImageTarget::CUBE_FACES[*face as usize],
                            Some(texture.raw),
                            0,
                        );
                    }
                    ColorSource::Renderbuffer(handle) => {
                        let renderbuffer = renderbuffers.get(*handle).unwrap();
                        driver.framebuffer_renderbuffer(slot, Some(renderbuffer.raw));
                    }
                }
            }
            for (slot, handle) in [
                (AttachmentSlot::Depth, options.depth),
                (AttachmentSlot::Stencil, options.stencil),
                (AttachmentSlot::DepthStencil, options.depth_stencil),
            ] {
                if let Some(handle) = handle {
                    let renderbuffer = renderbuffers.get(handle).unwrap();
                    driver.framebuffer_renderbuffer(slot, Some(renderbuffer.raw));
                }
            }
            if color_count > 1 {
                driver.draw_buffers(color_count);
            }
            if !driver.framebuffer_complete() {
                driver.bind_framebuffer(self.current);
                return Err(CompileError::FramebufferIncomplete);
            }
            raws.push(raw);
        }
        driver.bind_framebuffer(self.current);

        debug!(
            "framebuffer {:?}: {}x{}, {} colors, {} faces",
            raws[0], width, height, color_count, face_count
        );
        Ok(self.registry.insert(Framebuffer {
            raws,
            color_count,
            width,
            height,
        }))
    }

    pub fn get(&self, handle: FramebufferHandle) -> Option<&Framebuffer> {
        self.registry.get(handle)
    }

    /// Desired target of the next clear or dispatch.
    pub fn next(&self) -> Option<RawFramebuffer> {
        self.next
    }

    pub fn set_next(&mut self, raw: Option<RawFramebuffer>) {
        self.next = raw;
    }

    /// Bind the desired target if the driver disagrees.
    pub fn poll<D: Driver>(&mut self, driver: &mut D) {
        if self.next != self.current {
            driver.bind_framebuffer(self.next);
            self.current = self.next;
        }
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: FramebufferHandle,
    ) -> Result<(), CompileError> {
        let framebuffer = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle {
                kind: "framebuffer",
            })?;
        for raw in framebuffer.raws {
            if self.current == Some(raw) {
                driver.bind_framebuffer(None);
                self.current = None;
            }
            if self.next == Some(raw) {
                self.next = None;
            }
            driver.delete_framebuffer(raw);
        }
        Ok(())
    }

    /// Delete every framebuffer and return to the default surface.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        if self.current.is_some() {
            driver.bind_framebuffer(None);
            self.current = None;
        }
        self.next = None;
        for framebuffer in self.registry.drain() {
            for raw in framebuffer.raws {
                driver.delete_framebuffer(raw);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
