//! Texture manager and the process-wide texture unit table
//!
//! A texture is assigned a unit on first bind and keeps it until another
//! texture evicts it. Eviction only considers textures whose bind count is
//! zero; when every unit is pinned the draw fails.

use log::debug;

use crate::caps::{Capability, CapabilityRegistry, DeviceLimits};
use crate::driver::{
    ColorLayout, Component, Driver, FilterMode, RawTexture, TexImageTarget, TexParams, TexTarget,
    WrapMode,
};
use crate::error::{CompileError, DrawError};
use crate::pool::{ObjectPool, Recycle};
use crate::resources::registry::{Handle, Registry};

/// One mip level of caller-supplied pixel data
#[derive(Debug, Clone, PartialEq)]
pub struct MipData {
    pub data: Vec<u8>,
    pub compressed: bool,
}

/// Pixel content for one texture image (or one cube face)
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TextureData {
    /// Allocate storage without filling it.
    #[default]
    Blank,
    /// A single base level.
    Pixels(Vec<u8>),
    /// An explicit mip chain starting at level zero.
    Levels(Vec<MipData>),
}

/// Creation options shared by 2D and cube textures
#[derive(Debug, Clone, Copy)]
pub struct TextureOptions {
    pub channels: u32,
    pub dtype: Component,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub anisotropy: u32,
    pub gen_mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        TextureOptions {
            channels: 4,
            dtype: Component::U8,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            anisotropy: 1,
            gen_mipmaps: false,
        }
    }
}

/// A created texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texture {
    pub raw: RawTexture,
    pub target: TexTarget,
    pub width: u32,
    pub height: u32,
    pub layout: ColorLayout,
    pub dtype: Component,
    pub params: TexParams,
    unit: Option<u32>,
    bind_count: u32,
}

pub type TextureHandle = Handle<Texture>;

/// Transient per-image upload record, recycled between uses
#[derive(Debug, Default)]
pub struct TexImage {
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub compressed: bool,
    pub data: Vec<u8>,
}

impl Recycle for TexImage {
    fn recycle(&mut self) {
        self.level = 0;
        self.width = 0;
        self.height = 0;
        self.compressed = false;
        self.data.clear();
    }
}

pub type TexImagePool = ObjectPool<TexImage>;

/// Owns every texture and the unit table
pub struct TextureManager {
    registry: Registry<Texture>,
    units: Vec<Option<TextureHandle>>,
    images: TexImagePool,
}

fn level_extent(base: u32, level: u32) -> u32 {
    (base >> level).max(1)
}

impl TextureManager {
    pub fn new(unit_count: u32) -> TextureManager {
        TextureManager {
            registry: Registry::new(),
            units: vec![None; unit_count as usize],
            images: TexImagePool::default(),
        }
    }

    fn validate(
        caps: &CapabilityRegistry,
        limits: &DeviceLimits,
        width: u32,
        height: u32,
        max_size: u32,
        options: &TextureOptions,
    ) -> Result<ColorLayout, CompileError> {
        let layout = ColorLayout::from_channels(options.channels)
            .ok_or(CompileError::InvalidChannels(options.channels))?;
        if width == 0 || height == 0 {
            return Err(CompileError::EmptyData);
        }
        if width > max_size || height > max_size {
            return Err(CompileError::TextureTooLarge {
                width,
                height,
                limit: max_size,
            });
        }
        let pot = width.is_power_of_two() && height.is_power_of_two();
        let needs_pot = options.wrap_s != WrapMode::ClampToEdge
            || options.wrap_t != WrapMode::ClampToEdge
            || options.min_filter.uses_mipmaps()
            || options.gen_mipmaps;
        if !pot && needs_pot {
            return Err(CompileError::NpotRestriction);
        }
        if options.dtype == Component::F32 && !caps.has(Capability::FloatTextures) {
            return Err(CompileError::FloatTextureUnsupported);
        }
        if options.anisotropy > 1 {
            if !caps.has(Capability::AnisotropicFiltering) {
                return Err(CompileError::AnisotropyUnsupported);
            }
            if options.anisotropy > limits.max_anisotropy {
                return Err(CompileError::AnisotropyTooHigh {
                    requested: options.anisotropy,
                    max: limits.max_anisotropy,
                });
            }
        }
        Ok(layout)
    }

    fn upload_image<D: Driver>(
        &mut self,
        driver: &mut D,
        target: TexImageTarget,
        width: u32,
        height: u32,
        layout: ColorLayout,
        dtype: Component,
        data: &TextureData,
    ) -> Result<(), CompileError> {
        let texel = layout.channels() as usize * dtype.size();
        match data {
            TextureData::Blank => {
                driver.tex_image_2d(target, 0, layout, width, height, dtype, None);
            }
            TextureData::Pixels(pixels) => {
                let expected = width as usize * height as usize * texel;
                if pixels.len() != expected {
                    return Err(CompileError::MipSizeMismatch {
                        level: 0,
                        expected,
                        got: pixels.len(),
                    });
                }
                let mut image = self.images.acquire();
                image.level = 0;
                image.width = width;
                image.height = height;
                image.data.extend_from_slice(pixels);
                driver.tex_image_2d(target, 0, layout, width, height, dtype, Some(&image.data));
                self.images.release(image);
            }
            TextureData::Levels(levels) => {
                for (index, mip) in levels.iter().enumerate() {
                    let level = index as u32;
                    let w = level_extent(width, level);
                    let h = level_extent(height, level);
                    if !mip.compressed {
                        let expected = w as usize * h as usize * texel;
                        if mip.data.len() != expected {
                            return Err(CompileError::MipSizeMismatch {
                                level,
                                expected,
                                got: mip.data.len(),
                            });
                        }
                    }
                    let mut image = self.images.acquire();
                    image.level = level;
                    image.width = w;
                    image.height = h;
                    image.compressed = mip.compressed;
                    image.data.extend_from_slice(&mip.data);
                    if mip.compressed {
                        driver.compressed_tex_image_2d(target, level, layout, w, h, &image.data);
                    } else {
                        driver.tex_image_2d(target, level, layout, w, h, dtype, Some(&image.data));
                    }
                    self.images.release(image);
                }
            }
        }
        Ok(())
    }

    /// Bind `raw` on the highest unit for creation-time uploads, evicting
    /// whatever idle texture sat there.
    fn scratch_bind<D: Driver>(&mut self, driver: &mut D, target: TexTarget, raw: RawTexture) {
        let unit = self.units.len() as u32 - 1;
        if let Some(handle) = self.units[unit as usize].take() {
            if let Some(texture) = self.registry.get_mut(handle) {
                texture.unit = None;
            }
        }
        driver.active_texture(unit);
        driver.bind_texture(target, Some(raw));
    }

    pub fn create_2d<D: Driver>(
        &mut self,
        driver: &mut D,
        caps: &CapabilityRegistry,
        limits: &DeviceLimits,
        width: u32,
        height: u32,
        data: &TextureData,
        options: TextureOptions,
    ) -> Result<TextureHandle, CompileError> {
        let layout = Self::validate(caps, limits, width, height, limits.max_texture_size, &options)?;
        let raw = driver.create_texture();
        self.scratch_bind(driver, TexTarget::Tex2d, raw);
        self.upload_image(
            driver,
            TexImageTarget::Tex2d,
            width,
            height,
            layout,
            options.dtype,
            data,
        )?;
        let params = TexParams {
            min_filter: options.min_filter,
            mag_filter: options.mag_filter,
            wrap_s: options.wrap_s,
            wrap_t: options.wrap_t,
            anisotropy: options.anisotropy,
        };
        driver.tex_parameters(TexTarget::Tex2d, &params);
        if options.gen_mipmaps {
            driver.generate_mipmap(TexTarget::Tex2d);
        }
        driver.bind_texture(TexTarget::Tex2d, None);
        debug!("texture {:?}: {}x{} {:?}", raw, width, height, layout);
        Ok(self.registry.insert(Texture {
            raw,
            target: TexTarget::Tex2d,
            width,
            height,
            layout,
            dtype: options.dtype,
            params,
            unit: None,
            bind_count: 0,
        }))
    }

    pub fn create_cube<D: Driver>(
        &mut self,
        driver: &mut D,
        caps: &CapabilityRegistry,
        limits: &DeviceLimits,
        size: u32,
        faces: &[TextureData; 6],
        options: TextureOptions,
    ) -> Result<TextureHandle, CompileError> {
        let layout = Self::validate(caps, limits, size, size, limits.max_cube_map_size, &options)?;
        let raw = driver.create_texture();
        self.scratch_bind(driver, TexTarget::Cube, raw);
        for (face, data) in TexImageTarget::CUBE_FACES.iter().zip(faces) {
            self.upload_image(driver, *face, size, size, layout, options.dtype, data)?;
        }
        let params = TexParams {
            min_filter: options.min_filter,
            mag_filter: options.mag_filter,
            wrap_s: options.wrap_s,
            wrap_t: options.wrap_t,
            anisotropy: options.anisotropy,
        };
        driver.tex_parameters(TexTarget::Cube, &params);
        if options.gen_mipmaps {
            driver.generate_mipmap(TexTarget::Cube);
        }
        driver.bind_texture(TexTarget::Cube, None);
        debug!("cube texture {:?}: {}x{} {:?}", raw, size, size, layout);
        Ok(self.registry.insert(Texture {
            raw,
            target: TexTarget::Cube,
            width: size,
            height: size,
            layout,
            dtype: options.dtype,
            params,
            unit: None,
            bind_count: 0,
        }))
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.registry.get(handle)
    }

    /// Pin the texture on a unit and return the unit index.
    ///
    /// A texture that already holds a unit is pinned in place without any
    /// driver call. Otherwise the first free or evictable unit is taken.
    pub fn bind<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: TextureHandle,
    ) -> Result<u32, DrawError> {
        let (raw, target, existing) = {
            let texture = self
                .registry
                .get(handle)
                .ok_or(DrawError::StaleHandle { kind: "texture" })?;
            (texture.raw, texture.target, texture.unit)
        };
        if let Some(unit) = existing {
            let texture = self.registry.get_mut(handle).unwrap();
            texture.bind_count += 1;
            return Ok(unit);
        }

        let mut chosen = None;
        for (unit, occupant) in self.units.iter().enumerate() {
            match occupant {
                None => {
                    chosen = Some(unit as u32);
                    break;
                }
                Some(other) => {
                    let idle = self
                        .registry
                        .get(*other)
                        .map(|t| t.bind_count == 0)
                        .unwrap_or(true);
                    if idle {
                        chosen = Some(unit as u32);
                        break;
                    }
                }
            }
        }
        let unit =
            chosen.ok_or_else(|| DrawError::TextureUnitsExhausted(self.units.len() as u32))?;

        if let Some(evicted) = self.units[unit as usize].take() {
            if let Some(texture) = self.registry.get_mut(evicted) {
                texture.unit = None;
            }
        }
        self.units[unit as usize] = Some(handle);
        let texture = self.registry.get_mut(handle).unwrap();
        texture.unit = Some(unit);
        texture.bind_count = 1;
        driver.active_texture(unit);
        driver.bind_texture(target, Some(raw));
        Ok(unit)
    }

    /// Drop one pin. The texture keeps its unit until evicted.
    pub fn release(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.registry.get_mut(handle) {
            texture.bind_count = texture.bind_count.saturating_sub(1);
        }
    }

    pub fn destroy<D: Driver>(
        &mut self,
        driver: &mut D,
        handle: TextureHandle,
    ) -> Result<(), CompileError> {
        let texture = self
            .registry
            .remove(handle)
            .ok_or(CompileError::StaleHandle { kind: "texture" })?;
        if let Some(unit) = texture.unit {
            self.units[unit as usize] = None;
        }
        driver.delete_texture(texture.raw);
        Ok(())
    }

    /// Delete every texture and empty the unit table.
    pub fn clear<D: Driver>(&mut self, driver: &mut D) {
        self.units.fill(None);
        for texture in self.registry.drain() {
            driver.delete_texture(texture.raw);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::Capabilities;
    use crate::driver::RecordingDriver;

    fn setup() -> (RecordingDriver, CapabilityRegistry, DeviceLimits) {
        let driver = RecordingDriver::new();
        let caps = CapabilityRegistry::negotiate(&driver, Capabilities::all());
        let limits = driver.limits();
        (driver, caps, limits)
    }

    fn manager(limits: &DeviceLimits) -> TextureManager {
        TextureManager::new(limits.max_combined_texture_units)
    }

    #[test]
    fn npot_size_with_repeat_wrap_is_rejected() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let options = TextureOptions {
            wrap_s: WrapMode::Repeat,
            ..TextureOptions::default()
        };
        let result =
            textures.create_2d(&mut driver, &caps, &limits, 10, 10, &TextureData::Blank, options);
        assert!(matches!(result, Err(CompileError::NpotRestriction)));
    }

    #[test]
    fn npot_size_with_clamped_wrap_is_accepted() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let result = textures.create_2d(
            &mut driver,
            &caps,
            &limits,
            10,
            10,
            &TextureData::Blank,
            TextureOptions::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn mipmap_generation_needs_power_of_two() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let options = TextureOptions {
            gen_mipmaps: true,
            ..TextureOptions::default()
        };
        let result =
            textures.create_2d(&mut driver, &caps, &limits, 12, 12, &TextureData::Blank, options);
        assert!(matches!(result, Err(CompileError::NpotRestriction)));
    }

    #[test]
    fn pixel_payload_length_must_match() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let result = textures.create_2d(
            &mut driver,
            &caps,
            &limits,
            4,
            4,
            &TextureData::Pixels(vec![0; 3]),
            TextureOptions::default(),
        );
        assert!(matches!(
            result,
            Err(CompileError::MipSizeMismatch {
                level: 0,
                expected: 64,
                got: 3,
            })
        ));
    }

    #[test]
    fn mip_chain_levels_are_length_checked() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let levels = vec![
            MipData {
                data: vec![0; 64],
                compressed: false,
            },
            MipData {
                data: vec![0; 4],
                compressed: false,
            },
        ];
        let result = textures.create_2d(
            &mut driver,
            &caps,
            &limits,
            4,
            4,
            &TextureData::Levels(levels),
            TextureOptions::default(),
        );
        assert!(matches!(
            result,
            Err(CompileError::MipSizeMismatch {
                level: 1,
                expected: 16,
                got: 4,
            })
        ));
    }

    #[test]
    fn float_pixels_need_the_capability() {
        let mut driver = RecordingDriver::with_capabilities(
            Capabilities::all().without(Capability::FloatTextures),
        );
        let caps = CapabilityRegistry::negotiate(&driver, Capabilities::all());
        let limits = driver.limits();
        let mut textures = manager(&limits);
        let options = TextureOptions {
            dtype: Component::F32,
            ..TextureOptions::default()
        };
        let result =
            textures.create_2d(&mut driver, &caps, &limits, 8, 8, &TextureData::Blank, options);
        assert!(matches!(result, Err(CompileError::FloatTextureUnsupported)));
    }

    #[test]
    fn anisotropy_is_checked_against_the_device_limit() {
        let (mut driver, caps, limits) = setup();
        let mut textures = manager(&limits);
        let options = TextureOptions {
            anisotropy: limits.max_anisotropy + 1,
            ..TextureOptions::default()
        };
        let result =
            textures.create_2d(&mut driver, &caps, &limits, 8, 8, &TextureData::Blank, options);
        assert!(matches!(
            result,
            Err(CompileError::AnisotropyTooHigh { requested, max })
                if requested == limits.max_anisotropy + 1 && max == limits.max_anisotropy
        ));
    }
}
