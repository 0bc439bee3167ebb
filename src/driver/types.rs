//! Common types shared across the driver boundary

/// Raw driver-side buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBuffer(pub u32);

/// Raw driver-side texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawTexture(pub u32);

/// Raw driver-side renderbuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRenderbuffer(pub u32);

/// Raw driver-side framebuffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFramebuffer(pub u32);

/// Raw driver-side shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawShader(pub u32);

/// Raw driver-side program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawProgram(pub u32);

/// Raw driver-side vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawVertexArray(pub u32);

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Element dtype of buffer and pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl Component {
    /// Byte size of one element
    pub fn size(&self) -> usize {
        match self {
            Component::I8 | Component::U8 => 1,
            Component::I16 | Component::U16 => 2,
            Component::I32 | Component::U32 | Component::F32 => 4,
        }
    }
}

/// Index storage width for element buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn bytes(&self) -> u32 {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }

    pub fn component(&self) -> Component {
        match self {
            IndexWidth::U16 => Component::U16,
            IndexWidth::U32 => Component::U32,
        }
    }
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Buffer usage hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexTarget {
    Tex2d,
    Cube,
}

/// Image upload target: the 2D plane or one of the six cube faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexImageTarget {
    Tex2d,
    CubePosX,
    CubeNegX,
    CubePosY,
    CubeNegY,
    CubePosZ,
    CubeNegZ,
}

impl TexImageTarget {
    /// The six cube face targets, in face-index order.
    pub const CUBE_FACES: [TexImageTarget; 6] = [
        TexImageTarget::CubePosX,
        TexImageTarget::CubeNegX,
        TexImageTarget::CubePosY,
        TexImageTarget::CubeNegY,
        TexImageTarget::CubePosZ,
        TexImageTarget::CubeNegZ,
    ];
}

/// Pixel color layout, one entry per channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorLayout {
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
}

impl ColorLayout {
    pub fn from_channels(channels: u32) -> Option<ColorLayout> {
        match channels {
            1 => Some(ColorLayout::Luminance),
            2 => Some(ColorLayout::LuminanceAlpha),
            3 => Some(ColorLayout::Rgb),
            4 => Some(ColorLayout::Rgba),
            _ => None,
        }
    }

    pub fn channels(&self) -> u32 {
        match self {
            ColorLayout::Luminance => 1,
            ColorLayout::LuminanceAlpha => 2,
            ColorLayout::Rgb => 3,
            ColorLayout::Rgba => 4,
        }
    }
}

/// Filter mode for texture sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl FilterMode {
    /// Whether this mode samples from mip levels.
    pub fn uses_mipmaps(&self) -> bool {
        !matches!(self, FilterMode::Nearest | FilterMode::Linear)
    }
}

/// Wrap mode for texture coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Sampling parameters applied to a bound texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexParams {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub anisotropy: u32,
}

/// Renderbuffer storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderbufferFormat {
    #[default]
    Rgba4,
    Rgb565,
    Rgb5A1,
    Depth16,
    Stencil8,
    DepthStencil,
}

/// Framebuffer attachment slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Toggleable pipeline state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateFlag {
    Dither,
    Blend,
    DepthTest,
    CullFace,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
    SampleCoverage,
    StencilTest,
    ScissorTest,
}

/// Compare function for depth/stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
}

/// Face selector for culling and stencil state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

/// Front face winding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    Ccw,
    Cw,
}

/// Stencil update action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilAction {
    Keep,
    Zero,
    Replace,
    Increment,
    IncrementWrap,
    Decrement,
    DecrementWrap,
    Invert,
}

/// Parametrized state setters, one variant per driver call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateValue {
    BlendColor([f32; 4]),
    BlendEquation {
        rgb: BlendOp,
        alpha: BlendOp,
    },
    BlendFunc {
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
    DepthFunc(CompareFunc),
    DepthRange {
        near: f32,
        far: f32,
    },
    DepthMask(bool),
    ColorMask([bool; 4]),
    CullFace(Face),
    FrontFace(Winding),
    LineWidth(f32),
    PolygonOffset {
        factor: f32,
        units: f32,
    },
    SampleCoverage {
        value: f32,
        invert: bool,
    },
    StencilMask(u32),
    StencilFunc {
        func: CompareFunc,
        reference: i32,
        mask: u32,
    },
    StencilOp {
        fail: StencilAction,
        zfail: StencilAction,
        zpass: StencilAction,
    },
    Scissor {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// Identity of a state variable, independent of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    BlendColor,
    BlendEquation,
    BlendFunc,
    DepthFunc,
    DepthRange,
    DepthMask,
    ColorMask,
    CullFace,
    FrontFace,
    LineWidth,
    PolygonOffset,
    SampleCoverage,
    StencilMask,
    StencilFunc,
    StencilOp,
    Scissor,
    Viewport,
}

impl StateValue {
    pub fn key(&self) -> StateKey {
        match self {
            StateValue::BlendColor(_) => StateKey::BlendColor,
            StateValue::BlendEquation { .. } => StateKey::BlendEquation,
            StateValue::BlendFunc { .. } => StateKey::BlendFunc,
            StateValue::DepthFunc(_) => StateKey::DepthFunc,
            StateValue::DepthRange { .. } => StateKey::DepthRange,
            StateValue::DepthMask(_) => StateKey::DepthMask,
            StateValue::ColorMask(_) => StateKey::ColorMask,
            StateValue::CullFace(_) => StateKey::CullFace,
            StateValue::FrontFace(_) => StateKey::FrontFace,
            StateValue::LineWidth(_) => StateKey::LineWidth,
            StateValue::PolygonOffset { .. } => StateKey::PolygonOffset,
            StateValue::SampleCoverage { .. } => StateKey::SampleCoverage,
            StateValue::StencilMask(_) => StateKey::StencilMask,
            StateValue::StencilFunc { .. } => StateKey::StencilFunc,
            StateValue::StencilOp { .. } => StateKey::StencilOp,
            StateValue::Scissor { .. } => StateKey::Scissor,
            StateValue::Viewport { .. } => StateKey::Viewport,
        }
    }
}

/// Shader variable type reported by program introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlType {
    Float,
    Int,
    Bool,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    IntVec2,
    IntVec3,
    IntVec4,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2d,
    SamplerCube,
}

impl GlType {
    /// Component count when the type is usable as a vertex attribute.
    pub fn attribute_size(&self) -> Option<u32> {
        match self {
            GlType::Float => Some(1),
            GlType::FloatVec2 => Some(2),
            GlType::FloatVec3 => Some(3),
            GlType::FloatVec4 => Some(4),
            GlType::FloatMat2 => Some(4),
            GlType::FloatMat3 => Some(9),
            GlType::FloatMat4 => Some(16),
            _ => None,
        }
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, GlType::Sampler2d | GlType::SamplerCube)
    }
}

/// An active attribute or uniform reported by the driver after linking
#[derive(Debug, Clone, PartialEq)]
pub struct RawActiveInfo {
    pub name: String,
    pub location: i32,
    pub ty: GlType,
    pub size: u32,
}

/// Uniform upload payload. Matrix variants carry an explicit transpose
/// flag; the emission layer always passes `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Mat2 { values: [f32; 4], transpose: bool },
    Mat3 { values: [f32; 9], transpose: bool },
    Mat4 { values: [f32; 16], transpose: bool },
    Sampler(i32),
}
