/// Pipeline stage a shader object executes in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Register file a shader constant lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Bool,
}

/// Sampler dimensionality recorded in a sampler remap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SamplerType {
    TwoD,
    Cube,
    Volume,
}

/// Vertex attribute usage semantic, as declared by the source shader.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexUsage {
    #[default]
    Position = 0,
    BlendWeight = 1,
    BlendIndices = 2,
    Normal = 3,
    PointSize = 4,
    TexCoord = 5,
    Tangent = 6,
    Binormal = 7,
    TessFactor = 8,
    PositionT = 9,
    Color = 10,
    Fog = 11,
    Depth = 12,
    Sample = 13,
}

/// Element format of one attribute in a bound vertex buffer.
///
/// The generated code loads every attribute as a 4-component float vector;
/// the three packed integer formats ([`Byte4`](VertexElementFormat::Byte4),
/// [`Short2`](VertexElementFormat::Short2),
/// [`Short4`](VertexElementFormat::Short4)) require the load to be retyped
/// and converted at link time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum VertexElementFormat {
    #[default]
    Single = 0,
    Vector2 = 1,
    Vector3 = 2,
    Vector4 = 3,
    Color = 4,
    Byte4 = 5,
    Short2 = 6,
    Short4 = 7,
    NormalizedShort2 = 8,
    NormalizedShort4 = 9,
    HalfVector2 = 10,
    HalfVector4 = 11,
}
