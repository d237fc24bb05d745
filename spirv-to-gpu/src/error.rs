use thiserror::Error;

/// Error type for shader compilation, linking, and marshalling.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The bytecode translator rejected the shader.
    #[error("Shader translation failed: {0}.")]
    Translate(String),
    /// Linking was requested without both pipeline stages bound.
    #[error("Linking requires both a vertex and a fragment shader to be bound.")]
    IncompletePipeline,
    /// A stage's binary was never baked into the open precompiled archive.
    #[error("Precompiled archive has no entry for content hash {0:#018x}.")]
    ArchiveIncomplete(u64),
    /// The host API failed to create a GPU shader object.
    #[error("Shader object creation failed: {0}.")]
    CreateShader(String),
    /// A patch-table offset fell outside the generated code.
    #[error("Attribute patch table references word {0} outside the generated code.")]
    MalformedPatchTable(u32),
}

/// Error type for precompiled shader archive files.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No archive file exists at the given path.
    #[error("Archive file not found.")]
    NotFound,
    #[error("Failed to read archive file: {0}.")]
    Io(#[from] std::io::Error),
    /// The header or entry table is cut short.
    #[error("Archive file is truncated.")]
    Truncated,
    /// An entry's recorded byte range lies outside the file.
    #[error("Archive entry for content hash {hash:#018x} references bytes outside the file.")]
    BlobOutOfRange { hash: u64 },
}
