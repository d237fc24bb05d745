//! Contract for the host graphics API that owns GPU devices and draws.

use crate::enums::ShaderStage;

/// Everything the host API needs to create one GPU shader object.
#[derive(Debug, Copy, Clone)]
pub struct ShaderObjectDescriptor<'a> {
    pub stage: ShaderStage,
    /// Specialized SPIR-V bytes, or a precompiled binary fetched from the
    /// archive.
    pub code: &'a [u8],
    pub entry_point: &'a str,
    /// 1 + the highest sampler binding index the shader references.
    pub sampler_count: u32,
    pub uniform_buffer_count: u32,
}

/// The host graphics API collaborator.
///
/// The context never retries a failed call; every error is surfaced to the
/// embedder as-is.
pub trait GpuDevice {
    /// GPU-resident shader object handle.
    type ShaderObject;
    /// Command stream that uniform data is pushed into.
    type CommandBuffer;

    /// Compiles or ingests shader code into a GPU shader object. The error
    /// is the host API's own error string.
    fn create_shader(
        &mut self,
        desc: &ShaderObjectDescriptor<'_>,
    ) -> Result<Self::ShaderObject, String>;

    /// Releases a shader object created by
    /// [`create_shader`](GpuDevice::create_shader).
    fn release_shader(&mut self, shader: Self::ShaderObject);

    /// Pushes packed uniform data for one stage into the command stream.
    fn push_uniform_data(
        &mut self,
        cmd: &mut Self::CommandBuffer,
        stage: ShaderStage,
        slot: u32,
        data: &[u8],
    );
}
