//! Data model produced by the bytecode-to-SPIR-V translator collaborator.

use rustc_hash::FxHashMap;

use crate::enums::{SamplerType, ShaderStage, UniformKind, VertexUsage};

/// One shader constant declared by the translated shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub kind: UniformKind,
    /// Base register index into the stage's register file.
    pub index: u32,
    /// Declared array element count; 0 means a scalar declaration.
    pub array_count: u32,
}

/// One sampler binding referenced by the translated shader.
///
/// Binding slots may be sparse; only the highest index matters when sizing
/// the GPU object's sampler table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Sampler {
    pub index: u32,
}

/// One vertex input declared by the translated shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub usage: VertexUsage,
    pub index: u32,
}

/// Swizzle forced onto a vertex attribute during translation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Swizzle {
    pub usage: VertexUsage,
    pub index: u32,
    pub swizzle: [u8; 4],
}

/// Remaps a sampler binding during translation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SamplerMap {
    pub index: u32,
    pub sampler_type: SamplerType,
}

/// One rewrite site for a vertex attribute load instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribLoadSite {
    /// Word offset of the load's result type id.
    pub type_offset: u32,
    /// Word offset of the load's opcode word; only the low 16 bits are
    /// rewritten, the high half keeps the instruction word count.
    pub opcode_offset: u32,
}

/// Patch sites recorded for one (usage, usage index) vertex input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttribPatchSites {
    /// Word offset of the input variable's pointer type declaration.
    pub type_decl_offset: u32,
    pub loads: Vec<AttribLoadSite>,
}

/// Pre-registered type ids and rewrite offsets recorded by the translator so
/// generated vertex code can be retyped for a vertex buffer layout at link
/// time without re-translating.
#[derive(Debug, Clone, Default)]
pub struct SpirvPatchTable {
    pub tid_vec4: u32,
    pub tid_ivec4: u32,
    pub tid_uvec4: u32,
    /// Input-pointer variants of the three vector types.
    pub tid_vec4_ptr: u32,
    pub tid_ivec4_ptr: u32,
    pub tid_uvec4_ptr: u32,
    /// Patch sites keyed by (usage, usage index). An input the shader never
    /// consumes has no entry.
    pub attribs: FxHashMap<(VertexUsage, u32), AttribPatchSites>,
}

/// Output of one bytecode translation.
#[derive(Debug, Clone)]
pub struct ParsedShader {
    pub stage: ShaderStage,
    /// Entry point name baked into the generated code.
    pub entry_point: String,
    /// Generated SPIR-V words. The patch table is carried separately and is
    /// never part of the code handed to the GPU.
    pub code: Vec<u32>,
    pub uniforms: Vec<Uniform>,
    pub samplers: Vec<Sampler>,
    pub attributes: Vec<ShaderAttribute>,
    /// Present on vertex shaders whose inputs can be retyped at link time.
    pub patch_table: Option<SpirvPatchTable>,
}

/// One diagnostic from a failed translation.
#[derive(Debug, Clone)]
pub struct TranslateError {
    pub message: String,
    /// Byte position in the source bytecode, when known.
    pub position: Option<u32>,
}

/// The bytecode-to-SPIR-V translator collaborator.
pub trait ShaderTranslator {
    /// Translates compiled shader bytecode into SPIR-V plus metadata.
    ///
    /// A failed translation reports at least one error; the first one is
    /// surfaced to the embedder.
    fn translate(
        &self,
        profile: &str,
        entry_point: &str,
        bytecode: &[u8],
        swizzles: &[Swizzle],
        sampler_map: &[SamplerMap],
    ) -> Result<ParsedShader, Vec<TranslateError>>;

    /// Rewrites cross-stage input/output locations so the two specialized
    /// modules agree on attribute bindings.
    fn link_attributes(&self, vertex_code: &mut [u32], fragment_code: &mut [u32]);
}
