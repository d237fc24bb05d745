//! Shader and program records, and the linker cache's content key.

use std::hash::{Hash, Hasher};

use crate::enums::{VertexElementFormat, VertexUsage};
use crate::parse::ParsedShader;

/// Handle to a compiled shader owned by a
/// [`ShaderContext`](crate::ShaderContext).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderId(pub(crate) u16);

/// Handle to a linked GPU program resident in the linker cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u32);

/// Most attributes one vertex layout may bind.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// One element of the vertex buffer layout supplied at link time.
///
/// Order matters: the position in the layout is the input binding slot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VertexAttribute {
    pub usage: VertexUsage,
    pub usage_index: u32,
    pub format: VertexElementFormat,
}

/// A compiled-and-translated shader plus its derived link-time metadata.
#[derive(Debug)]
pub(crate) struct ShaderData {
    pub parsed: ParsedShader,
    pub tag: u16,
    pub refcount: u32,
    /// 1 + the highest sampler binding index; slots may be sparse.
    pub sampler_slots: u32,
    /// Packed byte size of the declared uniforms, fixed at compile time.
    pub uniform_buffer_size: u32,
    /// Stable identity of the generated code, for archive lookup.
    pub content_hash: u64,
}

/// One GPU-resident linked vertex/fragment pair.
///
/// Owns both shader objects; the tags are non-owning back-references to the
/// stage shaders, used at draw time to find their uniform metadata.
#[derive(Debug)]
pub(crate) struct LinkedProgram<S> {
    pub id: ProgramId,
    pub vertex: S,
    pub fragment: S,
    pub vertex_tag: u16,
    pub fragment_tag: u16,
}

/// Content key of the linker cache: both stage identities plus the vertex
/// layout the program was specialized for.
#[derive(Debug, Copy, Clone)]
pub(crate) struct LinkKey {
    pub vertex_tag: u16,
    pub fragment_tag: u16,
    pub attribute_count: u32,
    pub attributes: [VertexAttribute; MAX_VERTEX_ATTRIBUTES],
}

impl LinkKey {
    pub fn new(vertex_tag: u16, fragment_tag: u16, layout: &[VertexAttribute]) -> Self {
        let mut attributes = [VertexAttribute::default(); MAX_VERTEX_ATTRIBUTES];
        attributes[..layout.len()].copy_from_slice(layout);
        Self {
            vertex_tag,
            fragment_tag,
            attribute_count: layout.len() as u32,
            attributes,
        }
    }

    pub fn references(&self, tag: u16) -> bool {
        self.vertex_tag == tag || self.fragment_tag == tag
    }

    fn layout(&self) -> &[VertexAttribute] {
        &self.attributes[..self.attribute_count as usize]
    }
}

impl PartialEq for LinkKey {
    fn eq(&self, other: &Self) -> bool {
        self.vertex_tag == other.vertex_tag
            && self.fragment_tag == other.fragment_tag
            && self.attribute_count == other.attribute_count
            && self.layout() == other.layout()
    }
}

impl Eq for LinkKey {}

impl Hash for LinkKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        const HASH_FACTOR: u32 = 31;
        let mut hash = self.attribute_count;
        for attr in self.layout() {
            hash = hash.wrapping_mul(HASH_FACTOR).wrapping_add(attr.usage as u32);
            hash = hash.wrapping_mul(HASH_FACTOR).wrapping_add(attr.usage_index);
            hash = hash.wrapping_mul(HASH_FACTOR).wrapping_add(attr.format as u32);
        }
        hash = hash
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(u32::from(self.vertex_tag));
        hash = hash
            .wrapping_mul(HASH_FACTOR)
            .wrapping_add(u32::from(self.fragment_tag));
        state.write_u32(hash);
    }
}
