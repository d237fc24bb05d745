//! Link-time specialization of generated vertex shader code.
//!
//! The translator types every vertex input as a 4-component float vector.
//! The vertex buffer layout bound at link time may instead carry packed
//! integer data, so the input's type declaration and every load of it have
//! to be retyped, and the conversion opcode swapped, before the code is
//! handed to the GPU. Specialization copies the generic words and rewrites
//! the copy; the translator output itself is never mutated, so one shader
//! can be linked against any number of layouts.

use crate::enums::VertexElementFormat;
use crate::error::ShaderError;
use crate::object::VertexAttribute;
use crate::parse::ParsedShader;

// Opcodes written into attribute load instructions.
const OP_COPY_OBJECT: u32 = 83;
const OP_CONVERT_S_TO_F: u32 = 111;
const OP_CONVERT_U_TO_F: u32 = 112;

/// Returns a copy of the generated code specialized to `attributes`.
pub(crate) fn specialize(
    parsed: &ParsedShader,
    attributes: &[VertexAttribute],
) -> Result<Vec<u32>, ShaderError> {
    let mut words = parsed.code.clone();
    let table = match &parsed.patch_table {
        Some(table) => table,
        None => return Ok(words),
    };

    for attr in attributes {
        let sites = match table.attribs.get(&(attr.usage, attr.usage_index)) {
            Some(sites) => sites,
            // the shader does not consume this attribute
            None => continue,
        };

        let (type_decl, type_load, opcode) = match attr.format {
            VertexElementFormat::Byte4 => {
                (table.tid_uvec4_ptr, table.tid_uvec4, OP_CONVERT_U_TO_F)
            }
            VertexElementFormat::Short2 | VertexElementFormat::Short4 => {
                (table.tid_ivec4_ptr, table.tid_ivec4, OP_CONVERT_S_TO_F)
            }
            _ => (table.tid_vec4_ptr, table.tid_vec4, OP_COPY_OBJECT),
        };

        write_word(&mut words, sites.type_decl_offset, type_decl)?;
        for load in &sites.loads {
            write_word(&mut words, load.type_offset, type_load)?;
            let word = words
                .get_mut(load.opcode_offset as usize)
                .ok_or(ShaderError::MalformedPatchTable(load.opcode_offset))?;
            // the high half is the instruction word count and must survive
            *word = (*word & 0xFFFF_0000) | opcode;
        }
    }
    Ok(words)
}

fn write_word(words: &mut [u32], offset: u32, value: u32) -> Result<(), ShaderError> {
    match words.get_mut(offset as usize) {
        Some(word) => {
            *word = value;
            Ok(())
        }
        None => Err(ShaderError::MalformedPatchTable(offset)),
    }
}
