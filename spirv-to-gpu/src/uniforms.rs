//! Uniform constant register files and per-draw marshalling.
//!
//! The embedder writes constants into flat per-stage register files between
//! draws; marshalling packs the registers a shader actually declares into
//! the tight layout its constant buffer expects. Every element occupies 16
//! bytes regardless of kind, in declaration order, with no padding beyond
//! that stride.

use crate::enums::UniformKind;
use crate::parse::Uniform;

/// Float vec4 registers per stage.
pub const MAX_REG_FILE_F: usize = 8192;
/// Integer vec4 registers per stage.
pub const MAX_REG_FILE_I: usize = 2047;
/// Boolean registers per stage.
pub const MAX_REG_FILE_B: usize = 2047;

/// Packed bytes per uniform element, bool registers included.
const UNIFORM_STRIDE: usize = 16;

/// One stage's constant register files.
#[derive(Debug)]
pub(crate) struct RegisterFile {
    pub f: Vec<f32>,
    pub i: Vec<i32>,
    pub b: Vec<u8>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            f: vec![0.0; MAX_REG_FILE_F * 4],
            i: vec![0; MAX_REG_FILE_I * 4],
            b: vec![0; MAX_REG_FILE_B * 4],
        }
    }
}

/// Direct mutable views over both stages' register files.
///
/// There is no unmap step; the mapping ends when the borrow does, and
/// nothing is flushed because marshalling reads the registers directly.
#[derive(Debug)]
pub struct MappedRegisters<'a> {
    pub vertex_f: &'a mut [f32],
    pub vertex_i: &'a mut [i32],
    pub vertex_b: &'a mut [u8],
    pub fragment_f: &'a mut [f32],
    pub fragment_i: &'a mut [i32],
    pub fragment_b: &'a mut [u8],
}

/// Packed byte size the declared uniforms occupy in a constant buffer.
pub(crate) fn packed_size(uniforms: &[Uniform]) -> u32 {
    uniforms
        .iter()
        .map(|u| u.array_count.max(1) * UNIFORM_STRIDE as u32)
        .sum()
}

/// Packs the declared uniforms from the register files.
///
/// Float and integer elements copy whole vec4 registers. Bool elements
/// expand: each one-byte register lands in the first 32-bit word of its
/// 16-byte slot, and the remaining three words are zero because the buffer
/// is zero-filled up front.
pub(crate) fn pack(uniforms: &[Uniform], regs: &RegisterFile) -> Vec<u8> {
    let mut out = vec![0u8; packed_size(uniforms) as usize];
    let mut offset = 0;

    for uniform in uniforms {
        let index = uniform.index as usize;
        let count = uniform.array_count.max(1) as usize;
        let len = count * UNIFORM_STRIDE;

        match uniform.kind {
            UniformKind::Float => {
                let src: &[u8] = bytemuck::cast_slice(&regs.f[index * 4..(index + count) * 4]);
                out[offset..offset + len].copy_from_slice(src);
            }
            UniformKind::Int => {
                let src: &[u8] = bytemuck::cast_slice(&regs.i[index * 4..(index + count) * 4]);
                out[offset..offset + len].copy_from_slice(src);
            }
            UniformKind::Bool => {
                for element in 0..count {
                    let word = u32::from(regs.b[index + element]);
                    let at = offset + element * UNIFORM_STRIDE;
                    out[at..at + 4].copy_from_slice(bytemuck::bytes_of(&word));
                }
            }
        }
        offset += len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(kind: UniformKind, index: u32, array_count: u32) -> Uniform {
        Uniform {
            kind,
            index,
            array_count,
        }
    }

    fn word_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn float_at(bytes: &[u8], at: usize) -> f32 {
        f32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn packed_size_counts_scalars_as_one_element() {
        let uniforms = [
            uniform(UniformKind::Float, 0, 0),
            uniform(UniformKind::Int, 2, 3),
            uniform(UniformKind::Bool, 0, 2),
        ];
        assert_eq!(packed_size(&uniforms), 16 + 48 + 32);
    }

    #[test]
    fn packs_float_and_expanded_bool_registers() {
        let mut regs = RegisterFile::new();
        regs.f[0..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        regs.b[4] = 1;
        regs.b[5] = 0;

        let uniforms = [
            uniform(UniformKind::Float, 0, 0),
            uniform(UniformKind::Bool, 4, 2),
        ];
        let packed = pack(&uniforms, &regs);
        assert_eq!(packed.len(), 48);

        for (lane, expected) in [1.0f32, 2.0, 3.0, 4.0].iter().enumerate() {
            assert_eq!(float_at(&packed, lane * 4), *expected);
        }

        assert_eq!(word_at(&packed, 16), 1);
        assert_eq!(word_at(&packed, 32), 0);
        // unspecified lanes of each bool slot are deterministically zero
        assert!(packed[20..32].iter().all(|b| *b == 0));
        assert!(packed[36..48].iter().all(|b| *b == 0));
    }

    #[test]
    fn packs_int_arrays_from_their_base_register() {
        let mut regs = RegisterFile::new();
        regs.i[8..16].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let uniforms = [uniform(UniformKind::Int, 2, 2)];
        let packed = pack(&uniforms, &regs);
        assert_eq!(packed.len(), 32);
        for (lane, expected) in (1u32..=8).enumerate() {
            assert_eq!(word_at(&packed, lane * 4), expected);
        }
    }

    #[test]
    fn uniforms_pack_in_declaration_order() {
        let mut regs = RegisterFile::new();
        regs.f[0..4].copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);
        regs.i[0..4].copy_from_slice(&[9, 10, 11, 12]);

        let uniforms = [
            uniform(UniformKind::Int, 0, 0),
            uniform(UniformKind::Float, 0, 0),
        ];
        let packed = pack(&uniforms, &regs);
        for (lane, expected) in (9u32..=12).enumerate() {
            assert_eq!(word_at(&packed, lane * 4), expected);
        }
        for (lane, expected) in [5.0f32, 6.0, 7.0, 8.0].iter().enumerate() {
            assert_eq!(float_at(&packed, 16 + lane * 4), *expected);
        }
    }

    #[test]
    fn no_uniforms_packs_nothing() {
        let regs = RegisterFile::new();
        assert!(pack(&[], &regs).is_empty());
    }
}
