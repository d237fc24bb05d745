//! Links translated shader pairs into GPU-resident program objects.
//!
//! This crate sits between a bytecode-to-SPIR-V translator and a host GPU
//! API. It owns the program linker cache, the optional precompiled binary
//! archive, the link-time specialization of generated vertex code to a
//! vertex buffer layout, and the per-draw packing of uniform constants.
//!
//! The translator and the GPU device are opaque collaborators supplied as
//! [`ShaderTranslator`] and [`GpuDevice`] implementations. A typical frame:
//! compile shaders once with [`ShaderContext::compile_shader`], bind a pair
//! with [`ShaderContext::bind_shaders`], call
//! [`ShaderContext::link_program`] with the draw's vertex layout (repeat
//! links of the same pair and layout are cache hits), write constants
//! through [`ShaderContext::map_uniform_registers`], and push them with
//! [`ShaderContext::update_uniform_buffers`] before issuing the draw.

mod archive;
mod context;
mod device;
mod enums;
mod error;
mod object;
mod parse;
mod patch;
mod uniforms;

pub use archive::*;
pub use context::*;
pub use device::*;
pub use enums::*;
pub use error::*;
pub use object::*;
pub use parse::*;
pub use uniforms::{MappedRegisters, MAX_REG_FILE_B, MAX_REG_FILE_F, MAX_REG_FILE_I};
