//! The shader context: compilation, program linking, and uniform pushes.

use std::hash::Hasher;
use std::path::Path;

use log::{debug, trace, warn};
use rustc_hash::FxHashMap;
use twox_hash::XxHash64;

use crate::archive::ShaderArchive;
use crate::device::{GpuDevice, ShaderObjectDescriptor};
use crate::enums::{ShaderStage, VertexUsage};
use crate::error::ShaderError;
use crate::object::{
    LinkKey, LinkedProgram, ProgramId, ShaderData, ShaderId, VertexAttribute,
    MAX_VERTEX_ATTRIBUTES,
};
use crate::parse::{ParsedShader, SamplerMap, ShaderTranslator, Swizzle};
use crate::patch;
use crate::uniforms::{self, MappedRegisters, RegisterFile};

/// Translation profile requested from the translator collaborator.
const PROFILE: &str = "spirv";

/// Owns the compiled shaders, the program linker cache, and the uniform
/// register files for one device.
///
/// Every operation is synchronous and runs on the caller's thread; confine
/// each context to one thread.
pub struct ShaderContext<T: ShaderTranslator, D: GpuDevice> {
    translator: T,
    device: D,
    archive: Option<ShaderArchive>,

    shaders: FxHashMap<u16, ShaderData>,
    next_tag: u16,

    programs: FxHashMap<LinkKey, LinkedProgram<D::ShaderObject>>,
    next_program: u32,

    bound_vertex: Option<ShaderId>,
    bound_fragment: Option<ShaderId>,
    bound_key: Option<LinkKey>,

    vertex_registers: RegisterFile,
    fragment_registers: RegisterFile,
}

impl<T: ShaderTranslator, D: GpuDevice> ShaderContext<T, D> {
    /// Creates a context that compiles every shader at link time.
    pub fn new(translator: T, device: D) -> Self {
        Self::with_loaded_archive(translator, device, None)
    }

    /// Creates a context backed by a precompiled shader archive.
    ///
    /// A missing or unreadable archive is not fatal: the context degrades to
    /// compiling shaders at link time.
    pub fn with_archive(translator: T, device: D, path: &Path) -> Self {
        let archive = match ShaderArchive::open(path) {
            Ok(archive) => Some(archive),
            Err(error) => {
                warn!("precompiled shader archive unavailable ({error}); compiling at link time");
                None
            }
        };
        Self::with_loaded_archive(translator, device, archive)
    }

    fn with_loaded_archive(translator: T, device: D, archive: Option<ShaderArchive>) -> Self {
        Self {
            translator,
            device,
            archive,
            shaders: FxHashMap::default(),
            next_tag: 1,
            programs: FxHashMap::default(),
            next_program: 1,
            bound_vertex: None,
            bound_fragment: None,
            bound_key: None,
            vertex_registers: RegisterFile::new(),
            fragment_registers: RegisterFile::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Translates shader bytecode and registers the result.
    ///
    /// The returned shader starts with a reference count of one; it is
    /// destroyed by the matching [`delete_shader`](Self::delete_shader).
    pub fn compile_shader(
        &mut self,
        entry_point: &str,
        bytecode: &[u8],
        swizzles: &[Swizzle],
        sampler_map: &[SamplerMap],
    ) -> Result<ShaderId, ShaderError> {
        let parsed = self
            .translator
            .translate(PROFILE, entry_point, bytecode, swizzles, sampler_map)
            .map_err(|errors| {
                ShaderError::Translate(
                    errors
                        .first()
                        .map(|e| e.message.clone())
                        .unwrap_or_else(|| "unknown translation error".into()),
                )
            })?;

        // binding slots may be sparse; only the highest matters
        let sampler_slots = parsed
            .samplers
            .iter()
            .map(|s| s.index)
            .max()
            .map_or(1, |max| max + 1);
        let uniform_buffer_size = uniforms::packed_size(&parsed.uniforms);
        let content_hash = content_hash(&parsed);

        let tag = self.next_tag;
        self.next_tag += 1;
        trace!(
            "compiled {:?} shader tag {tag} ({} words)",
            parsed.stage,
            parsed.code.len()
        );

        self.shaders.insert(
            tag,
            ShaderData {
                parsed,
                tag,
                refcount: 1,
                sampler_slots,
                uniform_buffer_size,
                content_hash,
            },
        );
        Ok(ShaderId(tag))
    }

    pub fn shader_add_ref(&mut self, shader: ShaderId) {
        if let Some(data) = self.shaders.get_mut(&shader.0) {
            data.refcount += 1;
        }
    }

    /// Drops one reference. When the last reference goes, every cached
    /// program linked against the shader is evicted (releasing its GPU
    /// handles) before the shader's own storage is freed, so a program
    /// never outlives either of its stages.
    pub fn delete_shader(&mut self, shader: ShaderId) {
        match self.shaders.get_mut(&shader.0) {
            None => {}
            Some(data) if data.refcount > 1 => data.refcount -= 1,
            Some(_) => {
                self.evict_programs_for(shader.0);
                self.shaders.remove(&shader.0);
                trace!("deleted shader tag {}", shader.0);
            }
        }
    }

    fn evict_programs_for(&mut self, tag: u16) {
        let keys: Vec<LinkKey> = self
            .programs
            .keys()
            .filter(|key| key.references(tag))
            .copied()
            .collect();
        for key in keys {
            if let Some(program) = self.programs.remove(&key) {
                debug!("evicting program {:?} for deleted shader tag {tag}", program.id);
                if self.bound_key == Some(key) {
                    self.bound_key = None;
                }
                self.device.release_shader(program.vertex);
                self.device.release_shader(program.fragment);
            }
        }
    }

    /// Stages the shader pair the next link operates on. Either slot may be
    /// left empty, but linking requires both.
    pub fn bind_shaders(&mut self, vertex: Option<ShaderId>, fragment: Option<ShaderId>) {
        self.bound_vertex = vertex;
        self.bound_fragment = fragment;
    }

    pub fn bound_shader_data(&self) -> (Option<ShaderId>, Option<ShaderId>) {
        (self.bound_vertex, self.bound_fragment)
    }

    /// Returns a program linking the bound shader pair against the given
    /// vertex layout, and makes it the bound program.
    ///
    /// A cached program is returned as-is, with no host-API calls and no
    /// repatching. Otherwise both stages are built, from the precompiled
    /// archive when one is loaded, else by specializing the generated code
    /// to the layout. Creation is all-or-nothing: if either stage's GPU
    /// object fails, the other is released and nothing is cached.
    pub fn link_program(&mut self, attributes: &[VertexAttribute]) -> Result<ProgramId, ShaderError> {
        let vertex_tag = match self.bound_vertex.and_then(|id| self.shaders.get(&id.0)) {
            Some(data) => data.tag,
            None => return Err(ShaderError::IncompletePipeline),
        };
        let fragment_tag = match self.bound_fragment.and_then(|id| self.shaders.get(&id.0)) {
            Some(data) => data.tag,
            None => return Err(ShaderError::IncompletePipeline),
        };

        let layout = &attributes[..attributes.len().min(MAX_VERTEX_ATTRIBUTES)];
        let key = LinkKey::new(vertex_tag, fragment_tag, layout);

        if let Some(program) = self.programs.get(&key) {
            debug!("program cache hit for shader tags ({vertex_tag}, {fragment_tag})");
            let id = program.id;
            self.bound_key = Some(key);
            return Ok(id);
        }
        debug!("program cache miss for shader tags ({vertex_tag}, {fragment_tag})");

        let vertex_data = &self.shaders[&vertex_tag];
        let fragment_data = &self.shaders[&fragment_tag];

        let (vertex_code, fragment_code) = if let Some(archive) = &self.archive {
            let vertex_bin = archive
                .lookup(vertex_data.content_hash)
                .ok_or(ShaderError::ArchiveIncomplete(vertex_data.content_hash))?;
            let fragment_bin = archive
                .lookup(fragment_data.content_hash)
                .ok_or(ShaderError::ArchiveIncomplete(fragment_data.content_hash))?;
            (vertex_bin.to_vec(), fragment_bin.to_vec())
        } else {
            let mut vertex_words = patch::specialize(&vertex_data.parsed, layout)?;
            let mut fragment_words = fragment_data.parsed.code.clone();
            self.translator
                .link_attributes(&mut vertex_words, &mut fragment_words);
            (
                bytemuck::cast_slice::<u32, u8>(&vertex_words).to_vec(),
                bytemuck::cast_slice::<u32, u8>(&fragment_words).to_vec(),
            )
        };

        let vertex_desc = ShaderObjectDescriptor {
            stage: ShaderStage::Vertex,
            code: &vertex_code,
            entry_point: &vertex_data.parsed.entry_point,
            sampler_count: vertex_data.sampler_slots,
            uniform_buffer_count: 1,
        };
        let vertex = self
            .device
            .create_shader(&vertex_desc)
            .map_err(ShaderError::CreateShader)?;

        let fragment_desc = ShaderObjectDescriptor {
            stage: ShaderStage::Fragment,
            code: &fragment_code,
            entry_point: &fragment_data.parsed.entry_point,
            sampler_count: fragment_data.sampler_slots,
            uniform_buffer_count: 1,
        };
        let fragment = match self.device.create_shader(&fragment_desc) {
            Ok(fragment) => fragment,
            Err(error) => {
                self.device.release_shader(vertex);
                return Err(ShaderError::CreateShader(error));
            }
        };

        let id = ProgramId(self.next_program);
        self.next_program += 1;
        self.programs.insert(
            key,
            LinkedProgram {
                id,
                vertex,
                fragment,
                vertex_tag,
                fragment_tag,
            },
        );
        self.bound_key = Some(key);
        Ok(id)
    }

    /// Makes a previously linked program (or no program) the bound one.
    pub fn bind_program(&mut self, program: Option<ProgramId>) {
        self.bound_key = program.and_then(|id| {
            self.programs
                .iter()
                .find(|(_, p)| p.id == id)
                .map(|(key, _)| *key)
        });
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound_key
            .and_then(|key| self.programs.get(&key))
            .map(|program| program.id)
    }

    /// Releases a program's GPU handles and forgets it, unbinding it first
    /// if it is the bound program.
    pub fn delete_program(&mut self, program: ProgramId) {
        let key = self
            .programs
            .iter()
            .find(|(_, p)| p.id == program)
            .map(|(key, _)| *key);
        if let Some(key) = key {
            if self.bound_key == Some(key) {
                self.bound_key = None;
            }
            if let Some(program) = self.programs.remove(&key) {
                self.device.release_shader(program.vertex);
                self.device.release_shader(program.fragment);
            }
        }
    }

    /// Packed byte size the shader's uniforms need per draw.
    pub fn uniform_buffer_size(&self, shader: ShaderId) -> Option<u32> {
        self.shaders.get(&shader.0).map(|data| data.uniform_buffer_size)
    }

    /// Sampler slots the shader's GPU object must be created with.
    pub fn sampler_slots(&self, shader: ShaderId) -> Option<u32> {
        self.shaders.get(&shader.0).map(|data| data.sampler_slots)
    }

    /// The translator output backing a compiled shader.
    pub fn shader_parse_data(&self, shader: ShaderId) -> Option<&ParsedShader> {
        self.shaders.get(&shader.0).map(|data| &data.parsed)
    }

    /// Input location of the vertex attribute declared for (usage, index).
    pub fn vertex_attrib_location(
        &self,
        shader: ShaderId,
        usage: VertexUsage,
        usage_index: u32,
    ) -> Option<u32> {
        let data = self.shaders.get(&shader.0)?;
        data.parsed
            .attributes
            .iter()
            .position(|attr| attr.usage == usage && attr.index == usage_index)
            .map(|position| position as u32)
    }

    /// Maps both stages' register files for writing. No copy, no lock; the
    /// mapping is the borrow itself.
    pub fn map_uniform_registers(&mut self) -> MappedRegisters<'_> {
        MappedRegisters {
            vertex_f: &mut self.vertex_registers.f,
            vertex_i: &mut self.vertex_registers.i,
            vertex_b: &mut self.vertex_registers.b,
            fragment_f: &mut self.fragment_registers.f,
            fragment_i: &mut self.fragment_registers.i,
            fragment_b: &mut self.fragment_registers.b,
        }
    }

    /// Packs and pushes the bound program's uniforms into the command
    /// stream, once per stage, skipping stages with no uniforms. Call once
    /// per draw, after the register files are written.
    pub fn update_uniform_buffers(&mut self, cmd: &mut D::CommandBuffer) {
        let program = match self.bound_key.and_then(|key| self.programs.get(&key)) {
            Some(program) => program,
            None => return,
        };

        let stages = [
            (program.vertex_tag, ShaderStage::Vertex),
            (program.fragment_tag, ShaderStage::Fragment),
        ];
        for (tag, stage) in stages {
            let data = match self.shaders.get(&tag) {
                Some(data) => data,
                None => continue,
            };
            if data.uniform_buffer_size == 0 {
                continue;
            }
            let registers = match stage {
                ShaderStage::Vertex => &self.vertex_registers,
                ShaderStage::Fragment => &self.fragment_registers,
            };
            let packed = uniforms::pack(&data.parsed.uniforms, registers);
            self.device.push_uniform_data(cmd, stage, 0, &packed);
        }
    }

    /// The bound program's compiled stage handles, for pipeline creation.
    pub fn bound_shader_objects(&self) -> Option<(&D::ShaderObject, &D::ShaderObject)> {
        let program = self.bound_key.and_then(|key| self.programs.get(&key))?;
        Some((&program.vertex, &program.fragment))
    }
}

impl<T: ShaderTranslator, D: GpuDevice> Drop for ShaderContext<T, D> {
    fn drop(&mut self) {
        let programs: Vec<_> = self.programs.drain().map(|(_, program)| program).collect();
        for program in programs {
            self.device.release_shader(program.vertex);
            self.device.release_shader(program.fragment);
        }
    }
}

/// Stable identity of one translated shader, used for archive lookups.
fn content_hash(parsed: &ParsedShader) -> u64 {
    let mut hasher = XxHash64::default();
    hasher.write(bytemuck::cast_slice(&parsed.code));
    hasher.write(parsed.entry_point.as_bytes());
    hasher.finish()
}
