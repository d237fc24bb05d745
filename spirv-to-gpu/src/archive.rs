//! Precompiled shader binary archives.
//!
//! An archive maps the 64-bit content hash of a shader variant to its
//! precompiled GPU binary. The entry table is open-addressed with linear
//! probing and sized exactly to the number of shaders baked at build time,
//! so every slot is occupied. Archives are loaded once, read-only, with
//! every binary resident in memory; lookups never touch the file again.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::info;

use crate::error::ArchiveError;

const HEADER_SIZE: usize = 4;
const RECORD_SIZE: usize = 16;

#[derive(Debug)]
struct ArchiveSlot {
    hash: u64,
    offset: u32,
    size: u32,
    data: Box<[u8]>,
}

/// A read-only, fully resident precompiled shader archive.
#[derive(Debug)]
pub struct ShaderArchive {
    slots: Vec<ArchiveSlot>,
}

impl ShaderArchive {
    /// Loads an archive file and every binary it records.
    ///
    /// [`ArchiveError::NotFound`] means no archive was baked for this build;
    /// callers fall back to compiling shaders at link time.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArchiveError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let archive = Self::parse(&bytes)?;
        info!(
            "loaded precompiled shader archive: {} shaders, {} bytes",
            archive.slots.len(),
            bytes.len()
        );
        Ok(archive)
    }

    fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ArchiveError::Truncated);
        }
        let count = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let records_end = HEADER_SIZE + count * RECORD_SIZE;
        if bytes.len() < records_end {
            return Err(ArchiveError::Truncated);
        }

        let mut slots = Vec::with_capacity(count);
        for record in 0..count {
            let at = HEADER_SIZE + record * RECORD_SIZE;
            let hash = u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap());
            let offset = u32::from_le_bytes(bytes[at + 8..at + 12].try_into().unwrap());
            let size = u32::from_le_bytes(bytes[at + 12..at + 16].try_into().unwrap());

            let data = bytes
                .get(offset as usize..offset as usize + size as usize)
                .ok_or(ArchiveError::BlobOutOfRange { hash })?;
            slots.push(ArchiveSlot {
                hash,
                offset,
                size,
                data: data.into(),
            });
        }
        Ok(Self { slots })
    }

    /// Number of shaders baked into the archive.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The precompiled binary baked for `hash`, if any.
    ///
    /// `None` means the variant was never recorded when the archive was
    /// built; linking that variant is not possible from this archive.
    pub fn lookup(&self, hash: u64) -> Option<&[u8]> {
        self.probe(hash).map(|slot| &*slot.data)
    }

    /// The file byte range recorded for `hash`, if any.
    pub fn entry(&self, hash: u64) -> Option<(u32, u32)> {
        self.probe(hash).map(|slot| (slot.offset, slot.size))
    }

    fn probe(&self, hash: u64) -> Option<&ArchiveSlot> {
        let n = self.slots.len();
        if n == 0 {
            return None;
        }
        let home = (hash % n as u64) as usize;
        for step in 0..n {
            let slot = &self.slots[(home + step) % n];
            if slot.hash == hash {
                return Some(slot);
            }
        }
        None
    }
}

/// Builds the file format consumed by [`ShaderArchive::open`].
///
/// Entries are placed into the fixed-size table by probing forward from one
/// past the hash's home slot, wrapping, for the first unused slot; records
/// are then written in final slot order so the loader can read them straight
/// into the table. Lookups probe from the home slot itself and terminate on
/// hash equality, which locates entries placed by this scheme.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    shaders: Vec<(u64, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one shader binary under its content hash.
    pub fn push(&mut self, hash: u64, binary: Vec<u8>) {
        self.shaders.push((hash, binary));
    }

    /// Serializes the entry table and binaries.
    pub fn write(&self, mut writer: impl Write) -> std::io::Result<()> {
        let n = self.shaders.len();

        let mut slots: Vec<Option<usize>> = vec![None; n];
        for (entry, (hash, _)) in self.shaders.iter().enumerate() {
            let home = (hash % n as u64) as usize;
            let mut at = (home + 1) % n;
            while slots[at].is_some() {
                at = (at + 1) % n;
            }
            slots[at] = Some(entry);
        }
        debug_assert!(slots.iter().all(Option::is_some));

        writer.write_all(&(n as u32).to_le_bytes())?;
        let mut offset = (HEADER_SIZE + n * RECORD_SIZE) as u32;
        for entry in slots.iter().flatten() {
            let (hash, binary) = &self.shaders[*entry];
            writer.write_all(&hash.to_le_bytes())?;
            writer.write_all(&offset.to_le_bytes())?;
            writer.write_all(&(binary.len() as u32).to_le_bytes())?;
            offset += binary.len() as u32;
        }
        for entry in slots.iter().flatten() {
            writer.write_all(&self.shaders[*entry].1)?;
        }
        Ok(())
    }

    /// Writes the archive to a file.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        self.write(File::create(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: &[(u64, &[u8])]) -> ShaderArchive {
        let mut builder = ArchiveBuilder::new();
        for (hash, binary) in entries {
            builder.push(*hash, binary.to_vec());
        }
        let mut bytes = Vec::new();
        builder.write(&mut bytes).unwrap();
        ShaderArchive::parse(&bytes).unwrap()
    }

    #[test]
    fn round_trips_every_entry() {
        for n in 1u64..=8 {
            let entries: Vec<(u64, Vec<u8>)> = (0..n)
                .map(|i| (i * 7 + 3, vec![i as u8; (i + 1) as usize]))
                .collect();
            let borrowed: Vec<(u64, &[u8])> =
                entries.iter().map(|(h, b)| (*h, b.as_slice())).collect();
            let archive = build(&borrowed);
            assert_eq!(archive.len(), n as usize);
            for (hash, binary) in &entries {
                assert_eq!(archive.lookup(*hash), Some(binary.as_slice()));
                let (offset, size) = archive.entry(*hash).unwrap();
                assert_eq!(size as usize, binary.len());
                assert!(offset as usize >= HEADER_SIZE + n as usize * RECORD_SIZE);
            }
        }
    }

    #[test]
    fn single_entry_table() {
        let archive = build(&[(0xdead_beef, b"blob")]);
        assert_eq!(archive.lookup(0xdead_beef), Some(b"blob".as_slice()));
        assert_eq!(archive.lookup(1), None);
    }

    #[test]
    fn colliding_home_slots_all_resolve() {
        // four hashes, all home slot 2 in a table of four
        let entries: &[(u64, &[u8])] = &[
            (2, b"a"),
            (6, b"bb"),
            (10, b"ccc"),
            (14, b"dddd"),
        ];
        let archive = build(entries);
        for (hash, binary) in entries {
            assert_eq!(archive.lookup(*hash), Some(*binary));
        }
    }

    #[test]
    fn missing_hash_is_a_miss() {
        let archive = build(&[(3, b"x"), (9, b"y")]);
        assert_eq!(archive.lookup(999), None);
        assert_eq!(archive.entry(999), None);
    }

    #[test]
    fn open_reports_missing_file() {
        let path = std::env::temp_dir().join("spirv-to-gpu-no-such-archive.bin");
        assert!(matches!(
            ShaderArchive::open(&path),
            Err(ArchiveError::NotFound)
        ));
    }

    #[test]
    fn open_round_trips_through_a_file() {
        let path = std::env::temp_dir().join(format!(
            "spirv-to-gpu-archive-{}.bin",
            std::process::id()
        ));
        let mut builder = ArchiveBuilder::new();
        builder.push(42, vec![1, 2, 3]);
        builder.push(77, vec![4, 5]);
        builder.write_to(&path).unwrap();

        let archive = ShaderArchive::open(&path).unwrap();
        assert_eq!(archive.lookup(42), Some([1, 2, 3].as_slice()));
        assert_eq!(archive.lookup(77), Some([4, 5].as_slice()));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn truncated_record_block() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; RECORD_SIZE]); // one record, two promised
        assert!(matches!(
            ShaderArchive::parse(&bytes),
            Err(ArchiveError::Truncated)
        ));
    }

    #[test]
    fn blob_range_outside_file() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&5u64.to_le_bytes());
        bytes.extend_from_slice(&(HEADER_SIZE as u32 + RECORD_SIZE as u32).to_le_bytes());
        bytes.extend_from_slice(&64u32.to_le_bytes()); // 64 bytes promised, none present
        assert!(matches!(
            ShaderArchive::parse(&bytes),
            Err(ArchiveError::BlobOutOfRange { hash: 5 })
        ));
    }
}
