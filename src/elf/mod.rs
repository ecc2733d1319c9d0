// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads ELF program headers and verifies 16KB page alignment of `LOAD` segments.
//! Uses the `goblin` crate for in-process parsing and an external NDK tool for inspection.

mod inspector;
mod tool;
mod toolchain;

use goblin::elf::header::{EI_CLASS, ELFCLASS64, EM_386, EM_AARCH64, EM_ARM, EM_X86_64};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf as GoblinElf;
use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use inspector::{Inspection, SegmentAlignmentInspector, REQUIRED_ALIGNMENT};
pub use tool::{parse_load_alignments, ToolError, ToolReader};
pub use toolchain::ToolLocator;

type Result<T> = std::result::Result<T, ElfError>;

/// ELF header size, the smallest file that can possibly be an ELF file.
const ELF_HEADER_SIZE: u64 = 64;

// ELF magic bytes: 0x7f followed by ASCII "ELF"
// Defined in the ELF specification: e_ident[EI_MAG0..EI_MAG3]
const ELF_MAGIC: [u8; 4] = [0x7f, 0x45, 0x4c, 0x46];

/// Errors that can occur when parsing ELF files.
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("File is too small to be an ELF file: {path:?}")]
    FileTooSmall { path: PathBuf },
    #[error("File is not an ELF file: {path:?}")]
    NotElfFile { path: PathBuf },
    #[error("Failed to open file: {path:?}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read file: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse ELF file: {path:?}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
}

impl ElfError {
    /// I/O failures, as opposed to files that are readable but not valid ELF.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::OpenFailed { .. } | Self::ReadFailed { .. })
    }
}

/// Errors a [`ProgramHeaderReader`] can report.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Elf(#[from] ElfError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Source of program header alignments for an ELF file.
pub trait ProgramHeaderReader: Send + Sync {
    /// Alignments (`p_align`) of all `PT_LOAD` program headers of the file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or inspected.
    fn load_alignments(&self, path: &Path) -> std::result::Result<Vec<u64>, ReaderError>;
}

/// Reads program headers in-process with `goblin`, no NDK required.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoblinReader;

impl ProgramHeaderReader for GoblinReader {
    fn load_alignments(&self, path: &Path) -> std::result::Result<Vec<u64>, ReaderError> {
        let bytes = read(path, None)?;
        let elf = GoblinElf::parse(&bytes).map_err(|e| ElfError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(elf
            .program_headers
            .iter()
            .filter(|header| header.p_type == PT_LOAD)
            .map(|header| header.p_align)
            .collect())
    }
}

/// Identity of an ELF file taken from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub machine: u16,
    pub is_64: bool,
}

impl ElfHeader {
    /// Read and parse only the ELF header of the file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file is not an ELF file or cannot be read.
    pub fn sniff(path: &Path) -> Result<Self> {
        let bytes = read(path, Some(ELF_HEADER_SIZE))?;
        let header = GoblinElf::parse_header(&bytes).map_err(|e| ElfError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            machine: header.e_machine,
            is_64: header.e_ident[EI_CLASS] == ELFCLASS64,
        })
    }

    /// Human readable machine name for diagnostics.
    #[must_use]
    pub fn machine_name(&self) -> &'static str {
        match self.machine {
            EM_AARCH64 => "AArch64",
            EM_ARM => "ARM",
            EM_X86_64 => "x86-64",
            EM_386 => "x86",
            _ => "other",
        }
    }
}

/// Reads the file at `path` if it is an ELF file, at most `limit` bytes.
///
/// # Errors
/// Returns an error if the file is not an ELF file or cannot be read.
fn read(path: &Path, limit: Option<u64>) -> Result<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|e| ElfError::OpenFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    // Skip files that are too small to be ELF (must be at least ELF header size)
    if metadata.len() < ELF_HEADER_SIZE {
        return Err(ElfError::FileTooSmall {
            path: path.to_path_buf(),
        });
    }

    let file = fs::File::open(path).map_err(|e| ElfError::OpenFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut bytes = Vec::new();
    let read_result = match limit {
        Some(limit) => file.take(limit).read_to_end(&mut bytes),
        None => {
            let mut file = file;
            file.read_to_end(&mut bytes)
        }
    };
    read_result.map_err(|e| ElfError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    if bytes.get(..ELF_MAGIC.len()) != Some(&ELF_MAGIC[..]) {
        return Err(ElfError::NotElfFile {
            path: path.to_path_buf(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builds minimal ELF64 shared objects for tests.

    use goblin::elf::header::EM_AARCH64;

    /// Build a little-endian ELF64 shared object with one program header per
    /// `(p_type, p_align)` pair.
    pub(crate) fn elf_with_segments(machine: u16, segments: &[(u32, u64)]) -> Vec<u8> {
        const PHDR_SIZE: u16 = 56;
        let phnum = u16::try_from(segments.len()).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend_from_slice(&3u16.to_le_bytes()); // e_type: ET_DYN
        bytes.extend_from_slice(&machine.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes()); // e_version
        bytes.extend_from_slice(&0u64.to_le_bytes()); // e_entry
        bytes.extend_from_slice(&64u64.to_le_bytes()); // e_phoff
        bytes.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
        bytes.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        bytes.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
        bytes.extend_from_slice(&PHDR_SIZE.to_le_bytes());
        bytes.extend_from_slice(&phnum.to_le_bytes());
        bytes.extend_from_slice(&64u16.to_le_bytes()); // e_shentsize
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        for (index, (p_type, p_align)) in segments.iter().enumerate() {
            let vaddr = (index as u64) * 0x10000;
            bytes.extend_from_slice(&p_type.to_le_bytes());
            bytes.extend_from_slice(&5u32.to_le_bytes()); // p_flags: R+X
            bytes.extend_from_slice(&0u64.to_le_bytes()); // p_offset
            bytes.extend_from_slice(&vaddr.to_le_bytes());
            bytes.extend_from_slice(&vaddr.to_le_bytes());
            bytes.extend_from_slice(&0u64.to_le_bytes()); // p_filesz
            bytes.extend_from_slice(&0u64.to_le_bytes()); // p_memsz
            bytes.extend_from_slice(&p_align.to_le_bytes());
        }
        bytes
    }

    /// An arm64 shared object with a single `LOAD` segment of the given alignment.
    pub(crate) fn arm64_library(align: u64) -> Vec<u8> {
        elf_with_segments(EM_AARCH64, &[(goblin::elf::program_header::PT_LOAD, align)])
    }
}
