// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Fixture builders shared by the integration tests.

use goblin::elf::header::{EM_AARCH64, EM_ARM};
use goblin::elf::program_header::PT_LOAD;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use pagesize_audit::dependencies::{DependencyResolver, Resolution, ResolvedDependency};

/// Library directory of a NativeScript platform build.
pub const PLATFORM_LIBS: &str = "platforms/android/app/build/intermediates/merged_native_libs/release/out/lib";

/// A little-endian ELF64 shared object with one `LOAD` segment.
pub fn elf_library(machine: u16, align: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    bytes.extend_from_slice(&[0u8; 8]);
    bytes.extend_from_slice(&3u16.to_le_bytes()); // ET_DYN
    bytes.extend_from_slice(&machine.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes()); // e_entry
    bytes.extend_from_slice(&64u64.to_le_bytes()); // e_phoff
    bytes.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&64u16.to_le_bytes());
    bytes.extend_from_slice(&56u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    bytes.extend_from_slice(&64u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&PT_LOAD.to_le_bytes());
    bytes.extend_from_slice(&5u32.to_le_bytes());
    for _ in 0..5 {
        bytes.extend_from_slice(&0u64.to_le_bytes());
    }
    bytes.extend_from_slice(&align.to_le_bytes());
    bytes
}

pub fn arm64_library(align: u64) -> Vec<u8> {
    elf_library(EM_AARCH64, align)
}

/// Linked for 32-bit ARM but stored in an ELF64 container, enough for ABI tests.
pub fn armeabi_library() -> Vec<u8> {
    elf_library(EM_ARM, 4096)
}

pub fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent")).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Write a deflated archive, as `assembleRelease` does for most entries.
pub fn write_archive(root: &Path, relative: &str, entries: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = write_file(root, relative, &[]);
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Resolver returning a fixed dependency list.
pub struct FakeResolver(pub Vec<ResolvedDependency>);

impl FakeResolver {
    pub fn empty() -> Self {
        Self(Vec::new())
    }
}

impl DependencyResolver for FakeResolver {
    fn resolve(&self, _root: &Path) -> Resolution {
        Resolution::Resolved(self.0.clone())
    }
}
