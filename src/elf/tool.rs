// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads program headers through an external introspection tool (`llvm-readelf`,
//! `llvm-objdump` or GNU `readelf`).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

use super::{ProgramHeaderReader, ReaderError};
use crate::process::{run_with_timeout, ProcessError};

/// Errors reported by the external introspection tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Introspection tool failed on {path:?}")]
    Failed {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },
    #[error("Introspection tool output for {path:?} has no program header table")]
    Unparsable { path: PathBuf },
}

/// Output dialect of the configured tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// `readelf -lW`: one row per header, alignment in the last column.
    Readelf,
    /// `objdump -p`: `LOAD off ... align 2**N`.
    Objdump,
}

/// Runs the external tool once per file.
#[derive(Debug, Clone)]
pub struct ToolReader {
    tool: PathBuf,
    dialect: Dialect,
    timeout: Duration,
}

impl ToolReader {
    #[must_use]
    pub fn new(tool: PathBuf, timeout: Duration) -> Self {
        let is_objdump = tool
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains("objdump"));
        let dialect = if is_objdump {
            Dialect::Objdump
        } else {
            Dialect::Readelf
        };
        Self {
            tool,
            dialect,
            timeout,
        }
    }

    #[must_use]
    pub fn tool(&self) -> &Path {
        &self.tool
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.tool);
        match self.dialect {
            Dialect::Readelf => command.arg("-lW"),
            Dialect::Objdump => command.arg("-p"),
        };
        command.arg(path);
        command
    }
}

impl ProgramHeaderReader for ToolReader {
    fn load_alignments(&self, path: &Path) -> Result<Vec<u64>, ReaderError> {
        let output = run_with_timeout(self.command(path), self.timeout).map_err(|e| {
            ToolError::Failed {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        // Both dialects print a header line before the table; without it the output is not ours.
        if !output.contains("Program Header") {
            return Err(ToolError::Unparsable {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(parse_load_alignments(&output))
    }
}

/// Extract the alignment of every `LOAD` row from readelf or objdump output.
#[must_use]
pub fn parse_load_alignments(output: &str) -> Vec<u64> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.split_whitespace().next() == Some("LOAD"))
        .filter_map(|line| {
            if let Some((_, exponent)) = line.split_once("align 2**") {
                let exponent: String =
                    exponent.chars().take_while(char::is_ascii_digit).collect();
                exponent
                    .parse::<u32>()
                    .ok()
                    .and_then(|exponent| 1u64.checked_shl(exponent))
            } else {
                line.split_whitespace().last().and_then(parse_number)
            }
        })
        .collect()
}

fn parse_number(token: &str) -> Option<u64> {
    match token.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const READELF_OUTPUT: &str = "
Elf file type is DYN (Shared object file)
Entry point 0x0
There are 3 program headers, starting at offset 64

Program Headers:
  Type           Offset   VirtAddr           PhysAddr           FileSiz  MemSiz   Flg Align
  PHDR           0x000040 0x0000000000000040 0x0000000000000040 0x0000a8 0x0000a8 R   0x8
  LOAD           0x000000 0x0000000000000000 0x0000000000000000 0x00b2c4 0x00b2c4 R   0x4000
  LOAD           0x00b2d0 0x000000000000f2d0 0x000000000000f2d0 0x01a0c0 0x01a0c0 R E 0x1000
  GNU_STACK      0x000000 0x0000000000000000 0x0000000000000000 0x000000 0x000000 RW  0x0
";

    const OBJDUMP_OUTPUT: &str = "
libfoo.so:     file format elf64-littleaarch64

Program Header:
    PHDR off    0x0000000000000040 vaddr 0x0000000000000040 paddr 0x0000000000000040 align 2**3
         filesz 0x00000000000001f8 memsz 0x00000000000001f8 flags r--
    LOAD off    0x0000000000000000 vaddr 0x0000000000000000 paddr 0x0000000000000000 align 2**14
         filesz 0x0000000000000a38 memsz 0x0000000000000a38 flags r--
    LOAD off    0x0000000000000a40 vaddr 0x0000000000004a40 paddr 0x0000000000004a40 align 2**14
         filesz 0x0000000000000170 memsz 0x0000000000000170 flags r-x
";

    #[test]
    fn test_parse_readelf_output() {
        assert_eq!(parse_load_alignments(READELF_OUTPUT), vec![0x4000, 0x1000]);
    }

    #[test]
    fn test_parse_objdump_output() {
        assert_eq!(parse_load_alignments(OBJDUMP_OUTPUT), vec![16384, 16384]);
    }

    #[test]
    fn test_parse_without_load_rows() {
        let output = "Program Headers:\n  PHDR 0x40 0x40 0x40 0xa8 0xa8 R 0x8\n";
        assert!(parse_load_alignments(output).is_empty());
        assert!(parse_load_alignments("").is_empty());
    }

    #[test]
    fn test_dialect_from_tool_name() {
        let readelf = ToolReader::new(
            PathBuf::from("/ndk/bin/llvm-readelf"),
            Duration::from_secs(1),
        );
        assert_eq!(readelf.dialect, Dialect::Readelf);
        let objdump = ToolReader::new(
            PathBuf::from("/ndk/bin/llvm-objdump.exe"),
            Duration::from_secs(1),
        );
        assert_eq!(objdump.dialect, Dialect::Objdump);
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let reader = ToolReader::new(
            PathBuf::from("/nonexistent/bin/llvm-readelf"),
            Duration::from_secs(1),
        );
        let result = reader.load_alignments(Path::new("/nonexistent/libfoo.so"));
        assert!(matches!(
            result,
            Err(ReaderError::Tool(ToolError::Failed { .. }))
        ));
    }
}
