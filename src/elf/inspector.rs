// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use goblin::elf::header::EM_AARCH64;
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

use super::{ElfError, ElfHeader, ProgramHeaderReader, ReaderError, ToolError};
use crate::library::{AlignmentVerdict, Architecture, NativeLibrary, SourceKind};
use crate::report::{error_chain, Issue, Severity};

/// Minimum `p_align` of the largest `LOAD` segment for 16KB page devices.
pub const REQUIRED_ALIGNMENT: u64 = 16 * 1024;

const REBUILD_ACTION: &str = "Rebuild with NDK r28 or newer, or link with -Wl,-z,max-page-size=16384";
const MANUAL_ACTION: &str =
    "Replace this prebuilt library with a 16KB aligned build from its vendor, or rebuild it with -Wl,-z,max-page-size=16384";

/// Verdict and findings for one library.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub verdict: AlignmentVerdict,
    pub issues: Vec<Issue>,
}

impl Inspection {
    fn unknown(issue: Option<Issue>) -> Self {
        Self {
            verdict: AlignmentVerdict::Unknown,
            issues: issue.into_iter().collect(),
        }
    }
}

/// Decides whether arm64 libraries satisfy 16KB segment alignment.
pub struct SegmentAlignmentInspector<'a> {
    reader: &'a dyn ProgramHeaderReader,
}

impl<'a> SegmentAlignmentInspector<'a> {
    #[must_use]
    pub fn new(reader: &'a dyn ProgramHeaderReader) -> Self {
        Self { reader }
    }

    /// Inspect the file at `file` on behalf of `library`.
    ///
    /// `file` differs from `library.path` for libraries extracted from an archive.
    /// Issues carry `library.path` as origin. Never fails: every problem becomes
    /// an issue and leaves the verdict `unknown`.
    #[must_use]
    pub fn verify(&self, library: &NativeLibrary, file: &Path) -> Inspection {
        if library.architecture != Architecture::Arm64V8a {
            return Inspection::unknown(None);
        }
        let origin = library.path.display().to_string();

        match ElfHeader::sniff(file) {
            Ok(header) if header.machine != EM_AARCH64 => {
                return Inspection::unknown(Some(Issue::new(
                    Severity::Warn,
                    "elf-machine-mismatch",
                    format!(
                        "Library in arm64-v8a directory is built for {}",
                        header.machine_name()
                    ),
                    origin,
                )));
            }
            Ok(_) => {}
            Err(e) => return Inspection::unknown(Some(elf_error_issue(&e, origin))),
        }

        let alignments = match self.reader.load_alignments(file) {
            Ok(alignments) => alignments,
            Err(ReaderError::Elf(e)) => {
                return Inspection::unknown(Some(elf_error_issue(&e, origin)))
            }
            Err(ReaderError::Tool(e)) => {
                let rule = match e {
                    ToolError::Failed { .. } => "alignment-tool-failure",
                    ToolError::Unparsable { .. } => "alignment-tool-unparsable",
                };
                return Inspection::unknown(Some(Issue::new(
                    Severity::Warn,
                    rule,
                    error_chain(&e),
                    origin,
                )));
            }
        };

        let Some(max_alignment) = alignments.iter().copied().max() else {
            return Inspection::unknown(Some(Issue::new(
                Severity::Warn,
                "elf-no-load-segments",
                "No LOAD segments found, alignment cannot be determined",
                origin,
            )));
        };

        debug!(library = %origin, max_alignment, "Segment alignment inspected");
        if max_alignment >= REQUIRED_ALIGNMENT {
            return Inspection {
                verdict: AlignmentVerdict::Compliant,
                issues: Vec::new(),
            };
        }

        let action = if library.source_kind == SourceKind::Manual {
            MANUAL_ACTION
        } else {
            REBUILD_ACTION
        };
        let issue = Issue::new(
            Severity::High,
            "elf-alignment",
            format!(
                "LOAD segments aligned to {max_alignment} bytes, 16KB pages need {REQUIRED_ALIGNMENT}"
            ),
            origin,
        )
        .with_context("abi", library.architecture.dir_name())
        .with_context("max_alignment", max_alignment)
        .with_context("required_alignment", REQUIRED_ALIGNMENT)
        .with_action(action);
        Inspection {
            verdict: AlignmentVerdict::NonCompliant,
            issues: vec![issue],
        }
    }

    /// Verify libraries that live on disk, recording each verdict in place.
    ///
    /// Runs on the current rayon pool, which bounds concurrent tool invocations.
    pub fn verify_all(&self, libraries: &mut [NativeLibrary]) -> Vec<Issue> {
        libraries
            .par_iter_mut()
            .flat_map_iter(|library| {
                let inspection = self.verify(library, &library.path);
                library.alignment = inspection.verdict;
                inspection.issues
            })
            .collect()
    }
}

fn elf_error_issue(error: &ElfError, origin: String) -> Issue {
    let rule = if error.is_io() {
        "file-unreadable"
    } else {
        "elf-parse-failure"
    };
    Issue::new(Severity::Warn, rule, error_chain(error), origin)
}
