use std::path::Path;

use anyhow::Result;

use crate::errors::MiramarkError;
use crate::types::{Benchmark, RESERVED_PREFIX};

/// Discover benchmarks directly inside `suite_dir`.
///
/// Returns regular files sorted by name. Names starting with [`RESERVED_PREFIX`] are
/// helpers and are left out, as are subdirectories and non-UTF-8 names.
pub fn discover_benchmarks(suite_dir: &Path) -> Result<Vec<Benchmark>> {
    if !suite_dir.is_dir() {
        return Err(MiramarkError::SuiteDirNotFound {
            path: suite_dir.to_path_buf(),
        }
        .into());
    }

    let entries = std::fs::read_dir(suite_dir).map_err(|source| MiramarkError::SuiteReadError {
        path: suite_dir.to_path_buf(),
        source,
    })?;

    let mut benchmarks = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => continue,
        };

        if name.starts_with(RESERVED_PREFIX) {
            tracing::debug!(%name, "skipping reserved entry");
            continue;
        }

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        benchmarks.push(Benchmark { name, path });
    }

    benchmarks.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(benchmarks)
}
