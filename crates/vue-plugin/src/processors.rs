//! Ready-made processors.

use crate::options::OnEndProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// An end processor that copies each `(from, to)` pair once the build is
/// done, creating missing parent directories. The first failing copy stops
/// the processor.
pub fn copy_files(pairs: impl IntoIterator<Item = (PathBuf, PathBuf)>) -> OnEndProcessor {
    let pairs: Vec<_> = pairs.into_iter().collect();
    Arc::new(move |_result, _options| {
        for (from, to) in &pairs {
            if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    format!("failed to create {}: {e}", parent.display())
                })?;
            }
            std::fs::copy(from, to).map_err(|e| {
                format!("failed to copy {} to {}: {e}", from.display(), to.display())
            })?;
            debug!(from = %from.display(), to = %to.display(), "copied file");
        }
        Ok(())
    })
}
