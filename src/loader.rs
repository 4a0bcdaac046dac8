//! Layer discovery on disk
//!
//! The export tooling writes one `kernel<N>.csv` per layer. Layers are
//! ordered by the numeric `N`, so `kernel10.csv` follows `kernel2.csv`.

use std::path::{Path, PathBuf};

use crate::error::{CompileError, CompileResult};
use crate::matrix::{Layer, Matrix};

const KERNEL_PREFIX: &str = "kernel";
const KERNEL_SUFFIX: &str = ".csv";

/// Extract `N` from a `kernel<N>.csv` file name.
pub fn layer_index(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(KERNEL_PREFIX)?
        .strip_suffix(KERNEL_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Kernel files in `dir`, sorted by layer index.
pub fn discover(dir: &Path) -> CompileResult<Vec<(usize, PathBuf)>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(layer_index) {
            found.push((index, entry.path()));
        }
    }
    found.sort_by_key(|(index, _)| *index);
    Ok(found)
}

/// Read a CSV matrix from `path`.
pub fn load_matrix(path: &Path) -> CompileResult<Matrix> {
    let text = std::fs::read_to_string(path)?;
    Matrix::from_csv(&text)
}

/// Load every kernel in `dir` as an ordered layer stack.
pub fn load_layers(dir: &Path) -> CompileResult<Vec<Layer>> {
    let files = discover(dir)?;
    if files.is_empty() {
        return Err(CompileError::invalid_shape(format!(
            "no {}<N>{} files in '{}'",
            KERNEL_PREFIX,
            KERNEL_SUFFIX,
            dir.display()
        )));
    }

    files
        .into_iter()
        .map(|(index, path)| {
            tracing::debug!("loading layer {} from {}", index, path.display());
            Ok(Layer::new(index, load_matrix(&path)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_index() {
        assert_eq!(layer_index("kernel0.csv"), Some(0));
        assert_eq!(layer_index("kernel12.csv"), Some(12));
        assert_eq!(layer_index("kernel.csv"), None);
        assert_eq!(layer_index("kernel-1.csv"), None);
        assert_eq!(layer_index("kernel3.csv.bak"), None);
        assert_eq!(layer_index("bias0.csv"), None);
    }
}
