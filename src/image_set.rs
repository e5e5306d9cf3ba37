use std::collections::HashSet;
use std::fs;
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::constants::IMAGE_EXTENSIONS;

#[derive(Debug, Error)]
pub enum ImageSetError {
    #[error("no image files found in directory: {}", .0.display())]
    NoImages(PathBuf),
    #[error("image set is empty")]
    Empty,
    #[error("failed to read directory {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered, non-empty list of images the slideshow cycles through.
///
/// Clones share the same backing slice.
#[derive(Debug, Clone)]
pub struct ImageSet {
    paths: Arc<[PathBuf]>,
}

impl ImageSet {
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, ImageSetError> {
        if paths.is_empty() {
            return Err(ImageSetError::Empty);
        }
        Ok(Self { paths: paths.into() })
    }

    /// Collects every image under `root`, sorted by full path.
    pub fn load(root: &Path, recursive: bool) -> Result<Self, ImageSetError> {
        let mut paths = Vec::new();
        let mut visited = HashSet::new();

        // The root itself must be readable; nested failures are only logged.
        let root_key = fs::canonicalize(root).map_err(|source| ImageSetError::Read {
            path: root.to_path_buf(),
            source,
        })?;
        visited.insert(root_key);
        collect_dir(root, recursive, &mut visited, &mut paths)?;

        paths.sort();
        debug!("Found {} images under {}", paths.len(), root.display());

        if paths.is_empty() {
            Err(ImageSetError::NoImages(root.to_path_buf()))
        } else {
            Ok(Self { paths: paths.into() })
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Index that follows `index` in the cycle, wrapping after the last image.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.paths.len()
    }
}

/// Panics when `index` is out of range; engine indexes always come from `next_index`.
impl Index<usize> for ImageSet {
    type Output = Path;

    fn index(&self, index: usize) -> &Path {
        &self.paths[index]
    }
}

fn collect_dir(
    dir: &Path,
    recursive: bool,
    visited: &mut HashSet<PathBuf>,
    paths: &mut Vec<PathBuf>,
) -> Result<(), ImageSetError> {
    let read_error = |source| ImageSetError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let entries = fs::read_dir(dir).map_err(read_error)?;

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() {
            if is_image(&path) {
                paths.push(path);
            }
        } else if recursive && path.is_dir() {
            subdirs.push(path);
        }
    }

    for subdir in subdirs {
        // Canonical paths catch symlinked directories that point back up the tree.
        let key = match fs::canonicalize(&subdir) {
            Ok(key) => key,
            Err(e) => {
                warn!("Skipping directory {}: {}", subdir.display(), e);
                continue;
            }
        };
        if !visited.insert(key) {
            debug!("Already walked {}, skipping", subdir.display());
            continue;
        }
        if let Err(e) = collect_dir(&subdir, recursive, visited, paths) {
            warn!("Skipping directory {}: {}", subdir.display(), e);
        }
    }
    Ok(())
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
