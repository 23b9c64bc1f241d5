use oceangrid::{Cancel, Grid, GridError, LoadMode, FILE_NAME};
use std::path::Path;

/// Turns a data set folder into a [`Grid`].
pub trait GridLoader: Send + Sync {
    /// Returns true if `folder` holds loadable grid data.
    fn is_present(&self, folder: &Path) -> bool;

    fn load(&self, folder: &Path, cancel: &Cancel) -> Result<Grid, GridError>;
}

/// Loads `grid.ssg` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader {
    mode: LoadMode,
}

impl FileLoader {
    pub fn new(mode: LoadMode) -> Self {
        Self { mode }
    }
}

impl GridLoader for FileLoader {
    fn is_present(&self, folder: &Path) -> bool {
        folder.join(FILE_NAME).is_file()
    }

    fn load(&self, folder: &Path, cancel: &Cancel) -> Result<Grid, GridError> {
        let path = folder.join(FILE_NAME);
        match self.mode {
            LoadMode::InMem => Grid::load(path, cancel),
            LoadMode::MemMap => Grid::memmap(path, cancel),
        }
    }
}
