use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Position ({x}, {y}) is outside the grid")]
    OutOfBounds { x: usize, y: usize },
    #[error("Grid size {width}x{height} is out of range")]
    InvalidDimensions { width: usize, height: usize },
    #[error("{mines} mines do not fit in {cells} cells")]
    TooManyMines { mines: usize, cells: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
