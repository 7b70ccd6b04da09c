use minefield_common::models::Difficulty;
use tracing::warn;

use crate::{EngineError, Result};

/// Largest width or height a grid may have.
pub const MAX_DIMENSION: usize = 256;

pub const BEGINNER: Difficulty = Difficulty {
    width: 9,
    height: 9,
    mines: 10,
    base_points: 10,
};

pub const INTERMEDIATE: Difficulty = Difficulty {
    width: 16,
    height: 16,
    mines: 40,
    base_points: 20,
};

pub const EXPERT: Difficulty = Difficulty {
    width: 30,
    height: 16,
    mines: 99,
    base_points: 50,
};

pub const PRESETS: [Difficulty; 3] = [BEGINNER, INTERMEDIATE, EXPERT];

/// Looks up a difficulty preset by index.
pub fn preset(index: usize) -> Option<Difficulty> {
    PRESETS.get(index).copied()
}

/// Rejects a difficulty whose grid would be empty, larger than
/// `MAX_DIMENSION` on a side, or holds more mines than cells.
pub fn check_difficulty(difficulty: Difficulty) -> Result<Difficulty> {
    let Difficulty {
        width,
        height,
        mines,
        ..
    } = difficulty;

    if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
        return Err(EngineError::InvalidDimensions { width, height });
    }
    if mines > difficulty.total_cells() {
        return Err(EngineError::TooManyMines {
            mines,
            cells: difficulty.total_cells(),
        });
    }
    Ok(difficulty)
}

/// Clamps each dimension to `1..=MAX_DIMENSION` and the mine count to the
/// number of cells.
pub fn normalize(difficulty: Difficulty) -> Difficulty {
    let width = difficulty.width.clamp(1, MAX_DIMENSION);
    let height = difficulty.height.clamp(1, MAX_DIMENSION);
    let mines = difficulty.mines.min(width * height);

    if (width, height) != (difficulty.width, difficulty.height) {
        warn!(
            "Clamping grid from {}x{} to {}x{}",
            difficulty.width, difficulty.height, width, height
        );
    }

    if mines != difficulty.mines {
        warn!(
            "Clamping mine count from {} to {} for {}x{} grid",
            difficulty.mines, mines, width, height
        );
    }

    Difficulty {
        width,
        height,
        mines,
        base_points: difficulty.base_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_indexed_in_order() {
        assert_eq!(preset(0), Some(BEGINNER));
        assert_eq!(preset(2), Some(EXPERT));
        assert_eq!(preset(3), None);
    }

    #[test]
    fn presets_fit_their_grids() {
        for difficulty in PRESETS {
            assert_eq!(normalize(difficulty), difficulty);
            assert!(difficulty.mines < difficulty.total_cells());
        }
    }

    #[test]
    fn normalize_clamps_overfull_boards() {
        let difficulty = normalize(Difficulty {
            width: 0,
            height: 3,
            mines: 10,
            base_points: 5,
        });

        assert_eq!(difficulty.width, 1);
        assert_eq!(difficulty.mines, 3);
        assert_eq!(difficulty.base_points, 5);
    }

    #[test]
    fn normalize_caps_huge_dimensions() {
        let difficulty = normalize(Difficulty {
            width: usize::MAX,
            height: 2,
            mines: 10,
            base_points: 0,
        });

        assert_eq!(difficulty.width, MAX_DIMENSION);
        assert_eq!(difficulty.height, 2);
        assert_eq!(difficulty.mines, 10);
    }

    #[test]
    fn check_difficulty_accepts_presets() {
        for difficulty in PRESETS {
            assert_eq!(check_difficulty(difficulty), Ok(difficulty));
        }
    }

    #[test]
    fn check_difficulty_rejects_out_of_range_boards() {
        let huge = Difficulty {
            width: usize::MAX,
            height: 2,
            mines: 10,
            base_points: 0,
        };
        assert_eq!(
            check_difficulty(huge),
            Err(EngineError::InvalidDimensions {
                width: usize::MAX,
                height: 2
            })
        );

        let empty = Difficulty {
            width: 0,
            ..BEGINNER
        };
        assert!(check_difficulty(empty).is_err());

        let overfull = Difficulty {
            mines: 82,
            ..BEGINNER
        };
        assert_eq!(
            check_difficulty(overfull),
            Err(EngineError::TooManyMines {
                mines: 82,
                cells: 81
            })
        );
    }
}
