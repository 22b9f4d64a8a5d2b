use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::lobby::group::GroupId;
use crate::store::DocPath;

/// Which sides of a cell are walled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Walls {
    /// All four walls up; the state every cell starts in before carving.
    pub const CLOSED: Walls = Walls {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };

    /// Whether the wall on the given side blocks movement.
    pub fn blocks(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.top,
            Direction::Down => self.bottom,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// One grid cell with its wall set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub walls: Walls,
}

/// Position within the maze grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    /// The shared starting position.
    pub const ORIGIN: CellPos = CellPos { row: 0, col: 0 };

    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A movement direction through the maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Shared maze document, generated once per group and read-only afterwards.
///
/// The grid is a perfect maze: its open-passage graph is a spanning tree,
/// so exactly one path connects any two cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeDoc {
    pub size: usize,
    /// Rendering constant carried for clients; irrelevant to navigation.
    pub cell_size: u32,
    pub grid: Vec<Cell>,
    pub generated: bool,
}

impl MazeDoc {
    pub const COLLECTION: &'static str = "mazes";

    /// Mazes are keyed by the group they belong to.
    pub fn path(group_id: GroupId) -> DocPath {
        DocPath::new(Self::COLLECTION, group_id.to_string())
    }

    /// Cell at a position, if it lies inside the grid.
    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        if pos.row >= self.size || pos.col >= self.size {
            return None;
        }
        self.grid.get(pos.row * self.size + pos.col)
    }

    /// The fixed exit cell.
    pub fn exit(&self) -> CellPos {
        CellPos::new(self.size - 1, self.size - 1)
    }

    /// Grid neighbor in a direction, ignoring walls.
    pub fn neighbor(&self, pos: CellPos, direction: Direction) -> Option<CellPos> {
        let (row, col) = (pos.row, pos.col);
        let next = match direction {
            Direction::Up if row > 0 => CellPos::new(row - 1, col),
            Direction::Down if row + 1 < self.size => CellPos::new(row + 1, col),
            Direction::Left if col > 0 => CellPos::new(row, col - 1),
            Direction::Right if col + 1 < self.size => CellPos::new(row, col + 1),
            _ => return None,
        };
        Some(next)
    }

    /// Destination of a legal move from a position, or None if a wall (or
    /// the grid edge) blocks it.
    pub fn step(&self, pos: CellPos, direction: Direction) -> Option<CellPos> {
        let cell = self.cell(pos)?;
        if cell.walls.blocks(direction) {
            return None;
        }
        self.neighbor(pos, direction)
    }

    /// Directions open for movement from a position.
    pub fn open_directions(&self, pos: CellPos) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&direction| self.step(pos, direction).is_some())
            .collect()
    }

    /// Walk the open-passage graph for the unique path between two cells.
    /// Returns the move sequence, empty when `from == to`.
    pub fn solve(&self, from: CellPos, to: CellPos) -> Option<Vec<Direction>> {
        if self.cell(from).is_none() || self.cell(to).is_none() {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut came_from: HashMap<CellPos, (CellPos, Direction)> = HashMap::new();
        let mut stack = vec![from];
        while let Some(pos) = stack.pop() {
            for direction in Direction::ALL {
                if let Some(next) = self.step(pos, direction) {
                    if next == from || came_from.contains_key(&next) {
                        continue;
                    }
                    came_from.insert(next, (pos, direction));
                    if next == to {
                        let mut path = Vec::new();
                        let mut cursor = to;
                        while cursor != from {
                            let (prev, direction) = came_from[&cursor];
                            path.push(direction);
                            cursor = prev;
                        }
                        path.reverse();
                        return Some(path);
                    }
                    stack.push(next);
                }
            }
        }
        None
    }
}
