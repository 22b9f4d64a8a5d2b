//! Randomized depth-first-search maze carving.
//!
//! Pure over its inputs plus entropy: persistence and the create-once
//! guard are the caller's job (`game::lifecycle::ensure_maze`).

use rand::Rng;

use crate::config::GameConfig;
use crate::maze::grid::{Cell, MazeDoc, Walls};
use crate::maze::Difficulty;

/// Generate a perfect maze for the given difficulty.
pub fn generate(difficulty: Difficulty, config: &GameConfig) -> MazeDoc {
    generate_with_rng(difficulty, config, &mut rand::thread_rng())
}

/// Generation with caller-provided entropy, for deterministic tests.
pub fn generate_with_rng<R: Rng>(
    difficulty: Difficulty,
    config: &GameConfig,
    rng: &mut R,
) -> MazeDoc {
    let size = config.maze_size(difficulty);
    let mut grid: Vec<Cell> = (0..size * size)
        .map(|i| Cell {
            row: i / size,
            col: i % size,
            walls: Walls::CLOSED,
        })
        .collect();

    // Carve passages: descend into a random unvisited neighbor, knocking
    // out the shared wall; backtrack on dead ends. The stack empties once
    // every cell has been visited exactly once, leaving a spanning tree.
    let mut visited = vec![false; size * size];
    let mut stack: Vec<usize> = Vec::new();
    let mut current = 0;
    visited[current] = true;
    stack.push(current);

    while !stack.is_empty() {
        let neighbors = unvisited_neighbors(current, size, &visited);
        if neighbors.is_empty() {
            match stack.pop() {
                Some(cell) => current = cell,
                None => break,
            }
        } else {
            let next = neighbors[rng.gen_range(0..neighbors.len())];
            visited[next] = true;
            stack.push(current);
            remove_walls(&mut grid, current, next, size);
            current = next;
        }
    }

    MazeDoc {
        size,
        cell_size: config.cell_size,
        grid,
        generated: true,
    }
}

/// Orthogonal grid neighbors not yet carved into.
fn unvisited_neighbors(index: usize, size: usize, visited: &[bool]) -> Vec<usize> {
    let (row, col) = (index / size, index % size);
    let mut neighbors = Vec::with_capacity(4);

    if row > 0 && !visited[index - size] {
        neighbors.push(index - size);
    }
    if col + 1 < size && !visited[index + 1] {
        neighbors.push(index + 1);
    }
    if row + 1 < size && !visited[index + size] {
        neighbors.push(index + size);
    }
    if col > 0 && !visited[index - 1] {
        neighbors.push(index - 1);
    }

    neighbors
}

/// Knock out the shared wall between two adjacent cells.
fn remove_walls(grid: &mut [Cell], a: usize, b: usize, size: usize) {
    let (row_a, col_a) = (a / size, a % size);
    let (row_b, col_b) = (b / size, b % size);

    if row_a == row_b {
        if col_a + 1 == col_b {
            grid[a].walls.right = false;
            grid[b].walls.left = false;
        } else if col_b + 1 == col_a {
            grid[a].walls.left = false;
            grid[b].walls.right = false;
        }
    } else if col_a == col_b {
        if row_a + 1 == row_b {
            grid[a].walls.bottom = false;
            grid[b].walls.top = false;
        } else if row_b + 1 == row_a {
            grid[a].walls.top = false;
            grid[b].walls.bottom = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::grid::CellPos;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config_with_size(size: usize) -> GameConfig {
        let mut config = GameConfig::default();
        config.easy_size = size;
        config
    }

    /// Count passages by scanning right/bottom openings once each.
    fn open_edge_count(maze: &MazeDoc) -> usize {
        maze.grid
            .iter()
            .map(|cell| {
                let mut edges = 0;
                if !cell.walls.right && cell.col + 1 < maze.size {
                    edges += 1;
                }
                if !cell.walls.bottom && cell.row + 1 < maze.size {
                    edges += 1;
                }
                edges
            })
            .sum()
    }

    #[test]
    fn test_cell_count_per_difficulty() {
        let config = GameConfig::default();
        for (difficulty, size) in [
            (Difficulty::Easy, 10),
            (Difficulty::Medium, 15),
            (Difficulty::Hard, 20),
        ] {
            let maze = generate(difficulty, &config);
            assert_eq!(maze.size, size);
            assert_eq!(maze.grid.len(), size * size);
            assert!(maze.generated);
        }
    }

    #[test]
    fn test_spanning_tree_edge_count() {
        // A perfect maze over N^2 cells has exactly N^2 - 1 open passages
        for size in [2, 3, 5, 10, 15, 20] {
            let maze = generate(Difficulty::Easy, &config_with_size(size));
            assert_eq!(open_edge_count(&maze), size * size - 1, "size {}", size);
        }
    }

    #[test]
    fn test_every_cell_reachable() {
        for size in [2, 5, 10] {
            let maze = generate(Difficulty::Easy, &config_with_size(size));
            for row in 0..size {
                for col in 0..size {
                    assert!(
                        maze.solve(CellPos::ORIGIN, CellPos::new(row, col)).is_some(),
                        "cell ({}, {}) unreachable in size {}",
                        row,
                        col,
                        size
                    );
                }
            }
        }
    }

    #[test]
    fn test_wall_symmetry() {
        // Every opening must be mirrored on the adjacent cell
        let maze = generate(Difficulty::Medium, &GameConfig::default());
        for cell in &maze.grid {
            if cell.col + 1 < maze.size && !cell.walls.right {
                let right = maze.cell(CellPos::new(cell.row, cell.col + 1)).unwrap();
                assert!(!right.walls.left);
            }
            if cell.row + 1 < maze.size && !cell.walls.bottom {
                let below = maze.cell(CellPos::new(cell.row + 1, cell.col)).unwrap();
                assert!(!below.walls.top);
            }
        }
    }

    #[test]
    fn test_border_walls_intact() {
        let maze = generate(Difficulty::Easy, &GameConfig::default());
        for cell in &maze.grid {
            if cell.row == 0 {
                assert!(cell.walls.top);
            }
            if cell.row == maze.size - 1 {
                assert!(cell.walls.bottom);
            }
            if cell.col == 0 {
                assert!(cell.walls.left);
            }
            if cell.col == maze.size - 1 {
                assert!(cell.walls.right);
            }
        }
    }

    #[test]
    fn test_deterministic_with_seeded_rng() {
        let config = GameConfig::default();
        let a = generate_with_rng(Difficulty::Easy, &config, &mut StdRng::seed_from_u64(7));
        let b = generate_with_rng(Difficulty::Easy, &config, &mut StdRng::seed_from_u64(7));
        for (cell_a, cell_b) in a.grid.iter().zip(&b.grid) {
            assert_eq!(cell_a.walls, cell_b.walls);
        }
    }
}
