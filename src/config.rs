use crate::maze::Difficulty;

/// Game coordination configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Players per group
    pub group_size: usize,
    /// Rendering cell size stored with each maze (pixels)
    pub cell_size: u32,
    /// Maze grid dimension for Easy games
    pub easy_size: usize,
    /// Maze grid dimension for Medium games
    pub medium_size: usize,
    /// Maze grid dimension for Hard games
    pub hard_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            group_size: 3,
            cell_size: 30,
            easy_size: 10,
            medium_size: 15,
            hard_size: 20,
        }
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("GROUP_SIZE") {
            if let Ok(parsed) = size.parse::<usize>() {
                if parsed >= 2 {
                    config.group_size = parsed;
                } else {
                    tracing::warn!("GROUP_SIZE must be >= 2, using default");
                }
            } else {
                tracing::warn!("Invalid GROUP_SIZE '{}', using default", size);
            }
        }

        for (var, slot) in [
            ("MAZE_SIZE_EASY", &mut config.easy_size),
            ("MAZE_SIZE_MEDIUM", &mut config.medium_size),
            ("MAZE_SIZE_HARD", &mut config.hard_size),
        ] {
            if let Ok(size) = std::env::var(var) {
                if let Ok(parsed) = size.parse::<usize>() {
                    if parsed >= 2 {
                        *slot = parsed;
                    } else {
                        tracing::warn!("{} must be >= 2, using default", var);
                    }
                } else {
                    tracing::warn!("Invalid {} '{}', using default", var, size);
                }
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.group_size < 2 {
            return Err("group_size must be at least 2".to_string());
        }
        if self.cell_size == 0 {
            return Err("cell_size cannot be 0".to_string());
        }
        for size in [self.easy_size, self.medium_size, self.hard_size] {
            if size < 2 {
                return Err("maze sizes must be at least 2".to_string());
            }
        }
        Ok(())
    }

    /// Grid dimension for a difficulty
    pub fn maze_size(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy_size,
            Difficulty::Medium => self.medium_size,
            Difficulty::Hard => self.hard_size,
        }
    }
}
