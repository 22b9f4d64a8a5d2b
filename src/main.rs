use tracing::{debug, info, Level};

use maze_escape::config::GameConfig;
use maze_escape::game::lifecycle::{ensure_maze, select_difficulty};
use maze_escape::game::movement::submit_move;
use maze_escape::lobby::group::{watch_group, GamePhase, GroupDoc, GroupId, GroupSnapshot};
use maze_escape::lobby::join_game;
use maze_escape::lobby::player::PlayerId;
use maze_escape::maze::{Difficulty, MazeDoc};
use maze_escape::store::MemoryStore;

/// Demo driver: three simulated clients join the pool, form a group, and
/// cooperatively walk the maze to the exit, each reacting only to watched
/// snapshots, the same loop a real client runs against the hosted store.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Maze Escape coordinator v{}", env!("CARGO_PKG_VERSION"));

    let config = GameConfig::load_or_default();
    if let Err(e) = config.validate() {
        anyhow::bail!("invalid configuration: {}", e);
    }
    info!(
        "Configuration loaded: group_size={}, maze sizes {}/{}/{}",
        config.group_size, config.easy_size, config.medium_size, config.hard_size
    );

    let difficulty = match std::env::var("DIFFICULTY").ok().as_deref() {
        Some("medium") => Difficulty::Medium,
        Some("hard") => Difficulty::Hard,
        _ => Difficulty::Easy,
    };

    let store = MemoryStore::new();

    // Three clients join; the third join completes the batch
    let mut tickets = Vec::new();
    for name in ["Ada", "Grace", "Alan"] {
        tickets.push(join_game(&store, &config, name).await?);
    }
    let group_id = tickets
        .last()
        .and_then(|ticket| ticket.group)
        .ok_or_else(|| anyhow::anyhow!("three joins did not form a group"))?;
    info!("group {} formed", group_id);

    let mut members = Vec::new();
    for (index, ticket) in tickets.into_iter().enumerate() {
        let store = store.clone();
        let config = config.clone();
        members.push(tokio::spawn(async move {
            run_member(store, config, group_id, ticket.player_id, index, difficulty).await
        }));
    }
    for member in members {
        member.await??;
    }

    let group: GroupDoc = store
        .get_as(&GroupDoc::path(group_id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("group disappeared before the summary"))?;
    info!("cheese reached in {} steps", group.steps_taken);

    Ok(())
}

/// One simulated client: re-derive everything from each observed group
/// snapshot, act only when the snapshot says it is this player's turn.
async fn run_member(
    store: MemoryStore,
    config: GameConfig,
    group_id: GroupId,
    player_id: PlayerId,
    index: usize,
    difficulty: Difficulty,
) -> anyhow::Result<()> {
    let mut watch = watch_group(&store, group_id);
    let mut maze: Option<MazeDoc> = None;

    while let Some(snapshot) = watch.next().await {
        let group = match snapshot {
            GroupSnapshot::Current(group) => group,
            GroupSnapshot::Removed => {
                info!("player {} sees the group dissolved", player_id);
                break;
            }
        };

        match group.phase(config.group_size) {
            GamePhase::Forming => {}
            GamePhase::DifficultyPending => {
                // Any member may start; the first roster member does here
                if index == 0 {
                    select_difficulty(&store, group_id, difficulty).await?;
                }
            }
            GamePhase::InProgress => {
                if maze.is_none() {
                    maze = Some(ensure_maze(&store, &config, group_id).await?);
                }
                let Some(current) = maze.as_ref() else {
                    continue;
                };
                if group.current_turn == Some(player_id) {
                    let Some(path) = current.solve(group.position, current.exit()) else {
                        continue;
                    };
                    if let Some(&direction) = path.first() {
                        if let Err(e) = submit_move(&store, group_id, player_id, direction).await {
                            // Stale snapshot; the next one sorts it out
                            debug!("move rejected: {}", e);
                        }
                    }
                }
            }
            GamePhase::Ended => {
                info!(
                    "player {} sees game over after {} steps",
                    player_id, group.steps_taken
                );
                break;
            }
        }
    }

    Ok(())
}
