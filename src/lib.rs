//! Maze Escape coordination core
//!
//! Group formation, turn rotation, and shared-maze navigation for a
//! 3-player cooperative maze game. There is no central arbiter: every
//! client is an independent actor, and all cross-client coordination goes
//! through a document store with atomic transactions and push-style change
//! notifications (`store`).

pub mod chat;
pub mod config;
pub mod game;
pub mod lobby;
pub mod maze;
pub mod session;
pub mod store;
