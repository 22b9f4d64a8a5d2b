//! Turn-ordered maze navigation
//!
//! `turn` cycles move privilege through the roster, `movement` validates
//! and atomically applies moves, `lifecycle` drives group-wide phase
//! transitions.

pub mod lifecycle;
pub mod movement;
pub mod turn;
