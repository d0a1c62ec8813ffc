//! Row types for the app tables this service reads.

pub mod favorite;
pub mod feedback;
pub mod play_history;
pub mod unified_session;
pub mod user;
