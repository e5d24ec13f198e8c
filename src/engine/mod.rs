pub mod bot;
pub mod checkpoint;
pub mod collector;
pub mod executor;
pub mod favorite;
pub mod identifier;
pub mod pacing;
pub mod parser;
pub mod probe;
pub mod prune;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod state;
