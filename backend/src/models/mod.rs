// Core models
pub mod rank;
pub mod player;
pub mod tournament;
pub mod match_model;
pub mod veto;
pub mod notification;

// Re-export commonly used types
pub use player::*;
pub use tournament::*;
pub use match_model::*;
pub use veto::*;
pub use notification::*;
