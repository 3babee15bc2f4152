// Service layer
pub mod ai_chat_service;
pub mod atlas_service;
pub mod bracket_calculations;
pub mod bracket_service;
pub mod email_service;
pub mod notification_service;
pub mod player_service;
pub mod quick_match_service;
pub mod schema_export;
pub mod team_balancer;
pub mod tournament_service;
pub mod veto_engine;
pub mod veto_service;

#[cfg(test)]
mod quick_match_service_test;
#[cfg(test)]
mod team_balancer_test;

pub use ai_chat_service::AiChatService;
pub use atlas_service::AtlasService;
pub use bracket_service::BracketService;
pub use email_service::EmailService;
pub use notification_service::NotificationService;
pub use player_service::PlayerService;
pub use quick_match_service::QuickMatchService;
pub use tournament_service::TournamentService;
pub use veto_service::VetoService;
