use crate::api_error::ApiError;
use crate::discord::embeds;
use crate::discord::interaction::{CommandData, Interaction, InteractionResponse};
use crate::models::player::BalancerPlayer;
use crate::models::rank::canonical_rank;
use crate::service::bracket_calculations::calculate_bracket_structure;
use crate::service::player_service::{evidence_weight, PlayerService};
use crate::service::quick_match_service::QuickMatchService;
use crate::service::team_balancer::balance_quick_match_teams;
use crate::service::tournament_service::TournamentService;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_TEST_BRACKET_TEAMS: i64 = 256;
const DEFAULT_TEST_BRACKET_TEAMS: i64 = 8;
const TOURNAMENT_LIST_LIMIT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Profile of the given Discord user, or of the caller.
    Profile { discord_id: String },
    QuickMatch,
    LeaveQueue,
    Tournaments,
    UpdateRank { rank: &'static str },
    TestBalance,
    TestBracket { teams: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command /{0}")]
    Unknown(String),

    #[error("Missing option `{0}`")]
    MissingOption(&'static str),

    #[error("{0}")]
    InvalidOption(String),

    #[error("This command is limited to tournament admins")]
    NotAdmin,
}

pub fn parse_command(
    data: &CommandData,
    caller_id: &str,
    admin_ids: &[String],
) -> Result<BotCommand, CommandError> {
    let is_admin = admin_ids.iter().any(|id| id == caller_id);

    match data.name.as_str() {
        "profile" => Ok(BotCommand::Profile {
            discord_id: data
                .string_option("user")
                .unwrap_or(caller_id)
                .to_string(),
        }),
        "quickmatch" => Ok(BotCommand::QuickMatch),
        "leavequeue" => Ok(BotCommand::LeaveQueue),
        "tournaments" => Ok(BotCommand::Tournaments),
        "updaterank" => {
            let raw = data.string_option("rank").ok_or(CommandError::MissingOption("rank"))?;
            let rank = canonical_rank(raw)
                .ok_or_else(|| CommandError::InvalidOption(format!("Unknown rank `{}`", raw.trim())))?;
            Ok(BotCommand::UpdateRank { rank })
        }
        "testbalance" if is_admin => Ok(BotCommand::TestBalance),
        "testbracket" if is_admin => {
            let teams = data.integer_option("teams").unwrap_or(DEFAULT_TEST_BRACKET_TEAMS);
            if !(2..=MAX_TEST_BRACKET_TEAMS).contains(&teams) {
                return Err(CommandError::InvalidOption(format!(
                    "teams must be between 2 and {}",
                    MAX_TEST_BRACKET_TEAMS
                )));
            }
            Ok(BotCommand::TestBracket { teams: teams as usize })
        }
        "testbalance" | "testbracket" => Err(CommandError::NotAdmin),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Ten players weighted 500 down to 50.
pub fn test_balance_players() -> Vec<BalancerPlayer> {
    (0..10u32)
        .map(|i| BalancerPlayer {
            id: Uuid::new_v4(),
            display_name: format!("Test Player {}", i + 1),
            rank: None,
            evidence_weight: 500 - i * 50,
        })
        .collect()
}

/// Executes slash commands against the platform services.
#[derive(Clone)]
pub struct DiscordBot {
    players: PlayerService,
    tournaments: TournamentService,
    quick_match: Option<QuickMatchService>,
    admin_ids: Vec<String>,
    confidence_threshold: f64,
}

impl DiscordBot {
    pub fn new(
        players: PlayerService,
        tournaments: TournamentService,
        quick_match: Option<QuickMatchService>,
        admin_ids: Vec<String>,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            players,
            tournaments,
            quick_match,
            admin_ids,
            confidence_threshold,
        }
    }

    /// Every failure becomes an ephemeral reply.
    pub async fn handle(&self, interaction: &Interaction) -> InteractionResponse {
        let Some(data) = interaction.data.as_ref() else {
            return InteractionResponse::ephemeral("Missing command data.");
        };
        let Some(caller) = interaction.caller() else {
            return InteractionResponse::ephemeral("Could not identify the caller.");
        };

        let command = match parse_command(data, &caller.id, &self.admin_ids) {
            Ok(command) => command,
            Err(e) => return InteractionResponse::ephemeral(e.to_string()),
        };

        info!(command = %data.name, discord_id = %caller.id, "Discord command");

        match self.execute(command, &caller.id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(command = %data.name, error = %e, "Discord command failed");
                InteractionResponse::ephemeral(user_message(&e))
            }
        }
    }

    async fn linked_user(&self, discord_id: &str) -> Result<Option<Uuid>, ApiError> {
        Ok(self
            .players
            .get_profile_by_discord_id(discord_id)
            .await?
            .map(|p| p.id))
    }

    async fn execute(&self, command: BotCommand, caller_id: &str) -> Result<InteractionResponse, ApiError> {
        match command {
            BotCommand::Profile { discord_id } => {
                let Some(profile) = self.players.get_profile_by_discord_id(&discord_id).await? else {
                    return Ok(InteractionResponse::ephemeral(
                        "No linked player profile for that Discord account.",
                    ));
                };
                let weight = evidence_weight((&profile).into());
                Ok(InteractionResponse::embed(embeds::profile(&profile, &weight)))
            }
            BotCommand::QuickMatch => {
                let Some(queue) = &self.quick_match else {
                    return Ok(InteractionResponse::ephemeral("Quick match is unavailable right now."));
                };
                let Some(user_id) = self.linked_user(caller_id).await? else {
                    return Ok(InteractionResponse::ephemeral(not_linked()));
                };
                let outcome = queue.join_and_match(user_id).await?;
                Ok(match outcome.formed {
                    Some(balance) => InteractionResponse::embed(embeds::balance("Quick match ready", &balance)),
                    None => InteractionResponse::embed(embeds::queue(&outcome.status)),
                })
            }
            BotCommand::LeaveQueue => {
                let Some(queue) = &self.quick_match else {
                    return Ok(InteractionResponse::ephemeral("Quick match is unavailable right now."));
                };
                let Some(user_id) = self.linked_user(caller_id).await? else {
                    return Ok(InteractionResponse::ephemeral(not_linked()));
                };
                let message = if queue.leave(user_id).await? {
                    "You left the quick match queue."
                } else {
                    "You were not in the queue."
                };
                Ok(InteractionResponse::ephemeral(message))
            }
            BotCommand::Tournaments => {
                let list = self.tournaments.list_open(TOURNAMENT_LIST_LIMIT).await?;
                Ok(InteractionResponse::embed(embeds::tournaments(&list)))
            }
            BotCommand::UpdateRank { rank } => {
                let Some(user_id) = self.linked_user(caller_id).await? else {
                    return Ok(InteractionResponse::ephemeral(not_linked()));
                };
                let profile = self.players.update_rank(user_id, rank).await?;
                let weight = evidence_weight((&profile).into());
                Ok(InteractionResponse::embed(embeds::profile(&profile, &weight)))
            }
            BotCommand::TestBalance => {
                let balance = balance_quick_match_teams(&test_balance_players(), self.confidence_threshold)?;
                Ok(InteractionResponse::embed(embeds::balance("Test balance", &balance)))
            }
            BotCommand::TestBracket { teams } => {
                let structure = calculate_bracket_structure(teams)?;
                Ok(InteractionResponse::embed(embeds::bracket_structure(&structure)))
            }
        }
    }
}

fn not_linked() -> &'static str {
    "Link your Discord account on the website first."
}

/// Client errors are shown as-is; server failures are not described.
fn user_message(e: &ApiError) -> String {
    match e {
        ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Conflict(m) | ApiError::ValidationError(m) => {
            m.clone()
        }
        _ => "Something went wrong, try again later.".to_string(),
    }
}
