use crate::discord::interaction::{Embed, EmbedField};
use crate::models::player::{EvidenceWeight, PlayerProfile, WeightSource};
use crate::models::tournament::Tournament;
use crate::service::bracket_calculations::BracketStructure;
use crate::service::quick_match_service::QueueStatus;
use crate::service::team_balancer::{AssignedPlayer, QuickMatchBalance};

pub const COLOR_BRAND: u32 = 0xFF4655;
pub const COLOR_SUCCESS: u32 = 0x2ECC71;
pub const COLOR_INFO: u32 = 0x3498DB;

fn field(name: impl Into<String>, value: impl Into<String>, inline: bool) -> EmbedField {
    EmbedField {
        name: name.into(),
        value: value.into(),
        inline,
    }
}

fn source_label(source: WeightSource) -> &'static str {
    match source {
        WeightSource::ManualOverride => "manual override",
        WeightSource::CurrentRank => "current rank",
        WeightSource::PeakRank => "peak rank",
    }
}

pub fn profile(profile: &PlayerProfile, weight: &EvidenceWeight) -> Embed {
    Embed {
        title: format!("{}'s profile", profile.username),
        description: None,
        color: COLOR_BRAND,
        fields: vec![
            field("Rank", profile.current_rank.as_deref().unwrap_or("Unranked"), true),
            field("Peak", profile.peak_rank.as_deref().unwrap_or("Unknown"), true),
            field(
                "Weight",
                format!("{} ({})", weight.weight, source_label(weight.source)),
                true,
            ),
            field("Tournaments won", profile.tournaments_won.to_string(), true),
        ],
    }
}

fn roster(players: &[AssignedPlayer]) -> String {
    players
        .iter()
        .map(|p| format!("{} ({})", p.player.display_name, p.player.evidence_weight))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn balance(title: &str, balance: &QuickMatchBalance) -> Embed {
    Embed {
        title: title.to_string(),
        description: Some(format!(
            "Weight delta {} with {}% confidence",
            balance.weight_delta, balance.balance_confidence
        )),
        color: COLOR_SUCCESS,
        fields: vec![
            field(format!("Team A ({})", balance.team_a_total), roster(&balance.team_a), true),
            field(format!("Team B ({})", balance.team_b_total), roster(&balance.team_b), true),
        ],
    }
}

pub fn queue(status: &QueueStatus) -> Embed {
    let description = if status.newly_joined {
        format!("You joined the queue at position {}.", status.position)
    } else {
        format!("You are already queued at position {}.", status.position)
    };
    Embed {
        title: "Quick match queue".to_string(),
        description: Some(description),
        color: COLOR_INFO,
        fields: vec![field("Players waiting", format!("{}/10", status.size), true)],
    }
}

pub fn tournaments(list: &[Tournament]) -> Embed {
    if list.is_empty() {
        return Embed {
            title: "Tournaments".to_string(),
            description: Some("No open tournaments right now.".to_string()),
            color: COLOR_INFO,
            fields: Vec::new(),
        };
    }

    Embed {
        title: "Tournaments".to_string(),
        description: None,
        color: COLOR_INFO,
        fields: list
            .iter()
            .map(|t| {
                let start = t
                    .start_time
                    .map(|s| s.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "TBD".to_string());
                field(
                    &t.name,
                    format!("{} | {} teams max | starts {}", t.status, t.max_teams, start),
                    false,
                )
            })
            .collect(),
    }
}

pub fn bracket_structure(s: &BracketStructure) -> Embed {
    let rounds = s
        .matches_per_round
        .iter()
        .enumerate()
        .map(|(i, n)| format!("Round {}: {} matches", i + 1, n))
        .collect::<Vec<_>>()
        .join("\n");

    Embed {
        title: format!("Bracket for {} teams", s.team_count),
        description: Some(rounds),
        color: COLOR_INFO,
        fields: vec![
            field("Rounds", s.total_rounds.to_string(), true),
            field("Bracket size", s.bracket_size.to_string(), true),
            field("Byes", s.byes.to_string(), true),
            field("Playable matches", s.playable_matches.to_string(), true),
        ],
    }
}
