//! Map veto turn order.
//!
//! The sequence of steps is fixed by the format and the pool size. Bans
//! alternate starting with the home team; the last map standing becomes the
//! decider and is recorded without a team.

use crate::api_error::ApiError;
use crate::models::veto::{MapSide, VetoAction, VetoActionType, VetoFormat, VetoSession, VetoStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum VetoError {
    #[error("Veto is already complete")]
    SessionComplete,

    #[error("It is not this team's turn")]
    NotYourTurn { expected: Option<Uuid> },

    #[error("Expected a {expected} action, got {got}")]
    WrongActionType {
        expected: VetoActionType,
        got: VetoActionType,
    },

    #[error("Map {0} is not available")]
    MapUnavailable(String),

    #[error("A side must be chosen")]
    MissingSide,

    #[error("A map must be chosen")]
    MissingMap,

    #[error("Invalid map pool: {0}")]
    InvalidPool(String),
}

impl From<VetoError> for ApiError {
    fn from(e: VetoError) -> Self {
        match e {
            VetoError::SessionComplete | VetoError::NotYourTurn { .. } => ApiError::Conflict(e.to_string()),
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Home,
    Away,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VetoStep {
    /// 1-based position in the sequence.
    pub order: i32,
    /// `None` for the automatic decider.
    pub team: Option<Uuid>,
    pub kind: VetoActionType,
}

/// An action accepted by the engine, ready to be stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedAction {
    pub order_number: i32,
    pub action_type: VetoActionType,
    pub team_id: Option<Uuid>,
    pub map_name: Option<String>,
    pub side: Option<MapSide>,
}

fn alternating_bans(count: usize) -> impl Iterator<Item = (Actor, VetoActionType)> {
    (0..count).map(|i| {
        let actor = if i % 2 == 0 { Actor::Home } else { Actor::Away };
        (actor, VetoActionType::Ban)
    })
}

fn sequence_for(format: VetoFormat, pool_size: usize) -> Vec<(Actor, VetoActionType)> {
    let mut steps = Vec::new();
    match format {
        VetoFormat::Bo1 => {
            steps.extend(alternating_bans(pool_size - 1));
            steps.push((Actor::System, VetoActionType::Decider));
            steps.push((Actor::Away, VetoActionType::Side));
        }
        VetoFormat::Bo3 => {
            let bans = pool_size - 3;
            let opening = bans.min(2);
            steps.extend(alternating_bans(opening));
            steps.push((Actor::Home, VetoActionType::Pick));
            steps.push((Actor::Away, VetoActionType::Side));
            steps.push((Actor::Away, VetoActionType::Pick));
            steps.push((Actor::Home, VetoActionType::Side));
            steps.extend(alternating_bans(bans - opening));
            steps.push((Actor::System, VetoActionType::Decider));
            steps.push((Actor::Home, VetoActionType::Side));
        }
    }
    steps
}

#[derive(Debug, Clone)]
pub struct VetoEngine {
    format: VetoFormat,
    map_pool: Vec<String>,
    home: Uuid,
    away: Uuid,
    sequence: Vec<(Actor, VetoActionType)>,
    position: usize,
    banned: Vec<String>,
    picked: Vec<String>,
}

impl VetoEngine {
    pub fn new(format: VetoFormat, map_pool: Vec<String>, home: Uuid, away: Uuid) -> Result<Self, VetoError> {
        let minimum = format.maps_played().max(2);
        if map_pool.len() < minimum {
            return Err(VetoError::InvalidPool(format!(
                "{:?} needs at least {} maps, got {}",
                format,
                minimum,
                map_pool.len()
            )));
        }
        let mut seen = HashSet::new();
        for map in &map_pool {
            if map.trim().is_empty() {
                return Err(VetoError::InvalidPool("map names cannot be empty".to_string()));
            }
            if !seen.insert(map.to_lowercase()) {
                return Err(VetoError::InvalidPool(format!("{} listed twice", map)));
            }
        }
        if home == away {
            return Err(VetoError::InvalidPool("home and away teams must differ".to_string()));
        }

        Ok(Self {
            sequence: sequence_for(format, map_pool.len()),
            format,
            map_pool,
            home,
            away,
            position: 0,
            banned: Vec::new(),
            picked: Vec::new(),
        })
    }

    /// Engine for a stored session with its recorded actions applied.
    pub fn from_session(session: &VetoSession, actions: &[VetoAction]) -> Result<Self, VetoError> {
        let mut engine = Self::new(
            session.format,
            session.map_pool.clone(),
            session.home_team_id,
            session.away_team_id,
        )?;
        engine.replay(actions)?;
        Ok(engine)
    }

    /// Applies stored actions in order.
    pub fn replay(&mut self, actions: &[VetoAction]) -> Result<(), VetoError> {
        let mut ordered: Vec<&VetoAction> = actions.iter().collect();
        ordered.sort_by_key(|a| a.order_number);

        for action in ordered {
            if action.action_type == VetoActionType::Decider {
                let decided = self.resolve_decider().ok_or(VetoError::WrongActionType {
                    expected: self.next_step().map(|s| s.kind).unwrap_or(VetoActionType::Decider),
                    got: VetoActionType::Decider,
                })?;
                if let Some(stored) = &action.map_name {
                    if decided.map_name.as_deref() != Some(stored.as_str()) {
                        return Err(VetoError::MapUnavailable(stored.clone()));
                    }
                }
                continue;
            }

            let team = action.team_id.ok_or(VetoError::NotYourTurn {
                expected: self.next_step().and_then(|s| s.team),
            })?;
            self.apply(team, action.action_type, action.map_name.as_deref(), action.side)?;
        }
        Ok(())
    }

    fn team_for(&self, actor: Actor) -> Option<Uuid> {
        match actor {
            Actor::Home => Some(self.home),
            Actor::Away => Some(self.away),
            Actor::System => None,
        }
    }

    pub fn format(&self) -> VetoFormat {
        self.format
    }

    pub fn next_step(&self) -> Option<VetoStep> {
        self.sequence.get(self.position).map(|(actor, kind)| VetoStep {
            order: self.position as i32 + 1,
            team: self.team_for(*actor),
            kind: *kind,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.sequence.len()
    }

    pub fn status(&self) -> VetoStatus {
        if self.is_complete() {
            VetoStatus::Completed
        } else if self.position == 0 {
            VetoStatus::Pending
        } else {
            VetoStatus::InProgress
        }
    }

    /// Team expected to act next, `None` when complete or a decider is due.
    pub fn current_turn_team(&self) -> Option<Uuid> {
        self.next_step().and_then(|s| s.team)
    }

    /// Maps neither banned nor picked, in pool order.
    pub fn remaining_maps(&self) -> Vec<String> {
        self.map_pool
            .iter()
            .filter(|m| !self.banned.contains(m) && !self.picked.contains(m))
            .cloned()
            .collect()
    }

    /// Maps to be played in order, the decider last.
    pub fn picked_maps(&self) -> Vec<String> {
        self.picked.clone()
    }

    pub fn banned_maps(&self) -> Vec<String> {
        self.banned.clone()
    }

    fn resolve_map(&self, name: &str) -> Result<String, VetoError> {
        self.remaining_maps()
            .into_iter()
            .find(|m| m.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| VetoError::MapUnavailable(name.trim().to_string()))
    }

    pub fn apply(
        &mut self,
        team: Uuid,
        kind: VetoActionType,
        map: Option<&str>,
        side: Option<MapSide>,
    ) -> Result<AppliedAction, VetoError> {
        let step = self.next_step().ok_or(VetoError::SessionComplete)?;

        if step.team != Some(team) {
            return Err(VetoError::NotYourTurn { expected: step.team });
        }
        if step.kind != kind {
            return Err(VetoError::WrongActionType {
                expected: step.kind,
                got: kind,
            });
        }

        let applied = match kind {
            VetoActionType::Ban | VetoActionType::Pick => {
                let map = self.resolve_map(map.ok_or(VetoError::MissingMap)?)?;
                if kind == VetoActionType::Ban {
                    self.banned.push(map.clone());
                } else {
                    self.picked.push(map.clone());
                }
                AppliedAction {
                    order_number: step.order,
                    action_type: kind,
                    team_id: Some(team),
                    map_name: Some(map),
                    side: None,
                }
            }
            VetoActionType::Side => {
                let side = side.ok_or(VetoError::MissingSide)?;
                AppliedAction {
                    order_number: step.order,
                    action_type: kind,
                    team_id: Some(team),
                    // Side choices apply to the most recently picked map.
                    map_name: self.picked.last().cloned(),
                    side: Some(side),
                }
            }
            // Teams never submit the decider.
            VetoActionType::Decider => {
                return Err(VetoError::NotYourTurn { expected: None });
            }
        };

        self.position += 1;
        Ok(applied)
    }

    /// Records the decider when it is the next step.
    pub fn resolve_decider(&mut self) -> Option<AppliedAction> {
        let step = self.next_step()?;
        if step.kind != VetoActionType::Decider {
            return None;
        }
        let decider = self.remaining_maps().into_iter().next()?;
        self.picked.push(decider.clone());
        self.position += 1;

        Some(AppliedAction {
            order_number: step.order,
            action_type: VetoActionType::Decider,
            team_id: None,
            map_name: Some(decider),
            side: None,
        })
    }
}
