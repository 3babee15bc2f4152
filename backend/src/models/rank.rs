//! Valorant competitive ranks and their balancing point values.

/// Points assumed for players with no rank or a rank the table does not know.
pub const DEFAULT_RANK_POINTS: u32 = 150;

/// Ranks worth at least this many points are treated as elite.
pub const ELITE_RANK_POINTS: u32 = 400;

/// Canonical rank names and the points each is worth, weakest first.
pub const RANK_POINTS: &[(&str, u32)] = &[
    ("Iron 1", 10),
    ("Iron 2", 15),
    ("Iron 3", 20),
    ("Bronze 1", 25),
    ("Bronze 2", 30),
    ("Bronze 3", 35),
    ("Silver 1", 40),
    ("Silver 2", 50),
    ("Silver 3", 60),
    ("Gold 1", 70),
    ("Gold 2", 80),
    ("Gold 3", 90),
    ("Platinum 1", 100),
    ("Platinum 2", 115),
    ("Platinum 3", 130),
    ("Diamond 1", 150),
    ("Diamond 2", 170),
    ("Diamond 3", 190),
    ("Ascendant 1", 215),
    ("Ascendant 2", 240),
    ("Ascendant 3", 265),
    ("Immortal 1", 300),
    ("Immortal 2", 350),
    ("Immortal 3", 400),
    ("Radiant", 500),
    ("Unrated", 150),
    ("Unranked", 150),
];

fn normalize(rank: &str) -> String {
    rank.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn lookup(rank: &str) -> Option<&'static (&'static str, u32)> {
    let wanted = normalize(rank);
    RANK_POINTS
        .iter()
        .find(|(name, _)| name.to_lowercase() == wanted)
}

/// Points for a rank name; unknown or missing ranks fall back to
/// [`DEFAULT_RANK_POINTS`].
pub fn rank_points(rank: Option<&str>) -> u32 {
    rank.and_then(lookup)
        .map(|(_, points)| *points)
        .unwrap_or(DEFAULT_RANK_POINTS)
}

pub fn is_elite_rank(rank: Option<&str>) -> bool {
    rank_points(rank) >= ELITE_RANK_POINTS
}

pub fn is_known_rank(rank: &str) -> bool {
    lookup(rank).is_some()
}

/// The table's spelling of a rank, e.g. `"  immortal   3"` -> `"Immortal 3"`.
pub fn canonical_rank(rank: &str) -> Option<&'static str> {
    lookup(rank).map(|(name, _)| *name)
}
