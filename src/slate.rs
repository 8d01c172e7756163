// Slate data loading and normalization.
//
// Reads two CSV inputs: a scored-player file produced by the upstream scoring
// pipeline (one row per player per slate) and a schedule file pairing each
// team with its opponent for the week.

use crate::config::DataSection;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Roster position of a slate player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Defense,
    Kicker,
}

impl Position {
    /// Parse a position code as it appears in slate CSVs. Accepts the common
    /// site spellings ("D/ST", "DEF") as aliases.
    pub fn from_str_pos(s: &str) -> Option<Position> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" | "HB" | "FB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "DST" | "D/ST" | "DEF" | "D" => Some(Position::Defense),
            "K" | "PK" => Some(Position::Kicker),
            _ => None,
        }
    }

    /// Short display form used in output tables and serialized lineups.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Defense => "DST",
            Position::Kicker => "K",
        }
    }

    /// True for the positions that can fill a FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }

    /// True for the positions a quarterback stack pairs with.
    pub fn is_pass_catcher(&self) -> bool {
        matches!(self, Position::WideReceiver | Position::TightEnd)
    }

    /// Sort order for display (QB first, kicker last).
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Defense => 4,
            Position::Kicker => 5,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_str())
    }
}

/// Every position the loader recognizes, in display order.
pub const ALL_POSITIONS: &[Position] = &[
    Position::Quarterback,
    Position::RunningBack,
    Position::WideReceiver,
    Position::TightEnd,
    Position::Defense,
    Position::Kicker,
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One scored player as produced by the upstream scoring pipeline.
///
/// Numeric fields are optional because upstream scoring legitimately leaves
/// gaps (unscored players, missing salaries near lock). The pool preparer
/// decides what to do with the gaps; the loader only normalizes them.
#[derive(Debug, Clone)]
pub struct ScoredPlayer {
    pub player_id: u64,
    /// Stable composite key ("name:team:position") used for exposure limits.
    pub key: String,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub salary: Option<u32>,
    pub quality_score: Option<f64>,
    /// Projected field ownership. May arrive as a fraction or a percentage;
    /// normalization happens during pool preparation.
    pub ownership: f64,
    pub projected_points: Option<f64>,
    pub implied_team_total: Option<f64>,
    pub snap_share_delta: Option<f64>,
}

/// Team code → opponent team code, folded symmetrically from the schedule.
pub type OpponentMap = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SlateError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Scored-player CSV row. Optional columns may be absent from the file or
/// left empty per row; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    #[serde(alias = "id")]
    player_id: u64,
    #[serde(default)]
    key: Option<String>,
    name: String,
    team: String,
    position: String,
    #[serde(default)]
    salary: Option<u32>,
    #[serde(default, alias = "smart_score")]
    quality_score: Option<f64>,
    #[serde(default)]
    ownership: Option<f64>,
    #[serde(default, alias = "projection")]
    projected_points: Option<f64>,
    #[serde(default, alias = "implied_total")]
    implied_team_total: Option<f64>,
    #[serde(default, alias = "snap_delta")]
    snap_share_delta: Option<f64>,
}

/// Schedule CSV row. Extra columns (kickoff time, spread) are absorbed via
/// `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
struct RawScheduleRow {
    team: String,
    opponent: String,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drop non-finite values so NaN in a CSV cell reads the same as an empty cell.
fn finite_or_none(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn normalize_team(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn scored_from_raw(raw: RawPlayerRow) -> Option<ScoredPlayer> {
    let name = raw.name.trim().to_string();
    let team = normalize_team(&raw.team);
    let Some(position) = Position::from_str_pos(&raw.position) else {
        warn!("skipping player '{}': unknown position '{}'", name, raw.position);
        return None;
    };
    let key = raw
        .key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| format!("{}:{}:{}", name, team, position.display_str()));
    Some(ScoredPlayer {
        player_id: raw.player_id,
        key,
        name,
        team,
        position,
        salary: raw.salary,
        quality_score: finite_or_none(raw.quality_score),
        ownership: finite_or_none(raw.ownership).unwrap_or(0.0),
        projected_points: finite_or_none(raw.projected_points),
        implied_team_total: finite_or_none(raw.implied_team_total),
        snap_share_delta: finite_or_none(raw.snap_share_delta),
    })
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<ScoredPlayer>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                if let Some(player) = scored_from_raw(raw) {
                    players.push(player);
                }
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_schedule_from_reader<R: Read>(rdr: R) -> Result<OpponentMap, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut opponents = OpponentMap::new();
    for result in reader.deserialize::<RawScheduleRow>() {
        match result {
            Ok(raw) => {
                let team = normalize_team(&raw.team);
                let opponent = normalize_team(&raw.opponent);
                if team.is_empty() || opponent.is_empty() {
                    warn!("skipping schedule row with a blank team code");
                    continue;
                }
                for (a, b) in [(team.clone(), opponent.clone()), (opponent, team)] {
                    if let Some(existing) = opponents.get(&a) {
                        if *existing != b {
                            warn!(
                                "schedule lists '{}' against both '{}' and '{}', keeping the first",
                                a, existing, b
                            );
                        }
                        continue;
                    }
                    opponents.insert(a, b);
                }
            }
            Err(e) => {
                warn!("skipping malformed schedule row: {}", e);
            }
        }
    }
    Ok(opponents)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load scored players from a CSV file.
pub fn load_players(path: &Path) -> Result<Vec<ScoredPlayer>, SlateError> {
    let file = std::fs::File::open(path).map_err(|e| SlateError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_players_from_reader(file).map_err(|e| SlateError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the week's schedule from a CSV file. Returns the symmetric
/// team → opponent map.
pub fn load_schedule(path: &Path) -> Result<OpponentMap, SlateError> {
    let file = std::fs::File::open(path).map_err(|e| SlateError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_schedule_from_reader(file).map_err(|e| SlateError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load both slate inputs using paths from the config.
pub fn load_slate(data: &DataSection) -> Result<(Vec<ScoredPlayer>, OpponentMap), SlateError> {
    let players = load_players(Path::new(&data.players))?;
    let opponents = load_schedule(Path::new(&data.schedule))?;

    if players.is_empty() {
        return Err(SlateError::Validation(
            "player CSV produced zero usable rows".into(),
        ));
    }
    if opponents.is_empty() {
        return Err(SlateError::Validation(
            "schedule CSV produced zero usable rows".into(),
        ));
    }

    Ok((players, opponents))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
