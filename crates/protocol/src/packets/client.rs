//! Client -> Server message parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Position, ProtocolError};

/// One of the four directions a snake can travel in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit vector for this direction (`Up` is negative `y`).
    pub fn unit(self) -> Position {
        match self {
            Direction::Up => Position::NEG_Y,
            Direction::Down => Position::Y,
            Direction::Left => Position::NEG_X,
            Direction::Right => Position::X,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ProtocolError::UnknownDirection(other.to_string())),
        }
    }
}

/// Parsed client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// `{"moving":"<direction>"}`
    Move(Direction),
}

#[derive(Deserialize)]
struct MoveRequest {
    moving: String,
}

impl ClientCommand {
    /// Parse one command line (without its newline).
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let request: MoveRequest = serde_json::from_str(line)?;
        Ok(ClientCommand::Move(request.moving.parse()?))
    }
}

/// Extract the display name from the first line a client sends.
///
/// Surrounding whitespace is dropped and the name is cut to `max_len`
/// characters.
pub fn parse_player_name(line: &str, max_len: usize) -> String {
    line.trim().chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_commands() {
        for dir in Direction::ALL {
            let line = format!("{{\"moving\":\"{}\"}}", dir);
            assert_eq!(ClientCommand::parse(&line).unwrap(), ClientCommand::Move(dir));
        }
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        let err = ClientCommand::parse(r#"{"moving":"none"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownDirection(ref d) if d == "none"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            ClientCommand::parse(r#"{"moving":"up""#),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"turn":"up"}"#),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_opposites_and_units() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.unit() + dir.opposite().unit(), Position::ZERO);
            assert_eq!(dir.unit().length(), 1.0);
        }
        assert_eq!(Direction::Up.unit(), Position::new(0.0, -1.0));
    }

    #[test]
    fn test_player_name() {
        assert_eq!(parse_player_name("  danny \r", 16), "danny");
        assert_eq!(parse_player_name("abcdefghij", 4), "abcd");
        assert_eq!(parse_player_name("", 4), "");
    }
}
