//! Line-based local input
//!
//! The terminal client reads one command per line from stdin and turns it
//! into an [`InputCommand`] for the session loop.

use shared::Position;
use std::str::FromStr;

pub const HELP: &str = "commands: move <x> <y> <z> | shoot | list | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    Move(Position),
    Shoot,
    List,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("empty input")]
    Empty,

    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("usage: move <x> <y> <z>")]
    MoveUsage,

    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("coordinate `{0}` is not finite")]
    NonFinite(String),
}

/// Parses one coordinate, rejecting NaN and infinities
pub fn parse_coordinate(word: &str) -> Result<f32, InputError> {
    let value = word
        .parse::<f32>()
        .map_err(|_| InputError::NotANumber(word.to_string()))?;
    if !value.is_finite() {
        return Err(InputError::NonFinite(word.to_string()));
    }
    Ok(value)
}

impl FromStr for InputCommand {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(InputError::Empty)?;

        match command.to_ascii_lowercase().as_str() {
            "move" | "m" => {
                let coords: Vec<f32> = words
                    .map(parse_coordinate)
                    .collect::<Result<_, _>>()
                    .map_err(|e| match e {
                        InputError::NonFinite(_) => e,
                        _ => InputError::MoveUsage,
                    })?;
                match coords.as_slice() {
                    [x, y, z] => Ok(InputCommand::Move(Position::new(*x, *y, *z))),
                    _ => Err(InputError::MoveUsage),
                }
            }
            "shoot" | "s" => Ok(InputCommand::Shoot),
            "list" | "l" => Ok(InputCommand::List),
            "help" | "?" => Ok(InputCommand::Help),
            "quit" | "q" | "exit" => Ok(InputCommand::Quit),
            other => Err(InputError::Unknown(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_parse_move() {
        match "move 1.5 -2 0.25".parse::<InputCommand>().unwrap() {
            InputCommand::Move(position) => {
                assert_approx_eq!(position.x, 1.5);
                assert_approx_eq!(position.y, -2.0);
                assert_approx_eq!(position.z, 0.25);
            }
            other => panic!("Expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_move_requires_three_numbers() {
        assert_eq!("move 1 2".parse::<InputCommand>(), Err(InputError::MoveUsage));
        assert_eq!("move 1 2 3 4".parse::<InputCommand>(), Err(InputError::MoveUsage));
        assert_eq!("move a b c".parse::<InputCommand>(), Err(InputError::MoveUsage));
    }

    #[test]
    fn test_parse_move_rejects_non_finite() {
        assert_eq!(
            "move inf NaN 0".parse::<InputCommand>(),
            Err(InputError::NonFinite("inf".to_string()))
        );
        assert_eq!(
            "move 0 0 -infinity".parse::<InputCommand>(),
            Err(InputError::NonFinite("-infinity".to_string()))
        );
        // Overflows to infinity as an f32
        assert_eq!(
            "move 1e39 0 0".parse::<InputCommand>(),
            Err(InputError::NonFinite("1e39".to_string()))
        );
    }

    #[test]
    fn test_parse_coordinate() {
        assert_approx_eq!(parse_coordinate("-3.5").unwrap(), -3.5);
        assert_eq!(
            parse_coordinate("abc"),
            Err(InputError::NotANumber("abc".to_string()))
        );
        assert_eq!(
            parse_coordinate("nan"),
            Err(InputError::NonFinite("nan".to_string()))
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("shoot".parse::<InputCommand>(), Ok(InputCommand::Shoot));
        assert_eq!("  S ".parse::<InputCommand>(), Ok(InputCommand::Shoot));
        assert_eq!("list".parse::<InputCommand>(), Ok(InputCommand::List));
        assert_eq!("help".parse::<InputCommand>(), Ok(InputCommand::Help));
        assert_eq!("quit".parse::<InputCommand>(), Ok(InputCommand::Quit));
        assert_eq!("exit".parse::<InputCommand>(), Ok(InputCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<InputCommand>(), Err(InputError::Empty));
        assert_eq!("   ".parse::<InputCommand>(), Err(InputError::Empty));
        assert_eq!(
            "dance".parse::<InputCommand>(),
            Err(InputError::Unknown("dance".to_string()))
        );
    }
}
