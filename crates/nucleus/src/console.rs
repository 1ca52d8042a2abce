//! Console input of the host.
//!
//! Besides plugin commands, the console drives the simulated world so regions
//! and jails can be exercised without a game client:
//!
//! ```text
//! join <player> <world> <x> <y> <z>
//! move <player> <x> <y> <z>
//! tp <player> <world> <x> <y> <z>
//! quit <player>
//! op <player>
//! imprison <player> <minutes>
//! as <player> <label> [args...]
//! complete <label> [args...]
//! stop
//! [/]<label> [args...]
//! ```

use nucleus_framework::Location;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Join { player: String, location: Location },
    Move { player: String, x: f64, y: f64, z: f64 },
    Teleport { player: String, location: Location },
    Quit { player: String },
    Op { player: String },
    Imprison { player: String, minutes: u64 },
    /// A plugin command issued by a player.
    As { player: String, label: String, args: Vec<String> },
    /// A plugin command issued by the console.
    Command { label: String, args: Vec<String> },
    /// Tab completion of the last argument, as the console.
    Complete { label: String, args: Vec<String> },
    Stop,
    Empty,
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Result<Self, String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&first, rest)) = tokens.split_first() else {
            return Ok(ConsoleInput::Empty);
        };

        if let Some(label) = first.strip_prefix('/') {
            return Ok(command(label, rest));
        }

        match (first.to_lowercase().as_str(), rest) {
            ("join", [player, world, x, y, z]) => Ok(ConsoleInput::Join {
                player: player.to_string(),
                location: location(world, x, y, z)?,
            }),
            ("move", [player, x, y, z]) => Ok(ConsoleInput::Move {
                player: player.to_string(),
                x: coordinate(x)?,
                y: coordinate(y)?,
                z: coordinate(z)?,
            }),
            ("tp", [player, world, x, y, z]) => Ok(ConsoleInput::Teleport {
                player: player.to_string(),
                location: location(world, x, y, z)?,
            }),
            ("quit", [player]) => Ok(ConsoleInput::Quit {
                player: player.to_string(),
            }),
            ("op", [player]) => Ok(ConsoleInput::Op {
                player: player.to_string(),
            }),
            ("imprison", [player, minutes]) => Ok(ConsoleInput::Imprison {
                player: player.to_string(),
                minutes: minutes
                    .parse()
                    .map_err(|_| format!("Invalid number of minutes: {}", minutes))?,
            }),
            ("as", [player, label, args @ ..]) => Ok(ConsoleInput::As {
                player: player.to_string(),
                label: label.trim_start_matches('/').to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            }),
            ("complete", [label, args @ ..]) => Ok(ConsoleInput::Complete {
                label: label.trim_start_matches('/').to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            }),
            ("stop", []) => Ok(ConsoleInput::Stop),
            ("join" | "move" | "tp" | "quit" | "op" | "imprison" | "as" | "complete", _) => {
                Err(format!("Wrong arguments for '{}'", first))
            }
            _ => Ok(command(first, rest)),
        }
    }
}

fn command(label: &str, rest: &[&str]) -> ConsoleInput {
    ConsoleInput::Command {
        label: label.to_string(),
        args: rest.iter().map(|s| s.to_string()).collect(),
    }
}

fn coordinate(token: &str) -> Result<f64, String> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("Invalid coordinate: {}", token))
}

fn location(world: &str, x: &str, y: &str, z: &str) -> Result<Location, String> {
    Ok(Location::new(world, coordinate(x)?, coordinate(y)?, coordinate(z)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_commands() {
        assert_eq!(
            ConsoleInput::parse("join Steve world 1 64 -2").unwrap(),
            ConsoleInput::Join {
                player: "Steve".into(),
                location: Location::new("world", 1.0, 64.0, -2.0),
            }
        );
        assert_eq!(
            ConsoleInput::parse("move Steve 3.5 64 0").unwrap(),
            ConsoleInput::Move {
                player: "Steve".into(),
                x: 3.5,
                y: 64.0,
                z: 0.0,
            }
        );
        assert_eq!(ConsoleInput::parse("  ").unwrap(), ConsoleInput::Empty);
        assert_eq!(ConsoleInput::parse("stop").unwrap(), ConsoleInput::Stop);
    }

    #[test]
    fn test_plugin_commands() {
        assert_eq!(
            ConsoleInput::parse("/jail listtp 2").unwrap(),
            ConsoleInput::Command {
                label: "jail".into(),
                args: vec!["listtp".into(), "2".into()],
            }
        );
        assert_eq!(
            ConsoleInput::parse("as Steve /jail addtp yard").unwrap(),
            ConsoleInput::As {
                player: "Steve".into(),
                label: "jail".into(),
                args: vec!["addtp".into(), "yard".into()],
            }
        );
        // A slash forces a plugin command even for host keywords
        assert!(matches!(
            ConsoleInput::parse("/stop").unwrap(),
            ConsoleInput::Command { .. }
        ));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(ConsoleInput::parse("join Steve world 1 2").is_err());
        assert!(ConsoleInput::parse("move Steve 1 two 3").is_err());
        assert!(ConsoleInput::parse("move Steve 1 NaN 3").is_err());
        assert!(ConsoleInput::parse("imprison Steve soon").is_err());
        assert!(ConsoleInput::parse("complete").is_err());
    }
}
