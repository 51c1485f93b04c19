//! Player commands and the untrusted wire boundary.
//!
//! [`Command`] is the closed set the engine accepts. Raw client JSON first
//! goes through [`parse_command`] (strict, for live submissions) or
//! [`WireCommand`] (tolerant, for reading history back out of the log).

use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::InstanceId;

/// Attack target sentinel for a direct attack on life points.
pub const DIRECT_ATTACK: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Summon {
        card_id: InstanceId,
        #[serde(default)]
        tribute_card_ids: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    SetMonster {
        card_id: InstanceId,
        #[serde(default)]
        tribute_card_ids: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    FlipSummon { card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    ChangePosition { card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    SetSpellTrap { card_id: InstanceId },
    #[serde(rename_all = "camelCase")]
    ActivateSpell {
        card_id: InstanceId,
        #[serde(default)]
        effect_index: usize,
        #[serde(default)]
        targets: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    ActivateTrap {
        card_id: InstanceId,
        #[serde(default)]
        effect_index: usize,
        #[serde(default)]
        targets: Vec<InstanceId>,
    },
    #[serde(rename_all = "camelCase")]
    ActivateEffect {
        card_id: InstanceId,
        #[serde(default)]
        effect_index: usize,
        #[serde(default)]
        targets: Vec<InstanceId>,
    },
    /// `target_card_id` of `None` (or the `""` sentinel on the wire) is a direct attack.
    #[serde(rename_all = "camelCase")]
    DeclareAttack {
        attacker_card_id: InstanceId,
        #[serde(default)]
        target_card_id: Option<InstanceId>,
    },
    AdvancePhase,
    EndTurn,
    /// `pass: false` responds by activating `card_id`.
    #[serde(rename_all = "camelCase")]
    ChainResponse {
        pass: bool,
        #[serde(default)]
        card_id: Option<InstanceId>,
        #[serde(default)]
        effect_index: usize,
        #[serde(default)]
        targets: Vec<InstanceId>,
    },
    Surrender,
}

pub const COMMAND_TYPES: [&str; 13] = [
    "SUMMON",
    "SET_MONSTER",
    "FLIP_SUMMON",
    "CHANGE_POSITION",
    "SET_SPELL_TRAP",
    "ACTIVATE_SPELL",
    "ACTIVATE_TRAP",
    "ACTIVATE_EFFECT",
    "DECLARE_ATTACK",
    "ADVANCE_PHASE",
    "END_TURN",
    "CHAIN_RESPONSE",
    "SURRENDER",
];

impl Command {
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::Summon { .. } => "SUMMON",
            Command::SetMonster { .. } => "SET_MONSTER",
            Command::FlipSummon { .. } => "FLIP_SUMMON",
            Command::ChangePosition { .. } => "CHANGE_POSITION",
            Command::SetSpellTrap { .. } => "SET_SPELL_TRAP",
            Command::ActivateSpell { .. } => "ACTIVATE_SPELL",
            Command::ActivateTrap { .. } => "ACTIVATE_TRAP",
            Command::ActivateEffect { .. } => "ACTIVATE_EFFECT",
            Command::DeclareAttack { .. } => "DECLARE_ATTACK",
            Command::AdvancePhase => "ADVANCE_PHASE",
            Command::EndTurn => "END_TURN",
            Command::ChainResponse { .. } => "CHAIN_RESPONSE",
            Command::Surrender => "SURRENDER",
        }
    }

    pub fn pass() -> Command {
        Command::ChainResponse {
            pass: true,
            card_id: None,
            effect_index: 0,
            targets: Vec::new(),
        }
    }

    /// Fold the wire sentinel `""` into `None`.
    pub fn canonicalize(mut self) -> Command {
        if let Command::DeclareAttack { target_card_id, .. } = &mut self
            && target_card_id
                .as_ref()
                .is_some_and(|t| t.as_str() == DIRECT_ATTACK)
        {
            *target_card_id = None;
        }
        self
    }

    /// Copy of the command with card references hidden, for the non-acting seat.
    pub fn redacted(&self) -> Command {
        let hidden = InstanceId::from_raw("");
        match self {
            Command::SetMonster {
                tribute_card_ids, ..
            } => Command::SetMonster {
                card_id: hidden,
                tribute_card_ids: tribute_card_ids.clone(),
            },
            Command::SetSpellTrap { .. } => Command::SetSpellTrap { card_id: hidden },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// Not JSON, or not an object with a string `type`.
    Malformed(String),
    UnknownType(String),
    /// Known type, but the fields did not fit it.
    InvalidFields { command_type: String, message: String },
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandParseError::Malformed(msg) => write!(f, "malformed command: {}", msg),
            CommandParseError::UnknownType(t) => write!(f, "unknown command type {:?}", t),
            CommandParseError::InvalidFields {
                command_type,
                message,
            } => write!(f, "invalid {} command: {}", command_type, message),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Strict parse of client JSON into a [`Command`].
pub fn parse_command(raw: &str) -> Result<Command, CommandParseError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CommandParseError::Malformed(e.to_string()))?;
    command_from_value(value)
}

pub fn command_from_value(value: Value) -> Result<Command, CommandParseError> {
    let command_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CommandParseError::Malformed("missing string field `type`".to_string()))?
        .to_string();
    if !COMMAND_TYPES.contains(&command_type.as_str()) {
        return Err(CommandParseError::UnknownType(command_type));
    }
    serde_json::from_value::<Command>(value)
        .map(Command::canonicalize)
        .map_err(|e| CommandParseError::InvalidFields {
            command_type,
            message: e.to_string(),
        })
}

/// A command as stored in the log. Anything unreadable becomes `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireCommand {
    Known(Command),
    Unknown { raw: String },
}

impl WireCommand {
    /// Tolerant parse; never fails.
    pub fn from_raw(raw: &str) -> WireCommand {
        match parse_command(raw) {
            Ok(command) => WireCommand::Known(command),
            Err(_) => WireCommand::Unknown {
                raw: raw.to_string(),
            },
        }
    }

    pub fn command(&self) -> Option<&Command> {
        match self {
            WireCommand::Known(command) => Some(command),
            WireCommand::Unknown { .. } => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WireCommand::Known(command) => command.type_name(),
            WireCommand::Unknown { .. } => "UNKNOWN",
        }
    }
}

impl Serialize for WireCommand {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            WireCommand::Known(command) => command.serialize(serializer),
            WireCommand::Unknown { raw } => {
                #[derive(Serialize)]
                struct UnknownRecord<'a> {
                    #[serde(rename = "type")]
                    kind: &'static str,
                    raw: &'a str,
                }
                UnknownRecord {
                    kind: "UNKNOWN",
                    raw,
                }
                .serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for WireCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("type").and_then(Value::as_str) == Some("UNKNOWN") {
            let raw = value
                .get("raw")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Ok(WireCommand::Unknown { raw });
        }
        match command_from_value(value.clone()) {
            Ok(command) => Ok(WireCommand::Known(command)),
            Err(_) => Ok(WireCommand::Unknown {
                raw: value.to_string(),
            }),
        }
    }
}
