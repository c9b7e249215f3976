//! Player commands and responses
//!
//! Commands are built from a player's own snapshot of the board. They carry
//! element ids only; the coordinator re-resolves every id against the live
//! world before acting, so a command is a request and never a mutation.

use crate::error::{InvalidCommand, Rejection};
use territory_core::{
    Board, Building, BuildingType, ElementId, ItemType, PlayerId, Position, Production, RuleBook, Unit,
};

/// Discriminant used as the dispatch table key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandType {
    EndOfTurn,
    MoveTo,
    Attack,
    InfluenceAt,
    EquipUnit,
    SetProduction,
    CreateBuilding,
}

impl CommandType {
    pub const ALL: [CommandType; 7] = [
        CommandType::EndOfTurn,
        CommandType::MoveTo,
        CommandType::Attack,
        CommandType::InfluenceAt,
        CommandType::EquipUnit,
        CommandType::SetProduction,
        CommandType::CreateBuilding,
    ];
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandKind {
    EndOfTurn,
    MoveTo { unit: ElementId, destination: Position },
    Attack { unit: ElementId, target: Position },
    InfluenceAt { unit: ElementId, target: Position },
    EquipUnit { unit: ElementId, item: ItemType },
    SetProduction { building: ElementId, production: Production },
    CreateBuilding { unit: ElementId, building_type: BuildingType },
}

impl CommandKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandKind::EndOfTurn => CommandType::EndOfTurn,
            CommandKind::MoveTo { .. } => CommandType::MoveTo,
            CommandKind::Attack { .. } => CommandType::Attack,
            CommandKind::InfluenceAt { .. } => CommandType::InfluenceAt,
            CommandKind::EquipUnit { .. } => CommandType::EquipUnit,
            CommandKind::SetProduction { .. } => CommandType::SetProduction,
            CommandKind::CreateBuilding { .. } => CommandType::CreateBuilding,
        }
    }
}

/// A request from one player
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerCommand {
    player: PlayerId,
    kind: CommandKind,
}

fn check_unit_owner(player: PlayerId, unit: &Unit) -> Result<(), InvalidCommand> {
    if unit.owner() != player {
        return Err(InvalidCommand::NotOwnedByPlayer(unit.id(), player));
    }
    Ok(())
}

fn check_coordinates(pos: Position) -> Result<(), InvalidCommand> {
    if pos.x < 0 || pos.y < 0 {
        return Err(InvalidCommand::NegativeCoordinates(pos));
    }
    Ok(())
}

impl PlayerCommand {
    pub fn end_of_turn(player: PlayerId) -> Self {
        Self { player, kind: CommandKind::EndOfTurn }
    }

    pub fn move_to(player: PlayerId, unit: &Unit, destination: Position) -> Result<Self, InvalidCommand> {
        check_unit_owner(player, unit)?;
        check_coordinates(destination)?;
        Ok(Self {
            player,
            kind: CommandKind::MoveTo { unit: unit.id(), destination },
        })
    }

    pub fn attack(player: PlayerId, unit: &Unit, target: Position) -> Result<Self, InvalidCommand> {
        check_unit_owner(player, unit)?;
        check_coordinates(target)?;
        Ok(Self {
            player,
            kind: CommandKind::Attack { unit: unit.id(), target },
        })
    }

    pub fn influence_at(player: PlayerId, unit: &Unit, target: Position) -> Result<Self, InvalidCommand> {
        check_unit_owner(player, unit)?;
        check_coordinates(target)?;
        Ok(Self {
            player,
            kind: CommandKind::InfluenceAt { unit: unit.id(), target },
        })
    }

    pub fn equip_unit(player: PlayerId, unit: &Unit, item: ItemType) -> Result<Self, InvalidCommand> {
        check_unit_owner(player, unit)?;
        if unit.has_item(item) {
            return Err(InvalidCommand::UnitAlreadyHasItem(unit.id(), item));
        }
        Ok(Self {
            player,
            kind: CommandKind::EquipUnit { unit: unit.id(), item },
        })
    }

    pub fn set_production(player: PlayerId, building: &Building, production: Production) -> Result<Self, InvalidCommand> {
        if building.owner() != player {
            return Err(InvalidCommand::NotOwnedByPlayer(building.id(), player));
        }
        Ok(Self {
            player,
            kind: CommandKind::SetProduction { building: building.id(), production },
        })
    }

    pub fn create_building(
        player: PlayerId,
        unit: &Unit,
        building_type: BuildingType,
        rules: &RuleBook,
    ) -> Result<Self, InvalidCommand> {
        check_unit_owner(player, unit)?;
        if !unit.can_found_buildings(rules) {
            return Err(InvalidCommand::CannotFoundBuildings(unit.unit_type()));
        }
        Ok(Self {
            player,
            kind: CommandKind::CreateBuilding { unit: unit.id(), building_type },
        })
    }

    /// Build a command from raw parts, skipping snapshot checks
    pub fn from_parts(player: PlayerId, kind: CommandKind) -> Self {
        Self { player, kind }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn command_type(&self) -> CommandType {
        self.kind.command_type()
    }
}

/// Reply to every submitted command
#[derive(Clone, Debug, PartialEq)]
pub enum CommandResponse {
    /// Applied; carries the player's fresh fog-of-war board
    Ok { board: Board },
    /// Not applied; the board is withheld for unauthenticated requests
    Rejected { board: Option<Board>, reason: Rejection },
}

impl CommandResponse {
    pub fn rejected(board: Option<Board>, reason: Rejection) -> Self {
        CommandResponse::Rejected { board, reason }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CommandResponse::Ok { .. })
    }

    pub fn board(&self) -> Option<&Board> {
        match self {
            CommandResponse::Ok { board } => Some(board),
            CommandResponse::Rejected { board, .. } => board.as_ref(),
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommandResponse::Ok { .. } => None,
            CommandResponse::Rejected { reason, .. } => Some(reason),
        }
    }
}
