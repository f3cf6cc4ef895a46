use serde::Serialize;

use crate::entity::{CollectionKind, Entity, EntityId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub collection: CollectionKind,
    pub order: String,
    pub family: u8,
    pub x: i16,
    pub y: i16,
    pub team: u8,
    pub facing: u8,
    pub command: u8,
    pub level: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub frame: u8,
}

impl EntitySummary {
    pub fn from_entity(collection: CollectionKind, entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            collection,
            order: entity.order().to_string(),
            family: entity.family(),
            x: entity.x(),
            y: entity.y(),
            team: entity.team,
            facing: entity.facing,
            command: entity.command,
            level: entity.level,
            name: entity.is_named().then(|| entity.name.clone()),
            frame: entity.frame,
        }
    }
}

/// Snapshot of a loaded level for display and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSummary {
    pub id: i32,
    pub title: String,
    pub scenario_type: u8,
    pub par_value: i16,
    pub time_bonus_limit: i16,
    pub grid_name: String,
    pub grid_width: usize,
    pub grid_height: usize,
    pub pixel_width: i32,
    pub pixel_height: i32,
    pub living_count: usize,
    pub description: Vec<String>,
    pub entities: Vec<EntitySummary>,
}

impl ScenarioSummary {
    pub fn count_in(&self, collection: CollectionKind) -> usize {
        self.entities
            .iter()
            .filter(|e| e.collection == collection)
            .count()
    }
}
