use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::registry::PositionRegistry;

/// Weapon-order family of doors; these get the wall-adjacency fix-up.
pub const FAMILY_DOOR: u8 = 18;

pub const NAME_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse role of an entity. Decides which collection owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Living,
    Weapon,
    Treasure,
    Generator,
    Fx,
    Special,
    Button,
    Unknown(u8),
}

impl Order {
    pub const LIVING_RAW: u8 = 0;
    pub const WEAPON_RAW: u8 = 1;
    pub const TREASURE_RAW: u8 = 2;
    pub const GENERATOR_RAW: u8 = 3;
    pub const FX_RAW: u8 = 4;
    pub const SPECIAL_RAW: u8 = 5;
    pub const BUTTON_RAW: u8 = 6;

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::LIVING_RAW => Self::Living,
            Self::WEAPON_RAW => Self::Weapon,
            Self::TREASURE_RAW => Self::Treasure,
            Self::GENERATOR_RAW => Self::Generator,
            Self::FX_RAW => Self::Fx,
            Self::SPECIAL_RAW => Self::Special,
            Self::BUTTON_RAW => Self::Button,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match *self {
            Self::Living => Self::LIVING_RAW,
            Self::Weapon => Self::WEAPON_RAW,
            Self::Treasure => Self::TREASURE_RAW,
            Self::Generator => Self::GENERATOR_RAW,
            Self::Fx => Self::FX_RAW,
            Self::Special => Self::SPECIAL_RAW,
            Self::Button => Self::BUTTON_RAW,
            Self::Unknown(other) => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Living => "Living",
            Self::Weapon => "Weapon",
            Self::Treasure => "Treasure",
            Self::Generator => "Generator",
            Self::Fx => "Fx",
            Self::Special => "Special",
            Self::Button => "Button",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unknown(v) => write!(f, "Unknown ({})", v),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// One persisted entity, independent of which revision it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub order: Order,
    pub family: u8,
    pub x: i16,
    pub y: i16,
    pub team: u8,
    pub facing: u8,
    pub command: u8,
    pub level: u16,
    pub name: String,
}

impl EntityRecord {
    pub fn new(order: Order, family: u8) -> Self {
        Self {
            order,
            family,
            x: 0,
            y: 0,
            team: 0,
            facing: 0,
            command: 0,
            level: 0,
            name: String::new(),
        }
    }

    pub fn at(mut self, x: i16, y: i16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Names of a single character are placeholders and don't count.
    pub fn is_named(&self) -> bool {
        self.name.len() > 1
    }
}

/// A live entity owned by exactly one of the level's collections.
///
/// Position is only changed through [`EntityCollections::set_position`] so
/// the registry always agrees with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    order: Order,
    family: u8,
    x: i16,
    y: i16,
    pub team: u8,
    pub facing: u8,
    pub command: u8,
    pub level: u16,
    pub name: String,
    /// Current animation frame; 1 turns a door sideways.
    pub frame: u8,
}

impl Entity {
    pub fn new(order: Order, family: u8) -> Self {
        Self {
            id: EntityId(0),
            order,
            family,
            x: 0,
            y: 0,
            team: 0,
            facing: 0,
            command: 0,
            level: 0,
            name: String::new(),
            frame: 0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    pub fn x(&self) -> i16 {
        self.x
    }

    pub fn y(&self) -> i16 {
        self.y
    }

    pub fn is_named(&self) -> bool {
        self.name.len() > 1
    }

    pub fn is_living(&self) -> bool {
        self.order == Order::Living
    }

    fn apply_record(&mut self, record: &EntityRecord) {
        self.x = record.x;
        self.y = record.y;
        self.team = record.team;
        self.facing = record.facing;
        self.command = record.command;
        self.level = record.level;
        self.name = record.name.clone();
    }

    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            order: self.order,
            family: self.family,
            x: self.x,
            y: self.y,
            team: self.team,
            facing: self.facing,
            command: self.command,
            level: self.level,
            name: self.name.clone(),
        }
    }
}

/// Materializes entities for the loader. The core never knows how an
/// entity behaves, only whether one can exist for an order/family pair.
pub trait EntityFactory {
    fn create(&mut self, order: Order, family: u8) -> Option<Entity>;
}

/// Accepts every known order.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFactory;

impl EntityFactory for StandardFactory {
    fn create(&mut self, order: Order, family: u8) -> Option<Entity> {
        match order {
            Order::Unknown(_) => None,
            _ => Some(Entity::new(order, family)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    Primary,
    Effects,
    Weapons,
}

impl CollectionKind {
    pub const SAVE_ORDER: [CollectionKind; 3] = [Self::Primary, Self::Effects, Self::Weapons];

    /// Order in which `remove` looks for an entity.
    const SEARCH_ORDER: [CollectionKind; 3] = [Self::Weapons, Self::Effects, Self::Primary];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Primary => "primary",
            Self::Effects => "effects",
            Self::Weapons => "weapons",
        }
    }
}

/// Where a new entity goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Weapons to the weapon list, everything else to the back of primary.
    ByOrder,
    Effects,
    PrimaryFront,
}

/// The three ordered entity lists of a level plus the registry they keep
/// in sync.
#[derive(Debug, Default)]
pub struct EntityCollections {
    primary: Vec<Entity>,
    effects: Vec<Entity>,
    weapons: Vec<Entity>,
    living: usize,
    next_id: u32,
    registry: PositionRegistry,
}

impl EntityCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity through `factory` and insert it. `as_effect` sends
    /// non-weapon orders to the effects list instead of primary.
    pub fn add<F: EntityFactory + ?Sized>(
        &mut self,
        factory: &mut F,
        order: Order,
        family: u8,
        as_effect: bool,
    ) -> Option<EntityId> {
        let entity = factory.create(order, family)?;
        let placement = if as_effect && order != Order::Weapon {
            Placement::Effects
        } else {
            Placement::ByOrder
        };
        Some(self.insert(entity, placement))
    }

    /// Materialize a decoded record.
    pub fn add_record<F: EntityFactory + ?Sized>(
        &mut self,
        factory: &mut F,
        record: &EntityRecord,
        placement: Placement,
    ) -> Option<EntityId> {
        let mut entity = factory.create(record.order, record.family)?;
        entity.apply_record(record);
        Some(self.insert(entity, placement))
    }

    /// Take ownership of `entity`, assigning it a fresh id and registering
    /// its position.
    pub fn insert(&mut self, mut entity: Entity, placement: Placement) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        entity.id = id;

        self.registry.register(id, entity.x, entity.y);
        if entity.is_living() {
            self.living += 1;
        }

        match placement {
            Placement::ByOrder if entity.order == Order::Weapon => self.weapons.push(entity),
            Placement::ByOrder => self.primary.push(entity),
            Placement::Effects => self.effects.push(entity),
            Placement::PrimaryFront => self.primary.insert(0, entity),
        }
        id
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        self.take(id).is_some()
    }

    /// Detach an entity, searching weapons, effects, then primary.
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        for kind in CollectionKind::SEARCH_ORDER {
            let list = self.list_mut(kind);
            if let Some(index) = list.iter().position(|e| e.id == id) {
                let entity = list.remove(index);
                self.release(&entity);
                return Some(entity);
            }
        }
        None
    }

    /// Remove every entity whose position fails `keep`. Returns how many
    /// were dropped.
    pub fn retain<P: FnMut(&Entity) -> bool>(&mut self, mut keep: P) -> usize {
        let mut dropped = Vec::new();
        for kind in CollectionKind::SAVE_ORDER {
            let list = self.list_mut(kind);
            let mut index = 0;
            while index < list.len() {
                if keep(&list[index]) {
                    index += 1;
                } else {
                    dropped.push(list.remove(index));
                }
            }
        }
        for entity in &dropped {
            self.release(entity);
        }
        dropped.len()
    }

    fn release(&mut self, entity: &Entity) {
        if !self.registry.deregister(entity.id) {
            log::warn!(
                "entity {} ({} family {}) was not registered",
                entity.id,
                entity.order,
                entity.family
            );
        }
        if entity.is_living() {
            self.living = self.living.saturating_sub(1);
        }
    }

    /// Release every entity. Registrations still present afterwards were
    /// made by someone other than these collections; they are reported,
    /// dropped, and their count returned.
    pub fn clear_all(&mut self) -> usize {
        let mut entities = Vec::with_capacity(self.len());
        for kind in CollectionKind::SAVE_ORDER {
            entities.append(self.list_mut(kind));
        }
        for entity in &entities {
            self.release(entity);
        }
        self.living = 0;

        let leaked = self.registry.clear();
        if leaked > 0 {
            log::warn!("position registry has {leaked} entries left after clearing entities");
        }
        leaked
    }

    pub fn set_position(&mut self, id: EntityId, x: i16, y: i16) -> bool {
        let Some(entity) = self.get_mut(id) else {
            return false;
        };
        entity.x = x;
        entity.y = y;
        self.registry.update(id, x, y)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.iter().map(|(_, e)| e).find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.primary
            .iter_mut()
            .chain(self.effects.iter_mut())
            .chain(self.weapons.iter_mut())
            .find(|e| e.id == id)
    }

    pub fn list(&self, kind: CollectionKind) -> &[Entity] {
        match kind {
            CollectionKind::Primary => &self.primary,
            CollectionKind::Effects => &self.effects,
            CollectionKind::Weapons => &self.weapons,
        }
    }

    fn list_mut(&mut self, kind: CollectionKind) -> &mut Vec<Entity> {
        match kind {
            CollectionKind::Primary => &mut self.primary,
            CollectionKind::Effects => &mut self.effects,
            CollectionKind::Weapons => &mut self.weapons,
        }
    }

    pub fn primary(&self) -> &[Entity] {
        &self.primary
    }

    pub fn effects(&self) -> &[Entity] {
        &self.effects
    }

    pub fn weapons(&self) -> &[Entity] {
        &self.weapons
    }

    pub fn weapons_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.weapons.iter_mut()
    }

    /// All entities in save order: primary, effects, weapons.
    pub fn iter(&self) -> impl Iterator<Item = (CollectionKind, &Entity)> {
        CollectionKind::SAVE_ORDER
            .into_iter()
            .flat_map(move |kind| self.list(kind).iter().map(move |e| (kind, e)))
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.effects.len() + self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn living_count(&self) -> usize {
        self.living
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PositionRegistry {
        &mut self.registry
    }

    /// Check the invariants the writer depends on: every owned entity still
    /// holds its registration and no id is owned twice.
    pub fn verify(&self) -> Result<(), CoreError> {
        let mut seen = std::collections::HashSet::with_capacity(self.len());
        for kind in CollectionKind::SAVE_ORDER {
            for (index, entity) in self.list(kind).iter().enumerate() {
                if !seen.insert(entity.id) {
                    return Err(CoreError::consistency(format!(
                        "entity {} appears more than once ({} list, index {index})",
                        entity.id,
                        kind.as_str()
                    )));
                }
                if !self.registry.contains(entity.id) {
                    return Err(CoreError::consistency(format!(
                        "entity {} in {} list at index {index} has no position registration",
                        entity.id,
                        kind.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Drop for EntityCollections {
    fn drop(&mut self) {
        if !self.is_empty() || !self.registry.is_empty() {
            self.clear_all();
        }
    }
}
