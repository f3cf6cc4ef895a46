use std::collections::HashMap;

use crate::entity::EntityId;
use crate::tile::TILE_SIZE;

/// Position index for live entities. Collections register an entity when
/// they take ownership of it and deregister it before letting it go; any
/// entry left behind after a full clear is an ownership bug in a caller.
#[derive(Debug, Clone, Default)]
pub struct PositionRegistry {
    positions: HashMap<EntityId, (i16, i16)>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous position if `id` was already registered.
    pub fn register(&mut self, id: EntityId, x: i16, y: i16) -> Option<(i16, i16)> {
        self.positions.insert(id, (x, y))
    }

    pub fn update(&mut self, id: EntityId, x: i16, y: i16) -> bool {
        match self.positions.get_mut(&id) {
            Some(pos) => {
                *pos = (x, y);
                true
            }
            None => false,
        }
    }

    pub fn deregister(&mut self, id: EntityId) -> bool {
        self.positions.remove(&id).is_some()
    }

    pub fn position(&self, id: EntityId) -> Option<(i16, i16)> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Ids whose position falls in grid cell (`cell_x`, `cell_y`), sorted.
    pub fn in_cell(&self, cell_x: i32, cell_y: i32) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .positions
            .iter()
            .filter(|(_, (x, y))| {
                i32::from(*x).div_euclid(TILE_SIZE) == cell_x
                    && i32::from(*y).div_euclid(TILE_SIZE) == cell_y
            })
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop every entry, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.positions.len();
        self.positions.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_update_deregister() {
        let mut reg = PositionRegistry::new();
        assert_eq!(reg.register(EntityId(1), 10, 20), None);
        assert!(reg.update(EntityId(1), 40, 8));
        assert_eq!(reg.position(EntityId(1)), Some((40, 8)));
        assert!(!reg.update(EntityId(2), 0, 0));
        assert!(reg.deregister(EntityId(1)));
        assert!(!reg.deregister(EntityId(1)));
        assert!(reg.is_empty());
    }

    #[test]
    fn cell_lookup_uses_tile_size() {
        let mut reg = PositionRegistry::new();
        reg.register(EntityId(3), 17, 1);
        reg.register(EntityId(1), 31, 15);
        reg.register(EntityId(2), 32, 0);
        assert_eq!(reg.in_cell(1, 0), vec![EntityId(1), EntityId(3)]);
        assert_eq!(reg.in_cell(2, 0), vec![EntityId(2)]);
    }
}
