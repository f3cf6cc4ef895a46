use std::io;

use rand::SeedableRng;
use rand::rngs::StdRng;

use fss_core::entity::{
    CollectionKind, Entity, EntityFactory, EntityId, FAMILY_DOOR, Order, StandardFactory,
};
use fss_core::grid::Grid;
use fss_core::scenario::{self, ScenarioData};
use fss_core::tile::{PIX_GRASS1, PIX_WALL1, TILE_SIZE, is_grass_variant};
use fss_core::{CoreErrorCode, Level, LevelStore, MemoryStore};

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

fn place(level: &mut Level, order: Order, family: u8, as_effect: bool, x: i16, y: i16) -> EntityId {
    let (entities, factory) = level.entities_and_factory();
    let id = entities.add(factory, order, family, as_effect).unwrap();
    assert!(entities.set_position(id, x, y));
    id
}

/// A 20x20 level with entities in every collection.
fn populated_level() -> Level {
    let mut level = Level::new(3);
    level.title = "Round Trip".to_string();
    level.scenario_type = 1;
    level.par_value = 11;
    level.time_bonus_limit = 900;
    level.grid_name = "trip".to_string();
    level.description = vec!["First line".to_string(), String::new(), "Third".to_string()];
    level.create_new_grid(&mut rng());
    level.resize_grid(20, 20, &mut rng()).unwrap();
    assert!(level.set_tile(4, 4, PIX_WALL1));

    let hero = place(&mut level, Order::Living, 2, false, 32, 48);
    let entity = level.entities_mut().get_mut(hero).unwrap();
    entity.name = "Hero".to_string();
    entity.team = 1;
    entity.facing = 3;
    entity.level = 300;
    place(&mut level, Order::Living, 7, false, 100, 100);
    place(&mut level, Order::Treasure, 4, true, 160, 16);
    place(&mut level, Order::Weapon, 9, false, 0, 0);
    place(&mut level, Order::Generator, 1, false, 300, 300);
    level
}

fn fields(level: &Level) -> Vec<(CollectionKind, Order, u8, i16, i16, u8, u8, u16, String)> {
    level
        .entities()
        .iter()
        .map(|(kind, e)| {
            (
                kind,
                e.order(),
                e.family(),
                e.x(),
                e.y(),
                e.team,
                e.facing,
                e.level,
                e.name.clone(),
            )
        })
        .collect()
}

#[test]
fn save_then_load_keeps_everything() {
    let original = populated_level();
    let mut store = MemoryStore::new();
    original.save(&mut store).unwrap();
    assert!(store.grid("trip.pix").is_some());

    let mut loaded = Level::new(0);
    loaded.load(&store, 3).unwrap();

    assert_eq!(loaded.id(), 3);
    assert_eq!(loaded.title, "Round Trip");
    assert_eq!(loaded.scenario_type, 1);
    assert_eq!(loaded.par_value, 11);
    assert_eq!(loaded.time_bonus_limit, 900);
    assert_eq!(loaded.description, original.description);
    assert_eq!(loaded.description_line(2), "Third");
    assert_eq!(loaded.grid(), original.grid());
    assert_eq!(loaded.entities().len(), original.entities().len());
    assert_eq!(loaded.entities().living_count(), 2);
    assert_eq!(fields(&loaded), fields(&original));
}

#[test]
fn mixed_case_and_long_grid_names_load_back() {
    for (name, stored) in [("Forest", "forest"), ("LongGridName", "longgrid")] {
        let mut level = populated_level();
        level.grid_name = name.to_string();
        assert_eq!(level.grid_file_name(), format!("{stored}.pix"));

        let mut store = MemoryStore::new();
        level.save(&mut store).unwrap();
        assert!(store.grid(&format!("{stored}.pix")).is_some(), "{name}");

        let mut loaded = Level::new(0);
        loaded.load(&store, 3).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(loaded.grid_name, stored);
        assert_eq!(loaded.grid(), level.grid());

        // A second save of the loaded level writes the same grid file.
        let mut again = MemoryStore::new();
        loaded.save(&mut again).unwrap();
        assert_eq!(again.grid(&format!("{stored}.pix")), store.grid(&format!("{stored}.pix")));
    }
}

#[test]
fn save_as_writes_under_new_id() {
    let mut level = populated_level();
    let mut store = MemoryStore::new();
    level.save_as(&mut store, 12).unwrap();
    assert_eq!(level.id(), 12);
    assert!(store.scenario(12).is_some());
    assert!(store.scenario(3).is_none());
}

#[test]
fn saved_file_lists_primary_then_effects_then_weapons() {
    let level = populated_level();
    let mut store = MemoryStore::new();
    level.save(&mut store).unwrap();

    let data = scenario::decode(store.scenario(3).unwrap(), 3).unwrap();
    let orders: Vec<Order> = data.entities.iter().map(|p| p.record.order).collect();
    assert_eq!(
        orders,
        vec![
            Order::Living,
            Order::Living,
            Order::Generator,
            Order::Treasure,
            Order::Weapon
        ]
    );
}

fn door_scenario(doors: &[(i16, i16)]) -> MemoryStore {
    let mut data = ScenarioData::new(5);
    data.grid_name = "doors".to_string();
    for &(x, y) in doors {
        data.entities.push(scenario::PlacedRecord {
            record: fss_core::entity::EntityRecord::new(Order::Weapon, FAMILY_DOOR).at(x, y),
            placement: fss_core::entity::Placement::ByOrder,
        });
    }

    let mut grid = Grid::from_cells(5, 5, vec![PIX_GRASS1; 25]).unwrap();
    grid.set(1, 1, PIX_WALL1);
    let mut grid_bytes = Vec::new();
    grid.emit_to_vec(&mut grid_bytes).unwrap();

    let mut store = MemoryStore::new();
    store.insert_scenario(5, scenario::encode(&data).unwrap());
    store.insert_grid("doors.pix", grid_bytes);
    store
}

#[test]
fn doors_below_walls_are_turned_on_load() {
    let t = TILE_SIZE as i16;
    let store = door_scenario(&[(t, 2 * t), (2 * t, 2 * t), (t, 3 * t)]);
    let mut level = Level::new(0);
    level.load(&store, 5).unwrap();

    let frames: Vec<u8> = level.entities().weapons().iter().map(|e| e.frame).collect();
    assert_eq!(frames, vec![1, 0, 0]);
}

#[test]
fn truncated_load_leaves_empty_level_empty() {
    let level = populated_level();
    let mut store = MemoryStore::new();
    level.save(&mut store).unwrap();

    let full = store.scenario(3).unwrap().to_vec();
    store.insert_scenario(3, full[..full.len() - 40].to_vec());

    let mut target = Level::new(0);
    let err = target.load(&store, 3).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Format);
    assert!(err.message.contains("scenario 3"), "{err}");
    assert!(target.entities().is_empty());
    assert!(target.entities().registry().is_empty());
    assert!(target.grid().is_empty());
    assert_eq!(target.title, "New Level");
}

#[test]
fn failed_load_keeps_previous_level() {
    let mut store = MemoryStore::new();
    populated_level().save(&mut store).unwrap();

    let mut level = Level::new(0);
    level.load(&store, 3).unwrap();
    let before = fields(&level);

    let err = level.load(&store, 99).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Stream);
    assert_eq!(level.id(), 3);
    assert_eq!(fields(&level), before);
}

#[test]
fn missing_grid_is_a_stream_error() {
    let level = populated_level();
    let mut store = MemoryStore::new();
    level.save(&mut store).unwrap();

    let mut only_scenario = MemoryStore::new();
    only_scenario.insert_scenario(3, store.scenario(3).unwrap().to_vec());

    let mut target = Level::new(0);
    let err = target.load(&only_scenario, 3).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Stream);
    assert!(err.message.contains("trip.pix"), "{err}");
    assert!(target.entities().is_empty());
}

struct NoGenerators;

impl EntityFactory for NoGenerators {
    fn create(&mut self, order: Order, family: u8) -> Option<Entity> {
        match order {
            Order::Generator => None,
            _ => StandardFactory.create(order, family),
        }
    }
}

#[test]
fn rejected_record_fails_load_with_entity_index() {
    let mut store = MemoryStore::new();
    populated_level().save(&mut store).unwrap();

    let mut level = Level::with_factory(0, NoGenerators);
    let err = level.load(&store, 3).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Format);
    assert!(err.message.contains("entity 2 of 5"), "{err}");
    assert!(level.entities().is_empty());
}

#[test]
fn shrinking_evicts_entities_outside_new_bounds() {
    let mut level = populated_level();
    let before = level.grid().clone();

    // 8x8 tiles = 128x128 pixels
    let evicted = level.resize_grid(8, 8, &mut rng()).unwrap();
    assert_eq!(evicted, 2);
    for (_, e) in level.entities().iter() {
        assert!(i32::from(e.x()) < 128 && i32::from(e.y()) < 128);
    }
    assert_eq!(level.entities().len(), level.entities().registry().len());
    assert_eq!(level.entities().living_count(), 2);

    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(level.grid().get(x, y), before.get(x, y));
        }
    }
}

#[test]
fn growing_keeps_cells_and_entities() {
    let mut level = populated_level();
    let before = level.grid().clone();
    let count = level.entities().len();

    assert_eq!(level.resize_grid(30, 25, &mut rng()).unwrap(), 0);
    assert_eq!(level.entities().len(), count);
    for y in 0..25 {
        for x in 0..30 {
            let tile = level.grid().get(x, y).unwrap();
            if x < 20 && y < 20 {
                assert_eq!(Some(tile), before.get(x, y));
            } else {
                assert!(is_grass_variant(tile));
            }
        }
    }
}

#[test]
fn out_of_range_resize_changes_nothing() {
    let mut level = populated_level();
    let before = level.grid().clone();
    let count = level.entities().len();

    for (w, h) in [(2, 10), (300, 10)] {
        let err = level.resize_grid(w, h, &mut rng()).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::Bounds);
        assert_eq!(level.grid(), &before);
        assert_eq!(level.entities().len(), count);
    }
}

#[test]
fn broken_registry_blocks_save() {
    let mut level = populated_level();
    let id = level.entities().primary()[0].id();
    level.entities_mut().registry_mut().deregister(id);

    let mut store = MemoryStore::new();
    let err = level.save(&mut store).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Consistency);
    assert!(store.read_scenario(3).is_err());
}

/// Accepts scenarios but fails every grid write.
struct GridWriteFails(MemoryStore);

impl LevelStore for GridWriteFails {
    fn read_scenario(&self, id: i32) -> io::Result<Vec<u8>> {
        self.0.read_scenario(id)
    }

    fn read_grid(&self, file_name: &str) -> io::Result<Vec<u8>> {
        self.0.read_grid(file_name)
    }

    fn write_scenario(&mut self, id: i32, bytes: &[u8]) -> io::Result<()> {
        self.0.write_scenario(id, bytes)
    }

    fn write_grid(&mut self, _file_name: &str, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}

#[test]
fn failed_grid_write_leaves_no_scenario() {
    let level = populated_level();
    let mut store = GridWriteFails(MemoryStore::new());

    let err = level.save(&mut store).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Stream);
    assert!(err.message.contains("trip.pix"), "{err}");
    assert!(store.0.scenario(3).is_none());
}

/// A revision 3 record: 9 fixed bytes, a one-byte level, 10 reserved bytes.
fn v3_record(order: u8, family: u8, x: i16) -> Vec<u8> {
    let mut out = vec![order, family];
    out.extend_from_slice(&x.to_le_bytes());
    out.extend_from_slice(&16i16.to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 1]);
    out.extend_from_slice(&[0; 10]);
    out
}

#[test]
fn revision_3_treasure_loads_to_front_in_reverse_order() {
    let records = [
        v3_record(Order::LIVING_RAW, 1, 16),
        v3_record(Order::TREASURE_RAW, 10, 32),
        v3_record(Order::LIVING_RAW, 2, 48),
        v3_record(Order::TREASURE_RAW, 11, 64),
    ];
    let mut bytes = b"FSS\x03old\0\0\0\0\0".to_vec();
    bytes.extend_from_slice(&(records.len() as u16).to_le_bytes());
    for r in &records {
        bytes.extend_from_slice(r);
    }
    bytes.push(0);

    let mut grid_bytes = Vec::new();
    Grid::from_cells(5, 5, vec![PIX_GRASS1; 25])
        .unwrap()
        .emit_to_vec(&mut grid_bytes)
        .unwrap();

    let mut store = MemoryStore::new();
    store.insert_scenario(7, bytes);
    store.insert_grid("old.pix", grid_bytes);

    let mut level = Level::new(0);
    level.load(&store, 7).unwrap();

    let families: Vec<u8> = level.entities().primary().iter().map(|e| e.family()).collect();
    assert_eq!(families, vec![11, 10, 1, 2]);
    assert!(level.entities().effects().is_empty());
    assert_eq!(level.entities().living_count(), 2);
    assert_eq!(level.entities().len(), level.entities().registry().len());
}
