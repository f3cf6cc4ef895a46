use rand::Rng;

use crate::entity::{
    CollectionKind, EntityCollections, EntityFactory, FAMILY_DOOR, Placement, StandardFactory,
};
use crate::error::CoreError;
use crate::grid::Grid;
use crate::scenario::{self, PlacedRecord, ScenarioData};
use crate::scenario::types::{
    CURRENT_VERSION, DEFAULT_PAR_VALUE, DEFAULT_SCENARIO_TYPE, DEFAULT_TIME_BONUS_LIMIT,
    DEFAULT_TITLE,
};
use crate::store::LevelStore;
use crate::summary::{EntitySummary, ScenarioSummary};
use crate::tile::{TILE_SIZE, TileGenre};

/// One scenario: metadata, terrain grid and the entities standing on it.
///
/// `load` decodes into scratch state and only replaces the level once the
/// scenario and its grid have both been read, so a failed load leaves the
/// level exactly as it was.
#[derive(Debug)]
pub struct Level<F: EntityFactory = StandardFactory> {
    id: i32,
    pub title: String,
    pub scenario_type: u8,
    pub par_value: i16,
    pub time_bonus_limit: i16,
    /// Grid resource name, no extension.
    pub grid_name: String,
    pub description: Vec<String>,
    grid: Grid,
    entities: EntityCollections,
    draw_pos: (i32, i32),
    factory: F,
}

impl Level<StandardFactory> {
    pub fn new(id: i32) -> Self {
        Self::with_factory(id, StandardFactory)
    }
}

impl<F: EntityFactory> Level<F> {
    pub fn with_factory(id: i32, factory: F) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            scenario_type: DEFAULT_SCENARIO_TYPE,
            par_value: DEFAULT_PAR_VALUE,
            time_bonus_limit: DEFAULT_TIME_BONUS_LIMIT,
            grid_name: String::new(),
            description: Vec::new(),
            grid: Grid::empty(),
            entities: EntityCollections::new(),
            draw_pos: (0, 0),
            factory,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Change one grid cell. Resizing goes through [`Level::resize_grid`] so
    /// entities can never be left off the map.
    pub fn set_tile(&mut self, x: usize, y: usize, tile: u8) -> bool {
        self.grid.set(x, y, tile)
    }

    pub fn entities(&self) -> &EntityCollections {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityCollections {
        &mut self.entities
    }

    /// Entities and the factory together, for adding new entities.
    pub fn entities_and_factory(&mut self) -> (&mut EntityCollections, &mut F) {
        (&mut self.entities, &mut self.factory)
    }

    /// The grid name as a saved scenario stores it and a later load reads
    /// it back.
    pub fn persisted_grid_name(&self) -> String {
        scenario::persisted_grid_name(&self.grid_name)
    }

    pub fn grid_file_name(&self) -> String {
        scenario::grid_file_name(&self.persisted_grid_name())
    }

    /// Load scenario `id` and its grid from `store`, replacing this level.
    pub fn load<S: LevelStore + ?Sized>(&mut self, store: &S, id: i32) -> Result<(), CoreError> {
        let label = format!("scenario {id}");
        let bytes = store
            .read_scenario(id)
            .map_err(|e| CoreError::from_stream(&label, &e))?;
        let data = scenario::decode(&bytes, id).map_err(|e| CoreError::from_decode(&label, &e))?;
        let label = format!("scenario {id} (version {})", data.version);

        let mut entities = EntityCollections::new();
        materialize(&mut entities, &mut self.factory, &data.entities)
            .map_err(|message| CoreError::format(format!("{label}: {message}")))?;

        let grid_file = data.grid_file_name();
        let grid_bytes = store
            .read_grid(&grid_file)
            .map_err(|e| CoreError::from_stream(&format!("{label}: grid {grid_file}"), &e))?;
        let grid = Grid::parse(&grid_bytes)
            .map_err(|e| CoreError::from_decode(&format!("{label}: grid {grid_file}"), &e))?;

        let turned = turn_doors_beside_walls(&mut entities, &grid);
        if turned > 0 {
            log::debug!("turned {turned} door(s) below walls");
        }

        let ScenarioData {
            version,
            grid_name,
            title,
            scenario_type,
            par_value,
            time_bonus_limit,
            description,
            ..
        } = data;

        self.clear();
        self.id = id;
        self.title = title;
        self.scenario_type = scenario_type;
        self.par_value = par_value;
        self.time_bonus_limit = time_bonus_limit;
        self.grid_name = grid_name;
        self.description = description;
        self.grid = grid;
        self.entities = entities;

        if version != CURRENT_VERSION {
            log::info!("{label} loaded; it will be written as version {CURRENT_VERSION}");
        }
        log::info!(
            "loaded {label}: {} entities, grid {}x{}",
            self.entities.len(),
            self.grid.width(),
            self.grid.height()
        );
        Ok(())
    }

    pub fn save<S: LevelStore + ?Sized>(&self, store: &mut S) -> Result<(), CoreError> {
        self.write_to(store, self.id)
    }

    /// Save under `id` and adopt it as this level's id.
    pub fn save_as<S: LevelStore + ?Sized>(
        &mut self,
        store: &mut S,
        id: i32,
    ) -> Result<(), CoreError> {
        self.write_to(store, id)?;
        self.id = id;
        Ok(())
    }

    fn write_to<S: LevelStore + ?Sized>(&self, store: &mut S, id: i32) -> Result<(), CoreError> {
        if self.persisted_grid_name().is_empty() {
            return Err(CoreError::consistency(format!(
                "scenario {id} has no grid name to save the grid under"
            )));
        }
        self.entities.verify()?;

        let bytes = scenario::encode(&self.to_scenario_data())?;
        let mut grid_bytes = Vec::new();
        self.grid.emit_to_vec(&mut grid_bytes)?;

        // Grid first: a scenario file must never name a grid that was not
        // written.
        let label = format!("scenario {id}");
        let grid_file = self.grid_file_name();
        store
            .write_grid(&grid_file, &grid_bytes)
            .map_err(|e| CoreError::from_stream(&format!("{label}: grid {grid_file}"), &e))?;
        store
            .write_scenario(id, &bytes)
            .map_err(|e| CoreError::from_stream(&label, &e))?;

        log::info!("scenario {id} saved ({} bytes, grid {grid_file})", bytes.len());
        Ok(())
    }

    /// Current state as the codec sees it, entities in save order.
    pub fn to_scenario_data(&self) -> ScenarioData {
        ScenarioData {
            version: CURRENT_VERSION,
            grid_name: self.persisted_grid_name(),
            title: self.title.clone(),
            scenario_type: self.scenario_type,
            par_value: self.par_value,
            time_bonus_limit: self.time_bonus_limit,
            entities: self
                .entities
                .iter()
                .map(|(kind, entity)| PlacedRecord {
                    record: entity.to_record(),
                    placement: match kind {
                        CollectionKind::Effects => Placement::Effects,
                        CollectionKind::Primary | CollectionKind::Weapons => Placement::ByOrder,
                    },
                })
                .collect(),
            description: self.description.clone(),
        }
    }

    /// Drop every entity and the grid and reset metadata to defaults. The
    /// id and grid name are kept.
    pub fn clear(&mut self) {
        self.entities.clear_all();
        self.grid.clear();
        self.title = DEFAULT_TITLE.to_string();
        self.scenario_type = DEFAULT_SCENARIO_TYPE;
        self.par_value = DEFAULT_PAR_VALUE;
        self.time_bonus_limit = DEFAULT_TIME_BONUS_LIMIT;
        self.description.clear();
        self.draw_pos = (0, 0);
    }

    /// Replace the grid with a fresh 40x60 grass map.
    pub fn create_new_grid<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid = Grid::create_default(rng);
    }

    /// Resize the grid and evict every entity left outside the new pixel
    /// bounds. Returns how many entities were evicted.
    pub fn resize_grid<R: Rng + ?Sized>(
        &mut self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<usize, CoreError> {
        self.grid.resize(width, height, rng)?;
        let grid = &self.grid;
        let evicted = self
            .entities
            .retain(|e| grid.contains_pixel(e.x().into(), e.y().into()));
        if evicted > 0 {
            log::info!("resize to {width}x{height} removed {evicted} entities");
        }
        Ok(evicted)
    }

    pub fn set_draw_pos(&mut self, x: i32, y: i32) {
        self.draw_pos = (x, y);
    }

    pub fn add_draw_pos(&mut self, dx: i32, dy: i32) {
        self.draw_pos.0 += dx;
        self.draw_pos.1 += dy;
    }

    pub fn draw_pos(&self) -> (i32, i32) {
        self.draw_pos
    }

    /// Line `index` of the description, empty past the end.
    pub fn description_line(&self, index: usize) -> &str {
        self.description.get(index).map_or("", String::as_str)
    }

    pub fn summary(&self) -> ScenarioSummary {
        ScenarioSummary {
            id: self.id,
            title: self.title.clone(),
            scenario_type: self.scenario_type,
            par_value: self.par_value,
            time_bonus_limit: self.time_bonus_limit,
            grid_name: self.grid_name.clone(),
            grid_width: self.grid.width(),
            grid_height: self.grid.height(),
            pixel_width: self.grid.pixel_width(),
            pixel_height: self.grid.pixel_height(),
            living_count: self.entities.living_count(),
            description: self.description.clone(),
            entities: self
                .entities
                .iter()
                .map(|(kind, entity)| EntitySummary::from_entity(kind, entity))
                .collect(),
        }
    }
}

fn materialize<F: EntityFactory + ?Sized>(
    entities: &mut EntityCollections,
    factory: &mut F,
    records: &[PlacedRecord],
) -> Result<(), String> {
    let count = records.len();
    for (index, placed) in records.iter().enumerate() {
        if entities
            .add_record(factory, &placed.record, placed.placement)
            .is_none()
        {
            return Err(format!(
                "entity {index} of {count}: no {} of family {} can be created",
                placed.record.order, placed.record.family
            ));
        }
    }
    Ok(())
}

/// Doors standing directly below a wall tile are turned sideways.
fn turn_doors_beside_walls(entities: &mut EntityCollections, grid: &Grid) -> usize {
    let mut turned = 0;
    for door in entities
        .weapons_mut()
        .filter(|e| e.family() == FAMILY_DOOR)
    {
        let cx = i32::from(door.x()).div_euclid(TILE_SIZE);
        let cy = i32::from(door.y()).div_euclid(TILE_SIZE);
        if grid.genre_at(cx, cy - 1) == Some(TileGenre::Wall) {
            door.frame = 1;
            turned += 1;
        }
    }
    turned
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::entity::Order;

    #[test]
    fn clear_resets_metadata_and_view() {
        let mut level = Level::new(7);
        level.title = "Keep".to_string();
        level.par_value = 20;
        level.description.push("line".to_string());
        level.set_draw_pos(10, 10);
        level.add_draw_pos(5, -3);
        assert_eq!(level.draw_pos(), (15, 7));
        level.create_new_grid(&mut StdRng::seed_from_u64(1));

        level.clear();
        assert_eq!(level.title, DEFAULT_TITLE);
        assert_eq!(level.par_value, 1);
        assert_eq!(level.time_bonus_limit, 4000);
        assert_eq!(level.draw_pos(), (0, 0));
        assert!(level.grid().is_empty());
        assert_eq!(level.description_line(0), "");
        assert_eq!(level.id(), 7);
    }

    #[test]
    fn saving_without_grid_name_is_refused() {
        let mut level = Level::new(1);
        level.create_new_grid(&mut StdRng::seed_from_u64(1));
        let mut store = crate::store::MemoryStore::new();
        let err = level.save(&mut store).unwrap_err();
        assert_eq!(err.code, crate::error::CoreErrorCode::Consistency);
        assert!(store.scenario(1).is_none());
    }

    #[test]
    fn door_turns_only_below_wall() {
        use crate::tile::{PIX_GRASS1, PIX_WALL1};

        let mut grid = Grid::from_cells(4, 4, vec![PIX_GRASS1; 16]).unwrap();
        grid.set(1, 0, PIX_WALL1);

        let mut entities = EntityCollections::new();
        let below_wall = entities
            .add(&mut StandardFactory, Order::Weapon, FAMILY_DOOR, false)
            .unwrap();
        entities.set_position(below_wall, 16, 16);
        let below_grass = entities
            .add(&mut StandardFactory, Order::Weapon, FAMILY_DOOR, false)
            .unwrap();
        entities.set_position(below_grass, 32, 16);
        let top_row = entities
            .add(&mut StandardFactory, Order::Weapon, FAMILY_DOOR, false)
            .unwrap();
        entities.set_position(top_row, 16, 0);

        assert_eq!(turn_doors_beside_walls(&mut entities, &grid), 1);
        assert_eq!(entities.get(below_wall).unwrap().frame, 1);
        assert_eq!(entities.get(below_grass).unwrap().frame, 0);
        assert_eq!(entities.get(top_row).unwrap().frame, 0);
    }
}
