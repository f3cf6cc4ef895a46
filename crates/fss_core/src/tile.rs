// Terrain tile ids as stored in grid files, and the coarse genre each
// belongs to. The genre is what gameplay code and the door fix-up query.

/// Pixel edge length of one grid cell.
pub const TILE_SIZE: i32 = 16;

pub const PIX_GRASS1: u8 = 0;
pub const PIX_GRASS2: u8 = 1;
pub const PIX_GRASS3: u8 = 2;
pub const PIX_GRASS4: u8 = 3;
pub const PIX_GRASS_DARK_1: u8 = 4;
pub const PIX_GRASS_DARK_2: u8 = 5;
pub const PIX_GRASS_LIGHT_1: u8 = 6;

pub const PIX_WATER1: u8 = 10;
pub const PIX_WATER2: u8 = 11;
pub const PIX_WATER3: u8 = 12;
pub const PIX_WATERGRASS_LL: u8 = 13;
pub const PIX_WATERGRASS_LR: u8 = 14;
pub const PIX_WATERGRASS_UL: u8 = 15;
pub const PIX_WATERGRASS_UR: u8 = 16;
pub const PIX_GRASSWATER_LL: u8 = 17;
pub const PIX_GRASSWATER_LR: u8 = 18;
pub const PIX_GRASSWATER_UL: u8 = 19;
pub const PIX_GRASSWATER_UR: u8 = 20;

pub const PIX_WALL1: u8 = 30;
pub const PIX_WALL2: u8 = 31;
pub const PIX_WALL3: u8 = 32;
pub const PIX_WALL4: u8 = 33;
pub const PIX_WALL_LL: u8 = 34;
pub const PIX_WALL_LR: u8 = 35;
pub const PIX_WALL_UL: u8 = 36;
pub const PIX_WALL_UR: u8 = 37;
pub const PIX_H_WALL1: u8 = 38;
pub const PIX_WALLTOP_H: u8 = 39;
pub const PIX_WALLSIDE_L: u8 = 40;
pub const PIX_WALLSIDE_R: u8 = 41;
pub const PIX_WALLSIDE_C: u8 = 42;

pub const PIX_TREE_T1: u8 = 50;
pub const PIX_TREE_M1: u8 = 51;
pub const PIX_TREE_B1: u8 = 52;
pub const PIX_TREE_ML: u8 = 53;
pub const PIX_TREE_MR: u8 = 54;

pub const PIX_DIRT1: u8 = 60;
pub const PIX_DIRT_DARK_1: u8 = 61;
pub const PIX_DIRTGRASS_UL1: u8 = 62;
pub const PIX_DIRTGRASS_UR1: u8 = 63;

pub const PIX_COBBLE_1: u8 = 70;
pub const PIX_COBBLE_2: u8 = 71;
pub const PIX_COBBLE_3: u8 = 72;
pub const PIX_COBBLE_4: u8 = 73;

/// Tiles drawn from, uniformly, whenever fresh terrain is generated.
pub const GRASS_VARIANTS: [u8; 4] = [PIX_GRASS1, PIX_GRASS2, PIX_GRASS3, PIX_GRASS4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileGenre {
    Grass,
    Water,
    Wall,
    Tree,
    Dirt,
    Cobble,
    Unknown,
}

pub fn genre_of(tile: u8) -> TileGenre {
    match tile {
        PIX_GRASS1..=PIX_GRASS_LIGHT_1 => TileGenre::Grass,
        PIX_WATER1..=PIX_GRASSWATER_UR => TileGenre::Water,
        PIX_WALL1..=PIX_WALLSIDE_C => TileGenre::Wall,
        PIX_TREE_T1..=PIX_TREE_MR => TileGenre::Tree,
        PIX_DIRT1..=PIX_DIRTGRASS_UR1 => TileGenre::Dirt,
        PIX_COBBLE_1..=PIX_COBBLE_4 => TileGenre::Cobble,
        _ => TileGenre::Unknown,
    }
}

pub fn is_grass_variant(tile: u8) -> bool {
    GRASS_VARIANTS.contains(&tile)
}
