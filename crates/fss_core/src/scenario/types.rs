// Scenario file constants and the per-revision record layout table.

pub const MAGIC: &[u8; 3] = b"FSS";

/// Revision written by the encoder.
pub const CURRENT_VERSION: u8 = 9;

pub const GRID_NAME_LEN: usize = 8;
pub const TITLE_LEN: usize = 30;
pub const DESCRIPTION_LINE_MAX: usize = 80;
pub const GRID_FILE_SUFFIX: &str = ".pix";

/// Bytes written into the reserved tail of every entity record.
pub const RESERVED_FILLER: &[u8; 16] = b"MSTRMSTRMSTRMSTR";

pub const DEFAULT_TITLE: &str = "New Level";
pub const DEFAULT_SCENARIO_TYPE: u8 = 0;
pub const DEFAULT_PAR_VALUE: i16 = 1;
pub const DEFAULT_TIME_BONUS_LIMIT: i16 = 4000;

/// order, family, x, y, team, facing, command
pub const ENTITY_FIXED_LEN: usize = 1 + 1 + 2 + 2 + 1 + 1 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelWidth {
    Absent,
    Byte,
    Word,
}

impl LevelWidth {
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Byte => 1,
            Self::Word => 2,
        }
    }
}

/// Where a treasure-order record lands on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasureRoute {
    Effects,
    PrimaryFront,
}

/// Field layout of one on-disk revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub version: u8,
    pub has_title: bool,
    pub has_scenario_type: bool,
    pub has_par: bool,
    pub has_time_limit: bool,
    pub level: LevelWidth,
    pub has_name: bool,
    pub reserved_len: usize,
    pub has_description: bool,
    pub treasure: TreasureRoute,
}

impl Revision {
    pub const fn entity_record_len(&self) -> usize {
        let name = if self.has_name { crate::entity::NAME_LEN } else { 0 };
        ENTITY_FIXED_LEN + self.level.byte_len() + name + self.reserved_len
    }

    pub fn is_current(&self) -> bool {
        self.version == CURRENT_VERSION
    }
}

const fn later(version: u8) -> Revision {
    Revision {
        version,
        has_title: true,
        has_scenario_type: true,
        has_par: version >= 8,
        has_time_limit: version >= 9,
        level: if version >= 7 {
            LevelWidth::Word
        } else {
            LevelWidth::Byte
        },
        has_name: true,
        reserved_len: 10,
        has_description: true,
        treasure: TreasureRoute::Effects,
    }
}

pub const REVISIONS: [Revision; 8] = [
    Revision {
        version: 2,
        has_title: false,
        has_scenario_type: false,
        has_par: false,
        has_time_limit: false,
        level: LevelWidth::Absent,
        has_name: false,
        reserved_len: 11,
        has_description: false,
        treasure: TreasureRoute::Effects,
    },
    // Revision 3 put treasure at the head of the primary list; files of
    // that vintage depend on it.
    Revision {
        version: 3,
        has_title: false,
        has_scenario_type: false,
        has_par: false,
        has_time_limit: false,
        level: LevelWidth::Byte,
        has_name: false,
        reserved_len: 10,
        has_description: true,
        treasure: TreasureRoute::PrimaryFront,
    },
    Revision {
        version: 4,
        has_title: false,
        has_scenario_type: false,
        has_par: false,
        has_time_limit: false,
        level: LevelWidth::Byte,
        has_name: true,
        reserved_len: 10,
        has_description: true,
        treasure: TreasureRoute::Effects,
    },
    Revision {
        version: 5,
        has_title: false,
        has_scenario_type: true,
        has_par: false,
        has_time_limit: false,
        level: LevelWidth::Byte,
        has_name: true,
        reserved_len: 10,
        has_description: true,
        treasure: TreasureRoute::Effects,
    },
    later(6),
    later(7),
    later(8),
    later(9),
];

pub fn revision(version: u8) -> Option<&'static Revision> {
    REVISIONS.iter().find(|rev| rev.version == version)
}

pub fn supported_versions() -> impl Iterator<Item = u8> {
    REVISIONS.iter().map(|rev| rev.version)
}
