pub mod sections;
pub mod types;

use std::io::{self, Cursor, Read, Seek};

use crate::entity::EntityRecord;
use crate::error::CoreError;
use crate::layout::{ByteRange, FileLayout, SectionId, SectionLayout};
use crate::reader::LittleEndianReader;
pub use sections::PlacedRecord;
use sections::{
    emit_description, emit_entity, emit_header, emit_metadata, parse_description,
    parse_entities, parse_header, parse_metadata,
};
use types::{
    CURRENT_VERSION, DEFAULT_SCENARIO_TYPE, DEFAULT_TIME_BONUS_LIMIT, DEFAULT_TITLE,
    GRID_FILE_SUFFIX, GRID_NAME_LEN, revision,
};

/// Everything a scenario file holds, converged from whichever revision it
/// was read from. Fields the revision lacks carry their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioData {
    /// Revision the data was decoded from.
    pub version: u8,
    /// Grid resource name without extension, lowercased.
    pub grid_name: String,
    pub title: String,
    pub scenario_type: u8,
    pub par_value: i16,
    pub time_bonus_limit: i16,
    /// Records in file order, each with its destination collection.
    pub entities: Vec<PlacedRecord>,
    pub description: Vec<String>,
}

impl ScenarioData {
    /// Defaults for scenario `scenario_id` before any field is read.
    pub fn new(scenario_id: i32) -> Self {
        Self {
            version: CURRENT_VERSION,
            grid_name: String::new(),
            title: DEFAULT_TITLE.to_string(),
            scenario_type: DEFAULT_SCENARIO_TYPE,
            par_value: default_par_for(scenario_id),
            time_bonus_limit: DEFAULT_TIME_BONUS_LIMIT,
            entities: Vec::new(),
            description: Vec::new(),
        }
    }

    pub fn grid_file_name(&self) -> String {
        grid_file_name(&self.grid_name)
    }
}

/// What a grid name becomes after a write and a read: at most
/// `GRID_NAME_LEN` bytes, cut on a character boundary and at any NUL,
/// lowercased.
pub fn persisted_grid_name(grid_name: &str) -> String {
    let mut end = grid_name.len().min(GRID_NAME_LEN);
    while !grid_name.is_char_boundary(end) {
        end -= 1;
    }
    let stored = grid_name[..end].split('\0').next().unwrap_or_default();
    stored.to_ascii_lowercase()
}

pub fn grid_file_name(grid_name: &str) -> String {
    format!("{grid_name}{GRID_FILE_SUFFIX}")
}

/// Revisions without a par field use the scenario id, saturated to 16 bits.
pub fn default_par_for(scenario_id: i32) -> i16 {
    scenario_id.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

/// Decode a complete scenario file of any supported revision.
pub fn decode(bytes: &[u8], scenario_id: i32) -> io::Result<ScenarioData> {
    let mut r = LittleEndianReader::new(Cursor::new(bytes));
    parse_internal(&mut r, scenario_id, None)
}

/// Encode in the current revision. Records are written in the order given;
/// the caller supplies them primary first, then effects, then weapons.
pub fn encode(data: &ScenarioData) -> Result<Vec<u8>, CoreError> {
    let records: Vec<&EntityRecord> = data.entities.iter().map(|p| &p.record).collect();
    encode_parts(
        &data.grid_name,
        &data.title,
        data.scenario_type,
        data.par_value,
        data.time_bonus_limit,
        &records,
        &data.description,
    )
}

fn encode_parts(
    grid_name: &str,
    title: &str,
    scenario_type: u8,
    par_value: i16,
    time_bonus_limit: i16,
    records: &[&EntityRecord],
    description: &[String],
) -> Result<Vec<u8>, CoreError> {
    let Ok(entity_count) = u16::try_from(records.len()) else {
        return Err(CoreError::consistency(format!(
            "{} entities, at most {} can be stored",
            records.len(),
            u16::MAX
        )));
    };

    let rev = revision(CURRENT_VERSION)
        .ok_or_else(|| CoreError::consistency("current revision missing from table"))?;
    let mut out = Vec::with_capacity(64 + records.len() * rev.entity_record_len());
    emit_header(&mut out, CURRENT_VERSION);
    emit_metadata(
        &mut out,
        grid_name,
        title,
        scenario_type,
        par_value,
        time_bonus_limit,
        entity_count,
    );
    for record in records {
        emit_entity(&mut out, record);
    }
    emit_description(&mut out, description)?;
    Ok(out)
}

/// A decoded scenario plus the byte range each section occupied.
#[derive(Debug)]
pub struct Document {
    pub scenario: ScenarioData,
    layout: FileLayout,
}

#[derive(Default)]
struct Capture {
    sections: Vec<SectionLayout>,
}

impl Capture {
    fn record(&mut self, id: SectionId, start: usize, end: usize) {
        self.sections.push(SectionLayout {
            id,
            range: ByteRange { start, end },
        });
    }
}

impl Document {
    pub fn parse_with_layout<R: Read + Seek>(mut reader: R, scenario_id: i32) -> io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut capture = Capture::default();
        let mut r = LittleEndianReader::new(Cursor::new(bytes.as_slice()));
        let scenario = parse_internal(&mut r, scenario_id, Some(&mut capture))?;

        let consumed = r.position()? as usize;
        let file_len = bytes.len();
        if consumed < file_len {
            capture.record(SectionId::Tail, consumed, file_len);
        }

        let layout = FileLayout {
            file_len,
            sections: capture.sections,
        };
        layout.validate()?;

        Ok(Self { scenario, layout })
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    pub fn version(&self) -> u8 {
        self.scenario.version
    }
}

fn parse_internal<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    scenario_id: i32,
    mut capture: Option<&mut Capture>,
) -> io::Result<ScenarioData> {
    let header_start = r.position()? as usize;
    let version = parse_header(r)?;
    let header_end = r.position()? as usize;
    if let Some(c) = capture.as_deref_mut() {
        c.record(SectionId::Header, header_start, header_end);
    }

    let Some(rev) = revision(version) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("scenario {scenario_id} is version-level {version}, and cannot be read"),
        ));
    };
    log::info!("loading version {version} scenario {scenario_id}");

    let mut data = ScenarioData::new(scenario_id);
    data.version = version;

    let meta_start = header_end;
    let meta = parse_metadata(r, rev)?;
    let meta_end = r.position()? as usize;
    if let Some(c) = capture.as_deref_mut() {
        c.record(SectionId::Metadata, meta_start, meta_end);
    }
    data.grid_name = meta.grid_name;
    if let Some(title) = meta.title {
        data.title = title;
    }
    if let Some(scenario_type) = meta.scenario_type {
        data.scenario_type = scenario_type;
    }
    if let Some(par) = meta.par_value {
        data.par_value = par;
    }
    if let Some(limit) = meta.time_bonus_limit {
        data.time_bonus_limit = limit;
    }

    data.entities = parse_entities(r, rev, meta.entity_count)?;
    let entities_end = r.position()? as usize;
    if let Some(c) = capture.as_deref_mut() {
        c.record(SectionId::Entities, meta_end, entities_end);
    }
    log::debug!(
        "read {} entities ({} bytes each)",
        data.entities.len(),
        rev.entity_record_len()
    );

    if rev.has_description {
        data.description = parse_description(r)?;
    }
    let description_end = r.position()? as usize;
    if let Some(c) = capture.as_deref_mut() {
        c.record(SectionId::Description, entities_end, description_end);
    }

    Ok(data)
}
