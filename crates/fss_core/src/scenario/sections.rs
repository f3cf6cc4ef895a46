use std::fmt;
use std::io::{self, Read, Seek};

use crate::entity::{EntityRecord, NAME_LEN, Order, Placement};
use crate::error::CoreError;
use crate::reader::{LittleEndianReader, field_from_text, text_from_field};

use super::types::{
    DESCRIPTION_LINE_MAX, GRID_NAME_LEN, LevelWidth, MAGIC, RESERVED_FILLER, Revision,
    TITLE_LEN, TreasureRoute,
};

fn with_context(err: io::Error, what: impl fmt::Display) -> io::Error {
    io::Error::new(err.kind(), format!("{what}: {err}"))
}

// --- Header: magic tag + version ---

pub fn parse_header<R: Read + Seek>(r: &mut LittleEndianReader<R>) -> io::Result<u8> {
    let magic = r
        .read_array::<3>()
        .map_err(|e| with_context(e, "scenario header"))?;
    if &magic != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("not a scenario file: magic tag {magic:02x?}, expected {MAGIC:02x?}"),
        ));
    }
    r.read_u8().map_err(|e| with_context(e, "scenario version"))
}

pub fn emit_header(out: &mut Vec<u8>, version: u8) {
    out.extend_from_slice(MAGIC);
    out.push(version);
}

// --- Metadata: grid name through entity count ---

/// Header fields as stored; `None` where the revision has no such field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub grid_name: String,
    pub title: Option<String>,
    pub scenario_type: Option<u8>,
    pub par_value: Option<i16>,
    pub time_bonus_limit: Option<i16>,
    pub entity_count: u16,
}

pub fn parse_metadata<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    rev: &Revision,
) -> io::Result<Metadata> {
    let grid_name = r
        .read_fixed_string(GRID_NAME_LEN)
        .map_err(|e| with_context(e, "grid name"))?
        .to_ascii_lowercase();

    let title = if rev.has_title {
        Some(
            r.read_fixed_string(TITLE_LEN)
                .map_err(|e| with_context(e, "title"))?,
        )
    } else {
        None
    };

    let scenario_type = if rev.has_scenario_type {
        Some(r.read_u8().map_err(|e| with_context(e, "scenario type"))?)
    } else {
        None
    };

    let par_value = if rev.has_par {
        Some(r.read_i16().map_err(|e| with_context(e, "par value"))?)
    } else {
        None
    };

    let time_bonus_limit = if rev.has_time_limit {
        Some(r.read_i16().map_err(|e| with_context(e, "time bonus limit"))?)
    } else {
        None
    };

    let entity_count = r.read_u16().map_err(|e| with_context(e, "entity count"))?;

    Ok(Metadata {
        grid_name,
        title,
        scenario_type,
        par_value,
        time_bonus_limit,
        entity_count,
    })
}

/// Current-revision metadata: every optional field is present.
pub fn emit_metadata(
    out: &mut Vec<u8>,
    grid_name: &str,
    title: &str,
    scenario_type: u8,
    par_value: i16,
    time_bonus_limit: i16,
    entity_count: u16,
) {
    out.extend_from_slice(&field_from_text(grid_name, GRID_NAME_LEN));
    out.extend_from_slice(&field_from_text(title, TITLE_LEN));
    out.push(scenario_type);
    out.extend_from_slice(&par_value.to_le_bytes());
    out.extend_from_slice(&time_bonus_limit.to_le_bytes());
    out.extend_from_slice(&entity_count.to_le_bytes());
}

// --- Entities ---

/// A decoded record together with the collection it belongs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedRecord {
    pub record: EntityRecord,
    pub placement: Placement,
}

pub fn placement_for(order: Order, rev: &Revision) -> Placement {
    if order != Order::Treasure {
        return Placement::ByOrder;
    }
    match rev.treasure {
        TreasureRoute::Effects => Placement::Effects,
        TreasureRoute::PrimaryFront => Placement::PrimaryFront,
    }
}

pub fn parse_entities<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    rev: &Revision,
    count: u16,
) -> io::Result<Vec<PlacedRecord>> {
    let record_len = rev.entity_record_len() as u64;
    let mut records = Vec::with_capacity(count as usize);
    for index in 0..count {
        let record = r
            .ensure_remaining(record_len, "entity record")
            .and_then(|()| parse_entity(r, rev))
            .map_err(|e| with_context(e, format_args!("entity {index} of {count}")))?;
        let placement = placement_for(record.order, rev);
        records.push(PlacedRecord { record, placement });
    }
    Ok(records)
}

pub fn parse_entity<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    rev: &Revision,
) -> io::Result<EntityRecord> {
    let order = Order::from_raw(r.read_u8()?);
    let family = r.read_u8()?;
    let x = r.read_i16()?;
    let y = r.read_i16()?;
    let team = r.read_u8()?;
    let facing = r.read_u8()?;
    let command = r.read_u8()?;
    let level = match rev.level {
        LevelWidth::Absent => 0,
        LevelWidth::Byte => u16::from(r.read_u8()?),
        LevelWidth::Word => r.read_u16()?,
    };
    let name = if rev.has_name {
        r.read_fixed_string(NAME_LEN)?
    } else {
        String::new()
    };
    r.skip(rev.reserved_len as u64)?;

    Ok(EntityRecord {
        order,
        family,
        x,
        y,
        team,
        facing,
        command,
        level,
        name,
    })
}

/// Current-revision entity: word level, 12-byte name, 10 reserved bytes.
pub fn emit_entity(out: &mut Vec<u8>, record: &EntityRecord) {
    out.push(record.order.raw());
    out.push(record.family);
    out.extend_from_slice(&record.x.to_le_bytes());
    out.extend_from_slice(&record.y.to_le_bytes());
    out.push(record.team);
    out.push(record.facing);
    out.push(record.command);
    out.extend_from_slice(&record.level.to_le_bytes());
    out.extend_from_slice(&field_from_text(&record.name, NAME_LEN));
    out.extend_from_slice(&RESERVED_FILLER[..10]);
}

// --- Description: counted list of counted lines ---

pub fn parse_description<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
) -> io::Result<Vec<String>> {
    let count = r
        .read_u8()
        .map_err(|e| with_context(e, "description line count"))?;
    let mut lines = Vec::with_capacity(count as usize);
    for index in 0..count {
        let width = r
            .read_u8()
            .map_err(|e| with_context(e, format_args!("description line {index} width")))?;
        if width as usize > DESCRIPTION_LINE_MAX {
            log::debug!("description line {index} is {width} bytes, over {DESCRIPTION_LINE_MAX}");
        }
        let bytes = r
            .read_bytes(width as usize)
            .map_err(|e| with_context(e, format_args!("description line {index}")))?;
        lines.push(text_from_field(&bytes));
    }
    Ok(lines)
}

pub fn emit_description(out: &mut Vec<u8>, lines: &[String]) -> Result<(), CoreError> {
    let Ok(count) = u8::try_from(lines.len()) else {
        return Err(CoreError::consistency(format!(
            "{} description lines, at most {} can be stored",
            lines.len(),
            u8::MAX
        )));
    };
    out.push(count);
    for line in lines {
        let bytes = line.as_bytes();
        let width = bytes.len().min(DESCRIPTION_LINE_MAX);
        out.push(width as u8);
        out.extend_from_slice(&bytes[..width]);
    }
    Ok(())
}
