use std::fmt;
use std::io;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The parts of a scenario file, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionId {
    /// Magic tag and version byte.
    Header,
    /// Grid name through the entity count; width depends on the revision.
    Metadata,
    Entities,
    Description,
    /// Bytes after the last section the revision defines.
    Tail,
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    pub fn section(&self, id: SectionId) -> Option<&SectionLayout> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Sections must run back to back from byte 0 to the end of the file.
    pub fn validate(&self) -> io::Result<()> {
        if self.sections.is_empty() {
            return Err(invalid("scenario layout has no sections"));
        }

        let mut expected = 0usize;
        for section in &self.sections {
            if section.range.end < section.range.start {
                return Err(invalid(format!(
                    "section {} has a reversed range {}..{}",
                    section.id, section.range.start, section.range.end
                )));
            }
            if section.range.start != expected {
                return Err(invalid(format!(
                    "gap or overlap before section {}: expected start {}, got {}",
                    section.id, expected, section.range.start
                )));
            }
            expected = section.range.end;
        }

        if expected != self.file_len {
            return Err(invalid(format!(
                "sections end at {} but the file is {} bytes",
                expected, self.file_len
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
