//! Field specification registry
//!
//! A [`Layout`] maps record-type codes to ordered field lists and to the
//! record-level rules run after those fields. Layouts are immutable once
//! built; the engine only ever sees `&Layout`, so a corrected layout can be
//! swapped in without touching the engine.

mod bradesco;

use crate::field::FieldSpec;
use crate::line::RECORD_LENGTH;
use crate::rules::RecordRule;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

pub use bradesco::{build_bradesco_cnab400, BRADESCO_CNAB400};

/// Header record type
pub const HEADER: char = '0';

/// Detail (título) record type
pub const DETAIL: char = '1';

/// Trailer record type
pub const TRAILER: char = '9';

/// Ordered fields of one record type
#[derive(Debug, Clone, Default)]
pub struct RecordLayout {
    fields: Vec<FieldSpec>,
}

impl RecordLayout {
    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Pairs of fields whose byte ranges intersect
    pub fn overlapping_fields(&self) -> Vec<(&FieldSpec, &FieldSpec)> {
        let mut pairs = Vec::new();
        for (i, a) in self.fields.iter().enumerate() {
            for b in &self.fields[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}

/// Complete file layout
#[derive(Debug, Clone)]
pub struct Layout {
    name: String,
    records: BTreeMap<char, RecordLayout>,
    rules: BTreeMap<char, Vec<RecordRule>>,
    sequence_field: (usize, usize),
    bank_code_field: (usize, usize),
}

impl Layout {
    /// Start building a layout
    pub fn builder(name: &str) -> LayoutBuilder {
        LayoutBuilder::new(name)
    }

    /// Built-in Bradesco CNAB400 layout, built on first use
    pub fn bradesco_cnab400() -> &'static Layout {
        &BRADESCO_CNAB400
    }

    /// Layout name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record layout for a type code
    pub fn record(&self, record_type: char) -> Option<&RecordLayout> {
        self.records.get(&record_type)
    }

    /// Fields for a type code; empty for unknown codes
    pub fn fields(&self, record_type: Option<char>) -> &[FieldSpec] {
        record_type
            .and_then(|rt| self.records.get(&rt))
            .map(RecordLayout::fields)
            .unwrap_or(&[])
    }

    /// Record-level rules for a type code
    pub fn rules(&self, record_type: Option<char>) -> &[RecordRule] {
        record_type
            .and_then(|rt| self.rules.get(&rt))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Registered type codes
    pub fn record_types(&self) -> impl Iterator<Item = char> + '_ {
        self.records.keys().copied()
    }

    /// Byte range of the per-line sequence number
    pub fn sequence_field(&self) -> (usize, usize) {
        self.sequence_field
    }

    /// Byte range of the bank code in the header
    pub fn bank_code_field(&self) -> (usize, usize) {
        self.bank_code_field
    }
}

/// Builder for [`Layout`]
#[derive(Debug)]
pub struct LayoutBuilder {
    name: String,
    records: BTreeMap<char, Vec<FieldSpec>>,
    rules: BTreeMap<char, Vec<RecordRule>>,
    sequence_field: (usize, usize),
    bank_code_field: (usize, usize),
}

impl LayoutBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: BTreeMap::new(),
            rules: BTreeMap::new(),
            sequence_field: (395, 400),
            bank_code_field: (77, 79),
        }
    }

    /// Append fields to a record type
    pub fn record(mut self, record_type: char, fields: Vec<FieldSpec>) -> Self {
        self.records.entry(record_type).or_default().extend(fields);
        self
    }

    /// Register a record-level rule
    pub fn rule(mut self, record_type: char, rule: RecordRule) -> Self {
        self.rules.entry(record_type).or_default().push(rule);
        self
    }

    /// Byte range of the sequence number
    pub fn sequence_field(mut self, start: usize, end: usize) -> Self {
        self.sequence_field = (start, end);
        self
    }

    /// Byte range of the header bank code
    pub fn bank_code_field(mut self, start: usize, end: usize) -> Self {
        self.bank_code_field = (start, end);
        self
    }

    /// Check every registration and freeze the layout
    pub fn build(self) -> Result<Layout> {
        for (start, end) in [self.sequence_field, self.bank_code_field] {
            check_range("layout", start, end)?;
        }

        let mut records = BTreeMap::new();
        for (record_type, fields) in self.records {
            let mut names = HashSet::new();
            let mut starts = HashSet::new();
            for field in &fields {
                check_range(&field.name, field.start, field.end)?;
                if !names.insert(field.name.as_str()) {
                    return Err(Error::Layout(format!(
                        "record {}: field '{}' registered twice",
                        record_type, field.name
                    )));
                }
                if !starts.insert(field.start) {
                    return Err(Error::Layout(format!(
                        "record {}: position {} already used (field '{}')",
                        record_type, field.start, field.name
                    )));
                }
            }

            let record = RecordLayout { fields };
            for (a, b) in record.overlapping_fields() {
                warn!(
                    layout = %self.name,
                    record_type = %record_type,
                    "Fields {} ({}-{}) and {} ({}-{}) overlap",
                    a.name, a.start, a.end, b.name, b.start, b.end
                );
            }
            records.insert(record_type, record);
        }

        Ok(Layout {
            name: self.name,
            records,
            rules: self.rules,
            sequence_field: self.sequence_field,
            bank_code_field: self.bank_code_field,
        })
    }
}

fn check_range(name: &str, start: usize, end: usize) -> Result<()> {
    if start == 0 || end < start || end > RECORD_LENGTH {
        return Err(Error::Layout(format!(
            "'{}': invalid range {}-{}",
            name, start, end
        )));
    }
    Ok(())
}
