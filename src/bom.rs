//! Bill of materials model
//!
//! Rows have a fixed schema. Every update goes through [`BomRow::set_field`]
//! (or [`BomData::set_field`]) which only accepts a value whose type matches
//! the declared type of the field.

use std::fmt::{self, Display};

use serde::Serialize;

use crate::error::{Error, FieldError};

/// Declared type of a BOM field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Text,
    Integer,
    Flag,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Flag => "flag",
        };
        write!(f, "{}", name)
    }
}

/// A value offered to a BOM field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Flag(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Flag(_) => FieldKind::Flag,
        }
    }

    /// Interpret a spreadsheet cell as a value of the given kind.
    ///
    /// A cell that does not parse stays text, so the type gate drops it.
    pub fn parse_as(kind: FieldKind, cell: &str) -> Self {
        let trimmed = cell.trim();
        match kind {
            FieldKind::Text => FieldValue::Text(cell.to_owned()),
            FieldKind::Integer => trimmed
                .parse()
                .map(FieldValue::Integer)
                .unwrap_or_else(|_| FieldValue::Text(cell.to_owned())),
            FieldKind::Flag => {
                if trimmed.eq_ignore_ascii_case("true") {
                    FieldValue::Flag(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    FieldValue::Flag(false)
                } else {
                    FieldValue::Text(cell.to_owned())
                }
            }
        }
    }

    fn into_text(self, field: &'static str) -> Result<String, FieldError> {
        match self {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch(field, FieldKind::Text, &other)),
        }
    }

    fn into_integer(self, field: &'static str) -> Result<i64, FieldError> {
        match self {
            FieldValue::Integer(n) => Ok(n),
            other => Err(mismatch(field, FieldKind::Integer, &other)),
        }
    }

    fn into_flag(self, field: &'static str) -> Result<bool, FieldError> {
        match self {
            FieldValue::Flag(b) => Ok(b),
            other => Err(mismatch(field, FieldKind::Flag, &other)),
        }
    }
}

fn mismatch(field: &'static str, expected: FieldKind, found: &FieldValue) -> FieldError {
    FieldError::TypeMismatch {
        field,
        expected,
        found: found.kind(),
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Something with named, typed fields that can be updated from loose key/value pairs
pub trait FieldRecord {
    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError>;

    /// Apply all pairs, returning the ones that were dropped
    fn update<I, K>(&mut self, fields: I) -> Vec<FieldError>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        fields
            .into_iter()
            .filter_map(|(key, value)| self.set_field(key.as_ref(), value).err())
            .collect()
    }
}

/// The columns of a BOM row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BomField {
    PartNumber,
    Value,
    Footprint,
    Quantity,
    Description,
    Voltage,
    Dielectric,
    ManufacturerPartNumber,
    Comment,
    Designator,
    HelpUrl,
    Index,
    IsTypeBom,
    Symbol,
}

impl BomField {
    pub const ALL: [BomField; 14] = [
        BomField::PartNumber,
        BomField::Value,
        BomField::Footprint,
        BomField::Quantity,
        BomField::Description,
        BomField::Voltage,
        BomField::Dielectric,
        BomField::ManufacturerPartNumber,
        BomField::Comment,
        BomField::Designator,
        BomField::HelpUrl,
        BomField::Index,
        BomField::IsTypeBom,
        BomField::Symbol,
    ];

    /// Column name used by the EDA exports
    pub fn name(self) -> &'static str {
        match self {
            BomField::PartNumber => "Part Number",
            BomField::Value => "Value",
            BomField::Footprint => "Footprint",
            BomField::Quantity => "Quantity",
            BomField::Description => "Description",
            BomField::Voltage => "Voltage",
            BomField::Dielectric => "Dielectric",
            BomField::ManufacturerPartNumber => "Manufacturer Part Number",
            BomField::Comment => "Comment",
            BomField::Designator => "Designator",
            BomField::HelpUrl => "HelpURL",
            BomField::Index => "Index",
            BomField::IsTypeBom => "isTypeBom",
            BomField::Symbol => "Symbol",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            BomField::Quantity | BomField::Index => FieldKind::Integer,
            BomField::IsTypeBom => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

/// One line of the bill of materials
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BomRow {
    #[serde(rename = "Part Number")]
    pub part_number: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Footprint")]
    pub footprint: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Voltage")]
    pub voltage: String,
    #[serde(rename = "Dielectric")]
    pub dielectric: String,
    #[serde(rename = "Manufacturer Part Number")]
    pub manufacturer_part_number: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Designator")]
    pub designator: String,
    #[serde(rename = "HelpURL")]
    pub help_url: String,
    /// Position assigned when the row is appended to [`BomRows`]
    #[serde(rename = "Index")]
    pub index: Option<usize>,
    #[serde(rename = "isTypeBom")]
    pub is_type_bom: bool,
    #[serde(rename = "Symbol")]
    pub symbol: String,
}

impl Default for BomRow {
    fn default() -> Self {
        Self {
            part_number: String::new(),
            value: String::new(),
            footprint: String::new(),
            quantity: 0,
            description: String::new(),
            voltage: String::new(),
            dielectric: String::new(),
            manufacturer_part_number: String::new(),
            comment: String::new(),
            designator: String::new(),
            help_url: String::new(),
            index: None,
            is_type_bom: true,
            symbol: String::new(),
        }
    }
}

impl BomRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from loose fields, returning the dropped ones alongside it
    pub fn from_fields<I, K>(fields: I) -> (Self, Vec<FieldError>)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        let mut row = Self::default();
        let errors = row.update(fields);
        (row, errors)
    }

    /// Current value of a field, `None` only for an unassigned index
    pub fn get(&self, field: BomField) -> Option<FieldValue> {
        let value: FieldValue = match field {
            BomField::PartNumber => self.part_number.as_str().into(),
            BomField::Value => self.value.as_str().into(),
            BomField::Footprint => self.footprint.as_str().into(),
            BomField::Quantity => self.quantity.into(),
            BomField::Description => self.description.as_str().into(),
            BomField::Voltage => self.voltage.as_str().into(),
            BomField::Dielectric => self.dielectric.as_str().into(),
            BomField::ManufacturerPartNumber => self.manufacturer_part_number.as_str().into(),
            BomField::Comment => self.comment.as_str().into(),
            BomField::Designator => self.designator.as_str().into(),
            BomField::HelpUrl => self.help_url.as_str().into(),
            BomField::Index => FieldValue::Integer(self.index? as i64),
            BomField::IsTypeBom => self.is_type_bom.into(),
            BomField::Symbol => self.symbol.as_str().into(),
        };
        Some(value)
    }

    pub fn set(&mut self, field: BomField, value: FieldValue) -> Result<(), FieldError> {
        let name = field.name();
        match field {
            BomField::PartNumber => self.part_number = value.into_text(name)?,
            BomField::Value => self.value = value.into_text(name)?,
            BomField::Footprint => self.footprint = value.into_text(name)?,
            BomField::Quantity => self.quantity = value.into_integer(name)?,
            BomField::Description => self.description = value.into_text(name)?,
            BomField::Voltage => self.voltage = value.into_text(name)?,
            BomField::Dielectric => self.dielectric = value.into_text(name)?,
            BomField::ManufacturerPartNumber => {
                self.manufacturer_part_number = value.into_text(name)?
            }
            BomField::Comment => self.comment = value.into_text(name)?,
            BomField::Designator => self.designator = value.into_text(name)?,
            BomField::HelpUrl => self.help_url = value.into_text(name)?,
            BomField::Index => {
                let n = value.into_integer(name)?;
                let index = usize::try_from(n)
                    .map_err(|_| FieldError::OutOfRange { field: name, value: n })?;
                self.index = Some(index);
            }
            BomField::IsTypeBom => self.is_type_bom = value.into_flag(name)?,
            BomField::Symbol => self.symbol = value.into_text(name)?,
        }
        Ok(())
    }
}

impl FieldRecord for BomRow {
    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        let field =
            BomField::from_name(key).ok_or_else(|| FieldError::UnknownField(key.to_owned()))?;
        self.set(field, value)
    }
}

impl Display for BomRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in BomField::ALL.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.get(field) {
                Some(FieldValue::Text(s)) => write!(f, "{}: {}", field.name(), s)?,
                Some(FieldValue::Integer(n)) => write!(f, "{}: {}", field.name(), n)?,
                Some(FieldValue::Flag(b)) => write!(f, "{}: {}", field.name(), b)?,
                None => write!(f, "{}: -", field.name())?,
            }
        }
        Ok(())
    }
}

/// Strip the room letter from a designator, `C10A` becomes `C10`
///
/// Only a purely alphabetic tail after the last digit is removed.
pub fn normalize_designator(designator: &str) -> &str {
    let Some((pos, digit)) = designator
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_numeric())
    else {
        return designator;
    };
    let end = pos + digit.len_utf8();
    let tail = &designator[end..];
    if !tail.is_empty() && tail.chars().all(char::is_alphabetic) {
        &designator[..end]
    } else {
        designator
    }
}

/// Ordered BOM rows
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BomRows {
    rows: Vec<BomRow>,
}

impl BomRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, assigning it the next index
    pub fn append(&mut self, mut row: BomRow) {
        row.index = Some(self.rows.len());
        self.rows.push(row);
    }

    /// Add the component `designator` unless its normalized designator already has a row.
    ///
    /// Room-lettered siblings (`C10A`, `C10B`) collapse into the first one seen.
    pub fn append_by_designator<I, K>(&mut self, designator: &str, fields: I) -> Vec<FieldError>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        let designator = normalize_designator(designator);
        if self.position(designator).is_some() {
            return vec![];
        }
        let (mut row, errors) = BomRow::from_fields(fields);
        row.designator = designator.to_owned();
        row.quantity = 1;
        self.append(row);
        errors
    }

    pub fn fetch_row_by_designator(&self, designator: &str) -> Option<&BomRow> {
        self.position(designator).map(|i| &self.rows[i])
    }

    fn position(&self, designator: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.designator == designator)
    }

    pub fn get(&self, index: usize) -> Option<&BomRow> {
        self.rows.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut BomRow> {
        self.rows.get_mut(index)
    }

    /// Remove the row at `index`; the remaining rows keep their indices
    pub fn delete(&mut self, index: usize) -> Option<BomRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Append all rows of `other`, indexing them after the existing rows
    pub fn extend(&mut self, other: BomRows) {
        for row in other.rows {
            self.append(row);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BomRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<BomRow> for BomRows {
    fn from_iter<T: IntoIterator<Item = BomRow>>(iter: T) -> Self {
        let mut rows = BomRows::new();
        for row in iter {
            rows.append(row);
        }
        rows
    }
}

impl<'a> IntoIterator for &'a BomRows {
    type Item = &'a BomRow;
    type IntoIter = std::slice::Iter<'a, BomRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Project level BOM metadata
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BomData {
    pub project: String,
    pub equipment: String,
    pub batch_number: String,
    pub variant: String,
    pub git_hash: String,
    pub gerber_version: String,
}

impl BomData {
    pub const FIELD_NAMES: [&'static str; 6] = [
        "Project",
        "Equipment",
        "BatchNumber",
        "Variant",
        "GitHash",
        "GerberVersion",
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn slot(&mut self, key: &str) -> Option<(&'static str, &mut String)> {
        let slot = match key {
            "Project" => ("Project", &mut self.project),
            "Equipment" => ("Equipment", &mut self.equipment),
            "BatchNumber" => ("BatchNumber", &mut self.batch_number),
            "Variant" => ("Variant", &mut self.variant),
            "GitHash" => ("GitHash", &mut self.git_hash),
            "GerberVersion" => ("GerberVersion", &mut self.gerber_version),
            _ => return None,
        };
        Some(slot)
    }
}

impl FieldRecord for BomData {
    fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), FieldError> {
        let (name, slot) = self
            .slot(key)
            .ok_or_else(|| FieldError::UnknownField(key.to_owned()))?;
        *slot = value.into_text(name)?;
        Ok(())
    }
}

impl Display for BomData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = [
            &self.project,
            &self.equipment,
            &self.batch_number,
            &self.variant,
            &self.git_hash,
            &self.gerber_version,
        ];
        for (i, (name, value)) in Self::FIELD_NAMES.iter().zip(values).enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

/// A bill of materials
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Bom {
    pub data: BomData,
    pub rows: BomRows,
}

impl Bom {
    pub fn new(data: BomData, rows: BomRows) -> Self {
        Self { data, rows }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Display for Bom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | Rows: {}", self.data, self.rows.len())
    }
}
