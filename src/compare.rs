// SPDX-License-Identifier: Apache-2.0

//! Field-by-field comparison of two [`AttestationRecord`]s.

use std::fmt;

use serde::{ser::SerializeSeq, Serialize, Serializer};

use crate::record::{AttestationRecord, Measurement};

/// The compared identity fields, in canonical report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    MrEnclave,
    IsvProdId,
    IsvSvn,
    MrSigner,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::MrEnclave,
        Field::IsvProdId,
        Field::IsvSvn,
        Field::MrSigner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::MrEnclave => "mrenclave",
            Field::IsvProdId => "isvprodid",
            Field::IsvSvn => "isvsvn",
            Field::MrSigner => "mrsigner",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One field's expected and computed values. `matches` is derived on
/// construction and cannot disagree with the two values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldComparison<T> {
    matches: bool,
    expected: T,
    computed: T,
}

impl<T: PartialEq + Copy> FieldComparison<T> {
    pub fn new(expected: T, computed: T) -> Self {
        Self {
            matches: expected == computed,
            expected,
            computed,
        }
    }

    pub fn matches(&self) -> bool {
        self.matches
    }

    pub fn expected(&self) -> T {
        self.expected
    }

    pub fn computed(&self) -> T {
        self.computed
    }
}

/// A field value in its natural representation: measurements print as
/// lowercase hex, integers as decimal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bytes(Measurement),
    Int(u16),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(m) => write!(f, "{}", m),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

/// A type-erased view of one report field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Entry {
    #[serde(rename = "field_name")]
    pub field: Field,
    pub matches: bool,
    pub expected: Value,
    pub computed: Value,
}

impl Entry {
    fn new<T: Into<Value> + PartialEq + Copy>(field: Field, cmp: &FieldComparison<T>) -> Self {
        Self {
            field,
            matches: cmp.matches(),
            expected: cmp.expected().into(),
            computed: cmp.computed().into(),
        }
    }
}

impl From<Measurement> for Value {
    fn from(m: Measurement) -> Self {
        Value::Bytes(m)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(n)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReproducibilityReport {
    mrenclave: FieldComparison<Measurement>,
    isvprodid: FieldComparison<u16>,
    isvsvn: FieldComparison<u16>,
    mrsigner: FieldComparison<Measurement>,
}

impl ReproducibilityReport {
    pub fn mrenclave(&self) -> &FieldComparison<Measurement> {
        &self.mrenclave
    }

    pub fn isvprodid(&self) -> &FieldComparison<u16> {
        &self.isvprodid
    }

    pub fn isvsvn(&self) -> &FieldComparison<u16> {
        &self.isvsvn
    }

    pub fn mrsigner(&self) -> &FieldComparison<Measurement> {
        &self.mrsigner
    }

    pub fn entry(&self, field: Field) -> Entry {
        match field {
            Field::MrEnclave => Entry::new(field, self.mrenclave()),
            Field::IsvProdId => Entry::new(field, self.isvprodid()),
            Field::IsvSvn => Entry::new(field, self.isvsvn()),
            Field::MrSigner => Entry::new(field, self.mrsigner()),
        }
    }

    /// All four entries in canonical order.
    pub fn entries(&self) -> Vec<Entry> {
        Field::ALL.iter().map(|f| self.entry(*f)).collect()
    }

    pub fn mismatches(&self) -> Vec<Field> {
        self.entries()
            .into_iter()
            .filter(|e| !e.matches)
            .map(|e| e.field)
            .collect()
    }

    pub fn is_reproducible(&self) -> bool {
        self.entries().iter().all(|e| e.matches)
    }
}

impl Serialize for ReproducibilityReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(Field::ALL.len()))?;
        for entry in self.entries().iter() {
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }
}

pub fn compare(expected: &AttestationRecord, computed: &AttestationRecord) -> ReproducibilityReport {
    ReproducibilityReport {
        mrenclave: FieldComparison::new(expected.mrenclave(), computed.mrenclave()),
        isvprodid: FieldComparison::new(expected.isvprodid(), computed.isvprodid()),
        isvsvn: FieldComparison::new(expected.isvsvn(), computed.isvsvn()),
        mrsigner: FieldComparison::new(expected.mrsigner(), computed.mrsigner()),
    }
}
