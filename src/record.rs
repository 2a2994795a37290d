// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Serialize, Serializer};

/// A 256-bit enclave measurement, as found in MRENCLAVE and MRSIGNER.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Measurement([u8; 32]);

impl Measurement {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Measurement({})", self)
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity fields of a signed enclave, decoded once from its SIGSTRUCT.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AttestationRecord {
    mrenclave: Measurement,
    mrsigner: Measurement,
    isvprodid: u16,
    isvsvn: u16,
}

impl AttestationRecord {
    pub fn new(mrenclave: Measurement, mrsigner: Measurement, isvprodid: u16, isvsvn: u16) -> Self {
        Self {
            mrenclave,
            mrsigner,
            isvprodid,
            isvsvn,
        }
    }

    pub fn mrenclave(&self) -> Measurement {
        self.mrenclave
    }

    pub fn mrsigner(&self) -> Measurement {
        self.mrsigner
    }

    pub fn isvprodid(&self) -> u16 {
        self.isvprodid
    }

    pub fn isvsvn(&self) -> u16 {
        self.isvsvn
    }
}
