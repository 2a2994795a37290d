// SPDX-License-Identifier: Apache-2.0

//! Extraction of the enclave SIGSTRUCT from a signed enclave.
//!
//! The Intel SGX SDK signer stores its `metadata_t` in an ELF note named
//! `sgx_metadata` inside the `.note.sgxmeta` section; the SIGSTRUCT
//! (`enclave_css_t`) is embedded in that metadata. A bare SIGSTRUCT, such as
//! the `-cssfile` output of `sgx_sign dump`, is accepted as well.

use std::{
    convert::{TryFrom, TryInto},
    fs, mem,
    path::Path,
};

use mc_sgx_css::Signature;

use crate::error::DecodeError;
use crate::record::{AttestationRecord, Measurement};

pub const SIGSTRUCT_SIZE: usize = mem::size_of::<Signature>();

const ELF_MAGIC: &[u8] = b"\x7fELF";
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const SGXMETA_SECTION: &[u8] = b".note.sgxmeta";
const SGXMETA_NOTE_NAME: &[u8] = b"sgx_metadata";
const METADATA_MAGIC: u64 = 0x86a8_0294_635d_0e4c;
const METADATA_CSS_OFFSET: usize = 64;

/// Source of [`AttestationRecord`]s for enclave files.
pub trait Decoder {
    fn decode(&self, path: &Path) -> Result<AttestationRecord, DecodeError>;
}

/// Reads SIGSTRUCTs straight out of enclave files.
#[derive(Clone, Copy, Debug, Default)]
pub struct SigstructDecoder;

impl Decoder for SigstructDecoder {
    fn decode(&self, path: &Path) -> Result<AttestationRecord, DecodeError> {
        from_enclave_file(path)
    }
}

pub fn from_enclave_file(path: &Path) -> Result<AttestationRecord, DecodeError> {
    let bytes = fs::read(path)?;
    let record = parse(&bytes)?;
    log::debug!("{}: {:?}", path.display(), record);
    Ok(record)
}

/// Decode either a signed ELF enclave or a raw SIGSTRUCT.
pub fn parse(bytes: &[u8]) -> Result<AttestationRecord, DecodeError> {
    let css = if bytes.starts_with(ELF_MAGIC) {
        elf_sigstruct(bytes)?
    } else if bytes.len() == SIGSTRUCT_SIZE {
        bytes
    } else {
        return Err(DecodeError::Format);
    };

    record(css)
}

fn record(css: &[u8]) -> Result<AttestationRecord, DecodeError> {
    let signature =
        Signature::try_from(css).map_err(|err| DecodeError::Sigstruct(err.to_string()))?;

    Ok(AttestationRecord::new(
        measurement(&signature.mrenclave()[..])?,
        measurement(&signature.mrsigner()[..])?,
        signature.product_id().into(),
        signature.version().into(),
    ))
}

fn measurement(bytes: &[u8]) -> Result<Measurement, DecodeError> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| DecodeError::Truncated("SIGSTRUCT measurement"))?;
    Ok(Measurement::new(bytes))
}

fn elf_sigstruct(elf: &[u8]) -> Result<&[u8], DecodeError> {
    if elf.len() < 64 {
        return Err(DecodeError::Truncated("ELF header"));
    }
    if elf[4] != ELFCLASS64 {
        return Err(DecodeError::UnsupportedElf("not ELFCLASS64"));
    }
    if elf[5] != ELFDATA2LSB {
        return Err(DecodeError::UnsupportedElf("not little-endian"));
    }

    let note = section(elf, SGXMETA_SECTION)?.ok_or(DecodeError::MissingMetadata)?;

    let namesz = u32_at(note, 0, "sgxmeta note")? as usize;
    let descsz = u32_at(note, 4, "sgxmeta note")? as usize;
    let name = slice(note, 12, namesz, "sgxmeta note")?;
    if name.strip_suffix(b"\0").unwrap_or(name) != SGXMETA_NOTE_NAME {
        return Err(DecodeError::NoteName);
    }

    let metadata = slice(note, 12 + align4(namesz), descsz, "SGX metadata")?;
    let magic = u64_at(metadata, 0, "SGX metadata")?;
    if magic != METADATA_MAGIC {
        return Err(DecodeError::MetadataMagic(magic));
    }

    slice(metadata, METADATA_CSS_OFFSET, SIGSTRUCT_SIZE, "SIGSTRUCT")
}

/// Contents of the section called `wanted`, if there is one.
fn section<'a>(elf: &'a [u8], wanted: &[u8]) -> Result<Option<&'a [u8]>, DecodeError> {
    let shoff = u64_at(elf, 0x28, "ELF header")? as usize;
    let shentsize = u16_at(elf, 0x3a, "ELF header")? as usize;
    let shnum = u16_at(elf, 0x3c, "ELF header")? as usize;
    let shstrndx = u16_at(elf, 0x3e, "ELF header")? as usize;

    if shentsize < 64 {
        return Err(DecodeError::UnsupportedElf("section header entries too small"));
    }

    let header = |index: usize| -> Result<&'a [u8], DecodeError> {
        let start = index
            .checked_mul(shentsize)
            .and_then(|off| off.checked_add(shoff))
            .ok_or(DecodeError::Truncated("section headers"))?;
        slice(elf, start, 64, "section headers")
    };
    let contents = |sh: &[u8]| -> Result<&'a [u8], DecodeError> {
        let offset = u64_at(sh, 24, "section header")? as usize;
        let size = u64_at(sh, 32, "section header")? as usize;
        slice(elf, offset, size, "section contents")
    };

    let strtab = contents(header(shstrndx)?)?;

    for index in 0..shnum {
        let sh = header(index)?;
        let name_off = u32_at(sh, 0, "section header")? as usize;
        let name = strtab
            .get(name_off..)
            .and_then(|s| s.split(|b| *b == 0).next())
            .ok_or(DecodeError::Truncated("section name table"))?;

        if name == wanted {
            return contents(sh).map(Some);
        }
    }

    Ok(None)
}

fn slice<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or(DecodeError::Truncated(what))
}

fn u16_at(bytes: &[u8], off: usize, what: &'static str) -> Result<u16, DecodeError> {
    let b = slice(bytes, off, 2, what)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(bytes: &[u8], off: usize, what: &'static str) -> Result<u32, DecodeError> {
    let b = slice(bytes, off, 4, what)?;
    Ok(u32::from_le_bytes(b.try_into().map_err(|_| DecodeError::Truncated(what))?))
}

fn u64_at(bytes: &[u8], off: usize, what: &'static str) -> Result<u64, DecodeError> {
    let b = slice(bytes, off, 8, what)?;
    Ok(u64::from_le_bytes(b.try_into().map_err(|_| DecodeError::Truncated(what))?))
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
#[path = "../tests/utils/fixture.rs"]
pub(crate) mod fixture;
