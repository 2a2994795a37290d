// SPDX-License-Identifier: Apache-2.0

//! Synthetic signed enclaves. Only the pieces the decoder reads are filled
//! in: the ELF section table, the `.note.sgxmeta` note and the SIGSTRUCT.

#![allow(dead_code)]

pub const SIGSTRUCT_SIZE: usize = 1808;

const HEADER: [u8; 16] = [6, 0, 0, 0, 0xe1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0];
const HEADER2: [u8; 16] = [1, 1, 0, 0, 0x60, 0, 0, 0, 0x60, 0, 0, 0, 1, 0, 0, 0];
const METADATA_MAGIC: u64 = 0x86a8_0294_635d_0e4c;
const METADATA_CSS_OFFSET: usize = 64;
const SHSTRTAB: &[u8] = b"\0.shstrtab\0.note.sgxmeta\0";

/// A raw SIGSTRUCT whose modulus is filled with `modulus_byte`.
pub fn sigstruct(mrenclave: [u8; 32], modulus_byte: u8, isvprodid: u16, isvsvn: u16) -> Vec<u8> {
    let mut css = vec![0u8; SIGSTRUCT_SIZE];
    css[0..16].copy_from_slice(&HEADER);
    css[16..20].copy_from_slice(&0x8086u32.to_le_bytes());
    css[24..40].copy_from_slice(&HEADER2);
    css[128..512].iter_mut().for_each(|b| *b = modulus_byte);
    css[512..516].copy_from_slice(&3u32.to_le_bytes());
    css[960..992].copy_from_slice(&mrenclave);
    css[1024..1026].copy_from_slice(&isvprodid.to_le_bytes());
    css[1026..1028].copy_from_slice(&isvsvn.to_le_bytes());
    css
}

/// A minimal ELF64 shared object carrying `css` in `.note.sgxmeta`.
pub fn enclave_elf(css: &[u8]) -> Vec<u8> {
    let mut metadata = vec![0u8; METADATA_CSS_OFFSET + css.len()];
    metadata[0..8].copy_from_slice(&METADATA_MAGIC.to_le_bytes());
    metadata[8..16].copy_from_slice(&0x0000_0003_0000_0000u64.to_le_bytes());
    let size = metadata.len() as u32;
    metadata[16..20].copy_from_slice(&size.to_le_bytes());
    metadata[METADATA_CSS_OFFSET..].copy_from_slice(css);

    let mut note = Vec::new();
    note.extend(&13u32.to_le_bytes());
    note.extend(&(metadata.len() as u32).to_le_bytes());
    note.extend(&1u32.to_le_bytes());
    note.extend(b"sgx_metadata\0\0\0\0");
    note.extend(&metadata);

    let shstrtab_off = 64usize;
    let note_off = align(shstrtab_off + SHSTRTAB.len(), 8);
    let shoff = align(note_off + note.len(), 8);

    let mut elf = vec![0u8; shoff];
    elf[0..4].copy_from_slice(b"\x7fELF");
    elf[4] = 2; // ELFCLASS64
    elf[5] = 1; // ELFDATA2LSB
    elf[6] = 1;
    elf[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
    elf[18..20].copy_from_slice(&62u16.to_le_bytes()); // EM_X86_64
    elf[20..24].copy_from_slice(&1u32.to_le_bytes());
    elf[0x28..0x30].copy_from_slice(&(shoff as u64).to_le_bytes());
    elf[0x34..0x36].copy_from_slice(&64u16.to_le_bytes());
    elf[0x3a..0x3c].copy_from_slice(&64u16.to_le_bytes());
    elf[0x3c..0x3e].copy_from_slice(&3u16.to_le_bytes());
    elf[0x3e..0x40].copy_from_slice(&1u16.to_le_bytes());

    elf[shstrtab_off..shstrtab_off + SHSTRTAB.len()].copy_from_slice(SHSTRTAB);
    elf[note_off..note_off + note.len()].copy_from_slice(&note);

    elf.extend(vec![0u8; 64]);
    elf.extend(section_header(1, 3, shstrtab_off, SHSTRTAB.len()));
    elf.extend(section_header(11, 7, note_off, note.len()));
    elf
}

fn section_header(name: u32, kind: u32, offset: usize, size: usize) -> Vec<u8> {
    let mut sh = vec![0u8; 64];
    sh[0..4].copy_from_slice(&name.to_le_bytes());
    sh[4..8].copy_from_slice(&kind.to_le_bytes());
    sh[24..32].copy_from_slice(&(offset as u64).to_le_bytes());
    sh[32..40].copy_from_slice(&(size as u64).to_le_bytes());
    sh[48..56].copy_from_slice(&4u64.to_le_bytes());
    sh
}

fn align(n: usize, to: usize) -> usize {
    (n + to - 1) / to * to
}
