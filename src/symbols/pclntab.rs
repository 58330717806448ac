//! Program counter / line number table (`.gopclntab`).
//!
//! The table holds a sorted function table, per-function metadata records
//! and compact pc-value streams mapping instruction ranges to file and line
//! numbers. Four header layouts exist; all of them are read here.
//!
//! Every offset read from the table is bounds checked. A lookup that runs
//! off the end of the data resolves to "unknown" instead of failing.

use crate::utils::config::{
    PCLNTAB_MAGIC_GO116, PCLNTAB_MAGIC_GO118, PCLNTAB_MAGIC_GO12, PCLNTAB_MAGIC_GO120,
};
use crate::utils::error::LineTableError;
use log::debug;
use object::endian::{Endian, Endianness};
use std::collections::HashMap;

/// Header layout generation of a line table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PclnVersion {
    Go12,
    Go116,
    Go118,
    Go120,
}

/// Location of one function inside the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncRecord {
    pub entry: u64,
    pub end: u64,
    /// Offset of the function's metadata record
    data: usize,
}

// Fields of the per-function metadata record
const FIELD_NAME_OFF: usize = 1;
const FIELD_PCFILE: usize = 5;
const FIELD_PCLN: usize = 6;
const FIELD_CU_OFFSET: usize = 8;

/// Parsed line table
#[derive(Debug, Clone)]
pub struct LineTable {
    data: Vec<u8>,
    version: PclnVersion,
    endian: Endianness,
    quantum: u32,
    ptr_size: usize,
    text_start: u64,
    nfiles: usize,
    funcnametab: usize,
    cutab: usize,
    filetab: usize,
    pctab: usize,
    funcdata: usize,
    functab: usize,
    funcs: Vec<FuncRecord>,
}

impl LineTable {
    /// Parse a line table whose code starts at `text_start`
    ///
    /// # Errors
    /// * `LineTableError::Unsupported` - unknown magic, quantum or pointer size
    /// * `LineTableError::Truncated` - header offsets or the function table
    ///   point past the end of the data
    pub fn parse(data: Vec<u8>, text_start: u64) -> Result<Self, LineTableError> {
        if data.len() < 16 {
            return Err(LineTableError::Truncated {
                what: "line table header",
                offset: data.len(),
            });
        }
        if data[4] != 0 || data[5] != 0 {
            return Err(LineTableError::Unsupported("line table header".to_string()));
        }

        let quantum = u32::from(data[6]);
        let ptr_size = usize::from(data[7]);
        if !matches!(quantum, 1 | 2 | 4) || !matches!(ptr_size, 4 | 8) {
            return Err(LineTableError::Unsupported(format!(
                "line table quantum {} / pointer size {}",
                quantum, ptr_size
            )));
        }

        let magic = [data[0], data[1], data[2], data[3]];
        let (endian, version) = detect_version(magic).ok_or_else(|| {
            LineTableError::Unsupported(format!(
                "line table magic {:#010x}",
                u32::from_le_bytes(magic)
            ))
        })?;

        let mut table = LineTable {
            data,
            version,
            endian,
            quantum,
            ptr_size,
            text_start,
            nfiles: 0,
            funcnametab: 0,
            cutab: 0,
            filetab: 0,
            pctab: 0,
            funcdata: 0,
            functab: 0,
            funcs: Vec::new(),
        };
        table.read_header()?;
        table.funcs = table.read_functab()?;

        debug!(
            "Parsed {:?} line table: {} functions, {} files, pointer size {}",
            table.version,
            table.funcs.len(),
            table.nfiles,
            table.ptr_size
        );

        Ok(table)
    }

    pub fn version(&self) -> PclnVersion {
        self.version
    }

    /// Functions in ascending entry order
    pub fn func_records(&self) -> &[FuncRecord] {
        &self.funcs
    }

    /// Name of the function described by `record`
    pub fn func_name(&self, record: &FuncRecord) -> Option<String> {
        let off = self.field(record.data, FIELD_NAME_OFF)?;
        let start = self.funcnametab.checked_add(off as usize)?;
        self.cstr(start).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Function containing `pc`
    pub fn find_func(&self, pc: u64) -> Option<&FuncRecord> {
        let first = self.funcs.first()?;
        let last = self.funcs.last()?;
        if pc < first.entry || pc >= last.end {
            return None;
        }
        let idx = self.funcs.partition_point(|f| f.entry <= pc);
        self.funcs.get(idx.checked_sub(1)?)
    }

    /// Source line for `pc`, if the table records one
    pub fn pc_to_line(&self, pc: u64) -> Option<u32> {
        let f = self.find_func(pc)?;
        let entry = self.entry_pc(f.data)?;
        let pcln = self.field(f.data, FIELD_PCLN)?;
        let line = self.pcvalue(pcln, entry, pc)?;
        u32::try_from(line).ok()
    }

    /// Source file for `pc`, if the table records one
    pub fn pc_to_file(&self, pc: u64) -> Option<String> {
        let f = self.find_func(pc)?;
        let entry = self.entry_pc(f.data)?;
        let pcfile = self.field(f.data, FIELD_PCFILE)?;
        let fno = self.pcvalue(pcfile, entry, pc)?;

        let name = if self.version == PclnVersion::Go12 {
            if fno <= 0 {
                return None;
            }
            let off = self.u32_at(self.filetab.checked_add(4 * fno as usize)?)?;
            self.cstr(off as usize)?
        } else {
            if fno < 0 {
                return None;
            }
            let cu = self.field(f.data, FIELD_CU_OFFSET)? as usize;
            let slot = cu.checked_add(fno as usize)?.checked_mul(4)?;
            let fnoff = self.u32_at(self.cutab.checked_add(slot)?)?;
            if fnoff == u32::MAX {
                return None;
            }
            self.cstr(self.filetab.checked_add(fnoff as usize)?)?
        };

        Some(String::from_utf8_lossy(name).into_owned())
    }

    /// File names known to the table, keyed to the number pc-file streams use
    pub fn file_numbers(&self) -> HashMap<String, u32> {
        let mut files = HashMap::new();

        if self.version == PclnVersion::Go12 {
            for i in 1..self.nfiles {
                let Some(off) = self.u32_at(self.filetab + 4 * i) else {
                    break;
                };
                if let Some(name) = self.cstr(off as usize) {
                    files.insert(String::from_utf8_lossy(name).into_owned(), i as u32);
                }
            }
        } else {
            let mut pos = 0usize;
            for _ in 0..self.nfiles {
                let Some(name) = self.cstr(self.filetab + pos) else {
                    break;
                };
                files.insert(String::from_utf8_lossy(name).into_owned(), pos as u32);
                pos += name.len() + 1;
            }
        }

        files
    }

    /// First pc attributed to `file:line`
    pub fn line_to_pc(&self, file: &str, line: u32) -> Option<u64> {
        let files = self.file_numbers();
        let filenum = i64::from(*files.get(file)?);
        let line = i32::try_from(line).ok()?;

        for f in &self.funcs {
            let Some(entry) = self.entry_pc(f.data) else {
                continue;
            };
            let (Some(pcfile), Some(pcln)) =
                (self.field(f.data, FIELD_PCFILE), self.field(f.data, FIELD_PCLN))
            else {
                continue;
            };

            let cutab = if self.version >= PclnVersion::Go116 {
                match self.field(f.data, FIELD_CU_OFFSET) {
                    Some(u32::MAX) | None => continue,
                    Some(cu) => self.cutab + cu as usize * 4,
                }
            } else {
                0
            };

            if let Some(pc) = self.find_file_line(entry, pcfile, pcln, filenum, line, cutab) {
                return Some(pc);
            }
        }

        None
    }

    fn find_file_line(
        &self,
        entry: u64,
        pcfile: u32,
        pcln: u32,
        filenum: i64,
        line: i32,
        cutab: usize,
    ) -> Option<u64> {
        if pcfile == 0 || pcln == 0 {
            return None;
        }

        let mut fp = self.pctab.checked_add(pcfile as usize)?;
        let mut fl = self.pctab.checked_add(pcln as usize)?;
        let mut file_val = -1i32;
        let mut file_pc = entry;
        let mut line_val = -1i32;
        let mut line_pc = entry;
        let mut file_start_pc = file_pc;

        loop {
            let first = file_pc == entry;
            if !self.step(&mut fp, &mut file_pc, &mut file_val, first)? {
                break;
            }

            let file_index = if self.version == PclnVersion::Go12 {
                i64::from(file_val)
            } else {
                // A negative file number has no cutab slot; skip the run.
                let Ok(slot) = usize::try_from(file_val) else {
                    file_start_pc = file_pc;
                    continue;
                };
                i64::from(self.u32_at(cutab.checked_add(slot.checked_mul(4)?)?)?)
            };

            if file_index == filenum && file_start_pc < file_pc {
                // The wanted file covers [file_start_pc, file_pc); walk lines inside it.
                let mut line_start_pc = line_pc;
                while line_pc < file_pc {
                    let first = line_pc == entry;
                    if !self.step(&mut fl, &mut line_pc, &mut line_val, first)? {
                        break;
                    }
                    if line_val == line {
                        if file_start_pc <= line_start_pc {
                            return Some(line_start_pc);
                        }
                        if file_start_pc < line_pc {
                            return Some(file_start_pc);
                        }
                    }
                    line_start_pc = line_pc;
                }
            }
            file_start_pc = file_pc;
        }

        None
    }

    fn read_header(&mut self) -> Result<(), LineTableError> {
        let word = |t: &Self, i: usize| -> Result<usize, LineTableError> {
            let off = 8 + i * t.ptr_size;
            t.uint_at(off, t.ptr_size)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or(LineTableError::Truncated {
                    what: "line table header",
                    offset: off,
                })
        };

        match self.version {
            PclnVersion::Go118 | PclnVersion::Go120 => {
                // word 2 is the unrelocated text start; the caller's value wins
                self.nfiles = word(self, 1)?;
                self.funcnametab = word(self, 3)?;
                self.cutab = word(self, 4)?;
                self.filetab = word(self, 5)?;
                self.pctab = word(self, 6)?;
                self.funcdata = word(self, 7)?;
                self.functab = self.funcdata;
            }
            PclnVersion::Go116 => {
                self.nfiles = word(self, 1)?;
                self.funcnametab = word(self, 2)?;
                self.cutab = word(self, 3)?;
                self.filetab = word(self, 4)?;
                self.pctab = word(self, 5)?;
                self.funcdata = word(self, 6)?;
                self.functab = self.funcdata;
            }
            PclnVersion::Go12 => {
                let nfunc = word(self, 0)?;
                self.functab = 8 + self.ptr_size;
                let fileoff_at = self.functab_size(nfunc).and_then(|s| self.functab.checked_add(s));
                let fileoff = fileoff_at.and_then(|at| self.u32_at(at)).ok_or(
                    LineTableError::Truncated {
                        what: "file table offset",
                        offset: fileoff_at.unwrap_or(usize::MAX),
                    },
                )?;
                self.filetab = fileoff as usize;
                self.nfiles = self.u32_at(self.filetab).ok_or(LineTableError::Truncated {
                    what: "file table",
                    offset: self.filetab,
                })? as usize;
            }
        }

        let len = self.data.len();
        for (what, off) in [
            ("function name table", self.funcnametab),
            ("compilation unit table", self.cutab),
            ("file table", self.filetab),
            ("pc table", self.pctab),
            ("function table", self.functab),
        ] {
            if off > len {
                return Err(LineTableError::Truncated { what, offset: off });
            }
        }

        Ok(())
    }

    fn read_functab(&self) -> Result<Vec<FuncRecord>, LineTableError> {
        let nfunc = self
            .uint_at(8, self.ptr_size)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(LineTableError::Truncated {
                what: "function count",
                offset: 8,
            })?;

        let truncated = |offset| LineTableError::Truncated {
            what: "function table",
            offset,
        };

        let size = self.functab_size(nfunc).ok_or(truncated(self.functab))?;
        let end = self.functab.checked_add(size).ok_or(truncated(self.functab))?;
        if end > self.data.len() {
            return Err(truncated(end));
        }

        let mut funcs = Vec::with_capacity(nfunc);
        for i in 0..nfunc {
            let entry = self.func_pc(i).ok_or(truncated(self.functab))?;
            let end = self.func_pc(i + 1).ok_or(truncated(self.functab))?;
            let off = self
                .uint_at(self.functab + (2 * i + 1) * self.field_size(), self.field_size())
                .and_then(|v| usize::try_from(v).ok())
                .ok_or(truncated(self.functab))?;
            let data = self.funcdata.checked_add(off).ok_or(truncated(off))?;
            if data >= self.data.len() {
                return Err(LineTableError::Truncated {
                    what: "function metadata",
                    offset: data,
                });
            }
            funcs.push(FuncRecord { entry, end, data });
        }

        Ok(funcs)
    }

    /// Width of one function table slot
    fn field_size(&self) -> usize {
        if self.version >= PclnVersion::Go118 {
            4
        } else {
            self.ptr_size
        }
    }

    fn functab_size(&self, nfunc: usize) -> Option<usize> {
        nfunc.checked_mul(2)?.checked_add(1)?.checked_mul(self.field_size())
    }

    fn func_pc(&self, i: usize) -> Option<u64> {
        let sz = self.field_size();
        let pc = self.uint_at(self.functab + 2 * i * sz, sz)?;
        if self.version >= PclnVersion::Go118 {
            Some(pc.wrapping_add(self.text_start))
        } else {
            Some(pc)
        }
    }

    fn entry_pc(&self, record: usize) -> Option<u64> {
        if self.version >= PclnVersion::Go118 {
            Some(u64::from(self.u32_at(record)?).wrapping_add(self.text_start))
        } else {
            self.uint_at(record, self.ptr_size)
        }
    }

    /// `n`th 32-bit field of a metadata record; field 0 is the entry
    fn field(&self, record: usize, n: usize) -> Option<u32> {
        let first = if self.version >= PclnVersion::Go118 {
            4
        } else {
            self.ptr_size
        };
        self.u32_at(record.checked_add(first + (n - 1) * 4)?)
    }

    /// Value in effect at `target` in the pc-value stream at `off`
    fn pcvalue(&self, off: u32, entry: u64, target: u64) -> Option<i32> {
        let mut pos = self.pctab.checked_add(off as usize)?;
        let mut val = -1i32;
        let mut pc = entry;

        loop {
            let first = pc == entry;
            if !self.step(&mut pos, &mut pc, &mut val, first)? {
                break;
            }
            if target < pc {
                return Some(val);
            }
        }

        Some(-1)
    }

    /// Advance one (value, pc) pair; `Some(false)` at the end of the stream
    fn step(&self, pos: &mut usize, pc: &mut u64, val: &mut i32, first: bool) -> Option<bool> {
        let uvdelta = self.read_varint(pos)?;
        if uvdelta == 0 && !first {
            return Some(false);
        }
        let vdelta = if uvdelta & 1 != 0 {
            (!(uvdelta >> 1)) as i32
        } else {
            (uvdelta >> 1) as i32
        };
        let pcdelta = self.read_varint(pos)?.wrapping_mul(self.quantum);
        *pc = pc.wrapping_add(u64::from(pcdelta));
        *val = val.wrapping_add(vdelta);
        Some(true)
    }

    fn read_varint(&self, pos: &mut usize) -> Option<u32> {
        let mut value = 0u32;
        let mut shift = 0u32;
        loop {
            let b = *self.data.get(*pos)?;
            *pos += 1;
            if shift >= 32 {
                return None;
            }
            value |= u32::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
        }
    }

    fn bytes<const N: usize>(&self, off: usize) -> Option<[u8; N]> {
        let end = off.checked_add(N)?;
        self.data.get(off..end)?.try_into().ok()
    }

    fn u32_at(&self, off: usize) -> Option<u32> {
        self.bytes::<4>(off).map(|b| self.endian.read_u32_bytes(b))
    }

    fn uint_at(&self, off: usize, size: usize) -> Option<u64> {
        if size == 4 {
            self.u32_at(off).map(u64::from)
        } else {
            self.bytes::<8>(off).map(|b| self.endian.read_u64_bytes(b))
        }
    }

    /// NUL-terminated bytes starting at `off`
    fn cstr(&self, off: usize) -> Option<&[u8]> {
        let rest = self.data.get(off..)?;
        let len = rest.iter().position(|&b| b == 0)?;
        Some(&rest[..len])
    }
}

fn detect_version(magic: [u8; 4]) -> Option<(Endianness, PclnVersion)> {
    let versions = [
        (PCLNTAB_MAGIC_GO12, PclnVersion::Go12),
        (PCLNTAB_MAGIC_GO116, PclnVersion::Go116),
        (PCLNTAB_MAGIC_GO118, PclnVersion::Go118),
        (PCLNTAB_MAGIC_GO120, PclnVersion::Go120),
    ];
    let le = u32::from_le_bytes(magic);
    let be = u32::from_be_bytes(magic);

    versions.iter().find_map(|&(m, version)| {
        if le == m {
            Some((Endianness::Little, version))
        } else if be == m {
            Some((Endianness::Big, version))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_version() {
        assert_eq!(
            detect_version(0xffff_fff1u32.to_le_bytes()),
            Some((Endianness::Little, PclnVersion::Go120))
        );
        assert_eq!(
            detect_version(0xffff_fffbu32.to_be_bytes()),
            Some((Endianness::Big, PclnVersion::Go12))
        );
        assert_eq!(detect_version([1, 2, 3, 4]), None);
    }

    #[test]
    fn test_rejects_short_data() {
        let err = LineTable::parse(vec![0; 8], 0).unwrap_err();
        assert!(matches!(err, LineTableError::Truncated { .. }));
    }

    #[test]
    fn test_rejects_bad_pointer_size() {
        let mut data = vec![0u8; 16];
        data[..4].copy_from_slice(&0xffff_fff1u32.to_le_bytes());
        data[6] = 1;
        data[7] = 3;
        let err = LineTable::parse(data, 0).unwrap_err();
        assert!(matches!(err, LineTableError::Unsupported(_)));
    }

    #[test]
    fn test_rejects_unknown_magic() {
        let mut data = vec![0u8; 16];
        data[..4].copy_from_slice(&0xffff_fffeu32.to_le_bytes());
        data[6] = 1;
        data[7] = 8;
        let err = LineTable::parse(data, 0).unwrap_err();
        assert_eq!(
            err,
            LineTableError::Unsupported("line table magic 0xfffffffe".to_string())
        );
    }

    #[test]
    fn test_step_decodes_zigzag_deltas() {
        // value +11 over 0x10 bytes, value -1 over 0x08 bytes, end
        let table = LineTable {
            data: vec![22, 0x10, 1, 0x08, 0],
            version: PclnVersion::Go120,
            endian: Endianness::Little,
            quantum: 1,
            ptr_size: 8,
            text_start: 0,
            nfiles: 0,
            funcnametab: 0,
            cutab: 0,
            filetab: 0,
            pctab: 0,
            funcdata: 0,
            functab: 0,
            funcs: Vec::new(),
        };

        assert_eq!(table.pcvalue(0, 0x100, 0x100), Some(10));
        assert_eq!(table.pcvalue(0, 0x100, 0x10f), Some(10));
        assert_eq!(table.pcvalue(0, 0x100, 0x110), Some(9));
        assert_eq!(table.pcvalue(0, 0x100, 0x118), Some(-1));
    }

    #[test]
    fn test_varint_overflow_is_rejected() {
        let table = LineTable {
            data: vec![0xff; 8],
            version: PclnVersion::Go120,
            endian: Endianness::Little,
            quantum: 1,
            ptr_size: 8,
            text_start: 0,
            nfiles: 0,
            funcnametab: 0,
            cutab: 0,
            filetab: 0,
            pctab: 0,
            funcdata: 0,
            functab: 0,
            funcs: Vec::new(),
        };
        let mut pos = 0;
        assert_eq!(table.read_varint(&mut pos), None);
    }
}
