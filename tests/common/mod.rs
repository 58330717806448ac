//! Fixture builders shared by the integration tests.
//!
//! Profiles are encoded word by word in any width and byte order. Line
//! tables are laid out the way the Go linker writes them, in each of the
//! supported header generations, with one compilation unit covering every
//! file.

#![allow(dead_code)]

use legacy_cpuprof::parser::WordWidth;
use object::endian::{Endian, Endianness};

/// Encode words with the given width and byte order
pub fn encode_words(words: &[u64], width: WordWidth, order: Endianness) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * width.bytes());
    for &w in words {
        match width {
            WordWidth::Four => out.extend(order.write_u32_bytes(w as u32)),
            WordWidth::Eight => out.extend(order.write_u64_bytes(w)),
        }
    }
    out
}

/// Words of a profile: preamble, header, records and optionally the stop record
pub fn profile_words(period_us: u64, extra: &[u64], records: &[(u64, &[u64])], stop: bool) -> Vec<u64> {
    let mut words = vec![0, 2 + extra.len() as u64, 0, period_us];
    words.extend_from_slice(extra);
    for (count, pcs) in records {
        words.push(*count);
        words.push(pcs.len() as u64);
        words.extend_from_slice(pcs);
    }
    if stop {
        words.extend_from_slice(&[0, 1, 0]);
    }
    words
}

/// Profile bytes in the given layout
pub fn encode_profile(
    width: WordWidth,
    order: Endianness,
    period_us: u64,
    records: &[(u64, &[u64])],
    stop: bool,
) -> Vec<u8> {
    encode_words(&profile_words(period_us, &[0], records, stop), width, order)
}

/// Every width and byte order combination
pub fn all_layouts() -> [(WordWidth, Endianness); 4] {
    [
        (WordWidth::Four, Endianness::Little),
        (WordWidth::Four, Endianness::Big),
        (WordWidth::Eight, Endianness::Little),
        (WordWidth::Eight, Endianness::Big),
    ]
}

/// Header generation of a generated line table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Go12,
    Go116,
    Go118,
    Go120,
}

impl Layout {
    pub fn all() -> [Layout; 4] {
        [Layout::Go12, Layout::Go116, Layout::Go118, Layout::Go120]
    }

    fn magic(self) -> u32 {
        match self {
            Layout::Go12 => 0xffff_fffb,
            Layout::Go116 => 0xffff_fffa,
            Layout::Go118 => 0xffff_fff0,
            Layout::Go120 => 0xffff_fff1,
        }
    }
}

/// One function of a generated line table
#[derive(Debug, Clone)]
pub struct TestFunc {
    pub name: &'static str,
    /// Code size in bytes
    pub size: u64,
    /// `(file index, byte length)` runs from the entry; a negative index names no file
    pub files: Vec<(i32, u64)>,
    /// `(line, byte length)` runs from the entry; bytes past the last run have no line
    pub lines: Vec<(u32, u64)>,
}

/// Builds `.gopclntab` contents for contiguous functions starting at `text_start`
#[derive(Debug, Clone)]
pub struct PclntabBuilder {
    pub layout: Layout,
    pub text_start: u64,
    pub files: Vec<&'static str>,
    pub funcs: Vec<TestFunc>,
}

impl PclntabBuilder {
    pub fn new(layout: Layout, text_start: u64) -> Self {
        Self {
            layout,
            text_start,
            files: Vec::new(),
            funcs: Vec::new(),
        }
    }

    pub fn file(mut self, name: &'static str) -> Self {
        self.files.push(name);
        self
    }

    pub fn func(self, name: &'static str, size: u64, file: usize, lines: &[(u32, u64)]) -> Self {
        self.func_with_files(name, size, &[(file as i32, size)], lines)
    }

    /// A function whose code is split across several file runs
    pub fn func_with_files(
        mut self,
        name: &'static str,
        size: u64,
        files: &[(i32, u64)],
        lines: &[(u32, u64)],
    ) -> Self {
        self.funcs.push(TestFunc {
            name,
            size,
            files: files.to_vec(),
            lines: lines.to_vec(),
        });
        self
    }

    /// Entry address of the `i`th function
    pub fn entry(&self, i: usize) -> u64 {
        self.text_start + self.funcs[..i].iter().map(|f| f.size).sum::<u64>()
    }

    /// One past the last function
    pub fn end(&self) -> u64 {
        self.entry(self.funcs.len())
    }

    pub fn build(&self) -> Vec<u8> {
        match self.layout {
            Layout::Go12 => self.build_go12(),
            _ => self.build_modern(),
        }
    }

    fn header(&self) -> Vec<u8> {
        let mut data = self.layout.magic().to_le_bytes().to_vec();
        data.extend_from_slice(&[0, 0, 1, 8]);
        data
    }

    fn build_modern(&self) -> Vec<u8> {
        let go116 = self.layout == Layout::Go116;
        let nwords = if go116 { 7 } else { 8 };
        let header_len = 8 + nwords * 8;

        let mut funcnametab = Vec::new();
        let mut name_offs = Vec::new();
        for f in &self.funcs {
            name_offs.push(funcnametab.len() as u32);
            funcnametab.extend_from_slice(f.name.as_bytes());
            funcnametab.push(0);
        }

        let mut filetab = Vec::new();
        let mut cutab = Vec::new();
        for name in &self.files {
            cutab.extend((filetab.len() as u32).to_le_bytes());
            filetab.extend_from_slice(name.as_bytes());
            filetab.push(0);
        }

        // Offset 0 of the pc table is reserved for "no table".
        let mut pctab = vec![0u8];
        let mut streams = Vec::new();
        for f in &self.funcs {
            let pcfile = pctab.len() as u32;
            pctab.extend(encode_pcvalue(&f.files));
            let pcln = pctab.len() as u32;
            let lines: Vec<(i32, u64)> = f.lines.iter().map(|&(l, n)| (l as i32, n)).collect();
            pctab.extend(encode_pcvalue(&lines));
            streams.push((pcfile, pcln));
        }

        let n = self.funcs.len();
        let slot = if go116 { 8 } else { 4 };
        let record_len = if go116 { 48 } else { 44 };
        let functab_len = (2 * n + 1) * slot;

        let mut funcdata = Vec::new();
        for i in 0..=n {
            let pc = self.entry(i);
            if go116 {
                funcdata.extend(pc.to_le_bytes());
            } else {
                funcdata.extend(((pc - self.text_start) as u32).to_le_bytes());
            }
            if i < n {
                let off = (functab_len + i * record_len) as u64;
                if go116 {
                    funcdata.extend(off.to_le_bytes());
                } else {
                    funcdata.extend((off as u32).to_le_bytes());
                }
            }
        }
        for (i, (pcfile, pcln)) in streams.iter().enumerate() {
            let start = funcdata.len();
            let entry = self.entry(i);
            if go116 {
                funcdata.extend(entry.to_le_bytes());
            } else {
                funcdata.extend(((entry - self.text_start) as u32).to_le_bytes());
            }
            // nameOff, args, deferreturn, pcsp, pcfile, pcln, npcdata, cuOffset
            for field in [name_offs[i], 0, 0, 0, *pcfile, *pcln, 0, 0] {
                funcdata.extend(field.to_le_bytes());
            }
            funcdata.resize(start + record_len, 0);
        }

        let funcnametab_off = header_len;
        let cutab_off = funcnametab_off + funcnametab.len();
        let filetab_off = cutab_off + cutab.len();
        let pctab_off = filetab_off + filetab.len();
        let funcdata_off = pctab_off + pctab.len();

        let mut words = vec![n as u64, self.files.len() as u64];
        if !go116 {
            words.push(self.text_start);
        }
        words.extend([
            funcnametab_off as u64,
            cutab_off as u64,
            filetab_off as u64,
            pctab_off as u64,
            funcdata_off as u64,
        ]);

        let mut data = self.header();
        for w in words {
            data.extend(w.to_le_bytes());
        }
        data.extend(funcnametab);
        data.extend(cutab);
        data.extend(filetab);
        data.extend(pctab);
        data.extend(funcdata);
        data
    }

    fn build_go12(&self) -> Vec<u8> {
        let n = self.funcs.len();
        let functab_len = (2 * n + 1) * 8;
        let fileoff_pos = 16 + functab_len;

        let mut data = self.header();
        data.extend((n as u64).to_le_bytes());
        data.resize(fileoff_pos + 4, 0);

        let mut name_offs = Vec::new();
        for f in &self.funcs {
            name_offs.push(data.len() as u32);
            data.extend_from_slice(f.name.as_bytes());
            data.push(0);
        }

        let mut file_offs = Vec::new();
        for name in &self.files {
            file_offs.push(data.len() as u32);
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }

        // Slot 0 holds the count; files are numbered from 1.
        let filetab = data.len() as u32;
        data.extend((self.files.len() as u32 + 1).to_le_bytes());
        for off in &file_offs {
            data.extend(off.to_le_bytes());
        }

        let mut streams = Vec::new();
        for f in &self.funcs {
            let pcfile = data.len() as u32;
            let files: Vec<(i32, u64)> = f
                .files
                .iter()
                .map(|&(v, n)| (if v < 0 { v } else { v + 1 }, n))
                .collect();
            data.extend(encode_pcvalue(&files));
            let pcln = data.len() as u32;
            let lines: Vec<(i32, u64)> = f.lines.iter().map(|&(l, n)| (l as i32, n)).collect();
            data.extend(encode_pcvalue(&lines));
            streams.push((pcfile, pcln));
        }

        let mut records = Vec::new();
        for (i, (pcfile, pcln)) in streams.iter().enumerate() {
            records.push(data.len() as u64);
            data.extend(self.entry(i).to_le_bytes());
            // nameOff, args, frame, pcsp, pcfile, pcln, npcdata, nfuncdata
            for field in [name_offs[i], 0, 0, 0, *pcfile, *pcln, 0, 0] {
                data.extend(field.to_le_bytes());
            }
        }

        for i in 0..=n {
            let at = 16 + 2 * i * 8;
            data[at..at + 8].copy_from_slice(&self.entry(i).to_le_bytes());
            if i < n {
                data[at + 8..at + 16].copy_from_slice(&records[i].to_le_bytes());
            }
        }
        data[fileoff_pos..fileoff_pos + 4].copy_from_slice(&filetab.to_le_bytes());
        data
    }
}

/// Encode `(value, byte length)` runs as a pc-value stream with quantum 1
pub fn encode_pcvalue(runs: &[(i32, u64)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = -1i32;
    for &(value, len) in runs {
        let delta = value - prev;
        let zigzag = ((delta << 1) ^ (delta >> 31)) as u32;
        put_varint(&mut out, zigzag);
        put_varint(&mut out, len as u32);
        prev = value;
    }
    out.push(0);
    out
}

fn put_varint(out: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Two functions in two files, the second with a gap in its line table
///
/// | function    | range             | file         | lines            |
/// |-------------|-------------------|--------------|------------------|
/// | `main.main` | 0x401000..0x401040 | /src/main.go | 10 for 0x10, 11, 12 |
/// | `main.work` | 0x401040..0x401060 | /src/work.go | 20 for 0x10, none   |
pub fn sample_pclntab(layout: Layout) -> PclntabBuilder {
    PclntabBuilder::new(layout, 0x401000)
        .file("/src/main.go")
        .file("/src/work.go")
        .func("main.main", 0x40, 0, &[(10, 0x10), (11, 0x10), (12, 0x20)])
        .func("main.work", 0x20, 1, &[(20, 0x10)])
}
