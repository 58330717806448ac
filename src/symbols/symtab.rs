//! Symbol blob (`.gosymtab`) parsing and symbol names.
//!
//! Toolchains since the Go 1.3 era leave this section empty and keep every
//! function in the line table. Go 1.2 binaries still carry symbols here, in
//! a compact layout of a type byte, a value, an optional type address and a
//! name. Older layouts predate the supported line table formats and are
//! rejected.

use crate::utils::config::{SYMTAB_MAGIC_BE, SYMTAB_MAGIC_LE};
use crate::utils::error::LineTableError;
use log::debug;
use object::endian::{Endian, Endianness};
use std::collections::HashMap;

/// A named symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sym {
    pub value: u64,
    /// Symbol kind letter (`T` text, `D` data, `f` file name, ...)
    pub kind: char,
    pub name: String,
    pub go_type: u64,
}

impl Sym {
    /// Symbol name with generic instantiation brackets removed
    fn name_without_inst(&self) -> std::borrow::Cow<'_, str> {
        match (self.name.find('['), self.name.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                format!("{}{}", &self.name[..start], &self.name[end + 1..]).into()
            }
            _ => self.name.as_str().into(),
        }
    }

    /// Package path, e.g. `net/http` for `net/http.(*Client).Do`
    pub fn package_name(&self) -> String {
        let name = self.name_without_inst();
        if name.starts_with("go:") || name.starts_with("type:") {
            return String::new();
        }
        let pathend = name.rfind('/').unwrap_or(0);
        match name[pathend..].find('.') {
            Some(i) => name[..pathend + i].to_string(),
            None => String::new(),
        }
    }

    /// Receiver type, e.g. `(*Client)` for `net/http.(*Client).Do`
    pub fn receiver_name(&self) -> String {
        let name = self.name_without_inst();
        let pathend = name.rfind('/').unwrap_or(0);
        let tail = &name[pathend..];
        match (tail.find('.'), tail.rfind('.')) {
            (Some(l), Some(r)) if l != r => {
                // A generic receiver keeps its dots inside the brackets.
                // Offsets come from two spellings of the name and may not
                // land on a char boundary of the original.
                let r = self.name.get(pathend..).and_then(|t| t.rfind('.')).unwrap_or(r);
                self.name
                    .get(pathend + l + 1..pathend + r)
                    .map(str::to_string)
                    .unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    /// Unqualified name, e.g. `Do` for `net/http.(*Client).Do`
    pub fn base_name(&self) -> String {
        let name = self.name_without_inst();
        match name.rfind('.') {
            Some(mut i) => {
                if *name != self.name {
                    let brack = self.name.find('[').unwrap_or(0);
                    if i > brack {
                        i = self.name.rfind('.').unwrap_or(i);
                    }
                }
                self.name[i + 1..].to_string()
            }
            None => self.name.clone(),
        }
    }
}

/// Entry as stored in the blob, before names are resolved
struct RawSym<'a> {
    value: u64,
    kind: u8,
    go_type: u64,
    name: &'a [u8],
}

/// Parse a symbol blob
///
/// # Errors
/// * `LineTableError::Unsupported` - not the Go 1.2 layout
/// * `LineTableError::Truncated` - an entry runs past the end of the data
/// * `LineTableError::BadFileIndex` - a path symbol names an unknown file element
pub fn parse_symtab(data: &[u8]) -> Result<Vec<Sym>, LineTableError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let endian = if data.starts_with(SYMTAB_MAGIC_LE) {
        Endianness::Little
    } else if data.starts_with(SYMTAB_MAGIC_BE) {
        Endianness::Big
    } else {
        return Err(LineTableError::Unsupported("symbol table format".to_string()));
    };

    if data.len() < 8 {
        return Err(LineTableError::Truncated {
            what: "symbol table header",
            offset: data.len(),
        });
    }
    let ptr_size = usize::from(data[7]);
    if ptr_size != 4 && ptr_size != 8 {
        return Err(LineTableError::Unsupported(format!(
            "symbol table pointer size {}",
            ptr_size
        )));
    }

    let raw = walk_entries(data, 8, endian, ptr_size)?;
    let syms = resolve_names(raw)?;

    debug!("Parsed {} symbols from symbol table", syms.len());

    Ok(syms)
}

fn walk_entries(
    data: &[u8],
    start: usize,
    endian: Endianness,
    ptr_size: usize,
) -> Result<Vec<RawSym<'_>>, LineTableError> {
    let mut entries = Vec::new();
    let mut pos = start;

    let truncated = |offset| LineTableError::Truncated {
        what: "symbol table entry",
        offset,
    };
    let fixed = |pos: usize| -> Option<u64> {
        let bytes = data.get(pos..pos + ptr_size)?;
        Some(match ptr_size {
            8 => endian.read_u64_bytes(bytes.try_into().ok()?),
            _ => u64::from(endian.read_u32_bytes(bytes.try_into().ok()?)),
        })
    };

    while pos < data.len() {
        let tag = data[pos];
        let mut kind = tag & 0x3f;
        kind = if kind < 26 { b'A' + kind } else { b'a' + kind - 26 };
        pos += 1;

        let value = if tag & 0x40 != 0 {
            let v = fixed(pos).ok_or(truncated(pos))?;
            pos += ptr_size;
            v
        } else {
            let mut v = 0u64;
            let mut shift = 0u32;
            loop {
                let b = *data.get(pos).ok_or(truncated(pos))?;
                pos += 1;
                if shift < 64 {
                    v |= u64::from(b & 0x7f) << shift;
                }
                if b & 0x80 == 0 {
                    break;
                }
                shift += 7;
            }
            v
        };

        let go_type = if tag & 0x80 != 0 {
            let t = fixed(pos).ok_or(truncated(pos))?;
            pos += ptr_size;
            t
        } else {
            0
        };

        // Plain names end at a NUL; path symbols carry an empty name and then
        // 16-bit element indices ending in a zero pair.
        let rest = &data[pos..];
        let nul = rest.iter().position(|&b| b == 0);
        let name = if kind == b'z' || kind == b'Z' {
            let after = nul.ok_or(truncated(pos))? + 1;
            let elems = &rest[after..];
            let len = elems
                .chunks_exact(2)
                .position(|pair| pair[0] == 0 && pair[1] == 0)
                .ok_or(truncated(pos + after))?
                * 2;
            pos += after + len + 2;
            &elems[..len]
        } else {
            match nul {
                Some(len) => {
                    pos += len + 1;
                    &rest[..len]
                }
                None => {
                    pos = data.len();
                    rest
                }
            }
        };

        entries.push(RawSym {
            value,
            kind,
            go_type,
            name,
        });
    }

    Ok(entries)
}

fn resolve_names(raw: Vec<RawSym<'_>>) -> Result<Vec<Sym>, LineTableError> {
    let mut file_elems: HashMap<u16, String> = HashMap::new();
    let mut syms = Vec::with_capacity(raw.len());

    for entry in raw {
        let name = if entry.kind == b'z' || entry.kind == b'Z' {
            let mut path = String::new();
            for pair in entry.name.chunks_exact(2) {
                let idx = u16::from_be_bytes([pair[0], pair[1]]);
                let elem = file_elems
                    .get(&idx)
                    .ok_or(LineTableError::BadFileIndex(idx))?;
                if !path.is_empty() && !path.ends_with('/') {
                    path.push('/');
                }
                path.push_str(elem);
            }
            path
        } else {
            String::from_utf8_lossy(entry.name).replace('\u{b7}', ".")
        };

        if entry.kind == b'f' {
            file_elems.insert(entry.value as u16, name.clone());
        }

        syms.push(Sym {
            value: entry.value,
            kind: char::from(entry.kind),
            name,
            go_type: entry.go_type,
        });
    }

    Ok(syms)
}
