//! Symbol table assembled from the symbol blob and the line table.
//!
//! Built once per executable and immutable afterwards; every query takes
//! `&self`.

use super::pclntab::LineTable;
use super::symtab::{parse_symtab, Sym};
use crate::utils::error::LineTableError;
use log::debug;

/// A function known to the line table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    /// First instruction address
    pub entry: u64,
    /// One past the last instruction address
    pub end: u64,
    pub sym: Sym,
}

impl Func {
    pub fn name(&self) -> &str {
        &self.sym.name
    }

    pub fn contains(&self, pc: u64) -> bool {
        self.entry <= pc && pc < self.end
    }
}

/// Answer to a program counter query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo<'t> {
    /// Source file, empty when unknown
    pub file: String,
    /// Source line, `None` when the table records none
    pub line: Option<u32>,
    /// Enclosing function, `None` outside every known function
    pub func: Option<&'t Func>,
}

/// One program counter of a stack, resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub pc: u64,
    pub file: String,
    pub line: Option<u32>,
    pub function: Option<String>,
    /// Distance from the function entry (the raw pc when unresolved)
    pub offset: u64,
}

impl ResolvedFrame {
    pub fn is_resolved(&self) -> bool {
        self.function.is_some()
    }
}

/// Program counter → source location lookup for one executable
#[derive(Debug, Clone)]
pub struct SymbolTable {
    line_table: LineTable,
    funcs: Vec<Func>,
    syms: Vec<Sym>,
}

impl SymbolTable {
    /// Build a table from raw section bytes
    ///
    /// # Arguments
    /// * `symtab` - symbol blob (may be empty)
    /// * `pclntab` - line table blob
    /// * `text_start` - load address of the code section
    pub fn new(symtab: &[u8], pclntab: &[u8], text_start: u64) -> Result<Self, LineTableError> {
        let syms = parse_symtab(symtab)?;
        let line_table = LineTable::parse(pclntab.to_vec(), text_start)?;

        let funcs = line_table
            .func_records()
            .iter()
            .map(|record| {
                let name = line_table.func_name(record).ok_or(LineTableError::Truncated {
                    what: "function name",
                    offset: 0,
                })?;
                Ok(Func {
                    entry: record.entry,
                    end: record.end,
                    sym: Sym {
                        value: record.entry,
                        kind: 'T',
                        name,
                        go_type: 0,
                    },
                })
            })
            .collect::<Result<Vec<_>, LineTableError>>()?;

        debug!(
            "Symbol table ready: {} functions, {} symbols, text at {:#x}",
            funcs.len(),
            syms.len(),
            text_start
        );

        Ok(Self {
            line_table,
            funcs,
            syms,
        })
    }

    /// Functions in ascending address order
    pub fn funcs(&self) -> &[Func] {
        &self.funcs
    }

    /// Symbols from the symbol blob
    pub fn syms(&self) -> &[Sym] {
        &self.syms
    }

    /// Function containing `pc`
    pub fn pc_to_func(&self, pc: u64) -> Option<&Func> {
        let idx = self.funcs.partition_point(|f| f.entry <= pc);
        let candidate = self.funcs.get(idx.checked_sub(1)?)?;
        candidate.contains(pc).then_some(candidate)
    }

    /// Source file, line and function for `pc`
    pub fn pc_to_line(&self, pc: u64) -> LineInfo<'_> {
        let Some(func) = self.pc_to_func(pc) else {
            return LineInfo {
                file: String::new(),
                line: None,
                func: None,
            };
        };

        LineInfo {
            file: self.line_table.pc_to_file(pc).unwrap_or_default(),
            line: self.line_table.pc_to_line(pc),
            func: Some(func),
        }
    }

    /// First pc attributed to `file:line`, with its function
    pub fn line_to_pc(&self, file: &str, line: u32) -> Option<(u64, &Func)> {
        let pc = self.line_table.line_to_pc(file, line)?;
        Some((pc, self.pc_to_func(pc)?))
    }

    /// Function named `name`
    pub fn lookup_func(&self, name: &str) -> Option<&Func> {
        self.funcs.iter().find(|f| f.sym.name == name)
    }

    /// Symbol named `name`, searching the symbol blob before the functions
    pub fn lookup_sym(&self, name: &str) -> Option<&Sym> {
        self.syms
            .iter()
            .chain(self.funcs.iter().map(|f| &f.sym))
            .find(|s| s.name == name)
    }

    /// Symbol whose value is exactly `addr`
    pub fn sym_by_addr(&self, addr: u64) -> Option<&Sym> {
        self.syms
            .iter()
            .chain(self.funcs.iter().map(|f| &f.sym))
            .find(|s| s.value == addr)
    }

    /// Resolve one program counter into a report frame
    pub fn resolve_pc(&self, pc: u64) -> ResolvedFrame {
        let info = self.pc_to_line(pc);
        match info.func {
            Some(func) => ResolvedFrame {
                pc,
                file: info.file,
                line: info.line,
                function: Some(func.name().to_string()),
                offset: pc - func.entry,
            },
            None => ResolvedFrame {
                pc,
                file: String::new(),
                line: None,
                function: None,
                offset: pc,
            },
        }
    }

    /// Resolve every program counter of a stack, keeping its order
    pub fn resolve_stack(&self, pcs: &[u64]) -> Vec<ResolvedFrame> {
        pcs.iter().map(|&pc| self.resolve_pc(pc)).collect()
    }
}
