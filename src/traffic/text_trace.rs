use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::traffic::error::TraceError;
use crate::traffic::types::Transaction;

/// Reads `<issue cycle> <address> <write flag>` lines.
///
/// Blank lines and lines starting with `#` are skipped.
#[derive(Debug)]
pub struct TextTraceReader<R> {
    inner: R,
    line_no: usize,
    buf: String,
}

impl TextTraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TextTraceReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_no: 0,
            buf: String::new(),
        }
    }

    pub fn next_transaction(&mut self) -> Result<Option<Transaction>, TraceError> {
        loop {
            self.buf.clear();
            if self.inner.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return parse_line(line)
                .map(Some)
                .map_err(|message| TraceError::Parse {
                    line: self.line_no,
                    message,
                });
        }
    }
}

impl<R: BufRead> Iterator for TextTraceReader<R> {
    type Item = Result<Transaction, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_transaction().transpose()
    }
}

fn parse_line(line: &str) -> Result<Transaction, String> {
    let mut fields = line.split_whitespace();
    let mut field = |name: &str| {
        fields
            .next()
            .ok_or_else(|| format!("missing {} field", name))
    };
    let cycle_str = field("cycle")?;
    let addr_str = field("address")?;
    let flag_str = field("write flag")?;

    let added_cycle = cycle_str
        .parse::<u64>()
        .map_err(|e| format!("bad cycle '{}': {}", cycle_str, e))?;
    let addr = parse_addr(addr_str)?;
    let is_write = parse_write_flag(flag_str)?;
    if let Some(extra) = fields.next() {
        return Err(format!("unexpected trailing field '{}'", extra));
    }

    Ok(Transaction::new(addr, is_write, added_cycle))
}

pub fn parse_addr(token: &str) -> Result<u64, String> {
    let lower = token.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else {
        (lower.as_str(), 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|e| format!("bad address '{}': {}", token, e))
}

pub fn parse_write_flag(token: &str) -> Result<bool, String> {
    match token.to_ascii_lowercase().as_str() {
        "1" | "true" | "w" | "write" | "p_mem_wr" | "boff" => Ok(true),
        "0" | "false" | "r" | "read" | "p_mem_rd" | "p_fetch" => Ok(false),
        _ => Err(format!("bad write flag '{}'", token)),
    }
}
