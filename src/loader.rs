use std::path::Path;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::bus::Bus;

/// Load hexdump text (`0600: a2 10 a0 0a ...`) onto the bus.
/// Addresses are hex. Returns the first line's address, which is where execution starts.
pub fn load_hexdump(text: &str, bus: &mut Bus) -> Result<u16, String> {
    lazy_static! {
        static ref LINE_RE: Regex =
            Regex::new(r"(?i)^\$?([0-9a-f]{1,4}):((?:\s+[0-9a-f]{2})*)$").unwrap();
    }

    let mut entry: Option<u16> = None;
    for (line_no, raw) in text.lines().enumerate() {
        let line = match raw.find(';') {
            Some(i) => &raw[..i],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let cap = LINE_RE
            .captures(line)
            .ok_or_else(|| format!("line {}: malformed hexdump '{}'", line_no + 1, line))?;
        let addr = u16::from_str_radix(&cap[1], 16)
            .map_err(|e| format!("line {}: bad address: {}", line_no + 1, e))?;
        let bytes = cap[2]
            .split_whitespace()
            .map(|b| u8::from_str_radix(b, 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("line {}: bad byte: {}", line_no + 1, e))?;

        bus.cpu_write_batch(addr, &bytes)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        debug!("loader: {} bytes at ${:04X}", bytes.len(), addr);
        entry.get_or_insert(addr);
    }

    entry.ok_or_else(|| "hexdump contains no code".to_string())
}

pub fn load_hexdump_file<P: AsRef<Path>>(path: P, bus: &mut Bus) -> Result<u16, String> {
    let text = std::fs::read_to_string(&path).map_err(|e| {
        format!(
            "failed to read file {}: {:?}",
            path.as_ref().display(),
            e
        )
    })?;
    load_hexdump(&text, bus)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_single_line() {
        let mut bus = Bus::new();
        let entry = load_hexdump("0600: a2 10 a0 0a 94 00", &mut bus).unwrap();
        assert_eq!(entry, 0x0600);
        assert_eq!(bus.slice(0x0600, 6), &[0xa2, 0x10, 0xa0, 0x0a, 0x94, 0x00]);
    }

    #[test]
    fn test_load_multiple_lines() {
        let text = r"
            ; the countdown, split over two lines
            $0600: a2 10 a0 0a 94 00 e8 88
            0608: C0 00 D0 F8 00   ; BRK
        ";
        let mut bus = Bus::new();
        let entry = load_hexdump(text, &mut bus).unwrap();
        assert_eq!(entry, 0x0600);
        assert_eq!(bus.slice(0x0608, 5), &[0xc0, 0x00, 0xd0, 0xf8, 0x00]);
    }

    #[test]
    fn test_load_errors() {
        let mut bus = Bus::new();
        assert!(load_hexdump("", &mut bus).is_err());
        assert!(load_hexdump("0600 a2 10", &mut bus).is_err());
        assert!(load_hexdump("0600: a2 1", &mut bus).is_err());
        assert!(load_hexdump("0600: zz", &mut bus).is_err());
        let err = load_hexdump("fffe: 01 02 03", &mut bus).unwrap_err();
        assert!(err.starts_with("line 1:"), "{}", err);
    }

    #[test]
    fn test_missing_file() {
        let mut bus = Bus::new();
        assert!(load_hexdump_file("does/not/exist.hex", &mut bus).is_err());
    }
}
