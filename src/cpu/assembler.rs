use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use std::collections::HashMap;

use super::addr::AddrMode;
use super::spec::{self, Opcode, Spec};
use super::PROGRAM_START;

pub fn assemble(asm: &str) -> Result<Vec<u8>, String> {
    assemble_with_start_addr(asm, PROGRAM_START)
}

pub fn assemble_with_start_addr(asm: &str, start_addr: u16) -> Result<Vec<u8>, String> {
    let lines = asm.lines().map(|x| x.to_string()).collect();
    let assembler = Assembler::new(lines);
    assembler.assemble(start_addr)
}

struct Assembler {
    lines: Vec<String>,
    label_to_addr: HashMap<String, u16>,
}

impl Assembler {
    fn new(lines: Vec<String>) -> Self {
        Assembler {
            lines,
            label_to_addr: HashMap::new(),
        }
    }

    fn pre_process(&mut self) {
        // remove comments, trim, and to upper case
        for l in self.lines.iter_mut() {
            if let Some(i) = l.find(';') {
                l.truncate(i);
            }
            *l = l.trim().to_uppercase();
        }
        // remove empty lines
        self.lines.retain(|l| !l.is_empty());
    }

    // replace every defined name with its value, whole words only
    fn substitute_params(&mut self) -> Result<(), String> {
        let mut substitutions: Vec<(Regex, String)> = vec![];
        for l in self.lines.iter_mut() {
            if let Ok(Statement::Define { name, value }) = parse_statement(l) {
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))
                    .map_err(|e| format!("bad define name '{}': {}", name, e))?;
                substitutions.push((re, value));
            } else {
                for (re, value) in &substitutions {
                    *l = re.replace_all(l, NoExpand(value)).into_owned();
                }
            }
        }
        Ok(())
    }

    fn assemble(mut self, start_addr: u16) -> Result<Vec<u8>, String> {
        use Statement::*;

        self.pre_process();
        self.substitute_params()?;

        // parse to statements after params replacement
        let mut statements: Vec<Statement> = self
            .lines
            .iter()
            .map(|l| parse_statement(l))
            .collect::<Result<_, _>>()?;

        // calculate addr for labels
        let mut curr_addr = start_addr;
        for s in statements.iter() {
            match s {
                Label { name } => {
                    if self.label_to_addr.insert(name.clone(), curr_addr).is_some() {
                        return Err(format!("label '{}' defined twice", name));
                    }
                }
                Instruction { .. } => {
                    curr_addr = curr_addr.wrapping_add(s.size()? as u16);
                }
                Define { .. } => {}
            }
        }

        // replace label operands with relative or absolute addrs
        let mut curr_addr = start_addr;
        for s in statements.iter_mut() {
            if let Instruction { opcode, .. } = s {
                let opcode = *opcode;
                curr_addr = curr_addr.wrapping_add(s.size()? as u16);
                if let Instruction {
                    operand: Operand::Label(label),
                    ..
                } = s
                {
                    let label_addr = *self
                        .label_to_addr
                        .get(label.as_str())
                        .ok_or_else(|| format!("unknown label '{}'", label))?;
                    let operand = label_to_relative_or_absolute(opcode, curr_addr, label_addr)
                        .map_err(|e| format!("{:?} {}: {}", opcode, label, e))?;
                    *s = Instruction { opcode, operand };
                }
            }
        }

        // assemble each instruction
        let mut result: Vec<u8> = vec![];
        for s in statements.iter() {
            result.extend(s.assemble()?);
        }
        Ok(result)
    }
}

fn label_to_relative_or_absolute(
    opcode: Opcode,
    curr_addr: u16,
    label_addr: u16,
) -> Result<Operand, String> {
    if opcode.is_branch() {
        let offset = label_addr as i32 - curr_addr as i32;
        if offset < i8::MIN as i32 || offset > i8::MAX as i32 {
            return Err(format!("branch offset {} out of range", offset));
        }
        Ok(Operand::Relative(offset as i8))
    } else {
        Ok(Operand::Absolute(label_addr))
    }
}

#[derive(Debug, PartialEq)]
enum Statement {
    Define { name: String, value: String },
    Label { name: String },
    Instruction { opcode: Opcode, operand: Operand },
}

impl Statement {
    // the table row this statement encodes to
    fn spec(&self) -> Result<Option<Spec>, String> {
        match self {
            Statement::Instruction { opcode, operand } => {
                let candidates = operand.addr_modes(*opcode);
                candidates
                    .iter()
                    .find_map(|mode| spec::find_spec(*opcode, *mode))
                    .map(Some)
                    .ok_or_else(|| {
                        format!("{:?} does not support addr mode {:?}", opcode, operand)
                    })
            }
            _ => Ok(None),
        }
    }

    fn size(&self) -> Result<u8, String> {
        Ok(self
            .spec()?
            .map(|spec| 1 + spec.addr_mode.size())
            .unwrap_or(0))
    }

    fn assemble(&self) -> Result<Vec<u8>, String> {
        match (self, self.spec()?) {
            (Statement::Instruction { operand, .. }, Some(spec)) => {
                let mut asm: Vec<u8> = vec![spec.opcode_byte];
                asm.extend(operand.assemble(spec.addr_mode)?);
                Ok(asm)
            }
            _ => Ok(vec![]),
        }
    }
}

fn parse_statement(s: &str) -> Result<Statement, String> {
    lazy_static! {
        static ref DEFINE_RE: Regex = Regex::new(r"(?i)^define\s+(\S+)\s+(\S+)$").unwrap();
        static ref LABEL_RE: Regex = Regex::new(r"(?i)^([a-z_][a-z0-9_]*):$").unwrap();
        static ref INSTRUCTION_RE: Regex = Regex::new(r"(?i)^([a-z]{3})(?:\s+(.*))?$").unwrap();
    }
    if let Some(cap) = DEFINE_RE.captures(s) {
        Ok(Statement::Define {
            name: symbol_name(&cap[1])?,
            value: cap[2].to_string(),
        })
    } else if let Some(cap) = LABEL_RE.captures(s) {
        Ok(Statement::Label {
            name: symbol_name(&cap[1])?,
        })
    } else if let Some(cap) = INSTRUCTION_RE.captures(s) {
        let opcode = Opcode::from_mnemonic(&cap[1])
            .ok_or_else(|| format!("opcode unrecognized: '{}'", s))?;
        let operand_str = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        let operand = parse_operand(operand_str)
            .ok_or_else(|| format!("failed to parse operand in '{}'", s))?;
        Ok(Statement::Instruction { opcode, operand })
    } else {
        Err(format!("failed to parse code '{}'", s))
    }
}

// A, X and Y already mean the accumulator and index registers in operands
fn symbol_name(name: &str) -> Result<String, String> {
    let name = name.to_uppercase();
    match name.as_str() {
        "A" | "X" | "Y" => Err(format!("'{}' is a register and cannot be a name", name)),
        _ => Ok(name),
    }
}

/// An operand as written in the source, before it is matched to an opcode.
#[derive(Debug, PartialEq)]
enum Operand {
    Absolute(u16),
    AbsoluteX(u16),
    AbsoluteY(u16),
    ZeroPage(u8),
    ZeroPageX(u8),
    ZeroPageY(u8),
    Immediate(u8),
    Relative(i8),
    Label(String),
    Implicit,
    Indirect(u16),
    IndexedIndirect(u8),
    IndirectIndexed(u8),
}

impl Operand {
    // addr modes to try, in order; zero page forms widen when the opcode lacks them
    fn addr_modes(&self, opcode: Opcode) -> Vec<AddrMode> {
        use AddrMode::*;
        match self {
            Operand::Absolute(_) => vec![Absolute],
            Operand::AbsoluteX(_) => vec![AbsoluteX],
            Operand::AbsoluteY(_) => vec![AbsoluteY],
            Operand::ZeroPage(_) => vec![ZeroPage, Absolute],
            Operand::ZeroPageX(_) => vec![ZeroPageX, AbsoluteX],
            Operand::ZeroPageY(_) => vec![ZeroPageY, AbsoluteY],
            Operand::Immediate(_) => vec![Immediate],
            Operand::Relative(_) => vec![Relative],
            Operand::Label(_) if opcode.is_branch() => vec![Relative],
            Operand::Label(_) => vec![Absolute],
            Operand::Implicit => vec![Implicit],
            Operand::Indirect(_) => vec![Indirect],
            Operand::IndexedIndirect(_) => vec![IndexedIndirect],
            Operand::IndirectIndexed(_) => vec![IndirectIndexed],
        }
    }

    fn assemble(&self, addr_mode: AddrMode) -> Result<Vec<u8>, String> {
        fn to_little_endian_vec(a: u16) -> Vec<u8> {
            a.to_le_bytes().to_vec()
        }

        let bytes = match self {
            Operand::Absolute(a) | Operand::AbsoluteX(a) | Operand::AbsoluteY(a) => {
                to_little_endian_vec(*a)
            }
            Operand::ZeroPage(a) | Operand::ZeroPageX(a) | Operand::ZeroPageY(a) => {
                if addr_mode.size() == 2 {
                    to_little_endian_vec(*a as u16)
                } else {
                    vec![*a]
                }
            }
            Operand::Immediate(a) => vec![*a],
            Operand::Relative(a) => vec![*a as u8],
            Operand::Label(l) => return Err(format!("label '{}' was never resolved", l)),
            Operand::Implicit => Vec::new(),
            Operand::Indirect(a) => to_little_endian_vec(*a),
            Operand::IndexedIndirect(a) => vec![*a],
            Operand::IndirectIndexed(a) => vec![*a],
        };
        Ok(bytes)
    }
}

fn parse_operand(s: &str) -> Option<Operand> {
    use Operand::*;

    lazy_static! {
        static ref ABSOLUTE_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{3,4})$").unwrap();
        static ref ABSOLUTE_X_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{3,4}),\s*x$").unwrap();
        static ref ABSOLUTE_Y_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{3,4}),\s*y$").unwrap();
        static ref ZERO_PAGE_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{1,2})$").unwrap();
        static ref ZERO_PAGE_X_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{1,2}),\s*x$").unwrap();
        static ref ZERO_PAGE_Y_RE: Regex = Regex::new(r"(?i)^\$([0-9a-f]{1,2}),\s*y$").unwrap();
        static ref IMMEDIATE_HEX_RE: Regex = Regex::new(r"(?i)^#\$([0-9a-f]{1,2})$").unwrap();
        static ref IMMEDIATE_DEC_RE: Regex = Regex::new(r"^#([0-9]{1,3})$").unwrap();
        static ref RELATIVE_RE: Regex = Regex::new(r"^\*([+-][0-9]{1,3})$").unwrap();
        static ref LABEL_RE: Regex = Regex::new(r"(?i)^([a-z_][a-z0-9_]*)$").unwrap();
        static ref ACCUMULATOR_RE: Regex = Regex::new(r"(?i)^a?$").unwrap();
        static ref INDIRECT_RE: Regex = Regex::new(r"(?i)^\(\$([0-9a-f]{3,4})\)$").unwrap();
        static ref INDEXED_INDIRECT_RE: Regex =
            Regex::new(r"(?i)^\(\$([0-9a-f]{1,2}),\s*x\)$").unwrap();
        static ref INDIRECT_INDEXED_RE: Regex =
            Regex::new(r"(?i)^\(\$([0-9a-f]{1,2})\),\s*y$").unwrap();
    }

    let s = s.trim();

    if let Some(a) = hex_u16(&ABSOLUTE_RE, s) {
        Some(Absolute(a))
    } else if let Some(a) = hex_u16(&ABSOLUTE_X_RE, s) {
        Some(AbsoluteX(a))
    } else if let Some(a) = hex_u16(&ABSOLUTE_Y_RE, s) {
        Some(AbsoluteY(a))
    } else if let Some(a) = hex_u8(&ZERO_PAGE_RE, s) {
        Some(ZeroPage(a))
    } else if let Some(a) = hex_u8(&ZERO_PAGE_X_RE, s) {
        Some(ZeroPageX(a))
    } else if let Some(a) = hex_u8(&ZERO_PAGE_Y_RE, s) {
        Some(ZeroPageY(a))
    } else if let Some(v) = hex_u8(&IMMEDIATE_HEX_RE, s) {
        Some(Immediate(v))
    } else if let Some(cap) = IMMEDIATE_DEC_RE.captures(s) {
        cap[1].parse::<u8>().ok().map(Immediate)
    } else if let Some(cap) = RELATIVE_RE.captures(s) {
        cap[1].parse::<i8>().ok().map(Relative)
    } else if ACCUMULATOR_RE.is_match(s) {
        Some(Implicit)
    } else if let Some(cap) = LABEL_RE.captures(s) {
        Some(Label(cap[1].to_uppercase()))
    } else if let Some(a) = hex_u16(&INDIRECT_RE, s) {
        Some(Indirect(a))
    } else if let Some(a) = hex_u8(&INDEXED_INDIRECT_RE, s) {
        Some(IndexedIndirect(a))
    } else if let Some(a) = hex_u8(&INDIRECT_INDEXED_RE, s) {
        Some(IndirectIndexed(a))
    } else {
        None
    }
}

fn hex_u16(re: &Regex, s: &str) -> Option<u16> {
    re.captures(s)
        .and_then(|cap| u16::from_str_radix(&cap[1], 16).ok())
}

fn hex_u8(re: &Regex, s: &str) -> Option<u8> {
    re.captures(s)
        .and_then(|cap| u8::from_str_radix(&cap[1], 16).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_process() {
        let mut assembler = Assembler::new(vec![
            "  ldy #$01".to_string(),
            "  ;;; a comment".to_string(),
            "  Lda #$03 ; a comment".to_string(),
        ]);
        assembler.pre_process();
        assert_eq!(
            assembler.lines,
            vec!["LDY #$01".to_string(), "LDA #$03".to_string()]
        );
    }

    #[test]
    fn test_parse_define_statement() {
        let s = "DEFINE BASE         $10";
        let expected = Statement::Define {
            name: "BASE".to_string(),
            value: "$10".to_string(),
        };
        assert_eq!(parse_statement(s), Ok(expected));
    }

    #[test]
    fn test_parse_label_statement() {
        let s = "LOOP_2:";
        let expected = Statement::Label {
            name: "LOOP_2".to_string(),
        };
        assert_eq!(parse_statement(s), Ok(expected));
    }

    #[test]
    fn test_parse_instruction_statement() {
        use Operand::*;
        use Statement::Instruction;

        let codes = vec![
            "LDY #$0A",
            "STY $00,X",
            "JMP ($00F0)",
            "LDA ($01),Y",
            "STX $0704",
            "ASL A",
            "BRK",
        ];
        let statements = vec![
            Instruction {
                opcode: Opcode::LDY,
                operand: Immediate(0x0a),
            },
            Instruction {
                opcode: Opcode::STY,
                operand: ZeroPageX(0x00),
            },
            Instruction {
                opcode: Opcode::JMP,
                operand: Indirect(0x00f0),
            },
            Instruction {
                opcode: Opcode::LDA,
                operand: IndirectIndexed(0x01),
            },
            Instruction {
                opcode: Opcode::STX,
                operand: Absolute(0x0704),
            },
            Instruction {
                opcode: Opcode::ASL,
                operand: Implicit,
            },
            Instruction {
                opcode: Opcode::BRK,
                operand: Implicit,
            },
        ];
        for (c, s) in codes.iter().zip(statements.into_iter()) {
            assert_eq!(parse_statement(c), Ok(s));
        }
    }

    #[test]
    fn test_parse_statement_errors() {
        assert!(parse_statement("XYZ #$01").is_err());
        assert!(parse_statement("LDA #$100").is_err());
        assert!(parse_statement("LOOP: LDA").is_err());
    }

    #[test]
    fn test_parse_operand() {
        use Operand::*;
        let addrs = vec![
            "$c000", "$c000, X", "$c000, Y", "$c0", "$c0,X", "$c0,Y", "#$c0", "#10", "*+4",
            "LOOP", "", "A", "($c000)", "($c0, X)", "($c0),Y",
        ];
        let modes = vec![
            Absolute(0xc000),
            AbsoluteX(0xc000),
            AbsoluteY(0xc000),
            ZeroPage(0xc0),
            ZeroPageX(0xc0),
            ZeroPageY(0xc0),
            Immediate(0xc0),
            Immediate(10),
            Relative(4i8),
            Label("LOOP".to_string()),
            Implicit,
            Implicit,
            Indirect(0xc000),
            IndexedIndirect(0xc0),
            IndirectIndexed(0xc0),
        ];
        for (addr, mode) in addrs.iter().zip(modes.into_iter()) {
            assert_eq!(parse_operand(addr), Some(mode), "parsing '{}'", addr);
        }
        assert_eq!(parse_operand("#256"), None);
    }

    #[test]
    fn test_assemble_statement() {
        use itertools::izip;

        let codes = vec![
            "LDX #$10",
            "LDY #$0A",
            "STY $00,X",
            "INX",
            "DEY",
            "CPY #$00",
            "STX $0704",
            "LDA ($01),Y",
            "LDX $10,Y",
            "JMP $10",
        ];
        let statements: Vec<Statement> =
            codes.iter().map(|c| parse_statement(c).unwrap()).collect();
        let expected: Vec<Vec<u8>> = vec![
            vec![0xa2, 0x10],
            vec![0xa0, 0x0a],
            vec![0x94, 0x00],
            vec![0xe8],
            vec![0x88],
            vec![0xc0, 0x00],
            vec![0x8e, 0x04, 0x07],
            vec![0xb1, 0x01],
            vec![0xb6, 0x10],
            vec![0x4c, 0x10, 0x00],
        ];
        for (c, s, e) in izip!(codes, statements, expected) {
            assert_eq!(
                s.assemble().unwrap(),
                e,
                "{} was assembled wrong, statement is {:?}",
                c,
                s
            );
        }
    }

    #[test]
    fn test_unsupported_addr_mode() {
        let s = parse_statement("STY $00,Y").unwrap();
        let err = s.assemble().unwrap_err();
        assert!(err.contains("STY"), "{}", err);
    }

    #[test]
    fn test_assemble_with_relative_label() {
        let code = r"
        x:
            BRK
            BRK
            BNE y
        y:
            BRK
            BNE x
        ";
        let expected_bytes_str = "00 00 d0 00 00 d0 f9";
        assert_code_assemble_to(code, expected_bytes_str);
    }

    #[test]
    fn test_assemble_with_absolute_label() {
        let code = r"
            JSR sub
            BRK
        sub:
            RTS
        ";
        assert_code_assemble_to(code, "20 04 06 00 60");
    }

    #[test]
    fn test_assemble_with_define() {
        let code = r"
        define  sysRandom  $fe ; an address
        define  a_dozen    $0c ; a constant

        LDA sysRandom  ; equivalent to 'LDA $fe'

        LDX #a_dozen   ; equivalent to 'LDX #$0c'
        ";
        let expected_bytes_str = "a5 fe a2 0c";
        assert_code_assemble_to(code, expected_bytes_str);
    }

    #[test]
    fn test_define_replaces_whole_words() {
        let code = r"
        define count $0a
        countdown:
            LDY #count
            BNE countdown
        ";
        assert_code_assemble_to(code, "a0 0a d0 fc");
    }

    #[test]
    fn test_assemble_countdown_program() {
        let code = r"
        ; store 10 down to 1 at $10..$19
        define base  $10
        define count $0a

            LDX #base
            LDY #count
        loop:
            STY $00,X
            INX
            DEY
            CPY #$00
            BNE loop
            BRK
        ";
        assert_code_assemble_to(code, "a2 10 a0 0a 94 00 e8 88 c0 00 d0 f8 00");
    }

    #[test]
    fn test_assemble_tab_separated_source() {
        let code = "define\tbase\t$10\n\
                    define\tcount\t$0a\n\
                    \tLDX\t#base\n\
                    \tLDY\t#count\n\
                    loop:\n\
                    \tSTY\t$00,\tX\n\
                    \tINX\n\
                    \tDEY\n\
                    \tCPY\t#$00\n\
                    \tBNE\tloop\n\
                    \tBRK\n";
        assert_code_assemble_to(code, "a2 10 a0 0a 94 00 e8 88 c0 00 d0 f8 00");
    }

    #[test]
    fn test_register_names_are_reserved() {
        let err = assemble("define x $05\nLDA $10,X").unwrap_err();
        assert!(err.contains("'X' is a register"), "{}", err);
        let err = assemble("a:\nJMP a").unwrap_err();
        assert!(err.contains("'A' is a register"), "{}", err);
        assert!(parse_statement("DEFINE Y $01").is_err());

        // longer names that start with a register letter are fine
        assert_code_assemble_to("define xpos $05\nLDA $10,X\nLDX #xpos", "b5 10 a2 05");
    }

    #[test]
    fn test_assemble_errors() {
        assert!(assemble("BNE nowhere").unwrap_err().contains("NOWHERE"));
        assert!(assemble("x:\nx:\nBRK").unwrap_err().contains("twice"));
        assert!(assemble("LDA #$01 garbage").is_err());

        let far = format!("far:\n{}\nBNE far", "NOP\n".repeat(200));
        assert!(assemble(&far).unwrap_err().contains("out of range"));
    }

    // ----- Helper Test Functions -----
    fn assert_code_assemble_to(code_str: &str, expected_bytes_str: &str) {
        let expected_bytes: Vec<u8> = expected_bytes_str
            .split_whitespace()
            .map(|byte_str| u8::from_str_radix(byte_str, 16).unwrap())
            .collect();
        let assembled_bytes = assemble_with_start_addr(code_str, 0x0600u16).unwrap();
        println!("Expected: {:02X?}", expected_bytes);
        println!("Actual:   {:02X?}", assembled_bytes);
        assert_eq!(assembled_bytes, expected_bytes);
    }
}
