use itertools::Itertools;

use super::addr::Address;
use super::spec::{self, Opcode};
use super::Instruction;
use super::CPU;

impl CPU {
    /// One nestest-style log line describing the instruction at `pc` and the registers
    /// before it runs.
    pub fn trace(&mut self) -> String {
        let pc = self.pc;
        let (inst_bytes_str, asm) = match self.peak_next_instruction() {
            Ok(inst) => {
                let size = inst.spec.addr_mode.size() as u16;
                let bytes_str = (0..=size)
                    .map(|i| format!("{:02X}", self.read(pc.wrapping_add(i))))
                    .join(" ");
                (bytes_str, self.disassemble(&inst))
            }
            Err(_) => (format!("{:02X}", self.read(pc)), " ???".to_string()),
        };
        format!(
            "{:04X}  {:8} {:31}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            inst_bytes_str,
            asm,
            self.acc,
            self.reg_x,
            self.reg_y,
            self.status.bits(),
            self.sp,
            self.total_cycles
        )
    }

    fn disassemble(&self, inst: &Instruction) -> String {
        use super::spec::Opcode::*;
        use super::AddrMode::*;

        let mut asm: String = format!(" {:?} ", inst.spec.opcode);

        let next_u8: u8 = self.read(self.pc.wrapping_add(1));
        let next_u16: u16 = self.read_u16(self.pc.wrapping_add(1));
        let oprands_asm: String = match inst.spec.addr_mode {
            Absolute => match inst.spec.opcode {
                JMP | JSR => format!("${:04X}", inst.oprand_addr),
                _ => format!(
                    "${:04X} = {:02X}",
                    inst.oprand_addr,
                    self.read(inst.oprand_addr)
                ),
            },
            AbsoluteX => format!(
                "${:04X},X @ {:04X} = {:02X}",
                next_u16,
                inst.oprand_addr,
                self.read(inst.oprand_addr)
            ),
            AbsoluteY => format!(
                "${:04X},Y @ {:04X} = {:02X}",
                next_u16,
                inst.oprand_addr,
                self.read(inst.oprand_addr)
            ),
            ZeroPage => format!(
                "${:02X} = {:02X}",
                inst.oprand_addr,
                self.read(inst.oprand_addr)
            ),
            ZeroPageX => format!(
                "${:02X},X @ {:02X} = {:02X}",
                next_u8,
                inst.oprand_addr as u8,
                self.read(inst.oprand_addr)
            ),
            ZeroPageY => format!(
                "${:02X},Y @ {:02X} = {:02X}",
                next_u8,
                inst.oprand_addr as u8,
                self.read(inst.oprand_addr)
            ),
            Immediate => format!("#${:02X}", self.read(inst.oprand_addr)),
            Relative => format!("${:04X}", inst.oprand_addr),
            Implicit if inst.spec.opcode.is_shift() => "A".to_string(),
            Implicit => "".to_string(),
            Indirect => format!("(${:04X}) = {:04X}", next_u16, inst.oprand_addr),
            IndexedIndirect => format!(
                "(${:02X},X) @ {:02X} = {:04X} = {:02X}",
                next_u8,
                next_u8.wrapping_add(self.reg_x),
                inst.oprand_addr,
                self.read(inst.oprand_addr)
            ),
            IndirectIndexed => format!(
                "(${:02X}),Y = {:04X} @ {:04X} = {:02X}",
                next_u8,
                self.read_u16_zero_page(next_u8),
                inst.oprand_addr,
                self.read(inst.oprand_addr)
            ),
        };

        asm.push_str(&oprands_asm);
        asm
    }
}

/// Static disassembly of `bytes` as if loaded at `start_addr`, one line per instruction.
/// Bytes that are not an opcode, or a truncated final instruction, come out as `.BYTE`.
pub fn listing(bytes: &[u8], start_addr: u16) -> Vec<String> {
    let opcode_to_spec = spec::opcode_to_spec();
    let mut lines = vec![];
    let mut offset = 0usize;
    while offset < bytes.len() {
        let addr = start_addr.wrapping_add(offset as u16);
        let opcode_byte = bytes[offset];
        let decoded = opcode_to_spec.get(&opcode_byte).and_then(|spec| {
            spec.addr_mode
                .fetch(bytes[offset + 1..].iter())
                .map(|address| (spec, address))
        });
        let (size, asm) = match decoded {
            Some((spec, address)) => {
                let size = 1 + spec.addr_mode.size() as usize;
                (size, format_operand(spec.opcode, &address, addr, size))
            }
            None => (1, format!(".BYTE ${:02X}", opcode_byte)),
        };
        let bytes_str = bytes[offset..offset + size]
            .iter()
            .map(|b| format!("{:02X}", b))
            .join(" ");
        lines.push(format!("${:04X}  {:8}  {}", addr, bytes_str, asm));
        offset += size;
    }
    lines
}

fn format_operand(opcode: Opcode, address: &Address, addr: u16, size: usize) -> String {
    match address {
        Address::Relative(r) => {
            let target = addr.wrapping_add(size as u16).wrapping_add(*r as u16);
            format!("{:?} ${:04X}", opcode, target)
        }
        Address::Implicit if opcode.is_shift() => format!("{:?} A", opcode),
        Address::Implicit => format!("{:?}", opcode),
        _ => format!("{:?} {}", opcode, address),
    }
}
