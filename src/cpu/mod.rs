pub mod addr;
pub mod assembler;
pub mod spec;
pub mod trace;

use std::collections::HashMap;

use bitflags::bitflags;
use log::{debug, log_enabled, trace, Level};

use crate::bus::Bus;
use addr::AddrMode;
use spec::Spec;

/// Where assembled programs are loaded unless told otherwise.
pub const PROGRAM_START: u16 = 0x0600;

const STACK_BASE: u16 = 0x0100;
const BRK_OPCODE: u8 = 0x00;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

bitflags! {
    // 7  bit  0
    // ---- ----
    // NVUB DIZC
    // |||| ||||
    // |||| |||+- Carry
    // |||| ||+-- Zero
    // |||| |+--- Interrupt disable
    // |||| +---- Decimal (stored, never used for arithmetic)
    // |||+------ Break, only ever seen in copies pushed to the stack
    // ||+------- Unused, always reads back as 1
    // |+-------- Overflow
    // +--------- Negative
    pub struct Status: u8 {
        const CARRY             = 0b0000_0001;
        const ZERO              = 0b0000_0010;
        const INTERRUPT_DISABLE = 0b0000_0100;
        const DECIMAL           = 0b0000_1000;
        const BREAK             = 0b0001_0000;
        const UNUSED            = 0b0010_0000;
        const OVERFLOW          = 0b0100_0000;
        const NEGATIVE          = 0b1000_0000;
    }
}

pub struct CPU {
    pub pc: u16,    // Program Counter
    sp: u8,         // Stack Pointer
    acc: u8,        // Accumulator
    reg_x: u8,      // Index Register X
    reg_y: u8,      // Index Register Y
    status: Status, // Processor Status

    total_cycles: u64, // Number of total cycles this CPU has executed

    pub bus: Bus,

    // Internal helpers
    opcode_to_spec: HashMap<u8, Spec>,
}

impl CPU {
    pub fn new(bus: Bus) -> CPU {
        CPU {
            pc: PROGRAM_START,
            sp: 0xFD,
            acc: 0,
            reg_x: 0,
            reg_y: 0,
            status: Status::INTERRUPT_DISABLE | Status::UNUSED,
            total_cycles: 0,
            bus,
            opcode_to_spec: spec::opcode_to_spec(),
        }
    }

    pub fn reset(&mut self) {
        self.pc = self.read_u16(RESET_VECTOR);
        self.sp = 0xFD;
        self.acc = 0;
        self.reg_x = 0;
        self.reg_y = 0;
        self.status = Status::INTERRUPT_DISABLE | Status::UNUSED;

        // Reset takes time
        self.total_cycles = 7;
    }

    /// Run until `callback` returns false. The callback sees the CPU before every instruction.
    pub fn run_with_callback<F: FnMut(&mut CPU) -> bool>(
        &mut self,
        mut callback: F,
    ) -> Result<(), String> {
        while callback(self) {
            self.step()?;
        }
        Ok(())
    }

    /// Run until the next instruction is BRK, without executing it.
    /// Returns the number of instructions executed.
    pub fn run_until_brk(&mut self, max_instructions: u64) -> Result<u64, String> {
        let mut executed = 0u64;
        loop {
            if self.read(self.pc) == BRK_OPCODE {
                debug!(
                    "halted at BRK ${:04X} after {} instructions, {} cycles",
                    self.pc, executed, self.total_cycles
                );
                return Ok(executed);
            }
            if executed >= max_instructions {
                return Err(format!(
                    "no BRK reached after {} instructions (pc=${:04X})",
                    executed, self.pc
                ));
            }
            if log_enabled!(Level::Trace) {
                trace!("{}", self.trace());
            }
            self.step()?;
            executed += 1;
        }
    }

    /// Execute one whole instruction and return the cycles it took.
    pub fn step(&mut self) -> Result<u8, String> {
        // Always set the unused status flag bit to 1
        self.status.insert(Status::UNUSED);

        let inst = self.fetch_next_instruction()?;
        let cycles = self.execute_inst(inst);
        self.total_cycles += cycles as u64;

        self.status.insert(Status::UNUSED);
        Ok(cycles)
    }

    pub fn acc(&self) -> u8 {
        self.acc
    }

    pub fn reg_x(&self) -> u8 {
        self.reg_x
    }

    pub fn reg_y(&self) -> u8 {
        self.reg_y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    fn fetch_next_instruction(&mut self) -> Result<Instruction, String> {
        let opcode_byte = self.read(self.pc);
        let spec = *self
            .opcode_to_spec
            .get(&opcode_byte)
            .ok_or_else(|| format!("unknown opcode ${:02X} at ${:04X}", opcode_byte, self.pc))?;
        self.pc = self.pc.wrapping_add(1);
        let (oprand_addr, additional_cycles) =
            self.peak_oprand_addr_and_cycles(spec.addr_mode, spec.inc_cycle_on_page_crossed);
        self.pc = self.pc.wrapping_add(spec.addr_mode.size() as u16);
        Ok(Instruction {
            oprand_addr,
            spec,
            cycles: spec.base_cycles + additional_cycles,
        })
    }

    // fetch next instruction, but keep CPU state unchanged
    fn peak_next_instruction(&mut self) -> Result<Instruction, String> {
        let pc = self.pc;
        let inst = self.fetch_next_instruction();
        self.pc = pc;
        inst
    }

    // return (oprand addr, cycles to advance)
    fn peak_oprand_addr_and_cycles(
        &self,
        addr_mode: AddrMode,
        inc_cycle_on_page_crossed: bool,
    ) -> (u16, u8) {
        use addr::AddrMode::*;

        let page_penalty = |base: u16, addr: u16| -> u8 {
            if base & 0xFF00 != addr & 0xFF00 && inc_cycle_on_page_crossed {
                1
            } else {
                0
            }
        };

        let next_u8: u8 = self.read(self.pc);
        let next_u16: u16 = self.read_u16(self.pc);
        match addr_mode {
            Absolute => (next_u16, 0),
            AbsoluteX => {
                let addr = next_u16.wrapping_add(self.reg_x as u16);
                (addr, page_penalty(next_u16, addr))
            }
            AbsoluteY => {
                let addr = next_u16.wrapping_add(self.reg_y as u16);
                (addr, page_penalty(next_u16, addr))
            }
            ZeroPage => (next_u8 as u16, 0),
            ZeroPageX => (next_u8.wrapping_add(self.reg_x) as u16, 0),
            ZeroPageY => (next_u8.wrapping_add(self.reg_y) as u16, 0),
            Immediate => (self.pc, 0),
            // for relative addressing, handle additional cycles in instruction itself
            Relative => {
                let next_pc = self.pc.wrapping_add(Relative.size() as u16);
                (next_pc.wrapping_add(next_u8 as i8 as u16), 0)
            }
            Implicit => (0, 0),
            // AN INDIRECT JUMP MUST NEVER USE A VECTOR
            // BEGINNING ON THE LAST BYTE OF A PAGE
            // Ref: http://www.6502.org/tutorials/6502opcodes.html#JMP
            Indirect => (self.read_u16_in_page(next_u16), 0),
            IndexedIndirect => {
                let indexed = next_u8.wrapping_add(self.reg_x);
                (self.read_u16_zero_page(indexed), 0)
            }
            IndirectIndexed => {
                let base = self.read_u16_zero_page(next_u8);
                let addr = base.wrapping_add(self.reg_y as u16);
                (addr, page_penalty(base, addr))
            }
        }
    }

    // return: cycles spent, including branch penalties
    fn execute_inst(&mut self, inst: Instruction) -> u8 {
        use addr::AddrMode::*;
        use spec::Opcode::*;

        let mut cycles = inst.cycles;
        let addr_mode = inst.spec.addr_mode;
        let oprand_addr = inst.oprand_addr;
        let oprand = if let Implicit = addr_mode {
            self.acc
        } else {
            self.read(oprand_addr)
        };

        match inst.spec.opcode {
            ADC => self.add_with_carry(oprand),
            // A - M - (1 - C) is A + !M + C
            SBC => self.add_with_carry(!oprand),
            AND => {
                self.acc &= oprand;
                self.update_status_z_n(self.acc);
            }
            ASL => {
                self.status.set(Status::CARRY, oprand & 0x80 != 0);
                self.write_back(addr_mode, oprand_addr, oprand << 1);
            }
            LSR => {
                self.status.set(Status::CARRY, oprand & 0x01 != 0);
                self.write_back(addr_mode, oprand_addr, oprand >> 1);
            }
            ROL => {
                let carry_in = self.status.contains(Status::CARRY) as u8;
                self.status.set(Status::CARRY, oprand & 0x80 != 0);
                self.write_back(addr_mode, oprand_addr, (oprand << 1) | carry_in);
            }
            ROR => {
                let carry_in = self.status.contains(Status::CARRY) as u8;
                self.status.set(Status::CARRY, oprand & 0x01 != 0);
                self.write_back(addr_mode, oprand_addr, (oprand >> 1) | (carry_in << 7));
            }
            BCC => self.branch_if(!self.status.contains(Status::CARRY), oprand_addr, &mut cycles),
            BCS => self.branch_if(self.status.contains(Status::CARRY), oprand_addr, &mut cycles),
            BEQ => self.branch_if(self.status.contains(Status::ZERO), oprand_addr, &mut cycles),
            BNE => self.branch_if(!self.status.contains(Status::ZERO), oprand_addr, &mut cycles),
            BMI => self.branch_if(self.status.contains(Status::NEGATIVE), oprand_addr, &mut cycles),
            BPL => self.branch_if(!self.status.contains(Status::NEGATIVE), oprand_addr, &mut cycles),
            BVC => self.branch_if(!self.status.contains(Status::OVERFLOW), oprand_addr, &mut cycles),
            BVS => self.branch_if(self.status.contains(Status::OVERFLOW), oprand_addr, &mut cycles),
            BIT => {
                self.status.set(Status::ZERO, oprand & self.acc == 0);
                self.status.set(Status::NEGATIVE, oprand & 0x80 != 0);
                self.status.set(Status::OVERFLOW, oprand & 0x40 != 0);
            }
            BRK => {
                // the byte after BRK is padding
                self.stack_push_u16(self.pc.wrapping_add(1));
                self.stack_push((self.status | Status::BREAK | Status::UNUSED).bits());
                self.status.insert(Status::INTERRUPT_DISABLE);
                self.pc = self.read_u16(IRQ_VECTOR);
            }
            CLC => self.status.remove(Status::CARRY),
            CLD => self.status.remove(Status::DECIMAL),
            CLI => self.status.remove(Status::INTERRUPT_DISABLE),
            CLV => self.status.remove(Status::OVERFLOW),
            SEC => self.status.insert(Status::CARRY),
            SED => self.status.insert(Status::DECIMAL),
            SEI => self.status.insert(Status::INTERRUPT_DISABLE),
            CMP => self.compare(self.acc, oprand),
            CPX => self.compare(self.reg_x, oprand),
            CPY => self.compare(self.reg_y, oprand),
            DEC => {
                let result = oprand.wrapping_sub(1);
                self.write(oprand_addr, result);
                self.update_status_z_n(result);
            }
            DEX => {
                self.reg_x = self.reg_x.wrapping_sub(1);
                self.update_status_z_n(self.reg_x);
            }
            DEY => {
                self.reg_y = self.reg_y.wrapping_sub(1);
                self.update_status_z_n(self.reg_y);
            }
            INC => {
                let result = oprand.wrapping_add(1);
                self.write(oprand_addr, result);
                self.update_status_z_n(result);
            }
            INX => {
                self.reg_x = self.reg_x.wrapping_add(1);
                self.update_status_z_n(self.reg_x);
            }
            INY => {
                self.reg_y = self.reg_y.wrapping_add(1);
                self.update_status_z_n(self.reg_y);
            }
            EOR => {
                self.acc ^= oprand;
                self.update_status_z_n(self.acc);
            }
            ORA => {
                self.acc |= oprand;
                self.update_status_z_n(self.acc);
            }
            JMP => self.pc = oprand_addr,
            JSR => {
                self.stack_push_u16(self.pc.wrapping_sub(1));
                self.pc = oprand_addr;
            }
            RTS => self.pc = self.stack_pop_u16().wrapping_add(1),
            RTI => {
                self.pull_status();
                self.pc = self.stack_pop_u16();
            }
            LDA => {
                self.acc = oprand;
                self.update_status_z_n(oprand);
            }
            LDX => {
                self.reg_x = oprand;
                self.update_status_z_n(oprand);
            }
            LDY => {
                self.reg_y = oprand;
                self.update_status_z_n(oprand);
            }
            NOP => {}
            PHA => self.stack_push(self.acc),
            PHP => self.stack_push((self.status | Status::BREAK | Status::UNUSED).bits()),
            PLA => {
                self.acc = self.stack_pop();
                self.update_status_z_n(self.acc);
            }
            PLP => self.pull_status(),
            STA => self.write(oprand_addr, self.acc),
            STX => self.write(oprand_addr, self.reg_x),
            STY => self.write(oprand_addr, self.reg_y),
            TAX => {
                self.reg_x = self.acc;
                self.update_status_z_n(self.reg_x);
            }
            TAY => {
                self.reg_y = self.acc;
                self.update_status_z_n(self.reg_y);
            }
            TSX => {
                self.reg_x = self.sp;
                self.update_status_z_n(self.reg_x);
            }
            TXA => {
                self.acc = self.reg_x;
                self.update_status_z_n(self.acc);
            }
            TXS => self.sp = self.reg_x,
            TYA => {
                self.acc = self.reg_y;
                self.update_status_z_n(self.acc);
            }
        }

        cycles
    }

    fn add_with_carry(&mut self, oprand: u8) {
        let sum = self.acc as u16 + oprand as u16 + self.status.contains(Status::CARRY) as u16;
        let result = sum as u8;
        let overflow = (self.acc ^ result) & (oprand ^ result) & 0x80 != 0;
        self.status.set(Status::CARRY, sum > 0xFF);
        self.status.set(Status::OVERFLOW, overflow);
        self.acc = result;
        self.update_status_z_n(result);
    }

    fn compare(&mut self, register: u8, oprand: u8) {
        self.status.set(Status::CARRY, register >= oprand);
        self.update_status_z_n(register.wrapping_sub(oprand));
    }

    fn branch_if(&mut self, condition: bool, target: u16, cycles: &mut u8) {
        if !condition {
            return;
        }
        *cycles += 1;
        if target & 0xFF00 != self.pc & 0xFF00 {
            *cycles += 1;
        }
        self.pc = target;
    }

    // shifts and rotates land in the accumulator when there is no operand
    fn write_back(&mut self, addr_mode: AddrMode, oprand_addr: u16, result: u8) {
        if let AddrMode::Implicit = addr_mode {
            self.acc = result;
        } else {
            self.write(oprand_addr, result);
        }
        self.update_status_z_n(result);
    }

    fn pull_status(&mut self) {
        self.status = Status::from_bits_truncate(self.stack_pop());
        self.status.remove(Status::BREAK);
        self.status.insert(Status::UNUSED);
    }

    fn read(&self, addr: u16) -> u8 {
        self.bus.cpu_read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.bus.cpu_write(addr, value);
    }

    fn read_u16(&self, addr: u16) -> u16 {
        let a = self.read(addr);
        let b = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([a, b])
    }

    // the high byte comes from the same page as the low byte
    fn read_u16_in_page(&self, addr: u16) -> u16 {
        let a = self.read(addr);
        let b = self.read((addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF));
        u16::from_le_bytes([a, b])
    }

    fn read_u16_zero_page(&self, addr: u8) -> u16 {
        let a = self.read(addr as u16);
        let b = self.read(addr.wrapping_add(1) as u16);
        u16::from_le_bytes([a, b])
    }

    fn update_status_z_n(&mut self, result: u8) {
        self.status.set(Status::ZERO, result == 0);
        self.status.set(Status::NEGATIVE, result & 0b1000_0000 != 0);
    }

    fn stack_pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_BASE + self.sp as u16)
    }

    fn stack_push(&mut self, data: u8) {
        self.write(STACK_BASE + self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1)
    }

    fn stack_push_u16(&mut self, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.stack_push(hi);
        self.stack_push(lo);
    }

    fn stack_pop_u16(&mut self) -> u16 {
        let lo = self.stack_pop();
        let hi = self.stack_pop();
        u16::from_le_bytes([lo, hi])
    }
}

#[derive(Clone, Copy)]
pub struct Instruction {
    oprand_addr: u16,
    spec: Spec,
    cycles: u8,
}
