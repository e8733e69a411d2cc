//! The countdown: store `start, start - 1, ..., 1` at consecutive offsets from `base`.
//!
//! [`Countdown::write`] does it natively on a byte buffer; [`Countdown::run_on_cpu`]
//! assembles the 6502 program from [`Countdown::source`] and lets the CPU do it in the
//! zero page. Both must leave the same bytes behind.

use std::ops::Range;

use itertools::Itertools;
use log::{debug, info};

use crate::bus::Bus;
use crate::cpu::{assembler, trace, CPU, PROGRAM_START};

pub const DEFAULT_BASE: u8 = 0x10;
pub const DEFAULT_START: u8 = 10;

const ZERO_PAGE_SIZE: usize = 0x100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Countdown {
    base: u8,
    start: u8,
}

#[derive(Debug, PartialEq)]
pub struct CountdownReport {
    pub iterations: usize,
    pub final_count: u8,
    pub written: Range<usize>,
}

/// A finished program run: the halted CPU and how many instructions it executed.
pub struct Run {
    pub cpu: CPU,
    pub instructions: u64,
}

impl Run {
    /// Final register state, `PC:060C A:00 X:1A Y:00 P:27 SP:FD CYC:133 INST:52`.
    pub fn registers(&self) -> String {
        let cpu = &self.cpu;
        format!(
            "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{} INST:{}",
            cpu.pc,
            cpu.acc(),
            cpu.reg_x(),
            cpu.reg_y(),
            cpu.status().bits(),
            cpu.sp(),
            cpu.total_cycles(),
            self.instructions
        )
    }
}

impl Countdown {
    /// `base` is a zero page offset; the whole run has to fit in the zero page.
    pub fn new(base: u8, start: u8) -> Result<Countdown, String> {
        if start == 0 {
            return Err("countdown must start above zero".to_string());
        }
        if base as usize + start as usize > ZERO_PAGE_SIZE {
            return Err(format!(
                "{} values from ${:02X} do not fit in the zero page",
                start, base
            ));
        }
        Ok(Countdown { base, start })
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    /// The bytes a finished countdown leaves at `base`.
    pub fn expected(&self) -> Vec<u8> {
        (1..=self.start).rev().collect()
    }

    pub fn write(&self, buf: &mut [u8]) -> Result<CountdownReport, String> {
        let base = self.base as usize;
        if buf.len() < base + self.start as usize {
            return Err(format!(
                "buffer of {} bytes cannot hold {} values from offset {}",
                buf.len(),
                self.start,
                base
            ));
        }

        let mut index = base;
        let mut count = self.start;
        let mut iterations = 0;
        while count != 0 {
            buf[index] = count;
            index += 1;
            count -= 1;
            iterations += 1;
        }

        debug!(
            "countdown: wrote {} values at {}..{}",
            iterations, base, index
        );
        Ok(CountdownReport {
            iterations,
            final_count: count,
            written: base..index,
        })
    }

    /// 6502 source for this countdown. X walks the zero page, Y holds the value.
    pub fn source(&self) -> String {
        format!(
            r"; count down from {start}, storing each value from ${base:02X} upward
define base  ${base:02X}
define count ${start:02X}

    LDX #base      ; index
    LDY #count     ; value
loop:
    STY $00,X
    INX
    DEY
    CPY #$00
    BNE loop
    BRK
",
            base = self.base,
            start = self.start
        )
    }

    pub fn run_on_cpu(&self, max_instructions: u64) -> Result<Run, String> {
        let program = assembler::assemble(&self.source())?;
        info!(
            "countdown: assembled {} bytes at ${:04X}",
            program.len(),
            PROGRAM_START
        );
        for line in trace::listing(&program, PROGRAM_START) {
            debug!("{}", line);
        }

        let mut bus = Bus::new();
        bus.cpu_write_batch(PROGRAM_START, &program)?;
        execute(bus, PROGRAM_START, max_instructions)
    }

    /// Compare `memory` (indexed from address zero) against the expected countdown.
    pub fn verify(&self, memory: &[u8]) -> Result<(), String> {
        let base = self.base as usize;
        let expected = self.expected();
        let actual = memory
            .get(base..base + expected.len())
            .ok_or_else(|| format!("memory ends before offset {}", base + expected.len()))?;
        if actual != expected.as_slice() {
            return Err(format!(
                "expected {} at ${:02X}, found {}",
                hex_bytes(&expected),
                base,
                hex_bytes(actual)
            ));
        }
        if memory.get(base + expected.len()) == Some(&0) || memory.len() == base + expected.len()
        {
            Ok(())
        } else {
            Err(format!(
                "byte after the countdown at ${:02X} is not zero",
                base + expected.len()
            ))
        }
    }
}

impl Default for Countdown {
    fn default() -> Countdown {
        Countdown {
            base: DEFAULT_BASE,
            start: DEFAULT_START,
        }
    }
}

/// Run whatever is on `bus` from `entry` until BRK.
pub fn execute(bus: Bus, entry: u16, max_instructions: u64) -> Result<Run, String> {
    let mut cpu = CPU::new(bus);
    cpu.pc = entry;
    let instructions = cpu.run_until_brk(max_instructions)?;
    info!(
        "cpu: {} instructions, {} cycles, X=${:02X} Y=${:02X}",
        instructions,
        cpu.total_cycles(),
        cpu.reg_x(),
        cpu.reg_y()
    );
    Ok(Run { cpu, instructions })
}

/// `$0010: 0A 09 08 ...`
pub fn dump(memory: &[u8], start: u16) -> String {
    format!("${:04X}: {}", start, hex_bytes(memory))
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).join(" ")
}
