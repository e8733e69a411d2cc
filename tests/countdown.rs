use countdown::bus::Bus;
use countdown::countdown::{execute, Countdown};
use countdown::cpu::{assembler, CPU, PROGRAM_START};
use countdown::loader;
use std::path::PathBuf;

fn resource(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/resources");
    path.push(name);
    path
}

#[test]
fn test_countdown_log() {
    let program = assembler::assemble(&Countdown::default().source()).unwrap();
    let mut bus = Bus::new();
    bus.cpu_write_batch(PROGRAM_START, &program).unwrap();
    let mut cpu = CPU::new(bus);

    let logs: String =
        std::fs::read_to_string(resource("countdown.log")).expect("Can't read countdown logs");
    let log_lines: Vec<&str> = logs.lines().collect();
    let mut line_idx = 0;
    cpu.run_with_callback(|cpu| {
        if cpu.bus.cpu_read(cpu.pc) == 0x00 {
            return false;
        }
        let trace_line = cpu.trace();
        assert_eq!(trace_line, log_lines[line_idx]);
        line_idx += 1;
        true
    })
    .unwrap();

    assert_eq!(line_idx, log_lines.len());
}

#[test]
fn test_hexdump_matches_assembler() {
    let mut bus = Bus::new();
    let entry = loader::load_hexdump_file(resource("countdown.hex"), &mut bus).unwrap();
    assert_eq!(entry, PROGRAM_START);

    let program = assembler::assemble(&Countdown::default().source()).unwrap();
    assert_eq!(bus.slice(PROGRAM_START, program.len()), program.as_slice());
}

#[test]
fn test_hexdump_run_matches_native() {
    let mut bus = Bus::new();
    let entry = loader::load_hexdump_file(resource("countdown.hex"), &mut bus).unwrap();
    let run = execute(bus, entry, 10_000).unwrap();

    let countdown = Countdown::default();
    let mut native = vec![0u8; 0x100];
    let report = countdown.write(&mut native).unwrap();

    assert_eq!(run.cpu.bus.slice(0x0000, 0x100), native.as_slice());
    assert_eq!(report.iterations, 10);
    assert_eq!(report.final_count, 0);
    // the loop never stores the final zero, the byte past the run was zero already
    assert_eq!(run.cpu.bus.cpu_read(0x001A), 0x00);
    countdown.verify(run.cpu.bus.slice(0x0000, 0x100)).unwrap();
}
