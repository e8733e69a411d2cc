use countdown::bus::Bus;
use countdown::config::{Config, USAGE};
use countdown::countdown::{dump, execute};
use countdown::{loader, logger};
use log::info;

// bytes shown after a run, starting at the countdown base
const DUMP_LEN: usize = 16;

fn main() -> Result<(), String> {
    let config = Config::from_env()?;
    if config.show_help {
        println!("{}", USAGE);
        return Ok(());
    }
    logger::init(config.log_level)?;

    let countdown = config.countdown;
    let base = countdown.base() as u16;

    if config.native {
        let mut memory = vec![0u8; 0x100];
        let report = countdown.write(&mut memory)?;
        info!(
            "native: {} iterations, final count {}",
            report.iterations, report.final_count
        );
        let shown = (base as usize + DUMP_LEN).min(memory.len());
        println!("{}", dump(&memory[base as usize..shown], base));
        return countdown.verify(&memory);
    }

    let run = match &config.hexdump {
        Some(path) => {
            let mut bus = Bus::new();
            let entry = loader::load_hexdump_file(path, &mut bus)?;
            execute(bus, entry, config.max_instructions)?
        }
        None => countdown.run_on_cpu(config.max_instructions)?,
    };

    let cpu = &run.cpu;
    println!("{}", dump(cpu.bus.slice(base, DUMP_LEN), base));
    println!("{}", run.registers());
    if config.hexdump.is_some() {
        // arbitrary programs have nothing to check against
        return Ok(());
    }
    countdown.verify(cpu.bus.slice(0x0000, 0x100))
}
