use std::io::Write;

use log::{self, Level, LevelFilter, Log, Metadata, Record};

static LOGGER: Logger = Logger;

struct Logger;

fn label(level: Level) -> &'static str {
    match level {
        Level::Trace => "[trace] ",
        Level::Debug => "[debug] ",
        Level::Info => "[info]  ",
        Level::Warn => "[warn]  ",
        Level::Error => "[error] ",
    }
}

fn format_record(record: &Record) -> String {
    format!(
        "{}{}: {}",
        label(record.level()),
        record.target(),
        record.args()
    )
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // ignore a closed stderr
            let _ = writeln!(std::io::stderr().lock(), "{}", format_record(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger. Can only succeed once per process.
pub fn init(level: LevelFilter) -> Result<(), String> {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|e| format!("Error setting logger: {}", e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record(
                &Record::builder()
                    .args(format_args!("halted at BRK ${:04X}", 0x060C))
                    .level(Level::Debug)
                    .target("countdown::cpu")
                    .build()
            ),
            "[debug] countdown::cpu: halted at BRK $060C"
        );
    }

    #[test]
    fn test_init_once() {
        assert_eq!(init(LevelFilter::Warn), Ok(()));
        assert_eq!(log::max_level(), LevelFilter::Warn);
        assert!(init(LevelFilter::Trace).is_err());
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }

    #[test]
    fn test_labels_line_up() {
        let levels = [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
        ];
        assert!(levels.iter().all(|l| label(*l).len() == 8));
    }
}
