//! `log::Log` implementation backed by the boot console. Subsystem
//! diagnostics (paging setup, process lifecycle, scheduler rotation,
//! exception delivery) go through `log::{info,warn,error}!`; unconditional
//! console output (banner, shell prompt) keeps using `println!` directly.

use log::{Level, Log, Metadata, Record};

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::println!("[{:<5}] {}", record.level(), record.args());
        #[cfg(feature = "serial-log")]
        crate::serial_println!("[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

pub fn init() {
    // SAFETY: `set_logger` is only called once, here, during single-
    // threaded boot.
    log::set_logger(&LOGGER).ok();
    log::set_max_level(log::LevelFilter::Info);
}
