use slog::{o, Drain, Level, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

pub fn create_logger(for_module: &str) -> Logger {
    create_logger_with_level(for_module, Level::Info)
}

pub fn create_logger_with_level(for_module: &str, level: Level) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator)
        .use_utc_timestamp()
        .use_original_order()
        .build()
        .fuse();
    let drain = drain.filter_level(level).fuse();
    let async_drain = Async::new(drain).build().fuse();
    Logger::root(
        async_drain,
        o!("component" => "H10ECG", "module" => for_module.to_string()),
    )
}

/// Logger that drops everything, for tests and embedding without output.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}
