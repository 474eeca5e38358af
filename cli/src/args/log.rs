use clap::Args;
use colored::Colorize;
use log::LevelFilter;

#[derive(Args, Clone, Debug)]
pub struct LogArgs {
    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl LogArgs {
    pub fn init_logger(&self) {
        let level: LevelFilter = self.log_level.into();

        let result = fern::Dispatch::new()
            .format(|out, message, record| {
                let level = match record.level() {
                    log::Level::Error => "ERROR".red(),
                    log::Level::Warn => "WARN".yellow(),
                    log::Level::Info => "INFO".green(),
                    log::Level::Debug => "DEBUG".blue(),
                    log::Level::Trace => "TRACE".dimmed(),
                };
                out.finish(format_args!(
                    "[{} {}] {}",
                    level,
                    record.target(),
                    message
                ))
            })
            .level(level)
            .chain(std::io::stderr())
            .apply();

        if let Err(err) = result {
            eprintln!("logger init failed: {err}");
        }
    }
}
