use clap::Parser;

use dupfiles::cli::Cli;
use dupfiles::config;
use dupfiles::context::Context;
use dupfiles::logging::{self, LogFormat, LogLevel};

fn main() {
    let cli = Cli::parse();

    let mut ctx = Context::new(false);
    ctx.json = config::resolve_bool(if cli.json { Some(true) } else { None }, &ctx.env, "DUPFILES_JSON", false);

    let log_level: LogLevel = config::resolve_str(cli.log_level.as_deref(), &ctx.env, "DUPFILES_LOG_LEVEL", "warn")
        .parse()
        .unwrap_or(LogLevel::Warn);
    let log_format = match config::resolve_str(cli.log_format.as_deref(), &ctx.env, "DUPFILES_LOG_FORMAT", "compact").as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    logging::init_logging(log_level, log_format);

    let exit_code = match cli.command.exec(&mut ctx) {
        Ok(code) => code,
        Err(error) => {
            ctx.report_error(&error);
            error.exit_code()
        }
    };

    std::process::exit(exit_code);
}
