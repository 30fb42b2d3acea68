//! Shared plumbing for the binaries.

use clap::Parser;
use clap::error::ErrorKind;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Exit status for usage errors and every fatal failure.
pub const EXIT_FAILURE: i32 = 1;

/// ログ出力の初期化（RUST_LOG 未設定なら info）
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

/// clap の既定（使い方エラーで 2）ではなく 1 で終了させる
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(EXIT_FAILURE);
            }
        },
    }
}
