//! 日誌初始化。
//!
//! `reqcheck check` 沒有指定 `--output` 時會把報告印到 stdout，
//! 方便 `reqcheck check -f json > report.json` 這類重導向；
//! 因此所有日誌都寫到 stderr，不會混進報告內容。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 未設定 `RUST_LOG` 時使用的過濾條件
fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "reqcheck=debug,info"
    } else {
        "reqcheck=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// CI 環境用：每行一筆 JSON，同樣寫到 stderr
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .json()
                .with_current_span(false),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_enables_debug_for_reqcheck_only() {
        assert_eq!(default_directive(false), "reqcheck=info");
        assert_eq!(default_directive(true), "reqcheck=debug,info");
        assert!(default_directive(true).parse::<EnvFilter>().is_ok());
    }
}
