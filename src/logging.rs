use std::path::{Path, PathBuf};

pub const LOG_FILE_BASENAME: &str = "pocket-todo";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV_VAR: &str = "POCKET_TODO_LOG";

/// Log files live in a `logs/` folder next to users.json/settings.json.
pub fn log_directory(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// `POCKET_TODO_LOG`, then `RUST_LOG`, then a crate-verbose default.
pub fn log_spec(app_var: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,pocket_todo=debug"
    } else {
        "warn,pocket_todo=info"
    };
    app_var
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "logging", not(test)))]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    let directory = log_directory(data_dir);
    std::fs::create_dir_all(&directory)?;

    let spec = log_spec(
        std::env::var(LOG_ENV_VAR).ok(),
        std::env::var("RUST_LOG").ok(),
    );

    Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&directory)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        directory.display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(())
}

#[cfg(all(feature = "logging", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!("panic: payload={payload} location={location}");
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_spec_prefers_app_variable() {
        assert_eq!(
            log_spec(Some("trace".to_string()), Some("error".to_string())),
            "trace"
        );
        assert_eq!(log_spec(None, Some("error".to_string())), "error");
        assert_eq!(
            log_spec(Some("  ".to_string()), Some("error".to_string())),
            "error"
        );
    }

    #[test]
    fn log_spec_falls_back_to_crate_default() {
        let spec = log_spec(None, Some(String::new()));
        assert!(spec.starts_with("warn,pocket_todo="));
    }

    #[test]
    fn logs_live_under_data_dir() {
        let dir = Path::new("/tmp/pocket");
        assert_eq!(log_directory(dir), Path::new("/tmp/pocket/logs"));
    }
}
