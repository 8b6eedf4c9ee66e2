use log::LevelFilter;

pub fn to_level_filter(ulevel: u64) -> LevelFilter {
    match ulevel {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Install env_logger. `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logger(ulevel: u64) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(to_level_filter(ulevel));
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    // a second init (e.g. from tests) is harmless
    let _ = builder.format_timestamp(None).try_init();
}
