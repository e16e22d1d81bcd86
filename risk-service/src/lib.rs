/// 初始化日志，未设置 `RUST_LOG` 时默认 info 级别
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
