/// Route messages from the `log` crate to STDERR. Defaults to the `info` level; override with
/// `RUST_LOG`.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
