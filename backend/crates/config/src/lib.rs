pub mod env;
pub mod tracing_init;

pub use env::{parse_var_or, AppConfig};
pub use tracing_init::init_tracing;
