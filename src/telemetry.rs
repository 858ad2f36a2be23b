//! Tracing setup for the binary.
//!
//! `RUST_LOG` controls the filter on top of a crate-level `info` default.
//! `LOG_FORMAT=json` switches to JSON lines.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "learning_engine=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
