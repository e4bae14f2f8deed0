//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise both this crate and `binary_name`
/// log at `default_level`, and the room layer follows along.
///
/// ```no_run
/// pomosync::init_logging("pomosync-server", "debug");
/// ```
pub fn init_logging(binary_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            default_directives(binary_name, default_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directives(binary_name: &str, level: &str) -> String {
    let binary = binary_name.replace('-', "_");
    format!(
        "{pkg}={level},pomosync_room={level},pomosync_transport={level},{binary}={level}",
        pkg = env!("CARGO_PKG_NAME").replace('-', "_"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_each_layer() {
        let directives = default_directives("pomosync-server", "debug");
        assert_eq!(
            directives,
            "pomosync=debug,pomosync_room=debug,pomosync_transport=debug,pomosync_server=debug"
        );
        assert!(directives.parse::<EnvFilter>().is_ok());
    }
}
