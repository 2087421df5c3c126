//! Message-ID generation.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Upper bound (exclusive) of the random component.
const RANDOM_LIMIT: u32 = 100_000;

/// Host name used when the system one is unavailable.
const FALLBACK_HOST: &str = "localhost";

/// Process-wide inputs consumed by the ID generator.
pub trait IdentitySource {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current process id.
    fn pid(&self) -> u32;

    /// A random number in `0..limit`.
    fn random_below(&self, limit: u32) -> u32;

    /// The host name, if one can be determined.
    fn hostname(&self) -> Option<String>;
}

/// Identity backed by the system clock, process, RNG and host name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentity;

impl IdentitySource for SystemIdentity {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn random_below(&self, limit: u32) -> u32 {
        rand::thread_rng().gen_range(0..limit)
    }

    fn hostname(&self) -> Option<String> {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
    }
}

/// Generates a fresh Message-ID using the system identity.
///
/// The format is `<YYYYmmddHHMMSS.pid.random@host>`.
#[must_use]
pub fn make_id() -> String {
    make_id_with(&SystemIdentity)
}

/// Generates a Message-ID from the given identity source.
#[must_use]
pub fn make_id_with<S: IdentitySource + ?Sized>(source: &S) -> String {
    let host = source
        .hostname()
        .unwrap_or_else(|| FALLBACK_HOST.to_string());
    let id = format!(
        "<{}.{}.{}@{}>",
        source.now().format("%Y%m%d%H%M%S"),
        source.pid(),
        source.random_below(RANDOM_LIMIT),
        host
    );
    tracing::trace!(%id, "generated message id");
    id
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Fixed {
        host: Option<&'static str>,
    }

    impl IdentitySource for Fixed {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
        }

        fn pid(&self) -> u32 {
            4242
        }

        fn random_below(&self, limit: u32) -> u32 {
            assert_eq!(limit, RANDOM_LIMIT);
            17
        }

        fn hostname(&self) -> Option<String> {
            self.host.map(str::to_string)
        }
    }

    #[test]
    fn test_make_id_format() {
        let id = make_id_with(&Fixed {
            host: Some("mx.example.org"),
        });
        assert_eq!(id, "<20240309070501.4242.17@mx.example.org>");
    }

    #[test]
    fn test_make_id_localhost_fallback() {
        let id = make_id_with(&Fixed { host: None });
        assert_eq!(id, "<20240309070501.4242.17@localhost>");
    }

    #[test]
    fn test_system_identity_shape() {
        let id = make_id();
        assert!(id.starts_with('<'));
        assert!(id.ends_with('>'));
        assert_eq!(id.matches('@').count(), 1);

        let local = id.trim_start_matches('<').split('@').next().unwrap();
        let fields: Vec<&str> = local.split('.').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].len(), 14);
        assert_eq!(fields[1], std::process::id().to_string());
        assert!(fields[2].parse::<u32>().unwrap() < RANDOM_LIMIT);
    }
}
