use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

impl LogSettings {
    /// `COINBOARD_LOG` wins over `RUST_LOG`; `COINBOARD_LOG_FORMAT=json`
    /// switches to JSON lines.
    pub fn from_env() -> Self {
        let filter = non_blank_env("COINBOARD_LOG")
            .or_else(|| non_blank_env("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let json = non_blank_env("COINBOARD_LOG_FORMAT")
            .map(|value| value.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Self { filter, json }
    }
}

pub fn init() {
    init_with(&LogSettings::from_env());
}

pub fn init_with(settings: &LogSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.filter))
        .with_target(false);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
