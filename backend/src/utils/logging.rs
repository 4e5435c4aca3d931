use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchings=info,tower_http=debug,sweep_expired=debug,server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
