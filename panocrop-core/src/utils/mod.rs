//! Utility functions for the crop pipeline.

pub mod image;

pub use self::image::{crop_image, dynamic_to_rgb, encode_jpeg, load_image};

/// Initializes the tracing subscriber for logging.
///
/// Sets up an environment filter (`RUST_LOG`) and a formatting layer. Call it once at
/// the start of an application.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
