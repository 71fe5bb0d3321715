use crate::{FormatFlavor, TracingConfig};
use tracing_core::{LevelFilter, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::{Compact, DefaultFields, Format, Pretty};
use tracing_subscriber::fmt::{FormatFields, Layer as FmtLayer, layer as make_fmt_layer};
use tracing_subscriber::layer::Filter;
use tracing_subscriber::registry::LookupSpan;

/// Log targets emitted by the notifier's own crates.
pub const NOTIFIER_TARGETS: &[&str] = &[
    "herald",
    "herald_core",
    "herald_delivery",
    "herald_config",
    "herald_sync",
    "herald_util",
];

/// Creates a formatting layer, filtered per target, from the given config.
pub fn make_layer<S>(config: impl AsRef<TracingConfig>) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let config = config.as_ref();
    let targets = make_targets(config);

    match config.flavor() {
        FormatFlavor::Full => {
            let layer: FmtLayer<S> = configure(make_fmt_layer(), config);
            finish(layer, config, targets)
        }
        FormatFlavor::Compact => {
            let layer: FmtLayer<S, DefaultFields, Format<Compact>> =
                configure(make_fmt_layer().compact(), config);
            finish(layer, config, targets)
        }
        FormatFlavor::Pretty => {
            let layer: FmtLayer<S, Pretty, Format<Pretty>> =
                configure(make_fmt_layer().pretty(), config);
            finish(layer, config, targets)
        }
        #[cfg(feature = "json")]
        FormatFlavor::Json => {
            use tracing_subscriber::fmt::format::{Json, JsonFields};

            let layer: FmtLayer<S, JsonFields, Format<Json>> =
                configure(make_fmt_layer().json().with_ansi(false), config);
            finish(layer, config, targets)
        }
    }
}

/// Applies the display toggles shared by every flavor.
fn configure<S, N, L, T, W>(
    layer: FmtLayer<S, N, Format<L, T>, W>,
    config: &TracingConfig,
) -> FmtLayer<S, N, Format<L, T>, W>
where
    N: for<'writer> FormatFields<'writer> + 'static,
{
    let layer = if config.color() {
        layer
    } else {
        layer.with_ansi(false)
    };

    layer
        .with_target(config.show_target())
        .with_level(config.show_level())
        .with_thread_ids(config.show_thread_id())
        .with_file(config.show_location())
        .with_line_number(config.show_location())
}

/// Drops the timestamp if so configured, attaches the filter and boxes the
/// layer.
fn finish<S, N, L, T, W>(
    layer: FmtLayer<S, N, Format<L, T>, W>,
    config: &TracingConfig,
    targets: Targets,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
    FmtLayer<S, N, Format<L, T>, W>: Layer<S> + Send + Sync + 'static,
    FmtLayer<S, N, Format<L, ()>, W>: Layer<S> + Send + Sync + 'static,
    Targets: Filter<S>,
{
    if config.show_timestamp() {
        Box::new(layer.with_filter(targets))
    } else {
        Box::new(layer.without_time().with_filter(targets))
    }
}

/// Builds the per-target filter: the root verbosity, then the notifier's own
/// verbosity, then explicit target overrides, which win.
fn make_targets(config: &TracingConfig) -> Targets {
    let mut targets = Targets::new().with_default(LevelFilter::from(config.verbosity()));

    if let Some(verbosity) = config.notifier_verbosity() {
        targets = targets.with_targets(
            NOTIFIER_TARGETS
                .iter()
                .map(|target| (*target, LevelFilter::from(verbosity))),
        );
    }

    targets.with_targets(
        config
            .targets()
            .iter()
            .map(|(target, verbosity)| (target.clone(), LevelFilter::from(*verbosity))),
    )
}
