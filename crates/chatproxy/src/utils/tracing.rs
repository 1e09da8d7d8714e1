use std::fmt;
use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider};
use time::macros::format_description;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format, time::FormatTime, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "chatproxy";
const DEFAULT_OTEL_COLLECTOR_URL: &str = "http://localhost:4317";

/// `[2024-01-01 12:00:00.000]`
struct BracketedTime;

impl FormatTime for BracketedTime {
    fn format_time(&self, w: &mut format::Writer<'_>) -> fmt::Result {
        let now = time::OffsetDateTime::now_utc();
        let stamp = now
            .format(&format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "[{}]", stamp)
    }
}

/// One line per event: `[time][level] field=value ...`.
struct BracketedFormatter;

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        BracketedTime.format_time(&mut writer)?;

        write!(
            writer,
            "[{}] ",
            event.metadata().level().to_string().to_lowercase()
        )?;

        // Span fields (request_id, model, ...) ahead of the event's own.
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<tracing_subscriber::fmt::FormattedFields<N>>()
                {
                    if !fields.is_empty() {
                        write!(writer, "{} ", fields)?;
                    }
                }
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn otlp_provider(endpoint: &str) -> Option<SdkTracerProvider> {
    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .build(),
        ),
        Err(err) => {
            eprintln!("failed to create OTLP span exporter for {}: {}", endpoint, err);
            None
        }
    }
}

/// Set `subscriber` as the global default. This also bridges `log` records
/// (emitted by `common` and `hfinference`) into it.
fn install<S: SubscriberInitExt>(subscriber: S) {
    if let Err(err) = subscriber.try_init() {
        eprintln!("failed to set tracing subscriber: {}", err);
    }
}

static INIT_LOGGER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber. Safe to call more than once; only the
/// first call has any effect.
///
/// With `OTEL_TRACING_ENABLED=true` spans are also exported over OTLP to
/// `OTEL_COLLECTOR_URL`.
pub fn init_tracer() -> &'static SdkTracerProvider {
    INIT_LOGGER.get_or_init(|| {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let tracing_enabled = std::env::var("OTEL_TRACING_ENABLED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        let exporting_provider = if tracing_enabled {
            let otel_endpoint = std::env::var("OTEL_COLLECTOR_URL")
                .unwrap_or_else(|_| DEFAULT_OTEL_COLLECTOR_URL.to_string());
            otlp_provider(&otel_endpoint)
        } else {
            None
        };

        match exporting_provider {
            Some(provider) => {
                global::set_tracer_provider(provider.clone());

                let telemetry_layer =
                    tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME));

                install(
                    tracing_subscriber::registry()
                        .with(telemetry_layer)
                        .with(env_filter())
                        .with(tracing_subscriber::fmt::layer().event_format(BracketedFormatter)),
                );

                provider
            }
            None => {
                let provider = SdkTracerProvider::builder().build();
                global::set_tracer_provider(provider.clone());

                install(
                    tracing_subscriber::registry()
                        .with(env_filter())
                        .with(tracing_subscriber::fmt::layer().event_format(BracketedFormatter)),
                );

                provider
            }
        }
    })
}
