// Only overview documentation that is not relevant to one of the more specific
// crates should go here.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Interactive request URL completion for the Graph API.
//!
//! Scout is split into several subcrates that work in collaboration.
//!
//! - [scout-settings](../scout_settings/index.html)
//! - [scout-suggest](../scout_suggest/index.html)
//! - [scout-metadata](../scout_metadata/index.html)
//!
//! This binary is a line based host for the suggestion engine: every line
//! read from stdin is either the new content of the editor, or a `:command`
//! standing in for a key press or a host action. See [`host::HostEvent`].

mod host;

use anyhow::{Context, Result};
use cadence::{NopMetricSink, QueuingMetricSink, StatsdClient, UdpMetricSink};
use scout_metadata::make_source_tree;
use scout_settings::{LogFormat, Settings};
use scout_suggest::{MetadataSource, SampleQuery, Session, StatsdTelemetry};
use std::net::UdpSocket;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Primary entry point
#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Loading settings")?;
    init_logging(&settings)?;

    let metrics_client = init_metrics(&settings).context("Setting up metrics")?;
    let source = make_source_tree(&settings, &settings.metadata, &metrics_client)
        .await
        .context("Setting up metadata sources")?;
    tracing::info!(source = %source.name(), env = %settings.env, "starting scout");

    let session = Session::new(
        &settings.suggest,
        SampleQuery::get(settings.suggest.sample_url.clone()),
        Arc::new(StatsdTelemetry::new(metrics_client)),
    );

    host::Host::new(session, Arc::from(source), std::io::stdout())
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("Running scout")?;

    Ok(())
}

/// Set up logging for Scout, based on settings and the `RUST_LOG` environment
/// variable. Logs go to stderr, so they stay out of the way of the editor on
/// stdout.
fn init_logging(settings: &Settings) -> Result<()> {
    LogTracer::init()?;
    let env_filter: EnvFilter = (&settings.logging.levels).into();
    let builder = tracing_subscriber::fmt::Subscriber::builder().with_writer(std::io::stderr);

    match settings.logging.format {
        LogFormat::Pretty => {
            let subscriber = builder.pretty().finish().with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = builder.json().finish().with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Compact => {
            let subscriber = builder.compact().finish().with(env_filter);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Build the Statsd client. Metrics are discarded unless a sink host is
/// configured.
fn init_metrics(settings: &Settings) -> Result<StatsdClient> {
    let host = match &settings.metrics.sink_host {
        Some(host) => host,
        None => return Ok(StatsdClient::from_sink(&settings.metrics.prefix, NopMetricSink)),
    };

    let socket = UdpSocket::bind("0.0.0.0:0").context("Binding metrics socket")?;
    socket
        .set_nonblocking(true)
        .context("Configuring metrics socket")?;
    let udp_sink = UdpMetricSink::from((host.as_str(), settings.metrics.sink_port), socket)
        .context("Creating metrics sink")?;

    Ok(StatsdClient::from_sink(
        &settings.metrics.prefix,
        QueuingMetricSink::from(udp_sink),
    ))
}
