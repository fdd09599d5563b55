//! topicsync - declarative Kafka topic provisioning
//!
//! Reads a YAML list of topics and makes the cluster match it: missing topics
//! are created and partition counts are grown. Partition decreases and
//! replication factor changes are reported, never applied.

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use output::ConsoleReporter;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use topicsync_core::{ExecutorConfig, TopicSynchronizer, TopicsFile};
use topicsync_kafka::{KafkaAdminGateway, KafkaConfig, SecurityProtocol};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Declarative topic provisioning for Kafka
#[derive(Parser, Debug)]
#[command(name = "topicsync")]
#[command(about = "Create and grow Kafka topics from a YAML file")]
#[command(version)]
struct Args {
    /// Path to the topics file
    #[arg(short, long)]
    config: PathBuf,

    /// List the declared topics and exit without connecting
    #[arg(short, long)]
    list: bool,

    /// Bootstrap server list
    #[arg(long, env = "KAFKA_SERVER", default_value = topicsync_kafka::config::DEFAULT_SERVER)]
    server: String,

    /// SASL PLAIN username
    #[arg(long, env = "KAFKA_USERNAME")]
    username: Option<String>,

    /// SASL PLAIN password
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Security protocol override (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    #[arg(long, env = "KAFKA_SECURITY_PROTOCOL")]
    security_protocol: Option<String>,

    /// Enable librdkafka debug output
    #[arg(long, env = "KAFKA_DEBUG_ENABLED", default_value = "false")]
    kafka_debug_enabled: bool,

    /// librdkafka debug contexts
    #[arg(long, env = "KAFKA_DEBUG")]
    kafka_debug: Option<String>,

    /// librdkafka syslog level while debugging (0-7)
    #[arg(long, env = "KAFKA_LOG_LEVEL", default_value_t = topicsync_kafka::config::DEFAULT_LOG_LEVEL)]
    kafka_log_level: u8,

    /// Total create attempts, first call included
    #[arg(long, env = "TOPICSYNC_MAX_ATTEMPTS", default_value_t = 2)]
    max_attempts: u32,

    /// Linear backoff unit between create attempts, in milliseconds
    #[arg(long, env = "TOPICSYNC_BACKOFF_MS", default_value_t = 1000)]
    backoff_ms: u64,

    /// Metadata fetch timeout, in milliseconds
    #[arg(long, env = "TOPICSYNC_METADATA_TIMEOUT_MS", default_value_t = 10_000)]
    metadata_timeout_ms: u64,

    /// Admin operation timeout, in milliseconds
    #[arg(long, env = "TOPICSYNC_OPERATION_TIMEOUT_MS", default_value_t = 30_000)]
    operation_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(&args)?;

    let specs = TopicsFile::from_file(&args.config)
        .with_context(|| format!("Failed to load topics from {}", args.config.display()))?
        .into_specs();

    if args.list {
        output::print_topic_list(&specs);
        return Ok(());
    }

    let kafka = kafka_config(&args)?;
    output::print_connection(&kafka);

    let gateway = KafkaAdminGateway::new(&kafka).context("Failed to create Kafka admin client")?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received, cancelling sync");
        signal_cancel.cancel();
    });

    let synchronizer = TopicSynchronizer::new(gateway)
        .with_config(executor_config(&args))
        .with_reporter(Arc::new(ConsoleReporter::new()));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        topics = specs.len(),
        "Starting topic sync"
    );

    match synchronizer.sync(&specs, &cancel).await {
        Ok(_) => {
            output::print_success("All topics are in sync");
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            output::print_warning("Sync cancelled by user");
            Ok(())
        }
        Err(e) => Err(e).context("Topic sync failed"),
    }
}

/// Initialize logging subsystem
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("Invalid log level '{}'", args.log_level))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(false);

    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

fn kafka_config(args: &Args) -> Result<KafkaConfig> {
    let mut builder = KafkaConfig::builder()
        .bootstrap_servers(&args.server)
        .debug_enabled(args.kafka_debug_enabled)
        .log_level(args.kafka_log_level);

    if let Some(ref contexts) = args.kafka_debug {
        builder = builder.debug_contexts(contexts);
    }
    if let (Some(user), Some(password)) = (&args.username, &args.password) {
        builder = builder.credentials(user, SecretString::from(password.clone()));
    }
    if let Some(ref protocol) = args.security_protocol {
        let protocol: SecurityProtocol = protocol.parse()?;
        builder = builder.security_protocol(protocol);
    }

    Ok(builder.build()?)
}

fn executor_config(args: &Args) -> ExecutorConfig {
    ExecutorConfig::builder()
        .max_attempts(args.max_attempts)
        .backoff_unit(Duration::from_millis(args.backoff_ms))
        .metadata_timeout(Duration::from_millis(args.metadata_timeout_ms))
        .operation_timeout(Duration::from_millis(args.operation_timeout_ms))
        .build()
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_config_flag_is_required() {
        assert!(Args::try_parse_from(["topicsync"]).is_err());
    }

    #[test]
    fn test_executor_flags() {
        let args = parse(&[
            "topicsync",
            "--config",
            "topics.yaml",
            "--max-attempts",
            "4",
            "--backoff-ms",
            "250",
            "--metadata-timeout-ms",
            "2000",
        ]);
        let config = executor_config(&args);

        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff_unit, Duration::from_millis(250));
        assert_eq!(config.metadata_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_kafka_config_from_flags() {
        let args = parse(&[
            "topicsync",
            "-c",
            "topics.yaml",
            "--server",
            "broker.example.com:9092",
            "--username",
            "svc",
            "--password",
            "secret",
        ]);
        let config = kafka_config(&args).unwrap();

        assert_eq!(config.bootstrap_servers, "broker.example.com:9092");
        assert!(config.has_credentials());
        assert_eq!(
            config.resolved_security_protocol(),
            SecurityProtocol::SaslSsl
        );
    }

    #[test]
    fn test_unknown_security_protocol_is_rejected() {
        let args = parse(&[
            "topicsync",
            "-c",
            "topics.yaml",
            "--security-protocol",
            "QUIC",
        ]);
        assert!(kafka_config(&args).is_err());
    }
}
