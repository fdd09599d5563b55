//! Console output for sync runs

use topicsync_core::{Classification, RunSummary, SyncEvent, SyncReporter, TopicSpec};
use topicsync_kafka::KafkaConfig;

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

/// Print the declared topics without contacting a broker
pub fn print_topic_list(specs: &[TopicSpec]) {
    if specs.is_empty() {
        print_info("No topics declared");
        return;
    }

    println!("Declared topics ({}):", specs.len());
    for line in topic_list_lines(specs) {
        println!("{}", line);
    }
}

fn topic_list_lines(specs: &[TopicSpec]) -> Vec<String> {
    specs
        .iter()
        .map(|spec| {
            let mut line = format!(
                "  - {} (partitions: {}, replication factor: {})",
                spec.name, spec.partitions, spec.replication_factor
            );
            if let Some(ref description) = spec.description {
                line.push_str(&format!("\n      {}", description));
            }
            line
        })
        .collect()
}

/// Print where and how the tool is about to connect
pub fn print_connection(config: &KafkaConfig) {
    println!("Kafka connection");
    for line in config.summary().to_string().lines() {
        println!("  {}", line);
    }
    println!();
}

/// Print the end-of-run summary block
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("Summary");
    println!("  Created:            {}", summary.created);
    println!("  Already existed:    {}", summary.already_exists);
    println!("  Partitions grown:   {}", summary.updated);
    println!("  Unchanged:          {}", summary.unchanged);
    println!("  Cannot scale down:  {}", summary.cannot_scale_down);
    println!("  Replication warns:  {}", summary.replication_mismatches);
    println!("  Failed:             {}", summary.failed());
    for failure in &summary.failures {
        println!("    - {}: {}", failure.name, failure.reason);
    }
}

/// Message severity for a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

/// Renders [`SyncEvent`]s as human-readable console lines
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

impl SyncReporter for ConsoleReporter {
    fn report(&self, event: &SyncEvent) {
        if let SyncEvent::Completed(summary) = event {
            print_summary(summary);
            return;
        }

        if let Some((level, message)) = render(event) {
            match level {
                Level::Success => print_success(&message),
                Level::Info => print_info(&message),
                Level::Warning => print_warning(&message),
                Level::Error => print_error(&message),
            }
        }
    }
}

fn render(event: &SyncEvent) -> Option<(Level, String)> {
    let rendered = match event {
        SyncEvent::SnapshotFetched { topics } => (
            Level::Info,
            format!("Found {} existing topic(s) on the cluster", topics),
        ),
        SyncEvent::Planned(Classification::Create(spec)) => (
            Level::Info,
            format!(
                "Topic '{}' will be created ({} partitions, replication factor {})",
                spec.name, spec.partitions, spec.replication_factor
            ),
        ),
        SyncEvent::Planned(Classification::IncreasePartitions(d)) => (
            Level::Info,
            format!(
                "Topic '{}' will grow from {} to {} partitions",
                d.name, d.current_partitions, d.desired_partitions
            ),
        ),
        SyncEvent::Planned(Classification::Unchanged { name, partitions }) => (
            Level::Success,
            format!("Topic '{}' is up to date ({} partitions)", name, partitions),
        ),
        // Reported through ScaleDownRefused
        SyncEvent::Planned(Classification::CannotScaleDown(_)) => return None,
        SyncEvent::ReplicationMismatch(m) => (
            Level::Warning,
            format!(
                "Topic '{}' has replication factor {}, declared {} (not changed, needs a partition reassignment)",
                m.name, m.current_replication, m.desired_replication
            ),
        ),
        SyncEvent::ScaleDownRefused(r) => (
            Level::Warning,
            format!(
                "Topic '{}' has {} partitions, cannot decrease to {}",
                r.name, r.current_partitions, r.desired_partitions
            ),
        ),
        SyncEvent::CreateAttempt {
            attempt,
            max_attempts,
            topics,
        } => (
            Level::Info,
            format!(
                "Creating {} topic(s) (attempt {}/{})",
                topics, attempt, max_attempts
            ),
        ),
        SyncEvent::RetryScheduled {
            attempt,
            delay,
            error,
        } => (
            Level::Warning,
            format!(
                "Attempt {} failed: {}. Retrying in {:?}",
                attempt, error, delay
            ),
        ),
        SyncEvent::TopicCreated { name } => {
            (Level::Success, format!("Created topic '{}'", name))
        }
        SyncEvent::TopicAlreadyExists { name } => {
            (Level::Info, format!("Topic '{}' already exists", name))
        }
        SyncEvent::TopicCreateFailed { name, reason } => (
            Level::Error,
            format!("Failed to create topic '{}': {}", name, reason),
        ),
        SyncEvent::PartitionsIncreased { name, from, to } => (
            Level::Success,
            format!("Increased partitions for '{}' from {} to {}", name, from, to),
        ),
        SyncEvent::PartitionIncreaseFailed { name, reason } => (
            Level::Error,
            format!("Failed to increase partitions for '{}': {}", name, reason),
        ),
        SyncEvent::Completed(_) => return None,
    };
    Some(rendered)
}
