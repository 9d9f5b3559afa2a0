//! End-to-end run: ingest, aggregate, group, build overlay

use crate::domain::types::{Cluster, StopSummary, TransactionRecord};
use crate::infra::config::Config;
use crate::infra::metrics::PipelineMetrics;
use crate::io::ingest::read_transactions;
use crate::services::aggregator::{aggregate_by_section, sort_by_section};
use crate::services::grouping::{group_stops, GroupingKind};
use crate::services::overlay::{build_overlay, OverlayDocument};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Per-section stops, ascending by section
    pub stops: Vec<StopSummary>,
    pub clusters: Vec<Cluster>,
    pub document: OverlayDocument,
}

pub struct Pipeline {
    config: Config,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config, metrics: Arc::new(PipelineMetrics::new()) }
    }

    /// Share an existing metrics handle
    pub fn with_metrics(config: Config, metrics: Arc<PipelineMetrics>) -> Self {
        Self { config, metrics }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Read the configured input file and process it, stamped with the current time
    ///
    /// Demo grouping ignores the input entirely, so the file is not read.
    pub fn run(&self) -> anyhow::Result<PipelineOutput> {
        let generated_at = Utc::now();

        if self.config.grouping_kind() == GroupingKind::Demo {
            info!(input = %self.config.input_path().display(), "ingest_skipped_demo_grouping");
            return Ok(self.process(&[], generated_at));
        }

        let path = self.config.input_path();
        let report = read_transactions(path, self.config.input_settings())
            .with_context(|| format!("Failed to read transactions from {}", path.display()))?;
        self.metrics.record_ingest(report.rows_read, report.skipped.total());

        Ok(self.process(&report.records, generated_at))
    }

    /// Process records already in memory
    pub fn process(&self, records: &[TransactionRecord], generated_at: DateTime<Utc>) -> PipelineOutput {
        let start = Instant::now();

        let mut stops = aggregate_by_section(records, &self.config.type_codes());
        sort_by_section(&mut stops);

        let grouping = self.config.grouping();
        let clusters = group_stops(&stops, grouping);
        let document = build_overlay(&clusters, self.config.view_settings(), generated_at);

        self.metrics.record_grouping(records.len(), stops.len(), clusters.len());
        self.metrics.record_elapsed(start.elapsed());

        info!(
            records = %records.len(),
            stops = %stops.len(),
            clusters = %clusters.len(),
            grouping = %grouping.kind().as_str(),
            display_mode = %document.display_mode.as_str(),
            "pipeline_complete"
        );

        PipelineOutput { stops, clusters, document }
    }
}
