use crate::core::{Pipeline, RunSummary};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// 執行完整的 extract → transform → load；任何一步失敗即中止
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting ETL process...");
        self.monitor.log_stats("Start");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.len());
        self.monitor.log_stats("Extract");

        // Transform
        let schema = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "Transformed into {} facts across {} dimensions",
            schema.facts.len(),
            schema.dimensions().len()
        );
        self.monitor.log_stats("Transform");

        // Load
        let summary = self.pipeline.load(schema).await?;
        tracing::info!("Warehouse: {}, report: {}", summary.database_path, summary.report_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
