use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ForecastEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ForecastEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        println!("Starting forecast run...");
        self.monitor.log_stats("Start");

        // Extract
        println!("Extracting input files...");
        let inputs = self.pipeline.extract().await?;
        println!("Extracted {} baseline flights", inputs.schedule.len());
        self.monitor.log_stats("Extract");

        // Transform
        println!("Running demand redistribution...");
        let outcome = self.pipeline.transform(inputs).await?;
        println!(
            "Forecast schedule holds {} flights ({} cloned)",
            outcome.schedule.len(),
            outcome.cloned_flight_count
        );
        self.monitor.log_stats("Transform");

        // Load
        println!("Writing forecast schedule...");
        let output_path = self.pipeline.load(outcome).await?;
        println!("Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
