use clap::Parser;
use taf_forecast::utils::{logger, validation::Validate};
use taf_forecast::{CliConfig, ForecastEngine, ForecastPipeline, LocalStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting taf-forecast CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證場景配置
    let config = match cli.load_scenario() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load scenario: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲和管道 (輸入與輸出路徑皆相對於工作目錄)
    let storage = LocalStorage::new(".".to_string());
    let pipeline = ForecastPipeline::new(storage, config);

    // 建立引擎並執行
    let engine = ForecastEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Forecast run completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Forecast run completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Forecast run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                taf_forecast::utils::error::ErrorSeverity::Low => 0,
                taf_forecast::utils::error::ErrorSeverity::Medium => 2,
                taf_forecast::utils::error::ErrorSeverity::High => 1,
                taf_forecast::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
