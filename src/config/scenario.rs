use crate::core::builder::{BoundaryPolicy, ForecastWindow};
use crate::core::cloner::ClonerConfig;
use crate::core::fratar::FratarConfig;
use crate::core::integerizer::IntegerizerConfig;
use crate::core::vfr::VfrConfig;
use crate::utils::error::{ForecastError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario: ScenarioMeta,
    pub input: InputConfig,
    pub forecast: ForecastYears,
    pub window: WindowConfig,
    #[serde(default)]
    pub fratar: FratarConfig,
    #[serde(default)]
    pub integerizer: IntegerizerConfig,
    #[serde(default)]
    pub cloner: ClonerConfig,
    #[serde(default)]
    pub vfr: VfrConfig,
    #[serde(default)]
    pub seeds: SeedsConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub schedule: String,
    pub airports: String,
    pub taf: String,
    pub country_regions: Option<String>,
    pub international: Option<String>,
    pub vfr_templates: Option<String>,
    pub helicopter_percent: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastYears {
    pub base_year: i32,
    pub forecast_year: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    /// First (local) day of the forecast window.
    pub start_date: NaiveDate,
    #[serde(default = "default_window_days")]
    pub days: i64,
    /// Window anchor relative to UTC midnight, in hours.
    #[serde(default)]
    pub utc_offset_hours: f64,
    #[serde(default)]
    pub boundary_policy: BoundaryPolicy,
}

fn default_window_days() -> i64 {
    1
}

/// Seeds for the three independent random streams. Vary these between
/// Monte-Carlo trials; identical seeds reproduce a run bit for bit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeedsConfig {
    pub clone_selection: u64,
    pub time_shift: u64,
    pub vfr_local_time: u64,
}

impl Default for SeedsConfig {
    fn default() -> Self {
        Self {
            clone_selection: 12_345_678,
            time_shift: 23_456_789,
            vfr_local_time: 34_567_890,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_filename")]
    pub output_filename: String,
}

fn default_output_filename() -> String {
    "forecast_schedule.csv".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ScenarioConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ForecastError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ForecastError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TAF_FILE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("scenario.name", &self.scenario.name)?;

        validation::validate_path("input.schedule", &self.input.schedule)?;
        validation::validate_path("input.airports", &self.input.airports)?;
        validation::validate_path("input.taf", &self.input.taf)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;

        let input_files: Vec<String> = [
            Some(&self.input.schedule),
            Some(&self.input.airports),
            Some(&self.input.taf),
            self.input.country_regions.as_ref(),
            self.input.international.as_ref(),
            self.input.vfr_templates.as_ref(),
            self.input.helicopter_percent.as_ref(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        validation::validate_file_extensions("input", &input_files, &["csv"])?;

        if self.forecast.forecast_year < self.forecast.base_year {
            return Err(ForecastError::InvalidConfigValueError {
                field: "forecast.forecast_year".to_string(),
                value: self.forecast.forecast_year.to_string(),
                reason: format!(
                    "Forecast year must not precede base year {}",
                    self.forecast.base_year
                ),
            });
        }

        validation::validate_positive_number(
            "window.days",
            self.window.days.max(0) as usize,
            1,
        )?;
        validation::validate_range(
            "window.utc_offset_hours",
            self.window.utc_offset_hours,
            -12.0,
            14.0,
        )?;

        validation::validate_positive_number(
            "fratar.max_steps",
            self.fratar.max_steps as usize,
            1,
        )?;
        validation::validate_range(
            "fratar.convergence_tolerance",
            self.fratar.convergence_tolerance,
            f64::MIN_POSITIVE,
            1.0,
        )?;

        validation::validate_range(
            "cloner.time_shift_std_dev_minutes",
            self.cloner.time_shift_std_dev_minutes,
            0.0,
            720.0,
        )?;
        validation::validate_positive_number(
            "cloner.max_clones_per_pair",
            self.cloner.max_clones_per_pair.max(0) as usize,
            1,
        )?;

        validation::validate_breakpoints("vfr.trapezoid", &self.vfr.trapezoid)?;
        validation::validate_range(
            "vfr.nominal_taxi_minutes",
            self.vfr.nominal_taxi_minutes,
            0.0,
            120.0,
        )?;

        Ok(())
    }

    /// The forecast window in UTC: local midnight of the start date plus
    /// the configured offset, spanning the configured number of days
    /// minus one second.
    pub fn window_bounds(&self) -> ForecastWindow {
        let midnight = self
            .window
            .start_date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time");
        let start = Utc.from_utc_datetime(&midnight)
            + Duration::milliseconds((self.window.utc_offset_hours * 3_600_000.0).round() as i64);
        let end = start + Duration::days(self.window.days) - Duration::seconds(1);
        ForecastWindow::new(start, end)
    }

    /// 預測日 (VFR 產生器使用)
    pub fn local_date(&self) -> NaiveDate {
        self.window.start_date
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for ScenarioConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
