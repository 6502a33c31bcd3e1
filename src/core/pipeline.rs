//! The forecast pipeline: extract inputs, run the demand-redistribution
//! stages in their fixed order, and load the merged schedule.
//!
//! Stage order is a hard dependency chain: build → prune → project →
//! balance → integerize → clone, with the pruner's removals and the
//! cloner's output both feeding residual synthesis and final assembly.
//! The whole computation is sequential and deterministic given the three
//! stream seeds.

use crate::adapters::codecs;
use crate::config::ScenarioConfig;
use crate::core::builder::GraphBuilder;
use crate::core::cloner::clone_flights;
use crate::core::fratar::balance;
use crate::core::integerizer::integerize;
use crate::core::merger;
use crate::core::projector::{
    generate_projections, merge_international_counts, merge_taf_counts, reset_projections,
    GrowthSlot,
};
use crate::core::pruner::remove_sinks_and_sources;
use crate::core::vfr::{count_windowed_flights, ResidualSynthesizer};
use crate::domain::model::{ForecastInputs, ForecastOutcome};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::Result;
use crate::utils::random::ForecastStreams;

/// Run the demand-redistribution and schedule-synthesis stages over
/// already-extracted inputs. Pure apart from logging: identical inputs
/// and seeds produce identical output.
pub fn run_forecast(inputs: ForecastInputs, config: &ScenarioConfig) -> Result<ForecastOutcome> {
    let ForecastInputs {
        schedule,
        airports,
        taf,
        international,
        regions,
        vfr_templates,
        helicopter_percent,
    } = inputs;
    let window = config.window_bounds();

    // Stage 1-2: baseline flight list -> demand graph.
    let builder = GraphBuilder::new(&airports, window, config.window.boundary_policy);
    let (mut graph, build_stats) = builder.build(schedule)?;
    tracing::info!(
        "🛫 demand graph: {} airports, {} city pairs, {} flights",
        graph.node_count(),
        graph.edge_count(),
        build_stats.assigned
    );

    // Stage 3: strip sinks and sources until the network is balanced.
    let prune = remove_sinks_and_sources(&mut graph);
    graph.calculate_initial_counts();

    // Stage 4: merge growth data and project per-airport demand.
    reset_projections(&mut graph);
    let international_for = |year: i32| international.iter().find(|g| g.year == year);
    if let Some(base) = taf.year_data(config.forecast.base_year) {
        merge_taf_counts(&mut graph, base, GrowthSlot::TafBase);
    }
    if let Some(intl) = international_for(config.forecast.base_year) {
        merge_international_counts(&mut graph, intl, &regions, GrowthSlot::TafBase);
    }
    if let Some(forecast) = taf.year_data(config.forecast.forecast_year) {
        merge_taf_counts(&mut graph, forecast, GrowthSlot::TafForecast);
    }
    if let Some(intl) = international_for(config.forecast.forecast_year) {
        merge_international_counts(&mut graph, intl, &regions, GrowthSlot::TafForecast);
    }
    generate_projections(&mut graph);

    // Stage 5: Fratar balancing.
    let fratar_outcome = balance(&mut graph, &config.fratar);

    // Stage 6: integerize the balanced flows.
    integerize(&mut graph, &config.integerizer);

    // Stage 7: clone flights toward the integer targets.
    let mut streams = ForecastStreams::from_seeds(
        config.seeds.clone_selection,
        config.seeds.time_shift,
        config.seeds.vfr_local_time,
    );
    let first_clone_id = graph.flights().iter().map(|r| r.id).max().unwrap_or(0) + 1;
    let clones = clone_flights(
        &graph,
        &config.cloner,
        first_clone_id,
        &mut streams.clone_selection,
        &mut streams.time_shift,
    );

    // Stage 8: residual VFR synthesis over the schedule produced so far.
    let generated = merger::merge(&graph, &clones, &[]);
    count_windowed_flights(&mut graph, &generated, &window);
    let mut synthesizer = ResidualSynthesizer::new(
        config.vfr.clone(),
        config.local_date(),
        &vfr_templates,
        helicopter_percent,
    )?;
    let vfr_flights = synthesizer.synthesize(&graph, &mut streams.vfr_local_time);

    // Stage 9: final assembly (`generated` already holds retained +
    // clones + pruned pass-through, in that order).
    let mut schedule = generated;
    schedule.extend(vfr_flights.iter().cloned());

    tracing::info!(
        "📈 forecast schedule: {} flights ({} cloned, {} removed, {} synthetic VFR)",
        schedule.len(),
        clones.cloned_count(),
        clones.removed_ids.len(),
        vfr_flights.len()
    );

    Ok(ForecastOutcome {
        schedule,
        cloned_flight_count: clones.cloned_count(),
        removed_flight_count: clones.removed_ids.len(),
        synthesized_flight_count: vfr_flights.len(),
        pruned_airport_count: prune.removed.len(),
        fratar_steps: fratar_outcome.steps,
        fratar_converged: fratar_outcome.converged,
    })
}

pub struct ForecastPipeline<S: Storage> {
    storage: S,
    config: ScenarioConfig,
}

impl<S: Storage> ForecastPipeline<S> {
    pub fn new(storage: S, config: ScenarioConfig) -> Self {
        Self { storage, config }
    }

    async fn read_optional(&self, path: &Option<String>) -> Result<Option<Vec<u8>>> {
        match path {
            Some(path) => Ok(Some(self.storage.read_file(path).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ForecastPipeline<S> {
    async fn extract(&self) -> Result<ForecastInputs> {
        let mut inputs = ForecastInputs::default();

        tracing::debug!("reading baseline schedule from {}", self.config.input.schedule);
        let schedule = self.storage.read_file(&self.config.input.schedule).await?;
        inputs.schedule = codecs::read_schedule(&schedule)?;

        let airports = self.storage.read_file(&self.config.input.airports).await?;
        inputs.airports = codecs::read_airports(&airports)?;

        let taf = self.storage.read_file(&self.config.input.taf).await?;
        inputs.taf = codecs::read_taf(&taf)?;

        if let Some(data) = self.read_optional(&self.config.input.country_regions).await? {
            inputs.regions = codecs::read_country_regions(&data)?;
        }
        if let Some(data) = self.read_optional(&self.config.input.international).await? {
            inputs.international = codecs::read_international(&data)?;
        }
        if let Some(data) = self.read_optional(&self.config.input.vfr_templates).await? {
            inputs.vfr_templates = codecs::read_vfr_templates(&data)?;
        }
        if let Some(data) = self
            .read_optional(&self.config.input.helicopter_percent)
            .await?
        {
            inputs.helicopter_percent = codecs::read_helicopter_percent(&data)?;
        }

        tracing::debug!(
            "extracted {} baseline flights, {} airport codes",
            inputs.schedule.len(),
            inputs.airports.len()
        );
        Ok(inputs)
    }

    async fn transform(&self, inputs: ForecastInputs) -> Result<ForecastOutcome> {
        run_forecast(inputs, &self.config)
    }

    async fn load(&self, outcome: ForecastOutcome) -> Result<String> {
        let output_file = format!(
            "{}/{}",
            self.config.load.output_path, self.config.load.output_filename
        );
        let schedule_bytes = codecs::write_schedule(&outcome.schedule)?;
        self.storage.write_file(&output_file, &schedule_bytes).await?;

        let summary = serde_json::json!({
            "scenario": self.config.scenario.name,
            "output_flights": outcome.schedule.len(),
            "cloned_flights": outcome.cloned_flight_count,
            "removed_flights": outcome.removed_flight_count,
            "synthetic_vfr_flights": outcome.synthesized_flight_count,
            "pruned_airports": outcome.pruned_airport_count,
            "fratar_steps": outcome.fratar_steps,
            "fratar_converged": outcome.fratar_converged,
        });
        self.storage
            .write_file(
                &format!("{}/forecast_summary.json", self.config.load.output_path),
                serde_json::to_string_pretty(&summary)?.as_bytes(),
            )
            .await?;

        Ok(output_file)
    }
}
