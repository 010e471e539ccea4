//! fetch → persist raw → merge → quality → persist → analyze → persist.
//!
//! Each stage can also be run on its own against files left by an earlier
//! run. A failing stage stops the run; files already written are left in place.

use crate::analysis::{generate_analysis_report, AnalysisOutputs};
use crate::clients::energy_client::EnergyClient;
use crate::clients::retry_client::{JsonSource, RetryClient};
use crate::clients::weather_client::WeatherClient;
use crate::clients::window::FetchWindow;
use crate::config::{PipelineConfig, ReportMode};
use crate::error::PipelineError;
use crate::processing::merger::merge_frames;
use crate::processing::quality::{
    generate_city_reports, generate_quality_report, QualityReport, AGGREGATE_SCOPE,
};
use crate::storage::OutputStore;
use crate::types::city::City;
use crate::types::data_kind::DataKind;
use crate::types::records::{energy_frame, weather_frame, EnergyRecord, WeatherRecord};
use chrono::{NaiveDate, Utc};
use log::{error, info, warn};
use polars::prelude::DataFrame;

/// Records gathered by [`Pipeline::fetch`], all cities stacked.
#[derive(Debug, Clone, Default)]
pub struct FetchedData {
    pub weather: Vec<WeatherRecord>,
    pub energy: Vec<EnergyRecord>,
}

#[derive(Debug, Clone)]
pub struct ProcessedData {
    pub merged: DataFrame,
    pub quality: Vec<QualityReport>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub weather_records: usize,
    pub energy_records: usize,
    pub merged_rows: usize,
    pub quality: Vec<QualityReport>,
    pub analysis: AnalysisOutputs,
}

pub struct Pipeline<S> {
    source: S,
    config: PipelineConfig,
    store: OutputStore,
    today: NaiveDate,
}

impl Pipeline<RetryClient> {
    /// A pipeline talking to the live APIs with the configured retry policy.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let client = RetryClient::new(config.retry.clone())?;
        Ok(Self::new(client, config))
    }
}

impl<S: JsonSource> Pipeline<S> {
    pub fn new(source: S, config: PipelineConfig) -> Self {
        let store = OutputStore::new(config.data_dir.clone());
        Self {
            source,
            config,
            store,
            today: Utc::now().date_naive(),
        }
    }

    /// Overrides the reference date used for the fetch window and freshness.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Fetches weather and energy for every configured city, one request at a
    /// time, and writes each city's raw files.
    ///
    /// A city whose fetch fails is logged and skipped. The run only fails when
    /// a source produced nothing for any city.
    pub async fn fetch(&self) -> Result<FetchedData, PipelineError> {
        let window = FetchWindow::for_mode(self.config.fetch_mode, self.today);
        info!(
            "Fetching {} mode data for {} cities ({} to {})",
            self.config.fetch_mode,
            self.config.cities.len(),
            window.start,
            window.end
        );

        let weather_client = WeatherClient::new(&self.source, &self.config.noaa_api_key)
            .with_paging(self.config.weather_page_size, self.config.weather_max_pages);
        let energy_client = EnergyClient::new(&self.source, &self.config.eia_api_key)
            .with_paging(self.config.energy_page_size, self.config.energy_max_pages);

        let mut fetched = FetchedData::default();
        for city in &self.config.cities {
            match weather_client.fetch_city(city, &window).await {
                Ok(records) => {
                    self.persist_raw(DataKind::Weather, city, weather_frame(&records)?)
                        .await?;
                    fetched.weather.extend(records);
                }
                Err(e) => {
                    error!("Weather fetch failed for {}: {}", city, e);
                    self.discard_raw(DataKind::Weather, city).await?;
                }
            }

            match energy_client.fetch_city(city, &window).await {
                Ok(records) => {
                    self.persist_raw(DataKind::Energy, city, energy_frame(&records)?)
                        .await?;
                    fetched.energy.extend(records);
                }
                Err(e) => {
                    error!("Energy fetch failed for {}: {}", city, e);
                    self.discard_raw(DataKind::Energy, city).await?;
                }
            }
        }

        if fetched.weather.is_empty() {
            return Err(PipelineError::DataAbsence(DataKind::Weather));
        }
        if fetched.energy.is_empty() {
            return Err(PipelineError::DataAbsence(DataKind::Energy));
        }
        info!(
            "Fetched {} weather and {} energy records",
            fetched.weather.len(),
            fetched.energy.len()
        );
        Ok(fetched)
    }

    /// Replaces the city's raw file. A city with nothing this run loses its
    /// old file so later offline stages never merge a previous fetch.
    async fn persist_raw(
        &self,
        kind: DataKind,
        city: &City,
        df: DataFrame,
    ) -> Result<(), PipelineError> {
        if df.height() == 0 {
            return self.discard_raw(kind, city).await;
        }
        let rows = df.height();
        let path = self.store.raw_path(kind, city);
        self.store.save_frame(path.clone(), df).await?;
        info!("Saved {} {} rows for {} to {}", rows, kind, city, path.display());
        Ok(())
    }

    async fn discard_raw(&self, kind: DataKind, city: &City) -> Result<(), PipelineError> {
        let path = self.store.raw_path(kind, city);
        if self.store.discard(&path).await? {
            warn!("Removed stale raw {} file for {} at {}", kind, city, path.display());
        }
        Ok(())
    }

    pub fn process(&self, fetched: &FetchedData) -> Result<ProcessedData, PipelineError> {
        process_frames(
            &self.store,
            self.config.report_mode,
            self.today,
            weather_frame(&fetched.weather)?,
            energy_frame(&fetched.energy)?,
        )
    }

    /// Re-runs merge and quality from the raw files of a previous fetch.
    pub fn process_from_disk(&self) -> Result<ProcessedData, PipelineError> {
        process_stored(
            &self.store,
            &self.config.cities,
            self.config.report_mode,
            self.today,
        )
    }

    pub fn analyze(&self, merged: &DataFrame) -> Result<AnalysisOutputs, PipelineError> {
        analyze_frame(&self.store, merged)
    }

    pub fn analyze_from_disk(&self) -> Result<AnalysisOutputs, PipelineError> {
        analyze_stored(&self.store)
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        info!("Starting full pipeline run");
        let fetched = self.fetch().await?;
        let processed = self.process(&fetched)?;
        let analysis = self.analyze(&processed.merged)?;
        info!("Pipeline run completed");

        Ok(RunSummary {
            weather_records: fetched.weather.len(),
            energy_records: fetched.energy.len(),
            merged_rows: processed.merged.height(),
            quality: processed.quality,
            analysis,
        })
    }
}

/// Merges, writes the quality report(s) and the merged table.
///
/// The quality report is written before the empty-batch check so a run that
/// joins nothing still leaves its diagnostics behind.
pub fn process_frames(
    store: &OutputStore,
    report_mode: ReportMode,
    today: NaiveDate,
    weather: DataFrame,
    energy: DataFrame,
) -> Result<ProcessedData, PipelineError> {
    let output = merge_frames(weather, energy)?;

    let quality = match report_mode {
        ReportMode::PerCity => {
            let reports = generate_city_reports(&output.joined, today)?;
            for report in &reports {
                let path = store.quality_path(Some(&report.scope));
                store.write_frame(&path, &mut report.to_frame()?)?;
            }
            reports
        }
        ReportMode::Aggregate => {
            let report = generate_quality_report(&output.joined, AGGREGATE_SCOPE, today)?;
            store.write_frame(&store.quality_path(None), &mut report.to_frame()?)?;
            vec![report]
        }
    };
    info!("Wrote {} quality report(s)", quality.len());

    let mut merged = output.merged;
    if merged.height() == 0 {
        return Err(PipelineError::DataAbsence(DataKind::Merged));
    }
    let path = store.merged_path();
    store.write_frame(&path, &mut merged)?;
    info!("Saved {} merged rows to {}", merged.height(), path.display());

    Ok(ProcessedData { merged, quality })
}

pub fn process_stored(
    store: &OutputStore,
    cities: &[City],
    report_mode: ReportMode,
    today: NaiveDate,
) -> Result<ProcessedData, PipelineError> {
    let weather = store.read_raw(DataKind::Weather, cities)?;
    let energy = store.read_raw(DataKind::Energy, cities)?;
    process_frames(store, report_mode, today, weather, energy)
}

/// Builds every summary table and writes each one.
pub fn analyze_frame(
    store: &OutputStore,
    merged: &DataFrame,
) -> Result<AnalysisOutputs, PipelineError> {
    if merged.height() == 0 {
        return Err(PipelineError::DataAbsence(DataKind::Merged));
    }
    let mut outputs = generate_analysis_report(merged)?;
    for (file_name, table) in outputs.tables_mut() {
        store.write_frame(&store.summary_path(file_name), table)?;
    }
    info!("Analysis outputs saved to {}", store.processed_dir().display());
    Ok(outputs)
}

pub fn analyze_stored(store: &OutputStore) -> Result<AnalysisOutputs, PipelineError> {
    let merged = store.read_frame(&store.merged_path())?;
    analyze_frame(store, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CORRELATION_FILE, HEATMAP_FILE};
    use crate::clients::error::FetchError;
    use crate::clients::retry_client::ApiRequest;
    use crate::config::FetchMode;
    use crate::test_support::{eia_page, noaa_page, ScriptedSource};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn cities() -> Vec<City> {
        vec![
            City::new("Chicago", "GHCND:USW00094846", "PJM", "Central"),
            City::new("Seattle", "GHCND:USW00024233", "SCL", "Pacific"),
        ]
    }

    fn config(dir: &std::path::Path, report_mode: ReportMode) -> PipelineConfig {
        PipelineConfig::builder()
            .noaa_api_key("noaa".to_string())
            .eia_api_key("eia".to_string())
            .cities(cities())
            .fetch_mode(FetchMode::History)
            .report_mode(report_mode)
            .data_dir(dir.to_path_buf())
            .build()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 3).unwrap()
    }

    fn healthy_upstream(request: &ApiRequest) -> Result<Value, FetchError> {
        if request.url.contains("ncei.noaa.gov") {
            let base = if request.query_value("stationid") == Some("GHCND:USW00094846") {
                150.0
            } else {
                100.0
            };
            Ok(noaa_page(&[
                ("2024-04-01T00:00:00", "TMAX", base),
                ("2024-04-01T00:00:00", "TMIN", base - 80.0),
                ("2024-04-02T00:00:00", "TMAX", base + 20.0),
                ("2024-04-02T00:00:00", "TMIN", base - 60.0),
            ]))
        } else {
            let tz = request.query_value("facets[timezone][]").map(str::to_string);
            Ok(eia_page(&[
                ("2024-04-01", tz.as_deref(), json!(1000)),
                ("2024-04-02", tz.as_deref(), json!("1100")),
            ]))
        }
    }

    #[tokio::test]
    async fn full_run_writes_every_table() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(
            ScriptedSource::new(healthy_upstream),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.weather_records, 4);
        assert_eq!(summary.energy_records, 4);
        assert_eq!(summary.merged_rows, 4);
        assert_eq!(summary.quality.len(), 2);
        assert!(summary
            .quality
            .iter()
            .all(|r| r.freshness().unwrap().is_fresh == Some(true)));

        let store = pipeline.store();
        for city in cities() {
            assert!(store.raw_path(DataKind::Weather, &city).exists());
            assert!(store.raw_path(DataKind::Energy, &city).exists());
            assert!(store.quality_path(Some(&city.name)).exists());
        }
        assert!(store.merged_path().exists());
        assert!(store.summary_path(CORRELATION_FILE).exists());
        assert!(store.summary_path(HEATMAP_FILE).exists());

        let geographic = &summary.analysis.geographic;
        let pct = geographic
            .column("energy_pct_change")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(pct.get(0), Some(10.0));
    }

    #[tokio::test]
    async fn failing_city_is_skipped() {
        let dir = tempdir().unwrap();
        let source = ScriptedSource::new(|request| {
            if request.query_value("stationid") == Some("GHCND:USW00024233") {
                return Err(FetchError::RetriesExhausted {
                    url: request.url.clone(),
                    attempts: 3,
                    last_error: "HTTP error 503 Service Unavailable".into(),
                });
            }
            healthy_upstream(request)
        });
        let pipeline =
            Pipeline::new(source, config(dir.path(), ReportMode::Aggregate)).with_today(today());

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.weather_records, 2);
        assert_eq!(summary.merged_rows, 2);
        assert_eq!(summary.quality.len(), 1);
        assert_eq!(summary.quality[0].scope, AGGREGATE_SCOPE);
        assert!(pipeline.store().quality_path(None).exists());
        assert!(!pipeline
            .store()
            .raw_path(DataKind::Weather, &cities()[1])
            .exists());
    }

    #[tokio::test]
    async fn no_energy_anywhere_is_fatal() {
        let dir = tempdir().unwrap();
        let source = ScriptedSource::new(|request| {
            if request.url.contains("eia.gov") {
                Ok(eia_page(&[]))
            } else {
                healthy_upstream(request)
            }
        });
        let pipeline =
            Pipeline::new(source, config(dir.path(), ReportMode::PerCity)).with_today(today());

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::DataAbsence(DataKind::Energy)));
        assert!(!pipeline.store().merged_path().exists());
    }

    #[tokio::test]
    async fn disjoint_dates_leave_nothing_to_analyze() {
        let dir = tempdir().unwrap();
        let source = ScriptedSource::new(|request| {
            if request.url.contains("eia.gov") {
                Ok(eia_page(&[("2024-03-01", None, json!(1000))]))
            } else {
                healthy_upstream(request)
            }
        });
        let pipeline =
            Pipeline::new(source, config(dir.path(), ReportMode::PerCity)).with_today(today());

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::DataAbsence(DataKind::Merged)));
    }

    #[tokio::test]
    async fn stages_rerun_from_disk() {
        let dir = tempdir().unwrap();
        let pipeline = Pipeline::new(
            ScriptedSource::new(healthy_upstream),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());
        pipeline.fetch().await.unwrap();

        let processed = pipeline.process_from_disk().unwrap();
        assert_eq!(processed.merged.height(), 4);

        let outputs = pipeline.analyze_from_disk().unwrap();
        assert_eq!(outputs.heatmap.shape(), (6, 8));
        assert_eq!(outputs.seasonal.height(), 2);
    }

    #[tokio::test]
    async fn refetch_drops_raw_files_of_cities_without_data() {
        let dir = tempdir().unwrap();
        let first = Pipeline::new(
            ScriptedSource::new(healthy_upstream),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());
        first.fetch().await.unwrap();

        let seattle = &cities()[1];
        let second = Pipeline::new(
            ScriptedSource::new(|request| {
                if request.query_value("stationid") == Some("GHCND:USW00024233") {
                    Ok(json!({}))
                } else {
                    healthy_upstream(request)
                }
            }),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());
        second.fetch().await.unwrap();

        assert!(!second.store().raw_path(DataKind::Weather, seattle).exists());
        let processed = second.process_from_disk().unwrap();
        assert_eq!(processed.merged.height(), 2);
    }

    #[tokio::test]
    async fn failed_refetch_leaves_no_old_raw_data() {
        let dir = tempdir().unwrap();
        let first = Pipeline::new(
            ScriptedSource::new(healthy_upstream),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());
        first.fetch().await.unwrap();

        let second = Pipeline::new(
            ScriptedSource::new(|request| {
                if request.url.contains("ncei.noaa.gov") {
                    Ok(json!({}))
                } else {
                    healthy_upstream(request)
                }
            }),
            config(dir.path(), ReportMode::PerCity),
        )
        .with_today(today());

        let err = second.fetch().await.unwrap_err();
        assert!(matches!(err, PipelineError::DataAbsence(DataKind::Weather)));

        let err = second.process_from_disk().unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[tokio::test]
    async fn daily_mode_survives_weather_lag() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::builder()
            .noaa_api_key("noaa".to_string())
            .eia_api_key("eia".to_string())
            .cities(cities())
            .data_dir(dir.path().to_path_buf())
            .build();
        assert_eq!(config.fetch_mode, FetchMode::Daily);

        let source = ScriptedSource::new(|request| {
            if request.url.contains("eia.gov") {
                let tz = request.query_value("facets[timezone][]").map(str::to_string);
                Ok(eia_page(&[
                    ("2024-04-01", tz.as_deref(), json!(1000)),
                    ("2024-04-02", tz.as_deref(), json!(1100)),
                    ("2024-04-03", tz.as_deref(), json!(1200)),
                ]))
            } else {
                healthy_upstream(request)
            }
        });
        let pipeline = Pipeline::new(source, config)
            .with_today(NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.merged_rows, 4);
        let pct = summary
            .analysis
            .geographic
            .column("energy_pct_change")
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(pct.get(0), Some(10.0));
    }

    #[test]
    fn later_stages_need_earlier_outputs() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let err = analyze_stored(&store).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));

        let err = process_stored(&store, &cities(), ReportMode::PerCity, today()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }
}
