use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mortality_chart_state::api::{
    AggregationRequest, ChartSession, ChartStyle, DatasetFetcher, Field, FieldEdit, IssueKind,
    ProgressCallback, RefreshOutcome, SeriesAggregator, SeriesBundle, SessionConfig, UpdateOptions,
    UpdatePlan, View,
};
use mortality_chart_state::core::{BasicAccess, ChartType, CountrySeries, Dataset, DateRange};
use mortality_chart_state::ChartResult;

/// Serves one dataset per granularity; unknown granularities get an empty one.
struct TableFetcher {
    datasets: Vec<(ChartType, Dataset)>,
    delay: Duration,
}

#[async_trait]
impl DatasetFetcher for TableFetcher {
    async fn fetch(
        &self,
        chart_type: ChartType,
        _countries: &[String],
        _age_groups: &[String],
    ) -> ChartResult<Dataset> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self
            .datasets
            .iter()
            .find(|(candidate, _)| *candidate == chart_type)
            .map(|(_, dataset)| dataset.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct EchoAggregator {
    requests: Mutex<Vec<AggregationRequest>>,
}

#[async_trait]
impl SeriesAggregator for EchoAggregator {
    async fn aggregate(
        &self,
        request: AggregationRequest,
        _progress: ProgressCallback,
    ) -> ChartResult<SeriesBundle> {
        self.requests.lock().push(request);
        Ok(SeriesBundle::default())
    }
}

fn series_for(labels: Vec<String>) -> Dataset {
    let values = vec![Some(700.0); labels.len()];
    ["USA", "SWE", "DEU"]
        .into_iter()
        .fold(Dataset::new(), |dataset, iso3c| {
            dataset.with_series(
                CountrySeries::new(iso3c, "all", labels.clone())
                    .with_field("asmr_who", values.clone())
                    .with_field("cmr", values.clone()),
            )
        })
}

fn fetcher(delay: Duration) -> Arc<TableFetcher> {
    let yearly = (1995..=2023).map(|year| year.to_string()).collect();
    let flu = (2015..=2022)
        .map(|year| format!("{year}/{:02}", (year + 1) % 100))
        .collect();
    Arc::new(TableFetcher {
        datasets: vec![
            (ChartType::Yearly, series_for(yearly)),
            (ChartType::FluSeason, series_for(flu)),
        ],
        delay,
    })
}

fn session(query: &str) -> ChartSession {
    ChartSession::from_query(
        SessionConfig::default(),
        query,
        fetcher(Duration::ZERO),
        Arc::new(EchoAggregator::default()),
    )
    .expect("session")
}

#[tokio::test]
async fn untouched_dates_stay_out_of_the_query_string() {
    let session = session("c=USA");
    let outcome = session.refresh(UpdateOptions::default()).await.expect("refresh");
    assert!(outcome.applied().is_some());

    assert_eq!(session.state().date_from, None);
    assert_eq!(session.state().date_to, None);
    assert_eq!(session.selected_range(), DateRange::new("1995", "2023"));
    assert_eq!(session.query_string(), "c=USA");
}

#[tokio::test]
async fn basic_access_floors_visible_labels() {
    let session = session("").with_access_policy(Arc::new(BasicAccess));
    session.refresh(UpdateOptions::default()).await.expect("refresh");

    let visible = session.visible_labels();
    assert_eq!(visible.first().map(String::as_str), Some("2000"));
    assert_eq!(
        session.available_range().map(|bounds| bounds.min),
        Some("1995".to_owned())
    );
}

#[tokio::test]
async fn granularity_change_keeps_the_date_year_and_fixes_the_url() {
    let session = session("df=2021");
    session.refresh(UpdateOptions::default()).await.expect("refresh");

    session.edit(FieldEdit::ChartType(ChartType::FluSeason));
    assert_eq!(session.state().date_from.as_deref(), Some("2021/22"));
    assert_eq!(session.take_pending_plan(), UpdatePlan::Refetch);

    session.refresh(UpdateOptions::default()).await.expect("refresh");
    assert_eq!(session.state().date_from.as_deref(), Some("2021/22"));
    assert!(session.query_string().contains("df=2021%2F22"));
}

#[tokio::test]
async fn invalid_dates_are_auto_fixed_against_fresh_labels() {
    let session = session("df=1980&dt=2050&bdf=1900");
    session.refresh(UpdateOptions::default()).await.expect("refresh");

    let state = session.state();
    assert_eq!(state.date_from.as_deref(), Some("1995"));
    assert_eq!(state.date_to.as_deref(), Some("2023"));
    assert_eq!(state.baseline_from, None);
    assert!(!session.resolved().is_user_set(Field::BaselineFrom));
    assert!(session.query_string().contains("df=1995"));
}

#[tokio::test]
async fn repeated_issues_are_reported_once() {
    let session = session("");
    session.refresh(UpdateOptions::default()).await.expect("refresh");

    session.edit(FieldEdit::SliderStart(Some("1850".to_owned())));
    let first = session.auto_fix();
    assert_eq!(first.len(), 1);

    session.edit(FieldEdit::SliderStart(Some("1850".to_owned())));
    let second = session.auto_fix();
    assert!(second.is_empty());
    assert_eq!(session.state().slider_start, None);
}

#[tokio::test]
async fn no_data_reports_the_asmr_message() {
    let session = session("ct=monthly");
    let outcome = session.refresh(UpdateOptions::default()).await.expect("refresh");
    let RefreshOutcome::NoData { message } = outcome else {
        panic!("expected no data");
    };
    assert!(message.contains("age-standardized"));
    assert!(session.labels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn result_for_a_superseded_request_is_discarded() {
    let session = ChartSession::from_query(
        SessionConfig::default(),
        "c=USA",
        fetcher(Duration::from_secs(1)),
        Arc::new(EchoAggregator::default()),
    )
    .expect("session");

    let (outcome, ()) = tokio::join!(session.refresh(UpdateOptions::default()), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.edit(FieldEdit::Countries(vec!["DEU".to_owned()]));
    });

    assert!(matches!(outcome.expect("refresh"), RefreshOutcome::Stale));
    assert!(session.latest_result().is_none());
    assert_eq!(session.pending_plan(), UpdatePlan::Refetch);
}

#[tokio::test(start_paused = true)]
async fn concurrent_refresh_is_busy() {
    let session = ChartSession::from_query(
        SessionConfig::default(),
        "",
        fetcher(Duration::from_secs(1)),
        Arc::new(EchoAggregator::default()),
    )
    .expect("session");

    let (first, second) = tokio::join!(
        session.refresh(UpdateOptions::default()),
        session.refresh(UpdateOptions::default()),
    );
    assert!(first.expect("first").applied().is_some());
    assert!(matches!(second.expect("second"), RefreshOutcome::Busy));
}

#[tokio::test(start_paused = true)]
async fn busy_refresh_keeps_the_pending_refetch() {
    let session = ChartSession::from_query(
        SessionConfig::default(),
        "c=USA",
        fetcher(Duration::from_secs(1)),
        Arc::new(EchoAggregator::default()),
    )
    .expect("session");

    let (first, second) = tokio::join!(session.refresh(UpdateOptions::default()), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.edit(FieldEdit::Countries(vec!["DEU".to_owned()]));
        session.refresh(UpdateOptions::default()).await
    });

    assert!(matches!(first.expect("first"), RefreshOutcome::Stale));
    assert!(matches!(second.expect("second"), RefreshOutcome::Busy));
    assert_eq!(session.pending_plan(), UpdatePlan::Refetch);

    let retried = session
        .refresh(UpdateOptions::default())
        .await
        .expect("retry");
    let result = retried.applied().expect("current state applied");
    assert_eq!(result.request.countries, vec!["DEU".to_owned()]);
    assert_eq!(session.pending_plan(), UpdatePlan::None);
}

#[tokio::test]
async fn redraw_only_edits_do_not_stale_a_result() {
    let session = session("e=1");
    session.take_pending_plan();
    session.edit(FieldEdit::ChartStyle(ChartStyle::Line));
    assert_eq!(session.take_pending_plan(), UpdatePlan::Redraw);

    let outcome = session.refresh(UpdateOptions::default()).await.expect("refresh");
    assert!(outcome.applied().is_some());
}

#[tokio::test]
async fn progressive_refresh_swaps_in_baselines() {
    let aggregator = Arc::new(EchoAggregator::default());
    let session = ChartSession::from_query(
        SessionConfig::default(),
        "e=1",
        fetcher(Duration::ZERO),
        Arc::clone(&aggregator) as Arc<dyn SeriesAggregator>,
    )
    .expect("session");

    let progressive = session
        .refresh_progressive(UpdateOptions::default())
        .await
        .expect("refresh");
    assert!(progressive.outcome.applied().is_some());
    let injector = progressive.injector.expect("excess view needs baselines");

    let completed = session.complete_baselines(injector).await.expect("baselines");
    assert!(completed.applied().is_some());

    let requests = aggregator.requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].baseline_method.is_none());
    assert!(requests[1].extra_keys.iter().any(|key| key == "asmr_who_excess"));
}

#[tokio::test]
async fn baselines_from_an_older_request_are_not_applied() {
    let aggregator = Arc::new(EchoAggregator::default());
    let session = ChartSession::from_query(
        SessionConfig::default(),
        "e=1&c=USA",
        fetcher(Duration::ZERO),
        Arc::clone(&aggregator) as Arc<dyn SeriesAggregator>,
    )
    .expect("session");

    let progressive = session
        .refresh_progressive(UpdateOptions::default())
        .await
        .expect("refresh");
    let injector = progressive.injector.expect("excess view needs baselines");

    session.edit(FieldEdit::Countries(vec!["DEU".to_owned()]));
    let refreshed = session
        .refresh(UpdateOptions::default())
        .await
        .expect("refresh");
    assert!(refreshed.applied().is_some());

    let completed = session.complete_baselines(injector).await.expect("baselines");
    assert!(matches!(completed, RefreshOutcome::Stale));

    let latest = session.latest_result().expect("latest result");
    assert_eq!(latest.request.countries, vec!["DEU".to_owned()]);
    assert_eq!(aggregator.requests.lock().len(), 2);
}

#[test]
fn rejected_query_params_surface_once() {
    let session = session("");
    let (_, issues) = session.load_query("ct=hourly&c=SWE");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::RejectedParam(Field::ChartType));
    assert_eq!(session.state().countries, vec!["SWE".to_owned()]);

    let (_, repeated) = session.load_query("ct=hourly&c=SWE");
    assert!(repeated.is_empty());
}

#[test]
fn switching_views_updates_the_store_and_schedules_a_refetch() {
    let session = session("e=1&cs=line&c=SWE");
    let change = session.switch_view(View::Zscore);

    assert!(change.view_changed);
    assert_eq!(session.view(), View::Zscore);
    assert!(!session.store().is_user_set(Field::ChartStyle));
    assert!(session.store().is_user_set(Field::Countries));
    assert_eq!(session.pending_plan(), UpdatePlan::Refetch);
    assert_eq!(session.query_string(), "zs=1&c=SWE");
}

#[test]
fn invalid_config_is_rejected() {
    let result = ChartSession::new(
        SessionConfig::default().with_max_constraint_passes(0),
        fetcher(Duration::ZERO),
        Arc::new(EchoAggregator::default()),
    );
    assert!(result.is_err());
}
