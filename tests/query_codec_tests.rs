use mortality_chart_state::api::{
    BaselineMethod, ChartPatch, Field, FieldEdit, Metric, QueryParams, SessionConfig, View,
    ViewStateMachine, decode_flag, decode_query, encode_flag,
};
use mortality_chart_state::core::ChartType;

fn machine() -> ViewStateMachine {
    ViewStateMachine::new(&SessionConfig::default())
}

#[test]
fn flags_encode_as_one_or_absent() {
    assert_eq!(encode_flag(true, false), Some("1"));
    assert_eq!(encode_flag(false, false), None);
    assert_eq!(encode_flag(true, true), Some("1"));
    assert_eq!(encode_flag(false, true), Some("0"));
    assert_eq!(decode_flag(Some("1")), Some(true));
    assert_eq!(decode_flag(Some("0")), Some(false));
    assert_eq!(decode_flag(Some("true")), None);
    assert_eq!(decode_flag(None), None);
}

#[test]
fn decode_reads_every_known_key() {
    let query = QueryParams::parse(
        "c=USA&c=GBR&ag=0-14&ct=fluseason&t=cmr&sp=esp&cs=bar&df=2015/16&dt=2022/23\
         &ss=2010/11&sb=1&bm=mean&bdf=2016/17&bdt=2018/19&pi=0&cum=1&p=1&lg=1",
    );
    let decoded = decode_query(&query);
    assert!(decoded.rejected.is_empty());
    assert_eq!(decoded.view, View::Mortality);
    assert_eq!(decoded.overrides.fields().len(), Field::ALL.len());
    assert_eq!(
        decoded.overrides.countries.as_deref(),
        Some(&["USA".to_owned(), "GBR".to_owned()][..])
    );
    assert_eq!(decoded.overrides.chart_type, Some(ChartType::FluSeason));
    assert_eq!(decoded.overrides.metric, Some(Metric::Cmr));
    assert_eq!(decoded.overrides.baseline_method, Some(BaselineMethod::Mean));
    assert_eq!(decoded.overrides.show_prediction_interval, Some(false));
}

#[test]
fn malformed_values_are_rejected_not_overridden() {
    let decoded = decode_query(&QueryParams::parse("ct=hourly&sb=yes&t=asmr&c="));
    let rejected: Vec<&str> = decoded.rejected.iter().map(|param| param.key.as_str()).collect();
    assert_eq!(rejected, vec!["c", "ct", "sb"]);
    assert_eq!(decoded.overrides.fields().len(), 1);
    assert_eq!(decoded.overrides.metric, Some(Metric::Asmr));
}

#[test]
fn only_user_set_fields_are_encoded() {
    let machine = machine();
    let resolved = machine.resolve(View::Mortality, ChartPatch::new());
    assert_eq!(machine.encode(&resolved).to_query_string(), "");

    let (resolved, _) = machine.resolve_initial(&QueryParams::parse("c=DEU&ct=monthly"));
    let encoded = machine.encode(&resolved);
    assert_eq!(encoded.to_query_string(), "c=DEU&ct=monthly");
}

#[test]
fn view_marker_is_written_first() {
    let machine = machine();
    let (resolved, _) = machine.resolve_initial(&QueryParams::parse("c=SWE&zs=1"));
    assert_eq!(machine.encode(&resolved).to_query_string(), "zs=1&c=SWE");
}

#[test]
fn false_is_written_only_against_a_true_default() {
    let machine = machine();
    let resolved = machine.resolve(View::Mortality, ChartPatch::new());
    let edited = machine.apply_edits(
        &resolved,
        [
            FieldEdit::ShowBaseline(false),
            FieldEdit::ShowLogarithmic(false),
        ],
    );
    assert_eq!(machine.encode(&edited).to_query_string(), "sb=0");
}

#[test]
fn constrained_override_ending_false_is_left_out() {
    let machine = machine();
    let (resolved, _) = machine.resolve_initial(&QueryParams::parse("zs=1&lg=1"));
    assert!(resolved.user_overrides().contains(&Field::ShowLogarithmic));
    assert!(!resolved.state().show_logarithmic);

    let query = machine.encode(&resolved).to_query_string();
    assert_eq!(query, "zs=1");

    let (restored, _) = machine.resolve_initial(&QueryParams::parse(&query));
    assert_eq!(restored.state(), resolved.state());
    assert!(!restored.user_overrides().contains(&Field::ShowLogarithmic));
}

#[test]
fn encoded_values_are_the_constrained_ones() {
    let machine = machine();
    let (resolved, _) = machine.resolve_initial(&QueryParams::parse("e=1&sb=0"));
    let encoded = machine.encode(&resolved);
    assert_eq!(encoded.first("sb"), Some("1"));
}

#[test]
fn encode_then_decode_restores_view_and_overrides() {
    let machine = machine();
    let (resolved, _) = machine.resolve_initial(&QueryParams::parse(
        "e=1&c=USA&c=ITA&ct=quarterly&df=2019%20Q1&cum=1&bm=naive",
    ));
    let query = machine.encode(&resolved).to_query_string();
    let (restored, rejected) = machine.resolve_initial(&QueryParams::parse(&query));

    assert!(rejected.is_empty());
    assert_eq!(restored.view(), resolved.view());
    assert_eq!(restored.state(), resolved.state());
    assert_eq!(restored.user_overrides(), resolved.user_overrides());
    assert_eq!(restored.state().date_from.as_deref(), Some("2019 Q1"));
}
