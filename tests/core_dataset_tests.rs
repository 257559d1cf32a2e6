use mortality_chart_state::core::{ChartType, CountrySeries, Dataset, derive_labels};

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[test]
fn labels_are_the_union_over_selected_countries() {
    let dataset = Dataset::new()
        .with_series(
            CountrySeries::new("USA", "all", ["2018", "2019", "2020"])
                .with_field("cmr", vec![Some(1.0), Some(1.0), Some(1.0)]),
        )
        .with_series(
            CountrySeries::new("SWE", "all", ["2016", "2017", "2018"])
                .with_field("cmr", vec![Some(1.0), Some(1.0), Some(1.0)]),
        )
        .with_series(
            CountrySeries::new("DEU", "all", ["2010"]).with_field("cmr", vec![Some(1.0)]),
        );

    let labels = derive_labels(
        &dataset,
        ChartType::Yearly,
        &names(&["USA", "SWE"]),
        &names(&["all"]),
        "cmr",
    )
    .expect("labels");
    assert_eq!(labels.to_vec(), names(&["2016", "2017", "2018", "2019", "2020"]));
}

#[test]
fn labels_without_a_value_for_the_key_are_skipped() {
    let dataset = Dataset::new().with_series(
        CountrySeries::new("USA", "all", ["2018", "2019", "2020"])
            .with_field("asmr_who", vec![None, Some(600.0), Some(650.0)])
            .with_field("cmr", vec![Some(800.0), Some(810.0), Some(900.0)]),
    );

    let asmr = derive_labels(
        &dataset,
        ChartType::Yearly,
        &names(&["USA"]),
        &names(&["all"]),
        "asmr_who",
    )
    .expect("labels");
    assert_eq!(asmr.first(), Some("2019"));

    let missing = derive_labels(
        &dataset,
        ChartType::Yearly,
        &names(&["USA"]),
        &names(&["all"]),
        "asmr_esp",
    )
    .expect("labels");
    assert!(missing.is_empty());
}

#[test]
fn moving_average_drops_the_incomplete_leading_window() {
    let weeks: Vec<String> = (1..=15).map(|week| format!("2020-W{week:02}")).collect();
    let values = vec![Some(100.0); weeks.len()];
    let dataset = Dataset::new()
        .with_series(CountrySeries::new("SWE", "all", weeks).with_field("deaths", values));

    let labels = derive_labels(
        &dataset,
        ChartType::Weekly13WSma,
        &names(&["SWE"]),
        &names(&["all"]),
        "deaths",
    )
    .expect("labels");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.first(), Some("2020-W13"));
}

#[test]
fn age_groups_are_looked_up_independently() {
    let dataset = Dataset::new()
        .with_series(CountrySeries::new("USA", "0-64", ["2019"]).with_field("deaths", vec![Some(1.0)]))
        .with_series(CountrySeries::new("USA", "65+", ["2020"]).with_field("deaths", vec![Some(1.0)]));

    assert_eq!(dataset.len(), 2);
    assert!(dataset.get("all", "USA").is_none());

    let labels = derive_labels(
        &dataset,
        ChartType::Yearly,
        &names(&["USA"]),
        &names(&["0-64", "65+"]),
        "deaths",
    )
    .expect("labels");
    assert_eq!(labels.to_vec(), names(&["2019", "2020"]));
}

#[test]
fn labels_in_another_format_are_rejected() {
    let dataset = Dataset::new().with_series(
        CountrySeries::new("USA", "all", ["2020 Q1"]).with_field("deaths", vec![Some(1.0)]),
    );
    let result = derive_labels(
        &dataset,
        ChartType::Yearly,
        &names(&["USA"]),
        &names(&["all"]),
        "deaths",
    );
    assert!(result.is_err());
}
