use std::fs;
use std::io::Cursor;
use survey_scoring::{
    create_key, score_surveys, Cell, ErrorKind, KeyStore, ResponseBounds, ResponseTable,
    ScoreOptions, ScoringError, ScoringMethod, SubscaleMap,
};
use tempfile::{tempdir, TempDir};

const HEXACO_MAP: &str = include_str!("../../../demos/hexaco_subscales.json");

fn likert() -> ResponseBounds {
    ResponseBounds::new(1, 5).expect("valid bounds")
}

fn store_with(keys: &[(&str, &str)]) -> (TempDir, KeyStore) {
    let dir = tempdir().expect("tempdir");
    let store = KeyStore::new(dir.path().join("keys"));
    for (scale, map) in keys {
        let map = SubscaleMap::from_json_str(map).expect("map parses");
        create_key(&store, scale, &map, likert()).expect("key created");
    }
    (dir, store)
}

fn numbers(table: &ResponseTable, column: &str) -> Vec<Option<f64>> {
    table
        .column_values(column)
        .expect("column present")
        .into_iter()
        .map(Cell::as_number)
        .collect()
}

fn sample_csv() -> &'static str {
    "participant,T_1,T_2,T_3\np-1,5,1,3\np-2,1,5,3\n"
}

#[test]
fn scores_hand_computed_example() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new(sample_csv())).expect("data parses");

    let scored =
        score_surveys(&store, &data, &["T"], &ScoreOptions::default()).expect("scoring succeeds");

    assert_eq!(numbers(&scored.table, "A"), vec![Some(5.0), Some(1.0)]);
    assert_eq!(numbers(&scored.table, "B"), vec![Some(2.0), Some(4.0)]);
    assert_eq!(
        scored.table.columns(),
        ["participant", "T_1", "T_2", "T_3", "A", "B"]
    );

    let mut output = Vec::new();
    scored.table.to_writer(&mut output).expect("write");
    assert_eq!(
        String::from_utf8(output).expect("utf8"),
        "participant,T_1,T_2,T_3,A,B\np-1,5,1,3,5,2\np-2,1,5,3,1,4\n"
    );
}

#[test]
fn method_names_parse_or_fail_fast() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new(sample_csv())).expect("data parses");

    let method: ScoringMethod = "sum".parse().expect("sum is known");
    let options = ScoreOptions::default().with_method(method);
    let scored = score_surveys(&store, &data, &["T"], &options).expect("scored");
    assert_eq!(numbers(&scored.table, "A"), vec![Some(10.0), Some(2.0)]);
    assert_eq!(numbers(&scored.table, "B"), vec![Some(4.0), Some(8.0)]);

    let err = "median".parse::<ScoringMethod>().expect_err("unknown method");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn missing_item_column_realigns_key_and_warns() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new("T_1,T_2\n5,1\n1,5\n")).expect("parses");

    let scored = score_surveys(&store, &data, &["T"], &ScoreOptions::default())
        .expect("mismatch is not fatal");

    assert_eq!(numbers(&scored.table, "A"), vec![Some(5.0), Some(1.0)]);
    assert_eq!(numbers(&scored.table, "B"), vec![Some(1.0), Some(5.0)]);

    assert_eq!(scored.mismatches.len(), 1);
    let mismatch = &scored.mismatches[0];
    assert_eq!(mismatch.scale, "T");
    assert_eq!(mismatch.key_columns, 3);
    assert_eq!(mismatch.data_columns, 2);
    assert_eq!(mismatch.missing_from_data, ["T_3"]);
    assert!(mismatch.unkeyed_in_data.is_empty());
    assert!(mismatch.to_string().contains("missing from data: T_3"));
}

#[test]
fn unkeyed_item_columns_contribute_to_nothing() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new("T_1,T_2,T_3,T_4\n5,1,3,99\n"))
        .expect("parses");

    let scored = score_surveys(&store, &data, &["T"], &ScoreOptions::default()).expect("scored");

    assert_eq!(numbers(&scored.table, "A"), vec![Some(5.0)]);
    assert_eq!(numbers(&scored.table, "B"), vec![Some(2.0)]);
    assert_eq!(scored.mismatches[0].unkeyed_in_data, ["T_4"]);
}

#[test]
fn unknown_scale_fails_before_any_column_is_added() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new(sample_csv())).expect("data parses");

    let err = score_surveys(&store, &data, &["T", "nope"], &ScoreOptions::default())
        .expect_err("unknown scale");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(err, ScoringError::Key(_)));
    assert_eq!(data.columns(), ["participant", "T_1", "T_2", "T_3"]);
}

#[test]
fn reversal_flag_is_irrelevant_without_reversed_items() {
    let (_dir, store) = store_with(&[("P", r#"{"Plain": [1, 2], "Solo": [3]}"#)]);
    let data =
        ResponseTable::from_reader(Cursor::new("P_1,P_2,P_3\n1,4,2\n5,2,\n")).expect("parses");

    let reversed = score_surveys(&store, &data, &["P"], &ScoreOptions::default())
        .expect("scored with reversal");
    let raw = score_surveys(
        &store,
        &data,
        &["P"],
        &ScoreOptions::default().with_reverse_score(false),
    )
    .expect("scored without reversal");

    assert_eq!(reversed, raw);
    assert_eq!(numbers(&raw.table, "Plain"), vec![Some(2.5), Some(3.5)]);
    assert_eq!(numbers(&raw.table, "Solo"), vec![Some(2.0), None]);
}

#[test]
fn pre_reversed_data_is_not_reversed_again() {
    let (_dir, store) = store_with(&[("T", r#"{"A": [1, "2R"], "B": [2, "3R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new("T_1,T_2,T_3\n5,5,3\n")).expect("parses");

    let options = ScoreOptions::default().with_reverse_score(false);
    let scored = score_surveys(&store, &data, &["T"], &options).expect("scored");
    assert_eq!(numbers(&scored.table, "A"), vec![Some(5.0)]);
}

#[test]
fn scales_score_from_original_columns_and_later_subscales_overwrite() {
    let (_dir, store) = store_with(&[
        ("T", r#"{"Total": [1, 2]}"#),
        ("U", r#"{"Total": [1], "U_only": ["2R"]}"#),
    ]);
    let data = ResponseTable::from_reader(Cursor::new("T_1,T_2,U_1,U_2\n1,3,4,5\n"))
        .expect("parses");

    let scored =
        score_surveys(&store, &data, &["T", "U"], &ScoreOptions::default()).expect("scored");

    assert_eq!(numbers(&scored.table, "Total"), vec![Some(4.0)]);
    assert_eq!(numbers(&scored.table, "U_only"), vec![Some(1.0)]);
    assert_eq!(
        scored.table.columns(),
        ["T_1", "T_2", "U_1", "U_2", "Total", "U_only"]
    );
}

#[test]
fn shared_items_are_reversed_independently_per_subscale() {
    let (_dir, store) = store_with(&[("S", r#"{"Parent": [1, "2R"], "Facet": ["2R"]}"#)]);
    let data = ResponseTable::from_reader(Cursor::new("S_1,S_2\n3,2\n")).expect("parses");

    let scored = score_surveys(&store, &data, &["S"], &ScoreOptions::default()).expect("scored");
    assert_eq!(numbers(&scored.table, "Parent"), vec![Some(3.5)]);
    assert_eq!(numbers(&scored.table, "Facet"), vec![Some(4.0)]);
}

#[test]
fn legacy_table_key_needs_fallback_bounds_for_reversal() {
    let dir = tempdir().expect("tempdir");
    let store = KeyStore::new(dir.path());
    fs::write(store.csv_path("old"), "subscale,old_1,old_2\nX,1,-1\n").expect("legacy key");
    let data = ResponseTable::from_reader(Cursor::new("old_1,old_2\n4,2\n")).expect("parses");

    let err = score_surveys(&store, &data, &["old"], &ScoreOptions::default())
        .expect_err("bounds required");
    assert!(matches!(err, ScoringError::MissingBounds { ref scale } if scale == "old"));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let options = ScoreOptions::default().with_fallback_bounds(likert());
    let scored = score_surveys(&store, &data, &["old"], &options).expect("scored");
    assert_eq!(numbers(&scored.table, "X"), vec![Some(4.0)]);

    let options = ScoreOptions::default().with_reverse_score(false);
    let scored = score_surveys(&store, &data, &["old"], &options).expect("scored");
    assert_eq!(numbers(&scored.table, "X"), vec![Some(3.0)]);
}

#[test]
fn hexaco_extremes_score_as_expected() {
    let (_dir, store) = store_with(&[("hexaco", HEXACO_MAP)]);
    let ids: Vec<u32> = (1..=60).chain(97..=100).collect();

    let mut csv = ids
        .iter()
        .map(|id| format!("hexaco_{id}"))
        .collect::<Vec<_>>()
        .join(",");
    csv.push('\n');
    csv.push_str(&vec!["3"; ids.len()].join(","));
    csv.push('\n');
    csv.push_str(&vec!["5"; ids.len()].join(","));
    csv.push('\n');

    let data = ResponseTable::from_reader(Cursor::new(csv)).expect("data parses");
    let scored =
        score_surveys(&store, &data, &["hexaco"], &ScoreOptions::default()).expect("scored");

    assert!(scored.mismatches.is_empty());
    for subscale in ["Honesty-Humility", "Modesty", "Altruism", "Creativity"] {
        assert_eq!(
            numbers(&scored.table, subscale)[0],
            Some(3.0),
            "midpoint answers stay at the midpoint for {subscale}"
        );
    }

    // All-5 answers: normal items stay 5, reversed items become 1.
    let sincerity = numbers(&scored.table, "Sincerity")[1].expect("sincerity scored");
    assert!((sincerity - 11.0 / 3.0).abs() < 1e-9);
    assert_eq!(numbers(&scored.table, "Modesty")[1], Some(1.0));
    assert_eq!(numbers(&scored.table, "Altruism")[1], Some(3.0));
    assert_eq!(numbers(&scored.table, "Honesty-Humility")[1], Some(2.6));
}
