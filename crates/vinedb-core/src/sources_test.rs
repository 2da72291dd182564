use std::io::Write;

use super::*;

fn wine(name: &str) -> SourceRecord {
    SourceRecord {
        kind: EntityKind::Wine,
        name_en: name.to_string(),
        name_zh: None,
        winery: None,
        country: None,
        category: None,
        region: None,
        vintage: None,
        external_url: None,
        price: None,
    }
}

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn duplicates_merge_first_non_empty_wins() {
    let mut first = wine("Château Exemple 2020 Rouge");
    first.region = Some("Bordeaux".to_string());
    let mut second = wine("Chateau Exemple 2020 Rouge");
    second.region = Some("Médoc".to_string());
    second.name_zh = Some("示例酒庄红葡萄酒".to_string());

    let merged = reconcile_records(vec![first, second]).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].region.as_deref(), Some("Bordeaux"));
    assert_eq!(merged[0].name_zh.as_deref(), Some("示例酒庄红葡萄酒"));
}

#[test]
fn same_name_different_kind_is_not_a_duplicate() {
    let mut winery = wine("Opus One");
    winery.kind = EntityKind::Winery;
    let merged = reconcile_records(vec![winery, wine("Opus One")]).unwrap();
    assert_eq!(merged.len(), 2);
}

#[test]
fn order_of_first_appearance_is_preserved() {
    let merged =
        reconcile_records(vec![wine("Beta"), wine("Alpha"), wine("beta")]).unwrap();
    let names: Vec<&str> = merged.iter().map(|r| r.name_en.as_str()).collect();
    assert_eq!(names, vec!["Beta", "Alpha"]);
}

#[test]
fn empty_name_is_rejected_with_row_number() {
    let err = reconcile_records(vec![wine("Valid"), wine("   ")]).unwrap_err();
    match err {
        ConfigError::Validation(msg) => assert!(msg.contains("record 2"), "msg: {msg}"),
        other => panic!("expected Validation, got: {other:?}"),
    }
}

#[test]
fn non_latin_only_name_is_rejected() {
    let err = reconcile_records(vec![wine("拉菲")]).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn vintage_inferred_from_name() {
    let merged = reconcile_records(vec![wine("Penfolds Grange 2016")]).unwrap();
    assert_eq!(merged[0].vintage, Some(2016));
}

#[test]
fn explicit_vintage_is_not_overridden() {
    let mut record = wine("Penfolds Grange 2016");
    record.vintage = Some(2015);
    let merged = reconcile_records(vec![record]).unwrap();
    assert_eq!(merged[0].vintage, Some(2015));
}

#[test]
fn blank_optional_fields_become_none() {
    let mut record = wine("Opus One");
    record.region = Some("  ".to_string());
    let merged = reconcile_records(vec![record]).unwrap();
    assert!(merged[0].region.is_none());
}

#[test]
fn draft_carries_parent_slug_and_price() {
    let mut record = wine("Overture");
    record.winery = Some("Opus One Winery".to_string());
    record.price = Some(PriceInput::Text("¥1,280.00".to_string()));
    let draft = record.to_draft();
    assert_eq!(draft.slug, "overture");
    assert_eq!(draft.parent_slug.as_deref(), Some("opus-one-winery"));
    assert_eq!(draft.fields.price, Some(Decimal::new(128_000, 2)));
}

#[test]
fn load_sources_yaml_wrapped() {
    let file = write_temp(
        ".yaml",
        r"
records:
  - kind: winery
    name_en: Opus One Winery
    country: USA
  - kind: wine
    name: Opus One 2019
    winery: Opus One Winery
    price: 3280
",
    );
    let records = load_sources(file.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, EntityKind::Winery);
    assert_eq!(records[1].name_en, "Opus One 2019");
    assert_eq!(records[1].vintage, Some(2019));
    assert_eq!(
        records[1].to_draft().fields.price,
        Some(Decimal::new(3280, 0))
    );
}

#[test]
fn load_sources_json_list() {
    let file = write_temp(
        ".json",
        r#"[{"kind": "wine", "name_en": "Sassicaia 2018", "name_zh": "西施佳雅"}]"#,
    );
    let records = load_sources(file.path()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name_zh.as_deref(), Some("西施佳雅"));
}

#[test]
fn load_sources_csv_with_empty_cells() {
    let file = write_temp(
        ".csv",
        "kind,name_en,name_zh,winery,country,category,region,vintage,external_url,price\n\
         wine,Tignanello 2019,,Antinori,Italy,red,Tuscany,,,\n\
         wine,Tignanello 2019,天娜,,,,,,,\n",
    );
    let records = load_sources(file.path()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name_zh.as_deref(), Some("天娜"));
    assert_eq!(records[0].winery.as_deref(), Some("Antinori"));
    assert_eq!(records[0].vintage, Some(2019));
}

#[test]
fn load_sources_rejects_unknown_extension() {
    let file = write_temp(".txt", "kind: wine");
    let err = load_sources(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::SourcesFileParse { .. }));
}

#[test]
fn load_sources_missing_file_is_io_error() {
    let err = load_sources(Path::new("/nonexistent/sources.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SourcesFileIo { .. }));
}
