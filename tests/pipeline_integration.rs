use std::fs;

use racecard_normalizer::csv_out::write_csv;
use racecard_normalizer::feeds::{collect_feed_dir, load_all};
use racecard_normalizer::filter::FilterConfig;
use racecard_normalizer::pipeline::PipelineConfig;
use racecard_normalizer::{GroupKeySpec, GroupNode, SourceFormatHint, field, group, normalize};
use tempfile::tempdir;

fn write(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p
}

#[test]
fn documented_time_examples() {
    let t = normalize(Some("13h30"), Some(SourceFormatHint::Continental));
    assert_eq!((t.display.as_str(), t.sort_minutes), ("1:30 pm", 810));
    let t = normalize(Some("2.38pm"), None);
    assert_eq!((t.display.as_str(), t.sort_minutes), ("2:38 pm", 878));
    assert_eq!(normalize(Some("14:05"), None).sort_minutes, 845);
    assert_eq!(normalize(Some("12am"), None).sort_minutes, 0);
    assert_eq!(normalize(Some("12pm"), None).sort_minutes, 720);
    for t in [normalize(Some(""), None), normalize(None, None), normalize(Some("garbage"), None)] {
        assert_eq!((t.display.as_str(), t.sort_minutes), ("-", 1440));
    }
}

#[test]
fn duplicate_race_in_same_date_and_track_is_kept_once() {
    let recs = racecard_normalizer::feeds::parse_records_str(r#"[
        {"date":"2024-01-01","track":"Ascot","raceId":"r1","going":"good"},
        {"date":"2024-01-01","track":"Ascot","raceId":"r1","going":"soft"},
        {"date":"2024-01-01","track":"Ascot","raceId":"r2","going":"soft"}
    ]"#)
    .unwrap();
    let spec = GroupKeySpec::new(field("date"), field("raceId")).then(field("track"));
    let tree = group(&recs[..2], &spec);
    let leaf = tree.leaf(&["2024-01-01", "Ascot"]).unwrap();
    assert_eq!(leaf.len(), 1);
    assert_eq!(leaf[0].text("going").as_deref(), Some("good"));

    let tree = group(&recs, &spec);
    assert!(matches!(tree.get("2024-01-01"), Some(GroupNode::Branch(_))));
    assert_eq!(tree.flatten().len(), 2);
}

#[test]
fn feed_dir_to_csv_end_to_end() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a_uk.json", r#"{"data":[
        {"Course":"Ascot","RaceDate":"03/02/2024","Time":"2.38pm","RaceID":"11","Horse":"Alpha"},
        {"Course":"Ascot","RaceDate":"03/02/2024","Time":"1.15pm","RaceID":"10","Horse":"Bravo"}
    ]}"#);
    write(dir.path(), "b_fr.json", r#"[
        {"Course":"Ascot","RaceDate":"2024-02-03","Time":"2:38 pm","RaceID":"11","Horse":"Alpha 2"},
        {"Course":"Chantilly","RaceDate":"2024-02-02","Time":"tbc","RaceID":"20","Horse":"Charlie"},
        {"Course":null,"RaceDate":"2024-02-02","Time":"3pm","RaceID":"21","Horse":"Nowhere"}
    ]"#);
    write(dir.path(), "broken.json", "{ not json");
    write(dir.path(), "notes.txt", "ignored");

    let files = collect_feed_dir(dir.path()).unwrap();
    assert_eq!(files.len(), 3);
    let records = load_all(&files, &[]);
    assert_eq!(records.len(), 5);

    let cfg = PipelineConfig {
        time_fields: vec!["Time".into()],
        hint: None,
        group_by: vec!["RaceDate".into(), "Course".into()],
        date_levels: vec![0],
        dedup: vec!["RaceID".into()],
        filter: FilterConfig::default(),
        sort_keys: true,
    };
    let prepared = cfg.prepare(&records);
    let (tree, stats) = cfg.group(&prepared).unwrap();
    assert_eq!(stats.excluded_missing_key, 1);
    assert_eq!(stats.duplicates_dropped, 1);
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["2024-02-02", "2024-02-03"]);

    let out = dir.path().join("out.csv");
    let n = write_csv(&tree, &cfg.level_names(), &["Horse".to_string()], &out).unwrap();
    assert_eq!(n, 3);
    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "RaceDate,Course,display_time,sort_minutes,Horse");
    assert_eq!(lines[1], "2024-02-02,Chantilly,-,1440,Charlie");
    assert_eq!(lines[2], "2024-02-03,Ascot,1:15 pm,795,Bravo");
    assert_eq!(lines[3], "2024-02-03,Ascot,2:38 pm,878,Alpha");
}

#[test]
fn filter_runs_before_grouping() {
    let recs = racecard_normalizer::feeds::parse_records_str(r#"[
        {"date":"2024-01-01","track":"Ascot","raceId":"1","type":"Flat"},
        {"date":"2024-01-01","track":"Ascot","raceId":"2","type":"Hurdle"}
    ]"#)
    .unwrap();
    let cfg = PipelineConfig {
        time_fields: vec!["time".into()],
        group_by: vec!["date".into(), "track".into()],
        dedup: vec!["raceId".into()],
        filter: FilterConfig::from_clauses(&["type=Hurdle"]).unwrap(),
        ..PipelineConfig::default()
    };
    let prepared = cfg.prepare(&recs);
    let (tree, _) = cfg.group(&prepared).unwrap();
    let leaf = tree.leaf(&["2024-01-01", "Ascot"]).unwrap();
    assert_eq!(leaf.len(), 1);
    assert_eq!(leaf[0].text("raceId").as_deref(), Some("2"));
}
