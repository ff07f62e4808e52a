use std::fs;
use std::path::Path;

use sentio::dataset::{read_examples, stratified_split};
use sentio::{DataError, DatasetPreparer, LabelMapping, PreparationConfig, SplitRatios, EMOTIONS};

/// GoEmotions-style export: metadata columns plus one indicator column per emotion.
fn write_indicator_csv(path: &Path) {
    let mut csv = String::from("text,id,author,example_very_unclear,anger,joy,sadness,gratitude\n");
    for i in 0..20 {
        csv.push_str(&format!("so happy about number {},a{},u1,False,0,1,0,0\n", i, i));
    }
    for i in 0..10 {
        csv.push_str(&format!("angry about number {},b{},u2,False,1,0,0,0\n", i, i));
    }
    for i in 0..10 {
        csv.push_str(&format!("sad and grateful {},c{},u3,False,0,0,1,1\n", i, i));
    }
    csv.push_str("nobody labeled this,d0,u4,True,,,,\n");
    csv.push_str(",d1,u4,False,0,1,0,0\n");
    fs::write(path, csv).unwrap();
}

#[test]
fn test_prepare_indicator_columns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("goemotions_1.csv");
    write_indicator_csv(&input);

    let preparer = DatasetPreparer::new(PreparationConfig {
        shuffle_seed: Some(7),
        ..PreparationConfig::default()
    });
    let outcome = preparer.prepare(&[&input], dir.path())?;

    assert_eq!(outcome.report.total_rows, 42);
    assert_eq!(outcome.report.kept_rows, 40);
    assert_eq!(outcome.report.dropped_missing_labels, 1);
    assert_eq!(outcome.report.dropped_empty_text, 1);
    assert!(outcome.splits.is_none());

    let examples = read_examples(&outcome.processed)?;
    assert_eq!(examples.len(), 40);
    let input_columns = ["anger", "joy", "sadness", "gratitude"];
    assert!(examples.iter().all(|e| input_columns.contains(&e.emotion.as_str())));
    // Ties between indicator columns go to the earlier column
    assert!(examples.iter().filter(|e| e.text.starts_with("sad and grateful")).all(|e| e.emotion == "sadness"));
    assert!(!examples.iter().any(|e| e.text == "nobody labeled this"));

    let mapping = LabelMapping::load(&outcome.mapping)?;
    assert_eq!(mapping.names(), &["joy", "anger", "sadness"]);
    Ok(())
}

#[test]
fn test_prepare_label_codes_with_split() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("train.tsv");
    let mut tsv = String::from("text\tlabel\tid\n");
    for i in 0..30 {
        tsv.push_str(&format!("joyful line {}\t17\tx{}\n", i, i));
        tsv.push_str(&format!("grateful line {}\t15,27\ty{}\n", i, i));
    }
    tsv.push_str("mystery line\t99\tz0\n");
    fs::write(&input, tsv)?;

    let preparer = DatasetPreparer::new(PreparationConfig {
        shuffle_seed: Some(1),
        split: Some(SplitRatios::default()),
        ..PreparationConfig::default()
    });
    let outcome = preparer.prepare(&[&input], dir.path().join("out"))?;
    assert_eq!(outcome.report.dropped_unknown_codes, 1);

    let (train, val, test) = outcome.splits.expect("split files");
    let train = read_examples(&train)?;
    let val = read_examples(&val)?;
    let test = read_examples(&test)?;
    assert_eq!(train.len(), 48);
    assert_eq!(val.len(), 6);
    assert_eq!(test.len(), 6);
    assert_eq!(train.iter().filter(|e| e.emotion == "joy").count(), 24);
    assert!(test.iter().all(|e| e.emotion == "joy" || e.emotion == "gratitude"));
    Ok(())
}

#[test]
fn test_stratified_split_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    write_indicator_csv(&input);
    let dataset = DatasetPreparer::new(PreparationConfig {
        shuffle_seed: Some(3),
        ..PreparationConfig::default()
    })
    .load(&[&input])
    .unwrap();

    let a = stratified_split(&dataset.examples, SplitRatios::default(), 42).unwrap();
    let b = stratified_split(&dataset.examples, SplitRatios::default(), 42).unwrap();
    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);
    assert_eq!(a.train.len() + a.validation.len() + a.test.len(), dataset.examples.len());
}

#[test]
fn test_no_label_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    fs::write(&input, "text,score\nhello,3\n").unwrap();
    let result = DatasetPreparer::default().prepare(&[&input], dir.path());
    assert!(matches!(result, Err(DataError::NoLabelSource)));
}

#[test]
fn test_missing_text_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    fs::write(&input, "body,emotion\nhello,joy\n").unwrap();
    let result = DatasetPreparer::default().load(&[&input]);
    assert!(matches!(result, Err(DataError::MissingColumn(c)) if c == "text"));
}

#[test]
fn test_builtin_mapping_matches_code_table() {
    let mapping = LabelMapping::builtin();
    assert_eq!(mapping.len(), EMOTIONS.len());
    assert_eq!(mapping.name_of(17), Some("joy"));
    assert_eq!(mapping.index_of("neutral"), Some(27));
}
