use anyhow::Result;
use keycount::pipeline::{count_reader, PipelineOptions};
use keycount::{
    metrics::RunMetrics, CancelToken, Coordinator, CountConfig, CountError, KeywordSet,
    OutputFormat,
};
use std::fs;
use std::io::{BufReader, Cursor};
use std::num::NonZeroUsize;
use tempfile::{tempdir, TempDir};

fn write_fixture(dir: &TempDir, keywords: &str, text: &str) -> Result<CountConfig> {
    let keywords_path = dir.path().join("keywords.txt");
    let input_path = dir.path().join("input.txt");
    fs::write(&keywords_path, keywords)?;
    fs::write(&input_path, text)?;
    Ok(CountConfig::new(input_path, keywords_path, NonZeroUsize::new(3).unwrap()))
}

fn with_workers(config: &CountConfig, workers: usize) -> CountConfig {
    CountConfig {
        workers: NonZeroUsize::new(workers).unwrap(),
        ..config.clone()
    }
}

#[test]
fn test_concrete_scenario() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(
        &dir,
        "cat\ndog\n",
        "the cat sat\ndog eats cat food\nno animals here\n",
    )?;

    let report = keycount::run(&config)?;
    assert_eq!(
        report.render(OutputFormat::Text)?,
        "cat: 2\ndog: 1\nвсего: 3\n"
    );
    Ok(())
}

#[test]
fn test_worker_count_invariance() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(
        &dir,
        "cat\ndog\n",
        "the cat sat\ndog eats cat food\nno animals here\n",
    )?;

    let one = keycount::run(&with_workers(&config, 1))?.render(OutputFormat::Text)?;
    let eight = keycount::run(&with_workers(&config, 8))?.render(OutputFormat::Text)?;
    assert_eq!(one, eight);
    Ok(())
}

#[test]
fn test_large_input_is_deterministic() -> Result<()> {
    let dir = tempdir()?;
    let mut text = String::new();
    for i in 0..5000 {
        text.push_str(&format!(
            "Line {i}: TODO fix the Error handler, error {} of ERROR count\n",
            i % 7
        ));
        if i % 3 == 0 {
            text.push_str("nothing to see here\n");
        }
    }
    let config = write_fixture(&dir, "error\nTODO\nhandler\nmissing\n", &text)?;

    let baseline = keycount::run(&with_workers(&config, 1))?;
    assert_eq!(baseline.count_of("error"), Some(15000));
    assert_eq!(baseline.count_of("TODO"), Some(5000));
    assert_eq!(baseline.count_of("handler"), Some(5000));
    assert_eq!(baseline.count_of("missing"), Some(0));
    assert_eq!(baseline.total, 25000);

    for workers in [2, 4, 8, 16] {
        let report = keycount::run(&with_workers(&config, workers))?;
        assert_eq!(report.keywords, baseline.keywords, "{workers} workers");
        assert_eq!(report.total, baseline.total);
    }
    Ok(())
}

#[test]
fn test_total_is_sum_of_counts() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(
        &dir,
        "a\nan\nthe\n",
        "a cat and an owl\nthe end\nAnother THE\n",
    )?;

    let report = keycount::run(&config)?;
    let sum: u64 = report.keywords.iter().map(|k| k.count).sum();
    assert_eq!(report.total, sum);
    Ok(())
}

#[test]
fn test_empty_input_reports_zeroes() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(&dir, "cat\ndog\n", "")?;

    for workers in [1, 4, 32] {
        let report = keycount::run(&with_workers(&config, workers))?;
        assert_eq!(
            report.render(OutputFormat::Text)?,
            "cat: 0\ndog: 0\nвсего: 0\n"
        );
    }
    Ok(())
}

#[test]
fn test_keyword_file_error_comes_first() -> Result<()> {
    let dir = tempdir()?;
    let config = CountConfig::new(
        dir.path().join("no-input.txt"),
        dir.path().join("no-keywords.txt"),
        NonZeroUsize::new(2).unwrap(),
    );

    let err = keycount::run(&config).unwrap_err();
    assert!(matches!(err, CountError::KeywordFile { .. }));
    Ok(())
}

#[test]
fn test_missing_input_file() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_fixture(&dir, "cat\n", "cat\n")?;
    config.input_path = dir.path().join("gone.txt");

    let err = keycount::run(&config).unwrap_err();
    match err {
        CountError::InputFile { path, .. } => assert_eq!(path, dir.path().join("gone.txt")),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn test_canceled_run_reports_nothing() -> Result<()> {
    let dir = tempdir()?;
    let config = write_fixture(&dir, "cat\n", &"cat\n".repeat(1000))?;

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = Coordinator::new(config).run(&cancel);
    assert!(matches!(result, Err(CountError::Canceled)));
    Ok(())
}

#[test]
fn test_skip_blank_keywords() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_fixture(&dir, "cat\n\ndog\n", "cat dog\n")?;

    let report = keycount::run(&config)?;
    assert_eq!(report.keywords.len(), 3);
    // The empty keyword matches at every character boundary
    assert_eq!(report.keywords[1].count, 8);

    config.skip_blank_keywords = true;
    let report = keycount::run(&config)?;
    assert_eq!(
        report.render(OutputFormat::Text)?,
        "cat: 1\ndog: 1\nвсего: 2\n"
    );
    Ok(())
}

#[test]
fn test_custom_total_label_stays_last() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_fixture(&dir, "cat\n", "Cat CAT cat\n")?;
    config.total_label = "total".to_string();

    let text = keycount::run(&config)?.render(OutputFormat::Text)?;
    assert_eq!(text.lines().last(), Some("total: 3"));
    Ok(())
}

#[test]
fn test_count_reader_over_buffered_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("input.txt");
    fs::write(&path, "aaa\naaaa\n")?;

    let keywords = KeywordSet::new(["aa"]);
    let output = count_reader(
        BufReader::new(fs::File::open(&path)?),
        &keywords,
        PipelineOptions::new(NonZeroUsize::new(2).unwrap()),
        &CancelToken::new(),
        &RunMetrics::new(),
    )?;
    // Non-overlapping: one in "aaa", two in "aaaa"
    assert_eq!(output.snapshot.counts, vec![3]);

    let metrics = RunMetrics::new();
    let output = count_reader(
        Cursor::new("x\ny\n"),
        &keywords,
        PipelineOptions::new(NonZeroUsize::new(1).unwrap()),
        &CancelToken::new(),
        &metrics,
    )?;
    assert_eq!(output.snapshot.total, 0);
    assert_eq!(metrics.get_stats().lines_processed, 2);
    Ok(())
}
