// Retag planning: changed documents → datasets → one message per file.
mod support;

use anyhow::{Result, bail};
use dataset_mappings::{
    DatasetFileLister, DatasetId, RetagMessage, RetagPlanner, RetagPublisher, StaticFileLister,
    changed_documents, parse_changed_files,
};
use serde_json::json;
use support::{write_document, write_raw};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingPublisher {
    sent: Vec<(String, String)>,
}

impl RetagPublisher for RecordingPublisher {
    fn publish(&mut self, routing_key: &str, body: &str) -> Result<()> {
        self.sent.push((routing_key.to_string(), body.to_string()));
        Ok(())
    }
}

struct FailingLister;

impl DatasetFileLister for FailingLister {
    fn files(&self, dataset: &DatasetId) -> Result<Vec<String>> {
        bail!("index unavailable for {dataset}")
    }
}

fn archive_files() -> StaticFileLister {
    StaticFileLister::new(vec![
        "/neodc/a/2020/f1.nc".to_string(),
        "/neodc/a/2021/f2.nc".to_string(),
        "/neodc/b/f3.nc".to_string(),
        "/neodc/c/f4.nc".to_string(),
    ])
}

#[test]
fn changed_documents_keeps_existing_json_under_prefix() -> Result<()> {
    let repo = TempDir::new()?;
    write_document(repo.path(), "json/ab.json", &json!({"datasets": ["/neodc/a", "/neodc/b"]}))?;
    write_document(repo.path(), "other/c.json", &json!({"datasets": ["/neodc/c"]}))?;
    write_raw(repo.path(), "json/README.md", "notes")?;

    let changed = parse_changed_files(
        "json/ab.json\nother/c.json\njson/README.md\njson/deleted.json\njsonish/x.json\n",
    );
    let documents = changed_documents(repo.path(), &changed, "json")?;

    assert_eq!(documents.len(), 1);
    assert!(documents[0].path.ends_with("json/ab.json"));
    assert_eq!(
        documents[0].datasets,
        vec![DatasetId::from("/neodc/a"), DatasetId::from("/neodc/b")]
    );
    Ok(())
}

#[test]
fn changed_document_without_datasets_is_an_error() -> Result<()> {
    let repo = TempDir::new()?;
    write_document(repo.path(), "json/bad.json", &json!({"defaults": {}}))?;
    let changed = parse_changed_files("json/bad.json");
    let err = changed_documents(repo.path(), &changed, "json").expect_err("datasets required");
    assert!(format!("{err:#}").contains("bad.json"));
    Ok(())
}

#[test]
fn planner_publishes_one_deposit_per_file() -> Result<()> {
    let repo = TempDir::new()?;
    write_document(repo.path(), "json/ab.json", &json!({"datasets": ["/neodc/a", "/neodc/b"]}))?;
    let documents = changed_documents(repo.path(), &parse_changed_files("json/ab.json"), "json")?;

    let mut publisher = RecordingPublisher::default();
    let summary = RetagPlanner::default()
        .with_routing_key("test.key")
        .run(&documents, &archive_files(), &mut publisher)?;

    assert_eq!(summary.documents, 1);
    assert_eq!(summary.messages, 3);
    assert_eq!(summary.datasets.len(), 2);
    assert_eq!(publisher.sent.len(), 3);

    let paths: Vec<String> = publisher
        .sent
        .iter()
        .map(|(key, body)| {
            assert_eq!(key, "test.key");
            let message: RetagMessage = serde_json::from_str(body).expect("message json");
            assert_eq!(message.action, "DEPOSIT");
            assert_eq!(message.filesize, 0);
            message.filepath
        })
        .collect();
    assert_eq!(
        paths,
        vec!["/neodc/a/2020/f1.nc", "/neodc/a/2021/f2.nc", "/neodc/b/f3.nc"]
    );
    Ok(())
}

#[test]
fn dry_run_lists_datasets_without_publishing() -> Result<()> {
    let repo = TempDir::new()?;
    write_document(repo.path(), "json/ab.json", &json!({"datasets": ["/neodc/a"]}))?;
    let documents = changed_documents(repo.path(), &parse_changed_files("json/ab.json"), "json")?;

    let mut publisher = RecordingPublisher::default();
    let summary = RetagPlanner::default()
        .dry_run(true)
        .run(&documents, &FailingLister, &mut publisher)?;

    assert_eq!(summary.datasets, vec![DatasetId::from("/neodc/a")]);
    assert_eq!(summary.messages, 0);
    assert!(publisher.sent.is_empty());
    Ok(())
}

#[test]
fn lister_failure_propagates_with_dataset_context() -> Result<()> {
    let repo = TempDir::new()?;
    write_document(repo.path(), "json/ab.json", &json!({"datasets": ["/neodc/a"]}))?;
    let documents = changed_documents(repo.path(), &parse_changed_files("json/ab.json"), "json")?;

    let mut publisher = RecordingPublisher::default();
    let err = RetagPlanner::default()
        .run(&documents, &FailingLister, &mut publisher)
        .expect_err("lister failure should surface");
    assert!(format!("{err:#}").contains("/neodc/a"));
    Ok(())
}
