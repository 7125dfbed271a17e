use crate::errors::CliError;
use bundle::Bundle;
use bundle::document::EnrichedDocument;
use enricher::Enricher;
use std::path::{Path, PathBuf};

pub async fn run(
    bundle_path: &Path,
    output: Option<&Path>,
    concurrency: usize,
) -> Result<(), CliError> {
    let bundle = Bundle::from_file(bundle_path)?;
    bundle.config.validate()?;

    tracing::info!(
        path = %bundle_path.display(),
        rows = bundle.source_data.len(),
        static_rules = bundle.config.static_rules.len(),
        enrichment_rules = bundle.config.enrichment_rules.len(),
        "loaded job bundle"
    );

    let mut rows = bundle.source_data;
    let summary = Enricher::new(concurrency)
        .enrich(&mut rows, &bundle.config.enrichment_rules)
        .await;

    if summary.internal_errors > 0 {
        tracing::warn!(
            internal_errors = summary.internal_errors,
            "some enrichment tasks did not complete; their fields were left unwritten"
        );
    }

    let document = EnrichedDocument {
        meta: bundle.meta,
        submission: bundle.config.submission,
        data: rows,
    };

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(bundle_path));
    document.write_file(&output_path)?;

    tracing::info!(path = %output_path.display(), "enriched document written");
    Ok(())
}

/// `job_bundle.json` becomes `job_bundle_enriched.json` next to the input
fn default_output_path(bundle_path: &Path) -> PathBuf {
    let stem = bundle_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle");
    bundle_path.with_file_name(format!("{stem}_enriched.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_the_bundle() {
        assert_eq!(
            default_output_path(Path::new("/jobs/job_bundle.json")),
            PathBuf::from("/jobs/job_bundle_enriched.json")
        );
        assert_eq!(
            default_output_path(Path::new("bundle.json")),
            PathBuf::from("bundle_enriched.json")
        );
    }

    #[tokio::test]
    async fn enrich_without_rules_writes_rows_unchanged() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let bundle_path = tmp.path().join("job.json");
        std::fs::write(
            &bundle_path,
            serde_json::json!({
                "meta": {"version": "3"},
                "config": {"submission": {"target_url": "https://dest.example.com"}},
                "source_data": [{"id": 1}, {"id": 2}]
            })
            .to_string(),
        )
        .unwrap();

        run(&bundle_path, None, 5).await.expect("enrich run");

        let output = tmp.path().join("job_enriched.json");
        let document = EnrichedDocument::from_file(&output).expect("load output");
        assert_eq!(document.data.len(), 2);
        assert_eq!(
            document.submission.target_url.as_deref(),
            Some("https://dest.example.com")
        );
        assert_eq!(document.meta.get("version"), Some(&serde_json::json!("3")));
    }

    #[tokio::test]
    async fn invalid_rules_abort_before_any_work() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let bundle_path = tmp.path().join("job.json");
        std::fs::write(
            &bundle_path,
            serde_json::json!({
                "config": {"enrichment_rules": [{
                    "target_key": "",
                    "url_template": "https://x",
                    "response_path": "value"
                }]},
                "source_data": [{"id": 1}]
            })
            .to_string(),
        )
        .unwrap();

        let result = run(&bundle_path, None, 5).await;
        assert!(matches!(result.unwrap_err(), CliError::Validation(_)));
        assert!(!tmp.path().join("job_enriched.json").exists());
    }
}
