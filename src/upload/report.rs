use crate::models::{
    BulkUploadReport, FailedFile, FileOutcome, OutcomeStatus, SkippedFile, SuccessfulFile,
    UploadSummary,
};

/// Tally per-file outcomes into the response body.
pub fn summarize(total_files: usize, results: Vec<FileOutcome>) -> BulkUploadReport {
    let mut successful_files = Vec::new();
    let mut failed_files = Vec::new();
    let mut skipped_files = Vec::new();

    for r in &results {
        match r.status {
            OutcomeStatus::Success => successful_files.push(SuccessfulFile {
                filename: r.filename.clone(),
                action: r.action,
            }),
            OutcomeStatus::Failed => failed_files.push(FailedFile {
                filename: r.filename.clone(),
                error: r.error.clone().unwrap_or_default(),
            }),
            OutcomeStatus::Skipped => skipped_files.push(SkippedFile {
                filename: r.filename.clone(),
                message: r
                    .message
                    .clone()
                    .unwrap_or_else(|| "Already exists".to_string()),
            }),
        }
    }

    BulkUploadReport {
        total_files,
        successful_uploads: successful_files.len(),
        failed_uploads: failed_files.len(),
        skipped_uploads: skipped_files.len(),
        results,
        summary: UploadSummary {
            success_rate: success_rate(successful_files.len(), total_files),
            successful_files,
            failed_files,
            skipped_files,
        },
    }
}

fn success_rate(successful: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", successful as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadAction;

    #[test]
    fn test_counts_and_partitions() {
        let results = vec![
            FileOutcome::success("a.png", "1".to_string(), UploadAction::NewUpload),
            FileOutcome::failed(Some("b.png"), UploadAction::ErrorOccurred, "boom"),
            FileOutcome::skipped("c.png", "File already exists in database and storage"),
        ];
        let report = summarize(3, results);

        assert_eq!(report.total_files, 3);
        assert_eq!(report.successful_uploads, 1);
        assert_eq!(report.failed_uploads, 1);
        assert_eq!(report.skipped_uploads, 1);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.summary.success_rate, "33.3%");
        assert_eq!(report.summary.successful_files[0].action, UploadAction::NewUpload);
        assert_eq!(report.summary.failed_files[0].error, "boom");
        assert_eq!(report.summary.skipped_files[0].filename.as_deref(), Some("c.png"));
    }

    #[test]
    fn test_success_rate_formatting() {
        assert_eq!(success_rate(2, 2), "100.0%");
        assert_eq!(success_rate(2, 3), "66.7%");
        assert_eq!(success_rate(0, 0), "0.0%");
    }

    #[test]
    fn test_report_json_shape() {
        let report = summarize(
            1,
            vec![FileOutcome::success("a.png", "1".to_string(), UploadAction::UploadToStorage)],
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["successful_files"][0]["action"], "upload_to_storage");
        assert_eq!(json["results"][0]["image_id"], "1");
    }
}
