//! Uploading reads and finding the datasets they became.

use crate::api::{GalaxyApi, HistoryItem};
use crate::error::GalaxyError;
use crate::pipeline::input::ResolvedRead;
use crate::progress::ProgressCallback;
use std::collections::HashMap;
use tracing::info;

/// Upload each read file into the history, in order.
pub async fn upload_reads(
    api: &dyn GalaxyApi,
    history_id: &str,
    reads: &[ResolvedRead],
    progress: Option<&ProgressCallback>,
) -> Result<(), GalaxyError> {
    let total = reads.len();
    for (i, read) in reads.iter().enumerate() {
        if let Some(cb) = progress {
            cb.on_upload(&read.basename, i + 1, total);
        }
        info!(" -> uploading {}", read.path.display());
        let run = api.upload_file(history_id, &read.path).await?;
        if let Some(job) = run.jobs.first() {
            info!("Upload job {} queued for {}", job.id, read.basename);
        }
    }
    Ok(())
}

/// Map uploaded file basenames to dataset ids.
///
/// Galaxy names an uploaded dataset after its file, sometimes with
/// decorations, so an item belongs to a file when its name contains the
/// basename. Deleted items are skipped; a later match replaces an earlier one.
pub fn map_uploaded_datasets(
    contents: &[HistoryItem],
    basenames: &[String],
    history_id: &str,
) -> Result<HashMap<String, String>, GalaxyError> {
    let mut map = HashMap::new();
    for item in contents.iter().filter(|d| !d.deleted) {
        for up in basenames {
            if item.name().contains(up.as_str()) {
                map.insert(up.clone(), item.id.clone());
            }
        }
    }
    if map.is_empty() {
        return Err(GalaxyError::UploadedDatasetsNotFound {
            history_id: history_id.to_string(),
        });
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Job, MockGalaxyApi, ToolRun};
    use mockall::Sequence;
    use std::path::{Path, PathBuf};

    fn item(id: &str, name: &str, deleted: bool) -> HistoryItem {
        HistoryItem {
            id: id.into(),
            name: Some(name.into()),
            state: Some("ok".into()),
            deleted,
            ..Default::default()
        }
    }

    fn names() -> Vec<String> {
        vec!["s_R1.fastq".to_string(), "s_R2.fastq".to_string()]
    }

    #[test]
    fn maps_by_substring_and_skips_deleted() {
        let contents = vec![
            item("old", "s_R1.fastq", true),
            item("d1", "s_R1.fastq", false),
            item("d2", "upload: s_R2.fastq", false),
            item("x", "unrelated", false),
        ];
        let map = map_uploaded_datasets(&contents, &names(), "h").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["s_R1.fastq"], "d1");
        assert_eq!(map["s_R2.fastq"], "d2");
    }

    #[test]
    fn later_match_wins() {
        let contents = vec![item("first", "s_R1.fastq", false), item("second", "s_R1.fastq", false)];
        let map = map_uploaded_datasets(&contents, &names(), "h").unwrap();
        assert_eq!(map["s_R1.fastq"], "second");
        assert!(!map.contains_key("s_R2.fastq"));
    }

    #[test]
    fn nothing_found_is_an_error() {
        let contents = vec![item("d1", "s_R1.fastq", true)];
        let err = map_uploaded_datasets(&contents, &names(), "h9").unwrap_err();
        assert!(matches!(err, GalaxyError::UploadedDatasetsNotFound { .. }));
        assert!(err.to_string().contains("h9"));
    }

    #[tokio::test]
    async fn uploads_in_order() {
        let mut seq = Sequence::new();
        let mut api = MockGalaxyApi::new();
        for name in ["s_R1.fastq", "s_R2.fastq"] {
            let expected = PathBuf::from("/in").join(name);
            api.expect_upload_file()
                .withf(move |h: &str, p: &Path| h == "h1" && p == expected.as_path())
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| {
                    Ok(ToolRun {
                        outputs: vec![],
                        jobs: vec![Job {
                            id: "j".into(),
                            ..Default::default()
                        }],
                    })
                });
        }
        let reads: Vec<ResolvedRead> = names()
            .into_iter()
            .map(|n| ResolvedRead {
                path: PathBuf::from("/in").join(&n),
                basename: n,
                compressed: false,
            })
            .collect();
        upload_reads(&api, "h1", &reads, None).await.unwrap();
    }
}
