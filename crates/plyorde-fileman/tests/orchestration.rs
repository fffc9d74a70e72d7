mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use plyorde_connector::{ReadPayload, UploadFile};
use plyorde_fileman::{CopyOptions, FileManager, FileManagerError, FileManagerLimits};
use support::{MemoryConnector, site, status};

fn manager(connector: &Arc<MemoryConnector>) -> FileManager {
    FileManager::new(connector.clone(), FileManagerLimits::default())
}

fn paths(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn copy_renames_around_existing_files() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        connector.put(&format!("src/{name}"), name.as_bytes());
    }
    connector.put("dst/b.txt", b"old b");
    connector.put("dst/d.txt", b"old d");

    let report = manager(&connector)
        .copy(
            &site()?,
            &paths(&["src/a.txt", "src/b.txt", "src/c.txt", "src/d.txt", "src/e.txt"]),
            "/dst/",
            &CopyOptions::default(),
        )
        .await;

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    let dests: Vec<&str> = report.ok.iter().map(|entry| entry.dest.as_str()).collect();
    assert_eq!(
        dests,
        ["dst/a.txt", "dst/b (1).txt", "dst/c.txt", "dst/d (1).txt", "dst/e.txt"]
    );
    assert_eq!(connector.contents("dst/b (1).txt"), Some(b"b.txt".to_vec()));
    assert_eq!(connector.contents("dst/b.txt"), Some(b"old b".to_vec()));
    Ok(())
}

#[tokio::test]
async fn copy_reports_failures_per_item() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("a.txt", b"a");
    connector.fail("write", "out/a.txt", status("write", 403, "Forbidden"));

    let report = manager(&connector)
        .copy(
            &site()?,
            &paths(&["a.txt", "missing.txt", "../etc/passwd"]),
            "out",
            &CopyOptions::default(),
        )
        .await;

    assert!(report.ok.is_empty());
    let errors: Vec<(&str, &str)> = report
        .failed
        .iter()
        .map(|failure| (failure.source.as_str(), failure.error.as_str()))
        .collect();
    assert_eq!(
        errors,
        [
            ("a.txt", "Forbidden"),
            ("missing.txt", "Not Found"),
            ("../etc/passwd", "Invalid path: path traversal is not allowed"),
        ]
    );
    assert_eq!(connector.calls("write"), ["out/a.txt"]);
    Ok(())
}

#[tokio::test]
async fn copy_with_invalid_destination_fails_every_source() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("wp-content/a.txt", b"a");
    let options = CopyOptions {
        allowed_root: Some("wp-content".into()),
        ..CopyOptions::default()
    };

    let report = manager(&connector)
        .copy(&site()?, &paths(&["wp-content/a.txt", "wp-content/b.txt"]), "uploads", &options)
        .await;

    assert_eq!(report.failed.len(), 2);
    assert!(
        report
            .failed
            .iter()
            .all(|failure| failure.error == "Invalid path: path is outside the allowed root")
    );
    assert!(connector.calls("read").is_empty());
    Ok(())
}

#[tokio::test]
async fn copy_gives_up_after_rename_budget() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("a.txt", b"a");
    connector.put("out/a.txt", b"");
    connector.put("out/a (1).txt", b"");
    let options = CopyOptions {
        max_rename_attempts: Some(1),
        ..CopyOptions::default()
    };

    let report = manager(&connector)
        .copy(&site()?, &paths(&["a.txt"]), "out", &options)
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].error, "Could not pick a free name for a.txt");
    Ok(())
}

#[tokio::test]
async fn copy_respects_concurrency_limit() -> Result<()> {
    let connector = Arc::new(MemoryConnector::with_latency(Duration::from_millis(10)));
    let sources: Vec<String> = (0..12).map(|n| format!("f{n}.txt")).collect();
    for source in &sources {
        connector.put(source, b"x");
    }
    let options = CopyOptions {
        concurrency: Some(3),
        ..CopyOptions::default()
    };

    let report = manager(&connector).copy(&site()?, &sources, "copies", &options).await;

    assert_eq!(report.ok.len(), 12);
    assert!(connector.peak_in_flight() <= 3);
    Ok(())
}

#[tokio::test]
async fn upload_retries_under_next_name() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.fail("upload", "media/photo.jpg", status("upload", 500, "file exists"));

    let report = manager(&connector)
        .upload(
            &site()?,
            "media",
            vec![UploadFile {
                file_name: "photo.jpg".into(),
                content_type: Some("image/jpeg".into()),
                data: Bytes::from_static(b"jpeg"),
            }],
        )
        .await?;

    assert!(report.ok);
    assert_eq!(report.uploaded, 1);
    let result = &report.results[0];
    assert!(result.ok);
    assert_eq!(result.saved_as.as_deref(), Some("photo (1).jpg"));
    assert_eq!(result.path.as_deref(), Some("media/photo (1).jpg"));
    assert_eq!(connector.calls("upload"), ["media/photo.jpg", "media/photo (1).jpg"]);
    Ok(())
}

#[tokio::test]
async fn upload_reports_each_file() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.fail("upload", "big.iso", status("upload", 413, "Payload Too Large"));
    let file = |name: &str| UploadFile {
        file_name: name.to_string(),
        content_type: None,
        data: Bytes::from_static(b"data"),
    };

    let report = manager(&connector)
        .upload(&site()?, "", vec![file("notes.txt"), file("big.iso"), file("C:\\fakepath\\cv.pdf")])
        .await?;

    assert!(!report.ok);
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.failed_count, Some(1));
    let failed = &report.results[1];
    assert_eq!(failed.status, Some(413));
    assert_eq!(failed.error.as_deref(), Some("Payload Too Large"));
    assert_eq!(failed.attempted_as.as_deref(), Some("big.iso"));
    assert_eq!(report.results[2].path.as_deref(), Some("cv.pdf"));
    Ok(())
}

#[tokio::test]
async fn upload_exhaustion_is_a_conflict() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    let limits = FileManagerLimits {
        upload_max_rename_attempts: 2,
        ..FileManagerLimits::default()
    };
    for name in ["a.txt", "a (1).txt", "a (2).txt"] {
        connector.put(name, b"");
    }

    let report = FileManager::new(connector.clone(), limits)
        .upload(
            &site()?,
            "/",
            vec![UploadFile {
                file_name: "a.txt".into(),
                content_type: None,
                data: Bytes::new(),
            }],
        )
        .await?;

    let result = &report.results[0];
    assert_eq!(result.status, Some(409));
    assert_eq!(
        result.error.as_deref(),
        Some("Could not pick a free name for a.txt")
    );
    assert_eq!(connector.calls("upload").len(), 3);
    Ok(())
}

#[tokio::test]
async fn upload_rejects_traversal_directory() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    let result = manager(&connector).upload(&site()?, "../up", Vec::new()).await;
    assert!(matches!(result, Err(FileManagerError::InvalidPath { .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delete_runs_in_paused_chunks() -> Result<()> {
    let connector = Arc::new(MemoryConnector::with_latency(Duration::from_millis(20)));
    let targets: Vec<String> = (0..23).map(|n| format!("tmp/{n}.log")).collect();
    for target in &targets {
        connector.put(target, b"");
    }
    let mut requested = targets.clone();
    requested.push("tmp/ghost.log".into());
    requested.push("/".into());

    let started = tokio::time::Instant::now();
    let report = manager(&connector).delete(&site()?, &requested).await;

    assert_eq!(report.deleted.len(), 23);
    let failed: Vec<(&str, &str)> = report
        .failed
        .iter()
        .map(|failure| (failure.path.as_str(), failure.error.as_str()))
        .collect();
    assert_eq!(
        failed,
        [
            ("tmp/ghost.log", "Not Found"),
            ("/", "The site root cannot be deleted"),
        ]
    );
    assert!(started.elapsed() >= Duration::from_millis(2 * 200 + 3 * 20));
    assert!(connector.peak_in_flight() <= 10);
    assert!(connector.paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn move_rejects_destination_inside_a_source() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    let result = manager(&connector)
        .move_entries(
            &site()?,
            &paths(&["notes.txt", "wp-content/themes"]),
            "wp-content/themes/child",
        )
        .await;

    match result {
        Err(FileManagerError::MoveIntoSelf { moved, destination }) => {
            assert_eq!(moved, "wp-content/themes");
            assert_eq!(destination, "wp-content/themes/child");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(connector.calls("move").is_empty());

    let into_itself = manager(&connector)
        .move_entries(&site()?, &paths(&["docs"]), "docs")
        .await;
    assert!(matches!(into_itself, Err(FileManagerError::MoveIntoSelf { .. })));
    Ok(())
}

#[tokio::test]
async fn move_applies_each_entry_independently() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("a.txt", b"a");
    connector.put("archive/c.txt", b"c");

    let report = manager(&connector)
        .move_entries(&site()?, &paths(&["a.txt", "b.txt", "archive/c.txt"]), "archive")
        .await?;

    assert_eq!(report.moved.len(), 1);
    assert_eq!(report.moved[0].to, "archive/a.txt");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].from, "b.txt");
    assert_eq!(report.failed[0].error, "Not Found");
    assert_eq!(connector.calls("move"), ["a.txt", "b.txt"]);
    Ok(())
}

#[tokio::test]
async fn rename_and_create() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("docs/draft.md", b"# draft");
    let files = manager(&connector);
    let ctx = site()?;

    let outcome = files.rename(&ctx, "docs/draft.md", "final.md").await?;
    assert!(outcome.renamed);
    assert_eq!(outcome.to, "docs/final.md");
    assert_eq!(connector.contents("docs/final.md"), Some(b"# draft".to_vec()));

    let unchanged = files.rename(&ctx, "docs/final.md", "final.md").await?;
    assert!(!unchanged.renamed);

    let created = files.create_file(&ctx, "/docs/", "empty.txt").await?;
    assert_eq!(created, "docs/empty.txt");
    assert_eq!(connector.contents("docs/empty.txt"), Some(Vec::new()));

    let folder = files.create_folder(&ctx, "", "assets").await?;
    assert_eq!(folder, "assets");
    assert_eq!(connector.calls("mkdir"), ["assets"]);

    let bad = files.create_folder(&ctx, "", "a/b").await;
    assert!(matches!(bad, Err(FileManagerError::InvalidInput { code: "invalid_name", .. })));
    Ok(())
}

#[tokio::test]
async fn single_item_errors_propagate() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    connector.put("a.txt", b"hello");
    let files = manager(&connector);
    let ctx = site()?;

    assert_eq!(files.read(&ctx, "/a.txt").await?, ReadPayload::text("hello"));
    let missing = files.read(&ctx, "b.txt").await;
    assert!(matches!(missing, Err(ref err) if err.connector_status() == Some(404)));
    let traversal = files.read(&ctx, "a/../../b").await;
    assert!(matches!(traversal, Err(FileManagerError::InvalidPath { .. })));

    let listed = files.list(&ctx, "/").await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "a.txt");
    Ok(())
}

#[tokio::test]
async fn archive_and_extract_validate_inputs() -> Result<()> {
    let connector = Arc::new(MemoryConnector::default());
    let files = manager(&connector);
    let ctx = site()?;

    files
        .archive(&ctx, &paths(&["/site/a.txt"]), Some("site/a.zip"), None)
        .await?;
    files
        .compress_here(&ctx, &paths(&["site/b.txt", "c.txt"]), None)
        .await?;
    files
        .compress_here(&ctx, &paths(&["site/b.txt"]), Some("/backups/"))
        .await?;
    let requests = connector.compress_requests();
    assert_eq!(requests[0].sources, ["site/a.txt"]);
    assert_eq!(requests[0].target, "site/a.zip");
    assert_eq!(requests[0].format.as_deref(), Some("zip"));
    assert!(requests[1].target.starts_with("site/"));
    assert!(requests[1].target.ends_with(".zip"));
    assert!(!requests[1].target.contains(':'));
    assert_eq!(requests[1].format.as_deref(), Some("zip"));
    assert!(requests[2].target.starts_with("backups/"));
    assert_eq!(requests[2].target.matches('/').count(), 1);
    let escaped = files
        .compress_here(&ctx, &paths(&["site/b.txt"]), Some("../up"))
        .await;
    assert!(matches!(escaped, Err(FileManagerError::InvalidPath { .. })));

    let codes = [
        (files.extract(&ctx, &[], "out", None).await, "missing_sources"),
        (files.extract(&ctx, &paths(&["a.zip", "b.zip"]), "out", None).await, "multiple_sources"),
        (files.extract(&ctx, &paths(&["a.zip"]), "  ", None).await, "missing_target"),
        (files.extract(&ctx, &paths(&["../a.zip"]), "out", None).await, "invalid_path"),
    ];
    for (result, code) in codes {
        assert_eq!(result.err().map(|err| err.code()), Some(code));
    }

    files.extract(&ctx, &paths(&["/backups/site.zip"]), "restore/", Some("zip")).await?;
    let requests = connector.decompress_requests();
    assert_eq!(requests[0].source, "backups/site.zip");
    assert_eq!(requests[0].target, "restore");
    Ok(())
}
