//! End-to-end merges through a session.

use docmerge::merge::FormatReason;
use docmerge::{FileInput, JobStatus, LogicalFormat, MergeOptions, NoopObserver};

use crate::common::{corrupt_pdf, csv, docx, page_contains, page_count, pdf, processed_session};

#[tokio::test]
async fn test_pdfs_merge_page_for_page() {
    let mut session = processed_session(vec![
        FileInput::from_name("two.pdf", pdf("two", 2)),
        FileInput::from_name("three.pdf", pdf("three", 3)),
        FileInput::from_name("five.pdf", pdf("five", 5)),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_format, LogicalFormat::Pdf);
    assert_eq!(job.format_reason, FormatReason::SingleFormat);

    let data = session.output().and_then(|h| h.data()).unwrap();
    assert_eq!(page_count(&data), 10);
    assert!(page_contains(&data, 1, "two page 1"));
    assert!(page_contains(&data, 3, "three page 1"));
    assert!(page_contains(&data, 10, "five page 5"));
}

#[tokio::test]
async fn test_word_documents_are_redirected_to_pdf() {
    let mut session = processed_session(vec![
        FileInput::from_name("intro.docx", docx(&["Introduction", "Some opening words."])),
        FileInput::from_name("body.docx", docx(&["Body", "The main argument."])),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_format, LogicalFormat::Pdf);
    assert_eq!(job.format_reason, FormatReason::MultiWordRedirect);

    let output = session.output().and_then(|h| h.output()).unwrap();
    assert!(output.data.starts_with(b"%PDF-"));
    assert_eq!(output.file_name, "merged.pdf");
    assert!(page_count(&output.data) >= 2);
}

#[tokio::test]
async fn test_text_follows_pdf_pages() {
    let mut session = processed_session(vec![
        FileInput::from_name("report.pdf", pdf("report", 2)),
        FileInput::from_name("notes.txt", b"closing notes".to_vec()),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.output_format, LogicalFormat::Pdf);
    assert_eq!(job.format_reason, FormatReason::CrossFormat);

    let data = session.output().and_then(|h| h.data()).unwrap();
    assert_eq!(page_count(&data), 3);
    assert!(page_contains(&data, 1, "report page 1"));
    assert!(page_contains(&data, 2, "report page 2"));
    assert!(page_contains(&data, 3, "closing notes"));
}

#[tokio::test]
async fn test_csv_header_kept_once() {
    let first: &[&[&str]] = &[&["name", "qty"], &["apples", "3"], &["pears", "5"]];
    let second: &[&[&str]] = &[&["name", "qty"], &["plums", "7"]];
    let mut session = processed_session(vec![
        FileInput::from_name("a.csv", csv(first)),
        FileInput::from_name("b.csv", csv(second)),
    ])
    .await;

    let options = MergeOptions {
        include_headers: true,
        skip_duplicate_headers: true,
        ..Default::default()
    };
    let job = session.merge(options, &NoopObserver).await.unwrap();
    assert_eq!(job.output_format, LogicalFormat::Csv);

    let data = session.output().and_then(|h| h.data()).unwrap();
    let text = String::from_utf8(data.to_vec()).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 1 + (first.len() - 1) + (second.len() - 1));
    assert_eq!(rows, vec!["name,qty", "apples,3", "pears,5", "plums,7"]);
}

#[tokio::test]
async fn test_corrupt_pdf_is_skipped() {
    let mut session = processed_session(vec![
        FileInput::from_name("good-1.pdf", pdf("good", 2)),
        FileInput::from_name("broken.pdf", corrupt_pdf()),
        FileInput::from_name("good-2.pdf", pdf("fine", 1)),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.warnings.iter().any(|w| w.contains("broken.pdf")));

    let data = session.output().and_then(|h| h.data()).unwrap();
    assert_eq!(page_count(&data), 3);
    assert!(page_contains(&data, 3, "fine page 1"));
}
