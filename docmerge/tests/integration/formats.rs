//! Same-format merges for the OOXML and text formats.

use docmerge::adapters::{FormatAdapter, adapter_for};
use docmerge::merge::FormatReason;
use docmerge::{FileInput, JobStatus, LogicalFormat, MergeOptions, NoopObserver, TextSeparator};
use rstest::rstest;

use crate::common::{docx, page_count, pdf, pptx, processed_session, xlsx};

#[tokio::test]
async fn test_workbooks_keep_every_sheet() {
    let mut session = processed_session(vec![
        FileInput::from_name(
            "q1.xlsx",
            xlsx(&[
                ("Sales", &[&["region", "total"], &["north", "10"]]),
                ("Costs", &[&["item", "amount"], &["rent", "4"]]),
            ]),
        ),
        FileInput::from_name("q2.xlsx", xlsx(&[("Sales", &[&["region", "total"], &["south", "12"]])])),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_format, LogicalFormat::Xlsx);

    let output = session.output().and_then(|h| h.output()).unwrap();
    assert_eq!(output.file_name, "merged.xlsx");
    let adapter = adapter_for(LogicalFormat::Xlsx);
    assert_eq!(adapter.analyze(&output.data).sheet_count, Some(3));
    let text = adapter.extract_text(&output.data).unwrap();
    assert!(text.contains("north"));
    assert!(text.contains("south"));
}

#[tokio::test]
async fn test_single_word_document_stays_word() {
    let mut session = processed_session(vec![FileInput::from_name(
        "letter.docx",
        docx(&["Dear reader", "Thanks for reading."]),
    )])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.output_format, LogicalFormat::Docx);

    let output = session.output().and_then(|h| h.output()).unwrap();
    assert_eq!(output.file_name, "merged.docx");
    let text = adapter_for(LogicalFormat::Docx)
        .extract_text(&output.data)
        .unwrap();
    assert!(text.contains("Thanks for reading."));
}

#[tokio::test]
async fn test_presentations_merge_as_text() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.pptx", pptx(&[("Agenda", &["intro", "plan"])])),
        FileInput::from_name("b.pptx", pptx(&[("Results", &["growth"]), ("Next", &["ship"])])),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.output_format, LogicalFormat::Pptx);
    assert!(!job.warnings.is_empty());

    let output = session.output().and_then(|h| h.output()).unwrap();
    assert!(output.degraded);
    assert_eq!(output.format, LogicalFormat::Txt);
    assert_eq!(output.file_name, "merged.txt");

    let text = String::from_utf8(output.data.to_vec()).unwrap();
    assert!(text.contains("===== a.pptx ====="));
    assert!(text.contains("growth"));
    assert!(text.find("Agenda") < text.find("Results"));
}

#[rstest]
#[case(TextSeparator::Default, "alpha\n\n---\n\nbeta")]
#[case(TextSeparator::Custom("\n***\n".into()), "alpha\n***\nbeta")]
#[case(
    TextSeparator::FileHeader,
    "===== a.txt =====\n\nalpha\n\n===== b.txt =====\n\nbeta"
)]
#[tokio::test]
async fn test_text_separators(#[case] separator: TextSeparator, #[case] expected: &str) {
    let mut session = processed_session(vec![
        FileInput::from_name("a.txt", b"alpha".to_vec()),
        FileInput::from_name("b.txt", b"beta".to_vec()),
    ])
    .await;

    let options = MergeOptions {
        separator,
        ..Default::default()
    };
    session.merge(options, &NoopObserver).await.unwrap();

    let data = session.output().and_then(|h| h.data()).unwrap();
    let text = String::from_utf8(data.to_vec()).unwrap();
    assert!(text.contains(expected), "{text:?}");
}

#[tokio::test]
async fn test_every_format_in_one_pdf() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.pdf", pdf("cover", 1)),
        FileInput::from_name("b.docx", docx(&["Chapter one"])),
        FileInput::from_name("c.xlsx", xlsx(&[("Data", &[&["k", "v"], &["x", "1"]])])),
        FileInput::from_name("d.pptx", pptx(&[("Deck", &["point"])])),
        FileInput::from_name("e.txt", b"plain".to_vec()),
        FileInput::from_name("f.csv", b"a,b\n1,2\n".to_vec()),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.format_reason, FormatReason::CrossFormat);
    assert_eq!(job.document_ids.len(), 6);

    let data = session.output().and_then(|h| h.data()).unwrap();
    assert!(page_count(&data) >= 6);
}
