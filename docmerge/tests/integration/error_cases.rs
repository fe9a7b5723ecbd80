//! Rejected inputs, unmergeable sets and failed jobs.

use docmerge::{
    ChunkConfig, DocMergeError, ErrorCode, FileInput, JobStatus, LogicalFormat, MergeMode,
    MergeOptions, MergeSession, NoopObserver, ProcessingLimits,
};

use crate::common::{corrupt_pdf, docx, pdf, processed_session};

#[tokio::test]
async fn test_empty_and_unknown_files_are_excluded() {
    let mut session = processed_session(vec![
        FileInput::from_name("empty.txt", Vec::new()),
        FileInput::from_name("photo.png", b"\x89PNG\r\n".to_vec()),
        FileInput::from_name("kept.txt", b"kept".to_vec()),
    ])
    .await;

    let codes: Vec<_> = session
        .documents()
        .iter()
        .map(|d| d.error.as_ref().map(|e| e.code))
        .collect();
    assert_eq!(
        codes,
        vec![
            Some(ErrorCode::FileEmpty),
            Some(ErrorCode::UnsupportedFormat),
            None
        ]
    );

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.document_ids.len(), 1);
    assert_eq!(
        job.warnings
            .iter()
            .filter(|w| w.contains("excluded"))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_oversized_file_is_excluded() {
    let limits = ProcessingLimits {
        max_file_size: 16,
        ..Default::default()
    };
    let mut session = MergeSession::new(limits, ChunkConfig::default());
    session
        .add_files(vec![FileInput::from_name("big.txt", vec![b'x'; 64])])
        .unwrap();
    let summary = session.process_pending(&NoopObserver).await;

    assert_eq!(summary.failed, 1);
    let handle = session.documents().iter().next().unwrap();
    assert!(handle.excluded);
    assert_eq!(handle.error.as_ref().unwrap().code, ErrorCode::FileTooLarge);

    let err = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert!(matches!(err, DocMergeError::NoDocuments));
}

#[test]
fn test_batch_over_the_file_limit_is_rejected_whole() {
    let limits = ProcessingLimits {
        max_files: 2,
        ..Default::default()
    };
    let mut session = MergeSession::new(limits, ChunkConfig::default());
    let files = (0..3)
        .map(|n| FileInput::from_name(format!("{n}.txt"), b"x".to_vec()))
        .collect();

    let err = session.add_files(files).unwrap_err();
    assert!(matches!(
        err,
        DocMergeError::TooManyFiles { count: 3, limit: 2 }
    ));
    assert!(session.documents().is_empty());
}

#[tokio::test]
async fn test_unconvertible_request_is_refused() {
    let mut session =
        processed_session(vec![FileInput::from_name("a.docx", docx(&["only one"]))]).await;

    let options = MergeOptions {
        output_format: Some(LogicalFormat::Xlsx),
        ..Default::default()
    };
    let err = session.merge(options, &NoopObserver).await.unwrap_err();
    assert!(matches!(err, DocMergeError::ConversionNotSupported { .. }));
    assert_eq!(err.exit_code(), 4);
    assert!(session.last_job().is_none());
}

#[tokio::test]
async fn test_custom_mode_needs_an_order() {
    let mut session =
        processed_session(vec![FileInput::from_name("a.pdf", pdf("a", 1))]).await;

    let options = MergeOptions {
        mode: MergeMode::Custom,
        ..Default::default()
    };
    let err = session.merge(options, &NoopObserver).await.unwrap_err();
    assert!(matches!(err, DocMergeError::InvalidOptions { .. }));
}

#[tokio::test]
async fn test_unprocessed_documents_block_the_merge() {
    let mut session = MergeSession::default();
    session
        .add_files(vec![FileInput::from_name("a.txt", b"waiting".to_vec())])
        .unwrap();

    let err = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap_err();
    assert!(matches!(err, DocMergeError::DocumentsNotReady { pending: 1 }));
}

#[tokio::test]
async fn test_all_inputs_unreadable_fails_the_job() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.pdf", corrupt_pdf()),
        FileInput::from_name("b.pdf", corrupt_pdf()),
    ])
    .await;

    let job = session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.as_ref().unwrap();
    assert_eq!(error.code, ErrorCode::MergeFailed);
    assert!(!error.action.is_empty());
    assert!(session.output().is_none());
}
