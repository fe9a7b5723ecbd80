//! Session lifecycle: ordering, progress and output ownership.

use docmerge::document::DocumentStatus;
use docmerge::{
    DocumentId, FileInput, MergeObserver, MergeOptions, MergeSession, NoopObserver, PipelineStage,
};
use std::sync::Mutex;

use crate::common::{page_contains, pdf, processed_session};

#[derive(Default)]
struct Recorder {
    fractions: Mutex<Vec<f32>>,
    stages: Mutex<Vec<(DocumentId, PipelineStage)>>,
}

impl MergeObserver for Recorder {
    fn on_progress(&self, fraction: f32) {
        self.fractions.lock().unwrap().push(fraction);
    }

    fn on_document_stage(&self, id: DocumentId, stage: PipelineStage) {
        self.stages.lock().unwrap().push((id, stage));
    }
}

#[tokio::test]
async fn test_processing_reports_every_document() {
    let mut session = MergeSession::default();
    let ids = session
        .add_files(vec![
            FileInput::from_name("a.txt", b"one".to_vec()),
            FileInput::from_name("b.txt", b"two".to_vec()),
        ])
        .unwrap();

    let recorder = Recorder::default();
    let summary = session.process_pending(&recorder).await;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);

    let stages = recorder.stages.lock().unwrap();
    for id in ids {
        assert!(stages.contains(&(id, PipelineStage::Processed)));
        let handle = session.documents().get(id).unwrap();
        assert_eq!(handle.status(), DocumentStatus::Processed);
        assert!(handle.preview.is_some());
        assert_eq!(handle.metadata.as_ref().unwrap().word_count, Some(1));
    }
}

#[tokio::test]
async fn test_merge_progress_is_monotonic() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.pdf", pdf("a", 1)),
        FileInput::from_name("b.txt", b"tail".to_vec()),
    ])
    .await;

    let recorder = Recorder::default();
    session
        .merge(MergeOptions::default(), &recorder)
        .await
        .unwrap();

    let fractions = recorder.fractions.lock().unwrap();
    assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(fractions.last(), Some(&1.0));
}

#[tokio::test]
async fn test_reordering_changes_the_output() {
    let mut session = processed_session(vec![
        FileInput::from_name("first.pdf", pdf("first", 1)),
        FileInput::from_name("second.pdf", pdf("second", 1)),
    ])
    .await;
    let mut order = session.documents().ids();
    order.reverse();
    session.reorder(&order).unwrap();

    session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();

    let data = session.output().and_then(|h| h.data()).unwrap();
    assert!(page_contains(&data, 1, "second page 1"));
    assert!(page_contains(&data, 2, "first page 1"));
}

#[tokio::test]
async fn test_new_merge_releases_previous_output() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.txt", b"one".to_vec()),
        FileInput::from_name("b.txt", b"two".to_vec()),
    ])
    .await;

    session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    let first = session.output().unwrap().id();

    session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();
    let second = session.output().unwrap().id();

    assert_ne!(first, second);
    assert!(!session.outputs().contains(first));
    assert_eq!(session.outputs().len(), 1);
}

#[tokio::test]
async fn test_removing_a_document_discards_the_output() {
    let mut session = processed_session(vec![
        FileInput::from_name("a.txt", b"one".to_vec()),
        FileInput::from_name("b.txt", b"two".to_vec()),
    ])
    .await;
    session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();

    let id = session.documents().ids()[0];
    assert!(session.remove_document(id).is_some());

    assert!(session.output().is_none());
    assert!(session.outputs().is_empty());
    assert_eq!(session.documents().len(), 1);
}

#[tokio::test]
async fn test_teardown_releases_everything() {
    let mut session = processed_session(vec![FileInput::from_name("a.txt", b"one".to_vec())]).await;
    session
        .merge(MergeOptions::default(), &NoopObserver)
        .await
        .unwrap();

    session.teardown();

    assert!(session.documents().is_empty());
    assert!(session.outputs().is_empty());
    assert!(session.last_job().is_none());
}
