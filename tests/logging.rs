use std::fs;

use deltaline::logging::init_file_logging;
use deltaline::{DiffRenderer, Frame, TuiError};

#[test]
fn file_logging_records_render_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("deltaline.log");

    let guard = init_file_logging(&path).expect("install subscriber");
    let mut renderer = DiffRenderer::new();
    renderer.render(Frame::from(vec!["hello"]), 20, 5);
    drop(guard);

    let log = fs::read_to_string(&path).expect("read log");
    assert!(log.contains("render pass"), "{log}");
    assert!(log.contains("FirstPaint"), "{log}");

    assert!(matches!(
        init_file_logging(&path),
        Err(TuiError::SubscriberAlreadySet)
    ));
}

#[test]
fn unwritable_log_path_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("deltaline.log");
    assert!(matches!(
        init_file_logging(&path),
        Err(TuiError::LogInit { .. })
    ));
}
