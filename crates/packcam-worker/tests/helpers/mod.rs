//! Test helpers: scripted collaborators and a fixture camera for pipeline tests.
//!
//! Run from workspace root: `cargo test -p packcam-worker --test pipeline_test`.

#![allow(dead_code)]

pub mod collaborators;
pub mod fixtures;

use std::sync::Arc;

use packcam_core::models::ReferenceUrlTemplate;
use packcam_worker::DeliveryContext;

use collaborators::{RecordingConsole, RecordingNotifier, ScriptedUploader};

/// Collaborators shared between a test and the pool under test.
pub struct TestCollaborators {
    pub uploader: Arc<ScriptedUploader>,
    pub notifier: Arc<RecordingNotifier>,
    pub console: Arc<RecordingConsole>,
}

impl TestCollaborators {
    pub fn new(uploader: ScriptedUploader) -> Self {
        Self {
            uploader: Arc::new(uploader),
            notifier: Arc::new(RecordingNotifier::default()),
            console: Arc::new(RecordingConsole::default()),
        }
    }

    pub fn context(&self) -> Arc<DeliveryContext> {
        Arc::new(DeliveryContext::new(
            self.uploader.clone(),
            self.notifier.clone(),
            self.console.clone(),
            ReferenceUrlTemplate::default(),
        ))
    }
}
