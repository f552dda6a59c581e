// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared helpers for the integration tests.

#![allow(dead_code)]

use nodal_graph::{ActionPerformed, ComponentId, Document, PlugId};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// A notification observed on a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    InputChanged(PlugId),
    Dirtied(PlugId),
    Set(PlugId),
}

/// Records plug notifications in the order they are emitted
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    actions: Arc<Mutex<Vec<ActionPerformed>>>,
}

impl Recorder {
    pub fn attach(doc: &Document) -> Self {
        let recorder = Self::default();
        let signals = doc.signals();

        let events = Arc::clone(&recorder.events);
        signals
            .plug_input_changed
            .connect(move |e| events.lock().push(Event::InputChanged(e.plug)));
        let events = Arc::clone(&recorder.events);
        signals
            .plug_dirtied
            .connect(move |e| events.lock().push(Event::Dirtied(e.plug)));
        let events = Arc::clone(&recorder.events);
        signals
            .plug_set
            .connect(move |e| events.lock().push(Event::Set(e.plug)));
        let actions = Arc::clone(&recorder.actions);
        signals
            .action_performed
            .connect(move |e| actions.lock().push(e.clone()));

        recorder
    }

    /// Take every recorded plug event
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Take the recorded events, keeping only dirtied plugs
    pub fn take_dirtied(&self) -> Vec<PlugId> {
        self.take()
            .into_iter()
            .filter_map(|event| match event {
                Event::Dirtied(plug) => Some(plug),
                _ => None,
            })
            .collect()
    }

    /// Take every recorded history notification
    pub fn take_actions(&self) -> Vec<ActionPerformed> {
        std::mem::take(&mut *self.actions.lock())
    }
}

/// Log output captured from a scoped subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with error logs from this crate captured
pub fn capture_errors<R>(f: impl FnOnce() -> R) -> (R, String) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("nodal_graph=error"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

/// Assert that every input link is mirrored by an output link and back
pub fn assert_connections_consistent(doc: &Document) {
    for component in doc.components() {
        let Some(plug) = component.as_plug() else {
            continue;
        };
        let id = component.id();
        if let Some(input) = plug.input() {
            assert!(
                doc.outputs(input).contains(&id),
                "{} is missing from the outputs of {}",
                doc.full_name(id),
                doc.full_name(input)
            );
        }
        for &output in plug.outputs() {
            assert_eq!(
                doc.input(output),
                Some(id),
                "{} lists {} as an output",
                doc.full_name(id),
                doc.full_name(output)
            );
        }
    }
}

/// Everything observable about the tree below `root`, one line per component
pub fn snapshot(doc: &Document, root: ComponentId) -> Vec<String> {
    doc.descendants(root)
        .into_iter()
        .map(|id| {
            let name = doc.full_name(id);
            match doc.component(id).and_then(|c| c.as_plug()) {
                Some(plug) => format!(
                    "{name} input={:?} value={:?} flags={:?}",
                    plug.input().map(|input| doc.full_name(input)),
                    plug.value(),
                    plug.flags()
                ),
                None => name,
            }
        })
        .collect()
}
