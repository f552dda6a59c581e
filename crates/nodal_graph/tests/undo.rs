// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording, replaying and coalescing document history.

mod common;

use common::{assert_connections_consistent, snapshot, Recorder};
use nodal_graph::nodes::arithmetic::ADD;
use nodal_graph::nodes::dot::DOT;
use nodal_graph::{
    Document, DocumentConfig, GraphError, HistoryConfig, NodeId, PlugFlags, PlugId, PlugSpec,
    PlugType, PlugValue, Stage, UndoState,
};
use nodal_history::HistoryError;
use std::thread;
use std::time::Duration;

struct Scene {
    doc: Document,
    add: NodeId,
    dot: NodeId,
    op1: PlugId,
    op2: PlugId,
    dot_out: PlugId,
}

fn scene(config: DocumentConfig) -> Scene {
    let mut doc = Document::with_config(config).unwrap();
    let root = doc.root();
    let add = doc.create_node(ADD, "add", Some(root)).unwrap();
    let dot = doc.create_node(DOT, "dot", Some(root)).unwrap();
    let op1 = doc.child(add, "op1").unwrap();
    let op2 = doc.child(add, "op2").unwrap();
    let dot_out = doc.child(dot, "out").unwrap();
    Scene {
        doc,
        add,
        dot,
        op1,
        op2,
        dot_out,
    }
}

fn edit(doc: &mut Document, f: impl FnOnce(&mut Document) -> Result<(), GraphError>) {
    doc.with_undo_scope(UndoState::Enabled, None, f).unwrap();
}

fn drag(doc: &mut Document, plug: PlugId, value: i32) {
    doc.with_undo_scope(UndoState::Enabled, Some("drag"), |doc| {
        doc.set_value(plug, PlugValue::Int(value))
    })
    .unwrap();
}

#[test]
fn test_undo_and_redo_retrace_every_state() {
    let Scene {
        mut doc,
        add,
        dot,
        op1,
        op2,
        dot_out,
    } = scene(DocumentConfig::default());
    let root = doc.root();

    let mut states = vec![snapshot(&doc, root)];
    let mut record = |doc: &mut Document, f: &dyn Fn(&mut Document) -> Result<(), GraphError>| {
        edit(doc, f);
        assert_connections_consistent(doc);
        states.push(snapshot(doc, root));
    };

    record(&mut doc, &|doc| doc.set_value(op1, PlugValue::Int(3)));
    record(&mut doc, &|doc| doc.set_input(op2, Some(dot_out)));
    record(&mut doc, &|doc| doc.set_name(add, "adder").map(drop));
    record(&mut doc, &|doc| doc.set_flag(op1, PlugFlags::READ_ONLY, true));
    record(&mut doc, &|doc| doc.create_node(DOT, "extra", Some(root)).map(drop));
    record(&mut doc, &|doc| doc.remove(dot));
    record(&mut doc, &|doc| {
        let mut order = doc.children(add).to_vec();
        order.reverse();
        doc.reorder_children(add, &order)
    });
    record(&mut doc, &|doc| {
        let plug = doc.create_plug(
            &PlugSpec::input("bias", PlugType::Int).with_flag(PlugFlags::DYNAMIC, true),
        )?;
        doc.add_child(add, plug)
    });

    let steps = states.len() - 1;
    assert_eq!(doc.history().undo_depth(), steps);
    assert_ne!(states.first(), states.last());

    for expected in states[..steps].iter().rev() {
        doc.undo().unwrap();
        assert_connections_consistent(&doc);
        assert_eq!(&snapshot(&doc, root), expected);
    }
    assert!(!doc.undo_available());

    for expected in &states[1..] {
        doc.redo().unwrap();
        assert_connections_consistent(&doc);
        assert_eq!(&snapshot(&doc, root), expected);
    }
    assert!(!doc.redo_available());
}

#[test]
fn test_new_edit_discards_redo_branch() {
    let Scene { mut doc, op1, .. } = scene(DocumentConfig::default());

    edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(1)));
    edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(2)));
    doc.undo().unwrap();
    assert!(doc.redo_available());

    edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(5)));
    assert!(!doc.redo_available());
    assert_eq!(doc.history().undo_depth(), 2);

    doc.undo().unwrap();
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(1)));
}

#[test]
fn test_edits_outside_a_scope_are_not_recorded() {
    let Scene { mut doc, op1, .. } = scene(DocumentConfig::default());
    doc.set_value(op1, PlugValue::Int(9)).unwrap();
    assert!(!doc.undo_available());
    assert_eq!(
        doc.undo().unwrap_err().to_string(),
        GraphError::History(HistoryError::NothingToUndo).to_string()
    );
}

#[test]
fn test_disabled_scope_is_not_recorded() {
    let Scene { mut doc, op1, .. } = scene(DocumentConfig::default());
    doc.with_undo_scope(UndoState::Enabled, None, |doc| {
        doc.with_undo_scope(UndoState::Disabled, None, |doc| {
            doc.set_value(op1, PlugValue::Int(4))
        })
    })
    .unwrap();
    assert!(!doc.undo_available());
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(4)));
}

#[test]
fn test_merge_group_coalesces_into_one_undo() {
    let Scene {
        mut doc, op1, op2, ..
    } = scene(DocumentConfig::default());
    let recorder = Recorder::attach(&doc);

    drag(&mut doc, op1, 1);
    drag(&mut doc, op1, 2);
    drag(&mut doc, op2, 3);

    assert_eq!(doc.history().undo_depth(), 1);
    let merged: Vec<bool> = recorder.take_actions().iter().map(|a| a.merged).collect();
    assert_eq!(merged, [false, true, true]);

    doc.undo().unwrap();
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(0)));
    assert_eq!(doc.value(op2).unwrap(), Some(&PlugValue::Int(0)));
    assert!(!doc.undo_available());

    doc.redo().unwrap();
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(2)));
    assert_eq!(doc.value(op2).unwrap(), Some(&PlugValue::Int(3)));
}

#[test]
fn test_expired_merge_window_keeps_batches_apart() {
    let config = DocumentConfig {
        history: HistoryConfig {
            merge_window_ms: Some(0),
            ..HistoryConfig::default()
        },
        ..DocumentConfig::default()
    };
    let Scene { mut doc, op1, .. } = scene(config);

    drag(&mut doc, op1, 1);
    thread::sleep(Duration::from_millis(5));
    drag(&mut doc, op1, 2);

    assert_eq!(doc.history().undo_depth(), 2);
    doc.undo().unwrap();
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(1)));
}

#[test]
fn test_history_depth_is_bounded() {
    let config = DocumentConfig::from_ron("(history: (max_depth: Some(2)))").unwrap();
    let Scene { mut doc, op1, .. } = scene(config);

    for value in 1..=4 {
        edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(value)));
    }
    assert_eq!(doc.history().undo_depth(), 2);

    doc.undo().unwrap();
    doc.undo().unwrap();
    assert!(!doc.undo_available());
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(2)));
}

#[test]
fn test_action_performed_reports_each_stage() {
    let Scene { mut doc, op1, .. } = scene(DocumentConfig::default());
    let recorder = Recorder::attach(&doc);

    edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(1)));
    doc.undo().unwrap();
    doc.redo().unwrap();

    let actions = recorder.take_actions();
    let stages: Vec<Stage> = actions.iter().map(|a| a.stage).collect();
    assert_eq!(stages, [Stage::Do, Stage::Undo, Stage::Redo]);
    for action in &actions {
        assert_eq!(action.descriptions, ["Set value"]);
        assert_eq!(action.merge_group, None);
    }
    assert_eq!(doc.current_action_stage(), Stage::Invalid);
}

#[test]
fn test_undo_is_refused_inside_an_open_scope() {
    let Scene { mut doc, op1, .. } = scene(DocumentConfig::default());
    edit(&mut doc, |doc| doc.set_value(op1, PlugValue::Int(1)));

    doc.begin_undo_scope(UndoState::Enabled, None);
    assert_eq!(doc.current_action_stage(), Stage::Do);
    assert!(!doc.undo_available());
    assert!(matches!(
        doc.undo(),
        Err(GraphError::History(HistoryError::ReplayInProgress(Stage::Do)))
    ));
    doc.end_undo_scope().unwrap();

    assert!(doc.undo_available());
    assert!(matches!(
        doc.end_undo_scope(),
        Err(GraphError::History(HistoryError::BadNesting))
    ));
}

#[test]
fn test_failed_edit_keeps_earlier_changes_recorded() {
    let Scene {
        mut doc, op1, op2, ..
    } = scene(DocumentConfig::default());

    let result = doc.with_undo_scope(UndoState::Enabled, None, |doc| {
        doc.set_value(op1, PlugValue::Int(1))?;
        doc.set_value(op2, PlugValue::String("two".to_string()))
    });
    assert!(matches!(result, Err(GraphError::Value(_))));
    assert_eq!(doc.history().undo_depth(), 1);

    doc.undo().unwrap();
    assert_eq!(doc.value(op1).unwrap(), Some(&PlugValue::Int(0)));
}

#[test]
fn test_removing_a_node_severs_and_undo_restores_connections() {
    let Scene {
        mut doc,
        dot,
        op1,
        op2,
        dot_out,
        ..
    } = scene(DocumentConfig::default());
    doc.set_input(op1, Some(dot_out)).unwrap();
    doc.set_input(op2, Some(dot_out)).unwrap();

    edit(&mut doc, |doc| doc.remove(dot));
    assert_eq!(doc.input(op1), None);
    assert_eq!(doc.input(op2), None);
    assert!(doc.outputs(dot_out).is_empty());
    assert_eq!(doc.parent(dot), None);
    assert_connections_consistent(&doc);

    doc.undo().unwrap();
    assert_eq!(doc.parent(dot), Some(doc.root()));
    assert_eq!(doc.input(op1), Some(dot_out));
    assert_eq!(doc.input(op2), Some(dot_out));
    let outputs = doc.outputs(dot_out);
    assert_eq!(outputs.len(), 2);
    assert!(outputs.contains(&op1) && outputs.contains(&op2));
    assert_connections_consistent(&doc);

    doc.redo().unwrap();
    assert!(doc.outputs(dot_out).is_empty());
    assert_connections_consistent(&doc);
}
