//! Integration tests composing trees, dividers and concatenation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use plait::prelude::*;
use plait::sequence::ChildSource;
use plait::testing::ScriptedLoader;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type ChildMap = Arc<Mutex<HashMap<String, Arc<ArraySequence<String>>>>>;

/// Children of a root item named `n` are `n/0`, `n/1`, ... with the count
/// looked up in `sizes` (two by default).
struct NamedChildren {
    root: Arc<ArraySequence<String>>,
    sizes: HashMap<String, usize>,
    made: ChildMap,
}

impl ChildSource<String> for NamedChildren {
    fn child_sequence(&self, root_position: usize) -> Arc<dyn Sequence<Item = String>> {
        let name = self.root.item(root_position).unwrap_or_default();
        let count = self.sizes.get(&name).copied().unwrap_or(2);
        let child = Arc::new(ArraySequence::new(
            (0..count).map(|i| format!("{name}/{i}")).collect(),
        ));
        self.made.lock().insert(name, child.clone());
        child
    }
}

struct Tree {
    root: Arc<ArraySequence<String>>,
    made: ChildMap,
    tree: Arc<TreeSequence<String>>,
}

impl Tree {
    fn new(names: &[&str], sizes: &[(&str, usize)]) -> Self {
        let root = Arc::new(ArraySequence::new(
            names.iter().map(|name| name.to_string()).collect(),
        ));
        let made: ChildMap = Arc::new(Mutex::new(HashMap::new()));
        let tree = TreeSequence::new(
            root.clone(),
            NamedChildren {
                root: root.clone(),
                sizes: sizes
                    .iter()
                    .map(|(name, count)| (name.to_string(), *count))
                    .collect(),
                made: made.clone(),
            },
        );
        Self { root, made, tree }
    }

    fn child(&self, name: &str) -> Arc<ArraySequence<String>> {
        self.made.lock()[name].clone()
    }

    fn items(&self) -> Vec<String> {
        (0..self.tree.len())
            .map(|p| self.tree.item(p).unwrap())
            .collect()
    }
}

#[test]
fn test_expand_then_collapse_middle_item() {
    init_tracing();
    let t = Tree::new(&["A", "B", "C"], &[("B", 2)]);
    let recorder = ChangeRecorder::attach(t.tree.clone());

    t.tree.expand(1).unwrap();
    assert_eq!(t.tree.len(), 5);
    assert_eq!(t.items(), ["A", "B", "B/0", "B/1", "C"]);
    assert_eq!(t.tree.item(2).unwrap(), "B/0");
    assert_eq!(t.tree.item(3).unwrap(), "B/1");
    assert_eq!(t.tree.outer_to_root(4).unwrap(), 2);

    t.tree.collapse(1);
    assert_eq!(t.tree.len(), 3);
    assert_eq!(t.items(), ["A", "B", "C"]);
    assert_eq!(
        recorder.take(),
        vec![
            SequenceChange::Inserted { start: 2, count: 2 },
            SequenceChange::Removed { start: 2, count: 2 },
        ]
    );
}

#[test]
fn test_repeated_expand_and_stray_collapse() {
    init_tracing();
    let t = Tree::new(&["A", "B"], &[]);
    let recorder = ChangeRecorder::attach(t.tree.clone());

    t.tree.expand(0).unwrap();
    t.tree.expand(0).unwrap();
    t.tree.collapse(1);

    assert_eq!(t.tree.expanded_positions(), vec![0]);
    assert_eq!(t.tree.len(), 4);
    assert_eq!(recorder.len(), 1);
    assert!(t.tree.item(4).is_err());
    assert_eq!(
        t.tree.expand(2),
        Err(PlaitError::OutOfRange { position: 2, len: 2 })
    );
}

#[test]
fn test_positions_round_trip() {
    init_tracing();
    let t = Tree::new(&["A", "B", "C", "D"], &[("A", 1), ("C", 3), ("D", 0)]);
    for root_position in [0, 2, 3] {
        t.tree.expand(root_position).unwrap();
    }
    let _recorder = ChangeRecorder::attach(t.tree.clone());
    assert_eq!(t.tree.len(), 4 + 1 + 3);

    for outer in 0..t.tree.len() {
        let root_position = t.tree.outer_to_root(outer).unwrap();
        let root_outer = t.tree.root_to_outer(root_position).unwrap();
        assert_eq!(t.tree.outer_to_root(root_outer).unwrap(), root_position);

        let expected = match t.tree.resolve(outer).unwrap() {
            TreePosition::Root(position) => {
                assert_eq!(outer, root_outer);
                t.root.item(position).unwrap()
            }
            TreePosition::Child { root, index } => {
                assert_eq!(outer, root_outer + 1 + index);
                let name = t.root.item(root).unwrap();
                t.child(&name).item(index).unwrap()
            }
        };
        assert_eq!(t.tree.item(outer).unwrap(), expected);
    }
}

#[test]
fn test_queries_share_one_rebuild() {
    init_tracing();
    let t = Tree::new(&["A", "B", "C"], &[]);
    t.tree.expand(0).unwrap();
    t.tree.expand(2).unwrap();
    let _recorder = ChangeRecorder::attach(t.tree.clone());
    t.items();

    for mutation in 0..3 {
        let before = t.tree.rebuild_count();
        t.root.insert(1, format!("new{mutation}")).unwrap();
        for outer in 0..t.tree.len() {
            t.tree.item(outer).unwrap();
            t.tree.outer_to_root(outer).unwrap();
        }
        assert_eq!(t.tree.rebuild_count(), before + 1);
    }
}

#[test]
fn test_child_and_root_mutations_keep_the_mirror() {
    init_tracing();
    let t = Tree::new(&["A", "B", "C", "D"], &[]);
    let mirror = Mirror::attach(t.tree.clone());
    let recorder = ChangeRecorder::attach(t.tree.clone());
    let initial = t.tree.len();

    t.tree.expand(1).unwrap();
    t.tree.expand(3).unwrap();
    t.child("B").push("B/x".to_string());
    t.child("D").remove(0).unwrap();
    t.root.move_range(3, 0, 1).unwrap();
    t.root.insert(2, "E".to_string()).unwrap();
    t.root.notifier().notify_changed(0, 4);
    t.root.remove_range(2, 2).unwrap();
    mirror.assert_consistent();

    assert_eq!(t.items(), ["D", "D/1", "A", "C"]);
    assert_eq!(
        initial as isize + recorder.net_len_delta(),
        t.tree.len() as isize
    );
    assert_eq!(t.tree.expanded_positions(), vec![0]);
    assert_eq!(t.child("B").observer_count(), 0);
}

#[test]
fn test_divider_marker_transitions() {
    init_tracing();
    let inner = Arc::new(ArraySequence::<u32>::empty());
    let dividers = DividerBuilder::new()
        .leading(ViewType::new())
        .trailing(ViewType::new())
        .empty_policy(EmptyPolicy::show_leading_and_trailing())
        .build(inner.clone());
    let recorder = ChangeRecorder::attach(dividers.clone());
    assert_eq!(dividers.len(), 2);
    assert_eq!(dividers.item(0).unwrap(), Divided::Leading);
    assert_eq!(dividers.item(1).unwrap(), Divided::Trailing);

    inner.push(1);
    assert_eq!(dividers.len(), 1);
    assert_eq!(
        recorder.take(),
        vec![
            SequenceChange::Removed { start: 0, count: 2 },
            SequenceChange::Inserted { start: 0, count: 1 },
        ]
    );
    assert_eq!(
        dividers.item(0).unwrap(),
        Divided::Item {
            item: 1,
            dividers: Dividers {
                leading: true,
                inner: false,
                trailing: true,
            },
        }
    );

    inner.clear();
    assert_eq!(dividers.len(), 2);
    assert_eq!(
        recorder.take(),
        vec![
            SequenceChange::Removed { start: 0, count: 1 },
            SequenceChange::Inserted { start: 0, count: 2 },
        ]
    );
}

#[test]
fn test_leading_only_policy_transition() {
    init_tracing();
    let inner = Arc::new(ArraySequence::<u32>::empty());
    let dividers = DividerBuilder::new()
        .leading(ViewType::new())
        .trailing(ViewType::new())
        .empty_policy(EmptyPolicy::show_leading())
        .build(inner.clone());
    let recorder = ChangeRecorder::attach(dividers.clone());
    assert_eq!(dividers.len(), 1);

    inner.push(5);
    assert_eq!(dividers.len(), 1);
    assert_eq!(
        recorder.take(),
        vec![
            SequenceChange::Removed { start: 0, count: 1 },
            SequenceChange::Inserted { start: 0, count: 1 },
        ]
    );
}

#[test]
fn test_dividers_around_a_tree() {
    init_tracing();
    let t = Tree::new(&["A", "B"], &[("A", 1)]);
    let dividers = DividerBuilder::new()
        .leading(ViewType::new())
        .inner(ViewType::new())
        .trailing(ViewType::new())
        .build(t.tree.clone());
    let mirror = Mirror::attach(dividers.clone());

    t.tree.expand(0).unwrap();
    t.tree.expand(1).unwrap();
    t.child("B").push("B/2".to_string());
    t.tree.collapse(0);
    t.root.remove(0).unwrap();
    mirror.assert_consistent();

    let flat: Vec<String> = (0..dividers.len())
        .filter_map(|p| dividers.item(p).unwrap().into_item())
        .collect();
    assert_eq!(flat, ["B", "B/0", "B/1", "B/2"]);
    assert!(dividers.dividers(0).unwrap().leading);
    assert!(dividers.dividers(3).unwrap().trailing);

    t.root.clear();
    mirror.assert_consistent();
    assert_eq!(dividers.len(), 0);
}

#[test]
fn test_concatenated_trees_translate_children() {
    init_tracing();
    let first = Tree::new(&["A"], &[("A", 1)]);
    let second = Tree::new(&["X", "Y"], &[]);
    let header: Arc<dyn Sequence<Item = String>> =
        Arc::new(ArraySequence::new(vec!["header".to_string()]));
    let page = ConcatSequence::new(vec![header]);
    page.push_part(first.tree.clone());
    page.push_part(second.tree.clone());
    let recorder = ChangeRecorder::attach(page.clone());
    let mirror = Mirror::attach(page.clone());

    second.tree.expand(0).unwrap();
    first.tree.expand(0).unwrap();
    second.child("X").remove(1).unwrap();

    assert_eq!(
        recorder.take(),
        vec![
            SequenceChange::Inserted { start: 3, count: 2 },
            SequenceChange::Inserted { start: 2, count: 1 },
            SequenceChange::Removed { start: 5, count: 1 },
        ]
    );
    mirror.assert_consistent();
    assert_eq!(page.len(), 6);
    assert_eq!(page.item(5).unwrap(), "Y");
}

#[test]
fn test_loading_part_with_empty_state() {
    init_tracing();
    let loader = Arc::new(ScriptedLoader::<String>::new());
    let empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Hide);
    let spinner = LoadingStateDelegate::new(loader.clone());
    let header: Arc<dyn Sequence<Item = String>> =
        Arc::new(ArraySequence::new(vec!["header".to_string()]));
    let page = ConcatSequence::new(vec![header]);
    page.push_part(loader.clone());
    let mirror = Mirror::attach(page.clone());

    loader.set_loading(true);
    assert!(spinner.is_visible());
    assert!(!empty.is_visible());

    loader
        .complete(vec!["one".to_string(), "two".to_string()])
        .unwrap();
    assert!(!spinner.is_visible());
    assert!(!empty.is_visible());
    assert_eq!(page.len(), 3);
    mirror.assert_consistent();

    loader.set_loading(true);
    loader.data().clear();
    loader.fail("timed out");
    assert!(empty.is_visible());
    assert_eq!(page.len(), 1);
    mirror.assert_consistent();
}
