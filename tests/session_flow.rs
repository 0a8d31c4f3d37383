use std::sync::{Arc, Mutex};

use vdl_tree::{
    BackendError, ChaseOutcome, ChaseReplier, ChaseRequest, DebuggerBackend, ExpandedItem,
    Inspector, InspectorOptions, NodeKind, OpenNodeChange, OpenNodeStore, Scope, TreeHandle,
    TreeSnapshot, ValueFlags, ValueItem,
};

// ── Helpers ────────────────────────────────────────────────────

/// Backend that answers every chase on another thread after recording it.
#[derive(Clone, Default)]
struct ThreadedBackend {
    requests: Arc<Mutex<Vec<String>>>,
}

impl DebuggerBackend for ThreadedBackend {
    fn chase(&mut self, request: ChaseRequest, replier: ChaseReplier) -> Result<(), BackendError> {
        self.requests.lock().unwrap().push(request.command_line());
        let reply = match request.expr.as_str() {
            "*list.head" => r#"(agg name="*list.head" (val name="data" value="7")
                 (val name="next" value="0x30" (deref expr="*list.head->next")))"#,
            "*list.head->next" => r#"(agg name="*list.head->next" (val name="data" value="8")
                 (val name="next" value="(nil)" (deref expr="*list.head->next->next")))"#,
            _ => "",
        }
        .to_string();
        std::thread::spawn(move || replier.complete(ChaseOutcome::Success(reply)));
        Ok(())
    }

    fn execute(&mut self, _statement: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<Vec<OpenNodeChange>>>);

impl OpenNodeStore for SharedStore {
    fn notify_open_node(&mut self, change: &OpenNodeChange) {
        self.0.lock().unwrap().push(change.clone());
    }
}

fn list_local() -> ValueItem {
    ValueItem {
        name: Some("list".into()),
        vdl: Some(
            r#"(agg name="list" type="struct list"
                 (val name="len" value="2" assign="list.len=")
                 (val name="head" type="struct node *" value="0x20" (deref expr="*list.head")))"#
                .into(),
        ),
        flags: ValueFlags::empty(),
    }
}

async fn settled(handle: &TreeHandle) -> TreeSnapshot {
    loop {
        let snapshot = handle.snapshot().await.unwrap();
        if snapshot.pending_chases == 0 {
            return snapshot;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
}

async fn expand_key(handle: &TreeHandle, key: &str) {
    let node = handle
        .find_by_key(Scope::Locals, key)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("no node with key {key}"));
    handle.expand(node).unwrap();
}

// ── Scenarios ──────────────────────────────────────────────────

#[tokio::test]
async fn expand_linked_list_two_levels() {
    let backend = ThreadedBackend::default();
    let store = SharedStore::default();
    let inspector = Inspector::new(Box::new(store.clone()), InspectorOptions::default());
    let (handle, _task) = vdl_tree::spawn(inspector, Box::new(backend.clone()));

    handle.set_locals(vec![list_local()]).unwrap();
    expand_key(&handle, "*list.head").await;
    settled(&handle).await;
    expand_key(&handle, "*list.head->next").await;
    let snapshot = settled(&handle).await;

    let list = &snapshot.locals[0];
    assert_eq!(list.value, "(2,0x20)");
    let head = &list.children[1];
    assert_eq!(head.kind, NodeKind::Pointer { chased: true });
    assert_eq!(head.children[0].value, "7");
    let next = &head.children[1];
    assert_eq!(next.children[0].value, "8");
    // The null pointer at the end cannot be expanded.
    assert!(next.children[1].is_leaf);

    assert_eq!(backend.requests.lock().unwrap().len(), 2);
    let changes = store.0.lock().unwrap();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.owner_key == "list" && c.expanded));
}

#[tokio::test]
async fn refresh_after_stop_keeps_open_subtree() {
    let (handle, _task) = vdl_tree::spawn(Inspector::default(), Box::new(ThreadedBackend::default()));

    handle.set_locals(vec![list_local()]).unwrap();
    expand_key(&handle, "*list.head").await;
    let before = settled(&handle).await;
    let head_before = handle.find_by_key(Scope::Locals, "*list.head").await.unwrap();

    // Next stop: same locals, backend reports the head as still expanded.
    handle.set_locals(vec![list_local()]).unwrap();
    handle
        .set_expanded_nodes(
            Scope::Locals,
            vec![ExpandedItem {
                key: "*list.head".into(),
                vdl: Some(r#"(agg name="*list.head" (val name="data" value="9"))"#.into()),
                flags: ValueFlags::empty(),
            }],
        )
        .unwrap();
    let after = settled(&handle).await;

    assert_eq!(
        handle.find_by_key(Scope::Locals, "*list.head").await.unwrap(),
        head_before
    );
    assert_eq!(before.locals[0].children[1].children[0].value, "7");
    let head = &after.locals[0].children[1];
    assert!(head.expanded);
    assert_eq!(head.children.len(), 1);
    assert_eq!(head.children[0].value, "9");
}

#[tokio::test]
async fn watches_and_assignment() {
    let (handle, _task) = vdl_tree::spawn(Inspector::default(), Box::new(ThreadedBackend::default()));

    handle.set_locals(vec![list_local()]).unwrap();
    handle
        .set_watch(
            4,
            ValueItem {
                name: Some("list.len * 2".into()),
                vdl: None,
                flags: ValueFlags::NOT_AVAILABLE,
            },
        )
        .unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.watches[0].watch_id, 4);
    assert_eq!(snapshot.watches[0].node.value, "<NOT_AVAILABLE>");

    let len = handle.find_by_key(Scope::Locals, "len").await.unwrap().unwrap();
    handle.assign(len, "3").await.unwrap();
    let head = handle.find_by_key(Scope::Locals, "*list.head").await.unwrap().unwrap();
    assert!(handle.assign(head, "0").await.is_err());

    handle.remove_watch(4).unwrap();
    assert!(handle.snapshot().await.unwrap().watches.is_empty());
}

#[tokio::test]
async fn snapshot_serializes_to_json() {
    let (handle, _task) = vdl_tree::spawn(Inspector::default(), Box::new(ThreadedBackend::default()));
    handle.set_locals(vec![list_local()]).unwrap();
    let snapshot = handle.snapshot().await.unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["locals"][0]["name"], "list");
    assert_eq!(json["locals"][0]["kind"], "aggregate");
    assert_eq!(json["locals"][0]["children"][1]["kind"], "pointer");
    assert_eq!(json["pending_chases"], 0);
}
