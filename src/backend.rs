use std::collections::HashMap;

use tracing::{debug, info};

use vdl_tree::{
    BackendError, ChaseFailure, ChaseOutcome, ChaseReplier, ChaseRequest, DebuggerBackend,
    OpenNodeChange, OpenNodeStore, ValueFlags,
};

/// Backend answering chases from canned replies, keyed by expression.
///
/// Replies are delivered from a spawned task, the way a real debugger
/// connection answers on its reader thread.
pub(crate) struct ScriptedBackend {
    replies: HashMap<String, ChaseOutcome>,
}

impl ScriptedBackend {
    pub(crate) fn new(replies: impl IntoIterator<Item = (String, ChaseOutcome)>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
        }
    }
}

impl DebuggerBackend for ScriptedBackend {
    fn chase(&mut self, request: ChaseRequest, replier: ChaseReplier) -> Result<(), BackendError> {
        info!(command = %request.command_line(), "chase");
        let outcome = self.replies.get(&request.expr).cloned().unwrap_or_else(|| {
            debug!(expr = %request.expr, "no scripted reply");
            ChaseOutcome::Failure(ChaseFailure {
                flags: ValueFlags::ERROR,
                name: request.expr.clone(),
                type_name: String::new(),
            })
        });
        tokio::spawn(async move { replier.complete(outcome) });
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<(), BackendError> {
        info!(statement, "assign");
        Ok(())
    }
}

/// Open-node store that only logs.
pub(crate) struct TracingOpenNodes;

impl OpenNodeStore for TracingOpenNodes {
    fn notify_open_node(&mut self, change: &OpenNodeChange) {
        debug!(
            owner = %change.owner_key,
            node = %change.node_key,
            expanded = change.expanded,
            local = change.is_local,
            "open node changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdl_tree::{Inspector, InspectorOptions, Scope, ValueItem};

    #[tokio::test]
    async fn scripted_reply_reaches_tree() {
        let backend = ScriptedBackend::new([(
            "*p".to_string(),
            ChaseOutcome::Success(r#"(val name="*p" value="5")"#.to_string()),
        )]);
        let inspector = Inspector::new(Box::new(TracingOpenNodes), InspectorOptions::default());
        let (handle, _task) = vdl_tree::spawn(inspector, Box::new(backend));
        handle
            .set_locals(vec![ValueItem {
                name: Some("p".into()),
                vdl: Some(r#"(val name="p" value="0x10" (deref expr="*p"))"#.into()),
                flags: ValueFlags::empty(),
            }])
            .unwrap();
        let p = handle.find_by_key(Scope::Locals, "*p").await.unwrap().unwrap();
        handle.expand(p).unwrap();

        let mut snapshot = handle.snapshot().await.unwrap();
        while snapshot.pending_chases > 0 {
            tokio::task::yield_now().await;
            snapshot = handle.snapshot().await.unwrap();
        }
        assert_eq!(snapshot.locals[0].children[0].value, "5");
    }

    #[tokio::test]
    async fn unknown_expression_fails_chase() {
        let backend = ScriptedBackend::new([]);
        let (handle, _task) = vdl_tree::spawn(Inspector::default(), Box::new(backend));
        handle
            .set_locals(vec![ValueItem {
                name: Some("q".into()),
                vdl: Some(r#"(val name="q" value="0x10" (deref expr="*q"))"#.into()),
                flags: ValueFlags::empty(),
            }])
            .unwrap();
        let q = handle.find_by_key(Scope::Locals, "*q").await.unwrap().unwrap();
        handle.expand(q).unwrap();

        let mut snapshot = handle.snapshot().await.unwrap();
        while snapshot.pending_chases > 0 {
            tokio::task::yield_now().await;
            snapshot = handle.snapshot().await.unwrap();
        }
        assert_eq!(snapshot.locals[0].children[0].value, "<ERROR>");
    }
}
