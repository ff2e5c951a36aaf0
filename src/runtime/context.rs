//! Context assembly - task description + upstream outputs

use std::sync::Arc;

use crate::dag::{ExecutionPlan, PlanStep};
use crate::error::{CrewError, Result};
use crate::event::ContextSource;
use crate::store::OutputStore;

/// Inserted between the description and the first upstream output
pub const CONTEXT_HEADER: &str = "\n\nThis is the context you're working with:\n";

/// Inserted between consecutive upstream outputs
pub const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// Input handed to an agent for one task
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<ContextSource>,
}

/// Join a resolved description with upstream outputs (declared order).
///
/// With no upstream outputs the description is returned unchanged.
pub fn assemble(description: &str, upstream: &[(Arc<str>, Arc<str>)]) -> AssembledContext {
    if upstream.is_empty() {
        return AssembledContext {
            text: description.to_string(),
            sources: Vec::new(),
        };
    }

    let body_len: usize = upstream.iter().map(|(_, out)| out.len()).sum();
    let mut text = String::with_capacity(
        description.len()
            + CONTEXT_HEADER.len()
            + body_len
            + CONTEXT_SEPARATOR.len() * (upstream.len() - 1),
    );
    text.push_str(description);
    text.push_str(CONTEXT_HEADER);

    let mut sources = Vec::with_capacity(upstream.len());
    for (i, (task_id, output)) in upstream.iter().enumerate() {
        if i > 0 {
            text.push_str(CONTEXT_SEPARATOR);
        }
        text.push_str(output);
        sources.push(ContextSource {
            task_id: Arc::clone(task_id),
            chars: output.chars().count(),
        });
    }

    AssembledContext { text, sources }
}

/// Collect the stored outputs a step depends on.
///
/// Every upstream task must already have an output; a gap means the step is
/// being run out of order and is reported as a dependency-order error.
pub(crate) fn upstream_outputs(
    plan: &ExecutionPlan,
    step: &PlanStep,
    store: &OutputStore,
) -> Result<Vec<(Arc<str>, Arc<str>)>> {
    step.upstream
        .iter()
        .map(|&index| {
            let dep = plan.steps()[index].task.id_arc();
            store
                .text(dep)
                .map(|text| (Arc::clone(dep), text))
                .ok_or_else(|| CrewError::DependencyOrder {
                    task_id: step.task.id().to_string(),
                    dependency: dep.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn out(id: &str, text: &str) -> (Arc<str>, Arc<str>) {
        (Arc::from(id), Arc::from(text))
    }

    #[test]
    fn no_upstream_is_just_the_description() {
        let ctx = assemble("Escreva o roteiro", &[]);
        assert_eq!(ctx.text, "Escreva o roteiro");
        assert!(ctx.sources.is_empty());
    }

    #[test]
    fn upstream_outputs_follow_declared_order() {
        let ctx = assemble(
            "Revise",
            &[out("script", "ROTEIRO"), out("thumbnails", "THUMBS")],
        );
        assert_eq!(
            ctx.text,
            "Revise\n\nThis is the context you're working with:\nROTEIRO\n\n----------\n\nTHUMBS"
        );
        let ids: Vec<&str> = ctx.sources.iter().map(|s| &*s.task_id).collect();
        assert_eq!(ids, vec!["script", "thumbnails"]);
        assert_eq!(ctx.sources[0].chars, 7);
    }

    #[test]
    fn duplicate_upstream_is_repeated() {
        let ctx = assemble("d", &[out("a", "X"), out("a", "X")]);
        assert_eq!(ctx.text.matches('X').count(), 2);
    }
}
