//! Crew Runner - sequential execution with event sourcing
//!
//! One task at a time, in declared order. A task's context is assembled only
//! after every upstream output is stored, and each output is written once.
//! The first failing task ends the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::crew::{Crew, ResolvedCrew};
use crate::dag::{ExecutionPlan, PlanStep};
use crate::error::{CrewError, Result};
use crate::event::{EventKind, EventLog};
use crate::provider::{InvocationRequest, Provider};
use crate::store::{OutputStore, TaskOutput};
use crate::template::Parameters;

use super::context::{assemble, upstream_outputs};
use super::output::{aggregate, CrewOutput};

/// Chars of task output shown in logs
const PREVIEW_CHARS: usize = 160;

/// Knobs for one runner
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Applied to each agent invocation; expiry fails the task
    pub task_timeout: Option<Duration>,
    /// Checked between tasks only
    pub cancel: Option<CancellationToken>,
    /// Print per-task progress lines to stdout
    pub progress: bool,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Executor state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running { task: Arc<str> },
    Completed,
    /// `task` is `None` when the run was rejected before any task started
    Failed { task: Option<Arc<str>>, cause: String },
    Cancelled { completed: usize },
}

/// Runs a crew against a provider
///
/// The crew is shared and never mutated, so the same runner can be run
/// again with other parameters. Runs on one runner must not overlap.
pub struct Runner {
    crew: Arc<Crew>,
    provider: Arc<dyn Provider>,
    options: RunOptions,
    event_log: EventLog,
    state: RwLock<RunState>,
    last_outputs: RwLock<OutputStore>,
}

impl Runner {
    pub fn new(crew: impl Into<Arc<Crew>>, provider: Arc<dyn Provider>) -> Self {
        Self {
            crew: crew.into(),
            provider,
            options: RunOptions::default(),
            event_log: EventLog::new(),
            state: RwLock::new(RunState::Pending),
            last_outputs: RwLock::new(OutputStore::new()),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn crew(&self) -> &Crew {
        &self.crew
    }

    /// Event history of every run on this runner
    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn state(&self) -> RunState {
        self.state.read().clone()
    }

    /// Outputs stored by the latest run (partial after failure or cancellation)
    pub fn last_outputs(&self) -> OutputStore {
        self.last_outputs.read().clone()
    }

    fn set_state(&self, state: RunState) {
        *self.state.write() = state;
    }

    /// Run the crew with `params` (merged over the crew's defaults).
    ///
    /// Ordering and every template are checked before the first agent is
    /// invoked; nothing is invoked if either check fails.
    #[instrument(skip(self, params), fields(crew = self.crew.name().unwrap_or("-"), tasks = self.crew.tasks().len()))]
    pub async fn run(&self, params: &Parameters) -> Result<CrewOutput> {
        let start = Instant::now();
        let store = OutputStore::new();
        *self.last_outputs.write() = store.clone();
        self.set_state(RunState::Pending);

        let result = self.execute(params, &store, start).await;

        match &result {
            Ok(output) => {
                self.set_state(RunState::Completed);
                self.event_log.emit(EventKind::CrewCompleted {
                    final_output: Arc::clone(&output.final_output),
                    total_duration_ms: start.elapsed().as_millis() as u64,
                });
                info!(run_id = %output.run_id, "Crew completed");
            }
            Err(CrewError::Cancelled { completed }) => {
                self.set_state(RunState::Cancelled {
                    completed: *completed,
                });
                self.event_log.emit(EventKind::CrewCancelled {
                    completed: *completed,
                });
                warn!(completed, "Crew cancelled");
            }
            Err(e) => {
                let task = e.failed_task().map(Arc::<str>::from);
                self.set_state(RunState::Failed {
                    task: task.clone(),
                    cause: e.to_string(),
                });
                self.event_log.emit(EventKind::CrewFailed {
                    error: e.to_string(),
                    failed_task: task,
                });
                warn!(error = %e, "Crew failed");
            }
        }

        result
    }

    async fn execute(&self, params: &Parameters, store: &OutputStore, start: Instant) -> Result<CrewOutput> {
        // Pre-flight: ordering, then every template
        let plan = ExecutionPlan::build(&self.crew)?;
        let inputs = self.crew.merged_inputs(params);
        let resolved = self.crew.resolve(&inputs)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let total = plan.len();
        self.event_log.emit(EventKind::CrewStarted {
            run_id: run_id.clone(),
            crew: self.crew.name().map(str::to_string),
            task_count: total,
            inputs: serde_json::to_value(&inputs).unwrap_or_default(),
        });
        info!(run_id = %run_id, "Starting crew run");

        if self.options.progress {
            println!(
                "{} Running crew {}with {} tasks ({})...\n",
                "→".cyan(),
                self.crew
                    .name()
                    .map(|n| format!("'{}' ", n))
                    .unwrap_or_default(),
                total,
                self.crew.process()
            );
        }

        for (index, step) in plan.steps().iter().enumerate() {
            if self.options.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                return Err(CrewError::Cancelled { completed: index });
            }

            let output = self
                .run_step(&plan, index, step, &resolved, store)
                .await?;
            store.record(output)?;
        }

        aggregate(run_id, &plan, store, start.elapsed())
    }

    /// Run one step and report it; the output is not stored yet
    async fn run_step(
        &self,
        plan: &ExecutionPlan,
        index: usize,
        step: &PlanStep,
        resolved: &ResolvedCrew,
        store: &OutputStore,
    ) -> Result<TaskOutput> {
        let task_id = Arc::clone(step.task.id_arc());
        let agent_id = Arc::clone(step.agent.id_arc());
        let position = format!("[{}/{}]", index + 1, plan.len());

        self.set_state(RunState::Running {
            task: Arc::clone(&task_id),
        });
        self.event_log.emit(EventKind::TaskStarted {
            task_id: Arc::clone(&task_id),
            agent_id: Arc::clone(&agent_id),
        });
        if self.options.progress {
            println!(
                "  {} {} {} {}",
                "[⟳]".yellow(),
                &*task_id,
                format!("({})", agent_id).dimmed(),
                "running...".dimmed()
            );
        }

        let start = Instant::now();
        let result = self
            .invoke_step(plan, step, resolved, store, &task_id, &agent_id)
            .await;
        let duration = start.elapsed();

        match result {
            Ok(mut output) => {
                output.duration = duration;
                self.event_log.emit(EventKind::TaskCompleted {
                    task_id: Arc::clone(&task_id),
                    output_len: output.raw.chars().count(),
                    input_tokens: output.usage.prompt_tokens,
                    output_tokens: output.usage.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                });

                let preview = preview(&output.raw, PREVIEW_CHARS);
                if step.agent.is_verbose() {
                    info!(task_id = %task_id, agent = %agent_id, output = %preview, "Task output");
                } else {
                    debug!(task_id = %task_id, agent = %agent_id, output = %preview, "Task output");
                }

                if self.options.progress {
                    println!(
                        "  {} {} {} {}",
                        position.green(),
                        &*task_id,
                        "✓".green(),
                        format!("({:.1}s)", duration.as_secs_f32()).dimmed()
                    );
                }
                Ok(output)
            }
            Err(e) => {
                self.event_log.emit(EventKind::TaskFailed {
                    task_id: Arc::clone(&task_id),
                    error: e.to_string(),
                    duration_ms: duration.as_millis() as u64,
                });
                warn!(task_id = %task_id, agent = %agent_id, error = %e, "Task failed");

                if self.options.progress {
                    println!(
                        "  {} {} {} {}",
                        position.red(),
                        &*task_id,
                        "✗".red(),
                        format!("({:.1}s)", duration.as_secs_f32()).dimmed()
                    );
                    println!("      {} {}", "Error:".red(), e);
                }
                Err(e)
            }
        }
    }

    async fn invoke_step(
        &self,
        plan: &ExecutionPlan,
        step: &PlanStep,
        resolved: &ResolvedCrew,
        store: &OutputStore,
        task_id: &Arc<str>,
        agent_id: &Arc<str>,
    ) -> Result<TaskOutput> {
        let task = resolved.task(task_id).ok_or_else(|| CrewError::DependencyOrder {
            task_id: task_id.to_string(),
            dependency: task_id.to_string(),
        })?;
        let agent = resolved.agent(agent_id).ok_or_else(|| CrewError::UnknownAgent {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
        })?;

        let upstream = upstream_outputs(plan, step, store)?;
        let context = assemble(&task.description, &upstream);
        self.event_log.emit(EventKind::ContextAssembled {
            task_id: Arc::clone(task_id),
            total_chars: context.text.chars().count(),
            sources: context.sources,
        });

        let request = InvocationRequest {
            task_id: Arc::clone(task_id),
            agent_id: Arc::clone(agent_id),
            role: agent.role.clone(),
            goal: agent.goal.clone(),
            backstory: agent.backstory.clone(),
            context: context.text,
            expected_output: task.expected_output.clone(),
            model: step.agent.model_override().map(str::to_string),
            capabilities: step.agent.capability_handles().to_vec(),
        };

        debug!(
            task_id = %task_id,
            provider = self.provider.name(),
            capabilities = request.capabilities.len(),
            "Invoking agent"
        );

        let invocation = self.provider.invoke(request);
        let response = match self.options.task_timeout {
            Some(timeout) => tokio::time::timeout(timeout, invocation)
                .await
                .map_err(|_| CrewError::TaskTimeout {
                    task_id: task_id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })?,
            None => invocation.await,
        }
        .map_err(|e| CrewError::Invocation {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            reason: format!("{:#}", e),
        })?;

        Ok(TaskOutput::new(
            Arc::clone(task_id),
            Arc::clone(agent_id),
            response.content,
            response.usage,
            Duration::ZERO,
        ))
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("crew", &self.crew.name())
            .field("provider", &self.provider.name())
            .field("state", &*self.state.read())
            .finish()
    }
}

/// First `max` chars, newlines flattened
fn preview(text: &str, max: usize) -> String {
    let mut out: String = text
        .chars()
        .take(max)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if text.chars().nth(max).is_some() {
        out.push('…');
    }
    out
}
