//! Agent execution machine
//!
//! Every agent runs the same lifecycle per task:
//! PLAN → EXECUTE (delegate | tools | respond) → VERIFY → COMPLETE
//!
//! Errors never escape the lifecycle: any failure becomes a FAILED
//! `TaskResult` so one broken agent cannot take down an analysis.

use crate::detectors::SpecialistKind;
use crate::error::BodyguardError;
use crate::gemini::{fallback_response, GeminiClient};
use crate::models::{Task, TaskResult, TaskStatus};
use crate::tools::ToolRegistry;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Delegation trees deeper than this are refused.
pub const MAX_DELEGATION_DEPTH: usize = 3;

/// Closed set of agent roles. There is no open subclassing: behavior is
/// selected here and nowhere else.
#[derive(Debug, Clone)]
pub enum AgentBehavior {
    /// Runs one detector's pattern tools over the task content.
    Specialist(SpecialistKind),
    /// Delegates the task to its sub-agents and collects their results.
    Coordinator,
}

/// What the plan phase decided to do with a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Delegate,
    UseTools(Vec<String>),
    Respond,
}

pub struct Agent {
    id: String,
    name: String,
    behavior: AgentBehavior,
    tools: Arc<ToolRegistry>,
    tool_names: Vec<String>,
    sub_agents: Vec<Arc<Agent>>,
    gemini: Option<Arc<GeminiClient>>,
    task_history: RwLock<Vec<TaskResult>>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        behavior: AgentBehavior,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            behavior,
            tools,
            tool_names: Vec::new(),
            sub_agents: Vec::new(),
            gemini: None,
            task_history: RwLock::new(Vec::new()),
        }
    }

    /// Name a tool from the registry that this agent may plan to use.
    pub fn with_tool(mut self, name: impl Into<String>) -> Self {
        self.tool_names.push(name.into());
        self
    }

    pub fn with_sub_agent(mut self, agent: Arc<Agent>) -> Self {
        self.sub_agents.push(agent);
        self
    }

    pub fn with_gemini(mut self, gemini: Arc<GeminiClient>) -> Self {
        self.gemini = Some(gemini);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_agents(&self) -> &[Arc<Agent>] {
        &self.sub_agents
    }

    /// Results of every task this agent has completed, oldest first.
    pub async fn history(&self) -> Vec<TaskResult> {
        self.task_history.read().await.clone()
    }

    /// Decide how to handle the task. Coordinators with sub-agents
    /// delegate; specialists run their tools; anything else responds
    /// directly.
    pub fn plan(&self, _task: &Task) -> PlanAction {
        match &self.behavior {
            AgentBehavior::Coordinator if !self.sub_agents.is_empty() => PlanAction::Delegate,
            AgentBehavior::Coordinator => PlanAction::Respond,
            AgentBehavior::Specialist(_) if !self.tool_names.is_empty() => {
                PlanAction::UseTools(self.tool_names.clone())
            }
            AgentBehavior::Specialist(_) => PlanAction::Respond,
        }
    }

    /// Run the full lifecycle on a task. Never fails: errors become a
    /// FAILED result.
    pub async fn handle_task(&self, task: Task) -> TaskResult {
        self.execute_at_depth(task, 0).await
    }

    fn execute_at_depth<'a>(
        &'a self,
        task: Task,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = TaskResult> + Send + 'a>> {
        Box::pin(async move {
            let started = Instant::now();
            debug!(agent_id = %self.id, task_id = %task.task_id, depth, "Agent starting task");

            let action = self.plan(&task);
            let mut result = match action {
                PlanAction::Delegate => self.run_delegation(&task, depth, started).await,
                PlanAction::UseTools(names) => self.run_tools(&task, &names, started).await,
                PlanAction::Respond => self.run_response(&task, started).await,
            };

            // Delegated results keep the confidence derived from their
            // sub-results; failed ones stay at zero.
            if result.status == TaskStatus::Completed {
                result.confidence = self.assess_confidence(&result.result);
                if !self.verify(&result) {
                    warn!(agent_id = %self.id, task_id = %result.task_id, "Verification failed");
                    result.confidence = 0.0;
                }
            }
            result.execution_time_ms = started.elapsed().as_millis() as u64;

            self.task_history.write().await.push(result.clone());
            result
        })
    }

    async fn run_delegation(&self, task: &Task, depth: usize, started: Instant) -> TaskResult {
        if depth >= MAX_DELEGATION_DEPTH {
            warn!(agent_id = %self.id, depth, "Delegation depth limit reached");
            let err = BodyguardError::DelegationDepth(format!(
                "depth {} exceeds limit {}",
                depth, MAX_DELEGATION_DEPTH
            ));
            return TaskResult::failed(
                &task.task_id,
                &self.id,
                err.to_string(),
                started.elapsed().as_millis() as u64,
            );
        }

        let mut sub_results = Vec::with_capacity(self.sub_agents.len());
        for agent in &self.sub_agents {
            let sub_task = task.derive_for(agent.id());
            sub_results.push(agent.execute_at_depth(sub_task, depth + 1).await);
        }

        let completed = sub_results
            .iter()
            .filter(|r| r.status != TaskStatus::Failed)
            .count();
        let confidence = if sub_results.is_empty() {
            0.0
        } else {
            sub_results.iter().map(|r| r.confidence).sum::<f64>() / sub_results.len() as f64
        };

        info!(
            agent_id = %self.id,
            task_id = %task.task_id,
            delegated = sub_results.len(),
            completed,
            "Delegation finished"
        );

        TaskResult {
            task_id: task.task_id.clone(),
            agent_id: self.id.clone(),
            status: TaskStatus::Delegated,
            result: json!({ "delegated_to": self.sub_agents.iter().map(|a| a.id()).collect::<Vec<_>>() }),
            confidence,
            reasoning: format!("delegated to {} sub-agents, {} completed", sub_results.len(), completed),
            sub_results,
            execution_time_ms: 0,
            metadata: Default::default(),
        }
    }

    /// Run each planned tool. A failing tool contributes an error marker
    /// in its slot; the other tools still run.
    async fn run_tools(&self, task: &Task, names: &[String], _started: Instant) -> TaskResult {
        let mut outputs = serde_json::Map::new();
        for name in names {
            let value = match self.tools.get(name) {
                Some(tool) => match tool.execute(task).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(agent_id = %self.id, tool = %name, error = %e, "Tool failed");
                        json!({ "error": e.to_string() })
                    }
                },
                None => json!({ "error": format!("unknown tool: {}", name) }),
            };
            outputs.insert(name.clone(), value);
        }

        TaskResult {
            task_id: task.task_id.clone(),
            agent_id: self.id.clone(),
            status: TaskStatus::Completed,
            result: Value::Object(outputs),
            confidence: 0.0,
            reasoning: format!("ran {} tools", names.len()),
            sub_results: Vec::new(),
            execution_time_ms: 0,
            metadata: Default::default(),
        }
    }

    async fn run_response(&self, task: &Task, _started: Instant) -> TaskResult {
        let text = match &self.gemini {
            Some(client) => match client
                .generate(
                    &task.content,
                    "You are a fraud-awareness assistant for Indian banking users. Answer briefly.",
                )
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    warn!(agent_id = %self.id, error = %e, "Generation failed - using fallback");
                    fallback_response(&task.content)
                }
            },
            None => fallback_response(&task.content),
        };

        TaskResult {
            task_id: task.task_id.clone(),
            agent_id: self.id.clone(),
            status: TaskStatus::Completed,
            result: json!({ "response": text }),
            confidence: 0.0,
            reasoning: "direct response".to_string(),
            sub_results: Vec::new(),
            execution_time_ms: 0,
            metadata: Default::default(),
        }
    }

    /// A result with an error marker anywhere at its top level earns zero
    /// confidence; anything else gets the baseline.
    fn assess_confidence(&self, result: &Value) -> f64 {
        let has_error = match result {
            Value::Object(map) => {
                map.contains_key("error")
                    || map.values().any(|v| v.get("error").is_some())
            }
            _ => false,
        };
        if has_error {
            0.0
        } else {
            0.8
        }
    }

    fn verify(&self, result: &TaskResult) -> bool {
        !result.result.is_null()
    }
}
