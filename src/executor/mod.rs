//! Multi-agent executor
//!
//! Generic execution layer over registered agents: sequential chains with
//! result handoff, deadline-bounded parallel fan-out, and hierarchical
//! delegation through a root agent. Every completed invocation is recorded
//! in an append-only audit log.

use crate::agent::Agent;
use crate::error::BodyguardError;
use crate::models::{Task, TaskResult, TaskStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// One line of the audit trail. Entries are append-only and ordered by
/// invocation.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub task_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    pub confidence: f64,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    fn from_result(result: &TaskResult) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            task_id: result.task_id.clone(),
            agent_id: result.agent_id.clone(),
            status: result.status,
            confidence: result.confidence,
            execution_time_ms: result.execution_time_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Combined view over a batch of results.
#[derive(Debug, Clone)]
pub struct AggregateSummary {
    pub mean_confidence: f64,
    /// The least-confident result, earliest on ties. This is where human
    /// attention should go first.
    pub primary: Option<TaskResult>,
}

pub struct MultiAgentExecutor {
    agents: HashMap<String, Arc<Agent>>,
    /// Registration order; all dispatch and result ordering follows it.
    order: Vec<String>,
    audit_log: RwLock<Vec<AuditEntry>>,
}

impl MultiAgentExecutor {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
            order: Vec::new(),
            audit_log: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&mut self, agent: Arc<Agent>) {
        let id = agent.id().to_string();
        if self.agents.insert(id.clone(), agent).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents.get(agent_id).cloned()
    }

    pub fn agent_ids(&self) -> &[String] {
        &self.order
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit_log.read().await.clone()
    }

    async fn record(&self, result: &TaskResult) {
        let mut log = self.audit_log.write().await;
        log.push(AuditEntry::from_result(result));
        for sub in &result.sub_results {
            log.push(AuditEntry::from_result(sub));
        }
    }

    fn resolve(&self, agent_ids: &[&str]) -> Result<Vec<Arc<Agent>>> {
        agent_ids
            .iter()
            .map(|id| {
                self.agents
                    .get(*id)
                    .cloned()
                    .ok_or_else(|| BodyguardError::AgentNotFound((*id).to_string()))
            })
            .collect()
    }

    /// Run agents one after another. Each agent's result is handed to the
    /// next under the `previous_result` context key.
    pub async fn execute_sequential(&self, task: &Task, agent_ids: &[&str]) -> Result<Vec<TaskResult>> {
        let agents = self.resolve(agent_ids)?;
        let mut results = Vec::with_capacity(agents.len());

        for agent in agents {
            let mut sub_task = task.derive_for(agent.id());
            if let Some(prev) = results.last() {
                sub_task
                    .context
                    .metadata
                    .insert("previous_result".to_string(), serde_json::to_value::<&TaskResult>(prev)?);
            }
            let result = agent.handle_task(sub_task).await;
            self.record(&result).await;
            results.push(result);
        }

        info!(task_id = %task.task_id, agents = results.len(), "Sequential execution finished");
        Ok(results)
    }

    /// Fan the task out to all agents concurrently under one overall
    /// deadline. Agents that miss the deadline are aborted and replaced by
    /// FAILED placeholders; results keep the given agent order.
    pub async fn execute_parallel(
        &self,
        task: &Task,
        agent_ids: &[&str],
        deadline: Duration,
    ) -> Result<Vec<TaskResult>> {
        let agents = self.resolve(agent_ids)?;
        let deadline_at = Instant::now() + deadline;

        let mut handles = Vec::with_capacity(agents.len());
        for agent in agents {
            let sub_task = task.derive_for(agent.id());
            let agent_id = agent.id().to_string();
            let task_id = sub_task.task_id.clone();
            let handle = tokio::spawn(async move { agent.handle_task(sub_task).await });
            handles.push((agent_id, task_id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (agent_id, task_id, mut handle) in handles {
            let remaining = deadline_at.saturating_duration_since(Instant::now());
            let result = match timeout(remaining, &mut handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => {
                    warn!(agent_id = %agent_id, error = %join_err, "Agent task panicked");
                    TaskResult::failed(&task_id, &agent_id, format!("agent task failed: {}", join_err), 0)
                }
                Err(_) => {
                    warn!(agent_id = %agent_id, "Agent missed deadline - aborting");
                    handle.abort();
                    TaskResult::failed(&task_id, &agent_id, "deadline exceeded", deadline.as_millis() as u64)
                }
            };
            self.record(&result).await;
            results.push(result);
        }

        info!(task_id = %task.task_id, agents = results.len(), "Parallel execution finished");
        Ok(results)
    }

    /// Delegate the whole task to one root agent and let its delegation
    /// tree do the work.
    pub async fn execute_hierarchical(&self, task: &Task, root_id: &str) -> Result<TaskResult> {
        let root = self
            .agents
            .get(root_id)
            .cloned()
            .ok_or_else(|| BodyguardError::AgentNotFound(root_id.to_string()))?;

        let result = root.handle_task(task.clone()).await;
        self.record(&result).await;
        Ok(result)
    }

    /// Summarize a batch of results: mean confidence plus the result most
    /// in need of review.
    pub fn aggregate(results: &[TaskResult]) -> AggregateSummary {
        if results.is_empty() {
            return AggregateSummary {
                mean_confidence: 0.0,
                primary: None,
            };
        }

        let mean_confidence =
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64;

        let mut primary = &results[0];
        for result in &results[1..] {
            if result.confidence < primary.confidence {
                primary = result;
            }
        }

        AggregateSummary {
            mean_confidence,
            primary: Some(primary.clone()),
        }
    }
}

impl Default for MultiAgentExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBehavior;
    use crate::detectors::SpecialistKind;
    use crate::models::AgentContext;
    use crate::tools::{create_default_registry, Tool, ToolRegistry};
    use serde_json::{json, Value};

    /// Reports whether the previous agent's result was handed over.
    struct ContextProbeTool;

    #[async_trait::async_trait]
    impl Tool for ContextProbeTool {
        fn name(&self) -> &'static str {
            "context_probe"
        }
        fn description(&self) -> &'static str {
            "reports handoff visibility"
        }
        async fn execute(&self, task: &Task) -> crate::Result<Value> {
            Ok(json!({
                "saw_previous": task.context.metadata.contains_key("previous_result")
            }))
        }
    }

    struct SleepingTool;

    #[async_trait::async_trait]
    impl Tool for SleepingTool {
        fn name(&self) -> &'static str {
            "sleeping_tool"
        }
        fn description(&self) -> &'static str {
            "never finishes in time"
        }
        async fn execute(&self, _task: &Task) -> crate::Result<Value> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({}))
        }
    }

    fn task(content: &str) -> Task {
        Task::new("fraud_detection", content, AgentContext::new("45+"))
    }

    fn probe_agent(id: &str) -> Arc<Agent> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ContextProbeTool));
        Arc::new(
            Agent::new(
                id,
                "Probe",
                AgentBehavior::Specialist(SpecialistKind::Payment),
                Arc::new(registry),
            )
            .with_tool("context_probe"),
        )
    }

    fn specialist(kind: SpecialistKind) -> Arc<Agent> {
        let tool = format!("{}_pattern_matcher", kind.id());
        Arc::new(
            Agent::new(
                kind.id(),
                kind.name(),
                AgentBehavior::Specialist(kind),
                Arc::new(create_default_registry()),
            )
            .with_tool(tool),
        )
    }

    #[tokio::test]
    async fn test_sequential_hands_over_previous_result() {
        let mut executor = MultiAgentExecutor::new();
        executor.register(probe_agent("first"));
        executor.register(probe_agent("second"));

        let results = executor
            .execute_sequential(&task("hello"), &["first", "second"])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].result["context_probe"]["saw_previous"], json!(false));
        assert_eq!(results[1].result["context_probe"]["saw_previous"], json!(true));
    }

    #[tokio::test]
    async fn test_parallel_preserves_declared_order() {
        let mut executor = MultiAgentExecutor::new();
        for kind in SpecialistKind::ALL {
            executor.register(specialist(kind));
        }

        let results = executor
            .execute_parallel(
                &task("accept the collect request to claim your prize"),
                &["payment", "credential", "authority"],
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["payment", "credential", "authority"]);
    }

    #[tokio::test]
    async fn test_parallel_deadline_yields_failed_placeholder() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SleepingTool));
        let slow = Arc::new(
            Agent::new(
                "slow",
                "Slow",
                AgentBehavior::Specialist(SpecialistKind::Payment),
                Arc::new(registry),
            )
            .with_tool("sleeping_tool"),
        );

        let mut executor = MultiAgentExecutor::new();
        executor.register(slow);
        executor.register(specialist(SpecialistKind::Payment));

        let results = executor
            .execute_parallel(
                &task("accept the collect request to claim your prize"),
                &["slow", "payment"],
                Duration::from_millis(200),
            )
            .await
            .unwrap();

        assert_eq!(results[0].status, TaskStatus::Failed);
        assert_eq!(results[0].confidence, 0.0);
        assert_eq!(results[0].result["error"], json!("deadline exceeded"));
        // The fast agent's result is still returned.
        assert_eq!(results[1].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_an_error() {
        let executor = MultiAgentExecutor::new();
        let err = executor
            .execute_sequential(&task("hello"), &["ghost"])
            .await
            .unwrap_err();
        assert!(matches!(err, BodyguardError::AgentNotFound(_)));
    }

    #[tokio::test]
    async fn test_audit_log_grows_in_invocation_order() {
        let mut executor = MultiAgentExecutor::new();
        executor.register(specialist(SpecialistKind::Payment));
        executor.register(specialist(SpecialistKind::Credential));

        executor
            .execute_sequential(&task("hello"), &["payment", "credential"])
            .await
            .unwrap();

        let log = executor.audit_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].agent_id, "payment");
        assert_eq!(log[1].agent_id, "credential");
    }

    #[test]
    fn test_aggregate_picks_least_confident_earliest() {
        let a = TaskResult::failed("t1", "a", "x", 0);
        let mut b = TaskResult::failed("t2", "b", "y", 0);
        b.confidence = 0.8;
        let c = TaskResult::failed("t3", "c", "z", 0);

        let summary = MultiAgentExecutor::aggregate(&[a, b, c]);
        assert!((summary.mean_confidence - 0.8 / 3.0).abs() < 1e-9);
        // a and c tie at 0.0; the earlier one wins.
        assert_eq!(summary.primary.unwrap().agent_id, "a");
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = MultiAgentExecutor::aggregate(&[]);
        assert_eq!(summary.mean_confidence, 0.0);
        assert!(summary.primary.is_none());
    }
}
