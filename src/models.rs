//! Core data models for the financial bodyguard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Threat tier shared by detectors and the orchestrator.
///
/// Each detector maps its own risk score into this tier with its own band
/// table; the orchestrator re-bands the aggregated score independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    fn rank(&self) -> u8 {
        match self {
            ThreatLevel::Safe => 0,
            ThreatLevel::Low => 1,
            ThreatLevel::Medium => 2,
            ThreatLevel::High => 3,
            ThreatLevel::Critical => 4,
        }
    }
}

impl PartialOrd for ThreatLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ThreatLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreatLevel::Safe => "SAFE",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Delegated,
}

//
// ================= Context & Task =================
//

/// Shared context for one incoming analysis request.
///
/// The sequential executor is the only writer of `metadata` after creation;
/// it hands prior results to the next agent under the `previous_result` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub age_group: String,
    pub language: String,
    pub risk_tolerance: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    pub fn new(age_group: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: None,
            age_group: age_group.into(),
            language: "en".to_string(),
            risk_tolerance: 0.5,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub task_type: String,
    pub content: String,
    pub context: AgentContext,
    pub priority: i32,
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, content: impl Into<String>, context: AgentContext) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            content: content.into(),
            context,
            priority: 1,
            parent_task_id: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Derive a sub-task for one agent, forming a delegation tree for audit.
    pub fn derive_for(&self, agent_id: &str) -> Self {
        Self {
            task_id: format!("{}_{}", self.task_id, agent_id),
            task_type: self.task_type.clone(),
            content: self.content.clone(),
            context: self.context.clone(),
            priority: self.priority,
            parent_task_id: Some(self.task_id.clone()),
            metadata: self.metadata.clone(),
            created_at: Utc::now(),
        }
    }
}

//
// ================= Task Result =================
//

/// Outcome of one agent invocation. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    pub result: serde_json::Value,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub sub_results: Vec<TaskResult>,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TaskResult {
    /// FAILED placeholder used by the agent boundary and the parallel
    /// executor's deadline policy.
    pub fn failed(task_id: &str, agent_id: &str, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        let reason = reason.into();
        Self {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            status: TaskStatus::Failed,
            result: serde_json::json!({ "error": reason }),
            confidence: 0.0,
            reasoning: reason,
            sub_results: Vec::new(),
            execution_time_ms: elapsed_ms,
            metadata: HashMap::new(),
        }
    }
}

//
// ================= Trajectories =================
//

/// A pre-catalogued fraud pattern template. Static after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudTrajectory {
    pub id: String,
    pub name: String,
    pub red_flags: Vec<String>,
    pub hindi_warning: String,
    pub detection_agent: String,
}

//
// ================= Findings =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternHit {
    pub name: String,
    pub risk: f64,
    pub keyword_hits: usize,
    pub indicator_hits: usize,
    pub hindi: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorHit {
    pub name: String,
    pub risk: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIssue {
    pub issue: String,
    pub matched: String,
    pub severity: String,
}

/// Per-detector result records composed into one tagged union so that
/// heterogeneous findings can travel through a single channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetail {
    Payment {
        patterns_detected: Vec<PatternHit>,
    },
    Credential {
        indicators: Vec<IndicatorHit>,
    },
    Authority {
        authority_claims: Vec<String>,
        threats_made: Vec<String>,
        money_demands: Vec<String>,
        digital_arrest_signs: Vec<String>,
    },
    Document {
        document_type: String,
        issues: Vec<DocumentIssue>,
        interest_rate: Option<f64>,
    },
    Investment {
        scam_indicators: Vec<String>,
        red_flags: Vec<String>,
    },
}

/// One specialist's verdict for one piece of content. Produced fresh per
/// analysis call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistFinding {
    pub agent_id: String,
    pub risk_score: f64,
    pub threat_level: ThreatLevel,
    pub evidence: Vec<String>,
    pub action: String,
    pub hindi: String,
    pub detail: FindingDetail,
    /// Free-text enrichment from the generative collaborator; never affects
    /// the deterministic verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

//
// ================= Aggregated Verdict =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedVerdict {
    pub threat_level: ThreatLevel,
    pub risk_score: f64,
    pub primary_threat: Option<String>,
    pub findings: Vec<SpecialistFinding>,
    pub matched_trajectory: Option<FraudTrajectory>,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub hindi_summary: String,
    pub emergency_action: bool,
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
}

//
// ================= Statistics =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_analyses: u64,
    pub threats_detected: u64,
    pub critical_blocks: u64,
    pub specialists_registered: usize,
    pub trajectories_loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_ordering() {
        assert!(ThreatLevel::Critical > ThreatLevel::High);
        assert!(ThreatLevel::High > ThreatLevel::Medium);
        assert!(ThreatLevel::Medium > ThreatLevel::Low);
        assert!(ThreatLevel::Low > ThreatLevel::Safe);
    }

    #[test]
    fn test_derived_task_forms_tree() {
        let task = Task::new("fraud_detection", "hello", AgentContext::new("45+"));
        let sub = task.derive_for("payment");
        assert_eq!(sub.parent_task_id.as_deref(), Some(task.task_id.as_str()));
        assert_eq!(sub.task_id, format!("{}_payment", task.task_id));
        assert_eq!(sub.content, task.content);
    }

    #[test]
    fn test_failed_result_carries_error_marker() {
        let result = TaskResult::failed("t1", "payment", "boom", 12);
        assert_eq!(result.status, TaskStatus::Failed);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.result.get("error").and_then(|v| v.as_str()), Some("boom"));
    }
}
