//! Tool trait and registry
//!
//! Tools are deterministic, side-effect-free operations run by agents
//! during the execute phase. A tool failure is isolated to that tool's
//! slot in the result; it never fails the task.

use crate::detectors::{DocumentType, SpecialistKind};
use crate::error::BodyguardError;
use crate::models::Task;
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for a single tool (deterministic execution).
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, task: &Task) -> Result<Value>;
}

/// Tool registry for looking up and executing tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Pattern matcher =================
//

/// Runs one specialist's pattern scoring over the task content. This is
/// the tool form of the detector, so the agent machine and the pure
/// scoring path produce identical findings.
pub struct PatternMatcherTool {
    kind: SpecialistKind,
}

impl PatternMatcherTool {
    pub fn new(kind: SpecialistKind) -> Self {
        Self { kind }
    }
}

#[async_trait::async_trait]
impl Tool for PatternMatcherTool {
    fn name(&self) -> &'static str {
        match self.kind {
            SpecialistKind::Payment => "payment_pattern_matcher",
            SpecialistKind::Credential => "credential_pattern_matcher",
            SpecialistKind::Authority => "authority_pattern_matcher",
            SpecialistKind::Document => "document_pattern_matcher",
            SpecialistKind::Investment => "investment_pattern_matcher",
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            SpecialistKind::Payment => "Detects UPI payment fraud patterns",
            SpecialistKind::Credential => "Detects phishing and credential-theft patterns",
            SpecialistKind::Authority => "Detects authority impersonation and digital arrest",
            SpecialistKind::Document => "Flags predatory terms in financial documents",
            SpecialistKind::Investment => "Detects investment and ponzi scheme fraud",
        }
    }

    async fn execute(&self, task: &Task) -> Result<Value> {
        let amount = task
            .metadata
            .get("amount")
            .and_then(|v| v.as_f64());
        let doc_type = task
            .metadata
            .get("document_type")
            .and_then(|v| v.as_str())
            .map(DocumentType::from_tag)
            .unwrap_or(DocumentType::Loan);

        let finding = self.kind.score(&task.content, amount, doc_type);
        serde_json::to_value(&finding).map_err(BodyguardError::from)
    }
}

//
// ================= Emergency contacts =================
//

/// Looks up the helplines and reporting portals relevant to a fraud
/// category. Static data, never fails.
pub struct EmergencyContactsTool;

#[async_trait::async_trait]
impl Tool for EmergencyContactsTool {
    fn name(&self) -> &'static str {
        "emergency_contacts"
    }

    fn description(&self) -> &'static str {
        "Returns fraud-reporting helplines and portals"
    }

    async fn execute(&self, task: &Task) -> Result<Value> {
        let category = task
            .metadata
            .get("category")
            .and_then(|v| v.as_str())
            .unwrap_or("general");

        let mut contacts = vec![
            json!({ "name": "Cyber Crime Helpline", "number": "1930" }),
            json!({ "name": "National Cyber Crime Portal", "url": "https://cybercrime.gov.in" }),
        ];
        match category {
            "payment" | "credential" => {
                contacts.push(json!({ "name": "RBI Complaints", "url": "https://cms.rbi.org.in" }));
            }
            "investment" => {
                contacts.push(json!({ "name": "SEBI SCORES", "url": "https://scores.sebi.gov.in" }));
            }
            _ => {}
        }
        if task.context.age_group == "60+" {
            contacts.push(json!({ "name": "Elder Line", "number": "14567" }));
        }

        Ok(json!({ "category": category, "contacts": contacts }))
    }
}

/// Default registry: one pattern matcher per specialist plus the contacts
/// lookup.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for kind in SpecialistKind::ALL {
        registry.register(Arc::new(PatternMatcherTool::new(kind)));
    }
    registry.register(Arc::new(EmergencyContactsTool));
    registry
}
