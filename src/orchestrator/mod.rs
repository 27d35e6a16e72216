//! Fraud-bodyguard orchestrator
//!
//! Routes content to the relevant specialists, aggregates their findings
//! under a max-risk rule, matches known fraud trajectories, and renders
//! bilingual recommendations. The deterministic verdict never depends on
//! the generative model.

use crate::agent::{Agent, AgentBehavior};
use crate::detectors::{DocumentType, SpecialistKind};
use crate::error::BodyguardError;
use crate::executor::MultiAgentExecutor;
use crate::gemini::GeminiClient;
use crate::models::{
    AgentContext, AggregatedVerdict, FraudTrajectory, SpecialistFinding, StatsSnapshot, Task,
    TaskStatus, ThreatLevel,
};
use crate::patterns::TrajectoryLibrary;
use crate::tools::create_default_registry;
use crate::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Overall deadline for one parallel analysis pass.
const ANALYSIS_DEADLINE: Duration = Duration::from_secs(10);

/// A trajectory matches when at least this many of its red flags appear.
const TRAJECTORY_MATCH_THRESHOLD: usize = 2;

/// Routing keyword sets, one per specialist, checked in declared
/// specialist order.
fn routing_keywords(kind: SpecialistKind) -> &'static [&'static str] {
    match kind {
        SpecialistKind::Payment => &["upi", "collect", "pay", "gpay", "phonepe", "paytm", "qr", "₹", "rs"],
        SpecialistKind::Credential => &["kyc", "update", "verify", "bank", "apk", "download", "link", "click"],
        SpecialistKind::Authority => &["police", "cbi", "ed", "arrest", "warrant", "customs", "parcel"],
        SpecialistKind::Document => &["loan", "emi", "insurance", "policy", "premium", "interest rate"],
        SpecialistKind::Investment => &["invest", "return", "profit", "trading", "crypto", "forex", "double"],
    }
}

/// When no routing keyword matches, these specialists still run. They
/// cover the highest-volume fraud categories.
const FALLBACK_SPECIALISTS: [SpecialistKind; 3] = [
    SpecialistKind::Payment,
    SpecialistKind::Credential,
    SpecialistKind::Authority,
];

struct Stats {
    total_analyses: AtomicU64,
    threats_detected: AtomicU64,
    critical_blocks: AtomicU64,
}

pub struct Orchestrator {
    executor: MultiAgentExecutor,
    trajectories: TrajectoryLibrary,
    gemini: Option<Arc<GeminiClient>>,
    stats: Stats,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::with_trajectories(TrajectoryLibrary::default())
    }

    pub fn with_trajectories(trajectories: TrajectoryLibrary) -> Self {
        let registry = Arc::new(create_default_registry());

        let mut executor = MultiAgentExecutor::new();
        let mut specialists = Vec::new();
        for kind in SpecialistKind::ALL {
            let agent = Arc::new(
                Agent::new(
                    kind.id(),
                    kind.name(),
                    AgentBehavior::Specialist(kind),
                    registry.clone(),
                )
                .with_tool(format!("{}_pattern_matcher", kind.id())),
            );
            executor.register(agent.clone());
            specialists.push(agent);
        }

        let mut coordinator = Agent::new(
            "coordinator",
            "Fraud Bodyguard Coordinator",
            AgentBehavior::Coordinator,
            registry,
        );
        for agent in specialists {
            coordinator = coordinator.with_sub_agent(agent);
        }
        executor.register(Arc::new(coordinator));

        info!(
            specialists = SpecialistKind::ALL.len(),
            trajectories = trajectories.len(),
            "Orchestrator initialized"
        );

        Self {
            executor,
            trajectories,
            gemini: None,
            stats: Stats {
                total_analyses: AtomicU64::new(0),
                threats_detected: AtomicU64::new(0),
                critical_blocks: AtomicU64::new(0),
            },
        }
    }

    pub fn with_gemini(mut self, gemini: Arc<GeminiClient>) -> Self {
        self.gemini = Some(gemini);
        self
    }

    pub fn trajectories(&self) -> &[FraudTrajectory] {
        self.trajectories.trajectories()
    }

    pub fn executor(&self) -> &MultiAgentExecutor {
        &self.executor
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_analyses: self.stats.total_analyses.load(Ordering::Relaxed),
            threats_detected: self.stats.threats_detected.load(Ordering::Relaxed),
            critical_blocks: self.stats.critical_blocks.load(Ordering::Relaxed),
            specialists_registered: SpecialistKind::ALL.len(),
            trajectories_loaded: self.trajectories.len(),
        }
    }

    /// Pick the specialists whose category keywords appear in the content,
    /// in declared specialist order. Unroutable content falls back to the
    /// payment, credential, and authority specialists.
    pub fn route(&self, content: &str) -> Vec<SpecialistKind> {
        let text = content.to_lowercase();
        let routed: Vec<SpecialistKind> = SpecialistKind::ALL
            .into_iter()
            .filter(|kind| routing_keywords(*kind).iter().any(|kw| text.contains(kw)))
            .collect();

        if routed.is_empty() {
            FALLBACK_SPECIALISTS.to_vec()
        } else {
            routed
        }
    }

    /// Deterministic, synchronous analysis: runs the routed detectors
    /// directly, with no agent machinery and no generative enrichment.
    /// Same content always yields the same verdict.
    pub fn analyze(&self, content: &str, age: Option<u32>) -> AggregatedVerdict {
        let doc_type = infer_document_type(content);
        let findings: Vec<SpecialistFinding> = self
            .route(content)
            .into_iter()
            .map(|kind| kind.score(content, None, doc_type))
            .collect();

        self.aggregate(content, age, findings)
    }

    /// Full analysis through the agent machine: routed specialists run in
    /// parallel under the analysis deadline, and high-risk findings are
    /// enriched with a generated explanation when a client is configured.
    pub async fn analyze_async(&self, content: &str, age: Option<u32>) -> Result<AggregatedVerdict> {
        let routed = self.route(content);
        let ids: Vec<&str> = routed.iter().map(|k| k.id()).collect();

        let context = AgentContext::new(age_group(age));
        let mut task = Task::new("fraud_detection", content, context);
        if infer_document_type(content) == DocumentType::Insurance {
            task.metadata
                .insert("document_type".to_string(), serde_json::json!("insurance"));
        }

        let results = self
            .executor
            .execute_parallel(&task, &ids, ANALYSIS_DEADLINE)
            .await?;

        let mut findings = Vec::with_capacity(results.len());
        for (kind, result) in routed.iter().zip(results) {
            if result.status == TaskStatus::Failed {
                warn!(agent_id = %result.agent_id, reason = %result.reasoning, "Specialist unavailable for this analysis");
                continue;
            }
            let tool_name = format!("{}_pattern_matcher", kind.id());
            match result
                .result
                .get(&tool_name)
                .cloned()
                .map(serde_json::from_value::<SpecialistFinding>)
            {
                Some(Ok(finding)) => findings.push(finding),
                Some(Err(e)) => warn!(agent_id = %result.agent_id, error = %e, "Malformed finding"),
                None => warn!(agent_id = %result.agent_id, "Specialist produced no finding"),
            }
        }

        if let Some(gemini) = &self.gemini {
            for finding in findings.iter_mut().filter(|f| f.risk_score > 0.5) {
                let prompt = format!(
                    "Explain in 2-3 sentences why this message is risky: \"{}\". Evidence: {}",
                    content,
                    finding.evidence.join(", ")
                );
                match gemini
                    .generate(&prompt, "You are a fraud-awareness assistant for Indian banking users.")
                    .await
                {
                    Ok(text) => finding.ai_analysis = Some(text),
                    Err(e) => {
                        warn!(error = %e, "Enrichment failed");
                        finding.ai_analysis = Some(crate::gemini::fallback_response(content));
                    }
                }
            }
        }

        Ok(self.aggregate(content, age, findings))
    }

    /// Run exactly one specialist by id, bypassing routing.
    pub fn analyze_with(&self, specialist_id: &str, content: &str) -> Result<SpecialistFinding> {
        let kind = SpecialistKind::from_id(specialist_id)
            .ok_or_else(|| BodyguardError::AgentNotFound(specialist_id.to_string()))?;
        Ok(kind.score(content, None, infer_document_type(content)))
    }

    fn aggregate(
        &self,
        content: &str,
        age: Option<u32>,
        findings: Vec<SpecialistFinding>,
    ) -> AggregatedVerdict {
        let risk_score = findings.iter().map(|f| f.risk_score).fold(0.0, f64::max);
        let threat_level = overall_band(risk_score);

        // First finding attaining the maximum, in invocation order.
        let primary_threat = findings
            .iter()
            .find(|f| f.risk_score >= risk_score)
            .map(|f| f.agent_id.clone());

        let matched_trajectory = self.match_trajectory(content).cloned();

        let recommendations = recommendations(threat_level, age);
        let (summary, hindi_summary) = summaries(threat_level, matched_trajectory.as_ref());

        self.stats.total_analyses.fetch_add(1, Ordering::Relaxed);
        if threat_level >= ThreatLevel::High {
            self.stats.threats_detected.fetch_add(1, Ordering::Relaxed);
        }
        if threat_level == ThreatLevel::Critical {
            self.stats.critical_blocks.fetch_add(1, Ordering::Relaxed);
        }

        info!(
            threat_level = %threat_level,
            risk_score,
            primary = primary_threat.as_deref().unwrap_or("none"),
            "Analysis complete"
        );

        AggregatedVerdict {
            threat_level,
            risk_score,
            primary_threat,
            findings,
            matched_trajectory,
            recommendations,
            summary,
            hindi_summary,
            emergency_action: threat_level == ThreatLevel::Critical,
            content_hash: content_hash(content),
            timestamp: Utc::now(),
        }
    }

    /// Match content against the trajectory library. The trajectory with
    /// the most red-flag hits wins (earliest in library order on ties),
    /// and only counts at or above the match threshold are accepted.
    pub fn match_trajectory(&self, content: &str) -> Option<&FraudTrajectory> {
        let text = content.to_lowercase();

        let mut best: Option<(&FraudTrajectory, usize)> = None;
        for trajectory in self.trajectories.trajectories() {
            let hits = trajectory
                .red_flags
                .iter()
                .filter(|flag| text.contains(flag.to_lowercase().as_str()))
                .count();
            if best.map_or(true, |(_, best_hits)| hits > best_hits) {
                best = Some((trajectory, hits));
            }
        }

        best.filter(|(_, hits)| *hits >= TRAJECTORY_MATCH_THRESHOLD)
            .map(|(trajectory, _)| trajectory)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

//
// ================= Aggregation helpers =================
//

/// Aggregate band table. Distinct from the detector-local bands.
fn overall_band(risk: f64) -> ThreatLevel {
    if risk >= 0.9 {
        ThreatLevel::Critical
    } else if risk >= 0.7 {
        ThreatLevel::High
    } else if risk >= 0.4 {
        ThreatLevel::Medium
    } else if risk > 0.1 {
        ThreatLevel::Low
    } else {
        ThreatLevel::Safe
    }
}

/// Insurance wording switches the document analyst to its insurance
/// red-flag groups; everything else is read as a loan document.
fn infer_document_type(content: &str) -> DocumentType {
    let text = content.to_lowercase();
    if text.contains("insurance") || text.contains("policy") || text.contains("premium") {
        DocumentType::Insurance
    } else {
        DocumentType::Loan
    }
}

fn age_group(age: Option<u32>) -> &'static str {
    match age {
        Some(a) if a >= 60 => "60+",
        Some(a) if a >= 45 => "45+",
        Some(_) => "adult",
        None => "unknown",
    }
}

fn recommendations(level: ThreatLevel, age: Option<u32>) -> Vec<String> {
    let mut recs: Vec<String> = match level {
        ThreatLevel::Critical => vec![
            "DO NOT proceed with this transaction or request".to_string(),
            "Do not share OTP, PIN, or any banking details".to_string(),
            "Block and report the sender immediately".to_string(),
            "Report to cyber crime helpline 1930 or cybercrime.gov.in".to_string(),
            "Inform a trusted family member about this attempt".to_string(),
        ],
        ThreatLevel::High => vec![
            "Do not act on this message until independently verified".to_string(),
            "Contact your bank only through its official app or branch".to_string(),
            "Do not click links or download attachments".to_string(),
        ],
        ThreatLevel::Medium => vec![
            "Proceed with caution and verify the sender's identity".to_string(),
            "Double-check all details through official channels".to_string(),
        ],
        ThreatLevel::Low | ThreatLevel::Safe => {
            vec!["No strong fraud signals found, but stay alert".to_string()]
        }
    };

    if level == ThreatLevel::Critical && matches!(age, Some(a) if a >= 60) {
        recs.insert(
            0,
            "Please consult a family member before taking any action on this message".to_string(),
        );
    }

    recs
}

fn summaries(level: ThreatLevel, trajectory: Option<&FraudTrajectory>) -> (String, String) {
    let (mut en, mut hi) = match level {
        ThreatLevel::Critical => (
            "CRITICAL THREAT: This is almost certainly a scam. Do not proceed.".to_string(),
            "गंभीर खतरा: यह लगभग निश्चित रूप से धोखाधड़ी है। आगे न बढ़ें।".to_string(),
        ),
        ThreatLevel::High => (
            "HIGH RISK: Strong fraud indicators found. Do not act without verification.".to_string(),
            "उच्च जोखिम: धोखाधड़ी के स्पष्ट संकेत मिले हैं। बिना जांच कुछ न करें।".to_string(),
        ),
        ThreatLevel::Medium => (
            "CAUTION: Some suspicious elements detected. Verify before proceeding.".to_string(),
            "सावधान: कुछ संदिग्ध तत्व मिले हैं। आगे बढ़ने से पहले जांच करें।".to_string(),
        ),
        ThreatLevel::Low => (
            "LOW RISK: Minor signals only. Stay alert.".to_string(),
            "कम जोखिम: मामूली संकेत। सतर्क रहें।".to_string(),
        ),
        ThreatLevel::Safe => (
            "SAFE: No fraud indicators detected.".to_string(),
            "सुरक्षित: धोखाधड़ी का कोई संकेत नहीं मिला।".to_string(),
        ),
    };

    if let Some(trajectory) = trajectory {
        en.push_str(&format!(" Matches known fraud pattern: {}.", trajectory.name));
        hi.push(' ');
        hi.push_str(&trajectory.hindi_warning);
    }

    (en, hi)
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECT_SCAM: &str = "Congratulations! You have won Rs 50,000. Just accept the UPI collect request to receive your prize. Hurry!";
    const DIGITAL_ARREST: &str = "This is CBI calling. A warrant is issued for your arrest. Stay on this video call, do not disconnect, and pay the fine of Rs 1,50,000 now.";
    const LOAN_TERMS: &str = "Loan offer: floating interest at 18% p.a., foreclosure charge of 4%, processing fee of Rs 5,999 on your emi plan.";

    #[test]
    fn test_collect_scam_is_critical() {
        let orch = Orchestrator::new();
        let verdict = orch.analyze(COLLECT_SCAM, Some(65));
        assert_eq!(verdict.threat_level, ThreatLevel::Critical);
        assert!(verdict.risk_score >= 0.9);
        assert_eq!(verdict.primary_threat.as_deref(), Some("payment"));
        assert!(verdict.emergency_action);
        // Elder guidance leads the recommendation list.
        assert!(verdict.recommendations[0].contains("family member"));
        assert!(verdict.recommendations.len() >= 6);
    }

    #[test]
    fn test_under_sixty_gets_no_elder_guidance() {
        let orch = Orchestrator::new();
        let verdict = orch.analyze(COLLECT_SCAM, Some(55));
        assert_eq!(verdict.threat_level, ThreatLevel::Critical);
        assert!(verdict.recommendations.len() >= 5);
        assert!(!verdict.recommendations[0].contains("family member"));
    }

    #[test]
    fn test_digital_arrest_matches_trajectory() {
        let orch = Orchestrator::new();
        let verdict = orch.analyze(DIGITAL_ARREST, Some(68));
        assert!(verdict.risk_score >= 0.8);
        assert_eq!(verdict.threat_level, ThreatLevel::Critical);
        // Elder guidance leads for a 68-year-old on a critical verdict.
        assert!(verdict.recommendations[0].contains("family member"));
        let trajectory = verdict.matched_trajectory.expect("trajectory should match");
        assert_eq!(trajectory.id, "traj_digital_arrest");
        assert!(verdict.hindi_summary.contains(&trajectory.hindi_warning));
        assert!(verdict.summary.contains(&trajectory.name));
    }

    #[test]
    fn test_loan_document_flags_high() {
        let orch = Orchestrator::new();
        let verdict = orch.analyze(LOAN_TERMS, None);
        let doc = verdict
            .findings
            .iter()
            .find(|f| f.agent_id == "document")
            .expect("document specialist should run");
        assert!(doc.risk_score >= 0.6, "risk was {}", doc.risk_score);
    }

    #[test]
    fn test_single_red_flag_does_not_match_trajectory() {
        let orch = Orchestrator::new();
        // Exactly one flag of traj_parcel_customs.
        assert!(orch.match_trajectory("your parcel has arrived").is_none());
    }

    #[test]
    fn test_routing_falls_back_for_plain_text() {
        let orch = Orchestrator::new();
        let routed = orch.route("hello how are you today");
        assert_eq!(
            routed,
            vec![SpecialistKind::Payment, SpecialistKind::Credential, SpecialistKind::Authority]
        );
    }

    #[test]
    fn test_routing_preserves_declared_order() {
        let orch = Orchestrator::new();
        let routed = orch.route("invest in crypto, pay via upi after kyc update");
        assert_eq!(
            routed,
            vec![SpecialistKind::Payment, SpecialistKind::Credential, SpecialistKind::Investment]
        );
    }

    #[test]
    fn test_tie_break_prefers_invocation_order() {
        let orch = Orchestrator::new();
        // collect_scam with a saturated multiplier and the credential
        // forcing floor both land on exactly 0.95; payment is declared
        // first.
        let verdict = orch.analyze(
            "Accept the collect request, you won. Click the link and give your cvv",
            None,
        );
        assert_eq!(verdict.risk_score, 0.95);
        assert!(verdict.findings.iter().all(|f| f.risk_score == verdict.risk_score));
        assert_eq!(verdict.primary_threat.as_deref(), Some("payment"));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let orch = Orchestrator::new();
        let a = orch.analyze(COLLECT_SCAM, Some(30));
        let b = orch.analyze(COLLECT_SCAM, Some(30));
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.threat_level, b.threat_level);
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.recommendations, b.recommendations);
    }

    #[test]
    fn test_overall_bands() {
        assert_eq!(overall_band(0.95), ThreatLevel::Critical);
        assert_eq!(overall_band(0.75), ThreatLevel::High);
        assert_eq!(overall_band(0.65), ThreatLevel::Medium);
        assert_eq!(overall_band(0.2), ThreatLevel::Low);
        assert_eq!(overall_band(0.05), ThreatLevel::Safe);
        assert_eq!(overall_band(0.0), ThreatLevel::Safe);
    }

    #[test]
    fn test_stats_counters() {
        let orch = Orchestrator::new();
        orch.analyze(COLLECT_SCAM, None);
        orch.analyze("hello there", None);
        let stats = orch.stats();
        assert_eq!(stats.total_analyses, 2);
        assert_eq!(stats.threats_detected, 1);
        assert_eq!(stats.critical_blocks, 1);
        assert_eq!(stats.specialists_registered, 5);
        assert!(stats.trajectories_loaded > 0);
    }

    #[test]
    fn test_analyze_with_unknown_specialist() {
        let orch = Orchestrator::new();
        let err = orch.analyze_with("ghost", "hello").unwrap_err();
        assert!(matches!(err, BodyguardError::AgentNotFound(_)));
    }

    #[test]
    fn test_analyze_with_direct_specialist() {
        let orch = Orchestrator::new();
        let finding = orch.analyze_with("investment", "earn 5% daily profit, guaranteed returns").unwrap();
        assert_eq!(finding.agent_id, "investment");
        assert!(finding.risk_score >= 0.95);
    }

    #[tokio::test]
    async fn test_async_analysis_agrees_with_sync() {
        let orch = Orchestrator::new();
        let sync_verdict = orch.analyze(COLLECT_SCAM, Some(65));
        let async_verdict = orch.analyze_async(COLLECT_SCAM, Some(65)).await.unwrap();
        assert_eq!(async_verdict.threat_level, sync_verdict.threat_level);
        assert_eq!(async_verdict.risk_score, sync_verdict.risk_score);
        assert_eq!(async_verdict.primary_threat, sync_verdict.primary_threat);
        assert_eq!(async_verdict.content_hash, sync_verdict.content_hash);
    }

    #[tokio::test]
    async fn test_hierarchical_run_through_coordinator() {
        let orch = Orchestrator::new();
        let task = Task::new("fraud_detection", COLLECT_SCAM, AgentContext::new("45+"));
        let result = orch
            .executor()
            .execute_hierarchical(&task, "coordinator")
            .await
            .unwrap();

        assert_eq!(result.status, TaskStatus::Delegated);
        assert_eq!(result.sub_results.len(), 5);
        let sub_ids: Vec<&str> = result.sub_results.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(sub_ids, vec!["payment", "credential", "authority", "document", "investment"]);

        // Root entry first, then one per specialist.
        let log = orch.executor().audit_log().await;
        assert_eq!(log.len(), 6);
        assert_eq!(log[0].agent_id, "coordinator");
    }

    #[tokio::test]
    async fn test_async_analysis_records_audit() {
        let orch = Orchestrator::new();
        orch.analyze_async(DIGITAL_ARREST, None).await.unwrap();
        let log = orch.executor().audit_log().await;
        assert!(!log.is_empty());
        assert!(log.iter().any(|e| e.agent_id == "authority"));
    }
}
