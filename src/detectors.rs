//! Specialist fraud detectors
//!
//! Five pure, stateless scoring functions selected through a closed
//! `SpecialistKind` enum. Detectors never fail: malformed or empty input
//! yields risk 0 / SAFE.

use crate::models::{
    DocumentIssue, FindingDetail, IndicatorHit, PatternHit, SpecialistFinding, ThreatLevel,
};
use crate::patterns::{
    AUTHORITY_KEYWORDS, CREDENTIAL_FORCING_RE, CREDENTIAL_PATTERNS, DIGITAL_ARREST_SIGNS,
    HIGH_RATE_THRESHOLD, INSURANCE_RED_FLAGS, INVESTMENT_RED_FLAGS, LOAN_RED_FLAGS, MONEY_DEMANDS,
    ODD_AMOUNTS, PAYMENT_PATTERNS, PERIODIC_RETURN_RE, RATE_RE, SCAM_INDICATORS,
    THREAT_INDICATORS, URGENCY_WORDS,
};
use std::collections::HashMap;

/// Document flavours understood by the document analyst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Loan,
    Insurance,
}

impl DocumentType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "insurance" => DocumentType::Insurance,
            _ => DocumentType::Loan,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            DocumentType::Loan => "loan",
            DocumentType::Insurance => "insurance",
        }
    }
}

/// Closed set of fraud specialists. Each variant carries its own pattern
/// table and scoring function, dispatched through `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialistKind {
    Payment,
    Credential,
    Authority,
    Document,
    Investment,
}

impl SpecialistKind {
    /// Declared invocation order. Routing, dispatch, and the aggregation
    /// tie-break all follow this order.
    pub const ALL: [SpecialistKind; 5] = [
        SpecialistKind::Payment,
        SpecialistKind::Credential,
        SpecialistKind::Authority,
        SpecialistKind::Document,
        SpecialistKind::Investment,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SpecialistKind::Payment => "payment",
            SpecialistKind::Credential => "credential",
            SpecialistKind::Authority => "authority",
            SpecialistKind::Document => "document",
            SpecialistKind::Investment => "investment",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpecialistKind::Payment => "UPI Fraud Specialist",
            SpecialistKind::Credential => "Phishing Specialist",
            SpecialistKind::Authority => "Impersonation Specialist",
            SpecialistKind::Document => "Document Analyst",
            SpecialistKind::Investment => "Investment Fraud Specialist",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    /// Score content for this specialist's fraud category.
    ///
    /// `amount` is an optional transaction amount in rupees, only used by
    /// the payment detector. `doc_type` only affects the document analyst.
    pub fn score(&self, content: &str, amount: Option<f64>, doc_type: DocumentType) -> SpecialistFinding {
        match self {
            SpecialistKind::Payment => score_payment(content, amount),
            SpecialistKind::Credential => score_credential(content),
            SpecialistKind::Authority => score_authority(content),
            SpecialistKind::Document => score_document(content, doc_type),
            SpecialistKind::Investment => score_investment(content),
        }
    }
}

fn clamp(risk: f64) -> f64 {
    risk.clamp(0.0, 1.0)
}

/// Default detector-local band table. Distinct from the orchestrator's
/// aggregate bands.
fn band(risk: f64) -> ThreatLevel {
    if risk >= 0.9 {
        ThreatLevel::Critical
    } else if risk >= 0.7 {
        ThreatLevel::High
    } else if risk >= 0.4 {
        ThreatLevel::Medium
    } else if risk > 0.0 {
        ThreatLevel::Low
    } else {
        ThreatLevel::Safe
    }
}

/// Coarser band used by the additive detectors (authority, investment).
fn coarse_band(risk: f64) -> ThreatLevel {
    if risk >= 0.8 {
        ThreatLevel::Critical
    } else if risk >= 0.5 {
        ThreatLevel::High
    } else if risk > 0.0 {
        ThreatLevel::Low
    } else {
        ThreatLevel::Safe
    }
}

//
// ================= Payment / UPI =================
//

fn score_payment(content: &str, amount: Option<f64>) -> SpecialistFinding {
    let text = content.to_lowercase();

    let mut hits = Vec::new();
    let mut risk: f64 = 0.0;
    let mut evidence = Vec::new();

    for pattern in PAYMENT_PATTERNS {
        let keyword_hits = pattern.keywords.iter().filter(|kw| text.contains(**kw)).count();
        let indicator_hits = pattern.indicators.iter().filter(|ind| text.contains(**ind)).count();

        // Two-tier threshold: one keyword AND one indicator required.
        if keyword_hits > 0 && indicator_hits > 0 {
            let pattern_risk = pattern.risk
                * (0.5 + 0.25 * keyword_hits as f64 + 0.25 * indicator_hits as f64).min(1.0);
            let pattern_risk = pattern_risk.min(1.0);

            // Max across patterns, never summed.
            risk = risk.max(pattern_risk);

            for kw in pattern.keywords.iter().filter(|kw| text.contains(**kw)) {
                evidence.push((*kw).to_string());
            }
            for ind in pattern.indicators.iter().filter(|ind| text.contains(**ind)) {
                evidence.push((*ind).to_string());
            }

            hits.push(PatternHit {
                name: pattern.name.to_string(),
                risk: pattern_risk,
                keyword_hits,
                indicator_hits,
                hindi: pattern.hindi.to_string(),
            });
        }
    }

    // Urgency amplifier: +0.05 per matched urgency word.
    let urgency_hits = URGENCY_WORDS.iter().filter(|w| text.contains(**w)).count();
    if urgency_hits > 0 {
        risk = clamp(risk + 0.05 * urgency_hits as f64);
        evidence.push("urgency_pressure".to_string());
    }

    // Scripted scams favour specific round amounts.
    if let Some(amount) = amount {
        if ODD_AMOUNTS.contains(&amount) {
            risk = clamp(risk + 0.15);
            evidence.push(format!("suspicious amount: ₹{}", amount));
        }
    }

    evidence.sort();
    evidence.dedup();

    let level = band(risk);
    let (action, hindi) = match level {
        ThreatLevel::Critical => ("DO NOT proceed. This is a scam!", "धोखाधड़ी! आगे न बढ़ें!"),
        ThreatLevel::High => ("High risk of fraud. Do not accept or pay.", "उच्च जोखिम! स्वीकार न करें!"),
        ThreatLevel::Medium => ("Exercise caution. Verify before proceeding.", "सावधान! पहले जाँच करें।"),
        _ => ("Appears safe, but stay vigilant.", "सुरक्षित लगता है।"),
    };

    SpecialistFinding {
        agent_id: SpecialistKind::Payment.id().to_string(),
        risk_score: risk,
        threat_level: level,
        evidence,
        action: action.to_string(),
        hindi: hindi.to_string(),
        detail: FindingDetail::Payment { patterns_detected: hits },
        ai_analysis: None,
        extra: HashMap::new(),
    }
}

//
// ================= Credential phishing =================
//

fn score_credential(content: &str) -> SpecialistFinding {
    let text = content.to_lowercase();

    let mut indicators = Vec::new();
    let mut risk: f64 = 0.0;
    let mut evidence = Vec::new();

    for pattern in CREDENTIAL_PATTERNS.iter() {
        // Single-tier threshold: one regex hit fires the pattern.
        if pattern.patterns.iter().any(|re| re.is_match(&text)) {
            risk = risk.max(pattern.risk);
            evidence.push(pattern.message.to_string());
            indicators.push(IndicatorHit {
                name: pattern.name.to_string(),
                risk: pattern.risk,
                message: pattern.message.to_string(),
            });
        }
    }

    // Credential-request mention forces risk to at least 0.95.
    if CREDENTIAL_FORCING_RE.is_match(&text) {
        if risk < 0.95 {
            risk = 0.95;
            evidence.push("request for sensitive credentials".to_string());
        }
    }

    // KYC urgency with no stronger match is still phishing.
    if text.contains("kyc") && (text.contains("update") || text.contains("verify")) && risk < 0.85 {
        risk = 0.85;
        evidence.push("KYC update request - likely phishing".to_string());
        indicators.push(IndicatorHit {
            name: "kyc_urgency".to_string(),
            risk: 0.85,
            message: "KYC update request - likely phishing".to_string(),
        });
    }

    let level = band(risk);
    let (action, hindi) = match level {
        ThreatLevel::Critical => (
            "This is phishing. Do not click anything or install any app.",
            "गंभीर खतरा! यह फ़िशिंग है! कुछ भी क्लिक न करें!",
        ),
        ThreatLevel::High => ("Do not click any links. Verify with your bank directly.", "उच्च जोखिम! लिंक पर क्लिक न करें!"),
        ThreatLevel::Medium => ("Some suspicious elements found. Verify with your bank.", "सावधान! सीधे बैंक से संपर्क करें।"),
        _ => ("No phishing indicators detected.", "सुरक्षित लगता है।"),
    };

    SpecialistFinding {
        agent_id: SpecialistKind::Credential.id().to_string(),
        risk_score: risk,
        threat_level: level,
        evidence,
        action: action.to_string(),
        hindi: hindi.to_string(),
        detail: FindingDetail::Credential { indicators },
        ai_analysis: None,
        extra: HashMap::new(),
    }
}

//
// ================= Authority impersonation =================
//

fn score_authority(content: &str) -> SpecialistFinding {
    let text = content.to_lowercase();

    let authority_claims: Vec<String> = AUTHORITY_KEYWORDS
        .iter()
        .filter(|kw| text.contains(**kw))
        .map(|kw| kw.to_string())
        .collect();
    let threats_made: Vec<String> = THREAT_INDICATORS
        .iter()
        .filter(|t| text.contains(**t))
        .map(|t| t.to_string())
        .collect();
    let money_demands: Vec<String> = MONEY_DEMANDS
        .iter()
        .filter(|m| text.contains(**m))
        .map(|m| m.to_string())
        .collect();
    let digital_arrest_signs: Vec<String> = DIGITAL_ARREST_SIGNS
        .iter()
        .filter(|d| text.contains(**d))
        .map(|d| d.to_string())
        .collect();

    let mut risk: f64 = 0.0;
    if !authority_claims.is_empty() {
        risk += 0.3 * (authority_claims.len().min(3)) as f64;
    }
    if !threats_made.is_empty() {
        risk += 0.25 * (threats_made.len().min(3)) as f64;
    }
    if !money_demands.is_empty() {
        risk += 0.35;
    }
    if !digital_arrest_signs.is_empty() {
        risk += 0.25;
    }
    let risk = clamp(risk);

    let mut evidence = Vec::new();
    evidence.extend(authority_claims.iter().cloned());
    evidence.extend(threats_made.iter().cloned());
    evidence.extend(money_demands.iter().cloned());
    evidence.extend(digital_arrest_signs.iter().cloned());

    let level = coarse_band(risk);
    let (action, hindi) = match level {
        ThreatLevel::Critical => (
            "HANG UP IMMEDIATELY! This is impersonation fraud. Call 1930.",
            "🚨 तुरंत फोन काटें! यह नकली पुलिस है! असली पुलिस फोन पर पैसे नहीं मांगती! हेल्पलाइन: 1930",
        ),
        ThreatLevel::High => (
            "Likely impersonation. Do not share any info or money.",
            "संभावित धोखाधड़ी। कोई जानकारी या पैसे न दें।",
        ),
        _ => ("Low risk detected.", "कम जोखिम।"),
    };

    let mut extra = HashMap::new();
    if level >= ThreatLevel::High {
        extra.insert("emergency_number".to_string(), "1930".to_string());
    }

    SpecialistFinding {
        agent_id: SpecialistKind::Authority.id().to_string(),
        risk_score: risk,
        threat_level: level,
        evidence,
        action: action.to_string(),
        hindi: hindi.to_string(),
        detail: FindingDetail::Authority {
            authority_claims,
            threats_made,
            money_demands,
            digital_arrest_signs,
        },
        ai_analysis: None,
        extra,
    }
}

//
// ================= Document analysis =================
//

fn score_document(content: &str, doc_type: DocumentType) -> SpecialistFinding {
    let text = content.to_lowercase();

    let groups = match doc_type {
        DocumentType::Loan => LOAN_RED_FLAGS,
        DocumentType::Insurance => INSURANCE_RED_FLAGS,
    };

    let mut issues = Vec::new();
    for group in groups {
        // At most one issue per group: first keyword hit wins.
        if let Some(kw) = group.keywords.iter().find(|kw| text.contains(**kw)) {
            issues.push(DocumentIssue {
                issue: group.name.to_string(),
                matched: (*kw).to_string(),
                severity: group.severity.to_string(),
            });
        }
    }

    let interest_rate = RATE_RE
        .captures(&text)
        .and_then(|caps| caps[1].parse::<f64>().ok());

    if let Some(rate) = interest_rate {
        if rate > HIGH_RATE_THRESHOLD {
            issues.push(DocumentIssue {
                issue: "high interest rate".to_string(),
                matched: format!("{}%", rate),
                severity: "HIGH".to_string(),
            });
        }
    }

    let risk = (issues.len() as f64 * 0.2).min(1.0);
    let evidence: Vec<String> = issues.iter().map(|i| i.matched.clone()).collect();

    // 3-tier band: this detector never reports SAFE/CRITICAL on its own.
    let level = if issues.len() >= 3 {
        ThreatLevel::High
    } else if !issues.is_empty() {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    };

    let (action, hindi) = if issues.is_empty() {
        ("Document appears standard.".to_string(), "दस्तावेज़ सामान्य है।".to_string())
    } else {
        (
            "Review highlighted terms carefully before signing.".to_string(),
            format!("{} समस्याएं मिलीं। हस्ताक्षर से पहले जांचें।", issues.len()),
        )
    };

    SpecialistFinding {
        agent_id: SpecialistKind::Document.id().to_string(),
        risk_score: risk,
        threat_level: level,
        evidence,
        action,
        hindi,
        detail: FindingDetail::Document {
            document_type: doc_type.tag().to_string(),
            issues,
            interest_rate,
        },
        ai_analysis: None,
        extra: HashMap::new(),
    }
}

//
// ================= Investment fraud =================
//

fn score_investment(content: &str) -> SpecialistFinding {
    let text = content.to_lowercase();

    let scam_hits: Vec<String> = SCAM_INDICATORS
        .iter()
        .filter(|s| text.contains(**s))
        .map(|s| s.to_string())
        .collect();
    let red_flag_hits: Vec<String> = INVESTMENT_RED_FLAGS
        .iter()
        .filter(|r| text.contains(**r))
        .map(|r| r.to_string())
        .collect();

    let mut risk: f64 = 0.0;
    if !scam_hits.is_empty() {
        risk += 0.4 * (scam_hits.len().min(3)) as f64;
    }
    if !red_flag_hits.is_empty() {
        risk += 0.3 * (red_flag_hits.len().min(3)) as f64;
    }

    let mut evidence: Vec<String> = scam_hits.iter().chain(red_flag_hits.iter()).cloned().collect();

    // Any periodic percentage-return claim is itself near-certain fraud.
    if PERIODIC_RETURN_RE.is_match(&text) {
        risk = risk.max(0.95);
        evidence.push("periodic percentage return claim".to_string());
    }

    let risk = clamp(risk);
    let level = coarse_band(risk);
    let (action, hindi) = match level {
        ThreatLevel::Critical => (
            "This is investment fraud. Do NOT invest!",
            "🚨 यह निवेश धोखाधड़ी है! पैसे न लगाएं!",
        ),
        ThreatLevel::High => (
            "High risk of fraud. Verify SEBI registration before investing.",
            "संभावित धोखाधड़ी। SEBI पंजीकरण जांचें।",
        ),
        _ => ("Low risk. Still verify with SEBI before investing.", "सामान्य जोखिम।"),
    };

    SpecialistFinding {
        agent_id: SpecialistKind::Investment.id().to_string(),
        risk_score: risk,
        threat_level: level,
        evidence,
        action: action.to_string(),
        hindi: hindi.to_string(),
        detail: FindingDetail::Investment {
            scam_indicators: scam_hits,
            red_flags: red_flag_hits,
        },
        ai_analysis: None,
        extra: HashMap::new(),
    }
}

//
// ================= Tests =================
//

#[cfg(test)]
mod tests {
    use super::*;

    fn score(kind: SpecialistKind, content: &str) -> SpecialistFinding {
        kind.score(content, None, DocumentType::Loan)
    }

    #[test]
    fn test_all_detectors_bounded_on_noise() {
        let inputs = ["", "   ", "hello there", "123 %%% ###", "नमस्ते"];
        for kind in SpecialistKind::ALL {
            for input in inputs {
                let finding = score(kind, input);
                assert!(
                    (0.0..=1.0).contains(&finding.risk_score),
                    "{} out of bounds on {:?}",
                    kind.id(),
                    input
                );
            }
        }
    }

    #[test]
    fn test_empty_input_is_safe_for_pattern_detectors() {
        for kind in [SpecialistKind::Payment, SpecialistKind::Credential] {
            let finding = score(kind, "");
            assert_eq!(finding.risk_score, 0.0);
            assert_eq!(finding.threat_level, ThreatLevel::Safe);
        }
    }

    #[test]
    fn test_collect_scam_fires_critical() {
        let content = "Congratulations! You have won Rs 50,000. Just accept the UPI collect request to receive your prize. Hurry!";
        let finding = score(SpecialistKind::Payment, content);
        assert!(finding.risk_score >= 0.9, "risk was {}", finding.risk_score);
        assert_eq!(finding.threat_level, ThreatLevel::Critical);
        match &finding.detail {
            FindingDetail::Payment { patterns_detected } => {
                assert!(patterns_detected.iter().any(|h| h.name == "collect_scam"));
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_keyword_without_indicator_does_not_fire() {
        // "collect" alone fails the two-tier threshold.
        let finding = score(SpecialistKind::Payment, "please collect your parcel from the office");
        match &finding.detail {
            FindingDetail::Payment { patterns_detected } => assert!(patterns_detected.is_empty()),
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_suspicious_amount_amplifier() {
        let content = "accept the collect request to get your cashback reward";
        let base = SpecialistKind::Payment.score(content, None, DocumentType::Loan);
        let bumped = SpecialistKind::Payment.score(content, Some(50_000.0), DocumentType::Loan);
        assert!(bumped.risk_score >= base.risk_score);
        assert!(bumped.risk_score <= 1.0);
    }

    #[test]
    fn test_otp_request_forces_high_risk() {
        let finding = score(SpecialistKind::Credential, "please share the otp to continue");
        assert!(finding.risk_score >= 0.95);
        assert_eq!(finding.threat_level, ThreatLevel::Critical);
    }

    #[test]
    fn test_kyc_urgency_floor() {
        let finding = score(SpecialistKind::Credential, "your kyc needs an update soon");
        assert!(finding.risk_score >= 0.85);
    }

    #[test]
    fn test_digital_arrest_call_is_critical() {
        let content = "This is CBI. A warrant is issued against you. Pay Rs 1,50,000 fine now and do not disconnect the call.";
        let finding = score(SpecialistKind::Authority, content);
        assert!(finding.risk_score >= 0.8, "risk was {}", finding.risk_score);
        assert_eq!(finding.threat_level, ThreatLevel::Critical);
        match &finding.detail {
            FindingDetail::Authority { authority_claims, money_demands, .. } => {
                assert!(authority_claims.iter().any(|c| c == "cbi"));
                assert!(!money_demands.is_empty());
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_loan_document_issue_scoring() {
        let content = "Interest is floating at 18% p.a. A foreclosure charge of 4% applies, plus a processing fee of Rs 5,000.";
        let finding = score(SpecialistKind::Document, content);
        match &finding.detail {
            FindingDetail::Document { issues, interest_rate, .. } => {
                assert!(issues.len() >= 3, "only {} issues", issues.len());
                assert!(issues.iter().any(|i| i.issue == "high interest rate"));
                assert_eq!(*interest_rate, Some(18.0));
                assert_eq!(finding.risk_score, (issues.len() as f64 * 0.2).min(1.0));
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_insurance_document_uses_its_own_groups() {
        let content = "Pre-existing diseases have a waiting period of 48 months and a room rent cap applies.";
        let finding = SpecialistKind::Document.score(content, None, DocumentType::Insurance);
        match &finding.detail {
            FindingDetail::Document { document_type, issues, .. } => {
                assert_eq!(document_type, "insurance");
                assert!(issues.len() >= 3);
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_periodic_return_claim_forces_fraud() {
        let finding = score(SpecialistKind::Investment, "earn 2% daily from our trading group");
        assert!(finding.risk_score >= 0.95);
        assert_eq!(finding.threat_level, ThreatLevel::Critical);
    }

    #[test]
    fn test_detector_idempotence() {
        let content = "guaranteed returns, double your money with a small joining fee";
        let a = score(SpecialistKind::Investment, content);
        let b = score(SpecialistKind::Investment, content);
        assert_eq!(a.risk_score, b.risk_score);
        assert_eq!(a.threat_level, b.threat_level);
        assert_eq!(a.evidence, b.evidence);
    }
}
