//! Static pattern tables and the fraud-trajectory library
//!
//! All tables are read-only after load and safe for unsynchronized
//! concurrent reads.

use crate::error::BodyguardError;
use crate::models::FraudTrajectory;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

//
// ================= Payment (two-tier) patterns =================
//

/// Two-tier pattern: fires only when at least one keyword AND one
/// indicator are present.
pub struct TwoTierPattern {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub indicators: &'static [&'static str],
    pub risk: f64,
    pub hindi: &'static str,
}

pub static PAYMENT_PATTERNS: &[TwoTierPattern] = &[
    TwoTierPattern {
        name: "collect_scam",
        keywords: &["collect", "request", "claim", "receive", "accepting"],
        indicators: &["won", "lottery", "prize", "cashback", "reward", "refund"],
        risk: 0.95,
        hindi: "कलेक्ट रिक्वेस्ट धोखाधड़ी",
    },
    TwoTierPattern {
        name: "qr_fraud",
        keywords: &["scan", "qr", "code"],
        indicators: &["receive", "payment", "money", "credit"],
        risk: 0.92,
        hindi: "QR कोड धोखाधड़ी",
    },
    TwoTierPattern {
        name: "fake_refund",
        keywords: &["refund", "reversal", "pending", "failed"],
        indicators: &["upi pin", "enter", "verify", "confirm"],
        risk: 0.90,
        hindi: "रिफंड धोखाधड़ी",
    },
    TwoTierPattern {
        name: "marketplace",
        keywords: &["army", "crpf", "posting", "buyer", "seller"],
        indicators: &["qr", "link", "pay", "receive"],
        risk: 0.88,
        hindi: "मार्केटप्लेस धोखाधड़ी",
    },
];

pub static URGENCY_WORDS: &[&str] = &[
    "urgent", "immediately", "now", "hurry", "fast", "limited", "expire", "last chance",
];

/// Round amounts favoured by scripted scams.
pub static ODD_AMOUNTS: &[f64] = &[1.0, 10.0, 49_999.0, 50_000.0, 99_999.0, 100_000.0];

//
// ================= Credential (single-tier regex) patterns =================
//

pub struct RegexPattern {
    pub name: &'static str,
    pub patterns: Vec<Regex>,
    pub risk: f64,
    pub message: &'static str,
}

fn regexes(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("invalid built-in pattern"))
        .collect()
}

lazy_static! {
    pub static ref CREDENTIAL_PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern {
            name: "apk_download",
            patterns: regexes(&[r"\.apk", r"download.*app", r"install.*app"]),
            risk: 0.98,
            message: "APK download - never install apps from links",
        },
        RegexPattern {
            name: "shortened_url",
            patterns: regexes(&[r"bit\.ly", r"tinyurl", r"goo\.gl", r"t\.co", r"short\."]),
            risk: 0.85,
            message: "Shortened URL hiding the real destination",
        },
        RegexPattern {
            name: "fake_bank",
            patterns: regexes(&[r"sbi.*update", r"hdfc.*kyc", r"icici.*verify", r"axis.*confirm"]),
            risk: 0.90,
            message: "Suspicious bank-related URL",
        },
        RegexPattern {
            name: "account_threat",
            patterns: regexes(&[r"block.*account", r"suspend", r"freeze", r"deactivate", r"close.*account"]),
            risk: 0.80,
            message: "Account blocking threat - scare tactic",
        },
        RegexPattern {
            name: "screen_share",
            patterns: regexes(&[r"anydesk", r"teamviewer", r"quicksupport", r"screen.*share"]),
            risk: 0.95,
            message: "Screen sharing request - maximum danger",
        },
        RegexPattern {
            name: "otp_request",
            patterns: regexes(&[r"share.*otp", r"enter.*otp", r"send.*otp", r"otp.*verification"]),
            risk: 0.96,
            message: "OTP sharing request - never share",
        },
    ];

    /// Any credential-request mention forces risk to at least 0.95.
    pub static ref CREDENTIAL_FORCING_RE: Regex =
        Regex::new(r"otp|upi pin|password|cvv").expect("invalid built-in pattern");

    pub static ref RATE_RE: Regex =
        Regex::new(r"(\d+\.?\d*)\s*%\s*(p\.?a\.?|per\s*annum)?").expect("invalid built-in pattern");

    pub static ref PERIODIC_RETURN_RE: Regex =
        Regex::new(r"(\d+)\s*%\s*(daily|weekly|monthly|per month)").expect("invalid built-in pattern");
}

//
// ================= Authority keyword sets =================
//

pub static AUTHORITY_KEYWORDS: &[&str] = &[
    "police", "cbi", "ed", "enforcement directorate", "crime branch",
    "cyber cell", "income tax", "customs", "narcotics", "ncb",
    "interpol", "fir", "warrant", "court order", "legal notice",
];

pub static THREAT_INDICATORS: &[&str] = &[
    "arrest", "custody", "jail", "prison", "warrant",
    "case against", "charges", "investigation", "questioning",
    "money laundering", "illegal", "suspicious activity",
];

pub static MONEY_DEMANDS: &[&str] = &[
    "pay", "transfer", "fine", "penalty", "fee", "deposit",
    "security", "bail", "₹", "rs", "rupee", "lakh", "crore",
];

pub static DIGITAL_ARREST_SIGNS: &[&str] = &[
    "stay on call", "do not disconnect", "video call", "skype",
    "whatsapp video", "digital arrest", "keep this secret", "confidential",
];

//
// ================= Document red-flag groups =================
//

pub struct KeywordGroup {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub severity: &'static str,
}

pub static LOAN_RED_FLAGS: &[KeywordGroup] = &[
    KeywordGroup {
        name: "floating rate",
        keywords: &["floating", "variable rate", "linked to repo", "subject to change"],
        severity: "MEDIUM",
    },
    KeywordGroup {
        name: "foreclosure penalty",
        keywords: &["foreclosure charge", "prepayment penalty", "early closure fee"],
        severity: "HIGH",
    },
    KeywordGroup {
        name: "hidden fees",
        keywords: &["processing fee", "documentation charge", "verification fee"],
        severity: "MEDIUM",
    },
    KeywordGroup {
        name: "forced insurance",
        keywords: &["mandatory insurance", "credit protect", "loan cover"],
        severity: "HIGH",
    },
    KeywordGroup {
        name: "penal interest",
        keywords: &["penal interest", "default charge", "late payment penalty"],
        severity: "HIGH",
    },
];

pub static INSURANCE_RED_FLAGS: &[KeywordGroup] = &[
    KeywordGroup {
        name: "pre-existing conditions",
        keywords: &["pre-existing", "prior condition", "existing disease"],
        severity: "HIGH",
    },
    KeywordGroup {
        name: "waiting period",
        keywords: &["waiting period", "cooling off", "dormant period"],
        severity: "MEDIUM",
    },
    KeywordGroup {
        name: "sub-limits",
        keywords: &["sub-limit", "room rent cap", "per day maximum"],
        severity: "HIGH",
    },
    KeywordGroup {
        name: "co-payment",
        keywords: &["co-pay", "co-insurance", "borne by insured"],
        severity: "MEDIUM",
    },
    KeywordGroup {
        name: "exclusions",
        keywords: &["not covered", "excluded", "exception", "does not cover"],
        severity: "HIGH",
    },
];

/// Annual interest rate above which a high-rate issue is flagged.
pub const HIGH_RATE_THRESHOLD: f64 = 15.0;

//
// ================= Investment indicator lists =================
//

pub static SCAM_INDICATORS: &[&str] = &[
    "guaranteed returns", "risk-free", "double your money",
    "high returns", "100% profit", "fixed return",
    "no loss", "sure profit", "income guarantee",
];

pub static INVESTMENT_RED_FLAGS: &[&str] = &[
    "referral bonus", "mlm", "network marketing",
    "joining fee", "registration fee", "crypto trading",
    "forex", "binary options", "daily profit",
];

//
// ================= Trajectory library =================
//

#[derive(Deserialize)]
struct TrajectoryFile {
    fraud_trajectories: Vec<FraudTrajectory>,
}

/// Compiled-in copy of the trajectory data file, used when no external
/// path is configured or the file is unreadable.
const DEFAULT_TRAJECTORIES: &str = include_str!("../data/fraud_trajectories.json");

/// Fraud-trajectory library, loaded once at startup and immutable after.
pub struct TrajectoryLibrary {
    trajectories: Vec<FraudTrajectory>,
}

impl TrajectoryLibrary {
    /// Load from a JSON file of shape `{ "fraud_trajectories": [...] }`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: TrajectoryFile = serde_json::from_str(&raw)
            .map_err(|e| BodyguardError::TrajectoryData(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            count = file.fraud_trajectories.len(),
            "Loaded fraud trajectories"
        );

        Ok(Self {
            trajectories: file.fraud_trajectories,
        })
    }

    /// Load from the given path if set, falling back to the compiled-in
    /// defaults on any failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        if let Some(path) = path {
            match Self::load(path) {
                Ok(lib) => return lib,
                Err(e) => {
                    warn!(error = %e, "Trajectory file unusable - using built-in defaults");
                }
            }
        }
        Self::default()
    }

    pub fn trajectories(&self) -> &[FraudTrajectory] {
        &self.trajectories
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}

impl Default for TrajectoryLibrary {
    fn default() -> Self {
        let file: TrajectoryFile = serde_json::from_str(DEFAULT_TRAJECTORIES)
            .expect("built-in trajectory data is well-formed");
        Self {
            trajectories: file.fraud_trajectories,
        }
    }
}
