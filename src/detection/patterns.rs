//! Static pattern library for the prompt-injection detector.
//!
//! Patterns are organized into six categories matching the taxonomy the
//! prompt-injection detector scans for: role manipulation, instruction
//! override, system-prompt extraction, encoding/structural evasion,
//! command execution, and financial coercion.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::pipeline::outcome::Severity;

/// High-level classification of an injection pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PatternCategory {
    /// Attempts to redefine the agent's role or identity ("act as",
    /// "pretend to be").
    RoleConfusion,
    /// Attempts to cancel or override prior instructions ("ignore
    /// previous instructions", "system_override").
    InstructionOverride,
    /// Abuse of delimiters or bracketed tags to simulate a system turn
    /// (`[SYSTEM]`, `<system>`).
    DelimiterManipulation,
    /// Attempts to exfiltrate the system prompt ("reveal your prompt").
    SystemPromptExtraction,
    /// Directives to execute a command or jailbreak label.
    CommandExecution,
    /// Directives coercing a financial action (wire transfer, payment)
    /// bundled with an override/jailbreak attempt.
    FinancialCoercion,
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleConfusion => write!(f, "role_confusion"),
            Self::InstructionOverride => write!(f, "instruction_override"),
            Self::DelimiterManipulation => write!(f, "delimiter_manipulation"),
            Self::SystemPromptExtraction => write!(f, "system_prompt_extraction"),
            Self::CommandExecution => write!(f, "command_execution"),
            Self::FinancialCoercion => write!(f, "financial_coercion"),
        }
    }
}

/// A built-in injection detection pattern.
#[derive(Debug, Clone)]
pub struct InjectionPattern {
    /// Unique identifier (e.g. `"IO-001"`).
    pub id: Cow<'static, str>,
    /// Which category this pattern belongs to.
    pub category: PatternCategory,
    /// Human-readable description of what this pattern detects.
    pub description: Cow<'static, str>,
    /// Raw regex pattern string, compiled into a `RegexSet`.
    pub regex_str: Cow<'static, str>,
    /// Severity when this pattern matches.
    pub severity: Severity,
    /// Fixed scoring weight. Keyword patterns contribute ~15, structural
    /// regex patterns ~20, per the detector's scoring contract.
    pub weight: f32,
}

/// A caller-supplied injection detection pattern, for `additional_patterns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Unique identifier.
    pub id: String,
    /// Which category this pattern belongs to.
    pub category: PatternCategory,
    /// Human-readable description.
    pub description: String,
    /// Raw regex pattern string.
    pub regex_str: String,
    /// Severity when this pattern matches.
    pub severity: Severity,
    /// Fixed scoring weight.
    pub weight: f32,
}

/// Reduces boilerplate when defining static patterns.
macro_rules! pat {
    ($id:expr, $cat:expr, $desc:expr, $re:expr, $sev:expr, $w:expr) => {
        InjectionPattern {
            id: Cow::Borrowed($id),
            category: $cat,
            description: Cow::Borrowed($desc),
            regex_str: Cow::Borrowed($re),
            severity: $sev,
            weight: $w,
        }
    };
}

/// Returns the full set of built-in injection detection patterns.
#[must_use]
pub fn builtin_patterns() -> Vec<InjectionPattern> {
    use PatternCategory::{
        CommandExecution, DelimiterManipulation, FinancialCoercion, InstructionOverride,
        RoleConfusion, SystemPromptExtraction,
    };
    use Severity::{Critical, High, Medium};

    vec![
        // ── Override phrases (keyword weight ~15) ──────────────────
        pat!(
            "IO-001",
            InstructionOverride,
            "Ignore previous instructions",
            r"(?i)ignore\s+(all\s+)?previous\s+instructions",
            Critical,
            15.0
        ),
        pat!(
            "IO-002",
            InstructionOverride,
            "system_override keyword",
            r"(?i)system_override",
            Critical,
            15.0
        ),
        pat!(
            "IO-003",
            InstructionOverride,
            "admin_override keyword",
            r"(?i)admin_override",
            Critical,
            15.0
        ),
        pat!(
            "IO-004",
            InstructionOverride,
            "Disregard prior",
            r"(?i)disregard\s+(all\s+)?prior\b",
            High,
            15.0
        ),
        pat!(
            "IO-005",
            InstructionOverride,
            "Forget everything",
            r"(?i)forget\s+everything",
            High,
            15.0
        ),
        // ── Role manipulation ───────────────────────────────────────
        pat!(
            "RC-001",
            RoleConfusion,
            "Act as",
            r"(?i)act\s+as\s+(a|an|the)\b",
            Medium,
            15.0
        ),
        pat!(
            "RC-002",
            RoleConfusion,
            "Pretend to be",
            r"(?i)pretend\s+(to\s+be|you\s+are)\b",
            High,
            15.0
        ),
        pat!(
            "RC-003",
            RoleConfusion,
            "You are now",
            r"(?i)you\s+are\s+now\b",
            Medium,
            15.0
        ),
        // ── Instruction injection keywords ──────────────────────────
        pat!(
            "II-001",
            InstructionOverride,
            "New/secret/hidden instructions",
            r"(?i)(new|secret|hidden)\s+instructions?\b",
            High,
            15.0
        ),
        // ── System-prompt extraction ─────────────────────────────────
        pat!(
            "SP-001",
            SystemPromptExtraction,
            "Reveal your prompt",
            r"(?i)reveal\s+your\s+(system\s+)?prompt",
            High,
            15.0
        ),
        pat!(
            "SP-002",
            SystemPromptExtraction,
            "Show me your instructions",
            r"(?i)show\s+me\s+your\s+instructions",
            High,
            15.0
        ),
        // ── Jailbreak labels ─────────────────────────────────────────
        pat!(
            "JB-001",
            InstructionOverride,
            "DAN / jailbreak label",
            r"(?i)\b(DAN|do\s+anything\s+now|jailbreak)\b",
            Critical,
            15.0
        ),
        // ── Command execution directives ────────────────────────────
        pat!(
            "CE-001",
            CommandExecution,
            "Execute/run the following command",
            r"(?i)(execute|run)\s+the\s+following\s+command",
            Critical,
            20.0
        ),
        // ── Financial coercion ───────────────────────────────────────
        pat!(
            "FC-001",
            FinancialCoercion,
            "Transfer/send money to an account",
            r"(?i)(transfer|send|wire)\s+\$?[\d,]+(\.\d+)?\s+(to|into)\s+account",
            Critical,
            20.0
        ),
        // ── Structural / delimiter manipulation (pattern weight ~20) ─
        pat!(
            "DM-001",
            DelimiterManipulation,
            "Bracketed [SYSTEM] tag",
            r"(?i)\[\s*system\s*\]",
            High,
            20.0
        ),
        pat!(
            "DM-002",
            DelimiterManipulation,
            "HTML-like <system> tag",
            r"(?i)</?system>",
            High,
            20.0
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_patterns_compile() {
        for p in builtin_patterns() {
            regex::Regex::new(&p.regex_str)
                .unwrap_or_else(|e| panic!("pattern {} failed to compile: {e}", p.id));
        }
    }

    #[test]
    fn builtin_patterns_nonempty() {
        assert!(builtin_patterns().len() >= 10);
    }

    #[test]
    fn category_display() {
        assert_eq!(
            PatternCategory::InstructionOverride.to_string(),
            "instruction_override"
        );
    }
}
