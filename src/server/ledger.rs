//! In-memory technical debt ledger.
//!
//! Records a short summary of each analysis made on behalf of a project, so the
//! dashboard can show per-project totals and a trend over time. Only plain
//! summaries are kept; analysis results are dropped with their request. Each
//! project holds at most `max_entries` summaries, oldest evicted first.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{DebtConfig, DebtLevels};
use crate::pipeline::AnalysisResult;
use crate::score::round1;
use crate::score::{DebtLevel, DebtTrend};

/// Score differences within this many points count as a stable trend.
pub const TREND_TOLERANCE: f64 = 5.0;

/// One recorded analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub file: String,
    pub score: f64,
    pub level: DebtLevel,
    pub hours: f64,
    pub smells: usize,
    pub at: DateTime<Utc>,
    #[serde(skip)]
    seq: u64,
}

/// Aggregated debt over one project, or over all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub projects: usize,
    pub analyses: usize,
    pub files: usize,
    pub average_debt_score: f64,
    pub debt_level: DebtLevel,
    pub debt_trend: DebtTrend,
    pub total_estimated_hours: f64,
    pub total_smells: usize,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    /// Latest entry per file, most recent first.
    pub recent: Vec<LedgerEntry>,
}

#[derive(Debug, Default)]
struct Entries {
    by_project: BTreeMap<String, VecDeque<LedgerEntry>>,
    next_seq: u64,
}

/// Debt history keyed by project id.
#[derive(Debug)]
pub struct DebtLedger {
    levels: DebtLevels,
    max_entries: usize,
    entries: RwLock<Entries>,
}

impl Default for DebtLedger {
    fn default() -> Self {
        Self::new(DebtLevels::default(), DebtConfig::default().ledger_max_entries)
    }
}

impl DebtLedger {
    pub fn new(levels: DebtLevels, max_entries: usize) -> Self {
        Self {
            levels,
            max_entries: max_entries.max(1),
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Record an analysis under `project_id`.
    pub fn record(&self, project_id: &str, file: &str, result: &AnalysisResult) {
        let debt = &result.technical_debt;
        let mut entries = self.entries.write();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        let history = entries.by_project.entry(project_id.to_string()).or_default();
        if history.len() >= self.max_entries {
            history.pop_front();
        }
        history.push_back(LedgerEntry {
            file: file.to_string(),
            score: debt.total_debt_score,
            level: debt.debt_level,
            hours: debt.estimated_hours,
            smells: result.code_smells.total_smells,
            at: Utc::now(),
            seq,
        });
        tracing::debug!(
            "Recorded debt {} for {} in project {}",
            debt.total_debt_score,
            file,
            project_id
        );
    }

    /// Summary for one project, or all projects when `project_id` is `None`.
    pub fn summary(&self, project_id: Option<&str>) -> DebtSummary {
        let entries = self.entries.read();
        let (projects, mut selected): (usize, Vec<&LedgerEntry>) = match project_id {
            Some(id) => match entries.by_project.get(id) {
                Some(list) => (1, list.iter().collect()),
                None => (0, Vec::new()),
            },
            None => (
                entries.by_project.len(),
                entries.by_project.values().flatten().collect(),
            ),
        };
        selected.sort_by_key(|e| e.seq);

        let mut latest: BTreeMap<&str, &LedgerEntry> = BTreeMap::new();
        for entry in &selected {
            latest.insert(entry.file.as_str(), entry);
        }
        let mut recent: Vec<LedgerEntry> = latest.values().map(|e| (*e).clone()).collect();
        recent.sort_by_key(|e| std::cmp::Reverse(e.seq));

        let scores: Vec<f64> = selected.iter().map(|e| e.score).collect();
        let average = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|e| e.score).sum::<f64>() / recent.len() as f64
        };

        DebtSummary {
            project_id: project_id.map(str::to_string),
            projects,
            analyses: selected.len(),
            files: recent.len(),
            average_debt_score: round1(average),
            debt_level: DebtLevel::from_score(average, &self.levels),
            debt_trend: DebtTrend::from_history(&scores, TREND_TOLERANCE),
            total_estimated_hours: round1(recent.iter().map(|e| e.hours).sum()),
            total_smells: recent.iter().map(|e| e.smells).sum(),
            last_analyzed_at: selected.last().map(|e| e.at),
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::pipeline::Engine;

    fn result(code: &str) -> AnalysisResult {
        Engine::default()
            .analyze(Some(Path::new("a.py")), code)
            .unwrap()
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = DebtLedger::default();
        let summary = ledger.summary(None);
        assert_eq!(summary.analyses, 0);
        assert_eq!(summary.average_debt_score, 0.0);
        assert_eq!(summary.debt_level, DebtLevel::Low);
        assert_eq!(summary.debt_trend, DebtTrend::Stable);
        assert!(summary.last_analyzed_at.is_none());
    }

    #[test]
    fn test_record_and_summarize() {
        let ledger = DebtLedger::default();
        let clean = result("def f(x):\n    return x\n");
        let noisy = result("import os\nimport sys\n\ndef f(x):\n    return x * 3600 + 86400\n");

        ledger.record("p1", "a.py", &clean);
        ledger.record("p1", "b.py", &noisy);
        ledger.record("p2", "c.py", &clean);

        let p1 = ledger.summary(Some("p1"));
        assert_eq!(p1.projects, 1);
        assert_eq!(p1.analyses, 2);
        assert_eq!(p1.files, 2);
        assert_eq!(p1.recent[0].file, "b.py");
        assert_eq!(
            p1.total_smells,
            clean.code_smells.total_smells + noisy.code_smells.total_smells
        );

        let all = ledger.summary(None);
        assert_eq!(all.projects, 2);
        assert_eq!(all.analyses, 3);

        let missing = ledger.summary(Some("nope"));
        assert_eq!(missing.projects, 0);
        assert_eq!(missing.analyses, 0);
    }

    #[test]
    fn test_reanalysis_replaces_file_in_totals() {
        let ledger = DebtLedger::default();
        let noisy = result("import os\nimport sys\n\ndef f(x):\n    return x * 3600 + 86400\n");
        let clean = result("def f(x):\n    return x\n");
        ledger.record("p", "a.py", &noisy);
        ledger.record("p", "a.py", &clean);

        let summary = ledger.summary(Some("p"));
        assert_eq!(summary.analyses, 2);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.average_debt_score, clean.technical_debt.total_debt_score);
        assert_eq!(summary.debt_trend, DebtTrend::Decreasing);
    }

    #[test]
    fn test_history_is_bounded_per_project() {
        let ledger = DebtLedger::new(DebtLevels::default(), 3);
        let clean = result("def f(x):\n    return x\n");
        for i in 0..4 {
            ledger.record("p", &format!("f{i}.py"), &clean);
        }
        ledger.record("q", "other.py", &clean);

        let summary = ledger.summary(Some("p"));
        assert_eq!(summary.analyses, 3);
        assert_eq!(summary.files, 3);
        assert!(summary.recent.iter().all(|e| e.file != "f0.py"));
        assert_eq!(summary.recent[0].file, "f3.py");

        assert_eq!(ledger.summary(Some("q")).analyses, 1);
        assert_eq!(ledger.summary(None).analyses, 4);
    }
}
