use extrato_core::{CandidateTransaction, LedgerTransaction};

/// Which source's matching policy applies. The two policies diverge on
/// purpose: the legacy path demands the exact posting day but tolerates
/// truncated descriptions (prefix match), while the document path tolerates
/// one day of posting drift but not truncation. Do not unify them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    Legacy,
    Document,
}

/// Compares fresh candidates against a bounded window of already-ledgered
/// transactions. The caller is responsible for bounding `existing` (the
/// pipeline uses a 90-day window); this type never scans a full ledger.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    date_window_days: i64,
    amount_tolerance_cents: i64,
    policy: MatchPolicy,
}

/// Characters of the candidate description used for the legacy prefix rule.
const LEGACY_PREFIX_LEN: usize = 10;

impl DuplicateDetector {
    /// Legacy-format policy: exact calendar day, prefix-10 description rule.
    pub fn for_legacy() -> Self {
        DuplicateDetector {
            date_window_days: 0,
            amount_tolerance_cents: 1,
            policy: MatchPolicy::Legacy,
        }
    }

    /// Document policy: ±1 day to tolerate posting-date drift between bank
    /// and statement; no prefix rule.
    pub fn for_document() -> Self {
        DuplicateDetector {
            date_window_days: 1,
            amount_tolerance_cents: 1,
            policy: MatchPolicy::Document,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Strict split: every candidate lands in exactly one of the two lists.
    pub fn partition(
        &self,
        candidates: Vec<CandidateTransaction>,
        existing: &[LedgerTransaction],
    ) -> (Vec<CandidateTransaction>, Vec<CandidateTransaction>) {
        let mut unique = Vec::new();
        let mut duplicates = Vec::new();
        for candidate in candidates {
            if existing.iter().any(|e| self.is_duplicate(&candidate, e)) {
                duplicates.push(candidate);
            } else {
                unique.push(candidate);
            }
        }
        (unique, duplicates)
    }

    /// Duplicate iff amount, date and description all agree under the policy.
    fn is_duplicate(&self, candidate: &CandidateTransaction, existing: &LedgerTransaction) -> bool {
        let amount_diff = (candidate.amount_cents - existing.amount_cents.abs()).abs();
        if amount_diff > self.amount_tolerance_cents {
            return false;
        }

        let date_diff = (candidate.date - existing.date).num_days().abs();
        if date_diff > self.date_window_days {
            return false;
        }

        self.descriptions_similar(&candidate.description, &existing.description)
    }

    fn descriptions_similar(&self, candidate: &str, existing: &str) -> bool {
        let a = candidate.trim().to_lowercase();
        let b = existing.trim().to_lowercase();

        if a == b || a.contains(&b) || b.contains(&a) {
            return true;
        }

        if self.policy == MatchPolicy::Legacy {
            let prefix: String = a.chars().take(LEGACY_PREFIX_LEN).collect();
            return !prefix.is_empty() && b.contains(&prefix);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use extrato_core::{Category, TransactionKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(id: &str, d: NaiveDate, desc: &str, cents: i64) -> CandidateTransaction {
        CandidateTransaction {
            id: id.to_string(),
            date: d,
            description: desc.to_string(),
            amount_cents: cents,
            kind: TransactionKind::Expense,
            category: Some(Category::Other),
            confidence: 1.0,
        }
    }

    fn existing(d: NaiveDate, desc: &str, cents: i64) -> LedgerTransaction {
        LedgerTransaction {
            id: Some(1),
            account_id: 1,
            date: d,
            description: desc.to_string(),
            amount_cents: cents,
            category: Category::Other,
            fit_id: None,
        }
    }

    #[test]
    fn amount_tolerance_boundary_is_one_cent() {
        let det = DuplicateDetector::for_legacy();
        let ledgered = vec![existing(date(2024, 3, 5), "POSTO SHELL", -10000)];

        let (_, dups) = det.partition(
            vec![candidate("a", date(2024, 3, 5), "POSTO SHELL", 10001)],
            &ledgered,
        );
        assert_eq!(dups.len(), 1, "1 cent off must still be a duplicate");

        let (unique, _) = det.partition(
            vec![candidate("b", date(2024, 3, 5), "POSTO SHELL", 10002)],
            &ledgered,
        );
        assert_eq!(unique.len(), 1, "2 cents off must not be a duplicate");
    }

    #[test]
    fn legacy_policy_requires_exact_day() {
        let det = DuplicateDetector::for_legacy();
        let ledgered = vec![existing(date(2024, 3, 5), "POSTO SHELL", -4000)];

        let (_, dups) = det.partition(
            vec![candidate("a", date(2024, 3, 5), "POSTO SHELL", 4000)],
            &ledgered,
        );
        assert_eq!(dups.len(), 1);

        let (unique, _) = det.partition(
            vec![candidate("b", date(2024, 3, 6), "POSTO SHELL", 4000)],
            &ledgered,
        );
        assert_eq!(unique.len(), 1, "one day of drift is unique on the legacy path");
    }

    #[test]
    fn document_policy_tolerates_one_day_of_drift() {
        let det = DuplicateDetector::for_document();
        let ledgered = vec![existing(date(2024, 3, 5), "POSTO SHELL", -4000)];

        let (_, dups) = det.partition(
            vec![candidate("a", date(2024, 3, 6), "POSTO SHELL", 4000)],
            &ledgered,
        );
        assert_eq!(dups.len(), 1);

        let (unique, _) = det.partition(
            vec![candidate("b", date(2024, 3, 7), "POSTO SHELL", 4000)],
            &ledgered,
        );
        assert_eq!(unique.len(), 1, "two days of drift is unique on the document path");
    }

    #[test]
    fn descriptions_match_case_insensitively_and_by_containment() {
        let det = DuplicateDetector::for_document();
        let ledgered = vec![existing(date(2024, 3, 5), "restaurante do joao", -8550)];

        let (_, dups) = det.partition(
            vec![
                candidate("a", date(2024, 3, 5), "RESTAURANTE DO JOAO", 8550),
                candidate("b", date(2024, 3, 5), "RESTAURANTE DO JOAO SP 0423", 8550),
            ],
            &ledgered,
        );
        assert_eq!(dups.len(), 2);
    }

    #[test]
    fn legacy_prefix_rule_matches_truncated_descriptions() {
        let legacy = DuplicateDetector::for_legacy();
        let document = DuplicateDetector::for_document();
        // The existing ledger entry embeds the candidate's first 10 chars
        // but neither string contains the other in full.
        let ledgered = vec![existing(
            date(2024, 3, 5),
            "COMPRA CARTAO - SUPERMERCA 0291",
            -15000,
        )];
        let cand = candidate("a", date(2024, 3, 5), "SUPERMERCADO PAGUE MENOS", 15000);

        let (_, dups) = legacy.partition(vec![cand.clone()], &ledgered);
        assert_eq!(dups.len(), 1, "prefix-10 applies on the legacy path");

        let (unique, _) = document.partition(vec![cand], &ledgered);
        assert_eq!(unique.len(), 1, "prefix-10 must not apply on the document path");
    }

    #[test]
    fn dissimilar_descriptions_are_unique() {
        let det = DuplicateDetector::for_legacy();
        let ledgered = vec![existing(date(2024, 3, 5), "NETFLIX.COM", -3990)];
        let (unique, dups) = det.partition(
            vec![candidate("a", date(2024, 3, 5), "SPOTIFY", 3990)],
            &ledgered,
        );
        assert_eq!(unique.len(), 1);
        assert!(dups.is_empty());
    }

    #[test]
    fn partition_is_a_strict_split() {
        let det = DuplicateDetector::for_document();
        let ledgered = vec![
            existing(date(2024, 3, 5), "POSTO SHELL", -4000),
            existing(date(2024, 3, 10), "NETFLIX.COM", -3990),
        ];
        let candidates = vec![
            candidate("a", date(2024, 3, 5), "POSTO SHELL", 4000),
            candidate("b", date(2024, 3, 11), "NETFLIX.COM", 3990),
            candidate("c", date(2024, 3, 20), "IFOOD *PEDIDO", 5600),
        ];
        let total = candidates.len();
        let (unique, dups) = det.partition(candidates, &ledgered);
        assert_eq!(unique.len() + dups.len(), total);
        assert_eq!(dups.len(), 2);
    }

    #[test]
    fn partition_of_empty_input_is_empty() {
        let det = DuplicateDetector::for_legacy();
        let (unique, dups) = det.partition(vec![], &[]);
        assert!(unique.is_empty());
        assert!(dups.is_empty());
    }

    #[test]
    fn signed_ledger_amounts_compare_against_unsigned_candidates() {
        // Ledger stores expenses negative; candidates are unsigned.
        let det = DuplicateDetector::for_legacy();
        let ledgered = vec![existing(date(2024, 3, 5), "POSTO SHELL", -4000)];
        let (_, dups) = det.partition(
            vec![candidate("a", date(2024, 3, 5), "POSTO SHELL", 4000)],
            &ledgered,
        );
        assert_eq!(dups.len(), 1);
    }
}
