use rust_decimal::Decimal;
use tally_core::{CommissionRule, Money};

/// Order-sensitive commission lookup: the first rule whose keyword appears in
/// the remark wins, later rules are never consulted.
pub struct CommissionRuleEngine {
    rules: Vec<CommissionRule>,
}

impl CommissionRuleEngine {
    pub fn new(rules: Vec<CommissionRule>) -> Self {
        Self { rules }
    }

    pub fn find_matching_rule(&self, remark: &str) -> Option<&CommissionRule> {
        self.rules
            .iter()
            .find(|rule| !rule.keyword.is_empty() && remark.contains(rule.keyword.as_str()))
    }

    /// Commission on the unrounded pre-deduction amount, rounded to cents.
    /// Zero when no rule applies.
    pub fn commission_for(&self, remark: &str, raw_amount: Decimal) -> Money {
        self.find_matching_rule(remark)
            .map(|rule| Money::from_decimal(raw_amount * rule.rate))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, keyword: &str, rate_pct: i64) -> CommissionRule {
        CommissionRule::new(name, keyword, Decimal::new(rate_pct, 2))
    }

    fn engine() -> CommissionRuleEngine {
        CommissionRuleEngine::new(vec![rule("full", "洗", 10), rule("referral", "谢", 15)])
    }

    #[test]
    fn first_listed_rule_wins() {
        // Remark mentions both keywords; order decides.
        let engine = engine();
        let found = engine.find_matching_rule("谢老师 洗吹").unwrap();
        assert_eq!(found.name, "full");
    }

    #[test]
    fn later_rule_applies_when_earlier_misses() {
        let engine = engine();
        let found = engine.find_matching_rule("谢老师推荐").unwrap();
        assert_eq!(found.name, "referral");
    }

    #[test]
    fn no_keyword_no_rule() {
        assert!(engine().find_matching_rule("剪发").is_none());
        assert!(engine().commission_for("剪发", Decimal::from(100)).is_zero());
    }

    #[test]
    fn commission_uses_rate() {
        let c = engine().commission_for("谢", Decimal::from(200));
        assert_eq!(c, Money::from_cents(3_000));
        // 0.0045 rounds to zero; rounding 0.045 first would give 0.01.
        let full = engine().commission_for("洗", Decimal::new(45, 3));
        assert!(full.is_zero());
    }

    #[test]
    fn blank_keyword_never_matches() {
        let engine = CommissionRuleEngine::new(vec![rule("blank", "", 50), rule("full", "洗", 10)]);
        assert_eq!(engine.find_matching_rule("洗").unwrap().name, "full");
        assert!(engine.find_matching_rule("anything").is_none());
    }

    #[test]
    fn reordering_rules_changes_the_result() {
        let engine = CommissionRuleEngine::new(vec![rule("referral", "谢", 15), rule("full", "洗", 10)]);
        assert_eq!(engine.find_matching_rule("谢 洗").unwrap().name, "referral");
    }
}
