//! Rule AST produced by the rule parser.
//!
//! - `Operand`: what can be compared (price fields, constants, indicators)
//! - `RuleSpec`: comparison, composite, trend and stop variants
//!
//! `Display` renders the canonical DSL text, so a parsed rule can be echoed
//! back in logs and validation output.

use std::fmt;

use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::helpers::PriceField;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Price(PriceField),
    Constant(f64),
    Indicator(IndicatorType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleSpec {
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    And(Vec<RuleSpec>),
    Or(Vec<RuleSpec>),
    Xor(Box<RuleSpec>, Box<RuleSpec>),
    Not(Box<RuleSpec>),
    StopLoss(f64),
    StopGain(f64),
    IsRising {
        operand: Operand,
        bar_count: usize,
        min_strength: Option<f64>,
    },
    IsFalling {
        operand: Operand,
        bar_count: usize,
        min_strength: Option<f64>,
    },
    True,
    False,
}

impl RuleSpec {
    /// Indicators referenced anywhere in the tree, in order of appearance.
    pub fn indicators(&self) -> Vec<&IndicatorType> {
        let mut found = Vec::new();
        self.collect_indicators(&mut found);
        found
    }

    fn collect_indicators<'a>(&'a self, found: &mut Vec<&'a IndicatorType>) {
        let mut push = |operand: &'a Operand| {
            if let Operand::Indicator(indicator) = operand {
                found.push(indicator);
            }
        };
        match self {
            RuleSpec::Above { left, right }
            | RuleSpec::Below { left, right }
            | RuleSpec::CrossAbove { left, right }
            | RuleSpec::CrossBelow { left, right } => {
                push(left);
                push(right);
            }
            RuleSpec::IsRising { operand, .. } | RuleSpec::IsFalling { operand, .. } => {
                push(operand)
            }
            RuleSpec::And(rules) | RuleSpec::Or(rules) => {
                for rule in rules {
                    rule.collect_indicators(found);
                }
            }
            RuleSpec::Xor(a, b) => {
                a.collect_indicators(found);
                b.collect_indicators(found);
            }
            RuleSpec::Not(inner) => inner.collect_indicators(found),
            RuleSpec::StopLoss(_) | RuleSpec::StopGain(_) | RuleSpec::True | RuleSpec::False => {}
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Price(field) => write!(f, "{}", field),
            Operand::Constant(value) => write!(f, "{}", value),
            Operand::Indicator(indicator) => write!(f, "{}", indicator),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[RuleSpec]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", rule)?;
    }
    f.write_str(")")
}

fn write_trend(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    operand: &Operand,
    bar_count: usize,
    min_strength: Option<f64>,
) -> fmt::Result {
    match min_strength {
        Some(strength) => write!(f, "{}({}, {}, {})", name, operand, bar_count, strength),
        None => write!(f, "{}({}, {})", name, operand, bar_count),
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSpec::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            RuleSpec::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            RuleSpec::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            RuleSpec::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            RuleSpec::And(rules) => write_list(f, "AND", rules),
            RuleSpec::Or(rules) => write_list(f, "OR", rules),
            RuleSpec::Xor(a, b) => write!(f, "XOR({}, {})", a, b),
            RuleSpec::Not(inner) => write!(f, "NOT({})", inner),
            RuleSpec::StopLoss(pct) => write!(f, "STOP_LOSS({})", pct),
            RuleSpec::StopGain(pct) => write!(f, "STOP_GAIN({})", pct),
            RuleSpec::IsRising {
                operand,
                bar_count,
                min_strength,
            } => write_trend(f, "IS_RISING", operand, *bar_count, *min_strength),
            RuleSpec::IsFalling {
                operand,
                bar_count,
                min_strength,
            } => write_trend(f, "IS_FALLING", operand, *bar_count, *min_strength),
            RuleSpec::True => f.write_str("TRUE"),
            RuleSpec::False => f.write_str("FALSE"),
        }
    }
}
