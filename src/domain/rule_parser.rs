//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to a
//! `RuleSpec` with error messages carrying the character offset and the
//! expected/found tokens. Keywords and indicator names are upper case; price
//! fields are lower case.

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::helpers::PriceField;
use crate::domain::rule_spec::{Operand, RuleSpec};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::at(
                self.pos,
                format!("expected '{}', found '{}'", expected, ch),
            )),
            None => Err(ParseError::at(
                self.pos,
                format!("expected '{}', found end of input", expected),
            )),
        }
    }

    /// Consume `expected` if it is next; report whether it was.
    fn eat_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let remaining = self.remaining();
        let matches = remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if matches {
            self.pos += keyword.len();
        }
        matches
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError::at(
                start,
                format!("expected number, found '{}'", self.peek_word()),
            ));
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map_err(|_| ParseError::at(start, format!("invalid number: {}", text)))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(ParseError::at(
                start,
                format!("expected integer, found '{}'", self.peek_word()),
            ));
        }
        let text = &self.input[start..self.pos];
        text.parse::<usize>()
            .map_err(|_| ParseError::at(start, format!("invalid integer: {}", text)))
    }

    /// An integer >= 1.
    fn parse_period(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let period = self.parse_integer()?;
        if period == 0 {
            return Err(ParseError::at(start, "period must be at least 1"));
        }
        Ok(period)
    }

    /// `(p1, p2, ..., pN)` with every p a period.
    fn period_args<const N: usize>(&mut self) -> Result<[usize; N], ParseError> {
        self.expect_char('(')?;
        let mut periods = [0; N];
        for (i, period) in periods.iter_mut().enumerate() {
            if i > 0 {
                self.expect_char(',')?;
            }
            *period = self.parse_period()?;
        }
        self.expect_char(')')?;
        Ok(periods)
    }

    /// `(period, k)` for the outer Bollinger bands.
    fn band_args(&mut self) -> Result<(usize, u32), ParseError> {
        self.expect_char('(')?;
        let period = self.parse_period()?;
        self.expect_char(',')?;
        self.skip_whitespace();
        let start = self.pos;
        let k = self.parse_number()?;
        if k < 0.0 {
            return Err(ParseError::at(start, "band multiplier must be >= 0"));
        }
        let hundredths = (k * 100.0).round();
        if (hundredths - k * 100.0).abs() > 1e-6 {
            return Err(ParseError::at(
                start,
                "band multiplier must have at most 2 decimals",
            ));
        }
        if hundredths > u32::MAX as f64 {
            return Err(ParseError::at(start, "band multiplier is too large"));
        }
        self.expect_char(')')?;
        Ok((period, hundredths as u32))
    }

    fn parse_indicator(&mut self) -> Result<IndicatorType, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.peek_word();
        if !self.consume_keyword(&word) {
            return Err(ParseError::at(
                start,
                format!("expected operand, found '{}'", word),
            ));
        }

        let indicator = match word.as_str() {
            "TR" => IndicatorType::TrueRange,
            "OBV" => IndicatorType::Obv,
            "SMA" => IndicatorType::Sma(self.period_args::<1>()?[0]),
            "EMA" => IndicatorType::Ema(self.period_args::<1>()?[0]),
            "WMA" => IndicatorType::Wma(self.period_args::<1>()?[0]),
            "HMA" => IndicatorType::Hma(self.period_args::<1>()?[0]),
            "MMA" => IndicatorType::Mma(self.period_args::<1>()?[0]),
            "RSI" => IndicatorType::Rsi(self.period_args::<1>()?[0]),
            "ROC" => IndicatorType::Roc(self.period_args::<1>()?[0]),
            "ATR" => IndicatorType::Atr(self.period_args::<1>()?[0]),
            "STDDEV" => IndicatorType::Stddev(self.period_args::<1>()?[0]),
            "CCI" => IndicatorType::Cci(self.period_args::<1>()?[0]),
            "VWAP" => IndicatorType::Vwap(self.period_args::<1>()?[0]),
            "HIGHEST" => IndicatorType::Highest(self.period_args::<1>()?[0]),
            "LOWEST" => IndicatorType::Lowest(self.period_args::<1>()?[0]),
            "STOCHASTIC_K" => IndicatorType::StochasticK(self.period_args::<1>()?[0]),
            "WILLIAMS_R" => IndicatorType::WilliamsR(self.period_args::<1>()?[0]),
            "BOLLINGER_MIDDLE" => IndicatorType::BollingerMiddle(self.period_args::<1>()?[0]),
            "MACD" => {
                let [fast, slow] = self.period_args()?;
                IndicatorType::Macd { fast, slow }
            }
            "MACD_SIGNAL" => {
                let [fast, slow, signal] = self.period_args()?;
                IndicatorType::MacdSignal { fast, slow, signal }
            }
            "MACD_HISTOGRAM" => {
                let [fast, slow, signal] = self.period_args()?;
                IndicatorType::MacdHistogram { fast, slow, signal }
            }
            "BOLLINGER_UPPER" => {
                let (period, k_x100) = self.band_args()?;
                IndicatorType::BollingerUpper { period, k_x100 }
            }
            "BOLLINGER_LOWER" => {
                let (period, k_x100) = self.band_args()?;
                IndicatorType::BollingerLower { period, k_x100 }
            }
            _ => {
                return Err(ParseError::at(
                    start,
                    format!("expected operand, found '{}'", word),
                ));
            }
        };
        Ok(indicator)
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        let field = match self.peek_word().as_str() {
            "open" => Some(PriceField::Open),
            "high" => Some(PriceField::High),
            "low" => Some(PriceField::Low),
            "close" => Some(PriceField::Close),
            "volume" => Some(PriceField::Volume),
            "typical" => Some(PriceField::Typical),
            "median" => Some(PriceField::Median),
            _ => None,
        };
        match field {
            Some(field) => {
                self.consume_keyword(&field.to_string());
                Ok(Operand::Price(field))
            }
            None => Ok(Operand::Indicator(self.parse_indicator()?)),
        }
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<RuleSpec, ParseError> {
        self.expect_char('(')?;
        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(match keyword {
            "ABOVE" => RuleSpec::Above { left, right },
            "BELOW" => RuleSpec::Below { left, right },
            "CROSS_ABOVE" => RuleSpec::CrossAbove { left, right },
            _ => RuleSpec::CrossBelow { left, right },
        })
    }

    /// `(rule, rule, ...)` with at least two rules.
    fn parse_rule_list(&mut self, keyword: &str) -> Result<Vec<RuleSpec>, ParseError> {
        self.expect_char('(')?;
        let mut rules = vec![self.parse_rule()?];
        while !self.eat_char(')') {
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }
        if rules.len() < 2 {
            return Err(ParseError::at(
                self.pos,
                format!("{} requires at least 2 rules", keyword),
            ));
        }
        Ok(rules)
    }

    fn parse_percentage(&mut self) -> Result<f64, ParseError> {
        self.expect_char('(')?;
        self.skip_whitespace();
        let start = self.pos;
        let pct = self.parse_number()?;
        if pct < 0.0 {
            return Err(ParseError::at(start, "percentage must be >= 0"));
        }
        self.expect_char(')')?;
        Ok(pct)
    }

    /// `(operand, n[, strength])`
    fn parse_trend(&mut self) -> Result<(Operand, usize, Option<f64>), ParseError> {
        self.expect_char('(')?;
        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let bar_count = self.parse_period()?;
        let min_strength = if self.eat_char(',') {
            self.skip_whitespace();
            let start = self.pos;
            let strength = self.parse_number()?;
            if strength < 0.0 {
                return Err(ParseError::at(start, "strength must be >= 0"));
            }
            Some(strength)
        } else {
            None
        };
        self.expect_char(')')?;
        Ok((operand, bar_count, min_strength))
    }

    fn parse_rule(&mut self) -> Result<RuleSpec, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.peek_word();
        let known = matches!(
            word.as_str(),
            "ABOVE"
                | "BELOW"
                | "CROSS_ABOVE"
                | "CROSS_BELOW"
                | "AND"
                | "OR"
                | "XOR"
                | "NOT"
                | "STOP_LOSS"
                | "STOP_GAIN"
                | "IS_RISING"
                | "IS_FALLING"
                | "TRUE"
                | "FALSE"
        );
        if !known || !self.consume_keyword(&word) {
            return Err(ParseError::at(
                start,
                format!("expected rule, found '{}'", word),
            ));
        }

        match word.as_str() {
            "ABOVE" | "BELOW" | "CROSS_ABOVE" | "CROSS_BELOW" => self.parse_comparison(&word),
            "AND" => Ok(RuleSpec::And(self.parse_rule_list("AND")?)),
            "OR" => Ok(RuleSpec::Or(self.parse_rule_list("OR")?)),
            "XOR" => {
                self.expect_char('(')?;
                let first = self.parse_rule()?;
                self.expect_char(',')?;
                let second = self.parse_rule()?;
                self.expect_char(')')?;
                Ok(RuleSpec::Xor(Box::new(first), Box::new(second)))
            }
            "NOT" => {
                self.expect_char('(')?;
                let inner = self.parse_rule()?;
                self.expect_char(')')?;
                Ok(RuleSpec::Not(Box::new(inner)))
            }
            "STOP_LOSS" => Ok(RuleSpec::StopLoss(self.parse_percentage()?)),
            "STOP_GAIN" => Ok(RuleSpec::StopGain(self.parse_percentage()?)),
            "IS_RISING" => {
                let (operand, bar_count, min_strength) = self.parse_trend()?;
                Ok(RuleSpec::IsRising {
                    operand,
                    bar_count,
                    min_strength,
                })
            }
            "IS_FALLING" => {
                let (operand, bar_count, min_strength) = self.parse_trend()?;
                Ok(RuleSpec::IsFalling {
                    operand,
                    bar_count,
                    min_strength,
                })
            }
            "TRUE" => Ok(RuleSpec::True),
            _ => Ok(RuleSpec::False),
        }
    }

    fn parse(&mut self) -> Result<RuleSpec, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError::at(
                self.pos,
                format!("unexpected input after rule: '{}'", self.remaining()),
            ));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<RuleSpec, ParseError> {
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close() -> Operand {
        Operand::Price(PriceField::Close)
    }

    #[test]
    fn parse_above() {
        let rule = parse("ABOVE(close, 100)").unwrap();
        assert_eq!(
            rule,
            RuleSpec::Above {
                left: close(),
                right: Operand::Constant(100.0)
            }
        );
    }

    #[test]
    fn parse_below_with_indicators() {
        let rule = parse("BELOW(SMA(20), EMA(50))").unwrap();
        assert_eq!(
            rule,
            RuleSpec::Below {
                left: Operand::Indicator(IndicatorType::Sma(20)),
                right: Operand::Indicator(IndicatorType::Ema(50)),
            }
        );
    }

    #[test]
    fn parse_crosses() {
        assert!(matches!(
            parse("CROSS_ABOVE(close, SMA(3))").unwrap(),
            RuleSpec::CrossAbove { .. }
        ));
        assert!(matches!(
            parse("CROSS_BELOW(RSI(14), 30)").unwrap(),
            RuleSpec::CrossBelow { .. }
        ));
    }

    #[test]
    fn parse_composites() {
        let rule = parse("OR(CROSS_BELOW(close, SMA(3)), STOP_LOSS(5))").unwrap();
        assert_eq!(
            rule,
            RuleSpec::Or(vec![
                RuleSpec::CrossBelow {
                    left: close(),
                    right: Operand::Indicator(IndicatorType::Sma(3)),
                },
                RuleSpec::StopLoss(5.0),
            ])
        );

        let rule = parse("AND(TRUE, FALSE, NOT(TRUE))").unwrap();
        assert_eq!(
            rule,
            RuleSpec::And(vec![
                RuleSpec::True,
                RuleSpec::False,
                RuleSpec::Not(Box::new(RuleSpec::True)),
            ])
        );

        let rule = parse("XOR(TRUE, STOP_GAIN(2.5))").unwrap();
        assert_eq!(
            rule,
            RuleSpec::Xor(Box::new(RuleSpec::True), Box::new(RuleSpec::StopGain(2.5)))
        );
    }

    #[test]
    fn parse_trend_rules() {
        assert_eq!(
            parse("IS_RISING(close, 3)").unwrap(),
            RuleSpec::IsRising {
                operand: close(),
                bar_count: 3,
                min_strength: None,
            }
        );
        assert_eq!(
            parse("IS_FALLING(OBV, 5, 0.6)").unwrap(),
            RuleSpec::IsFalling {
                operand: Operand::Indicator(IndicatorType::Obv),
                bar_count: 5,
                min_strength: Some(0.6),
            }
        );
    }

    #[test]
    fn parse_whitespace_handling() {
        let rule = parse("  ABOVE  (  close  ,  100  )  ").unwrap();
        assert!(matches!(rule, RuleSpec::Above { .. }));
    }

    #[test]
    fn parse_price_fields() {
        for (input, expected) in [
            ("ABOVE(open, 1)", PriceField::Open),
            ("ABOVE(high, 1)", PriceField::High),
            ("ABOVE(low, 1)", PriceField::Low),
            ("ABOVE(close, 1)", PriceField::Close),
            ("ABOVE(volume, 1)", PriceField::Volume),
            ("ABOVE(typical, 1)", PriceField::Typical),
            ("ABOVE(median, 1)", PriceField::Median),
        ] {
            match parse(input).unwrap() {
                RuleSpec::Above { left, .. } => assert_eq!(left, Operand::Price(expected)),
                other => panic!("expected Above rule, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_all_indicators() {
        for (text, expected) in [
            ("SMA(20)", IndicatorType::Sma(20)),
            ("EMA(20)", IndicatorType::Ema(20)),
            ("WMA(20)", IndicatorType::Wma(20)),
            ("HMA(9)", IndicatorType::Hma(9)),
            ("MMA(14)", IndicatorType::Mma(14)),
            ("RSI(14)", IndicatorType::Rsi(14)),
            ("ROC(10)", IndicatorType::Roc(10)),
            ("ATR(14)", IndicatorType::Atr(14)),
            ("TR", IndicatorType::TrueRange),
            ("STDDEV(20)", IndicatorType::Stddev(20)),
            ("CCI(20)", IndicatorType::Cci(20)),
            ("OBV", IndicatorType::Obv),
            ("VWAP(14)", IndicatorType::Vwap(14)),
            ("HIGHEST(5)", IndicatorType::Highest(5)),
            ("LOWEST(5)", IndicatorType::Lowest(5)),
            ("STOCHASTIC_K(14)", IndicatorType::StochasticK(14)),
            ("WILLIAMS_R(14)", IndicatorType::WilliamsR(14)),
            ("MACD(12, 26)", IndicatorType::Macd { fast: 12, slow: 26 }),
            (
                "MACD_SIGNAL(12,26,9)",
                IndicatorType::MacdSignal {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
            ),
            (
                "MACD_HISTOGRAM(12,26,9)",
                IndicatorType::MacdHistogram {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
            ),
            (
                "BOLLINGER_UPPER(20, 2.5)",
                IndicatorType::BollingerUpper {
                    period: 20,
                    k_x100: 250,
                },
            ),
            ("BOLLINGER_MIDDLE(20)", IndicatorType::BollingerMiddle(20)),
            (
                "BOLLINGER_LOWER(20, 2)",
                IndicatorType::BollingerLower {
                    period: 20,
                    k_x100: 200,
                },
            ),
        ] {
            let rule = parse(&format!("ABOVE({text}, 0)")).unwrap();
            match rule {
                RuleSpec::Above { left, .. } => assert_eq!(left, Operand::Indicator(expected)),
                other => panic!("expected Above rule, got {other:?}"),
            }
        }
    }

    #[test]
    fn display_round_trips_through_parser() {
        let text = "AND(CROSS_ABOVE(close, SMA(3)), IS_RISING(MACD(12,26), 3, 0.5))";
        let rule = parse(text).unwrap();
        assert_eq!(parse(&rule.to_string()).unwrap(), rule);
    }

    #[test]
    fn parse_negative_numbers() {
        match parse("ABOVE(close, -100.5)").unwrap() {
            RuleSpec::Above {
                right: Operand::Constant(v),
                ..
            } => assert!((v - (-100.5)).abs() < f64::EPSILON),
            other => panic!("expected Above rule, got {other:?}"),
        }
    }

    #[test]
    fn error_unexpected_token() {
        let err = parse("ABOVE(close, )").unwrap_err();
        assert!(err.message.contains("expected"));
        assert_eq!(err.position, 13);
    }

    #[test]
    fn error_missing_paren() {
        let err = parse("ABOVE(close, 100").unwrap_err();
        assert!(err.message.contains("expected ')'"));
        assert_eq!(err.position, 16);
    }

    #[test]
    fn error_unknown_rule_and_indicator() {
        let err = parse("INVALID(close, 100)").unwrap_err();
        assert!(err.message.contains("expected rule"));
        assert_eq!(err.position, 0);

        let err = parse("ABOVE(FOO(3), 1)").unwrap_err();
        assert!(err.message.contains("expected operand, found 'FOO'"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn error_zero_period() {
        let err = parse("ABOVE(SMA(0), 1)").unwrap_err();
        assert!(err.message.contains("at least 1"));
        assert_eq!(err.position, 10);
    }

    #[test]
    fn band_multiplier_keeps_two_decimals() {
        match parse("ABOVE(BOLLINGER_UPPER(20, 2.25), close)").unwrap() {
            RuleSpec::Above { left, .. } => assert_eq!(
                left,
                Operand::Indicator(IndicatorType::BollingerUpper {
                    period: 20,
                    k_x100: 225
                })
            ),
            other => panic!("expected Above rule, got {other:?}"),
        }

        let err = parse("ABOVE(BOLLINGER_UPPER(20, 2.125), close)").unwrap_err();
        assert!(err.message.contains("2 decimals"), "{}", err.message);
        assert_eq!(err.position, 26);

        let err = parse("ABOVE(close, BOLLINGER_LOWER(20, 99999999999))").unwrap_err();
        assert!(err.message.contains("too large"), "{}", err.message);
    }

    #[test]
    fn error_negative_stop() {
        let err = parse("STOP_LOSS(-5)").unwrap_err();
        assert!(err.message.contains(">= 0"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("ABOVE(close, 100) garbage").unwrap_err();
        assert!(err.message.contains("unexpected input"));
        assert_eq!(err.position, 18);
    }

    #[test]
    fn error_missing_comma() {
        let err = parse("ABOVE(close 100)").unwrap_err();
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn error_single_rule_lists() {
        let err = parse("AND(TRUE)").unwrap_err();
        assert!(err.message.contains("AND requires at least 2 rules"));
        let err = parse("OR(FALSE)").unwrap_err();
        assert!(err.message.contains("OR requires at least 2 rules"));
        assert!(parse("XOR(TRUE)").is_err());
    }

    #[test]
    fn error_display_with_context() {
        let input = "CROSS_ABOVE(SMA(20), , SMA(50))";
        let err = parse(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains('^'));
        assert!(ctx.contains("position"));
    }

    #[test]
    fn case_sensitive_keywords() {
        let err = parse("above(close, 100)").unwrap_err();
        assert!(err.message.contains("expected rule"));
        let err = parse("ABOVE(CLOSE, 100)").unwrap_err();
        assert!(err.message.contains("expected operand"));
    }

    #[test]
    fn keyword_prefix_is_not_a_keyword() {
        assert!(parse("TRUEX").is_err());
        assert!(parse("ABOVE(closed, 1)").is_err());
    }

    #[test]
    fn error_empty_input() {
        let err = parse("").unwrap_err();
        assert!(err.message.contains("expected rule"));
        assert_eq!(err.position, 0);
        assert!(parse("   ").is_err());
    }
}
