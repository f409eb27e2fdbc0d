//! Rule DSL parser.
//!
//! Recursive descent over the grammar:
//!
//! ```text
//! rule      := CMP '(' operand ',' operand ')'
//!            | 'BETWEEN' '(' operand ',' number ',' number ')'
//!            | ('AND' | 'OR') '(' rule (',' rule)+ ')'
//!            | 'NOT' '(' rule ')'
//!            | ('CONSECUTIVE' | 'ANY_OF') '(' rule ',' integer ')'
//! CMP       := 'ABOVE' | 'BELOW' | 'CROSS_ABOVE' | 'CROSS_BELOW' | 'EQUALS'
//! operand   := number | 'open' | 'high' | 'low' | 'close' | 'volume' | indicator
//! indicator := ('SMA' | 'EMA' | 'RSI' | 'ROC' | 'STDDEV') '(' integer ')'
//!            | 'MACD_' ('LINE' | 'SIGNAL' | 'HISTOGRAM') '(' integer ',' integer ',' integer ')'
//!            | 'BOLLINGER_' ('UPPER' | 'MIDDLE' | 'LOWER') '(' integer ',' number ')'
//! ```
//!
//! Errors carry the byte offset where parsing stopped.

use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::bollinger::multiplier_x100;
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.remaining().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.pos += ch.len_utf8();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// The identifier at the cursor, or the next char / "end of input" for messages.
    fn peek_word(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn describe_next(&self) -> String {
        match (self.peek_word(), self.peek()) {
            ("", Some(ch)) => ch.to_string(),
            ("", None) => "end of input".to_string(),
            (word, _) => word.to_string(),
        }
    }

    fn take_word(&mut self) -> &'a str {
        self.skip_whitespace();
        let word = self.peek_word();
        self.pos += word.len();
        word
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = self.remaining();
        let mut end = 0;
        let mut seen_dot = false;
        let mut digits = 0;
        for (i, ch) in rest.char_indices() {
            match ch {
                '-' if i == 0 => {}
                '.' if !seen_dot => seen_dot = true,
                c if c.is_ascii_digit() => digits += 1,
                _ => break,
            }
            end = i + ch.len_utf8();
        }
        if digits == 0 {
            return Err(self.error("expected number"));
        }
        let text = &rest[..end];
        self.pos += end;
        text.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", text),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected integer"));
        }
        let text = &rest[..end];
        let value = text
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {}", text)))?;
        self.pos += end;
        Ok(value)
    }

    fn parse_indicator(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.take_word();

        let indicator = |indicator_type, field| {
            Ok(Operand::Indicator(IndicatorRef {
                indicator_type,
                field,
            }))
        };

        match name {
            "SMA" | "EMA" | "RSI" | "ROC" | "STDDEV" => {
                self.expect_char('(')?;
                let n = self.parse_integer()?;
                self.expect_char(')')?;
                let t = match name {
                    "SMA" => IndicatorType::Sma(n),
                    "EMA" => IndicatorType::Ema(n),
                    "RSI" => IndicatorType::Rsi(n),
                    "ROC" => IndicatorType::Roc(n),
                    _ => IndicatorType::Stddev(n),
                };
                indicator(t, IndicatorField::Value)
            }
            "MACD_LINE" | "MACD_SIGNAL" | "MACD_HISTOGRAM" => {
                self.expect_char('(')?;
                let fast = self.parse_integer()?;
                self.expect_char(',')?;
                let slow = self.parse_integer()?;
                self.expect_char(',')?;
                let signal = self.parse_integer()?;
                self.expect_char(')')?;
                let field = match name {
                    "MACD_LINE" => IndicatorField::MacdLine,
                    "MACD_SIGNAL" => IndicatorField::MacdSignal,
                    _ => IndicatorField::MacdHistogram,
                };
                indicator(IndicatorType::Macd { fast, slow, signal }, field)
            }
            "BOLLINGER_UPPER" | "BOLLINGER_MIDDLE" | "BOLLINGER_LOWER" => {
                self.expect_char('(')?;
                let period = self.parse_integer()?;
                self.expect_char(',')?;
                let mult_pos = self.pos;
                let mult = self.parse_number()?;
                if mult < 0.0 {
                    return Err(ParseError {
                        message: "bollinger multiplier must be non-negative".to_string(),
                        position: mult_pos,
                    });
                }
                self.expect_char(')')?;
                let field = match name {
                    "BOLLINGER_UPPER" => IndicatorField::BollingerUpper,
                    "BOLLINGER_MIDDLE" => IndicatorField::BollingerMiddle,
                    _ => IndicatorField::BollingerLower,
                };
                indicator(
                    IndicatorType::Bollinger {
                        period,
                        stddev_mult_x100: multiplier_x100(mult),
                    },
                    field,
                )
            }
            _ => {
                self.pos = start;
                Err(self.error(format!("expected indicator, found '{}'", self.describe_next())))
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return self.parse_number().map(Operand::Constant);
        }

        let field = match self.peek_word() {
            "open" => Operand::Open,
            "high" => Operand::High,
            "low" => Operand::Low,
            "close" => Operand::Close,
            "volume" => Operand::Volume,
            _ => return self.parse_indicator(),
        };
        self.take_word();
        Ok(field)
    }

    /// Comma-separated rules up to the closing parenthesis.
    fn parse_rule_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_char('(')?;
        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.pos += 1;
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }
        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword)));
        }
        Ok(rules)
    }

    fn parse_temporal(&mut self) -> Result<(Box<Rule>, usize), ParseError> {
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(',')?;
        let count_pos = self.pos;
        let count = self.parse_integer()?;
        if count == 0 {
            return Err(ParseError {
                message: "count must be at least 1".to_string(),
                position: count_pos,
            });
        }
        self.expect_char(')')?;
        Ok((Box::new(rule), count))
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let keyword = self.take_word();

        match keyword {
            "ABOVE" | "BELOW" | "CROSS_ABOVE" | "CROSS_BELOW" | "EQUALS" => {
                self.expect_char('(')?;
                let left = self.parse_operand()?;
                self.expect_char(',')?;
                let right = self.parse_operand()?;
                self.expect_char(')')?;
                Ok(match keyword {
                    "ABOVE" => Rule::Above { left, right },
                    "BELOW" => Rule::Below { left, right },
                    "CROSS_ABOVE" => Rule::CrossAbove { left, right },
                    "CROSS_BELOW" => Rule::CrossBelow { left, right },
                    _ => Rule::Equals { left, right },
                })
            }
            "BETWEEN" => {
                self.expect_char('(')?;
                let operand = self.parse_operand()?;
                self.expect_char(',')?;
                let lower = self.parse_number()?;
                self.expect_char(',')?;
                let upper = self.parse_number()?;
                self.expect_char(')')?;
                Ok(Rule::Between {
                    operand,
                    lower,
                    upper,
                })
            }
            "AND" => self.parse_rule_list("AND").map(Rule::And),
            "OR" => self.parse_rule_list("OR").map(Rule::Or),
            "NOT" => {
                self.expect_char('(')?;
                let rule = self.parse_rule()?;
                self.expect_char(')')?;
                Ok(Rule::Not(Box::new(rule)))
            }
            "CONSECUTIVE" => {
                let (rule, count) = self.parse_temporal()?;
                Ok(Rule::Consecutive { rule, count })
            }
            "ANY_OF" => {
                let (rule, count) = self.parse_temporal()?;
                Ok(Rule::AnyOf { rule, count })
            }
            _ => {
                self.pos = start;
                Err(self.error(format!("expected rule, found '{}'", self.describe_next())))
            }
        }
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after rule: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    Parser::new(input).parse()
}
