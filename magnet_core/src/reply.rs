//! Reply tokenizer and per-command parsers.
//!
//! Replies are split on single spaces with empty tokens kept, so the supply's
//! double-spaced fields (`MID SETTING:  0.5000 TESLA`) land on fixed indices.
//! Token 0 is always the instrument time.
//!
//! Two failure kinds are kept apart:
//! - `ReplyError::Mismatch`: the line does not have the command's shape
//!   (signature word wrong, token missing or empty, no timestamp). Retryable.
//! - `ReplyError::Value`: the shape is right but a value token is garbage.

use chrono::NaiveTime;

use crate::types::{HeaterStatus, Output, Polarity, RampStatus, Reading};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyError {
    Mismatch,
    Value { index: usize, token: String },
}

/// A tokenized reply line.
#[derive(Debug, Clone)]
pub struct Reply<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> Reply<'a> {
    pub fn new(raw: &'a str) -> Self {
        let line = raw.trim_end_matches(['\r', '\n']);
        Self {
            tokens: line.split(' ').collect(),
        }
    }

    pub fn token(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.iter().all(|t| t.is_empty())
    }

    /// Signature check: token `index` must equal `word`.
    pub fn expect(&self, index: usize, word: &str) -> Result<(), ReplyError> {
        match self.token(index) {
            Some(t) if t == word => Ok(()),
            _ => Err(ReplyError::Mismatch),
        }
    }

    fn present(&self, index: usize) -> Result<&'a str, ReplyError> {
        match self.token(index) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ReplyError::Mismatch),
        }
    }

    /// Finite number at `index`.
    pub fn number(&self, index: usize) -> Result<f64, ReplyError> {
        let tok = self.present(index)?;
        match tok.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.bad_value(index)),
        }
    }

    pub fn timestamp(&self) -> Result<NaiveTime, ReplyError> {
        let tok = self.present(0)?;
        NaiveTime::parse_from_str(tok, "%H:%M:%S").map_err(|_| ReplyError::Mismatch)
    }

    fn bad_value(&self, index: usize) -> ReplyError {
        ReplyError::Value {
            index,
            token: self.token(index).unwrap_or_default().to_string(),
        }
    }

    fn rest_from(&self, index: usize) -> String {
        self.tokens.get(index..).map(|t| t.join(" ")).unwrap_or_default()
    }
}

/// `GET OUTPUT` → `[ts, "OUTPUT:", field, "AMPS", "OUTPUT:", voltage, "VOLTS"]`
pub fn parse_output(raw: &str) -> Result<Reading<Output>, ReplyError> {
    let r = Reply::new(raw);
    r.expect(1, "OUTPUT:")?;
    let ts = r.timestamp()?;
    let field = r.number(2)?;
    let voltage = r.number(5)?;
    Ok(Reading::new(ts, Output { field, voltage }))
}

/// `GET MID`, `GET MAX`, `GET RATE`, `GET HV`: one number at token 4.
pub fn parse_setting(raw: &str) -> Result<Reading<f64>, ReplyError> {
    let r = Reply::new(raw);
    let ts = r.timestamp()?;
    let value = r.number(4)?;
    Ok(Reading::new(ts, value))
}

/// `GET SIGN` → `[ts, "CURRENT", "DIRECTION:", "+"|"-"]`
pub fn parse_polarity(raw: &str) -> Result<Reading<Polarity>, ReplyError> {
    let r = Reply::new(raw);
    r.expect(1, "CURRENT")?;
    r.expect(2, "DIRECTION:")?;
    let ts = r.timestamp()?;
    let tok = r.present(3)?;
    let polarity = Polarity::from_token(tok).ok_or_else(|| r.bad_value(3))?;
    Ok(Reading::new(ts, polarity))
}

/// `HEATER` → `[ts, "HEATER", "STATUS:", "ON"|"OFF"]` or
/// `[ts, "HEATER", "STATUS:", "SWITCHED", "ON"|"OFF", "AT", field, "TESLA"]`.
///
/// `SWITCHED OFF AT f` with `f > 0` means the magnet is persistent at `f`.
pub fn parse_heater(raw: &str) -> Result<Reading<HeaterStatus>, ReplyError> {
    let r = Reply::new(raw);
    r.expect(1, "HEATER")?;
    r.expect(2, "STATUS:")?;
    let ts = r.timestamp()?;
    let status = match r.present(3)? {
        "ON" => HeaterStatus::on(),
        "OFF" => HeaterStatus::off(),
        "SWITCHED" => match r.present(4)? {
            "ON" => HeaterStatus::on(),
            "OFF" => {
                let field = r.number(6)?;
                if field > 0.0 {
                    HeaterStatus::persistent(field)
                } else {
                    HeaterStatus::off()
                }
            }
            _ => return Err(r.bad_value(4)),
        },
        _ => return Err(r.bad_value(3)),
    };
    Ok(Reading::new(ts, status))
}

/// Acknowledgement of `HEATER ON` / `HEATER OFF`: signature `tok[1] == "HEATER"`.
///
/// Returns the switch state the supply reported, when the reply carries one.
pub fn parse_heater_ack(raw: &str) -> Result<Option<bool>, ReplyError> {
    let r = Reply::new(raw);
    r.expect(1, "HEATER")?;
    let word = match r.token(3) {
        Some("SWITCHED") => r.token(4),
        other => other,
    };
    Ok(match word {
        Some("ON") => Some(true),
        Some("OFF") => Some(false),
        _ => None,
    })
}

/// `RAMP STATUS` → `[ts, "RAMP", "STATUS:", state, ...]`
/// - `HOLDING ON TARGET AT f TESLA`: field = tok[7]
/// - `RAMPING FROM f TO t TESLA`: field = tok[5], target = tok[7]
/// - anything else becomes `Other` with the words from token 3 on.
pub fn parse_ramp_status(raw: &str) -> Result<Reading<RampStatus>, ReplyError> {
    let r = Reply::new(raw);
    r.expect(1, "RAMP")?;
    r.expect(2, "STATUS:")?;
    let ts = r.timestamp()?;
    let status = match r.present(3)? {
        "HOLDING" => RampStatus::holding(r.number(7)?),
        "RAMPING" => RampStatus::ramping(r.number(5)?, r.number(7)?),
        _ => RampStatus::other(r.rest_from(3)),
    };
    Ok(Reading::new(ts, status))
}

/// Whether `raw` parses as any known reply shape.
pub fn parse_any(raw: &str) -> bool {
    parse_output(raw).is_ok()
        || parse_setting(raw).is_ok()
        || parse_polarity(raw).is_ok()
        || parse_heater(raw).is_ok()
        || parse_heater_ack(raw).is_ok()
        || parse_ramp_status(raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_keep_empty_fields() {
        let r = Reply::new("12:00:00 MID SETTING:  0.5000 TESLA\r\n");
        assert_eq!(r.len(), 6);
        assert_eq!(r.token(3), Some(""));
        assert_eq!(r.token(4), Some("0.5000"));
    }

    #[test]
    fn empty_value_token_is_a_shape_problem() {
        assert_eq!(
            parse_setting("12:00:00 MID SETTING: 0.5000 TESLA"),
            Err(ReplyError::Value {
                index: 4,
                token: "TESLA".into()
            })
        );
        assert_eq!(
            parse_setting("12:00:00 MID SETTING:  "),
            Err(ReplyError::Mismatch)
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let err = parse_output("12:00:00 OUTPUT: NaN AMPS OUTPUT: 0.0 VOLTS").unwrap_err();
        assert_eq!(
            err,
            ReplyError::Value {
                index: 2,
                token: "NaN".into()
            }
        );
    }
}
