//! Schedule parsing.
//!
//! Turns a schedule specification into a [`Schedule`] that can be asked for
//! its next occurrence. Three input forms are accepted:
//! - cron expressions, with or without a leading seconds field
//! - recurring phrases such as `every 5 seconds` or `every minute`
//! - one-shot phrases such as `at 6:00 am`
//!
//! Phrases are translated to the equivalent six-field cron expression, so
//! `every 5 seconds` fires on wall-clock seconds divisible by five rather than
//! five seconds after registration.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::jobs::error::{SchedulerError, SchedulerResult};

static EVERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^every(?:\s+(\d+))?\s+(second|minute|hour|day)s?$")
        .expect("recurring phrase pattern is valid")
});

static AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").expect("one-shot phrase pattern is valid")
});

/// Schedule as written in a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleSpec {
    /// Textual phrase: `every 5 seconds`, `at 6:00 am`, ...
    Text(String),
    /// Cron expression; `seconds` tells whether the first field is seconds.
    Cron {
        cron: String,
        #[serde(default)]
        seconds: bool,
    },
}

impl ScheduleSpec {
    pub fn text(phrase: impl Into<String>) -> Self {
        Self::Text(phrase.into())
    }

    pub fn cron(expression: impl Into<String>, seconds: bool) -> Self {
        Self::Cron {
            cron: expression.into(),
            seconds,
        }
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleSpec::Text(phrase) => write!(f, "{}", phrase),
            ScheduleSpec::Cron { cron, .. } => write!(f, "{}", cron),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    Recurring,
    OneShot,
}

/// Parsed, re-evaluatable schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    kind: ScheduleKind,
    expression: String,
    cron: cron::Schedule,
}

impl Schedule {
    pub fn parse(spec: &ScheduleSpec) -> SchedulerResult<Self> {
        match spec {
            ScheduleSpec::Text(phrase) => Self::from_phrase(phrase),
            ScheduleSpec::Cron { cron, seconds } => Self::from_cron(cron, *seconds),
        }
    }

    /// Parse a cron expression. Without a seconds field the expression must
    /// have five fields and fires at second zero.
    pub fn from_cron(expression: &str, has_seconds: bool) -> SchedulerResult<Self> {
        let fields = expression.split_whitespace().count();
        let normalized = match (has_seconds, fields) {
            (false, 5) => format!("0 {}", expression.trim()),
            (true, 6) | (true, 7) => expression.trim().to_string(),
            (false, n) => {
                return Err(SchedulerError::schedule_parse(
                    expression,
                    format!("expected 5 fields without seconds, got {}", n),
                ));
            }
            (true, n) => {
                return Err(SchedulerError::schedule_parse(
                    expression,
                    format!("expected 6 or 7 fields with seconds, got {}", n),
                ));
            }
        };

        Self::build(ScheduleKind::Recurring, expression, normalized)
    }

    /// Parse a textual recurring (`every ...`) or one-shot (`at ...`) phrase.
    pub fn from_phrase(phrase: &str) -> SchedulerResult<Self> {
        let normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if let Some(caps) = EVERY_RE.captures(&normalized) {
            let step = match caps.get(1) {
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map_err(|e| SchedulerError::schedule_parse(phrase, e.to_string()))?,
                None => 1,
            };
            let unit = &caps[2];
            let (max, expression) = match unit {
                "second" => (59, format!("*/{} * * * * *", step)),
                "minute" => (59, format!("0 */{} * * * *", step)),
                "hour" => (23, format!("0 0 */{} * * *", step)),
                _ => (31, format!("0 0 0 */{} * *", step)),
            };
            if step == 0 || step > max {
                return Err(SchedulerError::schedule_parse(
                    phrase,
                    format!("{} step must be between 1 and {}", unit, max),
                ));
            }
            return Self::build(ScheduleKind::Recurring, phrase, expression);
        }

        if let Some(caps) = AT_RE.captures(&normalized) {
            let hour: u32 = caps[1]
                .parse()
                .map_err(|_| SchedulerError::schedule_parse(phrase, "invalid hour"))?;
            let minute: u32 = match caps.get(2) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| SchedulerError::schedule_parse(phrase, "invalid minute"))?,
                None => 0,
            };
            let hour = match caps.get(3).map(|m| m.as_str()) {
                Some(meridiem) => {
                    if !(1..=12).contains(&hour) {
                        return Err(SchedulerError::schedule_parse(
                            phrase,
                            "hour must be between 1 and 12 with am/pm",
                        ));
                    }
                    match (meridiem, hour) {
                        ("am", 12) => 0,
                        ("am", h) => h,
                        ("pm", 12) => 12,
                        (_, h) => h + 12,
                    }
                }
                None => hour,
            };
            if hour > 23 || minute > 59 {
                return Err(SchedulerError::schedule_parse(phrase, "time of day out of range"));
            }
            return Self::build(
                ScheduleKind::OneShot,
                phrase,
                format!("0 {} {} * * *", minute, hour),
            );
        }

        Err(SchedulerError::schedule_parse(
            phrase,
            "expected 'every <n> <unit>' or 'at <hh:mm> [am|pm]'",
        ))
    }

    fn build(kind: ScheduleKind, source: &str, expression: String) -> SchedulerResult<Self> {
        let cron = cron::Schedule::from_str(&expression)
            .map_err(|e| SchedulerError::schedule_parse(source, e.to_string()))?;
        Ok(Self {
            kind,
            expression,
            cron,
        })
    }

    /// First occurrence strictly after `after`, if the schedule has one.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.after(&after).next()
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn is_recurring(&self) -> bool {
        self.kind == ScheduleKind::Recurring
    }

    /// Normalized six-field cron expression this schedule evaluates.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}
