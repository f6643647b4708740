//! Typed views of IP Module payloads
//!
//! The module answers with flat JSON objects using upper-case keys. Every
//! payload is validated here before any of its values are looked at; the
//! enumerated fields are closed Rust enums, so a `StatusResponse` can only
//! exist once `STATUS`, `VERTICAL` and `HORIZONTAL` hold known values.
//! Unknown extra keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which payload a validation failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Status,
    Command,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseKind::Status => write!(f, "status"),
            ResponseKind::Command => write!(f, "command"),
        }
    }
}

/// Payload shape violates the IP Module schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} response: {message}")]
pub struct ValidationError {
    pub kind: ResponseKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ResponseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// `STATUS` field shared by every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleStatus {
    Ok,
    Error,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Ok => "OK",
            ModuleStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lift (vertical axis) position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vertical {
    Up,
    Down,
    Moving,
    Error,
}

/// Swivel (horizontal axis) position. `Na` is reported by lifts without a swivel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Horizontal {
    Left,
    Center,
    Right,
    Moving,
    Na,
    Mem1,
    Mem2,
    Mem3,
}

/// Classification of a single status sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Stationary,
    Moving,
    Error,
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionState::Stationary => write!(f, "STATIONARY"),
            MotionState::Moving => write!(f, "MOVING"),
            MotionState::Error => write!(f, "ERROR"),
        }
    }
}

/// Parse a raw body into JSON, reporting non-JSON as a validation failure
fn parse_body(kind: ResponseKind, body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::new(kind, format!("body is not valid JSON: {}", e)))
}

fn validate<T: for<'de> Deserialize<'de>>(kind: ResponseKind, value: &Value) -> Result<T, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::new(kind, format!("expected a JSON object, got {}", value)));
    }
    T::deserialize(value).map_err(|e| ValidationError::new(kind, e.to_string()))
}

fn describe(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Answer to `GET /api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct StatusResponse {
    status: ModuleStatus,
    vertical: Vertical,
    horizontal: Horizontal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extcmd: Option<Value>,
}

impl StatusResponse {
    pub fn new(status: ModuleStatus, vertical: Vertical, horizontal: Horizontal) -> Self {
        Self {
            status,
            vertical,
            horizontal,
            description: None,
            extcmd: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Value::String(description.into()));
        self
    }

    /// Validate an already decoded JSON payload
    pub fn parse(value: &Value) -> Result<Self, ValidationError> {
        validate(ResponseKind::Status, value)
    }

    /// Validate a raw HTTP body
    pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
        Self::parse(&parse_body(ResponseKind::Status, body)?)
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn vertical(&self) -> Vertical {
        self.vertical
    }

    pub fn horizontal(&self) -> Horizontal {
        self.horizontal
    }

    pub fn description(&self) -> Option<String> {
        describe(&self.description)
    }

    /// Firmware specific extension data, passed through untouched
    pub fn extcmd(&self) -> Option<&Value> {
        self.extcmd.as_ref()
    }

    pub fn ok(&self) -> bool {
        self.status == ModuleStatus::Ok
    }

    pub fn not_ok(&self) -> bool {
        self.status == ModuleStatus::Error
    }

    pub fn moving(&self) -> bool {
        self.vertical == Vertical::Moving || self.horizontal == Horizontal::Moving
    }

    pub fn not_moving(&self) -> bool {
        !self.moving()
    }

    // Horizontal positions are LEFT/CENTER/RIGHT and never count as up or down.
    pub fn up(&self) -> bool {
        self.vertical == Vertical::Up
    }

    pub fn down(&self) -> bool {
        self.vertical == Vertical::Down
    }

    pub fn motion_state(&self) -> MotionState {
        if self.not_ok() {
            MotionState::Error
        } else if self.moving() {
            MotionState::Moving
        } else {
            MotionState::Stationary
        }
    }
}

/// Answer to `POST /api/command`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CommandResponse {
    status: ModuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<Value>,
}

impl CommandResponse {
    pub fn parse(value: &Value) -> Result<Self, ValidationError> {
        validate(ResponseKind::Command, value)
    }

    pub fn from_body(body: &[u8]) -> Result<Self, ValidationError> {
        Self::parse(&parse_body(ResponseKind::Command, body)?)
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn description(&self) -> Option<String> {
        describe(&self.description)
    }

    pub fn ok(&self) -> bool {
        self.status == ModuleStatus::Ok
    }

    pub fn not_ok(&self) -> bool {
        self.status == ModuleStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_predicates_up() {
        let status = StatusResponse::parse(&json!({
            "STATUS": "OK", "VERTICAL": "UP", "HORIZONTAL": "NA"
        }))
        .unwrap();
        assert!(status.ok());
        assert!(status.up());
        assert!(!status.down());
        assert!(!status.moving());
        assert_eq!(status.motion_state(), MotionState::Stationary);
    }

    #[test]
    fn test_status_predicates_moving() {
        let vertical = StatusResponse::parse(&json!({
            "STATUS": "OK", "VERTICAL": "MOVING", "HORIZONTAL": "NA"
        }))
        .unwrap();
        assert!(vertical.moving());
        assert!(!vertical.up());
        assert!(!vertical.down());
        assert_eq!(vertical.motion_state(), MotionState::Moving);

        let horizontal = StatusResponse::parse(&json!({
            "STATUS": "OK", "VERTICAL": "DOWN", "HORIZONTAL": "MOVING"
        }))
        .unwrap();
        assert!(horizontal.moving());
        assert!(horizontal.down());
    }

    #[test]
    fn test_swivel_positions_are_not_up() {
        for horizontal in ["LEFT", "CENTER", "RIGHT", "MEM1", "MEM2", "MEM3"] {
            let status = StatusResponse::parse(&json!({
                "STATUS": "OK", "VERTICAL": "ERROR", "HORIZONTAL": horizontal
            }))
            .unwrap();
            assert!(!status.up(), "{} counted as up", horizontal);
            assert!(!status.down(), "{} counted as down", horizontal);
            assert!(!status.moving());
        }
    }

    #[test]
    fn test_error_status_classifies_as_error() {
        let status = StatusResponse::parse(&json!({
            "STATUS": "ERROR", "VERTICAL": "MOVING", "HORIZONTAL": "NA", "DESCRIPTION": "Overcurrent"
        }))
        .unwrap();
        assert!(status.not_ok());
        assert_eq!(status.motion_state(), MotionState::Error);
        assert_eq!(status.description().as_deref(), Some("Overcurrent"));
    }

    #[test]
    fn test_missing_status_fails() {
        let err = StatusResponse::parse(&json!({"VERTICAL": "UP", "HORIZONTAL": "NA"})).unwrap_err();
        assert_eq!(err.kind, ResponseKind::Status);
        assert!(err.message.contains("STATUS"));

        let err = CommandResponse::parse(&json!({"DESCRIPTION": "nothing"})).unwrap_err();
        assert_eq!(err.kind, ResponseKind::Command);
    }

    #[test]
    fn test_out_of_set_values_fail() {
        for payload in [
            json!({"STATUS": "FINE", "VERTICAL": "UP", "HORIZONTAL": "NA"}),
            json!({"STATUS": "ok", "VERTICAL": "UP", "HORIZONTAL": "NA"}),
            json!({"STATUS": "OK", "VERTICAL": "SIDEWAYS", "HORIZONTAL": "NA"}),
            json!({"STATUS": "OK", "VERTICAL": "UP", "HORIZONTAL": "UP"}),
            json!({"STATUS": "OK", "VERTICAL": 1, "HORIZONTAL": "NA"}),
            json!({"STATUS": "OK", "HORIZONTAL": "NA"}),
            json!({"STATUS": "OK", "VERTICAL": "UP"}),
        ] {
            assert!(StatusResponse::parse(&payload).is_err(), "accepted {}", payload);
        }
        assert!(CommandResponse::parse(&json!({"STATUS": "MAYBE"})).is_err());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let status = StatusResponse::parse(&json!({
            "STATUS": "OK", "VERTICAL": "DOWN", "HORIZONTAL": "CENTER",
            "EXTCMD": {"LED": 1}, "FIRMWARE": "2.1"
        }))
        .unwrap();
        assert!(status.down());
        assert_eq!(status.extcmd(), Some(&json!({"LED": 1})));

        let command = CommandResponse::parse(&json!({"STATUS": "OK", "UPTIME": 12})).unwrap();
        assert!(command.ok());
        assert_eq!(command.description(), None);
    }

    #[test]
    fn test_non_object_bodies_fail() {
        let err = StatusResponse::from_body(b"<html>busy</html>").unwrap_err();
        assert!(err.message.contains("not valid JSON"));

        let err = CommandResponse::from_body(b"[\"OK\"]").unwrap_err();
        assert!(err.message.contains("expected a JSON object"));
    }

    #[test]
    fn test_non_string_description_is_rendered() {
        let command = CommandResponse::from_body(br#"{"STATUS": "ERROR", "DESCRIPTION": 17}"#).unwrap();
        assert!(command.not_ok());
        assert_eq!(command.description().as_deref(), Some("17"));
    }
}
