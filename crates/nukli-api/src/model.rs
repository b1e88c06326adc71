// Vendor-defined protocol types.
//
// The bridge API identifies hardware and states with fixed integer codes.
// Codes travel verbatim on the wire (the client neither remaps nor filters
// them); the enums exist for validation and display. `from_repr` returns
// `None` for codes outside the vendor tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hardware class of a paired device; selects which state/action table
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum DeviceType {
    #[strum(serialize = "Smart Lock")]
    Smartlock = 0,
    #[strum(serialize = "Opener")]
    Opener = 2,
    #[strum(serialize = "Smart Door")]
    SmartDoor = 3,
    #[strum(serialize = "Smart Lock 3.0")]
    Smartlock3 = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum LockState {
    Uncalibrated = 0,
    Locked = 1,
    Unlocking = 2,
    Unlocked = 3,
    Locking = 4,
    Unlatched = 5,
    UnlockedLockNGo = 6,
    Unlatching = 7,
    MotorBlocked = 254,
    Undefined = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum DoorSensorState {
    Deactivated = 0,
    Closed = 2,
    Open = 3,
    Unknown = 4,
    Calibrating = 5,
}

/// Actions accepted by smart locks and smart doors. The same codes drive
/// openers with a different meaning (see [`OpenerAction`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum LockAction {
    Unlock = 1,
    Lock = 2,
    Unlatch = 3,
    LockNGo = 4,
    LockNGoWithUnlatch = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum OpenerMode {
    DoorMode = 2,
    ContinuousMode = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum OpenerState {
    Untrained = 0,
    Online = 1,
    RtoActive = 3,
    Open = 5,
    Opening = 7,
    BootRun = 253,
    Undefined = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum OpenerAction {
    ActivateRto = 1,
    DeactivateRto = 2,
    Open = 3,
    ActivateCm = 4,
    DeactivateCm = 5,
}

/// Marketing name for a device, derived from its type and firmware major.
pub fn model_name(device_type: DeviceType, firmware: &[u32]) -> Option<String> {
    match device_type {
        DeviceType::Smartlock | DeviceType::Smartlock3 => {
            firmware.first().map(|major| format!("Smart Lock {major}"))
        }
        DeviceType::Opener => Some("Opener".to_owned()),
        DeviceType::SmartDoor => Some("Smart Door".to_owned()),
    }
}

// ── Bridge identity ─────────────────────────────────────────────────

/// Identity reported by `/info`, captured once by `BridgeClient::init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeIdentity {
    /// Uppercase hex rendering of the bridge's server ID.
    pub id: String,
    /// Firmware version as an ordered sequence of integers.
    pub firmware: Vec<u32>,
}

/// Parse a firmware version out of the `/info` body, accepting both the
/// dotted-string form (`"2.9.3"`) and an array of numbers.
pub(crate) fn firmware_from_value(value: &Value) -> Vec<u32> {
    match value {
        Value::String(s) => s.split('.').filter_map(|part| part.parse().ok()).collect(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|n| u32::try_from(n).ok())
            .collect(),
        _ => Vec::new(),
    }
}

// ── Discovery & callbacks ───────────────────────────────────────────

/// One entry of the cloud directory's bridge list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBridge {
    #[serde(rename = "bridgeId", skip_serializing_if = "Option::is_none")]
    pub bridge_id: Option<u64>,
    pub ip: String,
    pub port: u16,
    #[serde(rename = "dateUpdated", skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<String>,
}

/// One bridge-side callback subscription, as reported by `/callback/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackSubscription {
    pub id: u64,
    pub url: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn device_type_codes_match_the_vendor_table() {
        assert_eq!(DeviceType::from_repr(0), Some(DeviceType::Smartlock));
        assert_eq!(DeviceType::from_repr(2), Some(DeviceType::Opener));
        assert_eq!(DeviceType::from_repr(3), Some(DeviceType::SmartDoor));
        assert_eq!(DeviceType::from_repr(4), Some(DeviceType::Smartlock3));
        // 1 was never assigned.
        assert_eq!(DeviceType::from_repr(1), None);
    }

    #[test]
    fn lock_action_range_is_one_through_five() {
        assert_eq!(LockAction::from_repr(0), None);
        assert_eq!(LockAction::from_repr(1), Some(LockAction::Unlock));
        assert_eq!(
            LockAction::from_repr(5),
            Some(LockAction::LockNGoWithUnlatch)
        );
        assert_eq!(LockAction::from_repr(6), None);
    }

    #[test]
    fn lock_state_includes_the_sentinel_codes() {
        assert_eq!(LockState::from_repr(254), Some(LockState::MotorBlocked));
        assert_eq!(LockState::from_repr(255), Some(LockState::Undefined));
        assert_eq!(LockState::from_repr(8), None);
    }

    #[test]
    fn model_name_uses_the_firmware_major() {
        assert_eq!(
            model_name(DeviceType::Smartlock3, &[3, 5, 7]).as_deref(),
            Some("Smart Lock 3")
        );
        assert_eq!(model_name(DeviceType::Opener, &[]).as_deref(), Some("Opener"));
        assert_eq!(model_name(DeviceType::Smartlock, &[]), None);
    }

    #[test]
    fn firmware_parses_both_wire_shapes() {
        assert_eq!(firmware_from_value(&json!("2.9.3")), vec![2, 9, 3]);
        assert_eq!(firmware_from_value(&json!([1, 22, 0])), vec![1, 22, 0]);
        assert_eq!(firmware_from_value(&json!(null)), Vec::<u32>::new());
    }

    #[test]
    fn discovered_bridge_round_trips_directory_json() {
        let bridge: DiscoveredBridge = serde_json::from_value(json!({
            "bridgeId": 128_521_838u64,
            "ip": "192.168.1.50",
            "port": 8080,
            "dateUpdated": "2024-06-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(bridge.ip, "192.168.1.50");
        assert_eq!(bridge.port, 8080);
        assert_eq!(bridge.bridge_id, Some(128_521_838));
    }
}
