//! Remote record types, one per resource.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Concept UUID reserved for "an order was executed" observations.
///
/// Such observations carry the executed order's UUID as their value.
pub const ORDER_EXECUTED_CONCEPT_UUID: &str = "buendia-concept-order_executed";

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// User UUID.
    pub uuid: String,
    /// Display name.
    pub full_name: String,
}

/// A node in the location tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocation {
    /// Location UUID.
    pub uuid: String,
    /// Parent location, `None` for the root.
    #[serde(default)]
    pub parent_uuid: Option<String>,
    /// Localized names keyed by locale.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// A clinical concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConcept {
    /// Concept UUID.
    pub uuid: String,
    /// Numeric id used by data-entry forms.
    pub xform_id: i64,
    /// Value type, e.g. `numeric`, `coded`, `text`.
    pub concept_type: String,
    /// Localized names keyed by locale.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// One section of a chart layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSection {
    /// Section UUID; sections without one are skipped.
    #[serde(default)]
    pub uuid: Option<String>,
    /// Concepts shown in this section, in display order.
    #[serde(default)]
    pub concept_uuids: Vec<String>,
}

/// A chart layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChart {
    /// Chart UUID.
    pub uuid: String,
    /// Sections in display order.
    #[serde(default)]
    pub sections: Vec<ChartSection>,
}

/// A patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePatient {
    /// Patient UUID.
    pub uuid: String,
    /// Human-facing patient identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Given name.
    #[serde(default)]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub family_name: Option<String>,
    /// Sex code (`M`, `F`, `U`).
    #[serde(default)]
    pub sex: Option<String>,
    /// Birthdate as `YYYY-MM-DD`.
    #[serde(default)]
    pub birthdate: Option<String>,
    /// Current location.
    #[serde(default)]
    pub location_uuid: Option<String>,
}

/// A treatment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    /// Order UUID.
    pub uuid: String,
    /// Patient the order is for.
    pub patient_uuid: String,
    /// Free-text instructions.
    pub instructions: String,
    /// Start time in epoch millis.
    pub start_millis: i64,
    /// Stop time in epoch millis, `None` if open-ended.
    #[serde(default)]
    pub stop_millis: Option<i64>,
}

/// A data-entry form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteForm {
    /// Form UUID.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Form version string.
    pub version: String,
}

/// One encounter: observations recorded together for a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEncounter {
    /// Encounter UUID; encounters without one are skipped.
    #[serde(default)]
    pub uuid: Option<String>,
    /// When the encounter happened, in epoch millis.
    #[serde(default)]
    pub timestamp_millis: Option<i64>,
    /// Observed values keyed by concept UUID.
    #[serde(default)]
    pub observations: BTreeMap<String, String>,
    /// Orders executed during this encounter.
    #[serde(default)]
    pub order_uuids: Vec<String>,
}

/// A patient's encounters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePatientRecord {
    /// Patient UUID.
    pub patient_uuid: String,
    /// Encounters in server order.
    #[serde(default)]
    pub encounters: Vec<RemoteEncounter>,
}

/// One page of the incremental observation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationPage {
    /// Records changed since the requested token.
    pub records: Vec<RemotePatientRecord>,
    /// Token to pass as `since` for the next page.
    pub sync_token: String,
    /// Whether more pages follow.
    pub more: bool,
}
