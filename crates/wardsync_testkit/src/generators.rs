//! Property-based test generators using proptest.
//!
//! UUIDs are drawn from a deliberately small pool so that generated local
//! and remote sets overlap often enough to exercise updates as well as
//! inserts and deletes.

use proptest::prelude::*;
use std::collections::BTreeMap;
use uuid::Uuid;
use wardsync_protocol::{RemoteLocation, RemotePatient};
use wardsync_store::Row;

/// Strategy for UUIDs from a pool of 16.
pub fn pooled_uuid_strategy() -> impl Strategy<Value = String> {
    (0u128..16).prop_map(|n| Uuid::from_u128(n + 1).to_string())
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,8}").expect("Invalid regex")
}

/// Strategy for a patient with a pooled UUID.
pub fn patient_strategy() -> impl Strategy<Value = RemotePatient> {
    (
        pooled_uuid_strategy(),
        name_strategy(),
        prop::option::of(name_strategy()),
        prop::option::of(prop::sample::select(vec!["F", "M", "U"])),
    )
        .prop_map(|(uuid, given_name, family_name, sex)| RemotePatient {
            uuid,
            id: None,
            given_name: Some(given_name),
            family_name,
            sex: sex.map(str::to_owned),
            birthdate: None,
            location_uuid: None,
        })
}

/// Strategy for a set of patients with distinct UUIDs.
pub fn patient_set_strategy() -> impl Strategy<Value = Vec<RemotePatient>> {
    prop::collection::vec(patient_strategy(), 0..12).prop_map(|patients| {
        let mut by_uuid = BTreeMap::new();
        for patient in patients {
            by_uuid.insert(patient.uuid.clone(), patient);
        }
        by_uuid.into_values().collect()
    })
}

/// Strategy for a set of locations with distinct UUIDs and small name maps.
pub fn location_set_strategy() -> impl Strategy<Value = Vec<RemoteLocation>> {
    let names = prop::collection::btree_map(
        prop::sample::select(vec!["en", "fr", "es"]).prop_map(str::to_owned),
        name_strategy(),
        0..3,
    );
    prop::collection::vec(
        (
            pooled_uuid_strategy(),
            prop::option::of(pooled_uuid_strategy()),
            names,
        ),
        0..10,
    )
    .prop_map(|locations| {
        let mut by_uuid = BTreeMap::new();
        for (uuid, parent_uuid, names) in locations {
            by_uuid.insert(
                uuid.clone(),
                RemoteLocation {
                    uuid,
                    parent_uuid,
                    names,
                },
            );
        }
        by_uuid.into_values().collect()
    })
}

/// The row shape the patients phase stores.
pub fn patient_row(patient: &RemotePatient) -> Row {
    Row::new()
        .with("uuid", patient.uuid.as_str())
        .with("id", patient.id.clone())
        .with("given_name", patient.given_name.clone())
        .with("family_name", patient.family_name.clone())
        .with("sex", patient.sex.clone())
        .with("birthdate", patient.birthdate.clone())
        .with("location_uuid", patient.location_uuid.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn pooled_uuids_parse(uuid in pooled_uuid_strategy()) {
            prop_assert!(Uuid::parse_str(&uuid).is_ok());
        }

        #[test]
        fn patient_sets_have_distinct_uuids(patients in patient_set_strategy()) {
            let uuids: HashSet<_> = patients.iter().map(|p| p.uuid.clone()).collect();
            prop_assert_eq!(uuids.len(), patients.len());
        }
    }
}
