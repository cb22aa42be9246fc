//! Observations: append-only, fetched incrementally by bookmark.
//!
//! Each remote encounter is decomposed into one row per observed concept,
//! plus one row per executed order under [`ORDER_EXECUTED_CONCEPT_UUID`]
//! with the order UUID as the value. Rows are keyed by
//! `(patient_uuid, encounter_uuid, concept_uuid)`; order-executed rows add
//! the value to the key since one encounter may execute several orders.
//! Stored rows are never updated or deleted here.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::bookkeeping::{bookmark, set_bookmark_op};
use crate::error::SyncResult;
use crate::reconcile::AppendSet;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_protocol::{RemotePatientRecord, ORDER_EXECUTED_CONCEPT_UUID};
use wardsync_store::{Filter, Row, Table};

const OBSERVATION_KEY: [&str; 3] = ["patient_uuid", "encounter_uuid", "concept_uuid"];
const ORDER_EXECUTED_KEY: [&str; 4] = ["patient_uuid", "encounter_uuid", "concept_uuid", "value"];

/// Pulls new observations from the incremental feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationsWorker;

fn is_order_executed(row: &Row) -> bool {
    row.text("concept_uuid") == Some(ORDER_EXECUTED_CONCEPT_UUID)
}

/// Decomposes patient records into observation rows.
///
/// Encounters without a UUID or timestamp are skipped and counted.
fn observation_rows(
    records: Vec<RemotePatientRecord>,
    report: &mut SyncReport,
) -> SyncResult<Vec<Row>> {
    let mut rows = Vec::new();
    for record in records {
        require_uuid("observations", &record.patient_uuid)?;
        for encounter in record.encounters {
            let (Some(encounter_uuid), Some(millis)) = (
                encounter.uuid.filter(|u| !u.is_empty()),
                encounter.timestamp_millis,
            ) else {
                tracing::error!(
                    patient = %record.patient_uuid,
                    "encounter without uuid or timestamp; skipping"
                );
                report.num_skipped += 1;
                continue;
            };

            let base = Row::new()
                .with("patient_uuid", record.patient_uuid.as_str())
                .with("encounter_uuid", encounter_uuid.as_str())
                .with("encounter_time", millis / 1000);
            for (concept_uuid, value) in encounter.observations {
                rows.push(
                    base.clone()
                        .with("concept_uuid", concept_uuid)
                        .with("value", value),
                );
            }
            for order_uuid in encounter.order_uuids {
                rows.push(
                    base.clone()
                        .with("concept_uuid", ORDER_EXECUTED_CONCEPT_UUID)
                        .with("value", order_uuid),
                );
            }
        }
    }
    Ok(rows)
}

impl PhaseWorker for ObservationsWorker {
    fn phase(&self) -> Phase {
        Phase::Observations
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let mut token = bookmark(ctx.store, Table::Observations)?;
        let (local_executed, local_observed): (Vec<Row>, Vec<Row>) = ctx
            .store
            .query(Table::Observations, &Filter::all())?
            .into_iter()
            .partition(is_order_executed);
        let mut observed_set =
            AppendSet::new(Table::Observations, &OBSERVATION_KEY, &local_observed, report);
        let mut executed_set =
            AppendSet::new(Table::Observations, &ORDER_EXECUTED_KEY, &local_executed, report);

        let mut pages = 0;
        loop {
            tracing::debug!(since = ?token, "fetching observation page");
            let page = ctx.remote.list_observations(token.as_deref())?;
            pages += 1;

            let (executed, observed): (Vec<Row>, Vec<Row>) =
                observation_rows(page.records, report)?
                    .into_iter()
                    .partition(is_order_executed);

            let mut ops = observed_set.append(observed, report);
            ops.extend(executed_set.append(executed, report));
            ops.push(set_bookmark_op(Table::Observations, &page.sync_token));
            apply(ctx.store, Table::Observations, &ops)?;
            token = Some(page.sync_token);

            if !page.more {
                break;
            }
            if pages >= ctx.config.max_observation_pages {
                tracing::warn!(pages, "observation page limit reached; resuming next sync");
                break;
            }
        }
        tracing::info!(pages, "observations up to date");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wardsync_protocol::RemoteEncounter;

    fn encounter(uuid: Option<&str>, millis: Option<i64>, orders: &[&str]) -> RemoteEncounter {
        RemoteEncounter {
            uuid: uuid.map(str::to_owned),
            timestamp_millis: millis,
            observations: BTreeMap::from([("temp".to_owned(), "38.5".to_owned())]),
            order_uuids: orders.iter().map(|o| (*o).to_owned()).collect(),
        }
    }

    #[test]
    fn encounters_are_decomposed() {
        let records = vec![RemotePatientRecord {
            patient_uuid: "p1".into(),
            encounters: vec![
                encounter(Some("e1"), Some(1_500_000), &["o1", "o2"]),
                encounter(None, Some(1_000), &[]),
                encounter(Some("e3"), None, &[]),
            ],
        }];
        let mut report = SyncReport::new();
        let rows = observation_rows(records, &mut report).unwrap();

        assert_eq!(report.num_skipped, 2);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text("value"), Some("38.5"));
        assert_eq!(
            rows[0].get("encounter_time").and_then(|v| v.as_integer()),
            Some(1_500)
        );
        assert!(is_order_executed(&rows[1]));
        assert_eq!(rows[2].text("value"), Some("o2"));
    }
}
