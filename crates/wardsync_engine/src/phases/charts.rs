//! Chart layouts: flattened to one row per concept and replaced wholesale.

use super::{apply, require_uuid, PhaseContext, PhaseWorker};
use crate::error::SyncResult;
use crate::reconcile::full_replace;
use crate::report::SyncReport;
use crate::request::Phase;
use wardsync_protocol::RemoteChart;
use wardsync_store::{Filter, Row, Table};

/// Replaces the chart item table with the server's chart layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartsWorker;

/// Flattens charts into `(chart_uuid, chart_row, group_uuid, concept_uuid)`
/// rows. `chart_row` numbers rows in display order across all charts.
fn chart_rows(charts: Vec<RemoteChart>, report: &mut SyncReport) -> SyncResult<Vec<Row>> {
    let mut rows = Vec::new();
    let mut chart_row: i64 = 0;
    for chart in charts {
        require_uuid("charts", &chart.uuid)?;
        for section in chart.sections {
            let Some(group_uuid) = section.uuid.filter(|u| !u.is_empty()) else {
                tracing::error!(chart = %chart.uuid, "chart section has no uuid; skipping");
                report.num_skipped += 1;
                continue;
            };
            for concept_uuid in section.concept_uuids {
                rows.push(
                    Row::new()
                        .with("chart_uuid", chart.uuid.as_str())
                        .with("chart_row", chart_row)
                        .with("group_uuid", group_uuid.as_str())
                        .with("concept_uuid", concept_uuid),
                );
                chart_row += 1;
            }
        }
    }
    Ok(rows)
}

impl PhaseWorker for ChartsWorker {
    fn phase(&self) -> Phase {
        Phase::ChartItems
    }

    fn sync(&self, ctx: &PhaseContext<'_>, report: &mut SyncReport) -> SyncResult<()> {
        let rows = chart_rows(ctx.remote.list_charts()?, report)?;
        let local_count = ctx.store.query(Table::ChartItems, &Filter::all())?.len();
        tracing::info!(local = local_count, remote = rows.len(), "replacing chart items");
        let ops = full_replace(Table::ChartItems, local_count, rows, report);
        apply(ctx.store, Table::ChartItems, &ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardsync_protocol::ChartSection;

    #[test]
    fn rows_are_numbered_across_sections() {
        let charts = vec![RemoteChart {
            uuid: "chart".into(),
            sections: vec![
                ChartSection {
                    uuid: Some("vitals".into()),
                    concept_uuids: vec!["temp".into(), "pulse".into()],
                },
                ChartSection {
                    uuid: None,
                    concept_uuids: vec!["lost".into()],
                },
                ChartSection {
                    uuid: Some("labs".into()),
                    concept_uuids: vec!["malaria".into()],
                },
            ],
        }];
        let mut report = SyncReport::new();
        let rows = chart_rows(charts, &mut report).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(report.num_skipped, 1);
        assert_eq!(rows[2].text("concept_uuid"), Some("malaria"));
        assert_eq!(rows[2].get("chart_row").and_then(|v| v.as_integer()), Some(2));
        assert_eq!(rows[2].text("group_uuid"), Some("labs"));
    }
}
