//! Filtered views over the inventory snapshot: per-site KPIs, per-site
//! worst-risk rollups for the map, and the deduplicated grid rows.

use std::collections::BTreeMap;

use platform::{PlatformError, WarehouseClient};

use crate::records::{self, GRID_COLUMNS, PartRecord, RiskLevel};

/// Fallback map centre when the snapshot carries no coordinates.
pub const DEFAULT_MAP_CENTER: (f64, f64) = (-26.65, 152.95);

/// The loaded snapshot plus derived lookups.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    records: Vec<PartRecord>,
}

impl Inventory {
    pub fn new(records: Vec<PartRecord>) -> Self {
        Inventory { records }
    }

    /// Load the whole inventory table from the warehouse.
    pub async fn load(warehouse: &WarehouseClient, table: &str) -> Result<Self, PlatformError> {
        let data = warehouse.read_table(table).await?;
        let records =
            records::from_table(&data).map_err(|e| PlatformError::Malformed(e.to_string()))?;
        Ok(Inventory { records })
    }

    pub fn records(&self) -> &[PartRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct site names, sorted.
    pub fn sites(&self) -> Vec<&str> {
        sorted_unique(self.records.iter().map(|r| r.plant_name.as_str()))
    }

    /// Distinct part names, sorted.
    pub fn parts(&self) -> Vec<&str> {
        sorted_unique(self.records.iter().map(|r| r.part_name.as_str()))
    }

    /// Distinct equipment names, sorted; rows without equipment are skipped.
    pub fn equipment(&self) -> Vec<&str> {
        sorted_unique(
            self.records
                .iter()
                .filter_map(|r| r.equip_name.as_deref())
                .filter(|e| !e.is_empty()),
        )
    }

    /// Mean of the site coordinates, or the default centre for an empty
    /// snapshot.
    pub fn map_center(&self) -> (f64, f64) {
        let coords: Vec<(f64, f64)> = self
            .records
            .iter()
            .filter_map(|r| Some((r.lat?, r.lon?)))
            .collect();
        if coords.is_empty() {
            return DEFAULT_MAP_CENTER;
        }
        let n = coords.len() as f64;
        let (lat, lon) = coords
            .iter()
            .fold((0.0, 0.0), |(a, b), (lat, lon)| (a + lat, b + lon));
        (lat / n, lon / n)
    }
}

fn sorted_unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = values.collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Conjunctive filter over the snapshot. `None` means "no constraint".
#[derive(Clone, Debug, Default)]
pub struct InventoryFilter {
    pub site: Option<String>,
    pub equipment: Option<String>,
    pub part: Option<String>,
    pub risk: Option<RiskLevel>,
}

impl InventoryFilter {
    pub fn matches(&self, record: &PartRecord) -> bool {
        if let Some(site) = &self.site {
            if record.plant_name != *site {
                return false;
            }
        }
        if let Some(equipment) = &self.equipment {
            if record.equip_name.as_deref() != Some(equipment.as_str()) {
                return false;
            }
        }
        if let Some(part) = &self.part {
            if record.part_name != *part {
                return false;
            }
        }
        if let Some(risk) = self.risk {
            if record.risk_level != risk {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [PartRecord]) -> Vec<&'a PartRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Share of each risk level among a site's rows, as percentages of the row
/// count.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteKpi {
    pub site: String,
    pub stocked_pct: f64,
    pub low_stock_pct: f64,
    pub out_of_stock_pct: f64,
}

impl SiteKpi {
    /// A site with any stockout share is flagged in the KPI table.
    pub fn has_stockout(&self) -> bool {
        self.out_of_stock_pct > 0.0
    }
}

/// Per-site KPI rows in site-name order.
pub fn site_kpis(records: &[&PartRecord]) -> Vec<SiteKpi> {
    let mut by_site: BTreeMap<&str, (usize, usize, usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_site.entry(record.plant_name.as_str()).or_default();
        entry.0 += 1;
        match record.risk_level {
            RiskLevel::Stocked => entry.1 += 1,
            RiskLevel::LowStock => entry.2 += 1,
            RiskLevel::OutOfStock => entry.3 += 1,
        }
    }
    by_site
        .into_iter()
        .map(|(site, (total, stocked, low, out))| {
            let pct = |n: usize| n as f64 / total as f64 * 100.0;
            SiteKpi {
                site: site.to_string(),
                stocked_pct: pct(stocked),
                low_stock_pct: pct(low),
                out_of_stock_pct: pct(out),
            }
        })
        .collect()
}

/// One map marker: a site collapsed to its worst risk level, with the parts
/// listed per level for the tooltip.
#[derive(Clone, Debug)]
pub struct SiteStatus {
    pub plant_id: String,
    pub plant_name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub worst_risk: RiskLevel,
    /// Sorted unique part names per level, display order (safest first).
    pub parts_by_level: [Vec<String>; 3],
}

/// Roll the filtered rows up to one status per site. Worst risk wins.
pub fn site_statuses(records: &[&PartRecord]) -> Vec<SiteStatus> {
    let mut by_site: BTreeMap<&str, Vec<&PartRecord>> = BTreeMap::new();
    for record in records.iter().copied() {
        by_site.entry(record.plant_id.as_str()).or_default().push(record);
    }
    by_site
        .into_values()
        .map(|rows| {
            let worst = rows
                .iter()
                .map(|r| r.risk_level)
                .min_by_key(|l| l.priority())
                .unwrap_or(RiskLevel::Stocked);
            let parts_by_level = RiskLevel::ALL.map(|level| {
                sorted_unique(
                    rows.iter()
                        .filter(|r| r.risk_level == level)
                        .map(|r| r.part_name.as_str()),
                )
                .into_iter()
                .map(str::to_string)
                .collect()
            });
            let first = rows[0];
            SiteStatus {
                plant_id: first.plant_id.clone(),
                plant_name: first.plant_name.clone(),
                lat: first.lat,
                lon: first.lon,
                worst_risk: worst,
                parts_by_level,
            }
        })
        .collect()
}

/// Grid rows: deduplicated on (site, part, equipment, work order), with a
/// null work order deduplicating like any other key value, and sorted worst
/// risk first. Ties keep snapshot order.
pub fn grid_rows<'a>(records: &[&'a PartRecord]) -> Vec<&'a PartRecord> {
    let mut seen: Vec<(&str, &str, Option<&str>, Option<&str>)> = Vec::new();
    let mut rows: Vec<&PartRecord> = Vec::new();
    for record in records.iter().copied() {
        let key = (
            record.plant_name.as_str(),
            record.part_name.as_str(),
            record.equip_name.as_deref(),
            record.work_order_id.as_deref(),
        );
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        rows.push(record);
    }
    rows.sort_by_key(|r| r.risk_level.priority());
    rows
}

fn format_quantity(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{:.1}", v),
        None => String::new(),
    }
}

/// Render grid rows as an aligned plain-text table, one header line plus
/// one line per row. Used for terminal output and for LLM prompt context.
pub fn render_grid(rows: &[&PartRecord]) -> String {
    if rows.is_empty() {
        return "No data".to_string();
    }
    let headers: Vec<&str> = GRID_COLUMNS.iter().map(|(_, h)| *h).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.plant_name.clone(),
                r.part_name.clone(),
                r.equip_name.clone().unwrap_or_default(),
                r.work_order_id.clone().unwrap_or_default(),
                r.planned_date.clone().unwrap_or_default(),
                format_quantity(r.required_part_quantity),
                format_quantity(r.on_hand_stock),
                format_quantity(r.reserved_qty),
                format_quantity(r.projected_available_stock),
                format_quantity(r.safety_stock),
                format_quantity(r.shortage_quantity),
                r.risk_level.to_string(),
                r.criticality.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let render_line = |row: &[String]| {
        row.iter()
            .enumerate()
            .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    out.push_str(&render_line(
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
    ));
    for row in &cells {
        out.push('\n');
        out.push_str(&render_line(row));
    }
    out
}

/// KPI table as aligned text, one row per site.
pub fn render_kpis(kpis: &[SiteKpi]) -> String {
    if kpis.is_empty() {
        return "No data".to_string();
    }
    let mut out = format!(
        "{:<30}  {:>20}  {:>18}  {:>13}",
        "Site", "Sufficient Inventory", "Low Inventory Risk", "Stockout Risk"
    );
    for kpi in kpis {
        out.push('\n');
        out.push_str(&format!(
            "{:<30}  {:>19.1}%  {:>17.1}%  {:>12.1}%",
            kpi.site, kpi.stocked_pct, kpi.low_stock_pct, kpi.out_of_stock_pct
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        plant: &str,
        part: &str,
        equip: Option<&str>,
        work_order: Option<&str>,
        risk: RiskLevel,
    ) -> PartRecord {
        PartRecord {
            plant_id: format!("id-{}", plant),
            plant_name: plant.to_string(),
            part_id: None,
            part_name: part.to_string(),
            equip_name: equip.map(str::to_string),
            lat: Some(-27.0),
            lon: Some(153.0),
            work_order_id: work_order.map(str::to_string),
            planned_date: None,
            required_part_quantity: Some(5.0),
            on_hand_stock: Some(2.0),
            reserved_qty: None,
            projected_available_stock: None,
            safety_stock: Some(3.0),
            shortage_quantity: Some(3.0),
            risk_level: risk,
            criticality: None,
        }
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let records = vec![
            record("Brisbane", "Belt", Some("Crusher"), None, RiskLevel::LowStock),
            record("Brisbane", "Pump", Some("Crusher"), None, RiskLevel::Stocked),
            record("Cairns", "Belt", None, None, RiskLevel::OutOfStock),
        ];
        let filter = InventoryFilter {
            site: Some("Brisbane".to_string()),
            part: Some("Belt".to_string()),
            ..Default::default()
        };
        let matched = filter.apply(&records);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].part_name, "Belt");
    }

    #[test]
    fn test_site_kpis_are_percentages_of_rows() {
        let records = vec![
            record("Brisbane", "Belt", None, None, RiskLevel::Stocked),
            record("Brisbane", "Pump", None, None, RiskLevel::Stocked),
            record("Brisbane", "Seal", None, None, RiskLevel::LowStock),
            record("Brisbane", "Valve", None, None, RiskLevel::OutOfStock),
        ];
        let refs: Vec<&PartRecord> = records.iter().collect();
        let kpis = site_kpis(&refs);
        assert_eq!(kpis.len(), 1);
        assert_eq!(kpis[0].stocked_pct, 50.0);
        assert_eq!(kpis[0].low_stock_pct, 25.0);
        assert_eq!(kpis[0].out_of_stock_pct, 25.0);
        assert!(kpis[0].has_stockout());
    }

    #[test]
    fn test_site_status_takes_worst_risk() {
        let records = vec![
            record("Brisbane", "Belt", None, None, RiskLevel::Stocked),
            record("Brisbane", "Pump", None, None, RiskLevel::LowStock),
            record("Cairns", "Belt", None, None, RiskLevel::Stocked),
        ];
        let refs: Vec<&PartRecord> = records.iter().collect();
        let statuses = site_statuses(&refs);
        assert_eq!(statuses.len(), 2);
        let brisbane = statuses
            .iter()
            .find(|s| s.plant_name == "Brisbane")
            .unwrap();
        assert_eq!(brisbane.worst_risk, RiskLevel::LowStock);
        assert_eq!(brisbane.parts_by_level[1], vec!["Pump".to_string()]);
    }

    #[test]
    fn test_grid_rows_dedupe_and_sort() {
        let records = vec![
            record("Brisbane", "Belt", Some("Crusher"), Some("WO-1"), RiskLevel::Stocked),
            record("Brisbane", "Belt", Some("Crusher"), Some("WO-1"), RiskLevel::Stocked),
            record("Cairns", "Pump", None, Some("WO-2"), RiskLevel::OutOfStock),
        ];
        let refs: Vec<&PartRecord> = records.iter().collect();
        let rows = grid_rows(&refs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].risk_level, RiskLevel::OutOfStock);
    }

    #[test]
    fn test_duplicate_rows_without_work_order_collapse() {
        let records = vec![
            record("Brisbane", "Belt", None, None, RiskLevel::Stocked),
            record("Brisbane", "Belt", None, None, RiskLevel::Stocked),
        ];
        let refs: Vec<&PartRecord> = records.iter().collect();
        assert_eq!(grid_rows(&refs).len(), 1);
    }

    #[test]
    fn test_distinct_rows_without_work_order_are_kept() {
        let records = vec![
            record("Brisbane", "Belt", Some("Crusher"), None, RiskLevel::Stocked),
            record("Brisbane", "Belt", Some("Loader"), None, RiskLevel::Stocked),
        ];
        let refs: Vec<&PartRecord> = records.iter().collect();
        assert_eq!(grid_rows(&refs).len(), 2);
    }

    #[test]
    fn test_map_center_defaults_when_empty() {
        assert_eq!(Inventory::default().map_center(), DEFAULT_MAP_CENTER);
    }

    #[test]
    fn test_map_center_is_mean_of_coordinates() {
        let mut a = record("Brisbane", "Belt", None, None, RiskLevel::Stocked);
        a.lat = Some(-20.0);
        a.lon = Some(150.0);
        let mut b = record("Cairns", "Pump", None, None, RiskLevel::Stocked);
        b.lat = Some(-30.0);
        b.lon = Some(156.0);
        let inventory = Inventory::new(vec![a, b]);
        assert_eq!(inventory.map_center(), (-25.0, 153.0));
    }

    #[test]
    fn test_unique_value_lists_are_sorted() {
        let inventory = Inventory::new(vec![
            record("Cairns", "Pump", Some("Crusher"), None, RiskLevel::Stocked),
            record("Brisbane", "Belt", None, None, RiskLevel::Stocked),
            record("Brisbane", "Pump", Some("Crusher"), None, RiskLevel::Stocked),
        ]);
        assert_eq!(inventory.sites(), vec!["Brisbane", "Cairns"]);
        assert_eq!(inventory.parts(), vec!["Belt", "Pump"]);
        assert_eq!(inventory.equipment(), vec!["Crusher"]);
    }

    #[test]
    fn test_render_grid_empty() {
        assert_eq!(render_grid(&[]), "No data");
    }

    #[test]
    fn test_render_kpis_formats_percentages() {
        let kpis = vec![SiteKpi {
            site: "Brisbane".to_string(),
            stocked_pct: 66.666,
            low_stock_pct: 33.333,
            out_of_stock_pct: 0.0,
        }];
        let rendered = render_kpis(&kpis);
        assert!(rendered.contains("66.7%"));
        assert!(rendered.contains("0.0%"));
    }
}
