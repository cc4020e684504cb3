//! The spare-parts inventory snapshot: one row per site, part and planned
//! work order, decoded from the warehouse table.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use platform::Table;

/// Stock posture of a part at a site, worst first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    OutOfStock,
    LowStock,
    Stocked,
}

impl RiskLevel {
    /// All levels in display order, safest first.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Stocked, RiskLevel::LowStock, RiskLevel::OutOfStock];

    pub const fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::OutOfStock => "Out of Stock",
            RiskLevel::LowStock => "Low Stock",
            RiskLevel::Stocked => "Stocked",
        }
    }

    /// Map marker colour for this level.
    pub const fn color(&self) -> &'static str {
        match self {
            RiskLevel::OutOfStock => "red",
            RiskLevel::LowStock => "gold",
            RiskLevel::Stocked => "green",
        }
    }

    /// Sort key used for grids: the worst situations surface first.
    pub const fn priority(&self) -> u8 {
        match self {
            RiskLevel::OutOfStock => 1,
            RiskLevel::LowStock => 2,
            RiskLevel::Stocked => 3,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Out of Stock" => Ok(RiskLevel::OutOfStock),
            "Low Stock" => Ok(RiskLevel::LowStock),
            "Stocked" => Ok(RiskLevel::Stocked),
            other => Err(RecordError::UnknownRiskLevel(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("inventory table is missing column {0:?}")]
    MissingColumn(&'static str),

    #[error("unknown risk level {0:?}")]
    UnknownRiskLevel(String),
}

/// One row of the inventory snapshot. Quantities are optional because rows
/// without a planned work order leave the demand-side columns null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    pub plant_id: String,
    pub plant_name: String,
    pub part_id: Option<String>,
    pub part_name: String,
    pub equip_name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub work_order_id: Option<String>,
    pub planned_date: Option<String>,
    pub required_part_quantity: Option<f64>,
    pub on_hand_stock: Option<f64>,
    pub reserved_qty: Option<f64>,
    pub projected_available_stock: Option<f64>,
    pub safety_stock: Option<f64>,
    pub shortage_quantity: Option<f64>,
    pub risk_level: RiskLevel,
    pub criticality: Option<String>,
}

/// Columns the grid shows, in display order.
pub const GRID_COLUMNS: [(&str, &str); 13] = [
    ("plant_name", "Plant Name"),
    ("part_name", "Part Name"),
    ("equip_name", "Equipment Name"),
    ("work_order_id", "Work Order ID"),
    ("planned_date", "Planned Date"),
    ("required_part_quantity", "Required Quantity"),
    ("on_hand_stock", "On Hand Stock"),
    ("reserved_qty", "Reserved Qty"),
    ("projected_available_stock", "Projected Stock"),
    ("safety_stock", "Safety Stock"),
    ("shortage_quantity", "Shortage Qty"),
    ("risk_level", "Risk Level"),
    ("criticality", "Criticality"),
];

struct Columns {
    plant_id: usize,
    plant_name: usize,
    part_id: Option<usize>,
    part_name: usize,
    equip_name: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
    work_order_id: Option<usize>,
    planned_date: Option<usize>,
    required_part_quantity: Option<usize>,
    on_hand_stock: Option<usize>,
    reserved_qty: Option<usize>,
    projected_available_stock: Option<usize>,
    safety_stock: Option<usize>,
    shortage_quantity: Option<usize>,
    risk_level: usize,
    criticality: Option<usize>,
}

impl Columns {
    fn resolve(table: &Table) -> Result<Self, RecordError> {
        let required = |name: &'static str| {
            table
                .column_index(name)
                .ok_or(RecordError::MissingColumn(name))
        };
        Ok(Columns {
            plant_id: required("plant_id")?,
            plant_name: required("plant_name")?,
            part_id: table.column_index("part_id"),
            part_name: required("part_name")?,
            equip_name: table.column_index("equip_name"),
            lat: table.column_index("lat"),
            lon: table.column_index("lon"),
            work_order_id: table.column_index("work_order_id"),
            planned_date: table.column_index("planned_date"),
            required_part_quantity: table.column_index("required_part_quantity"),
            on_hand_stock: table.column_index("on_hand_stock"),
            reserved_qty: table.column_index("reserved_qty"),
            projected_available_stock: table.column_index("projected_available_stock"),
            safety_stock: table.column_index("safety_stock"),
            shortage_quantity: table.column_index("shortage_quantity"),
            risk_level: required("risk_level")?,
            criticality: table.column_index("criticality"),
        })
    }
}

fn cell(row: &[Option<String>], index: Option<usize>) -> Option<String> {
    index.and_then(|i| row.get(i)).and_then(|v| v.clone())
}

fn numeric(row: &[Option<String>], index: Option<usize>) -> Option<f64> {
    cell(row, index).and_then(|v| v.parse().ok())
}

/// Decode a warehouse result set into part records. Rows whose risk level
/// is unrecognised are dropped with a warning rather than failing the whole
/// snapshot; a missing required column fails it.
pub fn from_table(table: &Table) -> Result<Vec<PartRecord>, RecordError> {
    let columns = Columns::resolve(table)?;
    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let risk = match cell(row, Some(columns.risk_level)) {
            Some(raw) => match raw.parse::<RiskLevel>() {
                Ok(level) => level,
                Err(e) => {
                    warn!(error = %e, "skipping inventory row");
                    continue;
                }
            },
            None => {
                warn!("skipping inventory row with null risk level");
                continue;
            }
        };
        records.push(PartRecord {
            plant_id: cell(row, Some(columns.plant_id)).unwrap_or_default(),
            plant_name: cell(row, Some(columns.plant_name)).unwrap_or_default(),
            part_id: cell(row, columns.part_id),
            part_name: cell(row, Some(columns.part_name)).unwrap_or_default(),
            equip_name: cell(row, columns.equip_name),
            lat: numeric(row, columns.lat),
            lon: numeric(row, columns.lon),
            work_order_id: cell(row, columns.work_order_id),
            planned_date: cell(row, columns.planned_date),
            required_part_quantity: numeric(row, columns.required_part_quantity),
            on_hand_stock: numeric(row, columns.on_hand_stock),
            reserved_qty: numeric(row, columns.reserved_qty),
            projected_available_stock: numeric(row, columns.projected_available_stock),
            safety_stock: numeric(row, columns.safety_stock),
            shortage_quantity: numeric(row, columns.shortage_quantity),
            risk_level: risk,
            criticality: cell(row, columns.criticality),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table {
            columns: vec![
                "plant_id".into(),
                "plant_name".into(),
                "part_name".into(),
                "lat".into(),
                "lon".into(),
                "on_hand_stock".into(),
                "risk_level".into(),
            ],
            rows: vec![
                vec![
                    Some("P1".into()),
                    Some("Brisbane Mine".into()),
                    Some("Conveyor Belt".into()),
                    Some("-27.47".into()),
                    Some("153.02".into()),
                    Some("4".into()),
                    Some("Low Stock".into()),
                ],
                vec![
                    Some("P2".into()),
                    Some("Cairns Mine".into()),
                    Some("Hydraulic Pump".into()),
                    None,
                    None,
                    None,
                    Some("Stocked".into()),
                ],
            ],
        }
    }

    #[test]
    fn test_from_table_decodes_rows() {
        let records = from_table(&table()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].plant_name, "Brisbane Mine");
        assert_eq!(records[0].risk_level, RiskLevel::LowStock);
        assert_eq!(records[0].lat, Some(-27.47));
        assert_eq!(records[0].on_hand_stock, Some(4.0));
        assert_eq!(records[1].equip_name, None);
        assert_eq!(records[1].on_hand_stock, None);
    }

    #[test]
    fn test_from_table_requires_core_columns() {
        let mut broken = table();
        broken.columns[6] = "status".into();
        assert_eq!(
            from_table(&broken),
            Err(RecordError::MissingColumn("risk_level"))
        );
    }

    #[test]
    fn test_unknown_risk_level_skips_row() {
        let mut t = table();
        t.rows[0][6] = Some("Unknown".into());
        let records = from_table(&t).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plant_name, "Cairns Mine");
    }

    #[test]
    fn test_risk_priority_orders_worst_first() {
        let mut levels = vec![RiskLevel::Stocked, RiskLevel::OutOfStock, RiskLevel::LowStock];
        levels.sort_by_key(|l| l.priority());
        assert_eq!(
            levels,
            vec![RiskLevel::OutOfStock, RiskLevel::LowStock, RiskLevel::Stocked]
        );
    }

    #[test]
    fn test_risk_level_round_trips_display() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>(), Ok(level));
        }
    }
}
