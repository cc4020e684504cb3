//! Inventory snapshot loading and the views derived from it: risk rollups,
//! site KPIs, grid rows and LLM-backed allocation recommendations.

pub mod recommend;
pub mod records;
pub mod summary;

pub use records::{GRID_COLUMNS, PartRecord, RecordError, RiskLevel};
pub use summary::{
    DEFAULT_MAP_CENTER, Inventory, InventoryFilter, SiteKpi, SiteStatus, grid_rows, render_grid,
    render_kpis, site_kpis, site_statuses,
};
