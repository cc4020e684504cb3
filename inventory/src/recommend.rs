//! Allocation recommendations: turn the current grid plus the part's
//! cross-site availability into a prescriptive action plan via the LLM
//! serving endpoint.

use chrono::Local;

use platform::{PlatformError, ServingClient};

use crate::records::PartRecord;
use crate::summary::{self, InventoryFilter};

pub const SYSTEM_PROMPT: &str = "You are a supply chain optimization expert. \
Provide actionable recommendations for inventory management and part allocation.";

/// Template with three placeholders: `{current_date}`, `{grid_df}` and
/// `{inventory_data}`. The literal `{part_id}` inside the output section is
/// for the model to fill, not for us.
const RECOMMENDATION_PROMPT: &str = r#"
You are a Mine Operations Decision Assistant.

- Assume today's date is **{current_date}**.
- Respond to a mine operations manager.
- Provide **one clear, prescriptive action plan**.
- Be concise, factual, and operational.
- Do not ask questions.
- Do not present alternatives.
- Do not optimize beyond the stated issue.

### IMPORTANT SCOPE RULES (STRICT)
- You may ONLY take action on sites and parts listed in **Stock Issue**
- **Available Inventory** is reference data only to source transfers or vendors
- If the site in Stock Issue is already at or above safety stock, return **"No action required"**
- Do NOT act on other sites unless they are used as a transfer source
- Do NOT invent urgency, work orders, or future demand

---

### Stock Issue (This is the ONLY problem to solve)
{grid_df}

### Available Inventory (Reference only)
{inventory_data}

---

### Decision Rules
- Act only if Stock Issue shows **low stock or stock-out**
- If no work order exists, treat as a **low-stock correction**
- Transfer only the **minimum quantity required** to restore safety stock
- Prefer internal transfers that do **not breach source safety stock**
- Recommend a vendor order **only if** a transfer weakens the source site
- Select the vendor with **shortest lead time**, then **highest reliability**
- Respect minimum order quantities

---

### Output (Markdown only, EXACT structure)

## Recommended Action for Part {part_id}

### 1. Transfer Stock Now (Fixes the Issue)

| From | To | Qty | Impact |
|---|---|---:|---|

- Immediate outcome at destination site
- Risk status at source site

### 2. Reorder to Protect Source Site (Prevents Next Issue)

| Vendor | Qty | Lead Time |
|---|---:|---:|

- Post-transfer inventory status
- Safety stock compliance

### If No Action Is Required
Return ONLY:

**No action required - site is at or above safety stock.**
"#;

/// Assemble the prompt for the given grid rows and the part's availability
/// across all sites.
pub fn build_prompt(grid: &[&PartRecord], availability: &[&PartRecord], date: &str) -> String {
    let grid_text = if grid.is_empty() {
        "No grid data available".to_string()
    } else {
        summary::render_grid(grid)
    };
    let availability_text = if availability.is_empty() {
        "No inventory data available".to_string()
    } else {
        summary::render_grid(availability)
    };
    RECOMMENDATION_PROMPT
        .replace("{current_date}", date)
        .replace("{grid_df}", &grid_text)
        .replace("{inventory_data}", &availability_text)
}

/// Request a recommendation for one site and part. `records` is the full
/// snapshot; the stock issue is the filtered grid, the reference data is
/// the part's rows across every site.
pub async fn recommend(
    serving: &ServingClient,
    records: &[PartRecord],
    site: &str,
    part: &str,
) -> Result<String, PlatformError> {
    let filter = InventoryFilter {
        site: Some(site.to_string()),
        part: Some(part.to_string()),
        ..Default::default()
    };
    let grid = summary::grid_rows(&filter.apply(records));

    let availability_filter = InventoryFilter {
        part: Some(part.to_string()),
        ..Default::default()
    };
    let availability = availability_filter.apply(records);

    let date = Local::now().format("%B %d, %Y").to_string();
    let prompt = build_prompt(&grid, &availability, &date);
    serving.chat(SYSTEM_PROMPT, &prompt).await
}
