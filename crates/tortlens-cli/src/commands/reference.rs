use tortlens_dataset::reference::{find_by_manufacturer, reference_table, render_report};
use tortlens_dataset::ReferenceEntry;

/// Entries matching both filters; no filter selects the whole table.
pub fn select(mdl: Option<u32>, manufacturer: Option<&str>) -> Vec<&'static ReferenceEntry> {
    let by_manufacturer: Vec<&'static ReferenceEntry> = match manufacturer {
        Some(m) => find_by_manufacturer(m),
        None => reference_table().iter().collect(),
    };
    by_manufacturer
        .into_iter()
        .filter(|e| mdl.map_or(true, |n| e.mdl_number == n))
        .collect()
}

pub fn show(mdl: Option<u32>, manufacturer: Option<&str>) -> anyhow::Result<()> {
    let entries = select(mdl, manufacturer);
    if entries.is_empty() {
        println!("No reference entries match");
        return Ok(());
    }
    print!("{}", render_report(&entries));
    Ok(())
}
