use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use super::format_nanos;
use crate::ledger::Ledger;

pub fn run(storage_path: &str) -> anyhow::Result<()> {
    let ledger = Ledger::load(storage_path)?;

    println!("\nArbor Storage Report: {}", storage_path);
    println!("{} records replayed\n", ledger.record_count());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Type", "State", "Strategy", "Signature", "Latest Rev", "Created", "Updated"]);

    for tree in ledger.trees() {
        let latest = ledger
            .latest_revision(tree.tree_id)
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            tree.tree_id.to_string(),
            tree.tree_type.name().to_string(),
            tree.tree_state.name().to_string(),
            tree.hash_strategy.name().to_string(),
            format!("{:?}/{:?}", tree.signature_algorithm, tree.hash_algorithm),
            latest,
            format_nanos(tree.create_time),
            format_nanos(tree.update_time),
        ]);
    }

    println!("{table}\n");
    Ok(())
}
