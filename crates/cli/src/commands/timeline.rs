use anyhow::bail;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use arbor_kernel::{TreeId, TreeType};

use super::format_nanos;
use crate::ledger::Ledger;

pub fn run(storage_path: &str, tree_id: i64) -> anyhow::Result<()> {
    let ledger = Ledger::load(storage_path)?;
    let id = TreeId(tree_id);
    let Some(tree) = ledger.tree(id) else {
        bail!("tree {} not found in {}", id, storage_path);
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match tree.tree_type {
        TreeType::Log => {
            table.set_header(vec!["Revision", "Timestamp", "Tree Size", "Root Hash", "Fingerprint"]);
            for root in ledger.log_roots(id) {
                table.add_row(vec![
                    root.revision().to_string(),
                    format_nanos(root.root.timestamp_nanos),
                    root.root.tree_size.to_string(),
                    hex::encode(&root.root.root_hash),
                    hex::encode(&root.fingerprint()[..8]),
                ]);
            }
        }
        TreeType::Map => {
            table.set_header(vec!["Revision", "Timestamp", "Source Log", "Fully / Partially", "Root Hash", "Fingerprint"]);
            for root in ledger.map_roots(id) {
                let m = &root.root.metadata;
                table.add_row(vec![
                    root.revision().to_string(),
                    format_nanos(root.root.timestamp_nanos),
                    m.source_log_id.to_string(),
                    format!("{} / {}", m.highest_fully_completed_seq, m.highest_partially_completed_seq),
                    hex::encode(&root.root.root_hash),
                    hex::encode(&root.fingerprint()[..8]),
                ]);
            }
        }
        TreeType::Unknown => bail!("tree {} has no type", id),
    }

    println!("\nRoot Timeline: {} tree {} ({})\n", tree.tree_type.name(), id, tree.tree_state.name());
    println!("{table}\n");
    Ok(())
}
