use std::path::Path;
use triage_engine::{AggregateState, TOP_TRIGGERS};
use triage_triggers::TriggerSet;

use crate::materialize::{REPORTS_DIR, TRIGGER_INFO_FILE};

pub const INDEX_FILE: &str = "INDEX.md";

const CONSOLE_EXAMPLES: usize = 3;

/// Run details shown in `INDEX.md` that are not part of the aggregate
pub struct IndexOptions<'a> {
    pub output_root: &'a Path,
    pub client_prefixes: &'a [String],
    pub json_reports: bool,
}

pub fn render_index(state: &AggregateState, triggers: &TriggerSet, opts: &IndexOptions) -> String {
    let ranked = state.ranked_types();

    let mut md = String::new();
    md.push_str("# Problematic dialogs\n\n");

    md.push_str("## Summary\n\n");
    if ranked.is_empty() {
        md.push_str("No problematic dialogs found.\n");
    }
    for entry in &ranked {
        md.push_str(&format!(
            "- {}: {} {}\n",
            entry.key,
            entry.count,
            dialogs_label(entry.count)
        ));
    }
    md.push('\n');

    md.push_str("## Problem types\n\n");
    for entry in &ranked {
        md.push_str(&format!(
            "### {} (`{}`)\n\n",
            escape_inline(triggers.display_name(&entry.key)),
            entry.key
        ));
        md.push_str(&format!("- Dialogs: {}\n", entry.count));
        md.push_str(&format!(
            "- Folders: {}\n\n",
            state.folder_names_of(&entry.key).join(", ")
        ));
    }

    md.push_str("## Totals\n\n");
    md.push_str(&format!("- Folders scanned: {}\n", state.folders_scanned()));
    md.push_str(&format!(
        "- Problematic dialogs: {}\n",
        state.total_dialogs()
    ));
    md.push_str(&format!(
        "- Type assignments: {}\n",
        state.total_assignments()
    ));
    if state.failed_tasks() > 0 {
        md.push_str(&format!("- Failed scan tasks: {}\n", state.failed_tasks()));
    }
    md.push('\n');

    md.push_str("## Top triggers\n\n");
    md.push_str("| # | trigger | dialogs |\n");
    md.push_str("|---:|---|---:|\n");
    for (rank, entry) in state.top_triggers(TOP_TRIGGERS).iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            rank + 1,
            escape_cell(&entry.trigger),
            entry.count
        ));
    }
    md.push('\n');

    md.push_str("## Dialogs\n\n");
    for dialog in state.dialogs() {
        let id = if dialog.dialog_id == dialog.folder_name {
            String::new()
        } else {
            format!(" (dialog {})", dialog.dialog_id)
        };
        md.push_str(&format!(
            "- {}{id}: {}\n",
            dialog.folder_name,
            dialog.matched_types.join(", ")
        ));
    }
    if state.total_dialogs() == 0 {
        md.push_str("None.\n");
    }
    md.push('\n');

    md.push_str("## Layout\n\n");
    md.push_str("```text\n");
    md.push_str(&render_layout(state, opts));
    md.push_str("```\n\n");

    md.push_str("## Filtering rules\n\n");
    md.push_str(&format!(
        "1. Only client messages are checked (author id starting with {})\n",
        opts.client_prefixes
            .iter()
            .map(|prefix| format!("`{prefix}`"))
            .collect::<Vec<_>>()
            .join(" or ")
    ));
    md.push_str("2. Triggers match whole words only, ignoring case\n");
    md.push_str("3. A dialog may belong to several problem types and is copied into each\n");
    md.push_str("4. Dialog folders are copied intact with all of their files\n");

    md
}

fn render_layout(state: &AggregateState, opts: &IndexOptions) -> String {
    let root = opts
        .output_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| opts.output_root.display().to_string());

    let mut out = format!("{root}/\n");
    for key in state.type_keys() {
        out.push_str(&format!("├── {key}/\n"));
        if let Some(folder) = state.folder_names_of(key).first() {
            out.push_str(&format!("│   ├── {folder}/\n"));
            out.push_str("│   │   ├── ...\n");
            out.push_str(&format!("│   │   └── {TRIGGER_INFO_FILE}\n"));
        }
        out.push_str("│   └── ...\n");
    }
    if opts.json_reports && state.total_dialogs() > 0 {
        out.push_str(&format!("├── {REPORTS_DIR}/\n"));
        out.push_str("│   └── <folder>.json\n");
    }
    out.push_str(&format!("└── {INDEX_FILE}\n"));
    out
}

/// Console statistics printed after a run
pub fn render_statistics(state: &AggregateState, triggers: &TriggerSet) -> String {
    let mut out = String::new();
    out.push_str("=== Problematic dialogs ===\n\n");

    let ranked = state.ranked_types();
    if ranked.is_empty() {
        out.push_str("No problematic dialogs found.\n\n");
    }
    for entry in &ranked {
        out.push_str(&format!(
            "{}: {} {}\n",
            triggers.display_name(&entry.key),
            entry.count,
            dialogs_label(entry.count)
        ));
        let folders = state.folder_names_of(&entry.key);
        let examples: Vec<&str> = folders.iter().take(CONSOLE_EXAMPLES).copied().collect();
        let more = folders.len().saturating_sub(examples.len());
        if more > 0 {
            out.push_str(&format!("  e.g. {} (+{more} more)\n", examples.join(", ")));
        } else {
            out.push_str(&format!("  e.g. {}\n", examples.join(", ")));
        }
    }
    if !ranked.is_empty() {
        out.push('\n');
    }

    out.push_str(&format!(
        "Folders scanned: {}\nProblematic dialogs: {}\nType assignments: {}\n",
        state.folders_scanned(),
        state.total_dialogs(),
        state.total_assignments()
    ));

    let top = state.top_triggers(TOP_TRIGGERS);
    if !top.is_empty() {
        out.push_str(&format!("\n=== Top {} triggers ===\n\n", top.len()));
        for (rank, entry) in top.iter().enumerate() {
            out.push_str(&format!(
                "{:>2}. {} ({})\n",
                rank + 1,
                entry.trigger,
                entry.count
            ));
        }
    }
    out
}

fn dialogs_label(count: usize) -> &'static str {
    if count == 1 {
        "dialog"
    } else {
        "dialogs"
    }
}

fn escape_cell(text: &str) -> String {
    escape_inline(text).replace('|', "\\|")
}

fn escape_inline(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}
