use serde_json::Value;

use crate::style::Style;

const HEADERS: [&str; 7] = [
    "Path",
    "Version",
    "Arch",
    "Venv",
    "Venv support",
    "Leaf",
    "Symlink",
];

pub struct InstallationRow {
    cells: [String; 7],
    leaf: bool,
}

/// Rows for every installation listed in an outcome's details.
pub fn installation_rows(details: &Value) -> Option<Vec<InstallationRow>> {
    let installations = details.get("installations")?.as_array()?;
    installations.iter().map(installation_row).collect()
}

fn installation_row(value: &Value) -> Option<InstallationRow> {
    let obj = value.as_object()?;
    let flag = |key: &str| obj.get(key).and_then(Value::as_bool);
    let architectures = match obj.get("architectures")? {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        _ => "-".to_string(),
    };
    let leaf = flag("leaf")?;
    Some(InstallationRow {
        cells: [
            obj.get("id")?.as_str()?.to_string(),
            obj.get("version")?.as_str()?.to_string(),
            architectures,
            yes_no(flag("is_virtual_env")?),
            yes_no(flag("supports_virtual_env")?),
            yes_no(leaf),
            yes_no(flag("symlink")?),
        ],
        leaf,
    })
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

pub fn format_installation_table(style: &Style, rows: &[InstallationRow]) -> String {
    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let join = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(style.table_header(&join(&HEADERS.map(String::from))));
    lines.push(join(&widths.map(|width| "-".repeat(width))));
    for row in rows {
        let line = join(&row.cells);
        if row.leaf {
            lines.push(line);
        } else {
            lines.push(style.secondary(&line));
        }
    }
    lines.join("\n")
}
