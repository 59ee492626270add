use colored::Colorize;

use crate::json::AnalysisSummary;

/// Format an analysis summary for terminal output.
pub fn format_report(summary: &AnalysisSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "DSM - Modularity Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    out.push_str(&format!(
        "{}: {} elements, {} dependencies, {} clusters\n",
        "Summary".bold(),
        summary.elements.len(),
        summary.dependency_count,
        summary.clusters.len(),
    ));

    out.push_str(&format!("\n{}\n{}\n", "Metrics".bold(), "-".repeat(40)));
    out.push_str(&format!("  Clustered cost: {}\n", summary.clustered_cost));
    out.push_str(&format!(
        "  Relative clustered cost: {}\n",
        format_ratio(summary.relative_clustered_cost)
    ));
    if let Some(cost) = summary.propagation_cost {
        out.push_str(&format!("  Propagation cost: {}\n", format_ratio(cost)));
    }

    if !summary.vertical_buses.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "Vertical buses".bold(),
            summary.vertical_buses.len(),
            "-".repeat(40),
        ));
        for bus in &summary.vertical_buses {
            out.push_str(&format!("  {bus}\n"));
        }
    }

    out.push_str(&format!("\n{}\n{}\n", "Clusters".bold(), "-".repeat(40)));
    for cluster in &summary.clusters {
        out.push_str(&format!(
            "  {} [{}..{}): {}\n",
            cluster.name.cyan(),
            cluster.start,
            cluster.end,
            cluster.elements.join(", "),
        ));
    }

    out.push('\n');
    out
}

fn format_ratio(value: f64) -> String {
    let text = format!("{value:.4}");
    if value <= 0.25 {
        text.green().to_string()
    } else if value <= 0.5 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}
