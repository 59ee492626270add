use std::fmt::Write;

use dsm_core::matrix::Dsm;
use dsm_core::value::CellValue;

/// Render a matrix as SVG: one outlined square per cluster along the
/// diagonal, one filled unit square per dependency cell. Matrix row `i`
/// maps to the SVG y axis, column `j` to x.
pub fn render<V: CellValue>(dsm: &Dsm<V>) -> String {
    let n = dsm.len();
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" standalone="no"?>"#);
    let _ = writeln!(
        out,
        r#"<svg width="{n}px" height="{n}px" version="1.1" xmlns="http://www.w3.org/2000/svg">"#
    );
    let _ = writeln!(out, r#"<g fill="none" stroke="black" stroke-width="0.25">"#);

    for cluster in dsm.partition().iter() {
        let size = cluster.len();
        let start = cluster.start;
        let _ = writeln!(
            out,
            r#"    <rect width="{size}" height="{size}" x="{start}" y="{start}" />"#
        );
    }

    for i in 0..n {
        for j in 0..n {
            if dsm.get(i, j).is_ok_and(|v| v.is_set()) {
                let _ = writeln!(
                    out,
                    r#"    <rect width="1" height="1" x="{j}" y="{i}" fill="black" />"#
                );
            }
        }
    }

    out.push_str("</g>\n</svg>\n");
    out
}
