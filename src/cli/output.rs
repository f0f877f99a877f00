//! Output formatting for CLI

use ndarray::{Array1, Array2, Array3};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

/// Format numbers with fixed precision, space separated
pub fn format_row<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .map(|v| format!("{v:>9.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print one value per label
pub fn print_vector(labels: &[String], values: &Array1<f64>) {
    for (label, value) in labels.iter().zip(values.iter()) {
        print_kv(label, &format!("{value:.6}"));
    }
}

/// Print a per-agent table `[agent, row]`
pub fn print_agent_rows(row_labels: &[String], values: &Array2<f64>) {
    for (agent, row) in values.outer_iter().enumerate() {
        println!("  agent {agent}");
        for (label, value) in row_labels.iter().zip(row.iter()) {
            println!("    {label:16} {value:>9.4}");
        }
    }
}

/// Print a per-agent matrix `[agent, row, column]`
pub fn print_agent_matrices(
    row_labels: &[String],
    column_labels: &[Vec<String>],
    values: &Array3<f64>,
) {
    for (agent, matrix) in values.outer_iter().enumerate() {
        let columns = column_labels
            .get(agent)
            .map(|labels| {
                labels
                    .iter()
                    .map(|l| format!("{l:>9}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        println!("  agent {agent}");
        println!("    {:16} {columns}", "");
        for (label, row) in row_labels.iter().zip(matrix.outer_iter()) {
            println!("    {label:16} {}", format_row(row.iter()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_fixed_width() {
        let row = format_row(&[0.5, 1.0]);
        assert_eq!(row, "   0.5000    1.0000");
    }
}
