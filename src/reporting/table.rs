use super::ReportRow;

const COLUMNS: [&str; 6] = ["SERVICE", "SCENARIO", "URL", "FINAL STATUS", "PASSED NO", "FAILED NO"];

/// Render the end-of-run summary, one line per row.
pub fn render_summary_table(rows: &[ReportRow]) -> String {
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.service.clone(),
                row.scenario.clone(),
                row.url.clone(),
                row.outcome.clone(),
                row.total_pass.to_string(),
                row.total_fail.to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    push_line(&mut table, COLUMNS.iter().map(|c| c.to_string()), &widths);

    let separator = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("|");
    table.push_str(&format!("|{}|\n", separator));

    for line in cells {
        push_line(&mut table, line.into_iter(), &widths);
    }
    table
}

fn push_line(table: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    table.push('|');
    for (cell, width) in cells.zip(widths) {
        table.push_str(&format!(" {:<width$} |", cell, width = width));
    }
    table.push('\n');
}

pub fn print_summary_table(rows: &[ReportRow]) {
    print!("{}", render_summary_table(rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_table() {
        let rows = vec![ReportRow {
            service: "users".to_string(),
            scenario: "list".to_string(),
            url: "http://localhost/users".to_string(),
            outcome: "passed".to_string(),
            total_pass: 3,
            total_fail: 0,
            ..ReportRow::default()
        }];

        let table = render_summary_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| SERVICE | SCENARIO | URL"));
        assert!(lines[1].starts_with("|---------|"));
        assert!(lines[2].contains("| http://localhost/users |"));
        assert!(lines[2].contains("| passed       |"));
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }
}
