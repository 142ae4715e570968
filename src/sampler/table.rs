//! Fixed-width text rendering for tabular samples.

/// Placeholder printed for missing cells.
pub const MISSING: &str = "NaN";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with [`MISSING`].
    pub fn push_row(&mut self, mut row: Vec<String>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), MISSING.to_string());
        }
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render with a left-aligned row index followed by right-aligned
    /// columns, two spaces apart.
    ///
    /// ```text
    ///     name  age
    /// 0  Alice   30
    /// 1    Bob    4
    /// ```
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Empty DataFrame\nColumns: [{}]\nIndex: []",
                self.headers.join(", ")
            );
        }

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| display_width(cell))
                    .chain(std::iter::once(display_width(header)))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let mut header_line = " ".repeat(index_width);
        for (header, width) in self.headers.iter().zip(&widths) {
            header_line.push_str("  ");
            header_line.push_str(&pad_left(header, *width));
        }
        lines.push(header_line);

        for (idx, row) in self.rows.iter().enumerate() {
            let mut line = format!("{:<width$}", idx, width = index_width);
            for (col, width) in widths.iter().enumerate() {
                let cell = row.get(col).map(String::as_str).unwrap_or(MISSING);
                line.push_str("  ");
                line.push_str(&pad_left(cell, *width));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn pad_left(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(s));
    format!("{}{}", " ".repeat(pad), s)
}
