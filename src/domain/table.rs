//! Column-named, row-major in-memory table.
//!
//! The reconciler has to tolerate inputs whose columns vary from run to run
//! (a scrape may find no `HDI` anywhere, an indicator may be dropped), so it
//! works on this dynamic representation instead of fixed structs.

/// One cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Wrap an optional number; non-finite values become `Null`.
    pub fn from_f64(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => Value::Number(v),
            _ => Value::Null,
        }
    }

    /// CSV cell representation. Numbers use the shortest round-trip form, so
    /// rendering is stable across runs.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row, padding with `Null` (or truncating) to the table width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Returns `false` if `from` does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn rename_columns_with(&mut self, mut f: impl FnMut(&str) -> String) {
        for c in &mut self.columns {
            *c = f(c);
        }
    }

    /// Drop the named columns; names that are absent are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }

        self.columns = retain_by_mask(std::mem::take(&mut self.columns), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
    }

    /// Append a column. `values` is padded with `Null` to the row count.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.columns.push(name.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or(Value::Null));
        }
    }

    /// Rewrite every cell of `column` in place. Returns `false` if absent.
    pub fn map_column(&mut self, column: &str, mut f: impl FnMut(&Value) -> Value) -> bool {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    pub fn retain_rows(&mut self, mut f: impl FnMut(&[Value]) -> bool) {
        self.rows.retain(|r| f(r));
    }

    /// A column is numeric when it holds no text. An all-null column counts
    /// as numeric (it was read from an all-empty CSV column).
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        self.rows.iter().all(|r| !matches!(r[idx], Value::Text(_)))
    }

    /// Arithmetic mean of the non-null numbers in a column.
    pub fn column_mean(&self, idx: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for row in &self.rows {
            if let Value::Number(v) = row[idx] {
                sum += v;
                n += 1;
            }
        }
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    /// Replace nulls in every numeric column with that column's mean.
    ///
    /// Columns without a single value stay null. Returns `(column, filled, mean)`
    /// for each column that was touched.
    pub fn impute_column_means(&mut self) -> Vec<Imputation> {
        let mut out = Vec::new();
        for idx in 0..self.columns.len() {
            if !self.is_numeric_column(idx) {
                continue;
            }
            let nulls = self.rows.iter().filter(|r| r[idx].is_null()).count();
            if nulls == 0 {
                continue;
            }
            let Some(mean) = self.column_mean(idx) else {
                continue;
            };
            for row in &mut self.rows {
                if row[idx].is_null() {
                    row[idx] = Value::Number(mean);
                }
            }
            out.push(Imputation {
                column: self.columns[idx].clone(),
                filled: nulls,
                mean,
            });
        }
        out
    }
}

/// One column's imputation, as reported by [`Table::impute_column_means`].
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    pub column: String,
    pub filled: usize,
    pub mean: f64,
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| if *k { Some(item) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn imputes_with_column_mean_and_preserves_mean() {
        let mut t = Table::new(["Country", "GDP"]);
        t.push_row(vec![Value::Text("A".into()), num(10.0)]);
        t.push_row(vec![Value::Text("B".into()), Value::Null]);
        t.push_row(vec![Value::Text("C".into()), num(30.0)]);

        let report = t.impute_column_means();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].column, "GDP");
        assert_eq!(report[0].filled, 1);
        assert_eq!(t.value(1, "GDP"), Some(&num(20.0)));
        assert_eq!(t.column_mean(1), Some(20.0));
    }

    #[test]
    fn text_and_all_null_columns_are_left_alone() {
        let mut t = Table::new(["Country", "Empty"]);
        t.push_row(vec![Value::Text("A".into()), Value::Null]);
        t.push_row(vec![Value::Null, Value::Null]);

        assert!(t.impute_column_means().is_empty());
        assert_eq!(t.value(1, "Country"), Some(&Value::Null));
        assert_eq!(t.value(0, "Empty"), Some(&Value::Null));
    }

    #[test]
    fn drop_columns_ignores_unknown_names() {
        let mut t = Table::new(["Country", "Currency", "GDP", "Main_Sectors"]);
        t.push_row(vec![Value::Text("A".into()), Value::Text("EUR".into()), num(1.0), Value::Null]);

        t.drop_columns(&["Currency", "Main_Sectors", "Nope"]);

        assert_eq!(t.columns(), ["Country", "GDP"]);
        assert_eq!(t.rows()[0], vec![Value::Text("A".into()), num(1.0)]);
    }

    #[test]
    fn short_rows_are_padded() {
        let mut t = Table::new(["a", "b", "c"]);
        t.push_row(vec![num(1.0)]);
        assert_eq!(t.rows()[0], vec![num(1.0), Value::Null, Value::Null]);
    }

    #[test]
    fn render_is_shortest_round_trip() {
        assert_eq!(num(2023.0).render(), "2023");
        assert_eq!(num(20.5).render(), "20.5");
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::from_f64(Some(f64::INFINITY)), Value::Null);
    }
}
