use anyhow::{Context, Result, bail};
use serde_json::Value;

/// A tabular ERDDAP response with every cell kept as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, serde::Deserialize)]
struct JsonResponse {
    table: JsonTable,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTable {
    column_names: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Parses a `.csv` response: a header line followed by data lines.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let columns = reader
            .headers()
            .context("failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read CSV row {}", i + 1))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Parses a `.json` response (`{"table": {"columnNames": [...], "rows": [...]}}`).
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let resp: JsonResponse =
            serde_json::from_slice(data).context("failed to parse ERDDAP JSON table")?;
        let rows = resp
            .table
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            columns: resp.table.column_names,
            rows,
        })
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => Ok(i),
            None => bail!(
                "missing column {:?} (found: {})",
                name,
                self.columns.join(", ")
            ),
        }
    }

    /// Values of one column; short rows yield empty strings.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let i = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(i).map(String::as_str).unwrap_or(""))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_quoted_commas() {
        let t = Table::from_csv(
            b"Row Type,Variable Name,Attribute Name,Data Type,Value\nattribute,temp,actual_range,float,\"10.0, 25.0\"\n",
        )
        .unwrap();
        assert_eq!(t.columns.len(), 5);
        assert_eq!(t.len(), 1);
        assert_eq!(t.column("Value").unwrap(), vec!["10.0, 25.0"]);
        assert!(t.column("Units").is_err());
    }

    #[test]
    fn header_only_csv_is_empty() {
        let t = Table::from_csv(b"time,temp\n").unwrap();
        assert_eq!(t.columns, vec!["time", "temp"]);
        assert!(t.is_empty());
    }

    #[test]
    fn json_table() {
        let t = Table::from_json(
            br#"{"table": {"columnNames": ["time", "temp", "flag"], "columnTypes": ["String", "float", "int"], "rows": [["2020-01-01T00:00:00Z", 12.5, null]]}}"#,
        )
        .unwrap();
        assert_eq!(t.columns, vec!["time", "temp", "flag"]);
        assert_eq!(t.rows, vec![vec!["2020-01-01T00:00:00Z", "12.5", ""]]);
    }
}
