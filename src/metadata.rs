use anyhow::{Result, bail};
use std::collections::BTreeMap;

use crate::table::Table;

/// Attribute name to value, for one variable.
pub type Attributes = BTreeMap<String, String>;

/// Variable name to its attributes, as reported by `/info/<dataset_id>/index.csv`.
///
/// Dataset-wide attributes are stored under the pseudo variable `NC_GLOBAL`.
pub type Metadata = BTreeMap<String, Attributes>;

/// Pivots an info table (one row per variable/attribute pair) into [`Metadata`].
///
/// Rows with an empty attribute name (the `variable` rows of the info table)
/// still register the variable.
pub fn from_info_table(table: &Table) -> Result<Metadata> {
    let var_col = table.column_index("Variable Name")?;
    let attr_col = table.column_index("Attribute Name")?;
    let value_col = table.column_index("Value")?;

    let mut meta = Metadata::new();
    for row in &table.rows {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        let variable = cell(var_col);
        if variable.is_empty() {
            continue;
        }
        let attributes = meta.entry(variable.to_string()).or_default();
        let attribute = cell(attr_col);
        if !attribute.is_empty() {
            attributes.insert(attribute.to_string(), cell(value_col).to_string());
        }
    }
    Ok(meta)
}

/// Splits an `actual_range` value `"<low>, <high>"` into its bounds, as text.
pub fn parse_actual_range(value: &str) -> Result<(String, String)> {
    match value.split_once(", ") {
        Some((low, high)) if !low.is_empty() && !high.is_empty() && !high.contains(", ") => {
            Ok((low.to_string(), high.to_string()))
        }
        _ => bail!(
            "malformed actual_range {:?}: expected \"<low>, <high>\"",
            value
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &[u8] = b"Row Type,Variable Name,Attribute Name,Data Type,Value
attribute,NC_GLOBAL,title,String,Glider ru29
variable,temp,,float,
attribute,temp,actual_range,float,\"10.0, 25.0\"
attribute,temp,units,String,degree_C
variable,flag,,int,
";

    #[test]
    fn pivots_info_rows() {
        let meta = from_info_table(&Table::from_csv(INFO).unwrap()).unwrap();
        assert_eq!(
            meta.keys().collect::<Vec<_>>(),
            vec!["NC_GLOBAL", "flag", "temp"]
        );
        assert_eq!(meta["temp"]["actual_range"], "10.0, 25.0");
        assert_eq!(meta["temp"]["units"], "degree_C");
        assert!(meta["flag"].is_empty());
    }

    #[test]
    fn missing_columns_are_errors() {
        let table = Table::from_csv(b"Variable Name,Value\ntemp,1\n").unwrap();
        assert!(from_info_table(&table).is_err());
    }

    #[test]
    fn actual_range_bounds_stay_text() {
        assert_eq!(
            parse_actual_range("10.0, 25.0").unwrap(),
            ("10.0".to_string(), "25.0".to_string())
        );
        assert!(parse_actual_range("10.0").is_err());
        assert!(parse_actual_range("1, 2, 3").is_err());
        assert!(parse_actual_range("10.0,25.0").is_err());
    }
}
