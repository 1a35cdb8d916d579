use anyhow::Result;
use erddap::{Connection, Constraints, Dataset};
use serde_json::json;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG=erddap=debug shows each request.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = Connection::for_server("NGDAC");
    let conn = Connection::new(format!(
        "{}/tabledap/whoi_406-20160902T1700.nc",
        server.server()
    ))
    .with_progress(true);
    let mut dataset = Dataset::from_url(conn)?;

    for (variable, attributes) in dataset.meta()? {
        if let Some(range) = attributes.get("actual_range") {
            println!("{variable}: {range}");
        }
    }

    let mut variables = vec!["time".to_string(), "depth".to_string()];
    variables.extend(dataset.variables_by_attribute("standard_name", "sea_water_temperature")?);
    dataset.set_variables(Some(variables));

    let constraints: Constraints = [
        ("time>=".to_string(), json!("2016-09-03T00:00:00Z")),
        ("time<=".to_string(), json!("2016-09-04T00:00:00Z")),
    ]
    .into_iter()
    .collect();
    dataset.set_constraints(Some(constraints));

    println!("{}", dataset.get_download_url()?);
    dataset.download("nc", Path::new("whoi_406.nc"))?;
    Ok(())
}
