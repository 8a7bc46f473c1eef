//! Status command implementation

use anyhow::{Context, Result};
use dp_pipeline::OutputStatus;

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::create_orchestrator;

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let orchestrator = create_orchestrator(global)?;
    let status = orchestrator
        .status()
        .await
        .context("Failed to read output table status")?;

    match args.output {
        StatusOutput::Table => print!("{}", format_table(&status)),
        StatusOutput::Json => {
            let json =
                serde_json::to_string_pretty(&status).context("Failed to serialize to JSON")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn format_table(status: &OutputStatus) -> String {
    fn or_dash<T: ToString>(value: Option<T>) -> String {
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    let rows = [
        ("output table", status.output_table.clone()),
        ("exists", status.exists.to_string()),
        ("last created date", or_dash(status.last_date)),
        ("last gid", or_dash(status.last_identifier)),
        ("latest publish month", or_dash(status.latest_publish_month)),
    ];
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(key, value)| format!("{key:<width$}  {value}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_table_aligns_and_dashes_missing() {
        let status = OutputStatus {
            output_table: r#""public"."deter_publish""#.to_string(),
            exists: true,
            last_date: NaiveDate::from_ymd_opt(2023, 1, 15),
            last_identifier: None,
            latest_publish_month: NaiveDate::from_ymd_opt(2023, 1, 1),
        };
        let table = format_table(&status);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], r#"output table          "public"."deter_publish""#);
        assert_eq!(lines[2], "last created date     2023-01-15");
        assert_eq!(lines[3], "last gid              -");
    }
}
