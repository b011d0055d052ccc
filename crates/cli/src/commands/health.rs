//! Agent health CLI command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse};
use crate::output::{color_status, print_error, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show agent health; fails when the agent reports itself unhealthy
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (status, health): (u16, HealthResponse) = client.get_with_status("healthz").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("Agent: {}", color_status(&health.status));
            println!("Models: {}", health.models);
            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(rows);
        }
    }

    if status >= 500 {
        print_error("Agent is unhealthy");
        anyhow::bail!("health check failed with status {}", status);
    }
    Ok(())
}
