use chrono::{DateTime, Local};
use dockwatch::Event;

use crate::cli::Format;

pub fn render(event: &Event, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => serde_json::to_string(event),
        Format::Text => Ok(render_text(event)),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn render_text(event: &Event) -> String {
    let time = event
        .time
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    let container = &event.container;

    format!(
        "{time} {status} {id} name={name} image={image} host={host} ip={ip}",
        status = event.status,
        id = short_id(&event.id),
        name = container.name.trim_start_matches('/'),
        image = container.image,
        host = container.host_id().unwrap_or("-"),
        ip = container.ip().filter(|ip| !ip.is_empty()).unwrap_or("-"),
    )
}
