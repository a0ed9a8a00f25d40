//! Writes the OpenAPI document of the HTTP API to a JSON file.

use crossroads_bot::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
