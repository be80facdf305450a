//! services/api/src/bin/openapi.rs
//!
//! Prints the OpenAPI specification as JSON, so clients can be generated
//! without a running server.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

fn main() {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(spec) => println!("{}", spec),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
