//! protoc plugin generating OpenAPI 3.0.1 documents
//!
//! Usage:
//!   protoc --openapi_out=yaml=true,single_file=false:out api/*.proto

use std::io;

use protoc_gen_crd::openapi::generate_openapi;
use protoc_gen_crd::plugin::{read_request, write_response};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let (request, required) = read_request(io::stdin().lock())?;
    let response = generate_openapi(&request, &required)?;
    write_response(io::stdout().lock(), &response)?;
    Ok(())
}
