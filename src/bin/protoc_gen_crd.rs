//! protoc plugin generating Kubernetes CustomResourceDefinitions
//!
//! Usage:
//!   protoc --crd_out=include_description=true:. --crd_opt=enum_as_int_or_string=false api/*.proto

use std::io;

use protoc_gen_crd::plugin::{generate_crds, read_request, write_response};
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries the response
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
    let response = generate_crds(&request, &required)?;
    write_response(io::stdout().lock(), &response)?;
    Ok(())
}
