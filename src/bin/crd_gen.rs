//! CRD Generator CLI
//!
//! Runs the generators outside protoc, from a descriptor set produced with
//! `protoc --include_imports --include_source_info -o api.pb api/*.proto`.
//!
//! Usage:
//!   crd-gen generate --descriptor-set api.pb --out manifests
//!   crd-gen generate --descriptor-set api.pb --check
//!   crd-gen openapi --descriptor-set api.pb --out openapi
//!   crd-gen graph --descriptor-set api.pb --output types.dot
//!   crd-gen config --init crdgen.toml

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::FileDescriptorSet;
use protoc_gen_crd::codegen::GenerationContext;
use protoc_gen_crd::golden::{self, GeneratedFile, GoldenStatus};
use protoc_gen_crd::openapi::generate_documents;
use protoc_gen_crd::{generate_channels, GenConfig, Model, RequiredFields, TypeGraph};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crd-gen")]
#[command(about = "Generate Kubernetes CRDs and OpenAPI schemas from protobuf descriptors")]
struct Cli {
    /// Config file (defaults to crdgen.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the stable and extended CRD files
    Generate {
        #[command(flatten)]
        input: Input,

        /// Output root (overrides [output].dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Compare with the files on disk instead of writing them
        #[arg(long)]
        check: bool,
    },

    /// Generate OpenAPI documents
    Openapi {
        #[command(flatten)]
        input: Input,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Export the message type graph as DOT and report recursive groups
    Graph {
        #[command(flatten)]
        input: Input,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Write the default configuration to this path
        #[arg(long)]
        init: Option<String>,
    },
}

#[derive(clap::Args)]
struct Input {
    /// Serialized FileDescriptorSet
    #[arg(short, long)]
    descriptor_set: PathBuf,

    /// Files to generate (defaults to every file in the set)
    #[arg(short, long = "file")]
    files: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GenConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Generate { input, out, check } => {
            let (request, required) = load_request(&input)?;
            let model = Model::with_required_fields(&request, false, &required)?;
            let ctx = GenerationContext::new(&model, &request.file_to_generate)?;

            let mut output = config.output.clone();
            if let Some(dir) = out {
                output.dir = dir;
            }

            let files: Vec<GeneratedFile> = generate_channels(&model, &ctx, &config.generator)?
                .into_iter()
                .map(|channel| GeneratedFile {
                    path: output.channel_path(channel.channel),
                    content: channel.content,
                })
                .collect();

            if check {
                check_files(&files)
            } else {
                golden::write_all(&files)?;
                for file in &files {
                    println!("✅ Wrote {}", file.path.display());
                }
                Ok(())
            }
        }

        Commands::Openapi { input, out } => {
            let (request, required) = load_request(&input)?;
            let model = Model::with_required_fields(&request, config.openapi.per_file, &required)?;
            let ctx = GenerationContext::new(&model, &request.file_to_generate)?;

            let files: Vec<GeneratedFile> = generate_documents(&model, ctx.files(), &config.openapi, &config.generator)?
                .into_iter()
                .map(|doc| GeneratedFile {
                    path: out.join(doc.name),
                    content: doc.content,
                })
                .collect();
            golden::write_all(&files)?;
            println!("✅ Wrote {} OpenAPI documents to {}", files.len(), out.display());
            Ok(())
        }

        Commands::Graph { input, output } => {
            let (request, required) = load_request(&input)?;
            let model = Model::with_required_fields(&request, false, &required)?;
            let graph = TypeGraph::build(&model);

            eprintln!(
                "Graph loaded: {} messages, {} edges",
                graph.message_count(),
                graph.edge_count()
            );
            for group in graph.recursive_groups() {
                eprintln!("🔁 Recursive: {}", group.join(" -> "));
            }

            let dot = graph.to_dot();
            match output {
                Some(path) => {
                    fs::write(&path, dot)?;
                    eprintln!("✅ Exported DOT to: {}", path.display());
                }
                None => print!("{}", dot),
            }
            Ok(())
        }

        Commands::Config { init } => {
            if let Some(path) = init {
                GenConfig::default().save(&path)?;
                println!("✅ Wrote default configuration to {}", path);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

/// Turn a descriptor set into the request protoc would have sent
fn load_request(input: &Input) -> anyhow::Result<(CodeGeneratorRequest, RequiredFields)> {
    let bytes = read(&input.descriptor_set)?;
    let set = FileDescriptorSet::decode(bytes.as_slice())
        .with_context(|| format!("decoding {}", input.descriptor_set.display()))?;
    let required = RequiredFields::from_descriptor_set_bytes(&bytes)?;

    let file_to_generate = if input.files.is_empty() {
        set.file.iter().map(|f| f.name().to_string()).collect()
    } else {
        input.files.clone()
    };

    let request = CodeGeneratorRequest {
        file_to_generate,
        proto_file: set.file,
        ..Default::default()
    };
    Ok((request, required))
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn check_files(files: &[GeneratedFile]) -> anyhow::Result<()> {
    let stale = golden::check(files)?;
    if stale.is_empty() {
        println!("✅ {} generated files are up to date", files.len());
        return Ok(());
    }

    for (path, status) in &stale {
        match status {
            GoldenStatus::Missing => println!("❌ Missing: {}", path.display()),
            GoldenStatus::Differs(diff) => {
                println!("❌ Out of date: {} (+{} -{})", path.display(), diff.inserted, diff.deleted);
                print!("{}", diff.unified);
            }
            GoldenStatus::Match => {}
        }
    }
    anyhow::bail!("{} generated files are out of date", stale.len())
}
