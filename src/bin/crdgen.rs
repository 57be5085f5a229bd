//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate every CRD served by the provider
//! cargo run --bin crdgen > package/crds.yaml
//!
//! # Generate a single CRD and apply it directly
//! cargo run --bin crdgen -- --kind policy | kubectl apply -f -
//! ```

use clap::{Parser, ValueEnum};
use kube::core::CustomResourceExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use vault_provider::crd::{Engine, Policy, ProviderConfig, SecretPath};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Engine,
    SecretPath,
    Policy,
    ProviderConfig,
}

impl Kind {
    fn crd(self) -> CustomResourceDefinition {
        match self {
            Self::Engine => Engine::crd(),
            Self::SecretPath => SecretPath::crd(),
            Self::Policy => Policy::crd(),
            Self::ProviderConfig => ProviderConfig::crd(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "crdgen", about = "Print the provider CRDs as YAML")]
struct Cli {
    /// Only print the CRD of this kind
    #[arg(long, value_enum)]
    kind: Option<Kind>,
}

fn main() {
    let cli = Cli::parse();
    let kinds = cli.kind.map_or_else(
        || vec![Kind::ProviderConfig, Kind::Engine, Kind::SecretPath, Kind::Policy],
        |kind| vec![kind],
    );

    let mut documents = Vec::with_capacity(kinds.len());
    for kind in kinds {
        match serde_yaml::to_string(&kind.crd()) {
            Ok(yaml) => documents.push(yaml),
            Err(e) => {
                eprintln!("Failed to serialize {kind:?} CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
    print!("{}", documents.join("---\n"));
}
