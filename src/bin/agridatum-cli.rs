use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use agridatum::address::{derive_farmer_address, Network};
use agridatum::crypto::{generate_keypair, sign};
use agridatum::record::{canonicalize, HarvestRecord};

#[derive(Parser)]
#[command(name = "agridatum-cli")]
#[command(about = "Field agent CLI for the AgriDatum attestation service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a farmer keypair locally
    Keygen {
        #[arg(long)]
        mainnet: bool,
    },
    /// Sign a harvest record (JSON file) with a private key
    Sign {
        #[arg(short, long)]
        record: PathBuf,
        #[arg(short = 'k', long)]
        private_key: String,
    },
    /// Derive the farmer address for a public key
    Address {
        #[arg(short = 'k', long)]
        public_key: String,
        #[arg(long)]
        mainnet: bool,
    },
    /// Submit a harvest record, signing it first when a private key is given
    Submit {
        #[arg(short, long)]
        record: PathBuf,
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        private_key: Option<String>,
    },
    /// Verify a stored record by id or transaction hash
    Verify {
        #[arg(long, conflicts_with = "tx")]
        id: Option<u64>,
        #[arg(long)]
        tx: Option<String>,
    },
    /// List records, optionally for one farmer
    Records {
        #[arg(long)]
        farmer: Option<String>,
        #[arg(long)]
        crop: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Keygen { mainnet } => {
            let keypair = generate_keypair()?;
            let address = derive_farmer_address(keypair.public_key(), network(mainnet))?;
            print_json(&json!({
                "publicKey": keypair.public_key(),
                "privateKey": keypair.private_key(),
                "farmerAddress": address.as_str(),
            }))?;
        }
        Commands::Sign { record, private_key } => {
            let record = read_record(&record)?;
            let signature = sign(&canonicalize(&record), &private_key)?;
            println!("{}", signature);
        }
        Commands::Address { public_key, mainnet } => {
            println!("{}", derive_farmer_address(&public_key, network(mainnet))?);
        }
        Commands::Submit {
            record,
            public_key,
            private_key,
        } => {
            let record = read_record(&record)?;
            let signature = match private_key {
                Some(key) => Some(sign(&canonicalize(&record), &key)?),
                None => None,
            };

            let mut body = serde_json::to_value(&record)?;
            body["publicKey"] = json!(public_key);
            if let Some(signature) = signature {
                body["signature"] = json!(signature);
            }

            let res = client
                .post(format!("{}/api/harvest/submit", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Verify { id, tx } => {
            let body = match (id, tx) {
                (Some(id), _) => json!({ "recordId": id }),
                (None, Some(tx)) => json!({ "transactionHash": tx }),
                (None, None) => return Err("either --id or --tx is required".into()),
            };
            let res = client
                .post(format!("{}/api/harvest/verify", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Records { farmer, crop, limit } => {
            let url = match &farmer {
                Some(farmer) => format!("{}/api/harvest/records/{}", cli.url, farmer),
                None => format!("{}/api/harvest/records", cli.url),
            };
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(crop) = crop {
                query.push(("cropType", crop));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            let res = client.get(url).query(&query).send().await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn network(mainnet: bool) -> Network {
    if mainnet {
        Network::Mainnet
    } else {
        Network::Testnet
    }
}

fn read_record(path: &PathBuf) -> Result<HarvestRecord, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    print_json(&json)
}
