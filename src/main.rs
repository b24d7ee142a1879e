use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::Context;
use clap::Parser;

use email_parser::{parser::parse_email_with_domain, DkimKeyStore};
use prover::{
    circuit::variant::CircuitVariant,
    parameters::load_variant_parameters,
    pipeline::{email_id, generate_inputs_with_parameters},
};

/// Compiles DKIM-signed payment emails into circuit input JSON.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// raw .eml file, or a directory of them
    #[arg(long)]
    emails: PathBuf,

    #[arg(long, default_value = "wise_send")]
    variant: CircuitVariant,

    /// PEM public key of the signing domain
    #[arg(long)]
    dkim_key: PathBuf,

    /// DKIM selector the key is published under
    #[arg(long, default_value = "default")]
    selector: String,

    #[arg(long)]
    intent_hash: Option<String>,

    /// JSON file overriding the variant's built-in parameters
    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long, default_value = "inputs")]
    out_dir: PathBuf,

    /// also dump the canonical header and body as `<email_id>.parsed.json`
    #[arg(long)]
    debug: bool,
}

fn email_files(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = vec![];
    for entry in fs::read_dir(path).with_context(|| format!("reading {}", path.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let params = match &args.params {
        Some(path) => load_variant_parameters(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => args.variant.parameters()?,
    };

    let pem = fs::read_to_string(&args.dkim_key)
        .with_context(|| format!("reading {}", args.dkim_key.display()))?;
    let mut key_store = DkimKeyStore::new();
    key_store.insert_pem(&params.signing_domain, &args.selector, &pem)?;

    fs::create_dir_all(&args.out_dir)?;

    let mut failed = 0;
    for path in email_files(&args.emails)? {
        let email_bytes = fs::read(&path)?;
        let start = Instant::now();
        let record = match generate_inputs_with_parameters(
            &email_bytes,
            &params,
            args.intent_hash.clone(),
            &key_store,
        ) {
            Ok(record) => record,
            Err(e) => {
                log::error!("{}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };
        log::info!(
            "[main] {} compiled in {:?}",
            path.display(),
            start.elapsed()
        );

        let id = email_id(&email_bytes);
        if args.debug {
            let parsed = parse_email_with_domain(&email_bytes, &params.signing_domain, true)?;
            let debug_path = args.out_dir.join(format!("{}.parsed.json", id));
            fs::write(&debug_path, serde_json::to_vec_pretty(&parsed)?)?;
        }

        let out_path = args.out_dir.join(format!("{}.json", id));
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&out_path)?;
        file.write_all(&record.to_json_pretty()?)?;
        file.flush()?;
        println!("{}", out_path.display());
    }

    if failed > 0 {
        anyhow::bail!("{} email(s) failed", failed);
    }
    Ok(())
}
