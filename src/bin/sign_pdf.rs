//! Create and sign a PDF in one pass
//!
//! Writes a document with the given text lines and a signature field,
//! signs it in place with a PEM certificate and key, and prints a JSON
//! summary of the signed byte ranges.
//!
//! Usage:
//!   cargo run --release --features signatures --bin sign_pdf -- \
//!       --cert cert.pem --key key.pem --out signed.pdf \
//!       [--chain chain.pem] [--reason TEXT] [--location TEXT] [--name TEXT] \
//!       [--title TEXT] [--text LINE]... [--visible X,Y,W,H] [--extra-reserve N]

use pdf_inplace_sign::geometry::Rect;
use pdf_inplace_sign::signatures::{CmsSigner, SignOptions, SignatureMetadata};
use pdf_inplace_sign::writer::{PdfWriter, PdfWriterConfig, SignatureField};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

struct SignConfig {
    cert: PathBuf,
    key: PathBuf,
    chain: Option<PathBuf>,
    out: PathBuf,
    title: Option<String>,
    lines: Vec<String>,
    metadata: SignatureMetadata,
    visible: Option<Rect>,
    extra_reserve: usize,
}

impl SignConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut cert = None;
        let mut key = None;
        let mut chain = None;
        let mut out = None;
        let mut title = None;
        let mut lines = Vec::new();
        let mut metadata = SignatureMetadata::default();
        let mut visible = None;
        let mut extra_reserve = 0;

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = || {
                args.get(i + 1)
                    .cloned()
                    .ok_or_else(|| format!("Missing value for {}", flag))
            };
            match flag {
                "--cert" => cert = Some(PathBuf::from(value()?)),
                "--key" => key = Some(PathBuf::from(value()?)),
                "--chain" => chain = Some(PathBuf::from(value()?)),
                "--out" | "-o" => out = Some(PathBuf::from(value()?)),
                "--title" => title = Some(value()?),
                "--text" => lines.push(value()?),
                "--reason" => metadata = metadata.with_reason(value()?),
                "--location" => metadata = metadata.with_location(value()?),
                "--name" => metadata = metadata.with_name(value()?),
                "--visible" => visible = Some(parse_rect(&value()?)?),
                "--extra-reserve" => {
                    extra_reserve = value()?
                        .parse()
                        .map_err(|e| format!("Invalid --extra-reserve: {}", e))?;
                },
                "--help" | "-h" => return Err(usage()),
                other => return Err(format!("Unknown argument: {}\n{}", other, usage())),
            }
            i += 2;
        }

        Ok(Self {
            cert: cert.ok_or_else(|| format!("--cert is required\n{}", usage()))?,
            key: key.ok_or_else(|| format!("--key is required\n{}", usage()))?,
            chain,
            out: out.ok_or_else(|| format!("--out is required\n{}", usage()))?,
            title,
            lines,
            metadata,
            visible,
            extra_reserve,
        })
    }
}

fn usage() -> String {
    "Usage: sign_pdf --cert CERT.pem --key KEY.pem --out OUT.pdf [--chain CHAIN.pem] \
     [--reason TEXT] [--location TEXT] [--name TEXT] [--title TEXT] [--text LINE]... \
     [--visible X,Y,W,H] [--extra-reserve N]"
        .to_string()
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Invalid --visible {:?}: {}", value, e))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(format!("--visible expects X,Y,W,H, got {:?}", value)),
    }
}

fn run(config: SignConfig) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let cert_pem = fs::read_to_string(&config.cert)?;
    let key_pem = fs::read_to_string(&config.key)?;
    let mut signer = CmsSigner::from_pem(&cert_pem, &key_pem)?;
    if let Some(chain) = &config.chain {
        signer = signer.with_chain_pem(&fs::read_to_string(chain)?)?;
    }

    let mut writer_config = PdfWriterConfig::default();
    if let Some(title) = &config.title {
        writer_config = writer_config.with_title(title.clone());
    }
    let mut writer = PdfWriter::with_config(writer_config);
    {
        let mut page = writer.add_letter_page();
        let mut y = 720.0;
        for line in &config.lines {
            page.add_text(line, 72.0, y, "Helvetica", 12.0);
            y -= 16.0;
        }
        page.finish();
    }

    let mut field = SignatureField::new("Signature1").with_metadata(config.metadata);
    if let Some(rect) = config.visible {
        field = field.visible(rect);
    }
    writer.add_signature_field(field)?;

    let options = SignOptions::default().with_extra_reserve(config.extra_reserve);
    let start = Instant::now();
    let descriptor = writer.sign_to_file(&config.out, signer, options)?;
    let elapsed_ms = start.elapsed().as_millis();

    log::info!("Signed {} in {} ms", config.out.display(), elapsed_ms);

    Ok(serde_json::json!({
        "output": config.out.display().to_string(),
        "signer": writer.signature_field().and_then(|f| f.metadata.name.clone()),
        "byte_range": descriptor,
        "signed_bytes": descriptor.signed_length(),
        "time_ms": elapsed_ms,
    }))
}

fn main() {
    env_logger::init();

    let config = match SignConfig::from_args() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        },
    };

    match run(config) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            },
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        },
    }
}
