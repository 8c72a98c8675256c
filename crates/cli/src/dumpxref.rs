//! dumpxref - inspect a PDF's cross-reference structure.
//!
//! Prints the merged cross-reference table, the trailer, and (on
//! request) resolved object bodies, as text or JSON.

use clap::Parser;
use memmap2::Mmap;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use sucre_core::document::{ObjectKind, PdfDocument};
use sucre_core::model::Object;

#[derive(Parser)]
#[command(
    name = "dumpxref",
    about = "Dump the cross-reference structure of a PDF file"
)]
struct Args {
    /// PDF file to inspect
    file: PathBuf,

    /// Password for encrypted documents
    #[arg(short, long, default_value = "")]
    password: String,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Also print each object's resolved body
    #[arg(short = 'o', long)]
    objects: bool,

    /// Treat the file as linearized and load the main chain too
    #[arg(long)]
    linearized: bool,
}

#[derive(Serialize)]
struct XrefReport {
    version: u32,
    rebuilt: bool,
    xref_stream: bool,
    encrypted: bool,
    permissions: u32,
    last_objnum: u32,
    trailer: serde_json::Value,
    entries: Vec<EntryReport>,
}

#[derive(Serialize)]
struct EntryReport {
    objnum: u32,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
}

fn kind_name(kind: Option<ObjectKind>) -> &'static str {
    match kind {
        Some(ObjectKind::Free) | None => "free",
        Some(ObjectKind::Normal) => "normal",
        Some(ObjectKind::ObjStream) => "objstream",
        Some(ObjectKind::Compressed) => "compressed",
    }
}

/// Lossy JSON rendering of a PDF object for inspection output.
fn object_to_json(obj: &Object) -> serde_json::Value {
    use serde_json::{Value, json};
    match obj {
        Object::Null => Value::Null,
        Object::Bool(b) => json!(b),
        Object::Int(n) => json!(n),
        Object::Real(r) => json!(r),
        Object::Name(n) => json!(format!("/{n}")),
        Object::String(s) => json!(String::from_utf8_lossy(s)),
        Object::Array(arr) => Value::Array(
            arr.iter().map(|item| object_to_json(item)).collect(),
        ),
        Object::Dict(dict) => Value::Object(
            dict.iter()
                .map(|(k, v)| (k.clone(), object_to_json(v)))
                .collect(),
        ),
        Object::Stream(stream) => json!({
            "stream": Value::Object(
                stream
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), object_to_json(v)))
                    .collect(),
            ),
            "raw_len": stream.rawdata().len(),
        }),
        Object::Ref(r) => json!(format!("{} {} R", r.objnum, r.genno)),
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&args.file)?;
    // Safety: the mapping is read-only and the file is not expected to
    // change underneath us during a dump.
    let mmap = unsafe { Mmap::map(&file)? };

    let mut doc = if args.linearized {
        PdfDocument::new_linearized(&mmap[..], &args.password)?
    } else {
        PdfDocument::new_from_mmap(mmap, &args.password)?
    };
    if args.linearized && doc.linearized().is_some() {
        doc.load_main_xref()?;
    }

    let trailer = doc
        .trailer()
        .map(|t| object_to_json(&Object::Dict(t.clone())))
        .unwrap_or(serde_json::Value::Null);

    let entries: Vec<EntryReport> = doc
        .object_numbers()
        .into_iter()
        .map(|objnum| {
            let body = if args.objects {
                doc.get_object(objnum)
                    .ok()
                    .map(|obj| object_to_json(&obj))
            } else {
                None
            };
            EntryReport {
                objnum,
                kind: kind_name(doc.object_kind(objnum)).to_string(),
                body,
            }
        })
        .collect();

    let report = XrefReport {
        version: doc.version(),
        rebuilt: doc.xref_was_rebuilt(),
        xref_stream: doc.xref_is_stream(),
        encrypted: doc.is_encrypted(),
        permissions: doc.permissions(),
        last_objnum: doc.last_objnum(),
        trailer,
        entries,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "version 1.{}  objects {}  rebuilt {}  stream-xref {}",
        report.version % 10,
        report.entries.len(),
        report.rebuilt,
        report.xref_stream
    )?;
    if report.encrypted {
        writeln!(out, "encrypted, permissions {:#010x}", report.permissions)?;
    }
    writeln!(out, "trailer: {}", report.trailer)?;
    for entry in &report.entries {
        match &entry.body {
            Some(body) => writeln!(out, "{:>8} {:<10} {}", entry.objnum, entry.kind, body)?,
            None => writeln!(out, "{:>8} {}", entry.objnum, entry.kind)?,
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dumpxref: {err}");
            ExitCode::FAILURE
        }
    }
}
